//! The mapper stage (§4.C): spawns one subprocess per input shard,
//! feeds it the shard's lines on stdin, and wires its stdout to
//! wherever the job's output needs to land next.

use std::fs::File;
use std::io::Write;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{EngineError, Result};
use crate::gpfs::{self, Gpfs};

/// Where a mapper's stdout should end up.
pub enum StdoutSink {
    /// Left piped, for the caller (the shuffler, in a map-reduce job) to
    /// read directly.
    Piped,
    /// Written straight to a host-fs file (map-only, host output).
    HostFile(String),
    /// Consumed into the GPFS store (map-only, GPFS output).
    Gpfs {
        fs_store: Arc<Gpfs>,
        dir: String,
        file: String,
    },
}

/// A running mapper and the threads feeding/draining it. `stdout` is
/// `Some` only when the sink was `StdoutSink::Piped`, for the caller to
/// take and hand to the shuffler.
pub struct Spawned {
    pub child: Child,
    pub feeder: Option<JoinHandle<()>>,
    pub consumer: Option<JoinHandle<()>>,
    pub stdout: Option<ChildStdout>,
}

/// Spawns the mapper for one shard. `shard_name` is either a GPFS file
/// name (when `input_is_gpfs`) or a host-fs entry name under `input_dir`.
///
/// Must be called from the coordinator's own call stack, never from
/// inside a worker thread (§4.G, §9): spawning here keeps subprocess
/// creation serialized with the rest of job setup.
pub fn spawn(
    mapper_cmd: &str,
    input_dir: &str,
    input_is_gpfs: bool,
    fs_store: Arc<Gpfs>,
    shard_name: &str,
    stdout_sink: StdoutSink,
) -> Result<Spawned> {
    let needs_stdin_feeder = input_is_gpfs;
    let stdin_mode = if needs_stdin_feeder {
        Stdio::piped()
    } else {
        let path = format!("{}/{}", input_dir, shard_name);
        let f = File::open(&path).map_err(|e| EngineError::SetupFailure {
            path: path.clone(),
            source: e,
        })?;
        Stdio::from(f)
    };

    // A host-fs sink is wired directly as the child's stdout (§4.C "wired
    // directly"), so the mapper's output reaches disk byte for byte with
    // no intervening thread re-splitting it into lines.
    let stdout_mode = match &stdout_sink {
        StdoutSink::HostFile(path) => {
            let f = File::create(path).map_err(|e| EngineError::SetupFailure {
                path: path.clone(),
                source: e,
            })?;
            Stdio::from(f)
        }
        StdoutSink::Piped | StdoutSink::Gpfs { .. } => Stdio::piped(),
    };

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(mapper_cmd)
        .stdin(stdin_mode)
        .stdout(stdout_mode)
        .spawn()
        .map_err(|e| EngineError::JobFailure(format!("could not start mapper '{}': {}", mapper_cmd, e)))?;

    let feeder = if needs_stdin_feeder {
        let stdin = child.stdin.take().expect("piped stdin");
        let dir = input_dir.to_string();
        let file = shard_name.to_string();
        let fs_store = fs_store.clone();
        Some(thread::spawn(move || {
            let lines = match fs_store.cat(&dir, &file) {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::warn!(dir = %dir, file = %file, error = %e, "mapper feeder could not read input");
                    return;
                }
            };
            let mut stdin = stdin;
            for line in lines {
                if writeln!(stdin, "{}", line).is_err() {
                    break;
                }
            }
        }))
    } else {
        None
    };

    let (consumer, returned_stdout) = match stdout_sink {
        StdoutSink::Piped => (None, child.stdout.take()),
        StdoutSink::HostFile(_) => (None, None),
        StdoutSink::Gpfs { fs_store, dir, file } => {
            let stdout = child.stdout.take().expect("piped stdout");
            (Some(gpfs::consume_into(fs_store, dir, file, stdout)), None)
        }
    };

    Ok(Spawned {
        child,
        feeder,
        consumer,
        stdout: returned_stdout,
    })
}
