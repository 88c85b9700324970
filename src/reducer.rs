//! The reducer stage (§4.F): one subprocess per partition, fed from
//! that partition's drained grouping buffer and consumed into the
//! job's output destination.

use std::fs::File;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::{EngineError, Result};
use crate::gpfs::{self, Gpfs};
use crate::intake::GroupingBuffer;

/// A running reducer and the threads feeding/draining it.
pub struct Spawned {
    pub child: Child,
    pub sender: JoinHandle<()>,
    pub consumer: Option<JoinHandle<()>>,
}

/// Spawns the reducer for one partition. `buffer` must already be
/// drained (§4.E) before this is called: the sender thread reads it
/// once, in first-seen key order, and does not wait for further input.
///
/// Must be called from the coordinator's own call stack, never from
/// inside a worker thread (§4.G, §9), for the same reason as the mapper.
pub fn spawn(
    fs_store: Arc<Gpfs>,
    reducer_cmd: &str,
    output_dir: &str,
    output_is_gpfs: bool,
    shard: &str,
    buffer: Arc<Mutex<GroupingBuffer>>,
) -> Result<Spawned> {
    // A host-fs output is wired directly as the child's stdout (§4.C/§4.F
    // "wired directly"), so the reducer's output reaches disk byte for
    // byte with no intervening thread re-splitting it into lines. Only a
    // GPFS destination goes through a line-reading consumer thread, since
    // the store holds lines without their trailing newline (§3).
    let stdout_mode = if output_is_gpfs {
        Stdio::piped()
    } else {
        let path = format!("{}/{}", output_dir, shard);
        let f = File::create(&path).map_err(|e| EngineError::SetupFailure {
            path: path.clone(),
            source: e,
        })?;
        Stdio::from(f)
    };

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(reducer_cmd)
        .stdin(Stdio::piped())
        .stdout(stdout_mode)
        .spawn()
        .map_err(|e| {
            EngineError::JobFailure(format!("could not start reducer '{}': {}", reducer_cmd, e))
        })?;

    let stdin = child.stdin.take().expect("piped stdin");
    let sender = thread::spawn(move || {
        let mut stdin = stdin;
        let buf = buffer.lock().unwrap();
        for (key, lines) in buf.iter() {
            for line in lines {
                if writeln!(stdin, "{}", line.trim_end_matches('\n')).is_err() {
                    tracing::warn!(key = %key, "reducer stdin closed early");
                    return;
                }
            }
        }
    });

    let consumer = if output_is_gpfs {
        let stdout = child.stdout.take().expect("piped stdout");
        Some(gpfs::consume_into(fs_store, output_dir.to_string(), shard.to_string(), stdout))
    } else {
        None
    };

    Ok(Spawned {
        child,
        sender,
        consumer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake;
    use tempfile::tempdir;

    #[test]
    fn reduces_grouped_input_to_host_output() {
        let intake = intake::spawn();
        let handle = intake.handle();
        let mut group = crate::partition::Group::new();
        group.insert("a".to_string(), vec!["a\t1\n".to_string(), "a\t1\n".to_string()]);
        group.insert("b".to_string(), vec!["b\t1\n".to_string()]);
        handle.send(group);
        intake.drain();

        let outdir = tempdir().unwrap();
        let fs_store = Arc::new(Gpfs::new());
        let spawned = spawn(
            fs_store,
            "awk -F'\\t' '{ n[$1]+=$2 } END { for (k in n) print k\"\\t\"n[k] }'",
            outdir.path().to_str().unwrap(),
            false,
            "part0",
            intake.buffer(),
        )
        .unwrap();

        spawned.sender.join().unwrap();
        let mut child = spawned.child;
        child.wait().unwrap();
        assert!(spawned.consumer.is_none());

        let written = std::fs::read_to_string(outdir.path().join("part0")).unwrap();
        let mut lines: Vec<&str> = written.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["a\t2", "b\t1"]);
    }

    #[test]
    fn reduces_into_gpfs_output() {
        let intake = intake::spawn();
        let handle = intake.handle();
        let mut group = crate::partition::Group::new();
        group.insert("k".to_string(), vec!["k\tv\n".to_string()]);
        handle.send(group);
        intake.drain();

        let fs_store = Arc::new(Gpfs::new());
        let spawned = spawn(
            fs_store.clone(),
            "cat",
            "out",
            true,
            "part0",
            intake.buffer(),
        )
        .unwrap();

        spawned.sender.join().unwrap();
        let mut child = spawned.child;
        child.wait().unwrap();
        spawned.consumer.unwrap().join().unwrap();

        assert_eq!(fs_store.cat("out", "part0").unwrap(), vec!["k\tv".to_string()]);
    }
}
