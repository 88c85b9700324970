//! The input/output adapter (§4.B): decides whether each side of a job is
//! host-fs or GPFS, enumerates the input shards, and prepares the output
//! destination. Opens no files; enumeration and destination setup only.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::gpfs::{is_gpfs, Gpfs};

/// What `resolve` found out about a job's two directories.
pub struct ResolvedIo {
    pub infiles: Vec<String>,
    pub input_is_gpfs: bool,
    pub output_is_gpfs: bool,
}

/// Resolves `indir`/`outdir` and prepares the output side. Any failure
/// here is a *setup-failure* (§7): an unreadable input directory or an
/// output directory that cannot be removed/created.
pub fn resolve(fs_store: &Gpfs, indir: &str, outdir: &str) -> Result<ResolvedIo> {
    let input_is_gpfs = is_gpfs(indir);
    let output_is_gpfs = is_gpfs(outdir);

    let infiles = if input_is_gpfs {
        fs_store.list_files(indir)
    } else {
        read_dir_names(indir)?
    };

    if output_is_gpfs {
        fs_store.rm_dir(outdir);
    } else {
        prepare_host_output_dir(outdir)?;
    }

    tracing::info!(indir, n = infiles.len(), "resolved job inputs");

    Ok(ResolvedIo {
        infiles,
        input_is_gpfs,
        output_is_gpfs,
    })
}

/// Non-recursive directory listing, in whatever order the filesystem
/// returns (§4.B leaves this unspecified, as does the original's
/// `os.listdir`).
fn read_dir_names(dir: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| EngineError::SetupFailure {
        path: dir.to_string(),
        source: e,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::SetupFailure {
            path: dir.to_string(),
            source: e,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn prepare_host_output_dir(outdir: &str) -> Result<()> {
    let path = Path::new(outdir);
    if path.exists() {
        tracing::warn!(outdir, "removing existing output directory");
        fs::remove_dir_all(path).map_err(|e| EngineError::SetupFailure {
            path: outdir.to_string(),
            source: e,
        })?;
    }
    fs::create_dir_all(path).map_err(|e| EngineError::SetupFailure {
        path: outdir.to_string(),
        source: e,
    })
}
