//! Job coordinator (§4.G): drives one job from resolved input/output
//! directories through to completion, in the strict step order the
//! concurrency model depends on.

use std::sync::Arc;

use crate::adapter;
use crate::error::{EngineError, Result};
use crate::gpfs::Gpfs;
use crate::intake;
use crate::mapper::{self, StdoutSink};
use crate::parameters::JobParameters;
use crate::reducer;
use crate::shuffle;

/// Runs one job to completion, map-reduce or map-only depending on
/// whether `params` carries a reducer command.
pub fn run(fs_store: Arc<Gpfs>, params: &JobParameters) -> Result<()> {
    if params.is_map_reduce() {
        run_map_reduce(fs_store, params)
    } else {
        run_map_only(fs_store, params)
    }
}

fn run_map_reduce(fs_store: Arc<Gpfs>, params: &JobParameters) -> Result<()> {
    let reducer_cmd = params
        .reducer
        .as_deref()
        .expect("run_map_reduce called without a reducer command");

    tracing::info!(
        input = %params.input_dir,
        output = %params.output_dir,
        "resolving adapters"
    );
    let resolved = adapter::resolve(&fs_store, &params.input_dir, &params.output_dir)?;
    tracing::info!(n_shards = resolved.infiles.len(), "adapters resolved");

    let k = params.num_reduce_tasks;
    tracing::info!(partitions = k, "building intake workers");
    let intakes: Vec<_> = (0..k).map(|_| intake::spawn()).collect();

    tracing::info!(n_shards = resolved.infiles.len(), "spawning mappers and shufflers");
    let mut shufflers = Vec::with_capacity(resolved.infiles.len());
    let mut feeders = Vec::with_capacity(resolved.infiles.len());
    for shard in &resolved.infiles {
        let mut spawned = mapper::spawn(
            &params.mapper,
            &params.input_dir,
            resolved.input_is_gpfs,
            fs_store.clone(),
            shard,
            StdoutSink::Piped,
        )?;
        let stdout = spawned.stdout.take().expect("mapper piped for shuffling");
        let handles: Vec<_> = intakes.iter().map(intake::Intake::handle).collect();
        shufflers.push(shuffle::spawn(shard.clone(), spawned.child, stdout, handles));
        if let Some(feeder) = spawned.feeder {
            feeders.push(feeder);
        }
    }

    tracing::info!("joining shufflers");
    for shuffler in shufflers {
        shuffler.join().map_err(|_| EngineError::JobFailure("shuffler thread panicked".into()))?;
    }
    tracing::info!("joining feeders");
    for feeder in feeders {
        feeder.join().map_err(|_| EngineError::JobFailure("feeder thread panicked".into()))?;
    }

    tracing::info!("waiting for partition channels to drain");
    for ik in &intakes {
        ik.drain();
    }
    tracing::info!("all partitions drained");

    tracing::info!(partitions = k, "spawning reducers");
    let mut children = Vec::with_capacity(k);
    let mut senders = Vec::with_capacity(k);
    let mut consumers = Vec::with_capacity(k);
    for (i, ik) in intakes.iter().enumerate() {
        let shard = format!("part{:05}", i);
        let spawned = reducer::spawn(
            fs_store.clone(),
            reducer_cmd,
            &params.output_dir,
            resolved.output_is_gpfs,
            &shard,
            ik.buffer(),
        )?;
        children.push(spawned.child);
        senders.push(spawned.sender);
        consumers.push(spawned.consumer);
    }

    tracing::info!("waiting for reducer subprocesses");
    for mut child in children {
        child.wait().map_err(|e| EngineError::JobFailure(format!("reducer wait failed: {}", e)))?;
    }

    tracing::info!("joining senders");
    for sender in senders {
        sender.join().map_err(|_| EngineError::JobFailure("reducer sender thread panicked".into()))?;
    }
    tracing::info!("joining consumers");
    for consumer in consumers.into_iter().flatten() {
        consumer.join().map_err(|_| EngineError::JobFailure("reducer consumer thread panicked".into()))?;
    }

    tracing::info!("map-reduce job complete");
    Ok(())
}

fn run_map_only(fs_store: Arc<Gpfs>, params: &JobParameters) -> Result<()> {
    tracing::info!(
        input = %params.input_dir,
        output = %params.output_dir,
        "resolving adapters"
    );
    let resolved = adapter::resolve(&fs_store, &params.input_dir, &params.output_dir)?;
    tracing::info!(n_shards = resolved.infiles.len(), "adapters resolved");

    tracing::info!("spawning mappers");
    let mut spawns = Vec::with_capacity(resolved.infiles.len());
    for shard in &resolved.infiles {
        let sink = if resolved.output_is_gpfs {
            StdoutSink::Gpfs {
                fs_store: fs_store.clone(),
                dir: params.output_dir.clone(),
                file: shard.clone(),
            }
        } else {
            StdoutSink::HostFile(format!("{}/{}", params.output_dir, shard))
        };
        spawns.push(mapper::spawn(
            &params.mapper,
            &params.input_dir,
            resolved.input_is_gpfs,
            fs_store.clone(),
            shard,
            sink,
        )?);
    }

    tracing::info!("waiting for mapper subprocesses");
    for spawned in &mut spawns {
        spawned
            .child
            .wait()
            .map_err(|e| EngineError::JobFailure(format!("mapper wait failed: {}", e)))?;
    }

    tracing::info!("joining feeders and consumers");
    for spawned in spawns {
        if let Some(feeder) = spawned.feeder {
            feeder.join().map_err(|_| EngineError::JobFailure("feeder thread panicked".into()))?;
        }
        if let Some(consumer) = spawned.consumer {
            consumer.join().map_err(|_| EngineError::JobFailure("consumer thread panicked".into()))?;
        }
    }

    tracing::info!("map-only job complete");
    Ok(())
}
