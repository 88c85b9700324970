//! The shuffler (§4.D): one thread per mapper, reading its stdout,
//! bucketing by `hash(key) mod K`, and bulk-delivering each populated
//! partition's group once the mapper's stdout reaches EOF.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout};
use std::thread::{self, JoinHandle};

use crate::intake::PartitionHandle;
use crate::keys::{key_of, partition_of};
use crate::partition::Group;

/// Spawns the shuffler thread for one mapper. The thread also waits on
/// `child` once stdout reaches EOF, so the caller need not join it
/// separately for that purpose (it still needs the `JoinHandle` to wait
/// for the shuffler thread itself, per §4.G step 4).
pub fn spawn(
    mapper_label: String,
    mut child: Child,
    stdout: ChildStdout,
    partitions: Vec<PartitionHandle>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let n = partitions.len();
        let mut shufbuf: Vec<Group> = vec![HashMap::new(); n];

        for line in BufReader::new(stdout).lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!(mapper = %mapper_label, error = %e, "error reading mapper stdout");
                    break;
                }
            };
            let h = partition_of(key_of(&line), n);
            shufbuf[h]
                .entry(key_of(&line).to_string())
                .or_default()
                .push(line + "\n");
        }

        tracing::debug!(mapper = %mapper_label, "shuffler sending buffer to intake");
        for (h, group) in shufbuf.into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            partitions[h].send(group);
        }

        match child.wait() {
            Ok(status) => tracing::debug!(mapper = %mapper_label, ?status, "mapper process exited"),
            Err(e) => tracing::warn!(mapper = %mapper_label, error = %e, "error waiting for mapper"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake;
    use std::process::{Command, Stdio};

    #[test]
    fn shuffles_lines_into_their_hashed_partitions() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("printf 'the\\t1\\ncat\\t1\\nthe\\t1\\n'")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();

        let k = 2;
        let intakes: Vec<_> = (0..k).map(|_| intake::spawn()).collect();
        let handles: Vec<_> = intakes.iter().map(intake::Intake::handle).collect();

        let shuffler = spawn("test-mapper".to_string(), child, stdout, handles);
        shuffler.join().unwrap();
        for ik in &intakes {
            ik.drain();
        }

        let mut total_lines = 0;
        let mut the_count = 0;
        for ik in &intakes {
            let buf = ik.buffer();
            let buf = buf.lock().unwrap();
            for (key, lines) in buf.iter() {
                total_lines += lines.len();
                if key == "the" {
                    the_count += lines.len();
                }
            }
        }
        assert_eq!(total_lines, 3);
        assert_eq!(the_count, 2);
    }
}
