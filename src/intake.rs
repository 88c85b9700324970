//! Reducer intake (§4.E): K daemon workers, each draining a partition
//! channel into that partition's grouping buffer. There is no
//! channel-close protocol, so completion is detected with an in-flight
//! counter and condvar instead (§9 "daemon intake workers").

use std::collections::HashMap;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::partition::Group;

/// Per-partition grouping buffer: key -> lines, in first-seen key order.
/// A `Vec` tracks insertion order alongside the map, since no sort is
/// ever performed and order must still be preserved (§3).
pub struct GroupingBuffer {
    order: Vec<String>,
    lines: HashMap<String, Vec<String>>,
}

impl GroupingBuffer {
    fn new() -> GroupingBuffer {
        GroupingBuffer {
            order: Vec::new(),
            lines: HashMap::new(),
        }
    }

    fn extend(&mut self, key: String, mut new_lines: Vec<String>) {
        if let Some(existing) = self.lines.get_mut(&key) {
            existing.append(&mut new_lines);
        } else {
            self.order.push(key.clone());
            self.lines.insert(key, new_lines);
        }
    }

    /// Keys and their lines, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.order.iter().map(move |k| (k, &self.lines[k]))
    }
}

struct Inflight {
    count: usize,
}

/// Sending half of one partition's intake: tracks in-flight groups so
/// `Intake::drain` knows when it is safe to say "nothing more is
/// coming" even though the channel itself never closes.
#[derive(Clone)]
pub struct PartitionHandle {
    tx: Sender<Group>,
    inflight: Arc<(Mutex<Inflight>, Condvar)>,
}

impl PartitionHandle {
    pub fn send(&self, group: Group) {
        {
            let (lock, _) = &*self.inflight;
            lock.lock().unwrap().count += 1;
        }
        if self.tx.send(group).is_err() {
            self.mark_done();
        }
    }

    fn mark_done(&self) {
        let (lock, cvar) = &*self.inflight;
        let mut guard = lock.lock().unwrap();
        guard.count -= 1;
        if guard.count == 0 {
            cvar.notify_all();
        }
    }
}

/// One partition's intake: the worker thread and the shared state it
/// drains into.
pub struct Intake {
    tx: Sender<Group>,
    inflight: Arc<(Mutex<Inflight>, Condvar)>,
    buffer: Arc<Mutex<GroupingBuffer>>,
    _worker: JoinHandle<()>,
}

impl Intake {
    /// A cloneable handle shufflers use to deliver groups.
    pub fn handle(&self) -> PartitionHandle {
        PartitionHandle {
            tx: self.tx.clone(),
            inflight: self.inflight.clone(),
        }
    }

    /// Blocks until every group sent through a handle of this intake has
    /// been merged into the grouping buffer.
    pub fn drain(&self) {
        let (lock, cvar) = &*self.inflight;
        let mut guard = lock.lock().unwrap();
        while guard.count > 0 {
            guard = cvar.wait(guard).unwrap();
        }
    }

    /// The grouping buffer, shared with the (now idle) worker thread.
    /// Safe to read without contention once `drain` has returned, since
    /// the worker only ever touches it while handling a group.
    pub fn buffer(&self) -> Arc<Mutex<GroupingBuffer>> {
        self.buffer.clone()
    }
}

/// Starts one daemon intake worker and returns its `Intake` handle. The
/// worker loops forever (§4.E: intake workers are never explicitly
/// stopped); it is safe to let it run until process exit.
pub fn spawn() -> Intake {
    let (tx, rx) = channel::<Group>();
    let buffer = Arc::new(Mutex::new(GroupingBuffer::new()));
    let inflight = Arc::new((Mutex::new(Inflight { count: 0 }), Condvar::new()));

    let worker_buffer = buffer.clone();
    let worker_inflight = inflight.clone();
    let worker = thread::spawn(move || {
        while let Ok(group) = rx.recv() {
            let mut n_lines = 0;
            let mut n_keys = 0;
            {
                let mut buf = worker_buffer.lock().unwrap();
                for (key, lines) in group {
                    n_keys += 1;
                    n_lines += lines.len();
                    buf.extend(key, lines);
                }
            }
            tracing::debug!(n_lines, n_keys, "intake accepted group");

            let (lock, cvar) = &*worker_inflight;
            let mut guard = lock.lock().unwrap();
            guard.count -= 1;
            if guard.count == 0 {
                cvar.notify_all();
            }
        }
    });

    Intake {
        tx,
        inflight,
        buffer,
        _worker: worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_waits_for_all_sent_groups() {
        let intake = spawn();
        let handle = intake.handle();

        let mut g1 = Group::new();
        g1.insert("a".to_string(), vec!["a\t1\n".to_string()]);
        let mut g2 = Group::new();
        g2.insert("a".to_string(), vec!["a\t2\n".to_string()]);
        g2.insert("b".to_string(), vec!["b\t1\n".to_string()]);

        handle.send(g1);
        handle.send(g2);
        intake.drain();

        let buffer = intake.buffer();
        let buf = buffer.lock().unwrap();
        let collected: Vec<(String, Vec<String>)> = buf
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].0, "a");
        assert_eq!(collected[0].1, vec!["a\t1\n".to_string(), "a\t2\n".to_string()]);
        assert_eq!(collected[1].0, "b");
    }
}
