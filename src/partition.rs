//! Shared type for the shuffler/intake boundary (§3 "Partition group").

use std::collections::HashMap;

/// One partition's contribution from a single mapper: key -> accumulated
/// lines, each already newline-terminated as read from the mapper's
/// stdout. Produced by one shuffler; consumed by one intake worker.
pub type Group = HashMap<String, Vec<String>>;
