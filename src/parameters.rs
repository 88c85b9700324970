//! Parameters describing one map-reduce (or map-only) job.
//!
//! Follows the builder-method shape of the original in-process engine's
//! parameter struct: construct with the required fields, then chain
//! `set_*` calls for the optional ones.

/// Default partition count when `--numReduceTasks` is not given.
const DEFAULT_PARTITIONS: usize = 1;

#[derive(Clone, Debug)]
pub struct JobParameters {
    pub input_dir: String,
    pub output_dir: String,
    pub mapper: String,
    pub reducer: Option<String>,
    pub num_reduce_tasks: usize,
}

impl JobParameters {
    /// `mapper` defaults to `cat` if the caller passes an empty command,
    /// matching the original's `optdict.get('--mapper','cat')`.
    pub fn new(input_dir: String, output_dir: String, mapper: String) -> JobParameters {
        JobParameters {
            input_dir,
            output_dir,
            mapper: if mapper.is_empty() {
                "cat".to_string()
            } else {
                mapper
            },
            reducer: None,
            num_reduce_tasks: DEFAULT_PARTITIONS,
        }
    }

    /// Presence of a reducer command is what distinguishes a map-reduce
    /// job from a map-only one (§1).
    pub fn set_reducer(mut self, reducer: String) -> JobParameters {
        self.reducer = Some(reducer);
        self
    }

    pub fn set_num_reduce_tasks(mut self, n: usize) -> JobParameters {
        self.num_reduce_tasks = n.max(1);
        self
    }

    pub fn is_map_reduce(&self) -> bool {
        self.reducer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_map_only_with_one_partition() {
        let p = JobParameters::new("in".into(), "out".into(), "cat".into());
        assert!(!p.is_map_reduce());
        assert_eq!(p.num_reduce_tasks, 1);
    }

    #[test]
    fn builder_chain_sets_reducer_and_partitions() {
        let p = JobParameters::new("in".into(), "out".into(), "cat".into())
            .set_reducer("cat".into())
            .set_num_reduce_tasks(3);
        assert!(p.is_map_reduce());
        assert_eq!(p.num_reduce_tasks, 3);
    }

    #[test]
    fn zero_partitions_clamped_to_one() {
        let p = JobParameters::new("in".into(), "out".into(), "cat".into()).set_num_reduce_tasks(0);
        assert_eq!(p.num_reduce_tasks, 1);
    }
}
