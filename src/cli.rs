//! Long-option surface (§6, §4.I): one typed struct covering every mode
//! the binary supports.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "localmr", about = "Single-node streaming map-reduce engine")]
pub struct Cli {
    /// Start the HTTP control surface and block.
    #[arg(long)]
    pub serve: bool,

    /// Send a raw GET path to the control surface and print the response.
    #[arg(long)]
    pub send: Option<String>,

    /// Run the job over HTTP instead of in-process.
    #[arg(long)]
    pub task: bool,

    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub output: Option<String>,

    #[arg(long)]
    pub mapper: Option<String>,

    #[arg(long)]
    pub reducer: Option<String>,

    #[arg(long = "numReduceTasks")]
    pub num_reduce_tasks: Option<usize>,

    /// Reserved, unused (§9 open question 1).
    #[arg(long = "joinInputs")]
    pub join_inputs: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_local_job_options() {
        let cli = Cli::parse_from([
            "localmr",
            "--input",
            "in",
            "--output",
            "out",
            "--mapper",
            "cat",
            "--numReduceTasks",
            "4",
        ]);
        assert_eq!(cli.input, Some("in".to_string()));
        assert_eq!(cli.output, Some("out".to_string()));
        assert_eq!(cli.num_reduce_tasks, Some(4));
        assert!(!cli.serve);
        assert!(!cli.task);
    }

    #[test]
    fn parses_send_mode() {
        let cli = Cli::parse_from(["localmr", "--send", "ls"]);
        assert_eq!(cli.send, Some("ls".to_string()));
    }
}
