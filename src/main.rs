//! Binary entry point (§4.I): dispatches to one of four modes in
//! priority order — serve, send, task, or a local in-process job.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser};

use localmr::cli::Cli;
use localmr::client;
use localmr::controller;
use localmr::gpfs::Gpfs;
use localmr::http_server;
use localmr::parameters::JobParameters;

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.serve {
        let fs_store = Arc::new(Gpfs::new());
        return http_server::serve(fs_store).context("http server failed");
    }

    if let Some(command) = &cli.send {
        let resp = client::send_request(command).context("request failed")?;
        println!("{}", resp.status_line);
        println!("{}", resp.body);
        return Ok(());
    }

    if cli.task {
        let query = task_query(&cli);
        let resp = client::send_request(&query).context("request failed")?;
        println!("{}", resp.status_line);
        println!("{}", resp.body);
        return Ok(());
    }

    match (&cli.input, &cli.output) {
        (Some(_), Some(_)) => {
            let params = job_params_from_cli(&cli);
            let fs_store = Arc::new(Gpfs::new());
            controller::run(fs_store, &params).context("job failed")
        }
        _ => {
            Cli::command().print_help().ok();
            println!();
            Err(anyhow!("missing required --input/--output"))
        }
    }
}

/// Builds the `task?…` query string from recognised options, each key
/// keeping its literal `--` prefix so the server's arg lookup (§4.H)
/// matches what the original's `urllib.urlencode(optdict)` produced.
fn task_query(cli: &Cli) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    if let Some(v) = &cli.input {
        pairs.push(("--input", v));
    }
    if let Some(v) = &cli.output {
        pairs.push(("--output", v));
    }
    if let Some(v) = &cli.mapper {
        pairs.push(("--mapper", v));
    }
    if let Some(v) = &cli.reducer {
        pairs.push(("--reducer", v));
    }
    let num_reduce_tasks_str;
    if let Some(n) = cli.num_reduce_tasks {
        num_reduce_tasks_str = n.to_string();
        pairs.push(("--numReduceTasks", &num_reduce_tasks_str));
    }
    if let Some(v) = &cli.join_inputs {
        pairs.push(("--joinInputs", v));
    }

    let encoded: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("task?{}", encoded)
}

fn job_params_from_cli(cli: &Cli) -> JobParameters {
    let mut params = JobParameters::new(
        cli.input.clone().unwrap_or_default(),
        cli.output.clone().unwrap_or_default(),
        cli.mapper.clone().unwrap_or_default(),
    );
    if let Some(reducer) = &cli.reducer {
        params = params.set_reducer(reducer.clone());
    }
    if let Some(n) = cli.num_reduce_tasks {
        params = params.set_num_reduce_tasks(n);
    }
    params
}

/// Initializes structured logging from a standard verbosity environment
/// variable (§4.J), defaulting to informational level when unset. Inert
/// if called a second time (e.g. from tests that exercise `main`-level
/// helpers): `tracing_subscriber` simply reports the later attempt failed
/// and the first subscriber keeps running.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
