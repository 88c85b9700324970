//! HTTP control surface (§4.H): a single-threaded server exposing the
//! GPFS store and job coordinator over plain GET requests.

use std::collections::HashMap;
use std::sync::Arc;

use tiny_http::{Header, Response, Server};

use crate::controller;
use crate::error::EngineError;
use crate::gpfs::Gpfs;
use crate::parameters::JobParameters;

/// `127.0.0.1:1969`, matching the original's fixed port.
pub const ADDRESS: &str = "127.0.0.1:1969";

/// Binds `ADDRESS` and serves requests forever. One request at a time,
/// on the calling thread: a `task` request runs the whole job before
/// the next request is accepted (§5 "single-threaded").
pub fn serve(fs_store: Arc<Gpfs>) -> std::io::Result<()> {
    let server = Server::http(ADDRESS).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, format!("could not bind {}: {}", ADDRESS, e))
    })?;
    tracing::info!(address = ADDRESS, "http server is running");

    for request in server.incoming_requests() {
        let method = request.method().as_str().to_string();
        let url = request.url().to_string();
        tracing::info!(method = %method, url = %url, "accepted request");
        handle(&fs_store, request);
    }
    Ok(())
}

fn handle(fs_store: &Arc<Gpfs>, request: tiny_http::Request) {
    let (op, args) = split_request(request.url());
    tracing::debug!(op = %op, n_args = args.len(), "dispatching request");

    let (status, content_type, body) = match op.as_str() {
        "ls" => match args.get("dir") {
            None => list_response("View listing", fs_store.list_dirs()),
            Some(dir) => list_response(&format!("Files in {}", dir), fs_store.list_files(dir)),
        },
        "append" => match (args.get("dir"), args.get("file"), args.get("line")) {
            (Some(dir), Some(file), Some(line)) => {
                fs_store.append(dir, file, line.clone());
                list_response(&format!("Appended to {}/{}", dir, file), vec![line.clone()])
            }
            _ => illegal_command(&op),
        },
        "cat" => match (args.get("dir"), args.get("file")) {
            (Some(dir), Some(file)) => match fs_store.cat(dir, file) {
                Ok(lines) => file_response(lines.join("\n")),
                Err(EngineError::NotFound { .. }) => illegal_command(&op),
                Err(e) => file_response(e.to_string()),
            },
            _ => illegal_command(&op),
        },
        "head" => match (args.get("dir"), args.get("file"), args.get("n")) {
            (Some(dir), Some(file), Some(n)) => match n.parse::<usize>() {
                Ok(n) => match fs_store.head(dir, file, n) {
                    Ok(lines) => file_response(lines.join("\n")),
                    Err(EngineError::NotFound { .. }) => illegal_command(&op),
                    Err(e) => file_response(e.to_string()),
                },
                Err(_) => illegal_command(&op),
            },
            _ => illegal_command(&op),
        },
        "tail" => match (args.get("dir"), args.get("file"), args.get("n")) {
            (Some(dir), Some(file), Some(n)) => match n.parse::<usize>() {
                Ok(n) => match fs_store.tail(dir, file, n) {
                    Ok(lines) => file_response(lines.join("\n")),
                    Err(EngineError::NotFound { .. }) => illegal_command(&op),
                    Err(e) => file_response(e.to_string()),
                },
                Err(_) => illegal_command(&op),
            },
            _ => illegal_command(&op),
        },
        "task" => run_task(fs_store, &args),
        other => list_response(&format!("Error: unknown command {}", other), vec![request.url().to_string()]),
    };

    tracing::info!(op = %op, status, "request handled");
    let header = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()).unwrap();
    let response = Response::from_string(body).with_status_code(status).with_header(header);
    let _ = request.respond(response);
}

fn run_task(fs_store: &Arc<Gpfs>, args: &HashMap<String, String>) -> (u16, &'static str, String) {
    let params = match job_params_from_args(args) {
        Ok(p) => p,
        Err(e) => return file_response(e),
    };

    let start = std::time::Instant::now();
    match controller::run(fs_store.clone(), &params) {
        Ok(()) => {
            let secs = start.elapsed().as_secs_f64();
            let stat = format!("Task performed in {:.2} sec", secs);
            tracing::info!(%stat);
            let items: Vec<String> = args.iter().map(|(k, v)| format!("(\"{}\", \"{}\")", k, v)).collect();
            list_response(&stat, items)
        }
        Err(e) => {
            tracing::error!(error = %e, "task failed");
            file_response(error_chain(&e))
        }
    }
}

/// Builds job parameters from a `task` request's args, keyed with the
/// original's literal `--`-prefixed option names (§4.I).
fn job_params_from_args(args: &HashMap<String, String>) -> Result<JobParameters, String> {
    let input = args.get("--input").ok_or_else(|| "illegal command".to_string())?;
    let output = args.get("--output").ok_or_else(|| "illegal command".to_string())?;
    let mapper = args.get("--mapper").cloned().unwrap_or_default();

    let mut params = JobParameters::new(input.clone(), output.clone(), mapper);
    if let Some(reducer) = args.get("--reducer") {
        params = params.set_reducer(reducer.clone());
    }
    if let Some(n) = args.get("--numReduceTasks") {
        if let Ok(n) = n.parse::<usize>() {
            params = params.set_num_reduce_tasks(n);
        }
    }
    Ok(params)
}

fn split_request(url: &str) -> (String, HashMap<String, String>) {
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, q),
        None => (url, ""),
    };
    let op = path.trim_start_matches('/').to_string();
    let args: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    (op, args)
}

fn illegal_command(op: &str) -> (u16, &'static str, String) {
    list_response("Error: illegal command", vec![op.to_string()])
}

fn list_response(title: &str, items: Vec<String>) -> (u16, &'static str, String) {
    let mut item_list = String::new();
    if !items.is_empty() {
        item_list.push_str("<ul>");
        for it in &items {
            item_list.push_str(&format!("<li>{}</li>", it));
        }
        item_list.push_str("</ul>");
    }
    let body = format!("<html><head>{0}</head>\n<body>\n{0}{1}\n</body></html>\n", title, item_list);
    (200, "text-html", body)
}

fn file_response(text: String) -> (u16, &'static str, String) {
    (200, "text-plain", text)
}

/// Full cause chain for a failed `task` request (§4.H, §4.K): the
/// original returns a Python traceback here, so this returns every
/// `source()` link instead of just the top-level message.
fn error_chain(err: &crate::error::EngineError) -> String {
    let mut lines = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        lines.push(format!("caused by: {}", e));
        source = e.source();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_op_and_args() {
        let (op, args) = split_request("/cat?dir=d&file=f");
        assert_eq!(op, "cat");
        assert_eq!(args.get("dir"), Some(&"d".to_string()));
        assert_eq!(args.get("file"), Some(&"f".to_string()));
    }

    #[test]
    fn op_without_query_has_no_args() {
        let (op, args) = split_request("/ls");
        assert_eq!(op, "ls");
        assert!(args.is_empty());
    }

    #[test]
    fn job_params_require_input_and_output() {
        let mut args = HashMap::new();
        args.insert("--mapper".to_string(), "cat".to_string());
        assert!(job_params_from_args(&args).is_err());

        args.insert("--input".to_string(), "in".to_string());
        args.insert("--output".to_string(), "out".to_string());
        let params = job_params_from_args(&args).unwrap();
        assert_eq!(params.input_dir, "in");
        assert_eq!(params.output_dir, "out");
        assert!(!params.is_map_reduce());
    }

    #[test]
    fn job_params_pick_up_reducer_and_partitions() {
        let mut args = HashMap::new();
        args.insert("--input".to_string(), "in".to_string());
        args.insert("--output".to_string(), "out".to_string());
        args.insert("--reducer".to_string(), "cat".to_string());
        args.insert("--numReduceTasks".to_string(), "4".to_string());
        let params = job_params_from_args(&args).unwrap();
        assert!(params.is_map_reduce());
        assert_eq!(params.num_reduce_tasks, 4);
    }

    #[test]
    fn unknown_file_lookup_is_illegal_command_not_raw_error() {
        let fs_store = Gpfs::new();
        let (status, content_type, body) = match fs_store.cat("nope", "x") {
            Ok(lines) => file_response(lines.join("\n")),
            Err(EngineError::NotFound { .. }) => illegal_command("cat"),
            Err(e) => file_response(e.to_string()),
        };
        assert_eq!(status, 200);
        assert_eq!(content_type, "text-html");
        assert!(body.contains("illegal command"));
        assert!(!body.contains("not found"));
    }

    #[test]
    fn list_and_file_responses_carry_distinct_content_types() {
        let (_, list_type, _) = list_response("t", vec![]);
        let (_, file_type, _) = file_response("x".to_string());
        assert_eq!(list_type, "text-html");
        assert_eq!(file_type, "text-plain");
    }
}
