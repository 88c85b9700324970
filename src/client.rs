//! HTTP client (§4.I): issues a single raw GET request against the
//! control surface and returns its status line and body, the way
//! `--send`/`--task` print what they got back.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use crate::http_server::ADDRESS;

/// One GET request/response round trip. `command` is the request
/// target, e.g. `"ls"` or `"task?--input=...&--output=..."` — it is
/// sent verbatim as the request line's path, already URL-encoded by
/// the caller.
pub fn send_request(command: &str) -> std::io::Result<Response> {
    let mut stream = TcpStream::connect(ADDRESS)?;
    write!(
        stream,
        "GET /{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        command.trim_start_matches('/'),
        ADDRESS
    )?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    let mut status_line = String::new();
    reader.read_line(&mut status_line)?;
    let status_line = status_line.trim_end().to_string();

    let mut content_length: Option<usize> = None;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        if header.trim().is_empty() {
            break;
        }
        if let Some(value) = header.strip_prefix("Content-Length:").or_else(|| header.strip_prefix("content-length:")) {
            content_length = value.trim().parse().ok();
        }
    }

    let mut body = String::new();
    match content_length {
        Some(n) => {
            let mut buf = vec![0u8; n];
            reader.read_exact(&mut buf)?;
            body = String::from_utf8_lossy(&buf).into_owned();
        }
        None => {
            reader.read_to_string(&mut body)?;
        }
    }

    Ok(Response { status_line, body })
}

/// A parsed HTTP response, printed by the caller rather than this module
/// so that `--send`/`--task` can format it identically.
pub struct Response {
    pub status_line: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpfs::Gpfs;
    use crate::http_server;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    #[ignore = "binds the fixed control-surface port; run serially"]
    fn round_trips_an_ls_request() {
        let fs_store = Arc::new(Gpfs::new());
        fs_store.append("d", "f", "x".to_string());
        thread::spawn(move || {
            let _ = http_server::serve(fs_store);
        });
        thread::sleep(Duration::from_millis(100));

        let resp = send_request("ls").unwrap();
        assert!(resp.status_line.contains("200"));
        assert!(resp.body.contains("View listing"));
    }
}
