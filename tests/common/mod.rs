//! Common test utilities and fixtures for qup integration tests
//!
//! This module consolidates frequently used test patterns to reduce
//! duplication: a thread-based fixture HTTP server the CLI binary can talk
//! to, and a builder for instructions documents.

// Allow dead code because these utilities are used across different test
// files and not every helper is used in every file
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

pub mod manifest_builder;

pub use manifest_builder::ManifestBuilder;

/// A blocking fixture HTTP server serving fixed path/body routes.
///
/// Runs on its own thread so both in-process clients and the spawned `qup`
/// binary can reach it. Routes can be updated between requests to simulate
/// a publisher pushing a new release.
pub struct TestServer {
    base_url: String,
    routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl TestServer {
    /// Starts the server on an ephemeral localhost port.
    pub fn start(routes: HashMap<String, Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture server");
        let addr = listener.local_addr().expect("fixture server address");
        let routes = Arc::new(Mutex::new(routes));
        let shared = Arc::clone(&routes);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let routes = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut buf = vec![0u8; 4096];
                    let n = stream.read(&mut buf).unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let body = routes.lock().unwrap().get(&path).cloned();
                    let response = match body {
                        Some(body) => {
                            let mut response = format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                body.len()
                            )
                            .into_bytes();
                            response.extend_from_slice(&body);
                            response
                        }
                        None => {
                            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                                .to_vec()
                        }
                    };
                    let _ = stream.write_all(&response);
                });
            }
        });

        Self { base_url: format!("http://{addr}"), routes }
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:49152`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a route path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Adds or replaces one route.
    pub fn set_route(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.routes.lock().unwrap().insert(path.to_string(), body.into());
    }

    /// Removes a route, turning it into a 404.
    pub fn remove_route(&self, path: &str) {
        self.routes.lock().unwrap().remove(path);
    }
}

/// Builds an `assert_cmd` command for the `qup` binary with an isolated
/// home directory.
pub fn qup_command(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("qup").expect("qup binary");
    cmd.arg("--home").arg(home);
    cmd
}
