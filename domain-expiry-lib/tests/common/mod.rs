//! Minimal in-process HTTP server for exercising the resolver end to end.
//!
//! Routes are exact paths. Every request is counted per path, and a route
//! carrying an `ETag` answers `304` to a matching `If-None-Match`.

#![allow(dead_code)]

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, body.to_string()).header("Content-Type", "application/rdap+json")
    }

    pub fn text<S: Into<String>>(status: u16, body: S) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn etag(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("etag"))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone)]
pub struct StubServer {
    base: String,
    routes: Arc<Mutex<HashMap<String, StubResponse>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Self {
            base: format!("http://{}", addr),
            routes: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(Mutex::new(HashMap::new())),
        };

        let handle = server.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handle = handle.clone();
                tokio::spawn(async move { handle.serve(stream).await });
            }
        });

        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn route(&self, path: &str, response: StubResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    async fn serve(&self, mut stream: TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }

        let request = String::from_utf8_lossy(&buf).to_string();
        let mut lines = request.lines();
        let path = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();
        let if_none_match = lines
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("if-none-match"))
            .map(|(_, value)| value.trim().to_string());

        *self.hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

        let route = self.routes.lock().unwrap().get(&path).cloned();
        let response = match route {
            Some(route) if route.etag().is_some() && route.etag() == if_none_match.as_deref() => {
                StubResponse {
                    status: 304,
                    headers: route
                        .headers
                        .iter()
                        .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
                        .cloned()
                        .collect(),
                    body: String::new(),
                }
            }
            Some(route) => route,
            None => StubResponse::text(404, ""),
        };

        let mut head = format!("HTTP/1.1 {} Stub\r\n", response.status);
        for (name, value) in &response.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            response.body.len()
        ));

        let _ = stream.write_all(head.as_bytes()).await;
        let _ = stream.write_all(response.body.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}
