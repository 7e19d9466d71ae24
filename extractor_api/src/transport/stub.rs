use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::api::{FetchMethod, FetchRequest, FetchResponse, Transport};

/// Serves canned responses keyed by the exact URL, without touching the network.
/// Unknown URLs get a 404. Every request is recorded for later inspection.
#[derive(Default)]
pub struct StubTransport {
    responses: HashMap<String, FetchResponse>,
    failures: HashSet<String>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        StubTransport::default()
    }

    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.with_response(url, FetchResponse::ok(body))
    }

    pub fn with_response(mut self, url: &str, response: FetchResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Requests to `url` fail as if the connection broke
    pub fn with_failure(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.url.to_string())
            .collect()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let key = request.url.to_string();
        let is_head = request.method == FetchMethod::Head;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if self.failures.contains(&key) {
            bail!("connection reset by peer");
        }

        Ok(match self.responses.get(&key) {
            Some(response) => {
                let mut response = response.clone();
                if is_head {
                    response.body.clear();
                }
                response
            }
            None => FetchResponse {
                status: 404,
                ..Default::default()
            },
        })
    }
}
