//! Test support: a scripted transport with request logging.
//!
//! Scripts are matched by URL suffix and consumed FIFO per path, so a test
//! can stage "401, then 200" for the same endpoint. An optional settle
//! delay keeps a response pending long enough for concurrent callers to
//! pile up on the refresh gate. Unscripted requests answer 599 so a test
//! that under-scripts fails loudly instead of hanging.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::transport::{ApiRequest, ApiTransport, Body, RawResponse, TransportError};

struct Script {
    path: String,
    status: u16,
    body: String,
    delay_ms: u64,
    network_error: bool,
}

pub(crate) struct FakeTransport {
    scripts: Mutex<VecDeque<Script>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, path: &str, status: u16, body: &str) {
        self.push(path, status, body, 0, false);
    }

    pub fn script_delayed(&self, path: &str, status: u16, body: &str, delay_ms: u64) {
        self.push(path, status, body, delay_ms, false);
    }

    pub fn script_network_error(&self, path: &str) {
        self.push(path, 0, "", 0, true);
    }

    fn push(&self, path: &str, status: u16, body: &str, delay_ms: u64, network_error: bool) {
        self.scripts.lock().unwrap().push_back(Script {
            path: path.to_string(),
            status,
            body: body.to_string(),
            delay_ms,
            network_error,
        });
    }

    pub fn total_calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(path))
            .count()
    }

    pub fn last_request_to(&self, path: &str) -> Option<ApiRequest> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.url.ends_with(path))
            .cloned()
    }

    /// JSON bodies of every logged request to `path`, oldest first.
    pub fn json_bodies_to(&self, path: &str) -> Vec<serde_json::Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(path))
            .filter_map(|request| match &request.body {
                Body::Json(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ApiTransport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());

        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts
                .iter()
                .position(|script| request.url.ends_with(&script.path))
                .and_then(|index| scripts.remove(index))
        };

        let Some(script) = script else {
            return Ok(RawResponse {
                status: 599,
                body: format!("unscripted request: {} {}", request.method.as_str(), request.url)
                    .into_bytes(),
            });
        };

        if script.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
        }
        if script.network_error {
            return Err(TransportError::Other(format!(
                "connection refused: {}",
                request.url
            )));
        }
        Ok(RawResponse {
            status: script.status,
            body: script.body.into_bytes(),
        })
    }
}
