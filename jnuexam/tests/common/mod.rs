//! Scripted HTTP transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::Notify;

use jnuexam::download::{BoxFuture, DownloadError, DownloadResult, HttpTransport, ResponseBody};

/// How a scripted URL responds.
#[derive(Clone, Default)]
pub struct Script {
    status: Option<u16>,
    chunks: Vec<Bytes>,
    declare_length: bool,
    fail_after: Option<usize>,
    gate: Option<Arc<Notify>>,
}

impl Script {
    pub fn ok(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Bytes::copy_from_slice(c)).collect(),
            declare_length: true,
            ..Self::default()
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            status: Some(code),
            ..Self::default()
        }
    }

    pub fn without_length(mut self) -> Self {
        self.declare_length = false;
        self
    }

    pub fn fail_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    pub fn gated(mut self, gate: &Arc<Notify>) -> Self {
        self.gate = Some(Arc::clone(gate));
        self
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl HttpTransport for ScriptedTransport {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DownloadResult<Box<dyn ResponseBody>>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(url.to_string());
            let script = self.scripts.lock().unwrap().get(url).cloned().ok_or_else(|| {
                DownloadError::NetworkFailure {
                    url: url.to_string(),
                    reason: "no route to host".to_string(),
                }
            })?;

            if let Some(status_code) = script.status {
                return Err(DownloadError::RemoteError {
                    url: url.to_string(),
                    status_code,
                });
            }

            let length = script
                .declare_length
                .then(|| script.chunks.iter().map(|c| c.len() as u64).sum());

            Ok(Box::new(ScriptedBody {
                url: url.to_string(),
                chunks: script.chunks.into_iter().collect(),
                length,
                fail_after: script.fail_after,
                gate: script.gate,
                served: 0,
            }) as Box<dyn ResponseBody>)
        })
    }
}

struct ScriptedBody {
    url: String,
    chunks: VecDeque<Bytes>,
    length: Option<u64>,
    fail_after: Option<usize>,
    gate: Option<Arc<Notify>>,
    served: usize,
}

impl ResponseBody for ScriptedBody {
    fn content_length(&self) -> Option<u64> {
        self.length
    }

    fn next_chunk(&mut self) -> BoxFuture<'_, DownloadResult<Option<Bytes>>> {
        Box::pin(async move {
            if let Some(gate) = self.gate.take() {
                gate.notified().await;
            }
            if self.fail_after == Some(self.served) {
                return Err(DownloadError::NetworkFailure {
                    url: self.url.clone(),
                    reason: "connection reset by peer".to_string(),
                });
            }
            self.served += 1;
            Ok(self.chunks.pop_front())
        })
    }
}
