//! HTTP transport abstraction.
//!
//! The coordinator only needs two things from the network: open a streaming
//! GET and pull body chunks one at a time. Both are behind traits so tests can
//! script responses without a server.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;

use super::error::{DownloadError, DownloadResult};

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default timeout between body reads in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An open response whose body is read chunk by chunk.
pub trait ResponseBody: Send {
    /// Declared `Content-Length`, if the server sent one.
    fn content_length(&self) -> Option<u64>;

    /// Next body chunk, or `None` once the body is exhausted.
    fn next_chunk(&mut self) -> BoxFuture<'_, DownloadResult<Option<Bytes>>>;
}

/// Opens streaming GET requests.
///
/// Implementations must map connection problems to
/// [`DownloadError::NetworkFailure`] and non-2xx statuses to
/// [`DownloadError::RemoteError`].
pub trait HttpTransport: Send + Sync {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DownloadResult<Box<dyn ResponseBody>>>;
}

/// Transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default timeouts.
    pub fn new() -> DownloadResult<Self> {
        Self::with_timeouts(
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        )
    }

    /// Create a transport with custom timeouts.
    ///
    /// There is no overall request deadline: large files may take as long as
    /// they need provided data keeps arriving within `read_timeout`.
    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> DownloadResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(concat!("jnuexam/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::network("<client>", format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            connect_timeout,
            read_timeout,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl HttpTransport for ReqwestTransport {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DownloadResult<Box<dyn ResponseBody>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| describe_request_error(url, &e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DownloadError::RemoteError {
                    url: url.to_string(),
                    status_code: status.as_u16(),
                });
            }

            Ok(Box::new(ReqwestBody {
                url: url.to_string(),
                response,
            }) as Box<dyn ResponseBody>)
        })
    }
}

struct ReqwestBody {
    url: String,
    response: reqwest::Response,
}

impl ResponseBody for ReqwestBody {
    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    fn next_chunk(&mut self) -> BoxFuture<'_, DownloadResult<Option<Bytes>>> {
        Box::pin(async move {
            self.response
                .chunk()
                .await
                .map_err(|e| describe_request_error(&self.url, &e))
        })
    }
}

fn describe_request_error(url: &str, err: &reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        DownloadError::network(url, "timed out")
    } else if err.is_connect() {
        DownloadError::network(url, format!("connection failed: {}", err))
    } else {
        DownloadError::network(url, err)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;

    /// Canned response for one URL.
    #[derive(Debug, Clone, Default)]
    pub struct MockRoute {
        status: Option<u16>,
        chunks: Vec<Bytes>,
        content_length: Option<u64>,
        fail_after: Option<usize>,
        gate: Option<Arc<Notify>>,
    }

    impl MockRoute {
        /// A 200 response with a single-chunk body.
        pub fn body(data: &[u8]) -> Self {
            Self::split(data, 1)
        }

        /// A 200 response whose body arrives in `pieces` roughly equal chunks.
        pub fn split(data: &[u8], pieces: usize) -> Self {
            let size = data.len().div_ceil(pieces.max(1)).max(1);
            Self {
                chunks: data.chunks(size).map(Bytes::copy_from_slice).collect(),
                ..Self::default()
            }
        }

        /// A non-success status.
        pub fn status(code: u16) -> Self {
            Self {
                status: Some(code),
                ..Self::default()
            }
        }

        /// Declare the true body length.
        pub fn with_content_length(mut self) -> Self {
            self.content_length = Some(self.chunks.iter().map(|c| c.len() as u64).sum());
            self
        }

        /// Fail with a network error after `n` chunks.
        pub fn failing_after(mut self, n: usize) -> Self {
            self.fail_after = Some(n);
            self
        }

        /// Hold the first chunk until `gate` is notified.
        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<String, MockRoute>>,
        opened: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(&self, url: &str, route: MockRoute) {
            self.routes.lock().insert(url.to_string(), route);
        }

        /// URLs opened so far, in order.
        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().clone()
        }
    }

    impl HttpTransport for MockTransport {
        fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DownloadResult<Box<dyn ResponseBody>>> {
            Box::pin(async move {
                self.opened.lock().push(url.to_string());
                let route = self
                    .routes
                    .lock()
                    .get(url)
                    .cloned()
                    .ok_or_else(|| DownloadError::network(url, "connection refused"))?;

                if let Some(status_code) = route.status {
                    return Err(DownloadError::RemoteError {
                        url: url.to_string(),
                        status_code,
                    });
                }

                Ok(Box::new(MockBody {
                    url: url.to_string(),
                    chunks: route.chunks.into_iter().collect(),
                    content_length: route.content_length,
                    fail_after: route.fail_after,
                    gate: route.gate,
                    sent: 0,
                }) as Box<dyn ResponseBody>)
            })
        }
    }

    struct MockBody {
        url: String,
        chunks: VecDeque<Bytes>,
        content_length: Option<u64>,
        fail_after: Option<usize>,
        gate: Option<Arc<Notify>>,
        sent: usize,
    }

    impl ResponseBody for MockBody {
        fn content_length(&self) -> Option<u64> {
            self.content_length
        }

        fn next_chunk(&mut self) -> BoxFuture<'_, DownloadResult<Option<Bytes>>> {
            Box::pin(async move {
                if let Some(gate) = self.gate.take() {
                    gate.notified().await;
                }
                if self.fail_after == Some(self.sent) {
                    return Err(DownloadError::network(&self.url, "connection reset"));
                }
                self.sent += 1;
                Ok(self.chunks.pop_front())
            })
        }
    }
}
