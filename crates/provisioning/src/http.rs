//! Plain-text GET transport.
//!
//! Everything the protocol sends is a single unauthenticated GET whose
//! answer is a short text body. [`HttpGet`] is the seam; [`ReqwestHttp`]
//! is the real implementation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::ProvisionError;

/// A boxed future returned by [`HttpGet::get`].
pub type GetFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, ProvisionError>> + Send + 'a>>;

/// Status and body of a completed request.
///
/// The body is only read for `200 OK`; other statuses carry an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Issues a single GET with connect and read timeouts both set to `timeout`.
///
/// Implementations report elapsed timeouts as [`ProvisionError::Timeout`]
/// and every other failure as [`ProvisionError::Transport`]. A non-200
/// status is not an error at this layer.
pub trait HttpGet: Send + Sync + 'static {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> GetFuture<'a>;
}

/// [`HttpGet`] over `reqwest`, with one pooled client per distinct timeout.
#[derive(Default)]
pub struct ReqwestHttp {
    clients: Mutex<HashMap<Duration, reqwest::Client>>,
}

impl ReqwestHttp {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&timeout) {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        clients.insert(timeout, client.clone());
        Ok(client)
    }
}

impl HttpGet for ReqwestHttp {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> GetFuture<'a> {
        Box::pin(async move {
            let client = self
                .client_for(timeout)
                .map_err(|e| classify(url, timeout, e))?;
            let resp = client
                .get(url)
                .send()
                .await
                .map_err(|e| classify(url, timeout, e))?;

            let status = resp.status().as_u16();
            debug!(url = %url, status, "GET completed");

            let body = if status == 200 {
                resp.text().await.map_err(|e| classify(url, timeout, e))?
            } else {
                String::new()
            };
            Ok(HttpResponse { status, body })
        })
    }
}

/// Maps a `reqwest` failure onto the retry taxonomy.
fn classify(url: &str, timeout: Duration, err: reqwest::Error) -> ProvisionError {
    if err.is_timeout() {
        ProvisionError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        ProvisionError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// GETs `url` and returns its trimmed body, or [`ProvisionError::Http`] for
/// any status other than 200.
pub(crate) async fn get_ok_text(
    http: &dyn HttpGet,
    url: &str,
    timeout: Duration,
) -> Result<String, ProvisionError> {
    let resp = http.get(url, timeout).await?;
    if resp.status != 200 {
        return Err(ProvisionError::Http {
            url: url.to_string(),
            status: resp.status,
        });
    }
    Ok(resp.body.trim().to_string())
}
