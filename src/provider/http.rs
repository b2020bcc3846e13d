//! Shared HTTP client, SSE parsing, and auth utilities.

use std::sync::OnceLock;

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ParleyError, Result};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            })
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Build Anthropic-style headers (x-api-key).
pub fn anthropic_headers(api_key: &str, version: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(api_key) {
        headers.insert("x-api-key", val);
    }
    if let Ok(val) = HeaderValue::from_str(version) {
        headers.insert("anthropic-version", val);
    }
    headers
}

/// Sentinel payload that ends an OpenAI stream.
pub const SSE_DONE: &str = "[DONE]";

/// Parse an SSE "data:" line, returning the payload.
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> ParleyError {
    match status {
        401 | 403 => ParleyError::Authentication(body.to_string()),
        429 => ParleyError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ParleyError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    // Try to parse retry-after from JSON error body
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

/// POST a JSON body and return the response if its status is a success.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    url: &str,
    headers: HeaderMap,
    body: &B,
) -> Result<reqwest::Response> {
    let resp = shared_client()
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(status_to_error(status.as_u16(), &body_text));
    }
    Ok(resp)
}

/// Decode a successful response body.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Split a streaming response into SSE `data:` payloads.
///
/// Comment and event-name lines are skipped. The stream ends at EOF or at the
/// `[DONE]` sentinel.
pub(crate) fn sse_data_stream(resp: reqwest::Response) -> BoxStream<'static, Result<String>> {
    sse_payloads(resp.bytes_stream())
}

/// Line splitting behind [`sse_data_stream`], over any byte-chunk stream.
///
/// Bytes are buffered raw and a line is decoded only once its `\n` arrives, so
/// a multibyte character split across chunks stays intact.
pub(crate) fn sse_payloads<S, B, E>(byte_stream: S) -> BoxStream<'static, Result<String>>
where
    S: futures::Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ParleyError> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut done = false;
        futures::pin_mut!(byte_stream);

        'read: while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e.into());
                    break;
                }
            };

            buffer.extend_from_slice(chunk.as_ref());

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                let decoded = String::from_utf8_lossy(&raw);
                let line = decoded.trim();

                if line.is_empty() || line.starts_with(':') {
                    continue;
                }

                if let Some(data) = parse_sse_data(line) {
                    if data == SSE_DONE {
                        done = true;
                        break 'read;
                    }
                    yield Ok(data.to_string());
                }
            }
        }

        if !done {
            let tail = String::from_utf8_lossy(&buffer);
            if let Some(data) = parse_sse_data(tail.trim()) {
                if !data.is_empty() && data != SSE_DONE {
                    yield Ok(data.to_string());
                }
            }
        }
    };

    Box::pin(stream)
}

/// Parse each SSE payload as a `T`, skipping payloads that do not parse.
pub(crate) fn sse_json_stream<T>(resp: reqwest::Response) -> BoxStream<'static, Result<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    sse_data_stream(resp)
        .filter_map(|item| async move {
            match item {
                Ok(data) => match serde_json::from_str::<T>(&data) {
                    Ok(frame) => Some(Ok(frame)),
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unparseable stream frame");
                        None
                    }
                },
                Err(e) => Some(Err(e)),
            }
        })
        .boxed()
}
