//! HTTP search port using ureq (sync HTTP).
//!
//! POSTs the JSON query descriptor to
//! `{base_url}/ria-ws/application/module/{module}/search/` with basic auth and
//! decodes the JSON document in the response. Transport errors, `429` and
//! `5xx` are retried with exponential backoff; anything else fails at once.

use std::time::Duration;

use crate::config::RemoteConfig;
use crate::document::Document;
use crate::query::QueryDescriptor;

use super::SearchPort;
use super::error::{RemoteError, RemoteResult};

/// Longest response body quoted in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Search port talking to a live service.
pub struct HttpSearchPort {
    base_url: String,
    authorization: String,
    max_attempts: u32,
    backoff: Duration,
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpSearchPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSearchPort")
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl HttpSearchPort {
    /// Build a port from validated remote settings (does not connect yet).
    pub fn new(config: &RemoteConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout()).build();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: basic_auth(&config.user, &config.password),
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff(),
            agent,
        }
    }

    /// Search endpoint for one record type.
    pub fn search_url(&self, module: &str) -> String {
        format!("{}/ria-ws/application/module/{module}/search/", self.base_url)
    }

    fn attempt(&self, url: &str, query: &QueryDescriptor) -> Result<Document, Failure> {
        match self
            .agent
            .post(url)
            .set("Authorization", &self.authorization)
            .set("Accept", "application/json")
            .send_json(query)
        {
            Ok(resp) => resp
                .into_json::<Document>()
                .map_err(|e| Failure::Fatal(format!("failed to decode response: {e}"))),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let message = format!("HTTP {code}: {}", preview(&body));
                if is_retryable_status(code) {
                    Err(Failure::Retryable(message))
                } else {
                    Err(Failure::Fatal(message))
                }
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(Failure::Retryable(format!("transport error: {transport}")))
            }
        }
    }
}

enum Failure {
    Retryable(String),
    Fatal(String),
}

impl SearchPort for HttpSearchPort {
    fn search(&self, query: &QueryDescriptor) -> RemoteResult<Document> {
        let url = self.search_url(&query.module);
        let mut delay = self.backoff;

        for attempt in 1..=self.max_attempts {
            tracing::debug!(
                module = %query.module,
                offset = query.offset,
                limit = ?query.limit,
                attempt,
                "remote search"
            );
            match self.attempt(&url, query) {
                Ok(mut doc) => {
                    doc.ensure_set(&query.module);
                    return Ok(doc);
                }
                Err(Failure::Fatal(cause)) => {
                    return Err(RemoteError::failed(&query.module, cause));
                }
                Err(Failure::Retryable(cause)) if attempt < self.max_attempts => {
                    tracing::warn!(
                        module = %query.module,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        %cause,
                        "remote search failed, retrying"
                    );
                    std::thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
                Err(Failure::Retryable(cause)) => {
                    return Err(RemoteError::failed(
                        &query.module,
                        format!("{cause} (after {attempt} attempts)"),
                    ));
                }
            }
        }
        Err(RemoteError::failed(&query.module, "no attempt was made"))
    }
}

fn is_retryable_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

fn preview(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Build a basic HTTP Authorization header value.
fn basic_auth(user: &str, pass: &str) -> String {
    format!("Basic {}", base64_encode(format!("{user}:{pass}").as_bytes()))
}

/// Minimal base64 encoder (avoids adding a base64 crate dependency).
fn base64_encode(input: &[u8]) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut result = String::with_capacity(input.len().div_ceil(3) * 4);
    for chunk in input.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        result.push(CHARS[((triple >> 18) & 0x3F) as usize] as char);
        result.push(CHARS[((triple >> 12) & 0x3F) as usize] as char);
        if chunk.len() > 1 {
            result.push(CHARS[((triple >> 6) & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }
        if chunk.len() > 2 {
            result.push(CHARS[(triple & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }
    }
    result
}
