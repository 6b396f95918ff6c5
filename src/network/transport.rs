//! Transport invoker - one network attempt per send, timed end to end

use std::future::Future;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use thiserror::Error;

use crate::compiler::{CompiledBody, CompiledRequest};
use crate::config::Config;
use crate::models::HttpMethod;

/// Raw transport response, before normalization
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    /// Header pairs as received; repeated names appear more than once
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Any failure to obtain a full response: DNS, refused connection, malformed
/// URL or header, body read error
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
        }
    }
}

pub type TransportOutcome = Result<RawResponse, TransportError>;

/// Outcome of one invocation plus the wall-clock time it took
#[derive(Clone, Debug)]
pub struct Invocation {
    pub outcome: TransportOutcome,
    pub elapsed: Duration,
}

impl Invocation {
    pub fn failed(message: impl Into<String>) -> Self {
        Invocation {
            outcome: Err(TransportError::new(message)),
            elapsed: Duration::ZERO,
        }
    }
}

/// Issues a compiled request. Implementations make exactly one attempt and
/// read the whole body before returning.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: CompiledRequest) -> impl Future<Output = TransportOutcome> + Send;
}

/// Run one attempt and measure it, from just before issuing to after the body is read
pub async fn invoke<T: Transport>(transport: &T, request: CompiledRequest) -> Invocation {
    let start = Instant::now();
    let outcome = transport.execute(request).await;
    Invocation {
        outcome,
        elapsed: start.elapsed(),
    }
}

/// reqwest-backed transport. No timeout and no retries are configured.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(HttpTransport { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        HttpTransport { client }
    }

    fn build_request(&self, request: CompiledRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
        };

        // URL and header errors are deferred by reqwest until send()
        let mut req_builder = self.client.request(method, &request.url);
        for (name, value) in request.headers.iter() {
            req_builder = req_builder.header(name, value);
        }

        match request.body {
            Some(CompiledBody::Text(text)) => req_builder.body(text),
            Some(CompiledBody::Multipart(fields)) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (key, value)| {
                        form.text(key, value)
                    });
                req_builder.multipart(form)
            }
            None => req_builder,
        }
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_builder() {
        format!("Invalid request: {}", e)
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_body() || e.is_decode() {
        format!("Error reading body: {}", e)
    } else {
        format!("Request failed: {}", e)
    }
}

/// The reason phrase the server sent. hyper only keeps it when it differs
/// from the canonical one, so fall back to that.
fn reason_phrase(resp: &reqwest::Response) -> String {
    match resp.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => resp
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: CompiledRequest) -> TransportOutcome {
        let resp = self
            .build_request(request)
            .send()
            .await
            .map_err(|e| TransportError::new(describe(&e)))?;

        let status = resp.status();
        let status_text = reason_phrase(&resp);
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| TransportError::new(describe(&e)))?;
            body.extend_from_slice(&bytes);
        }

        Ok(RawResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body,
        })
    }
}
