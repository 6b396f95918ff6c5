//! Request compiler - turns a saved request plus variable scopes into a wire-ready request
//!
//! Compilation is pure and infallible. Anything the transport cannot accept
//! (bad URL, invalid header name) is rejected later, at send time.

use base64::Engine;

use crate::constants::{APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE, FORM_URLENCODED};
use crate::models::{ApiKeyLocation, ApiRequest, AuthConfig, BodyKind, HttpMethod, KeyValuePair};
use crate::variables::VariableScopes;

/// Insertion-ordered header map with last-wins assignment.
///
/// Names compare ASCII case-insensitively. Re-setting a name keeps its original
/// position and takes the newer spelling and value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Body payload of a compiled request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompiledBody {
    /// Sent verbatim (json, raw, urlencoded)
    Text(String),
    /// Multipart text fields; the transport writes the boundary header itself
    Multipart(Vec<(String, String)>),
}

/// A request ready for the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<CompiledBody>,
}

impl CompiledRequest {
    pub fn body_text(&self) -> Option<&str> {
        match &self.body {
            Some(CompiledBody::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Resolve the enabled, keyed rows of a list into `(key, value)` pairs, in list order
fn active_pairs(items: &[KeyValuePair], scopes: &VariableScopes) -> Vec<(String, String)> {
    items
        .iter()
        .filter(|item| item.is_active())
        .map(|item| (scopes.resolve_owned(&item.key), scopes.resolve_owned(&item.value)))
        .collect()
}

/// Percent-encode pairs as `k=v&k=v` (spaces become `%20`)
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn append_query(url: &mut String, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&encode_pairs(pairs));
}

/// Compile a request. Order matters: url, explicit headers, auth, body.
pub fn compile(request: &ApiRequest, scopes: &VariableScopes) -> CompiledRequest {
    // URL with query params
    let mut url = scopes.resolve_owned(&request.url);
    let mut query = active_pairs(&request.params, scopes);
    if let AuthConfig::ApiKey {
        key,
        value,
        add_to: ApiKeyLocation::Query,
    } = &request.auth
    {
        if !key.is_empty() {
            query.push((scopes.resolve_owned(key), scopes.resolve_owned(value)));
        }
    }
    append_query(&mut url, &query);

    // Explicit headers
    let mut headers = HeaderMap::new();
    for (key, value) in active_pairs(&request.headers, scopes) {
        headers.set(key, value);
    }

    // Auth overrides explicit headers of the same name
    match &request.auth {
        AuthConfig::Bearer { token } if !token.is_empty() => {
            headers.set(AUTHORIZATION, format!("Bearer {}", scopes.resolve(token)));
        }
        AuthConfig::Basic { username, password } => {
            let credentials = format!("{}:{}", scopes.resolve(username), scopes.resolve(password));
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            headers.set(AUTHORIZATION, format!("Basic {}", encoded));
        }
        AuthConfig::ApiKey {
            key,
            value,
            add_to: ApiKeyLocation::Header,
        } => {
            // An empty name is passed on so the send fails instead of silently dropping auth
            headers.set(scopes.resolve_owned(key), scopes.resolve_owned(value));
        }
        _ => {}
    }

    // Body
    let body = if request.method.sends_body() {
        let body = &request.body;
        match body.kind {
            BodyKind::None => None,
            BodyKind::Json if !body.raw.is_empty() => {
                headers.set(CONTENT_TYPE, APPLICATION_JSON);
                Some(CompiledBody::Text(scopes.resolve_owned(&body.raw)))
            }
            BodyKind::Raw if !body.raw.is_empty() => {
                Some(CompiledBody::Text(scopes.resolve_owned(&body.raw)))
            }
            BodyKind::Json | BodyKind::Raw => None,
            BodyKind::FormData => Some(CompiledBody::Multipart(active_pairs(&body.form_data, scopes))),
            BodyKind::UrlEncoded => {
                headers.set(CONTENT_TYPE, FORM_URLENCODED);
                let pairs = active_pairs(&body.urlencoded, scopes);
                Some(CompiledBody::Text(encode_pairs(&pairs)))
            }
        }
    } else {
        None
    };

    tracing::debug!(
        method = %request.method,
        url = %url,
        headers = headers.len(),
        has_body = body.is_some(),
        "Compiled request"
    );

    CompiledRequest {
        method: request.method,
        url,
        headers,
        body,
    }
}
