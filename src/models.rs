use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{
    APPLICATION_JSON, DEFAULT_COLLECTION_NAME, DEFAULT_ENVIRONMENT_NAME, DEFAULT_REQUEST_NAME,
};

/// Generate a fresh random identifier
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current wall-clock time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
        }
    }

    /// Every method except GET carries the configured body
    pub fn sends_body(&self) -> bool {
        !matches!(self, HttpMethod::GET)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A toggleable key/value row used for headers, params, form fields and variables
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    pub id: String,
    pub key: String,
    pub value: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValuePair {
            id: generate_id(),
            key: key.into(),
            value: value.into(),
            enabled: true,
            description: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Only enabled rows with a non-empty key take part in compilation
    pub fn is_active(&self) -> bool {
        self.enabled && !self.key.is_empty()
    }
}

/// Where an API key is placed on the outgoing request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

/// Discriminant of [`AuthConfig`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthKind {
    None,
    Bearer,
    Basic,
    ApiKey,
}

/// Authentication settings of a request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthConfig {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
    ApiKey {
        key: String,
        value: String,
        #[serde(rename = "addTo", default)]
        add_to: ApiKeyLocation,
    },
}

impl AuthConfig {
    pub fn kind(&self) -> AuthKind {
        match self {
            AuthConfig::None => AuthKind::None,
            AuthConfig::Bearer { .. } => AuthKind::Bearer,
            AuthConfig::Basic { .. } => AuthKind::Basic,
            AuthConfig::ApiKey { .. } => AuthKind::ApiKey,
        }
    }

    /// Empty payload for the given kind
    pub fn empty(kind: AuthKind) -> Self {
        match kind {
            AuthKind::None => AuthConfig::None,
            AuthKind::Bearer => AuthConfig::Bearer {
                token: String::new(),
            },
            AuthKind::Basic => AuthConfig::Basic {
                username: String::new(),
                password: String::new(),
            },
            AuthKind::ApiKey => AuthConfig::ApiKey {
                key: String::new(),
                value: String::new(),
                add_to: ApiKeyLocation::Header,
            },
        }
    }

    /// Change the auth kind. A different kind discards the previous payload.
    pub fn switch_to(&mut self, kind: AuthKind) {
        if self.kind() != kind {
            *self = AuthConfig::empty(kind);
        }
    }
}

/// Discriminant of [`RequestBody`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "form-data")]
    FormData,
    #[serde(rename = "x-www-form-urlencoded")]
    UrlEncoded,
    #[serde(rename = "raw")]
    Raw,
}

/// Request body. `kind` selects what is sent; the editor buffers for the other
/// kinds are retained so toggling back and forth loses nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type")]
    pub kind: BodyKind,
    /// Shared by `json` and `raw`
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub form_data: Vec<KeyValuePair>,
    #[serde(default)]
    pub urlencoded: Vec<KeyValuePair>,
}

impl RequestBody {
    pub fn json(raw: impl Into<String>) -> Self {
        RequestBody {
            kind: BodyKind::Json,
            raw: raw.into(),
            ..Default::default()
        }
    }

    pub fn raw(raw: impl Into<String>) -> Self {
        RequestBody {
            kind: BodyKind::Raw,
            raw: raw.into(),
            ..Default::default()
        }
    }

    pub fn form_data(fields: Vec<KeyValuePair>) -> Self {
        RequestBody {
            kind: BodyKind::FormData,
            form_data: fields,
            ..Default::default()
        }
    }

    pub fn urlencoded(fields: Vec<KeyValuePair>) -> Self {
        RequestBody {
            kind: BodyKind::UrlEncoded,
            urlencoded: fields,
            ..Default::default()
        }
    }

    /// Change the body kind, keeping every buffer intact
    pub fn switch_to(&mut self, kind: BodyKind) {
        self.kind = kind;
    }
}

/// A saved, editable HTTP request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    pub id: String,
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValuePair>,
    #[serde(default)]
    pub params: Vec<KeyValuePair>,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_script: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ApiRequest {
    pub fn new() -> Self {
        let now = now_millis();
        ApiRequest {
            id: generate_id(),
            name: String::from(DEFAULT_REQUEST_NAME),
            method: HttpMethod::GET,
            url: String::new(),
            headers: Vec::new(),
            params: Vec::new(),
            body: RequestBody::default(),
            auth: AuthConfig::None,
            pre_request_script: None,
            test_script: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Status bucket used when presenting a response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
    /// Transport failure (status 0) or anything outside the HTTP ranges
    None,
}

/// Normalized response. Status 0 means no HTTP response was obtained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Elapsed wall-clock milliseconds
    pub time: u64,
    /// Byte length of `body`
    pub size: usize,
}

impl ApiResponse {
    pub fn is_failure(&self) -> bool {
        self.status == 0
    }

    /// Informational only, derived from the `content-type` header
    pub fn is_json(&self) -> bool {
        self.headers
            .get("content-type")
            .is_some_and(|ct| ct.contains(APPLICATION_JSON))
    }

    pub fn status_class(&self) -> StatusClass {
        match self.status {
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::None,
        }
    }

    /// Body re-indented when it parses as JSON, verbatim otherwise
    pub fn pretty_body(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
            .unwrap_or_else(|| self.body.clone())
    }
}

/// A named, ordered group of request ids
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requests: Vec<String>,
    #[serde(default)]
    pub folders: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Collection {
    pub fn new(name: Option<&str>) -> Self {
        let now = now_millis();
        Collection {
            id: generate_id(),
            name: name.unwrap_or(DEFAULT_COLLECTION_NAME).to_string(),
            requests: Vec::new(),
            folders: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named set of variables; at most one is active at a time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<KeyValuePair>,
    #[serde(default)]
    pub is_active: bool,
}

impl Environment {
    pub fn new(name: Option<&str>) -> Self {
        Environment {
            id: generate_id(),
            name: name.unwrap_or(DEFAULT_ENVIRONMENT_NAME).to_string(),
            variables: Vec::new(),
            is_active: false,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.push(KeyValuePair::new(key, value));
    }
}

/// History entry: the request as it was sent plus its outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub request: ApiRequest,
    pub response: Option<ApiResponse>,
    pub timestamp: i64,
}
