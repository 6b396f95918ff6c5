//! Integration tests for the reqwest transport against a local canned server.

mod common;

use common::{refused_url, serve_once};
use courier::{
    compile, normalize, AuthConfig, Config, HttpMethod, HttpTransport, KeyValuePair, RequestBody,
    ApiRequest, VariableScopes,
};
use courier::network::invoke;

const CREATED: &str = "HTTP/1.1 201 Created\r\n\
Content-Type: application/json\r\n\
Set-Cookie: a=1\r\n\
Set-Cookie: b=2\r\n\
Content-Length: 11\r\n\
Connection: close\r\n\
\r\n\
{\"ok\":true}";

const CUSTOM_REASON: &str =
    "HTTP/1.1 200 Everything Fine\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

const UNREGISTERED_STATUS: &str =
    "HTTP/1.1 499 Client Closed Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

const EMPTY_OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

fn transport() -> anyhow::Result<HttpTransport> {
    HttpTransport::new(&Config::default())
}

// =============================================================================
// Success path
// =============================================================================

#[tokio::test]
async fn test_response_is_normalized() -> anyhow::Result<()> {
    let (base, server) = serve_once(CREATED).await?;
    let globals = vec![KeyValuePair::new("base", base)];
    let scopes = VariableScopes::new(None, &globals);

    let mut request = ApiRequest::new()
        .with_method(HttpMethod::POST)
        .with_url("{{base}}/users");
    request.params.push(KeyValuePair::new("page", "2"));
    request.auth = AuthConfig::Bearer { token: "abc".into() };
    request.body = RequestBody::json(r#"{"name":"zoë"}"#);

    let invocation = invoke(&transport()?, compile(&request, &scopes)).await;
    let response = normalize(invocation.outcome, invocation.elapsed);

    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
    assert_eq!(response.headers["content-type"], "application/json");
    assert_eq!(response.headers["set-cookie"], "a=1, b=2");
    assert_eq!(response.body, "{\"ok\":true}");
    assert_eq!(response.size, 11);
    assert!(response.is_json());

    let seen = server.await??;
    let lower = seen.to_ascii_lowercase();
    assert!(seen.starts_with("POST /users?page=2 HTTP/1.1\r\n"), "{}", seen);
    assert!(lower.contains("authorization: bearer abc"));
    assert!(lower.contains("content-type: application/json"));
    assert!(seen.ends_with(r#"{"name":"zoë"}"#));
    Ok(())
}

#[tokio::test]
async fn test_urlencoded_body_on_the_wire() -> anyhow::Result<()> {
    let (base, server) = serve_once(EMPTY_OK).await?;
    let mut request = ApiRequest::new().with_method(HttpMethod::PUT).with_url(format!("{}/form", base));
    request.body = RequestBody::urlencoded(vec![
        KeyValuePair::new("a", "1 2"),
        KeyValuePair::new("b", "x"),
        KeyValuePair::new("skip", "me").disabled(),
    ]);

    let invocation = invoke(&transport()?, compile(&request, &VariableScopes::default())).await;
    let response = normalize(invocation.outcome, invocation.elapsed);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "");
    assert_eq!(response.size, 0);

    let seen = server.await??;
    assert!(seen
        .to_ascii_lowercase()
        .contains("content-type: application/x-www-form-urlencoded"));
    assert!(seen.ends_with("\r\n\r\na=1%202&b=x"), "{}", seen);
    Ok(())
}

#[tokio::test]
async fn test_status_text_comes_from_the_server() -> anyhow::Result<()> {
    for (canned, status, text) in [
        (CUSTOM_REASON, 200, "Everything Fine"),
        (UNREGISTERED_STATUS, 499, "Client Closed Request"),
        (EMPTY_OK, 200, "OK"),
    ] {
        let (base, server) = serve_once(canned).await?;
        let request = ApiRequest::new().with_url(base);
        let invocation = invoke(&transport()?, compile(&request, &VariableScopes::default())).await;
        let response = normalize(invocation.outcome, invocation.elapsed);
        assert_eq!(response.status, status);
        assert_eq!(response.status_text, text);
        server.await??;
    }
    Ok(())
}

#[tokio::test]
async fn test_form_data_body_on_the_wire() -> anyhow::Result<()> {
    let (base, server) = serve_once(EMPTY_OK).await?;
    let mut request = ApiRequest::new()
        .with_method(HttpMethod::POST)
        .with_url(format!("{}/upload", base));
    request.body = RequestBody::form_data(vec![
        KeyValuePair::new("title", "hello world"),
        KeyValuePair::new("skipped", "nope").disabled(),
        KeyValuePair::new("tag", "a"),
    ]);

    let invocation = invoke(&transport()?, compile(&request, &VariableScopes::default())).await;
    assert_eq!(normalize(invocation.outcome, invocation.elapsed).status, 200);

    let seen = server.await??;
    let lower = seen.to_ascii_lowercase();
    assert!(lower.contains("content-type: multipart/form-data; boundary="), "{}", seen);
    assert!(seen.contains("name=\"title\"\r\n\r\nhello world\r\n"), "{}", seen);
    assert!(seen.contains("name=\"tag\"\r\n\r\na\r\n"), "{}", seen);
    assert!(!seen.contains("skipped"));
    assert!(!seen.contains("nope"));
    Ok(())
}

#[tokio::test]
async fn test_api_key_in_query() -> anyhow::Result<()> {
    let (base, server) = serve_once(EMPTY_OK).await?;
    let mut request = ApiRequest::new().with_url(format!("{}/items?sort=asc", base));
    request.auth = AuthConfig::ApiKey {
        key: "api_key".into(),
        value: "s3cret".into(),
        add_to: courier::ApiKeyLocation::Query,
    };

    let invocation = invoke(&transport()?, compile(&request, &VariableScopes::default())).await;
    assert!(invocation.outcome.is_ok());

    let seen = server.await??;
    assert!(seen.starts_with("GET /items?sort=asc&api_key=s3cret HTTP/1.1\r\n"), "{}", seen);
    Ok(())
}

// =============================================================================
// Failure path
// =============================================================================

#[tokio::test]
async fn test_refused_connection_normalizes_to_status_zero() -> anyhow::Result<()> {
    let request = ApiRequest::new().with_url(refused_url().await?);
    let invocation = invoke(&transport()?, compile(&request, &VariableScopes::default())).await;
    let response = normalize(invocation.outcome, invocation.elapsed);

    assert_eq!(response.status, 0);
    assert_eq!(response.status_text, "Error");
    assert!(response.headers.is_empty());
    assert_eq!(response.size, 0);
    let body: serde_json::Value = serde_json::from_str(&response.body)?;
    assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
    Ok(())
}

#[tokio::test]
async fn test_unresolved_placeholder_url_fails_cleanly() -> anyhow::Result<()> {
    let request = ApiRequest::new().with_url("{{missing}}/users");
    let compiled = compile(&request, &VariableScopes::default());
    assert_eq!(compiled.url, "{{missing}}/users");

    let invocation = invoke(&transport()?, compiled).await;
    let response = normalize(invocation.outcome, invocation.elapsed);
    assert_eq!(response.status, 0);
    assert!(response.body.contains("Invalid request"), "{}", response.body);
    Ok(())
}

#[tokio::test]
async fn test_api_key_header_without_name_fails_the_send() -> anyhow::Result<()> {
    let mut request = ApiRequest::new().with_url("http://127.0.0.1:9/");
    request.auth = AuthConfig::ApiKey {
        key: String::new(),
        value: "s3cret".into(),
        add_to: courier::ApiKeyLocation::Header,
    };

    let invocation = invoke(&transport()?, compile(&request, &VariableScopes::default())).await;
    let response = normalize(invocation.outcome, invocation.elapsed);
    assert_eq!(response.status, 0);
    assert!(response.body.contains("Invalid request"), "{}", response.body);
    Ok(())
}
