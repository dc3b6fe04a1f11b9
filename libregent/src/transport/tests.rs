use super::mock::{MockTransport, response};
use super::*;
use mockito::Matcher;
use http::Method;

fn http_transport() -> HttpTransport {
    HttpTransport::new(&ClientConfig::new("http://localhost:5000")).unwrap()
}

#[test]
fn test_http_transport_new_with_defaults() {
    assert!(HttpTransport::new(&ClientConfig::new("http://localhost:5000")).is_ok());
}

#[test]
fn test_http_transport_new_insecure() {
    let mut config = ClientConfig::new("https://localhost:5000");
    config.insecure_skip_tls_verify = true;
    config.max_redirects = 0;
    assert!(HttpTransport::new(&config).is_ok());
}

#[test]
fn test_redact_hides_authorization() {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));

    let redacted = redact(&headers);
    assert!(redacted.contains(&("authorization".to_string(), "[REDACTED]".to_string())));
    assert!(redacted.contains(&("content-type".to_string(), "application/json".to_string())));
    assert!(!format!("{:?}", redacted).contains("secret"));
}

#[tokio::test]
async fn test_dispatch_rejects_unresolved_placeholder() {
    let transport = MockTransport::new(|_| Ok(response(200, &[], "")));
    let request = Request::new(Method::GET, "http://localhost:5000/v2/<name>/tags/list");

    let result = dispatch(&transport, &request, false).await;

    assert!(matches!(result, Err(RegentError::InvalidRequest { .. })));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_dispatch_rejects_double_slash() {
    let transport = MockTransport::new(|_| Ok(response(200, &[], "")));
    let request = Request::new(Method::GET, "http://localhost:5000//v2/");

    let result = dispatch(&transport, &request, true).await;

    assert!(matches!(result, Err(RegentError::InvalidRequest { .. })));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_dispatch_rejects_invalid_header() {
    let transport = MockTransport::new(|_| Ok(response(200, &[], "")));
    let mut request = Request::new(Method::GET, "http://localhost:5000/v2/");
    request.set_header("bad header", "value");

    let result = dispatch(&transport, &request, false).await;

    assert!(matches!(result, Err(RegentError::InvalidRequest { .. })));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_dispatch_passes_valid_request_through() {
    let transport = MockTransport::new(|_| Ok(response(202, &[("location", "/v2/a/blobs/uploads/1")], "")));
    let request = Request::new(Method::POST, "http://localhost:5000/v2/a/blobs/uploads/");

    let resp = dispatch(&transport, &request, true).await.unwrap();

    assert_eq!(resp.status().as_u16(), 202);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_http_transport_sends_headers_query_and_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/a/b/c")
        .match_header("content-range", "0-2")
        .match_header("content-type", "application/octet-stream")
        .match_query(Matcher::UrlEncoded("digest".into(), "xyz".into()))
        .match_body("abc")
        .with_status(201)
        .with_header("Location", "/a/b/c/done")
        .with_body("created")
        .create_async()
        .await;

    let mut request = Request::new(Method::PUT, format!("{}/a/b/c", server.url()));
    request
        .set_header("Content-Range", "0-2")
        .set_header("Content-Type", "application/octet-stream")
        .set_query_param("digest", "xyz")
        .set_body("abc");

    let resp = http_transport().execute(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.status().as_u16(), 201);
    assert_eq!(resp.text(), "created");
    assert_eq!(resp.header("location"), Some("/a/b/c/done"));
    assert!(resp.url().ends_with("/a/b/c?digest=xyz"));
}

#[tokio::test]
async fn test_http_transport_sends_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/x")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(serde_json::json!({"a": 1})))
        .with_status(200)
        .create_async()
        .await;

    let mut request = Request::new(Method::POST, format!("{}/v2/x", server.url()));
    request.set_json(&serde_json::json!({"a": 1})).unwrap();

    http_transport().execute(&request).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_transport_keeps_explicit_content_type_for_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/v2/x/manifests/latest")
        .match_header("content-type", "application/vnd.oci.image.manifest.v1+json")
        .with_status(201)
        .create_async()
        .await;

    let mut request = Request::new(Method::PUT, format!("{}/v2/x/manifests/latest", server.url()));
    request
        .set_header("Content-Type", "application/vnd.oci.image.manifest.v1+json")
        .set_json(&serde_json::json!({"schemaVersion": 2}))
        .unwrap();

    http_transport().execute(&request).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_transport_head_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/v2/alpine/manifests/latest")
        .with_status(200)
        .with_header("Docker-Content-Digest", "sha256:abc")
        .create_async()
        .await;

    let request = Request::new(
        Method::HEAD,
        format!("{}/v2/alpine/manifests/latest", server.url()),
    );
    let resp = http_transport().execute(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.header("docker-content-digest"), Some("sha256:abc"));
    assert!(resp.body().is_empty());
}

#[tokio::test]
async fn test_http_transport_connection_refused() {
    // Port 9 (discard) is closed on test hosts
    let request = Request::new(Method::GET, "http://127.0.0.1:9/v2/");
    let result = http_transport().execute(&request).await;

    match result {
        Err(RegentError::Transport { message, .. }) => assert!(message.contains("127.0.0.1:9")),
        other => panic!("Expected Transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_transport_sends_no_accept_by_default() {
    let mut server = mockito::Server::new_async().await;
    let bare = server
        .mock("GET", "/v2/")
        .match_header("accept", Matcher::Missing)
        .with_status(200)
        .create_async()
        .await;
    let fallback = server
        .mock("GET", "/v2/")
        .match_header("accept", Matcher::Any)
        .with_status(418)
        .expect(0)
        .create_async()
        .await;

    let request = Request::new(Method::GET, format!("{}/v2/", server.url()));
    let resp = http_transport().execute(&request).await.unwrap();

    bare.assert_async().await;
    fallback.assert_async().await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn test_http_transport_keeps_explicit_accept() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/alpine/manifests/latest")
        .match_header("accept", "application/vnd.oci.image.index.v1+json")
        .with_status(200)
        .create_async()
        .await;

    let mut request = Request::new(
        Method::GET,
        format!("{}/v2/alpine/manifests/latest", server.url()),
    );
    request.set_header("Accept", "application/vnd.oci.image.index.v1+json");

    http_transport().execute(&request).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_transport_follows_redirect() {
    let mut server = mockito::Server::new_async().await;
    let moved = server
        .mock("GET", "/v2/alpine/blobs/sha256:abc")
        .with_status(307)
        .with_header("Location", "/storage/abc")
        .create_async()
        .await;
    let storage = server
        .mock("GET", "/storage/abc")
        .match_header("authorization", "Bearer t")
        .with_status(200)
        .with_body("blob")
        .create_async()
        .await;

    let mut request = Request::new(
        Method::GET,
        format!("{}/v2/alpine/blobs/sha256:abc", server.url()),
    );
    request.set_bearer_auth("t");
    let resp = http_transport().execute(&request).await.unwrap();

    moved.assert_async().await;
    storage.assert_async().await;
    assert_eq!(resp.text(), "blob");
    assert!(resp.url().ends_with("/storage/abc"));
}

#[tokio::test]
async fn test_http_transport_see_other_switches_to_get() {
    let mut server = mockito::Server::new_async().await;
    let post = server
        .mock("POST", "/v2/alpine/blobs/uploads/")
        .with_status(303)
        .with_header("Location", "/v2/alpine/blobs/uploads/1")
        .create_async()
        .await;
    let get = server
        .mock("GET", "/v2/alpine/blobs/uploads/1")
        .match_header("content-type", Matcher::Missing)
        .match_body("")
        .with_status(204)
        .create_async()
        .await;

    let mut request = Request::new(
        Method::POST,
        format!("{}/v2/alpine/blobs/uploads/", server.url()),
    );
    request
        .set_header("Content-Type", "application/octet-stream")
        .set_body("abc");
    let resp = http_transport().execute(&request).await.unwrap();

    post.assert_async().await;
    get.assert_async().await;
    assert_eq!(resp.status().as_u16(), 204);
}

#[tokio::test]
async fn test_http_transport_redirect_to_other_host_drops_authorization() {
    let mut registry = mockito::Server::new_async().await;
    let mut storage = mockito::Server::new_async().await;
    let blob = storage
        .mock("GET", "/abc")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .create_async()
        .await;
    let moved = registry
        .mock("GET", "/v2/alpine/blobs/sha256:abc")
        .with_status(302)
        .with_header("Location", &format!("{}/abc", storage.url()))
        .create_async()
        .await;

    let mut request = Request::new(
        Method::GET,
        format!("{}/v2/alpine/blobs/sha256:abc", registry.url()),
    );
    request.set_bearer_auth("secret");
    let resp = http_transport().execute(&request).await.unwrap();

    moved.assert_async().await;
    blob.assert_async().await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn test_http_transport_redirect_limit() {
    let mut server = mockito::Server::new_async().await;
    let _loop = server
        .mock("GET", "/v2/")
        .with_status(301)
        .with_header("Location", "/v2/")
        .create_async()
        .await;

    let mut config = ClientConfig::new("http://localhost:5000");
    config.max_redirects = 2;
    let transport = HttpTransport::new(&config).unwrap();
    let request = Request::new(Method::GET, format!("{}/v2/", server.url()));

    match transport.execute(&request).await {
        Err(RegentError::Transport { message, .. }) => assert!(message.contains("Too many redirects")),
        other => panic!("Expected Transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_transport_redirect_without_location_is_returned() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/")
        .with_status(302)
        .create_async()
        .await;

    let request = Request::new(Method::GET, format!("{}/v2/", server.url()));
    let resp = http_transport().execute(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.status().as_u16(), 302);
}
