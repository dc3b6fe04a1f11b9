use libregent::{Client, Method, RegentError, RequestOption};
use mockito::Matcher;

#[test]
fn test_version_matches_package() {
    assert_eq!(libregent::version(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_builder_rejects_bad_address() {
    assert!(matches!(
        Client::new("xwejknxw://jshnws"),
        Err(RegentError::Config { .. })
    ));
}

#[tokio::test]
async fn test_manifest_round_trip_with_bearer_auth() {
    let mut registry = mockito::Server::new_async().await;
    let mut auth = mockito::Server::new_async().await;

    let challenge = format!(
        r#"Bearer realm="{}/token",service="registry",scope="repository:library/alpine:pull""#,
        auth.url()
    );
    registry
        .mock("GET", "/v2/library/alpine/manifests/3.19")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("www-authenticate", &challenge)
        .create_async()
        .await;
    let manifest = registry
        .mock("GET", "/v2/library/alpine/manifests/3.19")
        .match_header("authorization", "Bearer pulltoken")
        .match_header("accept", "application/vnd.oci.image.manifest.v1+json")
        .with_status(200)
        .with_header("docker-content-digest", "sha256:abc")
        .with_body(r#"{"schemaVersion":2,"layers":[]}"#)
        .expect(1)
        .create_async()
        .await;
    let token = auth
        .mock("GET", "/token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("service".into(), "registry".into()),
            Matcher::UrlEncoded("scope".into(), "repository:library/alpine:pull".into()),
        ]))
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"token":"pulltoken","expires_in":300}"#)
        .expect(1)
        .create_async()
        .await;

    let client = Client::builder(registry.url())
        .default_name("library/alpine")
        .build()
        .unwrap();
    let mut req = client.new_request(
        Method::GET,
        "/v2/<name>/manifests/<reference>",
        [RequestOption::reference("3.19")],
    );
    req.set_header("Accept", "application/vnd.oci.image.manifest.v1+json");

    let resp = client.execute(req).await.unwrap();

    assert!(resp.is_success());
    assert_eq!(resp.header("docker-content-digest"), Some("sha256:abc"));
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["schemaVersion"], 2);
    manifest.assert_async().await;
    token.assert_async().await;
}

#[tokio::test]
async fn test_upload_location_and_error_body() {
    let mut registry = mockito::Server::new_async().await;
    let location = format!("{}/v2/testname/blobs/uploads/f0ca5d12?_state=abc", registry.url());

    registry
        .mock("POST", "/v2/testname/blobs/uploads/")
        .with_status(202)
        .with_header("location", &location)
        .create_async()
        .await;
    registry
        .mock("PUT", "/v2/testname/blobs/uploads/f0ca5d12")
        .match_query(Matcher::UrlEncoded("digest".into(), "sha256:bad".into()))
        .with_status(400)
        .with_body(r#"{"errors":[{"code":"DIGEST_INVALID","message":"provided digest did not match uploaded content"}]}"#)
        .create_async()
        .await;

    let client = Client::builder(registry.url())
        .default_name("testname")
        .build()
        .unwrap();

    let resp = client
        .execute(client.new_request(Method::POST, "/v2/<name>/blobs/uploads/", []))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 202);
    assert_eq!(
        resp.relative_location(),
        "/v2/testname/blobs/uploads/f0ca5d12?_state=abc"
    );

    let mut req = client.new_request(
        Method::PUT,
        "/v2/<name>/blobs/uploads/<session_id>",
        [RequestOption::session_id("f0ca5d12")],
    );
    req.set_query_param("digest", "sha256:bad").set_body("data");
    let resp = client.execute(req).await.unwrap();

    let errors = resp.errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, "DIGEST_INVALID");
    assert!(matches!(
        resp.check_status(),
        Err(RegentError::UnexpectedStatus { status_code: 400, .. })
    ));
}

#[tokio::test]
async fn test_invalid_request_never_reaches_registry() {
    let mut registry = mockito::Server::new_async().await;
    let mock = registry
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = Client::new(&registry.url()).unwrap();
    let req = client.new_request(Method::GET, "/v2/<name>/tags/list", []);

    let err = client.execute(req).await.unwrap_err();
    assert!(err.is_pre_dispatch());
    mock.assert_async().await;
}
