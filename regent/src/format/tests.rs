use super::*;
use libregent::HeaderMap;

fn response(status: u16, headers: &[(&'static str, &'static str)], body: &str) -> Response {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(*name, value.parse().unwrap());
    }
    Response::new(
        StatusCode::from_u16(status).unwrap(),
        map,
        body.as_bytes().to_vec(),
        "http://localhost:5000/v2/",
    )
}

#[test]
fn test_color_choice_from_string() {
    assert_eq!(ColorChoice::from("always"), ColorChoice::Always);
    assert_eq!(ColorChoice::from("NEVER"), ColorChoice::Never);
    assert_eq!(ColorChoice::from("auto"), ColorChoice::Auto);
    assert_eq!(ColorChoice::from("invalid"), ColorChoice::Auto);
}

#[test]
fn test_color_choice_enabled() {
    assert!(ColorChoice::Always.enabled());
    assert!(!ColorChoice::Never.enabled());
}

#[test]
fn test_status_line_plain() {
    assert_eq!(status_line(StatusCode::OK, false), "HTTP 200 OK");
    assert_eq!(status_line(StatusCode::NOT_FOUND, false), "HTTP 404 Not Found");
}

#[test]
fn test_status_line_colored_keeps_text() {
    let line = status_line(StatusCode::UNAUTHORIZED, true);
    assert!(line.contains("HTTP 401 Unauthorized"));
    assert_ne!(line, "HTTP 401 Unauthorized");
}

#[test]
fn test_header_lines() {
    let resp = response(200, &[("docker-content-digest", "sha256:abc")], "");
    assert_eq!(header_lines(&resp, false), vec!["docker-content-digest: sha256:abc"]);
}

#[test]
fn test_location_line() {
    let resp = response(202, &[("location", "/v2/a/blobs/uploads/1")], "");
    assert_eq!(
        location_line(&resp, false).as_deref(),
        Some("Location: /v2/a/blobs/uploads/1")
    );
    assert_eq!(location_line(&response(200, &[], ""), false), None);
}

#[test]
fn test_error_lines() {
    let resp = response(
        404,
        &[],
        r#"{"errors":[{"code":"NAME_UNKNOWN","message":"repository name not known to registry"}]}"#,
    );
    assert_eq!(
        error_lines(&resp).unwrap(),
        vec!["  - NAME_UNKNOWN: repository name not known to registry"]
    );
}

#[test]
fn test_error_lines_malformed() {
    let err = error_lines(&response(500, &[], "oops")).unwrap_err();
    assert!(err.contains("no registry error list"));
}

#[test]
fn test_body_text_pretty_prints_json() {
    let text = body_text(br#"{"name":"alpine","tags":["latest"]}"#).unwrap();
    assert!(text.contains("\n"));
    assert!(text.contains("\"name\": \"alpine\""));
}

#[test]
fn test_body_text_plain_and_empty() {
    assert_eq!(body_text(b"not json").as_deref(), Some("not json"));
    assert_eq!(body_text(b""), None);
}

#[test]
fn test_failure_summary_success_is_none() {
    assert_eq!(failure_summary(&response(202, &[], "")), None);
}

#[test]
fn test_failure_summary_not_found() {
    assert_eq!(
        failure_summary(&response(404, &[], "")).as_deref(),
        Some("Not found: http://localhost:5000/v2/")
    );
}

#[test]
fn test_failure_summary_uses_registry_error() {
    let body = r#"{"errors":[{"code":"DENIED","message":"requested access to the resource is denied"}]}"#;
    let summary = failure_summary(&response(403, &[], body)).unwrap();
    assert!(summary.starts_with("Authentication error (status: 403)"));
    assert!(summary.contains("DENIED: requested access to the resource is denied"));
}

#[test]
fn test_failure_summary_rate_limit_with_retry_after() {
    let summary = failure_summary(&response(429, &[("retry-after", "30")], "")).unwrap();
    assert!(summary.starts_with("Rate limit:"));
    assert!(summary.ends_with("(retry after 30s)"));
}

#[test]
fn test_failure_summary_server_error_falls_back_to_body() {
    let summary = failure_summary(&response(502, &[], "bad gateway")).unwrap();
    assert!(summary.contains("Server error (status: 502)"));
    assert!(summary.ends_with("bad gateway"));
}
