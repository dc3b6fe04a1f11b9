//! Path templating for registry endpoints.
//!
//! Registry API paths are written as templates with the placeholders
//! `<name>`, `<reference>`, `<digest>` and `<session_id>`, for example
//! `/v2/<name>/manifests/<reference>`. This module substitutes the values a
//! request supplies and checks that a resolved URL is safe to dispatch.


/// Placeholder for the repository namespace.
pub const NAME: &str = "<name>";
/// Placeholder for a tag or digest reference.
pub const REFERENCE: &str = "<reference>";
/// Placeholder for a content digest.
pub const DIGEST: &str = "<digest>";
/// Placeholder for an upload session identifier.
pub const SESSION_ID: &str = "<session_id>";

/// All placeholders recognized in path templates.
pub const PLACEHOLDERS: [&str; 4] = [NAME, REFERENCE, DIGEST, SESSION_ID];

/// Values substituted into a path template.
///
/// A `None` (or empty) value leaves its placeholder in place, which makes the
/// resulting URL fail [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    pub name: Option<String>,
    pub reference: Option<String>,
    pub digest: Option<String>,
    pub session_id: Option<String>,
}

impl PathParams {
    fn pairs(&self) -> [(&'static str, Option<&str>); 4] {
        [
            (NAME, self.name.as_deref()),
            (REFERENCE, self.reference.as_deref()),
            (DIGEST, self.digest.as_deref()),
            (SESSION_ID, self.session_id.as_deref()),
        ]
    }
}

/// Substitutes every present parameter into `template`.
///
/// # Examples
///
/// ```
/// use libregent::path::{PathParams, render};
///
/// let params = PathParams {
///     name: Some("library/alpine".to_string()),
///     reference: Some("latest".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(
///     render("/v2/<name>/manifests/<reference>", &params),
///     "/v2/library/alpine/manifests/latest"
/// );
/// ```
pub fn render(template: &str, params: &PathParams) -> String {
    let mut path = template.to_string();
    for (placeholder, value) in params.pairs() {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            path = path.replace(placeholder, value);
        }
    }
    path
}

/// Joins a rendered path onto a base address.
///
/// The base is expected without a trailing slash; a single leading slash is
/// stripped from `path` so the two are joined by exactly one separator.
///
/// # Examples
///
/// ```
/// use libregent::path::join;
///
/// assert_eq!(join("http://localhost:5000", "/v2/"), "http://localhost:5000/v2/");
/// assert_eq!(join("http://localhost:5000", "v2/"), "http://localhost:5000/v2/");
/// ```
pub fn join(base: &str, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{}/{}", base, path)
}

/// Renders `template` with `params` and joins it onto `base`.
pub fn resolve(base: &str, template: &str, params: &PathParams) -> String {
    join(base, &render(template, params))
}

/// Checks a resolved URL before dispatch.
///
/// Returns a description of the first problem found: a placeholder that was
/// never substituted, or an empty path segment (`//`) after the authority.
///
/// # Examples
///
/// ```
/// use libregent::path::validate;
///
/// assert!(validate("http://localhost:5000/v2/alpine/tags/list").is_ok());
/// assert!(validate("http://localhost:5000/v2/<name>/tags/list").is_err());
/// assert!(validate("http://localhost:5000/v2//tags/list").is_err());
/// ```
pub fn validate(url: &str) -> std::result::Result<(), String> {
    if let Some(placeholder) = PLACEHOLDERS.iter().find(|p| url.contains(*p)) {
        return Err(format!("unresolved placeholder {}", placeholder));
    }

    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    if rest.contains("//") {
        return Err("path contains an empty segment".to_string());
    }

    Ok(())
}

/// Returns true if `url` passes [`validate`].
pub fn is_valid(url: &str) -> bool {
    validate(url).is_ok()
}
