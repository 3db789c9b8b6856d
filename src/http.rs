//! Shared HTTP plumbing for the SaaS API clients.

use std::time::Duration;

/// Header carrying the session access token on integration API calls.
pub const SF_TOKEN_HEADER: &str = "X-SF-TOKEN";

const BODY_SNIPPET_CHARS: usize = 200;

/// Build the HTTP client shared by the session and integration clients.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Default API base for a realm, e.g. `https://api.us1.signalfx.com`.
pub fn realm_api_base(realm: &str) -> String {
    format!("https://api.{}.signalfx.com", realm)
}

/// Join an API base and a path without doubling slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Truncate an upstream response body before it is carried inside an error.
pub(crate) fn body_snippet(body: String) -> String {
    if body.chars().count() > BODY_SNIPPET_CHARS {
        let truncated: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{}...", truncated)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_base_uses_signalfx_host() {
        assert_eq!(realm_api_base("us1"), "https://api.us1.signalfx.com");
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("http://127.0.0.1:8080/", "/v2/session"),
            "http://127.0.0.1:8080/v2/session"
        );
        assert_eq!(
            endpoint("https://api.eu0.signalfx.com", "v2/integration/abc"),
            "https://api.eu0.signalfx.com/v2/integration/abc"
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(450);
        let snippet = body_snippet(body);
        assert_eq!(snippet.len(), 203);
        assert!(snippet.ends_with("..."));

        assert_eq!(body_snippet("short".to_string()), "short");
    }
}
