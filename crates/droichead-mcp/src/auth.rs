use axum::http::{header, HeaderMap};

/// Exact-equality bearer check. The credential value is never logged.
///
/// Accepts only `Authorization: Bearer <secret>` with a byte-for-byte match;
/// a missing header, another scheme, or any mismatch rejects the request
/// before tool logic runs.
pub fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    match value.strip_prefix("Bearer ") {
        Some(token) => token == secret,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(value) = value {
            map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn exact_match_passes() {
        assert!(authorized(&headers(Some("Bearer s3cret")), "s3cret"));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(!authorized(&headers(None), "s3cret"));
    }

    #[test]
    fn wrong_scheme_is_rejected() {
        assert!(!authorized(&headers(Some("Basic s3cret")), "s3cret"));
    }

    #[test]
    fn prefix_match_is_not_enough() {
        assert!(!authorized(&headers(Some("Bearer s3cret-extra")), "s3cret"));
        assert!(!authorized(&headers(Some("Bearer s3cre")), "s3cret"));
    }
}
