use std::env;

pub const DEFAULT_BEARER: &str = "change-me";
pub const DEFAULT_PORT: u16 = 8080;

/// Process-wide configuration, read from the environment once at startup and
/// passed to components explicitly. Missing upstream settings are not fatal —
/// they are surfaced through the health/info endpoints instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_url: Option<String>,
    pub upstream_api_key: Option<String>,
    pub bearer_secret: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            upstream_url: non_empty(env::var("N8N_URL").ok())
                .map(|url| url.trim_end_matches('/').to_string()),
            upstream_api_key: non_empty(env::var("N8N_API_KEY").ok()),
            bearer_secret: non_empty(env::var("MCP_BEARER").ok())
                .unwrap_or_else(|| DEFAULT_BEARER.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn upstream_configured(&self) -> bool {
        self.upstream_url.is_some() && self.upstream_api_key.is_some()
    }

    /// True when the operator replaced the shipped placeholder secret.
    pub fn custom_bearer(&self) -> bool {
        self.bearer_secret != DEFAULT_BEARER
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_requires_both_url_and_key() {
        let config = Config {
            upstream_url: Some("http://localhost:5678".into()),
            upstream_api_key: None,
            bearer_secret: DEFAULT_BEARER.into(),
            port: DEFAULT_PORT,
        };
        assert!(!config.upstream_configured());

        let config = Config {
            upstream_api_key: Some("key".into()),
            ..config
        };
        assert!(config.upstream_configured());
    }

    #[test]
    fn empty_values_count_as_absent() {
        assert_eq!(non_empty(Some("".into())), None);
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some("x".into())), Some("x".to_string()));
    }
}
