pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod research;

pub mod config {
    use anyhow::Context;
    use secrecy::{ExposeSecret, SecretString};
    use std::fmt;
    use std::time::Duration;

    pub const DEFAULT_COMPANY_NAME: &str = "Apple Inc.";
    const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
    const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 20;

    /// Credential string. Never printed by `Debug`/`Display`.
    #[derive(Clone)]
    pub struct ApiKey(SecretString);

    impl ApiKey {
        pub fn new(key: impl Into<String>) -> Self {
            Self(SecretString::from(key.into()))
        }

        pub fn expose(&self) -> &str {
            self.0.expose_secret()
        }
    }

    impl fmt::Debug for ApiKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("ApiKey(<redacted>)")
        }
    }

    impl fmt::Display for ApiKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("<redacted>")
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub company_name: String,
        pub llm_provider: Option<String>,
        pub anthropic_api_key: Option<ApiKey>,
        pub anthropic_base_url: Option<String>,
        pub anthropic_model: Option<String>,
        pub anthropic_max_tokens: Option<u32>,
        pub openai_api_key: Option<ApiKey>,
        pub openai_base_url: Option<String>,
        pub openai_model: Option<String>,
        pub tavily_api_key: Option<ApiKey>,
        pub tavily_base_url: Option<String>,
        pub tavily_max_results: Option<u32>,
        pub llm_timeout: Duration,
        pub search_timeout: Duration,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                company_name: non_empty_var("COMPANY_NAME")
                    .unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string()),
                llm_provider: non_empty_var("LLM_PROVIDER"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY").map(ApiKey::new),
                anthropic_base_url: non_empty_var("ANTHROPIC_BASE_URL"),
                anthropic_model: non_empty_var("ANTHROPIC_MODEL"),
                anthropic_max_tokens: parsed_var("ANTHROPIC_MAX_TOKENS")?,
                openai_api_key: non_empty_var("OPENAI_API_KEY").map(ApiKey::new),
                openai_base_url: non_empty_var("OPENAI_BASE_URL"),
                openai_model: non_empty_var("OPENAI_MODEL"),
                tavily_api_key: non_empty_var("TAVILY_API_KEY").map(ApiKey::new),
                tavily_base_url: non_empty_var("TAVILY_BASE_URL"),
                tavily_max_results: parsed_var("TAVILY_MAX_RESULTS")?,
                llm_timeout: Duration::from_secs(
                    parsed_var("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
                ),
                search_timeout: Duration::from_secs(
                    parsed_var("SEARCH_TIMEOUT_SECS")?.unwrap_or(DEFAULT_SEARCH_TIMEOUT_SECS),
                ),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        /// Settings with no credentials configured; handy as a base in tests.
        pub fn empty(company_name: impl Into<String>) -> Self {
            Self {
                company_name: company_name.into(),
                llm_provider: None,
                anthropic_api_key: None,
                anthropic_base_url: None,
                anthropic_model: None,
                anthropic_max_tokens: None,
                openai_api_key: None,
                openai_base_url: None,
                openai_model: None,
                tavily_api_key: None,
                tavily_base_url: None,
                tavily_max_results: None,
                llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
                search_timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
                sentry_dsn: None,
            }
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&ApiKey> {
            self.anthropic_api_key
                .as_ref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&ApiKey> {
            self.openai_api_key
                .as_ref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_tavily_api_key(&self) -> anyhow::Result<&ApiKey> {
            self.tavily_api_key
                .as_ref()
                .context("TAVILY_API_KEY is required")
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T>(name: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        non_empty_var(name)
            .map(|s| {
                s.parse::<T>()
                    .with_context(|| format!("{name} must be a valid number (got {s:?})"))
            })
            .transpose()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn api_key_is_redacted_in_debug_and_display() {
            let key = ApiKey::new("sk-very-secret");
            assert_eq!(format!("{key:?}"), "ApiKey(<redacted>)");
            assert_eq!(key.to_string(), "<redacted>");
            assert_eq!(key.expose(), "sk-very-secret");

            let mut settings = Settings::empty("Acme");
            settings.openai_api_key = Some(key);
            assert!(!format!("{settings:?}").contains("sk-very-secret"));
        }

        #[test]
        fn require_names_missing_variable() {
            let settings = Settings::empty("Acme");
            let err = settings.require_tavily_api_key().unwrap_err();
            assert!(err.to_string().contains("TAVILY_API_KEY"));
        }
    }
}
