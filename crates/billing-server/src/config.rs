//! Server Configuration

/// Process-level settings read at startup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub app_url: String,
}

impl ServerConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:3000";
    pub const DEFAULT_APP_URL: &'static str = "http://localhost:3000";

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `BIND_ADDR` and `NEXT_PUBLIC_APP_URL`, with local defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |var: &str, default: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            bind_addr: read("BIND_ADDR", Self::DEFAULT_BIND_ADDR),
            app_url: read("NEXT_PUBLIC_APP_URL", Self::DEFAULT_APP_URL)
                .trim_end_matches('/')
                .to_string(),
        }
    }
}
