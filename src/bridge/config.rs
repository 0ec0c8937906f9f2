use crate::event::ERROR_KIND;

/// Bridge configuration.
///
/// # Example
///
/// ```
/// use fanbridge::bridge::BridgeConfig;
///
/// let config = BridgeConfig::default().with_error_kind("source-fault");
/// assert_eq!(config.error_kind(), "source-fault");
/// ```
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    error_kind: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            error_kind: ERROR_KIND.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report receive failures under a kind other than
    /// [`ERROR_KIND`](crate::event::ERROR_KIND). Useful when an upstream
    /// already produces a domain event named `error`.
    #[must_use]
    pub fn with_error_kind(mut self, kind: impl Into<String>) -> Self {
        self.error_kind = kind.into();
        self
    }

    /// Resolve configuration from the environment, honoring a `.env` file
    /// when present. Recognized: `FANBRIDGE_ERROR_KIND`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(kind) = std::env::var("FANBRIDGE_ERROR_KIND") {
            if !kind.is_empty() {
                config.error_kind = kind;
            }
        }
        config
    }

    pub fn error_kind(&self) -> &str {
        &self.error_kind
    }
}
