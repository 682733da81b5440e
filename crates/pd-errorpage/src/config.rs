//! Error-page configuration with environment overrides.

use pd_core::BrowserError;
use pd_core::BrowserResult;
use pd_security::SecurityPolicy;

const DEFAULT_MAX_SUBSTITUTION_PASSES: usize = 8;
const HARD_MAX_SUBSTITUTION_PASSES: usize = 64;
const PROXY_ENV_VARS: &[&str] = &["PIXELDUST_HTTP_PROXY", "http_proxy"];
const MAX_PASSES_ENV_VAR: &str = "PIXELDUST_ERRORPAGE_MAX_PASSES";

const DEFAULT_STYLE: &str = "\
body { background-color: #ddd; margin: 0; padding: 0; display: flex; align-items: center; justify-content: center; }
#errorContainer { background: #fff; min-width: 35em; max-width: 35em; padding: 2.5em; border: 2px solid #aaa; border-radius: 5px; }
#errorTitleText { font-size: 120%; font-weight: bold; margin: 0 0 0 0.5em; }
.error-icon { font-size: 150%; }
#errorMessage { font-size: 90%; }
form { margin: 1em 0 0 0; text-align: right; }";

/// Settings consumed by the classifier and renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPageConfig {
    /// HTTP proxy named on generic error pages, if one is configured.
    pub proxy: Option<String>,
    /// Upper bound on template substitution passes.
    pub max_substitution_passes: usize,
    pub style: String,
    pub security: SecurityPolicy,
}

impl Default for ErrorPageConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            max_substitution_passes: DEFAULT_MAX_SUBSTITUTION_PASSES,
            style: DEFAULT_STYLE.to_owned(),
            security: SecurityPolicy::default(),
        }
    }
}

impl ErrorPageConfig {
    /// Defaults with `PIXELDUST_HTTP_PROXY`/`http_proxy` and
    /// `PIXELDUST_ERRORPAGE_MAX_PASSES` applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.proxy = PROXY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_owned())
            .find(|value| !value.is_empty());

        if let Some(raw) = lookup(MAX_PASSES_ENV_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(passes) => self.max_substitution_passes = passes,
                Err(error) => log::warn!(
                    "ignoring invalid {MAX_PASSES_ENV_VAR} value `{raw}`: {error}"
                ),
            }
        }
    }

    pub fn validate(&self) -> BrowserResult<()> {
        if self.max_substitution_passes == 0 {
            return Err(BrowserError::new(
                "errorpage.config.passes_invalid",
                "max_substitution_passes must be greater than zero",
            ));
        }

        if self.max_substitution_passes > HARD_MAX_SUBSTITUTION_PASSES {
            return Err(BrowserError::new(
                "errorpage.config.passes_too_large",
                format!(
                    "max_substitution_passes exceeds hard limit ({} > {HARD_MAX_SUBSTITUTION_PASSES})",
                    self.max_substitution_passes
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorPageConfig;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_validate() {
        let config = ErrorPageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.proxy, None);
    }

    #[test]
    fn pixeldust_proxy_wins_over_generic_variable() {
        let mut config = ErrorPageConfig::default();
        config.apply_overrides(lookup_from(&[
            ("http_proxy", "http://fallback:3128"),
            ("PIXELDUST_HTTP_PROXY", "http://proxy.local:8080"),
        ]));
        assert_eq!(config.proxy.as_deref(), Some("http://proxy.local:8080"));
    }

    #[test]
    fn blank_proxy_values_are_skipped() {
        let mut config = ErrorPageConfig::default();
        config.apply_overrides(lookup_from(&[
            ("PIXELDUST_HTTP_PROXY", "   "),
            ("http_proxy", "http://fallback:3128"),
        ]));
        assert_eq!(config.proxy.as_deref(), Some("http://fallback:3128"));
    }

    #[test]
    fn invalid_pass_override_keeps_default() {
        let mut config = ErrorPageConfig::default();
        config.apply_overrides(lookup_from(&[("PIXELDUST_ERRORPAGE_MAX_PASSES", "many")]));
        assert_eq!(config.max_substitution_passes, 8);
    }

    #[test]
    fn zero_passes_fail_validation() {
        let mut config = ErrorPageConfig::default();
        config.apply_overrides(lookup_from(&[("PIXELDUST_ERRORPAGE_MAX_PASSES", "0")]));
        let result = config.validate();
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "errorpage.config.passes_invalid");
        }
    }
}
