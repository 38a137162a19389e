//! Router configuration.

use serde::{Deserialize, Serialize};

/// Settings fixed at build time.
///
/// Deserializable so hosts can keep it next to the rest of their settings:
///
/// ```rust
/// use llmbridge_core::RouterConfig;
///
/// let config: RouterConfig = llmbridge_core::serde_json::from_str(r#"{ "qualify_names": true }"#).unwrap();
/// assert_eq!(config.name_separator, "-");
/// assert!(config.catch_panics);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Publish functions as `<service><separator><method>`.
    pub qualify_names: bool,
    pub name_separator: String,
    /// Turn a panicking method into a failure string instead of unwinding
    /// through the router.
    pub catch_panics: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            qualify_names: false,
            name_separator: "-".to_string(),
            catch_panics: true,
        }
    }
}

impl RouterConfig {
    pub fn qualified() -> Self {
        Self {
            qualify_names: true,
            ..Self::default()
        }
    }

    pub(crate) fn public_name(&self, service: &str, method: &str) -> String {
        if self.qualify_names {
            format!("{service}{}{method}", self.name_separator)
        } else {
            method.to_string()
        }
    }
}
