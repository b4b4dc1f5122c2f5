use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote credentials. Stored as a singleton; an unsaved store reads as
/// empty url and token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Settings {
    pub url: String,
    pub token: String,
}

impl Settings {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.token.trim().is_empty()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let settings = Settings::new("https://demo.firefly-iii.org", "secret-token");
        let rendered = format!("{:?}", settings);
        assert!(rendered.contains("demo.firefly-iii.org"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn test_default_is_not_configured() {
        assert!(!Settings::default().is_configured());
        assert!(Settings::new("https://x", "t").is_configured());
    }
}
