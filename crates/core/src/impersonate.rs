//! Browser impersonation targets.
//!
//! Targets follow the `<family>[<version>]` naming used by browser
//! fingerprinting tools, e.g. `chrome`, `chrome124`, `safari17_0`,
//! `safari_ios`, `firefox133`. Only the family decides which header bundle the
//! transport sends; the version suffix is kept verbatim for logging.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default impersonation target.
pub const DEFAULT_IMPERSONATE: &str = "chrome";

/// Browser family of an impersonation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserFamily {
    Chrome,
    ChromeAndroid,
    Edge,
    Firefox,
    Safari,
    SafariIos,
    Tor,
}

impl BrowserFamily {
    /// Prefixes in match order; longer prefixes come first.
    const PREFIXES: &'static [(&'static str, BrowserFamily)] = &[
        ("chrome_android", BrowserFamily::ChromeAndroid),
        ("chrome", BrowserFamily::Chrome),
        ("edge", BrowserFamily::Edge),
        ("firefox", BrowserFamily::Firefox),
        ("safari_ios", BrowserFamily::SafariIos),
        ("safari", BrowserFamily::Safari),
        ("tor", BrowserFamily::Tor),
    ];
}

/// A validated impersonation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Impersonate {
    family: BrowserFamily,
    name: String,
}

impl Impersonate {
    pub fn family(&self) -> BrowserFamily {
        self.family
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for Impersonate {
    fn default() -> Self {
        Self { family: BrowserFamily::Chrome, name: DEFAULT_IMPERSONATE.to_string() }
    }
}

impl fmt::Display for Impersonate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Error returned for an unrecognized impersonation target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported impersonate target: {0}")]
pub struct UnknownTarget(pub String);

impl FromStr for Impersonate {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();

        for (prefix, family) in BrowserFamily::PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix)
                && is_version_suffix(rest)
            {
                return Ok(Self { family: *family, name });
            }
        }

        Err(UnknownTarget(s.to_string()))
    }
}

/// Accepts "", "124", "17_0", "18_0_ios" style suffixes.
fn is_version_suffix(rest: &str) -> bool {
    if rest.is_empty() {
        return true;
    }
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    let mut chars = rest.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_digit())
        && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
