//! Session credentials
//!
//! Credentials are loaded once before the first fetch and then handed to every
//! fetch call explicitly; nothing in the crate reads them from global state.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Cookie-based session credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    cookies: BTreeMap<String, String>,
}

impl Credentials {
    /// Creates an anonymous credential set
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Builds credentials from name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cookies: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Loads a JSON cookie jar (`{"NAME": "VALUE", ...}`)
    ///
    /// A missing file yields anonymous credentials, since every endpoint is
    /// readable without a session; a file that exists but does not parse is
    /// an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cookie jar at {}, fetching anonymously", path.display());
                return Ok(Self::anonymous());
            }
            Err(e) => return Err(e.into()),
        };

        let credentials: Credentials = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded {} cookies from {}",
            credentials.cookies.len(),
            path.display()
        );
        Ok(credentials)
    }

    /// Writes the cookie jar as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Parses a raw `Cookie` request header copied from a browser
    ///
    /// Accepts an optional leading `Cookie:` label. Pairs are separated by
    /// `;`, names and values are trimmed, and fragments without `=` are
    /// ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use tieba_mirror::config::Credentials;
    ///
    /// let creds = Credentials::parse_cookie_header("Cookie: BDUSS=abc; STOKEN=def");
    /// assert_eq!(creds.get("BDUSS"), Some("abc"));
    /// assert_eq!(creds.get("STOKEN"), Some("def"));
    /// ```
    pub fn parse_cookie_header(header: &str) -> Self {
        let header = header.trim();
        let header = header
            .strip_prefix("Cookie:")
            .or_else(|| header.strip_prefix("cookie:"))
            .unwrap_or(header);

        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();

        Self { cookies }
    }

    /// Returns the value of a single cookie
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns true when no cookies are present
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Number of cookies held
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Formats the cookies as a `Cookie` header value
    ///
    /// Returns `None` for anonymous credentials.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
