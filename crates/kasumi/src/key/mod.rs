//! Decryption key acquisition.
//!
//! A [`KeyProvider`] exchanges a base64 PSSH and a license URL for the content keys of a
//! title. Two variants exist:
//!
//! * [`LocalKeyProvider`] performs the license exchange itself, delegating challenge and
//!   license handling to a [`LicenseClient`] supplied by the embedding application.
//! * [`RemoteKeyProvider`] hands the whole exchange to a remote service over HTTP.
mod headers;
mod local;
mod remote;

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use async_trait::async_trait;

use crate::error::{KasumiError, KasumiResult};
pub use headers::IntoLicenseHeaders;
pub use local::{LicenseClient, LicenseKey, LicenseKeyType, LocalKeyProvider};
pub use remote::RemoteKeyProvider;

#[async_trait]
pub trait KeyProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns at least one key, or fails with [`KasumiError::LicenseError`].
    async fn acquire(&self, pssh: &str, license_url: &str) -> KasumiResult<KeySet>;
}

/// A `kid:key` pair, both lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKey {
    pub kid: String,
    pub key: String,
}

impl FromStr for ContentKey {
    type Err = KasumiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kid, key) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| KasumiError::LicenseError(format!("malformed key: {s}")))?;
        let kid = kid.trim().replace('-', "").to_ascii_lowercase();
        let key = key.trim().to_ascii_lowercase();

        let is_hex = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit());
        if kid.len() != 32 || !is_hex(&kid) || !is_hex(&key) {
            return Err(KasumiError::LicenseError(format!("malformed key: {s}")));
        }

        Ok(Self { kid, key })
    }
}

impl Display for ContentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kid, self.key)
    }
}

/// Keys of one download, in license order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet(Vec<ContentKey>);

impl KeySet {
    pub fn new(keys: Vec<ContentKey>) -> KasumiResult<Self> {
        if keys.is_empty() {
            return Err(KasumiError::LicenseError(
                "no content key in license".to_string(),
            ));
        }
        Ok(Self(keys))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for KeySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", lines.join("\n"))
    }
}
