use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use super::{ContentKey, IntoLicenseHeaders, KeyProvider, KeySet};
use crate::{
    error::{KasumiError, KasumiResult},
    pssh::PsshBox,
    util::http::HttpClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseKeyType {
    Signing,
    Content,
    KeyControl,
    OperatorSession,
    Other,
}

#[derive(Debug, Clone)]
pub struct LicenseKey {
    pub r#type: LicenseKeyType,
    /// Hex encoded key id.
    pub id: String,
    /// Hex encoded key.
    pub key: String,
}

impl Display for LicenseKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}:{}", self.r#type, self.id, self.key)
    }
}

/// In-process device identity able to build license challenges and open licenses.
pub trait LicenseClient: Send + Sync {
    /// Builds the license request body for `pssh`.
    fn challenge(&self, pssh: &PsshBox) -> KasumiResult<Vec<u8>>;

    /// Opens the license server `response` to `challenge`.
    fn keys(&self, challenge: &[u8], response: &[u8]) -> KasumiResult<Vec<LicenseKey>>;
}

pub struct LocalKeyProvider<C> {
    cdm: C,
    client: HttpClient,
    headers: HeaderMap<HeaderValue>,
}

impl<C> LocalKeyProvider<C>
where
    C: LicenseClient,
{
    pub fn new<H>(cdm: C, client: HttpClient, headers: H) -> Self
    where
        H: IntoLicenseHeaders,
    {
        Self {
            cdm,
            client,
            headers: headers.into_license_headers(),
        }
    }
}

#[async_trait]
impl<C> KeyProvider for LocalKeyProvider<C>
where
    C: LicenseClient,
{
    fn name(&self) -> &'static str {
        "local"
    }

    async fn acquire(&self, pssh: &str, license_url: &str) -> KasumiResult<KeySet> {
        let pssh = PsshBox::from_base64(pssh)?;
        for kid in pssh.key_ids() {
            log::debug!("Requesting license for KID {kid}");
        }

        let challenge = self.cdm.challenge(&pssh)?;
        let response = self
            .client
            .post(license_url)
            .headers(self.headers.clone())
            .body(challenge.clone())
            .send()
            .await
            .map_err(|e| KasumiError::LicenseError(format!("license request failed: {e}")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| KasumiError::LicenseError(format!("license response: {e}")))?;
        if !status.is_success() {
            return Err(KasumiError::LicenseError(format!(
                "license server returned {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        let keys = self
            .cdm
            .keys(&challenge, &body)?
            .into_iter()
            .filter(|key| key.r#type == LicenseKeyType::Content)
            .map(|key| format!("{}:{}", key.id, key.key).parse::<ContentKey>())
            .collect::<KasumiResult<Vec<_>>>()?;
        KeySet::new(keys)
    }
}
