use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ContentKey, IntoLicenseHeaders, KeyProvider, KeySet};
use crate::{
    error::{KasumiError, KasumiResult},
    util::http::HttpClient,
};

#[derive(Debug, Serialize)]
struct RemoteRequest<'a> {
    pssh: &'a str,
    licurl: &'a str,
    /// JSON object of the license request headers.
    headers: String,
}

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    message: String,
}

/// Delegates the license exchange to a remote service.
pub struct RemoteKeyProvider {
    client: HttpClient,
    endpoint: Url,
    headers: HeaderMap<HeaderValue>,
}

impl RemoteKeyProvider {
    pub fn new<H>(client: HttpClient, endpoint: Url, headers: H) -> Self
    where
        H: IntoLicenseHeaders,
    {
        Self {
            client,
            endpoint,
            headers: headers.into_license_headers(),
        }
    }

    fn encoded_headers(&self) -> KasumiResult<String> {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
            .collect();
        Ok(serde_json::to_string(&headers)?)
    }
}

#[async_trait]
impl KeyProvider for RemoteKeyProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn acquire(&self, pssh: &str, license_url: &str) -> KasumiResult<KeySet> {
        let request = RemoteRequest {
            pssh,
            licurl: license_url,
            headers: self.encoded_headers()?,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| KasumiError::LicenseError(format!("remote key service: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(KasumiError::LicenseError(format!(
                "remote key service returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| KasumiError::LicenseError(format!("remote key service: {e}")))?;
        let response: RemoteResponse = serde_json::from_str(&body).map_err(|e| {
            KasumiError::LicenseError(format!("unexpected remote key service response: {e}"))
        })?;
        let keys = response
            .message
            .lines()
            .filter(|line| line.contains(':'))
            .map(str::parse::<ContentKey>)
            .collect::<KasumiResult<Vec<_>>>()
            .map_err(|_| KasumiError::LicenseError(response.message.clone()))?;
        KeySet::new(keys)
    }
}
