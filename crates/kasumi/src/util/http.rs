use std::{ops::Deref, sync::Arc};

use fake_user_agent::get_chrome_rua;
use reqwest::{Client, ClientBuilder, IntoUrl, RequestBuilder};
use serde::de::DeserializeOwned;
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};

use crate::error::{KasumiError, KasumiResult};

/// A pooled client shared by every request of one connector instance.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> KasumiResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store.clone()).build()?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    /// Client with a browser user agent and no extra headers.
    pub fn browser() -> KasumiResult<Self> {
        Self::new(Client::builder().user_agent(get_chrome_rua()))
    }

    pub fn add_cookies(&self, cookies: &[String], url: impl IntoUrl) -> KasumiResult<()> {
        let url = url.into_url()?;
        let mut lock = self
            .cookies_store
            .lock()
            .map_err(|_| KasumiError::platform("http", "cookie store poisoned"))?;
        for cookie in cookies {
            if let Err(e) = lock.parse(cookie, &url) {
                log::warn!("Ignoring invalid cookie for {url}: {e}");
            }
        }
        Ok(())
    }

    /// GET `url` and return the body, failing on any non-success status.
    pub async fn get_text(&self, url: impl IntoUrl) -> KasumiResult<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(KasumiError::HttpError(status));
        }
        Ok(response.text().await?)
    }
}

/// Sends `request` and deserializes the JSON body, failing on any non-success status.
pub async fn send_json<T>(request: RequestBuilder) -> KasumiResult<T>
where
    T: DeserializeOwned,
{
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(KasumiError::HttpError(status));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
