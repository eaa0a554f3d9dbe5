pub mod model;

use fake_user_agent::get_chrome_rua;
use kasumi::{
    async_trait,
    manifest::ManifestKind,
    title::{Content, Episode, Movie, PlaybackReference, Title, TitleQuery},
    util::url::{host, path_segments},
    HttpClient, KasumiError, KasumiResult, PlatformAdapter, PlaybackSession,
};
use model::*;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

pub const SERVICE: &str = "CRKL";

const PLATFORM_HEADER: HeaderName = HeaderName::from_static("x-crackle-platform");

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: String,
    /// Platform key sent as `x-crackle-platform`.
    pub key: String,
    /// `Set-Cookie` style lines for the API host.
    pub cookies: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: "https://prod-api.crackle.com".to_string(),
            key: String::new(),
            cookies: Vec::new(),
        }
    }
}

pub struct CrackleAdapter {
    client: HttpClient,
    api: String,
}

impl CrackleAdapter {
    pub fn new(config: Config) -> KasumiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            PLATFORM_HEADER,
            HeaderValue::from_str(&config.key).map_err(|_| {
                KasumiError::platform(SERVICE, "platform key is not a valid header value")
            })?,
        );
        let client = HttpClient::new(
            reqwest::Client::builder()
                .user_agent(get_chrome_rua())
                .default_headers(headers),
        )?;
        let api = config.api.trim_end_matches('/').to_string();
        if !config.cookies.is_empty() {
            client.add_cookies(&config.cookies, api.as_str())?;
        }

        Ok(Self { client, api })
    }

    async fn get<T>(&self, path: &str) -> KasumiResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.client.get(format!("{}{path}", self.api)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(error) => KasumiError::platform(SERVICE, format!("{status}: {}", error.error.message)),
                Err(_) => KasumiError::HttpError(status),
            });
        }

        let response: Response<T> = serde_json::from_str(&body)?;
        Ok(response.data)
    }

    async fn metadata(&self, id: &str) -> KasumiResult<Metadata> {
        let info: ContentInfo = self.get(&format!("/content/{id}")).await?;
        info.metadata
            .into_iter()
            .next()
            .ok_or_else(|| KasumiError::platform(SERVICE, format!("no metadata for {id}")))
    }

    async fn children(&self, id: &str) -> KasumiResult<Vec<Child>> {
        self.get(&format!("/content/{id}/children")).await
    }

    async fn series(&self, id: &str) -> KasumiResult<Content> {
        let show = self.metadata(id).await?.title;

        let mut titles = Vec::new();
        for season in self.children(id).await? {
            for episode in self.children(&season.id).await? {
                titles.push(Title::Episode(Episode {
                    service: SERVICE,
                    show: show.clone(),
                    season: episode.season_number.unwrap_or_default(),
                    number: episode.episode_number.unwrap_or_default(),
                    name: episode.title.unwrap_or_default(),
                    description: episode.short_description,
                    playback: PlaybackReference::new(episode.id),
                }));
            }
        }

        Ok(Content::new(show, titles))
    }

    async fn movie(&self, id: &str) -> KasumiResult<Content> {
        let metadata = self.metadata(id).await?;
        let asset = self
            .children(id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KasumiError::platform(SERVICE, format!("no playable asset for {id}")))?;

        let year = metadata.release_year();
        let movie = Movie {
            service: SERVICE,
            name: metadata.title.clone(),
            year,
            synopsis: metadata.long_description,
            playback: PlaybackReference::new(asset.id),
        };
        Ok(Content::new(metadata.title, vec![Title::Movie(movie)]))
    }

    /// `/watch/{id}/{show-slug}` of a single episode.
    async fn episode(&self, id: &str, slug: Option<&str>) -> KasumiResult<Content> {
        let metadata = self.metadata(id).await?;
        let show = slug.map(title_case).unwrap_or_else(|| metadata.title.clone());

        let episode = Episode {
            service: SERVICE,
            show: show.clone(),
            season: metadata.season_number.unwrap_or_default(),
            number: metadata.episode_number.unwrap_or_default(),
            name: metadata.title,
            description: metadata.short_description,
            playback: PlaybackReference::new(id),
        };
        Ok(Content::new(show, vec![Title::Episode(episode)]))
    }
}

/// `the-show-name` to `The Show Name`.
fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl PlatformAdapter for CrackleAdapter {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn matches(&self, url: &str) -> bool {
        host(url).is_some_and(|host| host == "crackle.com")
    }

    async fn resolve_title(&self, url: &str, query: TitleQuery) -> KasumiResult<Content> {
        let segments = path_segments(url)?;
        let id = segments
            .get(1)
            .ok_or_else(|| KasumiError::platform(SERVICE, format!("no content id in {url}")))?;

        match query {
            TitleQuery::Series => self.series(id).await,
            TitleQuery::Movies => self.movie(id).await,
            TitleQuery::Single => self.episode(id, segments.get(2).map(String::as_str)).await,
        }
    }

    async fn resolve_playback(
        &self,
        reference: &PlaybackReference,
    ) -> KasumiResult<PlaybackSession> {
        let playback: Playback = self.get(&format!("/playback/vod/{reference}")).await?;
        let stream = playback.widevine().ok_or_else(|| {
            KasumiError::platform(SERVICE, format!("no Widevine DASH stream for {reference}"))
        })?;
        let drm = stream.drm.as_ref().ok_or_else(|| {
            KasumiError::platform(SERVICE, format!("no license server for {reference}"))
        })?;

        Ok(PlaybackSession {
            manifest_url: Url::parse(&stream.manifest_url())?,
            license_url: Some(drm.key_url.clone()),
        })
    }

    fn fetch_manifest_hint(&self) -> ManifestKind {
        ManifestKind::DashIndirect
    }
}
