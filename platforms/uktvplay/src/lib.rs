pub mod model;

use fake_user_agent::get_chrome_rua;
use kasumi::{
    async_trait,
    manifest::ManifestKind,
    title::{Content, Episode, PlaybackReference, Selection, Title, TitleQuery},
    util::{
        http::send_json,
        url::{host, path_segments},
    },
    HttpClient, KasumiError, KasumiResult, PlatformAdapter, PlaybackSession,
};
use model::*;
use regex::Regex;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

pub const SERVICE: &str = "UKTV";
const SITE: &str = "https://uktvplay.co.uk";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schedule API, ends with `/`.
    pub vod: String,
    /// Brightcove playback API accounts endpoint, ends with `/`.
    pub api: String,
    pub account: String,
    pub policy_key: String,
    /// `Set-Cookie` style lines for the episode pages.
    pub cookies: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vod: "https://vschedules.uktv.co.uk/vod/".to_string(),
            api: "https://edge.api.brightcove.com/playback/v1/accounts/".to_string(),
            account: "1242911124001".to_string(),
            policy_key: "BCpkADawqM3vt2DxMZ94FyjAfheKk_-e92F-hnuKgoJMh2hgaASJJV_gUeYm710md2yS24_4PfOEbF_SSTNM4PijWNnwZG8Tlg4Y40XyFQh_T9Vq2460u3GXCUoSQOYlpfhbzmQ8lEwUmmte".to_string(),
            cookies: Vec::new(),
        }
    }
}

pub struct UktvPlayAdapter {
    client: HttpClient,
    config: Config,
    episode_path: Regex,
}

impl UktvPlayAdapter {
    pub fn new(config: Config) -> KasumiResult<Self> {
        let client = HttpClient::new(reqwest::Client::builder().user_agent(get_chrome_rua()))?;
        let episode_path = Regex::new(r"/series-(\d+)/episode-(\d+)")
            .map_err(|e| KasumiError::platform(SERVICE, e.to_string()))?;
        if !config.cookies.is_empty() {
            client.add_cookies(&config.cookies, SITE)?;
        }

        Ok(Self {
            client,
            config,
            episode_path,
        })
    }

    async fn series(&self, url: &str) -> KasumiResult<Content> {
        let segments = path_segments(url)?;
        let slug = segments
            .get(1)
            .ok_or_else(|| KasumiError::platform(SERVICE, format!("no show slug in {url}")))?;

        let brand: Brand = send_json(
            self.client
                .get(format!("{}brand/", self.config.vod))
                .query(&[("slug", slug)]),
        )
        .await?;

        let mut episodes = Vec::new();
        for series in brand.series {
            let series: Series = send_json(
                self.client
                    .get(format!("{}series/", self.config.vod))
                    .query(&[("id", &series.id)]),
            )
            .await?;
            episodes.extend(series.episodes);
        }

        let show = episodes
            .first()
            .map(|episode| episode.brand_name.clone())
            .unwrap_or_else(|| slug.clone());
        Ok(Content::new(show, episodes.into_iter().map(title).collect()))
    }

    /// Episode URLs look like `/shows/<slug>/series-1/episode-2`. The episode is looked up in
    /// the whole series listing.
    async fn episode(&self, url: &str) -> KasumiResult<Content> {
        let (season, number) = self
            .episode_path
            .captures(url)
            .and_then(|captures| {
                let season = captures.get(1)?.as_str().parse::<u32>().ok()?;
                let number = captures.get(2)?.as_str().parse::<u32>().ok()?;
                Some((season, number))
            })
            .ok_or_else(|| KasumiError::platform(SERVICE, format!("not an episode URL: {url}")))?;
        log::debug!("Looking up S{season:02}E{number:02} of {url}");

        let series = self.series(url).await?;
        let titles = series.select(&Selection::Episode {
            season,
            episode: number,
        });
        if titles.is_empty() {
            return Err(KasumiError::platform(
                SERVICE,
                format!("S{season:02}E{number:02} not found in {}", series.title),
            ));
        }
        Ok(Content::new(series.title, titles))
    }
}

fn title(episode: EpisodeInfo) -> Title {
    Title::Episode(Episode {
        service: SERVICE,
        show: episode.brand_name,
        season: episode.series_number.unwrap_or_default(),
        number: episode.episode_number.unwrap_or_default(),
        name: episode.name,
        description: episode.synopsis,
        playback: PlaybackReference::new(episode.video_id),
    })
}

#[async_trait]
impl PlatformAdapter for UktvPlayAdapter {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn matches(&self, url: &str) -> bool {
        host(url).is_some_and(|host| host == "uktvplay.co.uk")
    }

    async fn resolve_title(&self, url: &str, query: TitleQuery) -> KasumiResult<Content> {
        match query {
            TitleQuery::Series => self.series(url).await,
            TitleQuery::Single => self.episode(url).await,
            TitleQuery::Movies => Err(KasumiError::platform(
                SERVICE,
                "movies are not available on this service",
            )),
        }
    }

    async fn resolve_playback(
        &self,
        reference: &PlaybackReference,
    ) -> KasumiResult<PlaybackSession> {
        let url = format!(
            "{}{}/videos/{reference}",
            self.config.api, self.config.account
        );
        let playback: Playback = send_json(
            self.client
                .get(url)
                .header(ACCEPT, format!("application/json;pk={}", self.config.policy_key)),
        )
        .await?;

        let (src, license_url) = playback.widevine().ok_or_else(|| {
            KasumiError::platform(SERVICE, format!("no Widevine source for {reference}"))
        })?;
        Ok(PlaybackSession {
            manifest_url: Url::parse(src)?,
            license_url: Some(license_url.to_string()),
        })
    }

    fn fetch_manifest_hint(&self) -> ManifestKind {
        ManifestKind::Dash
    }
}
