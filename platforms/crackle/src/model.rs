use kasumi::util::de;
use serde::Deserialize;

/// Every Crackle API response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// `/content/{id}`
#[derive(Debug, Deserialize)]
pub struct ContentInfo {
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub release_date: Option<String>,
    pub long_description: Option<String>,
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub season_number: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub episode_number: Option<u32>,
}

impl Metadata {
    /// Year part of `releaseDate` (`2001-05-04`).
    pub fn release_year(&self) -> Option<u32> {
        self.release_date
            .as_deref()
            .and_then(|date| date.split('-').next())
            .and_then(|year| year.parse().ok())
    }
}

/// An element of `/content/{id}/children`: a season of a show, an episode of a season, or
/// the playable asset of a movie.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    pub title: Option<String>,
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub season_number: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub episode_number: Option<u32>,
}

/// `/playback/vod/{id}`
#[derive(Debug, Deserialize)]
pub struct Playback {
    #[serde(default)]
    pub streams: Vec<Stream>,
}

impl Playback {
    pub const WIDEVINE_DASH: &'static str = "dash-widevine";

    pub fn widevine(&self) -> Option<&Stream> {
        self.streams
            .iter()
            .find(|stream| stream.r#type.as_deref() == Some(Self::WIDEVINE_DASH))
    }
}

#[derive(Debug, Deserialize)]
pub struct Stream {
    pub r#type: Option<String>,
    pub url: String,
    pub drm: Option<Drm>,
}

impl Stream {
    /// The stream URL points at a session wrapper, the `dash` flavour at the MPD wrapper.
    pub fn manifest_url(&self) -> String {
        self.url.replace("session", "dash")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drm {
    pub key_url: String,
}
