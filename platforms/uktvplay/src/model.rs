use std::collections::HashMap;

use kasumi::util::de;
use serde::Deserialize;

/// `brand/?slug=`
#[derive(Debug, Deserialize)]
pub struct Brand {
    #[serde(default)]
    pub series: Vec<SeriesRef>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesRef {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
}

/// `series/?id=`
#[derive(Debug, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub episodes: Vec<EpisodeInfo>,
}

/// An element of `series/?id=`.
#[derive(Debug, Deserialize)]
pub struct EpisodeInfo {
    pub brand_name: String,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub series_number: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub episode_number: Option<u32>,
    pub name: String,
    #[serde(deserialize_with = "de::id")]
    pub video_id: String,
    pub synopsis: Option<String>,
}

/// Brightcove playback API response.
#[derive(Debug, Deserialize)]
pub struct Playback {
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl Playback {
    pub const WIDEVINE: &'static str = "com.widevine.alpha";

    /// The first source protected by Widevine, with its license server.
    pub fn widevine(&self) -> Option<(&str, &str)> {
        self.sources.iter().find_map(|source| {
            let src = source.src.as_deref()?;
            let license = source
                .key_systems
                .get(Self::WIDEVINE)?
                .license_url
                .as_deref()?;
            Some((src, license))
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Source {
    pub src: Option<String>,
    #[serde(default)]
    pub key_systems: HashMap<String, KeySystem>,
}

#[derive(Debug, Deserialize)]
pub struct KeySystem {
    pub license_url: Option<String>,
}
