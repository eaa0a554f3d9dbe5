use kasumi::util::de;
use serde::Deserialize;

/// Catalog entry of a show or a movie.
#[derive(Debug, Deserialize)]
pub struct Show {
    pub title: String,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

impl Show {
    /// Every asset except trailers, in catalog order.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.seasons
            .iter()
            .flat_map(|season| season.assets.iter())
            .filter(|asset| !asset.is_trailer)
    }
}

#[derive(Debug, Deserialize)]
pub struct Season {
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_trailer: bool,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub season: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_u32")]
    pub episode: Option<u32>,
    pub play_session: PlaySessionLink,
}

#[derive(Debug, Deserialize)]
pub struct PlaySessionLink {
    pub url: String,
}

/// Response of a play session URL.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySession {
    #[serde(default)]
    pub error_code: i64,
    pub url: Option<String>,
}

impl PlaySession {
    /// Returned when the asset needs a premium subscription.
    pub const PREMIUM_REQUIRED: i64 = 35;

    pub fn is_premium_required(&self) -> bool {
        self.error_code == Self::PREMIUM_REQUIRED
    }
}
