use url::Url;

use crate::{
    error::{KasumiError, KasumiResult},
    select::Rendition,
};

/// Marker of Dolby Digital Plus audio inside a master playlist.
const MULTICHANNEL_CODEC_MARKER: &str = "ec3";

/// An HLS master playlist kept as text.
#[derive(Debug, Clone)]
pub struct HlsManifest {
    url: Url,
    text: String,
    /// Variants were synthesized from a smooth streaming index, so the text only exists locally.
    synthesized: bool,
}

impl HlsManifest {
    pub fn new(url: Url, text: String) -> Self {
        Self {
            url,
            text,
            synthesized: false,
        }
    }

    pub fn synthesized(url: Url, text: String) -> Self {
        Self {
            url,
            text,
            synthesized: true,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    pub fn has_multichannel_audio(&self) -> bool {
        self.text.contains(MULTICHANNEL_CODEC_MARKER)
    }

    /// Every non I-frame variant with a `RESOLUTION`, in playlist order.
    pub fn renditions(&self) -> KasumiResult<Vec<Rendition>> {
        let playlist = m3u8_rs::parse_master_playlist_res(self.text.as_bytes()).map_err(|_| {
            KasumiError::ManifestError(format!("unparseable HLS master playlist at {}", self.url))
        })?;

        Ok(playlist
            .variants
            .iter()
            .filter(|variant| !variant.is_i_frame)
            .filter_map(|variant| {
                variant.resolution.map(|resolution| Rendition {
                    height: resolution.height,
                    bandwidth: Some(variant.bandwidth),
                })
            })
            .collect())
    }
}
