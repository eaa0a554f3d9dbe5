//! # Manifest fetching
//!
//! A [`ManifestFetcher`] turns a resolved playback URL into a [`Manifest`]. How it does so
//! depends on the [`ManifestKind`] the platform announces:
//!
//! * [`ManifestKind::Dash`]: a single GET of an MPD.
//! * [`ManifestKind::DashIndirect`]: a wrapper document whose first `BaseURL` points at the
//!   directory holding the real `index.mpd`.
//! * [`ManifestKind::Hls`]: a plain HLS master playlist.
//! * [`ManifestKind::SmoothHls`]: an HLS playlist backed by a smooth streaming index. The index
//!   is fetched as well and its levels are synthesized into the playlist (see [`smooth`]).
//!   Failing to get the index is not fatal; the original playlist is used as is.
//!
//! Requests are never retried.
pub mod dash;
pub mod hls;
pub mod smooth;

use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use url::Url;

use crate::{
    error::{KasumiError, KasumiResult},
    pssh::KeyId,
    select::{sort_renditions, Rendition},
    util::http::HttpClient,
    workdir::WorkDir,
};
pub use dash::DashManifest;
pub use hls::HlsManifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Dash,
    DashIndirect,
    Hls,
    SmoothHls,
}

#[derive(Debug)]
pub enum Manifest {
    Dash(DashManifest),
    Hls(HlsManifest),
}

impl Manifest {
    pub fn url(&self) -> &Url {
        match self {
            Manifest::Dash(dash) => dash.url(),
            Manifest::Hls(hls) => hls.url(),
        }
    }

    /// Candidate renditions, highest first. Never empty.
    pub fn renditions(&self) -> KasumiResult<Vec<Rendition>> {
        let mut renditions = match self {
            Manifest::Dash(dash) => dash.renditions(),
            Manifest::Hls(hls) => hls.renditions()?,
        };
        if renditions.is_empty() {
            return Err(KasumiError::ManifestError(format!(
                "no rendition with a resolution in {}",
                self.url()
            )));
        }

        sort_renditions(&mut renditions);
        Ok(renditions)
    }

    pub fn default_key_id(&self) -> KasumiResult<KeyId> {
        match self {
            Manifest::Dash(dash) => dash.default_key_id(),
            Manifest::Hls(hls) => Err(KasumiError::PsshError(format!(
                "HLS manifest {} carries no ContentProtection",
                hls.url()
            ))),
        }
    }
}

/// Where the external downloader reads the manifest from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Remote(Url),
    Local(PathBuf),
}

impl Display for ManifestSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSource::Remote(url) => write!(f, "{url}"),
            ManifestSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct ManifestFetcher {
    client: HttpClient,
}

impl ManifestFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &Url, kind: ManifestKind) -> KasumiResult<Manifest> {
        log::debug!("Fetching {kind:?} manifest from {url}");
        match kind {
            ManifestKind::Dash => self.fetch_dash(url.clone()).await,
            ManifestKind::DashIndirect => {
                let wrapper = self.get_manifest_text(url).await?;
                let base = dash::find_base_url(url, &wrapper)?;
                let index = dash::index_url(&base);
                log::debug!("Manifest redirected to {index}");
                self.fetch_dash(index).await
            }
            ManifestKind::Hls => {
                let text = self.get_manifest_text(url).await?;
                Ok(Manifest::Hls(HlsManifest::new(url.clone(), text)))
            }
            ManifestKind::SmoothHls => self.fetch_smooth(url).await,
        }
    }

    async fn get_manifest_text(&self, url: &Url) -> KasumiResult<String> {
        self.client
            .get_text(url.clone())
            .await
            .map_err(|e| match e {
                KasumiError::HttpError(status) => {
                    KasumiError::ManifestError(format!("{url} returned {status}"))
                }
                e => e,
            })
    }

    async fn fetch_dash(&self, url: Url) -> KasumiResult<Manifest> {
        let text = self.get_manifest_text(&url).await?;
        Ok(Manifest::Dash(DashManifest::parse(url, &text)?))
    }

    async fn fetch_smooth(&self, url: &Url) -> KasumiResult<Manifest> {
        let text = self.get_manifest_text(url).await?;
        let base = smooth::base_path(url.as_str());

        match self.fetch_smooth_index(base).await {
            Ok(index) => {
                let text = smooth::synthesize(&text, &index, base);
                Ok(Manifest::Hls(HlsManifest::synthesized(url.clone(), text)))
            }
            Err(e) => {
                log::warn!("Smooth streaming index unavailable, using the playlist as is: {e}");
                Ok(Manifest::Hls(HlsManifest::new(url.clone(), text)))
            }
        }
    }

    async fn fetch_smooth_index(&self, base: &str) -> KasumiResult<smooth::SmoothStreamingMedia> {
        let text = self.client.get_text(smooth::index_url(base)).await?;
        smooth::parse_index(&text)
    }

    /// Makes `manifest` readable by the external downloader. Synthesized playlists are written
    /// into `workdir`, everything else is read from its URL.
    pub async fn persist(
        &self,
        manifest: &Manifest,
        workdir: &WorkDir,
    ) -> KasumiResult<ManifestSource> {
        match manifest {
            Manifest::Hls(hls) if hls.is_synthesized() => {
                let path = workdir.write_manifest(hls.text()).await?;
                Ok(ManifestSource::Local(path))
            }
            manifest => Ok(ManifestSource::Remote(manifest.url().clone())),
        }
    }
}
