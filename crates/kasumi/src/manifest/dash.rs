use dash_mpd::{AdaptationSet, ContentProtection, Representation, MPD};
use url::Url;

use crate::{
    error::{KasumiError, KasumiResult},
    pssh::KeyId,
    select::Rendition,
    util::url::merge_baseurls,
};

/// A parsed MPEG-DASH manifest.
#[derive(Debug)]
pub struct DashManifest {
    url: Url,
    mpd: MPD,
}

impl DashManifest {
    /// Parses `text`, requiring at least one `Representation`.
    pub fn parse(url: Url, text: &str) -> KasumiResult<Self> {
        let mpd = parse_mpd(&url, text)?;
        let manifest = Self { url, mpd };
        if manifest.representations().next().is_none() {
            return Err(KasumiError::ManifestError(format!(
                "no Representation element in {}",
                manifest.url
            )));
        }
        Ok(manifest)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn adaptations(&self) -> impl Iterator<Item = &AdaptationSet> {
        self.mpd
            .periods
            .iter()
            .flat_map(|period| period.adaptations.iter())
    }

    fn representations(&self) -> impl Iterator<Item = &Representation> {
        self.adaptations()
            .flat_map(|adaptation| adaptation.representations.iter())
    }

    /// Every representation with a height, in document order.
    pub fn renditions(&self) -> Vec<Rendition> {
        self.representations()
            .filter_map(|representation| {
                representation.height.map(|height| Rendition {
                    height,
                    bandwidth: representation.bandwidth,
                })
            })
            .collect()
    }

    /// The first `ContentProtection@cenc:default_KID` in document order.
    pub fn default_key_id(&self) -> KasumiResult<KeyId> {
        fn first_kid<'a>(
            mut protections: impl Iterator<Item = &'a ContentProtection>,
        ) -> Option<&'a str> {
            protections.find_map(|protection| protection.default_KID.as_deref())
        }

        let kid = self.adaptations().find_map(|adaptation| {
            first_kid(adaptation.ContentProtection.iter()).or_else(|| {
                first_kid(
                    adaptation
                        .representations
                        .iter()
                        .flat_map(|r| r.ContentProtection.iter()),
                )
            })
        });

        match kid {
            Some(kid) => kid.parse(),
            None => Err(KasumiError::PsshError(format!(
                "no ContentProtection with a default KID in {}",
                self.url
            ))),
        }
    }
}

/// `index.mpd` inside the directory named by `base`. The query of `base` is kept.
pub fn index_url(base: &Url) -> Url {
    let mut index = base.clone();
    let path = format!("{}/index.mpd", base.path().trim_end_matches('/'));
    index.set_path(&path);
    index
}

fn parse_mpd(url: &Url, text: &str) -> KasumiResult<MPD> {
    dash_mpd::parse(text)
        .map_err(|e| KasumiError::ManifestError(format!("unparseable MPD at {url}: {e}")))
}

/// Resolves the first `BaseURL` of the document at `url` against `url` itself.
pub fn find_base_url(url: &Url, text: &str) -> KasumiResult<Url> {
    let mpd = parse_mpd(url, text)?;

    let base = mpd
        .base_url
        .first()
        .or_else(|| {
            mpd.periods.iter().find_map(|period| {
                period.BaseURL.first().or_else(|| {
                    period.adaptations.iter().find_map(|adaptation| {
                        adaptation.BaseURL.first().or_else(|| {
                            adaptation
                                .representations
                                .iter()
                                .find_map(|r| r.BaseURL.first())
                        })
                    })
                })
            })
        })
        .ok_or_else(|| KasumiError::ManifestError(format!("no BaseURL element in {url}")))?;

    merge_baseurls(url, base.base.trim())
}
