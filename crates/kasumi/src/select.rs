use std::{
    cmp::Reverse,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::{
    error::{KasumiError, KasumiResult},
    manifest::Manifest,
};

/// One encoded quality variant of a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    pub height: u64,
    pub bandwidth: Option<u64>,
}

/// Requested vertical resolution, accepted as `1080` or `1080p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u64);

impl Quality {
    pub fn new(height: u64) -> KasumiResult<Self> {
        if height == 0 {
            return Err(KasumiError::InvalidQuality(height.to_string()));
        }
        Ok(Self(height))
    }

    pub fn height(&self) -> u64 {
        self.0
    }
}

impl FromStr for Quality {
    type Err = KasumiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);
        let height = digits
            .parse()
            .map_err(|_| KasumiError::InvalidQuality(s.to_string()))?;
        Self::new(height)
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDescriptor {
    /// AAC 2.0
    Stereo,
    /// Dolby Digital Plus 5.1
    Multichannel,
}

impl Display for AudioDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AudioDescriptor::Stereo => write!(f, "AAC2.0"),
            AudioDescriptor::Multichannel => write!(f, "DDP5.1"),
        }
    }
}

/// Which audio track the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AudioPreference {
    #[default]
    Best,
    Codec(String),
}

impl AudioPreference {
    fn accepts_multichannel(&self) -> bool {
        match self {
            AudioPreference::Best => true,
            AudioPreference::Codec(codec) => codec.to_ascii_lowercase().contains("ec3"),
        }
    }
}

impl FromStr for AudioPreference {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("best") {
            Ok(AudioPreference::Best)
        } else {
            Ok(AudioPreference::Codec(s.to_string()))
        }
    }
}

/// The rendition chosen for one download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionTarget {
    pub requested: Option<Quality>,
    pub height: u64,
    pub audio: AudioDescriptor,
}

/// Sorts by height, highest first. Equal heights keep their document order.
pub fn sort_renditions(renditions: &mut [Rendition]) {
    renditions.sort_by_key(|rendition| Reverse(rendition.height));
}

/// Picks a height out of `heights` (sorted highest first).
///
/// Without a request the first entry wins. A request absent from the list resolves to the
/// nearest height; equidistant candidates resolve to the higher one.
pub fn select_height(heights: &[u64], requested: Option<Quality>) -> Option<u64> {
    let Some(requested) = requested else {
        return heights.first().copied();
    };
    let requested = requested.height();

    if heights.contains(&requested) {
        return Some(requested);
    }

    let closest = heights
        .iter()
        .copied()
        .min_by_key(|height| (height.abs_diff(requested), Reverse(*height)))?;
    log::info!("Resolution {requested}p not available. Getting closest match: {closest}p");
    Some(closest)
}

pub fn select(
    manifest: &Manifest,
    requested: Option<Quality>,
    audio: &AudioPreference,
) -> KasumiResult<RenditionTarget> {
    let renditions = manifest.renditions()?;
    let heights: Vec<u64> = renditions.iter().map(|r| r.height).collect();
    let height = select_height(&heights, requested)
        .ok_or_else(|| KasumiError::ManifestError("no rendition available".to_string()))?;

    let audio = match manifest {
        Manifest::Hls(hls) if hls.has_multichannel_audio() && audio.accepts_multichannel() => {
            AudioDescriptor::Multichannel
        }
        _ => AudioDescriptor::Stereo,
    };

    Ok(RenditionTarget {
        requested,
        height,
        audio,
    })
}
