//! HLS synthesis for pseudo-live smooth streaming sources.
//!
//! Such sources publish an HLS playlist next to a smooth streaming index. The index lists
//! every bitrate level, including the ones the HLS playlist omits, so the extra levels are
//! appended to the playlist as `#EXT-X-STREAM-INF` and `#EXT-X-MEDIA` lines.
use std::fmt::Write;

use serde::Deserialize;

use crate::error::KasumiResult;

const PATH_MARKER: &str = "desktop";
const KEYFRAMES_INDEX: &str = "QualityLevels(5999999)/Manifest(video,type=keyframes)";
const QUALITY_LEVELS: &str = "QualityLevels";

#[derive(Debug, Deserialize)]
pub struct SmoothStreamingMedia {
    #[serde(rename = "StreamIndex", default)]
    pub stream_indexes: Vec<StreamIndex>,
}

#[derive(Debug, Deserialize)]
pub struct StreamIndex {
    #[serde(rename = "@Type")]
    pub r#type: Option<String>,
    #[serde(rename = "@Name")]
    pub name: Option<String>,
    #[serde(rename = "@Language")]
    pub language: Option<String>,
    #[serde(rename = "QualityLevel", default)]
    pub quality_levels: Vec<QualityLevel>,
}

#[derive(Debug, Deserialize)]
pub struct QualityLevel {
    #[serde(rename = "@Bitrate")]
    pub bitrate: Option<u64>,
    #[serde(rename = "@MaxWidth")]
    pub max_width: Option<u64>,
    #[serde(rename = "@MaxHeight")]
    pub max_height: Option<u64>,
    #[serde(rename = "@FourCC")]
    pub four_cc: Option<String>,
}

/// Everything before the `desktop` path marker, or the whole URL without one.
pub fn base_path(url: &str) -> &str {
    url.split_once(PATH_MARKER).map_or(url, |(base, _)| base)
}

pub fn index_url(base: &str) -> String {
    format!("{base}{KEYFRAMES_INDEX}")
}

pub fn parse_index(xml: &str) -> KasumiResult<SmoothStreamingMedia> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// Rewrites relative `QualityLevels(...)` URIs of `playlist` against `base`.
fn absolutize(playlist: &str, base: &str) -> String {
    let quoted = format!("URI=\"{QUALITY_LEVELS}");
    let mut output = String::with_capacity(playlist.len());
    for line in playlist.lines() {
        if line.starts_with(QUALITY_LEVELS) {
            output.push_str(base);
            output.push_str(line);
        } else {
            output.push_str(&line.replace(&quoted, &format!("URI=\"{base}{QUALITY_LEVELS}")));
        }
        output.push('\n');
    }
    output
}

/// Appends one variant per video bitrate level and one alternate audio line per audio level.
pub fn synthesize(playlist: &str, index: &SmoothStreamingMedia, base: &str) -> String {
    let mut output = absolutize(playlist, base);

    for stream in &index.stream_indexes {
        match stream.r#type.as_deref() {
            Some("video") => {
                for level in &stream.quality_levels {
                    let Some(bitrate) = level.bitrate else {
                        continue;
                    };
                    let _ = writeln!(
                        output,
                        "#EXT-X-STREAM-INF:BANDWIDTH={bitrate},RESOLUTION={width}x{height},CODECS=\"avc1.4d401f,mp4a.40.2\",AUDIO=\"audio\",CLOSED-CAPTIONS=\"CC\"\n\
                         {base}{QUALITY_LEVELS}({bitrate})/Manifest(video,format=m3u8-aapl)",
                        width = level.max_width.unwrap_or(0),
                        height = level.max_height.unwrap_or(0),
                    );
                }
            }
            Some("audio") => {
                let name = stream.name.as_deref().unwrap_or_default();
                let language = stream.language.as_deref().unwrap_or_default();
                for level in &stream.quality_levels {
                    let bitrate = level.bitrate.unwrap_or(0);
                    let _ = writeln!(
                        output,
                        "#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"{name}\",BANDWIDTH={bitrate},NAME=\"{four_cc}\",LANGUAGE=\"{language}\",\
                         URI=\"{base}{QUALITY_LEVELS}({bitrate})/Manifest({name},format=m3u8-aapl)\"",
                        four_cc = level.four_cc.as_deref().unwrap_or_default(),
                    );
                }
            }
            _ => {}
        }
    }

    output
}
