use url::Url;

use crate::error::KasumiResult;

/// Non-empty path segments of `url`.
pub fn path_segments(url: &str) -> KasumiResult<Vec<String>> {
    let url = Url::parse(url)?;
    Ok(url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// Host of `url` without a leading `www.`.
pub fn host(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase())
}

/// Resolves a `BaseURL` value against the document it appears in. A relative value inherits
/// the query of `current` when it has none of its own.
pub(crate) fn merge_baseurls(current: &Url, base: &str) -> KasumiResult<Url> {
    match Url::parse(base) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let mut merged = current.join(base)?;
            if merged.query().is_none() {
                merged.set_query(current.query());
            }
            Ok(merged)
        }
        Err(e) => Err(e.into()),
    }
}
