use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub trait IntoLicenseHeaders {
    fn into_license_headers(self) -> HeaderMap<HeaderValue>;
}

impl IntoLicenseHeaders for HeaderMap<HeaderValue> {
    fn into_license_headers(self) -> HeaderMap<HeaderValue> {
        self
    }
}

/// `Name: value` lines. Malformed lines are skipped.
impl IntoLicenseHeaders for &[String] {
    fn into_license_headers(self) -> HeaderMap<HeaderValue> {
        let mut map = HeaderMap::new();
        for line in self {
            let parsed = line.split_once(':').and_then(|(name, value)| {
                let name = HeaderName::from_bytes(name.trim().as_bytes()).ok()?;
                let value = HeaderValue::from_str(value.trim()).ok()?;
                Some((name, value))
            });
            match parsed {
                Some((name, value)) => {
                    map.insert(name, value);
                }
                None => log::warn!("Ignoring invalid license header: {line}"),
            }
        }
        map
    }
}

impl IntoLicenseHeaders for () {
    fn into_license_headers(self) -> HeaderMap<HeaderValue> {
        HeaderMap::new()
    }
}
