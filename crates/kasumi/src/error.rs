use thiserror::Error;

#[derive(Error, Debug)]
pub enum KasumiError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Invalid manifest: {0}")]
    ManifestError(String),

    #[error("PSSH error: {0}")]
    PsshError(String),

    #[error("Premium content - subscription required")]
    PremiumRequired,

    #[error("License error: {0}")]
    LicenseError(String),

    #[error("Download failed or was interrupted: {0}")]
    DownloadError(String),

    #[error("Invalid quality: {0}")]
    InvalidQuality(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("[{platform}] {message}")]
    PlatformError {
        platform: &'static str,
        message: String,
    },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    HexDecodeError(#[from] hex::FromHexError),

    #[error(transparent)]
    Base64DecodeError(#[from] base64::DecodeError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    XmlError(#[from] quick_xml::DeError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    MissingExecutable(#[from] which::Error),
}

impl KasumiError {
    pub fn platform<S>(platform: &'static str, message: S) -> Self
    where
        S: Into<String>,
    {
        Self::PlatformError {
            platform,
            message: message.into(),
        }
    }
}

pub type KasumiResult<T> = Result<T, KasumiError>;
