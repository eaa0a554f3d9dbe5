use async_trait::async_trait;
use url::Url;

use crate::{
    error::KasumiResult,
    manifest::ManifestKind,
    title::{Content, PlaybackReference, TitleQuery},
};

/// A resolved playback session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    pub manifest_url: Url,
    /// License server of a protected stream. `None` for clear streams.
    pub license_url: Option<String>,
}

/// The platform specific part of a download.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check if this adapter can handle the URL
    fn matches(&self, url: &str) -> bool;

    /// Discover the titles behind `url`.
    async fn resolve_title(&self, url: &str, query: TitleQuery) -> KasumiResult<Content>;

    /// Turn a title's playback reference into a manifest location.
    ///
    /// Entitlement failures must surface here as [`crate::KasumiError::PremiumRequired`].
    async fn resolve_playback(&self, reference: &PlaybackReference)
        -> KasumiResult<PlaybackSession>;

    /// How the manifest of a [`PlaybackSession`] should be fetched.
    fn fetch_manifest_hint(&self) -> ManifestKind;
}
