use kasumi::{
    manifest::{Manifest, ManifestFetcher, ManifestKind, ManifestSource},
    workdir::WorkDir,
    HttpClient, KasumiError,
};
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{AssertWrapper, MASTER_PLAYLIST, PROTECTED_MPD, SMOOTH_INDEX};

const KEYFRAMES_PATH: &str = "/live/QualityLevels(5999999)/Manifest(video,type=keyframes)";

trait ManifestMock {
    async fn mock<S>(&self, mock_path: &str, body: S) -> &Self
    where
        S: AsRef<str>;

    async fn mock_status(&self, mock_path: &str, status: u16) -> &Self;
}

impl ManifestMock for MockServer {
    async fn mock<S>(&self, mock_path: &str, body: S) -> &Self
    where
        S: AsRef<str>,
    {
        Mock::given(method("GET"))
            .and(path(mock_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.as_ref()))
            .mount(self)
            .await;
        self
    }

    async fn mock_status(&self, mock_path: &str, status: u16) -> &Self {
        Mock::given(method("GET"))
            .and(path(mock_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(self)
            .await;
        self
    }
}

fn fetcher() -> ManifestFetcher {
    ManifestFetcher::new(HttpClient::browser().assert_success())
}

fn url(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}{path}", server.uri())).unwrap()
}

fn heights(manifest: &Manifest) -> Vec<u64> {
    manifest
        .renditions()
        .assert_success()
        .iter()
        .map(|r| r.height)
        .collect()
}

#[tokio::test]
async fn test_fetch_dash() {
    let server = MockServer::start().await;
    server.mock("/index.mpd", PROTECTED_MPD).await;

    let manifest = fetcher()
        .fetch(&url(&server, "/index.mpd"), ManifestKind::Dash)
        .await
        .assert_success();
    assert!(matches!(manifest, Manifest::Dash(_)));
    assert_eq!(heights(&manifest), vec![1080, 720, 480]);
}

#[tokio::test]
async fn test_fetch_dash_not_found() {
    let server = MockServer::start().await;
    server.mock_status("/index.mpd", 404).await;

    let result = fetcher()
        .fetch(&url(&server, "/index.mpd"), ManifestKind::Dash)
        .await;
    assert!(matches!(result, Err(KasumiError::ManifestError(_))));
}

#[tokio::test]
async fn test_fetch_dash_indirect() {
    let server = MockServer::start().await;
    let wrapper = format!(
        r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><BaseURL>{}/vod/42/</BaseURL><Period/></MPD>"#,
        server.uri()
    );
    server
        .mock("/session/wrapper.mpd", wrapper)
        .await
        .mock("/vod/42/index.mpd", PROTECTED_MPD)
        .await;

    let manifest = fetcher()
        .fetch(
            &url(&server, "/session/wrapper.mpd"),
            ManifestKind::DashIndirect,
        )
        .await
        .assert_success();
    assert_eq!(manifest.url().path(), "/vod/42/index.mpd");
    assert_eq!(heights(&manifest), vec![1080, 720, 480]);
}

#[tokio::test]
async fn test_fetch_dash_indirect_missing_index() {
    let server = MockServer::start().await;
    let wrapper = format!(
        r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><BaseURL>{}/vod/42/</BaseURL><Period/></MPD>"#,
        server.uri()
    );
    server
        .mock("/session/wrapper.mpd", wrapper)
        .await
        .mock_status("/vod/42/index.mpd", 404)
        .await;

    let result = fetcher()
        .fetch(
            &url(&server, "/session/wrapper.mpd"),
            ManifestKind::DashIndirect,
        )
        .await;
    assert!(matches!(result, Err(KasumiError::ManifestError(_))));
}

#[tokio::test]
async fn test_fetch_dash_indirect_relative_base() {
    let server = MockServer::start().await;
    server
        .mock(
            "/session/wrapper.mpd",
            r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><BaseURL>vod/42</BaseURL><Period/></MPD>"#,
        )
        .await
        .mock("/session/vod/42/index.mpd", PROTECTED_MPD)
        .await;

    let manifest = fetcher()
        .fetch(
            &url(&server, "/session/wrapper.mpd?token=abc"),
            ManifestKind::DashIndirect,
        )
        .await
        .assert_success();
    assert_eq!(manifest.url().path(), "/session/vod/42/index.mpd");
    assert_eq!(manifest.url().query(), Some("token=abc"));
}

#[tokio::test]
async fn test_fetch_dash_indirect_not_xml() {
    let server = MockServer::start().await;
    server.mock("/session/wrapper.mpd", "not xml at all").await;

    let result = fetcher()
        .fetch(
            &url(&server, "/session/wrapper.mpd"),
            ManifestKind::DashIndirect,
        )
        .await;
    assert!(matches!(result, Err(KasumiError::ManifestError(_))));
}

#[tokio::test]
async fn test_fetch_smooth_degraded() {
    let server = MockServer::start().await;
    server
        .mock("/live/desktop.m3u8", MASTER_PLAYLIST)
        .await
        .mock_status(KEYFRAMES_PATH, 503)
        .await;

    let manifest = fetcher()
        .fetch(&url(&server, "/live/desktop.m3u8"), ManifestKind::SmoothHls)
        .await
        .assert_success();

    let Manifest::Hls(hls) = &manifest else {
        panic!("expected an HLS manifest");
    };
    assert!(!hls.is_synthesized());
    assert_eq!(hls.text(), MASTER_PLAYLIST);
    assert_eq!(heights(&manifest), vec![360]);
}

#[tokio::test]
async fn test_fetch_smooth_synthesized() {
    let server = MockServer::start().await;
    server
        .mock("/live/desktop.m3u8", MASTER_PLAYLIST)
        .await
        .mock(KEYFRAMES_PATH, SMOOTH_INDEX)
        .await;

    let manifest = fetcher()
        .fetch(&url(&server, "/live/desktop.m3u8"), ManifestKind::SmoothHls)
        .await
        .assert_success();

    let Manifest::Hls(hls) = &manifest else {
        panic!("expected an HLS manifest");
    };
    assert!(hls.is_synthesized());
    assert!(hls.has_multichannel_audio());
    assert!(hls.text().contains(&format!(
        "{}/live/QualityLevels(800000)/Manifest(video,format=m3u8-aapl)",
        server.uri()
    )));
    assert_eq!(heights(&manifest), vec![1080, 720, 360]);

    let workdir = WorkDir::new().assert_success();
    let source = fetcher().persist(&manifest, &workdir).await.assert_success();
    assert_eq!(source, ManifestSource::Local(workdir.manifest_path()));
    let persisted = std::fs::read_to_string(workdir.manifest_path()).unwrap();
    assert_eq!(persisted, hls.text());
}

#[tokio::test]
async fn test_persist_remote() {
    let server = MockServer::start().await;
    server.mock("/index.mpd", PROTECTED_MPD).await;

    let manifest = fetcher()
        .fetch(&url(&server, "/index.mpd"), ManifestKind::Dash)
        .await
        .assert_success();
    let workdir = WorkDir::new().assert_success();
    let source = fetcher().persist(&manifest, &workdir).await.assert_success();

    assert_eq!(source, ManifestSource::Remote(url(&server, "/index.mpd")));
    assert!(!workdir.manifest_path().exists());
}
