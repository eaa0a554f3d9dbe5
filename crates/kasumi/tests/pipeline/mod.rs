use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use base64::{engine::general_purpose::STANDARD, Engine};
use kasumi::{
    async_trait,
    download::{DownloadRequest, Downloader},
    key::{KeyProvider, KeySet},
    manifest::{ManifestFetcher, ManifestKind, ManifestSource},
    pipeline::{Pipeline, PipelineOptions, Stage},
    select::Quality,
    title::{Content, Episode, PlaybackReference, Selection, Title, TitleQuery},
    workdir::WorkDir,
    HttpClient, KasumiError, KasumiResult, PlatformAdapter, PlaybackSession,
};
use tempfile::TempDir;
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{init_test_tracing, AssertWrapper, KID_PSSH, PROTECTED_MPD};

const PREMIUM: &str = "premium";
const LICENSE_URL: &str = "https://license.example.com/widevine";

struct FakeAdapter {
    manifest_url: Url,
    license_url: Option<String>,
    titles: Vec<Title>,
}

#[async_trait]
impl PlatformAdapter for FakeAdapter {
    fn name(&self) -> &'static str {
        "FAKE"
    }

    fn matches(&self, url: &str) -> bool {
        url.starts_with("https://fake.example.com/")
    }

    async fn resolve_title(&self, _url: &str, _query: TitleQuery) -> KasumiResult<Content> {
        Ok(Content::new("Fake Show", self.titles.clone()))
    }

    async fn resolve_playback(
        &self,
        reference: &PlaybackReference,
    ) -> KasumiResult<PlaybackSession> {
        if reference.as_str() == PREMIUM {
            return Err(KasumiError::PremiumRequired);
        }
        Ok(PlaybackSession {
            manifest_url: self.manifest_url.clone(),
            license_url: self.license_url.clone(),
        })
    }

    fn fetch_manifest_hint(&self) -> ManifestKind {
        ManifestKind::Dash
    }
}

#[derive(Clone, Default)]
struct FakeKeyProvider {
    calls: Arc<AtomicUsize>,
    pssh: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl KeyProvider for FakeKeyProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn acquire(&self, pssh: &str, license_url: &str) -> KasumiResult<KeySet> {
        assert_eq!(license_url, LICENSE_URL);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pssh.lock().unwrap().push(pssh.to_string());
        KeySet::new(vec![
            "edef8ba979d64acea3c827dcd51d21ed:00112233445566778899aabbccddeeff"
                .parse()
                .unwrap(),
        ])
    }
}

/// Writes an empty output file, like a finished download would.
#[derive(Clone, Default)]
struct FakeDownloader {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<DownloadRequest>>>,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, request: &DownloadRequest) -> KasumiResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        std::fs::write(&request.output, b"")?;
        Ok(())
    }
}

fn episode(number: u32, playback: &str) -> Title {
    Title::Episode(Episode {
        service: "FAKE",
        show: "Fake Show".to_string(),
        season: 1,
        number,
        name: format!("Episode {number}"),
        description: None,
        playback: PlaybackReference::new(playback),
    })
}

struct Harness {
    _server: MockServer,
    output: TempDir,
    keys: FakeKeyProvider,
    downloader: FakeDownloader,
    pipeline: Pipeline,
}

async fn harness(
    titles: Vec<Title>,
    license_url: Option<&str>,
    quality: Option<u64>,
    with_keys: bool,
) -> Harness {
    init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.mpd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PROTECTED_MPD))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let adapter = FakeAdapter {
        manifest_url: Url::parse(&format!("{}/index.mpd", server.uri())).unwrap(),
        license_url: license_url.map(str::to_string),
        titles,
    };
    let keys = FakeKeyProvider::default();
    let downloader = FakeDownloader::default();
    let options = PipelineOptions {
        quality: quality.map(|q| Quality::new(q).unwrap()),
        output_dir: output.path().join("downloads"),
        ..Default::default()
    };

    let mut pipeline = Pipeline::new(
        Box::new(adapter),
        ManifestFetcher::new(HttpClient::browser().assert_success()),
        Box::new(downloader.clone()),
        options,
    )
    .assert_success()
    .with_workdir(WorkDir::new_in(output.path().join("work")).assert_success());
    if with_keys {
        pipeline = pipeline.with_key_provider(Box::new(keys.clone()));
    }

    Harness {
        _server: server,
        output,
        keys,
        downloader,
        pipeline,
    }
}

fn downloaded_height(harness: &Harness) -> u64 {
    let requests = harness.downloader.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    requests[0].height
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[tokio::test]
async fn test_highest_quality_by_default() {
    let harness = harness(vec![episode(1, "1")], Some(LICENSE_URL), None, true).await;
    let report = harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Complete)
        .await
        .assert_success();

    assert!(report.is_success());
    assert_eq!(downloaded_height(&harness), 1080);
    assert_eq!(
        file_name(&report.downloaded[0]),
        "Fake.Show.S01E01.Episode.1.1080p.AAC2.0.mkv"
    );
}

#[tokio::test]
async fn test_closest_quality_prefers_higher() {
    let harness = harness(vec![episode(1, "1")], Some(LICENSE_URL), Some(900), true).await;
    harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Complete)
        .await
        .assert_success();

    assert_eq!(downloaded_height(&harness), 1080);
}

#[tokio::test]
async fn test_exact_quality() {
    let harness = harness(vec![episode(1, "1")], Some(LICENSE_URL), Some(720), true).await;
    harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Complete)
        .await
        .assert_success();

    assert_eq!(downloaded_height(&harness), 720);
}

#[tokio::test]
async fn test_pssh_and_key_file() {
    let harness = harness(vec![episode(1, "1")], Some(LICENSE_URL), None, true).await;
    harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Complete)
        .await
        .assert_success();

    let pssh = harness.keys.pssh.lock().unwrap().clone();
    assert_eq!(pssh, vec![KID_PSSH.to_string()]);

    let bytes = STANDARD.decode(&pssh[0]).unwrap();
    assert_eq!(bytes.len(), 52);
    assert_eq!(&bytes[4..8], b"pssh");
    assert_eq!(
        hex::encode(&bytes[36..]),
        "edef8ba979d64acea3c827dcd51d21ed"
    );

    let requests = harness.downloader.requests.lock().unwrap();
    let key_file = requests[0].key_file.clone().unwrap();
    assert_eq!(key_file, harness.pipeline.workdir().key_file_path());
    assert_eq!(
        std::fs::read_to_string(key_file).unwrap(),
        "edef8ba979d64acea3c827dcd51d21ed:00112233445566778899aabbccddeeff"
    );
    assert!(matches!(requests[0].manifest, ManifestSource::Remote(_)));
}

#[tokio::test]
async fn test_premium_required() {
    let harness = harness(vec![episode(1, PREMIUM)], Some(LICENSE_URL), None, true).await;
    let report = harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Complete)
        .await
        .assert_success();

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    let failure = &report.failed[0].failure;
    assert_eq!(failure.stage, Stage::ResolvePlayback);
    assert!(matches!(failure.error, KasumiError::PremiumRequired));
    assert_eq!(harness.keys.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.downloader.calls.load(Ordering::SeqCst), 0);

    let result = harness.pipeline.process(&episode(1, PREMIUM)).await;
    assert!(matches!(
        result.map_err(|e| e.error),
        Err(KasumiError::PremiumRequired)
    ));
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let harness = harness(
        vec![episode(1, PREMIUM), episode(2, "2")],
        Some(LICENSE_URL),
        None,
        true,
    )
    .await;
    let report = harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Season(1))
        .await
        .assert_success();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.downloaded.len(), 1);
    assert_eq!(report.to_string(), "1 downloaded, 0 skipped, 1 failed");
}

#[tokio::test]
async fn test_existing_output_is_skipped() {
    let harness = harness(vec![episode(1, "1")], Some(LICENSE_URL), None, true).await;
    let run = || {
        harness.pipeline.run(
            "https://fake.example.com/show",
            TitleQuery::Series,
            &Selection::Complete,
        )
    };

    let first = run().await.assert_success();
    assert_eq!(first.downloaded.len(), 1);

    let key_file = harness.pipeline.workdir().key_file_path();
    std::fs::write(&key_file, "sentinel").unwrap();

    let second = run().await.assert_success();
    assert_eq!(second.downloaded.len(), 0);
    assert_eq!(second.skipped, first.downloaded);
    assert_eq!(harness.downloader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.keys.calls.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read_to_string(&key_file).unwrap(), "sentinel");
}

#[tokio::test]
async fn test_clear_stream() {
    let harness = harness(vec![episode(1, "1")], None, None, false).await;
    let report = harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Complete)
        .await
        .assert_success();

    assert!(report.is_success());
    let requests = harness.downloader.requests.lock().unwrap();
    assert!(requests[0].key_file.is_none());
    assert!(!harness.pipeline.workdir().key_file_path().exists());
}

#[tokio::test]
async fn test_missing_key_provider() {
    let harness = harness(vec![episode(1, "1")], Some(LICENSE_URL), None, false).await;
    let report = harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::Complete)
        .await
        .assert_success();

    let failure = &report.failed[0].failure;
    assert_eq!(failure.stage, Stage::AcquireKeys);
    assert!(matches!(failure.error, KasumiError::LicenseError(_)));
    assert_eq!(harness.downloader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_list_only() {
    let harness = harness(
        vec![episode(1, "1"), episode(2, "2")],
        Some(LICENSE_URL),
        None,
        true,
    )
    .await;
    let report = harness
        .pipeline
        .run("https://fake.example.com/show", TitleQuery::Series, &Selection::List)
        .await
        .assert_success();

    assert_eq!(
        report.listed,
        vec!["Fake Show S01E01 Episode 1", "Fake Show S01E02 Episode 2"]
    );
    assert_eq!(harness.downloader.calls.load(Ordering::SeqCst), 0);
    assert!(report.downloaded.is_empty());
    assert!(!harness.output.path().join("downloads").exists());
}
