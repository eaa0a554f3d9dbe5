//! # Download pipeline
//!
//! Every selected title goes through the same sequence of stages:
//!
//! ```text
//! RESOLVE_PLAYBACK → FETCH_MANIFEST → BUILD_PSSH → SELECT_RENDITION → ACQUIRE_KEYS → INVOKE_DOWNLOADER → DONE
//! ```
//!
//! preceded once per run by `RESOLVE_TITLE`. Titles are processed one after another. A failure
//! only aborts the title it happened on and is recorded in the [`BatchReport`] together with
//! the stage it happened at.
//!
//! A title whose output file already exists is skipped before any key is requested, and no
//! working file is written for it.
use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use crate::{
    download::{DownloadRequest, Downloader},
    error::{KasumiError, KasumiResult},
    key::KeyProvider,
    manifest::ManifestFetcher,
    platform::PlatformAdapter,
    pssh::build_pssh,
    select::{select, AudioPreference, Quality},
    title::{Selection, Title, TitleQuery},
    workdir::WorkDir,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveTitle,
    ResolvePlayback,
    FetchManifest,
    BuildPssh,
    SelectRendition,
    AcquireKeys,
    InvokeDownloader,
    Done,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResolveTitle => "RESOLVE_TITLE",
            Stage::ResolvePlayback => "RESOLVE_PLAYBACK",
            Stage::FetchManifest => "FETCH_MANIFEST",
            Stage::BuildPssh => "BUILD_PSSH",
            Stage::SelectRendition => "SELECT_RENDITION",
            Stage::AcquireKeys => "ACQUIRE_KEYS",
            Stage::InvokeDownloader => "INVOKE_DOWNLOADER",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: KasumiError,
}

impl Display for StageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

trait StageExt<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageExt<T> for KasumiResult<T> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Downloaded(PathBuf),
    /// The output file already existed.
    Skipped(PathBuf),
}

#[derive(Debug)]
pub struct ItemFailure {
    pub title: String,
    pub failure: StageError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub listed: Vec<String>,
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log_summary(&self) {
        log::info!("{self}");
        for item in &self.failed {
            log::error!("{}: {}", item.title, item.failure);
        }
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} skipped, {} failed",
            self.downloaded.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub quality: Option<Quality>,
    pub audio: AudioPreference,
    pub output_dir: PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            quality: None,
            audio: AudioPreference::Best,
            output_dir: PathBuf::from("downloads"),
        }
    }
}

pub struct Pipeline {
    adapter: Box<dyn PlatformAdapter>,
    fetcher: ManifestFetcher,
    key_provider: Option<Box<dyn KeyProvider>>,
    downloader: Box<dyn Downloader>,
    workdir: WorkDir,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        adapter: Box<dyn PlatformAdapter>,
        fetcher: ManifestFetcher,
        downloader: Box<dyn Downloader>,
        options: PipelineOptions,
    ) -> KasumiResult<Self> {
        Ok(Self {
            adapter,
            fetcher,
            key_provider: None,
            downloader,
            workdir: WorkDir::new()?,
            options,
        })
    }

    pub fn with_key_provider(mut self, provider: Box<dyn KeyProvider>) -> Self {
        self.key_provider = Some(provider);
        self
    }

    pub fn with_workdir(mut self, workdir: WorkDir) -> Self {
        self.workdir = workdir;
        self
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    /// Resolves `url` and downloads every title matching `selection`, one at a time.
    ///
    /// Only a failure to resolve the titles aborts the run. Per-title failures are collected
    /// in the returned report.
    pub async fn run(
        &self,
        url: &str,
        query: TitleQuery,
        selection: &Selection,
    ) -> Result<BatchReport, StageError> {
        log::debug!("[{}] {}", self.adapter.name(), Stage::ResolveTitle);
        let content = self
            .adapter
            .resolve_title(url, query)
            .await
            .at(Stage::ResolveTitle)?;
        log::info!("{content}");

        let mut report = BatchReport::default();
        if *selection == Selection::List {
            for title in &content.titles {
                log::info!("{title}");
                report.listed.push(title.to_string());
            }
            return Ok(report);
        }

        let titles = match query {
            TitleQuery::Single => content.titles,
            _ => content.select(selection),
        };
        if titles.is_empty() {
            log::warn!("Nothing matched the selection in {}", content.title);
        }

        for title in titles {
            match self.process(&title).await {
                Ok(ItemOutcome::Downloaded(path)) => report.downloaded.push(path),
                Ok(ItemOutcome::Skipped(path)) => report.skipped.push(path),
                Err(failure) => {
                    log::error!("{title}: {failure}");
                    report.failed.push(ItemFailure {
                        title: title.to_string(),
                        failure,
                    });
                }
            }
        }

        report.log_summary();
        Ok(report)
    }

    /// Runs a single title through every stage after title resolution.
    pub async fn process(&self, title: &Title) -> Result<ItemOutcome, StageError> {
        log::info!("{title}");

        log::debug!("{}", Stage::ResolvePlayback);
        let session = self
            .adapter
            .resolve_playback(title.playback())
            .await
            .at(Stage::ResolvePlayback)?;

        log::debug!("{}", Stage::FetchManifest);
        let manifest = self
            .fetcher
            .fetch(&session.manifest_url, self.adapter.fetch_manifest_hint())
            .await
            .at(Stage::FetchManifest)?;

        let pssh = match session.license_url {
            Some(_) => {
                log::debug!("{}", Stage::BuildPssh);
                Some(build_pssh(&manifest).at(Stage::BuildPssh)?)
            }
            None => None,
        };

        log::debug!("{}", Stage::SelectRendition);
        let target = select(&manifest, self.options.quality, &self.options.audio)
            .at(Stage::SelectRendition)?;

        let stem = title.file_stem(&target);
        let output = DownloadRequest::output_path(&self.options.output_dir, &stem);
        let exists = tokio::fs::try_exists(&output)
            .await
            .map_err(KasumiError::from)
            .at(Stage::SelectRendition)?;
        if exists {
            log::info!("{} already exists. Skipping download", output.display());
            return Ok(ItemOutcome::Skipped(output));
        }

        let key_file = match (pssh, &session.license_url) {
            (Some(pssh), Some(license_url)) => {
                log::debug!("{}", Stage::AcquireKeys);
                let provider = self
                    .key_provider
                    .as_ref()
                    .ok_or_else(|| {
                        KasumiError::LicenseError("no key provider configured".to_string())
                    })
                    .at(Stage::AcquireKeys)?;
                let keys = provider
                    .acquire(&pssh, license_url)
                    .await
                    .at(Stage::AcquireKeys)?;
                for key in keys.iter() {
                    log::info!("{key}");
                }
                Some(self.workdir.write_keys(&keys).await.at(Stage::AcquireKeys)?)
            }
            _ => None,
        };

        let manifest = self
            .fetcher
            .persist(&manifest, &self.workdir)
            .await
            .at(Stage::FetchManifest)?;

        log::debug!("{}", Stage::InvokeDownloader);
        tokio::fs::create_dir_all(&self.options.output_dir)
            .await
            .map_err(KasumiError::from)
            .at(Stage::InvokeDownloader)?;
        let request = DownloadRequest {
            manifest,
            key_file,
            subtitle: None,
            output: output.clone(),
            height: target.height,
        };
        self.downloader
            .download(&request)
            .await
            .at(Stage::InvokeDownloader)?;

        log::debug!("{}", Stage::Done);
        Ok(ItemOutcome::Downloaded(output))
    }
}
