use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    error::{KasumiError, KasumiResult},
    manifest::ManifestSource,
};

/// Container produced by the external downloader.
pub const OUTPUT_EXTENSION: &str = "mkv";

/// Everything the external downloader needs for one item.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub manifest: ManifestSource,
    pub key_file: Option<PathBuf>,
    pub subtitle: Option<PathBuf>,
    /// Final file, `{output_dir}/{stem}.mkv`.
    pub output: PathBuf,
    /// Selected video height.
    pub height: u64,
}

impl DownloadRequest {
    pub fn output_path<P: AsRef<Path>>(output_dir: P, stem: &str) -> PathBuf {
        output_dir
            .as_ref()
            .join(format!("{stem}.{OUTPUT_EXTENSION}"))
    }
}

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Runs to completion. Any failure is a [`KasumiError::DownloadError`].
    async fn download(&self, request: &DownloadRequest) -> KasumiResult<()>;
}

/// Spawns an N_m3u8DL-RE compatible executable.
pub struct ExternalDownloader {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl ExternalDownloader {
    pub fn new<P: Into<PathBuf>>(program: P, extra_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
        }
    }

    /// Looks `name` up in `PATH`.
    pub fn find(name: &str, extra_args: Vec<String>) -> KasumiResult<Self> {
        let program = which::which(name)?;
        Ok(Self::new(program, extra_args))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self, request: &DownloadRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![request.manifest.to_string().into()];

        let save_dir = request.output.parent().unwrap_or_else(|| Path::new("."));
        let save_name = request
            .output
            .file_stem()
            .map(|stem| stem.to_os_string())
            .unwrap_or_default();
        args.push("--save-dir".into());
        args.push(save_dir.as_os_str().to_os_string());
        args.push("--save-name".into());
        args.push(save_name);

        args.push("--select-video".into());
        args.push(format!("res=.*{}.*", request.height).into());
        args.push("--select-audio".into());
        args.push("for=best".into());
        args.push("-M".into());
        args.push(format!("format={OUTPUT_EXTENSION}").into());

        if let Some(key_file) = &request.key_file {
            args.push("--key-text-file".into());
            args.push(key_file.as_os_str().to_os_string());
        }
        if let Some(subtitle) = &request.subtitle {
            args.push("--mux-import".into());
            args.push(format!("path={}:lang=eng", subtitle.display()).into());
        }

        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }
}

#[async_trait]
impl Downloader for ExternalDownloader {
    async fn download(&self, request: &DownloadRequest) -> KasumiResult<()> {
        log::debug!(
            "Invoking {} for {}",
            self.program.display(),
            request.output.display()
        );

        let status = Command::new(&self.program)
            .args(self.args(request))
            .status()
            .await
            .map_err(|e| {
                KasumiError::DownloadError(format!(
                    "failed to launch {}: {e}",
                    self.program.display()
                ))
            })?;

        if !status.success() {
            return Err(KasumiError::DownloadError(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }

        Ok(())
    }
}
