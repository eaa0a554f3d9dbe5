use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{error::KasumiResult, key::KeySet};

const MANIFEST_FILE: &str = "manifest.m3u8";
const KEY_FILE: &str = "keys.txt";

/// Scratch directory of one run. Files are overwritten per item and removed on drop.
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    pub fn new() -> KasumiResult<Self> {
        let dir = tempfile::Builder::new().prefix("kasumi-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn new_in<P: AsRef<Path>>(parent: P) -> KasumiResult<Self> {
        std::fs::create_dir_all(parent.as_ref())?;
        let dir = tempfile::Builder::new()
            .prefix("kasumi-")
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join(MANIFEST_FILE)
    }

    pub fn key_file_path(&self) -> PathBuf {
        self.path().join(KEY_FILE)
    }

    pub async fn write_manifest(&self, text: &str) -> KasumiResult<PathBuf> {
        let path = self.manifest_path();
        tokio::fs::write(&path, text).await?;
        Ok(path)
    }

    /// Writes one `kid:key` per line.
    pub async fn write_keys(&self, keys: &KeySet) -> KasumiResult<PathBuf> {
        let path = self.key_file_path();
        tokio::fs::write(&path, keys.to_string()).await?;
        Ok(path)
    }
}
