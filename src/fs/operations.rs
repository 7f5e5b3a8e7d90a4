use std::path::{Path, PathBuf};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Replaces the contents of `path` with `data`. The data is written into a sibling temporary file,
/// synced and then renamed over the target, so readers either see the old document or the new
/// one, never a half-written file.
pub async fn replace_file(path: &Path, data: &[u8]) -> Result<(), io::Error> {
    let temp_path = sibling_with_suffix(path, "tmp");
    debug!("Replacing {path:?} through {temp_path:?}");

    let mut temp = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .await?;
    temp.write_all(data).await?;
    temp.flush().await?;
    temp.sync_all().await?;
    drop(temp);

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        // Leftover temp files are harmless but there's no point keeping them around.
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Reads the whole file. A missing file is reported as `None`.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).await?;
    Ok(Some(buffer))
}

/// Advisory lock on a sidecar file. Used to keep separate processes from interleaving
/// read-modify-write cycles over the same document.
pub struct LockFile {
    file: File,
}

impl LockFile {
    async fn open(path: &Path) -> Result<File, io::Error> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await
    }

    pub async fn exclusive(path: &Path) -> Result<Self, io::Error> {
        let file = Self::open(path).await?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    pub async fn shared(path: &Path) -> Result<Self, io::Error> {
        let file = Self::open(path).await?;
        file.lock_shared()?;
        Ok(Self { file })
    }

    pub async fn release(self) -> Result<(), io::Error> {
        self.file.unlock_async().await
    }
}

/// `activities.json` + `lock` -> `activities.json.lock`
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|v| v.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
