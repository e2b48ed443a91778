pub mod convert;

use chrono::{DateTime, Datelike, TimeZone};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Route prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "uploads";

const MAX_NAME_ATTEMPTS: usize = 8;

/// Year / zero-padded month directory an upload lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub year: i32,
    pub month: u32,
}

impl Partition {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.year.to_string()).join(format!("{:02}", self.month))
    }

    /// `uploads/<year>/<month>/<file_name>`, with the file name percent-encoded.
    pub fn url_path(&self, file_name: &str) -> String {
        format!(
            "{}/{}/{:02}/{}",
            PUBLIC_PREFIX,
            self.year,
            self.month,
            urlencoding::encode(file_name)
        )
    }
}

#[derive(Clone)]
pub struct FilesStorage {
    upload_dir: PathBuf,
    base_url: String,
}

impl FilesStorage {
    pub fn new(upload_dir: impl AsRef<Path>, base_url: &str) -> Self {
        Self {
            upload_dir: upload_dir.as_ref().to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn partition_dir(&self, partition: &Partition) -> PathBuf {
        self.upload_dir.join(partition.relative_path())
    }

    pub fn public_url(&self, partition: &Partition, file_name: &str) -> String {
        format!("{}/{}", self.base_url, partition.url_path(file_name))
    }

    /// Creates the partition directory and its parents. Another request racing
    /// to create the same directory is not an error.
    pub async fn ensure_dir(&self, partition: &Partition) -> io::Result<PathBuf> {
        let dir = self.partition_dir(partition);
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(dir),
            Err(e) => Err(e),
        }
    }

    /// Writes `bytes` as `<stamp>-<name>` inside `dir` without ever replacing an
    /// existing file. On a clash a random segment is inserted:
    /// `<stamp>-<8 hex>-<name>`.
    pub async fn persist(
        &self,
        dir: &Path,
        stamp_millis: i64,
        name: &str,
        bytes: &[u8],
    ) -> io::Result<PathBuf> {
        let mut candidate = format!("{}-{}", stamp_millis, name);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(&candidate);
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match opened {
                Ok(file) => {
                    write_or_discard(&path, file, bytes).await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let suffix = Uuid::new_v4().simple().to_string();
                    candidate = format!("{}-{}-{}", stamp_millis, &suffix[..8], name);
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name for {}", name),
        ))
    }

    pub async fn delete_file(&self, file_path: impl AsRef<Path>) -> io::Result<()> {
        tokio::fs::remove_file(file_path).await
    }
}

/// Writes `bytes` to a freshly created file, removing it again if the write fails
/// so no truncated upload is left behind.
async fn write_or_discard<W>(path: &Path, mut file: W, bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            log::warn!("could not remove partial file {}: {}", path.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

/// Keeps only the final path component of a client-supplied file name.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match last {
        "" | "." | ".." => "file".to_string(),
        other => other.to_string(),
    }
}

/// Swaps the last extension of `file_name` for `ext`, or appends one if there is none.
pub fn replace_extension(file_name: &str, ext: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.{}", stem, ext),
        _ => format!("{}.{}", file_name, ext),
    }
}

/// File name component of a path produced by [`FilesStorage::persist`].
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
