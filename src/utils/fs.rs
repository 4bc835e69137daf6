//! File system sink.
//!
//! All destinations are relative POSIX paths resolved under one root
//! directory. Writes go to a hidden part file in the destination directory
//! and are renamed over the final path only once complete.

use crate::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;

/// Existing file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Local destination directory.
#[derive(Debug, Clone)]
pub struct LocalSink {
    root: PathBuf,
}

impl LocalSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative `/`-separated destination under the root.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Stat a destination. A missing file is `None`, not an error.
    pub async fn stat(&self, rel: &str) -> Result<Option<FileStat>> {
        match tokio::fs::metadata(self.resolve(rel)).await {
            Ok(meta) => Ok(Some(FileStat {
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a directory and all parents. Safe to call concurrently.
    pub async fn mkdir_all(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::write(dir, e))
    }

    /// Write text atomically.
    pub async fn write_text_atomic(&self, rel: &str, text: &str) -> Result<u64> {
        let chunk: Result<Bytes> = Ok(Bytes::copy_from_slice(text.as_bytes()));
        self.write_stream_atomic(
            rel,
            futures::stream::iter([chunk]),
            &CancellationToken::new(),
            |_| {},
        )
        .await
    }

    /// Stream bytes into the destination atomically.
    ///
    /// `on_progress` receives the cumulative byte count after every chunk.
    /// On any error or cancellation the part file is removed and the final
    /// path is left untouched.
    pub async fn write_stream_atomic<S, F>(
        &self,
        rel: &str,
        stream: S,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<u64>
    where
        S: Stream<Item = Result<Bytes>> + Send,
        F: FnMut(u64) + Send,
    {
        let target = self.resolve(rel);
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        self.mkdir_all(&dir).await?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::other(format!("Invalid destination path: {}", rel)))?;
        let part = dir.join(format!(
            ".{}.{}.part",
            file_name,
            uuid::Uuid::new_v4().simple()
        ));

        match copy_to_part(rel, &part, stream, cancel, on_progress).await {
            Ok(written) => {
                if let Err(e) = tokio::fs::rename(&part, &target).await {
                    remove_part(&part).await;
                    return Err(Error::write(&target, e));
                }
                tracing::debug!("Wrote {} bytes to {:?}", written, target);
                Ok(written)
            }
            Err(e) => {
                remove_part(&part).await;
                Err(e)
            }
        }
    }
}

async fn copy_to_part<S, F>(
    rel: &str,
    part: &Path,
    stream: S,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>> + Send,
    F: FnMut(u64) + Send,
{
    let file = tokio::fs::File::create(part)
        .await
        .map_err(|e| Error::write(part, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = std::pin::pin!(stream);
    let mut written = 0u64;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            chunk = stream.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => {
                writer
                    .write_all(&bytes)
                    .await
                    .map_err(|e| Error::write(part, e))?;
                written += bytes.len() as u64;
                on_progress(written);
            }
            Some(Err(Error::Transfer { path, message })) => {
                return Err(Error::Transfer { path, message })
            }
            Some(Err(e)) => return Err(Error::transfer(rel, e)),
            None => break,
        }
    }

    writer.flush().await.map_err(|e| Error::write(part, e))?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(|e| Error::write(part, e))?;
    Ok(written)
}

async fn remove_part(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {:?}: {}", part, e);
        }
    }
}
