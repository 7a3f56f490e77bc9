//! Output sinks
//!
//! A file sink writes into a hidden temporary sibling and only renames it
//! onto the final path in [`Sink::commit`]. An export that fails halfway
//! leaves any existing output untouched.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::error::Result;
use crate::utils::fs::ensure_parent_dir;

/// Where an export is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A file, created or replaced
    File(PathBuf),
    /// Standard output
    Stdout,
}

impl OutputTarget {
    /// Human-readable name for logs and summaries
    pub fn describe(&self) -> String {
        match self {
            OutputTarget::File(path) => path.display().to_string(),
            OutputTarget::Stdout => "<stdout>".to_string(),
        }
    }
}

/// Buffered byte sink for one export
pub struct Sink {
    writer: BufWriter<Box<dyn AsyncWrite + Unpin + Send>>,
    target: OutputTarget,
    temp_path: Option<PathBuf>,
}

impl Sink {
    /// Open the sink; for files this creates the temporary sibling
    pub async fn open(target: &OutputTarget) -> Result<Self> {
        let (inner, temp_path): (Box<dyn AsyncWrite + Unpin + Send>, _) = match target {
            OutputTarget::File(path) => {
                ensure_parent_dir(path)?;
                let temp = temp_sibling(path);
                let file = File::create(&temp).await?;
                debug!("Writing to temporary file {}", temp.display());
                (Box::new(file), Some(temp))
            }
            OutputTarget::Stdout => (Box::new(tokio::io::stdout()), None),
        };

        Ok(Self {
            writer: BufWriter::with_capacity(1024 * 1024, inner),
            target: target.clone(),
            temp_path,
        })
    }

    /// Flush and move the output into place
    pub async fn commit(mut self) -> Result<()> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;

        if let (Some(temp), OutputTarget::File(path)) = (self.temp_path.take(), &self.target) {
            tokio::fs::rename(&temp, path).await?;
            debug!("Moved {} to {}", temp.display(), path.display());
        }
        Ok(())
    }

    /// Drop the output; a partially written file is removed
    pub async fn abort(mut self) {
        if let Some(temp) = self.temp_path.take() {
            if let Err(e) = tokio::fs::remove_file(&temp).await {
                warn!("Could not remove {}: {}", temp.display(), e);
            }
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

impl AsyncWrite for Sink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.writer).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_commit_moves_file_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("orders.csv");
        let target = OutputTarget::File(path.clone());

        let mut sink = Sink::open(&target).await.unwrap();
        sink.write_all(b"id\n1\n").await.unwrap();
        assert!(!path.exists());
        sink.commit().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\n1\n");
        assert_eq!(entries(&dir.path().join("out")), vec!["orders.csv"]);
    }

    #[tokio::test]
    async fn test_abort_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        std::fs::write(&path, "[]\n").unwrap();

        let mut sink = Sink::open(&OutputTarget::File(path.clone())).await.unwrap();
        sink.write_all(b"[\n  {").await.unwrap();
        sink.abort().await;

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
        assert_eq!(entries(dir.path()), vec!["orders.json"]);
    }

    #[test]
    fn test_temp_sibling_is_hidden_next_to_target() {
        let temp = temp_sibling(Path::new("/data/orders.csv"));
        assert_eq!(temp.parent(), Some(Path::new("/data")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".orders.csv."));
        assert!(name.ends_with(".tmp"));
    }
}
