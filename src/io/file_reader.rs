use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::RangeReader;
use crate::error::IoError;

/// Local-file implementation of [`RangeReader`].
///
/// Slide files are read in place with positioned reads, so no seek state is
/// shared between concurrent callers. The file size is captured once at open
/// time; slide files are immutable while opened. Cloning is cheap: clones
/// share the same open file handle.
#[derive(Clone, Debug)]
pub struct FileRangeReader {
    file: Arc<std::fs::File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open the file at `path` for positioned reads.
    ///
    /// Returns [`IoError::NotFound`] if the path does not exist and
    /// [`IoError::File`] for any other open failure.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_owned();
        let identifier = path.display().to_string();

        let ident = identifier.clone();
        let (file, size) = tokio::task::spawn_blocking(
            move || -> Result<(std::fs::File, u64), IoError> {
                let file = std::fs::File::open(&path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        IoError::NotFound(ident.clone())
                    } else {
                        IoError::File(format!("{}: {}", ident, e))
                    }
                })?;
                let size = file
                    .metadata()
                    .map_err(|e| IoError::File(format!("{}: {}", ident, e)))?
                    .len();
                Ok((file, size))
            },
        )
        .await
        .map_err(|e| IoError::File(format!("blocking open task failed: {e}")))??;

        Ok(Self {
            file: Arc::new(file),
            size,
            identifier,
        })
    }
}

#[async_trait]
impl RangeReader for FileRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let end = offset.checked_add(len as u64).ok_or(IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size: self.size,
        })?;
        if end > self.size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }

        if len == 0 {
            return Ok(Bytes::new());
        }

        let file = Arc::clone(&self.file);
        let identifier = self.identifier.clone();
        let buf = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, IoError> {
            let mut buf = vec![0u8; len];
            read_at_into(&file, offset, &mut buf)
                .map_err(|e| IoError::File(format!("{}: {}", identifier, e)))?;
            Ok(buf)
        })
        .await
        .map_err(|e| IoError::File(format!("blocking read task failed: {e}")))??;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

#[cfg(unix)]
fn read_at_into(file: &std::fs::File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_at_into(file: &std::fs::File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut read = 0usize;
    while read < buf.len() {
        let n = file.seek_read(&mut buf[read..], offset + read as u64)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file truncated during read",
            ));
        }
        read += n;
    }
    Ok(())
}
