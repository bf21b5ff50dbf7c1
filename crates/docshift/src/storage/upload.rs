//! Streaming upload persistence.
//!
//! Uploads are copied in bounded chunks; at most one chunk is held in memory
//! no matter how large the file is.

use super::artifact::Artifact;
use super::layout::{Category, StorageLayout};
use super::sanitize::lowercase_extension;
use crate::{DocshiftError, Result};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWriteExt, SeekFrom};

/// Default copy chunk, 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Copy `reader` into a new file at `dest` in chunks of `chunk_size` bytes.
///
/// Returns the number of bytes written. Every chunk but the last is exactly
/// `chunk_size` bytes. On error the partially written file is left for the
/// caller to discard.
pub async fn persist<R>(reader: &mut R, dest: &Path, chunk_size: usize) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if chunk_size == 0 {
        return Err(DocshiftError::validation("chunk size must be greater than zero"));
    }

    let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
        DocshiftError::upload_write_with_source(format!("Failed to create {}", dest.display()), e)
    })?;

    let mut buffer = vec![0u8; chunk_size];
    let mut total: u64 = 0;

    loop {
        let filled = fill_chunk(reader, &mut buffer).await?;
        if filled == 0 {
            break;
        }
        file.write_all(&buffer[..filled])
            .await
            .map_err(|e| DocshiftError::upload_write_with_source(format!("Failed to write {}", dest.display()), e))?;
        total += filled as u64;
        if filled < chunk_size {
            break;
        }
    }

    file.flush()
        .await
        .map_err(|e| DocshiftError::upload_write_with_source(format!("Failed to flush {}", dest.display()), e))?;

    tracing::debug!("Persisted {} bytes to {}", total, dest.display());
    Ok(total)
}

/// [`persist`], then rewind the source to its start so it can be read again.
pub async fn persist_and_rewind<R>(reader: &mut R, dest: &Path, chunk_size: usize) -> Result<u64>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    let written = persist(reader, dest, chunk_size).await?;
    reader
        .seek(SeekFrom::Start(0))
        .await
        .map_err(|e| DocshiftError::upload_write_with_source("Failed to rewind upload source", e))?;
    Ok(written)
}

/// Read until `buffer` is full or the source is exhausted.
async fn fill_chunk<R>(reader: &mut R, buffer: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader
            .read(&mut buffer[filled..])
            .await
            .map_err(|e| DocshiftError::upload_write_with_source("Failed to read upload stream", e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Allocates upload artifacts and streams request bodies into them.
#[derive(Debug, Clone)]
pub struct UploadPersister {
    layout: StorageLayout,
    chunk_size: usize,
}

impl UploadPersister {
    pub fn new(layout: StorageLayout, chunk_size: usize) -> Self {
        Self { layout, chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Reserve a fresh upload path that keeps the client's extension, lowercased.
    pub fn allocate_upload(&self, original_name: &str) -> Artifact {
        let extension = lowercase_extension(original_name);
        let path = self.layout.allocate(Category::Upload, extension.as_deref());
        Artifact::new(path, Category::Upload)
    }

    pub async fn persist_into<R>(&self, reader: &mut R, artifact: &Artifact) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        persist(reader, artifact.path(), self.chunk_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn roundtrip(len: usize, chunk: usize) {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("upload.pdf");
        let data = payload(len);

        let mut reader = Cursor::new(data.clone());
        let written = persist(&mut reader, &dest, chunk).await.unwrap();

        assert_eq!(written, len as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[tokio::test]
    async fn test_persist_empty_stream() {
        roundtrip(0, 16).await;
    }

    #[tokio::test]
    async fn test_persist_exact_chunk() {
        roundtrip(16, 16).await;
    }

    #[tokio::test]
    async fn test_persist_multiple_chunks_with_tail() {
        roundtrip(16 * 5 + 3, 16).await;
    }

    #[tokio::test]
    async fn test_persist_large_default_chunk() {
        roundtrip(DEFAULT_CHUNK_SIZE * 2 + 17, DEFAULT_CHUNK_SIZE).await;
    }

    #[tokio::test]
    async fn test_persist_and_rewind_resets_position() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("upload.pdf");
        let data = payload(100);

        let mut reader = Cursor::new(data.clone());
        persist_and_rewind(&mut reader, &dest, 32).await.unwrap();

        assert_eq!(reader.position(), 0);
        let mut again = Vec::new();
        reader.read_to_end(&mut again).await.unwrap();
        assert_eq!(again, data);
    }

    #[tokio::test]
    async fn test_persist_zero_chunk_rejected() {
        let dir = tempdir().unwrap();
        let mut reader = Cursor::new(vec![1u8, 2, 3]);
        let err = persist(&mut reader, &dir.path().join("x"), 0).await.unwrap_err();
        assert!(matches!(err, DocshiftError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_persist_unwritable_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing").join("upload.pdf");
        let mut reader = Cursor::new(vec![1u8; 8]);
        let err = persist(&mut reader, &dest, 4).await.unwrap_err();
        assert!(matches!(err, DocshiftError::UploadWrite { .. }));
    }

    #[tokio::test]
    async fn test_persister_keeps_lowercased_extension() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::under(dir.path());
        layout.ensure().unwrap();
        let persister = UploadPersister::new(layout.clone(), 8);

        let artifact = persister.allocate_upload("Scan.PDF");
        assert_eq!(artifact.category(), Category::Upload);
        assert_eq!(artifact.path().extension().unwrap(), "pdf");
        assert!(artifact.path().starts_with(layout.root(Category::Upload)));

        let mut reader = Cursor::new(b"%PDF-1.7 body".to_vec());
        let written = persister.persist_into(&mut reader, &artifact).await.unwrap();
        assert_eq!(written, 13);
    }
}
