//! Content-addressed storage backends
//!
//! Pointers are `blake3:<hex digest>` of the stored bytes, so writes are
//! idempotent and concurrent writers of the same content agree.
use crate::collaborators::ContentStorage;
use crate::data_model::SourceFile;
use crate::error::{VerifierError, VerifierResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

const POINTER_PREFIX: &str = "blake3:";

pub fn content_pointer(bytes: &[u8]) -> String {
    format!("{POINTER_PREFIX}{}", blake3::hash(bytes))
}

fn pointer_digest(pointer: &str) -> VerifierResult<&str> {
    let digest = pointer
        .strip_prefix(POINTER_PREFIX)
        .ok_or_else(|| VerifierError::Storage(format!("unsupported pointer {pointer}")))?;
    if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(VerifierError::Storage(format!("malformed pointer {pointer}")));
    }
    Ok(digest)
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, bytes: &[u8]) -> VerifierResult<String> {
        let pointer = content_pointer(bytes);
        let mut objects = self
            .objects
            .write()
            .map_err(|_| VerifierError::Storage("storage lock poisoned".into()))?;
        objects.entry(pointer.clone()).or_insert_with(|| bytes.to_vec());
        Ok(pointer)
    }
}

#[async_trait]
impl ContentStorage for MemoryStorage {
    async fn write(&self, files: &[SourceFile], _pin: bool) -> VerifierResult<Vec<String>> {
        files.iter().map(|f| self.put(&f.content)).collect()
    }

    async fn write_from_content(&self, buffers: &[Vec<u8>], _pin: bool) -> VerifierResult<Vec<String>> {
        buffers.iter().map(|b| self.put(b)).collect()
    }

    async fn read(&self, pointer: &str) -> VerifierResult<Vec<u8>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| VerifierError::Storage("storage lock poisoned".into()))?;
        objects
            .get(pointer)
            .cloned()
            .ok_or_else(|| VerifierError::Storage(format!("{pointer} not found")))
    }
}

/// Directory-backed store, one file per object named by its digest
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn put(&self, bytes: &[u8]) -> VerifierResult<String> {
        let pointer = content_pointer(bytes);
        let path = self.root.join(pointer_digest(&pointer)?);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(pointer);
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| VerifierError::Storage(format!("{}: {e}", self.root.display())))?;
        // readers only ever see complete objects
        let tmp = path.with_extension(format!("tmp{}", rand::random::<u32>()));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| VerifierError::Storage(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| VerifierError::Storage(format!("{}: {e}", path.display())))?;
        tracing::debug!(%pointer, size = bytes.len(), "stored object");
        Ok(pointer)
    }
}

#[async_trait]
impl ContentStorage for FsStorage {
    async fn write(&self, files: &[SourceFile], _pin: bool) -> VerifierResult<Vec<String>> {
        let mut pointers = Vec::with_capacity(files.len());
        for file in files {
            pointers.push(self.put(&file.content).await?);
        }
        Ok(pointers)
    }

    async fn write_from_content(&self, buffers: &[Vec<u8>], _pin: bool) -> VerifierResult<Vec<String>> {
        let mut pointers = Vec::with_capacity(buffers.len());
        for buffer in buffers {
            pointers.push(self.put(buffer).await?);
        }
        Ok(pointers)
    }

    async fn read(&self, pointer: &str) -> VerifierResult<Vec<u8>> {
        let path = self.root.join(pointer_digest(pointer)?);
        tokio::fs::read(&path)
            .await
            .map_err(|e| VerifierError::Storage(format!("{pointer}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_is_content_addressed() {
        let storage = MemoryStorage::new();
        let a = storage
            .write_from_content(&[b"hello".to_vec(), b"hello".to_vec()], true)
            .await
            .unwrap();
        assert_eq!(a[0], a[1]);
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.read(&a[0]).await.unwrap(), b"hello");
        assert!(storage.read("blake3:missing").await.is_err());
    }

    #[tokio::test]
    async fn test_fs_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().join("objects"));
        let files = vec![SourceFile::new("a.fc", b"int a;".to_vec()), SourceFile::new("b.fc", b"int b;".to_vec())];
        let pointers = storage.write(&files, true).await.unwrap();
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[0], content_pointer(b"int a;"));
        assert_eq!(storage.read(&pointers[1]).await.unwrap(), b"int b;");

        // second write of the same bytes is a no-op
        let again = storage.write(&files[..1], true).await.unwrap();
        assert_eq!(again[0], pointers[0]);
    }

    #[tokio::test]
    async fn test_fs_storage_rejects_path_tricks() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        assert!(storage.read("blake3:../../etc/passwd").await.is_err());
        assert!(storage.read("ipfs://Qm").await.is_err());
    }
}
