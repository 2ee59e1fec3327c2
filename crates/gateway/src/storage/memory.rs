//! # プロセス内ストレージ実装
//!
//! オブジェクトをメモリ上のマップに保持する。ローカル起動（`STORAGE_BACKEND=memory`）とテスト用。
//! S3と同様、オブジェクトを1つも持たないプレフィックスは存在しないものとして扱う。

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use tokio::sync::RwLock;

use super::{AnnotationStorage, StorageEntry, StorageError};

/// メモリ上のオブジェクトストレージ。
pub struct MemoryStorage {
    bucket: String,
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryStorage {
    /// 空のストレージを作成する。
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// 保存済みオブジェクトを取得する。
    #[cfg(test)]
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }

    /// 保存済みオブジェクト数。
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait::async_trait]
impl AnnotationStorage for MemoryStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, dir: &str) -> Result<Vec<StorageEntry>, StorageError> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let objects = self.objects.read().await;

        let mut files = Vec::new();
        let mut dirs = BTreeSet::new();
        for key in objects.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((sub, _)) => {
                    dirs.insert(sub.to_string());
                }
                None => files.push(StorageEntry::new(rest)),
            }
        }

        if files.is_empty() && dirs.is_empty() {
            return Err(StorageError::NotFound(dir.to_string()));
        }

        files.extend(dirs.into_iter().map(StorageEntry::new));
        Ok(files)
    }

    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<(), StorageError> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_missing_dir_is_not_found() {
        let storage = MemoryStorage::new("bucket");
        let result = storage.list("data/day=2024-09-11").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_returns_direct_children_only() {
        let storage = MemoryStorage::new("bucket");
        for key in [
            "data/day=2024-09-11/annot1.parquet",
            "data/day=2024-09-11/notes.txt",
            "data/day=2024-09-11/archive/annot7.parquet",
            "data/day=2024-09-12/annot9.parquet",
        ] {
            storage.put(key, Bytes::from_static(b"x"), "text/plain").await.unwrap();
        }

        let entries = storage.list("data/day=2024-09-11").await.unwrap();
        assert_eq!(
            entries,
            vec![
                StorageEntry::new("annot1.parquet"),
                StorageEntry::new("notes.txt"),
                StorageEntry::new("archive"),
            ]
        );
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = MemoryStorage::new("bucket");
        storage.put("a/b", Bytes::from_static(b"1"), "x").await.unwrap();
        storage.put("a/b", Bytes::from_static(b"2"), "x").await.unwrap();
        assert_eq!(storage.len().await, 1);
        assert_eq!(storage.get("a/b").await.unwrap(), Bytes::from_static(b"2"));
    }
}
