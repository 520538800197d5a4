// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Key-value persistence behind the tracking queue and session records.
//!
//! The SDK persists into two scopes: a local scope that must survive
//! restarts (the request queue) and a session scope that lives as long as
//! the embedder says a session does (humanity proof, purchase ledger). Both
//! are injected as [`KvStore`] handles so the backing medium is the
//! embedder's choice.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Result, TrackerError};

/// Local-scope key holding the JSON array of queued tracking requests.
pub const QUEUE_KEY: &str = "_cio_tracking_requests";

/// Session-scope key holding the JSON boolean humanity proof.
pub const HUMANITY_KEY: &str = "_cio_is_human";

/// Session-scope key holding the JSON object of purchase checksums.
pub const PURCHASE_LEDGER_KEY: &str = "_cio_purchase_order_ids";

/// A string-keyed, string-valued store.
///
/// Every value is written whole; there is no partial or append API, so
/// concurrent writers to the same backing store can race and lose entries.
/// That limitation is accepted, not worked around here.
#[async_trait]
pub trait KvStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>>;
	async fn set(&self, key: &str, value: &str) -> Result<()>;
	async fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store with no durability. The default session scope, and the
/// store tests use.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: std::sync::Mutex<HashMap<String, String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl KvStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<String>> {
		let entries = self.entries.lock().expect("memory store lock poisoned");
		Ok(entries.get(key).cloned())
	}

	async fn set(&self, key: &str, value: &str) -> Result<()> {
		let mut entries = self.entries.lock().expect("memory store lock poisoned");
		entries.insert(key.to_string(), value.to_string());
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		let mut entries = self.entries.lock().expect("memory store lock poisoned");
		entries.remove(key);
		Ok(())
	}
}

/// Durable store persisting the whole key-value map as one JSON file.
///
/// A missing file reads as empty; an unreadable file is logged and also
/// reads as empty, so a corrupted queue never wedges the client.
pub struct JsonFileStore {
	path: PathBuf,
	lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: tokio::sync::Mutex::new(()),
		}
	}

	async fn read_map(&self) -> HashMap<String, String> {
		let raw = match tokio::fs::read_to_string(&self.path).await {
			Ok(raw) => raw,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "failed to read store file");
				return HashMap::new();
			}
		};
		match serde_json::from_str(&raw) {
			Ok(map) => map,
			Err(e) => {
				warn!(path = %self.path.display(), error = %e, "store file is not valid JSON, treating as empty");
				HashMap::new()
			}
		}
	}

	async fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|e| TrackerError::Storage(e.to_string()))?;
		}
		let raw = serde_json::to_string(map)?;
		tokio::fs::write(&self.path, raw)
			.await
			.map_err(|e| TrackerError::Storage(e.to_string()))
	}
}

#[async_trait]
impl KvStore for JsonFileStore {
	async fn get(&self, key: &str) -> Result<Option<String>> {
		let _guard = self.lock.lock().await;
		Ok(self.read_map().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: &str) -> Result<()> {
		let _guard = self.lock.lock().await;
		let mut map = self.read_map().await;
		map.insert(key.to_string(), value.to_string());
		self.write_map(&map).await
	}

	async fn remove(&self, key: &str) -> Result<()> {
		let _guard = self.lock.lock().await;
		let mut map = self.read_map().await;
		if map.remove(key).is_some() {
			self.write_map(&map).await?;
		}
		Ok(())
	}
}

/// The two storage scopes the SDK persists into.
#[derive(Clone)]
pub struct TrackerStorage {
	/// Durable across restarts; holds the request queue.
	pub local: Arc<dyn KvStore>,
	/// Session-lifetime; holds the humanity proof and purchase ledger.
	pub session: Arc<dyn KvStore>,
}

impl TrackerStorage {
	pub fn new(local: Arc<dyn KvStore>, session: Arc<dyn KvStore>) -> Self {
		Self { local, session }
	}

	/// Both scopes in memory. Queued requests will not survive a restart;
	/// embedders that need durability pass a [`JsonFileStore`] local scope.
	pub fn in_memory() -> Self {
		Self {
			local: Arc::new(MemoryStore::new()),
			session: Arc::new(MemoryStore::new()),
		}
	}

	/// Durable local scope at `path`, in-memory session scope.
	pub fn with_local_file(path: impl Into<PathBuf>) -> Self {
		Self {
			local: Arc::new(JsonFileStore::new(path)),
			session: Arc::new(MemoryStore::new()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_memory_store_roundtrip() {
		let store = MemoryStore::new();

		assert_eq!(store.get("k").await.unwrap(), None);
		store.set("k", "v").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

		store.remove("k").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_memory_store_overwrites() {
		let store = MemoryStore::new();
		store.set("k", "first").await.unwrap();
		store.set("k", "second").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), Some("second".to_string()));
	}

	#[tokio::test]
	async fn test_file_store_roundtrip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tracker.json");
		let store = JsonFileStore::new(&path);

		store.set(QUEUE_KEY, "[]").await.unwrap();
		assert_eq!(store.get(QUEUE_KEY).await.unwrap(), Some("[]".to_string()));

		store.remove(QUEUE_KEY).await.unwrap();
		assert_eq!(store.get(QUEUE_KEY).await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_file_store_survives_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tracker.json");

		{
			let store = JsonFileStore::new(&path);
			store.set("k", "persisted").await.unwrap();
		}

		let reopened = JsonFileStore::new(&path);
		assert_eq!(
			reopened.get("k").await.unwrap(),
			Some("persisted".to_string())
		);
	}

	#[tokio::test]
	async fn test_file_store_missing_file_reads_empty() {
		let dir = tempfile::tempdir().unwrap();
		let store = JsonFileStore::new(dir.path().join("nonexistent.json"));
		assert_eq!(store.get("k").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_file_store_corrupt_file_reads_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tracker.json");
		tokio::fs::write(&path, "not json {{{").await.unwrap();

		let store = JsonFileStore::new(&path);
		assert_eq!(store.get("k").await.unwrap(), None);

		// Writing through the corrupt file replaces it with valid JSON.
		store.set("k", "v").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
	}

	#[tokio::test]
	async fn test_file_store_creates_parent_dirs() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested/deeper/tracker.json");
		let store = JsonFileStore::new(&path);

		store.set("k", "v").await.unwrap();
		assert!(path.exists());
	}

	#[tokio::test]
	async fn test_in_memory_scopes_are_independent() {
		let storage = TrackerStorage::in_memory();
		storage.local.set("k", "local").await.unwrap();

		assert_eq!(storage.session.get("k").await.unwrap(), None);
	}
}

#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn memory_store_last_write_wins(
			key in "[a-z_]{1,16}",
			values in proptest::collection::vec(".{0,32}", 1..8),
		) {
			let rt = tokio::runtime::Builder::new_current_thread()
				.build()
				.unwrap();
			rt.block_on(async {
				let store = MemoryStore::new();
				for value in &values {
					store.set(&key, value).await.unwrap();
				}
				let got = store.get(&key).await.unwrap();
				assert_eq!(got.as_deref(), values.last().map(String::as_str));
			});
		}
	}
}
