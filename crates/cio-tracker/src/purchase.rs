// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Session-scoped ledger preventing duplicate purchase submissions.
//!
//! Order ids are keyed by a 32-bit checksum, not stored verbatim. Checksum
//! collisions can drop a legitimate second purchase; that false negative is
//! accepted.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use cio_tracker_core::checksum32;

use crate::storage::{KvStore, PURCHASE_LEDGER_KEY};

/// Records which order ids have already produced a purchase event this
/// session.
pub struct PurchaseGuard {
	session: Arc<dyn KvStore>,
}

impl PurchaseGuard {
	pub fn new(session: Arc<dyn KvStore>) -> Self {
		Self { session }
	}

	/// True when a purchase for `order_id` was already recorded.
	pub async fn has_record(&self, order_id: &str) -> bool {
		let key = checksum32(order_id).to_string();
		self.read_ledger().await.get(&key).copied().unwrap_or(false)
	}

	/// Records `order_id`. Idempotent: recording the same id twice leaves
	/// the ledger unchanged. Storage failures are logged and swallowed so
	/// the tracking path never errors here.
	pub async fn add_record(&self, order_id: &str) {
		let key = checksum32(order_id).to_string();
		let mut ledger = self.read_ledger().await;
		if ledger.get(&key).copied().unwrap_or(false) {
			return;
		}
		ledger.insert(key, true);

		let raw = match serde_json::to_string(&ledger) {
			Ok(raw) => raw,
			Err(e) => {
				warn!(error = %e, "failed to serialize purchase ledger");
				return;
			}
		};
		if let Err(e) = self.session.set(PURCHASE_LEDGER_KEY, &raw).await {
			warn!(error = %e, "failed to persist purchase ledger");
		}
	}

	async fn read_ledger(&self) -> HashMap<String, bool> {
		match self.session.get(PURCHASE_LEDGER_KEY).await {
			Ok(Some(raw)) => match serde_json::from_str(&raw) {
				Ok(ledger) => ledger,
				Err(e) => {
					warn!(error = %e, "purchase ledger is unreadable, treating as empty");
					HashMap::new()
				}
			},
			Ok(None) => HashMap::new(),
			Err(e) => {
				warn!(error = %e, "failed to read purchase ledger");
				HashMap::new()
			}
		}
	}
}
