// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Durable FIFO queue with serialized fire-and-forget delivery.
//!
//! Accepted requests are persisted before any network activity, so a queue
//! populated in one run is delivered in the next. Delivery is at-most-once:
//! an entry is removed from storage when the drain loop pops it, before its
//! network attempt resolves, and a failed attempt is never re-queued. The
//! caller observes outcomes only through the [`Notifier`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use cio_tracker_core::{HttpMethod, TrackingRequest};

use crate::humanity::HumanityCheck;
use crate::notify::{DeliveryNotice, NotificationChannel, Notifier};
use crate::storage::{KvStore, QUEUE_KEY};
use crate::transport::TrackingTransport;

/// Default pause before each delivery attempt. The pause gives an unload
/// signal time to arrive before the network call fires, so teardown does not
/// race a fresh request.
pub const DEFAULT_DRAIN_DELAY: Duration = Duration::from_millis(25);

/// Tuning knobs for the request queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
	/// Master switch. When false, every enqueue and drain is a no-op.
	pub send_tracking_events: bool,
	/// Pause before each delivery attempt.
	pub drain_delay: Duration,
}

impl Default for QueueConfig {
	fn default() -> Self {
		Self {
			send_tracking_events: true,
			drain_delay: DEFAULT_DRAIN_DELAY,
		}
	}
}

/// The tracking request queue.
///
/// One request is in flight at a time, enforced by `request_pending`; every
/// read-modify-write of the stored queue sits under `store_lock`, which is
/// the mutual exclusion a multi-threaded runtime needs around the
/// check-pop-persist sequence. Delivery runs on a background task that
/// [`RequestQueue::new`] spawns and [`RequestQueue::shutdown`] stops.
pub struct RequestQueue {
	config: QueueConfig,
	local: Arc<dyn KvStore>,
	humanity: Arc<HumanityCheck>,
	notifier: Arc<Notifier>,
	transport: Arc<dyn TrackingTransport>,
	request_pending: AtomicBool,
	page_unloading: AtomicBool,
	shutdown: AtomicBool,
	drain_notify: Notify,
	store_lock: Mutex<()>,
}

impl RequestQueue {
	/// Builds the queue, spawns its delivery task and, when tracking is
	/// enabled, kicks one drain to deliver entries persisted by a previous
	/// run.
	///
	/// Must be called from within a tokio runtime.
	pub fn new(
		config: QueueConfig,
		local: Arc<dyn KvStore>,
		humanity: Arc<HumanityCheck>,
		notifier: Arc<Notifier>,
		transport: Arc<dyn TrackingTransport>,
	) -> Arc<Self> {
		let queue = Arc::new(Self {
			config,
			local,
			humanity,
			notifier,
			transport,
			request_pending: AtomicBool::new(false),
			page_unloading: AtomicBool::new(false),
			shutdown: AtomicBool::new(false),
			drain_notify: Notify::new(),
			store_lock: Mutex::new(()),
		});

		let runner = Arc::clone(&queue);
		tokio::spawn(async move {
			runner.run().await;
		});

		if queue.config.send_tracking_events {
			queue.drain();
		}
		queue
	}

	/// Appends a request and triggers a drain.
	///
	/// Silently drops the request when tracking is disabled or the client
	/// classifies as a bot. Storage failures are logged and swallowed;
	/// callers never see an error from this path.
	pub async fn enqueue(
		&self,
		url: impl Into<String>,
		method: HttpMethod,
		body: Option<Map<String, Value>>,
	) {
		if !self.config.send_tracking_events {
			return;
		}
		if self.humanity.is_bot() {
			debug!("dropping tracking request from bot client");
			return;
		}

		let request = TrackingRequest {
			url: url.into(),
			method,
			body,
		};
		debug!(url = %request.url, method = %request.method, "queueing tracking request");
		{
			let _guard = self.store_lock.lock().await;
			let mut entries = self.read_queue().await;
			entries.push(request);
			self.write_queue(&entries).await;
		}
		self.drain();
	}

	/// Wakes the delivery task for one delivery attempt.
	///
	/// No-op when tracking is disabled. A failed guard check does nothing
	/// and does not reschedule itself; draining resumes on the next enqueue
	/// or drain call.
	pub fn drain(&self) {
		if !self.config.send_tracking_events {
			return;
		}
		self.drain_notify.notify_one();
	}

	/// Marks the page as unloading. Permanent for this instance: no new
	/// delivery attempt starts afterwards, though an in-flight one is not
	/// aborted.
	pub fn mark_unloading(&self) {
		self.page_unloading.store(true, Ordering::SeqCst);
	}

	pub fn is_unloading(&self) -> bool {
		self.page_unloading.load(Ordering::SeqCst)
	}

	/// Stops the delivery task. Entries still in storage stay there for a
	/// future instance; an in-flight attempt finishes first.
	pub fn shutdown(&self) {
		self.shutdown.store(true, Ordering::SeqCst);
		self.drain_notify.notify_one();
	}

	/// Number of requests currently persisted.
	pub async fn stored_len(&self) -> usize {
		let _guard = self.store_lock.lock().await;
		self.read_queue().await.len()
	}

	/// Delivery task body: waits for a drain trigger, then works through the
	/// stored queue one request at a time.
	async fn run(&self) {
		debug!("tracking queue delivery task started");
		loop {
			self.drain_notify.notified().await;
			if self.shutdown.load(Ordering::SeqCst) {
				break;
			}
			self.drain_chain().await;
		}
		debug!("tracking queue delivery task stopped");
	}

	async fn drain_chain(&self) {
		loop {
			tokio::time::sleep(self.config.drain_delay).await;

			if self.shutdown.load(Ordering::SeqCst) {
				return;
			}
			if self.page_unloading.load(Ordering::SeqCst) {
				return;
			}
			if !self.humanity.is_human().await {
				return;
			}
			if self
				.request_pending
				.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
				.is_err()
			{
				// Another attempt is mid-flight; it keeps draining.
				return;
			}

			let Some(request) = self.pop_front().await else {
				self.request_pending.store(false, Ordering::SeqCst);
				return;
			};

			// Success and failure both land here exactly once; the flag is
			// cleared and the loop moves to the next entry either way.
			self.deliver(&request).await;
			self.request_pending.store(false, Ordering::SeqCst);
		}
	}

	/// Pops the oldest entry and persists the shortened queue before the
	/// network attempt resolves. At-most-once delivery follows from this
	/// ordering.
	async fn pop_front(&self) -> Option<TrackingRequest> {
		let _guard = self.store_lock.lock().await;
		let mut entries = self.read_queue().await;
		if entries.is_empty() {
			return None;
		}
		let request = entries.remove(0);
		self.write_queue(&entries).await;
		Some(request)
	}

	async fn deliver(&self, request: &TrackingRequest) {
		match self.transport.send(request).await {
			Ok(reply) if reply.is_ok() => {
				debug!(url = %request.url, "tracking request delivered");
				self.notify(NotificationChannel::Success, request, "ok");
			}
			Ok(reply) => {
				let message = error_message(&reply.body, reply.status);
				warn!(url = %request.url, status = reply.status, message = %message, "tracking request rejected");
				self.notify(NotificationChannel::Error, request, &message);
			}
			Err(failure) => {
				let message = failure.to_string();
				warn!(url = %request.url, error = %message, "tracking request failed");
				self.notify(NotificationChannel::Error, request, &message);
			}
		}
	}

	fn notify(&self, channel: NotificationChannel, request: &TrackingRequest, message: &str) {
		let notice = DeliveryNotice {
			url: request.url.clone(),
			method: request.method,
			message: message.to_string(),
		};
		self.notifier.publish(channel, &notice);
	}

	async fn read_queue(&self) -> Vec<TrackingRequest> {
		match self.local.get(QUEUE_KEY).await {
			Ok(Some(raw)) => match serde_json::from_str(&raw) {
				Ok(entries) => entries,
				Err(e) => {
					warn!(error = %e, "stored queue is unreadable, treating as empty");
					Vec::new()
				}
			},
			Ok(None) => Vec::new(),
			Err(e) => {
				warn!(error = %e, "failed to read stored queue");
				Vec::new()
			}
		}
	}

	async fn write_queue(&self, entries: &[TrackingRequest]) {
		let raw = match serde_json::to_string(entries) {
			Ok(raw) => raw,
			Err(e) => {
				warn!(error = %e, "failed to serialize queue");
				return;
			}
		};
		if let Err(e) = self.local.set(QUEUE_KEY, &raw).await {
			warn!(error = %e, "failed to persist queue");
		}
	}
}

/// Extracts the server's `message` field from a non-2xx body. A parseable
/// body without that field reports the status; an unparseable body reports
/// the parse failure itself.
fn error_message(body: &str, status: u16) -> String {
	match serde_json::from_str::<Value>(body) {
		Ok(value) => value
			.get("message")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.unwrap_or_else(|| format!("http {status}")),
		Err(e) => e.to_string(),
	}
}
