// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Behavioral tracking Rust SDK for cio.
//!
//! This crate is the client-side half of cio's event tracking: a durable,
//! bot-filtered FIFO queue of fire-and-forget tracking requests, plus the
//! call surface that produces them. Requests are persisted before any
//! network activity, delivered one at a time, and never retried; delivery
//! outcomes surface through a success/error notifier instead of the call's
//! return value.
//!
//! # Features
//!
//! - **Durable queueing**: accepted requests survive restarts via an
//!   injected key-value store
//! - **Bot filtering**: crawler user agents and webdriver sessions are
//!   dropped at enqueue; delivery waits for proof of a human operator
//! - **Duplicate-purchase guard**: at most one purchase event per order id
//!   and session
//! - **Unload safety**: a drain pause lets the embedder's unload signal win
//!   the race against fresh network calls
//! - **Beacon-gated lifecycle stream**: `cio.client.*` events queue until
//!   the companion beacon loads
//!
//! # Example
//!
//! ```ignore
//! use cio_tracker::{InteractionKind, SearchSubmitParams, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = Tracker::builder()
//!         .api_key("key_abc123DEF456")
//!         .build()
//!         .await?;
//!
//!     tracker.subscribe("error", |notice| {
//!         eprintln!("delivery failed: {}", notice.message);
//!     })?;
//!
//!     // The embedder forwards interaction events as humanity proof.
//!     tracker.note_interaction(InteractionKind::KeyDown).await;
//!
//!     tracker
//!         .track_search_submit("shoes", SearchSubmitParams::default())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

mod dispatcher;
mod error;
mod events;
mod humanity;
mod notify;
mod purchase;
mod queue;
mod storage;
mod tracker;
mod transport;

pub use dispatcher::{
	DispatcherConfig, LifecycleDispatcher, LifecycleEvent, LifecycleSink, NoOpLifecycleSink,
};
pub use error::{Result, TrackerError};
pub use events::{
	BrowseResultClickParams, BrowseResultsLoadedParams, ConversionParams, PurchaseParams,
	PurchasedItem, RecommendationClickParams, RecommendationViewParams, ResultClickParams,
	SearchResultsLoadedParams, SearchSubmitParams, TrackOutcome,
};
pub use humanity::{ClientEnvironment, HumanityCheck, InteractionKind};
pub use notify::{DeliveryNotice, NotificationChannel, Notifier};
pub use purchase::PurchaseGuard;
pub use queue::{QueueConfig, RequestQueue, DEFAULT_DRAIN_DELAY};
pub use storage::{
	JsonFileStore, KvStore, MemoryStore, TrackerStorage, HUMANITY_KEY, PURCHASE_LEDGER_KEY,
	QUEUE_KEY,
};
pub use tracker::{Tracker, TrackerBuilder, DEFAULT_BASE_URL};
pub use transport::{HttpTransport, TrackingTransport, TransportFailure, TransportReply};

// Re-export core types for convenience
pub use cio_tracker_core::{checksum32, HttpMethod, TrackingRequest};
