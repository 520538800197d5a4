// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the tracking SDK.
//!
//! These errors only ever surface synchronously, before a request is
//! accepted. Delivery failures are reported through the notifier's error
//! channel instead and never as a `TrackerError`.

use thiserror::Error;

/// Tracking SDK errors.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// API key is missing or empty.
	#[error("invalid API key: must be non-empty")]
	InvalidApiKey,

	/// Base URL failed to parse.
	#[error("invalid base URL: {0}")]
	InvalidBaseUrl(String),

	/// A tracking call was given parameters that fail validation.
	#[error("invalid tracking parameters: {0}")]
	InvalidParameters(String),

	/// `subscribe` was given a channel name other than "success" or "error".
	#[error("unknown notification channel {0:?}, expected \"success\" or \"error\"")]
	InvalidNotificationChannel(String),

	/// Reading or writing a backing store failed.
	#[error("storage error: {0}")]
	Storage(String),

	/// A persisted value could not be serialized.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type alias for tracking operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
