// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The queued tracking request record.
//!
//! Requests are persisted as a JSON array under a single storage key, so this
//! type must round-trip through serde without loss. Older persisted entries
//! may omit the method (GET is implied) or the body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP method of a tracking request.
///
/// Tracking endpoints only ever use GET (legacy behavioral endpoints) or
/// POST (v2 behavioral actions).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
	#[default]
	#[serde(rename = "GET")]
	Get,
	#[serde(rename = "POST")]
	Post,
}

impl HttpMethod {
	/// Returns the wire representation ("GET" or "POST").
	pub fn as_str(&self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
		}
	}
}

impl std::fmt::Display for HttpMethod {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single undelivered tracking request.
///
/// Born when a tracking call is accepted; removed from the stored queue when
/// the drain loop pops it, which happens before the network attempt resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRequest {
	/// Fully-built request URL, identity parameters included.
	pub url: String,
	#[serde(default)]
	pub method: HttpMethod,
	/// POST payload; absent for GET requests.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<Map<String, Value>>,
}

impl TrackingRequest {
	/// Creates a bodyless GET request.
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			method: HttpMethod::Get,
			body: None,
		}
	}

	/// Creates a POST request carrying `body`.
	pub fn post(url: impl Into<String>, body: Map<String, Value>) -> Self {
		Self {
			url: url.into(),
			method: HttpMethod::Post,
			body: Some(body),
		}
	}
}
