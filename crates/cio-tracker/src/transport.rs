// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP delivery of queued tracking requests.
//!
//! The queue talks to a [`TrackingTransport`] trait object so tests can
//! substitute an instrumented stub; [`HttpTransport`] is the reqwest-backed
//! implementation used everywhere else.

use async_trait::async_trait;
use serde_json::Map;
use thiserror::Error;

use cio_tracker_core::{HttpMethod, TrackingRequest};

/// The request never completed at the network level.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// What the queue needs from a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportReply {
	pub status: u16,
	pub body: String,
}

impl TransportReply {
	pub fn is_ok(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Sends one tracking request.
#[async_trait]
pub trait TrackingTransport: Send + Sync {
	async fn send(&self, request: &TrackingRequest)
		-> Result<TransportReply, TransportFailure>;
}

/// reqwest-backed transport.
///
/// POST bodies are JSON-serialized but sent under content-type `text/plain`.
/// The backend does not answer CORS preflight OPTIONS requests, and
/// `text/plain` keeps browser peers of this SDK preflight-free; the Rust
/// client sends the same bytes so both speak one wire format.
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	/// Transport identifying as the SDK.
	pub fn new() -> Self {
		Self {
			client: cio_common_http::new_client(),
		}
	}

	/// Transport forwarding the embedder's own user agent upstream.
	pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
		Self {
			client: cio_common_http::new_client_with_user_agent(user_agent),
		}
	}
}

impl Default for HttpTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl TrackingTransport for HttpTransport {
	async fn send(
		&self,
		request: &TrackingRequest,
	) -> Result<TransportReply, TransportFailure> {
		let outcome = match request.method {
			HttpMethod::Get => self.client.get(&request.url).send().await,
			HttpMethod::Post => {
				let empty = Map::new();
				let body = serde_json::to_string(request.body.as_ref().unwrap_or(&empty))
					.map_err(|e| TransportFailure(e.to_string()))?;
				self
					.client
					.post(&request.url)
					.header(reqwest::header::CONTENT_TYPE, "text/plain")
					.body(body)
					.send()
					.await
			}
		};

		match outcome {
			Ok(response) => {
				let status = response.status().as_u16();
				let body = response.text().await.unwrap_or_default();
				Ok(TransportReply { status, body })
			}
			Err(e) => Err(TransportFailure(e.to_string())),
		}
	}
}
