// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client construction for the tracking transport.

use reqwest::Client;

/// Creates the HTTP client the SDK delivers tracking requests with. It
/// identifies as the SDK via [`user_agent`].
pub fn new_client() -> Client {
	client_with_agent(user_agent())
}

/// Creates an HTTP client that identifies as the embedding application
/// instead of the SDK.
///
/// Used when the embedder forwards its own user agent so the backend sees
/// the end user's client string rather than `cio/...`.
pub fn new_client_with_user_agent(user_agent: impl Into<String>) -> Client {
	client_with_agent(user_agent.into())
}

/// Returns the SDK's own User-Agent string.
///
/// Format: `cio/{os}-{arch}/{version}`, e.g. `cio/linux-x86_64/0.1.0`.
pub fn user_agent() -> String {
	format!(
		"cio/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}

fn client_with_agent(user_agent: String) -> Client {
	Client::builder()
		.user_agent(user_agent)
		.build()
		.expect("failed to build HTTP client")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "cio");
		assert!(parts[1].contains('-'));
		assert_eq!(parts[2], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn clients_build_with_either_identity() {
		let _sdk = new_client();
		let _forwarded = new_client_with_user_agent("Mozilla/5.0 (X11; Linux x86_64)");
	}
}
