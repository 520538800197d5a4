// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Human/bot classification gating the tracking queue.
//!
//! Advisory filtering only: it keeps analytics data cleaner, it is not a
//! security control. False positives and negatives are acceptable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::storage::{KvStore, HUMANITY_KEY};

/// Denylist of crawler and automation user-agent fragments.
const BOT_PATTERN: &str = "(?i)bot|crawl|spider|slurp|archiver|mediapartners|\
	facebookexternalhit|yandex|baiduspider|duckduckbot|bingpreview|\
	headlesschrome|phantomjs|lighthouse|pingdom|gtmetrix";

fn bot_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(BOT_PATTERN).expect("bot pattern is valid"))
}

/// Interaction events that count as proof of a human operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
	Scroll,
	Resize,
	TouchMove,
	MouseMove,
	MouseOver,
	KeyDown,
	KeyPress,
	KeyUp,
	Focus,
}

/// Facts about the embedding environment the SDK cannot observe itself.
#[derive(Debug, Clone, Default)]
pub struct ClientEnvironment {
	/// User-agent string of the embedding client, if known.
	pub user_agent: Option<String>,
	/// True when the embedder reports a webdriver-controlled session.
	pub webdriver: bool,
}

impl ClientEnvironment {
	pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
		Self {
			user_agent: Some(user_agent.into()),
			webdriver: false,
		}
	}
}

/// Session-scoped human/bot classifier.
///
/// The human flag is monotonic: once an interaction proves a human, the
/// session record stays true for the rest of the session.
pub struct HumanityCheck {
	session: Arc<dyn KvStore>,
	environment: ClientEnvironment,
	is_human: AtomicBool,
}

impl HumanityCheck {
	pub async fn new(session: Arc<dyn KvStore>, environment: ClientEnvironment) -> Self {
		let recorded = read_record(session.as_ref()).await;
		Self {
			session,
			environment,
			is_human: AtomicBool::new(recorded),
		}
	}

	/// True once any interaction has been observed this session.
	///
	/// Re-reads the session record when the instance flag is unset, in case
	/// another instance sharing the store proved humanity since construction.
	pub async fn is_human(&self) -> bool {
		if self.is_human.load(Ordering::SeqCst) {
			return true;
		}
		let recorded = read_record(self.session.as_ref()).await;
		if recorded {
			self.is_human.store(true, Ordering::SeqCst);
		}
		recorded
	}

	/// True when the user agent matches the crawler denylist or the embedder
	/// reports webdriver automation.
	pub fn is_bot(&self) -> bool {
		if self.environment.webdriver {
			return true;
		}
		match &self.environment.user_agent {
			Some(user_agent) => bot_pattern().is_match(user_agent),
			None => false,
		}
	}

	/// Records proof of a human operator. Single-shot: the first call sets
	/// and persists the flag, every later call is a no-op.
	pub async fn note_interaction(&self, kind: InteractionKind) {
		if self.is_human.swap(true, Ordering::SeqCst) {
			return;
		}
		debug!(kind = ?kind, "interaction observed, marking session human");
		if let Err(e) = self.session.set(HUMANITY_KEY, "true").await {
			warn!(error = %e, "failed to persist humanity record");
		}
	}
}

async fn read_record(session: &dyn KvStore) -> bool {
	match session.get(HUMANITY_KEY).await {
		Ok(Some(raw)) => serde_json::from_str::<bool>(&raw).unwrap_or(false),
		Ok(None) => false,
		Err(e) => {
			warn!(error = %e, "failed to read humanity record");
			false
		}
	}
}
