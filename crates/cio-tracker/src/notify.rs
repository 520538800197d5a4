// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Success/error notification fan-out for delivery outcomes.
//!
//! Tracking calls return synchronously once accepted; whether delivery later
//! succeeded is only observable here. Subscribers are invoked synchronously,
//! in subscription order, on the drain task.

use std::str::FromStr;
use std::sync::Mutex;

use cio_tracker_core::HttpMethod;

use crate::error::TrackerError;

/// Payload delivered to notification subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryNotice {
	pub url: String,
	pub method: HttpMethod,
	/// "ok" on success; the server or transport failure description otherwise.
	pub message: String,
}

/// The two notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
	Success,
	Error,
}

impl NotificationChannel {
	pub fn as_str(&self) -> &'static str {
		match self {
			NotificationChannel::Success => "success",
			NotificationChannel::Error => "error",
		}
	}
}

impl FromStr for NotificationChannel {
	type Err = TrackerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"success" => Ok(NotificationChannel::Success),
			"error" => Ok(NotificationChannel::Error),
			other => Err(TrackerError::InvalidNotificationChannel(other.to_string())),
		}
	}
}

type Callback = Box<dyn Fn(&DeliveryNotice) + Send + Sync>;

/// Publish/subscribe fan-out with exactly two channels.
#[derive(Default)]
pub struct Notifier {
	success: Mutex<Vec<Callback>>,
	error: Mutex<Vec<Callback>>,
}

impl Notifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `callback` on `channel` ("success" or "error").
	///
	/// Any other channel name is rejected as an error value, matching the
	/// SDK-wide convention that misuse is returned, never thrown.
	pub fn subscribe(
		&self,
		channel: &str,
		callback: impl Fn(&DeliveryNotice) + Send + Sync + 'static,
	) -> crate::error::Result<()> {
		let channel = NotificationChannel::from_str(channel)?;
		self
			.subscribers(channel)
			.lock()
			.expect("notifier lock poisoned")
			.push(Box::new(callback));
		Ok(())
	}

	/// Invokes every subscriber on `channel`, in subscription order.
	pub fn publish(&self, channel: NotificationChannel, notice: &DeliveryNotice) {
		let subscribers = self
			.subscribers(channel)
			.lock()
			.expect("notifier lock poisoned");
		for callback in subscribers.iter() {
			callback(notice);
		}
	}

	fn subscribers(&self, channel: NotificationChannel) -> &Mutex<Vec<Callback>> {
		match channel {
			NotificationChannel::Success => &self.success,
			NotificationChannel::Error => &self.error,
		}
	}
}


#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn only_the_two_channel_names_parse(name in ".{0,24}") {
			let parsed = name.parse::<NotificationChannel>();
			if name == "success" || name == "error" {
				prop_assert!(parsed.is_ok());
			} else {
				prop_assert!(matches!(
					parsed,
					Err(TrackerError::InvalidNotificationChannel(n)) if n == name
				));
			}
		}
	}
}
