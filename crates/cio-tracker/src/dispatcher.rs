// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Beacon-gated dispatcher for client lifecycle events.
//!
//! Separate from the tracking queue: this stream carries best-effort
//! lifecycle signals (client instantiated, search performed, ...) to a
//! companion beacon component, not HTTP requests. Events queue up until the
//! beacon is known to be loaded, then flush in order.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

/// Prefix for every synthesized lifecycle event name.
const EVENT_PREFIX: &str = "cio.client.";

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
	/// When false the dispatcher never activates; queued events are held
	/// forever.
	pub enabled: bool,
	/// When true, activation waits for the beacon-loaded signal.
	pub wait_for_beacon: bool,
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			wait_for_beacon: true,
		}
	}
}

/// A lifecycle event waiting for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
	pub name: String,
	pub data: Value,
}

/// Receives synthesized `cio.client.*` events.
///
/// Implementations should be fast; dispatch happens synchronously on the
/// caller.
pub trait LifecycleSink: Send + Sync {
	fn dispatch(&self, name: &str, data: &Value);
}

/// Discards all lifecycle events. Used when the embedder wires no sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLifecycleSink;

impl LifecycleSink for NoOpLifecycleSink {
	fn dispatch(&self, _name: &str, _data: &Value) {}
}

struct DispatcherState {
	active: bool,
	pending: Vec<LifecycleEvent>,
}

/// One-way Inactive → Active gate in front of the lifecycle stream.
pub struct LifecycleDispatcher {
	config: DispatcherConfig,
	sink: Arc<dyn LifecycleSink>,
	state: Mutex<DispatcherState>,
}

impl LifecycleDispatcher {
	/// `beacon_present` reports whether the companion beacon had already
	/// loaded when the client was constructed.
	pub fn new(config: DispatcherConfig, sink: Arc<dyn LifecycleSink>, beacon_present: bool) -> Self {
		let active = config.enabled && (!config.wait_for_beacon || beacon_present);
		Self {
			config,
			sink,
			state: Mutex::new(DispatcherState {
				active,
				pending: Vec::new(),
			}),
		}
	}

	/// Handles the external beacon-loaded signal. Activates at most once;
	/// there is no path back to inactive.
	pub fn beacon_loaded(&self) {
		if !self.config.enabled {
			return;
		}
		let mut state = self.state.lock().expect("dispatcher lock poisoned");
		if state.active {
			return;
		}
		state.active = true;
		debug!("lifecycle dispatcher activated");
		Self::flush_locked(&self.sink, &mut state);
	}

	/// Queues an event; dispatches immediately when active.
	pub fn queue(&self, name: impl Into<String>, data: Value) {
		let mut state = self.state.lock().expect("dispatcher lock poisoned");
		state.pending.push(LifecycleEvent {
			name: name.into(),
			data,
		});
		if state.active {
			Self::flush_locked(&self.sink, &mut state);
		}
	}

	/// Dispatches every queued event in FIFO order, draining the list.
	pub fn flush(&self) {
		let mut state = self.state.lock().expect("dispatcher lock poisoned");
		Self::flush_locked(&self.sink, &mut state);
	}

	pub fn is_active(&self) -> bool {
		self.state.lock().expect("dispatcher lock poisoned").active
	}

	fn flush_locked(sink: &Arc<dyn LifecycleSink>, state: &mut DispatcherState) {
		for event in state.pending.drain(..) {
			let name = format!("{EVENT_PREFIX}{}", event.name);
			sink.dispatch(&name, &event.data);
		}
	}
}
