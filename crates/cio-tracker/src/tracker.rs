// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The tracking client and its builder.
//!
//! Every call validates synchronously, builds a fully-qualified request URL
//! carrying the identity parameters (`key`, `c`, `i`, `s`, `_dt`), and hands
//! the request to the queue. Acceptance is the only thing a caller observes
//! directly; delivery outcomes arrive through the notifier.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use cio_tracker_core::HttpMethod;

use crate::dispatcher::{DispatcherConfig, LifecycleDispatcher, LifecycleSink, NoOpLifecycleSink};
use crate::error::{Result, TrackerError};
use crate::events::{
	BrowseResultClickParams, BrowseResultsLoadedParams, ConversionParams, PurchaseParams,
	PurchasedItem, RecommendationClickParams, RecommendationViewParams, ResultClickParams,
	SearchResultsLoadedParams, SearchSubmitParams, TrackOutcome,
};
use crate::humanity::{ClientEnvironment, HumanityCheck, InteractionKind};
use crate::notify::{DeliveryNotice, Notifier};
use crate::purchase::PurchaseGuard;
use crate::queue::{QueueConfig, RequestQueue, DEFAULT_DRAIN_DELAY};
use crate::storage::TrackerStorage;
use crate::transport::{HttpTransport, TrackingTransport};

/// Default tracking service origin.
pub const DEFAULT_BASE_URL: &str = "https://ac.cio.dev";

/// Client version reported in the `c` identity parameter.
const CLIENT_VERSION: &str = concat!("cio-rust-", env!("CARGO_PKG_VERSION"));

/// Term substituted when a conversion arrives without one.
const TERM_UNKNOWN: &str = "TERM_UNKNOWN";

#[derive(Debug, Clone)]
struct Identity {
	api_key: String,
	client_id: String,
	session_id: u64,
}

/// Builder for constructing a [`Tracker`].
pub struct TrackerBuilder {
	api_key: Option<String>,
	base_url: String,
	send_tracking_events: bool,
	drain_delay: Duration,
	storage: TrackerStorage,
	environment: ClientEnvironment,
	transport: Option<Arc<dyn TrackingTransport>>,
	lifecycle: DispatcherConfig,
	lifecycle_sink: Arc<dyn LifecycleSink>,
	beacon_present: bool,
	session_id: u64,
	client_id: Option<String>,
}

impl TrackerBuilder {
	pub fn new() -> Self {
		Self {
			api_key: None,
			base_url: DEFAULT_BASE_URL.to_string(),
			send_tracking_events: true,
			drain_delay: DEFAULT_DRAIN_DELAY,
			storage: TrackerStorage::in_memory(),
			environment: ClientEnvironment::default(),
			transport: None,
			lifecycle: DispatcherConfig::default(),
			lifecycle_sink: Arc::new(NoOpLifecycleSink),
			beacon_present: false,
			session_id: 1,
			client_id: None,
		}
	}

	/// Sets the index API key. Required.
	pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
		self.api_key = Some(api_key.into());
		self
	}

	/// Sets the tracking service origin.
	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	/// Master switch for behavioral tracking. Defaults to on.
	pub fn send_tracking_events(mut self, enabled: bool) -> Self {
		self.send_tracking_events = enabled;
		self
	}

	/// Sets the pause before each delivery attempt. Defaults to 25 ms.
	pub fn drain_delay(mut self, delay: Duration) -> Self {
		self.drain_delay = delay;
		self
	}

	/// Sets the backing stores. Defaults to in-memory scopes; pass a
	/// [`crate::JsonFileStore`]-backed local scope for durability across
	/// restarts.
	pub fn storage(mut self, storage: TrackerStorage) -> Self {
		self.storage = storage;
		self
	}

	/// Describes the embedding environment (user agent, webdriver flag).
	pub fn environment(mut self, environment: ClientEnvironment) -> Self {
		self.environment = environment;
		self
	}

	/// Replaces the HTTP transport. Tests use this to observe delivery.
	pub fn transport(mut self, transport: Arc<dyn TrackingTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Configures the lifecycle event dispatcher.
	pub fn lifecycle(mut self, config: DispatcherConfig) -> Self {
		self.lifecycle = config;
		self
	}

	/// Receives `cio.client.*` lifecycle events.
	pub fn lifecycle_sink(mut self, sink: Arc<dyn LifecycleSink>) -> Self {
		self.lifecycle_sink = sink;
		self
	}

	/// Reports that the companion beacon had already loaded before this
	/// client was built.
	pub fn beacon_present(mut self, present: bool) -> Self {
		self.beacon_present = present;
		self
	}

	/// Sets the session id reported in the `s` identity parameter.
	pub fn session_id(mut self, session_id: u64) -> Self {
		self.session_id = session_id;
		self
	}

	/// Sets the client id reported in the `i` identity parameter. A random
	/// UUID is generated when unset.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());
		self
	}

	/// Builds the tracker. Must be called from within a tokio runtime; when
	/// tracking is enabled this kicks a drain of any requests persisted by a
	/// previous run.
	pub async fn build(self) -> Result<Tracker> {
		let api_key = self.api_key.filter(|k| !k.trim().is_empty());
		let api_key = api_key.ok_or(TrackerError::InvalidApiKey)?;

		let base_url = Url::parse(&self.base_url)
			.map_err(|e| TrackerError::InvalidBaseUrl(e.to_string()))?;
		if base_url.cannot_be_a_base() {
			return Err(TrackerError::InvalidBaseUrl(self.base_url));
		}

		let transport: Arc<dyn TrackingTransport> = match self.transport {
			Some(transport) => transport,
			None => match &self.environment.user_agent {
				Some(user_agent) => Arc::new(HttpTransport::with_user_agent(user_agent.clone())),
				None => Arc::new(HttpTransport::new()),
			},
		};

		let humanity = Arc::new(
			HumanityCheck::new(Arc::clone(&self.storage.session), self.environment).await,
		);
		let notifier = Arc::new(Notifier::new());
		let queue = RequestQueue::new(
			QueueConfig {
				send_tracking_events: self.send_tracking_events,
				drain_delay: self.drain_delay,
			},
			Arc::clone(&self.storage.local),
			Arc::clone(&humanity),
			Arc::clone(&notifier),
			transport,
		);

		let dispatcher =
			LifecycleDispatcher::new(self.lifecycle, self.lifecycle_sink, self.beacon_present);
		dispatcher.queue("instantiated", json!({ "client_version": CLIENT_VERSION }));

		Ok(Tracker {
			identity: Identity {
				api_key,
				client_id: self
					.client_id
					.unwrap_or_else(|| Uuid::new_v4().to_string()),
				session_id: self.session_id,
			},
			base_url,
			purchases: PurchaseGuard::new(Arc::clone(&self.storage.session)),
			humanity,
			notifier,
			queue,
			dispatcher,
		})
	}
}

impl Default for TrackerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// The behavioral tracking client.
pub struct Tracker {
	identity: Identity,
	base_url: Url,
	queue: Arc<RequestQueue>,
	humanity: Arc<HumanityCheck>,
	purchases: PurchaseGuard,
	notifier: Arc<Notifier>,
	dispatcher: LifecycleDispatcher,
}

impl Tracker {
	pub fn builder() -> TrackerBuilder {
		TrackerBuilder::new()
	}

	/// The underlying request queue, for collaborating request builders
	/// that produce their own ready-to-send requests.
	pub fn request_queue(&self) -> &Arc<RequestQueue> {
		&self.queue
	}

	pub fn lifecycle(&self) -> &LifecycleDispatcher {
		&self.dispatcher
	}

	pub fn humanity(&self) -> &HumanityCheck {
		&self.humanity
	}

	/// Registers `callback` on the "success" or "error" delivery channel.
	pub fn subscribe(
		&self,
		channel: &str,
		callback: impl Fn(&DeliveryNotice) + Send + Sync + 'static,
	) -> Result<()> {
		self.notifier.subscribe(channel, callback)
	}

	/// Records an interaction event as proof of a human operator.
	pub async fn note_interaction(&self, kind: InteractionKind) {
		self.humanity.note_interaction(kind).await;
	}

	/// Handles the platform's unload signal: no new delivery attempt starts
	/// after this.
	pub fn mark_unloading(&self) {
		self.queue.mark_unloading();
	}

	/// Handles the external beacon-loaded signal for the lifecycle stream.
	pub fn beacon_loaded(&self) {
		self.dispatcher.beacon_loaded();
	}

	/// Forces a flush attempt of the queued tracking requests.
	pub fn drain(&self) {
		self.queue.drain();
	}

	/// Stops the background delivery task. Requests still in storage stay
	/// there for a future client instance.
	pub fn shutdown(&self) {
		self.queue.shutdown();
	}

	pub async fn track_session_start(&self) -> Result<TrackOutcome> {
		let url = self.behavior_url("session_start", &[]);
		self.enqueue_get(url).await
	}

	pub async fn track_input_focus(&self) -> Result<TrackOutcome> {
		let url = self.behavior_url("focus", &[]);
		self.enqueue_get(url).await
	}

	pub async fn track_search_submit(
		&self,
		term: &str,
		params: SearchSubmitParams,
	) -> Result<TrackOutcome> {
		require_non_empty(term, "term")?;

		let mut extra = Vec::new();
		push_opt(&mut extra, "original_query", &params.original_query);
		push_opt(&mut extra, "group_id", &params.group_id);
		push_opt(&mut extra, "section", &params.section);

		let url = self.autocomplete_url(term, "search", &extra);
		self.enqueue_get(url).await
	}

	pub async fn track_search_results_loaded(
		&self,
		term: &str,
		params: SearchResultsLoadedParams,
	) -> Result<TrackOutcome> {
		require_non_empty(term, "term")?;

		let mut extra = vec![("term", term.to_string())];
		if let Some(count) = params.result_count {
			extra.push(("num_results", count.to_string()));
		}
		if !params.item_ids.is_empty() {
			extra.push(("customer_ids", params.item_ids.join(",")));
		}
		push_opt(&mut extra, "section", &params.section);

		let url = self.behavior_url("search-results", &extra);
		self.enqueue_get(url).await
	}

	pub async fn track_search_result_click(
		&self,
		term: &str,
		params: ResultClickParams,
	) -> Result<TrackOutcome> {
		require_non_empty(term, "term")?;
		require_item_reference(&params.item_name, &params.item_id)?;

		let mut extra = Vec::new();
		push_opt(&mut extra, "name", &params.item_name);
		push_opt(&mut extra, "customer_id", &params.item_id);
		push_opt(&mut extra, "variation_id", &params.variation_id);
		if let Some(position) = params.result_position {
			extra.push(("result_position", position.to_string()));
		}
		push_opt(&mut extra, "section", &params.section);

		let url = self.autocomplete_url(term, "click_through", &extra);
		self.enqueue_get(url).await
	}

	pub async fn track_conversion(
		&self,
		term: Option<&str>,
		params: ConversionParams,
	) -> Result<TrackOutcome> {
		require_item_reference(&params.item_name, &params.item_id)?;

		let mut body = Map::new();
		body.insert(
			"search_term".to_string(),
			json!(term.filter(|t| !t.trim().is_empty()).unwrap_or(TERM_UNKNOWN)),
		);
		insert_opt_str(&mut body, "item_id", &params.item_id);
		insert_opt_str(&mut body, "item_name", &params.item_name);
		insert_opt_str(&mut body, "variation_id", &params.variation_id);
		if let Some(revenue) = params.revenue {
			body.insert("revenue".to_string(), json!(format!("{revenue:.2}")));
		}
		insert_opt_str(&mut body, "type", &params.conversion_type);
		insert_opt_str(&mut body, "section", &params.section);

		let url = self.behavioral_action_url("conversion");
		self.enqueue_post(url, body).await
	}

	/// Tracks a completed purchase at most once per order id and session.
	///
	/// A repeated order id short-circuits with
	/// [`TrackOutcome::AlreadyTracked`] before anything is queued.
	pub async fn track_purchase(
		&self,
		order_id: &str,
		items: &[PurchasedItem],
		params: PurchaseParams,
	) -> Result<TrackOutcome> {
		require_non_empty(order_id, "order_id")?;
		if items.is_empty() {
			return Err(TrackerError::InvalidParameters(
				"items must contain at least one entry".to_string(),
			));
		}
		for item in items {
			require_non_empty(&item.item_id, "items[].item_id")?;
		}

		if self.purchases.has_record(order_id).await {
			debug!(order_id = %order_id, "purchase already tracked this session");
			return Ok(TrackOutcome::AlreadyTracked);
		}
		self.purchases.add_record(order_id).await;

		let mut body = Map::new();
		body.insert("order_id".to_string(), json!(order_id));
		body.insert(
			"items".to_string(),
			Value::Array(items.iter().map(purchased_item_value).collect()),
		);
		if let Some(revenue) = params.revenue {
			body.insert("revenue".to_string(), json!(format!("{revenue:.2}")));
		}
		insert_opt_str(&mut body, "section", &params.section);

		let url = self.behavioral_action_url("purchase");
		self.enqueue_post(url, body).await
	}

	pub async fn track_recommendation_view(
		&self,
		pod_id: &str,
		params: RecommendationViewParams,
	) -> Result<TrackOutcome> {
		require_non_empty(pod_id, "pod_id")?;

		let mut body = Map::new();
		body.insert("pod_id".to_string(), json!(pod_id));
		insert_opt_num(&mut body, "result_count", params.result_count);
		insert_opt_num(&mut body, "result_page", params.result_page);
		insert_opt_str(&mut body, "result_id", &params.result_id);
		insert_opt_num(&mut body, "num_results_viewed", params.num_results_viewed);
		insert_opt_str(&mut body, "section", &params.section);
		insert_opt_str(&mut body, "url", &params.url);

		let url = self.behavioral_action_url("recommendation_result_view");
		self.enqueue_post(url, body).await
	}

	pub async fn track_recommendation_click(
		&self,
		pod_id: &str,
		params: RecommendationClickParams,
	) -> Result<TrackOutcome> {
		require_non_empty(pod_id, "pod_id")?;
		require_item_reference(&params.item_name, &params.item_id)?;

		let mut body = Map::new();
		body.insert("pod_id".to_string(), json!(pod_id));
		insert_opt_str(&mut body, "strategy_id", &params.strategy_id);
		insert_opt_str(&mut body, "item_id", &params.item_id);
		insert_opt_str(&mut body, "item_name", &params.item_name);
		insert_opt_str(&mut body, "variation_id", &params.variation_id);
		insert_opt_num(&mut body, "result_position_on_page", params.result_position_on_page);
		insert_opt_num(&mut body, "num_results_per_page", params.num_results_per_page);
		insert_opt_str(&mut body, "section", &params.section);

		let url = self.behavioral_action_url("recommendation_result_click");
		self.enqueue_post(url, body).await
	}

	pub async fn track_browse_results_loaded(
		&self,
		filter_name: &str,
		filter_value: &str,
		params: BrowseResultsLoadedParams,
	) -> Result<TrackOutcome> {
		require_non_empty(filter_name, "filter_name")?;
		require_non_empty(filter_value, "filter_value")?;

		let mut body = Map::new();
		body.insert("filter_name".to_string(), json!(filter_name));
		body.insert("filter_value".to_string(), json!(filter_value));
		insert_opt_num(&mut body, "result_count", params.result_count);
		insert_opt_num(&mut body, "result_page", params.result_page);
		insert_opt_str(&mut body, "result_id", &params.result_id);
		insert_opt_str(&mut body, "sort_by", &params.sort_by);
		insert_opt_str(&mut body, "sort_order", &params.sort_order);
		insert_opt_str(&mut body, "section", &params.section);
		insert_opt_str(&mut body, "url", &params.url);

		let url = self.behavioral_action_url("browse_result_load");
		self.enqueue_post(url, body).await
	}

	pub async fn track_browse_result_click(
		&self,
		filter_name: &str,
		filter_value: &str,
		params: BrowseResultClickParams,
	) -> Result<TrackOutcome> {
		require_non_empty(filter_name, "filter_name")?;
		require_non_empty(filter_value, "filter_value")?;
		require_item_reference(&params.item_name, &params.item_id)?;

		let mut body = Map::new();
		body.insert("filter_name".to_string(), json!(filter_name));
		body.insert("filter_value".to_string(), json!(filter_value));
		insert_opt_str(&mut body, "item_id", &params.item_id);
		insert_opt_str(&mut body, "item_name", &params.item_name);
		insert_opt_str(&mut body, "variation_id", &params.variation_id);
		insert_opt_num(&mut body, "result_position_on_page", params.result_position_on_page);
		insert_opt_str(&mut body, "section", &params.section);

		let url = self.behavioral_action_url("browse_result_click");
		self.enqueue_post(url, body).await
	}

	async fn enqueue_get(&self, url: Url) -> Result<TrackOutcome> {
		self.queue.enqueue(url.to_string(), HttpMethod::Get, None).await;
		Ok(TrackOutcome::Queued)
	}

	async fn enqueue_post(&self, url: Url, body: Map<String, Value>) -> Result<TrackOutcome> {
		self
			.queue
			.enqueue(url.to_string(), HttpMethod::Post, Some(body))
			.await;
		Ok(TrackOutcome::Queued)
	}

	fn behavior_url(&self, action: &str, extra: &[(&str, String)]) -> Url {
		let mut url = self.endpoint_url(&["behavior"]);
		url.query_pairs_mut().append_pair("action", action);
		for (key, value) in extra {
			url.query_pairs_mut().append_pair(key, value);
		}
		url
	}

	fn autocomplete_url(&self, term: &str, leaf: &str, extra: &[(&str, String)]) -> Url {
		let mut url = self.endpoint_url(&["autocomplete", term, leaf]);
		for (key, value) in extra {
			url.query_pairs_mut().append_pair(key, value);
		}
		url
	}

	fn behavioral_action_url(&self, action: &str) -> Url {
		self.endpoint_url(&["v2", "behavioral_action", action])
	}

	/// Base URL + path segments + identity parameters.
	fn endpoint_url(&self, segments: &[&str]) -> Url {
		let mut url = self.base_url.clone();
		{
			let mut path = url
				.path_segments_mut()
				.expect("base URL validated at build");
			path.pop_if_empty().extend(segments);
		}
		{
			let mut pairs = url.query_pairs_mut();
			pairs.append_pair("key", &self.identity.api_key);
			pairs.append_pair("c", CLIENT_VERSION);
			pairs.append_pair("i", &self.identity.client_id);
			pairs.append_pair("s", &self.identity.session_id.to_string());
			pairs.append_pair("_dt", &Utc::now().timestamp_millis().to_string());
		}
		url
	}
}

fn require_non_empty(value: &str, field: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(TrackerError::InvalidParameters(format!(
			"{field} must be a non-empty string"
		)));
	}
	Ok(())
}

fn require_item_reference(item_name: &Option<String>, item_id: &Option<String>) -> Result<()> {
	if present(item_name) || present(item_id) {
		return Ok(());
	}
	Err(TrackerError::InvalidParameters(
		"item_name or item_id is required".to_string(),
	))
}

fn present(value: &Option<String>) -> bool {
	value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn push_opt(extra: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
	if let Some(value) = value {
		extra.push((key, value.clone()));
	}
}

fn insert_opt_str(body: &mut Map<String, Value>, key: &str, value: &Option<String>) {
	if let Some(value) = value {
		body.insert(key.to_string(), json!(value));
	}
}

fn insert_opt_num(body: &mut Map<String, Value>, key: &str, value: Option<u64>) {
	if let Some(value) = value {
		body.insert(key.to_string(), json!(value));
	}
}

fn purchased_item_value(item: &PurchasedItem) -> Value {
	let mut entry = Map::new();
	entry.insert("item_id".to_string(), json!(item.item_id));
	if let Some(variation_id) = &item.variation_id {
		entry.insert("variation_id".to_string(), json!(variation_id));
	}
	if let Some(quantity) = item.quantity {
		entry.insert("quantity".to_string(), json!(quantity));
	}
	Value::Object(entry)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::{TransportFailure, TransportReply};
	use async_trait::async_trait;
	use cio_tracker_core::TrackingRequest;
	use std::collections::HashMap;

	struct RecordingTransport {
		calls: std::sync::Mutex<Vec<TrackingRequest>>,
	}

	impl RecordingTransport {
		fn new() -> Arc<Self> {
			Arc::new(Self {
				calls: std::sync::Mutex::new(Vec::new()),
			})
		}

		fn count(&self) -> usize {
			self.calls.lock().unwrap().len()
		}

		fn calls(&self) -> Vec<TrackingRequest> {
			self.calls.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl TrackingTransport for RecordingTransport {
		async fn send(
			&self,
			request: &TrackingRequest,
		) -> std::result::Result<TransportReply, TransportFailure> {
			self.calls.lock().unwrap().push(request.clone());
			Ok(TransportReply {
				status: 200,
				body: String::new(),
			})
		}
	}

	async fn tracker_with(transport: Arc<RecordingTransport>) -> Tracker {
		let tracker = Tracker::builder()
			.api_key("key_abc123")
			.drain_delay(Duration::from_millis(1))
			.transport(transport as Arc<dyn TrackingTransport>)
			.build()
			.await
			.unwrap();
		tracker.note_interaction(InteractionKind::MouseMove).await;
		tracker
	}

	async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
		for _ in 0..400 {
			if condition() {
				return true;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		condition()
	}

	fn query_map(url: &str) -> HashMap<String, String> {
		Url::parse(url)
			.unwrap()
			.query_pairs()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[tokio::test]
	async fn test_build_requires_api_key() {
		let result = Tracker::builder().build().await;
		assert!(matches!(result, Err(TrackerError::InvalidApiKey)));

		let result = Tracker::builder().api_key("  ").build().await;
		assert!(matches!(result, Err(TrackerError::InvalidApiKey)));
	}

	#[tokio::test]
	async fn test_build_rejects_bad_base_url() {
		let result = Tracker::builder()
			.api_key("key_abc123")
			.base_url("not a url")
			.build()
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidBaseUrl(_))));
	}

	#[tokio::test]
	async fn test_search_submit_builds_url_with_identity() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		let outcome = tracker
			.track_search_submit("shoes", SearchSubmitParams::default())
			.await
			.unwrap();
		assert_eq!(outcome, TrackOutcome::Queued);

		assert!(wait_until(|| transport.count() == 1).await);
		let request = transport.calls().remove(0);
		assert_eq!(request.method, HttpMethod::Get);

		let url = Url::parse(&request.url).unwrap();
		assert_eq!(url.path(), "/autocomplete/shoes/search");

		let query = query_map(&request.url);
		assert_eq!(query["key"], "key_abc123");
		assert_eq!(query["c"], CLIENT_VERSION);
		assert_eq!(query["s"], "1");
		assert!(query.contains_key("i"));
		assert!(query.contains_key("_dt"));
	}

	#[tokio::test]
	async fn test_search_term_is_path_encoded() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		tracker
			.track_search_submit("running shoes/trail", SearchSubmitParams::default())
			.await
			.unwrap();

		assert!(wait_until(|| transport.count() == 1).await);
		let request = transport.calls().remove(0);
		assert!(request.url.contains("/autocomplete/running%20shoes%2Ftrail/search"));
	}

	#[tokio::test]
	async fn test_empty_term_is_rejected_before_enqueue() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		for term in ["", "   "] {
			let result = tracker
				.track_search_submit(term, SearchSubmitParams::default())
				.await;
			assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));
		}

		tokio::time::sleep(Duration::from_millis(30)).await;
		assert_eq!(transport.count(), 0);
		assert_eq!(tracker.request_queue().stored_len().await, 0);
	}

	#[tokio::test]
	async fn test_results_loaded_transmits_zero_count() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		tracker
			.track_search_results_loaded(
				"shoes",
				SearchResultsLoadedParams {
					result_count: Some(0),
					..Default::default()
				},
			)
			.await
			.unwrap();

		assert!(wait_until(|| transport.count() == 1).await);
		let query = query_map(&transport.calls()[0].url);
		assert_eq!(query["action"], "search-results");
		assert_eq!(query["num_results"], "0");
	}

	#[tokio::test]
	async fn test_result_click_requires_item_reference() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		let result = tracker
			.track_search_result_click("shoes", ResultClickParams::default())
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));

		// An empty-string id does not satisfy the requirement either.
		let result = tracker
			.track_search_result_click(
				"shoes",
				ResultClickParams {
					item_id: Some(String::new()),
					..Default::default()
				},
			)
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));

		let outcome = tracker
			.track_search_result_click(
				"shoes",
				ResultClickParams {
					item_id: Some("SKU-1".to_string()),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(outcome, TrackOutcome::Queued);
	}

	#[tokio::test]
	async fn test_conversion_defaults_unknown_term() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		tracker
			.track_conversion(
				None,
				ConversionParams {
					item_id: Some("SKU-1".to_string()),
					revenue: Some(0.0),
					..Default::default()
				},
			)
			.await
			.unwrap();

		assert!(wait_until(|| transport.count() == 1).await);
		let request = transport.calls().remove(0);
		assert_eq!(request.method, HttpMethod::Post);

		let body = request.body.unwrap();
		assert_eq!(body["search_term"], json!(TERM_UNKNOWN));
		// Zero revenue is present, not dropped.
		assert_eq!(body["revenue"], json!("0.00"));
	}

	#[tokio::test]
	async fn test_purchase_round_trip_and_idempotence() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;
		let items = [PurchasedItem::new("SKU-1").with_quantity(2)];

		let first = tracker
			.track_purchase("O-1000", &items, PurchaseParams { revenue: Some(42.5), ..Default::default() })
			.await
			.unwrap();
		assert_eq!(first, TrackOutcome::Queued);

		let second = tracker
			.track_purchase("O-1000", &items, PurchaseParams::default())
			.await
			.unwrap();
		assert_eq!(second, TrackOutcome::AlreadyTracked);

		// Exactly one network request despite two calls.
		assert!(wait_until(|| transport.count() == 1).await);
		tokio::time::sleep(Duration::from_millis(30)).await;
		assert_eq!(transport.count(), 1);

		let request = transport.calls().remove(0);
		let url = Url::parse(&request.url).unwrap();
		assert_eq!(url.path(), "/v2/behavioral_action/purchase");

		let body = request.body.unwrap();
		assert_eq!(body["order_id"], json!("O-1000"));
		assert_eq!(body["revenue"], json!("42.50"));
		assert_eq!(body["items"], json!([{"item_id": "SKU-1", "quantity": 2}]));
	}

	#[tokio::test]
	async fn test_purchase_validation() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		let result = tracker
			.track_purchase("", &[PurchasedItem::new("SKU-1")], PurchaseParams::default())
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));

		let result = tracker
			.track_purchase("O-1000", &[], PurchaseParams::default())
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));

		let result = tracker
			.track_purchase("O-1000", &[PurchasedItem::new("")], PurchaseParams::default())
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));
	}

	#[tokio::test]
	async fn test_recommendation_view_requires_pod() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		let result = tracker
			.track_recommendation_view("", RecommendationViewParams::default())
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));

		tracker
			.track_recommendation_view(
				"home_pod",
				RecommendationViewParams {
					num_results_viewed: Some(0),
					..Default::default()
				},
			)
			.await
			.unwrap();

		assert!(wait_until(|| transport.count() == 1).await);
		let body = transport.calls()[0].body.clone().unwrap();
		assert_eq!(body["pod_id"], json!("home_pod"));
		assert_eq!(body["num_results_viewed"], json!(0));
	}

	#[tokio::test]
	async fn test_browse_calls_validate_filters() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		let result = tracker
			.track_browse_results_loaded("", "red", BrowseResultsLoadedParams::default())
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));

		let result = tracker
			.track_browse_result_click(
				"color",
				"red",
				BrowseResultClickParams::default(),
			)
			.await;
		assert!(matches!(result, Err(TrackerError::InvalidParameters(_))));

		tracker
			.track_browse_results_loaded("color", "red", BrowseResultsLoadedParams::default())
			.await
			.unwrap();

		assert!(wait_until(|| transport.count() == 1).await);
		let request = transport.calls().remove(0);
		assert!(request.url.contains("/v2/behavioral_action/browse_result_load"));
		let body = request.body.unwrap();
		assert_eq!(body["filter_name"], json!("color"));
		assert_eq!(body["filter_value"], json!("red"));
	}

	#[tokio::test]
	async fn test_session_and_focus_actions() {
		let transport = RecordingTransport::new();
		let tracker = tracker_with(Arc::clone(&transport)).await;

		tracker.track_session_start().await.unwrap();
		tracker.track_input_focus().await.unwrap();

		assert!(wait_until(|| transport.count() == 2).await);
		let actions: Vec<String> = transport
			.calls()
			.iter()
			.map(|r| query_map(&r.url)["action"].clone())
			.collect();
		assert_eq!(actions, vec!["session_start", "focus"]);
	}

	#[tokio::test]
	async fn test_lifecycle_instantiated_event() {
		use crate::dispatcher::LifecycleSink;
		use std::sync::Mutex;

		#[derive(Default)]
		struct RecordingSink {
			names: Mutex<Vec<String>>,
		}

		impl LifecycleSink for RecordingSink {
			fn dispatch(&self, name: &str, _data: &Value) {
				self.names.lock().unwrap().push(name.to_string());
			}
		}

		let sink = Arc::new(RecordingSink::default());
		let tracker = Tracker::builder()
			.api_key("key_abc123")
			.transport(RecordingTransport::new() as Arc<dyn TrackingTransport>)
			.lifecycle_sink(Arc::clone(&sink) as Arc<dyn LifecycleSink>)
			.build()
			.await
			.unwrap();

		// Gated until the beacon arrives.
		assert!(sink.names.lock().unwrap().is_empty());
		tracker.beacon_loaded();
		assert_eq!(*sink.names.lock().unwrap(), vec!["cio.client.instantiated"]);
	}

	#[tokio::test]
	async fn test_subscribe_passthrough_validates_channel() {
		let tracker = tracker_with(RecordingTransport::new()).await;
		assert!(tracker.subscribe("success", |_| {}).is_ok());
		assert!(matches!(
			tracker.subscribe("nope", |_| {}),
			Err(TrackerError::InvalidNotificationChannel(_))
		));
	}
}
