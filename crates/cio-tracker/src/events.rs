// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Parameter types for the tracking call surface.
//!
//! Optional fields use explicit presence semantics: a field is transmitted
//! iff it is `Some`, so `Some(0)` and `Some(0.0)` are sent as zeros rather
//! than dropped. Validation of required fields happens in the tracking
//! calls themselves, before anything is queued.

/// Outcome of an accepted tracking call.
///
/// Acceptance says nothing about delivery; subscribe to the notifier for
/// that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
	/// The request was validated and handed to the queue.
	Queued,
	/// A purchase with this order id was already tracked this session, so
	/// nothing was queued. Not an error.
	AlreadyTracked,
}

/// Optional fields for [`crate::Tracker::track_search_submit`].
#[derive(Debug, Clone, Default)]
pub struct SearchSubmitParams {
	/// Term originally typed, when autocomplete rewrote it.
	pub original_query: Option<String>,
	/// Group the submission was scoped to.
	pub group_id: Option<String>,
	pub section: Option<String>,
}

/// Optional fields for [`crate::Tracker::track_search_results_loaded`].
#[derive(Debug, Clone, Default)]
pub struct SearchResultsLoadedParams {
	/// Total result count for the term. `Some(0)` means "zero results" and
	/// is transmitted.
	pub result_count: Option<u64>,
	/// Ids of the results shown, in display order.
	pub item_ids: Vec<String>,
	pub section: Option<String>,
}

/// Fields for result-click calls. Either `item_name` or `item_id` must be
/// present and non-empty.
#[derive(Debug, Clone, Default)]
pub struct ResultClickParams {
	pub item_name: Option<String>,
	pub item_id: Option<String>,
	pub variation_id: Option<String>,
	pub result_position: Option<u64>,
	pub section: Option<String>,
}

/// Optional fields for [`crate::Tracker::track_conversion`].
#[derive(Debug, Clone, Default)]
pub struct ConversionParams {
	pub item_id: Option<String>,
	pub item_name: Option<String>,
	pub variation_id: Option<String>,
	pub revenue: Option<f64>,
	/// Backend conversion type, e.g. `add_to_cart`.
	pub conversion_type: Option<String>,
	pub section: Option<String>,
}

/// One line item of a tracked purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchasedItem {
	pub item_id: String,
	pub variation_id: Option<String>,
	pub quantity: Option<u64>,
}

impl PurchasedItem {
	pub fn new(item_id: impl Into<String>) -> Self {
		Self {
			item_id: item_id.into(),
			variation_id: None,
			quantity: None,
		}
	}

	pub fn with_variation(mut self, variation_id: impl Into<String>) -> Self {
		self.variation_id = Some(variation_id.into());
		self
	}

	pub fn with_quantity(mut self, quantity: u64) -> Self {
		self.quantity = Some(quantity);
		self
	}
}

/// Optional fields for [`crate::Tracker::track_purchase`].
#[derive(Debug, Clone, Default)]
pub struct PurchaseParams {
	/// Order total. `Some(0.0)` is a legitimate zero-revenue purchase and is
	/// transmitted as `"0.00"`.
	pub revenue: Option<f64>,
	pub section: Option<String>,
}

/// Optional fields for [`crate::Tracker::track_recommendation_view`].
#[derive(Debug, Clone, Default)]
pub struct RecommendationViewParams {
	pub result_count: Option<u64>,
	pub result_page: Option<u64>,
	pub result_id: Option<String>,
	/// How many recommended results were actually visible. `Some(0)` is
	/// transmitted.
	pub num_results_viewed: Option<u64>,
	pub section: Option<String>,
	/// Page URL the pod rendered on.
	pub url: Option<String>,
}

/// Fields for [`crate::Tracker::track_recommendation_click`]. Either
/// `item_name` or `item_id` must be present and non-empty.
#[derive(Debug, Clone, Default)]
pub struct RecommendationClickParams {
	pub strategy_id: Option<String>,
	pub item_id: Option<String>,
	pub item_name: Option<String>,
	pub variation_id: Option<String>,
	pub result_position_on_page: Option<u64>,
	pub num_results_per_page: Option<u64>,
	pub section: Option<String>,
}

/// Optional fields for [`crate::Tracker::track_browse_results_loaded`].
#[derive(Debug, Clone, Default)]
pub struct BrowseResultsLoadedParams {
	pub result_count: Option<u64>,
	pub result_page: Option<u64>,
	pub result_id: Option<String>,
	pub sort_by: Option<String>,
	pub sort_order: Option<String>,
	pub section: Option<String>,
	pub url: Option<String>,
}

/// Fields for [`crate::Tracker::track_browse_result_click`]. Either
/// `item_name` or `item_id` must be present and non-empty.
#[derive(Debug, Clone, Default)]
pub struct BrowseResultClickParams {
	pub item_id: Option<String>,
	pub item_name: Option<String>,
	pub variation_id: Option<String>,
	pub result_position_on_page: Option<u64>,
	pub section: Option<String>,
}
