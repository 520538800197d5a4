// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for cio client crates.
//!
//! This crate provides a pre-configured HTTP client with a consistent
//! User-Agent header, plus a variant for embedders that forward their own
//! user agent upstream.

mod client;

pub use client::{new_client, new_client_with_user_agent, user_agent};
