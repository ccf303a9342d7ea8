// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lightweight acquisition: plain HTTP with browser-like headers.
//!
//! No JavaScript runs here. Pages that need it go to the renderer.

pub mod headers;
pub mod http_client;
