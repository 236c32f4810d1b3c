// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Vouch — recommendation badge service.
//!
//! Stores short public recommendations per username and renders them as an embeddable,
//! dynamically sized SVG badge with CDN-friendly caching semantics.

pub mod avatar;
pub mod cache;
pub mod layout;
pub mod model;
pub mod render;
pub mod store;
pub mod web;
