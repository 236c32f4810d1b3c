// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! SQLite-backed recommendation storage.
//!
//! The badge pipeline only consumes [`SqliteStore::visible_recommendations_for`]; the
//! mutation commands exist for the HTTP surface and own the write-side policies
//! (text length limit, visibility flag). Duplicate recommendations from the same
//! recommender to the same target are allowed.
//!
//! rusqlite is synchronous, so every call hops onto the blocking pool with the
//! connection behind a `Mutex`.

mod sqlite;

pub use sqlite::SqliteStore;

use std::fmt;

pub const MAX_TEXT_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Open(String),
    Query(String),
    Validation(String),
    NotFound,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(message) => write!(f, "failed to open database: {message}"),
            Self::Query(message) => write!(f, "query failed: {message}"),
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Query(error.to_string())
    }
}
