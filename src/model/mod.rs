// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data types shared by the badge pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One visible recommendation row, as returned by storage in recency-descending order.
///
/// Recommender fields are optional because the recommender's user row may have been
/// removed while the recommendation itself survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationRow {
    #[serde(rename = "username")]
    pub recommender_username: Option<String>,
    #[serde(rename = "name")]
    pub recommender_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub recommendation_text: Option<String>,
}

impl RecommendationRow {
    /// Creation time as epoch milliseconds, the unit used for cache validators.
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}

/// A finished badge render: the SVG markup plus the validator timestamp derived from
/// the newest row (or the render time when there were no rows).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBadge {
    pub svg: String,
    pub last_modified_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::RecommendationRow;
    use chrono::{TimeZone, Utc};

    #[test]
    fn created_at_millis_matches_timestamp() {
        let row = RecommendationRow {
            recommender_username: Some("octocat".to_owned()),
            recommender_name: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            recommendation_text: None,
        };
        assert_eq!(row.created_at_millis() % 1000, 0);
        assert_eq!(row.created_at_millis() / 1000, row.created_at.timestamp());
    }

    #[test]
    fn serializes_with_storage_field_names() {
        let row = RecommendationRow {
            recommender_username: Some("octocat".to_owned()),
            recommender_name: Some("The Octocat".to_owned()),
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            recommendation_text: Some("solid work".to_owned()),
        };
        let json = serde_json::to_value(&row).expect("serialize row");
        assert_eq!(json["username"], "octocat");
        assert_eq!(json["name"], "The Octocat");
        assert_eq!(json["recommendation_text"], "solid work");
    }
}
