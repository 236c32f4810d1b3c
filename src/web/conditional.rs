// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Conditional-request evaluation for badge responses.
//!
//! The validator pair is derived from the render, not stored: the entity tag combines
//! the case-folded username with the last-modified epoch millis, and `Last-Modified`
//! is that same timestamp as an HTTP date. `If-None-Match` wins over
//! `If-Modified-Since` when both are present.

use chrono::{DateTime, TimeZone, Utc};

/// `"<lower-username>-<last_modified_ms>"`, including the quotes.
pub fn etag_for(username: &str, last_modified_ms: i64) -> String {
    format!("\"{}-{last_modified_ms}\"", username.to_lowercase())
}

/// RFC 7231 IMF-fixdate for the `Last-Modified` header.
pub fn http_date(last_modified_ms: i64) -> String {
    timestamp(last_modified_ms).format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Decides whether the client's cached copy is still valid (`true` → respond 304).
pub fn not_modified(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    etag: &str,
    last_modified_ms: i64,
) -> bool {
    if let Some(candidates) = if_none_match {
        return candidates
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == "*" || candidate == etag);
    }

    if let Some(claimed) = if_modified_since {
        if let Ok(claimed) = DateTime::parse_from_rfc2822(claimed) {
            // Header dates carry second granularity; compare at that resolution.
            return claimed.timestamp() >= last_modified_ms / 1000;
        }
    }

    false
}

fn timestamp(last_modified_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(last_modified_ms)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::{etag_for, http_date, not_modified};
    use chrono::{TimeZone, Utc};

    const MS: i64 = 1_767_225_600_000; // 2026-01-01T00:00:00Z

    #[test]
    fn etag_is_case_folded_and_quoted() {
        assert_eq!(etag_for("OctoCat", MS), format!("\"octocat-{MS}\""));
    }

    #[test]
    fn http_date_is_imf_fixdate() {
        let expected = Utc
            .timestamp_millis_opt(MS)
            .single()
            .unwrap()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        assert_eq!(http_date(MS), expected);
        assert!(http_date(MS).ends_with("GMT"));
    }

    #[test]
    fn matching_etag_is_not_modified() {
        let etag = etag_for("octocat", MS);
        assert!(not_modified(Some(&etag), None, &etag, MS));
    }

    #[test]
    fn wildcard_and_etag_lists_match() {
        let etag = etag_for("octocat", MS);
        assert!(not_modified(Some("*"), None, &etag, MS));
        let list = format!("\"other\", {etag}");
        assert!(not_modified(Some(&list), None, &etag, MS));
    }

    #[test]
    fn stale_etag_requires_full_response() {
        let etag = etag_for("octocat", MS);
        let old = etag_for("octocat", MS - 1000);
        assert!(!not_modified(Some(&old), None, &etag, MS));
    }

    #[test]
    fn if_modified_since_at_or_after_artifact_is_fresh() {
        let etag = etag_for("octocat", MS);
        assert!(not_modified(None, Some(&http_date(MS)), &etag, MS));
        assert!(not_modified(None, Some(&http_date(MS + 60_000)), &etag, MS));
    }

    #[test]
    fn older_if_modified_since_requires_full_response() {
        let etag = etag_for("octocat", MS);
        assert!(!not_modified(None, Some(&http_date(MS - 60_000)), &etag, MS));
    }

    #[test]
    fn etag_mismatch_wins_over_fresh_if_modified_since() {
        let etag = etag_for("octocat", MS);
        let stale = etag_for("octocat", MS - 1000);
        assert!(!not_modified(Some(&stale), Some(&http_date(MS)), &etag, MS));
    }

    #[test]
    fn garbage_headers_require_full_response() {
        let etag = etag_for("octocat", MS);
        assert!(!not_modified(None, Some("not a date"), &etag, MS));
        assert!(!not_modified(None, None, &etag, MS));
    }
}
