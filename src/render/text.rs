// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Escapes SVG/XML special characters in dynamic string content.
///
/// Every user-controlled string placed into the badge markup must pass through here
/// before embedding; unescaped interpolation is a security defect, not a cosmetic one.
pub(crate) fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn truncate_with_ellipsis(text: &str, max_len: usize, keep: usize) -> String {
    if text_len(text) <= max_len {
        return text.to_owned();
    }

    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub(crate) fn text_len(text: &str) -> usize {
    text.chars().count()
}
