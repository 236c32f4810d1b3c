// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! SVG badge rendering.
//!
//! The badge height depends on how every recommendation's text wraps, so geometry is
//! computed once up front ([`layout_entries`]) and that single layout feeds the height
//! attribute, the clip-path definitions and the drawing pass. Sizing and drawing can
//! therefore never disagree.

use chrono::Utc;

use crate::avatar::{AvatarFetcher, DEFAULT_AVATAR_DATA_URI};
use crate::layout::split_into_lines;
use crate::model::RecommendationRow;

mod text;

use text::{escape_markup, truncate_with_ellipsis};

pub const CANVAS_WIDTH: u32 = 400;
pub const HEADER_HEIGHT: u32 = 80;
pub const HEADER_GAP: u32 = 20;
pub const BASE_ENTRY_HEIGHT: u32 = 80;
pub const AVATAR_SIZE: u32 = 30;
pub const LINE_HEIGHT: u32 = 12;
pub const TEXT_WRAP_WIDTH: usize = 55;

const NAME_MAX_LEN: usize = 20;
const NAME_KEEP_LEN: usize = 17;
const MARGIN: u32 = 20;
const AVATAR_CENTER_OFFSET: u32 = 25;
const TEXT_BLOCK_OFFSET: u32 = 25;

const STYLE_BLOCK: &str = r#"<style>
        .header { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 16px; font-weight: bold; fill: #333; }
        .name { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 14px; font-weight: bold; fill: #0366d6; }
        .username { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 12px; fill: #586069; }
        .date { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 10px; fill: #586069; }
        .text { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 11px; fill: #333; font-style: italic; }
        .bg { fill: #f6f8fa; stroke: #e1e4e8; stroke-width: 1; }
      </style>"#;

/// Per-entry geometry derived once per render.
struct EntryLayout {
    avatar_center_y: u32,
    lines: Vec<String>,
}

/// Computes every entry's vertical placement and wrapped lines, plus the total canvas
/// height: header block + 20 gap + per-entry `80 + (lines - 1) * 12`.
fn layout_entries(rows: &[RecommendationRow]) -> (Vec<EntryLayout>, u32) {
    let mut entries = Vec::with_capacity(rows.len());
    let mut cursor_y = HEADER_HEIGHT + HEADER_GAP;

    for row in rows {
        let lines = row
            .recommendation_text
            .as_deref()
            .map(|text| split_into_lines(text, TEXT_WRAP_WIDTH))
            .unwrap_or_default();

        let extra = (lines.len() as u32).saturating_sub(1) * LINE_HEIGHT;
        entries.push(EntryLayout {
            avatar_center_y: cursor_y + AVATAR_CENTER_OFFSET,
            lines,
        });
        cursor_y += BASE_ENTRY_HEIGHT + extra;
    }

    (entries, cursor_y)
}

/// Renders the complete badge document for `username`.
///
/// Rows must already be recency-descending; entries are drawn in input order. Avatars
/// are fetched sequentially and any fetch failure degrades to the gray placeholder —
/// one slow or broken origin never fails the badge.
pub async fn render_badge(
    username: &str,
    rows: &[RecommendationRow],
    fetcher: &AvatarFetcher,
) -> String {
    let (entries, height) = layout_entries(rows);
    let timestamp_ms = Utc::now().timestamp_millis();

    let mut svg = format!(
        r#"<svg width="{CANVAS_WIDTH}" height="{height}" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" data-timestamp="{timestamp_ms}">
    <defs>
      {STYLE_BLOCK}"#
    );

    for (index, entry) in entries.iter().enumerate() {
        svg.push_str(&format!(
            r#"<clipPath id="avatarClip{index}"><circle cx="{cx}" cy="{cy}" r="{r}"/></clipPath>"#,
            cx = MARGIN + AVATAR_SIZE / 2,
            cy = entry.avatar_center_y,
            r = AVATAR_SIZE / 2,
        ));
    }

    svg.push_str(&format!(
        r#"</defs>

    <rect width="{CANVAS_WIDTH}" height="{height}" rx="6" class="bg"/>

    <text x="20" y="25" class="header">Endorsements for @{handle}</text>
    <text x="20" y="45" class="date" opacity="0.7">Generated: {generated}</text>"#,
        handle = escape_markup(username),
        generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    ));

    for (index, (row, entry)) in rows.iter().zip(&entries).enumerate() {
        draw_entry(&mut svg, index, row, entry, fetcher).await;
    }

    svg.push_str("</svg>");
    svg
}

async fn draw_entry(
    svg: &mut String,
    index: usize,
    row: &RecommendationRow,
    entry: &EntryLayout,
    fetcher: &AvatarFetcher,
) {
    let center_y = entry.avatar_center_y;
    let text_x = MARGIN + AVATAR_SIZE + 15;

    let avatar_username = row.recommender_username.as_deref().unwrap_or("unknown");
    let avatar = match fetcher.fetch_as_data_uri(&fetcher.avatar_url(avatar_username)).await {
        Ok(uri) => uri,
        Err(err) => {
            tracing::warn!(recommender = avatar_username, error = %err, "avatar fetch failed, using placeholder");
            DEFAULT_AVATAR_DATA_URI.to_owned()
        }
    };

    svg.push_str(&format!(
        r#"<image x="{x}" y="{y}" width="{AVATAR_SIZE}" height="{AVATAR_SIZE}" href="{href}" clip-path="url(#avatarClip{index})"/>"#,
        x = MARGIN,
        y = center_y - AVATAR_SIZE / 2,
        href = escape_markup(&avatar),
    ));
    svg.push_str(&format!(
        r##"<circle cx="{cx}" cy="{center_y}" r="{r}" fill="none" stroke="#ddd" stroke-width="1"/>"##,
        cx = MARGIN + AVATAR_SIZE / 2,
        r = AVATAR_SIZE / 2,
    ));

    let display_name = row
        .recommender_name
        .as_deref()
        .or(row.recommender_username.as_deref())
        .unwrap_or("Unknown User");
    let display_name = truncate_with_ellipsis(display_name, NAME_MAX_LEN, NAME_KEEP_LEN);

    svg.push_str(&format!(
        r#"<text x="{text_x}" y="{y}" class="name">{name}</text>"#,
        y = center_y - 8,
        name = escape_markup(&display_name),
    ));
    svg.push_str(&format!(
        r#"<text x="{text_x}" y="{y}" class="username">@{handle}</text>"#,
        y = center_y + 8,
        handle = escape_markup(avatar_username),
    ));

    let date = row.created_at.format("%Y. %-m. %-d.").to_string();
    svg.push_str(&format!(
        r#"<text x="{x}" y="{y}" text-anchor="end" class="date">{date}</text>"#,
        x = CANVAS_WIDTH - MARGIN,
        y = center_y - 8,
        date = escape_markup(&date),
    ));

    draw_quoted_lines(svg, &entry.lines, text_x, center_y + TEXT_BLOCK_OFFSET);
}

/// Emits the wrapped text lines. Blank separator lines consume vertical space but no
/// text element. The opening quote attaches to the first non-blank line and the
/// closing quote to the last non-blank line (both to a single line).
fn draw_quoted_lines(svg: &mut String, lines: &[String], x: u32, first_line_y: u32) {
    let first_visible = lines.iter().position(|line| !line.trim().is_empty());
    let last_visible = lines.iter().rposition(|line| !line.trim().is_empty());

    for (line_index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let mut display = escape_markup(line);
        if first_visible == Some(line_index) {
            display.insert(0, '"');
        }
        if last_visible == Some(line_index) {
            display.push('"');
        }
        // Raw quotes are safe inside element text content; only escaped user text
        // surrounds them.

        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" class="text">{display}</text>"#,
            y = first_line_y + (line_index as u32) * LINE_HEIGHT,
        ));
    }
}

/// Degenerate fixed-size badge used whenever the main pipeline fails. The message is
/// escaped; no internals beyond the supplied generic text are exposed.
pub fn render_error_badge(message: &str) -> String {
    format!(
        r#"<svg width="400" height="100" xmlns="http://www.w3.org/2000/svg">
    <defs>
      <style>
        .error {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 14px; fill: #d73a49; }}
        .bg {{ fill: #ffeef0; stroke: #d73a49; stroke-width: 1; }}
      </style>
    </defs>
    <rect width="400" height="100" rx="6" class="bg"/>
    <text x="20" y="30" class="error">Error: {}</text>
  </svg>"#,
        escape_markup(message)
    )
}
