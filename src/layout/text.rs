// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Paragraph-aware greedy word wrapping.
//!
//! The badge renderer sizes the image before drawing it, so the line count and the
//! actual line content are produced by the same walk: `max_line_count` runs it in
//! count-only mode, `split_into_lines` emits the lines and stops at that budget. The
//! two must agree for every input or the sizing and drawing passes drift apart.
//!
//! Lengths are measured in `char`s, not bytes.

/// Display lines produced for one paragraph-structured text.
///
/// Blank strings in the output are paragraph separators: they consume one line of
/// vertical space but render no text.
pub fn split_into_lines(text: &str, max_line_length: usize) -> Vec<String> {
    let budget = max_line_count(text, max_line_length);
    let mut lines = Vec::with_capacity(budget);

    let paragraphs = non_blank_paragraphs(text);
    for (index, paragraph) in paragraphs.iter().enumerate() {
        if index > 0 && lines.len() < budget {
            lines.push(String::new());
        }

        for raw_line in paragraph.lines() {
            let raw_line = raw_line.trim();
            if raw_line.is_empty() {
                continue;
            }
            wrap_line(raw_line, max_line_length, &mut |line| {
                if lines.len() < budget {
                    lines.push(line);
                }
            });
        }
    }

    lines
}

/// Count-only pass: the number of lines `split_into_lines` will produce for the same
/// input, computed before any content is materialized.
pub fn max_line_count(text: &str, max_line_length: usize) -> usize {
    let paragraphs = non_blank_paragraphs(text);
    let mut total = 0usize;

    for (index, paragraph) in paragraphs.iter().enumerate() {
        if index > 0 {
            // Separator line between consecutive paragraphs.
            total += 1;
        }

        for raw_line in paragraph.lines() {
            let raw_line = raw_line.trim();
            if raw_line.is_empty() {
                continue;
            }
            wrap_line(raw_line, max_line_length, &mut |_| total += 1);
        }
    }

    total
}

/// Greedily wraps one non-blank raw line, invoking `emit` once per produced line.
///
/// A single word longer than `max_line_length` is truncated to `max_line_length - 3`
/// chars with `...` appended and emitted on its own, so no output line ever exceeds
/// the limit.
fn wrap_line(raw_line: &str, max_line_length: usize, emit: &mut dyn FnMut(String)) {
    if char_len(raw_line) <= max_line_length {
        emit(raw_line.to_owned());
        return;
    }

    let mut current = String::new();
    let mut current_len = 0usize;

    for word in raw_line.split_whitespace() {
        let word_len = char_len(word);

        if word_len > max_line_length {
            if !current.is_empty() {
                emit(std::mem::take(&mut current));
                current_len = 0;
            }
            emit(truncate_word(word, max_line_length));
            continue;
        }

        let joined_len = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if joined_len <= max_line_length {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = joined_len;
        } else {
            emit(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        emit(current);
    }
}

/// Splits on runs of blank lines and drops paragraphs with no visible content, so
/// leading/trailing blank-line runs never produce separator lines.
fn non_blank_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start = None::<usize>;
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(begin) = start.take() {
                paragraphs.push(&text[begin..offset]);
            }
        } else if start.is_none() {
            start = Some(offset);
        }
        offset += line.len();
    }

    if let Some(begin) = start {
        paragraphs.push(&text[begin..]);
    }

    paragraphs
}

fn truncate_word(word: &str, max_line_length: usize) -> String {
    let keep = max_line_length.saturating_sub(3);
    let mut out: String = word.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::{max_line_count, split_into_lines};
    use rstest::rstest;

    #[test]
    fn empty_text_yields_no_lines() {
        assert!(split_into_lines("", 55).is_empty());
        assert_eq!(max_line_count("", 55), 0);
    }

    #[test]
    fn blank_only_text_yields_no_lines() {
        assert!(split_into_lines("\n \n\n\t\n", 55).is_empty());
        assert_eq!(max_line_count("\n \n\n\t\n", 55), 0);
    }

    #[test]
    fn short_line_is_emitted_verbatim_trimmed() {
        assert_eq!(split_into_lines("  hello world  ", 55), vec!["hello world"]);
    }

    #[test]
    fn wraps_greedily_at_word_boundaries() {
        let lines = split_into_lines("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn never_splits_mid_word() {
        let lines = split_into_lines("alpha beta gamma", 7);
        for line in &lines {
            assert!(line.split_whitespace().all(|w| "alpha beta gamma".contains(w)));
        }
    }

    #[test]
    fn oversized_single_word_is_truncated_with_ellipsis() {
        let word = "x".repeat(56);
        let lines = split_into_lines(&word, 55);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].chars().count(), 55);
        assert!(lines[0].ends_with("..."));
    }

    #[test]
    fn oversized_word_after_partial_line_flushes_first() {
        let text = format!("hi {}", "y".repeat(20));
        let lines = split_into_lines(&text, 10);
        assert_eq!(lines[0], "hi");
        assert_eq!(lines[1].chars().count(), 10);
        assert!(lines[1].ends_with("..."));
    }

    #[test]
    fn paragraphs_are_separated_by_one_blank_line() {
        let lines = split_into_lines("first paragraph\n\nsecond paragraph", 55);
        assert_eq!(lines, vec!["first paragraph", "", "second paragraph"]);
    }

    #[test]
    fn multiple_blank_lines_collapse_to_one_separator() {
        let lines = split_into_lines("a\n\n\n  \n\nb", 55);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn no_separator_after_last_paragraph() {
        let lines = split_into_lines("a\n\nb\n\n\n", 55);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn whitespace_only_line_acts_as_separator() {
        let lines = split_into_lines("a\n   \nb", 55);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let lines = split_into_lines("ααα βββ", 3);
        assert_eq!(lines, vec!["ααα", "βββ"]);
    }

    #[rstest]
    #[case("", 55)]
    #[case("short", 55)]
    #[case("one two three four five six seven eight nine ten", 9)]
    #[case("first paragraph here\n\nsecond one\n\nthird", 12)]
    #[case("word\n\n\n\nword", 4)]
    #[case("supercalifragilisticexpialidocious plus more words", 10)]
    #[case("\n\nleading blanks\n\ntrailing\n\n", 8)]
    fn count_pass_equals_split_length(#[case] text: &str, #[case] width: usize) {
        assert_eq!(max_line_count(text, width), split_into_lines(text, width).len());
    }

    #[rstest]
    #[case(4)]
    #[case(9)]
    #[case(20)]
    #[case(55)]
    fn no_line_exceeds_the_width(#[case] width: usize) {
        let text = "The quick brown fox jumps over the lazy dog\n\nand keeps on running until antidisestablishmentarianism stops it";
        for line in split_into_lines(text, width) {
            assert!(
                line.chars().count() <= width,
                "line {line:?} exceeds width {width}"
            );
        }
    }
}
