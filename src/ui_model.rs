use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::HashSet;

use crate::paths::format_entry_label;
use crate::store::{Entry, StoreLocation};

pub fn entry_label(entry: &Entry) -> String {
    format_entry_label(&entry.name, entry.is_dir)
}

pub fn entry_kind(entry: &Entry) -> &'static str {
    if entry.is_dir {
        "DIR "
    } else {
        "PASS"
    }
}

pub fn header_text(location: &StoreLocation) -> String {
    format!("Store: {location}")
}

pub fn match_positions(label: &str, query: &str) -> HashSet<usize> {
    let mut out = HashSet::new();
    if query.is_empty() {
        return out;
    }

    let label_chars: Vec<char> = label.chars().flat_map(char::to_lowercase).collect();
    let query_chars: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    // Lowercasing can change char counts; fall back to the matcher then.
    if label_chars.len() == label.chars().count() && query_chars.len() <= label_chars.len() {
        for start in 0..=label_chars.len() - query_chars.len() {
            if label_chars[start..start + query_chars.len()] == query_chars[..] {
                out.extend(start..start + query_chars.len());
                return out;
            }
        }
    }

    let matcher = SkimMatcherV2::default().ignore_case();
    if let Some((_, indices)) = matcher.fuzzy_indices(label, query) {
        out.extend(indices);
    }
    out
}

pub fn status_text(entries: usize, pending: usize, notice: &str) -> String {
    let pending = if pending == 0 {
        String::new()
    } else {
        format!(" | Retrieving {pending}...")
    };
    let notice = if notice.is_empty() {
        String::new()
    } else {
        format!(" | {notice}")
    };
    format!("Entries: {entries}{pending}{notice}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighted(label: &str, query: &str) -> String {
        let positions = match_positions(label, query);
        label
            .chars()
            .enumerate()
            .filter_map(|(idx, ch)| positions.contains(&idx).then_some(ch))
            .collect()
    }

    #[test]
    fn labels_and_kinds() {
        assert_eq!(entry_label(&Entry::dir("Email")), "Email/");
        assert_eq!(entry_label(&Entry::file("github.gpg")), "github");
        assert_eq!(entry_kind(&Entry::dir("Email")), "DIR ");
        assert_eq!(entry_kind(&Entry::file("github.gpg")), "PASS");
    }

    #[test]
    fn header_shows_location() {
        assert_eq!(header_text(&StoreLocation::root()), "Store: /");
    }

    #[test]
    fn substring_is_highlighted_case_insensitively() {
        assert_eq!(highlighted("GitHub", "hub"), "Hub");
    }

    #[test]
    fn subsequence_is_highlighted() {
        assert_eq!(highlighted("github", "gthb"), "gthb");
    }

    #[test]
    fn typo_match_has_no_highlight() {
        assert!(match_positions("github", "gihbu").is_empty());
        assert!(match_positions("github", "").is_empty());
    }

    #[test]
    fn multibyte_query_highlights_matched_chars() {
        assert_eq!(highlighted("銀行/パスワード", "パスワード"), "パスワード");
    }

    #[test]
    fn status_lists_pending_and_notice() {
        assert_eq!(status_text(3, 0, ""), "Entries: 3");
        assert_eq!(
            status_text(3, 2, "Copied"),
            "Entries: 3 | Retrieving 2... | Copied"
        );
    }
}
