use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([A-Za-z0-9_]{5,})").expect("username pattern is a valid regex"))
}

/// Lower-cases a username and strips surrounding whitespace and the leading `@`. Returns `None` if nothing is left.
pub fn normalize_username(raw: &str) -> Option<String> {
    let name = raw.trim().trim_start_matches('@').trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

/// Pulls every `@username` mention out of free text (such as an order's client label), normalised and deduplicated.
pub fn extract_usernames(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    username_regex()
        .captures_iter(text)
        .filter_map(|caps| normalize_username(&caps[1]))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
