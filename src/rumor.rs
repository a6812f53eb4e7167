// src/rumor.rs
//! Rumor filter: flags speculative headlines so only confirmed news alerts.
//!
//! Case-insensitive substring match, plus whole-word match for modal verbs
//! that are too short to match as substrings. A confirmed story that happens
//! to contain a marker is dropped too; under-alerting is the accepted side.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Speculative-language markers, English and German, lowercase.
pub const RUMOR_MARKERS: &[&str] = &[
    // English
    "reportedly",
    "rumor",
    "rumour",
    "considering",
    "sources said",
    "sources say",
    "people familiar",
    "speculat",
    "in talks",
    "unconfirmed",
    "allegedly",
    // German
    "angeblich",
    "könnte",
    "gerücht",
    "erwägt",
    "laut insidern",
    "kreisen zufolge",
    "spekulation",
    "womöglich",
    "offenbar",
];

/// Markers that only count as whole words ("might", not "mighty").
pub const RUMOR_WORDS: &[&str] = &["could", "might"];

fn rumor_words() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?iu)\b(?:{})\b", RUMOR_WORDS.join("|"))).expect("static regex")
    })
}

pub fn is_rumor(text: &str) -> bool {
    let lower = text.to_lowercase();
    RUMOR_MARKERS.iter().any(|m| lower.contains(m)) || rumor_words().is_match(&lower)
}
