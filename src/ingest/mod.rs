// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

fn re_tags() -> &'static Regex {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static whitespace regex"))
}

/// Collapse runs of whitespace (including NBSP and newlines) to one space and trim.
pub fn collapse_ws(s: &str) -> String {
    re_ws().replace_all(s, " ").trim().to_string()
}

/// Normalize feed text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Strip HTML tags
    let mut out = re_tags().replace_all(&decoded, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out = collapse_ws(&out);

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Keep at most `cap` items. Sources are asked for `cap` already; this keeps
/// the bound even when one ignores the hint.
pub fn take_capped<T>(mut items: Vec<T>, cap: usize) -> (Vec<T>, usize) {
    let dropped = items.len().saturating_sub(cap);
    items.truncate(cap);
    (items, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_entities() {
        let s = "  Hello,&nbsp;&nbsp; world!  ";
        let out = normalize_text(s);
        assert_eq!(out, "Hello, world!");
    }

    #[test]
    fn headline_punctuation_survives() {
        assert_eq!(normalize_text("Is the <b>monsoon</b> late?"), "Is the monsoon late?");
    }

    #[test]
    fn take_capped_reports_dropped() {
        let (kept, dropped) = take_capped(vec![1, 2, 3, 4, 5], 3);
        assert_eq!(kept, vec![1, 2, 3]);
        assert_eq!(dropped, 2);

        let (kept, dropped) = take_capped(vec![1], 3);
        assert_eq!(kept, vec![1]);
        assert_eq!(dropped, 0);
    }
}
