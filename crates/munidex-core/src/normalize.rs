// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Name keys shared by the geometry feed, the entity registry and search.
//!
//! Two labels name the same place iff their keys are equal, so every source
//! must go through [`normalize`].

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics, trim.
///
/// Every combining mark left by NFD is dropped (categories Mn, Mc and Me),
/// not only the U+0300..U+036F block. Spanish labels fold the same either
/// way; spacing marks in other scripts are removed too.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn strip_trailing_parenthetical(s: &str) -> String {
    static RE_PAREN: OnceLock<Regex> = OnceLock::new();
    let re = RE_PAREN.get_or_init(|| Regex::new(r"\s*\(.*?\)\s*$").unwrap());
    re.replace(s, "").into_owned()
}

/// Registry label to lookup key.
///
/// `"Municipio de Nuevo Manoa (Nueva Esperanza)"` -> `"nuevo manoa"`
pub fn entity_key_from_label(label: &str) -> String {
    static RE_PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = RE_PREFIX.get_or_init(|| Regex::new(r"(?i)^municipio\s+de\s+").unwrap());

    let name = re.replace(label.trim(), "");
    normalize(&strip_trailing_parenthetical(&name))
}

/// Geometry feed name to lookup key.
///
/// Source-specific prefixes are stripped case-insensitively, in order, before
/// the parenthetical and any embedded double quotes.
pub fn geometry_name_key<S: AsRef<str>>(raw: &str, prefixes: &[S]) -> String {
    let mut name = raw.trim().to_string();
    for prefix in prefixes {
        name = strip_prefix_ignore_case(&name, prefix.as_ref()).to_string();
    }
    let name = strip_trailing_parenthetical(&name).replace('"', "");
    normalize(&name)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return s;
    }
    match s.get(..prefix.len()) {
        Some(head) if head.to_lowercase() == prefix.to_lowercase() => &s[prefix.len()..],
        _ => s,
    }
}
