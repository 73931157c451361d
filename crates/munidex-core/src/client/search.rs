// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::model::MunicipalityEntry;
use crate::normalize::normalize;

pub const DEFAULT_SEARCH_LIMIT: usize = 8;

/// Accent- and case-insensitive substring search, prefix matches first.
///
/// An empty query browses: the first `limit` entries in index order.
pub fn search<'a>(index: &'a [MunicipalityEntry], query: &str, limit: usize) -> Vec<&'a MunicipalityEntry> {
    let q = normalize(query);
    if q.is_empty() {
        return index.iter().take(limit).collect();
    }

    let mut prefix = Vec::new();
    let mut contains = Vec::new();
    for m in index {
        let name = normalize(&m.name);
        if name.starts_with(&q) {
            prefix.push(m);
        } else if name.contains(&q) {
            contains.push(m);
        }
    }

    prefix.into_iter().chain(contains).take(limit).collect()
}
