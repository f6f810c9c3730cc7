//! Name search over the loaded catalog

use std::collections::HashMap;
use std::sync::Arc;

use nucleo::pattern::{CaseMatching, Normalization};
use nucleo::{Config, Nucleo, Utf32String};

use super::Catalog;

/// Upper bound on fuzzy matcher ticks per query
const MAX_MATCH_TICKS: usize = 100;

/// Search index returning positions in the catalog's object list
pub struct SearchIndex {
    /// Lowercased names, parallel to the catalog
    names: Vec<String>,
    /// Catalog number -> catalog positions
    by_number: HashMap<u32, Vec<usize>>,
    /// All positions sorted by name for browsing
    sorted_by_name: Vec<usize>,
    matcher: Nucleo<SearchItem>,
    last_query: String,
}

struct SearchItem {
    index: usize,
    haystack: String,
}

impl SearchIndex {
    pub fn build(catalog: &Catalog) -> Self {
        let matcher = Nucleo::new(Config::DEFAULT, Arc::new(|| {}), None, 1);
        let injector = matcher.injector();

        let mut names = Vec::with_capacity(catalog.len());
        let mut by_number: HashMap<u32, Vec<usize>> = HashMap::new();

        for (index, object) in catalog.objects.iter().enumerate() {
            let name_lower = object.elements.name.to_lowercase();
            by_number
                .entry(object.elements.catalog_number)
                .or_default()
                .push(index);

            let haystack = format!("{} {}", name_lower, object.elements.catalog_number);
            injector.push(SearchItem { index, haystack }, |data, cols| {
                cols[0] = Utf32String::from(data.haystack.as_str());
            });

            names.push(name_lower);
        }

        let mut sorted_by_name: Vec<usize> = (0..names.len()).collect();
        sorted_by_name.sort_by(|&a, &b| names[a].cmp(&names[b]));

        log::info!("Built search index with {} entries", names.len());

        Self {
            names,
            by_number,
            sorted_by_name,
            matcher,
            last_query: String::new(),
        }
    }

    /// Find catalog positions matching `query`
    ///
    /// Tries an exact catalog number, then case-insensitive substring matches
    /// in name order, and falls back to fuzzy ranking.
    pub fn search(&mut self, query: &str, limit: usize) -> Vec<usize> {
        let query_lower = query.trim().to_lowercase();

        if query_lower.is_empty() {
            return self.sorted_by_name.iter().take(limit).copied().collect();
        }

        if let Ok(number) = query_lower.parse::<u32>() {
            if let Some(matches) = self.by_number.get(&number) {
                return matches.iter().take(limit).copied().collect();
            }
        }

        let substring: Vec<usize> = self
            .sorted_by_name
            .iter()
            .copied()
            .filter(|&i| self.names[i].contains(&query_lower))
            .take(limit)
            .collect();
        if !substring.is_empty() {
            return substring;
        }

        self.fuzzy(&query_lower, limit)
    }

    fn fuzzy(&mut self, query_lower: &str, limit: usize) -> Vec<usize> {
        if query_lower != self.last_query {
            let append = query_lower.starts_with(&self.last_query)
                && query_lower.len() > self.last_query.len();
            self.matcher.pattern.reparse(
                0,
                query_lower,
                CaseMatching::Ignore,
                Normalization::Smart,
                append,
            );
            self.last_query = query_lower.to_string();
        }

        for _ in 0..MAX_MATCH_TICKS {
            if !self.matcher.tick(10).running {
                break;
            }
        }

        let snapshot = self.matcher.snapshot();
        let take = limit.min(snapshot.matched_item_count() as usize) as u32;
        snapshot
            .matched_items(0..take)
            .map(|item| item.data.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CatalogEntry, CatalogFile};
    use crate::test_utils::fixtures;

    fn catalog() -> Catalog {
        let entry = |name: &str, lines: (&str, &str)| CatalogEntry {
            name: name.to_string(),
            category: "GPS".to_string(),
            line1: lines.0.to_string(),
            line2: lines.1.to_string(),
            details: serde_json::Value::Null,
        };
        Catalog::from_file(CatalogFile {
            generated_at: None,
            objects: vec![
                entry("STARLINK-1007", fixtures::LEO_EQUATORIAL),
                entry("ISS (ZARYA)", fixtures::LEO_INCLINED),
                entry("GPS BIIR-2", fixtures::EQUATORIAL_MEO),
            ],
            ground_stations: Vec::new(),
        })
    }

    #[test]
    fn test_empty_query_lists_by_name() {
        let mut index = SearchIndex::build(&catalog());
        assert_eq!(index.search("", 10), vec![2, 1, 0]);
        assert_eq!(index.search("  ", 1), vec![2]);
    }

    #[test]
    fn test_catalog_number_lookup() {
        let mut index = SearchIndex::build(&catalog());
        assert_eq!(index.search("90002", 10), vec![1]);
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let mut index = SearchIndex::build(&catalog());
        assert_eq!(index.search("zarya", 10), vec![1]);
        assert_eq!(index.search("STAR", 10), vec![0]);
    }

    #[test]
    fn test_fuzzy_fallback() {
        let mut index = SearchIndex::build(&catalog());
        let results = index.search("strlnk", 10);
        assert_eq!(results.first(), Some(&0));
    }
}
