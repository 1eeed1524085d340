//! Record filtering.
//!
//! A filter is anything implementing [`RecordPredicate`]. [`StoreFilter`] is
//! the facet-based predicate used by the explorer UI and the CLI; closures
//! work too.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use storemap_types::store::StoreRecord;

/// Decides whether a record belongs to the filtered set.
pub trait RecordPredicate {
    fn matches(&self, record: &StoreRecord) -> bool;
}

impl<F> RecordPredicate for F
where
    F: Fn(&StoreRecord) -> bool,
{
    fn matches(&self, record: &StoreRecord) -> bool {
        self(record)
    }
}

/// Facet filter. An empty value set leaves that facet unconstrained.
///
/// # Examples
///
/// ```rust
/// use storemap::StoreFilter;
/// use storemap::filter::RecordPredicate;
/// use storemap_types::store::StoreRecord;
///
/// let filter = StoreFilter::default().with_parking(["yes"]);
///
/// let mut store = StoreRecord::new("a", 35.0, 139.0);
/// assert!(!filter.matches(&store));
/// store.parking = "yes".into();
/// assert!(filter.matches(&store));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreFilter {
    pub categories: BTreeSet<String>,
    pub location_types: BTreeSet<String>,
    pub parking: BTreeSet<String>,
    pub store_sizes: BTreeSet<String>,
    pub expenditure_bands: BTreeSet<String>,
    /// Case-insensitive substring matched against name and address
    pub text: Option<String>,
    /// Minimum total population around the store
    pub min_population: Option<f64>,
}

fn to_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

fn allows(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

impl StoreFilter {
    pub fn with_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = to_set(values);
        self
    }

    pub fn with_location_types<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.location_types = to_set(values);
        self
    }

    pub fn with_parking<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parking = to_set(values);
        self
    }

    pub fn with_store_sizes<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store_sizes = to_set(values);
        self
    }

    pub fn with_expenditure_bands<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expenditure_bands = to_set(values);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_min_population(mut self, min: f64) -> Self {
        self.min_population = Some(min);
        self
    }

    /// True when no facet constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        self.categories.is_empty()
            && self.location_types.is_empty()
            && self.parking.is_empty()
            && self.store_sizes.is_empty()
            && self.expenditure_bands.is_empty()
            && self.text.as_deref().is_none_or(|t| t.trim().is_empty())
            && self.min_population.is_none()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl RecordPredicate for StoreFilter {
    fn matches(&self, record: &StoreRecord) -> bool {
        if !allows(&self.categories, &record.category)
            || !allows(&self.location_types, &record.location_type)
            || !allows(&self.parking, &record.parking)
            || !allows(&self.store_sizes, &record.store_size)
            || !allows(&self.expenditure_bands, &record.expenditure_band)
        {
            return false;
        }

        if let Some(min) = self.min_population
            && record.demographics.total < min
        {
            return false;
        }

        match self.text.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                record.name.to_lowercase().contains(&needle)
                    || record.address.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

/// Distinct values and their record counts for one facet.
pub type FacetCounts = BTreeMap<String, usize>;

/// Value counts for every facet, keyed by facet name.
///
/// Empty values are skipped.
pub fn facet_counts<'a, I>(records: I) -> BTreeMap<&'static str, FacetCounts>
where
    I: IntoIterator<Item = &'a StoreRecord>,
{
    let mut counts: FxHashMap<&'static str, FacetCounts> = FxHashMap::default();

    for record in records {
        let facets = [
            ("category", &record.category),
            ("location_type", &record.location_type),
            ("parking", &record.parking),
            ("store_size", &record.store_size),
            ("expenditure_band", &record.expenditure_band),
        ];
        for (facet, value) in facets {
            if value.is_empty() {
                continue;
            }
            *counts
                .entry(facet)
                .or_default()
                .entry(value.clone())
                .or_insert(0) += 1;
        }
    }

    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(id: &str, category: &str, parking: &str) -> StoreRecord {
        let mut s = StoreRecord::new(id, 35.0, 139.0).with_category(category);
        s.parking = parking.to_string();
        s
    }

    #[test]
    fn test_default_matches_everything() {
        let filter = StoreFilter::default();
        assert!(filter.is_unconstrained());
        assert!(filter.matches(&store("a", "x", "")));
    }

    #[test]
    fn test_facets_are_conjunctive() {
        let filter = StoreFilter::default()
            .with_categories(["lawson", "famima"])
            .with_parking(["yes"]);
        assert!(filter.matches(&store("a", "lawson", "yes")));
        assert!(!filter.matches(&store("b", "lawson", "no")));
        assert!(!filter.matches(&store("c", "seven", "yes")));
    }

    #[test]
    fn test_text_search() {
        let mut s = store("a", "x", "");
        s.name = "Lawson Shibuya".into();
        s.address = "Tokyo".into();

        assert!(StoreFilter::default().with_text("shibuya").matches(&s));
        assert!(StoreFilter::default().with_text("TOKYO").matches(&s));
        assert!(!StoreFilter::default().with_text("osaka").matches(&s));
        assert!(StoreFilter::default().with_text("  ").matches(&s));
    }

    #[test]
    fn test_min_population() {
        let mut s = store("a", "x", "");
        s.demographics.total = 500.0;
        assert!(StoreFilter::default().with_min_population(400.0).matches(&s));
        assert!(!StoreFilter::default().with_min_population(600.0).matches(&s));
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |r: &StoreRecord| r.id.starts_with('k');
        assert!(predicate.matches(&store("k1", "", "")));
        assert!(!predicate.matches(&store("j1", "", "")));
    }

    #[test]
    fn test_filter_from_json() {
        let filter =
            StoreFilter::from_json(r#"{ "categories": ["lawson"], "min_population": 10 }"#)
                .unwrap();
        assert!(filter.categories.contains("lawson"));
        assert_eq!(filter.min_population, Some(10.0));
        assert!(StoreFilter::from_json(r#"{ "bogus": 1 }"#).is_err());
    }

    #[test]
    fn test_facet_counts() {
        let stores = vec![
            store("a", "lawson", "yes"),
            store("b", "lawson", ""),
            store("c", "famima", "no"),
        ];
        let counts = facet_counts(&stores);
        assert_eq!(counts["category"]["lawson"], 2);
        assert_eq!(counts["category"]["famima"], 1);
        assert_eq!(counts["parking"].len(), 2);
        assert!(!counts.contains_key("store_size"));
    }
}
