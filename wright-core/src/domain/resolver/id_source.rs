// wright-core/src/domain/resolver/id_source.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::similarity::ratio;
use crate::domain::mart::MartConfig;

/// Minimum similarity for a misspelled discriminator to be corrected.
pub const FUZZY_THRESHOLD: f64 = 0.8;

/// Candidates below this similarity are not worth suggesting.
const SUGGESTION_FLOOR: f64 = 0.5;
const MAX_SUGGESTIONS: usize = 3;

/// Discriminator values known to the mapping model, each carrying the physical
/// column its ID values are matched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdSource {
    AccountCode,
    BillingCategoryCode,
    BillingCategoryTypeCode,
    MinorCode,
    DeductCode,
    ProductCode,
    RoyaltyFilter,
    CostCenter,
    LegalEntity,
    /// Project-specific discriminator declared in `id_source_columns`.
    Custom { key: String, column: String },
    /// Below the fuzzy threshold.
    Unknown { raw: String, suggestions: Vec<String> },
}

impl IdSource {
    pub const CANONICAL: [IdSource; 9] = [
        IdSource::AccountCode,
        IdSource::BillingCategoryCode,
        IdSource::BillingCategoryTypeCode,
        IdSource::MinorCode,
        IdSource::DeductCode,
        IdSource::ProductCode,
        IdSource::RoyaltyFilter,
        IdSource::CostCenter,
        IdSource::LegalEntity,
    ];

    pub fn key(&self) -> &str {
        match self {
            IdSource::AccountCode => "ACCOUNT_CODE",
            IdSource::BillingCategoryCode => "BILLING_CATEGORY_CODE",
            IdSource::BillingCategoryTypeCode => "BILLING_CATEGORY_TYPE_CODE",
            IdSource::MinorCode => "MINOR_CODE",
            IdSource::DeductCode => "DEDUCT_CODE",
            IdSource::ProductCode => "PRODUCT_CODE",
            IdSource::RoyaltyFilter => "ROYALTY_FILTER",
            IdSource::CostCenter => "COST_CENTER",
            IdSource::LegalEntity => "LEGAL_ENTITY",
            IdSource::Custom { key, .. } => key,
            IdSource::Unknown { raw, .. } => raw,
        }
    }

    /// Physical column template, `None` for unresolved discriminators.
    pub fn column_template(&self) -> Option<&str> {
        match self {
            IdSource::AccountCode => Some("ACCOUNT_CODE"),
            IdSource::BillingCategoryCode => Some("ACCOUNT_BILLING_CATEGORY_CODE"),
            IdSource::BillingCategoryTypeCode => Some("ACCOUNT_BILLING_CATEGORY_TYPE_CODE"),
            IdSource::MinorCode => Some("ACCOUNT_MINOR_CODE"),
            IdSource::DeductCode => Some("DEDUCT_CODE"),
            IdSource::ProductCode => Some("PRODUCT_CODE"),
            IdSource::RoyaltyFilter => Some("ROYALTY_FILTER"),
            IdSource::CostCenter => Some("COST_CENTER_CODE"),
            IdSource::LegalEntity => Some("LEGAL_ENTITY_CODE"),
            IdSource::Custom { column, .. } => Some(column),
            IdSource::Unknown { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, IdSource::Unknown { .. })
    }
}

/// A misspelled discriminator that was silently mapped onto a known one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub corrected_to: String,
    pub similarity: f64,
}

/// Outcome of `normalize` for one raw discriminator value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Value exactly as it appears in the mapping data.
    pub raw: String,
    pub source: IdSource,
    pub correction: Option<Correction>,
}

impl Resolution {
    pub fn column(&self) -> Option<&str> {
        self.source.column_template()
    }
}

/// Maps discriminator strings onto physical column templates.
#[derive(Debug, Clone)]
pub struct IdSourceResolver {
    canonical: BTreeMap<String, IdSource>,
}

impl Default for IdSourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSourceResolver {
    pub fn new() -> Self {
        let canonical = IdSource::CANONICAL
            .iter()
            .map(|s| (s.key().to_string(), s.clone()))
            .collect();
        Self { canonical }
    }

    /// Canonical set extended with the config's custom discriminators.
    /// A custom entry with a canonical key overrides that key's column.
    pub fn for_config(config: &MartConfig) -> Self {
        let mut resolver = Self::new();
        for (key, column) in &config.id_source_columns {
            let key = key.trim().to_uppercase();
            if key.is_empty() || column.trim().is_empty() {
                continue;
            }
            resolver.canonical.insert(
                key.clone(),
                IdSource::Custom {
                    key,
                    column: column.trim().to_uppercase(),
                },
            );
        }
        resolver
    }

    pub fn known_keys(&self) -> impl Iterator<Item = &str> {
        self.canonical.keys().map(String::as_str)
    }

    /// Exact match, then fuzzy correction, then `Unknown` with suggestions.
    pub fn normalize(&self, raw: &str) -> Resolution {
        let needle = raw.trim().to_uppercase();

        if let Some(source) = self.canonical.get(&needle) {
            return Resolution {
                raw: raw.to_string(),
                source: source.clone(),
                correction: None,
            };
        }

        let mut scored: Vec<(f64, &String)> = self
            .canonical
            .keys()
            .map(|key| (ratio(&needle, key), key))
            .collect();
        // Highest score first, ties broken alphabetically for stable output
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        if let Some(&(score, key)) = scored.first()
            && score >= FUZZY_THRESHOLD
            && let Some(source) = self.canonical.get(key)
        {
            warn!(raw, corrected_to = %key, similarity = score, "Corrected ID_SOURCE discriminator");
            return Resolution {
                raw: raw.to_string(),
                source: source.clone(),
                correction: Some(Correction {
                    corrected_to: key.clone(),
                    similarity: score,
                }),
            };
        }

        let suggestions: Vec<String> = scored
            .iter()
            .filter(|(score, _)| *score >= SUGGESTION_FLOOR)
            .take(MAX_SUGGESTIONS)
            .map(|(_, key)| (*key).clone())
            .collect();
        debug!(raw, ?suggestions, "Unresolved ID_SOURCE discriminator");

        Resolution {
            raw: raw.to_string(),
            source: IdSource::Unknown {
                raw: raw.to_string(),
                suggestions,
            },
            correction: None,
        }
    }

    /// Resolves every distinct value, sorted by raw value.
    pub fn resolve_all<'a, I>(&self, raws: I) -> Vec<Resolution>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut values: Vec<&String> = raws.into_iter().collect();
        values.sort();
        values.dedup();
        values.into_iter().map(|raw| self.normalize(raw)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let resolver = IdSourceResolver::new();
        let res = resolver.normalize(" billing_category_code ");
        assert_eq!(res.source, IdSource::BillingCategoryCode);
        assert_eq!(res.column(), Some("ACCOUNT_BILLING_CATEGORY_CODE"));
        assert!(res.correction.is_none());
        assert_eq!(res.raw, " billing_category_code ");
    }

    #[test]
    fn test_misspelling_is_corrected_with_note() {
        let resolver = IdSourceResolver::new();
        let res = resolver.normalize("BILLING_CATGORY_CODE");
        assert_eq!(res.source, IdSource::BillingCategoryCode);
        let correction = res.correction.unwrap();
        assert_eq!(correction.corrected_to, "BILLING_CATEGORY_CODE");
        assert!(correction.similarity >= FUZZY_THRESHOLD);
    }

    #[test]
    fn test_below_threshold_is_unknown() {
        let resolver = IdSourceResolver::new();
        let res = resolver.normalize("WAREHOUSE_ID");
        assert!(!res.source.is_resolved());
        assert_eq!(res.column(), None);
        match res.source {
            IdSource::Unknown { raw, .. } => assert_eq!(raw, "WAREHOUSE_ID"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_carries_suggestions() {
        let resolver = IdSourceResolver::new();
        let res = resolver.normalize("PRODUCT_GROUP");
        match res.source {
            IdSource::Unknown { suggestions, .. } => {
                assert_eq!(suggestions.first().map(String::as_str), Some("PRODUCT_CODE"));
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_columns_extend_canonical_set() {
        let mut config = MartConfig::new("p", "gl", "H", "M", "F");
        config
            .id_source_columns
            .insert("region".into(), "sales_region_code".into());
        let resolver = IdSourceResolver::for_config(&config);

        let res = resolver.normalize("REGION");
        assert_eq!(res.column(), Some("SALES_REGION_CODE"));
        assert!(resolver.known_keys().any(|k| k == "ACCOUNT_CODE"));
    }

    #[test]
    fn test_resolve_all_sorts_and_dedups() {
        let resolver = IdSourceResolver::new();
        let raws = vec![
            "PRODUCT_CODE".to_string(),
            "ACCOUNT_CODE".to_string(),
            "PRODUCT_CODE".to_string(),
        ];
        let resolved = resolver.resolve_all(&raws);
        let order: Vec<&str> = resolved.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(order, vec!["ACCOUNT_CODE", "PRODUCT_CODE"]);
    }
}
