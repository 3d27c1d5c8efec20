//! Reference data with static fallbacks
//!
//! Referential lookups feed UI dropdowns; they must never block a
//! screen on a provider outage. Every getter swallows all failures and
//! degrades to its static table, and successful lookups are cached for
//! the process lifetime.

use crate::client::InsurerClient;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Fallback make table (insurer make codes)
pub const MAKES: [(&str, &str); 8] = [
    ("M00001", "TOYOTA"),
    ("M00002", "HYUNDAI"),
    ("M00003", "KIA"),
    ("M00004", "PEUGEOT"),
    ("M00005", "RENAULT"),
    ("M00006", "MERCEDES-BENZ"),
    ("M00007", "MITSUBISHI"),
    ("M00008", "SUZUKI"),
];

/// Fallback category table
pub const CATEGORIES: [(&str, &str); 3] = [
    ("510", "Promenade et affaires"),
    ("520", "Transport public de marchandises"),
    ("550", "Deux ou trois roues"),
];

/// Fallback sub-categories for goods transport (520)
pub const SUB_CATEGORIES_520: [(&str, &str); 2] = [
    ("521", "Charge utile <= 3,5 T"),
    ("522", "Charge utile > 3,5 T"),
];

/// Fallback sub-categories for two/three-wheelers (550)
pub const SUB_CATEGORIES_550: [(&str, &str); 2] =
    [("551", "Cylindrée <= 125 cm3"), ("552", "Cylindrée > 125 cm3")];

/// Fallback body-type table
pub const BODY_TYPES: [(&str, &str); 1] = [("07", "Berline")];

fn owned(table: &[(&str, &str)]) -> Vec<(String, String)> {
    table
        .iter()
        .map(|(code, label)| (code.to_string(), label.to_string()))
        .collect()
}

/// Parse a `[{code, libelle}]` provider list
fn code_label_pairs(data: &Value) -> Option<Vec<(String, String)>> {
    let items = data.as_array()?;
    items
        .iter()
        .map(|item| {
            let code = item.get("code")?.as_str()?.to_string();
            let label = item.get("libelle")?.as_str()?.to_string();
            Some((code, label))
        })
        .collect()
}

impl InsurerClient {
    async fn referential(
        &self,
        endpoint: &str,
        params: Map<String, Value>,
        cache_key: String,
        fallback: Vec<(String, String)>,
    ) -> Vec<(String, String)> {
        if let Some(cached) = self.referential_cache.get(&cache_key) {
            return cached.clone();
        }
        match self.get_json(endpoint, params).await {
            Ok(data) => match code_label_pairs(&data) {
                Some(pairs) if !pairs.is_empty() => {
                    self.referential_cache.insert(cache_key, pairs.clone());
                    pairs
                }
                _ => {
                    warn!(endpoint, "malformed or empty referential, using fallback");
                    fallback
                }
            },
            Err(e) => {
                warn!(endpoint, "referential lookup failed, using fallback: {e}");
                fallback
            }
        }
    }

    /// Vehicle makes
    pub async fn get_makes(&self) -> Vec<(String, String)> {
        self.referential(
            "referentiel/marques",
            Map::new(),
            "marques".to_string(),
            owned(&MAKES),
        )
        .await
    }

    /// Vehicle categories for this branch
    pub async fn get_categories(&self) -> Vec<(String, String)> {
        let mut params = Map::new();
        params.insert("brCode".to_string(), json!(self.config.br_code));
        self.referential(
            "referentiel/categories",
            params,
            "categories".to_string(),
            owned(&CATEGORIES),
        )
        .await
    }

    /// Sub-categories of one category; only 520 and 550 have fallback
    /// tables, other categories degrade to an empty list.
    pub async fn get_sub_categories(&self, category_code: &str) -> Vec<(String, String)> {
        let fallback = match category_code {
            "520" => owned(&SUB_CATEGORIES_520),
            "550" => owned(&SUB_CATEGORIES_550),
            _ => Vec::new(),
        };
        let mut params = Map::new();
        params.insert("catCode".to_string(), json!(category_code));
        self.referential(
            "referentiel/scategories",
            params,
            format!("scategories:{category_code}"),
            fallback,
        )
        .await
    }

    /// Body types of one sub-category
    pub async fn get_body_types(&self, sub_category_code: &str) -> Vec<(String, String)> {
        let scat = if sub_category_code.is_empty() {
            "000"
        } else {
            sub_category_code
        };
        let mut params = Map::new();
        params.insert("scatCode".to_string(), json!(scat));
        self.referential(
            "referentiel/carrosseries",
            params,
            format!("carrosseries:{scat}"),
            owned(&BODY_TYPES),
        )
        .await
    }
}
