//! Read-only message catalog: `category → language → messages`.
//!
//! The catalog is validated once at load time; per-call lookups never fail.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::schema::{Category, PreferredLength};

/// On-disk shape of a catalog file.
#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    fallback_category: Option<String>,
    #[serde(default)]
    fallback_language: Option<String>,
    categories: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: BTreeMap<Category, BTreeMap<String, Vec<String>>>,
    fallback_category: Option<Category>,
    fallback_language: Option<String>,
}

/// Outcome of resolving a request against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogLookup<'a> {
    /// Non-empty candidate list drawn from `category`.
    Candidates {
        category: Category,
        messages: Vec<&'a str>,
    },
    /// Neither the requested nor the fallback category had messages.
    Exhausted,
}

impl MessageCatalog {
    pub fn new(
        messages: BTreeMap<Category, BTreeMap<String, Vec<String>>>,
        fallback_category: Option<Category>,
    ) -> Self {
        Self {
            messages,
            fallback_category,
            fallback_language: None,
        }
    }

    /// Language tried after the exact tag and its primary subtag.
    pub fn with_fallback_language(mut self, language: impl AsRef<str>) -> Self {
        let tag = normalize_language(language.as_ref());
        self.fallback_language = (!tag.is_empty()).then_some(tag);
        self
    }

    /// Parse and validate a JSON catalog.
    ///
    /// Unknown category keys, empty language tags, and blank messages are
    /// rejected here so that a malformed catalog fails at startup instead of
    /// degrading individual selections.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: RawCatalog = serde_json::from_str(raw).context("parsing message catalog")?;

        let fallback_category = match parsed.fallback_category.as_deref() {
            Some(label) => match Category::from_label(label) {
                Some(category) => Some(category),
                None => bail!("catalog fallback_category '{label}' is not a known category"),
            },
            None => None,
        };

        let mut messages = BTreeMap::new();
        for (label, languages) in parsed.categories {
            let Some(category) = Category::from_label(&label) else {
                bail!("catalog contains unknown category '{label}'");
            };
            let mut by_language = BTreeMap::new();
            for (language, list) in languages {
                let tag = normalize_language(&language);
                if tag.is_empty() {
                    bail!("catalog category '{label}' has an empty language tag");
                }
                if let Some(pos) = list.iter().position(|m| m.trim().is_empty()) {
                    bail!("catalog entry {label}/{language}[{pos}] is blank");
                }
                by_language.insert(tag, list);
            }
            messages.insert(category, by_language);
        }

        let catalog = Self::new(messages, fallback_category);
        Ok(match parsed.fallback_language {
            Some(language) => catalog.with_fallback_language(language),
            None => catalog,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading message catalog {}", path.display()))?;
        let catalog = Self::from_json(&raw)
            .with_context(|| format!("loading message catalog {}", path.display()))?;
        info!(
            path = %path.display(),
            categories = catalog.messages.len(),
            messages = catalog.message_count(),
            "message catalog loaded"
        );
        Ok(catalog)
    }

    /// Fallback category declared by the catalog itself, if any.
    pub fn fallback_category(&self) -> Option<Category> {
        self.fallback_category
    }

    pub fn fallback_language(&self) -> Option<&str> {
        self.fallback_language.as_deref()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.messages.keys().copied()
    }

    pub fn languages(&self, category: Category) -> impl Iterator<Item = &str> + '_ {
        self.messages
            .get(&category)
            .into_iter()
            .flat_map(|langs| langs.keys().map(String::as_str))
    }

    pub fn message_count(&self) -> usize {
        self.messages
            .values()
            .flat_map(|langs| langs.values())
            .map(Vec::len)
            .sum()
    }

    /// Messages for `(category, language)`.  Tries the exact tag first, then
    /// its primary subtag (`pt-BR` → `pt`), then the catalog's
    /// `fallback_language` if one is declared.
    pub fn messages(&self, category: Category, language: &str) -> &[String] {
        let Some(by_language) = self.messages.get(&category) else {
            return &[];
        };
        let tag = normalize_language(language);
        let primary = tag.split('-').next().unwrap_or_default();
        [Some(tag.as_str()), Some(primary), self.fallback_language.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|lang| by_language.get(lang).filter(|l| !l.is_empty()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve candidates for a request: requested category, then
    /// `fallback`, then [`CatalogLookup::Exhausted`].  The length filter is
    /// only applied when it leaves at least one candidate.
    pub fn lookup(
        &self,
        category: Category,
        fallback: Category,
        language: &str,
        preferred_length: PreferredLength,
    ) -> CatalogLookup<'_> {
        let (resolved, list) = match self.messages(category, language) {
            [] => {
                debug!(
                    category = category.slug(),
                    fallback = fallback.slug(),
                    language,
                    "catalog miss, retrying with fallback category"
                );
                (fallback, self.messages(fallback, language))
            }
            list => (category, list),
        };

        if list.is_empty() {
            warn!(
                category = category.slug(),
                fallback = fallback.slug(),
                language,
                "catalog exhausted, using default message"
            );
            return CatalogLookup::Exhausted;
        }

        CatalogLookup::Candidates {
            category: resolved,
            messages: filter_by_length(list, preferred_length),
        }
    }
}

fn filter_by_length(list: &[String], preferred_length: PreferredLength) -> Vec<&str> {
    let all = || list.iter().map(String::as_str).collect::<Vec<_>>();
    let Some(bucket) = preferred_length.bucket() else {
        return all();
    };
    let range = bucket.range();
    let filtered: Vec<&str> = list
        .iter()
        .map(String::as_str)
        .filter(|m| range.contains(&m.chars().count()))
        .collect();
    if filtered.is_empty() { all() } else { filtered }
}

fn normalize_language(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MessageCatalog {
        MessageCatalog::from_json(
            r#"{
                "categories": {
                    "motivation": {
                        "en": ["Keep going.", "You have got this."],
                        "es": ["Sigue adelante."]
                    },
                    "focus": {
                        "en": ["One thing at a time."]
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn exact_language_hit() {
        let catalog = sample();
        assert_eq!(
            catalog.messages(Category::Motivation, "es").to_vec(),
            vec!["Sigue adelante.".to_string()]
        );
        assert_eq!(catalog.message_count(), 4);
    }

    #[test]
    fn regional_tag_falls_back_to_primary_subtag() {
        let catalog = sample();
        assert_eq!(catalog.messages(Category::Focus, "en-GB").len(), 1);
        assert_eq!(catalog.messages(Category::Focus, "EN_us").len(), 1);
        assert!(catalog.messages(Category::Focus, "fr").is_empty());
    }

    #[test]
    fn lookup_retries_with_fallback_category() {
        let catalog = sample();
        match catalog.lookup(Category::Sleep, Category::Motivation, "en", PreferredLength::Any) {
            CatalogLookup::Candidates { category, messages } => {
                assert_eq!(category, Category::Motivation);
                assert_eq!(messages.len(), 2);
            }
            CatalogLookup::Exhausted => panic!("expected fallback candidates"),
        }
    }

    #[test]
    fn lookup_exhausted_when_fallback_also_missing() {
        let catalog = sample();
        assert_eq!(
            catalog.lookup(Category::Sleep, Category::Relaxation, "en", PreferredLength::Any),
            CatalogLookup::Exhausted
        );
        assert_eq!(
            catalog.lookup(Category::Focus, Category::Motivation, "de", PreferredLength::Short),
            CatalogLookup::Exhausted
        );
    }

    #[test]
    fn length_filter_applies_only_when_non_empty() {
        let short = "Breathe.".to_string();
        let long = "x".repeat(180);
        let list = vec![short.clone(), long.clone()];
        assert_eq!(filter_by_length(&list, PreferredLength::Short), vec![short.as_str()]);
        // 180 chars is inside both the medium and the long ranges.
        assert_eq!(filter_by_length(&list, PreferredLength::Medium), vec![long.as_str()]);
        assert_eq!(filter_by_length(&list, PreferredLength::Long), vec![long.as_str()]);
        assert_eq!(filter_by_length(&list, PreferredLength::Any).len(), 2);

        let only_short = vec![short.clone()];
        assert_eq!(filter_by_length(&only_short, PreferredLength::Long), vec![short.as_str()]);
    }

    #[test]
    fn rejects_unknown_category() {
        let err = MessageCatalog::from_json(r#"{"categories": {"astrology": {"en": ["x"]}}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("astrology"));
    }

    #[test]
    fn rejects_blank_message_and_bad_fallback() {
        assert!(MessageCatalog::from_json(r#"{"categories": {"focus": {"en": ["  "]}}}"#).is_err());
        assert!(
            MessageCatalog::from_json(r#"{"fallback_category": "nope", "categories": {}}"#).is_err()
        );
        assert!(MessageCatalog::from_json("not json").is_err());
    }

    #[test]
    fn declared_fallback_language_is_tried_last() {
        let catalog = MessageCatalog::from_json(
            r#"{
                "fallback_language": "EN",
                "categories": {"focus": {"en": ["One thing at a time."], "es": ["Una cosa."]}}
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.fallback_language(), Some("en"));
        assert_eq!(catalog.messages(Category::Focus, "es-AR")[0], "Una cosa.");
        assert_eq!(catalog.messages(Category::Focus, "fr")[0], "One thing at a time.");
        assert!(catalog.messages(Category::Sleep, "fr").is_empty());
    }

    #[test]
    fn declared_fallback_category_is_parsed() {
        let catalog = MessageCatalog::from_json(
            r#"{"fallback_category": "relaxation", "categories": {"relaxation": {"en": ["Rest."]}}}"#,
        )
        .unwrap();
        assert_eq!(catalog.fallback_category(), Some(Category::Relaxation));
    }
}
