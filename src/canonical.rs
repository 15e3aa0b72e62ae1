use std::collections::{BTreeMap, HashMap};

use crate::config::{DeploymentProfile, SynonymTarget};

/// Maps free-text nominations onto the closed category set.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    categories: Vec<String>,
    /// Normalised category token, in category order.
    category_tokens: Vec<String>,
    synonyms: HashMap<String, Vec<String>>,
}

impl Canonicalizer {
    pub fn new(categories: &[String], synonyms: &BTreeMap<String, SynonymTarget>) -> Self {
        let synonyms = synonyms
            .iter()
            .map(|(raw, target)| {
                let names = target.names().into_iter().map(String::from).collect();
                (normalize_token(raw), names)
            })
            .collect();
        Self {
            categories: categories.to_vec(),
            category_tokens: categories.iter().map(|name| normalize_token(name)).collect(),
            synonyms,
        }
    }

    pub fn from_profile(profile: &DeploymentProfile) -> Self {
        Self::new(&profile.categories, &profile.synonyms)
    }

    /// Resolves a nomination to canonical names, deduplicated in order.
    ///
    /// A synonym hit wins outright; otherwise every category whose token is
    /// contained in the nomination's token matches, in category order. Names
    /// outside the category set are never returned.
    pub fn canonicalize(&self, raw: &str) -> Vec<String> {
        let token = normalize_token(raw);
        if token.is_empty() {
            return Vec::new();
        }

        let candidates: Vec<&String> = match self.synonyms.get(&token) {
            Some(names) => names.iter().collect(),
            None => self
                .categories
                .iter()
                .zip(&self.category_tokens)
                .filter(|(_, category_token)| {
                    !category_token.is_empty() && token.contains(category_token.as_str())
                })
                .map(|(name, _)| name)
                .collect(),
        };

        let mut resolved: Vec<String> = Vec::with_capacity(candidates.len());
        for name in candidates {
            if self.categories.contains(name) && !resolved.contains(name) {
                resolved.push(name.clone());
            }
        }
        resolved
    }
}

/// Uppercases the input and keeps only ASCII letters.
pub fn normalize_token(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(char::is_ascii_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonicalizer() -> Canonicalizer {
        Canonicalizer::from_profile(&DeploymentProfile::default())
    }

    #[test]
    fn normalization_strips_everything_but_letters() {
        assert_eq!(normalize_token("Zeus / Apollo-2"), "ZEUSAPOLLO");
        assert_eq!(normalize_token("  bulk java "), "BULKJAVA");
    }

    #[test]
    fn synonyms_resolve_in_configured_order() {
        let canon = canonicalizer();
        assert_eq!(canon.canonicalize("Zeus/Apollo"), vec!["Zeus", "Apollo"]);
        assert_eq!(canon.canonicalize("apollo - zeus"), vec!["Zeus", "Apollo"]);
        assert_eq!(canon.canonicalize("WHS Iskandar"), vec!["WHS"]);
        assert_eq!(canon.canonicalize("Mutiara Jawa"), vec!["Eagle"]);
        assert_eq!(canon.canonicalize("ratu-dewata"), vec!["Ratu Dewata"]);
    }

    #[test]
    fn every_synonym_entry_maps_to_its_configured_names() {
        let profile = DeploymentProfile::default();
        let canon = canonicalizer();
        for (raw, target) in &profile.synonyms {
            let expected: Vec<String> = target.names().into_iter().map(String::from).collect();
            assert_eq!(canon.canonicalize(raw), expected, "synonym {raw}");
        }
    }

    #[test]
    fn substring_fallback_uses_category_order() {
        let canon = canonicalizer();
        assert_eq!(canon.canonicalize("FLF Mara"), vec!["Mara"]);
        assert_eq!(canon.canonicalize("Eagle + Apollo"), vec!["Apollo", "Eagle"]);
    }

    #[test]
    fn unmatched_and_empty_nominations_yield_nothing() {
        let canon = canonicalizer();
        assert!(canon.canonicalize("Nowhere Jetty").is_empty());
        assert!(canon.canonicalize("").is_empty());
        assert!(canon.canonicalize("123 / -").is_empty());
    }

    #[test]
    fn duplicates_and_unknown_synonym_targets_are_dropped() {
        let categories = vec!["Zeus".to_string(), "Apollo".to_string()];
        let synonyms = BTreeMap::from([(
            "Z/Z/X".to_string(),
            SynonymTarget::Many(vec!["Zeus".into(), "Zeus".into(), "Hermes".into()]),
        )]);
        let canon = Canonicalizer::new(&categories, &synonyms);
        assert_eq!(canon.canonicalize("z / z / x"), vec!["Zeus"]);
    }
}
