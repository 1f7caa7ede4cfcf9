//! Reference lookups from source strings to standard concepts.

use std::collections::BTreeMap;

/// Concept lookup keyed by `(domain, concept_string)`.
///
/// Keys are compared after trimming and uppercasing so that source values
/// match regardless of case or surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptLookup {
    entries: BTreeMap<(String, String), i64>,
}

impl ConceptLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. The first entry for a key wins.
    pub fn insert(&mut self, domain: &str, concept_string: &str, standard_concept_id: i64) {
        self.entries
            .entry(lookup_key(domain, concept_string))
            .or_insert(standard_concept_id);
    }

    pub fn resolve(&self, domain: &str, concept_string: &str) -> Option<i64> {
        self.entries
            .get(&lookup_key(domain, concept_string))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct domains present in the lookup.
    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self.entries.keys().map(|(d, _)| d.as_str()).collect();
        domains.dedup();
        domains
    }
}

fn lookup_key(domain: &str, concept_string: &str) -> (String, String) {
    (
        domain.trim().to_uppercase(),
        concept_string.trim().to_uppercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_case_insensitively() {
        let mut lookup = ConceptLookup::new();
        lookup.insert("gender", "Female", 8532);
        assert_eq!(lookup.resolve("GENDER", " female "), Some(8532));
        assert_eq!(lookup.resolve("race", "female"), None);
    }

    #[test]
    fn first_entry_wins() {
        let mut lookup = ConceptLookup::new();
        lookup.insert("gender", "M", 8507);
        lookup.insert("gender", "m", 0);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.resolve("gender", "M"), Some(8507));
    }

    #[test]
    fn lists_distinct_domains() {
        let mut lookup = ConceptLookup::new();
        lookup.insert("gender", "M", 8507);
        lookup.insert("gender", "F", 8532);
        lookup.insert("visit", "OP", 9202);
        assert_eq!(lookup.domains(), vec!["GENDER", "VISIT"]);
    }
}
