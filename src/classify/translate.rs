//! Species name translation.
//!
//! The model speaks English; the user does not have to. The table maps
//! lowercase English labels to localized display names, with a substring
//! fallback for labels the vocabulary spells slightly differently
//! ("Northern Pike (adult)" still resolves to щука).

/// Built-in vocabulary of the frozen classifier.
const FISH_NAMES: &[(&str, &str)] = &[
    ("gourami", "гурами"),
    ("catfish", "сом"),
    ("perch", "окунь"),
    ("northern pike", "щука"),
    ("unknown", "неизвестная рыба"),
];

/// Static mapping from lowercase English label to localized display name.
/// Read-only for the process lifetime.
pub struct TranslationTable {
    entries: Vec<(String, String)>,
}

impl TranslationTable {
    /// The built-in fish vocabulary.
    pub fn builtin() -> Self {
        Self {
            entries: FISH_NAMES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn with_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Resolve a display name: case-insensitive exact match first, then
    /// case-insensitive substring match in either direction, else the
    /// untranslated original label.
    pub fn resolve(&self, label: &str) -> String {
        let needle = label.trim().to_lowercase();
        if needle.is_empty() {
            return label.to_string();
        }

        if let Some((_, name)) = self.entries.iter().find(|(key, _)| *key == needle) {
            return name.clone();
        }

        if let Some((_, name)) = self
            .entries
            .iter()
            .find(|(key, _)| needle.contains(key.as_str()) || key.contains(&needle))
        {
            return name.clone();
        }

        label.to_string()
    }
}

impl Default for TranslationTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_case_insensitive() {
        let table = TranslationTable::builtin();
        assert_eq!(table.resolve("Perch"), "окунь");
        assert_eq!(table.resolve("CATFISH"), "сом");
        assert_eq!(table.resolve("  gourami  "), "гурами");
    }

    #[test]
    fn substring_fallback_works_both_directions() {
        let table = TranslationTable::builtin();
        // Label contains a table key.
        assert_eq!(table.resolve("Northern Pike (adult)"), "щука");
        // Table key contains the label.
        assert_eq!(table.resolve("pike"), "щука");
    }

    #[test]
    fn unmapped_label_passes_through_untranslated() {
        let table = TranslationTable::builtin();
        assert_eq!(table.resolve("Zander"), "Zander");
    }

    #[test]
    fn empty_label_never_matches() {
        let table = TranslationTable::builtin();
        assert_eq!(table.resolve("   "), "   ");
    }
}
