//! Heuristic profile extraction.
//!
//! A profile is two short lists of phrases pulled from a tag's most recent records:
//! `static` facts (stable preferences and habits) and `dynamic` facts (what is being
//! worked on right now). [`RegexProfileExtractor`] matches verb templates and keeps the
//! phrase that follows. It is best-effort: it misses facts phrased any other way and
//! will happily capture noise such as "looks like a bug". Swap in another
//! [`ProfileExtractor`] for anything smarter.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::memory::store::MemoryStore;
use crate::memory::types::MemoryRecord;

/// Preference templates: the captured phrase feeds `static`.
static STATIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:prefers?|likes?|uses?|wants?)\s+([^.!?\n]+)",
        r"(?i)\b(?:always|usually|typically)\s+([^.!?\n]+)",
    ])
});

/// Activity templates: the captured phrase feeds `dynamic`.
static DYNAMIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:working on|implementing|building|fixing)\s+([^.!?\n]+)",
        r"(?i)\b(?:just|recently|currently)\s+([^.!?\n]+)",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("profile pattern must compile"))
        .collect()
}

/// Phrases longer than this are cut at a character boundary.
const MAX_PHRASE_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    #[serde(rename = "static")]
    pub static_facts: Vec<String>,
    #[serde(rename = "dynamic")]
    pub dynamic_facts: Vec<String>,
}

/// Summarizes a tag's recent records into a [`Profile`].
pub trait ProfileExtractor: Send + Sync {
    /// `records` are newest first.
    fn extract(&self, records: &[&MemoryRecord]) -> Profile;
}

/// Verb-template extractor. Each list is de-duplicated and capped at `max_facts`.
#[derive(Debug, Clone)]
pub struct RegexProfileExtractor {
    max_facts: usize,
}

impl RegexProfileExtractor {
    pub fn new(max_facts: usize) -> Self {
        Self { max_facts }
    }
}

impl Default for RegexProfileExtractor {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ProfileExtractor for RegexProfileExtractor {
    fn extract(&self, records: &[&MemoryRecord]) -> Profile {
        let mut static_facts = FactSet::new(self.max_facts);
        let mut dynamic_facts = FactSet::new(self.max_facts);

        for record in records {
            for re in STATIC_PATTERNS.iter() {
                for cap in re.captures_iter(&record.content) {
                    if let Some(m) = cap.get(1) {
                        static_facts.insert(m.as_str());
                    }
                }
            }
            for re in DYNAMIC_PATTERNS.iter() {
                for cap in re.captures_iter(&record.content) {
                    if let Some(m) = cap.get(1) {
                        dynamic_facts.insert(m.as_str());
                    }
                }
            }
            if static_facts.is_full() && dynamic_facts.is_full() {
                break;
            }
        }

        Profile {
            static_facts: static_facts.into_vec(),
            dynamic_facts: dynamic_facts.into_vec(),
        }
    }
}

/// Ordered set of trimmed phrases; first occurrence wins, comparison ignores case.
struct FactSet {
    facts: Vec<String>,
    seen: HashSet<String>,
    cap: usize,
}

impl FactSet {
    fn new(cap: usize) -> Self {
        Self {
            facts: Vec::new(),
            seen: HashSet::new(),
            cap,
        }
    }

    fn is_full(&self) -> bool {
        self.facts.len() >= self.cap
    }

    fn insert(&mut self, raw: &str) {
        if self.is_full() {
            return;
        }
        let phrase: String = raw.trim().chars().take(MAX_PHRASE_CHARS).collect();
        let phrase = phrase.trim_end().to_string();
        if phrase.is_empty() {
            return;
        }
        if self.seen.insert(phrase.to_lowercase()) {
            self.facts.push(phrase);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.facts
    }
}

/// Profile of `tag` from its `window` most recent live records.
pub fn extract_profile(
    store: &MemoryStore,
    tag: &str,
    extractor: &dyn ProfileExtractor,
    window: usize,
) -> Profile {
    let recent: Vec<&MemoryRecord> = store.recent(tag).take(window).collect();
    extractor.extract(&recent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::memory::store::NewMemory;

    fn store_with(contents: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::in_memory(LimitsConfig::default());
        for c in contents {
            store.add(NewMemory::new("proj1", *c)).unwrap();
        }
        store
    }

    #[test]
    fn test_preference_feeds_static() {
        let store = store_with(&["User prefers TypeScript over JavaScript"]);
        let profile = extract_profile(&store, "proj1", &RegexProfileExtractor::default(), 50);
        assert!(profile
            .static_facts
            .contains(&"TypeScript over JavaScript".to_string()));
        assert!(profile.dynamic_facts.is_empty());
    }

    #[test]
    fn test_activity_feeds_dynamic() {
        let store = store_with(&["Currently working on the auth middleware. Tests pass."]);
        let profile = extract_profile(&store, "proj1", &RegexProfileExtractor::default(), 50);
        assert!(profile
            .dynamic_facts
            .contains(&"the auth middleware".to_string()));
    }

    #[test]
    fn test_dedup_ignores_case_and_whitespace() {
        let store = store_with(&[
            "She likes dark mode",
            "she LIKES Dark Mode   ",
            "He usually writes tests first",
        ]);
        let profile = extract_profile(&store, "proj1", &RegexProfileExtractor::default(), 50);
        let dark: Vec<_> = profile
            .static_facts
            .iter()
            .filter(|f| f.eq_ignore_ascii_case("dark mode"))
            .collect();
        assert_eq!(dark.len(), 1);
        assert!(profile
            .static_facts
            .contains(&"writes tests first".to_string()));
    }

    #[test]
    fn test_lists_are_capped() {
        let contents: Vec<String> = (0..30)
            .map(|i| format!("prefers option{i}. recently touched file{i}"))
            .collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let store = store_with(&refs);

        let profile = extract_profile(&store, "proj1", &RegexProfileExtractor::new(10), 50);
        assert_eq!(profile.static_facts.len(), 10);
        assert_eq!(profile.dynamic_facts.len(), 10);
        // newest records are inspected first
        assert_eq!(profile.static_facts[0], "option29");
    }

    #[test]
    fn test_long_phrases_are_cut() {
        let content = format!("prefers {}", "é".repeat(500));
        let store = store_with(&[&content]);
        let profile = extract_profile(&store, "proj1", &RegexProfileExtractor::default(), 50);
        assert_eq!(profile.static_facts.len(), 1);
        assert_eq!(profile.static_facts[0].chars().count(), MAX_PHRASE_CHARS);
    }

    #[test]
    fn test_window_limits_inspected_records() {
        let store = store_with(&["prefers old stuff", "nothing to see", "nothing again"]);
        let profile = extract_profile(&store, "proj1", &RegexProfileExtractor::default(), 2);
        assert!(profile.static_facts.is_empty());
    }

    #[test]
    fn test_profile_serializes_static_dynamic() {
        let profile = Profile {
            static_facts: vec!["a".into()],
            dynamic_facts: vec![],
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["static"][0], "a");
        assert!(json["dynamic"].as_array().unwrap().is_empty());
    }
}
