use std::collections::BTreeMap;
use std::path::Path;

use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};

use crate::config::{parse_raw, RawProblemType, RawTriggerConfig, BUILTIN_DEFAULT};
use crate::error::{Result, TriggerError};

/// Stable identifier of a problem category. Doubles as an output directory name.
pub type ProblemTypeKey = String;

/// One problem category with its compiled trigger matchers
#[derive(Clone, Debug)]
pub struct ProblemType {
    key: ProblemTypeKey,
    name: String,
    /// Which of `matchers` occur at all; avoids a full scan per trigger
    prefilter: RegexSet,
    /// One regex per literal trigger or raw pattern, so overlapping hits are all found
    matchers: Vec<Regex>,
    triggers: usize,
    patterns: usize,
}

impl ProblemType {
    fn compile(key: &str, raw: RawProblemType) -> Result<Self> {
        validate_key(key)?;

        let mut literals: Vec<String> = raw
            .triggers
            .iter()
            .filter_map(|trigger| literal_alternative(trigger))
            .collect();
        literals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        literals.dedup();

        let patterns: Vec<String> = raw
            .patterns
            .iter()
            .map(|pattern| pattern.trim())
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_string)
            .collect();

        if literals.is_empty() && patterns.is_empty() {
            return Err(TriggerError::invalid_type(
                key,
                "at least one trigger or pattern is required",
            ));
        }

        let triggers = literals.len();
        let pattern_count = patterns.len();
        let sources: Vec<String> = literals.into_iter().chain(patterns).collect();

        let invalid = |source: regex::Error| TriggerError::InvalidPattern {
            key: key.to_string(),
            source,
        };
        let matchers = sources
            .iter()
            .map(|source| RegexBuilder::new(source).case_insensitive(true).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(invalid)?;
        let prefilter = RegexSetBuilder::new(&sources)
            .case_insensitive(true)
            .build()
            .map_err(invalid)?;

        let name = raw
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| key.to_string());

        log::debug!(
            "Compiled problem type {key} ({triggers} triggers, {pattern_count} patterns)"
        );

        Ok(Self {
            key: key.to_string(),
            name,
            prefilter,
            matchers,
            triggers,
            patterns: pattern_count,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human readable name, falls back to the key
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers + self.patterns
    }

    /// Distinct trigger strings occurring in `text`, ordered by position.
    ///
    /// Every trigger and pattern is matched independently, so a trigger contained
    /// in a longer one is still reported. Whitespace inside a hit is collapsed to
    /// single spaces. Callers pass lower-cased text; matching itself is
    /// case-insensitive so mixed-case input still works.
    pub fn find_matches(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<(usize, usize, String)> = self
            .prefilter
            .matches(text)
            .into_iter()
            .flat_map(|index| self.matchers[index].find_iter(text))
            .filter(|hit| !hit.as_str().is_empty())
            .map(|hit| (hit.start(), hit.end(), collapse_whitespace(hit.as_str())))
            .collect();
        // Leftmost first; at the same offset the longer hit first.
        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

        let mut found: Vec<String> = Vec::new();
        for (_, _, hit) in hits {
            let folded = hit.to_lowercase();
            if !found.iter().any(|seen| seen.to_lowercase() == folded) {
                found.push(hit);
            }
        }
        found
    }
}

/// The full set of configured problem types, keyed and iterated in key order
#[derive(Clone, Debug)]
pub struct TriggerSet {
    types: BTreeMap<ProblemTypeKey, ProblemType>,
}

impl TriggerSet {
    /// Trigger set bundled with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_bytes(BUILTIN_DEFAULT.as_bytes())
    }

    /// Load a JSON or TOML trigger file
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let set = Self::from_bytes(&bytes)?;
        log::info!(
            "Loaded {} problem types from {}",
            set.len(),
            path.display()
        );
        Ok(set)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_raw(parse_raw(bytes)?)
    }

    fn from_raw(raw: RawTriggerConfig) -> Result<Self> {
        if raw.types.is_empty() {
            return Err(TriggerError::NoProblemTypes);
        }
        let mut types = BTreeMap::new();
        for (key, raw_type) in raw.types {
            let problem_type = ProblemType::compile(&key, raw_type)?;
            types.insert(key, problem_type);
        }
        Ok(Self { types })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Problem type keys in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProblemType> {
        self.types.values()
    }

    pub fn get(&self, key: &str) -> Option<&ProblemType> {
        self.types.get(key)
    }

    /// Human readable name for `key`; unknown keys render as themselves
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.types.get(key).map_or(key, ProblemType::name)
    }

    /// Distinct triggers of type `key` found in `text`. Unknown keys match nothing.
    pub fn find_matches(&self, text: &str, key: &str) -> Vec<String> {
        self.types
            .get(key)
            .map(|problem_type| problem_type.find_matches(text))
            .unwrap_or_default()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(TriggerError::invalid_type(key, "key must not be empty"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TriggerError::invalid_type(
            key,
            "key may only contain ASCII letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// Regex alternative for a literal trigger. Word boundaries are only asserted on
/// sides that start or end with a word character, so "c++" still matches.
fn literal_alternative(trigger: &str) -> Option<String> {
    let lowered = trigger.trim().to_lowercase();
    let first = lowered.chars().next()?;
    let last = lowered.chars().next_back()?;

    let body = lowered
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let lead = if is_word_char(first) { r"\b" } else { "" };
    let trail = if is_word_char(last) { r"\b" } else { "" };
    Some(format!("{lead}{body}{trail}"))
}

fn collapse_whitespace(hit: &str) -> String {
    hit.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
