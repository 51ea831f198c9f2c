//! Regulatory rule table and point lookups.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rule text used when a lookup misses.
pub const UNKNOWN_RULE: &str = "Unknown";
/// Consequence text used when a lookup misses.
pub const UNKNOWN_CONSEQUENCE: &str = "Unknown";

/// A regulation and the consequence of breaching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub rule: String,
    pub consequence: String,
}

impl Rule {
    pub fn new(rule: impl Into<String>, consequence: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            consequence: consequence.into(),
        }
    }

    /// The sentinel pair returned for unmatched lookups.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_RULE, UNKNOWN_CONSEQUENCE)
    }
}

/// Source shape of the table: `state -> hazard -> rule`.
pub type RawCatalog = BTreeMap<String, BTreeMap<String, Rule>>;

/// Outcome of a lookup. A miss is a value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a Rule),
    Miss,
}

impl<'a> Lookup<'a> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn rule(&self) -> &'a str {
        match self {
            Lookup::Found(r) => &r.rule,
            Lookup::Miss => UNKNOWN_RULE,
        }
    }

    pub fn consequence(&self) -> &'a str {
        match self {
            Lookup::Found(r) => &r.consequence,
            Lookup::Miss => UNKNOWN_CONSEQUENCE,
        }
    }

    pub fn to_rule(&self) -> Rule {
        match self {
            Lookup::Found(r) => (*r).clone(),
            Lookup::Miss => Rule::unknown(),
        }
    }
}

/// Immutable `state -> hazard -> rule` table.
///
/// - States match **exactly** (case-sensitive).
/// - Hazards match after trimming and lowercasing, on both the stored keys (once,
///   at construction) and the query. When two stored keys collapse to the same
///   normalized key, the one that sorts last wins.
///
/// Built once and shared read-only (`Arc<RuleCatalog>`); lookups need no locking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCatalog", into = "RawCatalog")]
pub struct RuleCatalog {
    states: RawCatalog,
}

impl RuleCatalog {
    /// A catalog with no states: every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_map(raw: RawCatalog) -> Self {
        let states = raw
            .into_iter()
            .map(|(state, hazards)| {
                let hazards = hazards
                    .into_iter()
                    .map(|(hazard, rule)| (normalize_hazard(&hazard), rule))
                    .collect();
                (state, hazards)
            })
            .collect();
        Self { states }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Find the rule for `hazard` in `state`, or `Lookup::Miss`.
    pub fn lookup(&self, state: &str, hazard: &str) -> Lookup<'_> {
        self.states
            .get(state)
            .and_then(|hazards| hazards.get(&normalize_hazard(hazard)))
            .map_or(Lookup::Miss, Lookup::Found)
    }

    pub fn contains_state(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }

    /// Jurisdictions in sorted order.
    pub fn states(&self) -> impl Iterator<Item = &str> + '_ {
        self.states.keys().map(String::as_str)
    }

    /// Total number of hazard entries across every state.
    pub fn len(&self) -> usize {
        self.states.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RawCatalog> for RuleCatalog {
    fn from(raw: RawCatalog) -> Self {
        Self::from_map(raw)
    }
}

impl From<RuleCatalog> for RawCatalog {
    fn from(catalog: RuleCatalog) -> Self {
        catalog.states
    }
}

/// Canonical form of a hazard code for matching.
pub fn normalize_hazard(hazard: &str) -> String {
    hazard.trim().to_lowercase()
}
