//! Characters and the relations that bind them

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Main vs. supporting classification, decided by the character analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Main,
    Supporting,
}

/// A character with its merged surface forms and derived scores.
///
/// Invariants: the canonical `name` is a member of `aliases`; alias sets of
/// distinct characters are disjoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Canonical name (the longest merged surface form)
    pub name: String,
    /// All surface forms, canonical included
    pub aliases: BTreeSet<String>,
    /// Total occurrences of any alias across the novel
    pub mention_count: usize,
    /// Smallest chapter index with a mention
    pub first_appearance: usize,
    /// Blended importance in [0, 1]
    pub importance: f64,
    /// Normalized weighted degree in the relation graph, in [0, 1]
    pub degree_centrality: f64,
    pub classification: Classification,
    /// Community label from greedy modularity detection (reported only)
    pub community: usize,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut aliases = BTreeSet::new();
        aliases.insert(name.clone());
        Self {
            name,
            aliases,
            mention_count: 0,
            first_appearance: usize::MAX,
            importance: 0.0,
            degree_centrality: 0.0,
            classification: Classification::Supporting,
            community: 0,
        }
    }

    /// Whether `surface` is one of this character's known forms.
    pub fn known_as(&self, surface: &str) -> bool {
        self.aliases.contains(surface)
    }
}

/// Relation types, listed in tie-break priority order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    Kin,
    MasterDisciple,
    Lover,
    Friend,
    Enemy,
    Colleague,
    Acquaintance,
    Unknown,
}

impl RelationKind {
    /// Lower rank wins ties between equal-weight evidence channels.
    pub fn priority(&self) -> u8 {
        match self {
            RelationKind::Kin => 0,
            RelationKind::MasterDisciple => 1,
            RelationKind::Lover => 2,
            RelationKind::Friend => 3,
            RelationKind::Enemy => 4,
            RelationKind::Colleague => 5,
            RelationKind::Acquaintance => 6,
            RelationKind::Unknown => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Kin => "kin",
            RelationKind::MasterDisciple => "master-disciple",
            RelationKind::Lover => "lover",
            RelationKind::Friend => "friend",
            RelationKind::Enemy => "enemy",
            RelationKind::Colleague => "colleague",
            RelationKind::Acquaintance => "acquaintance",
            RelationKind::Unknown => "unknown",
        }
    }
}

/// The evidence channel a relation observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceChannel {
    CoOccurrence,
    Pattern,
    Dialogue,
}

/// One piece of evidence behind a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEvidence {
    pub chapter: usize,
    pub channel: EvidenceChannel,
}

/// A typed link between two characters.
///
/// `source`/`target` are canonical names; for symmetric kinds the pair is
/// stored in lexicographic order so each unordered pair appears at most
/// once per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
    /// Accumulated evidence strength in [0, 1]
    pub strength: f64,
    pub evidence: Vec<RelationEvidence>,
}

impl Relation {
    /// The unordered pair key for dedup and sorting.
    pub fn pair_key(&self) -> (String, String) {
        if self.source <= self.target {
            (self.source.clone(), self.target.clone())
        } else {
            (self.target.clone(), self.source.clone())
        }
    }
}
