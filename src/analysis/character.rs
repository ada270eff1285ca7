//! Character scoring: importance, centrality, classification, communities

use super::{Entities, ProcessedText};
use crate::config::AnalysisOptions;
use crate::model::{Character, Classification, Relation};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Importance blend weights: mentions, centrality, chapter presence.
const W_MENTIONS: f64 = 0.5;
const W_CENTRALITY: f64 = 0.3;
const W_PRESENCE: f64 = 0.2;

/// Computes character-level scores on the relation graph and classifies
/// the cast into main and supporting roles.
pub struct CharacterAnalyzer<'a> {
    options: &'a AnalysisOptions,
}

impl<'a> CharacterAnalyzer<'a> {
    pub fn new(options: &'a AnalysisOptions) -> Self {
        Self { options }
    }

    /// Run the stage: returns the cast with scores filled in, sorted by
    /// canonical name.
    pub fn analyze(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        relations: &[Relation],
    ) -> Vec<Character> {
        let mut characters = entities.characters.clone();
        let chapter_total = text.chapter_count().max(1) as f64;

        // Weighted degree per character over relation strengths.
        let mut degree: HashMap<&str, f64> = HashMap::new();
        for rel in relations {
            *degree.entry(rel.source.as_str()).or_insert(0.0) += rel.strength;
            *degree.entry(rel.target.as_str()).or_insert(0.0) += rel.strength;
        }
        let max_degree = degree.values().cloned().fold(0.0_f64, f64::max);
        let max_mentions = characters
            .iter()
            .map(|c| c.mention_count)
            .max()
            .unwrap_or(1)
            .max(1) as f64;

        let communities = detect_communities(&characters, relations);

        for character in &mut characters {
            let mention_norm = character.mention_count as f64 / max_mentions;
            let centrality = if max_degree > 0.0 {
                degree.get(character.name.as_str()).copied().unwrap_or(0.0) / max_degree
            } else {
                0.0
            };
            let presence =
                entities.chapters_of(&character.name, text).len() as f64 / chapter_total;

            character.degree_centrality = centrality;
            character.importance =
                (W_MENTIONS * mention_norm + W_CENTRALITY * centrality + W_PRESENCE * presence)
                    .clamp(0.0, 1.0);
            character.classification = if character.importance >= self.options.main_threshold
                || presence >= self.options.main_presence
            {
                Classification::Main
            } else {
                Classification::Supporting
            };
            character.community = communities
                .get(character.name.as_str())
                .copied()
                .unwrap_or(0);
        }

        debug!(
            main = characters
                .iter()
                .filter(|c| c.classification == Classification::Main)
                .count(),
            total = characters.len(),
            "character analysis complete"
        );
        characters
    }
}

/// Greedy modularity over the strength-weighted relation graph.
///
/// Starts with singleton communities and repeatedly applies the merge
/// with the largest positive modularity gain. Community labels are
/// renumbered by their smallest member name, so the labeling is stable
/// across runs.
fn detect_communities(characters: &[Character], relations: &[Relation]) -> HashMap<String, usize> {
    let names: Vec<&str> = characters.iter().map(|c| c.name.as_str()).collect();
    let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let n = names.len();

    // Symmetric weight matrix and total edge weight.
    let mut weight = vec![vec![0.0_f64; n]; n];
    let mut total = 0.0_f64;
    for rel in relations {
        let (Some(&a), Some(&b)) = (index.get(rel.source.as_str()), index.get(rel.target.as_str()))
        else {
            continue;
        };
        weight[a][b] += rel.strength;
        weight[b][a] += rel.strength;
        total += rel.strength;
    }
    if total == 0.0 {
        // No edges: everyone is their own community.
        return names.iter().enumerate().map(|(i, n)| (n.to_string(), i)).collect();
    }

    let strength: Vec<f64> = (0..n).map(|i| weight[i].iter().sum()).collect();
    let m2 = 2.0 * total;
    let mut community: Vec<usize> = (0..n).collect();

    loop {
        let mut best_gain = 0.0_f64;
        let mut best_pair = None;
        // Aggregate inter-community weights and community strengths.
        let mut inter: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut comm_strength: HashMap<usize, f64> = HashMap::new();
        for i in 0..n {
            *comm_strength.entry(community[i]).or_insert(0.0) += strength[i];
            for j in (i + 1)..n {
                if community[i] != community[j] && weight[i][j] > 0.0 {
                    let key = if community[i] < community[j] {
                        (community[i], community[j])
                    } else {
                        (community[j], community[i])
                    };
                    *inter.entry(key).or_insert(0.0) += weight[i][j];
                }
            }
        }
        for (&(a, b), &w) in &inter {
            let sa = comm_strength.get(&a).copied().unwrap_or(0.0);
            let sb = comm_strength.get(&b).copied().unwrap_or(0.0);
            let gain = w / total - (sa * sb) / (m2 * m2) * 2.0;
            if gain > best_gain {
                best_gain = gain;
                best_pair = Some((a, b));
            }
        }
        match best_pair {
            Some((a, b)) => {
                for c in community.iter_mut() {
                    if *c == b {
                        *c = a;
                    }
                }
            }
            None => break,
        }
    }

    // Renumber communities by smallest member name for determinism.
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, &c) in community.iter().enumerate() {
        groups.entry(c).or_default().push(i);
    }
    let mut keyed: Vec<(&str, Vec<usize>)> = groups
        .into_values()
        .map(|g| (g.iter().map(|&i| names[i]).min().unwrap_or(""), g))
        .collect();
    keyed.sort_by_key(|(k, _)| *k);
    let mut out = HashMap::new();
    for (label, (_, group)) in keyed.into_iter().enumerate() {
        for i in group {
            out.insert(names[i].to_string(), label);
        }
    }
    out
}
