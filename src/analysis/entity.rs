//! Entity extraction: character names, locations, alias merging

use super::ProcessedText;
use crate::config::AnalysisOptions;
use crate::error::AnalysisError;
use crate::lexicon::Lexicons;
use crate::model::{Character, Location, LocationKind};
use crate::text::{Pos, TextProcessor};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Self-identification markers inside dialogue ("我乃X", "我是X").
const SELF_MARKERS: [&str; 3] = ["我乃", "我是", "我叫"];

/// Output of the entity stage: the cast, the places, and a per-sentence
/// mention index that every later stage reads.
#[derive(Debug, Clone)]
pub struct Entities {
    /// Merged characters, sorted by canonical name. Scores are zero until
    /// the character analyzer fills them.
    pub characters: Vec<Character>,
    /// Distinct locations, sorted by name. Counts are zero until the
    /// location analyzer fills them.
    pub locations: Vec<Location>,
    /// `mentions[chapter_pos][sentence_idx]` → canonical character names
    pub mentions: Vec<Vec<Vec<String>>>,
    /// `location_mentions[chapter_pos][sentence_idx]` → location names
    pub location_mentions: Vec<Vec<Vec<String>>>,
}

impl Entities {
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Chapters (1-based indices) where a character is mentioned.
    pub fn chapters_of(&self, name: &str, text: &ProcessedText) -> BTreeSet<usize> {
        let mut chapters = BTreeSet::new();
        for (pos, sentences) in self.mentions.iter().enumerate() {
            if sentences.iter().any(|s| s.iter().any(|n| n == name)) {
                chapters.insert(text.chapters[pos].index);
            }
        }
        chapters
    }

    /// All (character, chapter) appearance pairs.
    pub fn appearances(&self, text: &ProcessedText) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        for c in &self.characters {
            for chapter in self.chapters_of(&c.name, text) {
                out.push((c.name.clone(), chapter));
            }
        }
        out
    }
}

/// Scans every chapter's token stream for candidate characters and
/// locations, merges aliases, and filters by minimum mentions.
pub struct EntityExtractor<'a> {
    lexicons: &'a Lexicons,
    options: &'a AnalysisOptions,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(lexicons: &'a Lexicons, options: &'a AnalysisOptions) -> Self {
        Self { lexicons, options }
    }

    /// Run the stage. Fails with `NoEntitiesFound` when fewer than two
    /// characters survive filtering.
    pub fn extract(&self, text: &ProcessedText) -> Result<Entities, AnalysisError> {
        let processor = TextProcessor::new(self.lexicons);

        // Pass 1: raw candidate counts and per-sentence surface tokens.
        let mut name_counts: HashMap<String, usize> = HashMap::new();
        let mut first_chapter: HashMap<String, usize> = HashMap::new();
        let mut place_names: BTreeMap<String, LocationKind> = BTreeMap::new();
        // surface tokens per (chapter position, sentence)
        let mut surface: Vec<Vec<Vec<String>>> = Vec::with_capacity(text.chapters.len());
        let mut place_surface: Vec<Vec<Vec<String>>> = Vec::with_capacity(text.chapters.len());

        for chapter in &text.chapters {
            let mut chapter_names = Vec::with_capacity(chapter.sentences.len());
            let mut chapter_places = Vec::with_capacity(chapter.sentences.len());
            for sentence in &chapter.sentences {
                let mut names_here = Vec::new();
                let mut places_here = Vec::new();
                for token in processor.segment(sentence) {
                    match token.pos {
                        Pos::PersonName => {
                            *name_counts.entry(token.text.clone()).or_insert(0) += 1;
                            first_chapter
                                .entry(token.text.clone())
                                .and_modify(|c| *c = (*c).min(chapter.index))
                                .or_insert(chapter.index);
                            names_here.push(token.text);
                        }
                        Pos::PlaceName => {
                            let kind = self
                                .lexicons
                                .classify_place(&token.text)
                                .unwrap_or(LocationKind::Other);
                            place_names.entry(token.text.clone()).or_insert(kind);
                            places_here.push(token.text);
                        }
                        _ => {}
                    }
                }
                chapter_names.push(names_here);
                chapter_places.push(places_here);
            }
            surface.push(chapter_names);
            place_surface.push(chapter_places);
        }

        // Filter by minimum mentions.
        let candidates: HashSet<String> = name_counts
            .iter()
            .filter(|(_, &count)| count >= self.options.min_mentions)
            .map(|(name, _)| name.clone())
            .collect();

        // Pass 2: collect merge evidence over the candidate set.
        let merge_pairs = self.collect_merge_pairs(text, &candidates, &surface, &processor);
        let classes = merge_classes(&candidates, &merge_pairs);
        debug!(
            candidates = candidates.len(),
            classes = classes.len(),
            "alias merging complete"
        );

        if classes.len() < 2 {
            return Err(AnalysisError::NoEntitiesFound(format!(
                "{} character(s) after filtering; at least two required",
                classes.len()
            )));
        }

        // Build characters from equivalence classes.
        let mut alias_to_canonical: HashMap<String, String> = HashMap::new();
        let mut characters = Vec::with_capacity(classes.len());
        for class in &classes {
            let canonical = canonical_of(class);
            let mut character = Character::new(canonical.clone());
            for alias in class {
                character.aliases.insert(alias.clone());
                character.mention_count += name_counts.get(alias).copied().unwrap_or(0);
                if let Some(&first) = first_chapter.get(alias) {
                    character.first_appearance = character.first_appearance.min(first);
                }
                alias_to_canonical.insert(alias.clone(), canonical.clone());
            }
            characters.push(character);
        }
        characters.sort_by(|a, b| a.name.cmp(&b.name));

        // Resolve the mention index to canonical names.
        let mentions: Vec<Vec<Vec<String>>> = surface
            .iter()
            .map(|chapter| {
                chapter
                    .iter()
                    .map(|sentence| {
                        let mut resolved: Vec<String> = sentence
                            .iter()
                            .filter_map(|s| alias_to_canonical.get(s).cloned())
                            .collect();
                        resolved.sort();
                        resolved.dedup();
                        resolved
                    })
                    .collect()
            })
            .collect();

        let locations: Vec<Location> = place_names
            .into_iter()
            .map(|(name, kind)| Location::new(name, kind))
            .collect();

        Ok(Entities {
            characters,
            locations,
            mentions,
            location_mentions: place_surface,
        })
    }

    /// Gather unordered alias-merge pairs from all three channels. The
    /// result is a set, so downstream merging cannot depend on the order
    /// chapters were scanned in.
    fn collect_merge_pairs(
        &self,
        text: &ProcessedText,
        candidates: &HashSet<String>,
        surface: &[Vec<Vec<String>>],
        processor: &TextProcessor<'_>,
    ) -> BTreeSet<(String, String)> {
        let mut pairs = BTreeSet::new();

        // Channel 1: suffix containment with repeated same-sentence
        // co-occurrence.
        let mut cooccur: HashMap<(String, String), usize> = HashMap::new();
        for chapter in surface {
            for sentence in chapter {
                let here: BTreeSet<&String> = sentence
                    .iter()
                    .filter(|n| candidates.contains(*n))
                    .collect();
                let list: Vec<&String> = here.into_iter().collect();
                for i in 0..list.len() {
                    for j in (i + 1)..list.len() {
                        let key = ordered(list[i], list[j]);
                        *cooccur.entry(key).or_insert(0) += 1;
                    }
                }
            }
        }
        for ((a, b), count) in &cooccur {
            if *count >= self.options.alias_cooccurrence && is_suffix_pair(a, b) {
                pairs.insert(ordered(a, b));
            }
        }

        // Channel 2: appositive patterns ("X，也就是Y").
        for chapter in &text.chapters {
            for sentence in &chapter.sentences {
                let compact: String = sentence.chars().filter(|c| !c.is_whitespace()).collect();
                for marker in &self.lexicons.appositive_markers {
                    for b in candidates {
                        let Some(idx) = compact.find(&format!("{marker}{b}")) else {
                            continue;
                        };
                        let before = &compact[..idx];
                        let trimmed = before.trim_end_matches(['，', ',', '、', '：']);
                        for a in candidates {
                            if a != b && trimmed.ends_with(a.as_str()) {
                                pairs.insert(ordered(a, b));
                            }
                        }
                    }
                }
            }
        }

        // Channel 3: dialogue self-identification ("林远道：“我乃远山。”").
        for chapter in &text.chapters {
            let joined = chapter.sentences.join("\n");
            for span in processor.dialogues(&joined) {
                let speaker = processor
                    .segment(&span.lead)
                    .into_iter()
                    .filter(|t| t.pos == Pos::PersonName && candidates.contains(&t.text))
                    .next_back();
                let Some(speaker) = speaker else { continue };
                for marker in SELF_MARKERS {
                    let Some(idx) = span.text.find(marker) else {
                        continue;
                    };
                    let after = &span.text[idx + marker.len()..];
                    for b in candidates {
                        if *b != speaker.text && after.starts_with(b.as_str()) {
                            pairs.insert(ordered(&speaker.text, b));
                        }
                    }
                }
            }
        }

        pairs
    }
}

/// Union-find closure over the merge-pair set.
///
/// The classes depend only on the *set* of pairs, never on iteration
/// order, which is what makes alias merging idempotent and
/// order-independent.
pub(crate) fn merge_classes(
    candidates: &HashSet<String>,
    pairs: &BTreeSet<(String, String)>,
) -> Vec<BTreeSet<String>> {
    let mut parent: HashMap<String, String> =
        candidates.iter().map(|c| (c.clone(), c.clone())).collect();

    fn find(parent: &mut HashMap<String, String>, x: &str) -> String {
        let p = parent.get(x).cloned().unwrap_or_else(|| x.to_string());
        if p == x {
            return p;
        }
        let root = find(parent, &p);
        parent.insert(x.to_string(), root.clone());
        root
    }

    for (a, b) in pairs {
        if !parent.contains_key(a) || !parent.contains_key(b) {
            continue;
        }
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            // Deterministic union: smaller root string becomes parent.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent.insert(hi, lo);
        }
    }

    let mut classes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let keys: Vec<String> = parent.keys().cloned().collect();
    for key in keys {
        let root = find(&mut parent, &key);
        classes.entry(root).or_default().insert(key);
    }
    classes.into_values().collect()
}

/// Canonical name of a class: the longest form; ties break
/// lexicographically so the choice is deterministic.
fn canonical_of(class: &BTreeSet<String>) -> String {
    class
        .iter()
        .max_by(|a, b| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| b.cmp(a))
        })
        .cloned()
        .unwrap_or_default()
}

fn ordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn is_suffix_pair(a: &str, b: &str) -> bool {
    (a.ends_with(b) || b.ends_with(a)) && a != b
}
