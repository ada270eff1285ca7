//! Relation extraction from co-occurrence, patterns, and dialogue

use super::{Entities, ProcessedText};
use crate::config::AnalysisOptions;
use crate::lexicon::Lexicons;
use crate::model::{EvidenceChannel, Relation, RelationEvidence, RelationKind};
use crate::text::{Pos, TextProcessor};
use std::collections::HashMap;
use tracing::debug;

/// Pattern evidence dominates co-occurrence 3:1; dialogue sits between.
const DIALOGUE_WEIGHT: f64 = 2.0;

/// Accumulated evidence for one unordered character pair.
#[derive(Debug, Default)]
struct PairEvidence {
    /// Total weight across every channel (drives strength)
    total: f64,
    /// Weight per relation kind (drives the winning kind)
    by_kind: HashMap<RelationKind, f64>,
    evidence: Vec<RelationEvidence>,
}

/// Infers pairwise character relations across the whole novel.
pub struct RelationExtractor<'a> {
    lexicons: &'a Lexicons,
    options: &'a AnalysisOptions,
}

impl<'a> RelationExtractor<'a> {
    pub fn new(lexicons: &'a Lexicons, options: &'a AnalysisOptions) -> Self {
        Self { lexicons, options }
    }

    /// Run the stage over the processed text and extracted entities.
    pub fn extract(&self, text: &ProcessedText, entities: &Entities) -> Vec<Relation> {
        let mut pairs: HashMap<(String, String), PairEvidence> = HashMap::new();

        self.accumulate_cooccurrence(text, entities, &mut pairs);
        self.accumulate_patterns(text, entities, &mut pairs);
        self.accumulate_dialogue(text, entities, &mut pairs);

        let mut relations: Vec<Relation> = pairs
            .into_iter()
            .map(|((a, b), acc)| {
                let kind = winning_kind(&acc.by_kind);
                let strength = (acc.total / self.options.strength_scale).tanh();
                Relation {
                    source: a,
                    target: b,
                    kind,
                    strength,
                    evidence: acc.evidence,
                }
            })
            .collect();
        relations.sort_by(|a, b| a.pair_key().cmp(&b.pair_key()));
        debug!(relations = relations.len(), "relation extraction complete");
        relations
    }

    /// Channel 1: sentence-window co-occurrence, weight 1/(distance+1).
    fn accumulate_cooccurrence(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        pairs: &mut HashMap<(String, String), PairEvidence>,
    ) {
        let window = self.options.cooccurrence_window.max(1);
        for (pos, chapter) in text.chapters.iter().enumerate() {
            let mentions = &entities.mentions[pos];
            for i in 0..mentions.len() {
                for j in i..mentions.len().min(i + window) {
                    let distance = j - i;
                    for a in &mentions[i] {
                        for b in &mentions[j] {
                            // Within one sentence, count each unordered
                            // pair once; across sentences the two
                            // orientations are distinct co-occurrences.
                            if (i == j && a >= b) || a == b {
                                continue;
                            }
                            let acc = pairs.entry(ordered_pair(a, b)).or_default();
                            acc.total += 1.0 / (distance as f64 + 1.0);
                            acc.evidence.push(RelationEvidence {
                                chapter: chapter.index,
                                channel: EvidenceChannel::CoOccurrence,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Channel 2: the fixed relation-pattern catalogue, matched against
    /// whitespace-stripped sentences over every alias pair.
    fn accumulate_patterns(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        pairs: &mut HashMap<(String, String), PairEvidence>,
    ) {
        for (pos, chapter) in text.chapters.iter().enumerate() {
            for (sidx, sentence) in chapter.sentences.iter().enumerate() {
                let present = &entities.mentions[pos][sidx];
                if present.len() < 2 {
                    continue;
                }
                let compact: String = sentence.chars().filter(|c| !c.is_whitespace()).collect();
                for a in present {
                    for b in present {
                        if a == b {
                            continue;
                        }
                        let (Some(ca), Some(cb)) = (entities.character(a), entities.character(b))
                        else {
                            continue;
                        };
                        for pattern in &self.lexicons.relation_patterns {
                            let hit = ca.aliases.iter().any(|sa| {
                                cb.aliases.iter().any(|sb| {
                                    compact.contains(&format!(
                                        "{sa}{}{sb}{}",
                                        pattern.infix, pattern.suffix
                                    ))
                                })
                            });
                            if !hit {
                                continue;
                            }
                            let key = ordered_pair(a, b);
                            let acc = pairs.entry(key).or_default();
                            acc.total += pattern.weight;
                            *acc.by_kind.entry(pattern.kind).or_insert(0.0) += pattern.weight;
                            acc.evidence.push(RelationEvidence {
                                chapter: chapter.index,
                                channel: EvidenceChannel::Pattern,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Channel 3: kinship/honorific address terms in dialogue, weight 2.
    ///
    /// The speaker is the last named character in the quote's lead; the
    /// addressee is the previous distinct speaker in the same chapter, or
    /// failing that the other character named in the lead.
    fn accumulate_dialogue(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        pairs: &mut HashMap<(String, String), PairEvidence>,
    ) {
        let processor = TextProcessor::new(self.lexicons);
        let canonical_of = |surface: &str| -> Option<String> {
            entities
                .characters
                .iter()
                .find(|c| c.known_as(surface))
                .map(|c| c.name.clone())
        };

        for chapter in &text.chapters {
            let joined = chapter.sentences.join("\n");
            let mut last_speaker: Option<String> = None;
            for span in processor.dialogues(&joined) {
                let lead_names: Vec<String> = processor
                    .segment(&span.lead)
                    .into_iter()
                    .filter(|t| t.pos == Pos::PersonName)
                    .filter_map(|t| canonical_of(&t.text))
                    .collect();
                let speaker = lead_names.last().cloned().or_else(|| last_speaker.clone());
                let Some(speaker) = speaker else { continue };

                let addressee = lead_names
                    .iter()
                    .find(|n| **n != speaker)
                    .cloned()
                    .or_else(|| match &last_speaker {
                        Some(prev) if *prev != speaker => Some(prev.clone()),
                        _ => None,
                    });

                if let Some(addressee) = addressee {
                    for term in &self.lexicons.address_terms {
                        if span.text.starts_with(term.term.as_str()) {
                            let acc = pairs.entry(ordered_pair(&speaker, &addressee)).or_default();
                            acc.total += DIALOGUE_WEIGHT;
                            *acc.by_kind.entry(term.kind).or_insert(0.0) += DIALOGUE_WEIGHT;
                            acc.evidence.push(RelationEvidence {
                                chapter: chapter.index,
                                channel: EvidenceChannel::Dialogue,
                            });
                            break;
                        }
                    }
                }
                last_speaker = Some(speaker);
            }
        }
    }
}

/// Maximum-weight kind; ties break by the fixed priority order, and pairs
/// with no typed evidence stay `Unknown`.
fn winning_kind(by_kind: &HashMap<RelationKind, f64>) -> RelationKind {
    by_kind
        .iter()
        .max_by(|(ka, wa), (kb, wb)| {
            wa.partial_cmp(wb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| kb.priority().cmp(&ka.priority()))
        })
        .map(|(kind, _)| *kind)
        .unwrap_or(RelationKind::Unknown)
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EntityExtractor;
    use crate::model::{Chapter, Novel};

    fn run(texts: &[&str]) -> Vec<Relation> {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default().with_min_mentions(2);
        let chapters: Vec<Chapter> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chapter::new(i + 1, format!("第{}章", i + 1), *t))
            .collect();
        let novel = Novel::new("t", "t", chapters);
        let text = ProcessedText::from_novel(&novel, &lex).unwrap();
        let entities = EntityExtractor::new(&lex, &options).extract(&text).unwrap();
        RelationExtractor::new(&lex, &options).extract(&text, &entities)
    }

    fn find<'r>(relations: &'r [Relation], a: &str, b: &str) -> Option<&'r Relation> {
        relations
            .iter()
            .find(|r| r.pair_key() == super::ordered_pair(a, b))
    }

    #[test]
    fn kin_pattern_reaches_high_strength() {
        let relations = run(&[
            "林远的父亲是林海。林远入山。林海归来。",
            "林远拜见林海。",
        ]);
        let rel = find(&relations, "林远", "林海").expect("kin relation");
        assert_eq!(rel.kind, RelationKind::Kin);
        assert!(rel.strength >= 0.7, "strength {}", rel.strength);
    }

    #[test]
    fn friend_pattern_with_spaces() {
        let relations = run(&[
            "林远 与 苏青 是朋友。林远入山。苏青归来。",
            "林远再度入山。苏青大笑。",
        ]);
        let rel = find(&relations, "林远", "苏青").expect("friend relation");
        assert_eq!(rel.kind, RelationKind::Friend);
        assert!(rel.strength >= 0.5);
    }

    #[test]
    fn cooccurrence_alone_is_unknown() {
        let relations = run(&[
            "林远望向苏青。林远入山。苏青归来。",
            "林远与苏青同坐。",
        ]);
        let rel = find(&relations, "林远", "苏青").expect("co-occurrence relation");
        assert_eq!(rel.kind, RelationKind::Unknown);
        assert!(rel.strength > 0.0);
        assert!(rel
            .evidence
            .iter()
            .all(|e| e.channel == EvidenceChannel::CoOccurrence));
    }

    #[test]
    fn dialogue_address_implies_master_disciple() {
        let relations = run(&[
            "沈天到了。林远入山。\n沈天道：“进来。”\n林远道：“师父，弟子来了。”",
            "林远走了。沈天点头。",
        ]);
        let rel = find(&relations, "林远", "沈天").expect("dialogue relation");
        assert_eq!(rel.kind, RelationKind::MasterDisciple);
        assert!(rel
            .evidence
            .iter()
            .any(|e| e.channel == EvidenceChannel::Dialogue));
    }

    #[test]
    fn strength_is_monotone_in_evidence() {
        let one = run(&[
            "林远望向苏青。林远入山。苏青归来。苏青再来。林远再入山。",
        ]);
        let many = run(&[
            "林远望向苏青。林远看苏青。苏青望林远。林远入山。苏青归来。",
        ]);
        let a = find(&one, "林远", "苏青").unwrap().strength;
        let b = find(&many, "林远", "苏青").unwrap().strength;
        assert!(b >= a, "more evidence must not weaken: {a} -> {b}");
    }
}
