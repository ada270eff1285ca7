//! Bundle → property-graph projection

use super::{GraphEdge, GraphNode, NodeLabel, PropertyGraph, PropertyValue};
use crate::model::AnalysisBundle;
use std::collections::BTreeMap;

fn novel_id(bundle: &AnalysisBundle) -> String {
    format!("novel:{}", bundle.novel_id)
}

fn chapter_id(index: usize) -> String {
    format!("chapter:{index}")
}

fn character_id(name: &str) -> String {
    format!("character:{name}")
}

fn location_id(name: &str) -> String {
    format!("location:{name}")
}

fn emotion_id(chapter: usize) -> String {
    format!("emotion:{chapter}")
}

/// Project an analysis bundle into its property graph. The projection is
/// deterministic: node ids derive from bundle keys and the output is
/// normalized, so equal bundles project to equal graphs.
pub fn project_bundle(bundle: &AnalysisBundle) -> PropertyGraph {
    let mut graph = PropertyGraph::new();
    let novel = novel_id(bundle);

    let mut novel_node = GraphNode::new(&novel, NodeLabel::Novel)
        .with_property("title", bundle.novel_title.as_str());
    if let Some(author) = &bundle.author {
        novel_node = novel_node.with_property("author", author.as_str());
    }
    graph.nodes.push(novel_node);

    for (index, title, word_count) in &bundle.chapter_words {
        graph.nodes.push(
            GraphNode::new(chapter_id(*index), NodeLabel::Chapter)
                .with_property("index", *index)
                .with_property("title", title.as_str())
                .with_property("word_count", *word_count),
        );
        graph
            .edges
            .push(GraphEdge::new(&novel, chapter_id(*index), "HAS_CHAPTER"));
    }

    for character in &bundle.characters {
        let aliases: Vec<PropertyValue> = character
            .aliases
            .iter()
            .map(|a| PropertyValue::from(a.as_str()))
            .collect();
        graph.nodes.push(
            GraphNode::new(character_id(&character.name), NodeLabel::Character)
                .with_property("name", character.name.as_str())
                .with_property("aliases", PropertyValue::Array(aliases))
                .with_property("importance", character.importance)
                .with_property("degree_centrality", character.degree_centrality)
                .with_property("mention_count", character.mention_count)
                .with_property("first_appearance", character.first_appearance)
                .with_property(
                    "classification",
                    match character.classification {
                        crate::model::Classification::Main => "main",
                        crate::model::Classification::Supporting => "supporting",
                    },
                ),
        );
    }
    for (name, chapter) in &bundle.appearances {
        graph.edges.push(GraphEdge::new(
            character_id(name),
            chapter_id(*chapter),
            "APPEARS_IN",
        ));
    }

    for relation in &bundle.relations {
        graph.edges.push(
            GraphEdge::new(
                character_id(&relation.source),
                character_id(&relation.target),
                "KNOWS",
            )
            .with_property("type", relation.kind.as_str())
            .with_property("strength", relation.strength),
        );
    }

    for event in &bundle.events {
        let mut node = GraphNode::new(event.id.as_str(), NodeLabel::Event)
            .with_property("description", event.description.as_str())
            .with_property("chapter", event.chapter)
            .with_property("sequence", event.sequence)
            .with_property("event_type", event.kind.as_str())
            .with_property("importance_score", event.importance)
            .with_property("contribution_score", event.contribution);
        if bundle.main_plot_events.contains(&event.id) {
            node = node.with_property("main_plot", true);
        }
        graph.nodes.push(node);

        for participant in &event.participants {
            graph.edges.push(GraphEdge::new(
                character_id(participant),
                event.id.as_str(),
                "PARTICIPATES_IN",
            ));
        }
        if let Some(location) = &event.location {
            graph.edges.push(GraphEdge::new(
                event.id.as_str(),
                location_id(location),
                "HAPPENS_AT",
            ));
        }
        if let Some(parent) = &event.parent {
            graph.edges.push(GraphEdge::new(
                event.id.as_str(),
                parent.as_str(),
                "SUB_EVENT_OF",
            ));
        }
    }
    for pair in bundle.events.windows(2) {
        graph.edges.push(GraphEdge::new(
            pair[0].id.as_str(),
            pair[1].id.as_str(),
            "NEXT",
        ));
    }
    for link in &bundle.causal_links {
        graph.edges.push(
            GraphEdge::new(link.cause.as_str(), link.effect.as_str(), "CAUSES")
                .with_property("strength", link.strength),
        );
    }

    for location in &bundle.locations {
        graph.nodes.push(
            GraphNode::new(location_id(&location.name), NodeLabel::Location)
                .with_property("name", location.name.as_str())
                .with_property("type", location.kind.as_str())
                .with_property("importance", location.importance)
                .with_property("event_count", location.event_count),
        );
    }

    // VISITS aggregates per (character, location) across chapters.
    let mut visit_totals: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for visit in &bundle.visits {
        *visit_totals
            .entry((visit.character.as_str(), visit.location.as_str()))
            .or_insert(0) += visit.visit_count;
    }
    for ((character, location), count) in visit_totals {
        graph.edges.push(
            GraphEdge::new(character_id(character), location_id(location), "VISITS")
                .with_property("visit_count", count),
        );
    }

    for emotion in &bundle.chapter_emotions {
        let distribution: Vec<PropertyValue> = emotion
            .distribution
            .iter()
            .map(|&v| PropertyValue::Float(v))
            .collect();
        graph.nodes.push(
            GraphNode::new(emotion_id(emotion.chapter), NodeLabel::Emotion)
                .with_property("chapter", emotion.chapter)
                .with_property("sentiment", emotion.sentiment)
                .with_property("distribution", PropertyValue::Array(distribution)),
        );
    }
    for emotion in &bundle.character_emotions {
        graph.edges.push(
            GraphEdge::new(
                character_id(&emotion.source),
                character_id(&emotion.target),
                "EMOTION_TOWARDS",
            )
            .with_property("type", emotion.kind.as_str())
            .with_property("intensity", emotion.intensity)
            .with_property("chapter", emotion.chapter),
        );
    }

    for state in &bundle.states {
        graph.nodes.push(
            GraphNode::new(
                format!(
                    "state:{}:{}:{}",
                    state.character,
                    state.chapter,
                    state.axis.as_str()
                ),
                NodeLabel::State,
            )
            .with_property("character", state.character.as_str())
            .with_property("chapter", state.chapter)
            .with_property("axis", state.axis.as_str())
            .with_property("value", state.value),
        );
    }

    graph.normalize();
    graph
}
