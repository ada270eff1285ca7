//! End-to-end pipeline scenarios over a synthetic five-chapter novel.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use wenmai::analysis::{EntityExtractor, ProcessedText};
use wenmai::model::{
    Chapter, Classification, EventKind, Novel, PeakKind, RelationKind, StateAxis,
};
use wenmai::{
    project_bundle, AnalysisBundle, AnalysisError, AnalysisOptions, CancelSignal, GraphStore,
    Lexicons, NodeLabel, OpenStore, Orchestrator, SqliteStore,
};

/// Five chapters with planted patterns:
/// - 林远 appears in every chapter; 苏青 only in chapters 1 and 5
/// - chapter 1 plants a kinship and a friendship pattern
/// - chapter 3 plants a cued conflict, chapter 4 its consequence
/// - chapter 2 is positive, chapter 4 strongly negative
/// - 司马青 / 马青 is an alias pair
fn fixture() -> Novel {
    Novel::new(
        "novel-e2e",
        "测试长卷",
        vec![
            Chapter::new(
                1,
                "初识",
                "林远的父亲是林海。林远入山。林远与苏青是朋友。苏青到了。",
            ),
            Chapter::new(
                2,
                "同行",
                "林远大喜。林远与林海同行，欢喜不已。司马青，也就是马青，到了。",
            ),
            Chapter::new(
                3,
                "激战",
                "林远拔剑。突然，林远与林海大战。司马青便是马青。",
            ),
            Chapter::new(4, "重创", "于是林远受伤。林远伤心大哭。"),
            Chapter::new(5, "归去", "林远归来。苏青点头。苏青走了。司马青走了。马青已去。"),
        ],
    )
}

async fn analyze_fixture() -> AnalysisBundle {
    Orchestrator::with_defaults()
        .analyze(&fixture(), None, &CancelSignal::new())
        .await
        .expect("pipeline succeeds")
}

#[tokio::test]
async fn planted_patterns_become_typed_relations() {
    let bundle = analyze_fixture().await;

    let kin = bundle
        .relations
        .iter()
        .find(|r| r.pair_key() == ("林海".to_string(), "林远".to_string()))
        .expect("kin relation");
    assert_eq!(kin.kind, RelationKind::Kin);
    assert!(kin.strength >= 0.7, "kin strength {}", kin.strength);

    let friend = bundle
        .relations
        .iter()
        .find(|r| r.pair_key() == ("林远".to_string(), "苏青".to_string()))
        .expect("friend relation");
    assert_eq!(friend.kind, RelationKind::Friend);
    assert!(friend.strength >= 0.5, "friend strength {}", friend.strength);
}

#[tokio::test]
async fn cued_conflict_becomes_important_event() {
    let bundle = analyze_fixture().await;
    let battle = bundle
        .events
        .iter()
        .find(|e| e.chapter == 3 && e.kind == EventKind::Conflict)
        .expect("chapter 3 conflict");
    assert!(battle.participants.contains(&"林远".to_string()));
    assert!(battle.participants.contains(&"林海".to_string()));
    assert!(battle.importance >= 0.6, "importance {}", battle.importance);
}

#[tokio::test]
async fn consequence_links_conflict_to_injury_and_state() {
    let bundle = analyze_fixture().await;
    let battle = bundle
        .events
        .iter()
        .find(|e| e.chapter == 3 && e.kind == EventKind::Conflict)
        .expect("chapter 3 conflict");
    let injury = bundle
        .events
        .iter()
        .find(|e| e.chapter == 4 && e.description.contains("受伤"))
        .expect("chapter 4 injury");

    let link = bundle
        .causal_links
        .iter()
        .find(|l| l.cause == battle.id && l.effect == injury.id)
        .expect("causal link from conflict to injury");
    assert!(link.strength >= 0.4, "link strength {}", link.strength);

    let transition = bundle
        .state_transitions
        .iter()
        .find(|t| t.character == "林远" && t.axis == StateAxis::Health)
        .expect("health transition");
    assert!(transition.delta < 0.0);
    assert_eq!(transition.cause_event.as_ref(), Some(&battle.id));
}

#[tokio::test]
async fn presence_drives_classification() {
    let bundle = analyze_fixture().await;
    let lin = bundle
        .characters
        .iter()
        .find(|c| c.name == "林远")
        .expect("林远");
    let su = bundle
        .characters
        .iter()
        .find(|c| c.name == "苏青")
        .expect("苏青");
    assert_eq!(lin.classification, Classification::Main);
    assert_eq!(su.classification, Classification::Supporting);
    assert_eq!(su.first_appearance, 1);
}

#[tokio::test]
async fn emotional_curve_has_trough_at_chapter_four() {
    let bundle = analyze_fixture().await;
    let ch2 = bundle
        .chapter_emotions
        .iter()
        .find(|e| e.chapter == 2)
        .expect("chapter 2 emotion");
    let ch4 = bundle
        .chapter_emotions
        .iter()
        .find(|e| e.chapter == 4)
        .expect("chapter 4 emotion");
    assert!(ch2.sentiment > 0.0);
    assert!(ch4.sentiment < 0.0);

    let trough = bundle
        .emotional_peaks
        .iter()
        .find(|p| p.kind == PeakKind::Low)
        .expect("low peak");
    assert_eq!(trough.chapter, 4);
}

#[tokio::test]
async fn alias_pair_merges_to_longest_form() {
    let bundle = analyze_fixture().await;
    let merged = bundle
        .characters
        .iter()
        .find(|c| c.name == "司马青")
        .expect("司马青");
    assert!(merged.aliases.contains("马青"));
    assert!(!bundle.characters.iter().any(|c| c.name == "马青"));
}

#[tokio::test]
async fn universal_invariants_hold() {
    let bundle = analyze_fixture().await;

    assert!(bundle.statistics.main_plot_events <= bundle.statistics.events);
    let event_ids: Vec<_> = bundle.events.iter().map(|e| &e.id).collect();
    assert!(bundle
        .main_plot_events
        .iter()
        .all(|id| event_ids.contains(&id)));

    let min_mentions = Orchestrator::with_defaults().options().min_mentions;
    for character in &bundle.characters {
        assert!((0.0..=1.0).contains(&character.importance));
        assert!((0.0..=1.0).contains(&character.degree_centrality));
        assert!(character.mention_count >= min_mentions);
        assert!(character.aliases.contains(&character.name));
    }

    let position_of = |id: &wenmai::model::EventId| {
        bundle
            .events
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.position())
            .expect("linked event exists")
    };
    for link in &bundle.causal_links {
        assert!(
            position_of(&link.cause) < position_of(&link.effect),
            "causal link must respect temporal order"
        );
        assert!((0.0..=1.0).contains(&link.strength));
    }

    for emotion in &bundle.chapter_emotions {
        let sum: f64 = emotion.distribution.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((-1.0..=1.0).contains(&emotion.sentiment));
    }

    for state in &bundle.states {
        assert!((0.0..=1.0).contains(&state.value));
    }

    for event in &bundle.events {
        assert!((0.0..=1.0).contains(&event.importance));
        assert!((0.0..=1.0).contains(&event.contribution));
        for participant in &event.participants {
            assert!(
                bundle.characters.iter().any(|c| &c.name == participant),
                "participant {participant} must exist as a character"
            );
        }
    }
}

#[tokio::test]
async fn rerun_produces_equal_normalized_bundles() {
    let first = analyze_fixture().await;
    let second = analyze_fixture().await;
    assert!(first.normalized_eq(&second));
    assert_eq!(first.statistics, second.statistics);

    // Byte-level check over the projections, which carry no run metadata.
    let a = serde_json::to_string(&project_bundle(&first)).expect("serialize");
    let b = serde_json::to_string(&project_bundle(&second)).expect("serialize");
    assert_eq!(a, b);
}

#[tokio::test]
async fn store_roundtrip_preserves_projection() {
    let store = SqliteStore::open_in_memory().expect("store");
    let bundle = Orchestrator::with_defaults()
        .analyze_and_store(&fixture(), &store, None, &CancelSignal::new())
        .await
        .expect("pipeline succeeds");
    assert!(bundle.persisted);

    let projected = project_bundle(&bundle);
    let loaded = store.load_graph("novel-e2e").expect("load graph");
    assert_eq!(loaded, projected);

    // Re-running keeps exactly one Novel node under the id.
    Orchestrator::with_defaults()
        .analyze_and_store(&fixture(), &store, None, &CancelSignal::new())
        .await
        .expect("second run succeeds");
    let reloaded = store.load_graph("novel-e2e").expect("reload graph");
    assert_eq!(reloaded.nodes_with_label(NodeLabel::Novel).len(), 1);
    assert_eq!(store.list_novels().expect("list"), vec!["novel-e2e".to_string()]);
}

#[tokio::test]
async fn cancellation_leaves_store_untouched() {
    let store = SqliteStore::open_in_memory().expect("store");
    Orchestrator::with_defaults()
        .analyze_and_store(&fixture(), &store, None, &CancelSignal::new())
        .await
        .expect("first run succeeds");
    let before = store.load_graph("novel-e2e").expect("baseline");

    let cancel = CancelSignal::new();
    cancel.set();
    let result = Orchestrator::with_defaults()
        .analyze_and_store(&fixture(), &store, None, &cancel)
        .await;
    assert!(matches!(result, Err(AnalysisError::Cancelled)));

    let after = store.load_graph("novel-e2e").expect("unchanged graph");
    assert_eq!(before, after);
}

#[tokio::test]
async fn one_chapter_two_characters_yields_a_relation() {
    let novel = Novel::new(
        "novel-tiny",
        "短篇",
        vec![Chapter::new(
            1,
            "一",
            "林远与苏青同行。林远入山。苏青走了。",
        )],
    );
    let orchestrator = Orchestrator::new(
        Lexicons::builtin(),
        AnalysisOptions::default().with_min_mentions(2),
    );
    let bundle = orchestrator
        .analyze(&novel, None, &CancelSignal::new())
        .await
        .expect("pipeline succeeds");
    assert_eq!(bundle.statistics.characters, 2);
    assert!(bundle.statistics.relations >= 1);
}

#[tokio::test]
async fn below_min_mentions_is_reported_as_empty_bundle() {
    let novel = Novel::new(
        "novel-sparse",
        "短篇",
        vec![Chapter::new(1, "一", "林远入山。苏青走了。")],
    );
    let bundle = Orchestrator::with_defaults()
        .analyze(&novel, None, &CancelSignal::new())
        .await
        .expect("degenerate input is a successful termination");
    assert!(bundle.is_empty());
    assert_eq!(bundle.statistics.chapters, 1);
}

#[test]
fn alias_classes_are_stable_under_chapter_permutation() {
    let lexicons = Lexicons::builtin();
    let options = AnalysisOptions::default();
    let novel = fixture();
    let baseline_text = ProcessedText::from_novel(&novel, &lexicons).expect("text");
    let baseline = EntityExtractor::new(&lexicons, &options)
        .extract(&baseline_text)
        .expect("entities");
    let baseline_aliases: Vec<_> = baseline
        .characters
        .iter()
        .map(|c| (c.name.clone(), c.aliases.clone()))
        .collect();

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for _ in 0..5 {
        let mut shuffled = baseline_text.clone();
        shuffled.chapters.shuffle(&mut rng);
        let entities = EntityExtractor::new(&lexicons, &options)
            .extract(&shuffled)
            .expect("entities");
        let aliases: Vec<_> = entities
            .characters
            .iter()
            .map(|c| (c.name.clone(), c.aliases.clone()))
            .collect();
        assert_eq!(aliases, baseline_aliases);
    }
}
