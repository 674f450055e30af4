//! End-to-end playthroughs of the demo quest.
//!
//! These tests drive the whole stack at once:
//! - The session state machine walked from the menu to an ending and back
//! - Scripted headless runs and the transcripts they produce
//! - The bundled on-disk demo content, loaded through the filesystem
//!   repository

use std::path::PathBuf;

use questline_core::headless::{HeadlessConfig, HeadlessRunner, TranscriptEntry};
use questline_core::loader;
use questline_core::testing::{demo_repository, QuestHarness};
use questline_core::{FsContentRepository, QuestState};

fn demo_content_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../content")
}

// =============================================================================
// FULL SESSION LOOP
// =============================================================================

#[test]
fn test_menu_to_ending_and_back() {
    let mut harness = QuestHarness::demo_with_ticks(3);
    harness.session.start();
    harness.assert_state(QuestState::GameMenu);
    assert_eq!(harness.video.play_count(), 1);

    harness.session.advance_dialog();
    harness.session.advance_dialog();
    harness.session.advance_dialog();
    harness.assert_state(QuestState::DialogOptions);
    harness.assert_option_count(2);

    harness.session.select_option(1);
    harness.assert_state(QuestState::Dialog);
    harness.session.advance_dialog();
    harness.assert_state(QuestState::FinalWords);

    harness.tick(3);
    harness.assert_state(QuestState::GameMenu);
    assert_eq!(harness.video.play_count(), 2);
    assert_eq!(harness.audio.play_count(), 2);

    // The menu reset the cursor, so a second run starts from the top.
    harness.session.advance_dialog();
    harness.assert_state(QuestState::Dialog);
    harness.assert_cursor(0, 1);
}

#[test]
fn test_displayed_lines_follow_the_story() {
    let mut harness = QuestHarness::demo();
    harness.session.start();
    harness.settle();

    let expected: Vec<String> = {
        let graph = harness.session.graph().expect("demo graph loads");
        (0..3usize)
            .map(|position| graph.node(0, position).expect("branch 0 node").line.clone())
            .collect()
    };

    for line in &expected {
        harness.session.advance_dialog();
        harness.settle();
        assert_eq!(harness.session.stage().dialog.surface().text(), line);
    }
    harness.assert_state(QuestState::DialogOptions);
}

// =============================================================================
// HEADLESS TRANSCRIPTS
// =============================================================================

fn scripted_transcript(choices: Vec<usize>) -> Vec<TranscriptEntry> {
    let mut runner = HeadlessRunner::with_repository(
        HeadlessConfig::new("demo").with_choices(choices),
        Box::new(demo_repository()),
    );
    runner.run().to_vec()
}

#[test]
fn test_scripted_endings_differ() {
    let ending = |transcript: &[TranscriptEntry]| match transcript.last() {
        Some(TranscriptEntry::FinalWords { text }) => text.clone(),
        other => panic!("expected final words, got {other:?}"),
    };

    let first = scripted_transcript(vec![0]);
    let second = scripted_transcript(vec![1]);

    assert_ne!(ending(&first), ending(&second));
}

#[test]
fn test_transcript_renders_for_printing() {
    let rendered: Vec<String> = scripted_transcript(vec![0])
        .iter()
        .map(|entry| entry.to_string())
        .collect();
    let text = rendered.join("\n");

    assert!(text.contains("=== The Cartographer's Debt ==="));
    assert!(text.contains("  1) Pay for the soundings"));
    assert!(text.contains("> Pay for the soundings"));
    assert!(text.contains("--- The harbor returned to the map"));
}

// =============================================================================
// BUNDLED DEMO CONTENT
// =============================================================================

#[test]
fn test_bundled_demo_loads_clean() {
    let repo = FsContentRepository::new(demo_content_root());

    let mut graph = loader::load(&repo, "demo").expect("demo content loads");
    loader::load_media(&repo, "demo", &mut graph).expect("demo media resolves");

    assert!(
        graph.warnings().is_empty(),
        "unexpected warnings: {:?}",
        graph.warnings()
    );
    assert_eq!(graph.branch_count(), 3);
    assert_eq!(graph.character_count(), 2);
}

#[test]
fn test_bundled_demo_plays_headless() {
    let mut runner =
        HeadlessRunner::new(HeadlessConfig::new("demo").with_content_root(demo_content_root()));
    let transcript = runner.run();

    assert!(matches!(
        transcript.first(),
        Some(TranscriptEntry::Menu { title }) if title == "The Cartographer's Debt"
    ));
    assert!(matches!(
        transcript.last(),
        Some(TranscriptEntry::FinalWords { .. })
    ));
}
