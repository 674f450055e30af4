//! Story graph loading.
//!
//! Turns the raw per-quest content records into a resolved [`StoryGraph`]:
//! - parses game metadata, the summary tree, and the character roster
//! - enumerates summary-part records and fetches each branch's dialog file
//! - links prev/next pointers by position within a branch
//! - assigns option targets positionally from the branch's next-index list
//! - validates node shape and cross-references before the graph is
//!   handed out
//!
//! Loading is two-phase: [`load`] builds the graph from text records,
//! [`load_media`] resolves the clip handles the graph refers to. Both are
//! invoked by the session's loading phase; failures there surface on the
//! error screen rather than propagating to the host.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::content::{ContentError, ContentRepository};
use crate::story::{
    BranchIndex, Character, DialogNode, DialogOption, GameMeta, LoadWarning, StoryGraph,
    SummaryBranch, SummaryNode,
};

/// Which pair of mutually exclusive shapes a dialog node mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeConflict {
    /// A mid-branch node also carries options.
    NextAndOptions,
    /// A mid-branch node also carries final words.
    NextAndFinalWords,
    /// A tail node carries both options and final words.
    OptionsAndFinalWords,
}

impl fmt::Display for NodeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NodeConflict::NextAndOptions => "both a next node and options",
            NodeConflict::NextAndFinalWords => "both a next node and final words",
            NodeConflict::OptionsAndFinalWords => "both options and final words",
        };
        f.write_str(text)
    }
}

/// Fatal problems while loading a quest.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    #[error("malformed record {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("duplicate branch index {branch}")]
    DuplicateBranch { branch: BranchIndex },

    #[error("branch {branch} has no dialog nodes")]
    EmptyBranch { branch: BranchIndex },

    #[error("branch {branch} tail has {options} options but {targets} next indices")]
    OptionArityMismatch {
        branch: BranchIndex,
        options: usize,
        targets: usize,
    },

    #[error("branch {branch} node {node} has {conflict}")]
    ConflictingNode {
        branch: BranchIndex,
        node: usize,
        conflict: NodeConflict,
    },

    #[error("branch {branch} option targets unknown branch {target}")]
    DanglingOptionTarget {
        branch: BranchIndex,
        target: BranchIndex,
    },

    #[error("missing media {key}")]
    MissingMedia { key: String },
}

// ============================================================================
// Raw records
// ============================================================================
//
// Mirrors of the on-disk YAML shapes. Everything beyond the fields named
// here is ignored; resolution into the graph types happens in `load`.

#[derive(Debug, Deserialize)]
struct MetaRecord {
    game_name: String,
    #[serde(default)]
    plot_summary: String,
}

#[derive(Debug, Deserialize)]
struct SummaryRecord {
    index: BranchIndex,
    #[serde(default)]
    next_structs: Vec<SummaryRecord>,
}

#[derive(Debug, Deserialize)]
struct RosterRecord {
    characters: Vec<CharacterRecord>,
}

#[derive(Debug, Deserialize)]
struct CharacterRecord {
    id: i32,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct BranchRecord {
    index: BranchIndex,
    #[serde(default)]
    next_structs_idx: Vec<BranchIndex>,
}

#[derive(Debug, Deserialize)]
struct DialogRecord {
    #[serde(default)]
    id: i32,
    #[serde(default)]
    character_id: i32,
    #[serde(default)]
    character_line: String,
    #[serde(default)]
    options: Vec<OptionRecord>,
    #[serde(default)]
    final_words_of_the_story: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OptionRecord {
    option_text: String,
}

fn quest_key(quest: &str, tail: &str) -> String {
    format!("quests/{quest}/{tail}")
}

fn parse<T: DeserializeOwned>(key: &str, text: &str) -> Result<T, LoadError> {
    serde_yaml::from_str(text).map_err(|source| LoadError::Malformed {
        key: key.to_string(),
        source,
    })
}

fn fetch<T: DeserializeOwned>(repo: &dyn ContentRepository, key: &str) -> Result<T, LoadError> {
    let text = repo.get_text(key)?;
    parse(key, &text)
}

fn build_summary(record: SummaryRecord) -> SummaryNode {
    SummaryNode {
        index: record.index,
        children: record.next_structs.into_iter().map(build_summary).collect(),
    }
}

/// Loads and resolves the story graph for `quest`.
///
/// Missing or malformed required records fail the load. Degradable
/// problems (no branches at all, a branch the summary tree cannot reach,
/// an unknown character id, a dead-end tail) are logged and collected on
/// the returned graph as [`LoadWarning`]s instead.
///
/// Clip handles are not resolved here; see [`load_media`].
pub fn load(repo: &dyn ContentRepository, quest: &str) -> Result<StoryGraph, LoadError> {
    let mut warnings = Vec::new();

    let meta: MetaRecord = fetch(repo, &quest_key(quest, "game_meta"))?;
    let summary: SummaryRecord = fetch(repo, &quest_key(quest, "story_summary"))?;
    let roster: RosterRecord = fetch(repo, &quest_key(quest, "characters_meta"))?;

    let mut characters: HashMap<i32, Character> = HashMap::new();
    for record in roster.characters {
        if characters.contains_key(&record.id) {
            warn!(character_id = record.id, "duplicate character id in roster");
            warnings.push(LoadWarning::DuplicateCharacter {
                character_id: record.id,
            });
            continue;
        }
        characters.insert(
            record.id,
            Character {
                id: record.id,
                name: record.name,
                description: record.description,
                video_clips: Vec::new(),
            },
        );
    }

    let summary = build_summary(summary);

    let parts_key = quest_key(quest, "summary_parts");
    let parts = repo.list(&parts_key)?;
    if parts.is_empty() {
        warn!(quest, "no summary parts found");
        warnings.push(LoadWarning::NoBranches);
    } else {
        debug!(quest, count = parts.len(), "found summary parts");
    }

    let mut branches: HashMap<BranchIndex, SummaryBranch> = HashMap::new();
    for part in parts {
        let part_key = format!("{parts_key}/{}", part.name);
        let record: BranchRecord = parse(&part_key, &part.text)?;
        if branches.contains_key(&record.index) {
            return Err(LoadError::DuplicateBranch {
                branch: record.index,
            });
        }

        let branch = link_branch(repo, quest, record, &characters, &mut warnings)?;
        if summary.find(branch.index).is_none() {
            warn!(branch = branch.index, "branch is not part of the summary tree");
            warnings.push(LoadWarning::UnattachedBranch {
                branch: branch.index,
            });
        }
        branches.insert(branch.index, branch);
    }

    // Cross-reference pass: play never checks these again.
    for branch in branches.values() {
        for node in &branch.nodes {
            for option in &node.options {
                if !branches.contains_key(&option.target) {
                    return Err(LoadError::DanglingOptionTarget {
                        branch: branch.index,
                        target: option.target,
                    });
                }
            }
        }
    }

    debug!(
        quest,
        branches = branches.len(),
        characters = characters.len(),
        "story graph loaded"
    );

    let meta = GameMeta {
        game_name: meta.game_name,
        plot_summary: meta.plot_summary,
        bg_video_clips: Vec::new(),
        bgm_clips: Vec::new(),
    };
    Ok(StoryGraph::new(meta, summary, characters, branches, warnings))
}

/// Fetches one branch's dialog sequence and links it.
fn link_branch(
    repo: &dyn ContentRepository,
    quest: &str,
    record: BranchRecord,
    characters: &HashMap<i32, Character>,
    warnings: &mut Vec<LoadWarning>,
) -> Result<SummaryBranch, LoadError> {
    let index = record.index;
    let dialog_key = quest_key(quest, &format!("dialogs/dialog_{index}"));
    let dialogs: Vec<DialogRecord> = fetch(repo, &dialog_key)?;
    if dialogs.is_empty() {
        return Err(LoadError::EmptyBranch { branch: index });
    }

    let count = dialogs.len();
    let mut nodes = Vec::with_capacity(count);
    for (position, dialog) in dialogs.into_iter().enumerate() {
        let character = if characters.contains_key(&dialog.character_id) {
            Some(dialog.character_id)
        } else {
            warn!(
                branch = index,
                node = position,
                character_id = dialog.character_id,
                "dialog names unknown character"
            );
            warnings.push(LoadWarning::UnknownCharacter {
                branch: index,
                node: position,
                character_id: dialog.character_id,
            });
            None
        };

        let is_tail = position + 1 == count;
        let has_options = !dialog.options.is_empty();
        let has_final_words = dialog.final_words_of_the_story.is_some();

        let conflict = if !is_tail && has_options {
            Some(NodeConflict::NextAndOptions)
        } else if !is_tail && has_final_words {
            Some(NodeConflict::NextAndFinalWords)
        } else if has_options && has_final_words {
            Some(NodeConflict::OptionsAndFinalWords)
        } else {
            None
        };
        if let Some(conflict) = conflict {
            return Err(LoadError::ConflictingNode {
                branch: index,
                node: position,
                conflict,
            });
        }

        let options = if is_tail && has_options {
            if dialog.options.len() != record.next_structs_idx.len() {
                return Err(LoadError::OptionArityMismatch {
                    branch: index,
                    options: dialog.options.len(),
                    targets: record.next_structs_idx.len(),
                });
            }
            dialog
                .options
                .into_iter()
                .zip(record.next_structs_idx.iter().copied())
                .map(|(option, target)| DialogOption {
                    text: option.option_text,
                    target,
                })
                .collect()
        } else {
            Vec::new()
        };

        if is_tail && !has_options && !has_final_words {
            warn!(branch = index, "branch ends without options or final words");
            warnings.push(LoadWarning::DeadEnd { branch: index });
        }

        nodes.push(DialogNode {
            id: dialog.id,
            character,
            line: dialog.character_line,
            options,
            final_words: dialog.final_words_of_the_story,
            prev: position.checked_sub(1),
            next: if is_tail { None } else { Some(position + 1) },
        });
    }

    Ok(SummaryBranch {
        index,
        next_indices: record.next_structs_idx,
        nodes,
    })
}

/// Resolves the clip handles a loaded graph refers to.
///
/// Every character needs its portrait clip, and the quest needs one
/// background clip and one music clip; any missing clip is
/// [`LoadError::MissingMedia`] because the loading screen and the menu
/// both play from these pools.
pub fn load_media(
    repo: &dyn ContentRepository,
    quest: &str,
    graph: &mut StoryGraph,
) -> Result<(), LoadError> {
    for id in graph.character_ids() {
        let key = quest_key(quest, &format!("video/char{id}/latest_u_d"));
        let clip = match repo.get_media(&key) {
            Some(clip) => clip,
            None => return Err(LoadError::MissingMedia { key }),
        };
        debug!(key, "resolved character clip");
        if let Some(character) = graph.character_mut(id) {
            character.video_clips.push(clip);
        }
    }

    let key = quest_key(quest, "video/style/latest_u_d");
    match repo.get_media(&key) {
        Some(clip) => graph.meta.bg_video_clips.push(clip),
        None => return Err(LoadError::MissingMedia { key }),
    }

    let key = quest_key(quest, "audio/bgm");
    match repo.get_media(&key) {
        Some(clip) => graph.meta.bgm_clips.push(clip),
        None => return Err(LoadError::MissingMedia { key }),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::LoadWarning;
    use crate::testing::{demo_repository, MemoryRepository};

    /// One branch, one character, a clean final-words ending.
    fn minimal_repository() -> MemoryRepository {
        MemoryRepository::new()
            .with_text("quests/q/game_meta", "game_name: Test Quest\nplot_summary: p\n")
            .with_text("quests/q/story_summary", "index: 0\n")
            .with_text(
                "quests/q/characters_meta",
                "characters:\n  - id: 1\n    name: Maren\n",
            )
            .with_text("quests/q/summary_parts/part_0", "index: 0\n")
            .with_text(
                "quests/q/dialogs/dialog_0",
                "- id: 0\n  character_id: 1\n  character_line: Hello.\n\
                 - id: 1\n  character_id: 1\n  character_line: Goodbye.\n  \
                 final_words_of_the_story: The end.\n",
            )
    }

    #[test]
    fn test_load_minimal_quest() {
        let repo = minimal_repository();
        let graph = load(&repo, "q").unwrap();

        assert_eq!(graph.meta.game_name, "Test Quest");
        assert_eq!(graph.branch_count(), 1);
        assert_eq!(graph.character_count(), 1);
        assert!(graph.warnings().is_empty());

        let branch = graph.branch(0).unwrap();
        assert_eq!(branch.nodes.len(), 2);
        assert_eq!(branch.nodes[0].next, Some(1));
        assert_eq!(branch.nodes[1].prev, Some(0));
        assert!(branch.nodes[1].is_tail());
        assert_eq!(branch.nodes[1].final_words.as_deref(), Some("The end."));
    }

    #[test]
    fn test_option_targets_resolve_positionally() {
        // Branch 0: three nodes, tail carries two options mapped onto
        // next indices [1, 2].
        let repo = demo_repository();
        let graph = load(&repo, "demo").unwrap();

        let branch = graph.branch(0).unwrap();
        assert_eq!(branch.nodes.len(), 3);
        assert_eq!(branch.next_indices, vec![1, 2]);

        let tail = branch.tail().unwrap();
        assert_eq!(tail.options.len(), 2);
        assert_eq!(tail.options[0].target, 1);
        assert_eq!(tail.options[1].target, 2);
    }

    #[test]
    fn test_load_is_idempotent() {
        let repo = demo_repository();
        let first = load(&repo, "demo").unwrap();
        let second = load(&repo, "demo").unwrap();

        assert_eq!(first.branch_indices(), second.branch_indices());
        assert_eq!(first.character_ids(), second.character_ids());
        for index in first.branch_indices() {
            let a = first.branch(index).unwrap();
            let b = second.branch(index).unwrap();
            assert_eq!(a.nodes.len(), b.nodes.len());
            for (left, right) in a.nodes.iter().zip(&b.nodes) {
                assert_eq!(left.options, right.options);
            }
        }
    }

    #[test]
    fn test_node_shape_is_exclusive() {
        let repo = demo_repository();
        let graph = load(&repo, "demo").unwrap();

        for index in graph.branch_indices() {
            for node in &graph.branch(index).unwrap().nodes {
                let shapes = [
                    node.next.is_some(),
                    node.has_options(),
                    node.final_words.is_some(),
                ];
                let held = shapes.iter().filter(|present| **present).count();
                assert!(held <= 1, "branch {index} node {} mixes shapes", node.id);
            }
        }
    }

    #[test]
    fn test_missing_meta_fails() {
        let repo = MemoryRepository::new();
        let err = load(&repo, "q").unwrap_err();
        assert!(matches!(err, LoadError::Content(ContentError::NotFound(_))));
    }

    #[test]
    fn test_malformed_meta_fails() {
        let repo = minimal_repository().with_text("quests/q/game_meta", "game_name: [unclosed\n");
        let err = load(&repo, "q").unwrap_err();
        match err {
            LoadError::Malformed { key, .. } => assert_eq!(key, "quests/q/game_meta"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_branches_is_soft() {
        let repo = MemoryRepository::new()
            .with_text("quests/q/game_meta", "game_name: T\n")
            .with_text("quests/q/story_summary", "index: 0\n")
            .with_text("quests/q/characters_meta", "characters: []\n");

        let graph = load(&repo, "q").unwrap();
        assert_eq!(graph.branch_count(), 0);
        assert_eq!(graph.warnings(), &[LoadWarning::NoBranches]);
    }

    #[test]
    fn test_duplicate_branch_index_fails() {
        let repo = minimal_repository().with_text("quests/q/summary_parts/part_0_copy", "index: 0\n");
        let err = load(&repo, "q").unwrap_err();
        assert!(matches!(err, LoadError::DuplicateBranch { branch: 0 }));
    }

    #[test]
    fn test_empty_branch_fails() {
        let repo = minimal_repository().with_text("quests/q/dialogs/dialog_0", "[]\n");
        let err = load(&repo, "q").unwrap_err();
        assert!(matches!(err, LoadError::EmptyBranch { branch: 0 }));
    }

    #[test]
    fn test_option_arity_mismatch_fails() {
        let repo = minimal_repository()
            .with_text("quests/q/summary_parts/part_0", "index: 0\nnext_structs_idx: [1]\n")
            .with_text(
                "quests/q/dialogs/dialog_0",
                "- id: 0\n  character_id: 1\n  character_line: Pick.\n  options:\n    \
                 - option_text: Left\n    - option_text: Right\n",
            );

        let err = load(&repo, "q").unwrap_err();
        assert!(matches!(
            err,
            LoadError::OptionArityMismatch {
                branch: 0,
                options: 2,
                targets: 1,
            }
        ));
    }

    #[test]
    fn test_dangling_option_target_fails() {
        let repo = minimal_repository()
            .with_text("quests/q/summary_parts/part_0", "index: 0\nnext_structs_idx: [7]\n")
            .with_text(
                "quests/q/dialogs/dialog_0",
                "- id: 0\n  character_id: 1\n  character_line: Pick.\n  options:\n    \
                 - option_text: Onward\n",
            );

        let err = load(&repo, "q").unwrap_err();
        assert!(matches!(
            err,
            LoadError::DanglingOptionTarget {
                branch: 0,
                target: 7,
            }
        ));
    }

    #[test]
    fn test_mid_branch_options_fail() {
        let repo = minimal_repository().with_text(
            "quests/q/dialogs/dialog_0",
            "- id: 0\n  character_id: 1\n  character_line: Pick.\n  options:\n    \
             - option_text: Early\n\
             - id: 1\n  character_id: 1\n  character_line: Too late.\n  \
             final_words_of_the_story: The end.\n",
        );

        let err = load(&repo, "q").unwrap_err();
        assert!(matches!(
            err,
            LoadError::ConflictingNode {
                branch: 0,
                node: 0,
                conflict: NodeConflict::NextAndOptions,
            }
        ));
    }

    #[test]
    fn test_tail_options_and_final_words_fail() {
        let repo = minimal_repository()
            .with_text("quests/q/summary_parts/part_0", "index: 0\nnext_structs_idx: [0]\n")
            .with_text(
                "quests/q/dialogs/dialog_0",
                "- id: 0\n  character_id: 1\n  character_line: Pick.\n  options:\n    \
                 - option_text: Loop\n  final_words_of_the_story: The end.\n",
            );

        let err = load(&repo, "q").unwrap_err();
        assert!(matches!(
            err,
            LoadError::ConflictingNode {
                conflict: NodeConflict::OptionsAndFinalWords,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_character_degrades() {
        let repo = minimal_repository().with_text(
            "quests/q/dialogs/dialog_0",
            "- id: 0\n  character_id: 9\n  character_line: Who am I?\n  \
             final_words_of_the_story: The end.\n",
        );

        let graph = load(&repo, "q").unwrap();
        let node = graph.node(0, 0).unwrap();
        assert_eq!(node.character, None);
        assert_eq!(
            graph.warnings(),
            &[LoadWarning::UnknownCharacter {
                branch: 0,
                node: 0,
                character_id: 9,
            }]
        );
    }

    #[test]
    fn test_unattached_branch_warns() {
        let repo = minimal_repository()
            .with_text("quests/q/summary_parts/part_5", "index: 5\n")
            .with_text(
                "quests/q/dialogs/dialog_5",
                "- id: 0\n  character_id: 1\n  character_line: Lost.\n  \
                 final_words_of_the_story: Fin.\n",
            );

        let graph = load(&repo, "q").unwrap();
        assert_eq!(graph.branch_count(), 2);
        assert!(graph
            .warnings()
            .contains(&LoadWarning::UnattachedBranch { branch: 5 }));
    }

    #[test]
    fn test_dead_end_tail_warns() {
        let repo = minimal_repository().with_text(
            "quests/q/dialogs/dialog_0",
            "- id: 0\n  character_id: 1\n  character_line: And then nothing.\n",
        );

        let graph = load(&repo, "q").unwrap();
        assert_eq!(graph.warnings(), &[LoadWarning::DeadEnd { branch: 0 }]);
    }

    #[test]
    fn test_duplicate_character_keeps_first() {
        let repo = minimal_repository().with_text(
            "quests/q/characters_meta",
            "characters:\n  - id: 1\n    name: Maren\n  - id: 1\n    name: Impostor\n",
        );

        let graph = load(&repo, "q").unwrap();
        assert_eq!(graph.character(1).map(|c| c.name.as_str()), Some("Maren"));
        assert_eq!(
            graph.warnings(),
            &[LoadWarning::DuplicateCharacter { character_id: 1 }]
        );
    }

    #[test]
    fn test_load_media_fills_clips() {
        let repo = demo_repository();
        let mut graph = load(&repo, "demo").unwrap();
        load_media(&repo, "demo", &mut graph).unwrap();

        for id in graph.character_ids() {
            let character = graph.character(id).unwrap();
            assert_eq!(character.video_clips.len(), 1, "character {id}");
            assert_eq!(
                character.video_clips[0].key,
                format!("quests/demo/video/char{id}/latest_u_d")
            );
        }
        assert_eq!(graph.meta.bg_video_clips.len(), 1);
        assert_eq!(graph.meta.bgm_clips.len(), 1);
    }

    #[test]
    fn test_load_media_missing_character_clip_fails() {
        let repo = minimal_repository()
            .with_media("quests/q/video/style/latest_u_d")
            .with_media("quests/q/audio/bgm");

        let mut graph = load(&repo, "q").unwrap();
        let err = load_media(&repo, "q", &mut graph).unwrap_err();
        match err {
            LoadError::MissingMedia { key } => {
                assert_eq!(key, "quests/q/video/char1/latest_u_d");
            }
            other => panic!("expected MissingMedia, got {other:?}"),
        }
    }

    #[test]
    fn test_load_media_missing_bgm_fails() {
        let repo = minimal_repository()
            .with_media("quests/q/video/char1/latest_u_d")
            .with_media("quests/q/video/style/latest_u_d");

        let mut graph = load(&repo, "q").unwrap();
        let err = load_media(&repo, "q", &mut graph).unwrap_err();
        assert!(matches!(err, LoadError::MissingMedia { key } if key == "quests/q/audio/bgm"));
    }
}
