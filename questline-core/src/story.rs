//! Story graph data model.
//!
//! A [`StoryGraph`] is built once by [`crate::loader::load`] during the
//! loading phase and then read, never mutated, for the rest of the
//! session. Every cross-reference is a stable key: branches are keyed
//! by index, characters by id, and a dialog node's neighbours by their
//! position inside the branch. The graph owns all entities; nodes only
//! hold keys, so there are no ownership cycles to manage.

use std::collections::HashMap;
use std::fmt;

use crate::content::ClipHandle;

/// Key of a [`SummaryBranch`] within the graph.
pub type BranchIndex = i32;

/// Quest-level metadata.
///
/// The clip lists start empty and are filled by
/// [`crate::loader::load_media`].
#[derive(Debug, Clone, Default)]
pub struct GameMeta {
    pub game_name: String,
    pub plot_summary: String,

    /// Background video clips, in preference order.
    pub bg_video_clips: Vec<ClipHandle>,

    /// Background music clips, in preference order.
    pub bgm_clips: Vec<ClipHandle>,
}

/// A cast member. Immutable after load.
#[derive(Debug, Clone)]
pub struct Character {
    pub id: i32,
    pub name: String,
    pub description: String,

    /// Resolved clips for this character, in load order.
    pub video_clips: Vec<ClipHandle>,
}

/// One selectable choice on a branch tail node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogOption {
    pub text: String,

    /// Branch this option jumps to. Assigned positionally from the
    /// owning branch's next-index list; validated against the loaded
    /// branch set before the graph is handed out.
    pub target: BranchIndex,
}

/// One line of dialog within a branch.
#[derive(Debug, Clone)]
pub struct DialogNode {
    pub id: i32,

    /// Speaking character, by roster id. `None` when the id did not
    /// resolve; display degrades instead of failing.
    pub character: Option<i32>,

    pub line: String,

    /// Choices offered by this node. Only ever non-empty on a branch
    /// tail.
    pub options: Vec<DialogOption>,

    /// Closing text for the whole story. Only ever set on a branch
    /// tail, and never together with options.
    pub final_words: Option<String>,

    /// Position of the previous node within the branch.
    pub prev: Option<usize>,

    /// Position of the next node within the branch.
    pub next: Option<usize>,
}

impl DialogNode {
    pub fn is_tail(&self) -> bool {
        self.next.is_none()
    }

    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }
}

/// A story branch: an ordered dialog sequence plus its outgoing
/// transitions. Called a "summary part" in the content files.
#[derive(Debug, Clone)]
pub struct SummaryBranch {
    pub index: BranchIndex,

    /// Branch indices the tail options jump to, positionally parallel
    /// to the tail node's options.
    pub next_indices: Vec<BranchIndex>,

    /// The branch's dialog sequence, root first.
    pub nodes: Vec<DialogNode>,
}

impl SummaryBranch {
    /// The branch's tail node. Branches are never empty after a
    /// successful load.
    pub fn tail(&self) -> Option<&DialogNode> {
        self.nodes.last()
    }
}

/// A node of the summary tree.
///
/// The tree mirrors the story's structural outline. It is used to
/// decide which branches are part of the outline and which branch the
/// session enters from (the root's); play itself navigates by branch
/// index.
#[derive(Debug, Clone)]
pub struct SummaryNode {
    pub index: BranchIndex,
    pub children: Vec<SummaryNode>,
}

impl SummaryNode {
    /// Depth-first search for the node carrying `index`.
    pub fn find(&self, index: BranchIndex) -> Option<&SummaryNode> {
        if self.index == index {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(index))
    }
}

/// A non-fatal problem found while loading.
///
/// Warnings are logged as they are found and kept on the graph so
/// callers and tests can inspect what degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// No summary-part records were found; the graph has no branches.
    NoBranches,

    /// A branch's index does not appear in the summary tree, so the
    /// outline cannot reach it.
    UnattachedBranch { branch: BranchIndex },

    /// A dialog node names a character id missing from the roster.
    UnknownCharacter {
        branch: BranchIndex,
        node: usize,
        character_id: i32,
    },

    /// A branch tail has neither options nor final words; play stops
    /// there with nowhere to go.
    DeadEnd { branch: BranchIndex },

    /// Two roster entries share an id; the first one wins.
    DuplicateCharacter { character_id: i32 },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::NoBranches => write!(f, "no summary parts found"),
            LoadWarning::UnattachedBranch { branch } => {
                write!(f, "branch {branch} is not part of the summary tree")
            }
            LoadWarning::UnknownCharacter {
                branch,
                node,
                character_id,
            } => write!(
                f,
                "branch {branch} node {node} names unknown character {character_id}"
            ),
            LoadWarning::DeadEnd { branch } => {
                write!(f, "branch {branch} ends without options or final words")
            }
            LoadWarning::DuplicateCharacter { character_id } => {
                write!(f, "duplicate character id {character_id}; keeping the first")
            }
        }
    }
}

/// The fully resolved story graph.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    pub meta: GameMeta,

    /// Root of the summary tree. Its index names the entry branch.
    pub summary: SummaryNode,

    characters: HashMap<i32, Character>,
    branches: HashMap<BranchIndex, SummaryBranch>,
    warnings: Vec<LoadWarning>,
}

impl StoryGraph {
    pub(crate) fn new(
        meta: GameMeta,
        summary: SummaryNode,
        characters: HashMap<i32, Character>,
        branches: HashMap<BranchIndex, SummaryBranch>,
        warnings: Vec<LoadWarning>,
    ) -> Self {
        Self {
            meta,
            summary,
            characters,
            branches,
            warnings,
        }
    }

    /// Index of the branch play begins from.
    pub fn root_index(&self) -> BranchIndex {
        self.summary.index
    }

    /// The branch play begins from, if it was loaded.
    pub fn entry_branch(&self) -> Option<&SummaryBranch> {
        self.branch(self.root_index())
    }

    pub fn branch(&self, index: BranchIndex) -> Option<&SummaryBranch> {
        self.branches.get(&index)
    }

    /// The dialog node at `position` inside branch `index`.
    pub fn node(&self, index: BranchIndex, position: usize) -> Option<&DialogNode> {
        self.branch(index).and_then(|b| b.nodes.get(position))
    }

    pub fn character(&self, id: i32) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub(crate) fn character_mut(&mut self, id: i32) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Loaded branch indices, sorted.
    pub fn branch_indices(&self) -> Vec<BranchIndex> {
        let mut indices: Vec<_> = self.branches.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Roster ids, sorted.
    pub fn character_ids(&self) -> Vec<i32> {
        let mut ids: Vec<_> = self.characters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Problems found while loading, in discovery order.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }
}
