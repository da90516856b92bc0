//! Edit operations, as produced by [`diff`](`crate::diff::diff`) and consumed by [`apply`](`crate::apply::apply`).
//!
//! Every [`Patch`] is addressed by the preorder index of the *old* tree node it concerns.
//! Lists of patches are sorted by ascending index.

use crate::tree::{Handler, VTree};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Patch {
	/// Preorder index of the targeted node in the old tree.
	pub index: usize,
	pub kind: PatchKind,
}

#[derive(Debug, Clone)]
pub enum PatchKind {
	/// Render the new subtree and splice it in place of the targeted one.
	Replace(VTree),
	UpdateText(Rc<str>),
	UpdateProps(AttributesDiff),
	/// Remove `remove` children starting at position `keep`.
	TrimTail { keep: usize, remove: usize },
	/// Render and append `children[keep..]`. `children` is the *full* new child list.
	AppendTail { keep: usize, children: Vec<VTree> },
	/// Detach the targeted keyed child. If it is [`Moved`], it's patched and parked for reinsertion instead of being discarded.
	Remove(Option<Moved>),
	Reorder(Reorder),
}
impl PatchKind {
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			PatchKind::Replace(_) => "Replace",
			PatchKind::UpdateText(_) => "UpdateText",
			PatchKind::UpdateProps(_) => "UpdateProps",
			PatchKind::TrimTail { .. } => "TrimTail",
			PatchKind::AppendTail { .. } => "AppendTail",
			PatchKind::Remove(_) => "Remove",
			PatchKind::Reorder(_) => "Reorder",
		}
	}
}

/// Identifies a moved node within its enclosing [`Reorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveId(pub usize);

/// The removal half of a move.
#[derive(Debug, Clone)]
pub struct Moved {
	pub id: MoveId,
	/// Updates from the removed value to the inserted one, addressed within the old tree.
	pub patches: Vec<Patch>,
}

/// All changes to the children of one keyed node.
#[derive(Debug, Clone, Default)]
pub struct Reorder {
	/// In-place updates and removals of existing children.
	pub patches: Vec<Patch>,
	/// Insertions interleaved with the remaining children, by ascending target position.
	pub inserts: Vec<Insert>,
	/// Insertions after all remaining children. [`None`] if there are none.
	pub trailing_inserts: Option<Vec<Insert>>,
	/// Number of [`MoveId`]s allocated in this reorder.
	pub move_count: usize,
}
impl Reorder {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.patches.is_empty() && self.inserts.is_empty() && self.trailing_inserts.is_none()
	}
}

#[derive(Debug, Clone)]
pub struct Insert {
	/// Position among the new children.
	pub position: usize,
	pub source: InsertSource,
}

#[derive(Debug, Clone)]
pub enum InsertSource {
	/// A pure insertion that is rendered fresh.
	Render(VTree),
	/// The insertion half of a move, which reuses the live node parked by the matching [`PatchKind::Remove`].
	Moved(MoveId),
}

/// Attribute changes of one node. Only emitted if not [empty](`AttributesDiff::is_empty`).
#[derive(Debug, Clone, Default)]
pub struct AttributesDiff {
	/// Removals come before additions for the same key.
	pub listeners: Vec<ListenerChange>,
	/// [`None`] clears the property.
	pub properties: Vec<(Rc<str>, Option<Rc<str>>)>,
}
impl AttributesDiff {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.listeners.is_empty() && self.properties.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerChange {
	Add { key: Rc<str>, handler: Handler },
	/// Carries the exact handler that was registered, so that it can be unregistered.
	Remove { key: Rc<str>, handler: Handler },
}
