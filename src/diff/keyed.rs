//! Keyed child reconciliation.
//!
//! Only the current and the next child on each side are compared, so arbitrary permutations degrade into
//! removals and insertions. Those are paired up into moves by key within one call, afterwards.

use super::Differ;
use crate::{
	patch::{Insert, InsertSource, MoveId, Moved, Patch, PatchKind, Reorder},
	redact,
	tree::{KeyedVNode, VTree},
};
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{level_filters::STATIC_MAX_LEVEL, trace, warn, Level};

/// Appended to a key that's already taken in the current call.
const KEY_COLLISION_SUFFIX: &str = "\u{0}";

/// Reconciliation entry. Lives only for one [`Differ::diff_keyed_children`] call.
enum Entry {
	/// Inserted at `slot`, not (yet) paired with a removal.
	Insert { value: VTree, slot: InsertSlot },
	/// Removed at preorder `index`. The [`PatchKind::Remove`] for it is `Reconciliation::patches[patch]`.
	Remove { value: VTree, index: usize, patch: usize },
	/// Paired up. Any further use of the key is a collision.
	Move,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
	Insert,
	Remove,
	Move,
}

impl Entry {
	fn kind(&self) -> EntryKind {
		match self {
			Entry::Insert { .. } => EntryKind::Insert,
			Entry::Remove { .. } => EntryKind::Remove,
			Entry::Move => EntryKind::Move,
		}
	}
}

#[derive(Clone, Copy)]
enum InsertSlot {
	Positioned(usize),
	Trailing(usize),
}

struct Reconciliation<'d, 'c> {
	differ: &'d Differ<'c>,
	entries: HashMap<Rc<str>, Entry>,
	patches: Vec<Patch>,
	inserts: Vec<Insert>,
	trailing_inserts: Option<Vec<Insert>>,
	move_count: usize,
}

impl Differ<'_> {
	pub(super) fn diff_keyed_children(&self, k_1: &KeyedVNode, k_2: &KeyedVNode, patches: &mut Vec<Patch>, root: usize) {
		let old = k_1.children();
		let new = k_2.children();

		if STATIC_MAX_LEVEL >= Level::WARN {
			let mut seen = HashSet::with_capacity(new.len());
			for (key, _) in new {
				if !seen.insert(key) {
					warn!(key = redact(key), "Duplicate sibling key. Moves involving it may be paired up wrongly.")
				}
			}
		}

		let mut reconciliation = Reconciliation {
			differ: self,
			entries: HashMap::new(),
			patches: Vec::new(),
			inserts: Vec::new(),
			trailing_inserts: None,
			move_count: 0,
		};

		let (mut x, mut y) = (0, 0);
		let mut index = root;

		while x < old.len() && y < new.len() {
			let (old_key, old_value) = &old[x];
			let (new_key, new_value) = &new[y];

			if old_key == new_key {
				index += 1;
				self.diff_tree(old_value, new_value, &mut reconciliation.patches, index);
				index += old_value.descendants_count();
				x += 1;
				y += 1;
				continue;
			}

			match (old.get(x + 1), new.get(y + 1)) {
				// Adjacent transposition.
				(Some((old_next_key, old_next_value)), Some((new_next_key, new_next_value))) if old_next_key == new_key && new_next_key == old_key => {
					trace!(x, y, "Swap");
					index += 1;
					self.diff_tree(old_value, new_next_value, &mut reconciliation.patches, index);
					// Keyed by `old_key` on purpose, so that the removal below pairs with it.
					reconciliation.insert(old_key, new_value, y, false);
					index += old_value.descendants_count();

					index += 1;
					reconciliation.remove(old_key, old_next_value, index);
					index += old_next_value.descendants_count();

					x += 2;
					y += 2;
				}

				// `new_value` was inserted.
				(_, Some((new_next_key, new_next_value))) if new_next_key == old_key => {
					trace!(x, y, "Insertion");
					index += 1;
					reconciliation.insert(new_key, new_value, y, false);
					self.diff_tree(old_value, new_next_value, &mut reconciliation.patches, index);
					index += old_value.descendants_count();

					x += 1;
					y += 2;
				}

				// `old_value` was removed.
				(Some((old_next_key, old_next_value)), _) if old_next_key == new_key => {
					trace!(x, y, "Removal");
					index += 1;
					reconciliation.remove(old_key, old_value, index);
					index += old_value.descendants_count();

					index += 1;
					self.diff_tree(old_next_value, new_value, &mut reconciliation.patches, index);
					index += old_next_value.descendants_count();

					x += 2;
					y += 1;
				}

				// Replaced one child, the next ones match.
				(Some((old_next_key, old_next_value)), Some((new_next_key, new_next_value))) if old_next_key == new_next_key => {
					trace!(x, y, "Replacement");
					index += 1;
					reconciliation.remove(old_key, old_value, index);
					reconciliation.insert(new_key, new_value, y, false);
					index += old_value.descendants_count();

					index += 1;
					self.diff_tree(old_next_value, new_next_value, &mut reconciliation.patches, index);
					index += old_next_value.descendants_count();

					x += 2;
					y += 2;
				}

				_ => {
					trace!(x, y, "No local match. Falling back to removals and insertions.");
					break;
				}
			}
		}

		for (old_key, old_value) in &old[x..] {
			index += 1;
			reconciliation.remove(old_key, old_value, index);
			index += old_value.descendants_count();
		}

		for (position, (new_key, new_value)) in new.iter().enumerate().skip(y) {
			reconciliation.insert(new_key, new_value, position, true);
		}

		debug_assert_eq!(index, root + k_1.descendants_count(), "Keyed diff index walk desynchronized");

		let reorder = reconciliation.finish();
		if !reorder.is_empty() {
			trace!(
				patches = reorder.patches.len(),
				inserts = reorder.inserts.len(),
				trailing_inserts = reorder.trailing_inserts.as_ref().map_or(0, Vec::len),
				moves = reorder.move_count,
				"Reordering."
			);
			patches.push(Patch {
				index: root,
				kind: PatchKind::Reorder(reorder),
			})
		}
	}
}

impl Reconciliation<'_, '_> {
	fn insert(&mut self, key: &Rc<str>, value: &VTree, position: usize, trailing: bool) {
		let mut key = key.clone();
		for _ in 0..=self.differ.config.key_collision_limit {
			match self.entries.get(&key).map(Entry::kind) {
				None => {
					let slot = self.push_insert(position, InsertSource::Render(value.clone()), trailing);
					self.entries.insert(key, Entry::Insert { value: value.clone(), slot });
					return;
				}
				Some(EntryKind::Remove) => {
					if let Some(Entry::Remove { value: removed, index, patch }) = self.entries.insert(key, Entry::Move) {
						trace!(position, index, "Pairing insertion with earlier removal as move.");
						let moved = self.moved(&removed, value, index);
						let id = moved.id;
						self.patches[patch].kind = PatchKind::Remove(Some(moved));
						self.push_insert(position, InsertSource::Moved(id), trailing);
					}
					return;
				}
				Some(EntryKind::Insert) | Some(EntryKind::Move) => key = mangle(&key),
			}
		}

		warn!(key = redact(&key), "Key collision limit reached. Inserting without move detection.");
		self.push_insert(position, InsertSource::Render(value.clone()), trailing);
	}

	fn remove(&mut self, key: &Rc<str>, value: &VTree, index: usize) {
		let mut key = key.clone();
		for _ in 0..=self.differ.config.key_collision_limit {
			match self.entries.get(&key).map(Entry::kind) {
				None => {
					let patch = self.push_remove(index, None);
					self.entries.insert(key, Entry::Remove { value: value.clone(), index, patch });
					return;
				}
				Some(EntryKind::Insert) => {
					if let Some(Entry::Insert { value: inserted, slot }) = self.entries.insert(key, Entry::Move) {
						trace!(index, "Pairing removal with earlier insertion as move.");
						let moved = self.moved(value, &inserted, index);
						let id = moved.id;
						self.push_remove(index, Some(moved));
						self.insert_at(slot).source = InsertSource::Moved(id);
					}
					return;
				}
				Some(EntryKind::Remove) | Some(EntryKind::Move) => key = mangle(&key),
			}
		}

		warn!(key = redact(&key), "Key collision limit reached. Removing without move detection.");
		self.push_remove(index, None);
	}

	/// Diffs the removed value against the inserted one, at the removed node's preorder `index`.
	fn moved(&mut self, removed: &VTree, inserted: &VTree, index: usize) -> Moved {
		let id = MoveId(self.move_count);
		self.move_count += 1;
		let mut patches = Vec::new();
		self.differ.diff_tree(removed, inserted, &mut patches, index);
		Moved { id, patches }
	}

	fn push_remove(&mut self, index: usize, moved: Option<Moved>) -> usize {
		self.patches.push(Patch {
			index,
			kind: PatchKind::Remove(moved),
		});
		self.patches.len() - 1
	}

	fn push_insert(&mut self, position: usize, source: InsertSource, trailing: bool) -> InsertSlot {
		let insert = Insert { position, source };
		if trailing {
			let trailing_inserts = self.trailing_inserts.get_or_insert_with(Vec::new);
			trailing_inserts.push(insert);
			InsertSlot::Trailing(trailing_inserts.len() - 1)
		} else {
			self.inserts.push(insert);
			InsertSlot::Positioned(self.inserts.len() - 1)
		}
	}

	fn insert_at(&mut self, slot: InsertSlot) -> &mut Insert {
		match slot {
			InsertSlot::Positioned(i) => &mut self.inserts[i],
			InsertSlot::Trailing(i) => match &mut self.trailing_inserts {
				Some(trailing_inserts) => &mut trailing_inserts[i],
				None => unreachable!("Trailing insert slot without trailing inserts"),
			},
		}
	}

	fn finish(self) -> Reorder {
		Reorder {
			patches: self.patches,
			inserts: self.inserts,
			trailing_inserts: self.trailing_inserts,
			move_count: self.move_count,
		}
	}
}

fn mangle(key: &str) -> Rc<str> {
	let mut mangled = String::with_capacity(key.len() + KEY_COLLISION_SUFFIX.len());
	mangled.push_str(key);
	mangled.push_str(KEY_COLLISION_SUFFIX);
	mangled.into()
}
