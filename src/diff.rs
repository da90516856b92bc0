//! Tree diffing.
//!
//! [`diff`] walks two trees in lockstep and emits a flat [`Patch`] list addressed by preorder index into the *old* tree.
//! Unchanged subtrees that are shared by reference (see [`VTree::ptr_eq`]) are skipped without being visited.

use crate::{
	patch::{AttributesDiff, ListenerChange, Patch, PatchKind},
	redact,
	tree::{Attributes, KeyedVNode, VNode, VTree},
};
use tracing::{instrument, trace, trace_span};

mod keyed;

/// Tuning knobs for [`diff_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffConfig {
	/// How often a duplicate sibling key is re-keyed and retried before the child is handled without move detection.
	pub key_collision_limit: u8,
}
impl DiffConfig {
	#[must_use]
	pub const fn new() -> Self {
		Self { key_collision_limit: 8 }
	}
}
impl Default for DiffConfig {
	fn default() -> Self {
		Self::new()
	}
}

/// Computes the patches that turn `old` into `new`, with the default [`DiffConfig`].
#[must_use]
pub fn diff(old: &VTree, new: &VTree) -> Vec<Patch> {
	diff_with(old, new, &DiffConfig::default())
}

#[must_use]
#[instrument(skip(old, new))]
pub fn diff_with(old: &VTree, new: &VTree, config: &DiffConfig) -> Vec<Patch> {
	let mut patches = Vec::new();
	Differ { config }.diff_tree(old, new, &mut patches, 0);
	debug_assert!(patches.windows(2).all(|pair| pair[0].index <= pair[1].index), "Patches out of order");
	trace!("Produced {} top-level patch(es).", patches.len());
	patches
}

pub(crate) struct Differ<'a> {
	config: &'a DiffConfig,
}
impl Differ<'_> {
	/// Appends the patches for `old` → `new` to `patches`, where `index` is the preorder index of `old`.
	pub(crate) fn diff_tree(&self, old: &VTree, new: &VTree, patches: &mut Vec<Patch>, index: usize) {
		if old.ptr_eq(new) {
			return trace!(index, "Identical. Skipping.");
		}

		match (old, new) {
			(VTree::Text(t_1), VTree::Text(t_2)) => {
				let span = trace_span!("Diffing text", index, t_1 = redact(t_1), t_2 = redact(t_2));
				let _enter = span.enter();
				if t_1 != t_2 {
					patches.push(Patch {
						index,
						kind: PatchKind::UpdateText(t_2.clone()),
					})
				}
			}

			(VTree::Node(n_1), VTree::Node(n_2)) => {
				let span = trace_span!("Diffing node", index, tag = n_1.tag());
				let _enter = span.enter();
				self.diff_nodes(n_1, n_2, new, patches, index)
			}

			(VTree::Node(n_1), VTree::Keyed(k_2)) => {
				let span = trace_span!("Diffing node against keyed node", index, tag = n_1.tag());
				let _enter = span.enter();
				trace!("De-keying the new node.");
				self.diff_nodes(n_1, &k_2.dekey(), new, patches, index)
			}

			(VTree::Keyed(k_1), VTree::Keyed(k_2)) => {
				let span = trace_span!("Diffing keyed node", index, tag = k_1.tag(), "k_1.len()" = k_1.children().len(), "k_2.len()" = k_2.children().len());
				let _enter = span.enter();
				if self.diff_header(Header::keyed(k_1), Header::keyed(k_2), new, patches, index) {
					self.diff_keyed_children(k_1, k_2, patches, index)
				}
			}

			(VTree::Tagged(g_1), VTree::Tagged(g_2)) => {
				let span = trace_span!("Diffing tagged", index);
				let _enter = span.enter();
				if g_1.transform().ptr_eq(g_2.transform()) {
					self.diff_tree(g_1.inner(), g_2.inner(), patches, index + 1)
				} else {
					trace!("Transform changed. Replacing.");
					replace(new, patches, index)
				}
			}

			// Mismatching kinds: Replace wholesale.
			(old, new) => {
				let span = trace_span!("Replacing mismatching", index, old = old.kind(), new = new.kind());
				let _enter = span.enter();
				replace(new, patches, index)
			}
		}
	}

	fn diff_nodes(&self, n_1: &VNode, n_2: &VNode, new: &VTree, patches: &mut Vec<Patch>, index: usize) {
		if self.diff_header(Header::plain(n_1), Header::plain(n_2), new, patches, index) {
			self.diff_children(n_1.children(), n_2.children(), patches, index)
		}
	}

	/// Emits a [`PatchKind::Replace`] or [`PatchKind::UpdateProps`] as needed.
	///
	/// Returns whether the children should be diffed, i.e. `false` iff the node was replaced.
	fn diff_header(&self, h_1: Header<'_>, h_2: Header<'_>, new: &VTree, patches: &mut Vec<Patch>, index: usize) -> bool {
		if h_1.tag != h_2.tag || h_1.namespace != h_2.namespace {
			trace!(tag_1 = h_1.tag, tag_2 = h_2.tag, ns_1 = ?h_1.namespace, ns_2 = ?h_2.namespace, "Tag or namespace changed. Replacing.");
			replace(new, patches, index);
			return false;
		}

		let attributes_diff = diff_attributes(h_1.attributes, h_2.attributes);
		if !attributes_diff.is_empty() {
			trace!(
				listeners = attributes_diff.listeners.len(),
				properties = attributes_diff.properties.len(),
				"Attributes changed."
			);
			patches.push(Patch {
				index,
				kind: PatchKind::UpdateProps(attributes_diff),
			})
		}
		true
	}

	/// Positional child diff. Length differences are reconciled by a single patch on the parent.
	fn diff_children(&self, c_1: &[VTree], c_2: &[VTree], patches: &mut Vec<Patch>, mut index: usize) {
		// Parent patches go first to keep the list ordered by index.
		if c_1.len() > c_2.len() {
			patches.push(Patch {
				index,
				kind: PatchKind::TrimTail {
					keep: c_2.len(),
					remove: c_1.len() - c_2.len(),
				},
			})
		} else if c_1.len() < c_2.len() {
			patches.push(Patch {
				index,
				kind: PatchKind::AppendTail {
					keep: c_1.len(),
					children: c_2.to_vec(),
				},
			})
		}

		for (child_1, child_2) in c_1.iter().zip(c_2) {
			index += 1;
			self.diff_tree(child_1, child_2, patches, index);
			index += child_1.descendants_count();
		}
	}
}

fn replace(new: &VTree, patches: &mut Vec<Patch>, index: usize) {
	patches.push(Patch {
		index,
		kind: PatchKind::Replace(new.clone()),
	})
}

struct Header<'a> {
	tag: &'a str,
	namespace: Option<&'a str>,
	attributes: &'a Attributes,
}
impl<'a> Header<'a> {
	fn plain(node: &'a VNode) -> Self {
		Self {
			tag: node.tag(),
			namespace: node.namespace(),
			attributes: node.attributes(),
		}
	}

	fn keyed(node: &'a KeyedVNode) -> Self {
		Self {
			tag: node.tag(),
			namespace: node.namespace(),
			attributes: node.attributes(),
		}
	}
}

/// Compares the two attribute sets per category.
///
/// Listeners are compared by handler identity only. A changed handler is unregistered and the new one registered.
#[must_use]
pub fn diff_attributes(a_1: &Attributes, a_2: &Attributes) -> AttributesDiff {
	let mut diff = AttributesDiff::default();

	for (key, handler) in a_1.listeners() {
		match a_2.listeners().get(key) {
			Some(next) if next == handler => (),
			next => {
				diff.listeners.push(ListenerChange::Remove {
					key: key.clone(),
					handler: handler.clone(),
				});
				if let Some(next) = next {
					diff.listeners.push(ListenerChange::Add {
						key: key.clone(),
						handler: next.clone(),
					})
				}
			}
		}
	}
	for (key, handler) in a_2.listeners() {
		if !a_1.listeners().contains_key(key) {
			diff.listeners.push(ListenerChange::Add {
				key: key.clone(),
				handler: handler.clone(),
			})
		}
	}

	for (key, value) in a_1.properties() {
		match a_2.properties().get(key) {
			Some(next) if next == value => (),
			next => diff.properties.push((key.clone(), next.cloned())),
		}
	}
	for (key, value) in a_2.properties() {
		if !a_1.properties().contains_key(key) {
			diff.properties.push((key.clone(), Some(value.clone())))
		}
	}

	diff
}
