//! Patch application.
//!
//! Patches don't know their live nodes. [`apply`] first walks the old tree's shape along the (sorted) patch list
//! to bind each patch to a live node, skipping subtrees without patches by their cached descendant count.
//! Only once everything is bound is the live tree mutated, so that positions are still those of the old tree while resolving.

use crate::{
	patch::{AttributesDiff, Insert, InsertSource, ListenerChange, Moved, Patch, PatchKind, Reorder},
	render::{render, RenderTarget},
	tree::{Attributes, VTree},
};
use thiserror::Error;
use tracing::{error, instrument, trace, trace_span};

/// Errors produced while applying patches.
///
/// All of these mean that the patches were applied against a live tree that doesn't match the old tree they were diffed from.
/// The live tree may be left partially patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApplyError {
	/// A patch's index lies outside the old tree or the patch list is out of order.
	#[error("patch at index {index} does not address a node of the old tree")]
	UnresolvedPatch { index: usize },
	/// The live node for the old tree node at `index` has too few children.
	#[error("live node for index {index} has no child at position {position}")]
	MissingChild { index: usize, position: usize },
	/// A live node to be removed has no parent.
	#[error("live node for index {index} has no parent to be removed from")]
	Orphan { index: usize },
	/// A moved node was not parked by its removal before being reinserted.
	#[error("moved node {id} is missing")]
	MissingMove { id: usize },
}

/// A patch together with the live node it acts on.
struct Bound<'p, N> {
	patch: &'p Patch,
	node: N,
	/// The old subtree rendered by `node`.
	tree: &'p VTree,
	/// Bound nested patches of a [`PatchKind::Reorder`] or moved [`PatchKind::Remove`].
	nested: Vec<Bound<'p, N>>,
}

/// Applies `patches` (as diffed from `old`) to the live tree rooted at `root`, which must currently be a rendering of `old`.
///
/// Returns the new live root, which differs from `root` only if the root itself was replaced.
///
/// # Errors
///
/// Iff the live tree or `patches` don't match `old`. See [`ApplyError`].
#[instrument(skip(target, old, root, patches), fields(patches = patches.len()))]
pub fn apply<T: RenderTarget + ?Sized>(target: &mut T, old: &VTree, root: T::Node, patches: &[Patch]) -> Result<T::Node, ApplyError> {
	if patches.is_empty() {
		trace!("No patches.");
		return Ok(root);
	}

	let result = resolve_all(&*target, &root, old, patches, 0, old.descendants_count()).and_then(|bound| {
		trace!("Bound {} top-level patch(es).", bound.len());
		apply_bound(target, root, bound, &mut [])
	});
	match result {
		Ok(root) => {
			target.finish_cycle();
			Ok(root)
		}
		Err(error) => {
			error!("Failed to apply patches: {}", error);
			Err(error)
		}
	}
}

/// Binds all of `patches`, which must lie within `low..=high`, starting at `node`.
fn resolve_all<'p, T: RenderTarget + ?Sized>(target: &T, node: &T::Node, tree: &'p VTree, patches: &'p [Patch], low: usize, high: usize) -> Result<Vec<Bound<'p, T::Node>>, ApplyError> {
	let mut bound = Vec::with_capacity(patches.len());
	let resolved = resolve(target, node, tree, patches, &mut bound, 0, low, high)?;
	match patches.get(resolved) {
		None => Ok(bound),
		Some(unresolved) => Err(ApplyError::UnresolvedPatch { index: unresolved.index }),
	}
}

/// Binds patches starting at `patches[i]` while they fall into the subtree `tree`, which spans `low..=high`.
///
/// Returns the index of the first patch that wasn't bound.
#[allow(clippy::too_many_arguments)]
fn resolve<'p, T: RenderTarget + ?Sized>(
	target: &T,
	node: &T::Node,
	tree: &'p VTree,
	patches: &'p [Patch],
	bound: &mut Vec<Bound<'p, T::Node>>,
	mut i: usize,
	low: usize,
	high: usize,
) -> Result<usize, ApplyError> {
	debug_assert_eq!(high, low + tree.descendants_count(), "Index range doesn't match subtree size");

	let mut index = match patches.get(i) {
		Some(patch) if patch.index <= high => patch.index,
		_ => return Ok(i),
	};

	while index == low {
		let patch = &patches[i];
		let nested = match &patch.kind {
			PatchKind::Reorder(Reorder { patches: nested, .. }) | PatchKind::Remove(Some(Moved { patches: nested, .. })) if !nested.is_empty() => {
				let span = trace_span!("Binding nested patches", index, kind = patch.kind.name(), count = nested.len());
				let _enter = span.enter();
				resolve_all(target, node, tree, nested, low, high)?
			}
			_ => Vec::new(),
		};
		bound.push(Bound {
			patch,
			node: node.clone(),
			tree,
			nested,
		});

		i += 1;
		index = match patches.get(i) {
			Some(patch) if patch.index <= high => patch.index,
			_ => return Ok(i),
		};
	}

	match tree {
		VTree::Text(_) => Ok(i),
		VTree::Node(node_) => resolve_children(target, node, node_.children().iter(), patches, bound, i, low, high),
		VTree::Keyed(keyed) => resolve_children(target, node, keyed.children().iter().map(|(_, child)| child), patches, bound, i, low, high),
		// Shares its live node with the inner tree.
		VTree::Tagged(tagged) if index > low => resolve(target, node, tagged.inner(), patches, bound, i, low + 1, high),
		VTree::Tagged(_) => Ok(i),
	}
}

#[allow(clippy::too_many_arguments)]
fn resolve_children<'p, T: RenderTarget + ?Sized>(
	target: &T,
	node: &T::Node,
	children: impl Iterator<Item = &'p VTree>,
	patches: &'p [Patch],
	bound: &mut Vec<Bound<'p, T::Node>>,
	mut i: usize,
	parent_index: usize,
	high: usize,
) -> Result<usize, ApplyError> {
	let mut index = match patches.get(i) {
		Some(patch) if patch.index <= high => patch.index,
		_ => return Ok(i),
	};

	let mut low = parent_index;
	for (position, child) in children.enumerate() {
		low += 1;
		let next_low = low + child.descendants_count();

		if index < low {
			// Skipped over, so the caller reports it.
			break;
		}

		if index <= next_low {
			let child_node = target.child_at(node, position).ok_or(ApplyError::MissingChild { index: parent_index, position })?;
			i = resolve(target, &child_node, child, patches, bound, i, low, next_low)?;
			index = match patches.get(i) {
				Some(patch) if patch.index <= high => patch.index,
				_ => return Ok(i),
			};
		}

		low = next_low;
	}

	Ok(i)
}

/// Applies bound patches in order. `root` is replaced in the result if a patch replaces it.
fn apply_bound<T: RenderTarget + ?Sized>(target: &mut T, mut root: T::Node, bound: Vec<Bound<'_, T::Node>>, parked: &mut [Option<T::Node>]) -> Result<T::Node, ApplyError> {
	for bound in bound {
		let is_root = bound.node == root;
		let node = apply_patch(target, bound, parked)?;
		if is_root {
			root = node;
		}
	}
	Ok(root)
}

fn apply_patch<T: RenderTarget + ?Sized>(target: &mut T, Bound { patch, node, tree, nested }: Bound<'_, T::Node>, parked: &mut [Option<T::Node>]) -> Result<T::Node, ApplyError> {
	let span = trace_span!("Applying", index = patch.index, kind = patch.kind.name());
	let _enter = span.enter();

	match &patch.kind {
		PatchKind::Replace(new) => {
			unbind(target, &node, tree);
			let replacement = render(target, new);
			if replacement != node {
				match target.parent(&node) {
					Some(parent) => target.replace_child(&parent, &node, &replacement),
					None => trace!("Replaced node is detached. Not splicing."),
				}
			}
			Ok(replacement)
		}

		PatchKind::UpdateText(text) => {
			target.update_text(&node, text);
			Ok(node)
		}

		PatchKind::UpdateProps(diff) => {
			apply_attributes_diff(target, &node, diff);
			Ok(node)
		}

		&PatchKind::TrimTail { keep, remove } => {
			trace_span!("Unbinding trimmed children", keep, remove).in_scope(|| unbind_children(target, &node, tree, keep));
			for _ in 0..remove {
				let child = target.child_at(&node, keep).ok_or(ApplyError::MissingChild { index: patch.index, position: keep })?;
				target.remove_child(&node, &child)
			}
			Ok(node)
		}

		PatchKind::AppendTail { keep, children } => {
			let end = target.child_at(&node, *keep);
			for child in children.iter().skip(*keep) {
				let child = render(target, child);
				target.insert_before(&node, &child, end.as_ref())
			}
			Ok(node)
		}

		PatchKind::Remove(None) => {
			unbind(target, &node, tree);
			detach(target, &node, patch.index)?;
			Ok(node)
		}

		// Keeps its listeners, as the node is reinserted.
		PatchKind::Remove(Some(Moved { id, .. })) => {
			detach(target, &node, patch.index)?;
			let patched = apply_bound(target, node.clone(), nested, &mut [])?;
			trace!(id = id.0, "Parking moved node.");
			let slot = parked.get_mut(id.0).ok_or(ApplyError::MissingMove { id: id.0 })?;
			*slot = Some(patched);
			Ok(node)
		}

		PatchKind::Reorder(reorder) => apply_reorder(target, node, reorder, nested),
	}
}

fn apply_reorder<T: RenderTarget + ?Sized>(target: &mut T, node: T::Node, reorder: &Reorder, nested: Vec<Bound<'_, T::Node>>) -> Result<T::Node, ApplyError> {
	let mut parked = vec![None; reorder.move_count];
	let node = apply_bound(target, node, nested, &mut parked)?;

	for Insert { position, source } in &reorder.inserts {
		let child = take_source(target, source, &mut parked)?;
		let before = target.child_at(&node, *position);
		target.insert_before(&node, &child, before.as_ref())
	}

	if let Some(trailing_inserts) = &reorder.trailing_inserts {
		let children = trailing_inserts
			.iter()
			.map(|insert| take_source(target, &insert.source, &mut parked))
			.collect::<Result<Vec<_>, _>>()?;
		target.append_children(&node, children)
	}

	Ok(node)
}

fn take_source<T: RenderTarget + ?Sized>(target: &mut T, source: &InsertSource, parked: &mut [Option<T::Node>]) -> Result<T::Node, ApplyError> {
	match source {
		InsertSource::Render(tree) => Ok(render(target, tree)),
		InsertSource::Moved(id) => parked
			.get_mut(id.0)
			.and_then(Option::take)
			.ok_or(ApplyError::MissingMove { id: id.0 }),
	}
}

fn detach<T: RenderTarget + ?Sized>(target: &mut T, node: &T::Node, index: usize) -> Result<(), ApplyError> {
	let parent = target.parent(node).ok_or(ApplyError::Orphan { index })?;
	target.remove_child(&parent, node);
	Ok(())
}

fn apply_attributes_diff<T: RenderTarget + ?Sized>(target: &mut T, node: &T::Node, diff: &AttributesDiff) {
	for change in &diff.listeners {
		match change {
			ListenerChange::Remove { key, handler } => target.remove_listener(node, key, handler),
			ListenerChange::Add { key, handler } => target.add_listener(node, key, handler),
		}
	}
	for (key, value) in &diff.properties {
		target.set_property(node, key, value.as_deref())
	}
}

/// Unregisters every listener in the live subtree `node`, which renders `tree` and is about to be dropped.
fn unbind<T: RenderTarget + ?Sized>(target: &mut T, node: &T::Node, tree: &VTree) {
	let attributes: &Attributes = match tree {
		VTree::Text(_) => return,
		VTree::Node(node_) => node_.attributes(),
		VTree::Keyed(keyed) => keyed.attributes(),
		VTree::Tagged(tagged) => return unbind(target, node, tagged.inner()),
	};
	for (key, handler) in attributes.listeners() {
		target.remove_listener(node, key, handler)
	}
	unbind_children(target, node, tree, 0)
}

/// [`unbind`]s the live children of `node` from position `skip` on.
fn unbind_children<T: RenderTarget + ?Sized>(target: &mut T, node: &T::Node, tree: &VTree, skip: usize) {
	let children: Vec<&VTree> = match tree {
		VTree::Text(_) => return,
		VTree::Node(node_) => node_.children().iter().collect(),
		VTree::Keyed(keyed) => keyed.children().iter().map(|(_, child)| child).collect(),
		VTree::Tagged(tagged) => return unbind_children(target, node, tagged.inner(), skip),
	};
	for (position, child) in children.into_iter().enumerate().skip(skip) {
		match target.child_at(node, position) {
			Some(child_node) => unbind(target, &child_node, child),
			None => return error!(position, "Live node has fewer children than its old tree. Not unbinding the rest."),
		}
	}
}
