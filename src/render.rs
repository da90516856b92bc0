//! The live render target contract and the renderer built on top of it.

use crate::{
	redact,
	tree::{Attributes, Handler, VTree},
};
use core::fmt::Debug;
use tracing::{instrument, trace_span};

/// Primitive operations on a mutable live tree.
///
/// Implementations must not fail silently in a way that changes the tree's *shape*:
/// [`apply`](`crate::apply::apply`) re-derives live nodes from child positions.
/// If a node can't be created as requested, a placeholder must stand in for it.
pub trait RenderTarget {
	/// A handle to a live node. Equality must be handle identity.
	type Node: Clone + PartialEq + Debug;

	fn create_text(&mut self, text: &str) -> Self::Node;
	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> Self::Node;

	/// Sets (`Some`) or clears (`None`) one property.
	fn set_property(&mut self, node: &Self::Node, key: &str, value: Option<&str>);
	fn add_listener(&mut self, node: &Self::Node, key: &str, handler: &Handler);
	/// `handler` is the same one that was passed to [`add_listener`](`RenderTarget::add_listener`).
	fn remove_listener(&mut self, node: &Self::Node, key: &str, handler: &Handler);
	fn update_text(&mut self, node: &Self::Node, text: &str);

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_at(&self, parent: &Self::Node, position: usize) -> Option<Self::Node>;

	/// Inserts `child` before `before`, or at the end if that's [`None`]. Moves `child` if it's already attached.
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, before: Option<&Self::Node>);
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);
	fn replace_child(&mut self, parent: &Self::Node, old: &Self::Node, new: &Self::Node);

	/// Appends `children` at the end of `parent` in one batch.
	fn append_children(&mut self, parent: &Self::Node, children: Vec<Self::Node>) {
		for child in children {
			self.insert_before(parent, &child, None)
		}
	}

	/// Called once after each fully applied update cycle.
	fn finish_cycle(&mut self) {}
}

/// Turns `tree` into a fresh, detached live node with all attributes, listeners and children in place.
///
/// A [`VTree::Tagged`] renders as its inner tree.
#[instrument(skip(target, tree), fields(kind = tree.kind()))]
pub fn render<T: RenderTarget + ?Sized>(target: &mut T, tree: &VTree) -> T::Node {
	render_inner(target, tree)
}

fn render_inner<T: RenderTarget + ?Sized>(target: &mut T, tree: &VTree) -> T::Node {
	match tree {
		VTree::Text(text) => {
			let span = trace_span!("Creating text", text = redact(text));
			let _enter = span.enter();
			target.create_text(text)
		}
		VTree::Node(node) => {
			let span = trace_span!("Creating node", tag = node.tag(), namespace = ?node.namespace());
			let _enter = span.enter();
			let element = target.create_element(node.tag(), node.namespace());
			apply_attributes(target, &element, node.attributes());
			for child in node.children() {
				let child = render_inner(target, child);
				target.insert_before(&element, &child, None)
			}
			element
		}
		VTree::Keyed(keyed) => {
			let span = trace_span!("Creating keyed node", tag = keyed.tag(), namespace = ?keyed.namespace());
			let _enter = span.enter();
			let element = target.create_element(keyed.tag(), keyed.namespace());
			apply_attributes(target, &element, keyed.attributes());
			for (key, child) in keyed.children() {
				let span = trace_span!("Creating keyed child", key = redact(key));
				let _enter = span.enter();
				let child = render_inner(target, child);
				target.insert_before(&element, &child, None)
			}
			element
		}
		VTree::Tagged(tagged) => {
			let span = trace_span!("Creating tagged");
			let _enter = span.enter();
			render_inner(target, tagged.inner())
		}
	}
}

fn apply_attributes<T: RenderTarget + ?Sized>(target: &mut T, element: &T::Node, attributes: &Attributes) {
	for (key, handler) in attributes.listeners() {
		target.add_listener(element, key, handler)
	}
	for (key, value) in attributes.properties() {
		target.set_property(element, key, Some(value))
	}
}
