use sapling_dom::{
	apply, diff,
	memory::{MemoryTarget, NodeId, Snapshot},
	render,
	tree::Transform,
	Attribute, Handler, RenderTarget, VTree,
};

mod memory_support_;
use memory_support_::{fresh_snapshot, init_logging};

/// Counts outstanding listener registrations on top of a [`MemoryTarget`].
#[derive(Debug, Default)]
struct CountingTarget {
	inner: MemoryTarget,
	registrations: isize,
}

impl RenderTarget for CountingTarget {
	type Node = NodeId;

	fn create_text(&mut self, text: &str) -> NodeId {
		self.inner.create_text(text)
	}

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> NodeId {
		self.inner.create_element(tag, namespace)
	}

	fn set_property(&mut self, node: &NodeId, key: &str, value: Option<&str>) {
		self.inner.set_property(node, key, value)
	}

	fn add_listener(&mut self, node: &NodeId, key: &str, handler: &Handler) {
		self.registrations += 1;
		self.inner.add_listener(node, key, handler)
	}

	fn remove_listener(&mut self, node: &NodeId, key: &str, handler: &Handler) {
		self.registrations -= 1;
		self.inner.remove_listener(node, key, handler)
	}

	fn update_text(&mut self, node: &NodeId, text: &str) {
		self.inner.update_text(node, text)
	}

	fn parent(&self, node: &NodeId) -> Option<NodeId> {
		self.inner.parent(node)
	}

	fn child_at(&self, parent: &NodeId, position: usize) -> Option<NodeId> {
		self.inner.child_at(parent, position)
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, before: Option<&NodeId>) {
		self.inner.insert_before(parent, child, before)
	}

	fn remove_child(&mut self, parent: &NodeId, child: &NodeId) {
		self.inner.remove_child(parent, child)
	}

	fn replace_child(&mut self, parent: &NodeId, old: &NodeId, new: &NodeId) {
		self.inner.replace_child(parent, old, new)
	}

	fn finish_cycle(&mut self) {
		self.inner.finish_cycle()
	}
}

fn listeners_in(snapshot: &Snapshot) -> usize {
	match snapshot {
		Snapshot::Text(_) => 0,
		Snapshot::Element { listeners, children, .. } => listeners.len() + children.iter().map(listeners_in).sum::<usize>(),
	}
}

/// `<button>` with a click listener and `label` as text.
fn button(label: &str, handler: &Handler) -> VTree {
	VTree::node("button", vec![Attribute::listener("click", handler.clone())], vec![VTree::text(label)])
}

/// `<li>` wrapping a [`button`], so that listeners sit below the removed node.
fn keyed_buttons(keys: &[&str], handler: &Handler) -> VTree {
	VTree::keyed("ul", vec![], keys.iter().map(|&key| (key, VTree::node("li", vec![], vec![button(key, handler)]))))
}

fn plain_buttons(labels: &[&str], handler: &Handler) -> VTree {
	VTree::node("div", vec![Attribute::listener("click", handler.clone())], labels.iter().map(|&label| button(label, handler)))
}

/// Patches a rendering of `old` towards `new` and asserts that exactly the listeners of the live tree stay registered.
fn assert_unbound(old: &VTree, new: &VTree) -> (CountingTarget, NodeId) {
	init_logging();
	let mut target = CountingTarget::default();
	let root = render(&mut target, old);
	let root = apply(&mut target, old, root, &diff(old, new)).expect("Patches didn't apply");

	let snapshot = target.inner.snapshot(root);
	assert_eq!(snapshot, fresh_snapshot(new));
	assert_eq!(target.registrations, listeners_in(&snapshot) as isize);
	(target, root)
}

#[test]
fn keyed_removal() {
	let handler = Handler::new(|_| ());
	let (target, _) = assert_unbound(&keyed_buttons(&["a", "b"], &handler), &keyed_buttons(&["b"], &handler));
	assert_eq!(target.registrations, 1);
}

#[test]
fn keyed_removal_of_the_whole_tail() {
	let handler = Handler::new(|_| ());
	let (target, _) = assert_unbound(&keyed_buttons(&["a", "b", "c", "d"], &handler), &keyed_buttons(&["b"], &handler));
	assert_eq!(target.registrations, 1);
}

#[test]
fn trimmed_tail() {
	let handler = Handler::new(|_| ());
	let (target, _) = assert_unbound(&plain_buttons(&["a", "b", "c"], &handler), &plain_buttons(&["a"], &handler));
	assert_eq!(target.registrations, 2);
}

#[test]
fn replaced_subtree() {
	let handler = Handler::new(|_| ());
	let old = VTree::node("div", vec![], vec![plain_buttons(&["a", "b"], &handler)]);
	let new = VTree::node("div", vec![], vec![VTree::node("span", vec![], vec![])]);
	let (target, _) = assert_unbound(&old, &new);
	assert_eq!(target.registrations, 0);
}

#[test]
fn replaced_root() {
	let handler = Handler::new(|_| ());
	let (target, _) = assert_unbound(&plain_buttons(&["a"], &handler), &VTree::text("gone"));
	assert_eq!(target.registrations, 0);
}

#[test]
fn replaced_tagged() {
	let handler = Handler::new(|_| ());
	let tagged = |label: &str| VTree::tagged(Transform::new(|message| message), button(label, &handler));
	let old = VTree::node("div", vec![], vec![tagged("a")]);
	let new = VTree::node("div", vec![], vec![tagged("b")]);
	let (target, _) = assert_unbound(&old, &new);
	assert_eq!(target.registrations, 1);
}

#[test]
fn moves_keep_their_listeners() {
	let handler = Handler::new(|_| ());
	let (target, root) = assert_unbound(&keyed_buttons(&["a", "b", "c"], &handler), &keyed_buttons(&["c", "a", "b"], &handler));
	assert_eq!(target.registrations, 3);

	let moved = target.inner.children(root)[0];
	let button = target.inner.children(moved)[0];
	assert_eq!(target.inner.text(target.inner.children(button)[0]), Some("c"));
	assert_eq!(target.inner.dispatch(button, "click", &()), 1);
}
