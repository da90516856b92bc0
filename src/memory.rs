//! An arena-backed [`RenderTarget`] that keeps the live tree in memory.
//!
//! Useful headless and for verifying patches: [`MemoryTarget::snapshot`] captures a live subtree structurally,
//! so that a patched rendering can be compared against a fresh one.
//!
//! The arena only grows. Removed and replaced nodes keep their slot (and stay readable through their [`NodeId`])
//! until the whole [`MemoryTarget`] is dropped, so it's meant for tests and short-lived trees.
//! A long-running [`Mount`](`crate::Mount`) should use a target that frees detached nodes.

use crate::{
	redact,
	render::RenderTarget,
	tree::Handler,
};
use core::any::Any;
use indexmap::IndexMap;
use tracing::{error, trace};

/// Handle of a node in a [`MemoryTarget`]. Nodes are never freed or reused while the target exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
enum Content {
	Text(String),
	Element {
		tag: String,
		namespace: Option<String>,
		properties: IndexMap<String, String>,
		listeners: Vec<(String, Handler)>,
	},
}

#[derive(Debug)]
struct Slot {
	content: Content,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct MemoryTarget {
	nodes: Vec<Slot>,
	finished_cycles: usize,
}

/// Structural capture of a live subtree. Properties and listener keys are sorted, as their order isn't observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
	Text(String),
	Element {
		tag: String,
		namespace: Option<String>,
		properties: Vec<(String, String)>,
		listeners: Vec<String>,
		children: Vec<Snapshot>,
	},
}

impl MemoryTarget {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of nodes ever created, including detached ones.
	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	#[must_use]
	pub fn finished_cycles(&self) -> usize {
		self.finished_cycles
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		&self.nodes[node.0].children
	}

	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.nodes[node.0].content {
			Content::Text(text) => Some(text),
			Content::Element { .. } => None,
		}
	}

	#[must_use]
	pub fn property(&self, node: NodeId, key: &str) -> Option<&str> {
		match &self.nodes[node.0].content {
			Content::Element { properties, .. } => properties.get(key).map(String::as_str),
			Content::Text(_) => None,
		}
	}

	/// Calls each listener registered on `node` for `key`, in registration order. Returns how many were called.
	pub fn dispatch(&self, node: NodeId, key: &str, event: &dyn Any) -> usize {
		let handlers: Vec<Handler> = match &self.nodes[node.0].content {
			Content::Element { listeners, .. } => listeners.iter().filter(|(k, _)| k == key).map(|(_, handler)| handler.clone()).collect(),
			Content::Text(_) => Vec::new(),
		};
		for handler in &handlers {
			handler.call(event)
		}
		handlers.len()
	}

	#[must_use]
	pub fn snapshot(&self, node: NodeId) -> Snapshot {
		let slot = &self.nodes[node.0];
		match &slot.content {
			Content::Text(text) => Snapshot::Text(text.clone()),
			Content::Element {
				tag,
				namespace,
				properties,
				listeners,
			} => {
				let mut properties: Vec<_> = properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
				properties.sort();
				let mut listeners: Vec<_> = listeners.iter().map(|(k, _)| k.clone()).collect();
				listeners.sort();
				Snapshot::Element {
					tag: tag.clone(),
					namespace: namespace.clone(),
					properties,
					listeners,
					children: slot.children.iter().map(|&child| self.snapshot(child)).collect(),
				}
			}
		}
	}

	fn push(&mut self, content: Content) -> NodeId {
		self.nodes.push(Slot {
			content,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.nodes.len() - 1)
	}

	fn detach(&mut self, child: NodeId) {
		if let Some(parent) = self.nodes[child.0].parent.take() {
			self.nodes[parent.0].children.retain(|&c| c != child)
		}
	}
}

impl RenderTarget for MemoryTarget {
	type Node = NodeId;

	fn create_text(&mut self, text: &str) -> NodeId {
		self.push(Content::Text(text.to_owned()))
	}

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> NodeId {
		self.push(Content::Element {
			tag: tag.to_owned(),
			namespace: namespace.map(ToOwned::to_owned),
			properties: IndexMap::new(),
			listeners: Vec::new(),
		})
	}

	fn set_property(&mut self, node: &NodeId, key: &str, value: Option<&str>) {
		match &mut self.nodes[node.0].content {
			Content::Element { properties, .. } => match value {
				Some(value) => {
					properties.insert(key.to_owned(), value.to_owned());
				}
				None => {
					properties.shift_remove(key);
				}
			},
			Content::Text(_) => error!(key, value = ?value.map(redact), "Tried to set property on text node."),
		}
	}

	fn add_listener(&mut self, node: &NodeId, key: &str, handler: &Handler) {
		match &mut self.nodes[node.0].content {
			Content::Element { listeners, .. } => listeners.push((key.to_owned(), handler.clone())),
			Content::Text(_) => error!(key, "Tried to add listener to text node."),
		}
	}

	fn remove_listener(&mut self, node: &NodeId, key: &str, handler: &Handler) {
		match &mut self.nodes[node.0].content {
			Content::Element { listeners, .. } => match listeners.iter().position(|(k, h)| k == key && h == handler) {
				Some(position) => {
					listeners.remove(position);
				}
				None => error!(key, ?handler, "Tried to remove listener that isn't registered."),
			},
			Content::Text(_) => error!(key, "Tried to remove listener from text node."),
		}
	}

	fn update_text(&mut self, node: &NodeId, text: &str) {
		match &mut self.nodes[node.0].content {
			Content::Text(data) => {
				data.clear();
				data.push_str(text)
			}
			Content::Element { tag, .. } => error!(%tag, "Tried to update text of element."),
		}
	}

	fn parent(&self, node: &NodeId) -> Option<NodeId> {
		self.nodes[node.0].parent
	}

	fn child_at(&self, parent: &NodeId, position: usize) -> Option<NodeId> {
		self.nodes[parent.0].children.get(position).copied()
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, before: Option<&NodeId>) {
		self.detach(*child);
		let children = &mut self.nodes[parent.0].children;
		let position = match before {
			None => children.len(),
			Some(before) => match children.iter().position(|c| c == before) {
				Some(position) => position,
				None => {
					error!(?before, "Reference node isn't a child of the parent. Appending instead.");
					children.len()
				}
			},
		};
		children.insert(position, *child);
		self.nodes[child.0].parent = Some(*parent);
	}

	fn remove_child(&mut self, parent: &NodeId, child: &NodeId) {
		if self.nodes[child.0].parent == Some(*parent) {
			self.detach(*child)
		} else {
			error!(?parent, ?child, "Tried to remove a node from a parent it isn't attached to.")
		}
	}

	fn replace_child(&mut self, parent: &NodeId, old: &NodeId, new: &NodeId) {
		if self.nodes[old.0].parent != Some(*parent) {
			return error!(?parent, ?old, "Tried to replace a node in a parent it isn't attached to.");
		}
		self.detach(*new);
		let children = &mut self.nodes[parent.0].children;
		if let Some(position) = children.iter().position(|c| c == old) {
			children[position] = *new;
		}
		self.nodes[old.0].parent = None;
		self.nodes[new.0].parent = Some(*parent);
	}

	fn finish_cycle(&mut self) {
		self.finished_cycles += 1;
		trace!(nodes = self.nodes.len(), "Finished cycle.")
	}
}
