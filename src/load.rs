//! Reading existing DOM content back into [`VTree`]s, to adopt server-rendered markup as first snapshot.
//!
//! Loaded trees have no listeners. Attributes become properties.

use crate::tree::{Attribute, VNode, VTree};
use thiserror::Error;
use tracing::{instrument, trace};
use wasm_bindgen::JsCast;
use web_sys::{Element, NamedNodeMap, Node, NodeList, Text};

/// Elements in this namespace are loaded without one, matching [`VNode::new`].
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
	/// Comments, processing instructions and the like have no tree representation.
	/// Skipping them would shift the positions of their following siblings.
	#[error("unsupported DOM node {node_name:?}")]
	Unsupported { node_name: String },
}

/// # Errors
///
/// Iff `node` or any of its descendants is neither element nor text.
#[instrument]
pub fn load_node(node: &Node) -> Result<VTree, LoadError> {
	if let Some(element) = node.dyn_ref::<Element>() {
		load_element(element).map(VTree::from)
	} else if let Some(text) = node.dyn_ref::<Text>() {
		Ok(VTree::text(text.data()))
	} else {
		Err(LoadError::Unsupported { node_name: node.node_name() })
	}
}

/// # Errors
///
/// Iff any of the child nodes is neither element nor text.
pub fn load_child_nodes(child_nodes: &NodeList) -> Result<Vec<VTree>, LoadError> {
	(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).map(|child| load_node(&child)).collect()
}

/// # Errors
///
/// Iff any descendant is neither element nor text.
pub fn load_element(element: &Element) -> Result<VNode, LoadError> {
	let node: &Node = element.as_ref();
	let tag = element.local_name();
	let attributes = load_attributes(&element.attributes());
	let children = load_child_nodes(&node.child_nodes())?;
	trace!(%tag, children = children.len(), "Loaded element.");
	Ok(match element.namespace_uri() {
		Some(namespace) if namespace != XHTML_NAMESPACE => VNode::with_namespace(namespace, tag, attributes, children),
		_ => VNode::new(tag, attributes, children),
	})
}

#[must_use]
pub fn load_attributes(attributes: &NamedNodeMap) -> Vec<Attribute> {
	(0..attributes.length())
		.filter_map(|i| attributes.item(i))
		.map(|attribute| Attribute::property(attribute.name(), attribute.value()))
		.collect()
}
