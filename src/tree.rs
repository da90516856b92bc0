//! Immutable tree values, as produced fresh by a view function for each update cycle.
//!
//! Every non-leaf value caches its descendant count when it is constructed.
//! Since the fields are private and never mutated afterwards, a count can't go stale.

use core::{
	any::Any,
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
	iter::FromIterator,
};
use indexmap::IndexMap;
use std::rc::Rc;

/// An event handler attached to a node as listener.
///
/// Equality and hashing are by identity: Two [`Handler`]s are equal iff they were cloned from the same instance.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&dyn Any)>);
impl Handler {
	pub fn new(handler: impl 'static + Fn(&dyn Any)) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &dyn Any) {
		(self.0)(event)
	}

	/// Thin identity address. Stable for as long as any clone of this [`Handler`] is alive.
	#[must_use]
	pub fn addr(&self) -> *const () {
		Rc::as_ptr(&self.0).cast::<()>()
	}
}
impl PartialEq for Handler {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}
impl Eq for Handler {}
impl Hash for Handler {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.addr().hash(state)
	}
}
impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Handler").field(&self.addr()).finish()
	}
}

/// Remaps messages produced inside a [`Tagged`] subtree.
///
/// This crate only carries it. Invoking it is up to the caller's dispatch layer.
#[derive(Clone)]
pub struct Transform(Rc<dyn Fn(Box<dyn Any>) -> Box<dyn Any>>);
impl Transform {
	pub fn new(transform: impl 'static + Fn(Box<dyn Any>) -> Box<dyn Any>) -> Self {
		Self(Rc::new(transform))
	}

	pub fn call(&self, message: Box<dyn Any>) -> Box<dyn Any> {
		(self.0)(message)
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::as_ptr(&self.0).cast::<()>() == Rc::as_ptr(&other.0).cast::<()>()
	}
}
impl Debug for Transform {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Transform").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}

/// A single unpartitioned attribute, as written by a view function.
#[derive(Debug, Clone)]
pub enum Attribute {
	Listener { key: Rc<str>, handler: Handler },
	Property { key: Rc<str>, value: Rc<str> },
}
impl Attribute {
	pub fn listener(key: impl Into<Rc<str>>, handler: Handler) -> Self {
		Self::Listener { key: key.into(), handler }
	}

	pub fn property(key: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
		Self::Property {
			key: key.into(),
			value: value.into(),
		}
	}
}

/// Attributes partitioned into listeners and properties.
///
/// Both maps keep insertion order. A later attribute overwrites an earlier one with the same key in the same category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
	listeners: IndexMap<Rc<str>, Handler>,
	properties: IndexMap<Rc<str>, Rc<str>>,
}
impl Attributes {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn partition(attributes: impl IntoIterator<Item = Attribute>) -> Self {
		let mut partitioned = Self::new();
		for attribute in attributes {
			match attribute {
				Attribute::Listener { key, handler } => {
					partitioned.listeners.insert(key, handler);
				}
				Attribute::Property { key, value } => {
					partitioned.properties.insert(key, value);
				}
			}
		}
		partitioned
	}

	/// Listeners first, then properties, each in insertion order.
	pub fn flatten(&self) -> impl '_ + Iterator<Item = Attribute> {
		self.listeners
			.iter()
			.map(|(key, handler)| Attribute::Listener {
				key: key.clone(),
				handler: handler.clone(),
			})
			.chain(self.properties.iter().map(|(key, value)| Attribute::Property {
				key: key.clone(),
				value: value.clone(),
			}))
	}

	#[must_use]
	pub fn listeners(&self) -> &IndexMap<Rc<str>, Handler> {
		&self.listeners
	}

	#[must_use]
	pub fn properties(&self) -> &IndexMap<Rc<str>, Rc<str>> {
		&self.properties
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.listeners.is_empty() && self.properties.is_empty()
	}
}
impl<A: Into<Attribute>> FromIterator<A> for Attributes {
	fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
		Self::partition(iter.into_iter().map(Into::into))
	}
}

#[derive(Debug)]
pub struct VNode {
	tag: Rc<str>,
	namespace: Option<Rc<str>>,
	attributes: Attributes,
	children: Vec<VTree>,
	descendants_count: usize,
}
impl VNode {
	pub fn new(tag: impl Into<Rc<str>>, attributes: impl IntoIterator<Item = Attribute>, children: impl IntoIterator<Item = VTree>) -> Self {
		Self::from_parts(tag.into(), None, Attributes::partition(attributes), children.into_iter().collect())
	}

	pub fn with_namespace(
		namespace: impl Into<Rc<str>>,
		tag: impl Into<Rc<str>>,
		attributes: impl IntoIterator<Item = Attribute>,
		children: impl IntoIterator<Item = VTree>,
	) -> Self {
		Self::from_parts(tag.into(), Some(namespace.into()), Attributes::partition(attributes), children.into_iter().collect())
	}

	pub(crate) fn from_parts(tag: Rc<str>, namespace: Option<Rc<str>>, attributes: Attributes, children: Vec<VTree>) -> Self {
		let descendants_count = count_descendants(children.iter());
		Self {
			tag,
			namespace,
			attributes,
			children,
			descendants_count,
		}
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	#[must_use]
	pub fn attributes(&self) -> &Attributes {
		&self.attributes
	}

	#[must_use]
	pub fn children(&self) -> &[VTree] {
		&self.children
	}

	#[must_use]
	pub fn descendants_count(&self) -> usize {
		self.descendants_count
	}
}

/// Like [`VNode`], but each child carries a key that identifies it among its siblings.
///
/// Keys *should* be unique within one node. Duplicates are tolerated, but may be paired up wrongly while diffing.
#[derive(Debug)]
pub struct KeyedVNode {
	tag: Rc<str>,
	namespace: Option<Rc<str>>,
	attributes: Attributes,
	children: Vec<(Rc<str>, VTree)>,
	descendants_count: usize,
}
impl KeyedVNode {
	pub fn new<K: Into<Rc<str>>>(
		tag: impl Into<Rc<str>>,
		attributes: impl IntoIterator<Item = Attribute>,
		children: impl IntoIterator<Item = (K, VTree)>,
	) -> Self {
		Self::from_parts(tag.into(), None, Attributes::partition(attributes), children)
	}

	pub fn with_namespace<K: Into<Rc<str>>>(
		namespace: impl Into<Rc<str>>,
		tag: impl Into<Rc<str>>,
		attributes: impl IntoIterator<Item = Attribute>,
		children: impl IntoIterator<Item = (K, VTree)>,
	) -> Self {
		Self::from_parts(tag.into(), Some(namespace.into()), Attributes::partition(attributes), children)
	}

	fn from_parts<K: Into<Rc<str>>>(tag: Rc<str>, namespace: Option<Rc<str>>, attributes: Attributes, children: impl IntoIterator<Item = (K, VTree)>) -> Self {
		let children: Vec<_> = children.into_iter().map(|(key, child)| (key.into(), child)).collect();
		let descendants_count = count_descendants(children.iter().map(|(_, child)| child));
		Self {
			tag,
			namespace,
			attributes,
			children,
			descendants_count,
		}
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	#[must_use]
	pub fn attributes(&self) -> &Attributes {
		&self.attributes
	}

	#[must_use]
	pub fn children(&self) -> &[(Rc<str>, VTree)] {
		&self.children
	}

	#[must_use]
	pub fn descendants_count(&self) -> usize {
		self.descendants_count
	}

	/// Strips the keys, producing a plain node with the same tag, namespace, attributes and children.
	#[must_use]
	pub fn dekey(&self) -> VNode {
		VNode::from_parts(
			self.tag.clone(),
			self.namespace.clone(),
			Attributes::partition(self.attributes.flatten()),
			self.children.iter().map(|(_, child)| child.clone()).collect(),
		)
	}
}

/// A mapped subtree. It occupies its own preorder index, but shares its live node with `inner`.
#[derive(Debug)]
pub struct Tagged {
	transform: Transform,
	inner: VTree,
	descendants_count: usize,
}
impl Tagged {
	#[must_use]
	pub fn new(transform: Transform, inner: VTree) -> Self {
		let descendants_count = 1 + inner.descendants_count();
		Self {
			transform,
			inner,
			descendants_count,
		}
	}

	#[must_use]
	pub fn transform(&self) -> &Transform {
		&self.transform
	}

	#[must_use]
	pub fn inner(&self) -> &VTree {
		&self.inner
	}

	#[must_use]
	pub fn descendants_count(&self) -> usize {
		self.descendants_count
	}
}

fn count_descendants<'a>(children: impl ExactSizeIterator<Item = &'a VTree>) -> usize {
	let len = children.len();
	children.map(VTree::descendants_count).sum::<usize>() + len
}

/// One immutable tree value. Cloning is cheap and preserves identity.
#[derive(Debug, Clone)]
pub enum VTree {
	Text(Rc<str>),
	Node(Rc<VNode>),
	Keyed(Rc<KeyedVNode>),
	Tagged(Rc<Tagged>),
}
impl VTree {
	pub fn text(text: impl Into<Rc<str>>) -> Self {
		Self::Text(text.into())
	}

	pub fn node(tag: impl Into<Rc<str>>, attributes: impl IntoIterator<Item = Attribute>, children: impl IntoIterator<Item = VTree>) -> Self {
		Self::Node(Rc::new(VNode::new(tag, attributes, children)))
	}

	pub fn keyed<K: Into<Rc<str>>>(tag: impl Into<Rc<str>>, attributes: impl IntoIterator<Item = Attribute>, children: impl IntoIterator<Item = (K, VTree)>) -> Self {
		Self::Keyed(Rc::new(KeyedVNode::new(tag, attributes, children)))
	}

	#[must_use]
	pub fn tagged(transform: Transform, inner: VTree) -> Self {
		Self::Tagged(Rc::new(Tagged::new(transform, inner)))
	}

	/// Number of strict descendants. Text has none.
	#[must_use]
	pub fn descendants_count(&self) -> usize {
		match self {
			VTree::Text(_) => 0,
			VTree::Node(node) => node.descendants_count(),
			VTree::Keyed(keyed) => keyed.descendants_count(),
			VTree::Tagged(tagged) => tagged.descendants_count(),
		}
	}

	/// Identity equality, i.e. whether `other` was cloned from the same construction as `self`.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		match (self, other) {
			(VTree::Text(a), VTree::Text(b)) => Rc::ptr_eq(a, b),
			(VTree::Node(a), VTree::Node(b)) => Rc::ptr_eq(a, b),
			(VTree::Keyed(a), VTree::Keyed(b)) => Rc::ptr_eq(a, b),
			(VTree::Tagged(a), VTree::Tagged(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}

	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			VTree::Text(_) => "text",
			VTree::Node(_) => "node",
			VTree::Keyed(_) => "keyed node",
			VTree::Tagged(_) => "tagged",
		}
	}
}
impl From<VNode> for VTree {
	fn from(node: VNode) -> Self {
		Self::Node(Rc::new(node))
	}
}
impl From<KeyedVNode> for VTree {
	fn from(keyed: KeyedVNode) -> Self {
		Self::Keyed(Rc::new(keyed))
	}
}
impl From<Tagged> for VTree {
	fn from(tagged: Tagged) -> Self {
		Self::Tagged(Rc::new(tagged))
	}
}
