//! [`RenderTarget`] for the browser DOM, via [`web_sys`].

use crate::{
	rc_hash_map::RcHashMap,
	redact,
	render::RenderTarget,
	tree::Handler,
};
use core::convert::TryFrom;
use js_sys::{Function, Reflect};
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, warn, Level};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};

/// Properties that are mirrored into the live IDL attribute, as the content attribute only sets their *default*.
const LIVE_PROPERTIES: &[&str] = &["value", "checked"];

/// Creates and mutates nodes of one [***Document***](https://developer.mozilla.org/en-US/docs/Web/API/Document).
///
/// Listeners are shared: Each distinct [`Handler`] is wrapped into one [`Closure`], which is reference-counted across
/// all nodes it's registered on. Closures that became unused are freed at the end of each update cycle.
///
/// # Safety
///
/// Listeners that are still registered when this instance is dropped start throwing errors into
/// [***JavaScript***](https://developer.mozilla.org/en-US/docs/Web/JavaScript) when their event fires.
#[derive(Debug)]
pub struct DomTarget {
	document: web_sys::Document,
	closures: RcHashMap<Handler, u16, Closure<dyn Fn(web_sys::Event)>>,
}

impl DomTarget {
	#[must_use]
	#[instrument]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			closures: RcHashMap::new(),
		}
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Number of live [`Closure`]s, including ones that will be freed at the end of the current cycle.
	#[must_use]
	pub fn closure_count(&self) -> usize {
		self.closures.len()
	}

	/// On how many nodes `handler` is currently registered, across all event types.
	#[must_use]
	pub fn registration_count(&self, handler: &Handler) -> u16 {
		self.closures.count(handler).copied().unwrap_or(0)
	}

	fn get_or_create_closure<'a>(closures: &'a mut RcHashMap<Handler, u16, Closure<dyn Fn(web_sys::Event)>>, handler: &Handler) -> &'a Function {
		let closure: &'a Closure<dyn Fn(web_sys::Event)> = closures
			.increment_or_insert_with(handler.clone(), |handler| {
				trace!(?handler, "Creating closure.");
				let handler = handler.clone();
				Closure::wrap(Box::new(move |event: web_sys::Event| handler.call(&event)) as Box<dyn Fn(web_sys::Event)>)
			})
			.expect_throw("Too many (more than 65k) active registrations of the same `Handler`");
		closure.as_ref().unchecked_ref::<Function>()
	}
}

impl RenderTarget for DomTarget {
	type Node = web_sys::Node;

	fn create_text(&mut self, text: &str) -> web_sys::Node {
		self.document.create_text_node(text).into()
	}

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> web_sys::Node {
		let element = match namespace {
			Some(namespace) => self.document.create_element_ns(Some(namespace), tag),
			None => self.document.create_element(tag),
		};
		match element {
			Ok(element) => element.into(),
			Err(error) => {
				error!(tag, ?namespace, ?error, "Failed to create element. Inserting a placeholder comment instead.");
				self.document.create_comment(tag).into()
			}
		}
	}

	fn set_property(&mut self, node: &web_sys::Node, key: &str, value: Option<&str>) {
		let element = match node.dyn_ref::<web_sys::Element>() {
			Some(element) => element,
			None => return error!(key, ?node, "Expected to set property on `web_sys::Element`."),
		};

		match value {
			Some(value) => {
				if let Err(error) = element.set_attribute(key, value) {
					error!(key, value = redact(value), ?error, "Failed to set attribute.")
				}

				if LIVE_PROPERTIES.contains(&key) {
					let key_js = JsValue::from_str(key);
					let current = Reflect::get(element, &key_js).ok().and_then(|current| current.as_string());
					if current.as_deref() != Some(value) {
						if let Err(error) = Reflect::set(element, &key_js, &JsValue::from_str(value)) {
							error!(key, ?error, "Failed to update live property.")
						}
					}
				}
			}
			None => {
				if let Err(error) = element.remove_attribute(key) {
					error!(key, ?error, "Failed to remove attribute.")
				}
			}
		}
	}

	fn add_listener(&mut self, node: &web_sys::Node, key: &str, handler: &Handler) {
		let function = Self::get_or_create_closure(&mut self.closures, handler);
		let event_target: &web_sys::EventTarget = node.as_ref();
		if let Err(error) = event_target.add_event_listener_with_callback(key, function) {
			error!(key, ?error, "Failed to add event listener.")
		}
	}

	fn remove_listener(&mut self, node: &web_sys::Node, key: &str, handler: &Handler) {
		let closure = match self.closures.weak_decrement(handler) {
			Ok(Some(closure)) => closure,
			Ok(None) => return error!(key, ?handler, "Tried to remove a listener that was never added."),
			Err(_) => return error!(key, ?handler, "Tried to remove a listener more often than it was added."),
		};
		let event_target: &web_sys::EventTarget = node.as_ref();
		if let Err(error) = event_target.remove_event_listener_with_callback(key, closure.as_ref().unchecked_ref()) {
			error!(key, ?error, "Failed to remove event listener.")
		}
	}

	fn update_text(&mut self, node: &web_sys::Node, text: &str) {
		match node.dyn_ref::<web_sys::CharacterData>() {
			Some(character_data) => {
				if STATIC_MAX_LEVEL >= Level::TRACE {
					trace!(old = redact(&character_data.data()), new = redact(text), "Updating text.")
				}
				character_data.set_data(text)
			}
			None => error!(?node, "Expected to update `web_sys::CharacterData`."),
		}
	}

	fn parent(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn child_at(&self, parent: &web_sys::Node, position: usize) -> Option<web_sys::Node> {
		parent.child_nodes().get(u32::try_from(position).ok()?)
	}

	fn insert_before(&mut self, parent: &web_sys::Node, child: &web_sys::Node, before: Option<&web_sys::Node>) {
		if let Err(error) = parent.insert_before(child, before) {
			error!(?error, "Failed to insert node.")
		}
	}

	fn remove_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) {
		if let Err(error) = parent.remove_child(child) {
			error!(?error, "Failed to remove node.")
		}
	}

	fn replace_child(&mut self, parent: &web_sys::Node, old: &web_sys::Node, new: &web_sys::Node) {
		if let Err(error) = parent.replace_child(new, old) {
			error!(?error, "Failed to replace node.")
		}
	}

	/// Appends through a [***DocumentFragment***](https://developer.mozilla.org/en-US/docs/Web/API/DocumentFragment), so that the document is only touched once.
	fn append_children(&mut self, parent: &web_sys::Node, children: Vec<web_sys::Node>) {
		let fragment = self.document.create_document_fragment();
		for child in &children {
			if let Err(error) = fragment.append_child(child) {
				error!(?error, "Failed to append node to fragment.")
			}
		}
		if let Err(error) = parent.append_child(&fragment) {
			error!(?error, "Failed to append fragment.")
		}
	}

	fn finish_cycle(&mut self) {
		{
			let drain = self.closures.drain_weak();
			trace!("Freed {} closure(s).", drain.count());
		}
		info!("Closure count/cached capacity: {}/{}", self.closures.len(), self.closures.capacity());
		if STATIC_MAX_LEVEL >= Level::WARN && self.closures.capacity() >= 1000 && self.closures.len() * 4 < self.closures.capacity() {
			warn!(
				"The closure map's capacity is large ({}) compared to its use ({}).\n\
				This may point to handlers being recreated on each update instead of reused.",
				self.closures.capacity(),
				self.closures.len()
			)
		}
	}
}
