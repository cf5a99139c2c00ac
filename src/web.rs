//! A [`Surface`] over the browser DOM.
//!
//! Handlers are registered through one [`Closure`] per distinct [`Handler`], shared by all listeners that use it.
//! Closures are kept alive after their last listener is detached, since that may happen while one of them is running.
//! Call [`WebSurface::drop_released_handlers`] outside of event dispatch (for example after each render cycle) to free them.

use crate::{
	node::Handler,
	rc_map::{RcMap, RcMapError, Released},
	surface::Surface,
	Error, Result,
};
use core::fmt::{self, Debug, Formatter};
use js_sys::Function;
use tracing::{trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

pub struct WebSurface {
	document: web_sys::Document,
	handlers: RcMap<usize, u16, Closure<dyn Fn(web_sys::Event)>>,
}

/// Refers to the shared closure of the [`Handler`] it was attached with.
#[derive(Debug, PartialEq, Eq)]
pub struct WebListener {
	handler: usize,
}

impl WebSurface {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			handlers: RcMap::new(),
		}
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Frees the closures of handlers that are no longer attached anywhere.
	///
	/// # Panics
	///
	/// Not by itself, but dropping a closure while it's executing aborts that handler with a JavaScript exception.
	pub fn drop_released_handlers(&mut self) {
		let mut count = 0_usize;
		for (handler, closure) in self.handlers.drain_released() {
			trace!(handler, "Dropping handler closure.");
			drop(closure);
			count += 1;
		}
		if count > 0 {
			trace!(count, "Dropped released handler closures.");
		}
	}

	fn function(&self, handler: usize) -> Option<&Function> {
		self.handlers.get(&handler).map(|closure| closure.as_ref().unchecked_ref::<Function>())
	}
}

impl Debug for WebSurface {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebSurface").field("document", &self.document).finish_non_exhaustive()
	}
}

fn js_error(operation: &'static str, error: &JsValue) -> Error {
	Error::surface(operation, format!("{:?}", error))
}

fn count_error(operation: &'static str, error: RcMapError) -> Error {
	match error {
		RcMapError::UnknownKey => Error::surface(operation, "handler closure is not registered"),
		RcMapError::CountSaturated => Error::surface(operation, "too many listeners share this handler"),
	}
}

fn as_element<'a>(node: &'a web_sys::Node, operation: &'static str) -> Result<&'a web_sys::Element> {
	node.dyn_ref::<web_sys::Element>()
		.ok_or_else(|| Error::surface(operation, format!("expected an element, found {:?}", node.node_name())))
}

fn as_html_element<'a>(node: &'a web_sys::Node, operation: &'static str) -> Result<&'a web_sys::HtmlElement> {
	node.dyn_ref::<web_sys::HtmlElement>()
		.ok_or_else(|| Error::surface(operation, format!("expected an HTML element, found {:?}", node.node_name())))
}

impl Surface for WebSurface {
	type Handle = web_sys::Node;
	type Event = web_sys::Event;
	type Listener = WebListener;

	fn create_text(&mut self, value: &str) -> Result<web_sys::Node> {
		Ok(self.document.create_text_node(value).into())
	}

	fn create_element(&mut self, tag: &str) -> Result<web_sys::Node> {
		self.document
			.create_element(tag)
			.map(Into::into)
			.map_err(|error| js_error("create_element", &error))
	}

	fn insert_before(&mut self, parent: &web_sys::Node, child: &web_sys::Node, anchor: Option<&web_sys::Node>) -> Result<()> {
		parent
			.insert_before(child, anchor)
			.map(drop)
			.map_err(|error| js_error("insert_before", &error))
	}

	fn remove(&mut self, node: &web_sys::Node) -> Result<()> {
		let parent = node.parent_node().ok_or_else(|| Error::surface("remove", "node is not attached"))?;
		parent.remove_child(node).map(drop).map_err(|error| js_error("remove", &error))
	}

	fn parent_of(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn index_of(&self, parent: &web_sys::Node, child: &web_sys::Node) -> Option<usize> {
		let child_nodes = parent.child_nodes();
		(0..child_nodes.length()).position(|i| child_nodes.get(i).as_ref() == Some(child))
	}

	fn child_at(&self, parent: &web_sys::Node, index: usize) -> Option<web_sys::Node> {
		parent.child_nodes().get(u32::try_from(index).ok()?)
	}

	fn set_text(&mut self, node: &web_sys::Node, value: &str) -> Result<()> {
		let text = node
			.dyn_ref::<web_sys::CharacterData>()
			.ok_or_else(|| Error::surface("set_text", format!("expected character data, found {:?}", node.node_name())))?;
		text.set_data(value);
		Ok(())
	}

	fn set_attribute(&mut self, element: &web_sys::Node, name: &str, value: &str) -> Result<()> {
		as_element(element, "set_attribute")?
			.set_attribute(name, value)
			.map_err(|error| js_error("set_attribute", &error))
	}

	fn remove_attribute(&mut self, element: &web_sys::Node, name: &str) -> Result<()> {
		as_element(element, "remove_attribute")?
			.remove_attribute(name)
			.map_err(|error| js_error("remove_attribute", &error))
	}

	fn add_class(&mut self, element: &web_sys::Node, token: &str) -> Result<()> {
		as_element(element, "add_class")?
			.class_list()
			.add_1(token)
			.map_err(|error| js_error("add_class", &error))
	}

	fn remove_class(&mut self, element: &web_sys::Node, token: &str) -> Result<()> {
		as_element(element, "remove_class")?
			.class_list()
			.remove_1(token)
			.map_err(|error| js_error("remove_class", &error))
	}

	fn set_style(&mut self, element: &web_sys::Node, property: &str, value: &str) -> Result<()> {
		as_html_element(element, "set_style")?
			.style()
			.set_property(property, value)
			.map_err(|error| js_error("set_style", &error))
	}

	fn remove_style(&mut self, element: &web_sys::Node, property: &str) -> Result<()> {
		as_html_element(element, "remove_style")?
			.style()
			.remove_property(property)
			.map(drop)
			.map_err(|error| js_error("remove_style", &error))
	}

	fn add_listener(&mut self, element: &web_sys::Node, event: &str, handler: &Handler<web_sys::Event>) -> Result<WebListener> {
		let key = handler.addr();
		let closure = self
			.handlers
			.acquire(key, || {
				let handler = handler.clone();
				Closure::wrap(Box::new(move |event: web_sys::Event| handler.call(&event)) as Box<dyn Fn(web_sys::Event)>)
			})
			.map_err(|error| count_error("add_listener", error))?;

		if let Err(error) = element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
			if let Err(rollback) = self.handlers.release(&key) {
				warn!("Couldn't roll back handler reference after a failed attach: {:?}", rollback);
			}
			return Err(js_error("add_listener", &error));
		}
		Ok(WebListener { handler: key })
	}

	fn remove_listener(&mut self, element: &web_sys::Node, event: &str, listener: WebListener) -> Result<()> {
		let function = self
			.function(listener.handler)
			.ok_or_else(|| Error::surface("remove_listener", format!("unknown handler {:#x}", listener.handler)))?;
		element
			.remove_event_listener_with_callback(event, function)
			.map_err(|error| js_error("remove_listener", &error))?;
		match self.handlers.release(&listener.handler).map_err(|error| count_error("remove_listener", error))? {
			Released::Shared => {}
			Released::Parked => trace!(handler = listener.handler, "Parked handler closure."),
		}
		Ok(())
	}
}
