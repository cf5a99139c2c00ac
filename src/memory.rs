//! An arena-backed [`Surface`] that records every mutation.
//!
//! Useful for headless rendering and for checking exactly what a [`Reconciler`](`crate::Reconciler`) did.
//! Nodes are never freed: Removed nodes stay inspectable, but are no longer [attached](`MemorySurface::is_attached`).

use crate::{node::Handler, surface::Surface, Error, Result};
use indexmap::{IndexMap, IndexSet};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Proof of an attached listener. Deliberately not [`Clone`], since each one may only be detached once.
#[derive(Debug, PartialEq, Eq)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
	pub kind: String,
	pub target: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
	CreateText { node: NodeId },
	CreateElement { node: NodeId, tag: String },
	Insert { parent: NodeId, child: NodeId, anchor: Option<NodeId> },
	Remove { node: NodeId },
	SetText { node: NodeId, value: String },
	SetAttribute { node: NodeId, name: String, value: String },
	RemoveAttribute { node: NodeId, name: String },
	AddClass { node: NodeId, token: String },
	RemoveClass { node: NodeId, token: String },
	SetStyle { node: NodeId, property: String, value: String },
	RemoveStyle { node: NodeId, property: String },
	AddListener { node: NodeId, event: String },
	RemoveListener { node: NodeId, event: String },
}
impl Mutation {
	/// Whether this mutation creates, inserts/moves or removes a node.
	#[must_use]
	pub fn is_structural(&self) -> bool {
		matches!(self, Self::CreateText { .. } | Self::CreateElement { .. } | Self::Insert { .. } | Self::Remove { .. })
	}
}

#[derive(Debug)]
struct ElementData {
	tag: String,
	attributes: IndexMap<String, String>,
	classes: IndexSet<String>,
	style: IndexMap<String, String>,
	listeners: Vec<(u64, String, Handler<Event>)>,
	children: Vec<NodeId>,
}

#[derive(Debug)]
enum Content {
	Text(String),
	Element(ElementData),
}

#[derive(Debug)]
struct Slot {
	content: Content,
	parent: Option<NodeId>,
}

#[derive(Debug)]
pub struct MemorySurface {
	slots: Vec<Slot>,
	root: NodeId,
	next_listener: u64,
	mutations: Vec<Mutation>,
}

impl Default for MemorySurface {
	fn default() -> Self {
		Self::new()
	}
}

impl MemorySurface {
	/// Creates a surface with a single empty `<root>` element, which isn't recorded as a mutation.
	#[must_use]
	pub fn new() -> Self {
		Self {
			slots: vec![Slot {
				content: Content::Element(ElementData::new("root")),
				parent: None,
			}],
			root: NodeId(0),
			next_listener: 0,
			mutations: Vec::new(),
		}
	}

	#[must_use]
	pub fn root(&self) -> NodeId {
		self.root
	}

	#[must_use]
	pub fn mutations(&self) -> &[Mutation] {
		&self.mutations
	}

	pub fn take_mutations(&mut self) -> Vec<Mutation> {
		std::mem::take(&mut self.mutations)
	}

	#[must_use]
	pub fn tag(&self, node: NodeId) -> Option<&str> {
		self.element(node).map(|element| element.tag.as_str())
	}

	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.slots.get(node.0)?.content {
			Content::Text(text) => Some(text),
			Content::Element(_) => None,
		}
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		self.element(node).map_or(&[], |element| &element.children)
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		self.element(node)?.attributes.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn classes(&self, node: NodeId) -> Vec<&str> {
		self.element(node).map_or_else(Vec::new, |element| element.classes.iter().map(String::as_str).collect())
	}

	#[must_use]
	pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
		self.element(node)?.style.get(property).map(String::as_str)
	}

	#[must_use]
	pub fn listener_count(&self, node: NodeId) -> usize {
		self.element(node).map_or(0, |element| element.listeners.len())
	}

	/// Listeners attached anywhere on this surface, including on detached nodes.
	#[must_use]
	pub fn total_listener_count(&self) -> usize {
		self.slots
			.iter()
			.map(|slot| match &slot.content {
				Content::Element(element) => element.listeners.len(),
				Content::Text(_) => 0,
			})
			.sum()
	}

	/// Whether `node` is (transitively) inside [`root`](`MemorySurface::root`).
	#[must_use]
	pub fn is_attached(&self, node: NodeId) -> bool {
		let mut current = Some(node);
		while let Some(id) = current {
			if id == self.root {
				return true;
			}
			current = self.slots.get(id.0).and_then(|slot| slot.parent);
		}
		false
	}

	/// Serializes `node` and its subtree as HTML-ish markup.
	#[must_use]
	pub fn markup(&self, node: NodeId) -> String {
		let mut markup = String::new();
		self.write_markup(node, &mut markup);
		markup
	}

	/// Serializes the children of `node`.
	#[must_use]
	pub fn inner_markup(&self, node: NodeId) -> String {
		let mut markup = String::new();
		for &child in self.children(node) {
			self.write_markup(child, &mut markup)
		}
		markup
	}

	/// Invokes the handlers attached to `target` for `kind`, in attachment order.
	///
	/// Returns `false` (and warns) if there are none, which is harmless as far as reconciliation is concerned.
	pub fn dispatch(&self, target: NodeId, kind: &str) -> bool {
		let handlers: Vec<_> = self.element(target).map_or_else(Vec::new, |element| {
			element
				.listeners
				.iter()
				.filter(|(_, event, _)| event == kind)
				.map(|(_, _, handler)| handler.clone())
				.collect()
		});
		if handlers.is_empty() {
			warn!("No listener for {:?} on {:?}.", kind, target);
			return false;
		}
		let event = Event { kind: kind.to_owned(), target };
		for handler in handlers {
			handler.call(&event)
		}
		true
	}

	fn write_markup(&self, node: NodeId, markup: &mut String) {
		match self.slots.get(node.0).map(|slot| &slot.content) {
			None => {}
			Some(Content::Text(text)) => markup.push_str(&escape(text)),
			Some(Content::Element(element)) => {
				markup.push('<');
				markup.push_str(&element.tag);
				if !element.classes.is_empty() {
					let classes: Vec<&str> = element.classes.iter().map(String::as_str).collect();
					push_attribute(markup, "class", &classes.join(" "));
				}
				for (name, value) in &element.attributes {
					push_attribute(markup, name, value);
				}
				if !element.style.is_empty() {
					let style: Vec<String> = element.style.iter().map(|(property, value)| format!("{}: {};", property, value)).collect();
					push_attribute(markup, "style", &style.join(" "));
				}
				markup.push('>');
				for &child in &element.children {
					self.write_markup(child, markup)
				}
				markup.push_str("</");
				markup.push_str(&element.tag);
				markup.push('>');
			}
		}
	}

	fn element(&self, node: NodeId) -> Option<&ElementData> {
		match &self.slots.get(node.0)?.content {
			Content::Element(element) => Some(element),
			Content::Text(_) => None,
		}
	}

	fn slot(&self, node: NodeId, operation: &'static str) -> Result<&Slot> {
		self.slots.get(node.0).ok_or_else(|| Error::surface(operation, format!("unknown node {:?}", node)))
	}

	fn element_mut(&mut self, node: NodeId, operation: &'static str) -> Result<&mut ElementData> {
		match self.slots.get_mut(node.0).map(|slot| &mut slot.content) {
			Some(Content::Element(element)) => Ok(element),
			Some(Content::Text(_)) => Err(Error::surface(operation, format!("{:?} is not an element", node))),
			None => Err(Error::surface(operation, format!("unknown node {:?}", node))),
		}
	}

	fn push(&mut self, content: Content) -> NodeId {
		let id = NodeId(self.slots.len());
		self.slots.push(Slot { content, parent: None });
		id
	}

	fn detach(&mut self, node: NodeId) -> Option<NodeId> {
		let parent = self.slots.get_mut(node.0)?.parent.take()?;
		if let Some(Content::Element(element)) = self.slots.get_mut(parent.0).map(|slot| &mut slot.content) {
			element.children.retain(|&child| child != node);
		}
		Some(parent)
	}

	fn record(&mut self, mutation: Mutation) {
		trace!(?mutation);
		self.mutations.push(mutation);
	}
}

impl ElementData {
	fn new(tag: &str) -> Self {
		Self {
			tag: tag.to_owned(),
			attributes: IndexMap::new(),
			classes: IndexSet::new(),
			style: IndexMap::new(),
			listeners: Vec::new(),
			children: Vec::new(),
		}
	}
}

impl Surface for MemorySurface {
	type Handle = NodeId;
	type Event = Event;
	type Listener = ListenerId;

	fn create_text(&mut self, value: &str) -> Result<NodeId> {
		let node = self.push(Content::Text(value.to_owned()));
		self.record(Mutation::CreateText { node });
		Ok(node)
	}

	fn create_element(&mut self, tag: &str) -> Result<NodeId> {
		let node = self.push(Content::Element(ElementData::new(tag)));
		self.record(Mutation::CreateElement { node, tag: tag.to_owned() });
		Ok(node)
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, anchor: Option<&NodeId>) -> Result<()> {
		let (parent, child) = (*parent, *child);
		self.slot(child, "insert_before")?;
		self.element_mut(parent, "insert_before")?;

		let mut ancestor = Some(parent);
		while let Some(id) = ancestor {
			if id == child {
				return Err(Error::surface("insert_before", format!("{:?} would become its own ancestor", child)));
			}
			ancestor = self.slots[id.0].parent;
		}

		// Inserting a node before itself keeps it in place.
		let anchor = match anchor {
			Some(&anchor) if anchor == child => self.next_sibling(&child),
			anchor => anchor.copied(),
		};
		if let Some(anchor) = anchor {
			if self.slots.get(anchor.0).and_then(|slot| slot.parent) != Some(parent) {
				return Err(Error::surface("insert_before", format!("{:?} is not a child of {:?}", anchor, parent)));
			}
		}

		self.detach(child);
		let element = self.element_mut(parent, "insert_before")?;
		let index = match anchor {
			Some(anchor) => element.children.iter().position(|&sibling| sibling == anchor).unwrap_or(element.children.len()),
			None => element.children.len(),
		};
		element.children.insert(index, child);
		self.slots[child.0].parent = Some(parent);
		self.record(Mutation::Insert { parent, child, anchor });
		Ok(())
	}

	fn remove(&mut self, node: &NodeId) -> Result<()> {
		self.slot(*node, "remove")?;
		if self.detach(*node).is_none() {
			return Err(Error::surface("remove", format!("{:?} is not attached", node)));
		}
		self.record(Mutation::Remove { node: *node });
		Ok(())
	}

	fn parent_of(&self, node: &NodeId) -> Option<NodeId> {
		self.slots.get(node.0)?.parent
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let siblings = self.children(self.parent_of(node)?);
		let index = siblings.iter().position(|sibling| sibling == node)?;
		siblings.get(index + 1).copied()
	}

	fn index_of(&self, parent: &NodeId, child: &NodeId) -> Option<usize> {
		self.children(*parent).iter().position(|sibling| sibling == child)
	}

	fn child_at(&self, parent: &NodeId, index: usize) -> Option<NodeId> {
		self.children(*parent).get(index).copied()
	}

	fn set_text(&mut self, node: &NodeId, value: &str) -> Result<()> {
		match self.slots.get_mut(node.0).map(|slot| &mut slot.content) {
			Some(Content::Text(text)) => {
				value.clone_into(text);
			}
			_ => return Err(Error::surface("set_text", format!("{:?} is not a text node", node))),
		}
		self.record(Mutation::SetText { node: *node, value: value.to_owned() });
		Ok(())
	}

	fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) -> Result<()> {
		self.element_mut(*element, "set_attribute")?.attributes.insert(name.to_owned(), value.to_owned());
		self.record(Mutation::SetAttribute {
			node: *element,
			name: name.to_owned(),
			value: value.to_owned(),
		});
		Ok(())
	}

	fn remove_attribute(&mut self, element: &NodeId, name: &str) -> Result<()> {
		self.element_mut(*element, "remove_attribute")?.attributes.shift_remove(name);
		self.record(Mutation::RemoveAttribute { node: *element, name: name.to_owned() });
		Ok(())
	}

	fn add_class(&mut self, element: &NodeId, token: &str) -> Result<()> {
		self.element_mut(*element, "add_class")?.classes.insert(token.to_owned());
		self.record(Mutation::AddClass { node: *element, token: token.to_owned() });
		Ok(())
	}

	fn remove_class(&mut self, element: &NodeId, token: &str) -> Result<()> {
		self.element_mut(*element, "remove_class")?.classes.shift_remove(token);
		self.record(Mutation::RemoveClass { node: *element, token: token.to_owned() });
		Ok(())
	}

	fn set_style(&mut self, element: &NodeId, property: &str, value: &str) -> Result<()> {
		self.element_mut(*element, "set_style")?.style.insert(property.to_owned(), value.to_owned());
		self.record(Mutation::SetStyle {
			node: *element,
			property: property.to_owned(),
			value: value.to_owned(),
		});
		Ok(())
	}

	fn remove_style(&mut self, element: &NodeId, property: &str) -> Result<()> {
		self.element_mut(*element, "remove_style")?.style.shift_remove(property);
		self.record(Mutation::RemoveStyle {
			node: *element,
			property: property.to_owned(),
		});
		Ok(())
	}

	fn add_listener(&mut self, element: &NodeId, event: &str, handler: &Handler<Event>) -> Result<ListenerId> {
		let id = self.next_listener;
		self.element_mut(*element, "add_listener")?.listeners.push((id, event.to_owned(), handler.clone()));
		self.next_listener += 1;
		self.record(Mutation::AddListener { node: *element, event: event.to_owned() });
		Ok(ListenerId(id))
	}

	fn remove_listener(&mut self, element: &NodeId, event: &str, listener: ListenerId) -> Result<()> {
		let listeners = &mut self.element_mut(*element, "remove_listener")?.listeners;
		let index = listeners
			.iter()
			.position(|(id, name, _)| *id == listener.0 && name == event)
			.ok_or_else(|| Error::surface("remove_listener", format!("{:?} is not attached for {:?}", listener, event)))?;
		listeners.remove(index);
		self.record(Mutation::RemoveListener { node: *element, event: event.to_owned() });
		Ok(())
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn push_attribute(markup: &mut String, name: &str, value: &str) {
	markup.push(' ');
	markup.push_str(name);
	markup.push_str("=\"");
	markup.push_str(&escape(value).replace('"', "&quot;"));
	markup.push('"');
}
