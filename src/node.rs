//! The virtual tree.
//!
//! Nodes are plain descriptions until they are mounted, at which point they additionally carry their live surface handle
//! (and for elements the listeners they registered). Both are private runtime state:
//! They are only ever set by the [`Reconciler`](`crate::Reconciler`) and move along with the node when it is patched.

use crate::{
	component::{Component, ComponentType},
	surface::Surface,
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use indexmap::IndexMap;
use std::{borrow::Cow, rc::Rc};

/// A stable sibling identity across re-renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(String),
}
impl From<i64> for Key {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}
impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}
impl From<String> for Key {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

/// A plain attribute or style value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	/// Clears the attribute or style property instead of setting it.
	Null,
	Bool(bool),
	Number(f64),
	Str(String),
}
impl Scalar {
	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// The string that ends up on the surface, or [`None`] if the value clears.
	#[must_use]
	pub fn to_surface_value(&self) -> Option<Cow<'_, str>> {
		match self {
			Self::Null => None,
			Self::Bool(value) => Some(Cow::Borrowed(if *value { "true" } else { "false" })),
			Self::Number(value) => Some(Cow::Owned(value.to_string())),
			Self::Str(value) => Some(Cow::Borrowed(value.as_str())),
		}
	}
}
impl From<&str> for Scalar {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}
impl From<String> for Scalar {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}
impl From<bool> for Scalar {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<f64> for Scalar {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}
impl From<i64> for Scalar {
	#[allow(clippy::cast_precision_loss)]
	fn from(value: i64) -> Self {
		Self::Number(value as f64)
	}
}
impl<T: Into<Scalar>> From<Option<T>> for Scalar {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// Class names, either as one whitespace-separated string or as a list.
///
/// Both forms are compared by their token sets only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Class {
	Str(String),
	List(Vec<String>),
}
impl Class {
	/// Non-blank class tokens in order of appearance. May contain duplicates.
	pub fn tokens(&self) -> impl Iterator<Item = &str> {
		let (single, list) = match self {
			Self::Str(value) => (Some(value.as_str()), &[][..]),
			Self::List(values) => (None, values.as_slice()),
		};
		single.into_iter().chain(list.iter().map(String::as_str)).flat_map(str::split_whitespace)
	}
}
impl From<&str> for Class {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}
impl From<String> for Class {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}
impl From<Vec<String>> for Class {
	fn from(values: Vec<String>) -> Self {
		Self::List(values)
	}
}
impl From<Vec<&str>> for Class {
	fn from(values: Vec<&str>) -> Self {
		Self::List(values.into_iter().map(str::to_owned).collect())
	}
}
impl<const N: usize> From<[&str; N]> for Class {
	fn from(values: [&str; N]) -> Self {
		Self::List(values.iter().copied().map(str::to_owned).collect())
	}
}

/// An event handler with identity semantics.
///
/// Two [`Handler`]s are equal iff they are clones of the same allocation,
/// so a closure that is recreated on each render counts as a changed handler.
pub struct Handler<E>(Rc<dyn Fn(&E)>);
impl<E> Handler<E> {
	pub fn new(handler: impl 'static + Fn(&E)) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &E) {
		(self.0)(event)
	}

	/// The allocation address, which doubles as identity.
	#[must_use]
	pub fn addr(&self) -> usize {
		Rc::as_ptr(&self.0).cast::<()>() as usize
	}
}
impl<E> Clone for Handler<E> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}
impl<E> PartialEq for Handler<E> {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}
impl<E> Eq for Handler<E> {}
impl<E> Debug for Handler<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Handler({:#x})", self.addr())
	}
}

/// Element and component properties, with the special-cased keys pulled out of the plain attribute map.
pub struct Props<E> {
	pub key: Option<Key>,
	pub class: Option<Class>,
	pub style: IndexMap<String, Scalar>,
	pub on: IndexMap<String, Handler<E>>,
	pub attributes: IndexMap<String, Scalar>,
}
impl<E> Props<E> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			key: None,
			class: None,
			style: IndexMap::new(),
			on: IndexMap::new(),
			attributes: IndexMap::new(),
		}
	}

	#[must_use]
	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn class(mut self, class: impl Into<Class>) -> Self {
		self.class = Some(class.into());
		self
	}

	#[must_use]
	pub fn style(mut self, property: impl Into<String>, value: impl Into<Scalar>) -> Self {
		self.style.insert(property.into(), value.into());
		self
	}

	#[must_use]
	pub fn on(self, event: impl Into<String>, handler: impl 'static + Fn(&E)) -> Self {
		self.on_handler(event, Handler::new(handler))
	}

	#[must_use]
	pub fn on_handler(mut self, event: impl Into<String>, handler: Handler<E>) -> Self {
		self.on.insert(event.into(), handler);
		self
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}
}
impl<E> Default for Props<E> {
	fn default() -> Self {
		Self::new()
	}
}
impl<E> Clone for Props<E> {
	fn clone(&self) -> Self {
		Self {
			key: self.key.clone(),
			class: self.class.clone(),
			style: self.style.clone(),
			on: self.on.clone(),
			attributes: self.attributes.clone(),
		}
	}
}
impl<E> Debug for Props<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Props")
			.field("key", &self.key)
			.field("class", &self.class)
			.field("style", &self.style)
			.field("on", &self.on)
			.field("attributes", &self.attributes)
			.finish()
	}
}

pub enum Node<S: Surface> {
	Text(Text<S>),
	Element(Element<S>),
	Fragment(Fragment<S>),
	Component(ComponentRef<S>),
}

pub struct Text<S: Surface> {
	pub value: String,
	pub(crate) el: Option<S::Handle>,
}

pub struct Element<S: Surface> {
	pub tag: String,
	pub props: Props<S::Event>,
	pub children: Vec<Node<S>>,
	pub(crate) el: Option<S::Handle>,
	pub(crate) listeners: HashMap<String, S::Listener>,
}

/// Children spliced directly into the parent. A mounted fragment's handle is that parent.
pub struct Fragment<S: Surface> {
	pub children: Vec<Node<S>>,
	pub(crate) el: Option<S::Handle>,
}

/// An embedded component. Its `children` are handed over to the component instance when mounting or updating.
pub struct ComponentRef<S: Surface> {
	pub(crate) ty: ComponentType<S>,
	pub props: Props<S::Event>,
	pub children: Vec<Node<S>>,
	pub(crate) instance: Option<Box<dyn Component<S>>>,
}
impl<S: Surface> ComponentRef<S> {
	#[must_use]
	pub fn component_type(&self) -> ComponentType<S> {
		self.ty
	}
}

impl<S: Surface> Node<S> {
	pub fn text(value: impl Into<String>) -> Self {
		Self::Text(Text { value: value.into(), el: None })
	}

	pub fn element(tag: impl Into<String>, props: Props<S::Event>, children: impl IntoIterator<Item = Node<S>>) -> Self {
		Self::Element(Element {
			tag: tag.into(),
			props,
			children: children.into_iter().collect(),
			el: None,
			listeners: HashMap::new(),
		})
	}

	pub fn fragment(children: impl IntoIterator<Item = Node<S>>) -> Self {
		Self::Fragment(Fragment {
			children: children.into_iter().collect(),
			el: None,
		})
	}

	pub fn component<C: Component<S> + Default>(props: Props<S::Event>, children: impl IntoIterator<Item = Node<S>>) -> Self {
		Self::Component(ComponentRef {
			ty: ComponentType::of::<C>(),
			props,
			children: children.into_iter().collect(),
			instance: None,
		})
	}

	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Node::Text(_) => "text",
			Node::Element(_) => "element",
			Node::Fragment(_) => "fragment",
			Node::Component(_) => "component",
		}
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match self {
			Node::Element(Element { props, .. }) | Node::Component(ComponentRef { props, .. }) => props.key.as_ref(),
			Node::Text(_) | Node::Fragment(_) => None,
		}
	}

	/// Whether `other` describes the same logical node, so that `self` can be patched into it instead of being replaced.
	///
	/// Text content, attributes and children never affect equivalence.
	#[must_use]
	pub fn is_equivalent(&self, other: &Self) -> bool {
		match (self, other) {
			(Node::Text(_), Node::Text(_)) | (Node::Fragment(_), Node::Fragment(_)) => true,
			(Node::Element(a), Node::Element(b)) => a.tag == b.tag && a.props.key == b.props.key,
			(Node::Component(a), Node::Component(b)) => a.ty == b.ty && a.props.key == b.props.key,
			_ => false,
		}
	}

	#[must_use]
	pub fn is_mounted(&self) -> bool {
		match self {
			Node::Text(Text { el, .. }) | Node::Element(Element { el, .. }) | Node::Fragment(Fragment { el, .. }) => el.is_some(),
			Node::Component(component) => component.instance.is_some(),
		}
	}

	/// The node's own surface handle. For fragments, that's the container their children are spliced into.
	#[must_use]
	pub fn el(&self) -> Option<&S::Handle> {
		match self {
			Node::Text(Text { el, .. }) | Node::Element(Element { el, .. }) | Node::Fragment(Fragment { el, .. }) => el.as_ref(),
			Node::Component(_) => None,
		}
	}

	/// Child nodes as seen by the reconciler. Components keep theirs to themselves once mounted.
	#[must_use]
	pub fn children(&self) -> &[Node<S>] {
		match self {
			Node::Text(_) => &[],
			Node::Element(Element { children, .. }) | Node::Fragment(Fragment { children, .. }) | Node::Component(ComponentRef { children, .. }) => children,
		}
	}

	/// Appends the top-level surface handles this node occupies in its container, in order.
	pub fn collect_handles(&self, handles: &mut Vec<S::Handle>) {
		match self {
			Node::Text(Text { el, .. }) | Node::Element(Element { el, .. }) => handles.extend(el.iter().cloned()),
			Node::Fragment(fragment) => {
				for child in &fragment.children {
					child.collect_handles(handles)
				}
			}
			Node::Component(component) => {
				if let Some(instance) = &component.instance {
					handles.extend(instance.handles())
				}
			}
		}
	}

	#[must_use]
	pub fn first_handle(&self) -> Option<S::Handle> {
		match self {
			Node::Text(Text { el, .. }) | Node::Element(Element { el, .. }) => el.clone(),
			Node::Fragment(fragment) => fragment.children.iter().find_map(Node::first_handle),
			Node::Component(component) => component.instance.as_ref().and_then(|instance| instance.handles().into_iter().next()),
		}
	}

	#[must_use]
	pub fn last_handle(&self) -> Option<S::Handle> {
		match self {
			Node::Text(Text { el, .. }) | Node::Element(Element { el, .. }) => el.clone(),
			Node::Fragment(fragment) => fragment.children.iter().rev().find_map(Node::last_handle),
			Node::Component(component) => component.instance.as_ref().and_then(|instance| instance.handles().pop()),
		}
	}
}

impl<S: Surface> From<&str> for Node<S> {
	fn from(value: &str) -> Self {
		Self::text(value)
	}
}
impl<S: Surface> From<String> for Node<S> {
	fn from(value: String) -> Self {
		Self::text(value)
	}
}

impl<S: Surface> Debug for Node<S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Node::Text(text) => f.debug_struct("Text").field("value", &text.value).field("el", &text.el).finish(),
			Node::Element(element) => f
				.debug_struct("Element")
				.field("tag", &element.tag)
				.field("props", &element.props)
				.field("children", &element.children)
				.field("el", &element.el)
				.field("listeners", &element.listeners)
				.finish(),
			Node::Fragment(fragment) => f.debug_struct("Fragment").field("children", &fragment.children).field("el", &fragment.el).finish(),
			Node::Component(component) => f
				.debug_struct("Component")
				.field("type", &component.ty.name())
				.field("props", &component.props)
				.field("children", &component.children)
				.field("mounted", &component.instance.is_some())
				.finish(),
		}
	}
}
