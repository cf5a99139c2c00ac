use crate::{
	node::{ComponentRef, Element, Fragment, Node, Props, Scalar, Text},
	sequence::{self, Operation},
	surface::Surface,
	temp_set::TempTokenSets,
	Error, Result,
};
use core::mem;
use hashbrown::HashMap;
use indexmap::IndexMap;
use tracing::{debug, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
	/// How deeply nested a tree may be before reconciliation gives up with [`Error::DepthLimit`].
	pub depth_limit: usize,
}
impl Default for Options {
	fn default() -> Self {
		Self { depth_limit: 1024 }
	}
}

/// Owns a [`Surface`] for the duration of its render cycles and reconciles [`Node`] trees onto it.
///
/// # Correct Use
///
/// Each [`Node`] returned from [`mount`](`Reconciler::mount`) or [`patch`](`Reconciler::patch`) is the *only* record
/// of the handles and listeners it holds. Pass it back in as the previous tree on the next cycle, or [`destroy`](`Reconciler::destroy`) it.
/// Dropping it instead leaks the surface nodes it describes.
///
/// Nothing else should mutate the reconciled region of the surface between cycles.
#[derive(Debug)]
pub struct Reconciler<S: Surface> {
	surface: S,
	options: Options,
	depth: usize,
	class_diff_sets: TempTokenSets,
}

impl<S: Surface> Reconciler<S> {
	#[must_use]
	pub fn new(surface: S) -> Self {
		Self::with_options(surface, Options::default())
	}

	#[must_use]
	pub fn with_options(surface: S, options: Options) -> Self {
		Self {
			surface,
			options,
			depth: 0,
			class_diff_sets: TempTokenSets::new(),
		}
	}

	pub fn surface(&self) -> &S {
		&self.surface
	}

	pub fn surface_mut(&mut self) -> &mut S {
		&mut self.surface
	}

	pub fn into_surface(self) -> S {
		self.surface
	}

	pub fn options(&self) -> Options {
		self.options
	}

	/// Mounts `node` into `container` at child `index`, or appends it if `index` is [`None`] or past the end.
	///
	/// # Errors
	///
	/// [`Error::AlreadyMounted`] if any part of `node` is already mounted, or whatever the surface reports.
	#[instrument(skip(self, node))]
	pub fn mount(&mut self, node: Node<S>, container: &S::Handle, index: Option<usize>) -> Result<Node<S>> {
		let anchor = index.and_then(|index| self.surface.child_at(container, index));
		self.mount_before(node, container, anchor.as_ref())
	}

	/// Mounts `node` into `container` immediately before `anchor`, or at the end.
	///
	/// # Errors
	///
	/// See [`Reconciler::mount`].
	pub fn mount_before(&mut self, node: Node<S>, container: &S::Handle, anchor: Option<&S::Handle>) -> Result<Node<S>> {
		self.mount_node(node, container, anchor, self.depth)
	}

	/// Reconciles the surface inside `container` from `old` (mounted there earlier, or [`None`] if nothing is yet) to `new`,
	/// and returns `new` with the surface handles it inherited or created.
	///
	/// If `old` and `new` aren't [equivalent](`Node::is_equivalent`), `old` is destroyed and `new` is mounted in its place.
	///
	/// # Errors
	///
	/// [`Error::NotMounted`] or [`Error::ForeignContainer`] if `old` isn't mounted into `container`,
	/// [`Error::DepthLimit`] for overly deep trees, or whatever the surface reports.
	/// The surface is left in an unspecified state in that case.
	#[instrument(skip(self, old, new))]
	pub fn patch(&mut self, old: Option<Node<S>>, new: Node<S>, container: &S::Handle) -> Result<Node<S>> {
		let old = match old {
			Some(old) => old,
			None => {
				trace!("Nothing mounted yet.");
				return self.mount(new, container, None);
			}
		};

		self.check_mounted_into(&old, container)?;

		let patched = if old.is_equivalent(&new) {
			let anchor = old.last_handle().and_then(|last| self.surface.next_sibling(&last));
			self.patch_before(old, new, container, anchor.as_ref())?
		} else {
			let index = old.first_handle().and_then(|first| self.surface.index_of(container, &first));
			trace!(?index, "Replacing root.");
			self.destroy(old)?;
			self.mount(new, container, index)?
		};

		if STATIC_MAX_LEVEL >= Level::WARN && self.class_diff_sets.capacity() >= 200 {
			warn!(
				"The class diff heap capacity is large ({}).\n\
				This may point to elements with very long class lists.",
				self.class_diff_sets.capacity()
			)
		}
		Ok(patched)
	}

	/// Patches `old`, which is mounted into `container` and followed by `anchor` (if any), into `new`.
	///
	/// # Errors
	///
	/// See [`Reconciler::patch`].
	pub fn patch_before(&mut self, old: Node<S>, new: Node<S>, container: &S::Handle, anchor: Option<&S::Handle>) -> Result<Node<S>> {
		self.patch_node(old, new, container, anchor, self.depth)
	}

	/// Removes `node` from the surface and detaches all listeners it registered, recursively.
	///
	/// # Errors
	///
	/// [`Error::NotMounted`] if `node` isn't mounted, or whatever the surface reports.
	#[instrument(skip(self, node))]
	pub fn destroy(&mut self, node: Node<S>) -> Result<()> {
		self.destroy_node(node, self.depth)
	}

	fn check_mounted_into(&self, old: &Node<S>, container: &S::Handle) -> Result<()> {
		if !old.is_mounted() {
			return Err(Error::NotMounted { kind: old.kind() });
		}
		let parent = match old {
			Node::Fragment(fragment) => fragment.el.clone(),
			_ => match old.first_handle() {
				Some(first) => self.surface.parent_of(&first),
				// An empty component has nothing to check against.
				None => return Ok(()),
			},
		};
		match parent {
			Some(parent) if &parent == container => Ok(()),
			_ => Err(Error::ForeignContainer),
		}
	}

	fn enter(&self, depth: usize) -> Result<usize> {
		if depth >= self.options.depth_limit {
			return Err(Error::DepthLimit { limit: self.options.depth_limit });
		}
		Ok(depth + 1)
	}

	/// Runs a component callback with the reconciler's entry depth set to `depth`.
	fn delegate<R>(&mut self, depth: usize, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
		let outer = mem::replace(&mut self.depth, depth);
		let result = f(self);
		self.depth = outer;
		result
	}

	#[instrument(skip(self, node))]
	fn mount_node(&mut self, node: Node<S>, parent: &S::Handle, anchor: Option<&S::Handle>, depth: usize) -> Result<Node<S>> {
		let depth = self.enter(depth)?;
		match node {
			Node::Text(mut text) => {
				let span = trace_span!("Mounting text", value = redact(&text.value));
				let _enter = span.enter();
				if text.el.is_some() {
					return Err(Error::AlreadyMounted { kind: "text" });
				}
				let el = self.surface.create_text(&text.value)?;
				self.surface.insert_before(parent, &el, anchor)?;
				text.el = Some(el);
				Ok(Node::Text(text))
			}

			Node::Element(mut element) => {
				let span = trace_span!("Mounting element", tag = element.tag.as_str());
				let _enter = span.enter();
				if element.el.is_some() {
					return Err(Error::AlreadyMounted { kind: "element" });
				}
				let el = self.surface.create_element(&element.tag)?;
				self.surface.insert_before(parent, &el, anchor)?;
				self.update_props(&el, &Props::new(), &element.props, &mut element.listeners)?;
				let children = mem::take(&mut element.children);
				element.children = self.mount_children(children, &el, None, depth)?;
				element.el = Some(el);
				Ok(Node::Element(element))
			}

			Node::Fragment(mut fragment) => {
				let span = trace_span!("Mounting fragment", "children.len()" = fragment.children.len());
				let _enter = span.enter();
				if fragment.el.is_some() {
					return Err(Error::AlreadyMounted { kind: "fragment" });
				}
				let children = mem::take(&mut fragment.children);
				fragment.children = self.mount_children(children, parent, anchor, depth)?;
				fragment.el = Some(parent.clone());
				Ok(Node::Fragment(fragment))
			}

			Node::Component(mut component) => {
				let span = trace_span!("Mounting component", component = component.ty.name());
				let _enter = span.enter();
				if component.instance.is_some() {
					return Err(Error::AlreadyMounted { kind: "component" });
				}
				let mut instance = (component.ty.create)();
				let children = mem::take(&mut component.children);
				let props = &component.props;
				self.delegate(depth, |this| instance.mount(this, props, children, parent, anchor))?;
				component.instance = Some(instance);
				Ok(Node::Component(component))
			}
		}
	}

	fn mount_children(&mut self, children: Vec<Node<S>>, parent: &S::Handle, anchor: Option<&S::Handle>, depth: usize) -> Result<Vec<Node<S>>> {
		children.into_iter().map(|child| self.mount_node(child, parent, anchor, depth)).collect()
	}

	/// `anchor` is the handle following `old`'s last node, if any.
	#[instrument(skip(self, old, new))]
	fn patch_node(&mut self, old: Node<S>, new: Node<S>, parent: &S::Handle, anchor: Option<&S::Handle>, depth: usize) -> Result<Node<S>> {
		if !old.is_equivalent(&new) {
			return self.replace(old, new, parent, anchor, depth);
		}

		let depth = self.enter(depth)?;
		match (old, new) {
			(Node::Text(old), Node::Text(mut new)) => {
				let span = trace_span!("Patching text", old = redact(&old.value), new = redact(&new.value));
				let _enter = span.enter();
				let el = old.el.ok_or(Error::NotMounted { kind: "text" })?;
				if old.value != new.value {
					self.surface.set_text(&el, &new.value)?;
				}
				new.el = Some(el);
				Ok(Node::Text(new))
			}

			(Node::Element(old), Node::Element(mut new)) => {
				let span = trace_span!("Patching element", tag = new.tag.as_str());
				let _enter = span.enter();
				let Element {
					props: old_props,
					children: old_children,
					el,
					listeners,
					..
				} = old;
				let el = el.ok_or(Error::NotMounted { kind: "element" })?;
				new.listeners = listeners;
				self.update_props(&el, &old_props, &new.props, &mut new.listeners)?;
				let children = mem::take(&mut new.children);
				new.children = self.reconcile_children(old_children, children, &el, None, depth)?;
				new.el = Some(el);
				Ok(Node::Element(new))
			}

			(Node::Fragment(old), Node::Fragment(mut new)) => {
				let span = trace_span!("Patching fragment", "old.children.len()" = old.children.len(), "new.children.len()" = new.children.len());
				let _enter = span.enter();
				if old.el.is_none() {
					return Err(Error::NotMounted { kind: "fragment" });
				}
				let children = mem::take(&mut new.children);
				new.children = self.reconcile_children(old.children, children, parent, anchor, depth)?;
				new.el = Some(parent.clone());
				Ok(Node::Fragment(new))
			}

			(Node::Component(old), Node::Component(mut new)) => {
				let span = trace_span!("Patching component", component = new.ty.name());
				let _enter = span.enter();
				let mut instance = old.instance.ok_or(Error::NotMounted { kind: "component" })?;
				let children = mem::take(&mut new.children);
				let props = &new.props;
				self.delegate(depth, |this| instance.update(this, props, children, parent, anchor))?;
				new.instance = Some(instance);
				Ok(Node::Component(new))
			}

			(old, new) => self.replace(old, new, parent, anchor, depth),
		}
	}

	fn replace(&mut self, old: Node<S>, new: Node<S>, parent: &S::Handle, anchor: Option<&S::Handle>, depth: usize) -> Result<Node<S>> {
		let span = trace_span!("Replacing non-equivalent node", old = old.kind(), new = new.kind());
		let _enter = span.enter();

		if STATIC_MAX_LEVEL >= Level::DEBUG {
			if let (Node::Element(a), Node::Element(b)) = (&old, &new) {
				if a.tag != b.tag && a.tag.eq_ignore_ascii_case(&b.tag) {
					debug!("Recreating element due to different tag name casing: {:?} -> {:?}", a.tag, b.tag)
				}
			}
		}

		self.destroy_node(old, depth)?;
		self.mount_node(new, parent, anchor, depth)
	}

	/// Reconciles `old` (mounted into `parent` and followed by `end`, if any) into `new` via the keyed sequence diff.
	fn reconcile_children(&mut self, old: Vec<Node<S>>, new: Vec<Node<S>>, parent: &S::Handle, end: Option<&S::Handle>, depth: usize) -> Result<Vec<Node<S>>> {
		if old.is_empty() && new.is_empty() {
			return Ok(Vec::new());
		}

		let span = trace_span!("Reconciling children", "old.len()" = old.len(), "new.len()" = new.len());
		let _enter = span.enter();

		let plan = Plan::new(&sequence::diff_sequence(&old, &new, Node::is_equivalent));
		debug_assert_eq!(plan.placements.len(), new.len());
		debug!(
			leading_removals = plan.leading_removals.len(),
			placements = plan.placements.len(),
			trailing_removals = plan.trailing_removals.len(),
			"Planned child list."
		);

		let mut working = old;
		for &index in &plan.leading_removals {
			self.destroy_node(working.remove(index), depth)?;
		}

		for (index, (placement, new_child)) in plan.placements.into_iter().zip(new).enumerate() {
			let placed = match placement {
				Placement::Add => {
					let anchor = first_handle(&working[index..], end);
					self.mount_node(new_child, parent, anchor.as_ref(), depth)?
				}
				Placement::Move { from } => {
					let moving = working.remove(from);
					let anchor = first_handle(&working[index..], end);
					let mut handles = Vec::new();
					moving.collect_handles(&mut handles);
					trace!(from, to = index, handles = handles.len(), "Moving child.");
					for handle in &handles {
						self.surface.insert_before(parent, handle, anchor.as_ref())?;
					}
					self.patch_node(moving, new_child, parent, anchor.as_ref(), depth)?
				}
				Placement::Stay => {
					let staying = working.remove(index);
					let anchor = first_handle(&working[index..], end);
					self.patch_node(staying, new_child, parent, anchor.as_ref(), depth)?
				}
			};
			working.insert(index, placed);
		}

		for &index in &plan.trailing_removals {
			trace!(index, "Removing surplus child.");
			self.destroy_node(working.remove(index), depth)?;
		}

		Ok(working)
	}

	#[instrument(skip(self, node))]
	fn destroy_node(&mut self, node: Node<S>, depth: usize) -> Result<()> {
		let depth = self.enter(depth)?;
		match node {
			Node::Text(text) => {
				let span = trace_span!("Destroying text", value = redact(&text.value));
				let _enter = span.enter();
				let el = text.el.ok_or(Error::NotMounted { kind: "text" })?;
				self.surface.remove(&el)
			}

			Node::Element(Element { tag, children, el, listeners, .. }) => {
				let span = trace_span!("Destroying element", tag = tag.as_str());
				let _enter = span.enter();
				let el = el.ok_or(Error::NotMounted { kind: "element" })?;
				self.detach_listeners(&el, listeners)?;
				for child in children {
					self.release_node(child, depth)?;
				}
				self.surface.remove(&el)
			}

			Node::Fragment(Fragment { children, el }) => {
				let span = trace_span!("Destroying fragment", "children.len()" = children.len());
				let _enter = span.enter();
				if el.is_none() {
					return Err(Error::NotMounted { kind: "fragment" });
				}
				for child in children {
					self.destroy_node(child, depth)?;
				}
				Ok(())
			}

			Node::Component(ComponentRef { ty, instance, .. }) => {
				let span = trace_span!("Destroying component", component = ty.name());
				let _enter = span.enter();
				let mut instance = instance.ok_or(Error::NotMounted { kind: "component" })?;
				self.delegate(depth, |this| instance.destroy(this))
			}
		}
	}

	/// Efficiently drops bookkeeping for a subtree whose root is about to be removed from the surface,
	/// without removing its nodes individually.
	fn release_node(&mut self, node: Node<S>, depth: usize) -> Result<()> {
		let depth = self.enter(depth)?;
		match node {
			Node::Text(Text { el, .. }) => {
				if el.is_none() {
					return Err(Error::NotMounted { kind: "text" });
				}
				Ok(())
			}

			Node::Element(Element { tag, children, el, listeners, .. }) => {
				let span = trace_span!("Releasing element", tag = tag.as_str());
				let _enter = span.enter();
				let el = el.ok_or(Error::NotMounted { kind: "element" })?;
				self.detach_listeners(&el, listeners)?;
				for child in children {
					self.release_node(child, depth)?;
				}
				Ok(())
			}

			Node::Fragment(Fragment { children, el }) => {
				if el.is_none() {
					return Err(Error::NotMounted { kind: "fragment" });
				}
				for child in children {
					self.release_node(child, depth)?;
				}
				Ok(())
			}

			// Components own their output, so they have to tear it down themselves.
			component @ Node::Component(_) => self.destroy_node(component, depth - 1),
		}
	}

	fn detach_listeners(&mut self, el: &S::Handle, listeners: HashMap<String, S::Listener>) -> Result<()> {
		for (event, listener) in listeners {
			trace!(event = event.as_str(), "Detaching listener.");
			self.surface.remove_listener(el, &event, listener)?;
		}
		Ok(())
	}

	fn update_props(&mut self, el: &S::Handle, old: &Props<S::Event>, new: &Props<S::Event>, listeners: &mut HashMap<String, S::Listener>) -> Result<()> {
		self.update_attributes(el, &old.attributes, &new.attributes)?;
		self.update_classes(el, old, new)?;
		self.update_styles(el, &old.style, &new.style)?;
		self.update_listeners(el, old, new, listeners)
	}

	fn update_attributes(&mut self, el: &S::Handle, old: &IndexMap<String, Scalar>, new: &IndexMap<String, Scalar>) -> Result<()> {
		for (name, value) in old {
			if !value.is_null() && !new.contains_key(name) {
				trace!(name = name.as_str(), "Removing attribute.");
				self.surface.remove_attribute(el, name)?;
			}
		}

		for (name, value) in new {
			let previous = old.get(name);
			if previous == Some(value) {
				continue;
			}
			match value.to_surface_value() {
				Some(value) => {
					trace!(name = name.as_str(), value = redact(&value), "Setting attribute.");
					self.surface.set_attribute(el, name, &value)?
				}
				None => {
					if previous.map_or(false, |previous| !previous.is_null()) {
						trace!(name = name.as_str(), "Clearing attribute.");
						self.surface.remove_attribute(el, name)?
					}
				}
			}
		}
		Ok(())
	}

	fn update_classes(&mut self, el: &S::Handle, old: &Props<S::Event>, new: &Props<S::Event>) -> Result<()> {
		if old.class == new.class {
			return Ok(());
		}

		let (stale, fresh) = self.class_diff_sets.temp();
		stale.extend(old.class.iter().flat_map(|class| class.tokens()));
		fresh.extend(new.class.iter().flat_map(|class| class.tokens()));

		for token in stale.iter() {
			if !fresh.contains(token) {
				trace!(token, "Removing class.");
				self.surface.remove_class(el, token)?;
			}
		}
		for token in fresh.iter() {
			if !stale.contains(token) {
				trace!(token, "Adding class.");
				self.surface.add_class(el, token)?;
			}
		}
		Ok(())
	}

	fn update_styles(&mut self, el: &S::Handle, old: &IndexMap<String, Scalar>, new: &IndexMap<String, Scalar>) -> Result<()> {
		for (property, value) in old {
			if !value.is_null() && !new.contains_key(property) {
				trace!(property = property.as_str(), "Removing style.");
				self.surface.remove_style(el, property)?;
			}
		}

		for (property, value) in new {
			let previous = old.get(property);
			if previous == Some(value) {
				continue;
			}
			match value.to_surface_value() {
				Some(value) => {
					trace!(property = property.as_str(), value = redact(&value), "Setting style.");
					self.surface.set_style(el, property, &value)?
				}
				None => {
					if previous.map_or(false, |previous| !previous.is_null()) {
						trace!(property = property.as_str(), "Clearing style.");
						self.surface.remove_style(el, property)?
					}
				}
			}
		}
		Ok(())
	}

	/// Detaches before attaching, so that an old and a new handler for the same event are never registered at the same time.
	fn update_listeners(&mut self, el: &S::Handle, old: &Props<S::Event>, new: &Props<S::Event>, listeners: &mut HashMap<String, S::Listener>) -> Result<()> {
		for (event, handler) in &old.on {
			if new.on.get(event) == Some(handler) {
				continue;
			}
			let listener = listeners.remove(event.as_str()).ok_or_else(|| Error::MissingListener { event: event.clone() })?;
			trace!(event = event.as_str(), ?handler, "Detaching listener.");
			self.surface.remove_listener(el, event, listener)?;
		}

		for (event, handler) in &new.on {
			if old.on.get(event) == Some(handler) {
				continue;
			}
			trace!(event = event.as_str(), ?handler, "Attaching listener.");
			let listener = self.surface.add_listener(el, event, handler)?;
			if let Some(stale) = listeners.insert(event.clone(), listener) {
				warn!("Found an unaccounted-for listener for {:?}. Detaching it.", event);
				self.surface.remove_listener(el, event, stale)?;
			}
		}
		Ok(())
	}
}

/// The child list diff, converted to owned index steps.
///
/// Removals only ever happen before the first or after the last placement, and there is exactly one placement per new child.
struct Plan {
	leading_removals: Vec<usize>,
	placements: Vec<Placement>,
	trailing_removals: Vec<usize>,
}

enum Placement {
	Add,
	Move { from: usize },
	Stay,
}

impl Plan {
	fn new<T>(operations: &[Operation<'_, T>]) -> Self {
		let mut plan = Self {
			leading_removals: Vec::new(),
			placements: Vec::new(),
			trailing_removals: Vec::new(),
		};
		for operation in operations {
			match *operation {
				Operation::Remove { index, .. } => {
					if plan.placements.is_empty() {
						plan.leading_removals.push(index)
					} else {
						plan.trailing_removals.push(index)
					}
				}
				Operation::Add { .. } => plan.placements.push(Placement::Add),
				Operation::Move { from_index, .. } => plan.placements.push(Placement::Move { from: from_index }),
				Operation::Noop { .. } => plan.placements.push(Placement::Stay),
			}
		}
		plan
	}
}

fn first_handle<S: Surface>(nodes: &[Node<S>], end: Option<&S::Handle>) -> Option<S::Handle> {
	nodes.iter().find_map(Node::first_handle).or_else(|| end.cloned())
}

fn redact(value: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		value
	} else {
		"[redacted]"
	}
}
