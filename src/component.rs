//! Embedded components, as far as the [`Reconciler`] is concerned.
//!
//! The reconciler only ever compares [`ComponentType`]s and keys. Everything else, including what a component renders
//! and how it stores state, is up to the [`Component`] implementation, which is handed the reconciler back to patch its own output.

use crate::{
	node::{Node, Props},
	surface::Surface,
	Error, Reconciler, Result,
};
use core::{
	any::{type_name, TypeId},
	fmt::{self, Debug, Formatter},
	marker::PhantomData,
};
use tracing::trace_span;

/// A live component instance.
///
/// A component occupies a single position in its parent's child list, but may put any number of nodes onto the surface there,
/// all of which must be listed by [`Component::handles`] in order.
pub trait Component<S: Surface>: 'static {
	/// Puts the instance onto the surface inside `container`, before `anchor` (or at the end).
	///
	/// # Errors
	///
	/// Iff mounting the rendered output fails.
	fn mount(&mut self, reconciler: &mut Reconciler<S>, props: &Props<S::Event>, children: Vec<Node<S>>, container: &S::Handle, anchor: Option<&S::Handle>) -> Result<()>;

	/// Brings the mounted instance up to date with new props and children.
	///
	/// `anchor` is the handle following this instance's last node, if any.
	///
	/// # Errors
	///
	/// Iff patching the rendered output fails.
	fn update(&mut self, reconciler: &mut Reconciler<S>, props: &Props<S::Event>, children: Vec<Node<S>>, container: &S::Handle, anchor: Option<&S::Handle>) -> Result<()>;

	/// Tears the instance down, removing everything it put onto the surface.
	///
	/// # Errors
	///
	/// Iff destroying the rendered output fails.
	fn destroy(&mut self, reconciler: &mut Reconciler<S>) -> Result<()>;

	/// The instance's top-level surface handles, in order.
	fn handles(&self) -> Vec<S::Handle>;
}

/// Identity of a [`Component`] implementation.
pub struct ComponentType<S: Surface> {
	id: TypeId,
	name: &'static str,
	pub(crate) create: fn() -> Box<dyn Component<S>>,
}
impl<S: Surface> ComponentType<S> {
	#[must_use]
	pub fn of<C: Component<S> + Default>() -> Self {
		fn create<S: Surface, C: Component<S> + Default>() -> Box<dyn Component<S>> {
			Box::new(C::default())
		}

		Self {
			id: TypeId::of::<C>(),
			name: type_name::<C>(),
			create: create::<S, C>,
		}
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}
}
impl<S: Surface> Clone for ComponentType<S> {
	fn clone(&self) -> Self {
		*self
	}
}
impl<S: Surface> Copy for ComponentType<S> {}
impl<S: Surface> PartialEq for ComponentType<S> {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}
impl<S: Surface> Eq for ComponentType<S> {}
impl<S: Surface> Debug for ComponentType<S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ComponentType").field(&self.name).finish()
	}
}

/// Stateful view logic for [`Rendered`].
pub trait Render<S: Surface>: 'static + Default {
	fn render(&mut self, props: &Props<S::Event>, children: Vec<Node<S>>) -> Node<S>;
}

/// A [`Component`] that re-renders a [`Render`] implementation on each update and patches its previous output.
pub struct Rendered<S: Surface, R: Render<S>> {
	view: R,
	output: Option<Node<S>>,
	_surface: PhantomData<fn(S)>,
}
impl<S: Surface, R: Render<S>> Rendered<S, R> {
	#[must_use]
	pub fn view(&self) -> &R {
		&self.view
	}
}
impl<S: Surface, R: Render<S>> Default for Rendered<S, R> {
	fn default() -> Self {
		Self {
			view: R::default(),
			output: None,
			_surface: PhantomData,
		}
	}
}
impl<S: Surface, R: Render<S>> Component<S> for Rendered<S, R> {
	fn mount(&mut self, reconciler: &mut Reconciler<S>, props: &Props<S::Event>, children: Vec<Node<S>>, container: &S::Handle, anchor: Option<&S::Handle>) -> Result<()> {
		let span = trace_span!("Rendering component", component = type_name::<R>());
		let _enter = span.enter();
		if self.output.is_some() {
			return Err(Error::AlreadyMounted { kind: "component" });
		}
		let output = self.view.render(props, children);
		self.output = Some(reconciler.mount_before(output, container, anchor)?);
		Ok(())
	}

	fn update(&mut self, reconciler: &mut Reconciler<S>, props: &Props<S::Event>, children: Vec<Node<S>>, container: &S::Handle, anchor: Option<&S::Handle>) -> Result<()> {
		let span = trace_span!("Re-rendering component", component = type_name::<R>());
		let _enter = span.enter();
		let previous = self.output.take().ok_or(Error::NotMounted { kind: "component" })?;
		let output = self.view.render(props, children);
		self.output = Some(reconciler.patch_before(previous, output, container, anchor)?);
		Ok(())
	}

	fn destroy(&mut self, reconciler: &mut Reconciler<S>) -> Result<()> {
		let output = self.output.take().ok_or(Error::NotMounted { kind: "component" })?;
		reconciler.destroy(output)
	}

	fn handles(&self) -> Vec<S::Handle> {
		let mut handles = Vec::new();
		if let Some(output) = &self.output {
			output.collect_handles(&mut handles)
		}
		handles
	}
}
