//! The live rendering target, as seen by the [`Reconciler`](`crate::Reconciler`).
//!
//! Positions are expressed through anchors rather than indices wherever possible:
//! Inserting `child` before `anchor` (or appending when `anchor` is [`None`]) stays valid while siblings are spliced,
//! and it also moves `child` if it is already attached elsewhere.

use crate::{node::Handler, Result};
use core::fmt::Debug;

pub trait Surface: 'static {
	/// An opaque reference to a live node on this surface.
	///
	/// Clones must refer to the same live node, and equality must be identity.
	type Handle: Clone + PartialEq + Debug;

	/// The payload handed to event handlers.
	type Event: 'static;

	/// Returned when attaching a handler and consumed when detaching it again.
	type Listener: Debug;

	fn create_text(&mut self, value: &str) -> Result<Self::Handle>;
	fn create_element(&mut self, tag: &str) -> Result<Self::Handle>;

	/// Inserts (or moves) `child` into `parent` immediately before `anchor`, or at the end if `anchor` is [`None`].
	fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, anchor: Option<&Self::Handle>) -> Result<()>;

	/// Detaches `node` (and with it its subtree) from the surface.
	fn remove(&mut self, node: &Self::Handle) -> Result<()>;

	fn parent_of(&self, node: &Self::Handle) -> Option<Self::Handle>;
	fn next_sibling(&self, node: &Self::Handle) -> Option<Self::Handle>;
	fn index_of(&self, parent: &Self::Handle, child: &Self::Handle) -> Option<usize>;
	fn child_at(&self, parent: &Self::Handle, index: usize) -> Option<Self::Handle>;

	fn set_text(&mut self, node: &Self::Handle, value: &str) -> Result<()>;

	fn set_attribute(&mut self, element: &Self::Handle, name: &str, value: &str) -> Result<()>;
	fn remove_attribute(&mut self, element: &Self::Handle, name: &str) -> Result<()>;

	fn add_class(&mut self, element: &Self::Handle, token: &str) -> Result<()>;
	fn remove_class(&mut self, element: &Self::Handle, token: &str) -> Result<()>;

	fn set_style(&mut self, element: &Self::Handle, property: &str, value: &str) -> Result<()>;
	fn remove_style(&mut self, element: &Self::Handle, property: &str) -> Result<()>;

	fn add_listener(&mut self, element: &Self::Handle, event: &str, handler: &Handler<Self::Event>) -> Result<Self::Listener>;
	fn remove_listener(&mut self, element: &Self::Handle, event: &str, listener: Self::Listener) -> Result<()>;
}
