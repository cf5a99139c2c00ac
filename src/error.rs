use thiserror::Error;

/// Reconciliation failures.
///
/// None of these are retried internally. A failed [`Reconciler`](`crate::Reconciler`) call leaves the surface in an unspecified state,
/// so callers should treat the cycle as lost and, if at all, re-render from scratch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
	/// A node was patched or destroyed without ever having been mounted.
	#[error("{kind} node is not mounted")]
	NotMounted { kind: &'static str },

	/// A node that already carries a surface handle was mounted again.
	#[error("{kind} node is already mounted; destroy it first")]
	AlreadyMounted { kind: &'static str },

	/// The previous tree was not mounted into the container it was patched against.
	#[error("the previous tree is not mounted into the given container")]
	ForeignContainer,

	/// A mounted element lost track of the listener it registered for an event.
	#[error("no listener recorded for {event:?}")]
	MissingListener { event: String },

	#[error("depth limit of {limit} reached")]
	DepthLimit { limit: usize },

	/// The surface adapter rejected an operation.
	#[error("surface operation `{operation}` failed: {message}")]
	Surface { operation: &'static str, message: String },
}

impl Error {
	/// Shorthand for surface adapters.
	pub fn surface(operation: &'static str, message: impl Into<String>) -> Self {
		Self::Surface {
			operation,
			message: message.into(),
		}
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
