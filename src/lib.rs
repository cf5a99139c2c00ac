#![doc(html_root_url = "https://docs.rs/vine-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod component;
mod diff;
mod error;
pub mod memory;
pub mod node;
pub mod sequence;
pub mod surface;
mod temp_set;

#[cfg(feature = "web")]
mod rc_map;
#[cfg(feature = "web")]
pub mod web;

pub use component::{Component, ComponentType, Render, Rendered};
pub use diff::{Options, Reconciler};
pub use error::{Error, Result};
pub use node::{Class, Handler, Key, Node, Props, Scalar};
pub use surface::Surface;
