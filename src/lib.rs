//! A keyed VDOM differ.
//!
//! [`diff`](`diff::diff`) compares two immutable [`VTree`](`tree::VTree`) snapshots and produces a flat list of
//! [`Patch`](`patch::Patch`)es, addressed by preorder index into the old tree.
//! [`apply`](`apply::apply`) binds those patches to the live nodes of a [`RenderTarget`](`render::RenderTarget`)
//! by walking the old tree's shape, then performs them in a single pass.
//!
//! [`Mount`](`mount::Mount`) retains the previous snapshot and live root between update cycles.

#![doc(html_root_url = "https://docs.rs/sapling-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod apply;
pub mod diff;
pub mod dom;
pub mod load;
pub mod memory;
pub mod mount;
pub mod patch;
mod rc_hash_map;
pub mod render;
pub mod tree;

pub use apply::{apply, ApplyError};
pub use diff::{diff, diff_with, DiffConfig};
pub use mount::Mount;
pub use render::{render, RenderTarget};
pub use tree::{Attribute, Handler, VTree};

/// Page content as log field value.
///
/// Redacted unless the `"dangerous-logging"` feature is enabled.
#[must_use]
pub fn redact(content: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		content
	} else {
		"<redacted>"
	}
}
