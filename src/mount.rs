//! Retained state between update cycles.

use crate::{
	apply::{apply, ApplyError},
	diff::{diff_with, DiffConfig},
	render::{render, RenderTarget},
	tree::VTree,
};
use tracing::{info, instrument, trace};

/// A rendered tree together with its render target and live root.
///
/// Each [`update`](`Mount::update`) is one complete diff-then-apply cycle.
/// Since it takes `&mut self`, a cycle can't interleave with another one.
/// Requests that arrive while a cycle is in flight (for example from event handlers) can be [`queue`](`Mount::queue`)d instead.
#[derive(Debug)]
pub struct Mount<T: RenderTarget> {
	target: T,
	tree: VTree,
	root: T::Node,
	config: DiffConfig,
	queued: Option<VTree>,
}

impl<T: RenderTarget> Mount<T> {
	/// Renders `tree` into `target`.
	///
	/// The live root is detached. Attach it via [`root`](`Mount::root`) and [`target_mut`](`Mount::target_mut`).
	#[instrument(skip(target, tree))]
	pub fn new(mut target: T, tree: VTree) -> Self {
		let root = render(&mut target, &tree);
		Self {
			target,
			tree,
			root,
			config: DiffConfig::default(),
			queued: None,
		}
	}

	/// Takes over `root`, which must already be a rendering of `tree`, without rendering anything.
	///
	/// Together with [`load`](`crate::load`), this adopts server-rendered content.
	pub fn adopt(target: T, tree: VTree, root: T::Node) -> Self {
		trace!(?root, "Adopting live root.");
		Self {
			target,
			tree,
			root,
			config: DiffConfig::default(),
			queued: None,
		}
	}

	#[must_use]
	pub fn with_config(mut self, config: DiffConfig) -> Self {
		self.config = config;
		self
	}

	#[must_use]
	pub fn target(&self) -> &T {
		&self.target
	}

	pub fn target_mut(&mut self) -> &mut T {
		&mut self.target
	}

	/// The current live root. This changes if an update replaces the root wholesale.
	#[must_use]
	pub fn root(&self) -> &T::Node {
		&self.root
	}

	/// The tree that was rendered last.
	#[must_use]
	pub fn tree(&self) -> &VTree {
		&self.tree
	}

	/// Brings the live tree in sync with `tree`.
	///
	/// # Errors
	///
	/// Iff the live tree was modified behind this [`Mount`]'s back. The retained tree is not advanced in that case,
	/// but the live tree may be partially patched.
	#[instrument(skip(self, tree))]
	pub fn update(&mut self, tree: VTree) -> Result<(), ApplyError> {
		let patches = diff_with(&self.tree, &tree, &self.config);
		info!("Applying {} top-level patch(es).", patches.len());
		self.root = apply(&mut self.target, &self.tree, self.root.clone(), &patches)?;
		self.tree = tree;
		Ok(())
	}

	/// Schedules `tree` for the next [`flush`](`Mount::flush`). Replaces any tree that's already queued.
	pub fn queue(&mut self, tree: VTree) {
		if self.queued.replace(tree).is_some() {
			trace!("Coalesced with previously queued update.")
		}
	}

	#[must_use]
	pub fn is_queued(&self) -> bool {
		self.queued.is_some()
	}

	/// Runs at most one cycle, for the latest queued tree. Returns whether there was one.
	///
	/// # Errors
	///
	/// See [`update`](`Mount::update`).
	pub fn flush(&mut self) -> Result<bool, ApplyError> {
		match self.queued.take() {
			Some(tree) => self.update(tree).map(|()| true),
			None => Ok(false),
		}
	}

	#[must_use]
	pub fn into_parts(self) -> (T, VTree, T::Node) {
		(self.target, self.tree, self.root)
	}
}
