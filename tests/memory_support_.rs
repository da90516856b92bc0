#![allow(dead_code)]

use sapling_dom::{
	apply, diff,
	memory::{MemoryTarget, NodeId, Snapshot},
	patch::Patch,
	render, VTree,
};

pub fn init_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}

pub fn fresh_snapshot(tree: &VTree) -> Snapshot {
	let mut target = MemoryTarget::new();
	let root = render(&mut target, tree);
	target.snapshot(root)
}

/// Live rendering of `old`, patched towards `new`.
pub struct Patched {
	pub target: MemoryTarget,
	pub before: NodeId,
	pub after: NodeId,
	/// Node count right after the initial render.
	pub rendered: usize,
	pub patches: Vec<Patch>,
}

/// Applies `diff(old, new)` to a fresh rendering of `old` and asserts it now matches a fresh rendering of `new`.
pub fn assert_converges(old: &VTree, new: &VTree) -> Patched {
	init_logging();
	let mut target = MemoryTarget::new();
	let before = render(&mut target, old);
	let rendered = target.len();
	let patches = diff(old, new);
	let after = apply(&mut target, old, before, &patches).expect("Patches didn't apply");
	assert_eq!(target.snapshot(after), fresh_snapshot(new), "Diverged with patches {:#?}", patches);
	Patched {
		target,
		before,
		after,
		rendered,
		patches,
	}
}

pub fn li(text: &str) -> VTree {
	VTree::node("li", vec![], vec![VTree::text(text)])
}

/// `<ul>` with one `<li>` per key, containing the key as text.
pub fn keyed_list(keys: &[&str]) -> VTree {
	VTree::keyed("ul", vec![], keys.iter().map(|&key| (key, li(key))))
}

pub fn plain_list(texts: &[&str]) -> VTree {
	VTree::node("ul", vec![], texts.iter().map(|&text| li(text)))
}
