use sapling_dom::{
	apply, diff,
	memory::MemoryTarget,
	patch::{Patch, PatchKind},
	render, ApplyError, RenderTarget, VTree,
};

mod memory_support_;
use memory_support_::{fresh_snapshot, init_logging, keyed_list, plain_list};

#[test]
fn no_patches_is_a_no_op() {
	init_logging();
	let tree = plain_list(&["a", "b"]);
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &tree);

	assert_eq!(apply(&mut target, &tree, root, &[]), Ok(root));
	assert_eq!(target.finished_cycles(), 0);
	assert_eq!(target.snapshot(root), fresh_snapshot(&tree));
}

#[test]
fn finishes_one_cycle_per_apply() {
	init_logging();
	let old = keyed_list(&["a", "b", "c"]);
	let new = keyed_list(&["c", "b"]);
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &old);

	apply(&mut target, &old, root, &diff(&old, &new)).unwrap();
	assert_eq!(target.finished_cycles(), 1);
}

#[test]
fn missing_live_child() {
	init_logging();
	let old = plain_list(&["a", "b"]);
	let new = plain_list(&["a", "c"]);
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &old);

	// Tamper with the live tree.
	let second = target.child_at(&root, 1).unwrap();
	target.remove_child(&root, &second);

	assert_eq!(
		apply(&mut target, &old, root, &diff(&old, &new)),
		Err(ApplyError::MissingChild { index: 0, position: 1 })
	);
	assert_eq!(target.finished_cycles(), 0);
}

#[test]
fn patch_outside_the_old_tree() {
	init_logging();
	let old = plain_list(&["a"]);
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &old);

	let patches = [Patch {
		index: 99,
		kind: PatchKind::UpdateText("unreachable".into()),
	}];
	assert_eq!(apply(&mut target, &old, root, &patches), Err(ApplyError::UnresolvedPatch { index: 99 }));
	assert_eq!(target.snapshot(root), fresh_snapshot(&old));
}

#[test]
fn unordered_patches() {
	init_logging();
	let old = plain_list(&["a", "b"]);
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &old);

	// 0: ul, 1: li, 2: "a", 3: li, 4: "b"
	let patches = [
		Patch {
			index: 4,
			kind: PatchKind::UpdateText("y".into()),
		},
		Patch {
			index: 2,
			kind: PatchKind::UpdateText("x".into()),
		},
	];
	assert_eq!(apply(&mut target, &old, root, &patches), Err(ApplyError::UnresolvedPatch { index: 2 }));
	// Nothing is mutated before all patches are bound.
	assert_eq!(target.snapshot(root), fresh_snapshot(&old));
}

#[test]
fn detached_text_root_is_updated() {
	init_logging();
	let old = VTree::text("a");
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &old);

	let root = apply(&mut target, &old, root, &diff(&old, &VTree::text("b"))).unwrap();
	assert_eq!(target.text(root), Some("b"));
}

#[test]
fn errors_are_displayed() {
	assert_eq!(
		ApplyError::MissingChild { index: 3, position: 2 }.to_string(),
		"live node for index 3 has no child at position 2"
	);
	assert_eq!(ApplyError::MissingMove { id: 1 }.to_string(), "moved node 1 is missing");
}

#[test]
fn memory_target_keeps_replaced_nodes() {
	init_logging();
	let old = VTree::node("p", vec![], vec![VTree::text("a")]);
	let new = VTree::node("div", vec![], vec![VTree::text("a")]);
	let mut target = MemoryTarget::new();
	let before = render(&mut target, &old);
	assert_eq!(target.len(), 2);

	let after = apply(&mut target, &old, before, &diff(&old, &new)).unwrap();
	assert_ne!(after, before);
	assert_eq!(target.len(), 4);
	assert_eq!(target.parent(&before), None);
	assert_eq!(target.snapshot(before), fresh_snapshot(&old));
}
