//! Patched live trees must be indistinguishable from fresh renderings of the new tree.

use sapling_dom::{
	diff_with,
	memory::MemoryTarget,
	patch::{InsertSource, PatchKind},
	render,
	tree::{Transform, VNode},
	Attribute, DiffConfig, Handler, VTree,
};

mod memory_support_;
use memory_support_::{assert_converges, fresh_snapshot, init_logging, keyed_list, li, plain_list};

/// All orderings of `items`, via Heap's algorithm.
fn permutations<'a>(items: &[&'a str]) -> Vec<Vec<&'a str>> {
	fn generate<'a>(k: usize, items: &mut Vec<&'a str>, output: &mut Vec<Vec<&'a str>>) {
		if k <= 1 {
			return output.push(items.clone());
		}
		generate(k - 1, items, output);
		for i in 0..k - 1 {
			if k % 2 == 0 {
				items.swap(i, k - 1)
			} else {
				items.swap(0, k - 1)
			}
			generate(k - 1, items, output)
		}
	}

	let mut items = items.to_vec();
	let mut output = Vec::new();
	generate(items.len(), &mut items, &mut output);
	output
}

#[test]
fn plain_children() {
	let cases: &[(&[&str], &[&str])] = &[
		(&["a"], &["a", "b"]),
		(&["a", "b", "c", "d", "e"], &["a", "b"]),
		(&["a", "b"], &["x", "y", "z"]),
		(&[], &["a"]),
		(&["a"], &[]),
	];
	for (old, new) in cases {
		assert_converges(&plain_list(old), &plain_list(new));
	}
}

#[test]
fn text_root() {
	let patched = assert_converges(&VTree::text("before"), &VTree::text("after"));
	assert_eq!(patched.before, patched.after);
	assert_eq!(patched.target.text(patched.after), Some("after"));
}

#[test]
fn mismatching_root_is_replaced() {
	let patched = assert_converges(&VTree::text("a"), &plain_list(&["a"]));
	assert_ne!(patched.before, patched.after);
}

#[test]
fn namespace_change() {
	let old = VTree::node("div", vec![], vec![li("a")]);
	let new = VTree::from(VNode::with_namespace("http://www.w3.org/2000/svg", "div", vec![], vec![li("a")]));
	assert_converges(&old, &new);
}

#[test]
fn attributes() {
	let handler = Handler::new(|_| ());
	let old = VTree::node(
		"input",
		vec![
			Attribute::property("type", "text"),
			Attribute::property("value", "a"),
			Attribute::listener("input", handler.clone()),
		],
		vec![],
	);
	let new = VTree::node(
		"input",
		vec![
			Attribute::property("value", "b"),
			Attribute::property("placeholder", "Type here"),
			Attribute::listener("change", handler),
		],
		vec![],
	);
	let patched = assert_converges(&old, &new);
	assert_eq!(patched.target.property(patched.after, "type"), None);
	assert_eq!(patched.target.property(patched.after, "value"), Some("b"));
}

#[test]
fn keyed_append() {
	let patched = assert_converges(&keyed_list(&["a"]), &keyed_list(&["a", "b"]));
	assert_eq!(patched.target.children(patched.after).len(), 2);
}

#[test]
fn keyed_remove_leading() {
	let patched = assert_converges(&keyed_list(&["a", "b", "c"]), &keyed_list(&["b", "c"]));
	assert_eq!(patched.target.len(), patched.rendered);
}

#[test]
fn keyed_adjacent_swap_keeps_nodes() {
	init_logging();
	let old = keyed_list(&["a", "b", "c"]);
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &old);
	let before = target.children(root).to_vec();

	let new = keyed_list(&["b", "a", "c"]);
	let patches = sapling_dom::diff(&old, &new);
	let after = sapling_dom::apply(&mut target, &old, root, &patches).unwrap();

	assert_eq!(after, root);
	assert_eq!(target.children(root), &[before[1], before[0], before[2]][..]);
	assert_eq!(target.snapshot(root), fresh_snapshot(&new));
}

#[test]
fn keyed_move_first_to_end_keeps_nodes() {
	init_logging();
	let old = keyed_list(&["a", "b", "c", "d"]);
	let mut target = MemoryTarget::new();
	let root = render(&mut target, &old);
	let before = target.children(root).to_vec();

	let new = keyed_list(&["b", "c", "d", "a"]);
	let patches = sapling_dom::diff(&old, &new);
	sapling_dom::apply(&mut target, &old, root, &patches).unwrap();

	assert_eq!(target.children(root), &[before[1], before[2], before[3], before[0]][..]);
	assert_eq!(target.snapshot(root), fresh_snapshot(&new));
}

#[test]
fn keyed_move_to_middle_with_changed_content() {
	let old = VTree::keyed("ul", vec![], vec![("a", li("1")), ("b", li("2")), ("c", li("3")), ("d", li("4"))]);
	let new = VTree::keyed("ul", vec![], vec![("b", li("2")), ("c", li("3")), ("a", li("changed")), ("d", li("4"))]);
	let patched = assert_converges(&old, &new);
	assert_eq!(patched.target.len(), patched.rendered);
}

#[test]
fn keyed_permutations_only_move() {
	let lists: &[&[&str]] = &[&["a", "b", "c", "d"], &["a", "b", "c", "d", "e"]];
	for keys in lists {
		let old = keyed_list(keys);
		for permutation in permutations(keys) {
			let patched = assert_converges(&old, &keyed_list(&permutation));
			assert_eq!(patched.target.len(), patched.rendered, "Rendered new nodes for permutation {:?}", permutation);
			assert_eq!(patched.before, patched.after);
		}
	}
}

#[test]
fn keyed_subsets_with_insertions() {
	let keys = ["a", "b", "c", "d"];
	for mask in 0_u32..(1_u32 << keys.len()) {
		let kept: Vec<_> = keys.iter().enumerate().filter(|(i, _)| mask & (1_u32 << *i) != 0).map(|(_, &key)| key).collect();
		for position in 0..=kept.len() {
			let mut new = kept.clone();
			new.insert(position, "x");
			assert_converges(&keyed_list(&keys), &keyed_list(&new));
			assert_converges(&keyed_list(&new), &keyed_list(&keys));
		}
	}
}

#[test]
fn keyed_replacement() {
	assert_converges(&keyed_list(&["a", "b", "c"]), &keyed_list(&["x", "b", "c"]));
	assert_converges(&keyed_list(&["a", "b", "c"]), &keyed_list(&["a", "x", "c"]));
	assert_converges(&keyed_list(&["a", "b"]), &keyed_list(&["x", "y", "z"]));
}

#[test]
fn duplicate_keys() {
	let cases: &[(&[&str], &[&str])] = &[
		(&["a", "a"], &["a"]),
		(&["a", "b"], &["b", "a", "b"]),
		(&["a", "a", "b"], &["b", "a", "a"]),
		(&["a", "b", "a", "b"], &["b", "a", "b", "a"]),
		(&["a", "a", "a"], &["b", "a", "a", "a", "a"]),
	];
	for (old, new) in cases {
		assert_converges(&keyed_list(old), &keyed_list(new));
	}
}

#[test]
fn key_collision_limit_zero() {
	init_logging();
	let config = DiffConfig { key_collision_limit: 0 };
	let cases: &[(&[&str], &[&str])] = &[
		(&["a", "b", "a", "b"], &["b", "a", "b", "a"]),
		(&["a", "a", "a"], &["x", "a", "a", "a"]),
		(&["a", "b", "a"], &["a", "a", "b"]),
	];
	for (old, new) in cases {
		let (old, new) = (keyed_list(old), keyed_list(new));
		let mut target = MemoryTarget::new();
		let root = render(&mut target, &old);
		let patches = diff_with(&old, &new, &config);
		let root = sapling_dom::apply(&mut target, &old, root, &patches).unwrap();
		assert_eq!(target.snapshot(root), fresh_snapshot(&new));
	}
}

#[test]
fn nested_keyed_lists() {
	let nested = |outer: &[&str], inner: &[&str]| VTree::keyed("div", vec![], outer.iter().map(|&key| (key, keyed_list(inner))));
	assert_converges(&nested(&["a", "b", "c"], &["1", "2", "3"]), &nested(&["c", "a", "b"], &["3", "1", "2"]));
	assert_converges(&nested(&["a", "b"], &["1"]), &nested(&["b", "a", "x"], &["2", "1"]));
}

#[test]
fn plain_to_keyed_keeps_root() {
	let patched = assert_converges(&plain_list(&["a", "b"]), &keyed_list(&["a", "c", "d"]));
	assert_eq!(patched.before, patched.after);
}

#[test]
fn keyed_to_plain_is_replaced() {
	let patched = assert_converges(&keyed_list(&["a", "b"]), &plain_list(&["a", "b"]));
	assert_ne!(patched.before, patched.after);
}

#[test]
fn tagged_subtrees() {
	let transform = Transform::new(|message| message);
	let patched = assert_converges(
		&VTree::tagged(transform.clone(), keyed_list(&["a", "b"])),
		&VTree::tagged(transform, keyed_list(&["b", "a", "c"])),
	);
	assert_eq!(patched.before, patched.after);

	let patched = assert_converges(
		&VTree::tagged(Transform::new(|message| message), li("a")),
		&VTree::tagged(Transform::new(|message| message), li("a")),
	);
	assert_ne!(patched.before, patched.after);
}

#[test]
fn tagged_child_in_list() {
	let transform = Transform::new(|message| message);
	let list = |texts: &[&str]| VTree::node("ul", vec![], texts.iter().map(|&text| VTree::tagged(transform.clone(), li(text))));
	assert_converges(&list(&["a", "b"]), &list(&["a", "c", "d"]));
	assert_converges(&list(&["a", "b", "c"]), &list(&["x"]));
}

#[test]
fn moved_child_replaced_wholesale() {
	let old = VTree::keyed("div", vec![], vec![("a", VTree::text("a")), ("b", li("b")), ("c", li("c"))]);
	let new = VTree::keyed("div", vec![], vec![("c", li("c")), ("b", li("b")), ("a", li("now a node"))]);
	let patched = assert_converges(&old, &new);

	let reorder = patched
		.patches
		.iter()
		.find_map(|patch| match &patch.kind {
			PatchKind::Reorder(reorder) => Some(reorder),
			_ => None,
		})
		.expect("No reorder");
	assert_eq!(reorder.move_count, 2);
	assert!(reorder.trailing_inserts.iter().flatten().all(|insert| matches!(insert.source, InsertSource::Moved(_))));
}
