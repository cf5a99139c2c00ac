#![cfg(not(target_arch = "wasm32"))]

use vine_dom::{
	memory::{MemorySurface, Mutation},
	surface::Surface as _,
	Error, Node, Options, Props, Reconciler,
};


type N = Node<MemorySurface>;

fn nested(depth: usize) -> N {
	(0..depth).fold(Node::text("leaf"), |inner, _| Node::element("div", Props::new(), [inner]))
}

fn reconciler() -> Reconciler<MemorySurface> {
	log_::init();
	Reconciler::new(MemorySurface::new())
}

#[test]
fn mount_at_index() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	reconciler.mount(Node::text("b"), &root, None).unwrap();
	reconciler.mount(Node::text("a"), &root, Some(0)).unwrap();
	reconciler.mount(Node::text("c"), &root, Some(99)).unwrap();
	assert_eq!(reconciler.surface().inner_markup(root), "abc");
}

#[test]
fn mount_twice_is_rejected() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	let mounted = reconciler.mount(Node::element("p", Props::new(), []), &root, None).unwrap();
	assert!(mounted.is_mounted());
	assert_eq!(reconciler.mount(mounted, &root, None).unwrap_err(), Error::AlreadyMounted { kind: "element" });
}

#[test]
fn destroy_removes_only_the_root_and_detaches_all_listeners() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	let tree = Node::element(
		"form",
		Props::new().on("submit", |_| ()),
		[
			Node::element("input", Props::new().on("input", |_| ()).on("change", |_| ()), []),
			Node::fragment([Node::element("button", Props::new().on("click", |_| ()), [Node::text("OK")])]),
		],
	);
	let mounted = reconciler.patch(None, tree, &root).unwrap();
	let form = *mounted.el().unwrap();
	assert_eq!(reconciler.surface().total_listener_count(), 4);
	reconciler.surface_mut().take_mutations();

	reconciler.destroy(mounted).unwrap();
	let surface = reconciler.surface();
	assert_eq!(surface.total_listener_count(), 0);
	assert!(surface.children(root).is_empty());
	assert!(!surface.is_attached(form));

	let removals: Vec<_> = surface.mutations().iter().filter(|mutation| matches!(mutation, Mutation::Remove { .. })).collect();
	assert_eq!(removals, [&Mutation::Remove { node: form }]);
}

#[test]
fn destroying_a_fragment_removes_each_child() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	let mounted = reconciler.patch(None, Node::fragment([Node::text("a"), Node::text("b")]), &root).unwrap();
	reconciler.surface_mut().take_mutations();

	reconciler.destroy(mounted).unwrap();
	assert!(reconciler.surface().children(root).is_empty());
	assert_eq!(reconciler.surface().mutations().len(), 2);
}

#[test]
fn replacement_keeps_the_position() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	reconciler.mount(Node::text("x"), &root, None).unwrap();
	let mounted = reconciler.patch(None, Node::element("div", Props::new().attr("title", "t"), []), &root).unwrap();
	let div = *mounted.el().unwrap();
	let trailing = reconciler.mount(Node::text("z"), &root, None).unwrap();
	let z = *trailing.el().unwrap();
	reconciler.surface_mut().take_mutations();

	let patched = reconciler.patch(Some(mounted), Node::element("span", Props::new().attr("title", "t"), []), &root).unwrap();
	let span = *patched.el().unwrap();
	assert_ne!(span, div);
	assert!(!reconciler.surface().is_attached(div));
	assert_eq!(reconciler.surface().inner_markup(root), r#"x<span title="t"></span>z"#);

	// One removal, one fresh mount, and nothing patched on the old element.
	assert_eq!(
		reconciler.surface().mutations(),
		[
			Mutation::Remove { node: div },
			Mutation::CreateElement { node: span, tag: "span".to_owned() },
			Mutation::Insert {
				parent: root,
				child: span,
				anchor: Some(z),
			},
			Mutation::SetAttribute {
				node: span,
				name: "title".to_owned(),
				value: "t".to_owned(),
			},
		]
	);
}

#[test]
fn key_change_replaces_the_root() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	let mounted = reconciler.patch(None, Node::element("div", Props::new().key(1), []), &root).unwrap();
	let old = *mounted.el().unwrap();

	let patched = reconciler.patch(Some(mounted), Node::element("div", Props::new().key(2), []), &root).unwrap();
	assert_ne!(patched.el(), Some(&old));
	assert_eq!(reconciler.surface().children(root), [*patched.el().unwrap()]);
}

#[test]
fn patching_an_unmounted_tree_fails() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	let error = reconciler.patch(Some(Node::text("a")), Node::text("b"), &root).unwrap_err();
	assert_eq!(error, Error::NotMounted { kind: "text" });
}

#[test]
fn patching_against_another_container_fails() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	let outer = reconciler.patch(None, Node::element("section", Props::new(), []), &root).unwrap();
	let section = *outer.el().unwrap();
	let inner = reconciler.mount(Node::text("inner"), &section, None).unwrap();

	let error = reconciler.patch(Some(inner), Node::text("moved"), &root).unwrap_err();
	assert_eq!(error, Error::ForeignContainer);
}

#[test]
fn depth_limit() {
	let mut reconciler = Reconciler::with_options(MemorySurface::new(), Options { depth_limit: 4 });
	let root = reconciler.surface().root();

	let mounted = reconciler.patch(None, nested(3), &root).unwrap();
	reconciler.destroy(mounted).unwrap();

	let error = reconciler.patch(None, nested(4), &root).unwrap_err();
	assert_eq!(error, Error::DepthLimit { limit: 4 });
}

#[test]
fn default_depth_limit_allows_deep_trees() {
	let mut reconciler = reconciler();
	assert_eq!(reconciler.options(), Options::default());
	let root = reconciler.surface().root();
	let mounted = reconciler.patch(None, nested(64), &root).unwrap();
	let patched = reconciler.patch(Some(mounted), nested(64), &root).unwrap();
	reconciler.destroy(patched).unwrap();
	assert!(reconciler.surface().children(root).is_empty());
}

#[test]
fn surface_errors_propagate() {
	let mut reconciler = reconciler();
	let root = reconciler.surface().root();
	let mounted = reconciler.patch(None, Node::text("gone"), &root).unwrap();
	let el = *mounted.el().unwrap();
	reconciler.surface_mut().remove(&el).unwrap();

	match reconciler.destroy(mounted).unwrap_err() {
		Error::Surface { operation, .. } => assert_eq!(operation, "remove"),
		other => panic!("unexpected error: {}", other),
	}
}

#[test]
fn errors_display() {
	assert_eq!(Error::NotMounted { kind: "text" }.to_string(), "text node is not mounted");
	assert_eq!(Error::DepthLimit { limit: 3 }.to_string(), "depth limit of 3 reached");
	assert_eq!(
		Error::surface("remove", "node is gone").to_string(),
		"surface operation `remove` failed: node is gone"
	);
}
