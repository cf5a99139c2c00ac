#![cfg(not(target_arch = "wasm32"))]

use std::{cell::RefCell, rc::Rc};
use vine_dom::{
	memory::{Event, MemorySurface, Mutation},
	Component, ComponentType, Node, Props, Reconciler, Render, Rendered, Result, Scalar,
};


type N = Node<MemorySurface>;

fn name(props: &Props<Event>) -> String {
	props.attributes.get("name").and_then(Scalar::to_surface_value).unwrap_or_default().into_owned()
}

/// Counts its own renders, and wraps whatever children it's handed.
#[derive(Default)]
struct Label {
	renders: i64,
}
impl Render<MemorySurface> for Label {
	fn render(&mut self, props: &Props<Event>, children: Vec<N>) -> N {
		self.renders += 1;
		Node::element("label", Props::new().attr("for", name(props)).attr("data-renders", self.renders), children)
	}
}
type LabelComponent = Rendered<MemorySurface, Label>;

/// Two top-level text nodes.
#[derive(Default)]
struct Pair;
impl Render<MemorySurface> for Pair {
	fn render(&mut self, props: &Props<Event>, _: Vec<N>) -> N {
		let name = name(props);
		Node::fragment([Node::text(format!("{}-1", name)), Node::text(format!("{}-2", name))])
	}
}
type PairComponent = Rendered<MemorySurface, Pair>;

/// A variable number of list items.
#[derive(Default)]
struct Items;
impl Render<MemorySurface> for Items {
	fn render(&mut self, props: &Props<Event>, _: Vec<N>) -> N {
		let count = match props.attributes.get("count") {
			Some(&Scalar::Number(count)) => count as usize,
			_ => 0,
		};
		Node::fragment((0..count).map(|i| Node::element("li", Props::new(), [Node::text(i.to_string())])))
	}
}
type ItemsComponent = Rendered<MemorySurface, Items>;

fn label(name: &str, children: impl IntoIterator<Item = N>) -> N {
	Node::component::<LabelComponent>(Props::new().attr("name", name), children)
}

fn pair(key: &str) -> N {
	Node::component::<PairComponent>(Props::new().key(key).attr("name", key), [])
}

fn setup(initial: N) -> (Reconciler<MemorySurface>, vine_dom::memory::NodeId, N) {
	log_::init();
	let mut reconciler = Reconciler::new(MemorySurface::new());
	let root = reconciler.surface().root();
	let mounted = reconciler.patch(None, initial, &root).unwrap();
	reconciler.surface_mut().take_mutations();
	(reconciler, root, mounted)
}

#[test]
fn components_render_their_children() {
	let (reconciler, root, _) = setup(label("a", [Node::text("A")]));
	assert_eq!(
		reconciler.surface().inner_markup(root),
		r#"<label for="a" data-renders="1">A</label>"#
	);
}

#[test]
fn updates_keep_the_instance() {
	let (mut reconciler, root, mounted) = setup(label("a", [Node::text("A")]));
	let el = reconciler.surface().children(root)[0];

	let patched = reconciler.patch(Some(mounted), label("b", [Node::text("B")]), &root).unwrap();
	assert_eq!(reconciler.surface().children(root), [el]);
	assert_eq!(
		reconciler.surface().inner_markup(root),
		r#"<label for="b" data-renders="2">B</label>"#
	);
	assert!(reconciler.surface().mutations().iter().all(|mutation| !mutation.is_structural()));

	match &patched {
		Node::Component(component) => assert_eq!(component.component_type(), ComponentType::of::<LabelComponent>()),
		other => panic!("expected a component, found {:?}", other),
	}
}

#[test]
fn different_component_types_replace() {
	let (mut reconciler, root, mounted) = setup(label("a", []));
	let el = reconciler.surface().children(root)[0];

	reconciler.patch(Some(mounted), Node::component::<PairComponent>(Props::new().attr("name", "p"), []), &root).unwrap();
	assert!(!reconciler.surface().is_attached(el));
	assert_eq!(reconciler.surface().inner_markup(root), "p-1p-2");
}

#[test]
fn multi_rooted_components_move_as_one() {
	let (mut reconciler, root, mounted) = setup(Node::element("div", Props::new(), [pair("a"), pair("b")]));

	reconciler
		.patch(Some(mounted), Node::element("div", Props::new(), [pair("b"), pair("a")]), &root)
		.unwrap();
	assert_eq!(reconciler.surface().inner_markup(root), "<div>b-1b-2a-1a-2</div>");
	assert_eq!(
		reconciler.surface().mutations().iter().filter(|mutation| matches!(mutation, Mutation::Insert { .. })).count(),
		2
	);
}

#[test]
fn component_output_grows_before_following_siblings() {
	let items = |count: i64| Node::component::<ItemsComponent>(Props::new().attr("count", count), []);
	let end = || Node::element("li", Props::new(), [Node::text("end")]);
	let (mut reconciler, root, mounted) = setup(Node::element("ul", Props::new(), [items(1), end()]));

	let patched = reconciler
		.patch(Some(mounted), Node::element("ul", Props::new(), [items(3), end()]), &root)
		.unwrap();
	assert_eq!(
		reconciler.surface().inner_markup(root),
		"<ul><li>0</li><li>1</li><li>2</li><li>end</li></ul>"
	);

	reconciler
		.patch(Some(patched), Node::element("ul", Props::new(), [items(0), end()]), &root)
		.unwrap();
	assert_eq!(reconciler.surface().inner_markup(root), "<ul><li>end</li></ul>");
}

#[test]
fn components_inside_destroyed_elements_are_torn_down() {
	let (mut reconciler, root, mounted) = setup(Node::element("div", Props::new(), [label("a", [Node::text("A")]), pair("p")]));

	reconciler.destroy(mounted).unwrap();
	assert!(reconciler.surface().children(root).is_empty());
}

/// Records its lifecycle into a shared log.
#[derive(Default)]
struct Probe {
	log: Option<Rc<RefCell<Vec<&'static str>>>>,
	output: Option<N>,
}

thread_local! {
	static PROBE_LOG: Rc<RefCell<Vec<&'static str>>> = Rc::default();
}

impl Component<MemorySurface> for Probe {
	fn mount(
		&mut self,
		reconciler: &mut Reconciler<MemorySurface>,
		_: &Props<Event>,
		children: Vec<N>,
		container: &vine_dom::memory::NodeId,
		anchor: Option<&vine_dom::memory::NodeId>,
	) -> Result<()> {
		let log = PROBE_LOG.with(Rc::clone);
		log.borrow_mut().push("mount");
		self.log = Some(log);
		self.output = Some(reconciler.mount_before(Node::fragment(children), container, anchor)?);
		Ok(())
	}

	fn update(
		&mut self,
		reconciler: &mut Reconciler<MemorySurface>,
		_: &Props<Event>,
		children: Vec<N>,
		container: &vine_dom::memory::NodeId,
		anchor: Option<&vine_dom::memory::NodeId>,
	) -> Result<()> {
		self.log.as_ref().unwrap().borrow_mut().push("update");
		let previous = self.output.take().unwrap();
		self.output = Some(reconciler.patch_before(previous, Node::fragment(children), container, anchor)?);
		Ok(())
	}

	fn destroy(&mut self, reconciler: &mut Reconciler<MemorySurface>) -> Result<()> {
		self.log.as_ref().unwrap().borrow_mut().push("destroy");
		reconciler.destroy(self.output.take().unwrap())
	}

	fn handles(&self) -> Vec<vine_dom::memory::NodeId> {
		let mut handles = Vec::new();
		if let Some(output) = &self.output {
			output.collect_handles(&mut handles);
		}
		handles
	}
}

#[test]
fn lifecycle_callbacks() {
	let probe = |key: i64, text: &str| Node::component::<Probe>(Props::new().key(key), [Node::text(text)]);
	let (mut reconciler, root, mounted) = setup(Node::fragment([probe(1, "one")]));

	let patched = reconciler.patch(Some(mounted), Node::fragment([probe(1, "uno")]), &root).unwrap();
	assert_eq!(reconciler.surface().inner_markup(root), "uno");

	let patched = reconciler.patch(Some(patched), Node::fragment([probe(2, "dos")]), &root).unwrap();
	assert_eq!(reconciler.surface().inner_markup(root), "dos");

	reconciler.destroy(patched).unwrap();
	assert!(reconciler.surface().children(root).is_empty());

	PROBE_LOG.with(|log| assert_eq!(*log.borrow(), ["mount", "update", "destroy", "mount", "destroy"]));
}
