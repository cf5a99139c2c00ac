#![cfg(all(target_arch = "wasm32", feature = "web"))]

use std::{cell::Cell, rc::Rc};
use vine_dom::{web::WebSurface, Node, Props, Reconciler};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

type N = Node<WebSurface>;

fn setup() -> (Reconciler<WebSurface>, web_sys::Node) {
	let _ = tracing_wasm::try_set_as_global_default();
	let document = window().unwrap().document().unwrap();
	let container: web_sys::Node = document.create_element("div").unwrap().into();
	document.body().unwrap().append_child(&container).unwrap();
	(Reconciler::new(WebSurface::new(document)), container)
}

fn li(key: &str) -> N {
	Node::element("li", Props::new().key(key), [Node::text(key)])
}

fn inner_html(container: &web_sys::Node) -> String {
	container.dyn_ref::<web_sys::Element>().unwrap().inner_html()
}

#[wasm_bindgen_test]
fn keyed_reorder() {
	let (mut reconciler, container) = setup();
	let ul = |children: Vec<N>| Node::element("ul", Props::new(), children);

	let mounted = reconciler.patch(None, ul(vec![li("A"), li("B"), li("C")]), &container).unwrap();
	let c = mounted.children()[2].el().cloned().unwrap();

	let patched = reconciler.patch(Some(mounted), ul(vec![li("C"), li("A"), li("D")]), &container).unwrap();
	assert_eq!(inner_html(&container), "<ul><li>C</li><li>A</li><li>D</li></ul>");
	assert_eq!(patched.children()[0].el(), Some(&c));

	reconciler.destroy(patched).unwrap();
	assert_eq!(inner_html(&container), "");
}

#[wasm_bindgen_test]
fn props() {
	let (mut reconciler, container) = setup();
	let mounted = reconciler
		.patch(None, Node::element("p", Props::new().class("a b").style("color", "red").attr("title", "t"), []), &container)
		.unwrap();
	let el = mounted.el().cloned().unwrap().dyn_into::<HtmlElement>().unwrap();
	assert_eq!(el.class_name(), "a b");
	assert_eq!(el.style().get_property_value("color").unwrap(), "red");

	let patched = reconciler
		.patch(Some(mounted), Node::element("p", Props::new().class(["b", "c"]).attr("title", None::<&str>), []), &container)
		.unwrap();
	assert_eq!(el.class_name(), "b c");
	assert_eq!(el.style().get_property_value("color").unwrap(), "");
	assert_eq!(el.get_attribute("title"), None);

	reconciler.destroy(patched).unwrap();
}

#[wasm_bindgen_test]
fn events() {
	let (mut reconciler, container) = setup();
	let clicks = Rc::new(Cell::new(0));
	let button = |clicks: &Rc<Cell<u32>>| {
		let clicks = Rc::clone(clicks);
		Node::element("button", Props::new().on("click", move |_| clicks.set(clicks.get() + 1)), [])
	};

	let mounted = reconciler.patch(None, button(&clicks), &container).unwrap();
	let el = mounted.el().cloned().unwrap().dyn_into::<HtmlElement>().unwrap();
	el.click();
	assert_eq!(clicks.get(), 1);

	let patched = reconciler.patch(Some(mounted), button(&clicks), &container).unwrap();
	reconciler.surface_mut().drop_released_handlers();
	el.click();
	assert_eq!(clicks.get(), 2);

	reconciler.destroy(patched).unwrap();
	reconciler.surface_mut().drop_released_handlers();
	el.click();
	assert_eq!(clicks.get(), 2);
}
