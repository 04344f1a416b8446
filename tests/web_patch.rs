#![cfg(target_arch = "wasm32")]

use creme_dom::{
	attrs, computed,
	html::{button, li, ul},
	web::WebPatcher,
	Lifecycle, Registry,
};
use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INITIALIZED: Once = Once::new();

fn container() -> web_sys::Element {
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	let container = document.create_element("div").unwrap();
	body.append_child(&container).unwrap();
	container
}

#[wasm_bindgen_test]
fn keyed_list() {
	let container = container();
	let mut patcher = WebPatcher::for_window().unwrap();

	let list = ul(computed(|items: &Vec<&'static str>| {
		items.iter().map(|&item| li((attrs().key(item), item))).collect::<Vec<_>>()
	}));

	list.patch_into(&mut patcher, &container, &vec!["a", "b"]).unwrap();
	assert_eq!(container.inner_html(), "<ul><li>a</li><li>b</li></ul>");

	let b = container.first_element_child().unwrap().last_element_child().unwrap();
	list.patch_into(&mut patcher, &container, &vec!["b", "c"]).unwrap();
	assert_eq!(container.inner_html(), "<ul><li>b</li><li>c</li></ul>");
	assert_eq!(container.first_element_child().unwrap().first_element_child(), Some(b));
}

#[wasm_bindgen_test]
fn click() {
	let container = container();
	let mut patcher = WebPatcher::for_window().unwrap();

	let clicks = Rc::new(Cell::new(0));
	let element = button::<()>((
		attrs().id("creme-test-button").on("click", {
			let clicks = Rc::clone(&clicks);
			move |event| {
				assert!(event.as_web().is_some());
				clicks.set(clicks.get() + 1);
			}
		}),
		"Click",
	));

	element.patch_into(&mut patcher, &container, &()).unwrap();
	assert_eq!(clicks.get(), 0);

	let button: HtmlElement = window().unwrap().document().unwrap().get_element_by_id("creme-test-button").unwrap().dyn_into().unwrap();
	let node: &web_sys::Node = button.as_ref();
	assert_eq!(element.node::<web_sys::Node>().as_ref(), Some(node));
	button.click();
	assert_eq!(clicks.get(), 1);

	element.patch_into(&mut patcher, &container, &()).unwrap();
	button.click();
	assert_eq!(clicks.get(), 2, "Listeners are replaced, not stacked.");
}

#[wasm_bindgen_test]
fn lifecycle() {
	let container = container();
	let mut patcher = WebPatcher::for_window().unwrap();

	let created = Rc::new(Cell::new(0));
	let registry = Rc::new(Registry::<web_sys::Node>::new());
	let _handle = registry.add("web-item", {
		let created = Rc::clone(&created);
		move |lifecycle| {
			if let Lifecycle::Created(node) = lifecycle {
				assert_eq!(node.node_name(), "LI");
				created.set(created.get() + 1);
			}
		}
	});
	patcher.observe(registry.clone());

	let item = li::<()>(attrs().key("web-item"));
	item.patch_into(&mut patcher, &container, &()).unwrap();
	item.patch_into(&mut patcher, &container, &()).unwrap();
	assert_eq!(created.get(), 1);
}
