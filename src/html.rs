//! Tag constructors for the supported HTML elements.
//!
//! ```
//! use creme_dom::{attrs, html::{div, li, ul}};
//!
//! let list = ul::<()>((attrs().key("list"), vec![li("a"), li("b")]));
//! assert_eq!(list.tag_name(), "ul");
//! assert_eq!(list.children().len(), 2);
//! # let _ = div::<()>(());
//! ```

use crate::element::{Content, Element};

/// A reusable constructor for one tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Factory {
	tag_name: &'static str,
	is_void: bool,
}

impl Factory {
	/// Creates a factory for a custom tag.
	#[must_use]
	pub const fn new(tag_name: &'static str, is_void: bool) -> Self {
		Self { tag_name, is_void }
	}

	#[must_use]
	pub fn tag_name(&self) -> &'static str {
		self.tag_name
	}

	#[must_use]
	pub fn is_void(&self) -> bool {
		self.is_void
	}

	#[must_use]
	pub fn create<D>(&self, content: impl Into<Content<D>>) -> Element<D> {
		Element::build(self.tag_name, self.is_void, content)
	}
}

/// Looks up the factory for a supported tag name.
#[must_use]
pub fn factory(tag_name: &str) -> Option<Factory> {
	TAGS.iter().copied().find(|&(name, _)| name == tag_name).map(|(name, is_void)| Factory::new(name, is_void))
}

macro_rules! tags {
	(@void void) => { true };
	(@void) => { false };
	($($(#[$attr:meta])* $function:ident = $tag:literal $(, $void:ident)?;)*) => {
		/// Every supported tag name, with whether it is void.
		pub const TAGS: &[(&str, bool)] = &[$(($tag, tags!(@void $($void)?))),*];

		$(
			$(#[$attr])*
			#[doc = concat!("Creates a `<", $tag, ">` element.")]
			#[must_use]
			pub fn $function<D>(content: impl Into<Content<D>>) -> Element<D> {
				Element::build($tag, tags!(@void $($void)?), content)
			}
		)*
	};
}

tags! {
	html = "html";
	body = "body";
	div = "div";
	span = "span";
	applet = "applet";
	object = "object";
	iframe = "iframe";
	h1 = "h1";
	h2 = "h2";
	h3 = "h3";
	h4 = "h4";
	h5 = "h5";
	h6 = "h6";
	p = "p";
	blockquote = "blockquote";
	pre = "pre";
	a = "a";
	abbr = "abbr";
	acronym = "acronym";
	address = "address";
	big = "big";
	cite = "cite";
	code = "code";
	del = "del";
	dfn = "dfn";
	em = "em";
	ins = "ins";
	kbd = "kbd";
	q = "q";
	s = "s";
	samp = "samp";
	small = "small";
	strike = "strike";
	strong = "strong";
	sub = "sub";
	sup = "sup";
	tt = "tt";
	r#var = "var";
	b = "b";
	u = "u";
	i = "i";
	center = "center";
	dl = "dl";
	dt = "dt";
	dd = "dd";
	ol = "ol";
	ul = "ul";
	li = "li";
	fieldset = "fieldset";
	form = "form";
	label = "label";
	legend = "legend";
	button = "button";
	select = "select";
	option = "option";
	optgroup = "optgroup";
	textarea = "textarea";
	table = "table";
	caption = "caption";
	tbody = "tbody";
	tfoot = "tfoot";
	thead = "thead";
	tr = "tr";
	th = "th";
	td = "td";
	article = "article";
	aside = "aside";
	canvas = "canvas";
	details = "details";
	figure = "figure";
	figcaption = "figcaption";
	footer = "footer";
	header = "header";
	hgroup = "hgroup";
	menu = "menu";
	nav = "nav";
	output = "output";
	ruby = "ruby";
	section = "section";
	summary = "summary";
	time = "time";
	mark = "mark";
	audio = "audio";
	video = "video";

	area = "area", void;
	base = "base", void;
	br = "br", void;
	col = "col", void;
	command = "command", void;
	embed = "embed", void;
	hr = "hr", void;
	img = "img", void;
	input = "input", void;
	link = "link", void;
	meta = "meta", void;
	param = "param", void;
	source = "source", void;
}
