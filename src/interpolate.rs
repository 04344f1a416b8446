//! `{a.b.c}` placeholder substitution against JSON data.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{error, trace};

const PLACEHOLDER: &str = r"\{(.+?)\}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Path(Vec<String>),
}

/// Prepares `template` for repeated substitution.
///
/// Each `{path}` is replaced by walking its dot-separated segments through the data: object members by name,
/// array items by index, and `length` on arrays and strings. When a segment can't be resolved, the walk stops and the value reached so far is
/// used instead. Values are formatted the way JavaScript would concatenate them into a string.
///
/// Falsy data (`null`, `false`, `0` and `""`) leaves the template unchanged.
///
/// ```
/// use creme_dom::interpolate;
/// use serde_json::json;
///
/// let greet = interpolate("Hello, {user.name}!");
/// assert_eq!(greet(&json!({ "user": { "name": "Ada" } })), "Hello, Ada!");
/// assert_eq!(greet(&json!(null)), "Hello, {user.name}!");
/// ```
pub fn interpolate(template: &str) -> impl Fn(&Value) -> String {
	let template = template.to_owned();
	let segments = parse(&template);
	move |data: &Value| {
		if !is_truthy(data) {
			return template.clone();
		}
		let mut output = String::with_capacity(template.len());
		for segment in &segments {
			match segment {
				Segment::Literal(literal) => output.push_str(literal),
				Segment::Path(path) => stringify(&resolve(data, path), &mut output),
			}
		}
		output
	}
}

fn parse(template: &str) -> Vec<Segment> {
	let pattern = match Regex::new(PLACEHOLDER) {
		Ok(pattern) => pattern,
		Err(error) => {
			error!("Invalid placeholder pattern: {}", error);
			return vec![Segment::Literal(template.to_owned())];
		}
	};

	let mut segments = Vec::new();
	let mut end = 0;
	for captures in pattern.captures_iter(template) {
		let (whole, path) = match (captures.get(0), captures.get(1)) {
			(Some(whole), Some(path)) => (whole, path),
			_ => continue,
		};
		if whole.start() > end {
			segments.push(Segment::Literal(template[end..whole.start()].to_owned()));
		}
		segments.push(Segment::Path(path.as_str().split('.').map(ToOwned::to_owned).collect()));
		end = whole.end();
	}
	if end < template.len() {
		segments.push(Segment::Literal(template[end..].to_owned()));
	}
	trace!("Parsed template into {} segment(s).", segments.len());
	segments
}

fn resolve<'a>(data: &'a Value, path: &[String]) -> Cow<'a, Value> {
	let mut context = data;
	for (i, key) in path.iter().enumerate() {
		let next = match context {
			Value::Object(members) => members.get(key),
			Value::Array(items) => match key.parse::<usize>() {
				Ok(index) => items.get(index),
				Err(_) if key == "length" => return length(items.len(), &path[i + 1..]),
				Err(_) => None,
			},
			Value::String(string) if key == "length" => {
				// UTF-16 code units.
				return length(string.encode_utf16().count(), &path[i + 1..]);
			}
			_ => None,
		};
		match next {
			Some(next) => context = next,
			None => break,
		}
	}
	Cow::Borrowed(context)
}

/// Numbers have no members, so anything after `length` is ignored.
fn length<'a>(length: usize, rest: &[String]) -> Cow<'a, Value> {
	if !rest.is_empty() {
		trace!("Ignoring {} segment(s) after `length`.", rest.len());
	}
	Cow::Owned(Value::from(length))
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(value) => *value,
		Value::Number(number) => number.as_f64().map_or(true, |number| number != 0.0),
		Value::String(string) => !string.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

fn stringify(value: &Value, output: &mut String) {
	match value {
		Value::Null => output.push_str("null"),
		Value::Bool(value) => output.push_str(if *value { "true" } else { "false" }),
		Value::Number(number) => output.push_str(&format_number(number)),
		Value::String(string) => output.push_str(string),
		Value::Array(items) => {
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					output.push(',');
				}
				// `null` items join as empty.
				if !item.is_null() {
					stringify(item, output);
				}
			}
		}
		Value::Object(_) => output.push_str("[object Object]"),
	}
}

fn format_number(number: &serde_json::Number) -> String {
	if number.is_i64() || number.is_u64() {
		return number.to_string();
	}
	let float = match number.as_f64() {
		Some(float) => float,
		None => return number.to_string(),
	};
	if float == 0.0 {
		// Also `-0`.
		return "0".to_owned();
	}
	let magnitude = float.abs();
	if (1e-6..1e21).contains(&magnitude) {
		float.to_string()
	} else {
		let exponential = format!("{:e}", float);
		match exponential.find('e') {
			Some(e) if !exponential[e + 1..].starts_with('-') => format!("{}e+{}", &exponential[..e], &exponential[e + 1..]),
			_ => exponential,
		}
	}
}
