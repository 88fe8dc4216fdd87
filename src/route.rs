use crate::template::PathTemplate;
use std::{
	fmt::{self, Display, Formatter},
	str::FromStr,
};
use thiserror::Error;

/// Builds a [`PathTemplate`] at compile time.
///
/// Segments are separated by `/`; a segment written as `[name]` is a parameter.
///
/// ```
/// use warren::path;
///
/// assert_eq!(path![].to_string(), "/");
/// assert_eq!(path![api / users / [id]].to_string(), "/api/users/:id");
/// ```
#[macro_export]
macro_rules! path {
	[] => { $crate::PathTemplate::root() };
	[ @single [ $name:ident ] ] => {
		$crate::Segment::Param(stringify!($name).to_owned())
	};
	[ @single $literal:tt ] => {
		$crate::Segment::Literal(stringify!($literal).to_owned())
	};
	[ $($segment:tt) / + ] => {
		$crate::PathTemplate::from_segments(vec![$($crate::path![@single $segment]), +])
	};
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown HTTP method `{0}`")]
pub struct UnknownMethod(pub String);

/// The HTTP methods a route can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
	Get,
	Head,
	Post,
	Put,
	Delete,
	Connect,
	Options,
	Trace,
	Patch,
}

impl Method {
	pub fn as_str(&self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Head => "HEAD",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
			Method::Connect => "CONNECT",
			Method::Options => "OPTIONS",
			Method::Trace => "TRACE",
			Method::Patch => "PATCH",
		}
	}
}

impl FromStr for Method {
	type Err = UnknownMethod;

	/// Parses a method token case-insensitively.
	fn from_str(token: &str) -> Result<Self, Self::Err> {
		match token.to_ascii_uppercase().as_str() {
			"GET" => Ok(Method::Get),
			"HEAD" => Ok(Method::Head),
			"POST" => Ok(Method::Post),
			"PUT" => Ok(Method::Put),
			"DELETE" => Ok(Method::Delete),
			"CONNECT" => Ok(Method::Connect),
			"OPTIONS" => Ok(Method::Options),
			"TRACE" => Ok(Method::Trace),
			"PATCH" => Ok(Method::Patch),
			_ => Err(UnknownMethod(token.to_owned())),
		}
	}
}

impl Display for Method {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A path template and method bound to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<H> {
	template: PathTemplate,
	method: Method,
	handler: H,
}

impl<H> Route<H> {
	pub fn new(template: PathTemplate, method: Method, handler: H) -> Self {
		Self {
			template,
			method,
			handler,
		}
	}

	pub fn template(&self) -> &PathTemplate {
		&self.template
	}

	pub fn method(&self) -> Method {
		self.method
	}

	pub fn handler(&self) -> &H {
		&self.handler
	}

	/// The canonical template string this route is registered under.
	pub fn key(&self) -> String {
		self.template.to_string()
	}
}

#[cfg(test)]
mod test {
	use super::{Method, Route, UnknownMethod};
	use crate::{PathTemplate, Segment};

	#[test]
	fn parses_methods_case_insensitively() {
		assert_eq!("get".parse::<Method>(), Ok(Method::Get));
		assert_eq!("Delete".parse::<Method>(), Ok(Method::Delete));
		assert_eq!("PATCH".parse::<Method>(), Ok(Method::Patch));
		assert_eq!("fetch".parse::<Method>(), Err(UnknownMethod("fetch".into())));
		assert_eq!(Method::Options.to_string(), "OPTIONS");
	}

	#[test]
	fn builds_templates_with_macro() {
		assert_eq!(path![], PathTemplate::root());
		assert_eq!(
			path![users / [id] / posts],
			PathTemplate::from_segments(vec![
				Segment::Literal("users".into()),
				Segment::Param("id".into()),
				Segment::Literal("posts".into()),
			])
		);
		assert_eq!(path![health].to_string(), "/health");
	}

	#[test]
	fn route_key_is_canonical_template() {
		let route = Route::new(PathTemplate::compile("/api/users/[id]/").unwrap(), Method::Get, ());
		assert_eq!(route.key(), "/api/users/:id");
		assert_eq!(route.method(), Method::Get);
	}
}
