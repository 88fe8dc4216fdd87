use std::{
	collections::{hash_map, HashMap},
	fmt::{self, Display, Formatter},
};
use thiserror::Error;

/// A malformed path pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
	#[error("unmatched parameter delimiter in segment `{0}`")]
	UnmatchedDelimiter(String),
	#[error("empty parameter name in segment `{0}`")]
	EmptyParam(String),
	#[error("parameter `{0}` appears more than once")]
	DuplicateParam(String),
	/// `?` and `#` start the query and fragment of a URL, so no path could match them.
	#[error("segment `{0}` contains `?` or `#`")]
	ReservedCharacter(String),
}

/// One segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
	Literal(String),
	Param(String),
}

impl Segment {
	/// Classifies a single path component.
	///
	/// A component is a parameter only when it is wholly `[name]` or `:name`. Any other
	/// bracket inside the component is rejected rather than treated as literal text, as is
	/// any `?` or `#`.
	pub fn parse(raw: &str) -> Result<Self, PatternError> {
		if raw.contains(['?', '#']) {
			return Err(PatternError::ReservedCharacter(raw.to_owned()));
		}

		if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
			if inner.contains(['[', ']']) {
				return Err(PatternError::UnmatchedDelimiter(raw.to_owned()));
			}
			if inner.is_empty() {
				return Err(PatternError::EmptyParam(raw.to_owned()));
			}
			return Ok(Segment::Param(inner.to_owned()));
		}

		if raw.contains(['[', ']']) {
			return Err(PatternError::UnmatchedDelimiter(raw.to_owned()));
		}

		match raw.strip_prefix(':') {
			Some("") => Err(PatternError::EmptyParam(raw.to_owned())),
			Some(name) => Ok(Segment::Param(name.to_owned())),
			None => Ok(Segment::Literal(raw.to_owned())),
		}
	}
}

impl Display for Segment {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Segment::Literal(literal) => f.write_str(literal),
			Segment::Param(name) => write!(f, ":{}", name),
		}
	}
}

/// A URL path pattern made of literal and named-parameter segments.
///
/// The serialized form uses colon notation (`/users/:id`); the root template is `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathTemplate {
	segments: Vec<Segment>,
}

impl PathTemplate {
	pub fn root() -> Self {
		Self::default()
	}

	/// Builds a template from already classified segments. Parameter names are not
	/// checked for uniqueness here; use [`PathTemplate::compile`] for untrusted input.
	pub fn from_segments(segments: Vec<Segment>) -> Self {
		Self { segments }
	}

	/// Compiles a pattern in bracket (`/users/[id]`) or colon (`/users/:id`) notation.
	///
	/// Empty segments are dropped, so a trailing slash never survives compilation.
	pub fn compile(pattern: &str) -> Result<Self, PatternError> {
		let segments = pattern
			.split('/')
			.filter(|segment| !segment.is_empty())
			.map(Segment::parse)
			.collect::<Result<Vec<_>, _>>()?;

		let template = Self { segments };
		template.check_unique_params()?;
		Ok(template)
	}

	pub(crate) fn check_unique_params(&self) -> Result<(), PatternError> {
		let mut seen = Vec::new();
		for name in self.params() {
			if seen.contains(&name) {
				return Err(PatternError::DuplicateParam(name.to_owned()));
			}
			seen.push(name);
		}
		Ok(())
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	/// Names of the parameter segments, in order.
	pub fn params(&self) -> impl Iterator<Item = &str> {
		self.segments.iter().filter_map(|segment| match segment {
			Segment::Param(name) => Some(name.as_str()),
			Segment::Literal(_) => None,
		})
	}

	/// Matches the path component of `url` against this template.
	///
	/// Query strings and fragments are ignored. A single trailing slash on the URL is
	/// tolerated; otherwise segment counts must agree exactly.
	pub fn matches(&self, url: &str) -> Option<Params> {
		let path = path_component(url);
		let path = path.strip_prefix('/').unwrap_or(path);
		let path = path.strip_suffix('/').unwrap_or(path);

		let mut params = Params::default();
		let mut parts = path.split('/').filter(|_| !path.is_empty());

		for segment in &self.segments {
			let part = parts.next()?;
			match segment {
				Segment::Literal(literal) if literal == part => {}
				Segment::Literal(_) => return None,
				Segment::Param(_) if part.is_empty() => return None,
				Segment::Param(name) => {
					params.0.insert(name.clone(), part.to_owned());
				}
			}
		}

		match parts.next() {
			Some(_) => None,
			None => Some(params),
		}
	}
}

impl Display for PathTemplate {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if self.segments.is_empty() {
			return f.write_str("/");
		}
		for segment in &self.segments {
			write!(f, "/{}", segment)?;
		}
		Ok(())
	}
}

fn path_component(url: &str) -> &str {
	match url.find(['?', '#']) {
		Some(end) => &url[..end],
		None => url,
	}
}

/// Values captured by a successful template match, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
		self.0.iter()
	}

	pub fn into_inner(self) -> HashMap<String, String> {
		self.0
	}
}

impl IntoIterator for Params {
	type Item = (String, String);
	type IntoIter = hash_map::IntoIter<String, String>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

#[cfg(test)]
mod test {
	use super::{PathTemplate, PatternError, Segment};

	#[test]
	fn compiles_bracket_notation() {
		let template = PathTemplate::compile("/api/users/[id]").unwrap();
		assert_eq!(
			template.segments(),
			&[
				Segment::Literal("api".into()),
				Segment::Literal("users".into()),
				Segment::Param("id".into()),
			]
		);
		assert_eq!(template.to_string(), "/api/users/:id");
	}

	#[test]
	fn colon_and_bracket_notation_agree() {
		assert_eq!(
			PathTemplate::compile("/a/[b]/c").unwrap(),
			PathTemplate::compile("/a/:b/c").unwrap()
		);
	}

	#[test]
	fn strips_trailing_slash() {
		assert_eq!(PathTemplate::compile("/api/users/").unwrap().to_string(), "/api/users");
		assert_eq!(PathTemplate::compile("/").unwrap().to_string(), "/");
		assert!(PathTemplate::compile("").unwrap().is_root());
	}

	#[test]
	fn rejects_malformed_brackets() {
		assert_eq!(
			PathTemplate::compile("/users/[id"),
			Err(PatternError::UnmatchedDelimiter("[id".into()))
		);
		assert_eq!(
			PathTemplate::compile("/users/id]"),
			Err(PatternError::UnmatchedDelimiter("id]".into()))
		);
		assert_eq!(
			PathTemplate::compile("/users/a[id]"),
			Err(PatternError::UnmatchedDelimiter("a[id]".into()))
		);
		assert_eq!(
			PathTemplate::compile("/users/[[id]]"),
			Err(PatternError::UnmatchedDelimiter("[[id]]".into()))
		);
		assert_eq!(PathTemplate::compile("/users/[]"), Err(PatternError::EmptyParam("[]".into())));
		assert_eq!(
			PathTemplate::compile("/help/faq?"),
			Err(PatternError::ReservedCharacter("faq?".into()))
		);
		assert_eq!(
			PathTemplate::compile("/a#b"),
			Err(PatternError::ReservedCharacter("a#b".into()))
		);
		assert_eq!(
			PathTemplate::compile("/[id?]"),
			Err(PatternError::ReservedCharacter("[id?]".into()))
		);
	}

	#[test]
	fn rejects_duplicate_params() {
		assert_eq!(
			PathTemplate::compile("/[id]/x/[id]"),
			Err(PatternError::DuplicateParam("id".into()))
		);
	}

	#[test]
	fn dots_stay_literal() {
		let template = PathTemplate::compile("/files/v1.2").unwrap();
		assert!(template.matches("/files/v1.2").is_some());
		assert!(template.matches("/files/v1").is_none());
	}

	#[test]
	fn captures_params() {
		let template = PathTemplate::compile("/api/users/[id]").unwrap();
		let params = template.matches("/api/users/42").unwrap();
		assert_eq!(params.get("id"), Some("42"));
		assert_eq!(params.len(), 1);
	}

	#[test]
	fn segment_count_must_agree() {
		let template = PathTemplate::compile("/api/users/[id]").unwrap();
		assert!(template.matches("/api/users").is_none());
		assert!(template.matches("/api/users/42/posts").is_none());
		assert!(template.matches("/api/users//").is_none());
	}

	#[test]
	fn literals_match_exactly() {
		let template = PathTemplate::compile("/api/users").unwrap();
		assert!(template.matches("/api/users").is_some());
		assert!(template.matches("/api/Users").is_none());
		assert!(template.matches("/api/user").is_none());
	}

	#[test]
	fn ignores_query_and_fragment() {
		let template = PathTemplate::compile("/api/users/[id]").unwrap();
		let params = template.matches("/api/users/7?expand=true#top").unwrap();
		assert_eq!(params.get("id"), Some("7"));
	}

	#[test]
	fn tolerates_one_trailing_slash() {
		let template = PathTemplate::compile("/api/users").unwrap();
		assert!(template.matches("/api/users/").is_some());
	}

	#[test]
	fn root_matches_only_root() {
		let root = PathTemplate::root();
		assert!(root.matches("/").is_some());
		assert!(root.matches("").is_some());
		assert!(root.matches("/?q=1").is_some());
		assert!(root.matches("/api").is_none());
	}

	#[test]
	fn params_round_trip_through_a_concrete_url() {
		let template = PathTemplate::compile("/api/[org]/repos/[repo]").unwrap();
		let url: String = template
			.segments()
			.iter()
			.map(|segment| match segment {
				Segment::Literal(literal) => format!("/{}", literal),
				Segment::Param(name) => format!("/{}-value", name),
			})
			.collect();

		let params = template.matches(&url).unwrap();
		assert_eq!(params.get("org"), Some("org-value"));
		assert_eq!(params.get("repo"), Some("repo-value"));
		assert_eq!(template.params().collect::<Vec<_>>(), vec!["org", "repo"]);
	}
}
