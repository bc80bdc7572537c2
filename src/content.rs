//! Message body and content type

use crate::{EmailError, EmailResult};

/// MIME type assumed when content is set without one.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Body payload of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
	Text(String),
	Binary(Vec<u8>),
}

impl Body {
	pub fn as_bytes(&self) -> &[u8] {
		match self {
			Body::Text(text) => text.as_bytes(),
			Body::Binary(bytes) => bytes,
		}
	}

	pub fn len(&self) -> usize {
		self.as_bytes().len()
	}

	pub fn is_empty(&self) -> bool {
		self.as_bytes().is_empty()
	}
}

impl Default for Body {
	fn default() -> Self {
		Body::Text(String::new())
	}
}

impl From<String> for Body {
	fn from(text: String) -> Self {
		Body::Text(text)
	}
}

impl From<&str> for Body {
	fn from(text: &str) -> Self {
		Body::Text(text.to_string())
	}
}

impl From<Vec<u8>> for Body {
	fn from(bytes: Vec<u8>) -> Self {
		Body::Binary(bytes)
	}
}

impl From<&[u8]> for Body {
	fn from(bytes: &[u8]) -> Self {
		Body::Binary(bytes.to_vec())
	}
}

/// Body together with an optional content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
	body: Body,
	mime_type: Option<mime::Mime>,
}

impl Content {
	/// Create content, parsing the MIME type if one is given.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_compose::content::Content;
	///
	/// let content = Content::new("<p>Hi</p>", Some("text/html")).unwrap();
	/// assert_eq!(content.mime_type(), "text/html");
	///
	/// let content = Content::new("Hi", None).unwrap();
	/// assert_eq!(content.mime_type(), "text/plain");
	///
	/// assert!(Content::new("Hi", Some("not a type")).is_err());
	/// ```
	pub fn new(body: impl Into<Body>, mime_type: Option<&str>) -> EmailResult<Self> {
		let mime_type = mime_type
			.map(|value| {
				value.trim().parse::<mime::Mime>().map_err(|e| {
					EmailError::InvalidArgument(format!("invalid MIME type {:?}: {}", value, e))
				})
			})
			.transpose()?;
		Ok(Self {
			body: body.into(),
			mime_type,
		})
	}

	pub fn body(&self) -> &Body {
		&self.body
	}

	/// The MIME type as given, without any default applied.
	pub fn explicit_mime_type(&self) -> Option<&mime::Mime> {
		self.mime_type.as_ref()
	}

	/// The MIME type, falling back to [`DEFAULT_MIME_TYPE`].
	pub fn mime_type(&self) -> &str {
		self.mime_type
			.as_ref()
			.map(|m| m.essence_str())
			.unwrap_or(DEFAULT_MIME_TYPE)
	}

	/// Full `Content-Type` value for the message.
	///
	/// A `text/*` type without a charset parameter gets `charset`, if one is
	/// given. Text bodies are UTF-8, so that is used when no charset is set.
	pub fn content_type(&self, charset: Option<&str>) -> String {
		let mime_type = match &self.mime_type {
			Some(m) => m.clone(),
			None => mime::TEXT_PLAIN,
		};

		if mime_type.type_() != mime::TEXT || mime_type.get_param(mime::CHARSET).is_some() {
			return mime_type.to_string();
		}

		match (charset, &self.body) {
			(Some(charset), _) => format!("{}; charset={}", mime_type, charset),
			(None, Body::Text(_)) => format!("{}; charset=utf-8", mime_type),
			(None, Body::Binary(_)) => mime_type.to_string(),
		}
	}
}
