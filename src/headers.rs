//! Custom message headers
//!
//! Headers are kept as an ordered list of `(name, value)` pairs. A name may
//! appear more than once; lookups by name are ASCII case-insensitive.

use crate::EmailResult;
use crate::validation::{
	check_header_injection, check_reserved_header_name, validate_header_name,
};

/// Ordered store of custom headers with validation on insertion.
#[derive(Debug, Clone, Default)]
pub struct HeaderStore {
	entries: Vec<(String, String)>,
}

impl HeaderStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a header.
	///
	/// Fails with [`EmailError::InvalidArgument`](crate::EmailError::InvalidArgument)
	/// if the name is empty, not a valid field name or one of the
	/// [reserved names](crate::validation::RESERVED_HEADER_NAMES), or if the
	/// value contains a line break. Nothing is stored on failure.
	pub fn add(&mut self, name: &str, value: &str) -> EmailResult<()> {
		validate_header_name(name)?;
		check_reserved_header_name(name)?;
		check_header_injection(value)?;
		self.entries.push((name.to_string(), value.to_string()));
		Ok(())
	}

	/// Replace every stored header.
	///
	/// All pairs are validated before the store is touched.
	pub fn set<I, N, V>(&mut self, headers: I) -> EmailResult<()>
	where
		I: IntoIterator<Item = (N, V)>,
		N: Into<String>,
		V: Into<String>,
	{
		let entries = headers
			.into_iter()
			.map(|(name, value)| {
				let (name, value) = (name.into(), value.into());
				validate_header_name(&name)?;
				check_reserved_header_name(&name)?;
				check_header_injection(&value)?;
				Ok((name, value))
			})
			.collect::<EmailResult<Vec<_>>>()?;
		self.entries = entries;
		Ok(())
	}

	/// Take a read-only snapshot of the stored headers.
	pub fn snapshot(&self) -> HeaderMap {
		HeaderMap {
			entries: self.entries.clone(),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Snapshot of the custom headers at the time it was taken.
///
/// # Examples
///
/// ```
/// use reinhardt_compose::HeaderStore;
///
/// let mut store = HeaderStore::new();
/// store.add("X-Tag", "first").unwrap();
/// store.add("X-Tag", "second").unwrap();
///
/// let headers = store.snapshot();
/// assert!(headers.contains_key("x-tag"));
/// assert!(headers.contains_value("first"));
/// assert_eq!(headers.get_all("X-Tag"), vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
	entries: Vec<(String, String)>,
}

impl HeaderMap {
	pub fn contains_key(&self, name: &str) -> bool {
		self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
	}

	/// Whether any stored header, under any name, has this value.
	pub fn contains_value(&self, value: &str) -> bool {
		self.entries.iter().any(|(_, v)| v == value)
	}

	/// First value stored under `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(n, _)| n.eq_ignore_ascii_case(name))
			.map(|(_, v)| v.as_str())
	}

	/// Every value stored under `name`, in insertion order.
	pub fn get_all(&self, name: &str) -> Vec<&str> {
		self.entries
			.iter()
			.filter(|(n, _)| n.eq_ignore_ascii_case(name))
			.map(|(_, v)| v.as_str())
			.collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
