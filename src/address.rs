//! Address book: From, To, Cc, Bcc and Reply-To collections
//!
//! Every address is validated when it is inserted, so anything stored here
//! can be turned into a [`Mailbox`] when the message is assembled.

use crate::validation::{check_header_injection, validate_email};
use crate::{EmailError, EmailResult};
use lettre::Address;
use lettre::message::Mailbox;
use std::fmt;

/// A validated email address with an optional display name.
///
/// # Examples
///
/// ```
/// use reinhardt_compose::EmailAddress;
///
/// let address = EmailAddress::new("csa@m.com", Some("Caitlin")).unwrap();
/// assert_eq!(address.address(), "csa@m.com");
/// assert_eq!(address.display_name(), Some("Caitlin"));
/// assert_eq!(address.to_string(), "Caitlin <csa@m.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
	address: String,
	display_name: Option<String>,
}

impl EmailAddress {
	/// Parse and validate an address.
	///
	/// Surrounding whitespace is trimmed. A blank display name is treated as
	/// absent.
	pub fn new(address: &str, display_name: Option<&str>) -> EmailResult<Self> {
		let address = address.trim();
		validate_email(address)?;
		address
			.parse::<Address>()
			.map_err(|e| EmailError::InvalidAddress(format!("{}: {}", address, e)))?;

		let display_name = display_name
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::to_string);
		if let Some(name) = &display_name {
			check_header_injection(name).map_err(|_| {
				EmailError::InvalidAddress(format!(
					"{}: display name contains a line break",
					address
				))
			})?;
		}

		Ok(Self {
			address: address.to_string(),
			display_name,
		})
	}

	/// Get the bare address (`local@domain`).
	pub fn address(&self) -> &str {
		&self.address
	}

	/// Get the display name, if any.
	pub fn display_name(&self) -> Option<&str> {
		self.display_name.as_deref()
	}

	/// Convert to a lettre [`Address`], encoding an internationalized domain
	/// as ASCII.
	pub fn to_lettre_address(&self) -> EmailResult<Address> {
		let (local, domain) = self
			.address
			.rsplit_once('@')
			.ok_or_else(|| EmailError::InvalidAddress(self.address.clone()))?;
		let domain = idna::domain_to_ascii(domain).map_err(|e| {
			EmailError::InvalidAddress(format!("{}: invalid domain ({:?})", self.address, e))
		})?;
		Address::new(local, domain)
			.map_err(|e| EmailError::InvalidAddress(format!("{}: {}", self.address, e)))
	}

	/// Convert to a lettre [`Mailbox`] for message assembly.
	pub fn to_mailbox(&self) -> EmailResult<Mailbox> {
		Ok(Mailbox::new(
			self.display_name.clone(),
			self.to_lettre_address()?,
		))
	}
}

impl fmt::Display for EmailAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.display_name {
			Some(name) => write!(f, "{} <{}>", name, self.address),
			None => f.write_str(&self.address),
		}
	}
}

/// The header slot an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressRole {
	From,
	To,
	Cc,
	Bcc,
	ReplyTo,
}

impl fmt::Display for AddressRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			AddressRole::From => "From",
			AddressRole::To => "To",
			AddressRole::Cc => "Cc",
			AddressRole::Bcc => "Bcc",
			AddressRole::ReplyTo => "Reply-To",
		})
	}
}

/// Address collections of a message.
///
/// From holds at most one address. The other roles keep insertion order and
/// permit duplicates.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
	from: Option<EmailAddress>,
	to: Vec<EmailAddress>,
	cc: Vec<EmailAddress>,
	bcc: Vec<EmailAddress>,
	reply_to: Vec<EmailAddress>,
	bounce: Option<EmailAddress>,
}

impl AddressBook {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the From address. The last write wins.
	pub fn set_from(&mut self, address: &str, display_name: Option<&str>) -> EmailResult<()> {
		self.from = Some(EmailAddress::new(address, display_name)?);
		Ok(())
	}

	/// Set the envelope sender used for bounces.
	pub fn set_bounce(&mut self, address: &str) -> EmailResult<()> {
		self.bounce = Some(EmailAddress::new(address, None)?);
		Ok(())
	}

	/// Append addresses to a list role.
	///
	/// Either every entry is appended or none is.
	pub fn add<S: AsRef<str>>(
		&mut self,
		role: AddressRole,
		addresses: &[S],
		default_display_name: Option<&str>,
	) -> EmailResult<()> {
		let parsed = parse_all(addresses, default_display_name)?;
		self.list_mut(role)?.extend(parsed);
		Ok(())
	}

	/// Replace the whole sequence of a list role.
	///
	/// An empty input is rejected and the existing sequence is kept.
	pub fn set<S: AsRef<str>>(&mut self, role: AddressRole, addresses: &[S]) -> EmailResult<()> {
		let parsed = parse_all(addresses, None)?;
		*self.list_mut(role)? = parsed;
		Ok(())
	}

	pub fn from(&self) -> Option<&EmailAddress> {
		self.from.as_ref()
	}

	pub fn bounce(&self) -> Option<&EmailAddress> {
		self.bounce.as_ref()
	}

	/// Read-only view of the addresses stored under `role`.
	pub fn get(&self, role: AddressRole) -> &[EmailAddress] {
		match role {
			AddressRole::From => self.from.as_slice(),
			AddressRole::To => &self.to,
			AddressRole::Cc => &self.cc,
			AddressRole::Bcc => &self.bcc,
			AddressRole::ReplyTo => &self.reply_to,
		}
	}

	/// Number of To, Cc and Bcc recipients.
	pub fn recipient_count(&self) -> usize {
		self.to.len() + self.cc.len() + self.bcc.len()
	}

	pub fn has_recipients(&self) -> bool {
		self.recipient_count() > 0
	}

	fn list_mut(&mut self, role: AddressRole) -> EmailResult<&mut Vec<EmailAddress>> {
		match role {
			AddressRole::From => Err(EmailError::InvalidArgument(
				"From holds a single address; use set_from".to_string(),
			)),
			AddressRole::To => Ok(&mut self.to),
			AddressRole::Cc => Ok(&mut self.cc),
			AddressRole::Bcc => Ok(&mut self.bcc),
			AddressRole::ReplyTo => Ok(&mut self.reply_to),
		}
	}
}

fn parse_all<S: AsRef<str>>(
	addresses: &[S],
	display_name: Option<&str>,
) -> EmailResult<Vec<EmailAddress>> {
	if addresses.is_empty() {
		return Err(EmailError::InvalidAddress(
			"address list must not be empty".to_string(),
		));
	}
	addresses
		.iter()
		.map(|address| EmailAddress::new(address.as_ref(), display_name))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	const TEST_EMAILS: [&str; 3] = ["cs@gmail.com", "csa@um.edu", "abcd@gd.org"];

	#[rstest]
	fn test_add_preserves_order() {
		// Arrange
		let mut book = AddressBook::new();

		// Act
		book.add(AddressRole::Bcc, &TEST_EMAILS, None).unwrap();
		book.add(AddressRole::Bcc, &["cs@gmail.com"], None).unwrap();

		// Assert
		let bcc: Vec<&str> = book
			.get(AddressRole::Bcc)
			.iter()
			.map(EmailAddress::address)
			.collect();
		assert_eq!(
			bcc,
			vec!["cs@gmail.com", "csa@um.edu", "abcd@gd.org", "cs@gmail.com"]
		);
	}

	#[rstest]
	fn test_add_is_all_or_nothing() {
		// Arrange
		let mut book = AddressBook::new();

		// Act
		let result = book.add(AddressRole::Cc, &["ok@example.com", "broken"], None);

		// Assert
		assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
		assert!(book.get(AddressRole::Cc).is_empty());
	}

	#[rstest]
	fn test_add_rejects_empty_list() {
		// Arrange
		let mut book = AddressBook::new();
		let empty: [&str; 0] = [];

		// Act
		let result = book.add(AddressRole::To, &empty, None);

		// Assert
		assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
	}

	#[rstest]
	fn test_add_applies_default_display_name() {
		// Arrange
		let mut book = AddressBook::new();

		// Act
		book.add(AddressRole::To, &TEST_EMAILS[..2], Some("Team"))
			.unwrap();

		// Assert
		assert!(
			book.get(AddressRole::To)
				.iter()
				.all(|a| a.display_name() == Some("Team"))
		);
	}

	#[rstest]
	fn test_add_from_role_is_rejected() {
		let mut book = AddressBook::new();
		let result = book.add(AddressRole::From, &["a@b.com"], None);
		assert!(matches!(result, Err(EmailError::InvalidArgument(_))));
		assert!(book.from().is_none());
	}

	#[rstest]
	fn test_set_from_last_write_wins() {
		// Arrange
		let mut book = AddressBook::new();

		// Act
		book.set_from("first@example.com", None).unwrap();
		book.set_from("second@example.com", Some("Second")).unwrap();

		// Assert
		let from = book.from().unwrap();
		assert_eq!(from.address(), "second@example.com");
		assert_eq!(from.display_name(), Some("Second"));
		assert_eq!(book.get(AddressRole::From).len(), 1);
	}

	#[rstest]
	fn test_set_from_invalid_keeps_previous() {
		let mut book = AddressBook::new();
		book.set_from("keep@example.com", None).unwrap();

		assert!(book.set_from("not-an-address", None).is_err());
		assert_eq!(book.from().unwrap().address(), "keep@example.com");
	}

	#[rstest]
	fn test_set_replaces_sequence() {
		// Arrange
		let mut book = AddressBook::new();
		book.add(AddressRole::To, &TEST_EMAILS, None).unwrap();

		// Act
		book.set(AddressRole::To, &["only@example.com"]).unwrap();

		// Assert
		assert_eq!(book.get(AddressRole::To).len(), 1);
		assert_eq!(book.get(AddressRole::To)[0].address(), "only@example.com");
	}

	#[rstest]
	fn test_set_empty_keeps_sequence() {
		let mut book = AddressBook::new();
		book.add(AddressRole::ReplyTo, &TEST_EMAILS, None).unwrap();
		let empty: Vec<String> = Vec::new();

		assert!(book.set(AddressRole::ReplyTo, &empty).is_err());
		assert_eq!(book.get(AddressRole::ReplyTo).len(), 3);
	}

	#[rstest]
	fn test_recipient_count_ignores_reply_to() {
		let mut book = AddressBook::new();
		book.add(AddressRole::ReplyTo, &TEST_EMAILS, None).unwrap();
		assert!(!book.has_recipients());

		book.add(AddressRole::Cc, &TEST_EMAILS[..1], None).unwrap();
		assert_eq!(book.recipient_count(), 1);
	}

	#[rstest]
	#[case("  padded@example.com  ", "padded@example.com")]
	#[case("plain@example.com", "plain@example.com")]
	fn test_address_is_trimmed(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(EmailAddress::new(input, None).unwrap().address(), expected);
	}

	#[rstest]
	fn test_blank_display_name_is_absent() {
		let address = EmailAddress::new("a@example.com", Some("   ")).unwrap();
		assert_eq!(address.display_name(), None);
		assert_eq!(address.to_string(), "a@example.com");
	}

	#[rstest]
	fn test_display_name_injection_is_rejected() {
		let result = EmailAddress::new("a@example.com", Some("Name\r\nBcc: x@y.com"));
		assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
	}

	#[rstest]
	fn test_idn_domain_converted_to_ascii() {
		// Arrange
		let address = EmailAddress::new("user@bücher.example", None).unwrap();

		// Act
		let converted = address.to_lettre_address().unwrap();

		// Assert
		assert_eq!(converted.domain(), "xn--bcher-kva.example");
		assert_eq!(converted.user(), "user");
	}

	#[rstest]
	fn test_to_mailbox_keeps_display_name() {
		let address = EmailAddress::new("csa@m.com", Some("Caitlin")).unwrap();
		let mailbox = address.to_mailbox().unwrap();
		assert_eq!(mailbox.name.as_deref(), Some("Caitlin"));
		assert_eq!(mailbox.email.to_string(), "csa@m.com");
	}
}
