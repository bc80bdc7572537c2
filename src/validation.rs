//! Input validation for addresses and header fields
//!
//! Address checks here are structural only: a single `@` separating a
//! non-empty local part from a non-empty domain. Grammar-level parsing is
//! left to lettre's address parser, which runs after these checks.

use crate::{EmailError, EmailResult};

/// Maximum total length of an address (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validate the structure of an email address.
///
/// # Examples
///
/// ```
/// use reinhardt_compose::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("user@@example.com").is_err());
/// assert!(validate_email("@example.com").is_err());
/// assert!(validate_email("user@").is_err());
/// ```
pub fn validate_email(address: &str) -> EmailResult<()> {
	if address.is_empty() {
		return Err(EmailError::InvalidAddress(
			"address must not be empty".to_string(),
		));
	}

	if address.len() > MAX_EMAIL_LENGTH {
		return Err(EmailError::InvalidAddress(format!(
			"{}: exceeds {} characters",
			address, MAX_EMAIL_LENGTH
		)));
	}

	let mut parts = address.split('@');
	let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
		(Some(local), Some(domain), None) => (local, domain),
		_ => {
			return Err(EmailError::InvalidAddress(format!(
				"{}: expected exactly one '@'",
				address
			)));
		}
	};

	if local.is_empty() {
		return Err(EmailError::InvalidAddress(format!(
			"{}: empty local part",
			address
		)));
	}

	if domain.is_empty() {
		return Err(EmailError::InvalidAddress(format!(
			"{}: empty domain part",
			address
		)));
	}

	if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
		return Err(EmailError::InvalidAddress(format!(
			"{}: contains whitespace or control characters",
			address
		)));
	}

	Ok(())
}

/// Longest header field name accepted, so the name and its colon fit on one
/// folded line.
pub const MAX_HEADER_NAME_LENGTH: usize = 76;

/// Header names that are generated from typed message state and cannot be
/// set as custom headers.
pub const RESERVED_HEADER_NAMES: [&str; 11] = [
	"From",
	"Sender",
	"To",
	"Cc",
	"Bcc",
	"Reply-To",
	"Subject",
	"Date",
	"Content-Type",
	"Content-Transfer-Encoding",
	"MIME-Version",
];

/// Validate a header field name (RFC 5322 section 2.2).
///
/// Field names are printable US-ASCII (33..=126) excluding the colon, at most
/// [`MAX_HEADER_NAME_LENGTH`] characters long.
pub fn validate_header_name(name: &str) -> EmailResult<()> {
	if name.is_empty() {
		return Err(EmailError::InvalidArgument(
			"header name must not be empty".to_string(),
		));
	}

	if name.len() > MAX_HEADER_NAME_LENGTH {
		return Err(EmailError::InvalidArgument(format!(
			"header name exceeds maximum length of {} characters",
			MAX_HEADER_NAME_LENGTH
		)));
	}

	if let Some(c) = name.chars().find(|c| !matches!(c, '!'..='9' | ';'..='~')) {
		return Err(EmailError::InvalidArgument(format!(
			"header name {:?} contains invalid character {:?}",
			name, c
		)));
	}

	Ok(())
}

/// Reject names owned by the typed address, subject, date and content state.
pub fn check_reserved_header_name(name: &str) -> EmailResult<()> {
	if RESERVED_HEADER_NAMES
		.iter()
		.any(|reserved| reserved.eq_ignore_ascii_case(name))
	{
		return Err(EmailError::InvalidArgument(format!(
			"header {:?} is set from the message itself and cannot be added",
			name
		)));
	}
	Ok(())
}

/// Reject values that would let a caller inject extra header lines.
pub fn check_header_injection(value: &str) -> EmailResult<()> {
	if value.contains('\r') || value.contains('\n') {
		return Err(EmailError::InvalidArgument(format!(
			"value {:?} contains a line break",
			value
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("cs@gmail.com")]
	#[case("csa@um.edu")]
	#[case("abcd@gd.org")]
	#[case("first.last+tag@sub.example.co.uk")]
	#[case("user@localhost")]
	fn test_validate_email_accepts(#[case] address: &str) {
		assert!(validate_email(address).is_ok());
	}

	#[rstest]
	#[case("")]
	#[case("plainaddress")]
	#[case("@example.com")]
	#[case("user@")]
	#[case("a@b@c.com")]
	#[case("user name@example.com")]
	fn test_validate_email_rejects(#[case] address: &str) {
		// Act
		let result = validate_email(address);

		// Assert
		assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
	}

	#[rstest]
	fn test_validate_email_rejects_overlong() {
		// Arrange
		let address = format!("{}@example.com", "a".repeat(MAX_EMAIL_LENGTH));

		// Act & Assert
		assert!(validate_email(&address).is_err());
	}

	#[rstest]
	#[case("X-Custom")]
	#[case("Header")]
	#[case("X-Mailer")]
	fn test_validate_header_name_accepts(#[case] name: &str) {
		assert!(validate_header_name(name).is_ok());
	}

	#[rstest]
	#[case("")]
	#[case("Bad Name")]
	#[case("Bad:Name")]
	#[case("Bad\nName")]
	#[case("Ümlaut")]
	#[case("X-Long-Header-Name-That-Keeps-Going-Past-The-Limit-Lettre-Accepts-For-Header-Names")]
	fn test_validate_header_name_rejects(#[case] name: &str) {
		assert!(matches!(
			validate_header_name(name),
			Err(EmailError::InvalidArgument(_))
		));
	}

	#[rstest]
	fn test_header_name_at_length_limit() {
		let name = "a".repeat(MAX_HEADER_NAME_LENGTH);
		assert!(validate_header_name(&name).is_ok());
	}

	#[rstest]
	#[case("From")]
	#[case("cc")]
	#[case("BCC")]
	#[case("Reply-To")]
	#[case("content-type")]
	#[case("MIME-Version")]
	fn test_check_reserved_header_name_rejects(#[case] name: &str) {
		assert!(matches!(
			check_reserved_header_name(name),
			Err(EmailError::InvalidArgument(_))
		));
	}

	#[rstest]
	#[case("X-Mailer")]
	#[case("Header")]
	#[case("Received")]
	fn test_check_reserved_header_name_accepts(#[case] name: &str) {
		assert!(check_reserved_header_name(name).is_ok());
	}

	#[rstest]
	fn test_check_header_injection() {
		assert!(check_header_injection("plain value").is_ok());
		assert!(check_header_injection("").is_ok());
		assert!(check_header_injection("value\r\nBcc: evil@example.com").is_err());
		assert!(check_header_injection("value\nX: y").is_err());
	}
}
