//! # Reinhardt Compose
//!
//! Email composition for Reinhardt: collect addresses, headers, subject,
//! date and body, then build them exactly once into a transport-ready MIME
//! message bound to a mail session.
//!
//! ## Features
//!
//! ### Address Book
//! - **From / To / Cc / Bcc / Reply-To**: ordered collections, validated on insertion
//! - **Bounce Address**: optional envelope sender for delivery failures
//! - **IDN Domains**: internationalized domains are encoded as ASCII for the wire
//!
//! ### Headers
//! - **Custom Headers**: ordered, multi-valued, case-insensitive lookup
//! - **Header Injection Protection**: line breaks in values are rejected
//!
//! ### Session
//! - **SMTP Settings**: host, port, credentials, connect timeout
//! - **TLS Modes**: plain, STARTTLS (opportunistic or required), implicit TLS
//! - **Environment Loading**: Django-style `EMAIL_*` variables
//!
//! ### Message Builder
//! - **One-shot Build**: `Unbuilt -> Built`, rebuilding is an error
//! - **Named Preconditions**: a failed build says which rule failed
//!
//! ## Example
//!
//! ```rust
//! # fn main() -> Result<(), reinhardt_compose::EmailError> {
//! use reinhardt_compose::{BuildFailure, Email, EmailError};
//!
//! let mut email = Email::new();
//! email.set_host_name("localhost");
//! email.set_authentication("username", "password")?;
//!
//! let session = email.mail_session()?;
//! email.create_mime_message(session);
//! email.set_content("<h1>Hello</h1>", Some("text/html"))?;
//! email.add_bcc(&["cs@gmail.com", "csa@um.edu", "abcd@gd.org"], None)?;
//! email.add_header("X-Mailer", "Reinhardt")?;
//!
//! // No From address yet
//! assert!(matches!(
//!     email.build_mime_message(),
//!     Err(EmailError::BuildValidation(BuildFailure::MissingFrom))
//! ));
//!
//! email.set_from("noreply@example.com", Some("Reinhardt"))?;
//! let message = email.build_mime_message()?;
//! assert_eq!(message.session().host_name(), "localhost");
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod content;
pub mod headers;
pub mod message;
pub mod session;
pub mod validation;

use thiserror::Error;

pub use address::{AddressBook, AddressRole, EmailAddress};
pub use content::{Body, Content};
pub use headers::{HeaderMap, HeaderStore};
pub use message::{BuildState, Email, MimeMessage};
pub use session::{Authentication, MailSession, SessionConfig, SmtpSecurity};
pub use validation::MAX_EMAIL_LENGTH;

/// Precondition that stopped a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuildFailure {
	#[error("missing from address")]
	MissingFrom,

	#[error("no recipients")]
	NoRecipients,

	#[error("no session")]
	NoSession,
}

/// Errors raised while composing or building an email.
#[derive(Debug, Error)]
pub enum EmailError {
	/// Empty or malformed argument, such as a bad header or MIME type
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Address rejected by validation or parsing
	#[error("Invalid email address: {0}")]
	InvalidAddress(String),

	/// Incomplete or unreadable session settings
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// Build precondition not met
	#[error("Cannot build message: {0}")]
	BuildValidation(BuildFailure),

	/// Operation not allowed in the current build state
	#[error("Illegal state: {0}")]
	IllegalState(String),

	/// Message assembly failed in the MIME builder
	#[error("MIME error: {0}")]
	Mime(#[from] lettre::error::Error),

	/// SMTP transport could not be set up
	#[error("Transport error: {0}")]
	Transport(String),
}

/// Result type for email operations
pub type EmailResult<T> = std::result::Result<T, EmailError>;
