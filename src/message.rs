//! The email aggregate and its one-shot MIME build
//!
//! An [`Email`] is filled in through setters in any order. Once a session is
//! attached with [`Email::create_mime_message`], [`Email::build_mime_message`]
//! validates the composition and turns it into a [`MimeMessage`]. A message
//! is built at most once.

use crate::address::{AddressBook, AddressRole, EmailAddress};
use crate::content::{Body, Content, DEFAULT_MIME_TYPE};
use crate::headers::{HeaderMap, HeaderStore};
use crate::session::{MailSession, SessionConfig};
use crate::{BuildFailure, EmailError, EmailResult};
use chrono::{DateTime, Utc};
use lettre::Message;
use lettre::address::Envelope;
use lettre::message::SinglePart;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use std::time::{Duration, SystemTime};

/// Build progress of an [`Email`].
#[derive(Debug, Clone, Default)]
pub enum BuildState {
	#[default]
	Unbuilt,
	/// Terminal. Holds the artifact produced by the build.
	Built(MimeMessage),
}

/// A built, transport-ready MIME message.
///
/// Immutable. Carries the session it was built for so a sender can deliver
/// it without consulting the [`Email`] again.
#[derive(Debug, Clone)]
pub struct MimeMessage {
	message: Message,
	envelope: Envelope,
	session: MailSession,
}

impl MimeMessage {
	pub fn message(&self) -> &Message {
		&self.message
	}

	/// SMTP envelope. The reverse path is the bounce address when one is set.
	pub fn envelope(&self) -> &Envelope {
		&self.envelope
	}

	pub fn session(&self) -> &MailSession {
		&self.session
	}

	/// Render the message as RFC 5322 bytes.
	pub fn formatted(&self) -> Vec<u8> {
		self.message.formatted()
	}
}

/// An email under composition.
///
/// # Examples
///
/// ```
/// use reinhardt_compose::Email;
///
/// # fn main() -> Result<(), reinhardt_compose::EmailError> {
/// let mut email = Email::new();
/// email.set_host_name("localhost");
/// let session = email.mail_session()?;
///
/// email.create_mime_message(session);
/// email.set_from("sender@example.com", Some("Sender"))?;
/// email.add_to(&["alice@example.com", "bob@example.com"], None)?;
/// email.set_subject("Status");
/// email.set_content("All systems nominal.", Some("text/plain"))?;
///
/// let message = email.build_mime_message()?;
/// assert_eq!(message.envelope().to().len(), 2);
/// assert!(email.build_mime_message().is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Email {
	addresses: AddressBook,
	headers: HeaderStore,
	subject: Option<String>,
	sent_date: Option<DateTime<Utc>>,
	content: Content,
	charset: Option<String>,
	session_config: SessionConfig,
	/// Resolved by `mail_session` or injected with `set_mail_session`.
	session: Option<MailSession>,
	/// Session the MIME message is created for.
	attached_session: Option<MailSession>,
	state: BuildState,
}

impl Email {
	pub fn new() -> Self {
		Self::default()
	}

	// Addresses

	/// Set the From address, replacing any previous one.
	pub fn set_from(&mut self, address: &str, display_name: Option<&str>) -> EmailResult<()> {
		self.addresses.set_from(address, display_name)
	}

	pub fn add_to<S: AsRef<str>>(
		&mut self,
		addresses: &[S],
		default_display_name: Option<&str>,
	) -> EmailResult<()> {
		self.addresses
			.add(AddressRole::To, addresses, default_display_name)
	}

	pub fn add_cc<S: AsRef<str>>(
		&mut self,
		addresses: &[S],
		default_display_name: Option<&str>,
	) -> EmailResult<()> {
		self.addresses
			.add(AddressRole::Cc, addresses, default_display_name)
	}

	pub fn add_bcc<S: AsRef<str>>(
		&mut self,
		addresses: &[S],
		default_display_name: Option<&str>,
	) -> EmailResult<()> {
		self.addresses
			.add(AddressRole::Bcc, addresses, default_display_name)
	}

	pub fn add_to_named(&mut self, address: &str, display_name: &str) -> EmailResult<()> {
		self.add_to(&[address], Some(display_name))
	}

	pub fn add_cc_named(&mut self, address: &str, display_name: &str) -> EmailResult<()> {
		self.add_cc(&[address], Some(display_name))
	}

	pub fn add_bcc_named(&mut self, address: &str, display_name: &str) -> EmailResult<()> {
		self.add_bcc(&[address], Some(display_name))
	}

	pub fn add_reply_to(&mut self, address: &str, display_name: Option<&str>) -> EmailResult<()> {
		self.addresses
			.add(AddressRole::ReplyTo, &[address], display_name)
	}

	pub fn set_to<S: AsRef<str>>(&mut self, addresses: &[S]) -> EmailResult<()> {
		self.addresses.set(AddressRole::To, addresses)
	}

	pub fn set_cc<S: AsRef<str>>(&mut self, addresses: &[S]) -> EmailResult<()> {
		self.addresses.set(AddressRole::Cc, addresses)
	}

	pub fn set_bcc<S: AsRef<str>>(&mut self, addresses: &[S]) -> EmailResult<()> {
		self.addresses.set(AddressRole::Bcc, addresses)
	}

	pub fn set_reply_to<S: AsRef<str>>(&mut self, addresses: &[S]) -> EmailResult<()> {
		self.addresses.set(AddressRole::ReplyTo, addresses)
	}

	/// Set the envelope sender that receives bounces.
	pub fn set_bounce_address(&mut self, address: &str) -> EmailResult<()> {
		self.addresses.set_bounce(address)
	}

	pub fn bounce_address(&self) -> Option<&EmailAddress> {
		self.addresses.bounce()
	}

	pub fn from_address(&self) -> Option<&EmailAddress> {
		self.addresses.from()
	}

	pub fn to_addresses(&self) -> &[EmailAddress] {
		self.addresses.get(AddressRole::To)
	}

	pub fn cc_addresses(&self) -> &[EmailAddress] {
		self.addresses.get(AddressRole::Cc)
	}

	pub fn bcc_addresses(&self) -> &[EmailAddress] {
		self.addresses.get(AddressRole::Bcc)
	}

	pub fn reply_to_addresses(&self) -> &[EmailAddress] {
		self.addresses.get(AddressRole::ReplyTo)
	}

	// Headers

	pub fn add_header(&mut self, name: &str, value: &str) -> EmailResult<()> {
		self.headers.add(name, value)
	}

	/// Replace all custom headers. Nothing changes if any pair is invalid.
	pub fn set_headers<I, N, V>(&mut self, headers: I) -> EmailResult<()>
	where
		I: IntoIterator<Item = (N, V)>,
		N: Into<String>,
		V: Into<String>,
	{
		self.headers.set(headers)
	}

	pub fn headers(&self) -> HeaderMap {
		self.headers.snapshot()
	}

	// Subject, date and content

	pub fn set_subject(&mut self, subject: impl Into<String>) {
		self.subject = Some(subject.into());
	}

	pub fn subject(&self) -> Option<&str> {
		self.subject.as_deref()
	}

	pub fn set_sent_date(&mut self, date: DateTime<Utc>) {
		self.sent_date = Some(date);
	}

	/// The explicit sent date, or the current time when none was set.
	pub fn sent_date(&self) -> DateTime<Utc> {
		self.sent_date.unwrap_or_else(Utc::now)
	}

	/// Set the body and its MIME type. `None` leaves the type unset, which
	/// builds as `text/plain`.
	pub fn set_content(
		&mut self,
		body: impl Into<Body>,
		mime_type: Option<&str>,
	) -> EmailResult<()> {
		self.content = Content::new(body, mime_type)?;
		Ok(())
	}

	/// Set a plain text body.
	pub fn set_msg(&mut self, text: impl Into<String>) -> EmailResult<()> {
		let text = text.into();
		if text.is_empty() {
			return Err(EmailError::InvalidArgument(
				"message text must not be empty".to_string(),
			));
		}
		self.set_content(text, Some(DEFAULT_MIME_TYPE))
	}

	pub fn content(&self) -> &Content {
		&self.content
	}

	/// Charset added to `text/*` content types that do not name one.
	pub fn set_charset(&mut self, charset: &str) -> EmailResult<()> {
		let charset = charset.trim();
		let probe = format!("text/plain; charset={}", charset);
		if charset.is_empty() || probe.parse::<mime::Mime>().is_err() {
			return Err(EmailError::InvalidArgument(format!(
				"invalid charset {:?}",
				charset
			)));
		}
		self.charset = Some(charset.to_string());
		Ok(())
	}

	pub fn charset(&self) -> Option<&str> {
		self.charset.as_deref()
	}

	// Session

	/// Configured host name, falling back to the host of a session set with
	/// [`set_mail_session`](Self::set_mail_session).
	pub fn host_name(&self) -> Option<&str> {
		self.session_config
			.host_name()
			.or_else(|| self.session.as_ref().map(MailSession::host_name))
	}

	pub fn set_host_name(&mut self, host_name: impl Into<String>) {
		self.session_config.set_host_name(host_name);
		self.session = None;
	}

	pub fn set_smtp_port(&mut self, port: u16) {
		self.session_config.set_port(port);
		self.session = None;
	}

	pub fn smtp_port(&self) -> u16 {
		self.session_config.port()
	}

	pub fn set_authentication(
		&mut self,
		user: impl Into<String>,
		password: impl Into<String>,
	) -> EmailResult<()> {
		self.session_config.set_authentication(user, password)?;
		self.session = None;
		Ok(())
	}

	/// Socket connect timeout passed to the transport; never absent.
	pub fn socket_connection_timeout(&self) -> Duration {
		self.session_config.socket_connection_timeout()
	}

	pub fn set_socket_connection_timeout(&mut self, timeout: Duration) {
		self.session_config.set_socket_connection_timeout(timeout);
		self.session = None;
	}

	pub fn set_ssl_on_connect(&mut self, enabled: bool) {
		self.session_config.set_ssl_on_connect(enabled);
		self.session = None;
	}

	pub fn set_start_tls_enabled(&mut self, enabled: bool) {
		self.session_config.set_start_tls_enabled(enabled);
		self.session = None;
	}

	pub fn set_start_tls_required(&mut self, required: bool) {
		self.session_config.set_start_tls_required(required);
		self.session = None;
	}

	pub fn session_config(&self) -> &SessionConfig {
		&self.session_config
	}

	/// Replace the whole session configuration.
	pub fn set_session_config(&mut self, config: SessionConfig) {
		self.session_config = config;
		self.session = None;
	}

	/// Use an externally resolved session instead of the configuration.
	pub fn set_mail_session(&mut self, session: MailSession) {
		self.session = Some(session);
	}

	/// Resolve the session for the current configuration.
	///
	/// The result is cached until a configuration setter is called. Fails
	/// with [`EmailError::Configuration`] when no host name is set.
	pub fn mail_session(&mut self) -> EmailResult<MailSession> {
		if let Some(session) = &self.session {
			return Ok(session.clone());
		}
		let session = self.session_config.resolve()?;
		self.session = Some(session.clone());
		Ok(session)
	}

	// Build

	/// Attach the session the MIME message is created for.
	pub fn create_mime_message(&mut self, session: MailSession) {
		self.attached_session = Some(session);
	}

	pub fn build_state(&self) -> &BuildState {
		&self.state
	}

	pub fn is_built(&self) -> bool {
		matches!(self.state, BuildState::Built(_))
	}

	/// The artifact of a successful build.
	pub fn mime_message(&self) -> Option<&MimeMessage> {
		match &self.state {
			BuildState::Built(message) => Some(message),
			BuildState::Unbuilt => None,
		}
	}

	/// Validate the composition and build the MIME message.
	///
	/// Checks, in order: not already built ([`EmailError::IllegalState`]),
	/// From set, at least one To/Cc/Bcc recipient, session attached (each a
	/// [`EmailError::BuildValidation`]). On any failure the email is left
	/// unbuilt.
	pub fn build_mime_message(&mut self) -> EmailResult<MimeMessage> {
		if self.is_built() {
			tracing::warn!("rejected rebuild of an already built message");
			return Err(EmailError::IllegalState(
				"MIME message already built".to_string(),
			));
		}

		let from = self
			.addresses
			.from()
			.ok_or(EmailError::BuildValidation(BuildFailure::MissingFrom))?;
		if !self.addresses.has_recipients() {
			return Err(EmailError::BuildValidation(BuildFailure::NoRecipients));
		}
		let session = self
			.attached_session
			.as_ref()
			.ok_or(EmailError::BuildValidation(BuildFailure::NoSession))?;

		let mut builder = Message::builder();

		// Reserved names never reach the store, so custom headers cannot
		// collide with the typed headers below.
		let mut seen: Vec<&str> = Vec::new();
		for (name, _) in self.headers.iter() {
			if seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
				continue;
			}
			seen.push(name);
			let values = self
				.headers
				.iter()
				.filter(|(n, _)| n.eq_ignore_ascii_case(name))
				.map(|(_, v)| v)
				.collect::<Vec<_>>()
				.join(", ");
			let header_name = HeaderName::new_from_ascii(name.to_string()).map_err(|e| {
				EmailError::InvalidArgument(format!("header name {:?}: {:?}", name, e))
			})?;
			builder = builder.raw_header(HeaderValue::new(header_name, values));
		}

		builder = builder.from(from.to_mailbox()?);
		for address in self.addresses.get(AddressRole::To) {
			builder = builder.to(address.to_mailbox()?);
		}
		for address in self.addresses.get(AddressRole::Cc) {
			builder = builder.cc(address.to_mailbox()?);
		}
		for address in self.addresses.get(AddressRole::Bcc) {
			builder = builder.bcc(address.to_mailbox()?);
		}
		for address in self.addresses.get(AddressRole::ReplyTo) {
			builder = builder.reply_to(address.to_mailbox()?);
		}
		if let Some(subject) = &self.subject {
			builder = builder.subject(subject.as_str());
		}
		builder = builder.date(SystemTime::from(self.sent_date()));

		let content_type = self.content.content_type(self.charset.as_deref());
		let content_type = ContentType::parse(&content_type).map_err(|e| {
			EmailError::InvalidArgument(format!("content type {:?}: {}", content_type, e))
		})?;
		let part = SinglePart::builder().header(content_type);
		let part = match self.content.body() {
			Body::Text(text) => part.body(text.clone()),
			Body::Binary(bytes) => part.body(bytes.clone()),
		};
		let message = builder.singlepart(part)?;

		let envelope = match self.addresses.bounce() {
			Some(bounce) => Envelope::new(
				Some(bounce.to_lettre_address()?),
				message.envelope().to().to_vec(),
			)?,
			None => message.envelope().clone(),
		};

		let artifact = MimeMessage {
			message,
			envelope,
			session: session.clone(),
		};

		tracing::debug!(
			recipients = self.addresses.recipient_count(),
			host = %artifact.session.host_name(),
			"built MIME message"
		);

		self.state = BuildState::Built(artifact.clone());
		Ok(artifact)
	}
}
