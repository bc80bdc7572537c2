//! Mail session configuration
//!
//! [`SessionConfig`] collects the transport settings of a message (host,
//! port, credentials, timeout, TLS mode). [`SessionConfig::resolve`] turns
//! it into a [`MailSession`], the immutable handle the message builder
//! attaches to. Resolving a session never opens a connection.

use crate::{EmailError, EmailResult};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use zeroize::Zeroize;

/// Port used for plain and STARTTLS connections when none is configured.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Port used for implicit TLS connections when none is configured.
pub const DEFAULT_SSL_SMTP_PORT: u16 = 465;

/// Socket connect timeout applied when none is configured.
pub const DEFAULT_SOCKET_CONNECTION_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Transport security mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpSecurity {
	/// Plain connection
	#[default]
	None,
	/// Upgrade with STARTTLS when the server offers it
	StartTls,
	/// Fail unless the server accepts STARTTLS
	StartTlsRequired,
	/// TLS from the first byte (SMTPS)
	Tls,
}

/// SMTP login credentials.
///
/// The password is wiped from memory when the value is dropped and never
/// appears in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawAuthentication")]
pub struct Authentication {
	user: String,
	password: String,
}

/// Unchecked form of [`Authentication`] as read by serde.
#[derive(Deserialize)]
struct RawAuthentication {
	user: String,
	#[serde(default)]
	password: String,
}

impl TryFrom<RawAuthentication> for Authentication {
	type Error = EmailError;

	fn try_from(raw: RawAuthentication) -> EmailResult<Self> {
		Authentication::new(raw.user, raw.password)
	}
}

impl Authentication {
	/// Create credentials. The user must not be empty; the password may be.
	pub fn new(user: impl Into<String>, password: impl Into<String>) -> EmailResult<Self> {
		let user = user.into();
		if user.trim().is_empty() {
			return Err(EmailError::InvalidArgument(
				"authentication user must not be empty".to_string(),
			));
		}
		Ok(Self {
			user,
			password: password.into(),
		})
	}

	pub fn user(&self) -> &str {
		&self.user
	}

	pub fn password(&self) -> &str {
		&self.password
	}
}

impl fmt::Debug for Authentication {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Authentication")
			.field("user", &self.user)
			.field("password", &"<redacted>")
			.finish()
	}
}

impl Drop for Authentication {
	fn drop(&mut self) {
		self.password.zeroize();
	}
}

/// Transport settings for a message.
///
/// # Examples
///
/// ```
/// use reinhardt_compose::{SessionConfig, SmtpSecurity};
/// use std::time::Duration;
///
/// let config = SessionConfig::new()
///     .with_host_name("smtp.example.com")
///     .with_port(587)
///     .with_security(SmtpSecurity::StartTlsRequired)
///     .with_socket_connection_timeout(Duration::from_secs(10));
///
/// let session = config.resolve().unwrap();
/// assert_eq!(session.host_name(), "smtp.example.com");
/// assert_eq!(session.port(), 587);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
	host_name: Option<String>,
	port: Option<u16>,
	ssl_smtp_port: u16,
	authentication: Option<Authentication>,
	#[serde(rename = "socket_connection_timeout_ms", with = "duration_ms")]
	socket_connection_timeout: Duration,
	ssl_on_connect: bool,
	start_tls_enabled: bool,
	start_tls_required: bool,
	ssl_check_server_identity: bool,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			host_name: None,
			port: None,
			ssl_smtp_port: DEFAULT_SSL_SMTP_PORT,
			authentication: None,
			socket_connection_timeout: DEFAULT_SOCKET_CONNECTION_TIMEOUT,
			ssl_on_connect: false,
			start_tls_enabled: false,
			start_tls_required: false,
			ssl_check_server_identity: true,
		}
	}
}

impl SessionConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load settings from `EMAIL_*` environment variables.
	///
	/// Reads `EMAIL_HOST`, `EMAIL_PORT`, `EMAIL_HOST_USER`,
	/// `EMAIL_HOST_PASSWORD`, `EMAIL_TIMEOUT` (seconds), `EMAIL_USE_TLS` and
	/// `EMAIL_USE_SSL`. Unset variables keep their defaults.
	pub fn from_env() -> EmailResult<Self> {
		let mut config = Self::default();

		if let Ok(host) = std::env::var("EMAIL_HOST") {
			config.set_host_name(host);
		}

		if let Ok(port) = std::env::var("EMAIL_PORT") {
			let port = port.trim().parse::<u16>().map_err(|_| {
				EmailError::Configuration(format!("EMAIL_PORT: invalid port {:?}", port))
			})?;
			config.set_port(port);
		}

		if let Ok(user) = std::env::var("EMAIL_HOST_USER") {
			let password = std::env::var("EMAIL_HOST_PASSWORD").unwrap_or_default();
			config.set_authentication(user, password).map_err(|e| {
				EmailError::Configuration(format!("EMAIL_HOST_USER: {}", e))
			})?;
		}

		if let Ok(timeout) = std::env::var("EMAIL_TIMEOUT") {
			let secs = timeout.trim().parse::<u64>().map_err(|_| {
				EmailError::Configuration(format!("EMAIL_TIMEOUT: invalid seconds {:?}", timeout))
			})?;
			config.set_socket_connection_timeout(Duration::from_secs(secs));
		}

		if let Ok(value) = std::env::var("EMAIL_USE_TLS") {
			let enabled = parse_bool("EMAIL_USE_TLS", &value)?;
			config.set_start_tls_enabled(enabled);
			config.set_start_tls_required(enabled);
		}

		if let Ok(value) = std::env::var("EMAIL_USE_SSL") {
			config.set_ssl_on_connect(parse_bool("EMAIL_USE_SSL", &value)?);
		}

		Ok(config)
	}

	pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
		self.set_host_name(host_name);
		self
	}

	pub fn with_port(mut self, port: u16) -> Self {
		self.set_port(port);
		self
	}

	pub fn with_credentials(
		mut self,
		user: impl Into<String>,
		password: impl Into<String>,
	) -> EmailResult<Self> {
		self.set_authentication(user, password)?;
		Ok(self)
	}

	pub fn with_socket_connection_timeout(mut self, timeout: Duration) -> Self {
		self.set_socket_connection_timeout(timeout);
		self
	}

	/// Set the TLS flags to match a single security mode.
	pub fn with_security(mut self, security: SmtpSecurity) -> Self {
		self.ssl_on_connect = security == SmtpSecurity::Tls;
		self.start_tls_enabled = matches!(
			security,
			SmtpSecurity::StartTls | SmtpSecurity::StartTlsRequired
		);
		self.start_tls_required = security == SmtpSecurity::StartTlsRequired;
		self
	}

	/// Configured host name, if any.
	pub fn host_name(&self) -> Option<&str> {
		self.host_name.as_deref()
	}

	/// Set or overwrite the host name. Validation happens in [`resolve`](Self::resolve).
	pub fn set_host_name(&mut self, host_name: impl Into<String>) {
		self.host_name = Some(host_name.into());
	}

	pub fn set_port(&mut self, port: u16) {
		self.port = Some(port);
	}

	/// Port the session will use.
	///
	/// An explicit port wins. Otherwise implicit TLS uses the SSL port and
	/// everything else uses [`DEFAULT_SMTP_PORT`].
	pub fn port(&self) -> u16 {
		match self.port {
			Some(port) => port,
			None if self.ssl_on_connect => self.ssl_smtp_port,
			None => DEFAULT_SMTP_PORT,
		}
	}

	pub fn set_ssl_smtp_port(&mut self, port: u16) {
		self.ssl_smtp_port = port;
	}

	pub fn ssl_smtp_port(&self) -> u16 {
		self.ssl_smtp_port
	}

	pub fn set_authentication(
		&mut self,
		user: impl Into<String>,
		password: impl Into<String>,
	) -> EmailResult<()> {
		self.authentication = Some(Authentication::new(user, password)?);
		Ok(())
	}

	pub fn authentication(&self) -> Option<&Authentication> {
		self.authentication.as_ref()
	}

	/// Socket connect timeout; never absent.
	pub fn socket_connection_timeout(&self) -> Duration {
		self.socket_connection_timeout
	}

	pub fn set_socket_connection_timeout(&mut self, timeout: Duration) {
		self.socket_connection_timeout = timeout;
	}

	pub fn set_ssl_on_connect(&mut self, enabled: bool) {
		self.ssl_on_connect = enabled;
	}

	pub fn is_ssl_on_connect(&self) -> bool {
		self.ssl_on_connect
	}

	pub fn set_start_tls_enabled(&mut self, enabled: bool) {
		self.start_tls_enabled = enabled;
	}

	pub fn is_start_tls_enabled(&self) -> bool {
		self.start_tls_enabled
	}

	pub fn set_start_tls_required(&mut self, required: bool) {
		self.start_tls_required = required;
	}

	pub fn is_start_tls_required(&self) -> bool {
		self.start_tls_required
	}

	pub fn set_ssl_check_server_identity(&mut self, check: bool) {
		self.ssl_check_server_identity = check;
	}

	pub fn is_ssl_check_server_identity(&self) -> bool {
		self.ssl_check_server_identity
	}

	/// Effective security mode. Implicit TLS takes precedence over STARTTLS.
	pub fn security(&self) -> SmtpSecurity {
		if self.ssl_on_connect {
			SmtpSecurity::Tls
		} else if self.start_tls_required {
			SmtpSecurity::StartTlsRequired
		} else if self.start_tls_enabled {
			SmtpSecurity::StartTls
		} else {
			SmtpSecurity::None
		}
	}

	/// Resolve the configuration into a session handle.
	///
	/// Fails with [`EmailError::Configuration`] when no host name is set.
	pub fn resolve(&self) -> EmailResult<MailSession> {
		let host_name = self
			.host_name
			.as_deref()
			.map(str::trim)
			.filter(|host| !host.is_empty())
			.ok_or_else(|| EmailError::Configuration("host name not set".to_string()))?;

		let session = MailSession {
			host_name: host_name.to_string(),
			port: self.port(),
			security: self.security(),
			authentication: self.authentication.clone(),
			socket_connection_timeout: self.socket_connection_timeout,
			check_server_identity: self.ssl_check_server_identity,
		};

		tracing::debug!(
			host = %session.host_name,
			port = session.port,
			security = ?session.security,
			authenticated = session.authentication.is_some(),
			"resolved mail session"
		);

		Ok(session)
	}
}

/// A resolved, immutable transport session.
///
/// Holds everything a sender needs to reach the server. No connection is
/// made until [`transport`](Self::transport) is used to send.
#[derive(Debug, Clone)]
pub struct MailSession {
	host_name: String,
	port: u16,
	security: SmtpSecurity,
	authentication: Option<Authentication>,
	socket_connection_timeout: Duration,
	check_server_identity: bool,
}

impl MailSession {
	pub fn host_name(&self) -> &str {
		&self.host_name
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn security(&self) -> SmtpSecurity {
		self.security
	}

	pub fn authentication(&self) -> Option<&Authentication> {
		self.authentication.as_ref()
	}

	pub fn socket_connection_timeout(&self) -> Duration {
		self.socket_connection_timeout
	}

	/// Build an unconnected SMTP transport for this session.
	///
	/// The transport owns a connection pool whose housekeeping runs on the
	/// Tokio runtime, so this must be called from within one.
	pub fn transport(&self) -> EmailResult<AsyncSmtpTransport<Tokio1Executor>> {
		let tls = match self.security {
			SmtpSecurity::None => Tls::None,
			SmtpSecurity::StartTls => Tls::Opportunistic(self.tls_parameters()?),
			SmtpSecurity::StartTlsRequired => Tls::Required(self.tls_parameters()?),
			SmtpSecurity::Tls => Tls::Wrapper(self.tls_parameters()?),
		};

		let mut builder =
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.host_name.as_str())
				.port(self.port)
				.tls(tls)
				.timeout(Some(self.socket_connection_timeout));

		if let Some(auth) = &self.authentication {
			builder = builder.credentials(Credentials::new(
				auth.user().to_string(),
				auth.password().to_string(),
			));
		}

		Ok(builder.build())
	}

	fn tls_parameters(&self) -> EmailResult<TlsParameters> {
		TlsParameters::builder(self.host_name.clone())
			.dangerous_accept_invalid_hostnames(!self.check_server_identity)
			.build()
			.map_err(|e| EmailError::Transport(format!("TLS parameters: {}", e)))
	}
}

fn parse_bool(name: &str, value: &str) -> EmailResult<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"" | "0" | "false" | "no" | "off" => Ok(false),
		_ => Err(EmailError::Configuration(format!(
			"{}: invalid boolean {:?}",
			name, value
		))),
	}
}

mod duration_ms {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
