//! SessionConfig environment loading tests
//!
//! These mutate process environment variables, so they run serially.

use reinhardt_compose::{EmailError, SessionConfig, SmtpSecurity};
use rstest::rstest;
use serial_test::serial;
use std::time::Duration;

const EMAIL_VARS: [&str; 7] = [
	"EMAIL_HOST",
	"EMAIL_PORT",
	"EMAIL_HOST_USER",
	"EMAIL_HOST_PASSWORD",
	"EMAIL_TIMEOUT",
	"EMAIL_USE_TLS",
	"EMAIL_USE_SSL",
];

/// RAII guard for environment variables - clears every `EMAIL_*` variable
/// on creation and on drop
struct EnvVarGuard;

impl EnvVarGuard {
	fn new() -> Self {
		clear_email_vars();
		Self
	}

	fn set(&self, key: &str, value: &str) {
		unsafe {
			std::env::set_var(key, value);
		}
	}
}

impl Drop for EnvVarGuard {
	fn drop(&mut self) {
		clear_email_vars();
	}
}

fn clear_email_vars() {
	for key in EMAIL_VARS {
		unsafe {
			std::env::remove_var(key);
		}
	}
}

/// Test: nothing set gives the defaults
#[rstest]
#[serial(email_env)]
fn test_from_env_defaults() {
	// Arrange
	let _guard = EnvVarGuard::new();

	// Act
	let config = SessionConfig::from_env().unwrap();

	// Assert
	assert_eq!(config.host_name(), None);
	assert_eq!(config.port(), 25);
	assert!(config.authentication().is_none());
	assert!(matches!(
		config.resolve(),
		Err(EmailError::Configuration(_))
	));
}

/// Test: every variable is applied
#[rstest]
#[serial(email_env)]
fn test_from_env_full() {
	// Arrange
	let guard = EnvVarGuard::new();
	guard.set("EMAIL_HOST", "smtp.example.com");
	guard.set("EMAIL_PORT", "587");
	guard.set("EMAIL_HOST_USER", "mailer");
	guard.set("EMAIL_HOST_PASSWORD", "secret");
	guard.set("EMAIL_TIMEOUT", "15");
	guard.set("EMAIL_USE_TLS", "true");

	// Act
	let config = SessionConfig::from_env().unwrap();
	let session = config.resolve().unwrap();

	// Assert
	assert_eq!(session.host_name(), "smtp.example.com");
	assert_eq!(session.port(), 587);
	assert_eq!(session.security(), SmtpSecurity::StartTlsRequired);
	assert_eq!(session.socket_connection_timeout(), Duration::from_secs(15));
	let auth = session.authentication().unwrap();
	assert_eq!(auth.user(), "mailer");
	assert_eq!(auth.password(), "secret");
}

/// Test: a user without a password gets an empty password
#[rstest]
#[serial(email_env)]
fn test_from_env_user_without_password() {
	let guard = EnvVarGuard::new();
	guard.set("EMAIL_HOST_USER", "mailer");

	let config = SessionConfig::from_env().unwrap();

	assert_eq!(config.authentication().unwrap().password(), "");
}

/// Test: SSL picks the SMTPS port when no port is given
#[rstest]
#[serial(email_env)]
fn test_from_env_ssl() {
	let guard = EnvVarGuard::new();
	guard.set("EMAIL_HOST", "smtp.example.com");
	guard.set("EMAIL_USE_SSL", "1");

	let config = SessionConfig::from_env().unwrap();

	assert_eq!(config.security(), SmtpSecurity::Tls);
	assert_eq!(config.port(), 465);
}

/// Test: malformed values are configuration errors
#[rstest]
#[case("EMAIL_PORT", "not-a-port")]
#[case("EMAIL_PORT", "70000")]
#[case("EMAIL_TIMEOUT", "-1")]
#[case("EMAIL_USE_TLS", "maybe")]
#[case("EMAIL_USE_SSL", "sometimes")]
#[case("EMAIL_HOST_USER", "")]
#[serial(email_env)]
fn test_from_env_invalid(#[case] key: &str, #[case] value: &str) {
	// Arrange
	let guard = EnvVarGuard::new();
	guard.set(key, value);

	// Act
	let result = SessionConfig::from_env();

	// Assert
	assert!(
		matches!(result, Err(EmailError::Configuration(_))),
		"{}={:?} should be rejected, got {:?}",
		key,
		value,
		result
	);
}
