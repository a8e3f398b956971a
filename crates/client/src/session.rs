//! Two-phase session establishment: OTP verification over HTTP, then an
//! authenticated WebSocket to the aggregator.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::role::Role;
use crate::wire::{RegistrationExtras, registration_record};

/// Lifecycle of one role's session attempt.
///
/// Phases only move forward. `VerifyFailed`, `ConnectFailed` and `Closed` are
/// terminal; the only recovery is a fresh `connect` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Verifying,
    VerifyFailed,
    Connecting,
    ConnectFailed,
    Open,
    Closed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::VerifyFailed | SessionPhase::ConnectFailed | SessionPhase::Closed
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Verifying => "verifying",
            SessionPhase::VerifyFailed => "verify failed",
            SessionPhase::Connecting => "connecting",
            SessionPhase::ConnectFailed => "connect failed",
            SessionPhase::Open => "open",
            SessionPhase::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Credentials issued by a successful OTP verification.
///
/// Consumed immediately to build the WebSocket target and the registration
/// payload; never persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    pub session_id: String,
    pub token: String,
    pub aggregator_url: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    otp: &'a str,
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Applies to the verify request and the WebSocket handshake.
    pub connect_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Performs the verify-then-connect sequence and hands back live handles.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    base_url: String,
    config: ConnectConfig,
    http: reqwest::Client,
}

impl Bootstrapper {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, ConnectConfig::default())
    }

    pub fn with_config(base_url: impl Into<String>, config: ConnectConfig) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        Ok(Self {
            base_url,
            config,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verify `otp` for `role` and open an authenticated connection.
    ///
    /// No retry on any failure; the caller re-invokes to recover.
    pub async fn connect(
        &self,
        role: Role,
        otp: &str,
        extras: &RegistrationExtras,
    ) -> Result<Connection> {
        let (progress, _) = watch::channel(SessionPhase::Idle);
        self.connect_with_progress(role, otp, extras, progress).await
    }

    /// Same as [`Self::connect`], publishing every phase transition on
    /// `progress`. The returned handle keeps publishing on the same channel
    /// until the transport closes.
    pub async fn connect_with_progress(
        &self,
        role: Role,
        otp: &str,
        extras: &RegistrationExtras,
        progress: watch::Sender<SessionPhase>,
    ) -> Result<Connection> {
        let otp = validate_otp(otp)?;

        progress.send_replace(SessionPhase::Verifying);
        let credentials = match self.verify(role, otp).await {
            Ok(credentials) => credentials,
            Err(error) => {
                progress.send_replace(SessionPhase::VerifyFailed);
                return Err(error);
            }
        };
        debug!(role = %role, session_id = %credentials.session_id, "OTP verified");

        let target = match ws_target(&credentials.aggregator_url, role, &credentials.session_id) {
            Ok(target) => target,
            Err(error) => {
                progress.send_replace(SessionPhase::ConnectFailed);
                return Err(error);
            }
        };

        progress.send_replace(SessionPhase::Connecting);
        let registration = registration_record(role, &credentials.token, extras);
        match Connection::establish(
            role,
            &target,
            &registration,
            self.config.connect_timeout,
            progress.clone(),
        )
        .await
        {
            Ok(connection) => {
                info!(role = %role, "session open on {target}");
                Ok(connection)
            }
            Err(error) => {
                progress.send_replace(SessionPhase::ConnectFailed);
                Err(error)
            }
        }
    }

    /// `POST {base_url}/session/{role}/verify` with the OTP as JSON body.
    async fn verify(&self, role: Role, otp: &str) -> Result<SessionCredentials> {
        let url = format!("{}/session/{}/verify", self.base_url, role);
        let response = self
            .http
            .post(&url)
            .timeout(self.config.connect_timeout)
            .json(&VerifyRequest { otp })
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    ClientError::Timeout(format!("verify request to {url}"))
                } else {
                    ClientError::ConnectionFailed(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::OtpRejected(status.to_string()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ClientError::ConnectionFailed(error.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|error| ClientError::CredentialsDecode(error.to_string()))
    }
}

/// An OTP is exactly six ASCII digits; anything else fails before any
/// network call.
pub fn validate_otp(raw: &str) -> Result<&str> {
    let otp = raw.trim();
    if otp.len() == 6 && otp.bytes().all(|byte| byte.is_ascii_digit()) {
        Ok(otp)
    } else {
        Err(ClientError::InvalidOtp)
    }
}

/// `{aggregator_url}/{role}?sessionId={url-encoded session id}`.
pub fn ws_target(aggregator_url: &str, role: Role, session_id: &str) -> Result<Url> {
    let mut url = Url::parse(aggregator_url.trim())?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(ClientError::InvalidUrl(format!(
            "aggregator URL must use ws:// or wss://, got: {}",
            url.scheme()
        )));
    }
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl("aggregator URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push(role.as_str());
    url.query_pairs_mut().append_pair("sessionId", session_id);
    Ok(url)
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::InvalidUrl("base URL must not be empty".to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::InvalidUrl(
            "base URL must use http:// or https://".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_validation_requires_exactly_six_ascii_digits() {
        struct Case {
            name: &'static str,
            input: &'static str,
            valid: bool,
        }

        let cases = vec![
            Case { name: "six digits", input: "123456", valid: true },
            Case { name: "surrounding whitespace", input: " 654321 ", valid: true },
            Case { name: "empty", input: "", valid: false },
            Case { name: "five digits", input: "12345", valid: false },
            Case { name: "seven digits", input: "1234567", valid: false },
            Case { name: "letter", input: "12345a", valid: false },
            Case { name: "inner space", input: "123 56", valid: false },
            Case { name: "fullwidth digits", input: "１２３４５６", valid: false },
        ];

        for case in cases {
            let result = validate_otp(case.input);
            if case.valid {
                assert!(result.is_ok(), "{}: expected valid", case.name);
            } else {
                assert!(
                    matches!(result, Err(ClientError::InvalidOtp)),
                    "{}: expected InvalidOtp",
                    case.name
                );
            }
        }
    }

    #[test]
    fn ws_target_appends_role_and_encoded_session_id() {
        let target = ws_target("wss://agg.example.com", Role::Agent, "S").expect("target");
        assert_eq!(target.as_str(), "wss://agg.example.com/agent?sessionId=S");

        let target = ws_target("ws://agg.example.com/", Role::Audience, "sess/ion:1").expect("target");
        assert_eq!(
            target.as_str(),
            "ws://agg.example.com/audience?sessionId=sess%2Fion%3A1"
        );
    }

    #[test]
    fn ws_target_keeps_aggregator_path_prefix() {
        let target = ws_target("wss://agg.example.com/hub", Role::Presenter, "S").expect("target");
        assert_eq!(target.as_str(), "wss://agg.example.com/hub/presenter?sessionId=S");
    }

    #[test]
    fn ws_target_rejects_non_websocket_schemes() {
        let error = ws_target("https://agg.example.com", Role::Agent, "S").expect_err("scheme");
        assert!(matches!(error, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn base_url_is_trimmed_and_validated() {
        let bootstrapper = Bootstrapper::new(" http://localhost:8080/ ").expect("bootstrapper");
        assert_eq!(bootstrapper.base_url(), "http://localhost:8080");

        assert!(matches!(
            Bootstrapper::new("   "),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            Bootstrapper::new("localhost:8080"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn terminal_phases_are_terminal() {
        assert!(SessionPhase::VerifyFailed.is_terminal());
        assert!(SessionPhase::ConnectFailed.is_terminal());
        assert!(SessionPhase::Closed.is_terminal());
        assert!(!SessionPhase::Idle.is_terminal());
        assert!(!SessionPhase::Verifying.is_terminal());
        assert!(!SessionPhase::Connecting.is_terminal());
        assert!(!SessionPhase::Open.is_terminal());
    }
}
