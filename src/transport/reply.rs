//! Parsing of service replies.
//!
//! Every endpoint answers with a JSON object carrying a human readable
//! `message`. The attendance endpoint adds a `status` discriminator
//! (`success`, `no_face`, `not_recognized`, `error`).

use super::TransportError;
use serde::Deserialize;

const SUCCESS: &str = "success";

#[derive(Debug, Deserialize)]
struct ReplyBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A reply the service produced, whatever its verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReply {
    http_status: u16,
    status: Option<String>,
    message: String,
}

/// What a reply to an attendance submission means for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The face was matched and attendance recorded.
    Accepted(String),
    /// The service understood the request but declined it.
    Rejected { reason: String, message: String },
}

impl ServerReply {
    pub fn new(http_status: u16, status: Option<String>, message: impl Into<String>) -> Self {
        Self {
            http_status,
            status,
            message: message.into(),
        }
    }

    /// A 200 reply with `status: "success"`.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(200, Some(SUCCESS.to_string()), message)
    }

    /// A 200 reply with a non-success status discriminator.
    pub fn rejected(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(200, Some(status.into()), message)
    }

    /// Parses a raw response body.
    ///
    /// A body that is not JSON, or carries no `message`, is a transport
    /// failure regardless of the HTTP status.
    pub fn parse(http_status: u16, body: &[u8]) -> Result<Self, TransportError> {
        let parsed: ReplyBody =
            serde_json::from_slice(body).map_err(|e| TransportError::Malformed {
                http_status,
                reason: e.to_string(),
            })?;
        let message = parsed.message.ok_or_else(|| TransportError::Malformed {
            http_status,
            reason: "reply has no message".to_string(),
        })?;
        Ok(Self {
            http_status,
            status: parsed.status,
            message,
        })
    }

    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    /// Status discriminator, if the endpoint sent one.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_http_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }

    /// Interprets the reply as an attendance verdict.
    ///
    /// The `status` discriminator decides; the HTTP code only names the
    /// reason when the discriminator is absent.
    pub fn outcome(&self) -> SubmitOutcome {
        match self.status() {
            Some(SUCCESS) => SubmitOutcome::Accepted(self.message.clone()),
            Some(other) => SubmitOutcome::Rejected {
                reason: other.to_string(),
                message: self.message.clone(),
            },
            None => SubmitOutcome::Rejected {
                reason: format!("http_{}", self.http_status),
                message: self.message.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_reply() {
        let reply = ServerReply::parse(
            200,
            br#"{"status":"success","message":"Marked present: J. Doe"}"#,
        )
        .unwrap();

        assert_eq!(
            reply.outcome(),
            SubmitOutcome::Accepted("Marked present: J. Doe".to_string())
        );
    }

    #[test]
    fn test_recognized_failure_reply() {
        let reply =
            ServerReply::parse(200, br#"{"status":"no_face","message":"No face detected."}"#)
                .unwrap();

        assert_eq!(
            reply.outcome(),
            SubmitOutcome::Rejected {
                reason: "no_face".to_string(),
                message: "No face detected.".to_string()
            }
        );
    }

    #[test]
    fn test_error_status_with_message_is_rejection() {
        let reply =
            ServerReply::parse(400, br#"{"message":"Missing session name"}"#).unwrap();

        assert!(!reply.is_http_success());
        assert_eq!(
            reply.outcome(),
            SubmitOutcome::Rejected {
                reason: "http_400".to_string(),
                message: "Missing session name".to_string()
            }
        );
    }

    #[test]
    fn test_success_discriminator_wins_over_http_code() {
        let reply = ServerReply::parse(
            409,
            br#"{"status":"success","message":"Already marked: J. Doe"}"#,
        )
        .unwrap();

        assert!(!reply.is_http_success());
        assert_eq!(
            reply.outcome(),
            SubmitOutcome::Accepted("Already marked: J. Doe".to_string())
        );
    }

    #[test]
    fn test_html_body_is_malformed() {
        let err = ServerReply::parse(502, b"<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(
            err,
            TransportError::Malformed {
                http_status: 502,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_message_is_malformed() {
        let err = ServerReply::parse(200, br#"{"status":"success"}"#).unwrap_err();
        assert!(matches!(err, TransportError::Malformed { .. }));
    }
}
