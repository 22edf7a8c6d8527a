//! Request payloads sent to the recognition service.

use crate::encoding::EncodedImage;
use std::fmt;
use thiserror::Error;

/// Errors raised when building request identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("session name must not be empty")]
    EmptySession,
    #[error("student name must not be empty")]
    EmptyName,
    #[error("registration number must not be empty")]
    EmptyRegistration,
}

/// Name of the attendance session being scanned.
///
/// Opaque to this crate; the service resolves it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Builds a session identifier, rejecting blank names.
    pub fn new(name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IdentityError::EmptySession);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One frame submitted for recognition.
#[derive(Debug, Clone)]
pub struct Submission {
    pub session: SessionId,
    pub image: EncodedImage,
    /// Per-loop submission counter, starting at 1.
    pub sequence: u64,
}

/// The student a face is being enrolled for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentIdentity {
    name: String,
    reg_no: String,
}

impl StudentIdentity {
    pub fn new(name: impl Into<String>, reg_no: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        let reg_no = reg_no.into();
        if name.trim().is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if reg_no.trim().is_empty() {
            return Err(IdentityError::EmptyRegistration);
        }
        Ok(Self { name, reg_no })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reg_no(&self) -> &str {
        &self.reg_no
    }
}

/// A batch of face images registering one student.
#[derive(Debug, Clone)]
pub struct EnrollRequest {
    pub student: StudentIdentity,
    pub images: Vec<EncodedImage>,
}
