use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::OwnerId;

/// Signed-in account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: OwnerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    /// Extract the token from an `Authorization: Bearer <token>` header value.
    pub fn from_bearer(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return None;
        }
        Some(Self(token.to_string()))
    }
}

/// Explicit caller context handed to the assembler and the summary list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: SessionToken,
    pub user: CurrentUser,
}

impl Session {
    pub fn owner_id(&self) -> &OwnerId {
        &self.user.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Result of a federated sign-in attempt (e.g. a popup flow completed by the browser).
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedLogin {
    pub provider: String,
    pub assertion: String,
}

/// A verification mail went out; the account stays signed out until it is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationNotice {
    pub email: String,
    pub code: &'static str,
    pub message: &'static str,
}

impl VerificationNotice {
    pub fn sent_to(email: impl Into<String>) -> Self {
        let code = AuthErrorCode::VerificationSent;
        Self {
            email: email.into(),
            code: code.as_str(),
            message: code.message(),
        }
    }
}

/// Identity/session seam. Password accounts must verify their email before the first login.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self, token: &SessionToken) -> Option<CurrentUser>;
    fn login_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError>;
    fn login_federated(&self, login: &FederatedLogin) -> Result<Session, AuthError>;
    /// Always ends signed out; success means a verification mail was sent.
    fn signup(&self, request: &SignupRequest) -> Result<VerificationNotice, AuthError>;
    fn resend_verification(&self, credentials: &Credentials)
        -> Result<VerificationNotice, AuthError>;
    fn logout(&self, token: &SessionToken) -> Result<(), AuthError>;

    fn session(&self, token: &SessionToken) -> Option<Session> {
        self.current_user(token).map(|user| Session {
            token: token.clone(),
            user,
        })
    }
}

/// Provider error codes with a dedicated user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    InvalidCredential,
    WrongPassword,
    UserNotFound,
    EmailAlreadyInUse,
    WeakPassword,
    EmailNotVerified,
    VerificationSent,
    PopupBlocked,
    PopupClosedByUser,
    CancelledPopupRequest,
}

impl AuthErrorCode {
    pub const ALL: [AuthErrorCode; 10] = [
        AuthErrorCode::InvalidCredential,
        AuthErrorCode::WrongPassword,
        AuthErrorCode::UserNotFound,
        AuthErrorCode::EmailAlreadyInUse,
        AuthErrorCode::WeakPassword,
        AuthErrorCode::EmailNotVerified,
        AuthErrorCode::VerificationSent,
        AuthErrorCode::PopupBlocked,
        AuthErrorCode::PopupClosedByUser,
        AuthErrorCode::CancelledPopupRequest,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            AuthErrorCode::InvalidCredential => "auth/invalid-credential",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::EmailNotVerified => "auth/email-not-verified",
            AuthErrorCode::VerificationSent => "auth/verification-sent",
            AuthErrorCode::PopupBlocked => "auth/popup-blocked",
            AuthErrorCode::PopupClosedByUser => "auth/popup-closed-by-user",
            AuthErrorCode::CancelledPopupRequest => "auth/cancelled-popup-request",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == code.trim())
    }

    pub const fn message(self) -> &'static str {
        match self {
            AuthErrorCode::InvalidCredential | AuthErrorCode::WrongPassword => {
                "Incorrect email or password."
            }
            AuthErrorCode::UserNotFound => "No account found for that email.",
            AuthErrorCode::EmailAlreadyInUse => {
                "That email is already registered. Try logging in instead."
            }
            AuthErrorCode::WeakPassword => "Password is too weak. Use at least 6 characters.",
            AuthErrorCode::EmailNotVerified => {
                "Please verify your email first. Check your inbox (and spam), then log in again."
            }
            AuthErrorCode::VerificationSent => {
                "Verification email sent. Please verify, then log in."
            }
            AuthErrorCode::PopupBlocked => {
                "Popup was blocked by the browser. Please allow popups and try again."
            }
            AuthErrorCode::PopupClosedByUser | AuthErrorCode::CancelledPopupRequest => {
                "Sign-in was cancelled."
            }
        }
    }

    /// User-initiated cancellations are not shown as errors.
    pub const fn is_suppressed(self) -> bool {
        matches!(
            self,
            AuthErrorCode::PopupClosedByUser | AuthErrorCode::CancelledPopupRequest
        )
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MIN_PASSWORD_LENGTH: usize = 6;
const FALLBACK_MESSAGE: &str = "Sign-in failed. Please try again.";

/// Failure reported by the identity provider, mapped to a human message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    code: Option<String>,
    raw_message: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode) -> Self {
        Self {
            code: Some(code.as_str().to_string()),
            raw_message: String::new(),
        }
    }

    /// Wrap an arbitrary provider error; unknown codes keep their raw message.
    pub fn from_provider(code: Option<&str>, raw_message: impl Into<String>) -> Self {
        Self {
            code: code.map(|code| code.trim().to_string()),
            raw_message: raw_message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn kind(&self) -> Option<AuthErrorCode> {
        self.code.as_deref().and_then(AuthErrorCode::parse)
    }

    pub fn is_suppressed(&self) -> bool {
        self.kind().is_some_and(AuthErrorCode::is_suppressed)
    }

    /// Message to show the user, or `None` when the error must stay silent.
    pub fn user_message(&self) -> Option<String> {
        match self.kind() {
            Some(kind) if kind.is_suppressed() => None,
            Some(kind) => Some(kind.message().to_string()),
            None if self.raw_message.trim().is_empty() => Some(FALLBACK_MESSAGE.to_string()),
            None => Some(self.raw_message.clone()),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => f.write_str(kind.message()),
            None if self.raw_message.trim().is_empty() => f.write_str(FALLBACK_MESSAGE),
            None => f.write_str(&self.raw_message),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthErrorCode> for AuthError {
    fn from(value: AuthErrorCode) -> Self {
        Self::new(value)
    }
}
