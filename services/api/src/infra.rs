use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use risk_intake::assessment::{
    AuthError, AuthErrorCode, Credentials, CurrentUser, FederatedLogin, IdentityProvider,
    OwnerId, RecordId, RepositoryError, Session, SessionToken, SignupRequest, StoredSubmission,
    SubmissionStore, VerificationNotice, MIN_PASSWORD_LENGTH,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Document store kept in process memory; records are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionStore {
    records: Arc<Mutex<Vec<(OwnerId, StoredSubmission)>>>,
}

impl SubmissionStore for InMemorySubmissionStore {
    fn create(&self, owner: &OwnerId, mut document: Value) -> Result<RecordId, RepositoryError> {
        let Value::Object(fields) = &mut document else {
            return Err(RepositoryError::Rejected(
                "document must be a JSON object".to_string(),
            ));
        };
        fields.insert(
            "createdAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        let id = RecordId(Uuid::new_v4().to_string());
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))?;
        guard.push((
            owner.clone(),
            StoredSubmission {
                id: id.clone(),
                document,
            },
        ));
        Ok(id)
    }

    fn query(&self, owner: &OwnerId) -> Result<Vec<StoredSubmission>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|(record_owner, _)| record_owner == owner)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn fetch(
        &self,
        owner: &OwnerId,
        id: &RecordId,
    ) -> Result<Option<StoredSubmission>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))?;
        Ok(guard
            .iter()
            .find(|(record_owner, record)| record_owner == owner && &record.id == id)
            .map(|(_, record)| record.clone()))
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: CurrentUser,
    password: Option<String>,
    verified: bool,
}

/// Email/password and federated accounts held in memory.
///
/// New password accounts stay unverified until `confirm_email` runs, unless the
/// provider was built with `auto_verify`.
#[derive(Default)]
pub(crate) struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    sessions: Mutex<HashMap<String, CurrentUser>>,
    auto_verify: bool,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn poisoned() -> AuthError {
    AuthError::from_provider(None, "identity store unavailable")
}

impl InMemoryIdentityProvider {
    pub(crate) fn new(auto_verify: bool) -> Self {
        Self {
            auto_verify,
            ..Self::default()
        }
    }

    /// Mark an account as verified. Returns false for unknown emails.
    pub(crate) fn confirm_email(&self, email: &str) -> bool {
        let Ok(mut accounts) = self.accounts.lock() else {
            return false;
        };
        match accounts.get_mut(&normalize_email(email)) {
            Some(account) => {
                account.verified = true;
                true
            }
            None => false,
        }
    }

    fn open_session(&self, user: CurrentUser) -> Result<Session, AuthError> {
        let token = SessionToken(Uuid::new_v4().simple().to_string());
        self.sessions
            .lock()
            .map_err(|_| poisoned())?
            .insert(token.0.clone(), user.clone());
        Ok(Session { token, user })
    }

    fn checked_account(&self, credentials: &Credentials) -> Result<Account, AuthError> {
        let accounts = self.accounts.lock().map_err(|_| poisoned())?;
        let account = accounts
            .get(&normalize_email(&credentials.email))
            .ok_or(AuthErrorCode::UserNotFound)?;
        if account.password.as_deref() != Some(credentials.password.as_str()) {
            return Err(AuthErrorCode::WrongPassword.into());
        }
        Ok(account.clone())
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn current_user(&self, token: &SessionToken) -> Option<CurrentUser> {
        self.sessions.lock().ok()?.get(&token.0).cloned()
    }

    fn login_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let account = self.checked_account(credentials)?;
        if !account.verified {
            return Err(AuthErrorCode::EmailNotVerified.into());
        }
        self.open_session(account.user)
    }

    fn login_federated(&self, login: &FederatedLogin) -> Result<Session, AuthError> {
        let assertion = login.assertion.trim();
        if assertion.starts_with("auth/") {
            return Err(AuthError::from_provider(
                Some(assertion),
                format!("{} sign-in failed", login.provider),
            ));
        }
        if assertion.is_empty() {
            return Err(AuthError::from_provider(
                None,
                format!("{} returned no account", login.provider),
            ));
        }

        let email = normalize_email(assertion);
        let user = {
            let mut accounts = self.accounts.lock().map_err(|_| poisoned())?;
            let account = accounts.entry(email.clone()).or_insert_with(|| Account {
                user: CurrentUser {
                    id: OwnerId(Uuid::new_v4().to_string()),
                    display_name: None,
                    email: Some(email.clone()),
                },
                password: None,
                verified: true,
            });
            account.verified = true;
            account.user.clone()
        };
        self.open_session(user)
    }

    fn signup(&self, request: &SignupRequest) -> Result<VerificationNotice, AuthError> {
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthErrorCode::WeakPassword.into());
        }
        let email = normalize_email(&request.email);
        let mut accounts = self.accounts.lock().map_err(|_| poisoned())?;
        if accounts.contains_key(&email) {
            return Err(AuthErrorCode::EmailAlreadyInUse.into());
        }

        let display_name = request
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        accounts.insert(
            email.clone(),
            Account {
                user: CurrentUser {
                    id: OwnerId(Uuid::new_v4().to_string()),
                    display_name,
                    email: Some(email.clone()),
                },
                password: Some(request.password.clone()),
                verified: self.auto_verify,
            },
        );
        Ok(VerificationNotice::sent_to(email))
    }

    fn resend_verification(
        &self,
        credentials: &Credentials,
    ) -> Result<VerificationNotice, AuthError> {
        let account = self.checked_account(credentials)?;
        let email = account
            .user
            .email
            .unwrap_or_else(|| normalize_email(&credentials.email));
        Ok(VerificationNotice::sent_to(email))
    }

    fn logout(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.sessions
            .lock()
            .map_err(|_| poisoned())?
            .remove(&token.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials(password: &str) -> Credentials {
        Credentials {
            email: "Ana@Example.com".to_string(),
            password: password.to_string(),
        }
    }

    fn signup(provider: &InMemoryIdentityProvider) {
        provider
            .signup(&SignupRequest {
                email: "ana@example.com".to_string(),
                password: "secret1".to_string(),
                display_name: Some(" Ana ".to_string()),
            })
            .expect("signup accepted");
    }

    #[test]
    fn store_stamps_creation_time_and_scopes_by_owner() {
        let store = InMemorySubmissionStore::default();
        let owner = OwnerId("owner-1".to_string());
        let id = store
            .create(&owner, json!({ "meta": { "buildingName": "Hall" } }))
            .expect("created");

        let record = store
            .fetch(&owner, &id)
            .expect("fetch")
            .expect("record present");
        assert!(record.document["createdAt"].is_string());
        assert!(store
            .fetch(&OwnerId("owner-2".to_string()), &id)
            .expect("fetch")
            .is_none());
        assert_eq!(store.query(&owner).expect("query").len(), 1);
    }

    #[test]
    fn store_rejects_non_object_documents() {
        let store = InMemorySubmissionStore::default();
        let err = store
            .create(&OwnerId("owner-1".to_string()), json!([1, 2]))
            .expect_err("rejected");
        assert!(matches!(err, RepositoryError::Rejected(_)));
    }

    #[test]
    fn password_login_waits_for_verification() {
        let provider = InMemoryIdentityProvider::new(false);
        signup(&provider);

        let err = provider
            .login_with_password(&credentials("secret1"))
            .expect_err("unverified");
        assert_eq!(err.kind(), Some(AuthErrorCode::EmailNotVerified));

        assert!(provider.confirm_email("ana@example.com"));
        let session = provider
            .login_with_password(&credentials("secret1"))
            .expect("verified login");
        assert_eq!(session.user.display_name.as_deref(), Some("Ana"));
        assert_eq!(
            provider.current_user(&session.token),
            Some(session.user.clone())
        );

        provider.logout(&session.token).expect("logout");
        assert!(provider.current_user(&session.token).is_none());
    }

    #[test]
    fn signup_enforces_password_length_and_uniqueness() {
        let provider = InMemoryIdentityProvider::new(true);
        let weak = provider
            .signup(&SignupRequest {
                email: "ana@example.com".to_string(),
                password: "12345".to_string(),
                display_name: None,
            })
            .expect_err("weak password");
        assert_eq!(weak.kind(), Some(AuthErrorCode::WeakPassword));

        signup(&provider);
        let duplicate = provider
            .signup(&SignupRequest {
                email: "ANA@example.com".to_string(),
                password: "another1".to_string(),
                display_name: None,
            })
            .expect_err("duplicate");
        assert_eq!(duplicate.kind(), Some(AuthErrorCode::EmailAlreadyInUse));

        let wrong = provider
            .login_with_password(&credentials("secret2"))
            .expect_err("wrong password");
        assert_eq!(wrong.kind(), Some(AuthErrorCode::WrongPassword));
    }

    #[test]
    fn federated_cancellations_surface_as_suppressed_errors() {
        let provider = InMemoryIdentityProvider::default();
        let err = provider
            .login_federated(&FederatedLogin {
                provider: "google".to_string(),
                assertion: "auth/popup-closed-by-user".to_string(),
            })
            .expect_err("cancelled");
        assert!(err.is_suppressed());

        let session = provider
            .login_federated(&FederatedLogin {
                provider: "google".to_string(),
                assertion: "Lito@Example.com".to_string(),
            })
            .expect("federated login");
        assert_eq!(session.user.email.as_deref(), Some("lito@example.com"));
    }
}
