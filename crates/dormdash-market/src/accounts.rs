//! # Identity & Session
//!
//! User accounts, credential checks, the process-wide "current user"
//! pointer, and the two-step signup flow gated by a one-time code.
//!
//! ## Signup
//!
//! ```text
//! begin_signup(form) ──▶ PendingSignup { code } ──▶ verify_signup(pending, code)
//!                                                     │ match    → code cleared, user created, signed in
//!                                                     │ mismatch → code kept, retry
//!                                                     └ no code  → CodeNotFound
//! ```
//!
//! The code is stored under `verification-code:<email>` and overwritten
//! by a later `begin_signup` for the same email. Clearing the code and
//! creating the account commit together.

use dormdash_core::{Email, PasswordDigest, UserId, ValidationError};
use dormdash_store::{EntityStore, StoreError, Txn};
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::config::MarketConfig;
use crate::error::{AuthError, MarketError, SignupError};
use crate::model::{NewUser, User, UserPatch};

/// Scalar key holding the signed-in user's id.
pub const SESSION_KEY: &str = "current-session-user-id";

/// Scalar key holding the pending verification code for `email`.
pub fn verification_key(email: &Email) -> String {
    format!("verification-code:{email}")
}

/// A six-digit code, `100000..=999999`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000u32..1_000_000).to_string()
}

/// What the signup screen collects.
#[derive(Clone)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A validated signup waiting for its code.
///
/// Holds the password digest, never the password.
#[derive(Clone)]
pub struct PendingSignup {
    pub name: String,
    pub email: Email,
    pub password: PasswordDigest,
    /// The code to present to the user (standing in for an email).
    pub code: String,
}

impl std::fmt::Debug for PendingSignup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSignup")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("code", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Profile fields a user may edit.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// Identity & Session over an [`EntityStore`].
#[derive(Debug, Clone, Copy)]
pub struct Accounts<'a> {
    store: &'a EntityStore,
    config: &'a MarketConfig,
}

impl<'a> Accounts<'a> {
    pub fn new(store: &'a EntityStore, config: &'a MarketConfig) -> Self {
        Self { store, config }
    }

    // ── Users ──────────────────────────────────────────────────────────

    /// Create an account. The email must not be registered yet.
    pub fn create_user(&self, draft: NewUser) -> Result<User, MarketError> {
        self.store.transaction(|txn| {
            if email_taken(txn, &draft.email)? {
                return Err(MarketError::EmailTaken(draft.email.to_string()));
            }
            let user = txn.create(draft)?;
            tracing::info!(user = %user.id, "account created");
            Ok(user)
        })
    }

    pub fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.store.get(id)
    }

    /// Look up by email. Input is normalized; a malformed email finds nobody.
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Ok(email) = Email::new(email) else {
            return Ok(None);
        };
        self.store.find(|u: &User| u.email == email)
    }

    pub fn users(&self) -> Result<Vec<User>, StoreError> {
        self.store.read_all()
    }

    /// Check an email/password pair.
    ///
    /// Distinguishes "no such account" from "wrong password".
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.user_by_email(email)? else {
            tracing::warn!("sign-in for unknown account");
            return Err(AuthError::NotFound);
        };
        if !user.password.verify(password) {
            tracing::warn!(user = %user.id, "sign-in with wrong password");
            return Err(AuthError::WrongPassword);
        }
        Ok(user)
    }

    // ── Session ────────────────────────────────────────────────────────

    pub fn set_session(&self, id: &UserId) -> Result<(), StoreError> {
        self.store.set_scalar(SESSION_KEY, &id.to_string())
    }

    /// The session pointer as stored. Not checked against the users.
    pub fn session(&self) -> Result<Option<UserId>, StoreError> {
        let Some(raw) = self.store.scalar(SESSION_KEY)? else {
            return Ok(None);
        };
        match raw.parse::<UserId>() {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed session pointer");
                Ok(None)
            }
        }
    }

    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.store.clear_scalar(SESSION_KEY).map(|_| ())
    }

    /// The signed-in user. A pointer to a missing user resolves to `None`.
    pub fn current_user(&self) -> Result<Option<User>, StoreError> {
        match self.session()? {
            Some(id) => self.user(&id),
            None => Ok(None),
        }
    }

    /// Verify credentials and make the user current.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.verify_credentials(email, password)?;
        self.set_session(&user.id)?;
        tracing::info!(user = %user.id, "signed in");
        Ok(user)
    }

    pub fn sign_out(&self) -> Result<(), StoreError> {
        self.clear_session()
    }

    // ── Signup ─────────────────────────────────────────────────────────

    /// Validate the form and issue a verification code for its email.
    pub fn begin_signup(&self, form: SignupForm) -> Result<PendingSignup, SignupError> {
        self.begin_signup_with(form, &mut rand::thread_rng())
    }

    /// [`Accounts::begin_signup`] with a caller-supplied code generator.
    pub fn begin_signup_with<R: Rng + ?Sized>(
        &self,
        form: SignupForm,
        rng: &mut R,
    ) -> Result<PendingSignup, SignupError> {
        let (name, email) = self.validate_form(&form)?;
        if self.user_by_email(email.as_str())?.is_some() {
            return Err(SignupError::EmailTaken(email.to_string()));
        }
        let code = generate_code(rng);
        self.store.set_scalar(&verification_key(&email), &code)?;
        tracing::info!(email = %email, "verification code issued");
        Ok(PendingSignup {
            name,
            password: PasswordDigest::new(&form.password),
            email,
            code,
        })
    }

    fn validate_form(&self, form: &SignupForm) -> Result<(String, Email), ValidationError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        let email = Email::new(&form.email)?;
        email.ensure_domain(&self.config.campus_email_domain)?;
        if form.password.chars().count() < self.config.min_password_len {
            return Err(ValidationError::PasswordTooShort {
                min: self.config.min_password_len,
            });
        }
        Ok((name.to_string(), email))
    }

    /// The code currently pending for `email`, if any.
    pub fn pending_code(&self, email: &Email) -> Result<Option<String>, StoreError> {
        self.store.scalar(&verification_key(email))
    }

    /// Submit a code for a pending signup.
    ///
    /// On a match the code is cleared, the account is created
    /// (`edu_verified`, not `id_verified`) and signed in, all in one
    /// commit. On a mismatch nothing changes.
    pub fn verify_signup(&self, pending: &PendingSignup, code: &str) -> Result<User, SignupError> {
        let key = verification_key(&pending.email);
        self.store.transaction(|txn| {
            let Some(stored) = txn.scalar(&key)? else {
                tracing::warn!(email = %pending.email, "no verification code pending");
                return Err(SignupError::CodeNotFound {
                    email: pending.email.to_string(),
                });
            };
            let matches: bool = stored.as_bytes().ct_eq(code.trim().as_bytes()).into();
            if !matches {
                tracing::warn!(email = %pending.email, "verification code rejected");
                return Err(SignupError::CodeMismatch);
            }
            txn.clear_scalar(&key)?;
            if email_taken(txn, &pending.email)? {
                return Err(SignupError::EmailTaken(pending.email.to_string()));
            }
            let user = txn.create(NewUser {
                edu_verified: true,
                ..NewUser::new(
                    pending.name.clone(),
                    pending.email.clone(),
                    pending.password.clone(),
                )
            })?;
            txn.set_scalar(SESSION_KEY, &user.id.to_string())?;
            tracing::info!(user = %user.id, "account created");
            Ok(user)
        })
    }

    // ── Profile ────────────────────────────────────────────────────────

    /// Edit name and bio. `Ok(None)` if the user does not exist.
    pub fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<Option<User>, MarketError> {
        self.store.update(
            id,
            UserPatch {
                name: update.name,
                bio: update.bio,
                ..UserPatch::default()
            },
        )
    }

    /// Record a (mocked) photo-ID check as passed.
    pub fn verify_identity(
        &self,
        id: &UserId,
        document_ref: &str,
    ) -> Result<Option<User>, MarketError> {
        let user = self.store.update::<User, _>(
            id,
            UserPatch {
                id_verified: Some(true),
                id_document: Some(document_ref.to_string()),
                ..UserPatch::default()
            },
        )?;
        if let Some(user) = &user {
            tracing::info!(user = %user.id, "identity verified");
        }
        Ok(user)
    }
}

fn email_taken(txn: &mut Txn<'_>, email: &Email) -> Result<bool, StoreError> {
    Ok(txn.find(|u: &User| &u.email == email)?.is_some())
}
