// ============================
// backend-lib/src/auth/gateway.rs
// ============================
//! Account orchestration: registration, login, bearer authorization and the
//! owner-only operations built on them.
use std::sync::Arc;

use accounts_common::{
    DeleteUserRequest, LoginRequest, RegisterRequest, UpdatePasswordRequest, UpdateUserRequest,
    VerifyCodeRequest,
};
use metrics::counter;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::password::{failed_rules, hash_password_secure, verify_password_secure};
use crate::auth::token::{Identity, TokenManager, STANDARD_ROLE};
use crate::error::AppError;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCEEDED, TOKEN_REJECTED, USER_DELETED, USER_REGISTERED};
use crate::storage::{NewUser, StoreError, UserRecord, UserStore, UserUpdate};
use crate::validation::{validate_email, validate_registration, validate_required, validate_update};
use crate::verification::{IssuedCode, VerificationCodes};

/// Session lifetime granted at login
pub const SESSION_TTL_MINUTES: u32 = 30;

const BEARER_SCHEME: &str = "bearer";

/// Map a unique-constraint violation to the error naming the clashing field
fn map_conflict(err: StoreError) -> AppError {
    match err {
        StoreError::Conflict { column } => match column.as_str() {
            "email" => AppError::DuplicateEmail,
            "phone" => AppError::DuplicatePhone,
            _ => AppError::DuplicateKey,
        },
        StoreError::NotFound => AppError::UserNotFound,
        other => AppError::Store(other),
    }
}

fn map_missing(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::UserNotFound,
        other => AppError::Store(other),
    }
}

/// Hash off the async runtime; scrypt is deliberately slow
async fn hash_blocking(mut plain: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password_secure(&mut plain))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(AppError::from)
}

async fn verify_blocking(mut plain: String, digest: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password_secure(&mut plain, &digest))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
        .map_err(AppError::from)
}

/// Extract the token from an `Authorization` header value.
///
/// Exactly two space-separated parts, the first being `Bearer` in any case.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.ok_or(AppError::MissingToken)?;
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty() => Ok(token),
        _ => Err(AppError::MissingToken),
    }
}

/// Fails with [`AppError::Forbidden`] unless `identity` owns `target_id`
pub fn ensure_owner(identity: &Identity, target_id: &str) -> Result<(), AppError> {
    if identity.subject_id == target_id {
        Ok(())
    } else {
        warn!(subject = %identity.subject_id, target = %target_id, "ownership check failed");
        Err(AppError::Forbidden)
    }
}

/// Entry point for every account operation
pub struct AuthGateway {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenManager>,
    codes: Arc<VerificationCodes>,
    session_ttl_minutes: u32,
}

impl AuthGateway {
    pub fn new(store: Arc<dyn UserStore>, tokens: Arc<TokenManager>, codes: Arc<VerificationCodes>) -> Self {
        Self {
            store,
            tokens,
            codes,
            session_ttl_minutes: SESSION_TTL_MINUTES,
        }
    }

    pub fn with_session_ttl(mut self, minutes: u32) -> Self {
        self.session_ttl_minutes = minutes;
        self
    }

    /// Validate, hash and store a new user
    #[instrument(skip_all)]
    pub async fn register(&self, req: RegisterRequest) -> Result<UserRecord, AppError> {
        validate_registration(&req)?;

        let failed = failed_rules(&req.password);
        if !failed.is_empty() {
            return Err(AppError::WeakPassword(failed));
        }

        let email = validate_email(&req.email)?;
        let password_hash = hash_blocking(req.password).await?;

        let user = NewUser {
            id: Uuid::new_v4().simple().to_string(),
            lastname: req.lastname.trim().to_string(),
            firstname: req.firstname.trim().to_string(),
            email,
            phone: req.phone.trim().to_string(),
            address: req.address.trim().to_string(),
            password_hash,
        };

        let record = self.store.create_user(user).await.map_err(map_conflict)?;
        counter!(USER_REGISTERED).increment(1);
        info!(user_id = %record.id, "user registered");
        Ok(record)
    }

    /// Check credentials and issue a session token
    #[instrument(skip_all)]
    pub async fn login(&self, req: LoginRequest) -> Result<(UserRecord, String), AppError> {
        let email = req.email.trim().to_lowercase();
        if email.is_empty() || req.password.is_empty() {
            return Err(AppError::InvalidInput("email and password are required".to_string()));
        }

        let user = match self.store.get_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                counter!(LOGIN_FAILED).increment(1);
                return Err(AppError::UserNotFound);
            }
            Err(e) => return Err(AppError::Store(e)),
        };

        if !verify_blocking(req.password, user.password_hash.clone()).await? {
            counter!(LOGIN_FAILED).increment(1);
            warn!(user_id = %user.id, "login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue_token(&user.id, STANDARD_ROLE, self.session_ttl_minutes)?;
        counter!(LOGIN_SUCCEEDED).increment(1);
        info!(user_id = %user.id, "user logged in");
        Ok((user, token))
    }

    /// Resolve the caller from an `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> Result<Identity, AppError> {
        let token = parse_bearer(header)?;
        self.tokens.verify_token(token).map_err(|e| {
            counter!(TOKEN_REJECTED).increment(1);
            AppError::Token(e)
        })
    }

    /// The caller's own record
    pub async fn profile(&self, identity: &Identity) -> Result<UserRecord, AppError> {
        self.store.get_by_id(&identity.subject_id).await.map_err(map_missing)
    }

    #[instrument(skip_all, fields(subject = %identity.subject_id))]
    pub async fn update_user(&self, identity: &Identity, req: UpdateUserRequest) -> Result<UserRecord, AppError> {
        ensure_owner(identity, &req.id)?;
        validate_update(&req)?;

        let update = UserUpdate {
            id: req.id,
            email: validate_email(&req.email)?,
            phone: req.phone.trim().to_string(),
            address: req.address.trim().to_string(),
        };
        let record = self.store.update_user(update).await.map_err(map_conflict)?;
        info!("user updated");
        Ok(record)
    }

    #[instrument(skip_all, fields(subject = %identity.subject_id))]
    pub async fn update_password(
        &self,
        identity: &Identity,
        req: UpdatePasswordRequest,
    ) -> Result<UserRecord, AppError> {
        ensure_owner(identity, &req.id)?;

        let failed = failed_rules(&req.password);
        if !failed.is_empty() {
            return Err(AppError::WeakPassword(failed));
        }

        let password_hash = hash_blocking(req.password).await?;
        let record = self
            .store
            .update_credential(&req.id, &password_hash)
            .await
            .map_err(map_missing)?;
        info!("password updated");
        Ok(record)
    }

    #[instrument(skip_all, fields(subject = %identity.subject_id))]
    pub async fn delete_user(&self, identity: &Identity, req: DeleteUserRequest) -> Result<(), AppError> {
        ensure_owner(identity, &req.id)?;
        self.store.delete_user(&req.id).await.map_err(map_missing)?;
        counter!(USER_DELETED).increment(1);
        info!("user deleted");
        Ok(())
    }

    /// Find a user by email
    pub async fn lookup_email(&self, email: &str) -> Result<UserRecord, AppError> {
        let email = validate_email(email)?;
        self.store.get_by_email(&email).await.map_err(map_missing)
    }

    /// Issue a verification code to the user registered under `email`
    #[instrument(skip_all)]
    pub async fn send_code(&self, email: &str) -> Result<(UserRecord, IssuedCode), AppError> {
        let user = self.lookup_email(email).await?;
        let issued = self.codes.request_code(&user.id, &user.email).await?;
        Ok((user, issued))
    }

    /// Redeem a verification code
    pub async fn verify_code(&self, req: VerifyCodeRequest) -> Result<(), AppError> {
        validate_required("user_id", &req.user_id)?;
        validate_required("code", &req.code)?;
        self.codes.verify_code(&req.user_id, req.code.trim()).await?;
        Ok(())
    }
}
