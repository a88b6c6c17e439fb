use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use common_auth::{IssuedToken, Role, TokenSigner, TokenSubject};
use rand_core::OsRng;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{NewUser, Store, StoreError, UserRecord};

const MAX_USERNAME_LEN: usize = 64;

pub fn hash_password(password: &str) -> ServiceResult<String> {
    if password.trim().is_empty() {
        return Err(ServiceError::validation("invalid_password", "Password must not be empty"));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::PasswordHash(err.to_string()))
}

/// One-way comparison of `plaintext` against the stored hash.
pub fn verify_password(record: &UserRecord, plaintext: &str) -> bool {
    match PasswordHash::new(&record.password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(user_id = record.id, error = %err, "Stored password hash is unreadable");
            false
        }
    }
}

fn normalize_username(username: &str) -> ServiceResult<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("invalid_username", "Username must not be empty"));
    }
    if trimmed.chars().count() > MAX_USERNAME_LEN {
        return Err(ServiceError::validation(
            "invalid_username",
            format!("Username must be at most {MAX_USERNAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Registers a plain user with an empty bank.
pub async fn signup(store: &dyn Store, username: &str, password: &str) -> ServiceResult<UserRecord> {
    let username = normalize_username(username)?;
    let password_hash = hash_password(password)?;

    match store.create_user(NewUser::customer(username, password_hash)).await {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "User signed up");
            Ok(user)
        }
        Err(StoreError::Duplicate) => Err(ServiceError::DuplicateUser),
        Err(err) => Err(err.into()),
    }
}

pub async fn login(
    store: &dyn Store,
    signer: &TokenSigner,
    username: &str,
    password: &str,
) -> ServiceResult<IssuedToken> {
    let user = store
        .find_by_username(username.trim())
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    if !verify_password(&user, password) {
        return Err(ServiceError::IncorrectPassword);
    }

    let subject = TokenSubject {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
    };
    Ok(signer.issue(&subject)?)
}

/// Makes sure an admin account named `username` exists, creating it if needed.
pub async fn ensure_admin(store: &dyn Store, username: &str, password: &str) -> ServiceResult<UserRecord> {
    let username = normalize_username(username)?;
    if let Some(existing) = store.find_by_username(&username).await? {
        return existing_admin(existing);
    }

    let user = NewUser {
        username: username.clone(),
        password_hash: hash_password(password)?,
        role: Role::Admin,
        balance: 0,
    };
    match store.create_user(user).await {
        Ok(admin) => {
            info!(user_id = admin.id, username = %admin.username, "Bootstrap admin created");
            Ok(admin)
        }
        Err(StoreError::Duplicate) => {
            let existing = store
                .find_by_username(&username)
                .await?
                .ok_or(ServiceError::UserNotFound)?;
            existing_admin(existing)
        }
        Err(err) => Err(err.into()),
    }
}

fn existing_admin(existing: UserRecord) -> ServiceResult<UserRecord> {
    if existing.role != Role::Admin {
        warn!(username = %existing.username, "Bootstrap admin name belongs to a non-admin user");
        return Err(ServiceError::AdminNameTaken(existing.username));
    }
    Ok(existing)
}
