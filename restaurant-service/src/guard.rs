use std::sync::Arc;

use common_auth::{ensure_role, AuthError, JwtVerifier, Role};
use serde::Serialize;
use tracing::debug;

use crate::error::ServiceResult;
use crate::store::Store;

/// Identity from a verified token combined with live role and balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub balance: i64,
}

/// Turns bearer tokens into trusted user snapshots.
#[derive(Clone)]
pub struct Guard {
    verifier: Arc<JwtVerifier>,
    store: Arc<dyn Store>,
}

impl Guard {
    pub fn new(verifier: Arc<JwtVerifier>, store: Arc<dyn Store>) -> Self {
        Self { verifier, store }
    }

    /// Fails closed: an unverifiable token or a vanished user is an error,
    /// never an anonymous snapshot.
    pub async fn resolve(&self, token: &str) -> ServiceResult<AuthenticatedUser> {
        let claims = self.verifier.verify(token)?;

        let record = self
            .store
            .find_by_username(&claims.username)
            .await?
            .filter(|record| record.id == claims.user_id)
            .ok_or_else(|| AuthError::UnknownSubject(claims.username.clone()))?;

        if record.role != claims.role {
            debug!(
                user_id = record.id,
                token_role = %claims.role,
                live_role = %record.role,
                "Role changed since token was issued; using live role"
            );
        }

        Ok(AuthenticatedUser {
            id: record.id,
            username: record.username,
            role: record.role,
            balance: record.balance,
        })
    }
}

pub fn require_role(user: &AuthenticatedUser, role: Role) -> ServiceResult<()> {
    ensure_role(user.role, role)?;
    Ok(())
}
