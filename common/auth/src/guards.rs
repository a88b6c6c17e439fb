use tracing::warn;

use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    Forbidden { required: Role },
}

/// Requires `actual` to be exactly `required`; roles do not inherit.
pub fn ensure_role(actual: Role, required: Role) -> Result<(), GuardError> {
    if actual == required {
        return Ok(());
    }
    warn!(%actual, %required, "role_check_failed");
    Err(GuardError::Forbidden { required })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_admin_check() {
        assert!(ensure_role(Role::Admin, Role::Admin).is_ok());
    }

    #[test]
    fn user_fails_admin_check() {
        let err = ensure_role(Role::User, Role::Admin).expect_err("should be forbidden");
        assert_eq!(err, GuardError::Forbidden { required: Role::Admin });
    }

    #[test]
    fn roles_do_not_inherit() {
        assert!(ensure_role(Role::Admin, Role::User).is_err());
        assert!(ensure_role(Role::User, Role::User).is_ok());
    }
}
