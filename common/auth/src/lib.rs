pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod roles;
pub mod signer;
pub mod verifier;

pub use claims::Claims;
pub use config::JwtConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::resolve_token;
pub use guards::{ensure_role, GuardError};
pub use roles::Role;
pub use signer::{IssuedToken, TokenSigner, TokenSubject};
pub use verifier::JwtVerifier;
