/// Runtime configuration shared by token issuance and verification.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Issuer claim (iss) written on issue and required on verify.
    pub issuer: String,
    /// Audience claim (aud) written on issue and required on verify.
    pub audience: String,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
    /// Lifetime of an issued token.
    pub ttl_seconds: i64,
}

impl JwtConfig {
    /// Construct config with sensible defaults (30 second leeway, one day lifetime).
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds: 30,
            ttl_seconds: 86_400,
        }
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_ttl(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }
}
