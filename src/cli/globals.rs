use secrecy::SecretString;

/// Runtime configuration gathered from CLI flags and environment variables.
#[derive(Clone)]
pub struct GlobalArgs {
    pub frontend_url: String,
    pub access_token_secret: SecretString,
    pub refresh_token_secret: SecretString,
    pub reset_token_secret: SecretString,
    pub otp_ttl_minutes: i64,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(frontend_url: String) -> Self {
        Self {
            frontend_url,
            access_token_secret: SecretString::default(),
            refresh_token_secret: SecretString::default(),
            reset_token_secret: SecretString::default(),
            otp_ttl_minutes: 10,
        }
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("frontend_url", &self.frontend_url)
            .field("access_token_secret", &"***")
            .field("refresh_token_secret", &"***")
            .field("reset_token_secret", &"***")
            .field("otp_ttl_minutes", &self.otp_ttl_minutes)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new("https://app.chiave.dev".to_string());
        assert_eq!(args.frontend_url, "https://app.chiave.dev");
        assert_eq!(args.access_token_secret.expose_secret(), "");
        assert_eq!(args.otp_ttl_minutes, 10);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut args = GlobalArgs::new("https://app.chiave.dev".to_string());
        args.access_token_secret = SecretString::from("topsecret".to_string());
        let debug = format!("{args:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("topsecret"));
    }
}
