use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use platform_authn::TokenConfig;

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 5;
const DEFAULT_REFRESH_TTL_MINUTES: i64 = 24 * 60;
const MAX_TTL_MINUTES: i64 = 366 * 24 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub tokens: TokenConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = get("JWT_SECRET_BASE64").context("JWT_SECRET_BASE64 missing")?;
        let secret_bytes = STANDARD
            .decode(secret.trim())
            .context("invalid JWT_SECRET_BASE64")?;
        if secret_bytes.len() < 32 {
            return Err(anyhow!("JWT_SECRET_BASE64 must decode to at least 32 bytes"));
        }

        let access_ttl = minutes(&get, "ACCESS_TOKEN_TTL_MINUTES", DEFAULT_ACCESS_TTL_MINUTES)?;
        let refresh_ttl = minutes(&get, "REFRESH_TOKEN_TTL_MINUTES", DEFAULT_REFRESH_TTL_MINUTES)?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            tokens: TokenConfig::new(secret_bytes, access_ttl, refresh_ttl),
            cors_allowed_origins,
        })
    }
}

fn minutes<F>(get: &F, key: &str, default: i64) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => {
            let value: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of minutes"))?;
            if value <= 0 {
                return Err(anyhow!("{key} must be positive"));
            }
            if value > MAX_TTL_MINUTES {
                return Err(anyhow!("{key} must not exceed {MAX_TTL_MINUTES} minutes"));
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_source(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let secret = STANDARD.encode([7u8; 32]);
        let config = load(&[("JWT_SECRET_BASE64", &secret)]).unwrap();
        assert_eq!(config.tokens.access_ttl_minutes, 5);
        assert_eq!(config.tokens.refresh_ttl_minutes, 1440);
        assert_eq!(config.cors_allowed_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn short_or_missing_secret_is_rejected() {
        assert!(load(&[]).is_err());
        let short = STANDARD.encode([1u8; 16]);
        assert!(load(&[("JWT_SECRET_BASE64", &short)]).is_err());
    }

    #[test]
    fn origins_and_ttls_are_parsed() {
        let secret = STANDARD.encode([9u8; 48]);
        let config = load(&[
            ("JWT_SECRET_BASE64", &secret),
            ("ACCESS_TOKEN_TTL_MINUTES", "15"),
            ("CORS_ALLOWED_ORIGINS", "https://a.test, ,https://b.test"),
        ])
        .unwrap();
        assert_eq!(config.tokens.access_ttl_minutes, 15);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.test", "https://b.test"]
        );
        assert!(
            load(&[
                ("JWT_SECRET_BASE64", &secret),
                ("REFRESH_TOKEN_TTL_MINUTES", "soon")
            ])
            .is_err()
        );
    }

    #[test]
    fn ttls_are_bounded() {
        let secret = STANDARD.encode([9u8; 32]);
        for raw in ["0", "-5", "9223372036854775807"] {
            assert!(
                load(&[
                    ("JWT_SECRET_BASE64", &secret),
                    ("ACCESS_TOKEN_TTL_MINUTES", raw)
                ])
                .is_err(),
                "{raw} accepted"
            );
        }
        let year = load(&[
            ("JWT_SECRET_BASE64", &secret),
            ("REFRESH_TOKEN_TTL_MINUTES", "525600"),
        ])
        .unwrap();
        assert_eq!(year.tokens.refresh_ttl_minutes, 525_600);
    }
}
