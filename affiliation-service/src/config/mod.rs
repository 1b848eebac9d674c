use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

use crate::services::Locale;

#[derive(Debug, Clone, Deserialize)]
pub struct AffiliationConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub i18n: I18nConfig,
    pub authz: AuthzConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection before giving up.
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub public_key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct I18nConfig {
    /// Locale used when the request names no supported language.
    pub default_locale: Locale,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    /// Organization whose super admins are super admins everywhere.
    pub super_admin_org_slug: Option<String>,
}

impl AffiliationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment: Environment = lookup("ENVIRONMENT")
            .unwrap_or_else(|| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let var = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let config = AffiliationConfig {
            common,
            environment: environment.clone(),
            service_name: var("SERVICE_NAME", Some("affiliation-service"))?,
            service_version: var("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")))?,
            log_level: var("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: var("DATABASE_URL", None)?,
                max_connections: parse_number(
                    "DATABASE_MAX_CONNECTIONS",
                    var("DATABASE_MAX_CONNECTIONS", Some("10"))?,
                )?,
                min_connections: parse_number(
                    "DATABASE_MIN_CONNECTIONS",
                    var("DATABASE_MIN_CONNECTIONS", Some("1"))?,
                )?,
                acquire_timeout_secs: parse_number(
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    var("DATABASE_ACQUIRE_TIMEOUT_SECS", Some("30"))?,
                )?,
                idle_timeout_secs: parse_number(
                    "DATABASE_IDLE_TIMEOUT_SECS",
                    var("DATABASE_IDLE_TIMEOUT_SECS", Some("600"))?,
                )?,
                max_lifetime_secs: parse_number(
                    "DATABASE_MAX_LIFETIME_SECS",
                    var("DATABASE_MAX_LIFETIME_SECS", Some("1800"))?,
                )?,
            },
            jwt: JwtConfig {
                public_key_path: var("JWT_PUBLIC_KEY_PATH", None)?,
            },
            security: SecurityConfig {
                allowed_origins: var("ALLOWED_ORIGINS", Some("http://localhost:3000"))?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            i18n: I18nConfig {
                default_locale: var("DEFAULT_LOCALE", Some("en"))?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            authz: AuthzConfig {
                super_admin_org_slug: lookup("SUPER_ADMIN_ORG_SLUG").filter(|s| !s.is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.database.acquire_timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_ACQUIRE_TIMEOUT_SECS must be positive"
            )));
        }

        if self.database.idle_timeout_secs > self.database.max_lifetime_secs {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_IDLE_TIMEOUT_SECS must not exceed DATABASE_MAX_LIFETIME_SECS"
            )));
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_number<T>(key: &str, value: String) -> Result<T, AppError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    value.parse().map_err(|e: std::num::ParseIntError| {
        AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/affiliations"),
        ("JWT_PUBLIC_KEY_PATH", "keys/public.pem"),
    ];

    #[test]
    fn dev_defaults_fill_optional_values() {
        let config =
            AffiliationConfig::from_lookup(core_config::Config::default(), lookup(&REQUIRED))
                .unwrap();

        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.service_name, "affiliation-service");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.acquire_timeout_secs, 30);
        assert_eq!(config.database.idle_timeout_secs, 600);
        assert_eq!(config.database.max_lifetime_secs, 1800);
        assert_eq!(config.i18n.default_locale, Locale::En);
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.authz.super_admin_org_slug, None);
        assert_eq!(config.security.allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result = AffiliationConfig::from_lookup(
            core_config::Config::default(),
            lookup(&[("JWT_PUBLIC_KEY_PATH", "keys/public.pem")]),
        );
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn prod_refuses_defaults() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("ENVIRONMENT", "prod"));

        let result =
            AffiliationConfig::from_lookup(core_config::Config::default(), lookup(&vars));

        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn reads_locale_and_super_admin_slug() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DEFAULT_LOCALE", "FR"));
        vars.push(("SUPER_ADMIN_ORG_SLUG", "super-admin"));

        let config =
            AffiliationConfig::from_lookup(core_config::Config::default(), lookup(&vars)).unwrap();

        assert_eq!(config.i18n.default_locale, Locale::Fr);
        assert_eq!(config.authz.super_admin_org_slug.as_deref(), Some("super-admin"));
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DATABASE_MAX_CONNECTIONS", "2"));
        vars.push(("DATABASE_MIN_CONNECTIONS", "5"));

        let result =
            AffiliationConfig::from_lookup(core_config::Config::default(), lookup(&vars));

        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn reads_pool_timeouts() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DATABASE_ACQUIRE_TIMEOUT_SECS", "5"));
        vars.push(("DATABASE_IDLE_TIMEOUT_SECS", "60"));
        vars.push(("DATABASE_MAX_LIFETIME_SECS", "300"));

        let config =
            AffiliationConfig::from_lookup(core_config::Config::default(), lookup(&vars)).unwrap();

        assert_eq!(config.database.acquire_timeout_secs, 5);
        assert_eq!(config.database.idle_timeout_secs, 60);
        assert_eq!(config.database.max_lifetime_secs, 300);
    }

    #[test]
    fn rejects_zero_acquire_timeout() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DATABASE_ACQUIRE_TIMEOUT_SECS", "0"));

        let result =
            AffiliationConfig::from_lookup(core_config::Config::default(), lookup(&vars));

        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn rejects_idle_timeout_beyond_lifetime() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DATABASE_IDLE_TIMEOUT_SECS", "900"));
        vars.push(("DATABASE_MAX_LIFETIME_SECS", "600"));

        let result =
            AffiliationConfig::from_lookup(core_config::Config::default(), lookup(&vars));

        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
