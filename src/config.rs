use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.len() < 32 {
            return Err(crate::error::AppError::Config(
                "JWT_SECRET must be at least 32 bytes".into(),
            ));
        }

        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        Ok(Self {
            database_url,
            redis_url,
            port,
            jwt_secret,
            token_ttl_hours,
        })
    }

    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            port: 3000,
            jwt_secret: "test-secret-test-secret-test-secret-test".into(),
            token_ttl_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_rejects_short_jwt_secret() {
        std::env::set_var("DATABASE_URL", "postgres://localhost/marketplace");
        std::env::set_var("JWT_SECRET", "too-short");

        assert!(Config::from_env().is_err());

        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("JWT_SECRET");
    }

    #[test]
    #[serial]
    fn from_env_reads_required_values() {
        std::env::set_var("DATABASE_URL", "postgres://localhost/marketplace");
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        std::env::set_var("PORT", "8123");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.port, 8123);
        assert_eq!(cfg.token_ttl_hours, 24);

        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("JWT_SECRET");
        std::env::remove_var("PORT");
    }
}
