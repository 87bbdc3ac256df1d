//! Configuration for Pasture
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Pasture - reflection journal backend
///
/// Where the herds graze: High, Low, Buffalo.
#[derive(Parser, Debug, Clone)]
#[command(name = "pasture")]
#[command(about = "Backend for the High/Low/Buffalo reflection journal")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "pasture")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (allows running without JWT_SECRET)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => {
                    return Err("JWT_SECRET is required in production mode".to_string());
                }
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string());
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            listen: "0.0.0.0:8000".parse().unwrap(),
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_db: "pasture".into(),
            jwt_secret: None,
            jwt_expiry_seconds: 3600,
            dev_mode: false,
            log_level: "info".into(),
        }
    }

    #[test]
    fn test_production_requires_secret() {
        let args = base_args();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let mut args = base_args();
        args.jwt_secret = Some("short".into());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_production_accepts_long_secret() {
        let mut args = base_args();
        args.jwt_secret = Some("a-secret-that-is-at-least-32-characters".into());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_dev_mode_allows_missing_secret() {
        let mut args = base_args();
        args.dev_mode = true;
        assert!(args.validate().is_ok());
    }
}
