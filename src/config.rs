use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    /// Base URL of the Judge0-style execution service.
    pub judge_base_url: String,
    pub judge_api_key: Option<String>,
    /// Client-side cap on one submit-and-wait round trip, seconds.
    pub judge_timeout_secs: u64,
    /// Bounded fan-out width for per-test-case judge calls. 1 restores
    /// strictly sequential grading.
    pub judge_concurrency: usize,
    /// Webhook endpoint the notification worker delivers to.
    pub notify_webhook_url: String,
    pub public_rps: u32,
    pub integration_rps: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            judge_base_url: get_env("JUDGE_BASE_URL")?,
            judge_api_key: env::var("JUDGE_API_KEY").ok(),
            judge_timeout_secs: get_env_parse_or("JUDGE_TIMEOUT_SECS", 30)?,
            judge_concurrency: get_env_parse_or("JUDGE_CONCURRENCY", 4)?,
            notify_webhook_url: get_env("NOTIFY_WEBHOOK_URL")?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            integration_rps: get_env_parse_or("INTEGRATION_RPS", 50)?,
        };

        for (name, value) in [
            ("JUDGE_BASE_URL", &config.judge_base_url),
            ("NOTIFY_WEBHOOK_URL", &config.notify_webhook_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::Config(format!("Invalid URL in {}: {}", name, e)))?;
        }

        Ok(config)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
