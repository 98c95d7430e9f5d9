use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_LLM_MODEL: &str = "deepseek/deepseek-chat-v3-0324";
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openrouter_api_key: String,
    pub llm_model: String,
    /// Root of the JSON result caches (`profiles/` and `fit/` live below it).
    pub cache_dir: PathBuf,
    pub http_cache_dir: PathBuf,
    pub http_timeout: Duration,
    pub cache_max_age: Option<Duration>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let openrouter_api_key = env::var("OPENROUTER_API_KEY")?;
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string());

        // Load server configuration with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let server_addr = SocketAddr::new(ip, port);

        let cache_dir = PathBuf::from(env::var("CACHE_DIR").unwrap_or_else(|_| "cache".to_string()));
        let http_cache_dir = PathBuf::from(env::var("HTTP_CACHE_DIR").unwrap_or_else(|_| ".cache/http".to_string()));

        let http_timeout = parse_secs(env::var("HTTP_TIMEOUT_SECS").ok().as_deref(), 12)?;
        let cache_max_age = parse_max_age_days(env::var("CACHE_MAX_AGE_DAYS").ok().as_deref())?;

        Ok(Config {
            server_addr,
            openrouter_api_key,
            llm_model,
            cache_dir,
            http_cache_dir,
            http_timeout,
            cache_max_age,
        })
    }

    pub fn profile_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("profiles")
    }

    pub fn fit_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("fit")
    }
}

fn parse_secs(raw: Option<&str>, default: u64) -> Result<Duration> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| AppError::ConfigError(format!("Invalid HTTP_TIMEOUT_SECS: {}", e))),
    }
}

fn parse_max_age_days(raw: Option<&str>) -> Result<Option<Duration>> {
    let Some(value) = raw else {
        return Ok(None);
    };
    let days = value
        .trim()
        .parse::<u64>()
        .map_err(|e| AppError::ConfigError(format!("Invalid CACHE_MAX_AGE_DAYS: {}", e)))?;
    let secs = days
        .checked_mul(SECS_PER_DAY)
        .ok_or_else(|| AppError::ConfigError(format!("CACHE_MAX_AGE_DAYS too large: {}", days)))?;
    Ok(Some(Duration::from_secs(secs)))
}
