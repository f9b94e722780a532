use std::env;
use std::path::PathBuf;

const DEFAULT_MODEL_PATH: &str = "./model/securepay_model.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Model artifact candidates, tried in order.
    pub model_paths: Vec<PathBuf>,

    // Verification codes
    pub session_ttl_secs: u64,

    /// Pause before each analysis, in milliseconds.
    pub analysis_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let model_paths = parse_path_list(
            &env::var("MODEL_PATHS").unwrap_or_else(|_| DEFAULT_MODEL_PATH.into()),
        );

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            model_paths,
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .unwrap_or_else(|_| "3600".into())
                .parse()
                .unwrap_or(3600),
            analysis_delay_ms: env::var("ANALYSIS_DELAY_MS")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .unwrap_or(1000),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
