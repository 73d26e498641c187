use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory uploaded files are written to
    #[arg(long, env = "UPLOAD_DIR")]
    pub upload_dir: Option<String>,

    /// Model used when a chat request does not name one
    #[arg(long)]
    pub default_model: Option<String>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub uploads: UploadConfig,
    pub resilience: ResilienceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub default_model: String,
    #[serde(default)]
    pub deployment_name: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub dir: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("inference.base_url", "https://api.openai.com")?
            .set_default("inference.default_model", "gpt-4o-mini")?
            .set_default("inference.request_timeout_secs", 60)?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_body_bytes", 10 * 1024 * 1024)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 120)?
            .set_default("logging.json", false)?;

        // 2. Config file: explicit path is required, ./config.{yaml,toml,json} is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment variables prefixed with CHAT_, e.g. CHAT_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. Unprefixed LLM_* variables shared with other tooling
        if let Ok(val) = env::var("LLM_BASE_URL")
            && !val.trim().is_empty()
        {
            builder = builder.set_override("inference.base_url", val)?;
        }
        if let Ok(val) = env::var("LLM_API_KEY") {
            builder = builder.set_override("inference.api_key", val)?;
        }
        if let Ok(val) = env::var("LLM_MODEL")
            && !val.trim().is_empty()
        {
            builder = builder.set_override("inference.default_model", val)?;
        }

        // 5. CLI flags (clap already folded in their env fallbacks)
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(dir) = cli.upload_dir {
            builder = builder.set_override("uploads.dir", dir)?;
        }
        if let Some(model) = cli.default_model {
            builder = builder.set_override("inference.default_model", model)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would make every request fail.
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.inference.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "inference.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        // A zero request timeout would answer 408 immediately; use timeout_disabled instead.
        if !self.resilience.timeout_disabled && self.resilience.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "resilience.request_timeout_secs must be greater than 0 \
                 (set resilience.timeout_disabled to turn the timeout off)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
