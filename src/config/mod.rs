use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::PLACEHOLDER_KEY;
use crate::sender::{ConsoleSender, Sender, TelegramSender};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_LLM_BASE_URL: &str = "https://api.avalapis.ir/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

fn placeholder() -> String {
    PLACEHOLDER_KEY.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeys {
    #[serde(default = "placeholder")]
    pub gnews: String,
    #[serde(default = "placeholder")]
    pub world_news: String,
    #[serde(default = "placeholder")]
    pub newsapi: String,
    #[serde(default = "placeholder")]
    pub cryptocompare: String,
    #[serde(default = "placeholder")]
    pub coingecko: String,
    #[serde(default = "placeholder")]
    pub fmp: String,
    #[serde(default = "placeholder")]
    pub currents: String,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            gnews: placeholder(),
            world_news: placeholder(),
            newsapi: placeholder(),
            cryptocompare: placeholder(),
            coingecko: placeholder(),
            fmp: placeholder(),
            currents: placeholder(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "LlmConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "placeholder")]
    pub api_key: String,
    #[serde(default = "LlmConfig::default_model")]
    pub model: String,
    #[serde(default = "LlmConfig::default_source_lang")]
    pub source_lang: String,
    #[serde(default = "LlmConfig::default_target_lang")]
    pub target_lang: String,
}

impl LlmConfig {
    fn default_base_url() -> String {
        DEFAULT_LLM_BASE_URL.to_string()
    }

    fn default_model() -> String {
        DEFAULT_LLM_MODEL.to_string()
    }

    fn default_source_lang() -> String {
        "en".to_string()
    }

    fn default_target_lang() -> String {
        "fa".to_string()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: placeholder(),
            model: Self::default_model(),
            source_lang: Self::default_source_lang(),
            target_lang: Self::default_target_lang(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub token: String,
    /// Default target when none is given on the command line
    #[serde(default)]
    pub chat_id: String,
}

fn default_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub llm: LlmConfig,
    pub telegram: Option<TelegramConfig>,
    /// Directory for the JSON caches; the OS temp dir when unset
    pub data_dir: Option<String>,
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,
}

impl AppConfig {
    /// Load the config file, falling back to defaults when it is missing, then
    /// apply environment overrides (a `.env` file is honoured).
    pub fn load(file_name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let mut config = if std::path::Path::new(file_name).exists() {
            info!("Loading config from {file_name}");
            Self::from_file(file_name)?
        } else {
            warn!("Config file {file_name} not found, using defaults");
            Self::from_str("{}")?
        };
        config.apply_env(|name| std::env::var(name).ok());

        Ok(config)
    }

    pub fn from_file(file_name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(file_name)?;
        let config: AppConfig = serde_json::from_str(&contents)?;

        Ok(config)
    }

    pub fn from_str(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: AppConfig = serde_json::from_str(contents)?;

        Ok(config)
    }

    /// Override keys from environment variables; `lookup` abstracts `std::env::var`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let keys = &mut self.api_keys;
        for (name, slot) in [
            ("GNEWS_API_KEY", &mut keys.gnews),
            ("WORLD_NEWS_API_KEY", &mut keys.world_news),
            ("NEWSAPI_KEY", &mut keys.newsapi),
            ("CRYPTOCOMPARE_API_KEY", &mut keys.cryptocompare),
            ("COINGECKO_API_KEY", &mut keys.coingecko),
            ("FMP_API_KEY", &mut keys.fmp),
            ("CURRENTS_API_KEY", &mut keys.currents),
            ("LLM_API_KEY", &mut self.llm.api_key),
        ] {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
        if let Some(url) = lookup("LLM_API_URL").filter(|v| !v.trim().is_empty()) {
            self.llm.base_url = url;
        }

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.trim().is_empty()) {
            let chat_id = self
                .telegram
                .as_ref()
                .map(|t| t.chat_id.clone())
                .unwrap_or_default();
            self.telegram = Some(TelegramConfig { token, chat_id });
        }
        if let (Some(chat_id), Some(telegram)) = (
            lookup("TELEGRAM_CHAT_ID").filter(|v| !v.trim().is_empty()),
            self.telegram.as_mut(),
        ) {
            telegram.chat_id = chat_id;
        }
    }

    #[must_use]
    pub fn get_data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map_or_else(std::env::temp_dir, PathBuf::from)
    }

    #[must_use]
    pub fn get_sender(&self) -> Sender {
        match &self.telegram {
            Some(config) if !config.token.trim().is_empty() => {
                Sender::Telegram(TelegramSender::new(config, self.http_timeout_secs))
            }
            _ => Sender::Console(ConsoleSender {}),
        }
    }
}
