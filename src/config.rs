//! Configuration for the mentor gateway
//!
//! Values resolve in order: environment variables, then the optional TOML
//! config file, then defaults. API keys only come from the environment or
//! the file, never from code.

use std::path::PathBuf;

use serde::Deserialize;

use crate::{Error, Result};

/// Mentor gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory (local cache database)
    pub data_dir: PathBuf,

    /// Identity provider settings
    pub identity: IdentityConfig,

    /// Remote document store settings
    pub store: StoreConfig,

    /// Generative text/speech settings
    pub genai: GenAiConfig,
}

/// Identity provider endpoint and key
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Remote document store endpoint
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
}

/// Generative backend endpoints, models and voices
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub text_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub live_url: String,
    pub live_model: String,
    pub live_voice: String,
}

/// On-disk config file shape; every field optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    identity_url: Option<String>,
    #[serde(default)]
    identity_api_key: Option<String>,
    #[serde(default)]
    store_url: Option<String>,
    #[serde(default)]
    genai_url: Option<String>,
    #[serde(default)]
    genai_api_key: Option<String>,
    #[serde(default)]
    text_model: Option<String>,
    #[serde(default)]
    tts_model: Option<String>,
    #[serde(default)]
    tts_voice: Option<String>,
    #[serde(default)]
    live_url: Option<String>,
    #[serde(default)]
    live_model: Option<String>,
    #[serde(default)]
    live_voice: Option<String>,
}

const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_GENAI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash-preview";
const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_TTS_VOICE: &str = "Kore";
const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";
const DEFAULT_LIVE_VOICE: &str = "Zephyr";

impl Config {
    /// Load configuration from environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be resolved, the config
    /// file is malformed, or a required value is missing
    pub fn load() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("dev", "mentor", "mentor-gateway")
            .ok_or_else(|| Error::Config("could not resolve home directory".to_string()))?;

        let data_dir = dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let file = Self::read_file(&dirs.config_dir().join("config.toml"))?;

        let resolve = |env: &str, file_value: &Option<String>, default: Option<&str>| {
            std::env::var(env)
                .ok()
                .or_else(|| file_value.clone())
                .or_else(|| default.map(String::from))
        };

        let genai_api_key = resolve("MENTOR_GEMINI_API_KEY", &file.genai_api_key, None)
            .ok_or_else(|| Error::Config("MENTOR_GEMINI_API_KEY is not set".to_string()))?;
        let genai_url = resolve("MENTOR_GENAI_URL", &file.genai_url, Some(DEFAULT_GENAI_URL))
            .unwrap_or_default();
        let live_url = resolve("MENTOR_LIVE_URL", &file.live_url, None).unwrap_or_else(|| {
            format!(
                "{}/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent?key={genai_api_key}",
                genai_url.replacen("https://", "wss://", 1)
            )
        });

        Ok(Self {
            data_dir,
            identity: IdentityConfig {
                base_url: resolve(
                    "MENTOR_IDENTITY_URL",
                    &file.identity_url,
                    Some(DEFAULT_IDENTITY_URL),
                )
                .unwrap_or_default(),
                api_key: resolve("MENTOR_IDENTITY_API_KEY", &file.identity_api_key, None)
                    .ok_or_else(|| {
                        Error::Config("MENTOR_IDENTITY_API_KEY is not set".to_string())
                    })?,
            },
            store: StoreConfig {
                base_url: resolve("MENTOR_STORE_URL", &file.store_url, None)
                    .ok_or_else(|| Error::Config("MENTOR_STORE_URL is not set".to_string()))?,
            },
            genai: GenAiConfig {
                base_url: genai_url,
                api_key: genai_api_key,
                text_model: resolve("MENTOR_TEXT_MODEL", &file.text_model, Some(DEFAULT_TEXT_MODEL))
                    .unwrap_or_default(),
                tts_model: resolve("MENTOR_TTS_MODEL", &file.tts_model, Some(DEFAULT_TTS_MODEL))
                    .unwrap_or_default(),
                tts_voice: resolve("MENTOR_TTS_VOICE", &file.tts_voice, Some(DEFAULT_TTS_VOICE))
                    .unwrap_or_default(),
                live_url,
                live_model: resolve("MENTOR_LIVE_MODEL", &file.live_model, Some(DEFAULT_LIVE_MODEL))
                    .unwrap_or_default(),
                live_voice: resolve("MENTOR_LIVE_VOICE", &file.live_voice, Some(DEFAULT_LIVE_VOICE))
                    .unwrap_or_default(),
            },
        })
    }

    /// Path of the local cache database
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("mentor.db")
    }

    fn read_file(path: &std::path::Path) -> Result<ConfigFile> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}
