use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub wake: WakeConfig,
    pub vad: VadConfig,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    pub api_gateway: ApiGatewayConfig,
    pub agent: AgentConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub input_backend: String,
    pub output_backend: String,
    pub pulse_source: String,
    pub source_name: String,
    pub beep: BeepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeepConfig {
    pub enabled: bool,
    pub frequency_hz: u32,
    pub duration_ms: u32,
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    pub phrases: Vec<String>,
    pub recognizer: RecognizerConfig,
    pub cooldown_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub model_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub threshold: f32,
    pub end_silence_ms: u64,
    pub pre_roll_ms: u64,
    pub max_utterance_ms: u64,
    pub min_utterance_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub model_ref: String,
    pub language: String,
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub bin: String,
    pub model_path: String,
    pub config_path: String,
    pub speaker: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiGatewayConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub base_url: String,
    pub timeout_s: u64,
    pub confirm_phrases: Vec<String>,
    pub cancel_phrases: Vec<String>,
    pub exit_phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub session_idle_timeout_ms: u64,
    pub log_level: String,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            wake: WakeConfig::default(),
            vad: VadConfig::default(),
            stt: SttConfig::default(),
            tts: TtsConfig::default(),
            api_gateway: ApiGatewayConfig::default(),
            agent: AgentConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            block_size: 512,
            input_device: None,
            output_device: None,
            input_backend: "direct".to_string(),
            output_backend: "direct".to_string(),
            pulse_source: "default".to_string(),
            source_name: "default".to_string(),
            beep: BeepConfig::default(),
        }
    }
}

impl Default for BeepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency_hz: 880,
            duration_ms: 120,
            volume: 0.2,
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrases: vec!["老管家".to_string()],
            recognizer: RecognizerConfig::default(),
            cooldown_ms: 350,
            timeout_ms: 8000,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.55,
            end_silence_ms: 700,
            pre_roll_ms: 400,
            max_utterance_ms: 20000,
            min_utterance_ms: 300,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_ref: String::new(),
            language: "zh".to_string(),
            device: "cpu".to_string(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            bin: "piper".to_string(),
            model_path: String::new(),
            config_path: String::new(),
            speaker: None,
        }
    }
}

impl Default for ApiGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            api_key: String::new(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6100".to_string(),
            timeout_s: 30,
            confirm_phrases: vec!["确认", "执行", "是", "好的", "可以"]
                .into_iter()
                .map(String::from)
                .collect(),
            cancel_phrases: vec!["取消", "不要", "算了", "停止"]
                .into_iter()
                .map(String::from)
                .collect(),
            exit_phrases: vec!["再见", "拜拜"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session_idle_timeout_ms: 30000,
            log_level: "info".to_string(),
        }
    }
}

// --- Config loading ---

const VALID_BACKENDS: [&str; 3] = ["direct", "subprocess", "auto"];

impl Config {
    /// Load config from an explicit YAML path and validate required fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.wake.recognizer.model_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("wake.recognizer.model_path"));
        }
        if self.stt.model_ref.trim().is_empty() {
            return Err(ConfigError::MissingRequired("stt.model_ref"));
        }
        if self.tts.model_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("tts.model_path"));
        }
        if self.tts.config_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("tts.config_path"));
        }
        if !VALID_BACKENDS.contains(&self.audio.input_backend.as_str()) {
            return Err(ConfigError::InvalidBackend {
                field: "audio.input_backend",
                value: self.audio.input_backend.clone(),
            });
        }
        if !VALID_BACKENDS.contains(&self.audio.output_backend.as_str()) {
            return Err(ConfigError::InvalidBackend {
                field: "audio.output_backend",
                value: self.audio.output_backend.clone(),
            });
        }
        Ok(())
    }
}
