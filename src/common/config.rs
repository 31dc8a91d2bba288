//! Конфигурация для txsim
//!
//! Настройки по умолчанию для командной строки: протокол, формат вывода и
//! уровень логирования. Источники в порядке приоритета: аргументы CLI,
//! переменные окружения, TOML файл, значения по умолчанию.

use crate::common::{Error, Result};
use crate::core::scheduler::Protocol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Файл конфигурации, который ищется в текущей директории
pub const DEFAULT_CONFIG_FILE: &str = "txsim.toml";

/// Формат вывода отчета
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Человекочитаемый текст
    #[default]
    Text,
    /// JSON
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::configuration(format!(
                "unknown output format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

/// Основная конфигурация симулятора
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Протокол по умолчанию для команды `run`
    pub protocol: Protocol,
    /// Формат вывода
    pub output: OutputFormat,
    /// Форматировать JSON с отступами
    pub pretty_json: bool,
    /// Уровень логирования (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::TwoPhaseLocking,
            output: OutputFormat::Text,
            pretty_json: true,
            log_level: "warn".to_string(),
        }
    }
}

impl SimulatorConfig {
    /// Загружает конфигурацию из TOML файла
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Сохраняет конфигурацию в TOML файл
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::configuration(format!("failed to encode config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Загружает конфигурацию: явный файл, иначе `txsim.toml`, иначе по умолчанию
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.with_env()
    }

    /// Применяет переменные окружения `TXSIM_*`
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Применяет переопределения из произвольного источника пар ключ-значение
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(protocol) = lookup("TXSIM_PROTOCOL") {
            self.protocol = protocol.parse()?;
        }

        if let Some(output) = lookup("TXSIM_OUTPUT") {
            self.output = output.parse()?;
        }

        if let Some(log_level) = lookup("TXSIM_LOG_LEVEL") {
            self.log_level = log_level;
        }

        self.level_filter()?;
        Ok(self)
    }

    /// Уровень логирования для `env_logger`
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        log::LevelFilter::from_str(&self.log_level).map_err(|_| {
            Error::configuration(format!("invalid log level '{}'", self.log_level))
        })
    }
}
