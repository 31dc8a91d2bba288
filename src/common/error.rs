//! Обработка ошибок для txsim

use thiserror::Error;

/// Основной тип ошибки для txsim
///
/// Конфликты протоколов (ожидание, abort, откат) ошибками не являются и
/// отражаются только в журнале решений планировщика.
#[derive(Error, Debug)]
pub enum Error {
    /// Ошибка I/O операций
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Некорректная входная последовательность операций
    #[error("Invalid sequence: {message}")]
    InvalidSequence { message: String },

    /// Ошибка конфигурации
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Внутренняя ошибка
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Тип результата для txsim
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Создает ошибку некорректной последовательности
    pub fn invalid_sequence(message: impl Into<String>) -> Self {
        Self::InvalidSequence {
            message: message.into(),
        }
    }

    /// Создает ошибку конфигурации
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Создает внутреннюю ошибку
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Проверяет, отклонена ли входная последовательность
    pub fn is_invalid_sequence(&self) -> bool {
        matches!(self, Self::InvalidSequence { .. })
    }
}
