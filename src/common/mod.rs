//! Общие типы и утилиты для txsim

pub mod config;
pub mod error;

pub use config::*;
pub use error::{Error, Result};
