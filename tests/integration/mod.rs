//! Интеграционные тесты для txsim
//!
//! Этот модуль содержит сценарии, которые проверяют планировщики
//! целиком, от текстовой последовательности до отчета.

pub mod common;
pub mod comparison_tests;
pub mod scenario_tests;
pub mod stress_tests;

// Re-export common utilities
pub use common::*;
