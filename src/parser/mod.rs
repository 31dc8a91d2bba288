//! Разбор входной последовательности операций для txsim

pub mod sequence;

#[cfg(test)]
pub mod tests;

// Переэкспортируем основные типы
pub use sequence::{parse_sequence, validate, SequenceTokenizer, SEPARATOR};
