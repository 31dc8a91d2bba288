//! Тесты для модулей ядра txsim

pub mod lock_table_tests;

use crate::core::{TableId, TransactionId};

/// Идентификатор транзакции для тестов
pub fn tx(id: u32) -> TransactionId {
    TransactionId::new(id)
}

/// Идентификатор таблицы для тестов
pub fn table(name: char) -> TableId {
    TableId::new(name).unwrap()
}
