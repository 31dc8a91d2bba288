//! Таблица блокировок для 2PL
//!
//! Хранит Shared/Exclusive блокировки на уровне таблиц. Разделяемую блокировку
//! могут держать несколько транзакций, исключительную - только одна, и обе
//! формы на одной таблице одновременно не встречаются.

use crate::core::operation::{TableId, TransactionId};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Режим блокировки
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Разделяемая блокировка (Shared) - для чтения
    Shared,
    /// Исключительная блокировка (Exclusive) - для записи
    Exclusive,
}

impl LockMode {
    /// Проверяет совместимость режимов блокировки
    pub fn is_compatible(&self, other: &LockMode) -> bool {
        match (self, other) {
            // Shared блокировки совместимы между собой
            (LockMode::Shared, LockMode::Shared) => true,
            // Exclusive блокировки не совместимы ни с чем
            (LockMode::Exclusive, _) | (_, LockMode::Exclusive) => false,
        }
    }

    /// Обозначение выдачи блокировки в расписании
    pub fn symbol(&self) -> &'static str {
        match self {
            LockMode::Shared => "SL",
            LockMode::Exclusive => "XL",
        }
    }
}

/// Исход запроса блокировки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Выдана новая блокировка
    Granted,
    /// Единственная разделяемая блокировка повышена до исключительной
    Upgraded,
    /// Транзакция уже владеет достаточной блокировкой
    AlreadyHeld,
    /// Блокировку держит другая транзакция
    Conflict,
}

impl Acquisition {
    /// Можно ли выполнять операцию
    pub fn is_success(&self) -> bool {
        !matches!(self, Acquisition::Conflict)
    }
}

/// Статистика таблицы блокировок
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockTableStats {
    /// Количество выданных блокировок
    pub locks_acquired: u64,
    /// Количество повышений Shared -> Exclusive
    pub upgrades: u64,
    /// Количество освобожденных блокировок
    pub locks_released: u64,
    /// Количество отказов из-за конфликта
    pub conflicts: u64,
}

/// Таблица блокировок
#[derive(Debug, Default)]
pub struct LockTable {
    /// Исключительные блокировки: таблица -> владелец
    exclusive: IndexMap<TableId, TransactionId>,
    /// Разделяемые блокировки: таблица -> владельцы
    shared: IndexMap<TableId, IndexSet<TransactionId>>,
    /// Статистика
    stats: LockTableStats,
}

impl LockTable {
    /// Создает пустую таблицу блокировок
    pub fn new() -> Self {
        Self::default()
    }

    /// Запрашивает разделяемую блокировку
    pub fn acquire_shared(&mut self, transaction: TransactionId, table: TableId) -> Acquisition {
        if let Some(&holder) = self.exclusive.get(&table) {
            // Исключительная блокировка покрывает чтение своей транзакции
            if holder == transaction {
                return Acquisition::AlreadyHeld;
            }
            self.stats.conflicts += 1;
            return Acquisition::Conflict;
        }

        let holders = self.shared.entry(table).or_default();
        if holders.insert(transaction) {
            self.stats.locks_acquired += 1;
            Acquisition::Granted
        } else {
            Acquisition::AlreadyHeld
        }
    }

    /// Запрашивает исключительную блокировку (с повышением, если возможно)
    pub fn acquire_exclusive(
        &mut self,
        transaction: TransactionId,
        table: TableId,
    ) -> Acquisition {
        if let Some(holders) = self.shared.get(&table) {
            if holders.len() == 1 && holders.contains(&transaction) {
                self.shared.shift_remove(&table);
                self.exclusive.insert(table, transaction);
                self.stats.upgrades += 1;
                return Acquisition::Upgraded;
            }
            self.stats.conflicts += 1;
            return Acquisition::Conflict;
        }

        match self.exclusive.get(&table) {
            Some(&holder) if holder == transaction => Acquisition::AlreadyHeld,
            Some(_) => {
                self.stats.conflicts += 1;
                Acquisition::Conflict
            }
            None => {
                self.exclusive.insert(table, transaction);
                self.stats.locks_acquired += 1;
                Acquisition::Granted
            }
        }
    }

    /// Снимает все блокировки транзакции
    ///
    /// Возвращает освобожденные таблицы: сначала разделяемые, затем
    /// исключительные, каждая группа в порядке первой выдачи.
    pub fn release_all(&mut self, transaction: TransactionId) -> Vec<TableId> {
        let mut released = Vec::new();

        for (table, holders) in self.shared.iter_mut() {
            if holders.shift_remove(&transaction) {
                released.push(*table);
            }
        }
        self.shared.retain(|_, holders| !holders.is_empty());

        let before = released.len();
        released.extend(
            self.exclusive
                .iter()
                .filter(|(_, holder)| **holder == transaction)
                .map(|(table, _)| *table),
        );
        for table in &released[before..] {
            self.exclusive.shift_remove(table);
        }

        self.stats.locks_released += released.len() as u64;
        released
    }

    /// Транзакции, чьи блокировки мешают `transaction` работать с таблицей
    pub fn conflicting_holders(
        &self,
        transaction: TransactionId,
        table: TableId,
    ) -> Vec<TransactionId> {
        let mut holders: Vec<TransactionId> = self
            .exclusive
            .get(&table)
            .copied()
            .into_iter()
            .collect();
        if let Some(shared) = self.shared.get(&table) {
            holders.extend(shared.iter().copied());
        }
        holders.retain(|holder| *holder != transaction);
        holders
    }

    /// Владелец исключительной блокировки таблицы
    pub fn exclusive_holder(&self, table: TableId) -> Option<TransactionId> {
        self.exclusive.get(&table).copied()
    }

    /// Владельцы разделяемой блокировки таблицы
    pub fn shared_holders(&self, table: TableId) -> Vec<TransactionId> {
        self.shared
            .get(&table)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Держит ли транзакция хоть одну блокировку
    pub fn holds_any(&self, transaction: TransactionId) -> bool {
        self.exclusive.values().any(|holder| *holder == transaction)
            || self
                .shared
                .values()
                .any(|holders| holders.contains(&transaction))
    }

    /// Нет ни одной активной блокировки
    pub fn is_empty(&self) -> bool {
        self.exclusive.is_empty() && self.shared.is_empty()
    }

    /// Проверяет взаимное исключение: Shared и Exclusive на одной таблице не сосуществуют
    pub fn is_consistent(&self) -> bool {
        self.shared.iter().all(|(table, holders)| {
            !holders.is_empty() && !self.exclusive.contains_key(table)
        })
    }

    /// Получает статистику таблицы блокировок
    pub fn statistics(&self) -> &LockTableStats {
        &self.stats
    }
}
