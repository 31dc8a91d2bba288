//! Модель операций, общая для всех планировщиков
//!
//! Идентификаторы транзакций и таблиц, операции входной последовательности
//! и элементы итогового (сериализованного) порядка выполнения.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Уникальный идентификатор транзакции
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u32);

impl TransactionId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Идентификатор таблицы: ровно одна буква
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(char);

impl TableId {
    /// Создает идентификатор таблицы, отклоняя цифры и символы
    pub fn new(name: char) -> Result<Self> {
        if name.is_alphabetic() {
            Ok(Self(name))
        } else {
            Err(Error::invalid_sequence(format!(
                "invalid table name '{}': expected a single letter",
                name
            )))
        }
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl TryFrom<char> for TableId {
    type Error = Error;

    fn try_from(name: char) -> Result<Self> {
        Self::new(name)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Вид операции
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Write,
    Commit,
}

impl OperationKind {
    /// Буква операции во входной нотации
    pub fn symbol(&self) -> &'static str {
        match self {
            OperationKind::Read => "R",
            OperationKind::Write => "W",
            OperationKind::Commit => "C",
        }
    }
}

/// Операция входной последовательности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Чтение таблицы
    Read {
        transaction: TransactionId,
        table: TableId,
    },
    /// Запись в таблицу
    Write {
        transaction: TransactionId,
        table: TableId,
    },
    /// Фиксация транзакции
    Commit { transaction: TransactionId },
}

impl Operation {
    pub fn read(transaction: TransactionId, table: TableId) -> Self {
        Self::Read { transaction, table }
    }

    pub fn write(transaction: TransactionId, table: TableId) -> Self {
        Self::Write { transaction, table }
    }

    pub fn commit(transaction: TransactionId) -> Self {
        Self::Commit { transaction }
    }

    pub fn transaction(&self) -> TransactionId {
        match self {
            Operation::Read { transaction, .. }
            | Operation::Write { transaction, .. }
            | Operation::Commit { transaction } => *transaction,
        }
    }

    /// Таблица операции (у фиксации её нет)
    pub fn table(&self) -> Option<TableId> {
        match self {
            Operation::Read { table, .. } | Operation::Write { table, .. } => Some(*table),
            Operation::Commit { .. } => None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Read { .. } => OperationKind::Read,
            Operation::Write { .. } => OperationKind::Write,
            Operation::Commit { .. } => OperationKind::Commit,
        }
    }

    pub fn is_commit(&self) -> bool {
        matches!(self, Operation::Commit { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transaction = self.transaction().value();
        match self.table() {
            Some(table) => write!(f, "{}{}({})", self.kind().symbol(), transaction, table),
            None => write!(f, "{}{}", self.kind().symbol(), transaction),
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Пара меток версии: (read timestamp, write timestamp)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampPair {
    pub read: u64,
    pub write: u64,
}

impl TimestampPair {
    pub fn new(read: u64, write: u64) -> Self {
        Self { read, write }
    }
}

impl fmt::Display for TimestampPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.read, self.write)
    }
}

/// Элемент итогового порядка выполнения
///
/// Для 2PL порядок выражается расписанием блокировок (`SL`, `XL`, `UPL`)
/// и фиксаций; OCC и MVCC пишут сами операции.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEntry {
    /// Выполненная операция
    Executed(Operation),
    /// Выдана разделяемая блокировка
    SharedLock {
        transaction: TransactionId,
        table: TableId,
    },
    /// Выдана исключительная блокировка
    ExclusiveLock {
        transaction: TransactionId,
        table: TableId,
    },
    /// Разделяемая блокировка повышена до исключительной
    UpgradedLock {
        transaction: TransactionId,
        table: TableId,
    },
}

impl ScheduleEntry {
    pub fn transaction(&self) -> TransactionId {
        match self {
            ScheduleEntry::Executed(operation) => operation.transaction(),
            ScheduleEntry::SharedLock { transaction, .. }
            | ScheduleEntry::ExclusiveLock { transaction, .. }
            | ScheduleEntry::UpgradedLock { transaction, .. } => *transaction,
        }
    }
}

impl From<Operation> for ScheduleEntry {
    fn from(operation: Operation) -> Self {
        ScheduleEntry::Executed(operation)
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleEntry::Executed(operation) => write!(f, "{}", operation),
            ScheduleEntry::SharedLock { transaction, table } => {
                write!(f, "SL{}({})", transaction.value(), table)
            }
            ScheduleEntry::ExclusiveLock { transaction, table } => {
                write!(f, "XL{}({})", transaction.value(), table)
            }
            ScheduleEntry::UpgradedLock { transaction, table } => {
                write!(f, "UPL{}({})", transaction.value(), table)
            }
        }
    }
}

impl Serialize for ScheduleEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
