//! Журнал решений планировщика
//!
//! Каждая запись фиксирует одно решение (выдача блокировки, чтение версии,
//! ожидание, abort, откат, фиксация). Журнал только дополняется.

use crate::core::lock_table::LockMode;
use crate::core::operation::{OperationKind, TableId, TimestampPair, TransactionId};
use serde::Serialize;
use std::fmt;

/// Запись журнала решений
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Выдана блокировка (`SL` или `XL`)
    LockGranted {
        transaction: TransactionId,
        table: TableId,
        mode: LockMode,
    },
    /// Разделяемая блокировка повышена (`UPL`)
    LockUpgraded {
        transaction: TransactionId,
        table: TableId,
    },
    /// Блокировка снята (`UL`)
    LockReleased {
        transaction: TransactionId,
        table: TableId,
    },
    /// Чтение или запись выполнены
    Executed {
        transaction: TransactionId,
        kind: OperationKind,
        table: TableId,
    },
    /// Операция поставлена в очередь ожидания
    Queued {
        transaction: TransactionId,
        kind: OperationKind,
        table: TableId,
    },
    /// Транзакция прервана и будет перезапущена
    Aborted {
        transaction: TransactionId,
        #[serde(skip_serializing_if = "Option::is_none")]
        table: Option<TableId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        conflict_with: Option<TransactionId>,
    },
    /// Транзакция откачена с новой меткой времени
    RolledBack {
        transaction: TransactionId,
        timestamp: u64,
    },
    /// Транзакция зафиксирована
    Committed { transaction: TransactionId },
    /// Прочитана версия таблицы
    VersionRead {
        transaction: TransactionId,
        table: TableId,
        version: u64,
        timestamps: TimestampPair,
    },
    /// Записана (создана или обновлена) версия таблицы
    VersionWritten {
        transaction: TransactionId,
        table: TableId,
        version: u64,
        timestamps: TimestampPair,
    },
    /// Запись отклонена: версию уже прочитала более молодая транзакция
    WriteRejected {
        transaction: TransactionId,
        table: TableId,
        version: u64,
        timestamps: TimestampPair,
    },
}

impl AuditEvent {
    pub fn transaction(&self) -> TransactionId {
        match self {
            AuditEvent::LockGranted { transaction, .. }
            | AuditEvent::LockUpgraded { transaction, .. }
            | AuditEvent::LockReleased { transaction, .. }
            | AuditEvent::Executed { transaction, .. }
            | AuditEvent::Queued { transaction, .. }
            | AuditEvent::Aborted { transaction, .. }
            | AuditEvent::RolledBack { transaction, .. }
            | AuditEvent::Committed { transaction }
            | AuditEvent::VersionRead { transaction, .. }
            | AuditEvent::VersionWritten { transaction, .. }
            | AuditEvent::WriteRejected { transaction, .. } => *transaction,
        }
    }

    /// Таблица, к которой относится запись (если есть)
    pub fn table(&self) -> Option<TableId> {
        match self {
            AuditEvent::LockGranted { table, .. }
            | AuditEvent::LockUpgraded { table, .. }
            | AuditEvent::LockReleased { table, .. }
            | AuditEvent::Executed { table, .. }
            | AuditEvent::Queued { table, .. }
            | AuditEvent::VersionRead { table, .. }
            | AuditEvent::VersionWritten { table, .. }
            | AuditEvent::WriteRejected { table, .. } => Some(*table),
            AuditEvent::Aborted { table, .. } => *table,
            AuditEvent::RolledBack { .. } | AuditEvent::Committed { .. } => None,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, AuditEvent::Aborted { .. } | AuditEvent::RolledBack { .. })
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::LockGranted {
                transaction,
                table,
                mode,
            } => write!(f, "{}{}({})", mode.symbol(), transaction.value(), table),
            AuditEvent::LockUpgraded { transaction, table } => {
                write!(f, "UPL{}({})", transaction.value(), table)
            }
            AuditEvent::LockReleased { transaction, table } => {
                write!(f, "UL{}({})", transaction.value(), table)
            }
            AuditEvent::Executed {
                transaction,
                kind,
                table,
            } => write!(f, "{}{}({})", kind.symbol(), transaction.value(), table),
            AuditEvent::Queued {
                transaction,
                kind,
                table,
            } => write!(
                f,
                "{}{}({}) queued",
                kind.symbol(),
                transaction.value(),
                table
            ),
            AuditEvent::Aborted {
                transaction,
                table,
                conflict_with,
            } => match (table, conflict_with) {
                (_, Some(other)) => {
                    write!(f, "{} aborted due to conflict with {}", transaction, other)
                }
                (Some(table), None) => write!(f, "{} aborted on {}", transaction, table),
                (None, None) => write!(f, "{} aborted", transaction),
            },
            AuditEvent::RolledBack {
                transaction,
                timestamp,
            } => write!(
                f,
                "{} rolled back with new timestamp {}",
                transaction, timestamp
            ),
            AuditEvent::Committed { transaction } => write!(f, "C{}", transaction.value()),
            AuditEvent::VersionRead {
                transaction,
                table,
                version,
                timestamps,
            } => write!(
                f,
                "{} read {} at version {}, timestamp {}: {}",
                transaction, table, version, table, timestamps
            ),
            AuditEvent::VersionWritten {
                transaction,
                table,
                version,
                timestamps,
            } => write!(
                f,
                "{} wrote {} at version {}, timestamp {}: {}",
                transaction, table, version, table, timestamps
            ),
            AuditEvent::WriteRejected {
                transaction,
                table,
                version,
                timestamps,
            } => write!(
                f,
                "{} write on {} rejected at version {}, timestamp {}: {}",
                transaction, table, version, table, timestamps
            ),
        }
    }
}
