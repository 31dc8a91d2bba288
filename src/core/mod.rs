//! Ядро txsim: планировщики транзакций

pub mod audit;
pub mod lock_table;
pub mod multiversion;
pub mod operation;
pub mod optimistic;
pub mod report;
pub mod scheduler;
pub mod two_phase_locking;

// Переэкспортируем основные типы
pub use audit::AuditEvent;
pub use lock_table::{Acquisition, LockMode, LockTable, LockTableStats};
pub use multiversion::{current_version_index, MultiversionScheduler, Version};
pub use operation::{
    Operation, OperationKind, ScheduleEntry, TableId, TimestampPair, TransactionId,
};
pub use optimistic::{LogicalTime, OptimisticScheduler, OptimisticTransaction, TransactionStatus};
pub use report::{schedule_string, ReportSummary, SimulationReport};
pub use scheduler::{build, simulate, Protocol, Scheduler};
pub use two_phase_locking::TwoPhaseLockingScheduler;

#[cfg(test)]
pub mod tests;
