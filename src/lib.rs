//! txsim - симулятор протоколов управления конкурентностью транзакций
//!
//! Проигрывает фиксированную последовательность операций чтения, записи и
//! фиксации через три классических планировщика: двухфазное блокирование с
//! wait-die (2PL), оптимистичное управление с обратной валидацией (OCC) и
//! многоверсионное упорядочивание по меткам времени (MVCC). Каждый планировщик
//! выдает итоговый порядок выполнения и полный журнал своих решений.
//!
//! ```
//! use txsim::core::{Scheduler, TwoPhaseLockingScheduler};
//!
//! let mut scheduler = TwoPhaseLockingScheduler::new("R1(X);R2(X);R1(Y);C1;C2").unwrap();
//! scheduler.run().unwrap();
//! assert_eq!(scheduler.result_string(), "SL1(X);SL2(X);SL1(Y);C1;C2");
//! ```

pub mod cli;
pub mod common;
pub mod core;
pub mod parser;

pub use common::error::{Error, Result};
pub use crate::core::{
    simulate, AuditEvent, MultiversionScheduler, Operation, OptimisticScheduler, Protocol,
    ScheduleEntry, Scheduler, SimulationReport, TableId, TransactionId,
    TwoPhaseLockingScheduler,
};

/// Версия библиотеки
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
