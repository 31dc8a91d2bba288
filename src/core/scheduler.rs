//! Общий интерфейс планировщиков
//!
//! Все три движка (2PL, OCC, MVCC) принимают одинаковую последовательность
//! операций и независимо проигрывают её до конца.

use crate::common::{Error, Result};
use crate::core::audit::AuditEvent;
use crate::core::multiversion::MultiversionScheduler;
use crate::core::operation::ScheduleEntry;
use crate::core::optimistic::OptimisticScheduler;
use crate::core::report::{schedule_string, SimulationReport};
use crate::core::two_phase_locking::TwoPhaseLockingScheduler;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Протокол управления конкурентностью
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Protocol {
    /// Двухфазное блокирование с wait-die
    #[default]
    #[serde(rename = "2pl")]
    TwoPhaseLocking,
    /// Оптимистичное управление с обратной валидацией
    #[serde(rename = "occ")]
    Optimistic,
    /// Многоверсионное управление с упорядочиванием по меткам времени
    #[serde(rename = "mvcc")]
    Multiversion,
}

impl Protocol {
    /// Все поддерживаемые протоколы
    pub const ALL: [Protocol; 3] = [
        Protocol::TwoPhaseLocking,
        Protocol::Optimistic,
        Protocol::Multiversion,
    ];

    /// Полное название протокола
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::TwoPhaseLocking => "Two-Phase Locking (wait-die)",
            Protocol::Optimistic => "Optimistic Concurrency Control",
            Protocol::Multiversion => "Multiversion Timestamp Ordering",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::TwoPhaseLocking => write!(f, "2pl"),
            Protocol::Optimistic => write!(f, "occ"),
            Protocol::Multiversion => write!(f, "mvcc"),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2pl" | "tpl" | "two-phase-locking" => Ok(Protocol::TwoPhaseLocking),
            "occ" | "optimistic" => Ok(Protocol::Optimistic),
            "mvcc" | "mvto" | "multiversion" => Ok(Protocol::Multiversion),
            other => Err(Error::configuration(format!(
                "unknown protocol '{}' (expected 2pl, occ or mvcc)",
                other
            ))),
        }
    }
}

/// Планировщик транзакций
pub trait Scheduler: Send {
    /// Протокол, который реализует планировщик
    fn protocol(&self) -> Protocol;

    /// Выполняет один шаг планирования; `false`, когда работы не осталось
    fn step(&mut self) -> Result<bool>;

    /// Итоговый (сериализованный) порядок выполнения
    fn result_order(&self) -> &[ScheduleEntry];

    /// Журнал решений
    fn history(&self) -> &[AuditEvent];

    /// Проигрывает последовательность до конца
    fn run(&mut self) -> Result<()> {
        let mut steps = 0u64;
        while self.step()? {
            steps += 1;
        }
        log::info!(
            "{} finished in {} steps: {} scheduled entries, {} history records",
            self.protocol(),
            steps,
            self.result_order().len(),
            self.history().len()
        );
        Ok(())
    }

    /// Итоговый порядок в нотации `SL1(X);SL2(X);C1`
    fn result_string(&self) -> String {
        schedule_string(self.result_order())
    }

    /// Журнал решений, по одной записи на строку
    fn history_string(&self) -> String {
        self.history()
            .iter()
            .map(|event| format!("{}\n", event))
            .collect()
    }

    /// Собирает отчет о прогоне
    fn report(&self) -> SimulationReport {
        SimulationReport::new(self.protocol(), self.result_order(), self.history())
    }
}

/// Создает планировщик для протокола по текстовой последовательности
pub fn build(protocol: Protocol, sequence: &str) -> Result<Box<dyn Scheduler>> {
    let scheduler: Box<dyn Scheduler> = match protocol {
        Protocol::TwoPhaseLocking => Box::new(TwoPhaseLockingScheduler::new(sequence)?),
        Protocol::Optimistic => Box::new(OptimisticScheduler::new(sequence)?),
        Protocol::Multiversion => Box::new(MultiversionScheduler::new(sequence)?),
    };
    Ok(scheduler)
}

/// Разбирает последовательность, проигрывает её и возвращает отчет
pub fn simulate(protocol: Protocol, sequence: &str) -> Result<SimulationReport> {
    let mut scheduler = build(protocol, sequence)?;
    scheduler.run()?;
    Ok(scheduler.report())
}
