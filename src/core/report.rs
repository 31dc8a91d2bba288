//! Отчет о прогоне планировщика
//!
//! Текстовое и JSON-представление итогового порядка и журнала решений.

use crate::common::Result;
use crate::core::audit::AuditEvent;
use crate::core::operation::ScheduleEntry;
use crate::core::scheduler::Protocol;
use serde::Serialize;
use std::fmt::Write as _;

/// Порядок выполнения одной строкой через `;`
pub fn schedule_string(schedule: &[ScheduleEntry]) -> String {
    schedule
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// Сводка по прогону
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Количество фиксаций
    pub commits: usize,
    /// Количество abort и откатов
    pub restarts: usize,
    /// Количество постановок в очередь ожидания
    pub waits: usize,
}

/// Отчет о прогоне одного протокола
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    /// Протокол
    pub protocol: Protocol,
    /// Итоговый порядок одной строкой
    pub result: String,
    /// Итоговый порядок по элементам
    pub schedule: Vec<ScheduleEntry>,
    /// Журнал решений
    pub history: Vec<AuditEvent>,
    /// Сводка
    pub summary: ReportSummary,
}

impl SimulationReport {
    pub fn new(protocol: Protocol, schedule: &[ScheduleEntry], history: &[AuditEvent]) -> Self {
        let result = schedule_string(schedule);

        let mut summary = ReportSummary::default();
        for event in history {
            match event {
                AuditEvent::Committed { .. } => summary.commits += 1,
                AuditEvent::Aborted { .. } | AuditEvent::RolledBack { .. } => {
                    summary.restarts += 1
                }
                AuditEvent::Queued { .. } => summary.waits += 1,
                _ => {}
            }
        }

        Self {
            protocol,
            result,
            schedule: schedule.to_vec(),
            history: history.to_vec(),
            summary,
        }
    }

    /// JSON-представление отчета
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// Текстовое представление отчета
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // запись в String не может завершиться ошибкой
        let _ = writeln!(out, "== {} ({})", self.protocol.name(), self.protocol);
        let _ = writeln!(out, "Result: {}", self.result);
        let _ = writeln!(
            out,
            "Commits: {}, restarts: {}, waits: {}",
            self.summary.commits, self.summary.restarts, self.summary.waits
        );
        let _ = writeln!(out, "History:");
        for (index, event) in self.history.iter().enumerate() {
            let _ = writeln!(out, "{:>4}. {}", index + 1, event);
        }
        out
    }
}
