//! Общие утилиты для интеграционных тестов

use rand::prelude::*;
use std::collections::BTreeSet;
use txsim::{AuditEvent, SimulationReport};

/// Канонические сценарии: последовательность и ожидаемый результат по протоколам
pub struct Scenario {
    pub name: &'static str,
    pub sequence: &'static str,
    pub two_phase_locking: &'static str,
    pub optimistic: &'static str,
    pub multiversion: &'static str,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "shared readers",
        sequence: "R1(X);R2(X);R1(Y);C1;C2",
        two_phase_locking: "SL1(X);SL2(X);SL1(Y);C1;C2",
        optimistic: "R1(X);R1(Y);C1;R2(X);C2",
        multiversion: "R1(X);R2(X);R1(Y);C1;C2",
    },
    Scenario {
        name: "wait-die",
        sequence: "R1(A);W2(A);R2(A);R3(A);W1(A);C1;C2;C3",
        two_phase_locking: "SL1(A);SL3(A);C3;UPL1(A);C1;XL2(A);C2",
        optimistic: "R1(A);W1(A);C1;W2(A);R2(A);C2;R3(A);C3",
        multiversion: "W2(A);R2(A);R3(A);C2;C3;R1(A);W1(A);C1",
    },
    Scenario {
        name: "backward validation",
        sequence: "R1(X);R2(X);W1(X);C1;C2",
        two_phase_locking: "SL1(X);SL2(X);C2;UPL1(X);C1",
        optimistic: "R1(X);W1(X);C1;R2(X);C2",
        multiversion: "R2(X);C2;R1(X);W1(X);C1",
    },
    Scenario {
        name: "version rollback",
        sequence: "R1(X);R2(X);W1(X);W2(X);C1;C2",
        two_phase_locking: "SL1(X);UPL1(X);C1;SL2(X);UPL2(X);C2",
        optimistic: "R1(X);W1(X);C1;R2(X);W2(X);C2",
        multiversion: "R2(X);W2(X);C2;R1(X);W1(X);C1",
    },
];

/// Транзакции, зафиксированные в журнале
pub fn committed(report: &SimulationReport) -> BTreeSet<u32> {
    report
        .history
        .iter()
        .filter_map(|event| match event {
            AuditEvent::Committed { transaction } => Some(transaction.value()),
            _ => None,
        })
        .collect()
}

/// Транзакции входной последовательности
pub fn transactions(sequence: &str) -> BTreeSet<u32> {
    txsim::parser::parse_sequence(sequence)
        .map(|operations| {
            operations
                .iter()
                .map(|operation| operation.transaction().value())
                .collect()
        })
        .unwrap_or_default()
}

/// Детерминированный генератор корректных последовательностей
///
/// Перемешивает операции транзакций, сохраняя порядок внутри каждой
/// транзакции; фиксация всегда последняя.
pub struct SequenceGenerator {
    rng: StdRng,
}

impl SequenceGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }

    /// Строит последовательность из `transactions` транзакций по `tables` таблицам
    pub fn sequence(&mut self, transactions: usize, tables: &[char], max_ops: usize) -> String {
        let mut programs: Vec<Vec<String>> = (1..=transactions)
            .map(|id| {
                let count = 1 + self.next(max_ops);
                let mut ops: Vec<String> = (0..count)
                    .map(|_| {
                        let kind = if self.next(2) == 0 { 'R' } else { 'W' };
                        let table = tables[self.next(tables.len())];
                        format!("{}{}({})", kind, id, table)
                    })
                    .collect();
                ops.push(format!("C{}", id));
                ops.reverse();
                ops
            })
            .collect();

        let mut sequence = Vec::new();
        while programs.iter().any(|ops| !ops.is_empty()) {
            let active: Vec<usize> = programs
                .iter()
                .enumerate()
                .filter(|(_, ops)| !ops.is_empty())
                .map(|(index, _)| index)
                .collect();
            let pick = active[self.next(active.len())];
            if let Some(op) = programs[pick].pop() {
                sequence.push(op);
            }
        }
        sequence.join(";")
    }
}
