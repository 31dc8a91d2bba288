//! Многоверсионный планировщик с упорядочиванием по меткам времени (MVTO)
//!
//! Для каждой таблицы хранится цепочка версий с метками чтения и записи.
//! Текущая версия - с наибольшей меткой записи. Запись отклоняется, если
//! текущую версию уже прочитала более молодая транзакция; тогда транзакция
//! получает новую метку и перезапускается. Фиксация ничего не проверяет.

use crate::common::Result;
use crate::core::audit::AuditEvent;
use crate::core::operation::{Operation, ScheduleEntry, TableId, TimestampPair, TransactionId};
use crate::core::scheduler::{Protocol, Scheduler};
use crate::core::two_phase_locking::take_transaction;
use crate::parser::{parse_sequence, validate};
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// Версия таблицы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Транзакция, создавшая версию
    pub writer: TransactionId,
    /// Наибольшая метка прочитавшей транзакции
    pub read_timestamp: u64,
    /// Метка записавшей транзакции (0 у исходной версии)
    pub write_timestamp: u64,
    /// Номер версии
    pub number: u64,
}

impl Version {
    pub fn timestamps(&self) -> TimestampPair {
        TimestampPair::new(self.read_timestamp, self.write_timestamp)
    }
}

/// Индекс текущей версии: наибольшая метка записи, при равенстве - самая ранняя
pub fn current_version_index(chain: &[Version]) -> Option<usize> {
    chain
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, u64)>, (index, version)| match best {
            Some((_, write)) if version.write_timestamp <= write => best,
            _ => Some((index, version.write_timestamp)),
        })
        .map(|(index, _)| index)
}

/// Планировщик MVCC
#[derive(Debug)]
pub struct MultiversionScheduler {
    /// Операции, ожидающие выполнения
    pending: VecDeque<Operation>,
    /// Цепочки версий по таблицам
    versions: IndexMap<TableId, Vec<Version>>,
    /// Текущие метки транзакций (изначально равны идентификатору)
    timestamps: HashMap<TransactionId, u64>,
    /// Наибольшая когда-либо выданная метка
    highest_timestamp: u64,
    /// Счетчик выполненных чтений и записей
    counter: u64,
    /// Выполненные операции текущей попытки каждой транзакции
    attempts: HashMap<TransactionId, Vec<Operation>>,
    /// Итоговый порядок выполнения
    result: Vec<ScheduleEntry>,
    /// Журнал решений
    history: Vec<AuditEvent>,
}

impl MultiversionScheduler {
    /// Создает планировщик по текстовой последовательности
    pub fn new(sequence: &str) -> Result<Self> {
        Ok(Self::with_operations(parse_sequence(sequence)?))
    }

    /// Создает планировщик по готовому списку операций
    pub fn from_operations(operations: Vec<Operation>) -> Result<Self> {
        validate(&operations)?;
        Ok(Self::with_operations(operations))
    }

    fn with_operations(operations: Vec<Operation>) -> Self {
        let highest_timestamp = operations
            .iter()
            .map(|operation| u64::from(operation.transaction().value()))
            .max()
            .unwrap_or_default();

        Self {
            pending: operations.into(),
            versions: IndexMap::new(),
            timestamps: HashMap::new(),
            highest_timestamp,
            counter: 0,
            attempts: HashMap::new(),
            result: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Текущая метка транзакции
    pub fn timestamp(&mut self, transaction: TransactionId) -> u64 {
        let timestamp = *self
            .timestamps
            .entry(transaction)
            .or_insert_with(|| u64::from(transaction.value()));
        self.highest_timestamp = self.highest_timestamp.max(timestamp);
        timestamp
    }

    /// Чтение текущей версии таблицы с продвижением её метки чтения
    pub fn read(&mut self, transaction: TransactionId, table: TableId) {
        let timestamp = self.timestamp(transaction);

        let current = match self.versions.get_mut(&table) {
            Some(chain) => match current_version_index(chain) {
                Some(index) => Some(&mut chain[index]),
                None => None,
            },
            None => None,
        };
        let (version, timestamps) = match current {
            Some(version) => {
                if timestamp > version.read_timestamp {
                    version.read_timestamp = timestamp;
                }
                (version.number, version.timestamps())
            }
            None => {
                let initial = Version {
                    writer: transaction,
                    read_timestamp: timestamp,
                    write_timestamp: 0,
                    number: 0,
                };
                self.versions.entry(table).or_default().push(initial);
                (initial.number, initial.timestamps())
            }
        };

        self.counter += 1;
        self.history.push(AuditEvent::VersionRead {
            transaction,
            table,
            version,
            timestamps,
        });
        self.record(Operation::read(transaction, table));
    }

    /// Запись: новая версия, обновление своей версии или отказ с откатом
    pub fn write(&mut self, transaction: TransactionId, table: TableId) {
        let timestamp = self.timestamp(transaction);
        let operation = Operation::write(transaction, table);

        let chain = self.versions.entry(table).or_default();
        let written = match current_version_index(chain).map(|index| chain[index]) {
            None => {
                let version = Version {
                    writer: transaction,
                    read_timestamp: timestamp,
                    write_timestamp: timestamp,
                    number: timestamp,
                };
                chain.push(version);
                version
            }
            Some(current) if timestamp < current.read_timestamp => {
                self.history.push(AuditEvent::WriteRejected {
                    transaction,
                    table,
                    version: current.number,
                    timestamps: TimestampPair::new(current.read_timestamp, timestamp),
                });
                self.rollback(operation);
                return;
            }
            Some(current) => {
                let own = chain
                    .iter()
                    .find(|version| version.write_timestamp == timestamp)
                    .copied();
                match own {
                    // повторная запись той же транзакции схлопывается в её версию
                    Some(own) => own,
                    None => {
                        let version = Version {
                            writer: transaction,
                            read_timestamp: current.read_timestamp,
                            write_timestamp: timestamp,
                            number: timestamp,
                        };
                        chain.push(version);
                        version
                    }
                }
            }
        };

        self.counter += 1;
        self.history.push(AuditEvent::VersionWritten {
            transaction,
            table,
            version: written.number,
            timestamps: written.timestamps(),
        });
        self.record(operation);
    }

    /// Откат: новая метка и перезапуск транзакции с начала
    ///
    /// Версии, записанные отмененной попыткой, удаляются из цепочек; исходная
    /// версия 0, созданная чтением, остается.
    fn rollback(&mut self, rejected: Operation) {
        let transaction = rejected.transaction();
        let cancelled = self.timestamp_of(transaction);
        for chain in self.versions.values_mut() {
            chain.retain(|version| {
                version.writer != transaction || version.write_timestamp != cancelled
            });
        }
        self.versions.retain(|_, chain| !chain.is_empty());

        let fresh = self.counter.max(self.highest_timestamp + 1);
        self.highest_timestamp = fresh;
        self.timestamps.insert(transaction, fresh);
        log::debug!(
            "{} rolled back on {}: restarting with timestamp {}",
            transaction,
            rejected,
            fresh
        );
        self.history.push(AuditEvent::RolledBack {
            transaction,
            timestamp: fresh,
        });

        self.result.retain(|entry| entry.transaction() != transaction);
        let mut batch = self.attempts.remove(&transaction).unwrap_or_default();
        batch.push(rejected);
        batch.extend(take_transaction(&mut self.pending, transaction));
        self.pending.extend(batch);
    }

    /// Фиксация: только отметка в журнале
    pub fn commit(&mut self, transaction: TransactionId) {
        self.attempts.remove(&transaction);
        self.history.push(AuditEvent::Committed { transaction });
        self.result
            .push(ScheduleEntry::Executed(Operation::commit(transaction)));
    }

    fn record(&mut self, operation: Operation) {
        self.result.push(ScheduleEntry::Executed(operation));
        self.attempts
            .entry(operation.transaction())
            .or_default()
            .push(operation);
    }

    /// Цепочка версий таблицы
    pub fn versions(&self, table: TableId) -> &[Version] {
        self.versions
            .get(&table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Текущая версия таблицы
    pub fn current_version(&self, table: TableId) -> Option<Version> {
        let chain = self.versions(table);
        current_version_index(chain).map(|index| chain[index])
    }

    /// Метка транзакции без её выделения
    pub fn timestamp_of(&self, transaction: TransactionId) -> u64 {
        self.timestamps
            .get(&transaction)
            .copied()
            .unwrap_or_else(|| u64::from(transaction.value()))
    }

    /// Оставшиеся операции
    pub fn pending(&self) -> &VecDeque<Operation> {
        &self.pending
    }
}

impl Scheduler for MultiversionScheduler {
    fn protocol(&self) -> Protocol {
        Protocol::Multiversion
    }

    fn step(&mut self) -> Result<bool> {
        let Some(operation) = self.pending.pop_front() else {
            return Ok(false);
        };

        match operation {
            Operation::Read { transaction, table } => self.read(transaction, table),
            Operation::Write { transaction, table } => self.write(transaction, table),
            Operation::Commit { transaction } => self.commit(transaction),
        }
        Ok(true)
    }

    fn result_order(&self) -> &[ScheduleEntry] {
        &self.result
    }

    fn history(&self) -> &[AuditEvent] {
        &self.history
    }
}
