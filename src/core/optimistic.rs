//! Оптимистичный планировщик (OCC) с обратной валидацией
//!
//! Транзакция проходит фазу чтения (накапливая множества чтения и записи),
//! валидацию при фиксации и фазу записи. При валидации транзакция сверяется
//! со всеми ранее провалидированными транзакциями, завершившимися после её
//! старта. Конфликт всегда разрешается полным abort и перезапуском.

use crate::common::Result;
use crate::core::audit::AuditEvent;
use crate::core::operation::{Operation, OperationKind, ScheduleEntry, TableId, TransactionId};
use crate::core::scheduler::{Protocol, Scheduler};
use crate::parser::{parse_sequence, validate};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use std::fmt;

/// Логическое время глобальных часов; `Unbounded` - бесконечно далекое будущее
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogicalTime {
    At(u64),
    #[default]
    Unbounded,
}

impl LogicalTime {
    pub fn is_bounded(&self) -> bool {
        matches!(self, LogicalTime::At(_))
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalTime::At(tick) => write!(f, "{}", tick),
            LogicalTime::Unbounded => write!(f, "inf"),
        }
    }
}

/// Состояние транзакции
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Транзакция выполняет операции
    Active,
    /// Транзакция успешно зафиксирована
    Committed,
    /// Транзакция прервана (и ждет перезапуска)
    Aborted,
}

/// Транзакция OCC
#[derive(Debug, Clone)]
pub struct OptimisticTransaction {
    pub id: TransactionId,
    /// Множество чтения
    pub reads: IndexSet<TableId>,
    /// Множество записи
    pub writes: IndexSet<TableId>,
    pub status: TransactionStatus,
    pub start: LogicalTime,
    pub validation: LogicalTime,
    pub finish: LogicalTime,
    /// Операции текущей попытки
    operations: Vec<Operation>,
}

impl OptimisticTransaction {
    fn new(id: TransactionId) -> Self {
        Self {
            id,
            reads: IndexSet::new(),
            writes: IndexSet::new(),
            status: TransactionStatus::Active,
            start: LogicalTime::Unbounded,
            validation: LogicalTime::Unbounded,
            finish: LogicalTime::Unbounded,
            operations: Vec::new(),
        }
    }

    /// Отрезок активности `ti` пересекает окно [start, validation) транзакции
    fn finished_within(&self, start: LogicalTime, validation: LogicalTime) -> bool {
        self.validation < validation && self.finish >= start && self.finish < validation
    }

    fn reset(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.start = LogicalTime::Unbounded;
        self.validation = LogicalTime::Unbounded;
        self.finish = LogicalTime::Unbounded;
    }
}

/// Планировщик OCC
#[derive(Debug)]
pub struct OptimisticScheduler {
    /// Операции, ожидающие выполнения
    pending: VecDeque<Operation>,
    /// Транзакции в порядке первого появления
    transactions: IndexMap<TransactionId, OptimisticTransaction>,
    /// Глобальные логические часы
    clock: u64,
    /// Итоговый порядок: операции транзакций в порядке валидации
    result: Vec<ScheduleEntry>,
    /// Журнал решений
    history: Vec<AuditEvent>,
}

impl OptimisticScheduler {
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
        Self {
            pending: operations.into(),
            transactions: IndexMap::new(),
            clock: 0,
            result: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Фаза чтения: запоминает таблицу в множестве чтения
    pub fn read(&mut self, transaction: TransactionId, table: TableId) {
        self.access(Operation::read(transaction, table));
    }

    /// Фаза чтения: запоминает таблицу в множестве записи
    pub fn write(&mut self, transaction: TransactionId, table: TableId) {
        self.access(Operation::write(transaction, table));
    }

    fn access(&mut self, operation: Operation) {
        let Some(table) = operation.table() else {
            return;
        };
        let transaction = operation.transaction();
        let entry = self.begin(transaction);
        match operation.kind() {
            OperationKind::Read => entry.reads.insert(table),
            _ => entry.writes.insert(table),
        };
        entry.operations.push(operation);
        self.tick();

        self.history.push(AuditEvent::Executed {
            transaction,
            kind: operation.kind(),
            table,
        });
    }

    /// Обратная валидация при фиксации
    pub fn validate(&mut self, transaction: TransactionId) {
        self.begin(transaction);
        let validation = LogicalTime::At(self.tick());

        let (start, reads) = match self.transactions.get_mut(&transaction) {
            Some(entry) => {
                entry.validation = validation;
                (entry.start, entry.reads.clone())
            }
            None => return,
        };

        let conflict = self
            .transactions
            .values()
            .filter(|other| other.id != transaction)
            .find(|other| {
                other.finished_within(start, validation) && !other.writes.is_disjoint(&reads)
            })
            .map(|other| other.id);

        match conflict {
            Some(other) => {
                log::debug!(
                    "{} failed validation at {}: {} wrote a table it read",
                    transaction,
                    validation,
                    other
                );
                self.abort(transaction, Some(other));
            }
            None => self.commit(transaction),
        }
    }

    /// Фаза записи: фиксирует транзакцию и переносит её операции в результат
    pub fn commit(&mut self, transaction: TransactionId) {
        let finish = LogicalTime::At(self.tick());
        let Some(entry) = self.transactions.get_mut(&transaction) else {
            return;
        };
        entry.finish = finish;
        entry.status = TransactionStatus::Committed;

        self.result
            .extend(entry.operations.drain(..).map(ScheduleEntry::from));
        self.result
            .push(ScheduleEntry::Executed(Operation::commit(transaction)));
        self.history.push(AuditEvent::Committed { transaction });
    }

    /// Прерывает транзакцию и ставит её попытку целиком в конец последовательности
    pub fn abort(&mut self, transaction: TransactionId, conflict_with: Option<TransactionId>) {
        self.tick();
        self.history.push(AuditEvent::Aborted {
            transaction,
            table: None,
            conflict_with,
        });

        let Some(entry) = self.transactions.get_mut(&transaction) else {
            return;
        };
        entry.status = TransactionStatus::Aborted;
        self.pending.extend(entry.operations.drain(..));
        self.pending.push_back(Operation::commit(transaction));
        entry.reset();
    }

    /// Возвращает запись транзакции, открывая новую попытку при необходимости
    fn begin(&mut self, transaction: TransactionId) -> &mut OptimisticTransaction {
        let clock = self.clock;
        let entry = self
            .transactions
            .entry(transaction)
            .or_insert_with(|| OptimisticTransaction::new(transaction));
        if !entry.start.is_bounded() {
            entry.start = LogicalTime::At(clock);
            entry.status = TransactionStatus::Active;
        }
        entry
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Транзакция по идентификатору
    pub fn transaction(&self, transaction: TransactionId) -> Option<&OptimisticTransaction> {
        self.transactions.get(&transaction)
    }

    /// Текущее значение часов
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Оставшиеся операции
    pub fn pending(&self) -> &VecDeque<Operation> {
        &self.pending
    }
}

impl Scheduler for OptimisticScheduler {
    fn protocol(&self) -> Protocol {
        Protocol::Optimistic
    }

    fn step(&mut self) -> Result<bool> {
        let Some(operation) = self.pending.pop_front() else {
            return Ok(false);
        };

        match operation {
            Operation::Read { transaction, table } => self.read(transaction, table),
            Operation::Write { transaction, table } => self.write(transaction, table),
            Operation::Commit { transaction } => self.validate(transaction),
        }
        self.tick();
        Ok(true)
    }

    fn result_order(&self) -> &[ScheduleEntry] {
        &self.result
    }

    fn history(&self) -> &[AuditEvent] {
        &self.history
    }
}
