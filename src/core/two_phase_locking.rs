//! Планировщик двухфазного блокирования (2PL) с wait-die
//!
//! Чтение требует разделяемой блокировки, запись - исключительной (с
//! повышением единственной разделяемой). При конфликте более старая
//! транзакция ждет в FIFO-очереди, более молодая прерывается и перезапускается
//! с тем же идентификатором, сохраняя свой приоритет. Все блокировки снимаются
//! только при фиксации.

use crate::common::{Error, Result};
use crate::core::audit::AuditEvent;
use crate::core::lock_table::{Acquisition, LockMode, LockTable};
use crate::core::operation::{Operation, ScheduleEntry, TableId, TransactionId};
use crate::core::scheduler::{Protocol, Scheduler};
use crate::parser::{parse_sequence, validate};
use indexmap::IndexSet;
use std::collections::{HashMap, VecDeque};

/// Планировщик 2PL
#[derive(Debug)]
pub struct TwoPhaseLockingScheduler {
    /// Операции, ожидающие выполнения
    pending: VecDeque<Operation>,
    /// Очередь ожидания блокировок (FIFO)
    wait_queue: VecDeque<Operation>,
    /// Таблица блокировок
    locks: LockTable,
    /// Порядок первого появления транзакций: позиция = приоритет
    arrival: IndexSet<TransactionId>,
    /// Выполненные операции текущей попытки каждой транзакции
    executed: HashMap<TransactionId, Vec<Operation>>,
    /// Итоговое расписание блокировок и фиксаций
    result: Vec<ScheduleEntry>,
    /// Журнал решений
    history: Vec<AuditEvent>,
}

impl TwoPhaseLockingScheduler {
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
        let arrival = operations.iter().map(Operation::transaction).collect();

        Self {
            pending: operations.into(),
            wait_queue: VecDeque::new(),
            locks: LockTable::new(),
            arrival,
            executed: HashMap::new(),
            result: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Запрашивает разделяемую блокировку для чтения
    pub fn acquire_shared(&mut self, transaction: TransactionId, table: TableId) -> bool {
        let outcome = self.locks.acquire_shared(transaction, table);
        if outcome == Acquisition::Granted {
            self.result
                .push(ScheduleEntry::SharedLock { transaction, table });
            self.history.push(AuditEvent::LockGranted {
                transaction,
                table,
                mode: LockMode::Shared,
            });
        }
        outcome.is_success()
    }

    /// Запрашивает исключительную блокировку для записи
    pub fn acquire_exclusive(&mut self, transaction: TransactionId, table: TableId) -> bool {
        let outcome = self.locks.acquire_exclusive(transaction, table);
        match outcome {
            Acquisition::Granted => {
                self.result
                    .push(ScheduleEntry::ExclusiveLock { transaction, table });
                self.history.push(AuditEvent::LockGranted {
                    transaction,
                    table,
                    mode: LockMode::Exclusive,
                });
            }
            Acquisition::Upgraded => {
                self.result
                    .push(ScheduleEntry::UpgradedLock { transaction, table });
                self.history
                    .push(AuditEvent::LockUpgraded { transaction, table });
            }
            Acquisition::AlreadyHeld | Acquisition::Conflict => {}
        }
        outcome.is_success()
    }

    /// Снимает все блокировки транзакции, по записи `UL` на каждую
    pub fn release_all(&mut self, transaction: TransactionId) {
        for table in self.locks.release_all(transaction) {
            self.history
                .push(AuditEvent::LockReleased { transaction, table });
        }
    }

    /// Правило wait-die для операции, не получившей блокировку на `table`
    ///
    /// Транзакция ждет, только если она старше всех конфликтующих владельцев
    /// и сама не держит блокировку, которую ждет операция впереди в очереди.
    fn wait_or_abort(&mut self, operation: Operation, table: TableId) {
        let transaction = operation.transaction();
        let blocker = self
            .outranking_holder(transaction, table)
            .or_else(|| self.waiter_blocked_by(transaction));

        match blocker {
            None => {
                log::debug!("{} waits for a lock on {}", transaction, table);
                self.wait_queue.push_back(operation);
                self.history.push(AuditEvent::Queued {
                    transaction,
                    kind: operation.kind(),
                    table,
                });
            }
            Some(holder) => {
                log::debug!(
                    "{} dies: {} has priority on {}",
                    transaction,
                    holder,
                    table
                );
                self.abort(operation, Some(holder));
            }
        }
    }

    /// Конфликтующий владелец блокировки, который не моложе `transaction`
    fn outranking_holder(
        &self,
        transaction: TransactionId,
        table: TableId,
    ) -> Option<TransactionId> {
        self.locks
            .conflicting_holders(transaction, table)
            .into_iter()
            .find(|holder| !self.is_older(transaction, *holder))
    }

    /// Транзакция из очереди, которая ждет блокировку, удерживаемую `transaction`
    fn waiter_blocked_by(&self, transaction: TransactionId) -> Option<TransactionId> {
        self.wait_queue.iter().find_map(|queued| {
            let table = queued.table()?;
            self.locks
                .conflicting_holders(queued.transaction(), table)
                .contains(&transaction)
                .then(|| queued.transaction())
        })
    }

    /// Прерывает транзакцию и ставит её операции в конец последовательности
    ///
    /// Новая партия: уже выполненные операции, операция, вызвавшая abort,
    /// затем ожидавшие и еще не начатые операции, в исходном порядке.
    pub fn abort(&mut self, operation: Operation, conflict_with: Option<TransactionId>) {
        let transaction = operation.transaction();
        self.history.push(AuditEvent::Aborted {
            transaction,
            table: operation.table(),
            conflict_with,
        });

        self.result.retain(|entry| entry.transaction() != transaction);
        self.release_all(transaction);

        let mut batch = self.executed.remove(&transaction).unwrap_or_default();
        batch.push(operation);
        batch.extend(take_transaction(&mut self.wait_queue, transaction));
        batch.extend(take_transaction(&mut self.pending, transaction));
        self.pending.extend(batch);
    }

    /// Фиксирует транзакцию или откладывает фиксацию, пока её операции в очереди
    pub fn commit(&mut self, operation: Operation) {
        let transaction = operation.transaction();
        if self.is_waiting(transaction) {
            let position = self.pending.len().min(1);
            log::debug!("commit of {} deferred: operations still queued", transaction);
            self.pending.insert(position, operation);
            return;
        }

        self.release_all(transaction);
        self.executed.remove(&transaction);
        self.history.push(AuditEvent::Committed { transaction });
        self.result.push(ScheduleEntry::Executed(operation));
    }

    /// Повторяет запросы из очереди ожидания, пока голова очереди не заблокирована
    fn drain_wait_queue(&mut self) -> bool {
        let mut progressed = false;
        loop {
            while let Some(&operation) = self.wait_queue.front() {
                if !self.try_lock(operation) {
                    break;
                }
                self.wait_queue.pop_front();
                self.record_execution(operation);
                progressed = true;
            }
            if !self.expel_outranked_waiter() {
                return progressed;
            }
            progressed = true;
        }
    }

    /// Прерывает первую ожидающую транзакцию, которую обогнал более старый владелец
    ///
    /// Старшая транзакция может получить разделяемую блокировку уже после того,
    /// как младшая встала в очередь за этой таблицей; младшая тогда погибает.
    fn expel_outranked_waiter(&mut self) -> bool {
        let outranked = self.wait_queue.iter().enumerate().find_map(|(index, queued)| {
            let table = queued.table()?;
            self.outranking_holder(queued.transaction(), table)
                .map(|holder| (index, holder))
        });

        let Some((index, holder)) = outranked else {
            return false;
        };
        let Some(operation) = self.wait_queue.remove(index) else {
            return false;
        };

        log::debug!(
            "{} dies in the wait queue: {} now holds a conflicting lock",
            operation.transaction(),
            holder
        );
        self.abort(operation, Some(holder));
        true
    }

    /// Запрашивает блокировку, нужную операции
    fn try_lock(&mut self, operation: Operation) -> bool {
        match operation {
            Operation::Read { transaction, table } => self.acquire_shared(transaction, table),
            Operation::Write { transaction, table } => {
                self.acquire_exclusive(transaction, table)
            }
            Operation::Commit { .. } => true,
        }
    }

    fn dispatch(&mut self, operation: Operation) {
        match operation.table() {
            None => self.commit(operation),
            Some(_) if self.try_lock(operation) => self.record_execution(operation),
            Some(table) => self.wait_or_abort(operation, table),
        }
    }

    fn record_execution(&mut self, operation: Operation) {
        let transaction = operation.transaction();
        if let Some(table) = operation.table() {
            self.history.push(AuditEvent::Executed {
                transaction,
                kind: operation.kind(),
                table,
            });
        }
        self.executed.entry(transaction).or_default().push(operation);
    }

    /// `a` старше `b`: появилась во входной последовательности раньше
    pub fn is_older(&self, a: TransactionId, b: TransactionId) -> bool {
        match (self.arrival.get_index_of(&a), self.arrival.get_index_of(&b)) {
            (Some(a), Some(b)) => a < b,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Есть ли у транзакции операции в очереди ожидания
    pub fn is_waiting(&self, transaction: TransactionId) -> bool {
        self.wait_queue
            .iter()
            .any(|operation| operation.transaction() == transaction)
    }

    /// Таблица блокировок
    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    /// Очередь ожидания
    pub fn wait_queue(&self) -> &VecDeque<Operation> {
        &self.wait_queue
    }

    /// Оставшиеся операции
    pub fn pending(&self) -> &VecDeque<Operation> {
        &self.pending
    }
}

impl Scheduler for TwoPhaseLockingScheduler {
    fn protocol(&self) -> Protocol {
        Protocol::TwoPhaseLocking
    }

    fn step(&mut self) -> Result<bool> {
        if self.pending.is_empty() && self.wait_queue.is_empty() {
            return Ok(false);
        }

        let progressed = self.drain_wait_queue();
        let next = self
            .pending
            .iter()
            .position(|operation| !self.is_waiting(operation.transaction()));

        match next.and_then(|index| self.pending.remove(index)) {
            Some(operation) => self.dispatch(operation),
            None if progressed => {}
            // очередь ждет только более молодых, кто-то из них всегда готов к работе
            None => {
                return Err(Error::internal(format!(
                    "wait queue of {} operations has no runnable transaction",
                    self.wait_queue.len()
                )))
            }
        }

        // выданная сейчас разделяемая блокировка могла обогнать ожидающих
        while self.expel_outranked_waiter() {}
        Ok(true)
    }

    fn result_order(&self) -> &[ScheduleEntry] {
        &self.result
    }

    fn history(&self) -> &[AuditEvent] {
        &self.history
    }
}

/// Извлекает из очереди операции транзакции, сохраняя порядок остальных
pub(crate) fn take_transaction(
    queue: &mut VecDeque<Operation>,
    transaction: TransactionId,
) -> Vec<Operation> {
    let (taken, kept): (VecDeque<_>, VecDeque<_>) = queue
        .drain(..)
        .partition(|operation| operation.transaction() == transaction);
    *queue = kept;
    taken.into()
}
