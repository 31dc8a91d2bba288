//! Тесты для таблицы блокировок txsim

use super::{table, tx};
use crate::core::{Acquisition, LockMode, LockTable};

#[test]
fn test_lock_mode_compatibility() {
    assert!(LockMode::Shared.is_compatible(&LockMode::Shared));
    assert!(!LockMode::Shared.is_compatible(&LockMode::Exclusive));
    assert!(!LockMode::Exclusive.is_compatible(&LockMode::Shared));
    assert!(!LockMode::Exclusive.is_compatible(&LockMode::Exclusive));
}

#[test]
fn test_lock_table_creation() {
    let locks = LockTable::new();
    let stats = locks.statistics();

    assert!(locks.is_empty());
    assert_eq!(stats.locks_acquired, 0);
    assert_eq!(stats.conflicts, 0);
}

#[test]
fn test_shared_locks_are_compatible() {
    let mut locks = LockTable::new();

    assert_eq!(locks.acquire_shared(tx(1), table('X')), Acquisition::Granted);
    assert_eq!(locks.acquire_shared(tx(2), table('X')), Acquisition::Granted);
    // Повторный запрос ничего не меняет
    assert_eq!(locks.acquire_shared(tx(1), table('X')), Acquisition::AlreadyHeld);

    assert_eq!(locks.shared_holders(table('X')), vec![tx(1), tx(2)]);
    assert!(locks.is_consistent());
}

#[test]
fn test_exclusive_lock_conflicts() {
    let mut locks = LockTable::new();

    assert_eq!(locks.acquire_exclusive(tx(1), table('A')), Acquisition::Granted);
    assert_eq!(locks.acquire_shared(tx(2), table('A')), Acquisition::Conflict);
    assert_eq!(locks.acquire_exclusive(tx(2), table('A')), Acquisition::Conflict);

    // Своя исключительная блокировка покрывает чтение и повторную запись
    assert_eq!(locks.acquire_shared(tx(1), table('A')), Acquisition::AlreadyHeld);
    assert_eq!(locks.acquire_exclusive(tx(1), table('A')), Acquisition::AlreadyHeld);

    assert_eq!(locks.exclusive_holder(table('A')), Some(tx(1)));
    assert_eq!(locks.conflicting_holders(tx(2), table('A')), vec![tx(1)]);
    assert_eq!(locks.statistics().conflicts, 2);
}

#[test]
fn test_upgrade_requires_sole_holder() {
    let mut locks = LockTable::new();

    locks.acquire_shared(tx(1), table('X'));
    locks.acquire_shared(tx(2), table('X'));
    assert_eq!(locks.acquire_exclusive(tx(1), table('X')), Acquisition::Conflict);

    locks.release_all(tx(2));
    assert_eq!(locks.acquire_exclusive(tx(1), table('X')), Acquisition::Upgraded);

    assert_eq!(locks.exclusive_holder(table('X')), Some(tx(1)));
    assert!(locks.shared_holders(table('X')).is_empty());
    assert!(locks.is_consistent());
    assert_eq!(locks.statistics().upgrades, 1);
}

#[test]
fn test_release_all_order() {
    let mut locks = LockTable::new();

    locks.acquire_exclusive(tx(1), table('B'));
    locks.acquire_shared(tx(1), table('X'));
    locks.acquire_shared(tx(1), table('Y'));
    locks.acquire_shared(tx(2), table('Y'));

    // Сначала разделяемые, затем исключительные
    let released = locks.release_all(tx(1));
    assert_eq!(released, vec![table('X'), table('Y'), table('B')]);

    assert!(!locks.holds_any(tx(1)));
    assert!(locks.holds_any(tx(2)));
    assert_eq!(locks.shared_holders(table('Y')), vec![tx(2)]);
    assert_eq!(locks.statistics().locks_released, 3);
}

#[test]
fn test_release_without_locks() {
    let mut locks = LockTable::new();
    locks.acquire_shared(tx(1), table('X'));

    assert!(locks.release_all(tx(7)).is_empty());
    assert_eq!(locks.shared_holders(table('X')), vec![tx(1)]);
}
