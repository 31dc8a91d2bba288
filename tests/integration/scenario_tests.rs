//! Тесты канонических сценариев
//!
//! Каждый сценарий прогоняется через все три протокола, результат
//! сравнивается с заранее посчитанным порядком.

use super::common::*;
use txsim::{simulate, AuditEvent, Protocol, Result};

#[test]
pub fn test_canonical_results() -> Result<()> {
    for scenario in SCENARIOS {
        let expected = [
            (Protocol::TwoPhaseLocking, scenario.two_phase_locking),
            (Protocol::Optimistic, scenario.optimistic),
            (Protocol::Multiversion, scenario.multiversion),
        ];
        for (protocol, result) in expected {
            let report = simulate(protocol, scenario.sequence)?;
            assert_eq!(
                report.result, result,
                "{} scenario under {}",
                scenario.name, protocol
            );
        }
    }
    Ok(())
}

#[test]
pub fn test_every_transaction_commits() -> Result<()> {
    for scenario in SCENARIOS {
        for protocol in Protocol::ALL {
            let report = simulate(protocol, scenario.sequence)?;
            assert_eq!(
                committed(&report),
                transactions(scenario.sequence),
                "{} scenario under {}",
                scenario.name,
                protocol
            );
        }
    }
    Ok(())
}

#[test]
pub fn test_wait_die_history() -> Result<()> {
    let report = simulate(
        Protocol::TwoPhaseLocking,
        "R1(A);W2(A);R2(A);R3(A);W1(A);C1;C2;C3",
    )?;

    let abort = report
        .history
        .iter()
        .find(|event| event.is_abort())
        .map(ToString::to_string);
    assert_eq!(abort.as_deref(), Some("T2 aborted due to conflict with T1"));

    let queued: Vec<String> = report
        .history
        .iter()
        .filter(|event| matches!(event, AuditEvent::Queued { .. }))
        .map(ToString::to_string)
        .collect();
    assert_eq!(queued, vec!["W1(A) queued"]);
    Ok(())
}

#[test]
pub fn test_lock_released_for_every_grant() -> Result<()> {
    for scenario in SCENARIOS {
        let report = simulate(Protocol::TwoPhaseLocking, scenario.sequence)?;
        let grants = report
            .history
            .iter()
            .filter(|event| matches!(event, AuditEvent::LockGranted { .. }))
            .count();
        let releases = report
            .history
            .iter()
            .filter(|event| matches!(event, AuditEvent::LockReleased { .. }))
            .count();
        // Повышение не создает новой блокировки
        assert_eq!(grants, releases, "{} scenario", scenario.name);
    }
    Ok(())
}

#[test]
pub fn test_mvcc_rollback_history() -> Result<()> {
    let report = simulate(Protocol::Multiversion, "R1(X);R2(X);W1(X);W2(X);C1;C2")?;

    let rejected = report
        .history
        .iter()
        .position(|event| matches!(event, AuditEvent::WriteRejected { .. }));
    let rolled_back = report
        .history
        .iter()
        .position(|event| matches!(event, AuditEvent::RolledBack { .. }));
    assert_eq!(rejected, Some(2));
    assert_eq!(rolled_back, Some(3));
    assert_eq!(
        report.history[3].to_string(),
        "T1 rolled back with new timestamp 3"
    );
    Ok(())
}
