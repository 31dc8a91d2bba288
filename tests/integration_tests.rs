//! Интеграционные тесты для txsim
//!
//! Проверяют планировщики через публичный API крейта: разбор
//! последовательности, прогон всех трех протоколов и формирование отчетов.

mod integration;

use txsim::{simulate, Protocol, Scheduler, TwoPhaseLockingScheduler};

#[test]
fn test_public_api_smoke() -> txsim::Result<()> {
    let mut scheduler = TwoPhaseLockingScheduler::new("R1(X);R2(X);R1(Y);C1;C2")?;
    scheduler.run()?;
    assert_eq!(scheduler.result_string(), "SL1(X);SL2(X);SL1(Y);C1;C2");

    let report = simulate(Protocol::Optimistic, "R1(X);C1")?;
    assert_eq!(report.result, "R1(X);C1");
    Ok(())
}

#[test]
fn test_errors_are_displayable() {
    let err = simulate(Protocol::Multiversion, "W1(X);C1;C1").unwrap_err();
    assert!(err.to_string().starts_with("Invalid sequence: "));
}
