//! Тесты сравнения протоколов
//!
//! Протоколы независимы: один и тот же вход дает отдельный отчет для
//! каждого, и параллельный прогон не отличается от последовательного.

use rayon::prelude::*;
use txsim::{simulate, Protocol, Result, SimulationReport};

const SEQUENCE: &str = "R1(A);R2(B);W1(B);R3(A);W2(A);C1;W3(B);C2;C3";

#[test]
pub fn test_parallel_matches_sequential() -> Result<()> {
    let sequential = Protocol::ALL
        .iter()
        .map(|protocol| simulate(*protocol, SEQUENCE))
        .collect::<Result<Vec<SimulationReport>>>()?;
    let parallel = Protocol::ALL[..]
        .par_iter()
        .map(|protocol| simulate(*protocol, SEQUENCE))
        .collect::<Result<Vec<SimulationReport>>>()?;

    assert_eq!(sequential, parallel);
    Ok(())
}

#[test]
pub fn test_runs_are_deterministic() -> Result<()> {
    for protocol in Protocol::ALL {
        let first = simulate(protocol, SEQUENCE)?;
        let second = simulate(protocol, SEQUENCE)?;
        assert_eq!(first.to_json(false)?, second.to_json(false)?);
    }
    Ok(())
}

#[test]
pub fn test_reports_serialize_as_array() -> Result<()> {
    let reports = Protocol::ALL
        .iter()
        .map(|protocol| simulate(*protocol, SEQUENCE))
        .collect::<Result<Vec<SimulationReport>>>()?;

    let json = serde_json::to_value(&reports)?;
    let array = json.as_array().map(Vec::len);
    assert_eq!(array, Some(3));
    for report in json.as_array().into_iter().flatten() {
        assert!(report["history"].is_array());
        assert!(report["summary"]["commits"].as_u64() == Some(3));
    }
    Ok(())
}
