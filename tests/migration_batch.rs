//! Batch Migration Integration Tests
//!
//! Runs the parallel curve migrator against a sled-backed production store
//! and verifies field-scale behavior: every record gets an outcome in input
//! order, failures stay per-well, and migrated curves immediately feed the
//! fleet projection.

use chrono::NaiveDate;
use declina::engine::{CurveMigrator, ExtrapolationEngine, MigrationRecord, MigrationStatus};
use declina::storage::{CurveStore, ProductionStore};
use declina::types::{FluidType, ProductionSeries};

/// Clean exponential decline `200 * e^(-0.1 * i)` starting 2020-01.
fn pure_decline(well: &str, months: usize) -> ProductionSeries {
    let labels: Vec<String> = (0..months)
        .map(|i| format!("{}-{:02}", 2020 + i / 12, i % 12 + 1))
        .collect();
    let values: Vec<Option<f64>> = (0..months)
        .map(|i| Some(200.0 * (-0.1 * i as f64).exp()))
        .collect();
    ProductionSeries {
        well: well.to_string(),
        month: labels,
        efec_oil_prod: values,
        efec_gas_prod: vec![None; months],
        efec_water_prod: vec![None; months],
    }
}

fn record(well: &str, cut: &str) -> MigrationRecord {
    MigrationRecord {
        well: well.to_string(),
        cut_date: cut.to_string(),
        injection_date: None,
        event_date: None,
        system_date: None,
    }
}

#[test]
fn test_field_scale_batch_lands_every_well() {
    let production = ProductionStore::open_temp().unwrap();
    let curves = CurveStore::open_temp().unwrap();

    let wells: Vec<String> = (0..25).map(|i| format!("PM-{:02}", i)).collect();
    for well in &wells {
        production.put_series("Campo", &pure_decline(well, 18)).unwrap();
    }
    let records: Vec<MigrationRecord> =
        wells.iter().map(|w| record(w, "2020-01-01")).collect();

    let report = CurveMigrator::new(1).run(&records, &production, &curves);

    assert_eq!(report.migrated, 25, "every well has enough clean history");
    assert_eq!(report.failed, 0);
    assert_eq!(curves.count(), 25);

    // Parallel execution must not reorder outcomes.
    let out_wells: Vec<&str> = report.outcomes.iter().map(|o| o.well.as_str()).collect();
    let in_wells: Vec<&str> = wells.iter().map(|w| w.as_str()).collect();
    assert_eq!(out_wells, in_wells);

    let sample = curves
        .latest_for("PM-07", FluidType::Oil)
        .unwrap()
        .expect("migrated curve for PM-07");
    assert_eq!(sample.name, "Curva Base Oil");
    assert_eq!(sample.start_date, "2020-01");
    assert_eq!(sample.qo, 200.0);
    assert_eq!(sample.dea, 0.1);
}

#[test]
fn test_mixed_batch_isolates_outcomes() {
    let production = ProductionStore::open_temp().unwrap();
    let curves = CurveStore::open_temp().unwrap();

    production.put_series("Campo", &pure_decline("OK-1", 18)).unwrap();
    production.put_series("Campo", &pure_decline("THIN", 7)).unwrap();
    production.put_series("Campo", &pure_decline("LATE", 18)).unwrap();

    let records = vec![
        record("OK-1", "2020-01-01"),
        record("GHOST", "2020-01-01"),
        record("THIN", "2020-01-01"),
        record("LATE", "2030-06-01"),
    ];
    let report = CurveMigrator::new(1).run(&records, &production, &curves);

    assert_eq!(report.migrated, 1);
    assert_eq!(report.skipped, 2, "unknown well and cut past the data");
    assert_eq!(report.failed, 1, "seven samples trim below the fit minimum");
    assert_eq!(curves.count(), 1, "only OK-1 persisted anything");

    assert!(matches!(
        report.outcomes[0].status,
        MigrationStatus::Migrated { .. }
    ));
    assert!(matches!(
        report.outcomes[1].status,
        MigrationStatus::Skipped { .. }
    ));
    assert!(matches!(
        report.outcomes[2].status,
        MigrationStatus::Failed { .. }
    ));
    assert!(matches!(
        report.outcomes[3].status,
        MigrationStatus::Skipped { .. }
    ));
}

#[test]
fn test_migrated_curves_feed_fleet_projection() {
    let production = ProductionStore::open_temp().unwrap();
    let curves = CurveStore::open_temp().unwrap();

    production.put_series("Campo", &pure_decline("M-1", 18)).unwrap();
    production.put_series("Campo", &pure_decline("M-2", 18)).unwrap();

    let records = vec![record("M-1", "2020-01-01"), record("M-2", "2030-01-01")];
    let report = CurveMigrator::new(1).run(&records, &production, &curves);
    assert_eq!(report.migrated, 1);
    assert_eq!(report.skipped, 1);

    let fleet = ExtrapolationEngine::new()
        .fleet_projection(&production, &curves, "Campo", FluidType::Oil, 6)
        .unwrap();

    assert_eq!(fleet.wells.len(), 1);
    assert_eq!(fleet.last_production_month, NaiveDate::from_ymd_opt(2021, 6, 1));

    // M-1's curve continues 17 months past its 2020-01 start.
    let expected = 200.0 * (-0.1_f64 * 17.0).exp();
    assert!(
        (fleet.per_month[0] - expected).abs() < 1e-9,
        "first projected month {} vs {}",
        fleet.per_month[0],
        expected
    );
    assert!(fleet.skipped.iter().any(|s| s.well == "M-2"));
}
