use chrono::{Duration, NaiveDate};
use hedge_eval::backtest::{delta_hedge, delta_vega_hedge};
use hedge_eval::connectors::{DataError, OptionsData, DEFAULT_DATA_DIR};
use hedge_eval::models::{HedgeError, HedgeParams, OptionSeries, QuoteRow};
use hedge_eval::pricing::BlackScholes;
use hedge_eval::simulation::simulate;
use hedge_eval::strategy::{DeltaHedge, DeltaVegaHedge};
use hedge_eval::traits::{HedgingStrategy, OptionsDataSource};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

// Calls on 100 priced at a flat 20% volatility, rounded to 4 decimals.
// The 105 column has a missing and a NaN quote, "volume" is not a strike.
const JAN_SHEET: &str = "\
date,T,S,r,95,100,105,volume
2010-01-04,20,100.0,1.0,5.6023,2.2865,0.6324,1200
2010-01-05,19,101.5,1.0,6.8624,3.0828,,900
,,,,,,,
2010-01-06,18,99.8,1.0,5.3571,2.0656,NaN,1500
2010-01-07,17,102.3,1.0,7.5365,3.4882,1.0836,700
2010-01-08,16,101.0,1.0,6.3216,2.5958,0.6709,800
";

// Starts after the last Jan row: cannot be aligned with Jan
const FEB_SHEET: &str = "\
date,T,S,r,95,100,105
2010-01-11,45,100.5,1.0,7.30,3.90,1.60
2010-01-12,44,101.0,1.0,7.60,4.10,1.70
2010-01-13,43,100.0,1.0,6.90,3.60,1.40
";

// Near expiry with a volatility moving between 21% and 25%
const MAR_SHEET: &str = "\
date,T,S,r,95,100,105
2010-01-04,20,100.0,1.0,5.7508,2.5111,0.7979
2010-01-05,19,101.2,1.0,6.7745,3.2218,1.1487
2010-01-06,18,99.4,1.0,5.1009,1.9769,0.5112
2010-01-07,17,100.8,1.0,6.4103,2.9532,1.0057
2010-01-08,16,102.1,1.0,7.4026,3.4801,1.1458
2010-01-09,15,101.3,1.0,6.7982,3.1876,1.0982
";

// Far expiry, first quoted on the second Mar date
const JUN_SHEET: &str = "\
date,T,S,r,95,100,105
2010-01-05,84,101.2,1.0,8.4952,5.4307,3.2115
2010-01-06,83,99.4,1.0,7.3923,4.6485,2.7157
2010-01-07,82,100.8,1.0,7.9615,4.9176,2.774
2010-01-08,81,102.1,1.0,9.4592,6.3198,3.9604
2010-01-09,80,101.3,1.0,8.4673,5.3697,3.1369
";

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "test_hedge_eval_{}_{}",
        tag,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_sheet(dir: &PathBuf, name: &str, contents: &str) {
    let mut f = File::create(dir.join(format!("{}.csv", name))).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

fn load_dataset(tag: &str) -> OptionsData {
    let dir = temp_dir(tag);
    write_sheet(&dir, "Jan", JAN_SHEET);
    write_sheet(&dir, "Feb", FEB_SHEET);
    fs::write(dir.join("notes.txt"), "not a sheet").unwrap();
    OptionsData::open(&dir).unwrap()
}

fn synthetic(name: &str, start: NaiveDate, days: u32, spots: &[f64]) -> OptionSeries {
    let rows = spots
        .iter()
        .enumerate()
        .map(|(i, &spot)| {
            let mut row = QuoteRow::new(start + Duration::days(i as i64), days - i as u32, spot, 0.01);
            for k in [95, 100, 105] {
                let price = BlackScholes::new(spot, k as f64, row.time_to_maturity, 0.01, 0.2).call_price();
                row.insert_call(k, price);
            }
            row
        })
        .collect();
    OptionSeries::new(name, rows)
}

#[test]
fn test_loader_cleans_sheets() {
    let data = load_dataset("loader");
    assert_eq!(data.sheet_names(), vec!["Jan", "Feb"]);

    let jan = data.series("Jan").unwrap();
    // The blank row is dropped
    assert_eq!(jan.len(), 5);
    assert!((jan.rows[0].rate - 0.01).abs() < 1e-15);
    assert!((jan.rows[0].time_to_maturity - 20.0 / 252.0).abs() < 1e-15);
    assert_eq!(jan.rows[0].call_price(100), Some(2.2865));
    assert_eq!(jan.rows[1].call_price(105), None);
    assert_eq!(jan.rows[2].call_price(105), None);
    assert_eq!(jan.rows[0].quoted_strikes().collect::<Vec<_>>(), vec![95, 100, 105]);

    assert_eq!(data.next_sheet_name("Jan").unwrap(), "Feb");
    assert_eq!(data.next_sheet_name("Feb").unwrap(), "Feb");
}

#[test]
fn test_delta_hedge_end_to_end() {
    let data = load_dataset("delta");
    let params = HedgeParams::new()
        .with_portfolio_size(1)
        .with_schedule(2)
        .with_cost_basis(0.01);

    // Reference values use the exact normal CDF and a bisection IV;
    // the rational CDF approximation stays well within 1e-6 of them.
    let stats = delta_hedge(&data, Some("Jan"), &params).unwrap();
    assert_eq!(stats.strikes, vec![100]);
    assert_eq!(stats.rehedges, 1);
    assert!((stats.mse - 0.016176068776917688).abs() < 1e-6, "mse {}", stats.mse);
    assert!(
        (stats.total_cost - 0.5326240186791883).abs() < 1e-6,
        "total cost {}",
        stats.total_cost
    );
}

#[test]
fn test_unspecified_sheet_uses_first() {
    let data = load_dataset("default_sheet");
    let params = HedgeParams::new().with_portfolio_size(1);
    let explicit = delta_hedge(&data, Some("Jan"), &params).unwrap();
    let default = delta_hedge(&data, None, &params).unwrap();
    assert_eq!(default, explicit);
}

#[test]
fn test_long_schedule_freezes_delta_hedge() {
    let data = load_dataset("frozen_delta");
    let params = HedgeParams::new().with_portfolio_size(1).with_schedule(10);
    let stats = delta_hedge(&data, Some("Jan"), &params).unwrap();
    assert_eq!(stats.rehedges, 0);
    // Only the day-0 hedge is paid for
    assert!((stats.total_cost - 0.5168534074546536).abs() < 1e-6);
}

#[test]
fn test_delta_vega_hedge_end_to_end() {
    let dir = temp_dir("delta_vega");
    write_sheet(&dir, "Mar", MAR_SHEET);
    write_sheet(&dir, "Jun", JUN_SHEET);
    let data = OptionsData::open(&dir).unwrap();
    assert_eq!(data.next_sheet_name("Mar").unwrap(), "Jun");

    let params = HedgeParams::new()
        .with_portfolio_size(2)
        .with_schedule(2)
        .with_cost_basis(0.01);
    let stats = delta_vega_hedge(&data, Some("Mar"), &params).unwrap();
    assert_eq!(stats.strikes, vec![100, 105]);

    let strategy = DeltaVegaHedge::new(
        data.series("Mar").unwrap(),
        data.series("Jun").unwrap(),
        &params,
    )
    .unwrap();
    assert_eq!(strategy.rep_strike(), 100);
    // Mar aligned on Jan 5 keeps 5 rows: t = 0, 1, 2 with rebalances on 0 and 2
    assert_eq!(stats.rehedges, 2);

    // Exact normal CDF, bisection IV, ratios solved by hand
    assert!((stats.mse - 0.5440610424218728).abs() < 5e-6, "mse {}", stats.mse);
    assert!(
        (stats.total_cost - 0.7890056348907651).abs() < 5e-6,
        "total cost {}",
        stats.total_cost
    );
}

#[test]
fn test_delta_vega_alignment_failure() {
    let data = load_dataset("alignment");
    let err = delta_vega_hedge(&data, Some("Jan"), &HedgeParams::new()).unwrap_err();
    match err {
        HedgeError::NoAlignmentDate { primary, hedge, date } => {
            assert_eq!(primary, "Jan");
            assert_eq!(hedge, "Feb");
            assert_eq!(date, NaiveDate::from_ymd_opt(2010, 1, 11).unwrap());
        }
        other => panic!("Expected NoAlignmentDate, got {:?}", other),
    }
}

#[test]
fn test_delta_vega_rehedges_on_first_day() {
    let start = NaiveDate::from_ymd_opt(2010, 1, 4).unwrap();
    let data = OptionsData::from_series(vec![
        synthetic("Jan", start, 20, &[100.0, 101.0, 99.5, 100.5, 102.0, 101.0]),
        synthetic("Feb", start + Duration::days(1), 45, &[101.0, 99.5, 100.5, 102.0, 101.0]),
    ]);

    let params = HedgeParams::new().with_portfolio_size(2).with_schedule(10);
    let stats = delta_vega_hedge(&data, Some("Jan"), &params).unwrap();
    // Re-indexed from 0: the first simulated day is a rebalance day
    assert_eq!(stats.rehedges, 1);
    assert!(stats.mse.is_finite() && stats.mse >= 0.0);

    let primary = data.series("Jan").unwrap();
    let hedge = data.series("Feb").unwrap();
    let strategy = DeltaVegaHedge::new(primary, hedge, &params).unwrap();
    let ledger = simulate(&strategy, &params);
    assert_eq!(ledger.rehedge_days(), &[0]);
    // Jan aligned on Jan 5 has 5 rows, like Feb
    assert_eq!(ledger.squared_errors().len(), 3);
}

#[test]
fn test_costs_and_errors_accumulate() {
    let start = NaiveDate::from_ymd_opt(2010, 2, 1).unwrap();
    let series = synthetic(
        "Mar",
        start,
        30,
        &[100.0, 101.2, 99.1, 98.4, 100.9, 102.5, 101.7, 103.0, 102.2, 100.8],
    );

    for schedule in 1..=10 {
        let params = HedgeParams::new().with_portfolio_size(3).with_schedule(schedule);
        let strategy = DeltaHedge::new(&series, &params).unwrap();
        let (day0, opening_cost) = strategy.open();
        assert!(day0.delta > 0.0);

        let ledger = simulate(&strategy, &params);
        assert_eq!(ledger.squared_errors().len(), series.len() - 2);
        assert!(ledger.total_cost() >= opening_cost);

        let mean = ledger.squared_errors().iter().sum::<f64>() / (series.len() - 2) as f64;
        assert!((ledger.mse() - mean).abs() < 1e-12);
        assert!(ledger.mse() >= 0.0);

        let expected: Vec<usize> = (1..=series.len() - 2).filter(|t| t % schedule == 0).collect();
        assert_eq!(ledger.rehedge_days(), expected.as_slice());
    }
}

#[test]
fn test_missing_data_dir() {
    if std::path::Path::new(DEFAULT_DATA_DIR).is_dir() {
        return;
    }
    let missing = std::env::temp_dir().join("test_hedge_eval_does_not_exist");
    assert!(matches!(
        OptionsData::open(&missing),
        Err(DataError::NotFound { .. })
    ));
}
