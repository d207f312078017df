// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use easel::optimizer::{bernoulli_sample, reservoir_sample, stride_sample};
use easel::{ChartType, DataOptimizer, OptimizeOptions, OptimizerSettings, PerformanceGain, SamplingStrategy};
use proptest::prelude::*;
use quarry::{Row, Value};

fn series(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::new();
            row.insert("SEQ".into(), Value::from(i as i64));
            row.insert("TOTAL_AMOUNT".into(), Value::from(((i * 37) % 101) as f64));
            row
        })
        .collect()
}

fn seq(row: &Row) -> i64 {
    match row["SEQ"] {
        Value::Integer(i) => i,
        ref other => panic!("unexpected SEQ value {other:?}"),
    }
}

#[test]
fn gradient_area_keeps_endpoints_within_budget() {
    let optimizer = DataOptimizer::default();
    let rows = series(1000);
    let out = optimizer.optimize(rows, &ChartType::GradientArea, &OptimizeOptions::default());
    assert!(out.len() <= 202, "got {} rows", out.len());
    assert_eq!(seq(&out[0]), 0);
    assert_eq!(seq(out.last().unwrap()), 999);
    assert!(out.windows(2).all(|w| seq(&w[0]) < seq(&w[1])));
}

#[test]
fn heatmap_truncates_to_threshold() {
    let out = DataOptimizer::default().optimize(series(250), &ChartType::Heatmap, &OptimizeOptions::default());
    assert_eq!(out.len(), 100);
    assert_eq!(seq(&out[99]), 99);
}

#[test]
fn generic_reservoir_keeps_exactly_threshold_rows_in_order() {
    let optimizer = DataOptimizer::default();
    let out = optimizer.optimize(series(5000), &ChartType::Bar, &OptimizeOptions::default());
    assert_eq!(out.len(), 100);
    assert!(out.windows(2).all(|w| seq(&w[0]) < seq(&w[1])));

    let again = optimizer.optimize(series(5000), &ChartType::Bar, &OptimizeOptions::default());
    assert_eq!(out, again);
}

#[test]
fn bernoulli_sampling_is_capped_at_threshold() {
    let settings = OptimizerSettings {
        generic_sampling: SamplingStrategy::Bernoulli,
        ..OptimizerSettings::default()
    };
    let out = DataOptimizer::new(settings).optimize(series(5000), &ChartType::Scatter, &OptimizeOptions::default());
    assert!(!out.is_empty() && out.len() <= 100);
    assert_eq!(bernoulli_sample(&series(3), 10, 42).len(), 3);
}

#[test]
fn executive_dashboard_ranks_by_magnitude() {
    let optimizer = DataOptimizer::default();
    let out = optimizer.optimize(series(300), &ChartType::ExecutiveDashboard, &OptimizeOptions::default());
    assert_eq!(out.len(), 50);
    let amounts: Vec<f64> = out.iter().map(|r| r["TOTAL_AMOUNT"].as_f64().unwrap()).collect();
    assert!(amounts.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(amounts[0], 100.0);

    let by_seq = optimizer.optimize(
        series(300),
        &ChartType::ExecutiveDashboard,
        &OptimizeOptions { magnitude_field: Some("seq".into()) },
    );
    assert_eq!(seq(&by_seq[0]), 299);
}

#[test]
fn non_numeric_magnitude_returns_input_unchanged() {
    let mut rows = series(60);
    rows[10].insert("TOTAL_AMOUNT".into(), Value::from("unknown"));
    let out = DataOptimizer::default().optimize(rows.clone(), &ChartType::ExecutiveDashboard, &OptimizeOptions::default());
    assert_eq!(out, rows);
}

#[test]
fn zero_threshold_degrades_to_identity() {
    let mut settings = OptimizerSettings::default();
    settings.thresholds.insert("radar".into(), 0);
    let rows = series(5);
    let out = DataOptimizer::new(settings).optimize(rows.clone(), &ChartType::Radar, &OptimizeOptions::default());
    assert_eq!(out, rows);
}

#[test]
fn metrics_report_percentages_and_labels() {
    let optimizer = DataOptimizer::default();
    let m = optimizer.metrics(&ChartType::GradientArea, 1000, 200, 3);
    assert_eq!(m.reduction_ratio, 80.0);
    assert_eq!(m.compression_ratio, 20.0);
    assert_eq!(m.performance_gain, PerformanceGain::VeryGood);

    let json = serde_json::to_value(&m).unwrap();
    assert_eq!(json["performanceGain"], "Very Good");
    assert_eq!(json["originalDataPoints"], 1000);

    let empty = optimizer.metrics(&ChartType::Bar, 0, 0, 0);
    assert_eq!((empty.reduction_ratio, empty.compression_ratio), (0.0, 0.0));
    assert_eq!(empty.performance_gain, PerformanceGain::Minimal);
    assert_eq!(PerformanceGain::from_reduction(0.81), PerformanceGain::Excellent);
    assert_eq!(PerformanceGain::from_reduction(0.5), PerformanceGain::Good);
    assert_eq!(PerformanceGain::from_reduction(0.3), PerformanceGain::Moderate);
}

proptest! {
    #[test]
    fn optimize_is_identity_within_threshold(n in 0usize..=100, kind in 0usize..6) {
        let chart_type = [
            ChartType::Bar,
            ChartType::Heatmap,
            ChartType::GradientArea,
            ChartType::Candlestick,
            ChartType::ExecutiveDashboard,
            ChartType::Other("bubble".into()),
        ][kind].clone();
        let optimizer = DataOptimizer::default();
        let rows = series(n.min(optimizer.threshold(&chart_type)));
        let out = optimizer.optimize(rows.clone(), &chart_type, &OptimizeOptions::default());
        prop_assert_eq!(out, rows);
    }

    #[test]
    fn stride_sampling_keeps_first_and_last(n in 2usize..3000, threshold in 1usize..400) {
        let rows = series(n);
        let out = stride_sample(&rows, threshold);
        prop_assert_eq!(seq(&out[0]), 0);
        prop_assert_eq!(seq(out.last().unwrap()), n as i64 - 1);
        prop_assert!(out.windows(2).all(|w| seq(&w[0]) < seq(&w[1])));
    }

    #[test]
    fn reservoir_is_exact_and_ordered(n in 1usize..2000, k in 1usize..200, seed in any::<u64>()) {
        let out = reservoir_sample(&series(n), k, seed);
        prop_assert_eq!(out.len(), n.min(k));
        prop_assert!(out.windows(2).all(|w| seq(&w[0]) < seq(&w[1])));
    }
}
