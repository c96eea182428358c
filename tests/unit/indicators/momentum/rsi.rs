//! Unit tests for the RSI engine

use rsiwatch::indicators::momentum::rsi::{
    calculate_rsi, latest_rsi, rsi_from_averages, RsiParams, Smoothing,
};
use rsiwatch::indicators::IndicatorError;

/// 14-day worked example from the StockCharts ChartSchool RSI table
/// (first RSI 70.46, published as 70.53 with rounded averages).
const CLASSIC: [f64; 20] = [
    44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03, 45.61,
    46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
];

fn params(smoothing: Smoothing) -> RsiParams {
    RsiParams::new(14, smoothing)
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {} +/- {}, got {}",
        expected,
        tolerance,
        actual
    );
}

#[test]
fn test_classic_series_first_value() {
    for smoothing in [Smoothing::Wilder, Smoothing::SimpleMean] {
        let series = calculate_rsi(&CLASSIC, params(smoothing)).unwrap();
        assert_eq!(series.len(), CLASSIC.len());
        assert!(series.values()[..14].iter().all(Option::is_none));

        let first = series.values()[14].unwrap();
        assert_close(first, 70.46, 0.01);
        assert_close(first, 70.5, 0.5);
    }
}

#[test]
fn test_classic_series_wilder_smoothing() {
    let series = calculate_rsi(&CLASSIC, params(Smoothing::Wilder)).unwrap();
    let expected = [70.4641, 66.2496, 66.4809, 69.3469, 66.2947, 57.9150];
    for (value, want) in series.values()[14..].iter().zip(expected) {
        assert_close(value.unwrap(), want, 0.001);
    }
    assert_close(series.latest().unwrap(), 57.915, 0.001);
}

#[test]
fn test_classic_series_simple_mean() {
    let series = calculate_rsi(&CLASSIC, params(Smoothing::SimpleMean)).unwrap();
    let expected = [70.4641, 70.0210, 69.8312, 80.5677, 73.3333, 59.8063];
    for (value, want) in series.values()[14..].iter().zip(expected) {
        assert_close(value.unwrap(), want, 0.001);
    }
}

#[test]
fn test_flat_prices_yield_fifty() {
    let closes = vec![100.0; 30];
    for smoothing in [Smoothing::Wilder, Smoothing::SimpleMean] {
        let series = calculate_rsi(&closes, params(smoothing)).unwrap();
        assert!(series.values()[..14].iter().all(Option::is_none));
        assert!(series.values()[14..].iter().all(|v| *v == Some(50.0)));
    }
}

#[test]
fn test_strictly_increasing_reaches_hundred() {
    let closes: Vec<f64> = (0..40).map(|i| 10.0 + i as f64 * 0.5).collect();
    for smoothing in [Smoothing::Wilder, Smoothing::SimpleMean] {
        let series = calculate_rsi(&closes, params(smoothing)).unwrap();
        assert!(series.defined().all(|v| (0.0..=100.0).contains(&v)));
        assert_eq!(series.latest(), Some(100.0));
    }
}

#[test]
fn test_strictly_decreasing_reaches_zero() {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
    for smoothing in [Smoothing::Wilder, Smoothing::SimpleMean] {
        let series = calculate_rsi(&closes, params(smoothing)).unwrap();
        assert!(series.defined().all(|v| (0.0..=100.0).contains(&v)));
        assert_eq!(series.latest(), Some(0.0));
    }
}

#[test]
fn test_uptrend_after_dip_converges_to_hundred() {
    // One early loss keeps Wilder's average loss positive but decaying.
    let mut closes = vec![50.0, 49.0];
    closes.extend((0..200).map(|i| 50.0 + i as f64));
    let series = calculate_rsi(&closes, params(Smoothing::Wilder)).unwrap();

    let defined: Vec<f64> = series.defined().collect();
    assert!(defined.iter().all(|v| *v <= 100.0));
    assert!(defined.windows(2).skip(1).all(|w| w[1] >= w[0]));
    assert!(*defined.last().unwrap() > 99.9);
}

#[test]
fn test_calculation_is_deterministic() {
    let closes: Vec<f64> = (0..60).map(|i| 100.0 + ((i * 7) % 11) as f64 - 5.0).collect();
    let p = params(Smoothing::Wilder);
    let first = calculate_rsi(&closes, p).unwrap();
    let second = calculate_rsi(&closes, p).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_insufficient_data() {
    let err = calculate_rsi(&CLASSIC[..14], params(Smoothing::Wilder)).unwrap_err();
    assert_eq!(
        err,
        IndicatorError::InsufficientData {
            required: 15,
            available: 14
        }
    );
    assert!(latest_rsi(&[], params(Smoothing::SimpleMean)).is_err());
}

#[test]
fn test_exactly_period_plus_one_closes() {
    let series = calculate_rsi(&CLASSIC[..15], params(Smoothing::Wilder)).unwrap();
    assert_eq!(series.defined().count(), 1);
}

#[test]
fn test_zero_period_rejected() {
    let err = calculate_rsi(&CLASSIC, RsiParams::new(0, Smoothing::Wilder)).unwrap_err();
    assert_eq!(err, IndicatorError::InvalidPeriod { period: 0 });
}

#[test]
fn test_oversized_period_rejected_without_overflow() {
    let closes = [1.0; 30];
    let err = calculate_rsi(&closes, RsiParams::new(usize::MAX, Smoothing::Wilder)).unwrap_err();
    assert_eq!(err, IndicatorError::InvalidPeriod { period: usize::MAX });
    assert!(latest_rsi(&closes, RsiParams::new(usize::MAX, Smoothing::SimpleMean)).is_err());

    let err = calculate_rsi(&closes, RsiParams::new(usize::MAX - 1, Smoothing::Wilder)).unwrap_err();
    assert_eq!(
        err,
        IndicatorError::InsufficientData {
            required: usize::MAX,
            available: 30
        }
    );
}

#[test]
fn test_missing_closes_are_skipped_and_aligned() {
    let mut with_gap = CLASSIC.to_vec();
    with_gap.insert(5, f64::NAN);

    let gapped = calculate_rsi(&with_gap, params(Smoothing::Wilder)).unwrap();
    let clean = calculate_rsi(&CLASSIC, params(Smoothing::Wilder)).unwrap();

    assert_eq!(gapped.len(), with_gap.len());
    assert_eq!(gapped.values()[5], None);
    assert_eq!(gapped.values()[15], clean.values()[14]);
    assert_eq!(gapped.latest(), clean.latest());
}

#[test]
fn test_missing_closes_count_towards_insufficient_data() {
    let mut closes = CLASSIC[..15].to_vec();
    closes[3] = f64::NAN;
    let err = calculate_rsi(&closes, params(Smoothing::Wilder)).unwrap_err();
    assert_eq!(
        err,
        IndicatorError::InsufficientData {
            required: 15,
            available: 14
        }
    );
}

#[test]
fn test_latest_rsi_reports_params() {
    let rsi = latest_rsi(&CLASSIC, params(Smoothing::SimpleMean)).unwrap();
    assert_eq!(rsi.period, 14);
    assert_eq!(rsi.smoothing, Smoothing::SimpleMean);
    assert_close(rsi.value, 59.8063, 0.001);
}

#[test]
fn test_rsi_from_averages_edges() {
    assert_eq!(rsi_from_averages(0.0, 0.0), 50.0);
    assert_eq!(rsi_from_averages(1.0, 0.0), 100.0);
    assert_eq!(rsi_from_averages(0.0, 1.0), 0.0);
    assert_eq!(rsi_from_averages(1.0, 1.0), 50.0);
}

#[test]
fn test_smoothing_parse() {
    assert_eq!("wilder".parse::<Smoothing>().unwrap(), Smoothing::Wilder);
    assert_eq!("EMA".parse::<Smoothing>().unwrap(), Smoothing::Wilder);
    assert_eq!("simple".parse::<Smoothing>().unwrap(), Smoothing::SimpleMean);
    assert_eq!("sma".parse::<Smoothing>().unwrap(), Smoothing::SimpleMean);
    assert!("median".parse::<Smoothing>().is_err());
    assert_eq!(Smoothing::SimpleMean.to_string(), "simple");
}

/// Opening closes of Wilder's classic 14-day example.
const WILDER_PREFIX: [f64; 10] = [
    44.0, 44.25, 44.5, 43.75, 44.5, 44.5, 45.0, 47.25, 47.92, 46.5,
];

#[test]
fn test_wilder_book_prefix_needs_a_full_window() {
    let err = calculate_rsi(&WILDER_PREFIX, params(Smoothing::Wilder)).unwrap_err();
    assert_eq!(
        err,
        IndicatorError::InsufficientData {
            required: 15,
            available: 10
        }
    );
}

#[test]
fn test_wilder_book_prefix_with_short_period() {
    // Period 4 over the book's opening closes, checked by hand:
    // changes +.25 +.25 -.75 +.75 0 +.5 +2.25 +.67 -1.42
    let series = calculate_rsi(&WILDER_PREFIX, RsiParams::new(4, Smoothing::SimpleMean)).unwrap();
    assert_eq!(series.defined().count(), 6);
    // First window +.25 +.25 -.75 +.75: gains 1.25, losses .75 -> RSI 62.5
    assert_close(series.values()[4].unwrap(), 62.5, 1e-9);
    // Window +.75 0 +.5 +2.25 has no loss
    assert_close(series.values()[8].unwrap(), 100.0, 1e-9);
}
