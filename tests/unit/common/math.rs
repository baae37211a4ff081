//! Unit tests for moving-average helpers

use trendgate::common::math::{ema, sma};

#[test]
fn test_sma_uses_last_window() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(sma(&values, 2), Some(4.5));
    assert_eq!(sma(&values, 5), Some(3.0));
}

#[test]
fn test_sma_insufficient_data() {
    assert!(sma(&[1.0, 2.0], 3).is_none());
    assert!(sma(&[1.0, 2.0], 0).is_none());
}

#[test]
fn test_ema_seeded_by_first_value() {
    // alpha = 2 / (3 + 1) = 0.5
    // 10 -> 0.5*20 + 0.5*10 = 15 -> 0.5*30 + 0.5*15 = 22.5
    let value = ema(&[10.0, 20.0, 30.0], 3).unwrap();
    assert!((value - 22.5).abs() < 1e-9);
}

#[test]
fn test_ema_constant_series() {
    let values = vec![42.0; 30];
    let value = ema(&values, 20).unwrap();
    assert!((value - 42.0).abs() < 1e-9);
}

#[test]
fn test_ema_insufficient_data() {
    assert!(ema(&[1.0; 5], 20).is_none());
    assert!(ema(&[], 1).is_none());
}
