// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    zero = { 0, "0s" },
    seconds = { 45, "45s" },
    one_minute = { 60, "1m" },
    minutes = { 125, "2m" },
    one_hour = { 3600, "1h" },
    hours = { 7200, "2h" },
    one_day = { 86_400, "1d" },
    days = { 172_800, "2d" },
)]
fn format_elapsed_buckets(secs: u64, expected: &str) {
    assert_eq!(format_elapsed(secs), expected);
}

#[test]
fn format_elapsed_ms_shows_sub_second_precision() {
    assert_eq!(format_elapsed_ms(250), "250ms");
    assert_eq!(format_elapsed_ms(999), "999ms");
}

#[test]
fn format_elapsed_ms_delegates_above_one_second() {
    assert_eq!(format_elapsed_ms(1500), "1s");
    assert_eq!(format_elapsed_ms(65_000), "1m");
}
