// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances_both_instant_and_epoch() {
    let clock = FakeClock::new();
    let before = clock.now();
    let before_epoch = clock.epoch_ms();

    clock.advance(Duration::from_secs(5));

    assert_eq!(clock.now(), before + Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), before_epoch + 5000);
}

#[test]
fn system_clock_epoch_ms_is_plausible() {
    let clock = SystemClock;
    // Any time after 2020-01-01 in epoch millis.
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}
