// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use check_plugins::check::State;
use check_plugins::levels::{check_levels, render_float, Levels};
use proptest::prelude::*;

fn upper_state(value: f64, warn: f64, crit: f64) -> State {
    let levels = Levels::upper(warn, crit).unwrap();
    check_levels(value, Some(&levels), None, &render_float(1), "").0
}

fn lower_state(value: f64, warn: f64, crit: f64) -> State {
    let levels = Levels::lower(warn, crit).unwrap();
    check_levels(value, None, Some(&levels), &render_float(1), "").0
}

proptest! {
    #[test]
    fn upper_levels_are_monotonic(
        a in -1000.0..1000.0f64,
        b in -1000.0..1000.0f64,
        warn in -500.0..500.0f64,
        delta in 0.0..100.0f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(upper_state(low, warn, warn + delta) <= upper_state(high, warn, warn + delta));
    }

    #[test]
    fn lower_levels_are_monotonic(
        a in -1000.0..1000.0f64,
        b in -1000.0..1000.0f64,
        warn in -500.0..500.0f64,
        delta in 0.0..100.0f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(lower_state(low, warn, warn - delta) >= lower_state(high, warn, warn - delta));
    }

    #[test]
    fn boundaries_are_inclusive(warn in -500.0..500.0f64, delta in 0.001..100.0f64) {
        prop_assert_eq!(upper_state(warn, warn, warn + delta), State::Warn);
        prop_assert_eq!(upper_state(warn + delta, warn, warn + delta), State::Crit);
        prop_assert_eq!(lower_state(warn, warn, warn - delta), State::Warn);
        prop_assert_eq!(lower_state(warn - delta, warn, warn - delta), State::Crit);
    }

    #[test]
    fn both_directions_take_the_worse(value in -1000.0..1000.0f64) {
        let upper = Levels::upper(10.0, 20.0).unwrap();
        let lower = Levels::lower(0.0, -10.0).unwrap();
        let (state, _) = check_levels(value, Some(&upper), Some(&lower), &render_float(1), "");
        prop_assert_eq!(
            state,
            State::worst(upper_state(value, 10.0, 20.0), lower_state(value, 0.0, -10.0))
        );
    }
}
