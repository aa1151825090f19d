// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::check::State;
use std::fmt::{Debug, Display, Formatter, Result as FormatResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelsStrategy {
    Upper,
    Lower,
}

impl LevelsStrategy {
    /// Boundaries are inclusive: a value equal to a level reaches it.
    pub fn cmp<T: PartialOrd>(&self, x: &T, y: &T) -> bool {
        match self {
            Self::Upper => PartialOrd::ge(x, y),
            Self::Lower => PartialOrd::le(x, y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LevelsError {
    #[error("WARN must be smaller than or equal to CRIT but got {warn} {crit}")]
    Upper { warn: String, crit: String },
    #[error("WARN must be larger than or equal to CRIT but got {warn} {crit}")]
    Lower { warn: String, crit: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Levels<T> {
    pub strategy: LevelsStrategy,
    pub warn: T,
    pub crit: T,
}

impl<T> Display for Levels<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        match self.strategy {
            LevelsStrategy::Upper => write!(f, "warn/crit at {}/{}", self.warn, self.crit),
            LevelsStrategy::Lower => write!(f, "warn/crit below {}/{}", self.warn, self.crit),
        }
    }
}

impl<T> Levels<T>
where
    T: Clone + PartialOrd + Debug,
{
    pub fn try_new(strategy: LevelsStrategy, warn: T, crit: T) -> Result<Self, LevelsError> {
        if strategy.cmp(&crit, &warn) {
            return Ok(Self {
                strategy,
                warn,
                crit,
            });
        }
        let (warn, crit) = (format!("{:?}", warn), format!("{:?}", crit));
        Err(match strategy {
            LevelsStrategy::Upper => LevelsError::Upper { warn, crit },
            LevelsStrategy::Lower => LevelsError::Lower { warn, crit },
        })
    }

    pub fn evaluate(&self, value: &T) -> State {
        if self.strategy.cmp(value, &self.crit) {
            State::Crit
        } else if self.strategy.cmp(value, &self.warn) {
            State::Warn
        } else {
            State::Ok
        }
    }

    pub fn map<F, U>(self, mut f: F) -> Levels<U>
    where
        F: FnMut(T) -> U,
    {
        Levels {
            strategy: self.strategy,
            warn: f(self.warn),
            crit: f(self.crit),
        }
    }
}

impl Levels<f64> {
    pub fn upper(warn: f64, crit: f64) -> Result<Self, LevelsError> {
        Self::try_new(LevelsStrategy::Upper, warn, crit)
    }

    pub fn lower(warn: f64, crit: f64) -> Result<Self, LevelsError> {
        Self::try_new(LevelsStrategy::Lower, warn, crit)
    }

    /// Renders like `warn/crit at 25.0/30.0 °C`.
    pub fn describe(&self, render: &dyn Fn(f64) -> String, unit: &str) -> String {
        let levels = Levels {
            strategy: self.strategy,
            warn: render(self.warn),
            crit: render(self.crit),
        };
        with_unit(levels.to_string(), unit)
    }
}

/// Appends a unit to a rendered number, percent signs stick to the number.
pub fn with_unit(number: String, unit: &str) -> String {
    if unit.is_empty() || unit.starts_with('%') {
        number + unit
    } else {
        format!("{} {}", number, unit)
    }
}

pub fn render_float(precision: usize) -> impl Fn(f64) -> String {
    move |x| format!("{:.*}", precision, x)
}

/// Evaluates `value` against optional upper and lower levels.
///
/// Both directions are evaluated independently and the worse state wins;
/// the text names the crossed levels, e.g. `32.0 °C (warn/crit at 25.0/30.0 °C)`.
pub fn check_levels(
    value: f64,
    upper: Option<&Levels<f64>>,
    lower: Option<&Levels<f64>>,
    render: &dyn Fn(f64) -> String,
    unit: &str,
) -> (State, String) {
    check_levels_rendered(value, upper, lower, render, render, unit)
}

/// Like [`check_levels`], with the levels rendered apart from the value.
pub fn check_levels_rendered(
    value: f64,
    upper: Option<&Levels<f64>>,
    lower: Option<&Levels<f64>>,
    render: &dyn Fn(f64) -> String,
    render_levels: &dyn Fn(f64) -> String,
    unit: &str,
) -> (State, String) {
    let text = with_unit(render(value), unit);
    let evaluated = [upper, lower]
        .into_iter()
        .flatten()
        .map(|levels| (levels.evaluate(&value), levels))
        .filter(|(state, _)| *state != State::Ok)
        .fold(None::<(State, &Levels<f64>)>, |worst, (state, levels)| match worst {
            Some((w, _)) if w >= state => worst,
            _ => Some((state, levels)),
        });
    match evaluated {
        None => (State::Ok, text),
        Some((state, levels)) => (
            state,
            format!("{} ({})", text, levels.describe(render_levels, unit)),
        ),
    }
}
