// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Temperature evaluation shared by all temperature checks.
//!
//! Readings and levels are compared in °C. User levels are always given in °C,
//! device levels in the unit of the device. Only the rendering uses the
//! configured output unit, the `temp` metric stays in °C.

use crate::check::{CheckResult, Metric, State};
use crate::levels::{check_levels, check_levels_rendered, render_float, Levels, LevelsStrategy};
use crate::params::{ConfigurationError, Parameters};
use crate::plugin::{CheckContext, CheckError};
use crate::value_store::{get_average, get_rate, ValueStore};
use std::str::FromStr;
use typed_builder::TypedBuilder;

pub const INPUT_UNIT: &str = "input_unit";
pub const OUTPUT_UNIT: &str = "output_unit";
pub const DEVICE_LEVELS_HANDLING: &str = "device_levels_handling";
pub const TREND_COMPUTE: &str = "trend_compute";

const UNITS: [&str; 3] = ["c", "f", "k"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl FromStr for TempUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(Self::Celsius),
            "f" => Ok(Self::Fahrenheit),
            "k" => Ok(Self::Kelvin),
            other => Err(other.to_string()),
        }
    }
}

impl TempUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
            Self::Kelvin => "K",
        }
    }

    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            Self::Celsius => value,
            Self::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            Self::Kelvin => value - 273.15,
        }
    }

    pub fn from_celsius(&self, value: f64) -> f64 {
        match self {
            Self::Celsius => value,
            Self::Fahrenheit => value * 9.0 / 5.0 + 32.0,
            Self::Kelvin => value + 273.15,
        }
    }

    /// Converts a temperature difference, offsets do not apply.
    pub fn delta_from_celsius(&self, delta: f64) -> f64 {
        match self {
            Self::Fahrenheit => delta * 9.0 / 5.0,
            Self::Celsius | Self::Kelvin => delta,
        }
    }

    fn from_params(params: &Parameters, key: &str) -> Result<Option<Self>, ConfigurationError> {
        Ok(params
            .choice(key, &UNITS)?
            .and_then(|unit| unit.parse().ok()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLevelsHandling {
    Usr,
    Dev,
    #[default]
    UsrDefault,
    DevDefault,
    Worst,
    Best,
}

impl DeviceLevelsHandling {
    const CHOICES: [&'static str; 6] = ["usr", "dev", "usrdefault", "devdefault", "worst", "best"];

    fn from_params(params: &Parameters) -> Result<Self, ConfigurationError> {
        Ok(
            match params.choice(DEVICE_LEVELS_HANDLING, &Self::CHOICES)?.as_deref() {
                Some("usr") => Self::Usr,
                Some("dev") => Self::Dev,
                Some("devdefault") => Self::DevDefault,
                Some("worst") => Self::Worst,
                Some("best") => Self::Best,
                _ => Self::UsrDefault,
            },
        )
    }
}

/// What the device itself reports beside the reading.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder)]
pub struct DeviceData {
    #[builder(default)]
    pub unit: TempUnit,
    #[builder(default)]
    pub levels: Option<(f64, f64)>,
    #[builder(default)]
    pub levels_lower: Option<(f64, f64)>,
    /// State and name of the state as reported by the device.
    #[builder(default)]
    pub status: Option<(State, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct LevelsPair {
    upper: Option<Levels<f64>>,
    lower: Option<Levels<f64>>,
}

impl LevelsPair {
    fn is_empty(&self) -> bool {
        self.upper.is_none() && self.lower.is_none()
    }

    fn evaluate(&self, temp: f64, output: TempUnit) -> (State, String) {
        check_levels(
            temp,
            self.upper.as_ref(),
            self.lower.as_ref(),
            &render_temp(output),
            output.symbol(),
        )
    }
}

fn device_levels(
    levels: Option<(f64, f64)>,
    strategy: LevelsStrategy,
    unit: TempUnit,
) -> Option<Levels<f64>> {
    let (warn, crit) = levels?;
    Levels::try_new(strategy, unit.to_celsius(warn), unit.to_celsius(crit))
        .map_err(|e| log::debug!("ignoring device levels: {e}"))
        .ok()
}

fn preferring(
    first: LevelsPair,
    second: LevelsPair,
    label: &str,
    first_used: &str,
    second_used: &str,
) -> (LevelsPair, String) {
    let (used, used_text) = if !first.is_empty() {
        (first, first_used)
    } else if !second.is_empty() {
        (second, second_used)
    } else {
        (first, "no levels found")
    };
    (used, format!("Configuration: {label} ({used_text})"))
}

/// Full evaluation of one temperature reading.
///
/// Yields the temperature line with the `temp` metric, the device status if
/// any, the trend if configured and a notice naming the levels used.
pub fn check_temperature(
    reading: f64,
    params: &Parameters,
    unique_name: &str,
    ctx: &mut CheckContext,
    device: &DeviceData,
) -> Result<Vec<CheckResult>, CheckError> {
    let input = TempUnit::from_params(params, INPUT_UNIT)?.unwrap_or(device.unit);
    let output = TempUnit::from_params(params, OUTPUT_UNIT)?.unwrap_or_default();
    let temp = input.to_celsius(reading);

    let usr = LevelsPair {
        upper: params.upper_levels()?,
        lower: params.lower_levels()?,
    };
    let dev = LevelsPair {
        upper: device_levels(device.levels, LevelsStrategy::Upper, device.unit),
        lower: device_levels(device.levels_lower, LevelsStrategy::Lower, device.unit),
    };

    let handling = DeviceLevelsHandling::from_params(params)?;
    let (used, configuration) = match handling {
        DeviceLevelsHandling::Usr => (usr, "Configuration: only use user levels".to_string()),
        DeviceLevelsHandling::Dev => (dev, "Configuration: only use device levels".to_string()),
        DeviceLevelsHandling::UsrDefault => preferring(
            usr,
            dev,
            "prefer user levels over device levels",
            "used user levels",
            "used device levels",
        ),
        DeviceLevelsHandling::DevDefault => preferring(
            dev,
            usr,
            "prefer device levels over user levels",
            "used device levels",
            "used user levels",
        ),
        DeviceLevelsHandling::Worst | DeviceLevelsHandling::Best => {
            let usr_state = usr.evaluate(temp, output).0;
            let dev_state = dev.evaluate(temp, output).0;
            let (take_dev, text) = if handling == DeviceLevelsHandling::Worst {
                (dev_state > usr_state, "show most critical state")
            } else {
                (dev_state < usr_state, "show least critical state")
            };
            (
                if take_dev { dev } else { usr },
                format!("Configuration: {text}"),
            )
        }
    };

    let (state, text) = used.evaluate(temp, output);
    let mut results = vec![CheckResult::new(state, text).with_metric(
        Metric::builder()
            .name("temp")
            .value(temp)
            .levels(used.upper.clone())
            .build(),
    )];

    if let Some((status, name)) = &device.status {
        results.push(CheckResult::notice(
            *status,
            format!("State on device: {name}"),
        ));
    }

    if let Some(trend) = params.section(TREND_COMPUTE)? {
        let now = ctx.now();
        results.extend(check_trend(
            ctx.value_store(),
            now,
            temp,
            &trend,
            output,
            Limits {
                upper: used.upper.as_ref().map(|l| l.crit),
                lower: used.lower.as_ref().map(|l| l.crit),
            },
            unique_name,
        )?);
    }

    results.push(CheckResult::notice(State::Ok, configuration));
    Ok(results)
}

/// Critical temperatures in °C, targets of the time left computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

pub fn check_trend(
    store: &mut dyn ValueStore,
    now: f64,
    temp: f64,
    trend_params: &Parameters,
    output: TempUnit,
    limits: Limits,
    unique_name: &str,
) -> Result<Vec<CheckResult>, CheckError> {
    let period = trend_params.float("period")?.unwrap_or(30.0);
    let rate = get_rate(store, &format!("temp.{unique_name}.delta"), now, temp, false)?;
    let rate_avg = get_average(store, &format!("temp.{unique_name}.trend"), now, rate, period);
    let trend = rate_avg * period * 60.0;

    let upper = trend_params.levels("trend_levels", LevelsStrategy::Upper)?;
    // A decrease may be given as a positive or a negative number.
    let lower = trend_params
        .pair("trend_levels_lower")?
        .map(|(warn, crit)| {
            Levels::lower(-warn.abs(), -crit.abs()).map_err(|source| ConfigurationError::Levels {
                key: "trend_levels_lower".to_string(),
                source,
            })
        })
        .transpose()?;
    let render = move |x: f64| {
        format!(
            "{:+.1} {} per {} min",
            output.delta_from_celsius(x),
            output.symbol(),
            period
        )
    };
    // Levels configured as integers are shown as given.
    let integer_levels = trend_params.is_integer_pair("trend_levels")
        && trend_params.is_integer_pair("trend_levels_lower");
    let render_levels = move |x: f64| {
        let delta = output.delta_from_celsius(x);
        if integer_levels && delta.fract() == 0.0 {
            format!("{:+} {} per {} min", delta as i64, output.symbol(), period)
        } else {
            render(x)
        }
    };
    let (state, text) = check_levels_rendered(
        trend,
        upper.as_ref(),
        lower.as_ref(),
        &render,
        &render_levels,
        "",
    );
    let mut results = vec![CheckResult::new(state, format!("Temperature trend: {text}"))];

    if let Some((warn, crit)) = trend_params.pair("trend_timeleft")? {
        let limit = if trend > 0.0 { limits.upper } else { limits.lower };
        if let Some(limit) = limit.filter(|_| rate_avg != 0.0) {
            let seconds_left = ((limit - temp) / rate_avg).max(0.0);
            let levels = Levels::lower(warn * 60.0, crit * 60.0).map_err(|source| {
                ConfigurationError::Levels {
                    key: "trend_timeleft".to_string(),
                    source,
                }
            })?;
            let (state, text) = check_levels(seconds_left, None, Some(&levels), &render_timespan, "");
            results.push(CheckResult::new(
                state,
                format!("Time until temperature limit reached: {text}"),
            ));
        }
    }
    Ok(results)
}

/// Renders the two most significant units, e.g. `6 minutes 0 seconds`.
pub fn render_timespan(seconds: f64) -> String {
    const SPANS: [(&str, u64); 4] = [("day", 86400), ("hour", 3600), ("minute", 60), ("second", 1)];
    fn chunk(count: u64, name: &str) -> String {
        format!("{} {}{}", count, name, if count == 1 { "" } else { "s" })
    }
    let total = seconds.max(0.0).round() as u64;
    let Some(first) = SPANS.iter().position(|(_, size)| total >= *size) else {
        return chunk(0, "second");
    };
    let (name, size) = SPANS[first];
    let mut out = chunk(total / size, name);
    if let Some((next_name, next_size)) = SPANS.get(first + 1) {
        out = format!("{} {}", out, chunk(total % size / next_size, next_name));
    }
    out
}

/// Checks the temperature parameters for use at configuration time.
pub fn validate_parameters(params: &Parameters) -> Result<(), ConfigurationError> {
    params.upper_levels()?;
    params.lower_levels()?;
    params.choice(INPUT_UNIT, &UNITS)?;
    params.choice(OUTPUT_UNIT, &UNITS)?;
    DeviceLevelsHandling::from_params(params)?;
    if let Some(trend) = params.section(TREND_COMPUTE)? {
        trend.require("period")?;
        trend.float("period")?;
        trend.levels("trend_levels", LevelsStrategy::Upper)?;
        trend.pair("trend_levels_lower")?;
        if let Some((warn, crit)) = trend.pair("trend_timeleft")? {
            Levels::lower(warn, crit).map_err(|source| ConfigurationError::Levels {
                key: "trend_timeleft".to_string(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Precision used for all temperatures.
pub fn render_temp(unit: TempUnit) -> impl Fn(f64) -> String {
    let render = render_float(1);
    move |c| render(unit.from_celsius(c))
}



#[cfg(test)]
mod test_trend {
    use super::*;
    use crate::value_store::{MemoryValueStore, StoredValue};

    fn store_with(value: f64) -> MemoryValueStore {
        let mut store = MemoryValueStore::new();
        store.store(
            "temp.my_test.delta",
            StoredValue::Counter {
                timestamp: 0.0,
                value,
            },
        );
        store
    }

    fn trend(
        stored: f64,
        temp: f64,
        trend_params: &str,
        limits: (f64, f64),
    ) -> Vec<(State, String)> {
        let mut store = store_with(stored);
        check_trend(
            &mut store,
            60.0,
            temp,
            &trend_params.parse().unwrap(),
            TempUnit::Celsius,
            Limits {
                upper: Some(limits.0),
                lower: Some(limits.1),
            },
            "my_test",
        )
        .unwrap()
        .iter()
        .map(|r| (r.state(), r.text().to_string()))
        .collect()
    }

    #[test]
    fn test_uninitialized() {
        let mut store = MemoryValueStore::new();
        assert!(matches!(
            check_trend(
                &mut store,
                0.0,
                23.0,
                &"period: 2".parse().unwrap(),
                TempUnit::Celsius,
                Limits::default(),
                "my_test"
            ),
            Err(CheckError::RateUnavailable(_))
        ));
    }

    #[test]
    fn test_simple() {
        assert_eq!(
            trend(17.0, 23.0, "period: 2", (0.0, 0.0)),
            vec![(State::Ok, "Temperature trend: +12.0 °C per 2 min".to_string())]
        );
    }

    #[test]
    fn test_levels() {
        assert_eq!(
            trend(
                17.0,
                23.0,
                "period: 2\ntrend_levels: [10.0, 15.0]\ntrend_levels_lower: [-10.0, -15.0]",
                (0.0, 0.0)
            ),
            vec![(
                State::Warn,
                "Temperature trend: +12.0 °C per 2 min (warn/crit at +10.0 °C per 2 min/+15.0 °C per 2 min)"
                    .to_string()
            )]
        );
        assert_eq!(
            trend(
                -17.0,
                -23.0,
                "period: 2\ntrend_levels: [50.0, 55.0]\ntrend_levels_lower: [5.0, 10.0]",
                (0.0, 0.0)
            ),
            vec![(
                State::Crit,
                "Temperature trend: -12.0 °C per 2 min (warn/crit below -5.0 °C per 2 min/-10.0 °C per 2 min)"
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_time_left() {
        let p = "period: 1\ntrend_timeleft: [7.0, 2.0]";
        assert_eq!(
            trend(5.0, 10.0, p, (40.0, 0.0)),
            vec![
                (State::Ok, "Temperature trend: +5.0 °C per 1 min".to_string()),
                (
                    State::Warn,
                    "Time until temperature limit reached: 6 minutes 0 seconds (warn/crit below 7 minutes 0 seconds/2 minutes 0 seconds)"
                        .to_string()
                )
            ]
        );
        // falling towards the lower limit
        assert_eq!(
            trend(10.0, 5.0, "period: 1\ntrend_timeleft: [8.0, 6.0]", (40.0, -10.0))[1],
            (
                State::Crit,
                "Time until temperature limit reached: 3 minutes 0 seconds (warn/crit below 8 minutes 0 seconds/6 minutes 0 seconds)"
                    .to_string()
            )
        );
        // already beyond the limit
        assert_eq!(
            trend(10.0, 67.0, "period: 1\ntrend_timeleft: [120, 60]", (60.0, 0.0))[1],
            (
                State::Crit,
                "Time until temperature limit reached: 0 seconds (warn/crit below 2 hours 0 minutes/1 hour 0 minutes)"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_integer_trend_levels() {
        assert_eq!(
            trend(
                10.0,
                67.0,
                "period: 1\ntrend_levels: [3, 5]\ntrend_levels_lower: [10, 15]",
                (60.0, 0.0)
            ),
            vec![(
                State::Crit,
                "Temperature trend: +57.0 °C per 1 min (warn/crit at +3 °C per 1 min/+5 °C per 1 min)"
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_temperature_with_trend() {
        let p: Parameters = "trend_compute:\n  period: 30".parse().unwrap();
        let dev = DeviceData::default();
        let mut store = MemoryValueStore::new();
        for (now, reading) in [(0.0, 0.0), (900.0, 10.0)] {
            let mut ctx = CheckContext::builder()
                .value_store(&mut store)
                .now(now)
                .build();
            let _ = check_temperature(reading, &p, "u", &mut ctx, &dev);
        }
        let mut ctx = CheckContext::builder()
            .value_store(&mut store)
            .now(1800.0)
            .build();
        let results = check_temperature(20.0, &p, "u", &mut ctx, &dev).unwrap();
        assert_eq!(
            results.iter().map(CheckResult::text).collect::<Vec<_>>(),
            vec![
                "20.0 °C",
                "Temperature trend: +20.0 °C per 30 min",
                "Configuration: prefer user levels over device levels (no levels found)"
            ]
        );
    }
}
