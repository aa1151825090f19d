// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! AKCP sensorProbe: temperature, humidity and dry contact sensors.
//!
//! All sensor tables share the status codes and the online flag.

use super::temperature::{self, check_temperature, DeviceData, TempUnit};
use crate::check::{Bounds, CheckResult, Metric, State};
use crate::config::yaml::Yaml;
use crate::levels::{check_levels, render_float};
use crate::params::{ConfigurationError, Parameters, LEVELS, LEVELS_LOWER};
use crate::plugin::{CheckContext, CheckError, CheckPlugin, Service};
use crate::table::{parse_rows, table_at, unique_items, FromRow, ParseError, RawTable, Row, SectionError};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

pub const ONLY_ONLINE: &str = "only_online";
pub const STATUS_MAP: &str = "map";

const OFFLINE: &str = "sensor is offline";

fn sensor_status(code: &str) -> Option<(State, &'static str)> {
    match code {
        "1" => Some((State::Unknown, "noStatus")),
        "2" => Some((State::Ok, "normal")),
        "3" => Some((State::Warn, "highWarning")),
        "4" => Some((State::Crit, "highCritical")),
        "5" => Some((State::Warn, "lowWarning")),
        "6" => Some((State::Crit, "lowCritical")),
        "7" => Some((State::Crit, "sensorError")),
        _ => None,
    }
}

fn device_status(code: &str) -> (State, String) {
    sensor_status(code).map_or_else(
        || (State::Unknown, format!("unknown status {code}")),
        |(state, name)| (state, name.to_string()),
    )
}

/// `"2"` is offline, everything else counts as online.
fn is_online(raw: &str) -> bool {
    raw.trim() != "2"
}

fn offline() -> Vec<CheckResult> {
    vec![CheckResult::crit(OFFLINE)]
}

fn discovery_parameters() -> Parameters {
    Parameters::new().with(ONLY_ONLINE, Yaml::Boolean(true))
}

fn discover_online<'a, R: 'a>(
    section: &'a BTreeMap<String, R>,
    params: &Parameters,
    online: impl Fn(&R) -> bool + 'a,
) -> impl Iterator<Item = Service> + 'a {
    let only_online = params.bool(ONLY_ONLINE, true);
    section
        .iter()
        .filter(move |(_, record)| !only_online || online(record))
        .map(|(item, _)| Service::new(item))
}

/// `[descr, degree, unit, status, online, high_warn, high_crit, low_warn, low_crit]`,
/// the device levels are optional.
#[derive(Debug, Clone, PartialEq)]
pub struct TempSensor {
    pub degree: f64,
    pub unit: TempUnit,
    pub status: String,
    pub online: bool,
    pub levels: Option<(f64, f64)>,
    pub levels_lower: Option<(f64, f64)>,
}

fn temp_unit(row: &Row<'_>, column: usize) -> Result<TempUnit, ParseError> {
    match row.str(column).trim() {
        "0" => Ok(TempUnit::Fahrenheit),
        "1" => Ok(TempUnit::Celsius),
        other => Err(ParseError::UnknownMarker {
            field: "unit",
            value: other.to_string(),
        }),
    }
}

fn level_pair(row: &Row<'_>, warn: usize, crit: usize) -> Result<Option<(f64, f64)>, ParseError> {
    Ok(row
        .opt_float(warn, "warn level")?
        .zip(row.opt_float(crit, "crit level")?))
}

struct TempRow(String, TempSensor);

impl FromRow for TempRow {
    const COLUMNS: RangeInclusive<usize> = 5..=9;

    fn from_row(row: Row<'_>) -> Result<Self, ParseError> {
        Ok(Self(
            row.str(0).trim().to_string(),
            TempSensor {
                degree: row.float(1, "degree")?,
                unit: temp_unit(&row, 2)?,
                status: row.str(3).trim().to_string(),
                online: is_online(row.str(4)),
                levels: level_pair(&row, 5, 6)?,
                levels_lower: level_pair(&row, 7, 8)?,
            },
        ))
    }
}

pub struct AkcpTemp;

impl CheckPlugin for AkcpTemp {
    type Section = BTreeMap<String, TempSensor>;
    const NAME: &'static str = "akcp_temp";
    const SERVICE_NAME: &'static str = "Temperature %s";

    fn parse(&self, tables: &[RawTable]) -> Result<Self::Section, SectionError> {
        let rows = parse_rows::<TempRow>(table_at(tables, 0)?)?;
        Ok(unique_items(rows.records.into_iter().map(|r| (r.0, r.1))))
    }

    fn discover<'a>(
        &'a self,
        section: &'a Self::Section,
        params: &'a Parameters,
    ) -> impl Iterator<Item = Service> + 'a {
        discover_online(section, params, |s: &TempSensor| s.online)
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Self::Section,
        ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let Some((name, sensor)) = item.and_then(|item| section.get_key_value(item)) else {
            return Ok(vec![]);
        };
        if !sensor.online {
            return Ok(offline());
        }
        let device = DeviceData::builder()
            .unit(sensor.unit)
            .levels(sensor.levels)
            .levels_lower(sensor.levels_lower)
            .status(Some(device_status(&sensor.status)))
            .build();
        check_temperature(
            sensor.degree,
            params,
            &format!("akcp_temp_{name}"),
            ctx,
            &device,
        )
    }

    fn discovery_parameters(&self) -> Parameters {
        discovery_parameters()
    }

    fn validate_parameters(&self, params: &Parameters) -> Result<(), ConfigurationError> {
        temperature::validate_parameters(params)
    }
}

/// `[descr, percent, status, online]`
#[derive(Debug, Clone, PartialEq)]
pub struct HumiditySensor {
    pub percent: f64,
    pub status: String,
    pub online: bool,
}

struct HumidityRow(String, HumiditySensor);

impl FromRow for HumidityRow {
    const COLUMNS: RangeInclusive<usize> = 4..=4;

    fn from_row(row: Row<'_>) -> Result<Self, ParseError> {
        Ok(Self(
            row.str(0).trim().to_string(),
            HumiditySensor {
                percent: row.float(1, "humidity")?,
                status: row.str(2).trim().to_string(),
                online: is_online(row.str(3)),
            },
        ))
    }
}

pub struct AkcpHumidity;

impl CheckPlugin for AkcpHumidity {
    type Section = BTreeMap<String, HumiditySensor>;
    const NAME: &'static str = "akcp_humidity";
    const SERVICE_NAME: &'static str = "Humidity %s";

    fn parse(&self, tables: &[RawTable]) -> Result<Self::Section, SectionError> {
        let rows = parse_rows::<HumidityRow>(table_at(tables, 0)?)?;
        Ok(unique_items(rows.records.into_iter().map(|r| (r.0, r.1))))
    }

    fn discover<'a>(
        &'a self,
        section: &'a Self::Section,
        params: &'a Parameters,
    ) -> impl Iterator<Item = Service> + 'a {
        discover_online(section, params, |s: &HumiditySensor| s.online)
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Self::Section,
        _ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let Some(sensor) = item.and_then(|item| section.get(item)) else {
            return Ok(vec![]);
        };
        if !sensor.online {
            return Ok(offline());
        }
        let upper = params.upper_levels()?;
        let (state, text) = check_levels(
            sensor.percent,
            upper.as_ref(),
            params.lower_levels()?.as_ref(),
            &render_float(1),
            "%",
        );
        let (device_state, device_name) = device_status(&sensor.status);
        Ok(vec![
            CheckResult::new(state, text).with_metric(
                Metric::builder()
                    .name("humidity")
                    .value(sensor.percent)
                    .uom("%".parse().unwrap_or_default())
                    .levels(upper)
                    .bounds(Some(Bounds::min_max(0.0, 100.0)))
                    .build(),
            ),
            CheckResult::notice(device_state, format!("State on device: {device_name}")),
        ])
    }

    fn default_parameters(&self) -> Parameters {
        Parameters::new()
            .with_pair(LEVELS, (60.0, 70.0))
            .with_pair(LEVELS_LOWER, (35.0, 25.0))
    }

    fn discovery_parameters(&self) -> Parameters {
        discovery_parameters()
    }
}

/// `[name, status, online]`
#[derive(Debug, Clone, PartialEq)]
pub struct DryContact {
    pub status: String,
    pub online: bool,
}

struct DryContactRow(String, DryContact);

impl FromRow for DryContactRow {
    const COLUMNS: RangeInclusive<usize> = 3..=3;

    fn from_row(row: Row<'_>) -> Result<Self, ParseError> {
        Ok(Self(
            row.str(0).trim().to_string(),
            DryContact {
                status: row.str(1).trim().to_string(),
                online: is_online(row.str(2)),
            },
        ))
    }
}

fn yaml_key(key: &Yaml) -> Option<String> {
    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn map_entry(value: &Yaml) -> Option<(State, String)> {
    match value.as_vec().map(Vec::as_slice) {
        Some([state, text]) => {
            let state = State::try_from(i32::try_from(state.as_i64()?).ok()?).ok()?;
            Some((state, text.as_str()?.to_string()))
        }
        _ => None,
    }
}

/// Status code to state and text, like `{"2": [0, "normal"]}`.
pub fn status_map(params: &Parameters) -> Result<BTreeMap<String, (State, String)>, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidType {
        key: STATUS_MAP.to_string(),
        expected: "a mapping of status to [state, text]",
    };
    let Some(map) = params.section(STATUS_MAP)? else {
        return Ok(default_status_map());
    };
    map.as_yaml()
        .as_hash()
        .into_iter()
        .flatten()
        .map(|(key, value)| yaml_key(key).zip(map_entry(value)).ok_or_else(invalid))
        .collect()
}

fn default_status_map() -> BTreeMap<String, (State, String)> {
    (1..=7)
        .map(|code: u8| code.to_string())
        .filter_map(|code| sensor_status(&code).map(|(s, n)| (code, (s, n.to_string()))))
        .collect()
}

pub struct AkcpDryContact;

impl CheckPlugin for AkcpDryContact {
    type Section = BTreeMap<String, DryContact>;
    const NAME: &'static str = "akcp_drycontact";
    const SERVICE_NAME: &'static str = "Dry Contact %s";

    fn parse(&self, tables: &[RawTable]) -> Result<Self::Section, SectionError> {
        let rows = parse_rows::<DryContactRow>(table_at(tables, 0)?)?;
        Ok(unique_items(rows.records.into_iter().map(|r| (r.0, r.1))))
    }

    fn discover<'a>(
        &'a self,
        section: &'a Self::Section,
        params: &'a Parameters,
    ) -> impl Iterator<Item = Service> + 'a {
        discover_online(section, params, |c: &DryContact| c.online)
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Self::Section,
        _ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let Some(contact) = item.and_then(|item| section.get(item)) else {
            return Ok(vec![]);
        };
        if !contact.online {
            return Ok(offline());
        }
        Ok(vec![match status_map(params)?.remove(&contact.status) {
            Some((state, text)) => CheckResult::new(state, format!("State: {text}")),
            None => CheckResult::unknown(format!("State: unknown status {}", contact.status)),
        }])
    }

    fn discovery_parameters(&self) -> Parameters {
        discovery_parameters()
    }

    fn validate_parameters(&self, params: &Parameters) -> Result<(), ConfigurationError> {
        status_map(params).map(|_| ())
    }
}



#[cfg(test)]
mod test_akcp_drycontact {
    use super::*;
    use crate::value_store::MemoryValueStore;

    fn check(row: [&str; 3], params: &str) -> Vec<CheckResult> {
        let section = AkcpDryContact.parse(&[RawTable::from_iter([row])]).unwrap();
        let mut store = MemoryValueStore::new();
        let mut ctx = CheckContext::builder().value_store(&mut store).build();
        AkcpDryContact
            .check(Some(row[0]), &params.parse().unwrap(), &section, &mut ctx)
            .unwrap()
    }

    #[test]
    fn test_mapped_status() {
        assert_eq!(
            check(["Drycontact1", "2", "1"], "map: {\"2\": [0, normal]}"),
            vec![CheckResult::ok("State: normal")]
        );
        assert_eq!(
            check(["Drycontact1", "3", "1"], "map: {3: [2, door open]}"),
            vec![CheckResult::crit("State: door open")]
        );
    }

    #[test]
    fn test_offline_overrides_status() {
        for status in ["2", "4", "99"] {
            assert_eq!(
                check(["Drycontact1", status, "2"], "map: {\"2\": [0, normal]}"),
                vec![CheckResult::crit("sensor is offline")]
            );
        }
    }

    #[test]
    fn test_default_map() {
        assert_eq!(
            check(["Drycontact1", "4", "1"], ""),
            vec![CheckResult::crit("State: highCritical")]
        );
        assert_eq!(
            check(["Drycontact1", "9", "1"], ""),
            vec![CheckResult::unknown("State: unknown status 9")]
        );
    }

    #[test]
    fn test_invalid_map() {
        let bad: Parameters = "map: {\"2\": [5, weird]}".parse().unwrap();
        assert!(AkcpDryContact.validate_parameters(&bad).is_err());
        let bad: Parameters = "map: [1, 2]".parse().unwrap();
        assert!(AkcpDryContact.validate_parameters(&bad).is_err());
        let good: Parameters = "map: {\"1\": [1, warn]}".parse().unwrap();
        assert!(AkcpDryContact.validate_parameters(&good).is_ok());
    }
}
