// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use super::temperature::{self, check_temperature, DeviceData};
use crate::check::CheckResult;
use crate::params::{ConfigurationError, Parameters};
use crate::plugin::{CheckContext, CheckError, CheckPlugin, Service};
use crate::table::{parse_rows, table_at, unique_items, FromRow, ParseError, RawTable, Row, SectionError};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// `[name, decidegrees]`
#[derive(Debug, Clone, PartialEq)]
struct DeciTempRow {
    name: String,
    celsius: f64,
}

impl FromRow for DeciTempRow {
    const COLUMNS: RangeInclusive<usize> = 2..=2;

    fn from_row(row: Row<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            name: row.str(0).trim().to_string(),
            celsius: row.float(1, "temperature")? / 10.0,
        })
    }
}

/// Temperatures in °C by sensor name.
pub type Section = BTreeMap<String, f64>;

pub struct DeciTemp;

impl CheckPlugin for DeciTemp {
    type Section = Section;
    const NAME: &'static str = "decitemp";
    const SERVICE_NAME: &'static str = "Temperature %s";

    fn parse(&self, tables: &[RawTable]) -> Result<Section, SectionError> {
        let rows = parse_rows::<DeciTempRow>(table_at(tables, 0)?)?;
        Ok(unique_items(
            rows.records.into_iter().map(|r| (r.name, r.celsius)),
        ))
    }

    fn discover<'a>(
        &'a self,
        section: &'a Section,
        _params: &'a Parameters,
    ) -> impl Iterator<Item = Service> + 'a {
        section.keys().map(Service::new)
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Section,
        ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let Some((name, celsius)) = item.and_then(|item| section.get_key_value(item)) else {
            return Ok(vec![]);
        };
        check_temperature(
            *celsius,
            params,
            &format!("decitemp_{name}"),
            ctx,
            &DeviceData::default(),
        )
    }

    fn validate_parameters(&self, params: &Parameters) -> Result<(), ConfigurationError> {
        temperature::validate_parameters(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::State;
    use crate::value_store::MemoryValueStore;

    fn check(raw: &str, params: &str) -> Vec<CheckResult> {
        let section = DeciTemp
            .parse(&[RawTable::from_iter([["SensorA", raw]])])
            .unwrap();
        let mut store = MemoryValueStore::new();
        let mut ctx = CheckContext::builder().value_store(&mut store).build();
        DeciTemp
            .check(Some("SensorA"), &params.parse().unwrap(), &section, &mut ctx)
            .unwrap()
    }

    #[test]
    fn test_parse() {
        let section = DeciTemp
            .parse(&[RawTable::from_iter([
                ["SensorA", "205"],
                ["SensorB", "x"],
                ["SensorA", "-15"],
            ])])
            .unwrap();
        assert_eq!(
            section.into_iter().collect::<Vec<_>>(),
            vec![("SensorA".to_string(), 20.5), ("SensorA 2".to_string(), -1.5)]
        );
    }

    #[test]
    fn test_levels_ok() {
        let results = check("205", "levels: [25.0, 30.0]");
        assert_eq!(results[0].state(), State::Ok);
        assert_eq!(results[0].summary(), Some("20.5 °C"));
    }

    #[test]
    fn test_levels_crit() {
        let results = check("320", "levels: [25.0, 30.0]");
        assert_eq!(results[0].state(), State::Crit);
        assert_eq!(
            results[0].summary(),
            Some("32.0 °C (warn/crit at 25.0/30.0 °C)")
        );
    }

    #[test]
    fn test_missing_item() {
        let section = DeciTemp.parse(&[RawTable::default()]).unwrap();
        let mut store = MemoryValueStore::new();
        let mut ctx = CheckContext::builder().value_store(&mut store).build();
        assert!(DeciTemp
            .check(Some("SensorA"), &Parameters::default(), &section, &mut ctx)
            .unwrap()
            .is_empty());
    }
}
