// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Eltek rectifier fans, two per rectifier, speed in percent of nominal.

use crate::check::{Bounds, CheckResult, Metric};
use crate::levels::{check_levels, render_float};
use crate::params::Parameters;
use crate::plugin::{CheckContext, CheckError, CheckPlugin, Service};
use crate::table::{
    parse_rows, table_at, unique_items, FromRow, ParseError, RawTable, Row, SectionError,
};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// `[index, speed_1, speed_2]`
struct FanRow {
    index: String,
    speeds: [f64; 2],
}

impl FromRow for FanRow {
    const COLUMNS: RangeInclusive<usize> = 3..=3;
    // Devices without a second fan report an empty speed, this has always
    // been an error and stays one.
    const STRICT: bool = true;

    fn from_row(row: Row<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            index: row.str(0).trim().to_string(),
            speeds: [row.float(1, "speed 1")?, row.float(2, "speed 2")?],
        })
    }
}

/// Speed in percent by item `<index>-<fan>`.
pub type Section = BTreeMap<String, f64>;

pub struct EltekFans;

impl CheckPlugin for EltekFans {
    type Section = Section;
    const NAME: &'static str = "eltek_fans";
    const SERVICE_NAME: &'static str = "Fan %s";

    fn parse(&self, tables: &[RawTable]) -> Result<Section, SectionError> {
        let rows = parse_rows::<FanRow>(table_at(tables, 0)?)?;
        Ok(unique_items(rows.records.into_iter().flat_map(|row| {
            row.speeds
                .into_iter()
                .enumerate()
                .map(move |(n, speed)| (format!("{}-{}", row.index, n + 1), speed))
        })))
    }

    /// Fans standing still are not installed.
    fn discover<'a>(
        &'a self,
        section: &'a Section,
        _params: &'a Parameters,
    ) -> impl Iterator<Item = Service> + 'a {
        section
            .iter()
            .filter(|(_, speed)| **speed > 0.0)
            .map(|(item, _)| Service::new(item))
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Section,
        _ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let Some(speed) = item.and_then(|item| section.get(item)) else {
            return Ok(vec![]);
        };
        let upper = params.upper_levels()?;
        let (state, text) = check_levels(
            *speed,
            upper.as_ref(),
            params.lower_levels()?.as_ref(),
            &render_float(1),
            "%",
        );
        Ok(vec![CheckResult::new(state, format!("Speed: {text}")).with_metric(
            Metric::builder()
                .name("fan_perc")
                .value(*speed)
                .levels(upper)
                .bounds(Some(Bounds::min(0.0)))
                .build(),
        )])
    }
}
