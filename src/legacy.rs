// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Shim for checks written in the old registration style: plain functions
//! over the raw table returning `(state, text, perfdata)` tuples.

use crate::check::{Bounds, CheckResult, Metric, State, Thresholds};
use crate::params::{ConfigurationError, Parameters};
use crate::plugin::{
    dedup_services, service_description, CheckContext, CheckDefinition, CheckError, Section,
    Service,
};
use crate::table::{RawTable, SectionError};

/// `(name, value, warn, crit, min, max)`
pub type LegacyPerfdata = (
    String,
    f64,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
);

/// `(state, text, perfdata)`, the text may span several lines.
pub type LegacyResult = (i32, String, Vec<LegacyPerfdata>);

pub type LegacyParseFunction = fn(&[RawTable]) -> Result<RawTable, SectionError>;
pub type LegacyDiscoveryFunction = fn(&RawTable) -> Vec<(Option<String>, Parameters)>;
/// `None` means the item is gone.
pub type LegacyCheckFunction = fn(Option<&str>, &Parameters, &RawTable) -> Option<LegacyResult>;

pub struct LegacyCheckInfo {
    pub name: &'static str,
    pub service_name: &'static str,
    pub parse_function: Option<LegacyParseFunction>,
    pub discovery_function: LegacyDiscoveryFunction,
    pub check_function: LegacyCheckFunction,
    pub default_parameters: fn() -> Parameters,
}

pub struct LegacyCheck {
    info: LegacyCheckInfo,
}

impl LegacyCheck {
    pub fn new(info: LegacyCheckInfo) -> Self {
        Self { info }
    }

    fn section<'a>(&self, section: &'a Section) -> Result<&'a RawTable, CheckError> {
        (**section)
            .downcast_ref::<RawTable>()
            .ok_or(CheckError::SectionType(self.info.name))
    }
}

fn concatenated(tables: &[RawTable]) -> Result<RawTable, SectionError> {
    Ok(tables.iter().fold(RawTable::default(), |mut out, table| {
        out.extend(table.clone());
        out
    }))
}

fn to_state(code: i32) -> (State, Option<String>) {
    match State::try_from(code) {
        Ok(state) => (state, None),
        Err(invalid) => (State::Unknown, Some(format!("invalid state {invalid}"))),
    }
}

fn to_metric((name, value, warn, crit, min, max): LegacyPerfdata) -> Metric {
    let levels = Thresholds { warn, crit };
    let bounds = (min.is_some() || max.is_some()).then_some(Bounds { min, max });
    Metric::builder()
        .name(name)
        .value(value)
        .levels(levels)
        .bounds(bounds)
        .build()
}

/// First line is the summary, further lines are details.
pub fn translate((code, text, perfdata): LegacyResult) -> CheckResult {
    let (state, complaint) = to_state(code);
    let (summary, details) = match text.split_once('\n') {
        Some((summary, details)) => (summary.to_string(), Some(details.to_string())),
        None => (text, None),
    };
    let summary = match complaint {
        Some(complaint) if summary.is_empty() => complaint,
        Some(complaint) => format!("{summary} ({complaint})"),
        None => summary,
    };
    let result = CheckResult::new(state, summary).with_metrics(perfdata.into_iter().map(to_metric));
    match details {
        Some(details) => result.with_details(details),
        None => result,
    }
}

impl CheckDefinition for LegacyCheck {
    fn name(&self) -> &str {
        self.info.name
    }

    fn sections(&self) -> Vec<&str> {
        vec![self.info.name]
    }

    fn service_description(&self, item: Option<&str>) -> String {
        service_description(self.info.service_name, item)
    }

    fn default_parameters(&self) -> Parameters {
        (self.info.default_parameters)()
    }

    fn discovery_parameters(&self) -> Parameters {
        Parameters::default()
    }

    fn validate_parameters(&self, params: &Parameters) -> Result<(), ConfigurationError> {
        params.upper_levels()?;
        params.lower_levels()?;
        Ok(())
    }

    fn parse(&self, tables: &[RawTable]) -> Result<Section, SectionError> {
        let parse = self.info.parse_function.unwrap_or(concatenated);
        Ok(Box::new(parse(tables)?))
    }

    fn discover(&self, section: &Section, _params: &Parameters) -> Result<Vec<Service>, CheckError> {
        let table = self.section(section)?;
        Ok(dedup_services(
            (self.info.discovery_function)(table)
                .into_iter()
                .map(|(item, parameters)| Service { item, parameters }),
        ))
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Section,
        _ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let table = self.section(section)?;
        Ok((self.info.check_function)(item, params, table)
            .map(translate)
            .into_iter()
            .collect())
    }
}
