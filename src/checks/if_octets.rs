// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::check::{Bounds, CheckResult, Metric};
use crate::levels::check_levels;
use crate::params::Parameters;
use crate::plugin::{CheckContext, CheckError, CheckPlugin, Service};
use crate::table::{parse_rows, table_at, unique_items, FromRow, ParseError, RawTable, Row, SectionError};
use crate::value_store::get_rate;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Octets {
    pub in_octets: u64,
    pub out_octets: u64,
}

/// `[ifname, in_octets, out_octets]`
struct OctetsRow(String, Octets);

impl FromRow for OctetsRow {
    const COLUMNS: RangeInclusive<usize> = 3..=3;

    fn from_row(row: Row<'_>) -> Result<Self, ParseError> {
        Ok(Self(
            row.str(0).trim().to_string(),
            Octets {
                in_octets: row.counter(1, "in octets")?,
                out_octets: row.counter(2, "out octets")?,
            },
        ))
    }
}

/// Decimal prefixes, as interfaces are sold.
pub fn render_bandwidth(bytes_per_second: f64) -> String {
    const PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];
    let mut value = bytes_per_second;
    let mut prefix = 0;
    while value.abs() >= 1000.0 && prefix < PREFIXES.len() - 1 {
        value /= 1000.0;
        prefix += 1;
    }
    format!("{:.2} {}B/s", value, PREFIXES[prefix])
}

pub struct IfOctets;

impl CheckPlugin for IfOctets {
    type Section = BTreeMap<String, Octets>;
    const NAME: &'static str = "if_octets";
    const SERVICE_NAME: &'static str = "Interface %s";

    fn parse(&self, tables: &[RawTable]) -> Result<Self::Section, SectionError> {
        let rows = parse_rows::<OctetsRow>(table_at(tables, 0)?)?;
        Ok(unique_items(rows.records.into_iter().map(|r| (r.0, r.1))))
    }

    fn discover<'a>(
        &'a self,
        section: &'a Self::Section,
        _params: &'a Parameters,
    ) -> impl Iterator<Item = Service> + 'a {
        section.keys().map(Service::new)
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Self::Section,
        ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let Some((name, octets)) = item.and_then(|item| section.get_key_value(item)) else {
            return Ok(vec![]);
        };
        let now = ctx.now();
        let store = ctx.value_store();
        // Both counters are stored before any of them may fail.
        let in_rate = get_rate(store, &format!("in.{name}"), now, octets.in_octets as f64, true);
        let out_rate = get_rate(store, &format!("out.{name}"), now, octets.out_octets as f64, true);
        let (in_rate, out_rate) = (in_rate?, out_rate?);

        let upper = params.upper_levels()?;
        Ok([("In", "if_in_octets", in_rate), ("Out", "if_out_octets", out_rate)]
            .into_iter()
            .map(|(label, metric, rate)| {
                let (state, text) = check_levels(rate, upper.as_ref(), None, &render_bandwidth, "");
                CheckResult::new(state, format!("{label}: {text}")).with_metric(
                    Metric::builder()
                        .name(metric)
                        .value(rate)
                        .levels(upper.clone())
                        .bounds(Some(Bounds::min(0.0)))
                        .build(),
                )
            })
            .collect())
    }
}
