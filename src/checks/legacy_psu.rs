// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Power supplies in the old registration style, see [`crate::legacy`].

use crate::legacy::{LegacyCheckInfo, LegacyResult};
use crate::params::Parameters;
use crate::table::RawTable;

fn discover(table: &RawTable) -> Vec<(Option<String>, Parameters)> {
    table
        .rows()
        .iter()
        .filter(|row| row.len() >= 2)
        .map(|row| (Some(row[0].clone()), Parameters::default()))
        .collect()
}

fn check(item: Option<&str>, _params: &Parameters, table: &RawTable) -> Option<LegacyResult> {
    let row = table
        .rows()
        .iter()
        .find(|row| row.len() >= 2 && Some(row[0].as_str()) == item)?;
    let (state, text) = match row[1].trim() {
        "1" => (0, "ok".to_string()),
        "2" => (1, "warning".to_string()),
        "3" => (2, "failed".to_string()),
        "4" => (2, "not present".to_string()),
        other => (3, format!("unknown state {other}")),
    };
    Some((state, format!("Status: {text}"), vec![]))
}

pub fn check_info() -> LegacyCheckInfo {
    LegacyCheckInfo {
        name: "legacy_psu",
        service_name: "Power Supply %s",
        parse_function: None,
        discovery_function: discover,
        check_function: check,
        default_parameters: Parameters::default,
    }
}
