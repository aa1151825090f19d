// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Splits Checkmk agent output into one raw table per section.
//!
//! ```text
//! <<<decitemp>>>
//! SensorA 205
//! <<<akcp_temp:sep(59)>>>
//! Rack 1;245;1;2;1
//! ```

use crate::table::RawTable;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct Header {
    name: String,
    separator: Option<char>,
}

fn parse_header(line: &str) -> Option<Option<Header>> {
    if line.starts_with("<<<<") {
        return None;
    }
    let inner = line.strip_prefix("<<<")?.strip_suffix(">>>")?;
    if inner.is_empty() {
        return Some(None);
    }
    let mut parts = inner.split(':');
    let name = parts.next().unwrap_or_default().to_string();
    let separator = parts
        .filter_map(|option| option.strip_prefix("sep(")?.strip_suffix(')'))
        .filter_map(|code| code.parse::<u32>().ok())
        .find_map(char::from_u32);
    Some(Some(Header { name, separator }))
}

fn is_piggyback_header(line: &str) -> bool {
    line.starts_with("<<<<") && line.ends_with(">>>>")
}

fn split_row(line: &str, separator: Option<char>) -> Vec<String> {
    match separator {
        Some(sep) => line.split(sep).map(str::to_string).collect(),
        None => line.split_whitespace().map(str::to_string).collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutput {
    sections: BTreeMap<String, RawTable>,
}

impl AgentOutput {
    pub fn parse(text: &str) -> Self {
        let mut sections: BTreeMap<String, RawTable> = BTreeMap::new();
        let mut current: Option<Header> = None;
        let mut piggyback = false;
        for line in text.lines().map(|l| l.trim_end_matches('\r')) {
            if is_piggyback_header(line) {
                // <<<<host>>>> starts data of another host, <<<<>>>> ends it
                piggyback = line != "<<<<>>>>";
                current = None;
                continue;
            }
            if piggyback {
                continue;
            }
            if let Some(header) = parse_header(line) {
                if let Some(h) = &header {
                    sections.entry(h.name.clone()).or_default();
                }
                current = header;
                continue;
            }
            let Some(header) = &current else {
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Some(table) = sections.get_mut(&header.name) {
                table.extend(RawTable::new(vec![split_row(line, header.separator)]));
            }
        }
        log::debug!("agent output contains sections {:?}", sections.keys());
        Self { sections }
    }

    pub fn section(&self, name: &str) -> Option<&RawTable> {
        self.sections.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Tables in the requested order, `None` if none of them was sent.
    /// Missing sections among present ones are empty tables.
    pub fn tables_for(&self, names: &[&str]) -> Option<Vec<RawTable>> {
        if !names.iter().any(|name| self.sections.contains_key(*name)) {
            return None;
        }
        Some(
            names
                .iter()
                .map(|name| self.sections.get(*name).cloned().unwrap_or_default())
                .collect(),
        )
    }
}
