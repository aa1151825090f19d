// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Rows of string fields as delivered by an SNMP walk or an agent section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn extend(&mut self, other: RawTable) {
        self.rows.extend(other.rows)
    }
}

impl<R, S> FromIterator<R> for RawTable
where
    R: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// A single field failed type coercion. The row is skipped unless the
/// schema is strict.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{field}: cannot convert {value:?} to {expected}")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{field}: unknown marker {value:?}")]
    UnknownMarker { field: &'static str, value: String },
}

/// The table does not fit the check at all, collector and check disagree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SectionError {
    #[error("row {row}: expected {min} to {max} columns, got {got}")]
    Shape {
        row: usize,
        min: usize,
        max: usize,
        got: usize,
    },
    #[error("row {row}: {source}")]
    Value {
        row: usize,
        #[source]
        source: ParseError,
    },
    #[error("expected {expected} tables, got {got}")]
    Tables { expected: usize, got: usize },
}

/// Field access on one row, columns are zero based.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    fields: &'a [String],
}

impl<'a> Row<'a> {
    pub fn new(fields: &'a [String]) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn str(&self, column: usize) -> &'a str {
        self.fields
            .get(column)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn opt_str(&self, column: usize) -> Option<&'a str> {
        self.fields
            .get(column)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn parse<T: FromStr>(
        &self,
        column: usize,
        field: &'static str,
        expected: &'static str,
    ) -> Result<T, ParseError> {
        let value = self.str(column);
        value
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidValue {
                field,
                value: value.to_string(),
                expected,
            })
    }

    pub fn float(&self, column: usize, field: &'static str) -> Result<f64, ParseError> {
        self.parse::<f64>(column, field, "a number")
            .and_then(|v| finite(v, field, self.str(column)))
    }

    /// Missing and empty fields are `None`, anything else must be a number.
    pub fn opt_float(&self, column: usize, field: &'static str) -> Result<Option<f64>, ParseError> {
        self.opt_str(column)
            .map(|_| self.float(column, field))
            .transpose()
    }

    pub fn counter(&self, column: usize, field: &'static str) -> Result<u64, ParseError> {
        self.parse::<u64>(column, field, "a counter")
    }
}

fn finite(v: f64, field: &'static str, raw: &str) -> Result<f64, ParseError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ParseError::InvalidValue {
            field,
            value: raw.to_string(),
            expected: "a finite number",
        })
    }
}

/// Explicit schema of the rows of one table.
pub trait FromRow: Sized {
    /// Accepted column counts, anything else is a shape error.
    const COLUMNS: RangeInclusive<usize>;

    /// Coercion failures propagate instead of skipping the row.
    const STRICT: bool = false;

    fn from_row(row: Row<'_>) -> Result<Self, ParseError>;
}

/// Typed records of a table plus the rows that were skipped.
#[derive(Debug)]
pub struct Rows<R> {
    pub records: Vec<R>,
    pub skipped: Vec<(usize, ParseError)>,
}

pub fn parse_rows<R: FromRow>(table: &RawTable) -> Result<Rows<R>, SectionError> {
    let mut records = Vec::with_capacity(table.len());
    let mut skipped = vec![];
    for (index, fields) in table.rows().iter().enumerate() {
        if !R::COLUMNS.contains(&fields.len()) {
            return Err(SectionError::Shape {
                row: index,
                min: *R::COLUMNS.start(),
                max: *R::COLUMNS.end(),
                got: fields.len(),
            });
        }
        match R::from_row(Row::new(fields)) {
            Ok(record) => records.push(record),
            Err(e) if R::STRICT => return Err(SectionError::Value { row: index, source: e }),
            Err(e) => {
                log::debug!("skipping row {index}: {e}");
                skipped.push((index, e));
            }
        }
    }
    Ok(Rows { records, skipped })
}

pub fn table_at(tables: &[RawTable], index: usize) -> Result<&RawTable, SectionError> {
    tables.get(index).ok_or(SectionError::Tables {
        expected: index + 1,
        got: tables.len(),
    })
}

/// Collects `(item, record)` pairs, colliding items get the first free
/// suffix ` 2`, ` 3`, ... in row order.
pub fn unique_items<R>(records: impl IntoIterator<Item = (String, R)>) -> BTreeMap<String, R> {
    let mut out = BTreeMap::new();
    for (item, record) in records {
        let key = if out.contains_key(&item) {
            (2..)
                .map(|n| format!("{} {}", item, n))
                .find(|candidate| !out.contains_key(candidate))
                .unwrap_or_default()
        } else {
            item
        };
        out.insert(key, record);
    }
    out
}
