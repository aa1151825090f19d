// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::levels::Levels;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::ops::Deref;
use std::str::FromStr;
use typed_builder::TypedBuilder;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    // See also: https://docs.checkmk.com/latest/en/devel_check_plugins.html
    // The order is the order of severity, UNKNOWN is less severe than CRIT.
    #[default]
    Ok,
    Warn,
    Unknown,
    Crit,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARNING",
            Self::Crit => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn as_sym(&self) -> Option<&'static str> {
        match self {
            State::Ok => None,
            State::Warn => Some("!"),
            State::Crit => Some("!!"),
            State::Unknown => Some("?"),
        }
    }

    pub fn worst(a: State, b: State) -> State {
        std::cmp::max(a, b)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "{}", self.as_str())
    }
}

impl From<State> for i32 {
    fn from(value: State) -> Self {
        match value {
            State::Ok => 0,
            State::Warn => 1,
            State::Crit => 2,
            State::Unknown => 3,
        }
    }
}

impl TryFrom<i32> for State {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(State::Ok),
            1 => Ok(State::Warn),
            2 => Ok(State::Crit),
            3 => Ok(State::Unknown),
            other => Err(other),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Uom(String);

impl FromStr for Uom {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Deref for Uom {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Uom {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        self.0.fmt(f)
    }
}

/// Boundaries of a metric, either side may be open.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn min(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn min_max(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Warning and critical thresholds of a metric, each may be missing.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warn: Option<f64>,
    pub crit: Option<f64>,
}

impl From<Levels<f64>> for Thresholds {
    fn from(levels: Levels<f64>) -> Self {
        Self {
            warn: Some(levels.warn),
            crit: Some(levels.crit),
        }
    }
}

impl From<Option<Levels<f64>>> for Thresholds {
    fn from(levels: Option<Levels<f64>>) -> Self {
        levels.map(Self::from).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct Metric {
    #[builder(setter(transform = |x: impl Into<String>| x.into() ))]
    name: String,
    value: f64,
    #[builder(default, setter(strip_option))]
    uom: Option<Uom>,
    #[builder(default, setter(into))]
    levels: Thresholds,
    #[builder(default)]
    bounds: Option<Bounds>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self::builder().name(name).value(value).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn levels(&self) -> Thresholds {
        self.levels
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    /// The tuple handed to the reporting layer:
    /// (name, value, warn, crit, min, max).
    pub fn as_tuple(
        &self,
    ) -> (
        &str,
        f64,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
    ) {
        (
            &self.name,
            self.value,
            self.levels.warn,
            self.levels.crit,
            self.bounds.and_then(|b| b.min),
            self.bounds.and_then(|b| b.max),
        )
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        fn opt(x: Option<f64>) -> String {
            x.map_or(Default::default(), |v| v.to_string())
        }
        let (name, value, warn, crit, min, max) = self.as_tuple();
        write!(
            f,
            "{}={}{};{};{};{};{}",
            name,
            value,
            self.uom
                .as_ref()
                .map_or(Default::default(), ToString::to_string),
            opt(warn),
            opt(crit),
            opt(min),
            opt(max),
        )
    }
}

fn as_option(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    (!s.is_empty()).then_some(s)
}

/// One line of check output: a state, a summary and/or a details text,
/// and the metrics belonging to it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CheckResult {
    state: State,
    summary: Option<String>,
    details: Option<String>,
    metrics: Vec<Metric>,
}

impl CheckResult {
    pub fn new(state: State, summary: impl Into<String>) -> Self {
        Self {
            state,
            summary: as_option(summary),
            details: None,
            metrics: vec![],
        }
    }

    pub fn ok(summary: impl Into<String>) -> Self {
        Self::new(State::Ok, summary)
    }

    pub fn warn(summary: impl Into<String>) -> Self {
        Self::new(State::Warn, summary)
    }

    pub fn crit(summary: impl Into<String>) -> Self {
        Self::new(State::Crit, summary)
    }

    pub fn unknown(summary: impl Into<String>) -> Self {
        Self::new(State::Unknown, summary)
    }

    /// Details only text, promoted to the summary if the state is not OK.
    pub fn notice(state: State, notice: impl Into<String>) -> Self {
        let notice = as_option(notice);
        Self {
            state,
            summary: (state != State::Ok).then(|| notice.clone()).flatten(),
            details: notice,
            metrics: vec![],
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = as_option(details);
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn with_metrics(mut self, metrics: impl IntoIterator<Item = Metric>) -> Self {
        self.metrics.extend(metrics);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Summary if present, details otherwise.
    pub fn text(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.details.as_deref())
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }
}

#[derive(Debug)]
struct CheckView(State, String);

impl Display for CheckView {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        // The pipe separates the text from the metrics, it must not appear in the text.
        let text = self.1.replace('|', "\u{2758}");
        match self.0.as_sym() {
            None => write!(f, "{}", text),
            Some(sym) => write!(f, "{} ({})", text, sym),
        }
    }
}

#[derive(Debug, Default)]
pub struct Collection {
    state: State,
    summary: Vec<CheckView>,
    details: Vec<CheckView>,
    metrics: Vec<Metric>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn add(&mut self, cr: CheckResult) {
        self.state = State::worst(self.state, cr.state);
        if let Some(ref summary) = cr.summary {
            self.summary.push(CheckView(cr.state, summary.to_owned()));
        }
        if let Some(details) = cr.details.or(cr.summary) {
            self.details.push(CheckView(cr.state, details));
        }
        self.metrics.extend(cr.metrics);
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        let summary = self
            .summary
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = if summary.is_empty() {
            String::from(self.state.as_str())
        } else {
            summary
        };
        if !self.metrics.is_empty() {
            out = format!(
                "{} | {}",
                out,
                self.metrics
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            );
        }
        if !self.details.is_empty() {
            out = format!(
                "{}\n{}",
                out,
                self.details
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            );
        }
        write!(f, "{}", out)
    }
}

impl From<CheckResult> for Collection {
    fn from(check_result: CheckResult) -> Self {
        let mut out = Collection::new();
        out.add(check_result);
        out
    }
}

impl From<Vec<CheckResult>> for Collection {
    fn from(check_results: Vec<CheckResult>) -> Self {
        check_results
            .into_iter()
            .fold(Collection::default(), |mut out, cr| {
                out.add(cr);
                out
            })
    }
}

pub fn exit_code(collection: &Collection) -> i32 {
    collection.state.into()
}

pub fn bail_out(message: impl Into<String>) -> ! {
    let out = Collection::from(CheckResult::unknown(message));
    println!("{}", out);
    std::process::exit(exit_code(&out))
}

#[cfg(test)]
mod test_state {
    use super::State;

    #[test]
    fn test_order_of_severity() {
        assert!(State::Ok < State::Warn);
        assert!(State::Warn < State::Unknown);
        assert!(State::Unknown < State::Crit);
        assert_eq!(State::worst(State::Unknown, State::Crit), State::Crit);
    }

    #[test]
    fn test_int_conversion() {
        for state in [State::Ok, State::Warn, State::Crit, State::Unknown] {
            assert_eq!(State::try_from(i32::from(state)), Ok(state));
        }
        assert_eq!(i32::from(State::Unknown), 3);
        assert_eq!(State::try_from(4), Err(4));
    }
}


#[cfg(test)]
mod test_checker_format {
    use super::{CheckResult, Collection, Metric, State};

    #[test]
    fn test_with_empty_str() {
        assert_eq!(CheckResult::ok(""), CheckResult::default());
        assert_eq!(CheckResult::notice(State::Ok, ""), CheckResult::default());
    }

    #[test]
    fn test_notice() {
        let ok = CheckResult::notice(State::Ok, "notice");
        assert_eq!(ok.summary(), None);
        assert_eq!(ok.details(), Some("notice"));
        let warn = CheckResult::notice(State::Warn, "notice");
        assert_eq!(warn.summary(), Some("notice"));
        assert_eq!(warn.text(), "notice");
    }

    #[test]
    fn test_single_check_result_warn() {
        let coll = Collection::from(CheckResult::warn("summary"));
        assert_eq!(coll.state(), State::Warn);
        assert_eq!(format!("{}", coll), "summary (!)\nsummary (!)");
    }

    #[test]
    fn test_no_check_results_is_ok() {
        let coll = Collection::from(vec![]);
        assert_eq!(coll.state(), State::Ok);
        assert_eq!(format!("{}", coll), "OK");
    }

    #[test]
    fn test_merge_check_results_unknown() {
        let coll = Collection::from(vec![
            CheckResult::ok("summary 1"),
            CheckResult::warn("summary 2"),
            CheckResult::crit("summary 3"),
            CheckResult::unknown("summary 4"),
        ]);
        assert_eq!(coll.state(), State::Crit);
        assert_eq!(
            format!("{}", coll),
            "summary 1, summary 2 (!), summary 3 (!!), summary 4 (?)\n\
            summary 1\n\
            summary 2 (!)\n\
            summary 3 (!!)\n\
            summary 4 (?)"
        );
    }

    #[test]
    fn test_collection_with_metrics_and_details() {
        let coll = Collection::from(vec![
            CheckResult::ok("summary ok"),
            CheckResult::notice(State::Ok, "notice"),
            CheckResult::warn("summary warn")
                .with_details("details warn")
                .with_metric(Metric::new("mwarn", 13.0)),
            CheckResult::crit("summary crit").with_metric(Metric::new("mcrit", 37.0)),
        ]);
        assert_eq!(coll.state(), State::Crit);
        assert_eq!(
            format!("{}", coll),
            "summary ok, summary warn (!), summary crit (!!) | mwarn=13;;;; mcrit=37;;;;\n\
            summary ok\n\
            notice\n\
            details warn (!)\n\
            summary crit (!!)"
        );
    }

    #[test]
    fn test_pipe_is_escaped() {
        let coll = Collection::from(CheckResult::ok("a|b"));
        assert_eq!(format!("{}", coll), "a\u{2758}b\na\u{2758}b");
    }

    #[test]
    fn test_collection_of_several() {
        let coll = Collection::from(vec![
            CheckResult::ok("summary 1"),
            CheckResult::crit("summary 2"),
        ]);
        assert_eq!(coll.state(), State::Crit);
        assert_eq!(
            format!("{}", coll),
            "summary 1, summary 2 (!!)\nsummary 1\nsummary 2 (!!)"
        );
    }
}
