// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! One evaluation cycle: parse every section once, discover, check every item.
//!
//! Failures are contained per item. A failing item yields an UNKNOWN line for
//! that item only, a section that does not fit its check fails that check only.

use crate::agent_output::AgentOutput;
use crate::check::{CheckResult, Collection};
use crate::params::Parameters;
use crate::plugin::{CheckContext, CheckDefinition, CheckError, Section, Service};
use crate::registry::Registry;
use crate::table::SectionError;
use crate::value_store::{RateError, ScopedValueStore, ValueStore};

pub const ITEM_NOT_FOUND: &str = "Item not found in monitoring data";

#[derive(Debug)]
pub enum Outcome {
    Results(Vec<CheckResult>),
    /// The item is not in the section any more.
    NoData,
    /// A rate needs one more cycle.
    Pending(RateError),
    Failed(String),
}

impl Outcome {
    pub fn into_collection(self) -> Collection {
        match self {
            Outcome::Results(results) => Collection::from(results),
            Outcome::NoData => Collection::from(CheckResult::unknown(ITEM_NOT_FOUND)),
            Outcome::Pending(e) => {
                Collection::from(CheckResult::ok(format!("Cannot compute check result: {e}")))
            }
            Outcome::Failed(message) => Collection::from(CheckResult::unknown(message)),
        }
    }
}

impl From<Result<Vec<CheckResult>, CheckError>> for Outcome {
    fn from(result: Result<Vec<CheckResult>, CheckError>) -> Self {
        match result {
            Ok(results) if results.is_empty() => Outcome::NoData,
            Ok(results) => Outcome::Results(results),
            Err(CheckError::RateUnavailable(e)) => Outcome::Pending(e),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct ServiceOutcome {
    pub check: String,
    pub description: String,
    pub item: Option<String>,
    pub outcome: Outcome,
}

/// `None` if the agent sent none of the sections the check consumes.
pub fn parse(
    definition: &dyn CheckDefinition,
    output: &AgentOutput,
) -> Result<Option<Section>, SectionError> {
    output
        .tables_for(&definition.sections())
        .map(|tables| definition.parse(&tables))
        .transpose()
}

pub fn discover(
    definition: &dyn CheckDefinition,
    section: &Section,
) -> Result<Vec<Service>, CheckError> {
    definition.discover(section, &definition.discovery_parameters())
}

/// Evaluates one item. Parameters are layered: check defaults, then the
/// parameters found at discovery, then `user`.
pub fn check_item(
    definition: &dyn CheckDefinition,
    service: &Service,
    user: &Parameters,
    section: &Section,
    store: &mut dyn ValueStore,
    now: f64,
) -> Outcome {
    let item = service.item.as_deref();
    let params = definition.effective_parameters(&service.parameters.updated(user));
    let mut scoped = ScopedValueStore::new(store, definition.name(), item);
    let mut ctx = CheckContext::builder()
        .value_store(&mut scoped)
        .now(now)
        .build();
    let outcome = Outcome::from(definition.check(item, &params, section, &mut ctx));
    match &outcome {
        Outcome::Failed(message) => log::warn!(
            "{}: {} failed: {}",
            definition.name(),
            item.unwrap_or_default(),
            message
        ),
        Outcome::Pending(e) => log::info!("{}: {}", definition.name(), e),
        _ => {}
    }
    outcome
}

/// Discovers and checks all items of all registered checks.
pub fn run_cycle(
    registry: &Registry,
    output: &AgentOutput,
    rules: &dyn Fn(&str, Option<&str>) -> Parameters,
    store: &mut dyn ValueStore,
    now: f64,
) -> Vec<ServiceOutcome> {
    log::info!("starting cycle over {} checks", registry.len());
    let mut outcomes = vec![];
    for definition in registry.definitions() {
        let failed = |message: String| ServiceOutcome {
            check: definition.name().to_string(),
            description: definition.service_description(None),
            item: None,
            outcome: Outcome::Failed(message),
        };
        let section = match parse(definition, output) {
            Ok(Some(section)) => section,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("{}: cannot parse section: {}", definition.name(), e);
                outcomes.push(failed(format!("Cannot parse section: {e}")));
                continue;
            }
        };
        let services = match discover(definition, &section) {
            Ok(services) => services,
            Err(e) => {
                outcomes.push(failed(e.to_string()));
                continue;
            }
        };
        for service in services {
            let item = service.item.as_deref();
            let user = rules(definition.name(), item);
            outcomes.push(ServiceOutcome {
                check: definition.name().to_string(),
                description: definition.service_description(item),
                item: service.item.clone(),
                outcome: check_item(definition, &service, &user, &section, store, now),
            });
        }
    }
    log::info!("cycle finished with {} services", outcomes.len());
    outcomes
}
