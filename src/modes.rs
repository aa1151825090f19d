// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! The subcommands of the binary. Each one renders its full output and the
//! exit code, printing is left to `main`.

use crate::agent_output::AgentOutput;
use crate::args::Command;
use crate::check::{exit_code, State};
use crate::config::CheckConfig;
use crate::constants;
use crate::params::Parameters;
use crate::plugin::{now, CheckDefinition, Service};
use crate::registry::Registry;
use crate::runner::{self, Outcome};
use crate::value_store::{FileValueStore, MemoryValueStore, ValueStore};
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::Path;

#[derive(Debug, PartialEq)]
pub struct Output {
    pub text: String,
    pub code: i32,
}

impl Output {
    fn ok(text: String) -> Self {
        Self { text, code: 0 }
    }
}

pub fn exec(command: &Command, config: &CheckConfig) -> Result<Output> {
    let registry = Registry::builtin()?;
    config.validate(&registry)?;
    match command {
        Command::List => Ok(list(&registry)),
        Command::Discover {
            check,
            agent_output,
        } => discover(&registry, check, &read_agent_output(agent_output)?),
        Command::Check {
            check,
            item,
            agent_output,
            params,
        } => {
            let user = match params {
                Some(params) => params
                    .parse::<Parameters>()
                    .context("Invalid --params")?,
                None => Parameters::default(),
            };
            let output = read_agent_output(agent_output)?;
            with_store(config, |store| {
                check_service(
                    &registry,
                    config,
                    check,
                    item.as_deref(),
                    &user,
                    &output,
                    store,
                )
            })
        }
        Command::Run { agent_output } => {
            let output = read_agent_output(agent_output)?;
            with_store(config, |store| Ok(run(&registry, config, &output, store)))
        }
    }
}

fn read_agent_output(path: &Path) -> Result<AgentOutput> {
    let content = if path == Path::new(constants::STDIN_MARKER) {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        content
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Can't read agent output {}", path.display()))?
    };
    Ok(AgentOutput::parse(&content))
}

/// Runs `f` against the configured state file, or against a store that lives
/// for this run only.
fn with_store<F>(config: &CheckConfig, f: F) -> Result<Output>
where
    F: FnOnce(&mut dyn ValueStore) -> Result<Output>,
{
    match config.state_file() {
        Some(path) => {
            let mut store = FileValueStore::load_missing_safe(path)
                .with_context(|| format!("Can't load state file {}", path.display()))?;
            let output = f(&mut store)?;
            store.prune(now());
            store.save()?;
            Ok(output)
        }
        None => f(&mut MemoryValueStore::new()),
    }
}

fn get_definition<'a>(registry: &'a Registry, name: &str) -> Result<&'a dyn CheckDefinition> {
    registry
        .get(name)
        .ok_or_else(|| anyhow!("Unknown check {name}"))
}

pub fn list(registry: &Registry) -> Output {
    Output::ok(
        registry
            .definitions()
            .map(|d| format!("{} {}", d.name(), d.service_description(Some("%s"))))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

pub fn discover(registry: &Registry, check: &str, output: &AgentOutput) -> Result<Output> {
    let definition = get_definition(registry, check)?;
    let Some(section) = runner::parse(definition, output)? else {
        log::info!("{check}: no section in agent output");
        return Ok(Output::ok(String::new()));
    };
    let services = runner::discover(definition, &section)?;
    Ok(Output::ok(
        services
            .iter()
            .map(|s| definition.service_description(s.item.as_deref()))
            .collect::<Vec<_>>()
            .join("\n"),
    ))
}

pub fn check_service(
    registry: &Registry,
    config: &CheckConfig,
    check: &str,
    item: Option<&str>,
    params: &Parameters,
    output: &AgentOutput,
    store: &mut dyn ValueStore,
) -> Result<Output> {
    let definition = get_definition(registry, check)?;
    definition
        .validate_parameters(&definition.effective_parameters(params))
        .context("Invalid --params")?;
    let user = config.parameters_for(check, item).updated(params);
    let outcome = match runner::parse(definition, output) {
        Ok(Some(section)) => {
            // Parameters found at discovery belong to the service.
            let service = runner::discover(definition, &section)
                .unwrap_or_default()
                .into_iter()
                .find(|s| s.item.as_deref() == item)
                .unwrap_or_else(|| match item {
                    Some(item) => Service::new(item),
                    None => Service::without_item(),
                });
            runner::check_item(definition, &service, &user, &section, store, now())
        }
        Ok(None) => Outcome::NoData,
        Err(e) => Outcome::Failed(format!("Cannot parse section: {e}")),
    };
    let collection = outcome.into_collection();
    Ok(Output {
        text: collection.to_string(),
        code: exit_code(&collection),
    })
}

/// One line per service: state, description and summary. The exit code is
/// the worst state seen.
pub fn run(
    registry: &Registry,
    config: &CheckConfig,
    output: &AgentOutput,
    store: &mut dyn ValueStore,
) -> Output {
    let rules = |check: &str, item: Option<&str>| config.parameters_for(check, item);
    let outcomes = runner::run_cycle(registry, output, &rules, store, now());
    let mut worst = State::Ok;
    let lines = outcomes
        .into_iter()
        .map(|service| {
            let collection = service.outcome.into_collection();
            worst = State::worst(worst, collection.state());
            let text = collection.to_string();
            let summary = text
                .lines()
                .next()
                .and_then(|line| line.split(" | ").next())
                .unwrap_or_default();
            format!(
                "{} {} - {}",
                i32::from(collection.state()),
                service.description,
                summary
            )
        })
        .collect::<Vec<_>>();
    Output {
        text: lines.join("\n"),
        code: worst.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
<<<decitemp>>>
SensorA 205
SensorB 320
<<<legacy_psu>>>
PSU1 1
";

    fn agent_output() -> AgentOutput {
        AgentOutput::parse(OUTPUT)
    }

    #[test]
    fn test_list() {
        let out = list(&Registry::builtin().unwrap());
        assert_eq!(out.code, 0);
        assert!(out.text.lines().any(|l| l == "decitemp Temperature %s"));
    }

    #[test]
    fn test_discover() {
        let registry = Registry::builtin().unwrap();
        let out = discover(&registry, "decitemp", &agent_output()).unwrap();
        assert_eq!(out.text, "Temperature SensorA\nTemperature SensorB");
        assert!(discover(&registry, "nope", &agent_output()).is_err());
        assert_eq!(
            discover(&registry, "eltek_fans", &agent_output()).unwrap(),
            Output::ok(String::new())
        );
    }

    #[test]
    fn test_check_service() {
        let registry = Registry::builtin().unwrap();
        let config = CheckConfig::load_str(
            "check_plugins:\n  rules:\n    - check: decitemp\n      parameters:\n        levels: [25.0, 30.0]\n",
        )
        .unwrap();
        let mut store = MemoryValueStore::new();
        let out = check_service(
            &registry,
            &config,
            "decitemp",
            Some("SensorB"),
            &Parameters::default(),
            &agent_output(),
            &mut store,
        )
        .unwrap();
        assert_eq!(out.code, 2);
        assert!(out
            .text
            .starts_with("32.0 °C (warn/crit at 25.0/30.0 °C)"));

        let out = check_service(
            &registry,
            &config,
            "decitemp",
            Some("SensorX"),
            &Parameters::default(),
            &agent_output(),
            &mut store,
        )
        .unwrap();
        assert_eq!(out.code, 3);
    }

    #[test]
    fn test_check_service_rejects_invalid_params() {
        let registry = Registry::builtin().unwrap();
        let mut store = MemoryValueStore::new();
        let err = check_service(
            &registry,
            &CheckConfig::default(),
            "decitemp",
            Some("SensorA"),
            &"levels: [30.0, 25.0]".parse().unwrap(),
            &agent_output(),
            &mut store,
        )
        .unwrap_err();
        assert!(format!("{err:#}").starts_with("Invalid --params: levels:"));
    }

    #[test]
    fn test_run() {
        let registry = Registry::builtin().unwrap();
        let mut store = MemoryValueStore::new();
        let out = run(
            &registry,
            &CheckConfig::default(),
            &agent_output(),
            &mut store,
        );
        assert_eq!(out.code, 0);
        assert_eq!(
            out.text,
            "0 Temperature SensorA - 20.5 °C\n0 Temperature SensorB - 32.0 °C\n0 Power Supply PSU1 - Status: ok"
        );
    }
}
