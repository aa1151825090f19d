// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

pub mod yaml;
use crate::params::Parameters;
use crate::registry::Registry;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use yaml::{Get, Yaml};

mod keys {
    pub const CHECK_PLUGINS: &str = "check_plugins";
    pub const STATE_FILE: &str = "state_file";
    pub const RULES: &str = "rules";
    pub const CHECK: &str = "check";
    pub const ITEM: &str = "item";
    pub const PARAMETERS: &str = "parameters";
}

/// Parameters of one check, optionally limited to one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub check: String,
    pub item: Option<String>,
    pub parameters: Parameters,
}

impl Rule {
    pub fn from_yaml(yaml: &Yaml) -> Result<Self> {
        let Some(check) = yaml.get_string(keys::CHECK) else {
            bail!("rule without check name");
        };
        let parameters = match yaml.get(keys::PARAMETERS) {
            p if p.is_badvalue() || p.is_null() => Parameters::default(),
            p => Parameters::from_yaml(p.clone()).with_context(|| format!("rule for {check}"))?,
        };
        Ok(Self {
            item: yaml.get_string(keys::ITEM),
            check,
            parameters,
        })
    }

    pub fn matches(&self, check: &str, item: Option<&str>) -> bool {
        self.check == check && self.item.as_ref().map_or(true, |i| Some(i.as_str()) == item)
    }
}

/// Contains config of the check plugins binary
#[derive(Default, Debug, PartialEq)]
pub struct CheckConfig {
    state_file: Option<PathBuf>,
    rules: Vec<Rule>,
}

impl CheckConfig {
    pub fn load_file(file: &Path) -> Result<Self> {
        CheckConfig::load_vec_yaml(yaml::load_from_file(file)?)
    }
    pub fn load_str(content: &str) -> Result<Self> {
        CheckConfig::load_vec_yaml(yaml::load_from_str(content)?)
    }

    fn load_vec_yaml(data: Vec<Yaml>) -> Result<Self> {
        if data.is_empty() {
            bail!("Not yaml document");
        }
        let root = data[0].get(keys::CHECK_PLUGINS);
        if root.is_badvalue() {
            log::info!("no {} key, using defaults", keys::CHECK_PLUGINS);
            return Ok(CheckConfig::default());
        }
        Ok(CheckConfig {
            state_file: root.get_pathbuf(keys::STATE_FILE),
            rules: root
                .get_yaml_vector(keys::RULES)
                .iter()
                .map(Rule::from_yaml)
                .collect::<Result<Vec<Rule>>>()?,
        })
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    pub fn set_state_file(&mut self, state_file: PathBuf) {
        self.state_file = Some(state_file);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every rule must name a registered check and carry valid parameters.
    pub fn validate(&self, registry: &Registry) -> Result<()> {
        for (index, rule) in self.rules.iter().enumerate() {
            let Some(definition) = registry.get(&rule.check) else {
                bail!("rule {}: unknown check {}", index + 1, rule.check);
            };
            definition
                .validate_parameters(&definition.effective_parameters(&rule.parameters))
                .with_context(|| format!("rule {}: {}", index + 1, rule.check))?;
        }
        Ok(())
    }

    /// Merged parameters of all matching rules. Per key the first rule wins.
    pub fn parameters_for(&self, check: &str, item: Option<&str>) -> Parameters {
        self.rules
            .iter()
            .rev()
            .filter(|rule| rule.matches(check, item))
            .fold(Parameters::default(), |acc, rule| acc.updated(&rule.parameters))
    }
}
