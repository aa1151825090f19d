// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

// Test files are compiled to separate crates, so there
// may be some unused functions in the common module
#![allow(dead_code)]

use assert_cmd::Command;
use check_plugins::check::CheckResult;
use check_plugins::params::Parameters;
use check_plugins::plugin::{CheckContext, CheckDefinition, Section};
use check_plugins::registry::Registry;
use check_plugins::table::RawTable;
use check_plugins::value_store::MemoryValueStore;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn run_bin() -> Command {
    let mut cmd = Command::cargo_bin("check-plugins").unwrap();
    // keep a config of the developer out of the way
    cmd.env("MK_CONFDIR", "/nonexistent")
        .env_remove("MK_VARDIR")
        .env_remove("MK_LOGDIR");
    cmd
}

pub fn create_file_with_content(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

pub fn table(rows: &[&[&str]]) -> RawTable {
    rows.iter().map(|row| row.iter().copied()).collect()
}

pub struct Fixture {
    pub registry: Registry,
    pub store: MemoryValueStore,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            registry: Registry::builtin().unwrap(),
            store: MemoryValueStore::new(),
        }
    }

    pub fn definition(&self, check: &str) -> &dyn CheckDefinition {
        self.registry.get(check).unwrap()
    }

    pub fn parse(&self, check: &str, tables: &[RawTable]) -> Section {
        self.definition(check).parse(tables).unwrap()
    }

    pub fn items(&self, check: &str, section: &Section) -> Vec<String> {
        let definition = self.definition(check);
        definition
            .discover(section, &definition.discovery_parameters())
            .unwrap()
            .into_iter()
            .filter_map(|s| s.item)
            .collect()
    }

    /// Runs the check with its defaults overlaid by `params`.
    pub fn check(
        &mut self,
        check: &str,
        item: &str,
        params: &str,
        section: &Section,
    ) -> Vec<CheckResult> {
        let definition = self.registry.get(check).unwrap();
        let params = definition.effective_parameters(&params.parse::<Parameters>().unwrap());
        let mut ctx = CheckContext::builder()
            .value_store(&mut self.store)
            .now(1000.0)
            .build();
        definition
            .check(Some(item), &params, section, &mut ctx)
            .unwrap()
    }
}
