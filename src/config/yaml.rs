// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use yaml_rust2::YamlLoader;
pub type Yaml = yaml_rust2::yaml::Yaml;

/// Lookup by key with a missing key or a wrong type read as absent.
pub trait Get {
    fn get(&self, key: &str) -> &Self
    where
        Self: Sized;
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_pathbuf(&self, key: &str) -> Option<PathBuf>;
    fn get_yaml_vector(&self, key: &str) -> Vec<Yaml>;
    fn get_optional_bool(&self, key: &str) -> Option<bool>;

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_optional_bool(key).unwrap_or(default)
    }
}

/// Integers are accepted where floats are expected.
pub fn as_float(yaml: &Yaml) -> Option<f64> {
    yaml.as_f64().or_else(|| yaml.as_i64().map(|i| i as f64))
}

impl Get for Yaml {
    fn get(&self, key: &str) -> &Self {
        &self[key]
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match &self[key] {
            Yaml::String(s) => Some(s.clone()),
            // item names like `1` are written unquoted
            Yaml::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }

    fn get_pathbuf(&self, key: &str) -> Option<PathBuf> {
        self[key].as_str().map(PathBuf::from)
    }

    fn get_yaml_vector(&self, key: &str) -> Vec<Yaml> {
        match &self[key] {
            Yaml::Array(v) => v.clone(),
            Yaml::BadValue | Yaml::Null => vec![],
            other => {
                log::warn!("{key} is not a list: {other:?}");
                vec![]
            }
        }
    }

    fn get_optional_bool(&self, key: &str) -> Option<bool> {
        match &self[key] {
            Yaml::BadValue => None,
            Yaml::Boolean(b) => Some(*b),
            // yaml rust accepts neither yes/no nor True/False as bool
            Yaml::String(s) => {
                let value = to_bool(s);
                if value.is_none() {
                    log::warn!("{key} is not bool like: {s}");
                }
                value
            }
            other => {
                log::warn!("{key} is not bool like: {other:?}");
                None
            }
        }
    }
}

pub fn load_from_file(file_name: &Path) -> Result<Vec<Yaml>> {
    let content = std::fs::read_to_string(file_name).with_context(|| {
        // "{file_name:?}" produces too many backslashes on Windows
        format!("Can't read config file: {}", file_name.display())
    })?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<Vec<Yaml>> {
    match YamlLoader::load_from_str(content) {
        Ok(docs) => Ok(docs),
        Err(e) => bail!("Invalid yaml: {e}"),
    }
}

fn to_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_ref() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub mod test_tools {
    use yaml_rust2::{Yaml, YamlLoader};
    pub fn create_yaml(source: &str) -> Yaml {
        YamlLoader::load_from_str(source).expect("fix test string!")[0].clone()
    }
}
