// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::config::yaml::{as_float, Get, Yaml};
use crate::levels::{Levels, LevelsError, LevelsStrategy};
use yaml_rust2::yaml::Hash;
use yaml_rust2::YamlLoader;

pub const LEVELS: &str = "levels";
pub const LEVELS_LOWER: &str = "levels_lower";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("cannot parse parameters: {0}")]
    Syntax(String),
    #[error("parameters must be a mapping")]
    NotAMapping,
    #[error("missing required key {0}")]
    MissingKey(String),
    #[error("{key}: expected {expected}")]
    InvalidType { key: String, expected: &'static str },
    #[error("{key}: {source}")]
    Levels {
        key: String,
        #[source]
        source: LevelsError,
    },
    #[error("{key}: unexpected value {value:?}, expected one of {expected}")]
    InvalidChoice {
        key: String,
        value: String,
        expected: String,
    },
}

/// Check parameters: a nested mapping, read only for the checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters(Yaml);

impl Default for Parameters {
    fn default() -> Self {
        Self(Yaml::Hash(Hash::new()))
    }
}

impl std::str::FromStr for Parameters {
    type Err = ConfigurationError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let docs = YamlLoader::load_from_str(source)
            .map_err(|e| ConfigurationError::Syntax(e.to_string()))?;
        docs.into_iter()
            .next()
            .map_or(Ok(Parameters::default()), Parameters::from_yaml)
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(yaml: Yaml) -> Result<Self, ConfigurationError> {
        match yaml {
            Yaml::Hash(_) => Ok(Self(yaml)),
            Yaml::Null | Yaml::BadValue => Ok(Self::default()),
            _ => Err(ConfigurationError::NotAMapping),
        }
    }

    pub fn as_yaml(&self) -> &Yaml {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_hash().map_or(true, Hash::is_empty)
    }

    pub fn with(mut self, key: &str, value: Yaml) -> Self {
        if let Yaml::Hash(ref mut hash) = self.0 {
            hash.insert(Yaml::String(key.to_string()), value);
        }
        self
    }

    pub fn with_pair(self, key: &str, (a, b): (f64, f64)) -> Self {
        self.with(key, Yaml::Array(vec![real(a), real(b)]))
    }

    /// Keys of `other` take precedence over ours.
    pub fn updated(&self, other: &Parameters) -> Parameters {
        let mut out = self.clone();
        if let (Yaml::Hash(ref mut ours), Yaml::Hash(theirs)) = (&mut out.0, &other.0) {
            for (k, v) in theirs {
                ours.insert(k.clone(), v.clone());
            }
        }
        out
    }

    pub fn float(&self, key: &str) -> Result<Option<f64>, ConfigurationError> {
        let value = self.0.get(key);
        if value.is_badvalue() {
            return Ok(None);
        }
        as_float(value)
            .map(Some)
            .ok_or_else(|| invalid_type(key, "a number"))
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, ConfigurationError> {
        let value = self.0.get(key);
        if value.is_badvalue() {
            return Ok(None);
        }
        value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| invalid_type(key, "a string"))
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        self.0.get_bool(key, default)
    }

    /// A nested mapping, e.g. `trend_compute`.
    pub fn section(&self, key: &str) -> Result<Option<Parameters>, ConfigurationError> {
        let value = self.0.get(key);
        if value.is_badvalue() {
            return Ok(None);
        }
        Parameters::from_yaml(value.clone())
            .map(Some)
            .map_err(|_| invalid_type(key, "a mapping"))
    }

    pub fn pair(&self, key: &str) -> Result<Option<(f64, f64)>, ConfigurationError> {
        let value = self.0.get(key);
        if value.is_badvalue() {
            return Ok(None);
        }
        match value.as_vec().map(Vec::as_slice) {
            Some([a, b]) => match (as_float(a), as_float(b)) {
                (Some(a), Some(b)) => Ok(Some((a, b))),
                _ => Err(invalid_type(key, "a pair of numbers")),
            },
            _ => Err(invalid_type(key, "a pair of numbers")),
        }
    }

    /// Absent keys count as integer.
    pub fn is_integer_pair(&self, key: &str) -> bool {
        match self.0.get(key) {
            Yaml::BadValue => true,
            value => value
                .as_vec()
                .is_some_and(|v| v.iter().all(|x| matches!(x, Yaml::Integer(_)))),
        }
    }

    pub fn levels(
        &self,
        key: &str,
        strategy: LevelsStrategy,
    ) -> Result<Option<Levels<f64>>, ConfigurationError> {
        self.pair(key)?
            .map(|(warn, crit)| {
                Levels::try_new(strategy, warn, crit).map_err(|source| {
                    ConfigurationError::Levels {
                        key: key.to_string(),
                        source,
                    }
                })
            })
            .transpose()
    }

    pub fn upper_levels(&self) -> Result<Option<Levels<f64>>, ConfigurationError> {
        self.levels(LEVELS, LevelsStrategy::Upper)
    }

    pub fn lower_levels(&self) -> Result<Option<Levels<f64>>, ConfigurationError> {
        self.levels(LEVELS_LOWER, LevelsStrategy::Lower)
    }

    pub fn choice(
        &self,
        key: &str,
        choices: &[&str],
    ) -> Result<Option<String>, ConfigurationError> {
        match self.string(key)? {
            Some(value) if !choices.contains(&value.as_str()) => {
                Err(ConfigurationError::InvalidChoice {
                    key: key.to_string(),
                    value,
                    expected: choices.join(", "),
                })
            }
            other => Ok(other),
        }
    }

    pub fn require(&self, key: &str) -> Result<&Yaml, ConfigurationError> {
        let value = self.0.get(key);
        if value.is_badvalue() {
            Err(ConfigurationError::MissingKey(key.to_string()))
        } else {
            Ok(value)
        }
    }
}

fn invalid_type(key: &str, expected: &'static str) -> ConfigurationError {
    ConfigurationError::InvalidType {
        key: key.to_string(),
        expected,
    }
}

pub fn real(x: f64) -> Yaml {
    Yaml::Real(format!("{:?}", x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(source: &str) -> Parameters {
        source.parse().unwrap()
    }

    #[test]
    fn test_empty() {
        assert!(p("").is_empty());
        assert!(p("{}").is_empty());
        assert_eq!("[1, 2]".parse::<Parameters>(), Err(ConfigurationError::NotAMapping));
        assert!(matches!(
            "a: [".parse::<Parameters>(),
            Err(ConfigurationError::Syntax(_))
        ));
    }

    #[test]
    fn test_levels() {
        let params = p("levels: [25, 30.0]\nlevels_lower: [5.0, 2]");
        assert_eq!(
            params.upper_levels(),
            Ok(Some(Levels::upper(25.0, 30.0).unwrap()))
        );
        assert_eq!(
            params.lower_levels(),
            Ok(Some(Levels::lower(5.0, 2.0).unwrap()))
        );
        assert_eq!(p("other: 1").upper_levels(), Ok(None));
    }

    #[test]
    fn test_invalid_levels() {
        assert!(matches!(
            p("levels: [30.0, 25.0]").upper_levels(),
            Err(ConfigurationError::Levels { .. })
        ));
        assert!(matches!(
            p("levels_lower: [2.0, 5.0]").lower_levels(),
            Err(ConfigurationError::Levels { .. })
        ));
        assert_eq!(
            p("levels: [1.0]").upper_levels(),
            Err(ConfigurationError::InvalidType {
                key: "levels".to_string(),
                expected: "a pair of numbers"
            })
        );
        assert!(p("levels: x").upper_levels().is_err());
    }

    #[test]
    fn test_with_and_updated() {
        let defaults = Parameters::new().with_pair(LEVELS, (60.0, 70.0));
        let user = Parameters::new()
            .with_pair(LEVELS, (50.0, 55.0))
            .with("output_unit", Yaml::String("f".to_string()));
        let merged = defaults.updated(&user);
        assert_eq!(merged.pair(LEVELS), Ok(Some((50.0, 55.0))));
        assert_eq!(merged.string("output_unit"), Ok(Some("f".to_string())));
        assert_eq!(defaults.pair(LEVELS), Ok(Some((60.0, 70.0))));
    }

    #[test]
    fn test_choice() {
        let params = p("unit: f");
        assert_eq!(params.choice("unit", &["c", "f"]), Ok(Some("f".to_string())));
        assert_eq!(
            params.choice("unit", &["c", "k"]),
            Err(ConfigurationError::InvalidChoice {
                key: "unit".to_string(),
                value: "f".to_string(),
                expected: "c, k".to_string()
            })
        );
        assert_eq!(params.choice("other", &["c"]), Ok(None));
    }

    #[test]
    fn test_section_and_require() {
        let params = p("trend_compute:\n  period: 30\n");
        let trend = params.section("trend_compute").unwrap().unwrap();
        assert_eq!(trend.float("period"), Ok(Some(30.0)));
        assert!(params.require("trend_compute").is_ok());
        assert_eq!(
            params.require("levels"),
            Err(ConfigurationError::MissingKey("levels".to_string()))
        );
    }
}
