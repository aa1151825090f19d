// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use anyhow::Result as AnyhowResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredValue {
    Counter {
        timestamp: f64,
        value: f64,
    },
    Average {
        started: f64,
        timestamp: f64,
        value: f64,
    },
}

impl StoredValue {
    pub fn timestamp(&self) -> f64 {
        match self {
            Self::Counter { timestamp, .. } | Self::Average { timestamp, .. } => *timestamp,
        }
    }
}

/// Entries not updated for a week belong to services that are gone.
pub const MAX_AGE: f64 = 7.0 * 24.0 * 3600.0;

/// Per key memory of the previous evaluation, the only state a check keeps
/// between two cycles.
pub trait ValueStore {
    fn load(&self, key: &str) -> Option<StoredValue>;
    fn store(&mut self, key: &str, value: StoredValue);
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateError {
    #[error("Initialized: {0:?}")]
    Initialized(String),
    #[error("No time difference: {0:?}")]
    NoTimeDifference(String),
    #[error("Value overflow: {0:?}")]
    Overflow(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct MemoryValueStore {
    values: BTreeMap<String, StoredValue>,
}

impl MemoryValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Drops the entries last written before `oldest`, returns how many.
    pub fn prune(&mut self, oldest: f64) -> usize {
        let before = self.values.len();
        self.values.retain(|_, value| value.timestamp() >= oldest);
        before - self.values.len()
    }
}

impl ValueStore for MemoryValueStore {
    fn load(&self, key: &str) -> Option<StoredValue> {
        self.values.get(key).copied()
    }

    fn store(&mut self, key: &str, value: StoredValue) {
        self.values.insert(key.to_string(), value);
    }
}

/// Value store persisted as JSON between two runs of the binary.
#[derive(Debug)]
pub struct FileValueStore {
    path: PathBuf,
    values: MemoryValueStore,
}

impl FileValueStore {
    /// A missing file is an empty store.
    pub fn load_missing_safe(path: &Path) -> AnyhowResult<Self> {
        let values = if path.exists() {
            serde_json::from_str(&fs::read_to_string(path)?)?
        } else {
            MemoryValueStore::default()
        };
        Ok(Self {
            path: path.to_owned(),
            values,
        })
    }

    pub fn prune(&mut self, now: f64) {
        let pruned = self.values.prune(now - MAX_AGE);
        if pruned > 0 {
            log::info!("dropped {} outdated values from {:?}", pruned, self.path);
        }
    }

    pub fn save(&self) -> AnyhowResult<()> {
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&self.values)?)?;
        fs::rename(&tmp_path, &self.path)?;
        log::debug!("saved {} values to {:?}", self.values.len(), self.path);
        Ok(())
    }

    pub fn values(&self) -> &MemoryValueStore {
        &self.values
    }
}

impl ValueStore for FileValueStore {
    fn load(&self, key: &str) -> Option<StoredValue> {
        self.values.load(key)
    }

    fn store(&mut self, key: &str, value: StoredValue) {
        self.values.store(key, value)
    }
}

/// Namespaces all keys, so that different services never share an entry.
pub struct ScopedValueStore<'a> {
    inner: &'a mut dyn ValueStore,
    prefix: String,
}

impl<'a> ScopedValueStore<'a> {
    pub fn new(inner: &'a mut dyn ValueStore, check: &str, item: Option<&str>) -> Self {
        Self {
            inner,
            prefix: format!("{}.{}", check, item.unwrap_or_default()),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

impl ValueStore for ScopedValueStore<'_> {
    fn load(&self, key: &str) -> Option<StoredValue> {
        self.inner.load(&self.scoped(key))
    }

    fn store(&mut self, key: &str, value: StoredValue) {
        let key = self.scoped(key);
        self.inner.store(&key, value)
    }
}

/// Rate per second since the previous call for `key`.
///
/// The current value is always stored, even if no rate can be computed, so
/// the next cycle has a reference point.
pub fn get_rate(
    store: &mut dyn ValueStore,
    key: &str,
    now: f64,
    value: f64,
    raise_overflow: bool,
) -> Result<f64, RateError> {
    let last = store.load(key);
    store.store(
        key,
        StoredValue::Counter {
            timestamp: now,
            value,
        },
    );
    let (last_time, last_value) = match last {
        Some(StoredValue::Counter { timestamp, value }) => (timestamp, value),
        _ => return Err(RateError::Initialized(key.to_string())),
    };
    if now <= last_time {
        return Err(RateError::NoTimeDifference(key.to_string()));
    }
    let rate = (value - last_value) / (now - last_time);
    if raise_overflow && rate < 0.0 {
        return Err(RateError::Overflow(key.to_string()));
    }
    Ok(rate)
}

/// Exponential moving average over `backlog_minutes`.
///
/// The first call returns `value` itself. While less than one backlog has
/// passed since the first call, samples are weighted like an arithmetic mean.
pub fn get_average(
    store: &mut dyn ValueStore,
    key: &str,
    now: f64,
    value: f64,
    backlog_minutes: f64,
) -> f64 {
    let (started, last_time, last_average) = match store.load(key) {
        Some(StoredValue::Average {
            started,
            timestamp,
            value,
        }) => (started, timestamp, value),
        _ => {
            store.store(
                key,
                StoredValue::Average {
                    started: now,
                    timestamp: now,
                    value,
                },
            );
            return value;
        }
    };
    if now <= last_time {
        return last_average;
    }
    let backlog = backlog_minutes * 60.0;
    let weight = if backlog <= 0.0 {
        0.0
    } else if now - started < backlog {
        (last_time - started) / (now - started)
    } else {
        0.5_f64.powf((now - last_time) / backlog)
    };
    let average = last_average * weight + value * (1.0 - weight);
    store.store(
        key,
        StoredValue::Average {
            started,
            timestamp: now,
            value: average,
        },
    );
    average
}

#[cfg(test)]
mod test_rate {
    use super::*;

    #[test]
    fn test_first_call_initializes() {
        let mut store = MemoryValueStore::new();
        assert_eq!(
            get_rate(&mut store, "in", 0.0, 100.0, true),
            Err(RateError::Initialized("in".to_string()))
        );
        assert_eq!(
            store.load("in"),
            Some(StoredValue::Counter {
                timestamp: 0.0,
                value: 100.0
            })
        );
        assert_eq!(get_rate(&mut store, "in", 10.0, 600.0, true), Ok(50.0));
    }

    #[test]
    fn test_no_time_difference() {
        let mut store = MemoryValueStore::new();
        let _ = get_rate(&mut store, "k", 10.0, 1.0, false);
        assert_eq!(
            get_rate(&mut store, "k", 10.0, 2.0, false),
            Err(RateError::NoTimeDifference("k".to_string()))
        );
        assert_eq!(
            RateError::NoTimeDifference("k".to_string()).to_string(),
            "No time difference: \"k\""
        );
    }

    #[test]
    fn test_overflow() {
        let mut store = MemoryValueStore::new();
        let _ = get_rate(&mut store, "k", 0.0, 100.0, true);
        assert_eq!(
            get_rate(&mut store, "k", 10.0, 0.0, true),
            Err(RateError::Overflow("k".to_string()))
        );
        // The wrapped value is the new reference point.
        assert_eq!(get_rate(&mut store, "k", 20.0, 50.0, true), Ok(5.0));
        let _ = get_rate(&mut store, "j", 0.0, 100.0, false);
        assert_eq!(get_rate(&mut store, "j", 10.0, 0.0, false), Ok(-10.0));
    }

    #[test]
    fn test_scoped_keys_do_not_collide() {
        let mut store = MemoryValueStore::new();
        {
            let mut a = ScopedValueStore::new(&mut store, "if_octets", Some("eth0"));
            let _ = get_rate(&mut a, "in", 0.0, 1.0, true);
        }
        {
            let mut b = ScopedValueStore::new(&mut store, "if_octets", Some("eth1"));
            assert!(get_rate(&mut b, "in", 10.0, 1.0, true).is_err());
        }
        assert_eq!(
            store.keys().collect::<Vec<_>>(),
            vec!["if_octets.eth0:in", "if_octets.eth1:in"]
        );
    }
}
