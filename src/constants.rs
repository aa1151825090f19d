// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

pub const VERSION: &str = "2.4.0b1";

/// Agent output read from stdin instead of a file.
pub const STDIN_MARKER: &str = "-";

use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
pub mod log {
    use flexi_logger::{Cleanup, Criterion, Naming};
    pub const FILE_BASENAME: &str = "check-plugins";
    pub const FILE_MAX_SIZE: Criterion = Criterion::Size(500000);
    pub const FILE_NAMING: Naming = Naming::Numbers;
    pub const FILE_CLEANUP: Cleanup = Cleanup::KeepLogFiles(5);
}

pub mod environment {
    pub const CONFIG_NAME: &str = "check-plugins.yml";
    pub const STATE_NAME: &str = "check-plugins.values.json";
    pub const CONFIG_DIR_ENV_VAR: &str = "MK_CONFDIR";
    pub const LOG_DIR_ENV_VAR: &str = "MK_LOGDIR";
    pub const VAR_DIR_ENV_VAR: &str = "MK_VARDIR";
}

lazy_static! {
    pub static ref DEFAULT_CONFIG_FILE: PathBuf =
        Path::new(&get_env_value(environment::CONFIG_DIR_ENV_VAR, "."))
            .join(environment::CONFIG_NAME);
    pub static ref ENV_LOG_DIR: Option<PathBuf> = env_path(environment::LOG_DIR_ENV_VAR);
    /// Counters survive between runs only if a var dir is known or a state
    /// file is configured.
    pub static ref ENV_STATE_FILE: Option<PathBuf> =
        env_path(environment::VAR_DIR_ENV_VAR).map(|dir| dir.join(environment::STATE_NAME));
}

fn get_env_value(var: &str, on_lack: &str) -> String {
    std::env::var(var).unwrap_or(on_lack.to_string())
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).map(PathBuf::from)
}
