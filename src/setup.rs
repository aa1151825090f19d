// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::args::{Args, Command};
use crate::config::CheckConfig;
use crate::constants;
use anyhow::Result;
use clap::Parser;
use flexi_logger::{self, FileSpec, LogSpecification, LoggerHandle};
use std::env::ArgsOs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTo {
    Null,
    Stderr,
}

/// Where and how much to log.
#[derive(Debug, PartialEq)]
pub struct LogSettings {
    pub level: String,
    pub dir: Option<PathBuf>,
    pub send_to: SendTo,
}

impl LogSettings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            level: args.logging_level(),
            dir: args.log_dir.clone().or_else(|| constants::ENV_LOG_DIR.clone()),
            send_to: if args.display_log {
                SendTo::Stderr
            } else {
                SendTo::Null
            },
        }
    }

    pub fn start(&self) -> Result<LoggerHandle> {
        let mut logger = flexi_logger::Logger::with(LogSpecification::parse(&self.level)?);

        logger = match self.dir {
            Some(ref dir) => logger
                .log_to_file(make_log_file_spec(dir))
                .rotate(
                    constants::log::FILE_MAX_SIZE,
                    constants::log::FILE_NAMING,
                    constants::log::FILE_CLEANUP,
                )
                .append(),
            None => logger.do_not_log(),
        };

        logger = match self.send_to {
            SendTo::Null => logger
                .duplicate_to_stderr(flexi_logger::Duplicate::None)
                .duplicate_to_stdout(flexi_logger::Duplicate::None),
            SendTo::Stderr => logger.log_to_stderr(),
        };

        Ok(logger.format(flexi_logger::detailed_format).start()?)
    }
}

pub struct Env {
    pub command: Command,
    pub config: CheckConfig,
    logger: LoggerHandle,
}

impl Env {
    /// `std::process::exit` skips destructors, the file log must be flushed before.
    pub fn flush_log(&self) {
        self.logger.flush();
    }
}

pub fn init(args: ArgsOs) -> Result<Env> {
    let args = Args::parse_from(args);
    let logger = LogSettings::from_args(&args).start()?;
    let mut config = get_check_config(&args)?;
    let state_file = args.state_file.clone().or_else(|| match config.state_file() {
        Some(_) => None,
        None => constants::ENV_STATE_FILE.clone(),
    });
    if let Some(state_file) = state_file {
        config.set_state_file(state_file);
    }
    log::info!("state file: {:?}", config.state_file());
    Ok(Env {
        command: args.command,
        config,
        logger,
    })
}

/// An explicitly given config file must exist, the default one may be absent.
fn get_check_config(args: &Args) -> Result<CheckConfig> {
    match args.config_file {
        Some(ref config_file) => CheckConfig::load_file(config_file),
        None if constants::DEFAULT_CONFIG_FILE.exists() => {
            CheckConfig::load_file(&constants::DEFAULT_CONFIG_FILE)
        }
        None => {
            log::info!(
                "{} absent, using defaults",
                constants::DEFAULT_CONFIG_FILE.display()
            );
            Ok(CheckConfig::default())
        }
    }
}

fn make_log_file_spec(log_dir: &Path) -> FileSpec {
    FileSpec::default()
        .directory(log_dir.to_owned())
        .suppress_timestamp()
        .basename(constants::log::FILE_BASENAME)
}
