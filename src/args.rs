// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::constants;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Parse, discover and check agent sections.", version = constants::VERSION)]
pub struct Args {
    /// Enable verbose output. Use once (-v) for logging level DEBUG and twice (-vv) for logging
    /// level TRACE.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Sends log to stderr.
    #[arg(short = 'l', long, global = true)]
    pub display_log: bool,

    /// Use custom log dir
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Use custom config file
    #[arg(short, long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Keep counters and averages in this JSON file between runs
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Lists the registered checks
    List,

    /// Prints the services a check finds in the agent output
    Discover {
        #[arg(long)]
        check: String,

        /// File with agent output, `-` for stdin
        #[arg(long)]
        agent_output: PathBuf,
    },

    /// Checks one item
    Check {
        #[arg(long)]
        check: String,

        #[arg(long)]
        item: Option<String>,

        /// File with agent output, `-` for stdin
        #[arg(long)]
        agent_output: PathBuf,

        /// Parameters as YAML mapping, take precedence over configured rules
        #[arg(long)]
        params: Option<String>,
    },

    /// Discovers and checks everything in the agent output
    Run {
        /// File with agent output, `-` for stdin
        #[arg(long)]
        agent_output: PathBuf,
    },
}

impl Args {
    pub fn logging_level(&self) -> String {
        match self.verbose {
            2.. => String::from("trace"),
            1 => String::from("debug"),
            _ => String::from("info"),
        }
    }
}
