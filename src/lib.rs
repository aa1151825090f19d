// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

pub mod agent_output;
pub mod args;
pub mod check;
pub mod checks;
pub mod config;
pub mod constants;
pub mod legacy;
pub mod levels;
pub mod modes;
pub mod params;
pub mod plugin;
pub mod registry;
pub mod runner;
pub mod setup;
pub mod table;
pub mod value_store;
