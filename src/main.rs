// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use check_plugins::check::bail_out;
use check_plugins::{modes, setup};
use log::info;

fn main() {
    let env = match setup::init(std::env::args_os()) {
        Ok(env) => env,
        Err(e) => bail_out(format!("{e:#}")),
    };
    let output = modes::exec(&env.command, &env.config);
    match output {
        Ok(output) => {
            if !output.text.is_empty() {
                println!("{}", output.text);
            }
            info!("Success");
            env.flush_log();
            std::process::exit(output.code)
        }
        Err(e) => {
            log::error!("{e:#}");
            env.flush_log();
            bail_out(format!("{e:#}"))
        }
    }
}
