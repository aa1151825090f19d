// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

pub mod akcp;
pub mod decitemp;
pub mod eltek_fans;
pub mod if_octets;
pub mod legacy_psu;
pub mod temperature;

use crate::registry::{Registry, RegistryError};

pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_plugin(decitemp::DeciTemp)?;
    registry.register_plugin(akcp::AkcpTemp)?;
    registry.register_plugin(akcp::AkcpHumidity)?;
    registry.register_plugin(akcp::AkcpDryContact)?;
    registry.register_plugin(eltek_fans::EltekFans)?;
    registry.register_plugin(if_octets::IfOctets)?;
    registry.register_legacy(legacy_psu::check_info())?;
    Ok(())
}
