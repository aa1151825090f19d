// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::check::CheckResult;
use crate::params::{ConfigurationError, Parameters};
use crate::table::{RawTable, SectionError};
use crate::value_store::{RateError, ValueStore};
use std::any::Any;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use typed_builder::TypedBuilder;

/// A parsed section with its concrete type erased.
pub type Section = Box<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Service {
    pub item: Option<String>,
    pub parameters: Parameters,
}

impl Service {
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: Some(item.into()),
            parameters: Parameters::default(),
        }
    }

    pub fn without_item() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    RateUnavailable(#[from] RateError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("section of {0} has an unexpected type")]
    SectionType(&'static str),
}

pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// What a check may use beside its section: the rate memory and the clock.
#[derive(TypedBuilder)]
pub struct CheckContext<'a> {
    value_store: &'a mut dyn ValueStore,
    #[builder(default = crate::plugin::now())]
    now: f64,
}

impl CheckContext<'_> {
    pub fn value_store(&mut self) -> &mut dyn ValueStore {
        &mut *self.value_store
    }

    pub fn now(&self) -> f64 {
        self.now
    }
}

/// A check with a concrete section type.
pub trait CheckPlugin: Send + Sync + 'static {
    type Section: Send + Sync + 'static;

    const NAME: &'static str;
    /// `%s` is replaced by the item.
    const SERVICE_NAME: &'static str;

    /// Raw tables this check consumes, in order.
    fn sections(&self) -> Vec<&'static str> {
        vec![Self::NAME]
    }

    fn parse(&self, tables: &[RawTable]) -> Result<Self::Section, SectionError>;

    fn discover<'a>(
        &'a self,
        section: &'a Self::Section,
        params: &'a Parameters,
    ) -> impl Iterator<Item = Service> + 'a;

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Self::Section,
        ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError>;

    fn default_parameters(&self) -> Parameters {
        Parameters::default()
    }

    fn discovery_parameters(&self) -> Parameters {
        Parameters::default()
    }

    fn validate_parameters(&self, params: &Parameters) -> Result<(), ConfigurationError> {
        params.upper_levels()?;
        params.lower_levels()?;
        Ok(())
    }
}

/// The object safe face of a check, as stored in the registry.
pub trait CheckDefinition: Send + Sync {
    fn name(&self) -> &str;
    fn sections(&self) -> Vec<&str>;
    fn service_description(&self, item: Option<&str>) -> String;
    fn default_parameters(&self) -> Parameters;
    fn discovery_parameters(&self) -> Parameters;
    fn validate_parameters(&self, params: &Parameters) -> Result<(), ConfigurationError>;
    fn parse(&self, tables: &[RawTable]) -> Result<Section, SectionError>;
    fn discover(&self, section: &Section, params: &Parameters) -> Result<Vec<Service>, CheckError>;
    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Section,
        ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError>;

    /// Defaults overlaid with user parameters.
    fn effective_parameters(&self, user: &Parameters) -> Parameters {
        self.default_parameters().updated(user)
    }
}

pub fn service_description(template: &str, item: Option<&str>) -> String {
    match item {
        Some(item) => template.replace("%s", item),
        None => template.replace("%s", "").trim().to_string(),
    }
}

/// Drops repeated items, keeping the first occurrence.
pub fn dedup_services(services: impl IntoIterator<Item = Service>) -> Vec<Service> {
    let mut seen = HashSet::new();
    services
        .into_iter()
        .filter(|service| seen.insert(service.item.clone()))
        .collect()
}

pub struct Plugin<P>(P);

impl<P: CheckPlugin> Plugin<P> {
    pub fn new(plugin: P) -> Self {
        Self(plugin)
    }

    fn downcast(section: &Section) -> Result<&P::Section, CheckError> {
        (**section)
            .downcast_ref::<P::Section>()
            .ok_or(CheckError::SectionType(P::NAME))
    }
}

impl<P: CheckPlugin> CheckDefinition for Plugin<P> {
    fn name(&self) -> &str {
        P::NAME
    }

    fn sections(&self) -> Vec<&str> {
        self.0.sections()
    }

    fn service_description(&self, item: Option<&str>) -> String {
        service_description(P::SERVICE_NAME, item)
    }

    fn default_parameters(&self) -> Parameters {
        self.0.default_parameters()
    }

    fn discovery_parameters(&self) -> Parameters {
        self.0.discovery_parameters()
    }

    fn validate_parameters(&self, params: &Parameters) -> Result<(), ConfigurationError> {
        self.0.validate_parameters(params)
    }

    fn parse(&self, tables: &[RawTable]) -> Result<Section, SectionError> {
        Ok(Box::new(self.0.parse(tables)?))
    }

    fn discover(&self, section: &Section, params: &Parameters) -> Result<Vec<Service>, CheckError> {
        let section = Self::downcast(section)?;
        let params = self.0.discovery_parameters().updated(params);
        Ok(dedup_services(self.0.discover(section, &params)))
    }

    fn check(
        &self,
        item: Option<&str>,
        params: &Parameters,
        section: &Section,
        ctx: &mut CheckContext,
    ) -> Result<Vec<CheckResult>, CheckError> {
        self.0.check(item, params, Self::downcast(section)?, ctx)
    }
}
