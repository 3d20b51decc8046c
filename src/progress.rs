use std::borrow::Cow;

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};

const DEFAULT_TEMPLATE: &str =
    "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Progress bar settings shared by the pipeline and the writers
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    is_enabled: bool,
    template: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            is_enabled: true,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl ProgressConfig {
    pub fn new(is_enabled: bool, template: String) -> Self {
        ProgressConfig {
            is_enabled,
            template,
        }
    }

    pub fn disabled() -> Self {
        ProgressConfig {
            is_enabled: false,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    /// Build a bar of `length` steps. Hidden when progress is disabled.
    pub fn build<T: TryInto<u64>>(
        &self,
        length: T,
        message: impl Into<Cow<'static, str>>,
    ) -> Result<ProgressBar> {
        if !self.is_enabled() {
            return Ok(ProgressBar::hidden());
        }
        let length = length
            .try_into()
            .map_err(|_e| anyhow!("Failed to convert length into u64"))?;

        let pb = ProgressBar::new(length);
        pb.set_style(ProgressStyle::default_bar().template(&self.template)?);
        pb.set_message(message);

        Ok(pb)
    }
}
