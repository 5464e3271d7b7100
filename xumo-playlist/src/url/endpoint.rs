use std::collections::HashMap;

use anyhow::{Result, anyhow};
use regex::Regex;

/**
    Variables available to upstream URL templates, filled into `{name}` slots.
*/
#[derive(Debug, Default, Clone)]
pub struct EndpointVars {
    values: HashMap<&'static str, String>,
}

impl EndpointVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.values.insert(name, value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.values.get(name)
    }

    /**
        Interpolate a template, replacing `{name}` with its value.

        Every placeholder must be defined; the error names the first one that isn't.
    */
    pub fn interpolate(&self, template: &str) -> Result<String> {
        let re = Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}")?;

        let mut missing = None;
        let result = re.replace_all(template, |cap: &regex::Captures| match self.get(&cap[1]) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| cap[1].to_string());
                String::new()
            }
        });

        if let Some(name) = missing {
            return Err(anyhow!("Undefined variable '{}' in '{}'", name, template));
        }

        Ok(result.into_owned())
    }
}
