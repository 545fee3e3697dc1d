// Device name filter: exact ignore list plus an optional exclude or include pattern.

use regex::Regex;
use std::collections::BTreeSet;

/// Read-only rule set deciding which devices a collection pass skips.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    ignored: BTreeSet<String>,
    exclude: Option<Regex>,
    include: Option<Regex>,
}

impl DeviceFilter {
    /// Builds a filter. `exclude` and `include` are mutually exclusive; config
    /// validation rejects both being set, and here `exclude` wins.
    pub fn new<I, S>(
        ignored: I,
        exclude: Option<&str>,
        include: Option<&str>,
    ) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let exclude = exclude.map(Regex::new).transpose()?;
        let include = match exclude {
            Some(_) => None,
            None => include.map(Regex::new).transpose()?,
        };
        Ok(Self {
            ignored: ignored.into_iter().map(Into::into).collect(),
            exclude,
            include,
        })
    }

    /// A filter that keeps every device.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns true when `name` must be left out of the pass.
    pub fn ignored(&self, name: &str) -> bool {
        if self.ignored.contains(name) {
            return true;
        }
        if let Some(re) = &self.exclude {
            return re.is_match(name);
        }
        if let Some(re) = &self.include {
            return !re.is_match(name);
        }
        false
    }
}
