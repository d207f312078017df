// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::config::SecuritySettings;
use crate::error::{ConfigError, Result, VizError};
use regex::Regex;
use tracing::warn;

/// Allow/block regexes over upper-cased table names. Both must agree for access.
#[derive(Debug, Clone)]
pub struct TableAccessPolicy {
    enabled: bool,
    allowed: Regex,
    blocked: Regex,
}

impl TableAccessPolicy {
    pub fn from_settings(settings: &SecuritySettings) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            enabled: settings.table_access_check,
            allowed: anchored("allowed_tables_pattern", &settings.allowed_tables_pattern)?,
            blocked: anchored("blocked_tables_pattern", &settings.blocked_tables_pattern)?,
        })
    }

    pub fn is_allowed(&self, table: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let upper = table.trim().to_ascii_uppercase();
        self.allowed.is_match(&upper) && !self.blocked.is_match(&upper)
    }

    pub fn check(&self, table: &str) -> Result<()> {
        if self.is_allowed(table) {
            Ok(())
        } else {
            warn!(table = %table, "Rejected table outside the access policy");
            Err(VizError::TableNotAllowed(table.to_string()))
        }
    }
}

/// Whole-string match semantics for user-supplied patterns.
fn anchored(name: &'static str, pattern: &str) -> std::result::Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidPattern {
        name,
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_dictionary_schemas_by_default() {
        let policy = TableAccessPolicy::from_settings(&SecuritySettings::default()).unwrap();
        assert!(policy.is_allowed("sales"));
        assert!(policy.is_allowed("HR.EMPLOYEES"));
        assert!(!policy.is_allowed("sys.user$"));
        assert!(!policy.is_allowed("SYSTEM_LOG"));
        assert!(matches!(policy.check("ORACLE_X"), Err(VizError::TableNotAllowed(_))));
    }

    #[test]
    fn allow_pattern_must_match_whole_name() {
        let settings = SecuritySettings {
            allowed_tables_pattern: "SALES|LOANS".into(),
            ..Default::default()
        };
        let policy = TableAccessPolicy::from_settings(&settings).unwrap();
        assert!(policy.is_allowed("loans"));
        assert!(!policy.is_allowed("SALES_ARCHIVE"));
    }

    #[test]
    fn disabled_check_admits_everything() {
        let settings = SecuritySettings {
            table_access_check: false,
            ..Default::default()
        };
        let policy = TableAccessPolicy::from_settings(&settings).unwrap();
        assert!(policy.is_allowed("SYS.OBJ$"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let settings = SecuritySettings {
            blocked_tables_pattern: "(".into(),
            ..Default::default()
        };
        assert!(TableAccessPolicy::from_settings(&settings).is_err());
    }
}
