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

//! Identifier and clause sanitization for SQL text assembly.
//!
//! Identifiers are never bound as parameters, so everything that lands in
//! query text passes through a [`Sanitizer`] first. `Strict` rejects input
//! outside the allow-list; `Legacy` strips offending characters instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_#$]*$").expect("valid identifier regex"));

static TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_#$]*(\.[A-Za-z_][A-Za-z0-9_#$]*)?$")
        .expect("valid table regex")
});

static ORDER_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Za-z_][A-Za-z0-9_#$]*)(\s+(ASC|DESC))?(\s+NULLS\s+(FIRST|LAST))?$")
        .expect("valid order-by regex")
});

static DANGEROUS_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(drop|delete|truncate|insert|update|create|alter|exec|execute|grant|revoke)\b",
    )
    .expect("valid keyword regex")
});

static DANGEROUS_SUBSTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(drop|delete|truncate|insert|update|create|alter|execute|exec|grant|revoke)")
        .expect("valid keyword regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizeMode {
    #[default]
    Strict,
    Legacy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("{kind} name is empty")]
    Empty { kind: &'static str },
    #[error("{kind} name '{value}' is not a valid identifier")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("WHERE clause contains forbidden keyword '{0}'")]
    ForbiddenKeyword(String),
    #[error("WHERE clause contains forbidden token '{0}'")]
    ForbiddenToken(String),
    #[error("ORDER BY item '{0}' is not a column with an optional direction")]
    InvalidOrderBy(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    mode: SanitizeMode,
}

impl Sanitizer {
    pub const fn new(mode: SanitizeMode) -> Self {
        Self { mode }
    }

    pub const fn mode(&self) -> SanitizeMode {
        self.mode
    }

    /// Table identifier, optionally schema-qualified (`OWNER.TABLE`). Upper-cased.
    pub fn table_name(&self, raw: &str) -> Result<String, SanitizeError> {
        let trimmed = raw.trim();
        match self.mode {
            SanitizeMode::Strict => {
                if trimmed.is_empty() {
                    return Err(SanitizeError::Empty { kind: "table" });
                }
                if !TABLE_RE.is_match(trimmed) {
                    return Err(SanitizeError::InvalidIdentifier {
                        kind: "table",
                        value: trimmed.to_string(),
                    });
                }
                Ok(trimmed.to_ascii_uppercase())
            }
            SanitizeMode::Legacy => {
                let out = strip_table_chars(trimmed);
                if out.is_empty() {
                    return Err(SanitizeError::Empty { kind: "table" });
                }
                Ok(out)
            }
        }
    }

    pub fn column_name(&self, raw: &str) -> Result<String, SanitizeError> {
        let trimmed = raw.trim();
        match self.mode {
            SanitizeMode::Strict => {
                if trimmed.is_empty() {
                    return Err(SanitizeError::Empty { kind: "column" });
                }
                if !IDENT_RE.is_match(trimmed) {
                    return Err(SanitizeError::InvalidIdentifier {
                        kind: "column",
                        value: trimmed.to_string(),
                    });
                }
                Ok(trimmed.to_ascii_uppercase())
            }
            SanitizeMode::Legacy => {
                let out = strip_column_chars(trimmed);
                if out.is_empty() {
                    return Err(SanitizeError::Empty { kind: "column" });
                }
                Ok(out)
            }
        }
    }

    pub fn where_clause(&self, raw: &str) -> Result<String, SanitizeError> {
        match self.mode {
            SanitizeMode::Strict => {
                let trimmed = raw.trim();
                for token in [";", "--", "/*"] {
                    if trimmed.contains(token) {
                        return Err(SanitizeError::ForbiddenToken(token.to_string()));
                    }
                }
                if let Some(m) = DANGEROUS_WORD_RE.find(trimmed) {
                    return Err(SanitizeError::ForbiddenKeyword(m.as_str().to_ascii_uppercase()));
                }
                Ok(trimmed.to_string())
            }
            SanitizeMode::Legacy => Ok(strip_dangerous_keywords(raw)),
        }
    }

    pub fn order_by(&self, raw: &str) -> Result<String, SanitizeError> {
        match self.mode {
            SanitizeMode::Strict => {
                let mut items = Vec::new();
                for item in raw.split(',') {
                    let item = item.trim();
                    let caps = ORDER_ITEM_RE
                        .captures(item)
                        .ok_or_else(|| SanitizeError::InvalidOrderBy(item.to_string()))?;
                    let mut normalized = caps[1].to_ascii_uppercase();
                    if let Some(dir) = caps.get(3) {
                        normalized.push(' ');
                        normalized.push_str(&dir.as_str().to_ascii_uppercase());
                    }
                    if let Some(nulls) = caps.get(5) {
                        normalized.push_str(" NULLS ");
                        normalized.push_str(&nulls.as_str().to_ascii_uppercase());
                    }
                    items.push(normalized);
                }
                Ok(items.join(", "))
            }
            SanitizeMode::Legacy => {
                let out: String = raw
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '$' | ',' | ' '))
                    .collect();
                Ok(out.trim().to_ascii_uppercase())
            }
        }
    }
}

pub fn strip_column_chars(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '$'))
        .collect::<String>()
        .to_ascii_uppercase()
}

pub fn strip_table_chars(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '$' | '.'))
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Removes data-modifying verbs until none remain, so the result is a fixed point.
pub fn strip_dangerous_keywords(s: &str) -> String {
    let mut current = s.trim().to_string();
    let mut removed = false;
    loop {
        let next = DANGEROUS_SUBSTR_RE.replace_all(&current, "");
        let next = next.trim();
        if next == current {
            break;
        }
        removed = true;
        current = next.to_string();
    }
    if removed {
        warn!(original = %s, sanitized = %current, "Removed forbidden keywords from WHERE clause");
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_strip_reaches_fixed_point() {
        assert_eq!(strip_dangerous_keywords("ddroprop x = 1"), "x = 1");
        assert_eq!(strip_dangerous_keywords("a = 1 DELETE"), "a = 1");
    }

    #[test]
    fn strict_order_by_normalizes_items() {
        let s = Sanitizer::new(SanitizeMode::Strict);
        assert_eq!(
            s.order_by("amount desc,  region asc nulls last").unwrap(),
            "AMOUNT DESC, REGION ASC NULLS LAST"
        );
        assert!(s.order_by("amount; drop").is_err());
    }
}
