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

use indexmap::IndexMap;
use serde_json::{json, Value as Json};

pub const DEFAULT_PALETTE: &str = "corporate";

/// Named five-colour palettes, darkest first.
#[derive(Debug, Clone)]
pub struct PaletteCatalog {
    palettes: IndexMap<String, [&'static str; 5]>,
}

impl Default for PaletteCatalog {
    fn default() -> Self {
        let palettes = [
            ("corporate", ["#1e3a8a", "#3b82f6", "#60a5fa", "#93c5fd", "#dbeafe"]),
            ("financial", ["#134e4a", "#059669", "#10b981", "#6ee7b7", "#d1fae5"]),
            ("executive", ["#7c2d12", "#dc2626", "#f87171", "#fca5a5", "#fecaca"]),
            ("ocean", ["#164e63", "#0891b2", "#06b6d4", "#67e8f9", "#cffafe"]),
            ("gradient_blue", ["#1e40af", "#3b82f6", "#60a5fa", "#93c5fd", "#dbeafe"]),
            ("gradient_green", ["#166534", "#16a34a", "#22c55e", "#4ade80", "#bbf7d0"]),
        ]
        .into_iter()
        .map(|(name, colors)| (name.to_string(), colors))
        .collect();
        Self { palettes }
    }
}

impl PaletteCatalog {
    /// Unknown names get the corporate palette.
    pub fn get(&self, name: &str) -> &[&'static str; 5] {
        self.palettes
            .get(&name.trim().to_ascii_lowercase())
            .or_else(|| self.palettes.get(DEFAULT_PALETTE))
            .unwrap_or(&CORPORATE)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.palettes.keys().map(String::as_str)
    }
}

const CORPORATE: [&str; 5] = ["#1e3a8a", "#3b82f6", "#60a5fa", "#93c5fd", "#dbeafe"];

pub fn title(text: &str) -> Json {
    json!({
        "text": text,
        "fontSize": 18,
        "fontWeight": "bold",
        "color": "#1f2937",
        "anchor": "start",
        "offset": 20,
    })
}

/// Vega-Lite `config` block shared by every themed chart.
pub fn theme_config(palette: &[&str; 5]) -> Json {
    json!({
        "background": "#f8fafc",
        "padding": 40,
        "axis": {
            "domainColor": "#64748b",
            "tickColor": "#64748b",
            "labelColor": "#374151",
            "titleColor": "#1f2937",
            "gridColor": "#e2e8f0",
            "gridOpacity": 0.5,
        },
        "range": { "category": palette },
        "view": { "stroke": null },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_palette_falls_back_to_corporate() {
        let catalog = PaletteCatalog::default();
        assert_eq!(catalog.get("Financial")[1], "#059669");
        assert_eq!(catalog.get("neon"), catalog.get("corporate"));
        assert_eq!(catalog.names().count(), 6);
    }
}
