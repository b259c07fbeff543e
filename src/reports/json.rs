// File: json.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use serde_json;

use super::{ReportData, ReportGenerator};

pub struct JsonGenerator;

impl JsonGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for JsonGenerator {
    fn generate(&self, data: &ReportData) -> Result<String> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| anyhow::anyhow!("Failed to serialize report to JSON: {}", e))?;
        Ok(json)
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::sample_report;
    use serde_json::Value;

    #[test]
    fn test_json_report_structure() {
        let json = JsonGenerator::new().generate(&sample_report()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["trials"].as_array().unwrap().len(), 4);
        assert_eq!(value["valid"].as_array().unwrap().len(), 4);
        assert_eq!(value["invalid"].as_array().unwrap().len(), 4);
        assert_eq!(value["precision"], 3);
        assert!(value["comparison"]["welch_t"].is_number());
        assert!(value["comparison"]["leak_suspected"].as_bool().unwrap());
        assert!(value["y_axis"]["min"].as_f64().unwrap() < value["y_axis"]["max"].as_f64().unwrap());
    }
}
