// File: csv.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;

use super::{ReportData, ReportGenerator};

pub struct CsvGenerator;

impl CsvGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for CsvGenerator {
    fn generate(&self, data: &ReportData) -> Result<String> {
        let mut csv = String::new();
        csv.push_str("trial,valid,invalid\n");

        for (trial, valid, invalid) in data.rows() {
            csv.push_str(&format!("{},{},{}\n", trial, valid, invalid));
        }

        Ok(csv)
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }
}
