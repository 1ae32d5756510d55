// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Column statistics records as they are exchanged with the catalog.
//!
//! Statistics are collected per partition: each partition holds a
//! [`PartitionStatistics`] record with one [`ColumnStatistics`] entry per
//! analyzed column. The summary payload is tagged by column type; only
//! string columns carry a payload variant here.

use serde_derive::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// Declared type of a column, as recorded in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Long,
    Double,
    Decimal,
    Date,
    Binary,
    Boolean,
}

/// Statistics of a single string-valued column over one row set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringColumnSummary {
    /// Length in bytes of the longest observed value.
    pub max_col_len: u64,
    /// Mean length in bytes over the non-null values.
    pub avg_col_len: f64,
    /// Number of null values.
    pub num_nulls: u64,
    /// Best known distinct value count.
    pub num_dvs: u64,
    /// Serialized distinct value sketch, if one was collected alongside the
    /// scalar summary. `None` and a zero-length blob both mean "no sketch".
    pub bitvectors: Option<Vec<u8>>,
}

impl StringColumnSummary {
    /// Returns the serialized sketch, treating an empty blob as absent.
    pub fn sketch_bytes(&self) -> Option<&[u8]> {
        match &self.bitvectors {
            Some(bytes) if !bytes.is_empty() => Some(bytes),
            _ => None,
        }
    }
}

impl Default for StringColumnSummary {
    fn default() -> Self {
        Self {
            max_col_len: 0,
            avg_col_len: 0.0,
            num_nulls: 0,
            num_dvs: 0,
            bitvectors: None,
        }
    }
}

/// Per-column summary payload, tagged by column type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnSummary {
    String(StringColumnSummary),
}

impl ColumnSummary {
    /// The column type this payload belongs to.
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnSummary::String(_) => ColumnType::String,
        }
    }

    /// Returns the string summary if this is a string payload.
    pub fn as_string(&self) -> Option<&StringColumnSummary> {
        match self {
            ColumnSummary::String(summary) => Some(summary),
        }
    }
}

/// Statistics of one column over one row set, together with the column's
/// identity. Also the shape of an aggregated (table-level) summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub column_name: String,
    pub column_type: ColumnType,
    pub data: ColumnSummary,
}

impl ColumnStatistics {
    /// An empty record for the given column, to be populated by an
    /// aggregator.
    pub fn empty(column_name: impl Into<String>, column_type: ColumnType) -> Result<Self> {
        let data = match column_type {
            ColumnType::String => ColumnSummary::String(StringColumnSummary::default()),
            other => {
                return Err(StatsError::Internal(format!(
                    "no summary payload defined for column type {:?}",
                    other
                )))
            }
        };
        Ok(Self {
            column_name: column_name.into(),
            column_type,
            data,
        })
    }
}

/// Statistics collected on one partition of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionStatistics {
    /// Name of the partition the statistics were collected on.
    pub partition_name: String,
    /// One entry per analyzed column.
    pub columns: Vec<ColumnStatistics>,
}

impl PartitionStatistics {
    pub fn new(partition_name: impl Into<String>, columns: Vec<ColumnStatistics>) -> Self {
        Self {
            partition_name: partition_name.into(),
            columns,
        }
    }
}
