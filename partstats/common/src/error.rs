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

//! Error types for the partition statistics crates

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::result;

/// Result type for operations that could result in a [StatsError]
pub type Result<T> = result::Result<T, StatsError>;

/// Error type for statistics aggregation operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// An input record violated the aggregation contract, for example a
    /// partition record carrying more than one column summary, a partition
    /// outside the requested set, or an undecodable distinct value sketch.
    MalformedInput(String),
    /// An invariant that the aggregation code is expected to uphold was
    /// broken.
    Internal(String),
}

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            StatsError::MalformedInput(desc) => {
                write!(f, "Malformed input: {}", desc)
            }
            StatsError::Internal(desc) => {
                write!(
                    f,
                    "Internal error: {}. This was likely caused by a bug in the \
                    statistics aggregation code",
                    desc
                )
            }
        }
    }
}

impl Error for StatsError {}
