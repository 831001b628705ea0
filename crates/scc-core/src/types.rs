use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SccError};

/// Scalar-coupling type of an atom pair.
///
/// The discriminant order is the canonical order used by packed tensors,
/// mapping manifests and metric tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CouplingType {
    /// One-bond H-C coupling.
    #[serde(rename = "1JHC")]
    J1HC,
    /// Two-bond H-C coupling.
    #[serde(rename = "2JHC")]
    J2HC,
    /// Three-bond H-C coupling.
    #[serde(rename = "3JHC")]
    J3HC,
    /// One-bond H-N coupling.
    #[serde(rename = "1JHN")]
    J1HN,
    /// Two-bond H-N coupling.
    #[serde(rename = "2JHN")]
    J2HN,
    /// Three-bond H-N coupling.
    #[serde(rename = "3JHN")]
    J3HN,
    /// Two-bond H-H coupling.
    #[serde(rename = "2JHH")]
    J2HH,
    /// Three-bond H-H coupling.
    #[serde(rename = "3JHH")]
    J3HH,
}

impl CouplingType {
    /// Every coupling type in canonical order.
    pub const ALL: [CouplingType; 8] = [
        CouplingType::J1HC,
        CouplingType::J2HC,
        CouplingType::J3HC,
        CouplingType::J1HN,
        CouplingType::J2HN,
        CouplingType::J3HN,
        CouplingType::J2HH,
        CouplingType::J3HH,
    ];

    /// Returns the canonical index of the type.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolves a canonical index back into a type.
    pub fn from_index(index: usize) -> Result<Self, SccError> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            SccError::Schema(
                ErrorInfo::new("coupling-type-index", "coupling type index out of range")
                    .with_context("index", index),
            )
        })
    }

    /// Returns the label used in input tables, e.g. `2JHC`.
    pub fn label(self) -> &'static str {
        match self {
            CouplingType::J1HC => "1JHC",
            CouplingType::J2HC => "2JHC",
            CouplingType::J3HC => "3JHC",
            CouplingType::J1HN => "1JHN",
            CouplingType::J2HN => "2JHN",
            CouplingType::J3HN => "3JHN",
            CouplingType::J2HH => "2JHH",
            CouplingType::J3HH => "3JHH",
        }
    }
}

impl fmt::Display for CouplingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CouplingType {
    type Err = SccError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.label() == trimmed)
            .ok_or_else(|| {
                SccError::Schema(
                    ErrorInfo::new("coupling-type-parse", "unknown coupling type")
                        .with_context("value", trimmed)
                        .with_hint("expected one of 1JHC, 2JHC, 3JHC, 1JHN, 2JHN, 3JHN, 2JHH, 3JHH"),
                )
            })
    }
}

/// Identifier of an atom pair row in the coupling tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairId(u64);

impl PairId {
    /// Largest identifier the `f64` coupling block stores exactly (2^53).
    pub const MAX_EXACT: u64 = 1 << 53;

    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }

    /// Whether the identifier survives a round trip through `f64`.
    pub fn is_exact(&self) -> bool {
        self.0 <= Self::MAX_EXACT
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
