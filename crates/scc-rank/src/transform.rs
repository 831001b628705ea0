use std::collections::BTreeMap;

use log::debug;
use scc_core::{CouplingRecord, CouplingSlot, CouplingType, ErrorInfo, SccError};
use serde::{Deserialize, Serialize};

use crate::mapping::RankMapping;

/// Fitted GaussRank tables of one fold, one independent table per type.
///
/// Built once by [`GaussRankMap::fit`] and only read afterwards; callers
/// thread it explicitly through scoring, training and reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussRankMap {
    fold: u32,
    mappings: BTreeMap<CouplingType, RankMapping>,
}

impl GaussRankMap {
    /// Fits one table per coupling type present in `records`.
    pub fn fit(records: &[CouplingRecord], fold: u32) -> Result<Self, SccError> {
        Self::fit_values(
            fold,
            records
                .iter()
                .map(|record| (record.coupling_type, record.scalar_coupling_constant)),
        )
    }

    /// Fits from `(type, raw value)` pairs.
    pub fn fit_values<I>(fold: u32, values: I) -> Result<Self, SccError>
    where
        I: IntoIterator<Item = (CouplingType, f64)>,
    {
        let mut grouped: BTreeMap<CouplingType, Vec<f64>> = BTreeMap::new();
        for (coupling_type, value) in values {
            grouped.entry(coupling_type).or_default().push(value);
        }
        let mut mappings = BTreeMap::new();
        for (coupling_type, raw) in grouped {
            let mapping = RankMapping::fit(coupling_type, &raw)
                .map_err(|err| err.with_context("fold", fold))?;
            debug!(
                "fold {fold}: fitted {coupling_type} rank table ({} values, {} distinct)",
                mapping.observations(),
                mapping.len()
            );
            mappings.insert(coupling_type, mapping);
        }
        Ok(Self { fold, mappings })
    }

    /// Assembles a map from already fitted tables.
    pub fn from_mappings(
        fold: u32,
        tables: impl IntoIterator<Item = RankMapping>,
    ) -> Result<Self, SccError> {
        let mut mappings = BTreeMap::new();
        for table in tables {
            let coupling_type = table.coupling_type();
            if mappings.insert(coupling_type, table).is_some() {
                return Err(SccError::Schema(
                    ErrorInfo::new("rank-duplicate-type", "coupling type mapped twice")
                        .with_context("fold", fold)
                        .with_context("coupling_type", coupling_type),
                ));
            }
        }
        Ok(Self { fold, mappings })
    }

    /// Fold the tables were fitted for.
    pub fn fold(&self) -> u32 {
        self.fold
    }

    /// Coupling types with a fitted table, in canonical order.
    pub fn types(&self) -> impl Iterator<Item = CouplingType> + '_ {
        self.mappings.keys().copied()
    }

    /// Fitted tables in canonical type order.
    pub fn mappings(&self) -> impl Iterator<Item = &RankMapping> {
        self.mappings.values()
    }

    /// Returns the table of `coupling_type`, failing for unfitted types.
    pub fn mapping(&self, coupling_type: CouplingType) -> Result<&RankMapping, SccError> {
        self.mappings.get(&coupling_type).ok_or_else(|| {
            SccError::UnmappedType(
                ErrorInfo::new("rank-unmapped-type", "no rank mapping fitted for coupling type")
                    .with_context("fold", self.fold)
                    .with_context("coupling_type", coupling_type),
            )
        })
    }

    /// Raw value -> normal score for `coupling_type`.
    pub fn forward(&self, value: f64, coupling_type: CouplingType) -> Result<f64, SccError> {
        self.mapping(coupling_type)?
            .forward(value)
            .map_err(|err| err.with_context("fold", self.fold))
    }

    /// Normal score -> raw value for `coupling_type`.
    pub fn inverse(&self, score: f64, coupling_type: CouplingType) -> Result<f64, SccError> {
        self.mapping(coupling_type)?
            .inverse(score)
            .map_err(|err| err.with_context("fold", self.fold))
    }

    /// Scores the target of every record, producing packer-ready slots.
    pub fn score_records(&self, records: &[CouplingRecord]) -> Result<Vec<CouplingSlot>, SccError> {
        records
            .iter()
            .map(|record| {
                let gaussrank = self
                    .forward(record.scalar_coupling_constant, record.coupling_type)
                    .map_err(|err| err.with_context("id", record.id))?;
                Ok(CouplingSlot {
                    record: record.clone(),
                    gaussrank,
                })
            })
            .collect()
    }
}
