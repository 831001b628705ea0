//! Per-pair coupling records and their fixed 21-field slot encoding.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SccError};
use crate::types::{CouplingType, PairId};

/// Maximum number of coupling pairs stored for one molecule.
pub const COUPLING_MAX: usize = 136;

/// Number of values written per coupling slot.
pub const COUPLING_FIELDS: usize = 21;

/// Width of a packed coupling block; shared by every fold and split.
pub const COUPLING_WIDTH: usize = COUPLING_MAX * COUPLING_FIELDS;

/// Encoded value of an absent path entry.
pub const PATH_ABSENT: f64 = -1.0;

/// Slot field names in encoding order.
pub const COUPLING_FIELD_NAMES: [&str; COUPLING_FIELDS] = [
    "atom_index_0",
    "atom_index_1",
    "coupling_type",
    "scalar_coupling_constant",
    "gaussrank_coupling",
    "fc",
    "sd",
    "pso",
    "dso",
    "id",
    "path_index_0",
    "path_index_1",
    "path_index_2",
    "path_index_3",
    "path_btype_0",
    "path_btype_1",
    "path_btype_2",
    "path_a_num_0",
    "path_a_num_1",
    "path_a_num_2",
    "path_a_num_3",
];

/// Offset of the coupling type inside a slot.
pub const FIELD_TYPE: usize = 2;
/// Offset of the raw target inside a slot.
pub const FIELD_TARGET: usize = 3;
/// Offset of the GaussRank score inside a slot.
pub const FIELD_GAUSSRANK: usize = 4;
/// Offset of the pair identifier inside a slot.
pub const FIELD_ID: usize = 9;

/// Decomposed physical contributions to the coupling constant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Contributions {
    /// Fermi contact term.
    pub fc: f64,
    /// Spin-dipolar term.
    pub sd: f64,
    /// Paramagnetic spin-orbit term.
    pub pso: f64,
    /// Diamagnetic spin-orbit term.
    pub dso: f64,
}

impl Contributions {
    /// Returns the contributions in table order.
    pub fn to_array(self) -> [f64; 4] {
        [self.fc, self.sd, self.pso, self.dso]
    }

    /// Builds contributions from table order.
    pub fn from_array(values: [f64; 4]) -> Self {
        Self {
            fc: values[0],
            sd: values[1],
            pso: values[2],
            dso: values[3],
        }
    }
}

/// Bond path between the two coupled atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathDescriptor {
    /// Atom indices along the path.
    pub index: [Option<u32>; 4],
    /// Bond-type codes along the path.
    pub btype: [Option<u32>; 3],
    /// Atomic numbers along the path.
    pub a_num: [Option<u32>; 4],
}

/// One observed (or to-be-predicted) atom-pair coupling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingRecord {
    /// Owning molecule.
    pub molecule_name: String,
    /// First atom of the pair.
    pub atom_index_0: u32,
    /// Second atom of the pair.
    pub atom_index_1: u32,
    /// Coupling type.
    pub coupling_type: CouplingType,
    /// Raw target in Hz; 0.0 for unlabelled rows.
    pub scalar_coupling_constant: f64,
    /// Physical decomposition of the target; zero for unlabelled rows.
    pub contributions: Contributions,
    /// Bond path descriptors.
    pub path: PathDescriptor,
    /// Row identifier.
    pub id: PairId,
}

impl CouplingRecord {
    /// Ordering key inside a molecule block.
    pub fn pair_key(&self) -> (u32, u32, PairId) {
        (self.atom_index_0, self.atom_index_1, self.id)
    }
}

/// A record together with the normalised target written into its slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingSlot {
    /// The source record.
    pub record: CouplingRecord,
    /// GaussRank score of the target, 0.0 when not scored.
    pub gaussrank: f64,
}

impl CouplingSlot {
    /// Wraps a record that has no normalised target.
    pub fn unscored(record: CouplingRecord) -> Self {
        Self {
            record,
            gaussrank: 0.0,
        }
    }

    /// Writes the slot into `out`, which must hold exactly
    /// [`COUPLING_FIELDS`] values. The id must not exceed
    /// [`PairId::MAX_EXACT`].
    pub fn encode_into(&self, out: &mut [f64]) {
        debug_assert_eq!(out.len(), COUPLING_FIELDS);
        debug_assert!(self.record.id.is_exact(), "pair id {} exceeds 2^53", self.record.id);
        let r = &self.record;
        out[0] = f64::from(r.atom_index_0);
        out[1] = f64::from(r.atom_index_1);
        out[FIELD_TYPE] = r.coupling_type.index() as f64;
        out[FIELD_TARGET] = r.scalar_coupling_constant;
        out[FIELD_GAUSSRANK] = self.gaussrank;
        out[5..9].copy_from_slice(&r.contributions.to_array());
        out[FIELD_ID] = r.id.as_raw() as f64;
        encode_optional(&r.path.index, &mut out[10..14]);
        encode_optional(&r.path.btype, &mut out[14..17]);
        encode_optional(&r.path.a_num, &mut out[17..21]);
    }

    /// Decodes a slot previously written by [`CouplingSlot::encode_into`].
    pub fn decode(molecule_name: &str, values: &[f64]) -> Result<Self, SccError> {
        if values.len() != COUPLING_FIELDS {
            return Err(SccError::shape(
                "slot-width",
                "coupling slot has the wrong number of fields",
                COUPLING_FIELDS,
                values.len(),
            ));
        }
        let type_index = decode_index(values[FIELD_TYPE], "coupling_type")?;
        let coupling_type = CouplingType::from_index(type_index as usize)?;
        let mut path = PathDescriptor::default();
        decode_optional(&values[10..14], &mut path.index)?;
        decode_optional(&values[14..17], &mut path.btype)?;
        decode_optional(&values[17..21], &mut path.a_num)?;
        let record = CouplingRecord {
            molecule_name: molecule_name.to_string(),
            atom_index_0: decode_index(values[0], "atom_index_0")?,
            atom_index_1: decode_index(values[1], "atom_index_1")?,
            coupling_type,
            scalar_coupling_constant: values[FIELD_TARGET],
            contributions: Contributions::from_array([values[5], values[6], values[7], values[8]]),
            path,
            id: PairId::from_raw(decode_id(values[FIELD_ID])?),
        };
        Ok(Self {
            record,
            gaussrank: values[FIELD_GAUSSRANK],
        })
    }
}

fn encode_optional(values: &[Option<u32>], out: &mut [f64]) {
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value.map(f64::from).unwrap_or(PATH_ABSENT);
    }
}

fn decode_optional(values: &[f64], out: &mut [Option<u32>]) -> Result<(), SccError> {
    for (slot, &value) in out.iter_mut().zip(values) {
        *slot = if value == PATH_ABSENT {
            None
        } else {
            Some(decode_index(value, "path")?)
        };
    }
    Ok(())
}

fn decode_index(value: f64, field: &str) -> Result<u32, SccError> {
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(SccError::Schema(
            ErrorInfo::new("slot-decode", "slot field is not a valid index")
                .with_context("field", field)
                .with_context("value", value),
        ));
    }
    Ok(value as u32)
}

fn decode_id(value: f64) -> Result<u64, SccError> {
    // ids above 2^53 cannot be represented exactly in the f64 block
    if value.fract() != 0.0 || value < 0.0 || value > PairId::MAX_EXACT as f64 {
        return Err(SccError::Schema(
            ErrorInfo::new("slot-decode", "slot id is not a valid identifier")
                .with_context("value", value),
        ));
    }
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CouplingRecord {
        CouplingRecord {
            molecule_name: "dsgdb9nsd_000001".into(),
            atom_index_0: 1,
            atom_index_1: 0,
            coupling_type: CouplingType::J1HC,
            scalar_coupling_constant: 84.8076,
            contributions: Contributions::from_array([83.0224, 0.254579, 1.25862, 0.27201]),
            path: PathDescriptor {
                index: [Some(1), Some(0), None, None],
                btype: [Some(1), None, None],
                a_num: [Some(1), Some(6), None, None],
            },
            id: PairId::from_raw(0),
        }
    }

    #[test]
    fn slot_encoding_keeps_every_field() {
        let slot = CouplingSlot {
            record: sample(),
            gaussrank: 0.25,
        };
        let mut buf = [0.0; COUPLING_FIELDS];
        slot.encode_into(&mut buf);
        assert_eq!(buf[FIELD_TYPE], 0.0);
        assert_eq!(buf[12], PATH_ABSENT);
        let decoded = CouplingSlot::decode("dsgdb9nsd_000001", &buf).unwrap();
        assert_eq!(decoded, slot);
    }

    #[test]
    fn decode_rejects_fractional_type() {
        let mut buf = [0.0; COUPLING_FIELDS];
        buf[FIELD_TYPE] = 1.5;
        assert!(matches!(
            CouplingSlot::decode("m", &buf),
            Err(SccError::Schema(_))
        ));
    }

    #[test]
    fn field_names_cover_width() {
        assert_eq!(COUPLING_FIELD_NAMES.len() * COUPLING_MAX, COUPLING_WIDTH);
        assert_eq!(COUPLING_FIELD_NAMES[FIELD_ID], "id");
        assert_eq!(COUPLING_FIELD_NAMES[FIELD_GAUSSRANK], "gaussrank_coupling");
    }
}
