//! Joins node, edge and coupling tables into one fixed-width row per molecule.

use std::collections::{BTreeMap, HashSet};

use log::{info, warn};
use scc_core::{
    CouplingSlot, ErrorInfo, SccError, COUPLING_FIELDS, COUPLING_FIELD_NAMES, COUPLING_MAX,
    COUPLING_WIDTH,
};
use serde::{Deserialize, Serialize};

use crate::table::{FeatureLayout, FeatureTable};

/// Leading identity columns of the flat row layout.
pub const IDENTITY_COLUMNS: [&str; 5] = [
    "molecule_name",
    "num_nodes",
    "num_edge",
    "num_coupling",
    "coupling_dim",
];

/// Declared widths of the node and edge blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackLayout {
    /// Node block shape.
    pub node: FeatureLayout,
    /// Edge block shape.
    pub edge: FeatureLayout,
}

impl PackLayout {
    /// Creates a layout from the two block shapes.
    pub const fn new(node: FeatureLayout, edge: FeatureLayout) -> Self {
        Self { node, edge }
    }
}

/// Recoverable data problems noticed while packing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackWarning {
    /// A molecule in the node table has no couplings.
    EmptyMolecule {
        /// Molecule key.
        molecule: String,
    },
    /// A molecule in the node table has no edge row; its edge block is zero.
    MissingEdges {
        /// Molecule key.
        molecule: String,
    },
    /// Couplings reference a molecule absent from the node table.
    OrphanCouplings {
        /// Molecule key.
        molecule: String,
        /// Number of dropped pairs.
        pairs: usize,
    },
}

/// Packed frame plus the warnings raised while building it.
#[derive(Debug, Clone)]
pub struct PackOutcome {
    /// The packed rows.
    pub frame: PackedFrame,
    /// Data problems that did not stop packing.
    pub warnings: Vec<PackWarning>,
}

/// One fixed-width row per molecule, stored column block by column block.
///
/// Row `i` of every block belongs to `molecules[i]`. Coupling slots past
/// `num_coupling[i]` are all zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedFrame {
    layout: PackLayout,
    molecules: Vec<String>,
    num_nodes: Vec<usize>,
    num_edges: Vec<usize>,
    num_coupling: Vec<usize>,
    nodes: Vec<f32>,
    edges: Vec<f32>,
    coupling: Vec<f64>,
}

impl PackedFrame {
    fn with_capacity(layout: PackLayout, rows: usize) -> Self {
        Self {
            layout,
            molecules: Vec::with_capacity(rows),
            num_nodes: Vec::with_capacity(rows),
            num_edges: Vec::with_capacity(rows),
            num_coupling: Vec::with_capacity(rows),
            nodes: vec![0.0; rows * layout.node.width()],
            edges: vec![0.0; rows * layout.edge.width()],
            coupling: vec![0.0; rows * COUPLING_WIDTH],
        }
    }

    /// Block widths of the frame.
    pub fn layout(&self) -> &PackLayout {
        &self.layout
    }

    /// Number of molecules.
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    /// True when the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Molecule keys in row order.
    pub fn molecules(&self) -> &[String] {
        &self.molecules
    }

    /// Atom count of row `row`.
    pub fn num_nodes(&self, row: usize) -> usize {
        self.num_nodes[row]
    }

    /// Edge count of row `row`.
    pub fn num_edges(&self, row: usize) -> usize {
        self.num_edges[row]
    }

    /// Number of occupied coupling slots of row `row`.
    pub fn num_coupling(&self, row: usize) -> usize {
        self.num_coupling[row]
    }

    /// Occupied coupling values of row `row`, `21 * num_coupling`.
    pub fn coupling_dim(&self, row: usize) -> usize {
        self.num_coupling[row] * COUPLING_FIELDS
    }

    /// Total number of occupied coupling slots.
    pub fn total_couplings(&self) -> usize {
        self.num_coupling.iter().sum()
    }

    /// Padded node block of row `row`.
    pub fn node_row(&self, row: usize) -> &[f32] {
        let width = self.layout.node.width();
        &self.nodes[row * width..(row + 1) * width]
    }

    /// Padded edge block of row `row`.
    pub fn edge_row(&self, row: usize) -> &[f32] {
        let width = self.layout.edge.width();
        &self.edges[row * width..(row + 1) * width]
    }

    /// Padded coupling block of row `row`.
    pub fn coupling_row(&self, row: usize) -> &[f64] {
        &self.coupling[row * COUPLING_WIDTH..(row + 1) * COUPLING_WIDTH]
    }

    /// Decodes the occupied coupling slots of row `row`.
    pub fn unpack(&self, row: usize) -> Result<Vec<CouplingSlot>, SccError> {
        if row >= self.len() {
            return Err(SccError::ShapeMismatch(
                ErrorInfo::new("frame-row", "row index past the end of the frame")
                    .with_context("row", row)
                    .with_context("rows", self.len()),
            ));
        }
        let name = &self.molecules[row];
        self.coupling_row(row)
            .chunks_exact(COUPLING_FIELDS)
            .take(self.num_coupling[row])
            .map(|slot| {
                CouplingSlot::decode(name, slot).map_err(|err| err.with_context("molecule", name))
            })
            .collect()
    }

    /// Column names of the flat row layout: identity columns, then node,
    /// edge and coupling blocks.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = IDENTITY_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .collect();
        names.extend((0..self.layout.node.width()).map(|i| format!("node_{i}")));
        names.extend((0..self.layout.edge.width()).map(|i| format!("edge_{i}")));
        for slot in 0..COUPLING_MAX {
            names.extend(
                COUPLING_FIELD_NAMES
                    .iter()
                    .map(|field| format!("coupling_{slot}_{field}")),
            );
        }
        names
    }

    /// Checks internal lengths and per-row counts against the layout.
    /// Coupling padding must be zero.
    pub fn validate(&self) -> Result<(), SccError> {
        let rows = self.len();
        for (name, len) in [
            ("num_nodes", self.num_nodes.len()),
            ("num_edges", self.num_edges.len()),
            ("num_coupling", self.num_coupling.len()),
        ] {
            if len != rows {
                return Err(SccError::shape(
                    "frame-column-length",
                    "count column length differs from row count",
                    rows,
                    len,
                )
                .with_context("column", name));
            }
        }
        for (name, expected, found) in [
            ("node", rows * self.layout.node.width(), self.nodes.len()),
            ("edge", rows * self.layout.edge.width(), self.edges.len()),
            ("coupling", rows * COUPLING_WIDTH, self.coupling.len()),
        ] {
            if expected != found {
                return Err(SccError::shape(
                    "frame-block-length",
                    "block length differs from layout",
                    expected,
                    found,
                )
                .with_context("block", name));
            }
        }
        for row in 0..rows {
            for (code, layout, count) in [
                ("frame-node-count", &self.layout.node, self.num_nodes[row]),
                ("frame-edge-count", &self.layout.edge, self.num_edges[row]),
            ] {
                if count > layout.max_items {
                    return Err(SccError::shape(
                        code,
                        "item count exceeds the layout",
                        layout.max_items,
                        count,
                    )
                    .with_context("molecule", &self.molecules[row]));
                }
            }
            let occupied = self.num_coupling[row];
            if occupied > COUPLING_MAX {
                return Err(SccError::shape(
                    "frame-coupling-count",
                    "too many couplings in row",
                    COUPLING_MAX,
                    occupied,
                )
                .with_context("molecule", &self.molecules[row]));
            }
            let padding = &self.coupling_row(row)[occupied * COUPLING_FIELDS..];
            if padding.iter().any(|value| *value != 0.0) {
                return Err(SccError::ShapeMismatch(
                    ErrorInfo::new("frame-padding", "coupling padding is not zero")
                        .with_context("molecule", &self.molecules[row]),
                ));
            }
        }
        Ok(())
    }

    /// Appends the rows of `other`. Layouts must agree and molecule keys
    /// must stay unique.
    pub fn append(&mut self, other: PackedFrame) -> Result<(), SccError> {
        if self.layout != other.layout {
            return Err(SccError::ShapeMismatch(
                ErrorInfo::new("frame-layout-mismatch", "frames were packed with different layouts")
                    .with_context("node_width", self.layout.node.width())
                    .with_context("other_node_width", other.layout.node.width())
                    .with_context("edge_width", self.layout.edge.width())
                    .with_context("other_edge_width", other.layout.edge.width()),
            ));
        }
        let existing: HashSet<&str> = self.molecules.iter().map(String::as_str).collect();
        if let Some(dup) = other.molecules.iter().find(|name| existing.contains(name.as_str())) {
            return Err(SccError::Schema(
                ErrorInfo::new("frame-duplicate-molecule", "molecule present in both frames")
                    .with_context("molecule", dup),
            ));
        }
        self.molecules.extend(other.molecules);
        self.num_nodes.extend(other.num_nodes);
        self.num_edges.extend(other.num_edges);
        self.num_coupling.extend(other.num_coupling);
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
        self.coupling.extend(other.coupling);
        Ok(())
    }
}

/// Packs one row per node-table molecule, in node-table order.
///
/// Couplings of a molecule are ordered by `(atom_index_0, atom_index_1, id)`.
/// More than [`COUPLING_MAX`] couplings in one molecule is an error; missing
/// edges, coupling-free molecules and orphan couplings only warn.
pub fn pack(
    nodes: &FeatureTable,
    edges: &FeatureTable,
    couplings: &[CouplingSlot],
    layout: &PackLayout,
) -> Result<PackOutcome, SccError> {
    nodes.check_layout(&layout.node)?;
    edges.check_layout(&layout.edge)?;

    let mut grouped: BTreeMap<&str, Vec<&CouplingSlot>> = BTreeMap::new();
    for slot in couplings {
        if !slot.record.id.is_exact() {
            return Err(SccError::Schema(
                ErrorInfo::new("pack-id-range", "pair id cannot be stored exactly")
                    .with_context("id", slot.record.id)
                    .with_context("molecule", &slot.record.molecule_name),
            ));
        }
        grouped
            .entry(slot.record.molecule_name.as_str())
            .or_default()
            .push(slot);
    }

    let mut frame = PackedFrame::with_capacity(*layout, nodes.len());
    let mut warnings = Vec::new();
    let node_width = layout.node.width();
    let edge_width = layout.edge.width();

    for (row, node) in nodes.rows().iter().enumerate() {
        let name = node.molecule_name.as_str();
        frame.nodes[row * node_width..(row + 1) * node_width].copy_from_slice(&node.values);

        let num_edges = match edges.get(name) {
            Some(edge) => {
                frame.edges[row * edge_width..(row + 1) * edge_width]
                    .copy_from_slice(&edge.values);
                edge.count
            }
            None => {
                warnings.push(PackWarning::MissingEdges {
                    molecule: name.to_string(),
                });
                0
            }
        };

        let mut slots = grouped.remove(name).unwrap_or_default();
        if slots.len() > COUPLING_MAX {
            return Err(SccError::shape(
                "pack-coupling-overflow",
                "molecule has more couplings than the fixed slot count",
                COUPLING_MAX,
                slots.len(),
            )
            .with_context("molecule", name));
        }
        if slots.is_empty() {
            warnings.push(PackWarning::EmptyMolecule {
                molecule: name.to_string(),
            });
        }
        slots.sort_by_key(|slot| slot.record.pair_key());
        let block = &mut frame.coupling[row * COUPLING_WIDTH..(row + 1) * COUPLING_WIDTH];
        for (slot, out) in slots.iter().zip(block.chunks_exact_mut(COUPLING_FIELDS)) {
            slot.encode_into(out);
        }

        frame.molecules.push(name.to_string());
        frame.num_nodes.push(node.count);
        frame.num_edges.push(num_edges);
        frame.num_coupling.push(slots.len());
    }

    for (molecule, slots) in grouped {
        warnings.push(PackWarning::OrphanCouplings {
            molecule: molecule.to_string(),
            pairs: slots.len(),
        });
    }

    for warning in &warnings {
        warn!("pack: {warning:?}");
    }
    info!(
        "packed {} molecules with {} couplings ({} warnings)",
        frame.len(),
        frame.total_couplings(),
        warnings.len()
    );
    Ok(PackOutcome { frame, warnings })
}
