#![deny(missing_docs)]
#![doc = "Per-molecule packing of node, edge and coupling tables into fixed-width rows, plus mini-batch assembly over the packed frame."]

/// Mini-batch views.
pub mod batch;
/// Table and frame files.
pub mod io;
/// Molecule packing.
pub mod packer;
/// Input tables.
pub mod table;

pub use batch::{Batch, BatchAssembler, Batches, MoleculeView};
pub use io::{
    export_frame_csv, load_frame, open_table, read_coupling_table, read_feature_table, save_frame,
    TableSink,
};
pub use packer::{pack, PackLayout, PackOutcome, PackWarning, PackedFrame, IDENTITY_COLUMNS};
pub use table::{CouplingTable, FeatureLayout, FeatureRow, FeatureTable};
