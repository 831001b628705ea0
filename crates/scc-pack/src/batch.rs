//! Mini-batch views over a [`PackedFrame`].

use log::debug;
use scc_core::{ErrorInfo, RngHandle, SccError, COUPLING_FIELDS};

use crate::packer::PackedFrame;

/// Splits a frame into consecutive batches of at most `batch_size` rows.
///
/// The iterator returned by [`BatchAssembler::batches`] is lazy and can be
/// restarted; every row lands in exactly one batch per pass.
#[derive(Debug, Clone)]
pub struct BatchAssembler<'a> {
    frame: &'a PackedFrame,
    batch_size: usize,
    order: Vec<usize>,
}

impl<'a> BatchAssembler<'a> {
    /// Creates an assembler visiting rows in frame order.
    pub fn new(frame: &'a PackedFrame, batch_size: usize) -> Result<Self, SccError> {
        if batch_size == 0 {
            return Err(SccError::Config(
                ErrorInfo::new("batch-size-zero", "batch size must be positive")
                    .with_hint("set batch_size to at least 1"),
            ));
        }
        Ok(Self {
            frame,
            batch_size,
            order: (0..frame.len()).collect(),
        })
    }

    /// Visits rows in `order`, which must be a permutation of the frame rows.
    pub fn with_order(mut self, order: Vec<usize>) -> Result<Self, SccError> {
        let rows = self.frame.len();
        if order.len() != rows {
            return Err(SccError::shape(
                "batch-order-length",
                "row order does not cover the frame",
                rows,
                order.len(),
            ));
        }
        let mut seen = vec![false; rows];
        for &row in &order {
            if row >= rows || std::mem::replace(&mut seen[row], true) {
                return Err(SccError::Config(
                    ErrorInfo::new("batch-order-invalid", "row order is not a permutation")
                        .with_context("row", row),
                ));
            }
        }
        self.order = order;
        Ok(self)
    }

    /// Visits rows in the deterministic shuffle of `(seed, epoch)`.
    pub fn shuffled(mut self, seed: u64, epoch: u64) -> Self {
        self.order = RngHandle::substream(seed, epoch).permutation(self.frame.len());
        debug!("epoch {epoch}: shuffled {} rows", self.order.len());
        self
    }

    /// Rows per full batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Row visiting order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Number of batches in one pass.
    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    /// Starts a pass over the frame.
    pub fn batches(&self) -> Batches<'_> {
        Batches {
            frame: self.frame,
            chunks: self.order.chunks(self.batch_size),
            index: 0,
        }
    }
}

/// Lazy iterator over the batches of one pass.
#[derive(Debug, Clone)]
pub struct Batches<'b> {
    frame: &'b PackedFrame,
    chunks: std::slice::Chunks<'b, usize>,
    index: usize,
}

impl<'b> Iterator for Batches<'b> {
    type Item = Batch<'b>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.chunks.next()?;
        let batch = Batch {
            frame: self.frame,
            rows,
            index: self.index,
        };
        self.index += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Batches<'_> {}

/// Borrowed slices of one molecule row. The block fields are padded; the
/// `true_*` methods cut them to the occupied prefix.
#[derive(Debug, Clone, Copy)]
pub struct MoleculeView<'a> {
    /// Frame row.
    pub row: usize,
    /// Molecule key.
    pub name: &'a str,
    /// Atom count.
    pub num_nodes: usize,
    /// Edge count.
    pub num_edges: usize,
    /// Occupied coupling slots.
    pub num_coupling: usize,
    /// Padded node block.
    pub nodes: &'a [f32],
    /// Padded edge block.
    pub edges: &'a [f32],
    /// Padded coupling block.
    pub coupling: &'a [f64],
    /// Values per atom.
    pub node_stride: usize,
    /// Values per edge.
    pub edge_stride: usize,
}

impl<'a> MoleculeView<'a> {
    /// Node values of the molecule's atoms, `num_nodes * node_stride` long.
    pub fn true_nodes(&self) -> &'a [f32] {
        prefix(self.nodes, self.num_nodes * self.node_stride)
    }

    /// Edge values of the molecule's edges, `num_edges * edge_stride` long.
    pub fn true_edges(&self) -> &'a [f32] {
        prefix(self.edges, self.num_edges * self.edge_stride)
    }

    /// Occupied coupling slots, `num_coupling * COUPLING_FIELDS` long.
    pub fn true_coupling(&self) -> &'a [f64] {
        prefix(self.coupling, self.num_coupling * COUPLING_FIELDS)
    }
}

fn prefix<T>(values: &[T], len: usize) -> &[T] {
    &values[..len.min(values.len())]
}

/// One mini-batch: a window of the visiting order.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    frame: &'a PackedFrame,
    rows: &'a [usize],
    index: usize,
}

impl<'a> Batch<'a> {
    /// Position of the batch within its pass.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of molecules.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Never true for batches produced by [`Batches`].
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Frame rows in batch order.
    pub fn rows(&self) -> &'a [usize] {
        self.rows
    }

    /// View of the `k`-th molecule of the batch.
    pub fn molecule(&self, k: usize) -> MoleculeView<'a> {
        let row = self.rows[k];
        let frame = self.frame;
        MoleculeView {
            row,
            name: &frame.molecules()[row],
            num_nodes: frame.num_nodes(row),
            num_edges: frame.num_edges(row),
            num_coupling: frame.num_coupling(row),
            nodes: frame.node_row(row),
            edges: frame.edge_row(row),
            coupling: frame.coupling_row(row),
            node_stride: frame.layout().node.stride,
            edge_stride: frame.layout().edge.stride,
        }
    }

    /// Views of every molecule in batch order.
    pub fn molecules(&self) -> impl Iterator<Item = MoleculeView<'a>> + '_ {
        (0..self.rows.len()).map(move |k| self.molecule(k))
    }

    /// Atom counts in batch order.
    pub fn num_nodes(&self) -> Vec<usize> {
        self.rows.iter().map(|&row| self.frame.num_nodes(row)).collect()
    }

    /// Edge counts in batch order.
    pub fn num_edges(&self) -> Vec<usize> {
        self.rows.iter().map(|&row| self.frame.num_edges(row)).collect()
    }

    /// Occupied coupling slots in batch order.
    pub fn num_coupling(&self) -> Vec<usize> {
        self.rows
            .iter()
            .map(|&row| self.frame.num_coupling(row))
            .collect()
    }

    /// Total occupied coupling slots in the batch.
    pub fn total_couplings(&self) -> usize {
        self.rows
            .iter()
            .map(|&row| self.frame.num_coupling(row))
            .sum()
    }

    /// Padded node tensor, `len * node_width` values.
    pub fn node_tensor(&self) -> Vec<f32> {
        self.rows
            .iter()
            .flat_map(|&row| self.frame.node_row(row).iter().copied())
            .collect()
    }

    /// Padded edge tensor, `len * edge_width` values.
    pub fn edge_tensor(&self) -> Vec<f32> {
        self.rows
            .iter()
            .flat_map(|&row| self.frame.edge_row(row).iter().copied())
            .collect()
    }

    /// Padded coupling tensor, `len * COUPLING_WIDTH` values.
    pub fn coupling_tensor(&self) -> Vec<f64> {
        self.rows
            .iter()
            .flat_map(|&row| self.frame.coupling_row(row).iter().copied())
            .collect()
    }

    /// Unpadded atom features: the true node values of every molecule,
    /// concatenated, with per-molecule atom offsets.
    pub fn gather_nodes(&self) -> (Vec<f32>, Vec<usize>) {
        gather(self.molecules(), |view| (view.true_nodes(), view.num_nodes))
    }

    /// Unpadded edge features with per-molecule edge offsets.
    pub fn gather_edges(&self) -> (Vec<f32>, Vec<usize>) {
        gather(self.molecules(), |view| (view.true_edges(), view.num_edges))
    }

    /// Occupied coupling slots of every molecule with per-molecule slot
    /// offsets.
    pub fn gather_coupling(&self) -> (Vec<f64>, Vec<usize>) {
        gather(self.molecules(), |view| (view.true_coupling(), view.num_coupling))
    }
}

fn gather<'a, T: Copy + 'a>(
    views: impl Iterator<Item = MoleculeView<'a>>,
    pick: impl Fn(&MoleculeView<'a>) -> (&'a [T], usize),
) -> (Vec<T>, Vec<usize>) {
    let mut values = Vec::new();
    let mut offsets = vec![0];
    for view in views {
        let (slice, items) = pick(&view);
        values.extend_from_slice(slice);
        let last = offsets.last().copied().unwrap_or(0);
        offsets.push(last + items);
    }
    (values, offsets)
}
