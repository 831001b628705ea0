//! Reading tables from disk and persisting packed frames.
//!
//! Paths ending in `.gz` are read and written through gzip.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use scc_core::{ErrorInfo, SccError};

use crate::packer::PackedFrame;
use crate::table::{CouplingTable, FeatureTable};

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Opens `path` for reading, decompressing `.gz` files.
pub fn open_table(path: &Path) -> Result<Box<dyn Read>, SccError> {
    let file = File::open(path).map_err(|err| SccError::io("table-open", path, err))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Output file that may be gzip compressed. Call [`TableSink::finish`] to
/// flush the compressed stream.
pub enum TableSink {
    /// Uncompressed output.
    Plain(BufWriter<File>),
    /// Gzip output.
    Gzip(GzEncoder<BufWriter<File>>),
}

impl TableSink {
    /// Creates `path`, compressing when it ends in `.gz`.
    pub fn create(path: &Path) -> Result<Self, SccError> {
        let file = File::create(path).map_err(|err| SccError::io("table-create", path, err))?;
        let writer = BufWriter::new(file);
        if is_gzip(path) {
            Ok(Self::Gzip(GzEncoder::new(writer, Compression::default())))
        } else {
            Ok(Self::Plain(writer))
        }
    }

    /// Flushes and closes the stream.
    pub fn finish(self) -> std::io::Result<()> {
        match self {
            Self::Plain(mut writer) => writer.flush(),
            Self::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for TableSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(writer) => writer.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(writer) => writer.flush(),
            Self::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Reads a coupling table from `path`.
pub fn read_coupling_table(path: &Path, require_targets: bool) -> Result<CouplingTable, SccError> {
    let table = CouplingTable::read_csv(open_table(path)?, require_targets)
        .map_err(|err| err.with_context("path", path.display()))?;
    info!("read {} couplings from {}", table.len(), path.display());
    Ok(table)
}

/// Reads a node or edge table from `path`.
pub fn read_feature_table(
    path: &Path,
    prefix: &str,
    count_column: &str,
) -> Result<FeatureTable, SccError> {
    let table = FeatureTable::read_csv(open_table(path)?, prefix, count_column)
        .map_err(|err| err.with_context("path", path.display()))?;
    info!(
        "read {} {} rows of width {} from {}",
        table.len(),
        prefix,
        table.width(),
        path.display()
    );
    Ok(table)
}

/// Writes `frame` in bincode form.
pub fn save_frame(frame: &PackedFrame, path: &Path) -> Result<(), SccError> {
    let mut sink = TableSink::create(path)?;
    bincode::serialize_into(&mut sink, frame).map_err(|err| {
        SccError::Serde(
            ErrorInfo::new("frame-encode", err.to_string()).with_context("path", path.display()),
        )
    })?;
    sink.finish()
        .map_err(|err| SccError::io("frame-flush", path, err))?;
    info!("saved {} packed rows to {}", frame.len(), path.display());
    Ok(())
}

/// Reads a frame written by [`save_frame`] and validates its shape.
pub fn load_frame(path: &Path) -> Result<PackedFrame, SccError> {
    let frame: PackedFrame = bincode::deserialize_from(open_table(path)?).map_err(|err| {
        SccError::Serde(
            ErrorInfo::new("frame-decode", err.to_string()).with_context("path", path.display()),
        )
    })?;
    frame
        .validate()
        .map_err(|err| err.with_context("path", path.display()))?;
    Ok(frame)
}

/// Writes the frame as one flat CSV row per molecule, columns named by
/// [`PackedFrame::column_names`].
pub fn export_frame_csv(frame: &PackedFrame, path: &Path) -> Result<(), SccError> {
    let sink = TableSink::create(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
    let csv_err = |err: csv::Error| {
        SccError::Serde(
            ErrorInfo::new("frame-export", err.to_string()).with_context("path", path.display()),
        )
    };
    let header = frame.column_names();
    writer.write_record(&header).map_err(csv_err)?;
    let mut row_buf: Vec<String> = Vec::with_capacity(header.len());
    for row in 0..frame.len() {
        row_buf.clear();
        row_buf.push(frame.molecules()[row].clone());
        row_buf.push(frame.num_nodes(row).to_string());
        row_buf.push(frame.num_edges(row).to_string());
        row_buf.push(frame.num_coupling(row).to_string());
        row_buf.push(frame.coupling_dim(row).to_string());
        row_buf.extend(frame.node_row(row).iter().map(f32::to_string));
        row_buf.extend(frame.edge_row(row).iter().map(f32::to_string));
        row_buf.extend(frame.coupling_row(row).iter().map(f64::to_string));
        writer.write_record(&row_buf).map_err(csv_err)?;
    }
    let sink = writer
        .into_inner()
        .map_err(|err| SccError::io("frame-export-flush", path, err.error()))?;
    sink.finish()
        .map_err(|err| SccError::io("frame-export-flush", path, err))?;
    Ok(())
}
