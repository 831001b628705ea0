//! Fold assignment of labelled molecules.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use scc_core::{ErrorInfo, SccError};
use scc_pack::open_table;
use serde::Deserialize;

/// `molecule_name -> fold` for every labelled molecule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldAssignment {
    folds: BTreeMap<String, u32>,
}

/// Molecules of one fold split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldSplit {
    /// Fold index held out.
    pub fold: u32,
    /// Labelled molecules outside the fold.
    pub train: HashSet<String>,
    /// Labelled molecules inside the fold.
    pub valid: HashSet<String>,
}

#[derive(Debug, Deserialize)]
struct FoldRow {
    molecule_name: String,
    fold: u32,
}

impl FoldAssignment {
    /// Builds an assignment from `(molecule, fold)` pairs; a molecule listed
    /// twice is a schema error.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, SccError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut folds = BTreeMap::new();
        for (name, fold) in pairs {
            let name = name.into();
            if folds.contains_key(&name) {
                return Err(SccError::Schema(
                    ErrorInfo::new("fold-duplicate-molecule", "molecule assigned twice")
                        .with_context("molecule", name),
                ));
            }
            folds.insert(name, fold);
        }
        Ok(Self { folds })
    }

    /// Reads `molecule_name, fold` rows.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, SccError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut pairs = Vec::new();
        for row in rdr.deserialize::<FoldRow>() {
            let row = row.map_err(|err| {
                SccError::Schema(ErrorInfo::new("fold-row", err.to_string()))
            })?;
            pairs.push((row.molecule_name, row.fold));
        }
        Self::from_pairs(pairs)
    }

    /// Reads the assignment file at `path`.
    pub fn load(path: &Path) -> Result<Self, SccError> {
        Self::read_csv(open_table(path)?).map_err(|err| err.with_context("path", path.display()))
    }

    /// Number of assigned molecules.
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    /// True when no molecule is assigned.
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Fold of `molecule`, if assigned.
    pub fn fold_of(&self, molecule: &str) -> Option<u32> {
        self.folds.get(molecule).copied()
    }

    /// Splits the labelled molecules around `fold`. Every molecule must sit
    /// in a fold below `num_folds`.
    pub fn split(&self, fold: u32, num_folds: u32) -> Result<FoldSplit, SccError> {
        let mut split = FoldSplit {
            fold,
            ..FoldSplit::default()
        };
        for (name, &assigned) in &self.folds {
            if assigned >= num_folds {
                return Err(SccError::Config(
                    ErrorInfo::new("fold-out-of-range", "molecule assigned to an unknown fold")
                        .with_context("molecule", name)
                        .with_context("fold", assigned)
                        .with_context("num_folds", num_folds),
                ));
            }
            if assigned == fold {
                split.valid.insert(name.clone());
            } else {
                split.train.insert(name.clone());
            }
        }
        if split.valid.is_empty() {
            return Err(SccError::Config(
                ErrorInfo::new("fold-empty", "no molecule is assigned to the validation fold")
                    .with_context("fold", fold),
            ));
        }
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_partitions_labelled_molecules() {
        let csv = "molecule_name,fold\na,0\nb,1\nc,0\nd,2\n";
        let folds = FoldAssignment::read_csv(csv.as_bytes()).unwrap();
        let split = folds.split(0, 3).unwrap();
        assert_eq!(split.valid.len(), 2);
        assert!(split.valid.contains("a") && split.valid.contains("c"));
        assert_eq!(split.train.len(), 2);
        assert_eq!(folds.fold_of("d"), Some(2));
        assert_eq!(folds.fold_of("zzz"), None);
    }

    #[test]
    fn duplicate_and_out_of_range_molecules_fail() {
        let dup = FoldAssignment::read_csv("molecule_name,fold\na,0\na,1\n".as_bytes());
        assert!(matches!(dup, Err(SccError::Schema(_))));

        let folds = FoldAssignment::from_pairs([("a", 0), ("b", 7)]).unwrap();
        assert!(matches!(folds.split(0, 5), Err(SccError::Config(_))));
        assert!(matches!(
            FoldAssignment::from_pairs([("a", 1)]).unwrap().split(0, 2),
            Err(SccError::Config(_))
        ));
    }
}
