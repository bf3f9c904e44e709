//! Filesystem-backed dataset repository reading the historical credit CSV.
//!
//! The header must name every field code plus the target column; extra
//! columns are ignored. Empty cells and `NA` are missing values, left for the
//! pipeline's imputers. The target must be present on every row.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::common::config::TrainCfg;
use crate::common::error::{RiskError, RiskResult};

use super::domain::{DataRepo, Dataset, RawRow, FIELDS, FIELD_COUNT};

/// CSV repository rooted at `cfg.dataset_path`.
pub struct FsDataRepo {
    path: PathBuf,
    target_column: String,
}

impl FsDataRepo {
    pub fn new(cfg: &TrainCfg) -> Self {
        Self {
            path: cfg.dataset_path.clone(),
            target_column: cfg.target_column.clone(),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>, target_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target_column: target_column.into(),
        }
    }
}

impl DataRepo for FsDataRepo {
    fn load_dataset(&self) -> RiskResult<Dataset> {
        let file = File::open(&self.path).map_err(|err| RiskError::io(&self.path, err))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(line) => line.map_err(|err| RiskError::io(&self.path, err))?,
            None => return Err(RiskError::dataset(format!("{} is empty", self.path.display()))),
        };
        let layout = ColumnLayout::from_header(&header, &self.target_column)?;

        let mut dataset = Dataset::default();
        for (lineno, line) in lines.enumerate() {
            let line = line.map_err(|err| RiskError::io(&self.path, err))?;
            if line.trim().is_empty() {
                continue;
            }
            // +2: one for the header, one for 1-based numbering.
            let (row, target) = layout.parse_row(&line, lineno + 2)?;
            dataset.rows.push(row);
            dataset.targets.push(target);
        }

        if dataset.is_empty() {
            return Err(RiskError::dataset(format!(
                "{} has a header but no rows",
                self.path.display()
            )));
        }
        tracing::info!(
            ev = "dataset_loaded",
            rows = dataset.len(),
            path = %self.path.display()
        );
        Ok(dataset)
    }
}

/// Column positions resolved from the header line.
struct ColumnLayout {
    fields: [usize; FIELD_COUNT],
    target: usize,
    width: usize,
}

impl ColumnLayout {
    fn from_header(header: &str, target_column: &str) -> RiskResult<Self> {
        let names: Vec<&str> = header
            .trim_start_matches('\u{feff}')
            .split(',')
            .map(|name| name.trim().trim_matches('"'))
            .collect();
        let position = |wanted: &str| {
            names
                .iter()
                .position(|name| *name == wanted)
                .ok_or_else(|| RiskError::dataset(format!("missing column {wanted}")))
        };

        let mut fields = [0usize; FIELD_COUNT];
        for (slot, spec) in fields.iter_mut().zip(FIELDS.iter()) {
            *slot = position(spec.code)?;
        }
        Ok(Self {
            fields,
            target: position(target_column)?,
            width: names.len(),
        })
    }

    fn parse_row(&self, line: &str, lineno: usize) -> RiskResult<(RawRow, u8)> {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != self.width {
            return Err(RiskError::dataset(format!(
                "line {lineno}: expected {} cells, found {}",
                self.width,
                cells.len()
            )));
        }

        let mut row: RawRow = [None; FIELD_COUNT];
        for (slot, &col) in row.iter_mut().zip(self.fields.iter()) {
            *slot = parse_cell(cells[col], lineno)?;
        }

        let target = match parse_cell(cells[self.target], lineno)? {
            Some(0) => 0,
            Some(1) => 1,
            Some(other) => {
                return Err(RiskError::dataset(format!(
                    "line {lineno}: target must be 0 or 1, found {other}"
                )))
            }
            None => {
                return Err(RiskError::dataset(format!("line {lineno}: target is missing")))
            }
        };
        Ok((row, target))
    }
}

fn parse_cell(cell: &str, lineno: usize) -> RiskResult<Option<i64>> {
    let cell = cell.trim_matches('"');
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(value) = cell.parse::<i64>() {
        return Ok(Some(value));
    }
    match cell.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
        _ => Err(RiskError::dataset(format!(
            "line {lineno}: cannot read {cell:?} as an integer"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const HEADER: &str = "laufkont,laufzeit,moral,verw,hoehe,sparkont,beszeit,rate,famges,buerge,wohnzeit,verm,alter,weitkred,wohn,bishkred,beruf,pers,telef,gastarb,kredit";

    fn write_csv(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(&path, format!("{HEADER}\n{body}")).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_rows_with_missing_cells() {
        let (_dir, path) = write_csv(
            "1,18,4,2,1049,1,2,4,2,1,4,2,21,3,1,1,3,2,1,2,1\n\
             1,,4,0,2799,1,3,2,3,1,2,1,36,3,1,2,3,1,1,2,0\n",
        );
        let dataset = FsDataRepo::with_path(&path, "kredit").load_dataset().unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.targets, vec![1, 0]);
        assert_eq!(dataset.rows[0][1], Some(18));
        assert_eq!(dataset.rows[1][1], None);
    }

    #[test]
    fn rejects_missing_target_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(&path, "laufkont,laufzeit\n1,2\n").unwrap();
        let err = FsDataRepo::with_path(&path, "kredit").load_dataset().unwrap_err();
        assert!(matches!(err, RiskError::Dataset { .. }));
    }

    #[test]
    fn rejects_non_binary_target() {
        let (_dir, path) = write_csv("1,18,4,2,1049,1,2,4,2,1,4,2,21,3,1,1,3,2,1,2,7\n");
        let err = FsDataRepo::with_path(&path, "kredit").load_dataset().unwrap_err();
        assert!(err.to_string().contains("target must be 0 or 1"));
    }

    #[test]
    fn missing_file_is_io() {
        let err = FsDataRepo::with_path("/nonexistent/credit.csv", "kredit")
            .load_dataset()
            .unwrap_err();
        assert!(matches!(err, RiskError::Io { .. }));
    }
}
