//! Loading the firing and slope correction tables from disk.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use twinmount_core::tables::{FiringTable, SlopeCorrectionTable, TableError, TableSet};

pub fn load_firing_table(path: &Path) -> Result<FiringTable, TableError> {
    log::debug!("Reading firing table {}", path.display());
    FiringTable::from_reader(BufReader::new(File::open(path)?))
}

pub fn load_slope_table(path: &Path) -> Result<SlopeCorrectionTable, TableError> {
    log::debug!("Reading slope correction table {}", path.display());
    SlopeCorrectionTable::from_reader(BufReader::new(File::open(path)?))
}

/// Load whatever tables are configured. Failures are logged and leave the
/// table absent; they never stop the process.
pub fn load_tables(firing: Option<&Path>, slope: Option<&Path>) -> TableSet {
    TableSet::from_results(
        firing
            .ok_or(TableError::NotConfigured("firing table"))
            .and_then(load_firing_table),
        slope
            .ok_or(TableError::NotConfigured("slope correction table"))
            .and_then(load_slope_table),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use twinmount_core::tables::FiringColumn;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let firing = write_file(dir.path(), "firing.csv", "X,P,dXT\n1000,100,1\n2000,200,2\n");
        let slope = write_file(dir.path(), "slope.csv", "slope,100,200\n0,0,0\n10,4,6\n");

        let tables = load_tables(Some(&firing), Some(&slope));
        assert!((tables.interpolate(1500.0, FiringColumn::Elevation) - 150.0).abs() < 1e-9);
        assert_eq!(tables.slope_lookup(9.0, 210.0), Some(6.0));
    }

    #[test]
    fn test_bad_slope_table_keeps_firing_table() {
        let dir = tempfile::tempdir().unwrap();
        let firing = write_file(dir.path(), "firing.csv", "X,P\n1000,100\n2000,200\n");
        let slope = write_file(dir.path(), "slope.csv", "slope,100,steep\n0,0,0\n");

        let tables = load_tables(Some(&firing), Some(&slope));
        assert!(tables.firing.is_some());
        assert!(tables.slope.is_none());
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_firing_table(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, TableError::Io(_)));

        let tables = load_tables(None, None);
        assert!(tables.firing.is_none());
        assert!(tables.slope.is_none());
    }
}
