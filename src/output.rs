//! Text output of partitions: one file per group size, one line per group.

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::info;

use crate::{driver::PartitionSink, features::FeatureSet, partition::Partition, Result};

/// Name of the directory under the root that partitions are written to.
pub const GROUPINGS_DIR: &str = "groupings";

/// Writes each partition to `<root>/groupings/groups_<max group size>.txt`.
///
/// Each line holds the space separated labels of one group in assignment order. Files are
/// staged in a temporary file and renamed into place, so a failed write never leaves a partial
/// artifact behind.
#[derive(Debug, Clone)]
pub struct GroupingsWriter {
    dir: PathBuf,
}

impl GroupingsWriter {
    /// Create a writer for `root`, creating the `groupings` directory if needed.
    pub fn create(root: &Path) -> Result<Self> {
        let dir = root.join(GROUPINGS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file written for `max_group_size`.
    pub fn path(&self, max_group_size: usize) -> PathBuf {
        self.dir.join(format!("groups_{max_group_size}.txt"))
    }
}

/// Write one line per group of `partition` to `out`.
pub fn write_groups<W: Write>(
    out: &mut W,
    features: &FeatureSet,
    partition: &Partition,
) -> Result<()> {
    for labels in partition.labels(features) {
        writeln!(out, "{}", labels.join(" "))?;
    }
    Ok(())
}

impl PartitionSink for GroupingsWriter {
    fn write(&self, features: &FeatureSet, partition: &Partition) -> Result<()> {
        let path = self.path(partition.max_group_size().get());
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        {
            let mut out = BufWriter::new(staged.as_file_mut());
            write_groups(&mut out, features, partition)?;
            out.flush()?;
        }
        staged.persist(&path).map_err(|e| e.error)?;
        info!(path = %path.display(), groups = partition.len(), "wrote groupings");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::{write_groups, GroupingsWriter};
    use crate::{
        driver::PartitionSink,
        features::FeatureSet,
        input::VecVectorStore,
        partition::greedy_assign,
    };

    fn scenario() -> FeatureSet {
        FeatureSet::new(
            1,
            [
                ("A", vec![0.0]),
                ("B", vec![1.0]),
                ("C", vec![10.0]),
                ("D", vec![11.0]),
                ("E", vec![20.0]),
            ],
        )
        .unwrap()
    }

    fn centroids(points: &[f32]) -> VecVectorStore<f32> {
        let mut store = VecVectorStore::<f32>::new(1);
        for p in points {
            store.push(&[*p]);
        }
        store
    }

    #[test]
    fn lines_per_group() {
        let features = scenario();
        let p = greedy_assign(features.vectors(), &centroids(&[0.5, 10.5, 20.0]), 2).unwrap();
        let mut out = Vec::new();
        write_groups(&mut out, &features, &p).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A B\nC D\nE\n");
    }

    #[test]
    fn empty_group_is_blank_line() {
        let features = scenario();
        let p = greedy_assign(features.vectors(), &centroids(&[0.0, 20.0]), 5).unwrap();
        let mut out = Vec::new();
        write_groups(&mut out, &features, &p).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A B C D E\n\n");
    }

    #[test]
    fn writes_file_per_size() {
        let root = tempfile::tempdir().unwrap();
        let writer = GroupingsWriter::create(root.path()).unwrap();
        assert!(writer.dir().is_dir());

        let features = scenario();
        let p = greedy_assign(features.vectors(), &centroids(&[20.0, 0.5, 10.5]), 2).unwrap();
        writer.write(&features, &p).unwrap();

        let path = root.path().join("groupings").join("groups_2.txt");
        assert_eq!(writer.path(2), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "E D\nA B\nC\n");
        // Only the final artifact remains, no staged temporaries.
        assert_eq!(fs::read_dir(writer.dir()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = GroupingsWriter::create(root.path()).unwrap();
        fs::remove_dir(writer.dir()).unwrap();

        let features = scenario();
        let p = greedy_assign(features.vectors(), &centroids(&[0.5, 10.5, 20.0]), 2).unwrap();
        assert!(writer.write(&features, &p).is_err());
        assert!(!writer.path(2).exists());
    }
}
