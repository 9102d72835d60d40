use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::SampleType;
use crate::error::ScraperError;

pub const SCRAPED_DATA_DIR: &str = "scraped_data";
pub const DESEQ_INPUT_DIR: &str = "deseq_input";
pub const DESEQ_OUTPUT_DIR: &str = "deseq_output";
pub const RAW_COUNTS_FILE: &str = "raw_counts.csv";
pub const SAMPLE_CLASSES_FILE: &str = "sample_classes.csv";
pub const RUN_SUMMARY_FILE: &str = "run.json";

/// Directory tree for one histology:
///
/// ```text
/// <root>/<histology>/
///     scraped_data/      manifest copy, classification table, tissue folders
///     deseq_input/       raw_counts.csv, sample_classes.csv
///     deseq_output/      written by the statistical script
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    histology_root: Utf8PathBuf,
}

impl Layout {
    pub fn new(root: &Utf8Path, histology: &str) -> Self {
        Self {
            histology_root: root.join(histology),
        }
    }

    pub fn from_std(root: &Path, histology: &str) -> Result<Self, ScraperError> {
        let root = Utf8Path::from_path(root)
            .ok_or_else(|| ScraperError::Filesystem("invalid root path".to_string()))?;
        Ok(Self::new(root, histology))
    }

    pub fn histology_root(&self) -> &Utf8Path {
        &self.histology_root
    }

    pub fn scraped_data_dir(&self) -> Utf8PathBuf {
        self.histology_root.join(SCRAPED_DATA_DIR)
    }

    pub fn deseq_input_dir(&self) -> Utf8PathBuf {
        self.histology_root.join(DESEQ_INPUT_DIR)
    }

    pub fn deseq_output_dir(&self) -> Utf8PathBuf {
        self.histology_root.join(DESEQ_OUTPUT_DIR)
    }

    pub fn tissue_dir(&self, sample_type: SampleType) -> Utf8PathBuf {
        self.scraped_data_dir().join(sample_type.folder_name())
    }

    pub fn classification_path(&self) -> Utf8PathBuf {
        self.scraped_data_dir()
            .join(crate::manifest::CLASSIFICATION_FILE_NAME)
    }

    pub fn manifest_copy_path(&self, manifest: &Path) -> Result<Utf8PathBuf, ScraperError> {
        let name = manifest
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ScraperError::Filesystem(format!("invalid manifest path {}", manifest.display()))
            })?;
        Ok(self.scraped_data_dir().join(name))
    }

    pub fn raw_counts_path(&self) -> Utf8PathBuf {
        self.deseq_input_dir().join(RAW_COUNTS_FILE)
    }

    pub fn sample_classes_path(&self) -> Utf8PathBuf {
        self.deseq_input_dir().join(SAMPLE_CLASSES_FILE)
    }

    pub fn run_summary_path(&self) -> Utf8PathBuf {
        self.histology_root.join(RUN_SUMMARY_FILE)
    }

    pub fn ensure(&self) -> Result<(), ScraperError> {
        for dir in [
            self.scraped_data_dir(),
            self.deseq_input_dir(),
            self.deseq_output_dir(),
        ] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| ScraperError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }

    /// Copy the manifest into `scraped_data/` unless it already lives there.
    pub fn copy_manifest(&self, manifest: &Path) -> Result<Utf8PathBuf, ScraperError> {
        let target = self.manifest_copy_path(manifest)?;
        if manifest == target.as_std_path() {
            return Ok(target);
        }
        let content =
            fs::read(manifest).map_err(|_| ScraperError::ManifestRead(manifest.to_path_buf()))?;
        write_bytes_atomic(target.as_std_path(), &content)?;
        Ok(target)
    }
}

pub fn write_bytes_atomic(path: &Path, content: &[u8]) -> Result<(), ScraperError> {
    let parent = path
        .parent()
        .ok_or_else(|| ScraperError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent).map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".tcga-scraper")
        .tempfile_in(parent)
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    std::io::Write::write_all(&mut temp, content)
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = Layout::new(Utf8Path::new("/data"), "BRCA");
        assert_eq!(layout.histology_root(), Utf8Path::new("/data/BRCA"));
        assert!(
            layout
                .tissue_dir(SampleType::Normal)
                .ends_with("scraped_data/normal_tissue")
        );
        assert!(layout.raw_counts_path().ends_with("deseq_input/raw_counts.csv"));
        assert!(
            layout
                .classification_path()
                .ends_with("scraped_data/file_sample_list.csv")
        );
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("out.txt");
        write_bytes_atomic(&path, b"first").unwrap();
        write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }
}
