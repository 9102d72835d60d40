use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{SampleType, tissue_code};
use crate::error::ScraperError;

/// File name used when the classification table is persisted next to the manifest.
pub const CLASSIFICATION_FILE_NAME: &str = "file_sample_list.csv";

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub file_id: String,
    #[serde(default)]
    pub associated_entities: Vec<AssociatedEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociatedEntity {
    pub entity_submitter_id: String,
    pub case_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub file_id: String,
    pub sample_type: SampleType,
    pub case_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassificationRow {
    file_name: String,
    #[serde(rename = "type")]
    sample_type: String,
    sample_name: String,
}

/// File id to (sample type, case id), in manifest order with unique file ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedFileTable {
    rows: Vec<ClassifiedFile>,
    index: HashMap<String, usize>,
}

impl ClassifiedFileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row; a repeated file id replaces the earlier classification.
    pub fn insert(&mut self, row: ClassifiedFile) -> Option<ClassifiedFile> {
        match self.index.get(&row.file_id) {
            Some(&position) => Some(std::mem::replace(&mut self.rows[position], row)),
            None => {
                self.index.insert(row.file_id.clone(), self.rows.len());
                self.rows.push(row);
                None
            }
        }
    }

    pub fn get(&self, file_id: &str) -> Option<&ClassifiedFile> {
        self.index.get(file_id).map(|&position| &self.rows[position])
    }

    pub fn rows(&self) -> &[ClassifiedFile] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn file_ids(&self, sample_type: SampleType) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.sample_type == sample_type)
            .map(|row| row.file_id.clone())
            .collect()
    }

    pub fn summary(&self) -> BTreeMap<SampleType, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.sample_type).or_insert(0) += 1;
        }
        counts
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ScraperError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &self.rows {
            writer
                .serialize(ClassificationRow {
                    file_name: row.file_id.clone(),
                    sample_type: row.sample_type.to_string(),
                    sample_name: row.case_id.clone(),
                })
                .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        }
        let content = writer
            .into_inner()
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        crate::layout::write_bytes_atomic(path, &content)
    }

    pub fn read_csv(path: &Path) -> Result<Self, ScraperError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|err| ScraperError::ClassificationRead(format!("{}: {err}", path.display())))?;
        let mut table = Self::new();
        for record in reader.deserialize::<ClassificationRow>() {
            let record =
                record.map_err(|err| ScraperError::ClassificationRead(err.to_string()))?;
            table.insert(ClassifiedFile {
                file_id: record.file_name,
                sample_type: record.sample_type.parse()?,
                case_id: record.sample_name,
            });
        }
        Ok(table)
    }
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ScraperError> {
    let content =
        fs::read_to_string(path).map_err(|_| ScraperError::ManifestRead(path.to_path_buf()))?;
    serde_json::from_str(&content).map_err(|err| ScraperError::ManifestParse(err.to_string()))
}

pub fn classify_manifest(
    path: &Path,
    include_others: bool,
) -> Result<ClassifiedFileTable, ScraperError> {
    let entries = read_manifest(path)?;
    let table = classify_entries(&entries, include_others)?;
    let summary = table.summary();
    tracing::info!(
        manifest = %path.display(),
        tumor = summary.get(&SampleType::Tumor).copied().unwrap_or(0),
        normal = summary.get(&SampleType::Normal).copied().unwrap_or(0),
        other = summary.get(&SampleType::Other).copied().unwrap_or(0),
        "classified manifest"
    );
    Ok(table)
}

pub fn classify_entries(
    entries: &[ManifestEntry],
    include_others: bool,
) -> Result<ClassifiedFileTable, ScraperError> {
    let mut table = ClassifiedFileTable::new();
    for entry in entries {
        let entity = entry.associated_entities.first().ok_or_else(|| {
            ScraperError::ManifestParse(format!(
                "file {} has no associated entities",
                entry.file_id
            ))
        })?;
        let sample_type = SampleType::from_tissue_code(tissue_code(&entity.entity_submitter_id)?);
        if sample_type == SampleType::Other && !include_others {
            continue;
        }
        let replaced = table.insert(ClassifiedFile {
            file_id: entry.file_id.clone(),
            sample_type,
            case_id: entity.case_id.clone(),
        });
        if replaced.is_some() {
            tracing::warn!(file_id = %entry.file_id, "duplicate file id in manifest, keeping last entry");
        }
    }
    Ok(table)
}
