use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::domain::SampleType;
use crate::error::ScraperError;
use crate::matrix::CountMatrix;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleAnnotation {
    pub sample: String,
    #[serde(rename = "Type")]
    pub sample_type: SampleType,
}

/// Combined matrix over all sample classes plus its sample to class table.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub matrix: CountMatrix,
    pub annotations: Vec<SampleAnnotation>,
    /// Gene labels whose later rows were removed by deduplication; the same
    /// list is logged as the `genes` field of the duplicate warning.
    pub discarded: Vec<String>,
}

impl Cohort {
    pub fn write(&self, counts_path: &Path, classes_path: &Path) -> Result<(), ScraperError> {
        self.matrix.write_csv(counts_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(["sample", "Type"])
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        for annotation in &self.annotations {
            writer
                .serialize(annotation)
                .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        }
        let content = writer
            .into_inner()
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        crate::layout::write_bytes_atomic(classes_path, &content)
    }

    pub fn class_counts(&self) -> HashMap<SampleType, usize> {
        let mut counts = HashMap::new();
        for annotation in &self.annotations {
            *counts.entry(annotation.sample_type).or_insert(0) += 1;
        }
        counts
    }
}

/// Join per-class matrices into one cohort matrix.
///
/// Missing gene/sample pairs are zero. Duplicate gene rows keep their first
/// occurrence; the rest are reported. A sample id found in more than one input
/// is an error, and so is an empty input.
pub fn build_cohort(
    matrices: &[CountMatrix],
    labels: &[SampleType],
) -> Result<Cohort, ScraperError> {
    if matrices.len() != labels.len() {
        return Err(ScraperError::CohortShape {
            matrices: matrices.len(),
            labels: labels.len(),
        });
    }
    if matrices.is_empty() {
        return Err(ScraperError::EmptyCohort);
    }

    let mut owner = HashMap::<&str, SampleType>::new();
    for (matrix, label) in matrices.iter().zip(labels) {
        for sample in matrix.samples() {
            if let Some(previous) = owner.insert(sample.as_str(), *label) {
                return Err(ScraperError::DuplicateSample {
                    sample: sample.clone(),
                    first: previous.to_string(),
                    second: label.to_string(),
                });
            }
        }
    }

    let mut matrix = CountMatrix::outer_join(&matrices.iter().collect::<Vec<_>>());
    let discarded = matrix.dedup_rows();
    if !discarded.is_empty() {
        tracing::warn!(
            count = discarded.len(),
            genes = %discarded.join(","),
            "duplicate gene ids removed after combining matrices, verify these manually"
        );
    }

    let annotations = matrix
        .samples()
        .iter()
        .map(|sample| {
            owner
                .get(sample.as_str())
                .map(|sample_type| SampleAnnotation {
                    sample: sample.clone(),
                    sample_type: *sample_type,
                })
                .ok_or_else(|| ScraperError::UnlabeledSample(sample.clone()))
        })
        .collect::<Result<Vec<_>, ScraperError>>()?;

    tracing::info!(
        samples = matrix.n_samples(),
        genes = matrix.n_genes(),
        discarded = discarded.len(),
        "built cohort matrix"
    );
    Ok(Cohort {
        matrix,
        annotations,
        discarded,
    })
}
