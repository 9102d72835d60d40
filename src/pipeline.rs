use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::cohort::build_cohort;
use crate::config::ResolvedConfig;
use crate::deseq::DeseqRunner;
use crate::domain::SampleType;
use crate::error::ScraperError;
use crate::fetch::{FetchReport, download_files};
use crate::gdc::GdcClient;
use crate::gene_map::GeneMapping;
use crate::layout::{Layout, write_bytes_atomic};
use crate::manifest::{ClassifiedFileTable, classify_manifest};
use crate::matrix::CountMatrix;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub include_others: bool,
    pub skip_download: bool,
    pub run_script: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub histology: String,
    pub started_at: String,
    pub finished_at: String,
    pub tool: String,
    pub classification: BTreeMap<String, usize>,
    pub fetches: Vec<FetchReport>,
    pub classes: Vec<ClassResult>,
    pub cohort: CohortResult,
    pub artifacts: Artifacts,
    pub script_ran: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassResult {
    pub sample_type: SampleType,
    pub files: usize,
    pub samples: usize,
    pub genes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortResult {
    pub samples: usize,
    pub genes: usize,
    pub discarded_genes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Artifacts {
    pub classification: String,
    pub raw_counts: String,
    pub sample_classes: String,
    pub deseq_output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResult {
    pub manifest: String,
    pub output: Option<String>,
    pub counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssembleResult {
    pub folder: String,
    pub output: String,
    pub samples: usize,
    pub genes: usize,
}

/// Drives one histology from manifest to DESeq input.
pub struct Pipeline<C: GdcClient> {
    layout: Layout,
    config: ResolvedConfig,
    client: C,
}

impl<C: GdcClient> Pipeline<C> {
    pub fn new(layout: Layout, config: ResolvedConfig, client: C) -> Self {
        Self {
            layout,
            config,
            client,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn run(&self, manifest: &Path, options: &RunOptions) -> Result<RunResult, ScraperError> {
        let started_at = iso_timestamp();
        let histology = self
            .layout
            .histology_root()
            .file_name()
            .unwrap_or_default()
            .to_string();
        tracing::info!(histology = %histology, root = %self.layout.histology_root(), "preparing layout");
        self.layout.ensure()?;
        let manifest_copy = self.layout.copy_manifest(manifest)?;

        let table = classify_manifest(manifest_copy.as_std_path(), options.include_others)?;
        let classification_path = self.layout.classification_path();
        table.write_csv(classification_path.as_std_path())?;

        let mapping = self.load_mapping()?;

        let mut fetches = Vec::new();
        let mut classes = Vec::new();
        let mut matrices = Vec::new();
        let mut labels = Vec::new();
        for sample_type in selected_types(options.include_others) {
            let file_ids = table.file_ids(sample_type);
            if file_ids.is_empty() {
                tracing::warn!(%sample_type, "no files for class, skipping");
                continue;
            }
            let folder = self.layout.tissue_dir(sample_type);
            if options.skip_download {
                tracing::info!(%sample_type, folder = %folder, "skipping download");
            } else {
                fetches.push(download_files(
                    &self.client,
                    &file_ids,
                    folder.as_std_path(),
                    self.config.on_fetch_error,
                )?);
            }
            let matrix = crate::assemble::assemble_folder(folder.as_std_path(), &mapping)?;
            classes.push(ClassResult {
                sample_type,
                files: file_ids.len(),
                samples: matrix.n_samples(),
                genes: matrix.n_genes(),
            });
            matrices.push(matrix);
            labels.push(sample_type);
        }

        let cohort = build_cohort(&matrices, &labels)?;
        let raw_counts = self.layout.raw_counts_path();
        let sample_classes = self.layout.sample_classes_path();
        cohort.write(raw_counts.as_std_path(), sample_classes.as_std_path())?;

        let script_ran = match (&self.config.deseq_script, options.run_script) {
            (Some(script), true) => {
                DeseqRunner::new(script)?.run(
                    self.layout.deseq_input_dir().as_std_path(),
                    self.layout.deseq_output_dir().as_std_path(),
                )?;
                true
            }
            (None, true) => {
                tracing::warn!("no deseq_script configured, statistical step not run");
                false
            }
            (_, false) => false,
        };

        let result = RunResult {
            histology,
            started_at,
            finished_at: iso_timestamp(),
            tool: format!("tcga-scraper/{}", env!("CARGO_PKG_VERSION")),
            classification: summary_by_name(&table),
            fetches,
            classes,
            cohort: CohortResult {
                samples: cohort.matrix.n_samples(),
                genes: cohort.matrix.n_genes(),
                discarded_genes: cohort.discarded,
            },
            artifacts: Artifacts {
                classification: classification_path.to_string(),
                raw_counts: raw_counts.to_string(),
                sample_classes: sample_classes.to_string(),
                deseq_output: self.layout.deseq_output_dir().to_string(),
            },
            script_ran,
        };
        let summary = serde_json::to_vec_pretty(&result)
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        write_bytes_atomic(self.layout.run_summary_path().as_std_path(), &summary)?;
        Ok(result)
    }

    fn load_mapping(&self) -> Result<GeneMapping, ScraperError> {
        match &self.config.gene_mapping {
            Some(path) => GeneMapping::load(path),
            None => {
                tracing::warn!("no gene mapping configured, keeping source gene ids");
                Ok(GeneMapping::identity())
            }
        }
    }
}

/// Classify a manifest and optionally persist the table.
pub fn classify_only(
    manifest: &Path,
    include_others: bool,
    output: Option<&Path>,
) -> Result<ClassifyResult, ScraperError> {
    let table = classify_manifest(manifest, include_others)?;
    if let Some(output) = output {
        table.write_csv(output)?;
    }
    Ok(ClassifyResult {
        manifest: manifest.display().to_string(),
        output: output.map(|path| path.display().to_string()),
        counts: summary_by_name(&table),
    })
}

/// Assemble an already downloaded folder into a count matrix CSV.
pub fn assemble_only(
    folder: &Path,
    mapping: &GeneMapping,
    output: &Path,
) -> Result<AssembleResult, ScraperError> {
    let matrix: CountMatrix = crate::assemble::assemble_folder(folder, mapping)?;
    matrix.write_csv(output)?;
    Ok(AssembleResult {
        folder: folder.display().to_string(),
        output: output.display().to_string(),
        samples: matrix.n_samples(),
        genes: matrix.n_genes(),
    })
}

fn selected_types(include_others: bool) -> Vec<SampleType> {
    SampleType::ALL
        .into_iter()
        .filter(|sample_type| include_others || *sample_type != SampleType::Other)
        .collect()
}

fn summary_by_name(table: &ClassifiedFileTable) -> BTreeMap<String, usize> {
    table
        .summary()
        .into_iter()
        .map(|(sample_type, count)| (sample_type.to_string(), count))
        .collect()
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
