use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ScraperError {
    #[error("failed to read manifest at {0}")]
    ManifestRead(PathBuf),

    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("malformed submitter id {id:?}: {reason}")]
    #[diagnostic(help("expected a TCGA barcode such as TCGA-AB-1234-01A-11R-A123-07"))]
    MalformedSubmitterId { id: String, reason: String },

    #[error("invalid sample type: {0}")]
    InvalidSampleType(String),

    #[error("failed to read classification table: {0}")]
    ClassificationRead(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read gene mapping at {0}")]
    #[diagnostic(help("set `gene_mapping` in the config file or pass --gene-mapping"))]
    GeneMappingRead(PathBuf),

    #[error("failed to parse gene mapping: {0}")]
    GeneMappingParse(String),

    #[error("GDC request failed: {0}")]
    GdcHttp(String),

    #[error("GDC returned status {status} for {file_id}: {message}")]
    GdcStatus {
        file_id: String,
        status: u16,
        message: String,
    },

    #[error("failed to decompress {path}: {message}")]
    Decompress { path: PathBuf, message: String },

    #[error("no count files found in {0}")]
    #[diagnostic(help("check that the download and decompression steps produced files"))]
    NoCountFiles(PathBuf),

    #[error("invalid count file {path} line {line}: {message}")]
    CountParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{matrices} matrices but {labels} class labels")]
    CohortShape { matrices: usize, labels: usize },

    #[error("no sample class has any count files")]
    #[diagnostic(help("check the manifest barcodes, or pass --optional to include other tissue types"))]
    EmptyCohort,

    #[error("sample {0} has no class label")]
    UnlabeledSample(String),

    #[error("sample {sample} appears in both {first} and {second}")]
    DuplicateSample {
        sample: String,
        first: String,
        second: String,
    },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("statistical script failed: {0}")]
    ScriptFailed(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
