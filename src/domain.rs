use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ScraperError;

/// Tissue codes from the sample portion of a TCGA barcode.
pub const PRIMARY_TUMOR_CODE: &str = "01";
pub const SOLID_TISSUE_NORMAL_CODE: &str = "11";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SampleType {
    Tumor,
    Normal,
    Other,
}

impl SampleType {
    pub const ALL: [SampleType; 3] = [SampleType::Tumor, SampleType::Normal, SampleType::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleType::Tumor => "Tumor",
            SampleType::Normal => "Normal",
            SampleType::Other => "Other",
        }
    }

    /// Name of the download folder holding this class's count files.
    pub fn folder_name(&self) -> &'static str {
        match self {
            SampleType::Tumor => "tumor_tissue",
            SampleType::Normal => "normal_tissue",
            SampleType::Other => "other_tissue",
        }
    }

    pub fn from_tissue_code(code: &str) -> Self {
        match code {
            PRIMARY_TUMOR_CODE => SampleType::Tumor,
            SOLID_TISSUE_NORMAL_CODE => SampleType::Normal,
            _ => SampleType::Other,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleType {
    type Err = ScraperError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Tumor" => Ok(SampleType::Tumor),
            "Normal" => Ok(SampleType::Normal),
            "Other" => Ok(SampleType::Other),
            other => Err(ScraperError::InvalidSampleType(other.to_string())),
        }
    }
}

/// Extract the two-character tissue code from a submitter barcode.
///
/// `TCGA-AB-1234-01A-11R-A123-07` yields `01`: the fourth `-` separated field,
/// first two characters.
pub fn tissue_code(submitter_id: &str) -> Result<&str, ScraperError> {
    let field = submitter_id
        .split('-')
        .nth(3)
        .ok_or_else(|| ScraperError::MalformedSubmitterId {
            id: submitter_id.to_string(),
            reason: "fewer than 4 '-' separated fields".to_string(),
        })?;
    field
        .get(..2)
        .ok_or_else(|| ScraperError::MalformedSubmitterId {
            id: submitter_id.to_string(),
            reason: format!("sample field {field:?} is shorter than 2 characters"),
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorPolicy {
    #[default]
    Abort,
    Skip,
}

impl fmt::Display for FetchErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorPolicy::Abort => write!(f, "abort"),
            FetchErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}
