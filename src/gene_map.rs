use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ScraperError;

/// Static translation table between two gene naming schemes, e.g. Ensembl
/// gene ids to HGNC symbols.
#[derive(Debug, Clone, Default)]
pub struct GeneMapping {
    entries: HashMap<String, String>,
}

impl GeneMapping {
    /// Mapping with no entries; every gene keeps its identifier.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load a JSON object of `{ "source_id": "target_id" }` pairs.
    pub fn load(path: &Path) -> Result<Self, ScraperError> {
        let content = fs::read_to_string(path)
            .map_err(|_| ScraperError::GeneMappingRead(path.to_path_buf()))?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|err| ScraperError::GeneMappingParse(err.to_string()))?;
        tracing::info!(path = %path.display(), entries = entries.len(), "loaded gene mapping");
        Ok(Self { entries })
    }

    /// Exact match first, then the id without its `.version` suffix, then the
    /// id itself.
    pub fn translate(&self, gene: &str) -> String {
        if let Some(mapped) = self.entries.get(gene) {
            return mapped.clone();
        }
        if let Some(mapped) = strip_version(gene).and_then(|base| self.entries.get(base)) {
            return mapped.clone();
        }
        gene.to_string()
    }
}

/// `ENSG00000141510.16` becomes `ENSG00000141510`; ids without a numeric
/// version suffix yield `None`.
fn strip_version(gene: &str) -> Option<&str> {
    let (base, version) = gene.rsplit_once('.')?;
    if base.is_empty() || version.is_empty() || !version.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn mapping() -> GeneMapping {
        let mut entries = HashMap::new();
        entries.insert("ENSG00000141510".to_string(), "TP53".to_string());
        entries.insert("ENSG00000012048.21".to_string(), "BRCA1".to_string());
        GeneMapping::from_entries(entries)
    }

    #[test]
    fn translate_exact_and_versioned() {
        let mapping = mapping();
        assert_eq!(mapping.translate("ENSG00000012048.21"), "BRCA1");
        assert_eq!(mapping.translate("ENSG00000141510.16"), "TP53");
        assert_eq!(mapping.translate("ENSG00000141510"), "TP53");
    }

    #[test]
    fn unmapped_keeps_identifier() {
        let mapping = mapping();
        assert_eq!(mapping.translate("ENSG00000000003.13"), "ENSG00000000003.13");
        assert_eq!(GeneMapping::identity().translate("X.Y"), "X.Y");
    }

    #[test]
    fn load_missing_file_fails() {
        let err = GeneMapping::load(Path::new("/nonexistent/mapping.json")).unwrap_err();
        assert_matches!(err, ScraperError::GeneMappingRead(_));
    }

    #[test]
    fn load_rejects_non_object() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("mapping.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let err = GeneMapping::load(&path).unwrap_err();
        assert_matches!(err, ScraperError::GeneMappingParse(_));
    }
}
