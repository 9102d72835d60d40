use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ScraperError;
use crate::fetch::{is_gzip, list_files};
use crate::gene_map::GeneMapping;
use crate::matrix::CountMatrix;

/// HTSeq-count (as served by GDC for the legacy `HTSeq - Counts` workflow)
/// ends every file with five summary rows: `__no_feature`, `__ambiguous`,
/// `__too_low_aQual`, `__not_aligned` and `__alignment_not_unique`.
pub const HTSEQ_SUMMARY_ROWS: usize = 5;

const SUMMARY_PREFIX: &str = "__";

/// Merge every count file in `folder` into one genes by samples matrix.
///
/// Summary rows are dropped per file before gene ids are translated, and
/// genes that are zero in every sample are removed.
pub fn assemble_folder(folder: &Path, mapping: &GeneMapping) -> Result<CountMatrix, ScraperError> {
    let files = count_files(folder)?;

    let mut owners = HashMap::<String, PathBuf>::new();
    let mut columns = Vec::with_capacity(files.len());
    for path in &files {
        let sample = sample_id(path);
        if let Some(previous) = owners.insert(sample.clone(), path.clone()) {
            return Err(ScraperError::DuplicateSample {
                sample,
                first: previous.display().to_string(),
                second: path.display().to_string(),
            });
        }
        columns.push(CountMatrix::from_column(&sample, read_count_file(path)?));
    }

    let mut matrix = CountMatrix::outer_join(&columns.iter().collect::<Vec<_>>());
    matrix.relabel(|gene| mapping.translate(gene));
    let removed = matrix.drop_zero_rows();
    tracing::info!(
        folder = %folder.display(),
        samples = matrix.n_samples(),
        genes = matrix.n_genes(),
        zero_rows_removed = removed,
        "assembled count matrix"
    );
    Ok(matrix)
}

/// Decompressed count files in `folder`, sorted by name.
pub fn count_files(folder: &Path) -> Result<Vec<PathBuf>, ScraperError> {
    let mut files = Vec::new();
    for path in list_files(folder)? {
        if is_gzip(&path) {
            return Err(ScraperError::Decompress {
                path,
                message: "archive was not decompressed".to_string(),
            });
        }
        files.push(path);
    }
    if files.is_empty() {
        return Err(ScraperError::NoCountFiles(folder.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Sample id of a count file: its name up to the first `.`.
pub fn sample_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}

/// Parse a headerless two-column `gene_id<TAB>count` file, without its
/// trailing summary rows.
pub fn read_count_file(path: &Path) -> Result<Vec<(String, u64)>, ScraperError> {
    let content = fs::read_to_string(path).map_err(|err| ScraperError::CountParse {
        path: path.to_path_buf(),
        line: 0,
        message: err.to_string(),
    })?;
    let parse_err = |line: usize, message: String| ScraperError::CountParse {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut rows = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(gene), Some(count), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(parse_err(index + 1, "expected two columns".to_string()));
        };
        let count = count
            .parse::<u64>()
            .map_err(|err| parse_err(index + 1, format!("count {count:?}: {err}")))?;
        rows.push((gene.to_string(), count));
    }

    if rows.len() < HTSEQ_SUMMARY_ROWS {
        return Err(parse_err(
            rows.len(),
            format!("fewer than {HTSEQ_SUMMARY_ROWS} rows, summary block missing"),
        ));
    }
    let summary = rows.split_off(rows.len() - HTSEQ_SUMMARY_ROWS);
    if let Some((gene, _)) = summary.iter().find(|(gene, _)| !gene.starts_with(SUMMARY_PREFIX)) {
        tracing::warn!(
            path = %path.display(),
            %gene,
            "dropped trailing row that does not look like an HTSeq summary row"
        );
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SUMMARY: &str = "__no_feature\t10\n__ambiguous\t2\n__too_low_aQual\t0\n__not_aligned\t0\n__alignment_not_unique\t4\n";

    fn write_counts(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), format!("{body}{SUMMARY}")).unwrap();
    }

    #[test]
    fn summary_rows_are_dropped() {
        let temp = tempfile::tempdir().unwrap();
        write_counts(temp.path(), "s1.htseq.counts", "ENSG1.1\t5\nENSG2.1\t0\n");

        let rows = read_count_file(&temp.path().join("s1.htseq.counts")).unwrap();
        assert_eq!(
            rows,
            vec![("ENSG1.1".to_string(), 5), ("ENSG2.1".to_string(), 0)]
        );
    }

    #[test]
    fn short_file_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("s1.counts");
        fs::write(&path, "ENSG1\t1\n").unwrap();
        assert_matches!(
            read_count_file(&path),
            Err(ScraperError::CountParse { .. })
        );
    }

    #[test]
    fn negative_count_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        write_counts(temp.path(), "s1.counts", "ENSG1\t-1\n");
        let err = read_count_file(&temp.path().join("s1.counts")).unwrap_err();
        assert_matches!(err, ScraperError::CountParse { line: 1, .. });
    }

    #[test]
    fn sample_id_strips_extensions() {
        assert_eq!(sample_id(Path::new("/x/abc-123.htseq.counts")), "abc-123");
        assert_eq!(sample_id(Path::new("plain")), "plain");
    }

    #[test]
    fn assemble_translates_and_filters() {
        let temp = tempfile::tempdir().unwrap();
        write_counts(temp.path(), "a.htseq.counts", "ENSG1.1\t5\nENSG2.1\t0\nENSG3.1\t1\n");
        write_counts(temp.path(), "b.htseq.counts", "ENSG1.1\t7\nENSG2.1\t0\nENSG4.1\t2\n");
        let mut entries = HashMap::new();
        entries.insert("ENSG1".to_string(), "GENE1".to_string());
        let mapping = GeneMapping::from_entries(entries);

        let matrix = assemble_folder(temp.path(), &mapping).unwrap();

        assert_eq!(matrix.samples(), ["a", "b"]);
        assert_eq!(matrix.genes(), ["GENE1", "ENSG3.1", "ENSG4.1"]);
        assert_eq!(matrix.get("GENE1", "b"), Some(7));
        assert_eq!(matrix.get("ENSG4.1", "a"), Some(0));
        for index in 0..matrix.n_genes() {
            assert!(matrix.row(index).iter().any(|&count| count > 0));
        }
    }

    #[test]
    fn empty_folder_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = assemble_folder(temp.path(), &GeneMapping::identity()).unwrap_err();
        assert_matches!(err, ScraperError::NoCountFiles(_));
    }

    #[test]
    fn leftover_archive_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        write_counts(temp.path(), "a.counts", "ENSG1\t1\n");
        fs::write(temp.path().join("b.counts.gz"), b"\x1f\x8b").unwrap();
        let err = assemble_folder(temp.path(), &GeneMapping::identity()).unwrap_err();
        assert_matches!(err, ScraperError::Decompress { .. });
    }
}
