use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::ScraperError;

/// Gene by sample count table.
///
/// Sample ids are unique. Gene labels may repeat until [`CountMatrix::dedup_rows`]
/// runs, which is why joins align rows by `(label, occurrence)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountMatrix {
    genes: Vec<String>,
    samples: Vec<String>,
    rows: Vec<Vec<u64>>,
}

impl CountMatrix {
    pub fn new(samples: Vec<String>) -> Self {
        Self {
            genes: Vec::new(),
            samples,
            rows: Vec::new(),
        }
    }

    /// Single-sample matrix from `(gene, count)` pairs.
    pub fn from_column(sample: &str, values: Vec<(String, u64)>) -> Self {
        let mut matrix = Self::new(vec![sample.to_string()]);
        for (gene, count) in values {
            matrix.genes.push(gene);
            matrix.rows.push(vec![count]);
        }
        matrix
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn row(&self, index: usize) -> &[u64] {
        &self.rows[index]
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.samples.iter().position(|value| value == sample)
    }

    /// Count for the first row labelled `gene`.
    pub fn get(&self, gene: &str, sample: &str) -> Option<u64> {
        let column = self.sample_index(sample)?;
        let row = self.genes.iter().position(|value| value == gene)?;
        Some(self.rows[row][column])
    }

    /// Outer join on columns. Missing gene/sample pairs are zero, rows keep
    /// first-appearance order. Sample ids must be unique across `matrices`.
    pub fn outer_join(matrices: &[&CountMatrix]) -> CountMatrix {
        let samples = matrices
            .iter()
            .flat_map(|matrix| matrix.samples.iter().cloned())
            .collect::<Vec<_>>();
        let width = samples.len();
        let mut joined = CountMatrix::new(samples);
        let mut index = HashMap::<(String, usize), usize>::new();

        let mut offset = 0;
        for matrix in matrices {
            let mut seen = HashMap::<&str, usize>::new();
            for (gene, values) in matrix.genes.iter().zip(&matrix.rows) {
                let occurrence = seen.entry(gene.as_str()).or_insert(0);
                let key = (gene.clone(), *occurrence);
                *occurrence += 1;
                let row = *index.entry(key).or_insert_with(|| {
                    joined.genes.push(gene.clone());
                    joined.rows.push(vec![0; width]);
                    joined.rows.len() - 1
                });
                joined.rows[row][offset..offset + values.len()].copy_from_slice(values);
            }
            offset += matrix.n_samples();
        }
        joined
    }

    pub fn relabel<F>(&mut self, mut map: F)
    where
        F: FnMut(&str) -> String,
    {
        for gene in &mut self.genes {
            *gene = map(gene);
        }
    }

    /// Remove rows whose counts are zero in every sample. Returns the number removed.
    pub fn drop_zero_rows(&mut self) -> usize {
        self.retain_rows(|_, values| values.iter().any(|&count| count != 0))
    }

    /// Keep the first row of each gene label; returns the labels of discarded rows.
    pub fn dedup_rows(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut discarded = Vec::new();
        self.retain_rows(|gene, _| {
            if seen.insert(gene.to_string()) {
                true
            } else {
                discarded.push(gene.to_string());
                false
            }
        });
        discarded
    }

    fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str, &[u64]) -> bool,
    {
        let before = self.genes.len();
        let genes = std::mem::take(&mut self.genes);
        let rows = std::mem::take(&mut self.rows);
        for (gene, values) in genes.into_iter().zip(rows) {
            if keep(&gene, &values) {
                self.genes.push(gene);
                self.rows.push(values);
            }
        }
        before - self.genes.len()
    }

    pub fn has_duplicate_genes(&self) -> bool {
        let mut seen = HashSet::new();
        !self.genes.iter().all(|gene| seen.insert(gene.as_str()))
    }

    /// CSV with a `gene_id` header cell followed by one column per sample.
    pub fn to_csv(&self) -> Result<Vec<u8>, ScraperError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = Vec::with_capacity(self.samples.len() + 1);
        header.push("gene_id");
        header.extend(self.samples.iter().map(String::as_str));
        writer
            .write_record(&header)
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        for (gene, values) in self.genes.iter().zip(&self.rows) {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(gene.clone());
            record.extend(values.iter().map(u64::to_string));
            writer
                .write_record(&record)
                .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|err| ScraperError::Filesystem(err.to_string()))
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ScraperError> {
        crate::layout::write_bytes_atomic(path, &self.to_csv()?)
    }
}
