use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use camino::Utf8Path;
use flate2::Compression;
use flate2::write::GzEncoder;

use tcga_scraper::config::ResolvedConfig;
use tcga_scraper::domain::SampleType;
use tcga_scraper::error::ScraperError;
use tcga_scraper::gdc::GdcClient;
use tcga_scraper::layout::Layout;
use tcga_scraper::pipeline::{Pipeline, RunOptions};

const SUMMARY: &str = "__no_feature\t1\n__ambiguous\t1\n__too_low_aQual\t1\n__not_aligned\t1\n__alignment_not_unique\t1\n";

/// Serves a small gzipped HTSeq file per id.
#[derive(Default)]
struct MockGdc;

impl GdcClient for MockGdc {
    fn fetch(&self, file_id: &str, destination_dir: &Path) -> Result<PathBuf, ScraperError> {
        let body = match file_id {
            "tumor-a" => "ENSG01.5\t10\nENSG02.1\t0\nENSG03.2\t4\n",
            "tumor-b" => "ENSG01.5\t12\nENSG02.1\t0\nENSG03.2\t0\n",
            "normal-a" => "ENSG01.5\t3\nENSG02.1\t0\nENSG04.1\t9\n",
            _ => "ENSG09.1\t1\n",
        };
        let path = destination_dir.join(format!("{file_id}.htseq.counts.gz"));
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        encoder.write_all(SUMMARY.as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();
        Ok(path)
    }
}

fn entity(file_id: &str, barcode: &str) -> String {
    format!(
        r#"{{"file_id": "{file_id}", "associated_entities": [{{"entity_submitter_id": "{barcode}", "case_id": "case-{file_id}"}}]}}"#
    )
}

fn setup(root: &Path) -> (PathBuf, ResolvedConfig) {
    let manifest = root.join("cases.json");
    let entries = [
        entity("tumor-a", "TCGA-A1-0001-01A-11R-A000-07"),
        entity("tumor-b", "TCGA-A1-0002-01A-11R-A000-07"),
        entity("normal-a", "TCGA-A1-0001-11A-11R-A000-07"),
        entity("metastatic", "TCGA-A1-0003-06A-11R-A000-07"),
    ];
    fs::write(&manifest, format!("[{}]", entries.join(","))).unwrap();

    let mapping = root.join("mapping.json");
    fs::write(&mapping, r#"{"ENSG01": "GENE1", "ENSG04.1": "GENE4"}"#).unwrap();

    let config = ResolvedConfig {
        gene_mapping: Some(mapping),
        ..ResolvedConfig::default()
    };
    (manifest, config)
}

fn options() -> RunOptions {
    RunOptions {
        include_others: false,
        skip_download: false,
        run_script: false,
    }
}

#[test]
fn run_builds_deseq_inputs() {
    let temp = tempfile::tempdir().unwrap();
    let (manifest, config) = setup(temp.path());
    let root = Utf8Path::from_path(temp.path()).unwrap();
    let pipeline = Pipeline::new(Layout::new(root, "COAD"), config, MockGdc::default());

    let result = pipeline.run(&manifest, &options()).unwrap();

    assert_eq!(result.histology, "COAD");
    assert_eq!(result.classification.get("Tumor"), Some(&2));
    assert_eq!(result.classification.get("Normal"), Some(&1));
    assert_eq!(result.classification.get("Other"), None);
    assert_eq!(result.cohort.samples, 3);
    assert!(!result.script_ran);

    let layout = pipeline.layout();
    let counts = fs::read_to_string(layout.raw_counts_path().as_std_path()).unwrap();
    assert_eq!(
        counts,
        "gene_id,tumor-a,tumor-b,normal-a\nGENE1,10,12,3\nENSG03.2,4,0,0\nGENE4,0,0,9\n"
    );
    let classes = fs::read_to_string(layout.sample_classes_path().as_std_path()).unwrap();
    assert_eq!(
        classes,
        "sample,Type\ntumor-a,Tumor\ntumor-b,Tumor\nnormal-a,Normal\n"
    );
    assert!(layout.classification_path().as_std_path().exists());
    assert!(layout.run_summary_path().as_std_path().exists());
    assert!(layout.scraped_data_dir().join("cases.json").as_std_path().exists());
    assert!(layout.deseq_output_dir().as_std_path().is_dir());
    assert!(
        layout
            .tissue_dir(SampleType::Normal)
            .join("normal-a.htseq.counts")
            .as_std_path()
            .exists()
    );
}

#[test]
fn optional_samples_get_their_own_folder() {
    let temp = tempfile::tempdir().unwrap();
    let (manifest, config) = setup(temp.path());
    let root = Utf8Path::from_path(temp.path()).unwrap();
    let client = MockGdc::default();
    let pipeline = Pipeline::new(Layout::new(root, "COAD"), config, client);
    let options = RunOptions {
        include_others: true,
        ..options()
    };

    let result = pipeline.run(&manifest, &options).unwrap();

    assert_eq!(result.cohort.samples, 4);
    assert_eq!(result.classes.len(), 3);
    assert!(
        pipeline
            .layout()
            .tissue_dir(SampleType::Other)
            .join("metastatic.htseq.counts")
            .as_std_path()
            .exists()
    );
}

#[test]
fn skip_download_reuses_existing_folders() {
    let temp = tempfile::tempdir().unwrap();
    let (manifest, config) = setup(temp.path());
    let root = Utf8Path::from_path(temp.path()).unwrap();

    let first = Pipeline::new(Layout::new(root, "COAD"), config.clone(), MockGdc::default());
    first.run(&manifest, &options()).unwrap();

    let second = Pipeline::new(Layout::new(root, "COAD"), config, MockGdc::default());
    let options = RunOptions {
        skip_download: true,
        ..options()
    };
    let result = second.run(&manifest, &options).unwrap();

    assert!(result.fetches.is_empty());
    assert_eq!(result.cohort.samples, 3);
}

#[test]
fn skip_download_without_files_fails() {
    let temp = tempfile::tempdir().unwrap();
    let (manifest, config) = setup(temp.path());
    let root = Utf8Path::from_path(temp.path()).unwrap();
    let pipeline = Pipeline::new(Layout::new(root, "COAD"), config, MockGdc::default());
    let layout = pipeline.layout().clone();
    fs::create_dir_all(layout.tissue_dir(SampleType::Tumor).as_std_path()).unwrap();
    let options = RunOptions {
        skip_download: true,
        ..options()
    };

    let err = pipeline.run(&manifest, &options).unwrap_err();
    assert_matches!(err, ScraperError::NoCountFiles(_));
}

#[test]
fn missing_gene_mapping_fails_fast() {
    let temp = tempfile::tempdir().unwrap();
    let (manifest, mut config) = setup(temp.path());
    config.gene_mapping = Some(temp.path().join("absent.json"));
    let root = Utf8Path::from_path(temp.path()).unwrap();
    let client = MockGdc::default();
    let pipeline = Pipeline::new(Layout::new(root, "COAD"), config, client);

    let err = pipeline.run(&manifest, &options()).unwrap_err();
    assert_matches!(err, ScraperError::GeneMappingRead(_));
}

#[test]
fn manifest_without_selected_classes_fails_before_artifacts() {
    let temp = tempfile::tempdir().unwrap();
    let (_, config) = setup(temp.path());
    let manifest = temp.path().join("metastatic_only.json");
    let entries = [
        entity("metastatic", "TCGA-A1-0003-06A-11R-A000-07"),
        entity("metastatic-b", "TCGA-A1-0004-06A-11R-A000-07"),
    ];
    fs::write(&manifest, format!("[{}]", entries.join(","))).unwrap();
    let root = Utf8Path::from_path(temp.path()).unwrap();
    let pipeline = Pipeline::new(Layout::new(root, "COAD"), config, MockGdc::default());

    let err = pipeline.run(&manifest, &options()).unwrap_err();

    assert_matches!(err, ScraperError::EmptyCohort);
    let layout = pipeline.layout();
    assert!(!layout.raw_counts_path().as_std_path().exists());
    assert!(!layout.sample_classes_path().as_std_path().exists());
    assert!(!layout.run_summary_path().as_std_path().exists());
}
