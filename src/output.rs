use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::{AssembleResult, ClassifyResult, RunResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_classify(result: &ClassifyResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_assemble(result: &AssembleResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_run(result: &RunResult) {
        println!("histology {}", result.histology);
        for (class, count) in &result.classification {
            println!("  {class}: {count} files");
        }
        for fetch in &result.fetches {
            println!(
                "  fetched {}/{} into {} ({} failed)",
                fetch.downloaded,
                fetch.requested,
                fetch.folder,
                fetch.failed.len()
            );
        }
        println!(
            "cohort: {} samples x {} genes ({} duplicate genes removed)",
            result.cohort.samples,
            result.cohort.genes,
            result.cohort.discarded_genes.len()
        );
        println!("  counts:  {}", result.artifacts.raw_counts);
        println!("  classes: {}", result.artifacts.sample_classes);
        if result.script_ran {
            println!("  results: {}", result.artifacts.deseq_output);
        }
    }

    pub fn print_classify(result: &ClassifyResult) {
        println!("manifest {}", result.manifest);
        for (class, count) in &result.counts {
            println!("  {class}: {count}");
        }
        if let Some(output) = &result.output {
            println!("  written to {output}");
        }
    }

    pub fn print_assemble(result: &AssembleResult) {
        println!(
            "{}: {} samples x {} genes -> {}",
            result.folder, result.samples, result.genes, result.output
        );
    }
}
