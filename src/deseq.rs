use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ScraperError;

/// Runs the downstream differential-expression script on the prepared input
/// folder. R scripts go through `Rscript`; anything else is executed directly.
#[derive(Debug, Clone)]
pub struct DeseqRunner {
    script: PathBuf,
    interpreter: Option<PathBuf>,
}

impl DeseqRunner {
    pub fn new(script: &Path) -> Result<Self, ScraperError> {
        if !script.exists() {
            return Err(ScraperError::MissingTool(script.display().to_string()));
        }
        let is_r = script
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("r"))
            .unwrap_or(false);
        let interpreter = if is_r {
            let rscript = find_in_path("Rscript")
                .ok_or_else(|| ScraperError::MissingTool("Rscript".to_string()))?;
            Some(rscript)
        } else {
            None
        };
        Ok(Self {
            script: script.to_path_buf(),
            interpreter,
        })
    }

    pub fn command(&self, input_dir: &Path, output_dir: &Path) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.script);
                cmd
            }
            None => Command::new(&self.script),
        };
        cmd.arg(input_dir).arg(output_dir);
        cmd
    }

    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<(), ScraperError> {
        tracing::info!(
            script = %self.script.display(),
            input = %input_dir.display(),
            "running statistical script"
        );
        let output = self
            .command(input_dir, output_dir)
            .output()
            .map_err(|err| ScraperError::ScriptFailed(err.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", self.script.display(), output.status)
        } else {
            stderr
        };
        Err(ScraperError::ScriptFailed(message))
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
