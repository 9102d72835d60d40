use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Serialize;

use crate::domain::FetchErrorPolicy;
use crate::error::ScraperError;
use crate::gdc::GdcClient;

/// A progress line is logged once every this many files.
pub const PROGRESS_INTERVAL: usize = 50;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub folder: String,
    pub requested: usize,
    pub downloaded: usize,
    pub failed: Vec<FailedFetch>,
    pub decompressed: usize,
    pub folder_existed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFetch {
    pub file_id: String,
    pub message: String,
}

/// Download every file id into `destination`, then gunzip the archives there.
///
/// An existing `destination` is reused with a warning; files already in it are
/// neither detected nor skipped.
pub fn download_files<C: GdcClient + ?Sized>(
    client: &C,
    file_ids: &[String],
    destination: &Path,
    policy: FetchErrorPolicy,
) -> Result<FetchReport, ScraperError> {
    let mut report = FetchReport {
        folder: destination.display().to_string(),
        requested: file_ids.len(),
        ..FetchReport::default()
    };

    if destination.exists() {
        tracing::warn!(
            folder = %destination.display(),
            "destination folder already exists, files inside are not checked for duplicates"
        );
        report.folder_existed = true;
    } else {
        fs::create_dir_all(destination)
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    }

    let total = file_ids.len();
    tracing::info!(folder = %destination.display(), total, "starting downloads");
    for (index, file_id) in file_ids.iter().enumerate() {
        if index % PROGRESS_INTERVAL == 0 {
            tracing::info!(index, total, "on file");
        }
        match client.fetch(file_id, destination) {
            Ok(path) => {
                tracing::debug!(%file_id, path = %path.display(), "gdc.response");
                report.downloaded += 1;
            }
            Err(err) => match policy {
                FetchErrorPolicy::Abort => return Err(err),
                FetchErrorPolicy::Skip => {
                    tracing::warn!(%file_id, error = %err, "fetch failed, skipping file");
                    report.failed.push(FailedFetch {
                        file_id: file_id.clone(),
                        message: err.to_string(),
                    });
                }
            },
        }
    }

    report.decompressed = decompress_folder(destination)?.len();
    tracing::info!(
        folder = %destination.display(),
        downloaded = report.downloaded,
        failed = report.failed.len(),
        decompressed = report.decompressed,
        "downloads finished"
    );
    Ok(report)
}

/// Gunzip every `*.gz` file in `folder` next to itself and remove the archive.
pub fn decompress_folder(folder: &Path) -> Result<Vec<PathBuf>, ScraperError> {
    let mut archives = list_files(folder)?
        .into_iter()
        .filter(|path| is_gzip(path))
        .collect::<Vec<_>>();
    archives.sort();

    let mut out = Vec::with_capacity(archives.len());
    for archive in archives {
        out.push(gunzip_file(&archive)?);
    }
    Ok(out)
}

pub fn gunzip_file(archive: &Path) -> Result<PathBuf, ScraperError> {
    let target = archive.with_extension("");
    let decompress_err = |message: String| ScraperError::Decompress {
        path: archive.to_path_buf(),
        message,
    };

    let input = fs::File::open(archive).map_err(|err| decompress_err(err.to_string()))?;
    let parent = archive
        .parent()
        .ok_or_else(|| decompress_err("archive has no parent folder".to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".gunzip")
        .tempfile_in(parent)
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    let mut decoder = GzDecoder::new(io::BufReader::new(input));
    io::copy(&mut decoder, &mut temp).map_err(|err| decompress_err(err.to_string()))?;
    temp.persist(&target)
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    fs::remove_file(archive).map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    Ok(target)
}

pub(crate) fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(true)
}

/// Regular, non-hidden files directly inside `folder`.
pub(crate) fn list_files(folder: &Path) -> Result<Vec<PathBuf>, ScraperError> {
    let entries = fs::read_dir(folder)
        .map_err(|err| ScraperError::Filesystem(format!("read {}: {err}", folder.display())))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    Ok(files)
}
