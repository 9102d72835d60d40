use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::ScraperError;

pub const DEFAULT_BASE_URL: &str = "https://api.gdc.cancer.gov/data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Fetch a single GDC file by id into a folder.
pub trait GdcClient {
    /// Returns the path of the written file.
    fn fetch(&self, file_id: &str, destination_dir: &Path) -> Result<PathBuf, ScraperError>;
}

#[derive(Clone)]
pub struct GdcHttpClient {
    client: Client,
    base_url: String,
}

impl GdcHttpClient {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_base_url(DEFAULT_BASE_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("tcga-scraper/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ScraperError::GdcHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| ScraperError::GdcHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn file_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.base_url, file_id)
    }

    fn write_response_to_file(
        &self,
        file_id: &str,
        mut response: reqwest::blocking::Response,
        destination_dir: &Path,
    ) -> Result<PathBuf, ScraperError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GDC request failed".to_string());
            return Err(ScraperError::GdcStatus {
                file_id: file_id.to_string(),
                status,
                message,
            });
        }
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| file_id.to_string());
        let destination = destination_dir.join(file_name);

        let mut temp = tempfile::Builder::new()
            .prefix(".gdc-download")
            .tempfile_in(destination_dir)
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut temp)
            .map_err(|err| ScraperError::GdcHttp(format!("{file_id}: {err}")))?;
        if destination.exists() {
            fs::remove_file(&destination)
                .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        }
        temp.persist(&destination)
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        Ok(destination)
    }
}

impl GdcClient for GdcHttpClient {
    fn fetch(&self, file_id: &str, destination_dir: &Path) -> Result<PathBuf, ScraperError> {
        let url = self.file_url(file_id);
        tracing::debug!(%url, "gdc.request");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| ScraperError::GdcHttp(err.to_string()))?;
        self.write_response_to_file(file_id, response, destination_dir)
    }
}

/// File name suggested by a `Content-Disposition` header, stripped of any
/// directory components.
pub fn attachment_file_name(header: &str) -> Option<String> {
    static FILENAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = FILENAME_RE.get_or_init(|| {
        Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("valid filename regex")
    });
    let raw = re.captures(header)?.get(1)?.as_str().trim();
    let name = Path::new(raw).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
