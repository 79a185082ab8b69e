// Hardcover Mirror - Local cache and search for Hardcover libraries
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Cover image downloads
//!
//! Covers are fetched in parallel, at most [`MAX_CONCURRENT_DOWNLOADS`] at a
//! time. A file that already exists is never fetched again. Failures are
//! logged and counted but never returned to the caller.

use crate::error::{HardcoverError, Result};
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound on simultaneous cover downloads
pub const MAX_CONCURRENT_DOWNLOADS: usize = 5;

const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// File name a cover URL is stored under: the last path segment, query dropped
pub fn cover_file_name(image_url: &str) -> Option<String> {
    let name = match Url::parse(image_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.last().map(str::to_string)),
        // Not absolute; fall back to plain string handling
        Err(_) => image_url
            .split(|c| c == '?' || c == '#')
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    }?;

    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Outcome counts of a download batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverReport {
    pub requested: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum CoverResult {
    Downloaded,
    Skipped,
    Failed,
}

/// Bounded parallel downloader writing into one directory
#[derive(Debug, Clone)]
pub struct CoverDownloader {
    client: Client,
    dir: PathBuf,
    semaphore: Arc<Semaphore>,
}

impl CoverDownloader {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(client, dir))
    }

    pub fn with_client<P: Into<PathBuf>>(client: Client, dir: P) -> Self {
        Self {
            client,
            dir: dir.into(),
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_DOWNLOADS)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download every URL not already on disk and wait for all of them
    pub async fn download_all<I>(&self, urls: I) -> CoverReport
    where
        I: IntoIterator<Item = String>,
    {
        let mut report = CoverReport::default();

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Cannot create cover directory {}: {}", self.dir.display(), e);
        }

        // Two URLs mapping to one file name would race on one file
        let mut seen = HashSet::new();
        let mut handles = Vec::new();

        for url in urls {
            if url.is_empty() {
                continue;
            }
            let key = cover_file_name(&url).unwrap_or_else(|| url.clone());
            if !seen.insert(key) {
                debug!("Cover {} shares its file name with an earlier URL, skipped", url);
                continue;
            }
            report.requested += 1;

            let client = self.client.clone();
            let dir = self.dir.clone();
            let semaphore = Arc::clone(&self.semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return CoverResult::Failed,
                };

                match download_one(&client, &dir, &url).await {
                    Ok(true) => CoverResult::Downloaded,
                    Ok(false) => CoverResult::Skipped,
                    Err(e) => {
                        warn!("Cover download failed for {}: {}", url, e);
                        CoverResult::Failed
                    }
                }
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(CoverResult::Downloaded) => report.downloaded += 1,
                Ok(CoverResult::Skipped) => report.skipped += 1,
                Ok(CoverResult::Failed) => report.failed += 1,
                Err(e) => {
                    warn!("Cover download task panicked: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            requested = report.requested,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "Cover downloads finished"
        );
        report
    }
}

/// Fetch one cover. Returns `Ok(false)` when the file already existed.
async fn download_one(client: &Client, dir: &Path, url: &str) -> Result<bool> {
    let file_name = cover_file_name(url)
        .ok_or_else(|| HardcoverError::InvalidDownloadUrl(url.to_string()))?;
    let target = dir.join(&file_name);

    if tokio::fs::try_exists(&target).await.unwrap_or(false) {
        debug!("Cover already present: {}", target.display());
        return Ok(false);
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(HardcoverError::DownloadFailed(format!(
            "{}: status code {}",
            url,
            response.status()
        )));
    }

    // Write beside the target and rename, so a partial file is never mistaken for a cover
    let partial = dir.join(format!("{}.part", file_name));
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e.into());
            }
        };
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&partial, &target).await?;
    debug!("Cover saved: {}", target.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_file_name_strips_query() {
        assert_eq!(
            cover_file_name("https://assets.hardcover.app/edition/123/abc.jpeg?w=200").as_deref(),
            Some("abc.jpeg")
        );
        assert_eq!(cover_file_name("covers/xyz.png").as_deref(), Some("xyz.png"));
        assert_eq!(cover_file_name("https://assets.hardcover.app/"), None);
        assert_eq!(cover_file_name(""), None);
    }

    #[tokio::test]
    async fn test_existing_cover_is_skipped() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("dune.jpg"), b"jpeg").expect("write cover");

        let downloader = CoverDownloader::new(dir.path()).expect("Failed to create downloader");
        let report = downloader
            .download_all(vec![
                "https://assets.hardcover.app/books/1/dune.jpg".to_string(),
                "https://assets.hardcover.app/books/1/dune.jpg".to_string(),
                String::new(),
            ])
            .await;

        assert_eq!(report.requested, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_urls_sharing_a_file_name_download_once() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("cover.jpg"), b"jpeg").expect("write cover");

        let downloader = CoverDownloader::new(dir.path()).expect("Failed to create downloader");
        let report = downloader
            .download_all(vec![
                "https://assets.hardcover.app/books/1/cover.jpg".to_string(),
                "https://assets.hardcover.app/books/2/cover.jpg?w=200".to_string(),
            ])
            .await;

        assert_eq!(report.requested, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_failed_downloads_are_counted_and_leave_no_partial_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("dune.jpg"), b"jpeg").expect("write cover");

        let downloader = CoverDownloader::new(dir.path()).expect("Failed to create downloader");
        let report = downloader
            .download_all(vec![
                "http://127.0.0.1:1/a.jpg".to_string(),
                "http://127.0.0.1:1/b.jpg".to_string(),
                "https://assets.hardcover.app/books/1/dune.jpg".to_string(),
                "https://assets.hardcover.app/".to_string(),
            ])
            .await;

        assert_eq!(report.requested, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 3);
        assert_eq!(report.downloaded, 0);

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("Failed to list dir")
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["dune.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_downloads_never_exceed_concurrency_limit() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let port = listener.local_addr().expect("local addr").port();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let server = {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                loop {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        break;
                    };
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    tokio::spawn(async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);

                        let mut request = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => request.extend_from_slice(&buf[..n]),
                            }
                        }
                        tokio::time::sleep(Duration::from_millis(50)).await;

                        // Leave the count before answering, so a freed permit never overlaps
                        active.fetch_sub(1, Ordering::SeqCst);
                        let _ = socket
                            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\njpeg")
                            .await;
                        let _ = socket.shutdown().await;
                    });
                }
            })
        };

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let client = Client::builder().no_proxy().build().expect("Failed to build client");
        let downloader = CoverDownloader::with_client(client, dir.path());
        let urls = (0..12).map(|i| format!("http://127.0.0.1:{}/covers/{}.jpg", port, i));
        let report = downloader.download_all(urls).await;
        server.abort();

        assert_eq!(report.downloaded, 12);
        assert_eq!(report.failed, 0);
        assert!(peak.load(Ordering::SeqCst) <= MAX_CONCURRENT_DOWNLOADS);
        assert!(peak.load(Ordering::SeqCst) > 1);
        assert_eq!(
            std::fs::read(dir.path().join("7.jpg")).expect("cover written"),
            b"jpeg"
        );
    }
}
