//! Async file content loading for the explorer with cancellation support.
//!
//! Files are read line by line so a cancelled request stops early, and
//! reading stops at a size cap so huge files stay responsive.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::highlight::highlight_content;
use crate::preview_cache::PreviewContent;

/// Content past this many bytes is not loaded.
const MAX_PREVIEW_BYTES: usize = 2 * 1024 * 1024;

/// Line cap; a file with more lines is marked truncated.
const MAX_PREVIEW_LINES: usize = 20_000;

struct PreviewRequest {
    path: PathBuf,
    request_id: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub enum PreviewResult {
    Ready {
        request_id: u64,
        path: PathBuf,
        content: PreviewContent,
    },
    Error {
        request_id: u64,
        path: PathBuf,
        error: String,
    },
    Cancelled,
}

/// Handle for requesting file content. Cheap to clone.
#[derive(Clone)]
pub struct PreviewLoader {
    tx: mpsc::Sender<PreviewRequest>,
}

impl PreviewLoader {
    /// Spawns the loader task; poll the receiver in the main loop.
    pub fn new() -> (Self, mpsc::Receiver<PreviewResult>) {
        let (request_tx, request_rx) = mpsc::channel::<PreviewRequest>(16);
        let (result_tx, result_rx) = mpsc::channel::<PreviewResult>(16);

        tokio::spawn(preview_loader_task(request_rx, result_tx));

        (Self { tx: request_tx }, result_rx)
    }

    /// Non-blocking send. Cancel the returned token to discard the result.
    pub fn request(&self, path: PathBuf, request_id: u64) -> CancellationToken {
        let cancel = CancellationToken::new();
        let sent = self.tx.try_send(PreviewRequest {
            path,
            request_id,
            cancel: cancel.clone(),
        });
        if let Err(e) = sent {
            log::warn!("preview request {request_id} dropped: {e}");
        }
        cancel
    }
}

async fn preview_loader_task(mut rx: mpsc::Receiver<PreviewRequest>, tx: mpsc::Sender<PreviewResult>) {
    let mut current_cancel: Option<CancellationToken> = None;

    while let Some(PreviewRequest {
        path,
        request_id,
        cancel,
    }) = rx.recv().await
    {
        // A newer request always supersedes the previous one.
        if let Some(token) = current_cancel.replace(cancel.clone()) {
            token.cancel();
        }

        let result = match load_preview(&path, &cancel).await {
            _ if cancel.is_cancelled() => PreviewResult::Cancelled,
            Ok(content) => {
                let (path, content) = with_highlighting(path, content).await;
                if cancel.is_cancelled() {
                    PreviewResult::Cancelled
                } else {
                    PreviewResult::Ready {
                        request_id,
                        path,
                        content,
                    }
                }
            }
            Err(error) => PreviewResult::Error {
                request_id,
                path,
                error,
            },
        };
        let _ = tx.send(result).await;
    }
}

/// Reads `path` up to the size and line caps.
///
/// Returns `Ok` with `is_binary` set and empty text for binary files.
async fn load_preview(path: &Path, cancel: &CancellationToken) -> Result<PreviewContent, String> {
    let file = File::open(path)
        .await
        .map_err(|e| format!("Could not open file: {e}"))?;

    let mut reader = BufReader::new(file);
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut total_bytes = 0usize;
    let mut lines = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err("cancelled".to_string());
        }
        if lines >= MAX_PREVIEW_LINES || total_bytes >= MAX_PREVIEW_BYTES {
            buf.clear();
            let more = reader.read_until(b'\n', &mut buf).await.map(|n| n > 0).unwrap_or(false);
            return Ok(PreviewContent {
                text,
                is_binary: false,
                truncated: more,
                highlighted: None,
            });
        }

        buf.clear();
        let n = match reader.read_until(b'\n', &mut buf).await {
            Ok(n) => n,
            Err(e) if !text.is_empty() => {
                log::debug!("stopping preview of {} early: {e}", path.display());
                break;
            }
            Err(e) => return Err(format!("Error reading file: {e}")),
        };
        if n == 0 {
            break;
        }
        if is_binary_content(&buf) {
            return Ok(PreviewContent {
                text: String::new(),
                is_binary: true,
                truncated: false,
                highlighted: None,
            });
        }
        total_bytes += n;
        lines += 1;
        text.push_str(&String::from_utf8_lossy(&buf));
    }

    Ok(PreviewContent {
        text,
        is_binary: false,
        truncated: false,
        highlighted: None,
    })
}

async fn with_highlighting(path: PathBuf, mut content: PreviewContent) -> (PathBuf, PreviewContent) {
    if content.is_binary || content.text.is_empty() {
        return (path, content);
    }
    let text = content.text.clone();
    let p = path.clone();
    match tokio::task::spawn_blocking(move || highlight_content(&text, &p)).await {
        Ok(lines) => content.highlighted = lines.map(Arc::new),
        Err(e) => log::debug!("highlighting {} failed: {e}", path.display()),
    }
    (path, content)
}

/// Control characters other than tab, newline, carriage return and form feed
/// mark a file as binary.
fn is_binary_content(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, 0x09 | 0x0A | 0x0C | 0x0D))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn binary_detection() {
        assert!(!is_binary_content(b"Line with\ttab\r\n"));
        assert!(is_binary_content(b"Binary\x00null"));
        assert!(is_binary_content(b"\x01SOH"));
    }

    #[tokio::test]
    async fn loads_whole_small_file() {
        let mut f = NamedTempFile::new().unwrap();
        for i in 1..=10 {
            writeln!(f, "Line {i}").unwrap();
        }
        f.flush().unwrap();

        let content = load_preview(f.path(), &CancellationToken::new()).await.unwrap();
        assert!(!content.truncated);
        assert!(!content.is_binary);
        let lines: Vec<_> = content.text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[9], "Line 10");
    }

    #[tokio::test]
    async fn flags_binary_files() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 zipped").unwrap();
        f.flush().unwrap();
        let content = load_preview(f.path(), &CancellationToken::new()).await.unwrap();
        assert!(content.is_binary);
        assert!(content.text.is_empty());
    }

    #[tokio::test]
    async fn loader_reports_missing_file() {
        let (loader, mut rx) = PreviewLoader::new();
        loader.request(PathBuf::from("/definitely/not/here.txt"), 9);
        match rx.recv().await.unwrap() {
            PreviewResult::Error { request_id, .. } => assert_eq!(request_id, 9),
            other => panic!("unexpected {other:?}"),
        }
    }
}
