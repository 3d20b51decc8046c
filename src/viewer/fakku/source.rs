use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::{data::MangaPage, error::DescrambleError, pipeline::PageSource, utils::Bytes};

use super::data::{ReaderPage, ReaderResponse};

/// Reader payload inside a saved response directory
pub const RESPONSE_FILE: &str = "api.json";
/// Optional copy of the `/read` HTML page
pub const READER_PAGE_FILE: &str = "read.html";

const ACCESS_DENIED_MARKER: &str = "You do not have access to this content.";

static PAGE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.[A-Za-z0-9]+$").unwrap());

/// Fail when the reader page says the content was not purchased.
pub fn ensure_access(html: &str) -> Result<(), DescrambleError> {
    if html.contains(ACCESS_DENIED_MARKER) {
        return Err(DescrambleError::AccessDenied);
    }
    Ok(())
}

/// A saved response: `api.json` plus raw page images named by page number
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    images: BTreeMap<u32, PathBuf>,
}

impl DirectorySource {
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        let reader_page = dir.join(READER_PAGE_FILE);
        if tokio::fs::try_exists(&reader_page).await? {
            ensure_access(&tokio::fs::read_to_string(&reader_page).await?)?;
        }

        let mut images = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(number) = name
                .to_str()
                .and_then(|name| PAGE_FILE.captures(name))
                .and_then(|captures| captures[1].parse::<u32>().ok())
            else {
                continue;
            };
            images.insert(number, entry.path());
        }
        debug!("Found {} page images in {}", images.len(), dir.display());

        Ok(DirectorySource { dir, images })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PageSource<ReaderResponse> for DirectorySource {
    async fn fetch_episode(&self) -> Result<ReaderResponse> {
        let path = self.dir.join(RESPONSE_FILE);
        let json = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        ReaderResponse::from_json(&json)
            .with_context(|| format!("Failed to decode {}", path.display()))
    }

    async fn fetch_image(&self, page: &ReaderPage) -> Result<Bytes> {
        let path = self
            .images
            .get(&page.number())
            .with_context(|| format!("Image of page {} not found", page.number()))?;
        Ok(tokio::fs::read(path).await?)
    }
}

#[cfg(test)]
mod test {
    use crate::data::MangaEpisode;

    use super::*;

    #[test]
    fn test_ensure_access() {
        assert!(ensure_access("<h1>Reader</h1>").is_ok());
        let err = ensure_access("<div><h3>You do not have access to this content.</h3></div>")
            .unwrap_err();
        assert!(matches!(err, DescrambleError::AccessDenied));
    }

    #[tokio::test]
    async fn test_open_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        tokio::fs::write(
            dir.path().join(RESPONSE_FILE),
            r#"{"pages": {"1": {"page": 1, "image": "https://example.com/1.png"}}}"#,
        )
        .await?;
        tokio::fs::write(dir.path().join("01.png"), b"png").await?;
        tokio::fs::write(dir.path().join("notes.txt"), b"skip").await?;

        let source = DirectorySource::open(dir.path()).await?;
        let episode = source.fetch_episode().await?;
        let pages = episode.pages();
        assert_eq!(source.fetch_image(&pages[0]).await?, b"png");
        Ok(())
    }

    #[tokio::test]
    async fn test_open_denied() -> Result<()> {
        let dir = tempfile::tempdir()?;
        tokio::fs::write(
            dir.path().join(READER_PAGE_FILE),
            "You do not have access to this content.",
        )
        .await?;

        let err = DirectorySource::open(dir.path()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DescrambleError>(),
            Some(DescrambleError::AccessDenied)
        ));
        Ok(())
    }
}
