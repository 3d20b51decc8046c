use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::debug;
use zip::{write::SimpleFileOptions, CompressionMethod};

use crate::progress::ProgressConfig;

use super::{EncodedPage, EpisodeWriter};

/// Save as a zip (or cbz) archive.
#[derive(Debug, Clone)]
pub struct ZipWriter {
    compression_method: CompressionMethod,
    progress: ProgressConfig,
}

impl Default for ZipWriter {
    fn default() -> Self {
        ZipWriter {
            compression_method: CompressionMethod::Deflated,
            progress: ProgressConfig::default(),
        }
    }
}

impl ZipWriter {
    pub fn new(compression_method: CompressionMethod, progress: ProgressConfig) -> Self {
        ZipWriter {
            compression_method,
            progress,
        }
    }

    fn write_archive(
        path: PathBuf,
        pages: Vec<EncodedPage>,
        compression_method: CompressionMethod,
        progress: indicatif::ProgressBar,
    ) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut zip = zip::ZipWriter::new(file);

        for page in pages {
            debug!("Adding {} to the archive", page.file_name());
            let options = SimpleFileOptions::default().compression_method(compression_method);
            zip.start_file(page.file_name(), options)?;
            zip.write_all(&page.bytes)?;
            progress.inc(1);
        }

        zip.finish()?;
        progress.finish();
        Ok(())
    }
}

impl EpisodeWriter for ZipWriter {
    async fn write<P: AsRef<Path>>(&self, pages: Vec<EncodedPage>, path: P) -> Result<()> {
        let progress = self.progress.build(pages.len(), "Writing the zip...")?;
        let path = path.as_ref().to_path_buf();
        let compression_method = self.compression_method;

        tokio::task::spawn_blocking(move || {
            Self::write_archive(path, pages, compression_method, progress)
        })
        .await?
    }
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use super::*;

    #[tokio::test]
    async fn test_write_cbz() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("episode.cbz");

        let pages = vec![
            EncodedPage::new("01", "png", vec![9; 64]),
            EncodedPage::new("02-03a", "png", vec![7; 32]),
        ];
        ZipWriter::new(CompressionMethod::Deflated, ProgressConfig::disabled())
            .write(pages, &path)
            .await?;

        let mut archive = zip::ZipArchive::new(File::open(&path)?)?;
        assert_eq!(archive.len(), 2);

        let mut bytes = Vec::new();
        archive.by_name("02-03a.png")?.read_to_end(&mut bytes)?;
        assert_eq!(bytes, vec![7; 32]);
        Ok(())
    }
}
