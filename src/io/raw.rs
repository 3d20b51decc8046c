use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;

use crate::progress::ProgressConfig;

use super::{EncodedPage, EpisodeWriter};

/// Save pages as plain files in a directory.
#[derive(Debug, Clone)]
pub struct RawWriter {
    progress: ProgressConfig,
    num_threads: usize,
}

impl Default for RawWriter {
    fn default() -> Self {
        RawWriter {
            progress: ProgressConfig::default(),
            num_threads: num_cpus::get(),
        }
    }
}

impl RawWriter {
    pub fn new(progress: ProgressConfig, num_threads: usize) -> Self {
        RawWriter {
            progress,
            num_threads: num_threads.max(1),
        }
    }
}

impl EpisodeWriter for RawWriter {
    async fn write<P: AsRef<Path>>(&self, pages: Vec<EncodedPage>, path: P) -> Result<()> {
        tokio::fs::create_dir_all(path.as_ref())
            .await
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        let dir = Arc::new(path.as_ref().to_path_buf());

        self.progress
            .build(pages.len(), "Writing images...")?
            .wrap_stream(futures::stream::iter(pages))
            .map(|page| {
                let dir = dir.clone();
                async move {
                    let path = dir.join(page.file_name());
                    debug!("Writing {}", path.display());

                    let mut file = File::options()
                        .create(true)
                        .write(true)
                        .truncate(true)
                        .open(&path)
                        .await
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    file.write_all(&page.bytes).await?;
                    file.flush().await?;

                    Result::<_>::Ok(())
                }
            })
            .buffer_unordered(self.num_threads)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }
}
