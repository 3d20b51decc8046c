use std::{future::Future, path::Path};

use anyhow::Result;

use crate::{
    data::MangaEpisode,
    io::{raw::RawWriter, zip::ZipWriter, EncodedPage, EpisodeWriter},
    progress::ProgressConfig,
    utils::{Bytes, OutputFormat},
};

/// How to save the episode
#[derive(Debug, Clone, PartialEq)]
pub enum SaveFormat {
    Raw,
    Zip {
        compression_method: zip::CompressionMethod,
    },
}

/// Configuration for the writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    save_format: SaveFormat,
    output_format: OutputFormat,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig::new(SaveFormat::Raw, OutputFormat::default())
    }
}

impl WriterConfig {
    pub fn new(save_format: SaveFormat, output_format: OutputFormat) -> Self {
        WriterConfig {
            save_format,
            output_format,
        }
    }

    pub fn save_format(&self) -> SaveFormat {
        self.save_format.clone()
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Write pages with the writer matching the save format
    pub async fn write<T: AsRef<Path>>(
        &self,
        pages: Vec<EncodedPage>,
        path: T,
        progress: ProgressConfig,
        num_threads: usize,
    ) -> Result<()> {
        match self.save_format() {
            SaveFormat::Raw => {
                RawWriter::new(progress, num_threads)
                    .write(pages, path)
                    .await
            }
            SaveFormat::Zip { compression_method } => {
                ZipWriter::new(compression_method, progress)
                    .write(pages, path)
                    .await
            }
        }
    }
}

/// Where an episode and its page images come from.
///
/// Fetching is asynchronous; descrambling starts only once both the episode
/// and a page's image are in memory.
pub trait PageSource<E: MangaEpisode> {
    /// Fetch the episode
    fn fetch_episode(&self) -> impl Future<Output = Result<E>> + Send;

    /// Fetch the image of a page
    fn fetch_image(&self, page: &E::Page) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Pipeline configuration trait
pub trait PipelineBuilder: Default {
    fn set_progress(self, progress: ProgressConfig) -> Self;
    fn set_writer_config(self, writer_config: WriterConfig) -> Self;
    fn set_num_threads(self, num_threads: usize) -> Self;
}
