use std::{future::Future, path::Path};

use anyhow::Result;

use crate::utils::Bytes;

pub mod raw;
pub mod zip;

/// An encoded page ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPage {
    /// File name without extension, e.g. `07` or `02-03a`
    pub stem: String,
    pub extension: String,
    pub bytes: Bytes,
}

impl EncodedPage {
    pub fn new(stem: impl Into<String>, extension: impl Into<String>, bytes: Bytes) -> Self {
        EncodedPage {
            stem: stem.into(),
            extension: extension.into(),
            bytes,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem, self.extension)
    }
}

/// A trait for saving an episode to disk.
pub trait EpisodeWriter {
    /// Save pages
    fn write<P: AsRef<Path>>(
        &self,
        pages: Vec<EncodedPage>,
        path: P,
    ) -> impl Future<Output = Result<()>>;
}
