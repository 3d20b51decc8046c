use std::path::Path;

use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use rayon::{iter::IntoParallelIterator, iter::ParallelIterator, slice::ParallelSliceMut};
use tracing::{debug, info, warn};

use crate::{
    data::{MangaEpisode, MangaPage},
    error::DescrambleError,
    io::EncodedPage,
    pipeline::{PageSource, PipelineBuilder, WriterConfig},
    progress::ProgressConfig,
    session::SessionToken,
    solver::ImageSolver,
    utils::{self, Bytes, OutputFormat},
};

use super::{
    crypto::derive_key,
    data::{Descriptor, PageGeometry, ReaderPage, ReaderResponse},
    solver::Solver,
    spread,
};

/// A page that could not be descrambled
#[derive(Debug)]
pub struct PageFailure {
    pub page: u32,
    pub error: anyhow::Error,
}

/// Outcome of descrambling one episode
#[derive(Debug, Default)]
pub struct Report {
    /// Sorted by page number, joined spreads included
    pub pages: Vec<EncodedPage>,
    pub failures: Vec<PageFailure>,
}

impl Report {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pipeline for descrambling an episode of the FAKKU reader
#[derive(Debug, Clone)]
pub struct Pipeline {
    solver: Solver,
    session: Option<SessionToken>,
    progress: ProgressConfig,
    writer_config: WriterConfig,
    num_threads: usize,
    join_spreads: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            solver: Solver::new(),
            session: None,
            progress: ProgressConfig::default(),
            writer_config: WriterConfig::default(),
            num_threads: num_cpus::get(),
            join_spreads: false,
        }
    }
}

impl PipelineBuilder for Pipeline {
    fn set_progress(self, progress: ProgressConfig) -> Self {
        Self { progress, ..self }
    }

    fn set_writer_config(self, writer_config: WriterConfig) -> Self {
        Self {
            writer_config,
            ..self
        }
    }

    fn set_num_threads(self, num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
            ..self
        }
    }
}

impl Pipeline {
    pub fn set_session(self, session: Option<SessionToken>) -> Self {
        Self { session, ..self }
    }

    pub fn set_join_spreads(self, join_spreads: bool) -> Self {
        Self {
            join_spreads,
            ..self
        }
    }

    /// Derive the key and decrypt the descriptor. `None` for unscrambled content.
    pub fn descriptor(
        &self,
        response: &ReaderResponse,
    ) -> Result<Option<Descriptor>, DescrambleError> {
        let (Some(key_hash), Some(key_data)) = (&response.key_hash, &response.key_data) else {
            return Ok(None);
        };
        let session = self
            .session
            .as_ref()
            .ok_or(DescrambleError::MissingSessionToken)?;

        let key = derive_key(key_hash, session.value());
        let descriptor = Descriptor::decrypt(&key, key_data)?;
        info!("Decrypted the descriptor of {} pages", descriptor.len());

        Ok(Some(descriptor))
    }

    /// Pages without geometry keep their original bytes.
    fn render(
        solver: &Solver,
        bytes: Bytes,
        geometry: Option<PageGeometry>,
        output: OutputFormat,
    ) -> Result<(Bytes, &'static str)> {
        match geometry {
            Some(geometry) => {
                let image = solver.solve_from_bytes(&bytes, Some(&geometry))?;
                Ok((output.encode(&image)?, output.extension()))
            }
            None => match image::guess_format(&bytes) {
                Ok(format) => Ok((bytes, utils::extension_of(format))),
                Err(_) => {
                    warn!("Image is of unknown type, saving it as is");
                    Ok((bytes, "bin"))
                }
            },
        }
    }

    async fn descramble_page<S: PageSource<ReaderResponse>>(
        &self,
        source: &S,
        page: &ReaderPage,
        geometry: Option<PageGeometry>,
        page_count: usize,
    ) -> Result<EncodedPage> {
        let bytes = source.fetch_image(page).await?;

        let solver = self.solver.clone();
        let output = self.writer_config.output_format();
        let (bytes, extension) =
            tokio::task::spawn_blocking(move || Self::render(&solver, bytes, geometry, output))
                .await??;

        Ok(EncodedPage::new(
            utils::page_stem(page.number(), page_count),
            extension,
            bytes,
        ))
    }

    /// Fetch and descramble every page. A failed page is reported and does
    /// not stop the others.
    pub async fn descramble<S: PageSource<ReaderResponse> + Sync>(
        &self,
        source: &S,
    ) -> Result<Report> {
        let response = source.fetch_episode().await?;
        let descriptor = self.descriptor(&response)?;
        let page_count = response.page_count();

        let pages = response.pages();
        info!("Descrambling {} pages", pages.len());

        let results = self
            .progress
            .build(pages.len(), "Descrambling...")?
            .wrap_stream(stream::iter(pages))
            .map(|page| {
                let geometry = match &descriptor {
                    Some(descriptor) => {
                        let geometry = descriptor.get(page.index()).copied();
                        if geometry.is_none() {
                            debug!("No descriptor entry for page {}", page.number());
                        }
                        geometry
                    }
                    None => None,
                };
                async move {
                    let result = self
                        .descramble_page(source, &page, geometry, page_count)
                        .await;
                    (page, result)
                }
            })
            .buffer_unordered(self.num_threads)
            .collect::<Vec<_>>()
            .await;

        let mut report = Report::default();
        let mut done = Vec::with_capacity(results.len());
        for (page, result) in results {
            match result {
                Ok(encoded) => done.push((page, encoded)),
                Err(error) => {
                    warn!("Failed to descramble page {}: {:#}", page.number(), error);
                    report.failures.push(PageFailure {
                        page: page.number(),
                        error,
                    });
                }
            }
        }
        report.failures.sort_by_key(|failure| failure.page);

        let spreads = if self.join_spreads {
            self.join_spread_pages(&response, &mut done).await?
        } else {
            Vec::new()
        };

        report.pages = done.into_iter().map(|(_, encoded)| encoded).collect();
        report.pages.extend(spreads);
        report.pages.par_sort_by(|a, b| a.stem.cmp(&b.stem));

        Ok(report)
    }

    /// Join spreads into extra images. Joined pages are renamed with a `b`
    /// (left) and `c` (right) suffix, the spread gets `a`.
    async fn join_spread_pages(
        &self,
        response: &ReaderResponse,
        pages: &mut [(ReaderPage, EncodedPage)],
    ) -> Result<Vec<EncodedPage>> {
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (left, right) in response.spread_pairs() {
            let find = |index: &str| pages.iter().position(|(page, _)| page.index() == index);
            match (find(left.as_str()), find(right.as_str())) {
                (Some(l), Some(r))
                    if pairs.iter().any(|&(a, b)| [a, b].contains(&l) || [a, b].contains(&r)) =>
                {
                    warn!("Page already joined into a spread ({}, {}), ignoring", left, right)
                }
                (Some(l), Some(r)) => pairs.push((l, r)),
                _ => warn!(
                    "Requested to join non-existent pages ({}, {}), ignoring",
                    left, right
                ),
            }
        }
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let direction = response.direction();
        let output = self.writer_config.output_format();
        let jobs = pairs
            .iter()
            .map(|&(l, r)| {
                (
                    format!("{}-{}a", pages[l].1.stem, pages[r].1.stem),
                    pages[l].1.bytes.clone(),
                    pages[r].1.bytes.clone(),
                )
            })
            .collect::<Vec<_>>();

        let joined = tokio::task::spawn_blocking(move || {
            jobs.into_par_iter()
                .map(|(stem, left, right)| {
                    let bytes = spread::join_encoded(&left, &right, direction, output);
                    (stem, bytes)
                })
                .collect::<Vec<_>>()
        })
        .await
        .context("Spread worker panicked")?;

        let mut spreads = Vec::new();
        for ((l, r), (stem, bytes)) in pairs.into_iter().zip(joined) {
            match bytes {
                Ok(bytes) => {
                    spreads.push(EncodedPage::new(stem, output.extension(), bytes));
                    pages[l].1.stem.push('b');
                    pages[r].1.stem.push('c');
                }
                Err(error) => warn!("Failed to join spread {}: {:#}", stem, error),
            }
        }
        info!("Joined {} spreads", spreads.len());

        Ok(spreads)
    }

    /// Descramble an episode and save it to `path`.
    pub async fn download<S, T>(&self, source: &S, path: T) -> Result<Report>
    where
        S: PageSource<ReaderResponse> + Sync,
        T: AsRef<Path>,
    {
        let mut report = self.descramble(source).await?;
        let pages = std::mem::take(&mut report.pages);
        let written = pages.len();

        self.writer_config
            .write(pages, path.as_ref(), self.progress.clone(), self.num_threads)
            .await?;
        info!("Wrote {} images to {}", written, path.as_ref().display());

        Ok(report)
    }
}
