use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::data::{MangaEpisode, MangaPage, ReadingDirection};
use crate::error::DescrambleError;
use crate::permutation;

use super::crypto::decrypt_key_data;

/// Payload of the reader endpoint `/hentai/{id}/read`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderResponse {
    #[serde(default)]
    pub key_hash: Option<String>,
    #[serde(default)]
    pub key_data: Option<String>,
    /// keyed by page index
    pub pages: BTreeMap<String, ReaderPage>,
    #[serde(default)]
    pub spreads: Vec<Vec<u32>>,
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderPage {
    pub page: u32,
    pub image: Url,
    #[serde(default)]
    pub thumb: Option<Url>,
    #[serde(skip)]
    index: String,
}

impl ReaderPage {
    /// Key of the page in `pages` and in the descriptor
    pub fn index(&self) -> &str {
        &self.index
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default)]
    pub content_name: Option<String>,
    #[serde(default)]
    pub content_pages: Option<u32>,
    #[serde(default)]
    pub content_direction: Option<ReadingDirection>,
}

impl ReaderResponse {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut response: ReaderResponse = serde_json::from_str(json)?;
        for (index, page) in response.pages.iter_mut() {
            page.index = index.clone();
        }
        Ok(response)
    }

    /// Whether the pages come with an encrypted descriptor
    pub fn is_scrambled(&self) -> bool {
        self.key_hash.is_some() && self.key_data.is_some()
    }

    /// Spreads with two distinct ends, as `(left, right)` page indices.
    ///
    /// A right page ends at most one spread, a later spread replaces the left
    /// page of an earlier one.
    pub fn spread_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for spread in &self.spreads {
            let (Some(left), Some(right)) = (spread.first(), spread.last()) else {
                continue;
            };
            if left == right {
                continue;
            }
            let (left, right) = (left.to_string(), right.to_string());
            match pairs.iter_mut().find(|(_, r)| *r == right) {
                Some(pair) => pair.0 = left,
                None => pairs.push((left, right)),
            }
        }
        pairs
    }
}

impl MangaPage for ReaderPage {
    fn number(&self) -> u32 {
        self.page
    }
}

impl MangaEpisode for ReaderResponse {
    type Page = ReaderPage;

    fn title(&self) -> Option<String> {
        self.content.as_ref()?.content_name.clone()
    }

    fn page_count(&self) -> usize {
        self.content
            .as_ref()
            .and_then(|content| content.content_pages)
            .map(|pages| pages as usize)
            .unwrap_or(self.pages.len())
    }

    fn pages(&self) -> Vec<ReaderPage> {
        let mut pages = self.pages.values().cloned().collect::<Vec<_>>();
        pages.sort_by_key(|page| page.page);
        pages
    }

    fn direction(&self) -> ReadingDirection {
        self.content
            .as_ref()
            .and_then(|content| content.content_direction)
            .unwrap_or_default()
    }
}

/// Largest canvas a page may be reassembled onto, in pixels
pub const MAX_PIXELS: u64 = 1 << 27;

/// Geometry of one scrambled page as stored in the descriptor.
///
/// Both dimensions are masked with `xor_key`, which also seeds the tile order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub raw_width: i64,
    pub raw_height: i64,
    pub xor_key: i64,
}

impl PageGeometry {
    pub fn new(raw_width: i64, raw_height: i64, xor_key: i64) -> Self {
        PageGeometry {
            raw_width,
            raw_height,
            xor_key,
        }
    }

    /// Parse a descriptor key list.
    ///
    /// Four values are `[a, b, c, seed]` where `a, b, c` is the shuffled
    /// `(raw_width, raw_height, xor_key)`. Three values are already in order.
    pub fn from_keys(keys: &[i64]) -> Result<Self, DescrambleError> {
        let ordered = match keys {
            [a, b, c, seed] => permutation::unpermute(&[*a, *b, *c], seed),
            [_, _, _] => keys.to_vec(),
            _ => {
                return Err(DescrambleError::MalformedDescriptor(format!(
                    "expected 3 or 4 keys, got {}",
                    keys.len()
                )))
            }
        };

        Ok(PageGeometry::new(ordered[0], ordered[1], ordered[2]))
    }

    pub fn width(&self) -> i64 {
        self.raw_width ^ self.xor_key
    }

    pub fn height(&self) -> i64 {
        self.raw_height ^ self.xor_key
    }

    /// Recovered `(width, height)`, rejected unless both are positive and the
    /// page fits in [`MAX_PIXELS`].
    pub fn dimensions(&self) -> Result<(u32, u32), DescrambleError> {
        let (width, height) = (self.width(), self.height());
        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 && u64::from(w) * u64::from(h) <= MAX_PIXELS => {
                Ok((w, h))
            }
            _ => Err(DescrambleError::GeometryInvalid { width, height }),
        }
    }
}

/// Decrypted descriptor: page index to geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pages: HashMap<String, PageGeometry>,
}

impl Descriptor {
    /// Decrypt and parse the `key_data` blob.
    pub fn decrypt(key: &str, key_data: &str) -> Result<Self, DescrambleError> {
        Self::parse(&decrypt_key_data(key, key_data)?)
    }

    /// Parse decrypted descriptor text. Pages with an empty key list are left
    /// out and pass through unscrambled.
    pub fn parse(plain: &str) -> Result<Self, DescrambleError> {
        let raw: HashMap<String, Vec<i64>> = serde_json::from_str(plain)
            .map_err(|e| DescrambleError::MalformedDescriptor(e.to_string()))?;

        let pages = raw
            .into_iter()
            .filter(|(_, keys)| !keys.is_empty())
            .map(|(index, keys)| Ok((index, PageGeometry::from_keys(&keys)?)))
            .collect::<Result<HashMap<_, _>, DescrambleError>>()?;

        Ok(Descriptor { pages })
    }

    pub fn get(&self, index: &str) -> Option<&PageGeometry> {
        self.pages.get(index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
