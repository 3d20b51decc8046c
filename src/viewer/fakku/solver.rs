use image::{imageops, DynamicImage, RgbImage};
use tracing::debug;

use crate::{error::DescrambleError, permutation, solver::ImageSolver};

use super::data::PageGeometry;

/// Side of a square tile in pixels
pub const TILE_SIZE: u32 = 128;

/// Tile layout derived from a page's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub width_pieces: u32,
    pub height_pieces: u32,
    /// Landscape pages crop the last row, portrait ones the last column.
    pub is_horizontal: bool,
    /// Shift of the trailing row or column, always below `TILE_SIZE`.
    pub offset: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> Self {
        // strict: square pages are not horizontal
        let is_horizontal = f64::from(width) / f64::from(height) > 1.0;
        let smaller_edge = if is_horizontal { height } else { width };

        TileGrid {
            width,
            height,
            width_pieces: width.div_ceil(TILE_SIZE),
            height_pieces: height.div_ceil(TILE_SIZE),
            is_horizontal,
            // 128 * ceil(edge / 128) - edge, without the overflowing multiply
            offset: (TILE_SIZE - smaller_edge % TILE_SIZE) % TILE_SIZE,
        }
    }

    pub fn from_geometry(geometry: &PageGeometry) -> Result<Self, DescrambleError> {
        let (width, height) = geometry.dimensions()?;
        Ok(Self::new(width, height))
    }

    pub fn len(&self) -> usize {
        self.width_pieces as usize * self.height_pieces as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(column, row)` of a tile index
    pub fn cell(&self, index: usize) -> (u32, u32) {
        let pieces = self.width_pieces as usize;
        ((index % pieces) as u32, (index / pieces) as u32)
    }

    /// Whether a destination tile sits in the cropped row or column
    pub fn is_last_piece(&self, index: usize) -> bool {
        let (column, row) = self.cell(index);
        if self.is_horizontal {
            row == self.height_pieces - 1
        } else {
            column == self.width_pieces - 1
        }
    }

    /// Top-left corner a destination tile is drawn at. The trailing tile is
    /// pulled back by `offset` so it ends flush with the page edge.
    pub fn destination(&self, index: usize) -> (i64, i64) {
        let (column, row) = self.cell(index);
        let mut x = i64::from(column * TILE_SIZE);
        let mut y = i64::from(row * TILE_SIZE);

        if self.is_last_piece(index) {
            if self.is_horizontal {
                y -= i64::from(self.offset);
            } else {
                x -= i64::from(self.offset);
            }
        }

        (x, y)
    }

    /// Top-left corner of a tile in the scrambled image
    pub fn source(&self, index: usize) -> (u32, u32) {
        let (column, row) = self.cell(index);
        (column * TILE_SIZE, row * TILE_SIZE)
    }
}

/// Reassembles pages that were cut into shuffled 128px tiles
#[derive(Debug, Clone, Default)]
pub struct Solver {}

impl Solver {
    pub fn new() -> Self {
        Solver {}
    }

    /// Copy every tile of `scrambled` to its original position.
    pub fn reassemble(
        &self,
        scrambled: &RgbImage,
        geometry: &PageGeometry,
    ) -> Result<RgbImage, DescrambleError> {
        let grid = TileGrid::from_geometry(geometry)?;
        debug!(
            "Image: {}x{}, seed {}, {}x{} pieces",
            grid.width, grid.height, geometry.xor_key, grid.width_pieces, grid.height_pieces
        );

        // the tile order is keyed by the same value that masks the dimensions
        let order = permutation::generate(grid.len(), geometry.xor_key);
        debug!("Piece order: {:?}", order);

        let mut canvas = RgbImage::new(grid.width, grid.height);
        for (index, &value) in order.iter().enumerate() {
            let (sx, sy) = grid.source(value);
            let (dx, dy) = grid.destination(index);

            let tile = imageops::crop_imm(scrambled, sx, sy, TILE_SIZE, TILE_SIZE).to_image();
            imageops::replace(&mut canvas, &tile, dx, dy);
        }

        Ok(canvas)
    }
}

impl ImageSolver for Solver {
    type Key = PageGeometry;

    fn solve(
        &self,
        image: DynamicImage,
        key: Option<&PageGeometry>,
    ) -> Result<DynamicImage, DescrambleError> {
        match key {
            Some(geometry) => {
                let solved = self.reassemble(&image.to_rgb8(), geometry)?;
                Ok(DynamicImage::ImageRgb8(solved))
            }
            None => Ok(image),
        }
    }
}

#[cfg(test)]
mod test {
    use image::Rgb;

    use super::*;

    fn tile_color(index: u32) -> Rgb<u8> {
        Rgb([(index * 40) as u8, 255 - (index * 40) as u8, index as u8])
    }

    /// Scramble `width`x`height` of solid tiles the way the server does.
    fn scramble(width: u32, height: u32, xor_key: i64) -> (RgbImage, PageGeometry) {
        let grid = TileGrid::new(width, height);
        let order = permutation::generate(grid.len(), xor_key);

        let mut scrambled = RgbImage::new(
            grid.width_pieces * TILE_SIZE,
            grid.height_pieces * TILE_SIZE,
        );
        for (index, &value) in order.iter().enumerate() {
            let (sx, sy) = grid.source(value);
            let tile = RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, tile_color(index as u32));
            imageops::replace(&mut scrambled, &tile, i64::from(sx), i64::from(sy));
        }

        let geometry = PageGeometry::new(
            i64::from(width) ^ xor_key,
            i64::from(height) ^ xor_key,
            xor_key,
        );
        (scrambled, geometry)
    }

    #[test]
    fn test_offset_computation() {
        let grid = TileGrid::new(300, 500);
        assert_eq!(grid.width_pieces, 3);
        assert_eq!(grid.height_pieces, 4);
        assert!(!grid.is_horizontal);
        assert_eq!(grid.offset, 84);

        let grid = TileGrid::new(500, 300);
        assert!(grid.is_horizontal);
        assert_eq!(grid.offset, 84);

        let grid = TileGrid::new(256, 512);
        assert_eq!(grid.offset, 0);
    }

    #[test]
    fn test_square_is_not_horizontal() {
        let grid = TileGrid::new(200, 200);
        assert!(!grid.is_horizontal);
        assert!(grid.is_last_piece(1));
        assert!(!grid.is_last_piece(2));
    }

    #[test]
    fn test_destination_of_last_column() {
        let grid = TileGrid::new(200, 256);
        assert_eq!(grid.destination(0), (0, 0));
        assert_eq!(grid.destination(1), (200 - 128, 0));
        assert_eq!(grid.destination(2), (0, 128));
        assert_eq!(grid.destination(3), (200 - 128, 128));
    }

    #[test]
    fn test_destination_of_last_row() {
        let grid = TileGrid::new(256, 200);
        assert!(grid.is_horizontal);
        assert_eq!(grid.destination(1), (128, 0));
        assert_eq!(grid.destination(2), (0, 200 - 128));
        assert_eq!(grid.destination(3), (128, 200 - 128));
    }

    #[test]
    fn test_reassemble_portrait_flush_right() -> anyhow::Result<()> {
        let (scrambled, geometry) = scramble(200, 256, 0x2a);
        let solved = Solver::new().reassemble(&scrambled, &geometry)?;

        assert_eq!(solved.dimensions(), (200, 256));
        // tiles 0 and 2 start at x = 0
        assert_eq!(*solved.get_pixel(0, 0), tile_color(0));
        assert_eq!(*solved.get_pixel(0, 255), tile_color(2));
        // tiles 1 and 3 end on the right edge, overlapping the first column
        assert_eq!(*solved.get_pixel(72, 0), tile_color(1));
        assert_eq!(*solved.get_pixel(199, 127), tile_color(1));
        assert_eq!(*solved.get_pixel(71, 0), tile_color(0));
        assert_eq!(*solved.get_pixel(199, 255), tile_color(3));
        Ok(())
    }

    #[test]
    fn test_reassemble_landscape_flush_bottom() -> anyhow::Result<()> {
        let (scrambled, geometry) = scramble(300, 200, 1234);
        let solved = Solver::new().reassemble(&scrambled, &geometry)?;

        assert_eq!(solved.dimensions(), (300, 200));
        let grid = TileGrid::new(300, 200);
        assert_eq!(grid.width_pieces, 3);
        assert_eq!(grid.offset, 56);

        assert_eq!(*solved.get_pixel(0, 0), tile_color(0));
        assert_eq!(*solved.get_pixel(129, 199), tile_color(4));
        assert_eq!(*solved.get_pixel(257, 72), tile_color(5));
        assert_eq!(*solved.get_pixel(257, 71), tile_color(2));
        Ok(())
    }

    #[test]
    fn test_reassemble_rejects_invalid_geometry() {
        let scrambled = RgbImage::new(128, 128);
        let geometry = PageGeometry::new(9, 128, 9);
        let err = Solver::new().reassemble(&scrambled, &geometry).unwrap_err();
        assert!(matches!(err, DescrambleError::GeometryInvalid { .. }));
    }

    #[test]
    fn test_extreme_dimensions() {
        let grid = TileGrid::new(u32::MAX, u32::MAX);
        assert_eq!(grid.offset, 1);
        assert_eq!(grid.width_pieces, u32::MAX.div_ceil(TILE_SIZE));

        let scrambled = RgbImage::new(128, 128);
        let geometry = PageGeometry::new(u32::MAX as i64, u32::MAX as i64, 0);
        assert!(matches!(
            TileGrid::from_geometry(&geometry),
            Err(DescrambleError::GeometryInvalid { .. })
        ));
        let err = Solver::new().reassemble(&scrambled, &geometry).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn test_unencrypted_passthrough() -> anyhow::Result<()> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 70, Rgb([1, 2, 3])));
        let solved = Solver::new().solve(image.clone(), None)?;
        assert_eq!(solved, image);
        Ok(())
    }

    #[test]
    fn test_solve_from_bytes_bad_bitmap() {
        let geometry = PageGeometry::new(128, 128, 0);
        let err = Solver::new()
            .solve_from_bytes(b"not an image", Some(&geometry))
            .unwrap_err();
        assert!(matches!(err, DescrambleError::BitmapDecode(_)));
    }
}
