use image::DynamicImage;

use crate::error::DescrambleError;

/// A trait for solving image obfuscation.
pub trait ImageSolver {
    /// Per-page data the solver needs to undo the obfuscation
    type Key;

    /// Solve a decoded image. Pages without a key are returned unchanged.
    fn solve(&self, image: DynamicImage, key: Option<&Self::Key>)
        -> Result<DynamicImage, DescrambleError>;

    /// Decode the bytes, then solve.
    fn solve_from_bytes<B: AsRef<[u8]>>(
        &self,
        bytes: B,
        key: Option<&Self::Key>,
    ) -> Result<DynamicImage, DescrambleError> {
        let image = image::load_from_memory(bytes.as_ref())?;
        self.solve(image, key)
    }
}
