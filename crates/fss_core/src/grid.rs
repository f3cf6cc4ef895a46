use std::io;
use std::ops::RangeInclusive;

use rand::Rng;

use crate::error::CoreError;
use crate::tile::{GRASS_VARIANTS, TILE_SIZE, TileGenre, genre_of};

pub const DEFAULT_GRID_WIDTH: usize = 40;
pub const DEFAULT_GRID_HEIGHT: usize = 60;

/// Width and height must each fit the one-byte fields of the grid file.
pub const GRID_DIMENSION_RANGE: RangeInclusive<usize> = 3..=255;

const GRID_HEADER_LEN: usize = 3;

/// Tile map of a level: one byte per cell, row-major.
///
/// Pixel bounds are derived from the dimensions on every call, so they can
/// never drift from the cell buffer after a resize or reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    frames: u8,
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// A grid with no cells, as left by `clear`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The 40x60 all-grass map used for a fresh level.
    pub fn create_default<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::random_grass(DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT, rng)
    }

    pub fn random_grass<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Self {
        let cells = (0..width * height).map(|_| random_grass(rng)).collect();
        Self {
            frames: 1,
            width,
            height,
            cells,
        }
    }

    /// Build a single-frame grid from row-major cells.
    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> io::Result<Self> {
        if cells.len() != width * height {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "grid {width}x{height} needs {} cells, got {}",
                    width * height,
                    cells.len()
                ),
            ));
        }
        Ok(Self {
            frames: 1,
            width,
            height,
            cells,
        })
    }

    pub fn frames(&self) -> u8 {
        self.frames
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn pixel_width(&self) -> i32 {
        self.width as i32 * TILE_SIZE
    }

    pub fn pixel_height(&self) -> i32 {
        self.height as i32 * TILE_SIZE
    }

    pub fn contains_pixel(&self, x: i32, y: i32) -> bool {
        (0..self.pixel_width()).contains(&x) && (0..self.pixel_height()).contains(&y)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y * self.width + x).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, tile: u8) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        match self.cells.get_mut(y * self.width + x) {
            Some(cell) => {
                *cell = tile;
                true
            }
            None => false,
        }
    }

    /// Genre of the cell at grid coordinates, `None` off the map.
    pub fn genre_at(&self, x: i32, y: i32) -> Option<TileGenre> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get(x as usize, y as usize).map(genre_of)
    }

    /// Resize in place, keeping every cell inside both the old and new
    /// bounds and filling the rest with random grass. Rejected sizes leave
    /// the grid untouched.
    pub fn resize<R: Rng + ?Sized>(
        &mut self,
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<(), CoreError> {
        if !GRID_DIMENSION_RANGE.contains(&width) || !GRID_DIMENSION_RANGE.contains(&height) {
            log::warn!("can't resize grid to these dimensions: {width}x{height}");
            return Err(CoreError::bounds(format!(
                "grid {width}x{height} outside {}..={}",
                GRID_DIMENSION_RANGE.start(),
                GRID_DIMENSION_RANGE.end()
            )));
        }

        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let tile = match self.get(x, y) {
                    Some(old) => old,
                    None => random_grass(rng),
                };
                cells.push(tile);
            }
        }

        self.cells = cells;
        self.frames = 1;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Parse the raw grid file: frame count, width, height, then
    /// `width * height * frames` tile bytes.
    pub fn parse(bytes: &[u8]) -> io::Result<Self> {
        let [frames, width, height] = match bytes.get(..GRID_HEADER_LEN) {
            Some(&[frames, width, height]) => [frames, width, height],
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("grid file shorter than its {GRID_HEADER_LEN}-byte header"),
                ));
            }
        };

        if frames == 0 || width == 0 || height == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("grid header has an empty dimension: frames={frames} {width}x{height}"),
            ));
        }

        let expected = frames as usize * width as usize * height as usize;
        let payload = &bytes[GRID_HEADER_LEN..];
        if payload.len() < expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "grid {width}x{height}x{frames} needs {expected} bytes, got {}",
                    payload.len()
                ),
            ));
        }
        if payload.len() > expected {
            log::debug!(
                "ignoring {} trailing bytes after grid data",
                payload.len() - expected
            );
        }

        Ok(Self {
            frames,
            width: width as usize,
            height: height as usize,
            cells: payload[..expected].to_vec(),
        })
    }

    /// Emit the terrain frame in grid file form. Always writes one frame.
    pub fn emit_to_vec(&self, out: &mut Vec<u8>) -> Result<(), CoreError> {
        let (Ok(width), Ok(height)) = (u8::try_from(self.width), u8::try_from(self.height)) else {
            return Err(CoreError::bounds(format!(
                "grid {}x{} does not fit the one-byte size fields",
                self.width, self.height
            )));
        };
        let area = self.width * self.height;
        if self.cells.len() < area {
            return Err(CoreError::consistency(format!(
                "grid {}x{} holds only {} cells",
                self.width,
                self.height,
                self.cells.len()
            )));
        }

        out.reserve(GRID_HEADER_LEN + area);
        out.push(1);
        out.push(width);
        out.push(height);
        out.extend_from_slice(&self.cells[..area]);
        Ok(())
    }
}

fn random_grass<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    GRASS_VARIANTS[rng.gen_range(0..GRASS_VARIANTS.len())]
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::error::CoreErrorCode;
    use crate::tile::{PIX_WALL1, is_grass_variant};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn numbered(width: usize, height: usize) -> Grid {
        let cells = (0..width * height).map(|i| (i % 200) as u8 + 30).collect();
        Grid::from_cells(width, height, cells).unwrap()
    }

    #[test]
    fn default_grid_is_all_grass() {
        let grid = Grid::create_default(&mut rng());
        assert_eq!((grid.width(), grid.height()), (40, 60));
        assert_eq!(grid.pixel_width(), 40 * TILE_SIZE);
        assert_eq!(grid.pixel_height(), 60 * TILE_SIZE);
        assert!(grid.cells().iter().all(|&t| is_grass_variant(t)));
    }

    #[test]
    fn default_grid_uses_every_variant() {
        let grid = Grid::create_default(&mut rng());
        for variant in GRASS_VARIANTS {
            assert!(grid.cells().contains(&variant));
        }
    }

    #[test]
    fn shrinking_keeps_overlap() {
        let mut grid = numbered(10, 8);
        let before = grid.clone();
        grid.resize(4, 5, &mut rng()).unwrap();
        assert_eq!((grid.width(), grid.height()), (4, 5));
        for y in 0..5 {
            for x in 0..4 {
                assert_eq!(grid.get(x, y), before.get(x, y));
            }
        }
        assert_eq!(grid.pixel_width(), 4 * TILE_SIZE);
    }

    #[test]
    fn growing_keeps_old_cells_and_fills_with_grass() {
        let mut grid = numbered(5, 4);
        let before = grid.clone();
        grid.resize(9, 7, &mut rng()).unwrap();
        for y in 0..7 {
            for x in 0..9 {
                let tile = grid.get(x, y).unwrap();
                if x < 5 && y < 4 {
                    assert_eq!(Some(tile), before.get(x, y));
                } else {
                    assert!(is_grass_variant(tile), "cell ({x},{y}) = {tile}");
                }
            }
        }
    }

    #[test]
    fn out_of_range_resize_is_rejected() {
        let mut grid = numbered(5, 5);
        let before = grid.clone();
        for (w, h) in [(2, 10), (300, 10), (10, 2), (10, 256)] {
            let err = grid.resize(w, h, &mut rng()).unwrap_err();
            assert_eq!(err.code, CoreErrorCode::Bounds);
            assert_eq!(grid, before);
        }
    }

    #[test]
    fn clear_resets_bounds() {
        let mut grid = numbered(5, 5);
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.pixel_width(), 0);
        assert_eq!(grid.pixel_height(), 0);
    }

    #[test]
    fn genre_lookup_is_bounded() {
        let mut grid = Grid::from_cells(3, 3, vec![0; 9]).unwrap();
        assert!(grid.set(1, 0, PIX_WALL1));
        assert_eq!(grid.genre_at(1, 0), Some(TileGenre::Wall));
        assert_eq!(grid.genre_at(1, -1), None);
        assert_eq!(grid.genre_at(3, 0), None);
    }

    #[test]
    fn file_form_round_trips() {
        let grid = numbered(6, 3);
        let mut bytes = Vec::new();
        grid.emit_to_vec(&mut bytes).unwrap();
        assert_eq!(&bytes[..3], &[1, 6, 3]);
        assert_eq!(bytes.len(), 3 + 18);
        assert_eq!(Grid::parse(&bytes).unwrap(), grid);
    }

    #[test]
    fn parse_rejects_short_payload() {
        let err = Grid::parse(&[1, 4, 4, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        let err = Grid::parse(&[1, 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn emit_rejects_oversized_grid() {
        let grid = Grid::from_cells(256, 1, vec![0; 256]).unwrap();
        let err = grid.emit_to_vec(&mut Vec::new()).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::Bounds);
    }
}
