use crate::coords::PixelRect;
use crate::device::{GpuDriver, TextureId};
use crate::error::Result;

/// One GPU texture covering a cell of the surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RangeTexture {
    pub texture: TextureId,
    pub start_x: u32,
    pub start_y: u32,
    pub width: u32,
    pub height: u32,
    /// Storage was (re)allocated; the whole tile uploads on the next flush.
    pub needs_resize: bool,
}

impl RangeTexture {
    /// Covered surface rect.
    #[inline]
    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.start_x, self.start_y, self.width, self.height)
    }
}

/// Flat `rows x cols` arena of tiles partitioning `[0, W) x [0, H)`.
///
/// Tile `(row, col)` lives at `row * cols + col`. Every cell is at most
/// `cell_size` on each side; only the last row and column may be smaller.
#[derive(Debug, Default)]
pub struct TileGrid {
    tiles: Vec<RangeTexture>,
    cols: u32,
    rows: u32,
    cell_size: u32,
}

impl TileGrid {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// `(cols, rows)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    pub fn tiles(&self) -> &[RangeTexture] {
        &self.tiles
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [RangeTexture] {
        &mut self.tiles
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&RangeTexture> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.tiles.get((row * self.cols + col) as usize)
    }

    /// Re-partitions the grid for a `width` x `height` surface.
    ///
    /// Tiles keep their texture when their `(row, col)` survives; storage is
    /// reallocated only if the cell size changed. Cells that fall outside the
    /// new grid are deleted. Every resulting tile is flagged for a full upload.
    pub fn regrid(&mut self, gpu: &mut dyn GpuDriver, width: u32, height: u32) -> Result<()> {
        let cell = gpu.max_texture_dimension().max(1);
        let cols = width.div_ceil(cell).max(1);
        let rows = height.div_ceil(cell).max(1);

        // Cell origins depend on the cell size; a new limit invalidates every slot.
        let (old_cols, old_rows) = if cell == self.cell_size { (self.cols, self.rows) } else { (0, 0) };
        let mut old: Vec<Option<RangeTexture>> = self.tiles.drain(..).map(Some).collect();

        let mut next = Vec::with_capacity((cols * rows) as usize);
        let (mut created, mut resized) = (0usize, 0usize);
        for row in 0..rows {
            for col in 0..cols {
                let start_x = col * cell;
                let start_y = row * cell;
                let w = width.saturating_sub(start_x).clamp(1, cell);
                let h = height.saturating_sub(start_y).clamp(1, cell);

                let reused = if row < old_rows && col < old_cols {
                    old[(row * old_cols + col) as usize].take()
                } else {
                    None
                };

                let tile = match reused {
                    Some(mut tile) => {
                        if (tile.width, tile.height) != (w, h) {
                            gpu.resize_texture(tile.texture, w, h)?;
                            tile.width = w;
                            tile.height = h;
                            resized += 1;
                        }
                        tile.needs_resize = true;
                        tile
                    }
                    None => {
                        created += 1;
                        RangeTexture {
                            texture: gpu.create_texture(w, h)?,
                            start_x,
                            start_y,
                            width: w,
                            height: h,
                            needs_resize: true,
                        }
                    }
                };
                next.push(tile);
            }
        }

        let mut deleted = 0usize;
        for tile in old.into_iter().flatten() {
            gpu.delete_texture(tile.texture);
            deleted += 1;
        }

        log::debug!(
            "tile grid {cols}x{rows} for {width}x{height} (cell {cell}): \
             {created} created, {resized} resized, {deleted} deleted"
        );

        self.tiles = next;
        self.cols = cols;
        self.rows = rows;
        self.cell_size = cell;
        Ok(())
    }

    /// Deletes every texture.
    pub fn release(&mut self, gpu: &mut dyn GpuDriver) {
        for tile in self.tiles.drain(..) {
            gpu.delete_texture(tile.texture);
        }
        self.cols = 0;
        self.rows = 0;
    }
}
