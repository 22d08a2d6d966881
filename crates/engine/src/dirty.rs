//! Coarse tracking of screen areas that need repainting.
//!
//! The screen is split into blocks of [`DIRTY_BLOCK_WIDTH`] x
//! [`DIRTY_BLOCK_HEIGHT`] pixels. Marking an area sets every block it
//! touches; flushing merges runs of set blocks into rectangles, trims them to
//! the smallest rectangle that covers every marked area, and hands each one
//! to the caller.

use tracing::{debug, trace};

use crate::geometry::{ceil_div, Rect};

pub const DIRTY_BLOCK_WIDTH: i32 = 64;
pub const DIRTY_BLOCK_HEIGHT: i32 = 8;

const fn align(value: i32, to: i32) -> i32 {
    ceil_div(value, to) * to
}

#[derive(Debug, Clone)]
pub struct DirtyBlocks {
    /// Column-major: block `(x, y)` lives at `x * blocks_per_column + y`.
    blocks: Vec<bool>,
    blocks_per_row: usize,
    blocks_per_column: usize,
    width: i32,
    height: i32,
    /// Union of everything marked since the last flush. Right and bottom
    /// are exclusive; empty when `left >= right`.
    invalid: Rect,
    generation: u32,
}

impl DirtyBlocks {
    pub fn new(width: i32, height: i32) -> Self {
        let mut blocks = Self {
            blocks: Vec::new(),
            blocks_per_row: 0,
            blocks_per_column: 0,
            width: 0,
            height: 0,
            invalid: Rect::new(0, 0, 0, 0),
            generation: 0,
        };
        blocks.resize(width, height);
        blocks.invalid = Rect::new(blocks.width, blocks.height, 0, 0);
        blocks
    }

    /// Adapts the grid to a new screen size. Existing flags are kept as they
    /// are in memory, which no longer lines up with the new layout; callers
    /// mark the whole screen dirty after a resize.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.width = width.max(0);
        self.height = height.max(0);
        self.blocks_per_row = ceil_div(self.width, DIRTY_BLOCK_WIDTH) as usize;
        self.blocks_per_column = ceil_div(self.height, DIRTY_BLOCK_HEIGHT) as usize;
        self.blocks
            .resize(self.blocks_per_row * self.blocks_per_column, false);

        if self.invalid.right >= self.width {
            self.invalid.right = self.width;
        }
        if self.invalid.bottom >= self.height {
            self.invalid.bottom = self.height;
        }

        debug!(
            width = self.width,
            height = self.height,
            blocks_per_row = self.blocks_per_row,
            blocks_per_column = self.blocks_per_column,
            "dirty_grid_resized"
        );
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Bumped once per flush.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn invalid_rect(&self) -> Rect {
        self.invalid
    }

    pub fn has_dirty(&self) -> bool {
        self.blocks.iter().any(|&dirty| dirty)
    }

    /// Whether the block containing the screen pixel `(x, y)` is marked.
    pub fn is_dirty_at(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.blocks[self.index((x / DIRTY_BLOCK_WIDTH) as usize, (y / DIRTY_BLOCK_HEIGHT) as usize)]
    }

    /// Marks the area `left..right` x `top..bottom` (right and bottom
    /// exclusive). The area is clipped to the screen first.
    pub fn add(&mut self, left: i32, top: i32, right: i32, bottom: i32) {
        let left = left.max(0);
        let top = top.max(0);
        let right = right.min(self.width);
        let bottom = bottom.min(self.height);
        if left >= right || top >= bottom {
            return;
        }

        self.invalid.left = self.invalid.left.min(left);
        self.invalid.top = self.invalid.top.min(top);
        self.invalid.right = self.invalid.right.max(right);
        self.invalid.bottom = self.invalid.bottom.max(bottom);

        let first_row = (top / DIRTY_BLOCK_HEIGHT) as usize;
        let last_row = ceil_div(bottom, DIRTY_BLOCK_HEIGHT) as usize;
        for column in (left / DIRTY_BLOCK_WIDTH) as usize..ceil_div(right, DIRTY_BLOCK_WIDTH) as usize {
            let start = self.index(column, first_row);
            let end = self.index(column, last_row);
            self.blocks[start..end].fill(true);
        }
    }

    pub fn mark_all(&mut self) {
        self.add(0, 0, self.width, self.height);
    }

    /// Clears every marked block, calling `repaint` once per merged
    /// rectangle (right and bottom exclusive). Returns the number of
    /// rectangles handed out.
    pub fn flush(&mut self, mut repaint: impl FnMut(Rect)) -> usize {
        let w = align(self.width, DIRTY_BLOCK_WIDTH);
        let h = align(self.height, DIRTY_BLOCK_HEIGHT);
        let rows = self.blocks_per_column;
        let mut count = 0;

        for column in 0..self.blocks_per_row {
            for row in 0..rows {
                if !self.blocks[self.index(column, row)] {
                    continue;
                }

                let x = column as i32 * DIRTY_BLOCK_WIDTH;
                let y = row as i32 * DIRTY_BLOCK_HEIGHT;
                let mut right = x + DIRTY_BLOCK_WIDTH;
                let mut bottom = y;

                let mut end_row = row;
                loop {
                    let index = self.index(column, end_row);
                    self.blocks[index] = false;
                    end_row += 1;
                    bottom += DIRTY_BLOCK_HEIGHT;
                    if bottom == h || !self.blocks[self.index(column, end_row)] {
                        break;
                    }
                }

                let mut next_column = column + 1;
                while right != w {
                    let start = self.index(next_column, row);
                    let end = self.index(next_column, end_row);
                    if !self.blocks[start..end].iter().all(|&dirty| dirty) {
                        break;
                    }
                    self.blocks[start..end].fill(false);
                    right += DIRTY_BLOCK_WIDTH;
                    next_column += 1;
                }

                let rect = Rect::new(
                    x.max(self.invalid.left),
                    y.max(self.invalid.top),
                    right.min(self.invalid.right),
                    bottom.min(self.invalid.bottom),
                );
                if rect.left < rect.right && rect.top < rect.bottom {
                    count += 1;
                    repaint(rect);
                }
            }
        }

        self.generation = self.generation.wrapping_add(1);
        self.invalid = Rect::new(w, h, 0, 0);
        trace!(rects = count, generation = self.generation, "dirty_blocks_flushed");
        count
    }

    fn index(&self, column: usize, row: usize) -> usize {
        column * self.blocks_per_column + row
    }
}
