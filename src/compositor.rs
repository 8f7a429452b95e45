//! Sprite compositing.
//!
//! The [`Compositor`] receives decoded thumbnails in whatever order the
//! workers finish them and copies each into the grid cell derived from its
//! own timecode. The canvas is only allocated once the first thumbnail
//! reveals the real cell size.

use image::{RgbImage, imageops};

use crate::layout::{GridLayout, Timeline};
use crate::request::FetchResult;

/// Places decoded thumbnails into a sprite canvas.
#[derive(Debug)]
pub struct Compositor {
    layout: GridLayout,
    timeline: Timeline,
    letterbox_width: Option<u32>,
    canvas: Option<Canvas>,
    drawn: u32,
}

#[derive(Debug)]
struct Canvas {
    image: RgbImage,
    cell_width: u32,
    cell_height: u32,
}

/// Pixel placement of one thumbnail inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left edge of the drawn thumbnail, letterbox offset included.
    pub x: u32,
    /// Top edge of the drawn thumbnail.
    pub y: u32,
    /// Horizontal letterbox offset inside the cell.
    pub x_offset: u32,
}

impl Compositor {
    /// Create a compositor for `layout`.
    ///
    /// With `letterbox_width`, every cell is that wide and narrower
    /// thumbnails are centered inside it.
    pub fn new(layout: GridLayout, timeline: Timeline, letterbox_width: Option<u32>) -> Self {
        Self {
            layout,
            timeline,
            letterbox_width: letterbox_width.filter(|width| *width > 0),
            canvas: None,
            drawn: 0,
        }
    }

    /// The grid this compositor fills.
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Number of thumbnails drawn so far.
    pub fn drawn(&self) -> u32 {
        self.drawn
    }

    /// Cell size, known once the first thumbnail has been placed.
    pub fn cell_size(&self) -> Option<(u32, u32)> {
        self.canvas
            .as_ref()
            .map(|canvas| (canvas.cell_width, canvas.cell_height))
    }

    /// Whether the canvas has been allocated.
    pub fn has_canvas(&self) -> bool {
        self.canvas.is_some()
    }

    /// Draw `result` into its cell.
    ///
    /// Returns where it was drawn, or `None` if its timecode falls outside
    /// the grid.
    pub fn place(&mut self, result: &FetchResult) -> Option<Placement> {
        let timecode = result.request.timecode;
        let Some((column, row)) = self
            .timeline
            .position(timecode)
            .and_then(|position| self.layout.cell(position))
        else {
            log::warn!("Thumbnail at {timecode:?} falls outside the sprite grid, ignoring it");
            return None;
        };

        let thumbnail = result.image.to_rgb8();
        let layout = self.layout;
        let letterbox_width = self.letterbox_width;
        let canvas = self
            .canvas
            .get_or_insert_with(|| Canvas::allocate(layout, &thumbnail, letterbox_width));

        let placement = canvas.draw(&thumbnail, column, row, letterbox_width.is_some());
        self.drawn += 1;
        log::trace!("Drew thumbnail {timecode:?} at cell ({column}, {row})");
        Some(placement)
    }

    /// Hand over the finished canvas, `None` if nothing was ever drawn.
    pub fn finish(self) -> Option<RgbImage> {
        self.canvas.map(|canvas| canvas.image)
    }

    /// Like [`finish`](Self::finish), also returning the cell size.
    pub(crate) fn finish_with_cell_size(self) -> Option<(RgbImage, u32, u32)> {
        self.canvas
            .map(|canvas| (canvas.image, canvas.cell_width, canvas.cell_height))
    }
}

impl Canvas {
    fn allocate(layout: GridLayout, first: &RgbImage, letterbox_width: Option<u32>) -> Self {
        let cell_width = letterbox_width.unwrap_or(first.width());
        let cell_height = first.height();
        let width = cell_width.saturating_mul(layout.columns());
        let height = cell_height.saturating_mul(layout.rows());
        log::debug!(
            "Allocating {width}x{height} sprite canvas ({}x{} cells of {cell_width}x{cell_height})",
            layout.columns(),
            layout.rows()
        );
        Self {
            image: RgbImage::new(width, height),
            cell_width,
            cell_height,
        }
    }

    fn draw(&mut self, thumbnail: &RgbImage, column: u32, row: u32, letterbox: bool) -> Placement {
        let x_offset = if letterbox {
            self.cell_width.saturating_sub(thumbnail.width()) / 2
        } else {
            0
        };
        let x = column * self.cell_width + x_offset;
        let y = row * self.cell_height;

        // Keep oversized thumbnails from bleeding into neighbouring cells.
        let visible_width = thumbnail.width().min(self.cell_width - x_offset);
        let visible_height = thumbnail.height().min(self.cell_height);
        if (visible_width, visible_height) == thumbnail.dimensions() {
            imageops::replace(&mut self.image, thumbnail, i64::from(x), i64::from(y));
        } else {
            let clipped = imageops::crop_imm(thumbnail, 0, 0, visible_width, visible_height).to_image();
            imageops::replace(&mut self.image, &clipped, i64::from(x), i64::from(y));
        }

        Placement { x, y, x_offset }
    }
}
