//! Character-grid surface used by the terminal shell and by tests.

use std::fs;
use std::path::Path;

use aquarium_core::{Color, DecorationKind, DecorationSprite, FishShape, FishSprite, Viewport};
use slotmap::{SlotMap, new_key_type};

use crate::{Bounds, RenderError, Surface};

/// Height, in physical units, of a reed drawn at scale 1.
const REED_HEIGHT: f32 = 600.0;

new_key_type! {
    /// Handle of a fish node on an [`AsciiSurface`].
    pub struct GlyphId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellKind {
    #[default]
    Water,
    Pebble,
    Reed,
    Fish,
}

/// One rasterised character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub kind: CellKind,
    pub color: Option<Color>,
    /// Drawn at reduced opacity.
    pub faded: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            kind: CellKind::Water,
            color: None,
            faded: false,
        }
    }
}

#[derive(Debug, Clone)]
struct FishNode {
    glyph: &'static str,
    col: i32,
    row: i32,
    color: Color,
    faded: bool,
    bounds: Bounds,
}

#[derive(Debug, Clone, Copy)]
struct DecorationMark {
    kind: DecorationKind,
    index: usize,
    col: i32,
    row: i32,
    height: i32,
}

/// Scene graph rasterised onto a fixed grid of character cells.
#[derive(Debug)]
pub struct AsciiSurface {
    cols: u16,
    rows: u16,
    cells: Vec<Cell>,
    nodes: SlotMap<GlyphId, FishNode>,
    frame_fish: Vec<GlyphId>,
    frame_decorations: Vec<DecorationMark>,
    viewport: Viewport,
}

impl AsciiSurface {
    pub fn new(cols: u16, rows: u16) -> Result<Self, RenderError> {
        if cols == 0 || rows == 0 {
            return Err(RenderError::EmptySurface { cols, rows });
        }
        Ok(Self {
            cols,
            rows,
            cells: vec![Cell::default(); usize::from(cols) * usize::from(rows)],
            nodes: SlotMap::with_key(),
            frame_fish: Vec::new(),
            frame_decorations: Vec::new(),
            viewport: Viewport::new(f32::from(cols), f32::from(rows)),
        })
    }

    /// Changes the grid size. Existing nodes are kept and re-placed on the next frame.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), RenderError> {
        if cols == 0 || rows == 0 {
            return Err(RenderError::EmptySurface { cols, rows });
        }
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![Cell::default(); usize::from(cols) * usize::from(rows)];
        Ok(())
    }

    #[must_use]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    #[must_use]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Live fish nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn cell(&self, col: u16, row: u16) -> Option<&Cell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells
            .get(usize::from(row) * usize::from(self.cols) + usize::from(col))
    }

    /// Cells of one row, left to right.
    #[must_use]
    pub fn row(&self, row: u16) -> &[Cell] {
        let width = usize::from(self.cols);
        let start = usize::from(row) * width;
        self.cells.get(start..start + width).unwrap_or(&[])
    }

    /// Physical point at the centre of a cell, for pointer hit testing.
    #[must_use]
    pub fn cell_center(&self, col: u16, row: u16) -> (f32, f32) {
        let (cell_w, cell_h) = self.cell_size();
        (
            (f32::from(col) + 0.5) * cell_w,
            (f32::from(row) + 0.5) * cell_h,
        )
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.cells.len() + usize::from(self.rows));
        for row in 0..self.rows {
            text.extend(self.row(row).iter().map(|cell| cell.ch));
            text.push('\n');
        }
        text
    }

    pub fn write_snapshot(&self, path: &Path) -> Result<(), RenderError> {
        let result = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).and_then(|()| fs::write(path, self.to_text()))
            }
            None => fs::write(path, self.to_text()),
        };
        result.map_err(|source| RenderError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
    }

    fn cell_size(&self) -> (f32, f32) {
        (
            self.viewport.width / f32::from(self.cols),
            self.viewport.height / f32::from(self.rows),
        )
    }

    fn to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        let (cell_w, cell_h) = self.cell_size();
        ((x / cell_w).floor() as i32, (y / cell_h).floor() as i32)
    }

    fn put(&mut self, col: i32, row: i32, cell: Cell) {
        if col < 0 || row < 0 || col >= i32::from(self.cols) || row >= i32::from(self.rows) {
            return;
        }
        let idx = row as usize * usize::from(self.cols) + col as usize;
        if let Some(slot) = self.cells.get_mut(idx) {
            *slot = cell;
        }
    }

    fn fish_glyph(shape: FishShape, facing_right: bool) -> &'static str {
        match (shape, facing_right) {
            (FishShape::Round, false) => "<><",
            (FishShape::Round, true) => "><>",
            (FishShape::Triangle, false) => "<|",
            (FishShape::Triangle, true) => "|>",
        }
    }
}

impl Surface for AsciiSurface {
    type Handle = GlyphId;

    fn begin_frame(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.frame_fish.clear();
        self.frame_decorations.clear();
    }

    fn draw_decoration(&mut self, sprite: &DecorationSprite) {
        let (col, row) = self.to_cell(sprite.x, sprite.y);
        let (_, cell_h) = self.cell_size();
        let height = match sprite.kind {
            DecorationKind::Pebble => 1,
            DecorationKind::Reed => ((sprite.scale * REED_HEIGHT) / cell_h).round().max(1.0) as i32,
        };
        self.frame_decorations.push(DecorationMark {
            kind: sprite.kind,
            index: sprite.index,
            col,
            row: row.min(i32::from(self.rows) - 1),
            height,
        });
    }

    fn create_fish(&mut self, shape: FishShape) -> GlyphId {
        self.nodes.insert(FishNode {
            glyph: Self::fish_glyph(shape, false),
            col: 0,
            row: 0,
            color: Color::default(),
            faded: false,
            bounds: Bounds::default(),
        })
    }

    fn update_fish(&mut self, handle: GlyphId, sprite: &FishSprite<'_>) {
        let (col, row) = self.to_cell(sprite.x, sprite.y);
        let (cell_w, cell_h) = self.cell_size();
        let Some(node) = self.nodes.get_mut(handle) else {
            return;
        };
        // A negative scale flips the sprite, which undoes the mirroring.
        let facing_right = sprite.mirrored != (sprite.scale < 0.0);
        node.glyph = Self::fish_glyph(sprite.shape, facing_right);
        let width = node.glyph.chars().count() as i32;
        node.col = col - width / 2;
        node.row = row;
        node.color = sprite.color;
        node.faded = sprite.opacity < 1.0;
        node.bounds = Bounds {
            x: node.col as f32 * cell_w,
            y: node.row as f32 * cell_h,
            width: width as f32 * cell_w,
            height: cell_h,
        };
        self.frame_fish.push(handle);
    }

    fn remove_fish(&mut self, handle: GlyphId) {
        self.nodes.remove(handle);
        self.frame_fish.retain(|id| *id != handle);
    }

    fn fish_bounds(&self, handle: GlyphId) -> Option<Bounds> {
        self.nodes.get(handle).map(|node| node.bounds)
    }

    fn present(&mut self) {
        self.cells.fill(Cell::default());

        let marks = std::mem::take(&mut self.frame_decorations);
        for mark in &marks {
            match mark.kind {
                DecorationKind::Pebble => {
                    let ch = if mark.index % 3 == 0 { 'o' } else { '.' };
                    self.put(
                        mark.col,
                        mark.row,
                        Cell {
                            ch,
                            kind: CellKind::Pebble,
                            ..Cell::default()
                        },
                    );
                }
                DecorationKind::Reed => {
                    for step in 0..mark.height {
                        let ch = if step % 2 == 0 { ')' } else { '(' };
                        self.put(
                            mark.col,
                            mark.row - step,
                            Cell {
                                ch,
                                kind: CellKind::Reed,
                                ..Cell::default()
                            },
                        );
                    }
                }
            }
        }
        self.frame_decorations = marks;

        let order = std::mem::take(&mut self.frame_fish);
        for handle in &order {
            let Some(node) = self.nodes.get(*handle).cloned() else {
                continue;
            };
            for (offset, ch) in node.glyph.chars().enumerate() {
                self.put(
                    node.col + offset as i32,
                    node.row,
                    Cell {
                        ch,
                        kind: CellKind::Fish,
                        color: Some(node.color),
                        faded: node.faded,
                    },
                );
            }
        }
        self.frame_fish = order;
    }
}
