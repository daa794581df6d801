use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::blocks::BlockSpec;
use crate::coords::{MAX_GRID_DIM, MIN_GRID_DIM};
use crate::grid::{GridSnapshot, GridState};

/// Pixel size of one cell in the exported image.
pub const EXPORT_CELL_PX: u32 = 32;

// ============================================================================
// GRID DOCUMENT — the persisted `.json` layout
// ============================================================================

/// On-disk grid layout: `{cols, rows, cells}` where `cells` maps `"x,y"`
/// keys to block ids. `null` (and absent keys) mean the default block.
/// `BTreeMap` keeps the file diff-stable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GridDocument {
    pub cols: u32,
    pub rows: u32,
    pub cells: BTreeMap<String, Option<String>>,
}

#[derive(Debug)]
pub enum DocumentError {
    Io(std::io::Error),
    Json(String),
    InvalidDimensions(u32, u32),
    InvalidKey(String),
    OutOfBounds(String),
    Image(String),
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::Io(e) => write!(f, "I/O error: {}", e),
            DocumentError::Json(e) => write!(f, "JSON error: {}", e),
            DocumentError::InvalidDimensions(c, r) => {
                write!(
                    f,
                    "grid dimensions {}x{} outside {}..={}",
                    c, r, MIN_GRID_DIM, MAX_GRID_DIM
                )
            }
            DocumentError::InvalidKey(k) => write!(f, "malformed cell key '{}'", k),
            DocumentError::OutOfBounds(k) => write!(f, "cell '{}' outside the grid", k),
            DocumentError::Image(e) => write!(f, "image export error: {}", e),
        }
    }
}

impl std::error::Error for DocumentError {}

impl From<std::io::Error> for DocumentError {
    fn from(e: std::io::Error) -> Self {
        DocumentError::Io(e)
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(e: serde_json::Error) -> Self {
        DocumentError::Json(e.to_string())
    }
}

impl GridDocument {
    /// Capture the current grid. Default-block cells are omitted.
    pub fn from_grid(grid: &GridState) -> Self {
        let mut cells = BTreeMap::new();
        for ((x, y), id) in grid.entries() {
            cells.insert(format!("{},{}", x, y), Some(id.to_string()));
        }
        Self {
            cols: grid.cols(),
            rows: grid.rows(),
            cells,
        }
    }

    /// Validate and convert into a grid snapshot. `null` entries collapse to
    /// the default block (i.e. are dropped from the sparse map).
    pub fn into_snapshot(self, default_id: &str) -> Result<GridSnapshot, DocumentError> {
        if !(MIN_GRID_DIM..=MAX_GRID_DIM).contains(&self.cols)
            || !(MIN_GRID_DIM..=MAX_GRID_DIM).contains(&self.rows)
        {
            return Err(DocumentError::InvalidDimensions(self.cols, self.rows));
        }
        let mut cells = std::collections::HashMap::new();
        for (key, value) in self.cells {
            let (x, y) = parse_cell_key(&key).ok_or_else(|| DocumentError::InvalidKey(key.clone()))?;
            if x >= self.cols || y >= self.rows {
                return Err(DocumentError::OutOfBounds(key));
            }
            match value {
                Some(id) if id != default_id => {
                    cells.insert((x, y), id);
                }
                _ => {}
            }
        }
        Ok(GridSnapshot {
            cols: self.cols,
            rows: self.rows,
            cells,
        })
    }
}

fn parse_cell_key(key: &str) -> Option<(u32, u32)> {
    let (x, y) = key.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub fn load_document(path: &Path) -> Result<GridDocument, DocumentError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn save_document(path: &Path, doc: &GridDocument) -> Result<(), DocumentError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, doc)?;
    Ok(())
}

// ============================================================================
// IMAGE EXPORT — rasterize the grid at a fixed per-cell pixel size
// ============================================================================

/// Blit every cell's block image into one RGBA buffer, nearest-neighbor,
/// `cell_px` pixels per cell. Rows render in parallel. Cells whose block id
/// has no palette image fall back to the default tile (logged at write time
/// by the controller, so the export stays quiet about them).
pub fn render_image(grid: &GridState, specs: &[BlockSpec], cell_px: u32) -> RgbaImage {
    let width = grid.cols() * cell_px;
    let height = grid.rows() * cell_px;
    let default_image = spec_image(specs, grid.default_id());

    let mut out = RgbaImage::new(width, height);
    let row_bytes = width as usize * 4;
    out.par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(py, row)| {
            let cell_y = py as u32 / cell_px;
            for cell_x in 0..grid.cols() {
                let id = grid.block_at(cell_x, cell_y);
                let src = spec_image(specs, id).or(default_image);
                let Some(src) = src else { continue };
                let sy = (py as u32 % cell_px) * src.height() / cell_px;
                for px in 0..cell_px {
                    let sx = px * src.width() / cell_px;
                    let pixel = src.get_pixel(sx, sy);
                    let o = ((cell_x * cell_px + px) as usize) * 4;
                    row[o..o + 4].copy_from_slice(&pixel.0);
                }
            }
        });
    out
}

fn spec_image<'a>(specs: &'a [BlockSpec], id: &str) -> Option<&'a RgbaImage> {
    specs.iter().find(|s| s.id == id).map(|s| &s.image)
}

pub fn save_png(path: &Path, image: &RgbaImage) -> Result<(), DocumentError> {
    let writer = BufWriter::new(File::create(path)?);
    PngEncoder::new(writer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| DocumentError::Image(e.to_string()))
}

// ============================================================================
// EMOJI EXPORT — Discord markup, one line per grid row
// ============================================================================

/// `:emoji_name:` markup for every cell, rows joined by newlines. Ids
/// without a palette entry fall back to the default block's emoji.
pub fn emoji_markup(grid: &GridState, specs: &[BlockSpec]) -> String {
    let fallback = specs
        .iter()
        .find(|s| s.id == grid.default_id())
        .map(|s| s.emoji.as_str())
        .unwrap_or("black_large_square");
    let mut lines = Vec::with_capacity(grid.rows() as usize);
    for y in 0..grid.rows() {
        let mut line = String::new();
        for x in 0..grid.cols() {
            let id = grid.block_at(x, y);
            let emoji = specs
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.emoji.as_str())
                .unwrap_or(fallback);
            line.push(':');
            line.push_str(emoji);
            line.push(':');
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{DEFAULT_BLOCK_ID, default_palette};

    fn grid_with_content() -> GridState {
        let mut g = GridState::new(4, 3, DEFAULT_BLOCK_ID);
        g.set_cell(0, 0, "red");
        g.set_cell(3, 2, "blue");
        g
    }

    #[test]
    fn import_then_export_round_trips_exactly() {
        let g = grid_with_content();
        let doc = GridDocument::from_grid(&g);

        let snapshot = doc.clone().into_snapshot(DEFAULT_BLOCK_ID).unwrap();
        let mut imported = GridState::new(1, 1, DEFAULT_BLOCK_ID);
        imported.replace(snapshot);
        assert_eq!(GridDocument::from_grid(&imported), doc);
    }

    #[test]
    fn json_shape_uses_comma_keys() {
        let doc = GridDocument::from_grid(&grid_with_content());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["cols"], 4);
        assert_eq!(json["cells"]["0,0"], "red");
        assert_eq!(json["cells"]["3,2"], "blue");
    }

    #[test]
    fn null_cells_collapse_to_default() {
        let mut doc = GridDocument::from_grid(&grid_with_content());
        doc.cells.insert("1,1".to_string(), None);
        doc.cells.insert("2,2".to_string(), Some(DEFAULT_BLOCK_ID.to_string()));
        let snapshot = doc.into_snapshot(DEFAULT_BLOCK_ID).unwrap();
        assert!(!snapshot.cells.contains_key(&(1, 1)));
        assert!(!snapshot.cells.contains_key(&(2, 2)));
        assert_eq!(snapshot.cells.len(), 2);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for key in ["", "5", "a,b", "1,2,3", "-1,0"] {
            let mut doc = GridDocument {
                cols: 4,
                rows: 4,
                cells: BTreeMap::new(),
            };
            doc.cells.insert(key.to_string(), Some("red".to_string()));
            assert!(
                matches!(
                    doc.into_snapshot(DEFAULT_BLOCK_ID),
                    Err(DocumentError::InvalidKey(_))
                ),
                "key '{key}' should be rejected"
            );
        }
    }

    #[test]
    fn out_of_bounds_cells_are_rejected() {
        let mut doc = GridDocument {
            cols: 4,
            rows: 4,
            cells: BTreeMap::new(),
        };
        doc.cells.insert("4,0".to_string(), Some("red".to_string()));
        assert!(matches!(
            doc.into_snapshot(DEFAULT_BLOCK_ID),
            Err(DocumentError::OutOfBounds(_))
        ));
    }

    #[test]
    fn dimension_bounds_are_enforced() {
        let doc = GridDocument {
            cols: 0,
            rows: 8,
            cells: BTreeMap::new(),
        };
        assert!(matches!(
            doc.into_snapshot(DEFAULT_BLOCK_ID),
            Err(DocumentError::InvalidDimensions(0, 8))
        ));
        let doc = GridDocument {
            cols: 8,
            rows: 65,
            cells: BTreeMap::new(),
        };
        assert!(matches!(
            doc.into_snapshot(DEFAULT_BLOCK_ID),
            Err(DocumentError::InvalidDimensions(8, 65))
        ));
    }

    #[test]
    fn rendered_image_has_grid_dimensions_and_cell_colors() {
        let g = grid_with_content();
        let specs = default_palette();
        let img = render_image(&g, &specs, EXPORT_CELL_PX);
        assert_eq!(img.width(), 4 * EXPORT_CELL_PX);
        assert_eq!(img.height(), 3 * EXPORT_CELL_PX);
        // Center of (0,0) carries the red tile's fill color.
        let c = EXPORT_CELL_PX / 2;
        assert_eq!(img.get_pixel(c, c).0, [0xdd, 0x2e, 0x44, 255]);
        // Center of an empty cell carries the default (black) tile.
        assert_eq!(
            img.get_pixel(EXPORT_CELL_PX + c, c).0,
            [0x31, 0x37, 0x3d, 255]
        );
    }

    #[test]
    fn unknown_block_id_falls_back_to_default_tile() {
        let mut g = GridState::new(2, 1, DEFAULT_BLOCK_ID);
        g.set_cell(0, 0, "no_such_block");
        let specs = default_palette();
        let img = render_image(&g, &specs, EXPORT_CELL_PX);
        let c = EXPORT_CELL_PX / 2;
        assert_eq!(img.get_pixel(c, c).0, [0x31, 0x37, 0x3d, 255]);
    }

    #[test]
    fn emoji_markup_is_rows_of_cols_names() {
        let g = grid_with_content();
        let specs = default_palette();
        let markup = emoji_markup(&g, &specs);
        let lines: Vec<&str> = markup.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(":red_square:"));
        assert!(lines[2].ends_with(":blue_square:"));
        for line in &lines {
            assert_eq!(line.matches(':').count(), 4 * 2);
        }
    }
}
