use std::collections::HashMap;
use std::path::Path;

use egui::{ColorImage, TextureHandle, TextureOptions};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// The visually-empty tile. Must exist in every palette.
pub const DEFAULT_BLOCK_ID: &str = "black";

/// Side length of the procedurally rendered built-in block images.
const BLOCK_IMAGE_SIZE: u32 = 64;

// ============================================================================
// PALETTE ERRORS
// ============================================================================

/// Any palette problem is fatal to initialization.
#[derive(Debug)]
pub enum PaletteError {
    Io(std::io::Error),
    Decode { name: String, message: String },
    Empty,
    Duplicate(String),
    MissingDefault(String),
}

impl std::fmt::Display for PaletteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaletteError::Io(e) => write!(f, "palette I/O error: {}", e),
            PaletteError::Decode { name, message } => {
                write!(f, "failed to decode block image '{}': {}", name, message)
            }
            PaletteError::Empty => write!(f, "palette contains no block images"),
            PaletteError::Duplicate(id) => write!(f, "duplicate block id '{}'", id),
            PaletteError::MissingDefault(id) => {
                write!(f, "palette is missing the default block '{}'", id)
            }
        }
    }
}

impl std::error::Error for PaletteError {}

impl From<std::io::Error> for PaletteError {
    fn from(e: std::io::Error) -> Self {
        PaletteError::Io(e)
    }
}

// ============================================================================
// BLOCK SPECS — the (id, image) vocabulary, before any texture exists
// ============================================================================

/// One palette entry: id, Discord emoji name for the markup export, and the
/// tile image. Immutable after load.
#[derive(Clone)]
pub struct BlockSpec {
    pub id: String,
    pub emoji: String,
    pub image: RgbaImage,
}

/// The built-in palette: the Discord color squares, rendered procedurally
/// (Twemoji square colors). `black` doubles as the default/empty tile.
pub fn default_palette() -> Vec<BlockSpec> {
    const SQUARES: &[(&str, &str, [u8; 3])] = &[
        ("black", "black_large_square", [0x31, 0x37, 0x3d]),
        ("white", "white_large_square", [0xe6, 0xe7, 0xe8]),
        ("red", "red_square", [0xdd, 0x2e, 0x44]),
        ("orange", "orange_square", [0xf4, 0x90, 0x0c]),
        ("yellow", "yellow_square", [0xfd, 0xcb, 0x58]),
        ("green", "green_square", [0x78, 0xb1, 0x59]),
        ("blue", "blue_square", [0x55, 0xac, 0xee]),
        ("purple", "purple_square", [0xaa, 0x8e, 0xd6]),
        ("brown", "brown_square", [0xc1, 0x69, 0x4f]),
    ];
    SQUARES
        .iter()
        .map(|(id, emoji, rgb)| BlockSpec {
            id: (*id).to_string(),
            emoji: (*emoji).to_string(),
            image: render_square(*rgb),
        })
        .collect()
}

/// Render a rounded color square in the style of the emoji tiles.
fn render_square(rgb: [u8; 3]) -> RgbaImage {
    let size = BLOCK_IMAGE_SIZE;
    let radius = size as f32 * 0.14;
    let border = [
        rgb[0].saturating_sub(28),
        rgb[1].saturating_sub(28),
        rgb[2].saturating_sub(28),
    ];
    RgbaImage::from_fn(size, size, |x, y| {
        let d = rounded_rect_distance(x as f32 + 0.5, y as f32 + 0.5, size as f32, radius);
        if d > 0.0 {
            Rgba([0, 0, 0, 0])
        } else if d > -2.0 {
            Rgba([border[0], border[1], border[2], 255])
        } else {
            Rgba([rgb[0], rgb[1], rgb[2], 255])
        }
    })
}

/// Distance from a point to the edge of a rounded square spanning
/// `[0, size]²` (negative inside).
fn rounded_rect_distance(px: f32, py: f32, size: f32, radius: f32) -> f32 {
    let half = size / 2.0;
    let dx = (px - half).abs() - (half - radius);
    let dy = (py - half).abs() - (half - radius);
    let outside = (dx.max(0.0).powi(2) + dy.max(0.0).powi(2)).sqrt();
    outside + dx.max(dy).min(0.0) - radius
}

/// Load a palette from a directory of PNG files: the file stem is the block
/// id (and the emoji name). Decoding fans out across the thread pool; any
/// single failure fails the whole load.
pub fn load_palette_dir(dir: &Path) -> Result<Vec<BlockSpec>, PaletteError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let specs: Result<Vec<BlockSpec>, PaletteError> = paths
        .par_iter()
        .map(|path| {
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let image = image::open(path)
                .map_err(|e| PaletteError::Decode {
                    name: id.clone(),
                    message: e.to_string(),
                })?
                .to_rgba8();
            Ok(BlockSpec {
                emoji: id.clone(),
                id,
                image,
            })
        })
        .collect();
    let specs = specs?;
    validate_palette(&specs)?;
    Ok(specs)
}

/// Shared validation for built-in and directory palettes: non-empty, unique
/// ids, default block present, no zero-sized images.
pub fn validate_palette(specs: &[BlockSpec]) -> Result<(), PaletteError> {
    if specs.is_empty() {
        return Err(PaletteError::Empty);
    }
    let mut seen = std::collections::HashSet::new();
    for spec in specs {
        if !seen.insert(spec.id.as_str()) {
            return Err(PaletteError::Duplicate(spec.id.clone()));
        }
        if spec.image.width() == 0 || spec.image.height() == 0 {
            return Err(PaletteError::Decode {
                name: spec.id.clone(),
                message: "image has zero extent".to_string(),
            });
        }
    }
    if !seen.contains(DEFAULT_BLOCK_ID) {
        return Err(PaletteError::MissingDefault(DEFAULT_BLOCK_ID.to_string()));
    }
    Ok(())
}

// ============================================================================
// BLOCK SET — specs plus uploaded textures, owned by the controller
// ============================================================================

/// Palette with textures resolved. Construction completes only when every
/// block validated and uploaded; afterwards lookups are infallible for any
/// id in the vocabulary.
pub struct BlockSet {
    specs: Vec<BlockSpec>,
    textures: HashMap<String, TextureHandle>,
}

impl BlockSet {
    pub fn load(ctx: &egui::Context, specs: Vec<BlockSpec>) -> Result<Self, PaletteError> {
        validate_palette(&specs)?;
        let mut textures = HashMap::with_capacity(specs.len());
        for spec in &specs {
            let size = [spec.image.width() as usize, spec.image.height() as usize];
            let color_image = ColorImage::from_rgba_unmultiplied(size, spec.image.as_raw());
            // Nearest filtering keeps tile edges crisp at any zoom.
            let texture = ctx.load_texture(
                format!("block_{}", spec.id),
                color_image,
                TextureOptions::NEAREST,
            );
            textures.insert(spec.id.clone(), texture);
        }
        Ok(Self { specs, textures })
    }

    pub fn specs(&self) -> &[BlockSpec] {
        &self.specs
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.textures.contains_key(id)
    }

    pub fn texture(&self, id: &str) -> Option<&TextureHandle> {
        self.textures.get(id)
    }

    pub fn emoji(&self, id: &str) -> Option<&str> {
        self.specs
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.emoji.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_validates_and_contains_the_default_block() {
        let specs = default_palette();
        validate_palette(&specs).unwrap();
        assert!(specs.iter().any(|s| s.id == DEFAULT_BLOCK_ID));
        assert_eq!(specs.len(), 9);
    }

    #[test]
    fn block_images_are_opaque_in_the_center() {
        for spec in default_palette() {
            let c = BLOCK_IMAGE_SIZE / 2;
            assert_eq!(spec.image.get_pixel(c, c)[3], 255, "block {}", spec.id);
            // Corners are outside the rounded shape.
            assert_eq!(spec.image.get_pixel(0, 0)[3], 0, "block {}", spec.id);
        }
    }

    #[test]
    fn validation_rejects_duplicates() {
        let mut specs = default_palette();
        let dup = specs[1].clone();
        specs.push(dup);
        assert!(matches!(
            validate_palette(&specs),
            Err(PaletteError::Duplicate(_))
        ));
    }

    #[test]
    fn validation_rejects_missing_default() {
        let specs: Vec<BlockSpec> = default_palette()
            .into_iter()
            .filter(|s| s.id != DEFAULT_BLOCK_ID)
            .collect();
        assert!(matches!(
            validate_palette(&specs),
            Err(PaletteError::MissingDefault(_))
        ));
    }

    #[test]
    fn validation_rejects_an_empty_palette() {
        assert!(matches!(validate_palette(&[]), Err(PaletteError::Empty)));
    }

    #[test]
    fn emoji_names_follow_discord_markup() {
        let specs = default_palette();
        let red = specs.iter().find(|s| s.id == "red").unwrap();
        assert_eq!(red.emoji, "red_square");
    }
}
