// ============================================================================
// binblock CLI — headless grid export via command-line arguments
// ============================================================================
//
// Usage examples:
//   binblock --input art.json --output art.png
//   binblock -i art.json --emoji art.txt
//   binblock -i art.json -o art.png --cell-px 48 --palette blocks/
//
// No window is opened in CLI mode. Everything runs synchronously on the
// current thread except the palette decode fan-out.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::blocks::{self, BlockSpec};
use crate::document;
use crate::grid::GridState;

/// binblock headless exporter.
///
/// Render a saved grid document to a PNG image or Discord emoji markup
/// without opening the editor.
#[derive(Parser, Debug)]
#[command(
    name = "binblock",
    about = "binblock headless grid exporter",
    long_about = "Render saved grid documents (.json) to PNG images or Discord emoji\n\
                  markup without opening the editor.\n\n\
                  Example:\n  \
                  binblock --input art.json --output art.png\n  \
                  binblock -i art.json --emoji art.txt --palette blocks/"
)]
pub struct CliArgs {
    /// Input grid document (.json).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output PNG path.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output Discord emoji markup to a text file.
    #[arg(long, value_name = "FILE")]
    pub emoji: Option<PathBuf>,

    /// Directory of <id>.png block images replacing the built-in palette.
    #[arg(long, value_name = "DIR")]
    pub palette: Option<PathBuf>,

    /// Pixel size of each exported cell.
    #[arg(long, default_value_t = document::EXPORT_CELL_PX, value_name = "PX")]
    pub cell_px: u32,

    /// Print per-step timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// True when the CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

/// GUI-mode arguments, parsed only when no CLI flag is present.
#[derive(Parser, Debug)]
#[command(name = "binblock")]
pub struct GuiArgs {
    /// Directory of <id>.png block images replacing the built-in palette.
    #[arg(long, value_name = "DIR")]
    pub palette: Option<PathBuf>,
}

/// Run the export and return an OS exit code.
/// `SUCCESS` when every requested output was written.
pub fn run(args: CliArgs) -> ExitCode {
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// The whole export pipeline; errors come back as printable messages.
pub fn execute(args: CliArgs) -> Result<(), String> {
    if args.output.is_none() && args.emoji.is_none() {
        return Err("nothing to do: pass --output and/or --emoji".to_string());
    }
    if args.cell_px == 0 || args.cell_px > 256 {
        return Err("--cell-px must be between 1 and 256".to_string());
    }

    let started = Instant::now();
    let specs = load_palette(args.palette.as_deref()).map_err(|e| e.to_string())?;
    let grid = load_grid(&args.input)
        .map_err(|e| format!("{}: {}", args.input.display(), e))?;
    if args.verbose {
        println!(
            "loaded {} ({}x{}) in {:.1?}",
            args.input.display(),
            grid.cols(),
            grid.rows(),
            started.elapsed()
        );
    }

    if let Some(output) = &args.output {
        let step = Instant::now();
        let image = document::render_image(&grid, &specs, args.cell_px);
        document::save_png(output, &image)
            .map_err(|e| format!("{}: {}", output.display(), e))?;
        if args.verbose {
            println!(
                "wrote {} ({}x{} px) in {:.1?}",
                output.display(),
                image.width(),
                image.height(),
                step.elapsed()
            );
        }
    }

    if let Some(path) = &args.emoji {
        let markup = document::emoji_markup(&grid, &specs);
        std::fs::write(path, markup).map_err(|e| format!("{}: {}", path.display(), e))?;
        if args.verbose {
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

fn load_palette(dir: Option<&std::path::Path>) -> Result<Vec<BlockSpec>, blocks::PaletteError> {
    match dir {
        Some(dir) => blocks::load_palette_dir(dir),
        None => Ok(blocks::default_palette()),
    }
}

fn load_grid(path: &std::path::Path) -> Result<GridState, document::DocumentError> {
    let doc = document::load_document(path)?;
    let snapshot = doc.into_snapshot(blocks::DEFAULT_BLOCK_ID)?;
    let mut grid = GridState::new(snapshot.cols, snapshot.rows, blocks::DEFAULT_BLOCK_ID);
    grid.replace(snapshot);
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_export_flags() {
        let args = CliArgs::parse_from([
            "binblock", "-i", "in.json", "-o", "out.png", "--emoji", "out.txt", "--cell-px", "16",
        ]);
        assert_eq!(args.input, PathBuf::from("in.json"));
        assert_eq!(args.output, Some(PathBuf::from("out.png")));
        assert_eq!(args.emoji, Some(PathBuf::from("out.txt")));
        assert_eq!(args.cell_px, 16);
        assert!(!args.verbose);
    }

    #[test]
    fn cell_px_defaults_to_export_size() {
        let args = CliArgs::parse_from(["binblock", "--input", "in.json"]);
        assert_eq!(args.cell_px, document::EXPORT_CELL_PX);
        assert!(args.palette.is_none());
    }

    #[test]
    fn round_trip_through_temp_files() {
        let dir = std::env::temp_dir().join("binblock_cli_test");
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("grid.json");
        let output = dir.join("grid.png");
        let emoji = dir.join("grid.txt");

        let mut grid = GridState::new(3, 2, blocks::DEFAULT_BLOCK_ID);
        grid.set_cell(0, 0, "red");
        document::save_document(&input, &document::GridDocument::from_grid(&grid)).unwrap();

        let args = CliArgs::parse_from([
            "binblock",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--emoji",
            emoji.to_str().unwrap(),
        ]);
        execute(args).unwrap();

        let png = image::open(&output).unwrap();
        assert_eq!(png.width(), 3 * document::EXPORT_CELL_PX);
        assert_eq!(png.height(), 2 * document::EXPORT_CELL_PX);
        let text = std::fs::read_to_string(&emoji).unwrap();
        assert!(text.starts_with(":red_square:"));
        assert_eq!(text.lines().count(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_input_fails_cleanly() {
        let args = CliArgs::parse_from(["binblock", "-i", "/no/such/file.json", "-o", "x.png"]);
        assert!(execute(args).is_err());
    }

    #[test]
    fn no_outputs_is_an_error() {
        let args = CliArgs::parse_from(["binblock", "-i", "grid.json"]);
        assert!(execute(args).unwrap_err().contains("nothing to do"));
    }
}
