#![windows_subsystem = "windows"]

use clap::Parser;

use binblock::app::BinblockApp;
use binblock::cli::{CliArgs, GuiArgs};
use binblock::{blocks, cli, log_err, logger};

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if CliArgs::is_cli_mode() {
        let args = CliArgs::parse();
        match cli::execute(args) {
            Ok(()) => std::process::exit(0),
            Err(message) => {
                eprintln!("error: {}", message);
                std::process::exit(1);
            }
        }
    }

    // -- GUI mode --------------------------------------------------------

    // Session log (overwrites the previous session's file).
    logger::init();

    // Resolve the palette up front: a bad block image must fail startup,
    // not surface as a half-working editor.
    let gui_args = GuiArgs::parse();
    let palette = match gui_args.palette {
        Some(dir) => blocks::load_palette_dir(&dir),
        None => Ok(blocks::default_palette()),
    };
    let palette = match palette {
        Ok(specs) => specs,
        Err(e) => {
            log_err!("palette load failed: {}", e);
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_title("binblock++"),
        ..Default::default()
    };
    eframe::run_native(
        "binblock",
        options,
        Box::new(move |cc| match BinblockApp::new(cc, palette) {
            Ok(app) => Box::new(app),
            Err(e) => {
                log_err!("initialization failed: {}", e);
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }),
    )
}
