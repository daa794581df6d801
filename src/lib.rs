//! binblock — a pixel-grid editor for Discord emoji art.
//!
//! Paint, erase, flood-fill and draw shapes on a bounded cell grid with a
//! palette of block tiles, then export the result as a PNG image or Discord
//! emoji markup. The [`canvas::CanvasController`] owns the interactive
//! surface; [`cli`] drives the same document pipeline headlessly.

pub mod app;
pub mod blocks;
pub mod camera;
pub mod canvas;
pub mod cli;
pub mod coords;
pub mod document;
pub mod grid;
pub mod logger;
pub mod raster;
