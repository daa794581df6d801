use std::path::PathBuf;

use eframe::egui;
use egui::{Color32, Key, Stroke, vec2};

use crate::blocks::{BlockSet, BlockSpec, DEFAULT_BLOCK_ID, PaletteError};
use crate::canvas::{CanvasController, PanModifier, Tool};
use crate::coords::{MAX_GRID_DIM, MIN_GRID_DIM};
use crate::document;
use crate::{log_err, log_info};

/// Default dimensions for File → New.
const NEW_GRID_DIM: u32 = 8;

// ============================================================================
// APPLICATION SHELL — menu bar, palette sidebar, status bar
// ============================================================================

pub struct BinblockApp {
    controller: CanvasController,
    /// Grid-size controls, applied on demand rather than per keystroke.
    pending_cols: u32,
    pending_rows: u32,
    /// Last file the grid was saved to / loaded from.
    current_path: Option<PathBuf>,
    /// One-line feedback shown in the status bar.
    status: String,
}

impl BinblockApp {
    /// Fails if any palette image is unusable.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        specs: Vec<BlockSpec>,
    ) -> Result<Self, PaletteError> {
        let blocks = BlockSet::load(&cc.egui_ctx, specs)?;
        let first_color = blocks
            .ids()
            .find(|id| *id != DEFAULT_BLOCK_ID)
            .map(str::to_string);
        let mut controller = CanvasController::new(blocks);
        controller.set_selected_block(first_color);
        log_info!("editor ready ({} blocks)", controller.blocks().specs().len());
        Ok(Self {
            controller,
            pending_cols: NEW_GRID_DIM,
            pending_rows: NEW_GRID_DIM,
            current_path: None,
            status: String::new(),
        })
    }

    // ---- file operations -----------------------------------------------------

    fn open_grid(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("binblock grid", &["json"])
            .pick_file()
        else {
            return;
        };
        match document::load_document(&path)
            .and_then(|doc| self.controller.import_grid_state(doc))
        {
            Ok(()) => {
                self.pending_cols = self.controller.grid().cols();
                self.pending_rows = self.controller.grid().rows();
                self.status = format!("Opened {}", path.display());
                log_info!("opened grid {}", path.display());
                self.current_path = Some(path);
            }
            Err(e) => {
                self.status = format!("Open failed: {}", e);
                log_err!("open {}: {}", path.display(), e);
            }
        }
    }

    fn save_grid(&mut self, save_as: bool) {
        let path = if save_as {
            None
        } else {
            self.current_path.clone()
        };
        let Some(path) = path.or_else(|| {
            rfd::FileDialog::new()
                .add_filter("binblock grid", &["json"])
                .set_file_name("grid.json")
                .save_file()
        }) else {
            return;
        };
        match document::save_document(&path, &self.controller.export_grid_state()) {
            Ok(()) => {
                self.status = format!("Saved {}", path.display());
                log_info!("saved grid {}", path.display());
                self.current_path = Some(path);
            }
            Err(e) => {
                self.status = format!("Save failed: {}", e);
                log_err!("save {}: {}", path.display(), e);
            }
        }
    }

    fn export_png(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name("grid.png")
            .save_file()
        else {
            return;
        };
        let image = document::render_image(
            self.controller.grid(),
            self.controller.blocks().specs(),
            document::EXPORT_CELL_PX,
        );
        match document::save_png(&path, &image) {
            Ok(()) => {
                self.status = format!("Exported {}", path.display());
                log_info!("exported image {}", path.display());
            }
            Err(e) => {
                self.status = format!("Export failed: {}", e);
                log_err!("export {}: {}", path.display(), e);
            }
        }
    }

    fn export_emoji_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("text", &["txt"])
            .set_file_name("grid.txt")
            .save_file()
        else {
            return;
        };
        let markup =
            document::emoji_markup(self.controller.grid(), self.controller.blocks().specs());
        match std::fs::write(&path, markup) {
            Ok(()) => self.status = format!("Exported {}", path.display()),
            Err(e) => {
                self.status = format!("Export failed: {}", e);
                log_err!("export {}: {}", path.display(), e);
            }
        }
    }

    fn copy_emoji(&mut self, ctx: &egui::Context) {
        let markup =
            document::emoji_markup(self.controller.grid(), self.controller.blocks().specs());
        ctx.output_mut(|o| o.copied_text = markup);
        self.status = "Emoji markup copied to clipboard".to_string();
    }

    fn new_grid(&mut self) {
        self.controller.resize_grid(NEW_GRID_DIM, NEW_GRID_DIM);
        self.controller.clear_all_cells();
        self.controller.reset_view();
        self.pending_cols = NEW_GRID_DIM;
        self.pending_rows = NEW_GRID_DIM;
        self.current_path = None;
        self.status = "New grid".to_string();
    }

    // ---- input ---------------------------------------------------------------

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (ctrl, shift) = ctx.input(|i| (i.modifiers.command, i.modifiers.shift));
        if ctrl {
            if ctx.input(|i| i.key_pressed(Key::Z)) {
                if shift {
                    self.controller.redo();
                } else {
                    self.controller.undo();
                }
            }
            if ctx.input(|i| i.key_pressed(Key::Y)) {
                self.controller.redo();
            }
            if ctx.input(|i| i.key_pressed(Key::Num0)) {
                self.controller.reset_view();
            }
            if ctx.input(|i| i.key_pressed(Key::S)) {
                self.save_grid(shift);
            }
            if ctx.input(|i| i.key_pressed(Key::O)) {
                self.open_grid();
            }
        } else {
            for &tool in Tool::all() {
                if ctx.input(|i| i.key_pressed(tool.shortcut())) {
                    self.controller.set_tool(tool);
                }
            }
        }
    }

    // ---- panels --------------------------------------------------------------

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("New").clicked() {
                    self.new_grid();
                    ui.close_menu();
                }
                if ui
                    .add(egui::Button::new("Open…").shortcut_text("Ctrl+O"))
                    .clicked()
                {
                    self.open_grid();
                    ui.close_menu();
                }
                if ui
                    .add(egui::Button::new("Save").shortcut_text("Ctrl+S"))
                    .clicked()
                {
                    self.save_grid(false);
                    ui.close_menu();
                }
                if ui.button("Save As…").clicked() {
                    self.save_grid(true);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Export PNG…").clicked() {
                    self.export_png();
                    ui.close_menu();
                }
                if ui.button("Export Emoji Text…").clicked() {
                    self.export_emoji_file();
                    ui.close_menu();
                }
                if ui.button("Copy Emoji Markup").clicked() {
                    self.copy_emoji(ctx);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
            ui.menu_button("Edit", |ui| {
                if ui
                    .add_enabled(
                        self.controller.can_undo(),
                        egui::Button::new("Undo").shortcut_text("Ctrl+Z"),
                    )
                    .clicked()
                {
                    self.controller.undo();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(
                        self.controller.can_redo(),
                        egui::Button::new("Redo").shortcut_text("Ctrl+Shift+Z"),
                    )
                    .clicked()
                {
                    self.controller.redo();
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Clear Grid").clicked() {
                    self.controller.clear_all_cells();
                    ui.close_menu();
                }
            });
            ui.menu_button("View", |ui| {
                if ui
                    .add(egui::Button::new("Reset View").shortcut_text("Ctrl+0"))
                    .clicked()
                {
                    self.controller.reset_view();
                    ui.close_menu();
                }
                if ui.button("Zoom In").clicked() {
                    self.controller.zoom_step(1.0);
                }
                if ui.button("Zoom Out").clicked() {
                    self.controller.zoom_step(-1.0);
                }
                ui.separator();
                ui.label("Pan key");
                for modifier in [PanModifier::Space, PanModifier::Shift] {
                    if ui
                        .radio(self.controller.pan_modifier() == modifier, modifier.label())
                        .clicked()
                    {
                        self.controller.set_pan_modifier(modifier);
                    }
                }
            });
        });
    }

    fn palette_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Blocks");
        ui.add_space(4.0);
        let ids: Vec<String> = self.controller.blocks().ids().map(str::to_string).collect();
        let mut clicked: Option<String> = None;
        egui::Grid::new("block_palette").spacing(vec2(6.0, 6.0)).show(ui, |ui| {
            for (i, id) in ids.iter().enumerate() {
                if let Some(texture) = self.controller.blocks().texture(id) {
                    let sized = egui::load::SizedTexture::from_handle(texture);
                    let img = egui::Image::from_texture(sized).fit_to_exact_size(vec2(28.0, 28.0));
                    let response = ui
                        .add(egui::ImageButton::new(img).frame(false))
                        .on_hover_text(id.as_str());
                    if self.controller.selected_block() == Some(id.as_str()) {
                        ui.painter().rect_stroke(
                            response.rect.expand(2.0),
                            3.0,
                            Stroke::new(2.0, Color32::from_rgb(94, 156, 255)),
                        );
                    }
                    if response.clicked() {
                        clicked = Some(id.clone());
                    }
                }
                if i % 3 == 2 {
                    ui.end_row();
                }
            }
        });
        if let Some(id) = clicked {
            self.controller.set_selected_block(Some(id));
        }

        ui.add_space(10.0);
        ui.separator();
        ui.heading("Tools");
        for &tool in Tool::all() {
            if ui
                .selectable_label(self.controller.tool() == tool, tool.label())
                .clicked()
            {
                self.controller.set_tool(tool);
            }
        }

        ui.add_space(10.0);
        ui.separator();
        ui.heading("Grid");
        ui.horizontal(|ui| {
            ui.label("Cols");
            ui.add(
                egui::DragValue::new(&mut self.pending_cols)
                    .clamp_range(MIN_GRID_DIM..=MAX_GRID_DIM),
            );
            ui.label("Rows");
            ui.add(
                egui::DragValue::new(&mut self.pending_rows)
                    .clamp_range(MIN_GRID_DIM..=MAX_GRID_DIM),
            );
        });
        if ui.button("Apply size").clicked() {
            self.controller.resize_grid(self.pending_cols, self.pending_rows);
        }
    }

    fn status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.status);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{:.0}%", self.controller.zoom_percent()));
                ui.separator();
                let grid = self.controller.grid();
                ui.label(format!("{}×{}", grid.cols(), grid.rows()));
                ui.separator();
                match self.controller.hovered_cell() {
                    Some((x, y)) => ui.label(format!("({}, {})", x, y)),
                    None => ui.label("—"),
                };
            });
        });
    }
}

impl eframe::App for BinblockApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);

        // Middle-click pick lands back in the palette selection.
        if let Some(id) = self.controller.take_picked_block() {
            self.status = format!("Picked block '{}'", id);
            self.controller.set_selected_block(Some(id));
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });
        egui::SidePanel::left("palette")
            .resizable(false)
            .default_width(150.0)
            .show(ctx, |ui| {
                self.palette_panel(ui);
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.controller.ui(ui);
        });
    }
}
