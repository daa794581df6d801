use std::collections::HashMap;

use egui::{Color32, Key, PointerButton, Pos2, Rect, Sense, Stroke, Vec2, pos2};

use crate::blocks::BlockSet;
use crate::camera::Camera;
use crate::coords::{GridGeometry, MAX_GRID_DIM, MIN_GRID_DIM};
use crate::document::{DocumentError, GridDocument};
use crate::grid::{Cell, GridState};
use crate::raster;

/// Scroll points per wheel notch (egui reports line scrolls in points).
const WHEEL_NOTCH_POINTS: f32 = 50.0;
/// Default grid on startup.
const DEFAULT_GRID_DIM: u32 = 8;

const BACKGROUND: Color32 = Color32::from_gray(28);
const GRID_LINE: Color32 = Color32::from_gray(55);
const HOVER_STROKE: Color32 = Color32::from_rgb(94, 156, 255);
/// Tint applied to the shape preview overlay.
const PREVIEW_TINT: Color32 = Color32::from_rgba_premultiplied(160, 160, 160, 160);

// ============================================================================
// TOOLS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Pencil,
    Fill,
    Line,
    Rect,
    RectFilled,
    Circle,
    CircleFilled,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[
            Tool::Pencil,
            Tool::Fill,
            Tool::Line,
            Tool::Rect,
            Tool::RectFilled,
            Tool::Circle,
            Tool::CircleFilled,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Fill => "Fill",
            Tool::Line => "Line",
            Tool::Rect => "Rectangle",
            Tool::RectFilled => "Rectangle (filled)",
            Tool::Circle => "Circle",
            Tool::CircleFilled => "Circle (filled)",
        }
    }

    /// Number-key shortcut, shown next to the label.
    pub fn shortcut(&self) -> Key {
        match self {
            Tool::Pencil => Key::Num1,
            Tool::Fill => Key::Num2,
            Tool::Line => Key::Num3,
            Tool::Rect => Key::Num4,
            Tool::RectFilled => Key::Num5,
            Tool::Circle => Key::Num6,
            Tool::CircleFilled => Key::Num7,
        }
    }

    /// Rasterize this shape tool between two cells. `None` for non-shape tools.
    fn shape_cells(&self, anchor: Cell, current: Cell, cols: u32, rows: u32) -> Option<Vec<Cell>> {
        match self {
            Tool::Pencil | Tool::Fill => None,
            Tool::Line => Some(raster::line_cells(anchor, current, cols, rows)),
            Tool::Rect => Some(raster::rect_cells(anchor, current, false, cols, rows)),
            Tool::RectFilled => Some(raster::rect_cells(anchor, current, true, cols, rows)),
            Tool::Circle => Some(raster::ellipse_cells(anchor, current, false, cols, rows)),
            Tool::CircleFilled => Some(raster::ellipse_cells(anchor, current, true, cols, rows)),
        }
    }
}

/// Key held to pan (and to gate wheel zoom).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanModifier {
    Space,
    Shift,
}

impl PanModifier {
    pub fn label(&self) -> &'static str {
        match self {
            PanModifier::Space => "Space",
            PanModifier::Shift => "Shift",
        }
    }
}

// ============================================================================
// INTERACTION STATE
// ============================================================================

/// Mutually exclusive pointer interaction modes. Entered on pointer-down,
/// exited on pointer-up or when the pointer leaves the canvas. The zoom
/// animation is orthogonal and lives on the camera.
#[derive(Clone, Debug, PartialEq)]
enum Interaction {
    Idle,
    Panning,
    Painting { last: Option<Cell> },
    Erasing { last: Option<Cell> },
    ShapeDragging { anchor: Cell, preview: Vec<Cell> },
}

#[derive(Clone, Copy, Default)]
struct PressedButtons {
    primary: bool,
    secondary: bool,
    middle: bool,
}

/// Render record for one cell: its block id and world-space rect. Recreated
/// whenever the cell's block or the grid geometry changes; the sprite map
/// always covers every cell, default tiles included.
#[derive(Clone, Debug, PartialEq)]
struct TileSprite {
    block_id: String,
    world_rect: Rect,
}

// ============================================================================
// CANVAS CONTROLLER
// ============================================================================

/// Owns the grid model, camera, tile scene and interaction state, and turns
/// pointer/wheel input into grid edits. The shell drives it once per frame
/// through [`CanvasController::ui`] and talks to it through the operations
/// below (palette selection, resize, import/export, history).
pub struct CanvasController {
    grid: GridState,
    blocks: BlockSet,
    camera: Camera,
    geometry: GridGeometry,
    viewport: Rect,
    sprites: HashMap<Cell, TileSprite>,
    interaction: Interaction,
    tool: Tool,
    selected_block: Option<String>,
    pan_modifier: PanModifier,
    hovered_cell: Option<Cell>,
    picked_block: Option<String>,
}

impl CanvasController {
    pub fn new(blocks: BlockSet) -> Self {
        let grid = GridState::new(
            DEFAULT_GRID_DIM,
            DEFAULT_GRID_DIM,
            crate::blocks::DEFAULT_BLOCK_ID,
        );
        let mut controller = Self {
            geometry: GridGeometry::fit(Rect::ZERO, grid.cols(), grid.rows()),
            grid,
            blocks,
            camera: Camera::new(),
            viewport: Rect::NOTHING,
            sprites: HashMap::new(),
            interaction: Interaction::Idle,
            tool: Tool::Pencil,
            selected_block: None,
            pan_modifier: PanModifier::Space,
            hovered_cell: None,
            picked_block: None,
        };
        controller.rebuild_scene();
        controller
    }

    // ---- external interface --------------------------------------------------

    pub fn blocks(&self) -> &BlockSet {
        &self.blocks
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn pan_modifier(&self) -> PanModifier {
        self.pan_modifier
    }

    pub fn set_pan_modifier(&mut self, modifier: PanModifier) {
        self.pan_modifier = modifier;
    }

    pub fn selected_block(&self) -> Option<&str> {
        self.selected_block.as_deref()
    }

    pub fn set_selected_block(&mut self, id: Option<String>) {
        self.selected_block = id;
    }

    /// Block id picked with the middle button, if any since the last call.
    /// The shell drains this and forwards it to the palette.
    pub fn take_picked_block(&mut self) -> Option<String> {
        self.picked_block.take()
    }

    pub fn hovered_cell(&self) -> Option<Cell> {
        self.hovered_cell
    }

    pub fn zoom_percent(&self) -> f32 {
        self.camera.scale * 100.0
    }

    pub fn can_undo(&self) -> bool {
        self.grid.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.grid.can_redo()
    }

    pub fn undo(&mut self) {
        if self.grid.undo() {
            self.reconcile_grid_change();
        }
    }

    pub fn redo(&mut self) {
        if self.grid.redo() {
            self.reconcile_grid_change();
        }
    }

    /// Resize, preserving content per the blank-margin slide of the store.
    pub fn resize_grid(&mut self, cols: u32, rows: u32) {
        let cols = cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        let rows = rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        if cols == self.grid.cols() && rows == self.grid.rows() {
            return;
        }
        self.grid.push_history();
        self.grid.resize(cols, rows);
        self.reconcile_grid_change();
    }

    pub fn clear_all_cells(&mut self) {
        self.grid.push_history();
        let (cols, rows) = (self.grid.cols(), self.grid.rows());
        self.grid.clear(cols, rows);
        self.reconcile_grid_change();
    }

    pub fn export_grid_state(&self) -> GridDocument {
        GridDocument::from_grid(&self.grid)
    }

    /// Replace the grid wholesale and recenter the view.
    pub fn import_grid_state(&mut self, doc: GridDocument) -> Result<(), DocumentError> {
        let snapshot = doc.into_snapshot(self.grid.default_id())?;
        self.grid.push_history();
        self.grid.replace(snapshot);
        self.camera.reset();
        self.reconcile_grid_change();
        Ok(())
    }

    pub fn reset_view(&mut self) {
        self.camera.reset();
        if self.viewport != Rect::NOTHING {
            self.geometry = GridGeometry::fit(self.viewport, self.grid.cols(), self.grid.rows());
            self.rebuild_scene();
        }
    }

    /// Menu-driven zoom step, anchored at the viewport center.
    pub fn zoom_step(&mut self, notches: f32) {
        if self.viewport == Rect::NOTHING {
            return;
        }
        self.camera
            .zoom_toward(self.viewport.center(), notches, &self.geometry, self.viewport);
    }

    // ---- frame entry ---------------------------------------------------------

    /// One frame: allocate the canvas, run input through the interaction
    /// machine, tick the zoom animation, and paint the scene.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let sense = Sense::click_and_drag().union(Sense::hover());
        let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
        self.reconcile_viewport(response.rect);

        if self.camera.tick() {
            ui.ctx().request_repaint();
        }

        let (pressed, any_released, scroll, space_down, shift_down, delta, raw_pointer) =
            ui.input(|i| {
                (
                    PressedButtons {
                        primary: i.pointer.button_pressed(PointerButton::Primary),
                        secondary: i.pointer.button_pressed(PointerButton::Secondary),
                        middle: i.pointer.button_pressed(PointerButton::Middle),
                    },
                    i.pointer.any_released(),
                    i.scroll_delta,
                    i.key_down(Key::Space),
                    i.modifiers.shift,
                    i.pointer.delta(),
                    i.pointer.interact_pos(),
                )
            });
        let pointer = raw_pointer.filter(|p| response.rect.contains(*p));
        let pan_held = match self.pan_modifier {
            PanModifier::Space => space_down,
            PanModifier::Shift => shift_down,
        };

        self.hovered_cell = pointer.and_then(|p| self.cell_at(p));

        if let Some(pos) = pointer {
            if pan_held && scroll.y != 0.0 {
                self.handle_wheel(pos, scroll.y / WHEEL_NOTCH_POINTS);
                ui.ctx().request_repaint();
            }
            if pressed.primary || pressed.secondary || pressed.middle {
                self.handle_pointer_down(pos, pressed, pan_held);
            }
        }

        self.handle_pointer_move(pointer, delta);

        // Pointer-up or pointer-leave tears the active mode down; a shape
        // drag commits its last preview on the way out.
        if any_released || pointer.is_none() {
            self.handle_pointer_up();
        }

        self.paint(&painter);
        response
    }

    // ---- input handling ------------------------------------------------------

    fn cell_at(&self, screen: Pos2) -> Option<Cell> {
        self.geometry
            .world_to_grid(self.camera.screen_to_world(screen))
    }

    fn handle_wheel(&mut self, pos: Pos2, notches: f32) {
        self.camera
            .zoom_toward(pos, notches, &self.geometry, self.viewport);
    }

    fn handle_pointer_down(&mut self, pos: Pos2, pressed: PressedButtons, pan_held: bool) {
        if !matches!(self.interaction, Interaction::Idle) {
            return;
        }
        // Pan wins over every tool; it also freezes an in-flight zoom so the
        // grab anchors to what is actually on screen.
        if pan_held && (pressed.primary || pressed.secondary) {
            self.camera.cancel_animation();
            self.interaction = Interaction::Panning;
            return;
        }
        if pressed.secondary {
            self.grid.push_history();
            let cell = self.cell_at(pos);
            self.interaction = Interaction::Erasing { last: cell };
            if let Some((x, y)) = cell {
                self.grid.clear_cell(x, y);
                self.sync_cell((x, y));
            }
            return;
        }
        if pressed.middle {
            // One-shot pick: no state change, out-of-grid clicks ignored.
            if let Some((x, y)) = self.cell_at(pos) {
                self.picked_block = Some(self.grid.block_at(x, y).to_string());
            }
            return;
        }
        if !pressed.primary {
            return;
        }
        let Some(selected) = self.selected_block.clone() else {
            return;
        };
        match self.tool {
            Tool::Pencil => {
                self.grid.push_history();
                let cell = self.cell_at(pos);
                self.interaction = Interaction::Painting { last: cell };
                if let Some((x, y)) = cell {
                    self.grid.set_cell(x, y, &selected);
                    self.sync_cell((x, y));
                }
            }
            Tool::Fill => {
                if let Some((x, y)) = self.cell_at(pos) {
                    self.grid.push_history();
                    let changed = self.grid.flood_fill(x, y, &selected);
                    for cell in changed {
                        self.sync_cell(cell);
                    }
                }
            }
            _ => {
                if let Some(anchor) = self.cell_at(pos) {
                    self.grid.push_history();
                    self.interaction = Interaction::ShapeDragging {
                        anchor,
                        preview: vec![anchor],
                    };
                }
            }
        }
    }

    fn handle_pointer_move(&mut self, pointer: Option<Pos2>, delta: Vec2) {
        let cell = pointer.and_then(|p| self.cell_at(p));
        // A write is decided under the interaction borrow and applied after
        // it ends, since the sprite resync needs the whole controller.
        let mut write: Option<(Cell, bool)> = None;
        match &mut self.interaction {
            Interaction::Idle => {}
            Interaction::Panning => {
                if delta != Vec2::ZERO {
                    self.camera.pan_by(delta);
                }
            }
            Interaction::Painting { last } => {
                if let Some(cell) = cell {
                    // Skip the cell painted last; redundant writes would be
                    // harmless, just wasted sprite churn.
                    if *last != Some(cell) {
                        *last = Some(cell);
                        write = Some((cell, true));
                    }
                }
            }
            Interaction::Erasing { last } => {
                if let Some(cell) = cell {
                    if *last != Some(cell) {
                        *last = Some(cell);
                        write = Some((cell, false));
                    }
                }
            }
            Interaction::ShapeDragging { anchor, preview } => {
                let Some(pos) = pointer else { return };
                let world = self.camera.screen_to_world(pos);
                if let Some(current) = self.geometry.world_to_grid_clamped(world) {
                    if let Some(cells) = self.tool.shape_cells(
                        *anchor,
                        current,
                        self.grid.cols(),
                        self.grid.rows(),
                    ) {
                        *preview = cells;
                    }
                }
            }
        }
        match write {
            Some((cell, true)) => {
                if let Some(selected) = self.selected_block.clone() {
                    self.grid.set_cell(cell.0, cell.1, &selected);
                    self.sync_cell(cell);
                }
            }
            Some((cell, false)) => {
                self.grid.clear_cell(cell.0, cell.1);
                self.sync_cell(cell);
            }
            None => {}
        }
    }

    fn handle_pointer_up(&mut self) {
        let finished = std::mem::replace(&mut self.interaction, Interaction::Idle);
        if let Interaction::ShapeDragging { preview, .. } = finished {
            // Commit exactly the cells last previewed.
            if let Some(selected) = self.selected_block.clone() {
                for (x, y) in preview {
                    self.grid.set_cell(x, y, &selected);
                    self.sync_cell((x, y));
                }
            }
        }
    }

    // ---- scene / geometry reconciliation ------------------------------------

    fn reconcile_viewport(&mut self, rect: Rect) {
        if self.viewport == rect {
            return;
        }
        let first = self.viewport == Rect::NOTHING;
        let old_center = self.viewport.center();
        self.viewport = rect;
        if first || !self.camera.view_moved() {
            // View untouched: re-fit and recenter in the new viewport.
            self.geometry = GridGeometry::fit(rect, self.grid.cols(), self.grid.rows());
            self.rebuild_scene();
        } else {
            // User navigated: keep the world point under the viewport center
            // fixed so nothing jumps.
            self.camera.follow_viewport_center(old_center, rect.center());
        }
    }

    fn reconcile_grid_change(&mut self) {
        if self.viewport != Rect::NOTHING {
            self.geometry = GridGeometry::fit(self.viewport, self.grid.cols(), self.grid.rows());
        }
        self.rebuild_scene();
    }

    /// Destroy and recreate the sprite for one cell after a block write.
    fn sync_cell(&mut self, cell: Cell) {
        self.sprites.remove(&cell);
        if !self.grid.in_bounds(cell.0, cell.1) {
            return;
        }
        let block_id = self.grid.block_at(cell.0, cell.1).to_string();
        if !self.blocks.contains(&block_id) {
            // Closed palette makes this unreachable in practice; imports with
            // foreign ids land here. The tile renders as the default texture.
            crate::log_warn!("no texture for block '{}' at {:?}", block_id, cell);
        }
        self.sprites.insert(
            cell,
            TileSprite {
                block_id,
                world_rect: self.geometry.cell_world_rect(cell.0, cell.1),
            },
        );
    }

    /// Rebuild the whole tile scene: one sprite per cell, default tiles
    /// included, positioned from the current geometry.
    fn rebuild_scene(&mut self) {
        self.sprites.clear();
        for y in 0..self.grid.rows() {
            for x in 0..self.grid.cols() {
                self.sync_cell((x, y));
            }
        }
    }

    // ---- painting ------------------------------------------------------------

    fn paint(&self, painter: &egui::Painter) {
        let painter = painter.with_clip_rect(self.viewport);
        painter.rect_filled(self.viewport, 0.0, BACKGROUND);
        let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));

        for y in 0..self.grid.rows() {
            for x in 0..self.grid.cols() {
                let Some(sprite) = self.sprites.get(&(x, y)) else {
                    continue;
                };
                let rect = self.camera.rect_to_screen(sprite.world_rect);
                if !rect.intersects(self.viewport) {
                    continue;
                }
                let texture = self
                    .blocks
                    .texture(&sprite.block_id)
                    .or_else(|| self.blocks.texture(self.grid.default_id()));
                if let Some(texture) = texture {
                    painter.image(texture.id(), rect, uv, Color32::WHITE);
                }
                painter.rect_stroke(rect, 0.0, Stroke::new(1.0, GRID_LINE));
            }
        }

        if let Interaction::ShapeDragging { preview, .. } = &self.interaction {
            let preview_texture = self
                .selected_block
                .as_deref()
                .and_then(|id| self.blocks.texture(id));
            for &(x, y) in preview {
                let rect = self
                    .camera
                    .rect_to_screen(self.geometry.cell_world_rect(x, y));
                match preview_texture {
                    Some(texture) => painter.image(texture.id(), rect, uv, PREVIEW_TINT),
                    None => painter.rect_filled(rect, 0.0, PREVIEW_TINT),
                }
            }
        }

        if matches!(self.interaction, Interaction::Idle) {
            if let Some((x, y)) = self.hovered_cell {
                let rect = self
                    .camera
                    .rect_to_screen(self.geometry.cell_world_rect(x, y));
                painter.rect_stroke(rect, 0.0, Stroke::new(2.0, HOVER_STROKE));
            }
        }
    }
}
