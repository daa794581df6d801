use egui::{Pos2, Rect, Vec2, pos2, vec2};

/// Hard bounds on grid dimensions, enforced everywhere a size enters the
/// system (store, document import, shell controls).
pub const MIN_GRID_DIM: u32 = 1;
pub const MAX_GRID_DIM: u32 = 64;

/// Placement of the cell grid in world space.
///
/// World space is the canvas viewport at camera identity: the grid is scaled
/// so every cell fits (`cell_size = min(vw/cols, vh/rows)`) and centered.
/// Recomputed whenever the viewport or the grid dimensions change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    pub cell_size: f32,
    pub offset: Vec2,
    pub cols: u32,
    pub rows: u32,
}

impl GridGeometry {
    /// Fit a `cols × rows` grid into `viewport`, centered.
    pub fn fit(viewport: Rect, cols: u32, rows: u32) -> Self {
        let cols = cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        let rows = rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        let cell_size = (viewport.width() / cols as f32)
            .min(viewport.height() / rows as f32)
            .max(0.0);
        let offset = viewport.min.to_vec2()
            + vec2(
                (viewport.width() - cell_size * cols as f32) / 2.0,
                (viewport.height() - cell_size * rows as f32) / 2.0,
            );
        Self {
            cell_size,
            offset,
            cols,
            rows,
        }
    }

    /// World-space rectangle covered by cell `(x, y)`.
    pub fn cell_world_rect(&self, x: u32, y: u32) -> Rect {
        let min = pos2(
            self.offset.x + x as f32 * self.cell_size,
            self.offset.y + y as f32 * self.cell_size,
        );
        Rect::from_min_size(min, Vec2::splat(self.cell_size))
    }

    /// World-space center of cell `(x, y)`.
    pub fn grid_to_world_center(&self, x: u32, y: u32) -> Pos2 {
        self.cell_world_rect(x, y).center()
    }

    /// Resolve a world-space point to the cell under it.
    ///
    /// Returns `None` for points outside `[0,cols) × [0,rows)`. Callers use
    /// this as the bounds pre-validation for every paint/erase/pick.
    pub fn world_to_grid(&self, world: Pos2) -> Option<(u32, u32)> {
        if self.cell_size <= 0.0 {
            return None;
        }
        let gx = (world.x - self.offset.x) / self.cell_size;
        let gy = (world.y - self.offset.y) / self.cell_size;
        if gx < 0.0 || gy < 0.0 {
            return None;
        }
        let (x, y) = (gx.floor() as u32, gy.floor() as u32);
        if x < self.cols && y < self.rows {
            Some((x, y))
        } else {
            None
        }
    }

    /// Nearest in-bounds cell to a world-space point. Used while a shape
    /// drag wanders off the grid so the preview stays anchored.
    pub fn world_to_grid_clamped(&self, world: Pos2) -> Option<(u32, u32)> {
        if self.cell_size <= 0.0 {
            return None;
        }
        let gx = ((world.x - self.offset.x) / self.cell_size).floor();
        let gy = ((world.y - self.offset.y) / self.cell_size).floor();
        let x = (gx.max(0.0) as u32).min(self.cols - 1);
        let y = (gy.max(0.0) as u32).min(self.rows - 1);
        Some((x, y))
    }

    /// World-space rectangle of the whole grid.
    pub fn grid_world_rect(&self) -> Rect {
        Rect::from_min_size(
            self.offset.to_pos2(),
            vec2(
                self.cell_size * self.cols as f32,
                self.cell_size * self.rows as f32,
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    fn geometry() -> GridGeometry {
        GridGeometry::fit(Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0)), 8, 8)
    }

    #[test]
    fn fit_centers_grid_and_uses_limiting_axis() {
        let g = geometry();
        // 600/8 = 75 is the limiting cell size; 800 - 8*75 = 200 → 100 on each side.
        assert_eq!(g.cell_size, 75.0);
        assert_eq!(g.offset, vec2(100.0, 0.0));
    }

    #[test]
    fn cell_center_round_trips_for_every_cell() {
        let g = geometry();
        for y in 0..g.rows {
            for x in 0..g.cols {
                let center = g.grid_to_world_center(x, y);
                assert_eq!(g.world_to_grid(center), Some((x, y)));
            }
        }
    }

    #[test]
    fn screen_round_trip_through_camera() {
        let g = geometry();
        let mut camera = Camera::new();
        camera.pan_by(vec2(37.0, -12.0));
        for (x, y) in [(0, 0), (3, 5), (7, 7)] {
            let screen = camera.world_to_screen(g.grid_to_world_center(x, y));
            let world = camera.screen_to_world(screen);
            assert_eq!(g.world_to_grid(world), Some((x, y)));
        }
    }

    #[test]
    fn points_outside_grid_resolve_to_none() {
        let g = geometry();
        let camera = Camera::new();
        // Left margin (the grid starts at x=100), and past the far corner.
        for screen in [pos2(50.0, 300.0), pos2(750.0, 300.0), pos2(400.0, 700.0)] {
            assert_eq!(g.world_to_grid(camera.screen_to_world(screen)), None);
        }
        // Just inside each edge still resolves.
        assert_eq!(g.world_to_grid(pos2(100.5, 0.5)), Some((0, 0)));
        assert_eq!(g.world_to_grid(pos2(699.5, 599.5)), Some((7, 7)));
    }

    #[test]
    fn clamped_lookup_pins_to_nearest_edge_cell() {
        let g = geometry();
        assert_eq!(g.world_to_grid_clamped(pos2(-500.0, -500.0)), Some((0, 0)));
        assert_eq!(g.world_to_grid_clamped(pos2(5000.0, 90.0)), Some((7, 1)));
    }

    #[test]
    fn degenerate_viewport_maps_nothing() {
        let g = GridGeometry::fit(Rect::from_min_size(pos2(0.0, 0.0), vec2(0.0, 0.0)), 8, 8);
        assert_eq!(g.world_to_grid(pos2(0.0, 0.0)), None);
        assert_eq!(g.world_to_grid_clamped(pos2(0.0, 0.0)), None);
    }
}
