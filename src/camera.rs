use egui::{Pos2, Rect, Vec2};

use crate::coords::GridGeometry;

/// Multiplicative zoom change per wheel notch.
pub const ZOOM_STEP: f32 = 1.2;
/// Fraction of the remaining distance covered per animation frame.
const EASE_FRACTION: f32 = 0.15;
/// Convergence thresholds: when both errors drop below these, the camera
/// snaps exactly to its target and the animation stops.
const SCALE_EPSILON: f32 = 1e-3;
const OFFSET_EPSILON: f32 = 0.5;
/// Zoomed fully out, the grid still covers this fraction of viewport height.
const MIN_GRID_VIEW_FRACTION: f32 = 0.25;
/// Zoomed fully in, at least this many cells stay visible in both axes.
const MIN_CELLS_VISIBLE: u32 = 4;

// ============================================================================
// CAMERA — pan/zoom transform between world space and screen space
// ============================================================================

/// Pan/zoom state with an eased target transition.
///
/// `screen = world * scale + offset`. The live `scale`/`offset` chase
/// `target_scale`/`target_offset` at a fixed fraction per frame while
/// `animating`; pans apply immediately and cancel any transition.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub scale: f32,
    pub offset: Vec2,
    target_scale: f32,
    target_offset: Vec2,
    animating: bool,
    view_moved: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
            target_scale: 1.0,
            target_offset: Vec2::ZERO,
            animating: false,
            view_moved: false,
        }
    }

    #[inline]
    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.offset) / self.scale).to_pos2()
    }

    #[inline]
    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.scale + self.offset).to_pos2()
    }

    /// Map a world-space rectangle to screen space.
    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.world_to_screen(rect.min), self.world_to_screen(rect.max))
    }

    /// True once the user has panned or zoomed away from the fitted view.
    /// Suppresses auto-recentering on viewport resize.
    pub fn view_moved(&self) -> bool {
        self.view_moved
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Immediate pan by a screen-space delta. Cancels any in-flight zoom
    /// transition by snapping the targets to the panned position.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.offset += delta;
        self.cancel_animation();
        self.view_moved = true;
    }

    /// Snap targets to the current state and stop animating.
    pub fn cancel_animation(&mut self) {
        self.target_scale = self.scale;
        self.target_offset = self.offset;
        self.animating = false;
    }

    /// Back to the fitted identity view.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Scale clamps for the current grid/viewport.
    ///
    /// The lower bound keeps the grid from shrinking into an unfindable
    /// speck; the upper bound keeps enough cells on screen to orient by.
    pub fn scale_limits(geometry: &GridGeometry, viewport: Rect) -> (f32, f32) {
        let grid_h = geometry.cell_size * geometry.rows as f32;
        if grid_h <= 0.0 || viewport.width() <= 0.0 {
            return (1.0, 1.0);
        }
        let min_scale = MIN_GRID_VIEW_FRACTION * viewport.height() / grid_h;
        let nx = geometry.cols.min(MIN_CELLS_VISIBLE) as f32;
        let ny = geometry.rows.min(MIN_CELLS_VISIBLE) as f32;
        let max_scale = (viewport.width() / (nx * geometry.cell_size))
            .min(viewport.height() / (ny * geometry.cell_size));
        (min_scale, max_scale.max(min_scale))
    }

    /// Wheel zoom toward `anchor` (screen space) by `notches` wheel steps.
    ///
    /// Adjusts the *target* camera so the world point under the anchor stays
    /// put, then lets the per-frame tick ease toward it.
    pub fn zoom_toward(
        &mut self,
        anchor: Pos2,
        notches: f32,
        geometry: &GridGeometry,
        viewport: Rect,
    ) {
        let (min_scale, max_scale) = Self::scale_limits(geometry, viewport);
        let new_scale = (self.target_scale * ZOOM_STEP.powf(notches)).clamp(min_scale, max_scale);
        if new_scale == self.target_scale {
            return;
        }
        // Hold the anchor fixed in world space: solve for the offset that
        // maps the same world point back to the anchor at the new scale.
        let world = (anchor.to_vec2() - self.target_offset) / self.target_scale;
        self.target_offset = anchor.to_vec2() - world * new_scale;
        self.target_scale = new_scale;
        self.animating = true;
        self.view_moved = true;
    }

    /// One animation frame. Returns `true` while the transition is live so
    /// the caller keeps requesting repaints; snaps and self-terminates once
    /// both errors fall under the thresholds.
    pub fn tick(&mut self) -> bool {
        if !self.animating {
            return false;
        }
        self.scale += (self.target_scale - self.scale) * EASE_FRACTION;
        self.offset += (self.target_offset - self.offset) * EASE_FRACTION;
        if (self.target_scale - self.scale).abs() < SCALE_EPSILON
            && (self.target_offset - self.offset).length() < OFFSET_EPSILON
        {
            self.scale = self.target_scale;
            self.offset = self.target_offset;
            self.animating = false;
        }
        self.animating
    }

    /// Viewport resized while the view is user-moved: translate so the world
    /// point under the old viewport center sits under the new center.
    pub fn follow_viewport_center(&mut self, old_center: Pos2, new_center: Pos2) {
        let delta = new_center - old_center;
        self.offset += delta;
        self.target_offset += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    fn setup() -> (GridGeometry, Rect) {
        let viewport = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        (GridGeometry::fit(viewport, 8, 8), viewport)
    }

    fn settle(camera: &mut Camera) {
        for _ in 0..1000 {
            if !camera.tick() {
                return;
            }
        }
        panic!("zoom animation did not converge");
    }

    #[test]
    fn repeated_zoom_in_clamps_at_max_scale() {
        let (geometry, viewport) = setup();
        let (_, max_scale) = Camera::scale_limits(&geometry, viewport);
        let mut camera = Camera::new();
        for _ in 0..100 {
            camera.zoom_toward(viewport.center(), 1.0, &geometry, viewport);
        }
        settle(&mut camera);
        assert!(camera.scale <= max_scale + 1e-4);
        assert!((camera.scale - max_scale).abs() < 1e-3);
    }

    #[test]
    fn repeated_zoom_out_clamps_at_min_scale() {
        let (geometry, viewport) = setup();
        let (min_scale, _) = Camera::scale_limits(&geometry, viewport);
        let mut camera = Camera::new();
        for _ in 0..100 {
            camera.zoom_toward(viewport.center(), -1.0, &geometry, viewport);
        }
        settle(&mut camera);
        assert!(camera.scale >= min_scale - 1e-4);
        assert!((camera.scale - min_scale).abs() < 1e-3);
    }

    #[test]
    fn zoom_keeps_anchor_point_fixed_in_world_space() {
        let (geometry, viewport) = setup();
        let anchor = pos2(250.0, 330.0);
        let mut camera = Camera::new();
        let world_before = camera.screen_to_world(anchor);
        camera.zoom_toward(anchor, 1.0, &geometry, viewport);
        settle(&mut camera);
        let world_after = camera.screen_to_world(anchor);
        assert!((world_after - world_before).length() < 0.01);
    }

    #[test]
    fn animation_snaps_exactly_to_target_and_stops() {
        let (geometry, viewport) = setup();
        let mut camera = Camera::new();
        camera.zoom_toward(viewport.center(), 1.0, &geometry, viewport);
        assert!(camera.is_animating());
        settle(&mut camera);
        assert!(!camera.is_animating());
        // Snapped, not merely close.
        assert_eq!(camera.scale, camera.target_scale);
        assert_eq!(camera.offset, camera.target_offset);
    }

    #[test]
    fn pan_cancels_animation_and_marks_view_moved() {
        let (geometry, viewport) = setup();
        let mut camera = Camera::new();
        assert!(!camera.view_moved());
        camera.zoom_toward(viewport.center(), 1.0, &geometry, viewport);
        camera.pan_by(vec2(10.0, 0.0));
        assert!(!camera.is_animating());
        assert!(camera.view_moved());
        assert!(!camera.tick());
    }

    #[test]
    fn follow_viewport_center_preserves_centered_world_point() {
        let mut camera = Camera::new();
        camera.pan_by(vec2(40.0, -25.0));
        let old_center = pos2(400.0, 300.0);
        let new_center = pos2(512.0, 384.0);
        let world = camera.screen_to_world(old_center);
        camera.follow_viewport_center(old_center, new_center);
        assert!((camera.screen_to_world(new_center) - world).length() < 1e-4);
    }

    #[test]
    fn reset_restores_identity_and_clears_moved_flag() {
        let mut camera = Camera::new();
        camera.pan_by(vec2(99.0, 99.0));
        camera.reset();
        assert_eq!(camera.scale, 1.0);
        assert_eq!(camera.offset, Vec2::ZERO);
        assert!(!camera.view_moved());
    }
}
