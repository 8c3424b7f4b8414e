use std::ops::RangeInclusive;

use eframe::egui::{Pos2, Vec2, pos2, vec2};

fn is_finite(value: Vec2) -> bool {
    value.x.is_finite() && value.y.is_finite()
}

/// Pan and zoom between simulation space and canvas-local screen space:
/// `screen = translate + world * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ViewportTransform {
    translate: Vec2,
    scale: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl ViewportTransform {
    #[cfg(test)]
    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn apply(&self, world: Vec2) -> Pos2 {
        (self.translate + world * self.scale).to_pos2()
    }

    pub fn invert(&self, screen: Pos2) -> Vec2 {
        (screen.to_vec2() - self.translate) / self.scale
    }

    /// Moves the view by a screen-space delta. Returns whether anything changed.
    pub fn pan_by(&mut self, delta: Vec2) -> bool {
        if !is_finite(delta) || delta == Vec2::ZERO {
            return false;
        }
        self.translate += delta;
        true
    }

    /// Multiplies the scale by `factor`, clamped to `extent`, keeping the world
    /// point under `anchor` fixed on screen.
    pub fn zoom_about(&mut self, anchor: Pos2, factor: f32, extent: &RangeInclusive<f32>) -> bool {
        if !factor.is_finite() || factor <= 0.0 || !(anchor.x.is_finite() && anchor.y.is_finite()) {
            return false;
        }

        let scale = (self.scale * factor).clamp(*extent.start(), *extent.end());
        if scale == self.scale {
            return false;
        }

        let world = self.invert(anchor);
        self.scale = scale;
        self.translate = anchor.to_vec2() - world * scale;
        true
    }
}

/// Converts wheel movement in points into a multiplicative zoom step.
pub(in crate::app) fn wheel_zoom_factor(scroll_y: f32) -> f32 {
    2.0_f32.powf(scroll_y * 0.002)
}

/// Zoom step for one input frame. A ctrl+wheel notch arrives as both scroll
/// and pinch; the pinch factor wins so it is applied once.
pub(in crate::app) fn input_zoom_factor(scroll_y: f32, pinch: f32) -> f32 {
    if pinch.is_finite() && (pinch - 1.0).abs() > f32::EPSILON {
        pinch
    } else {
        wheel_zoom_factor(scroll_y)
    }
}

pub(in crate::app) fn canvas_point(canvas_origin: Pos2, screen: Pos2) -> Pos2 {
    pos2(screen.x - canvas_origin.x, screen.y - canvas_origin.y)
}

pub(in crate::app) fn screen_point(canvas_origin: Pos2, canvas: Pos2) -> Pos2 {
    canvas_origin + vec2(canvas.x, canvas.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: RangeInclusive<f32> = 0.2..=4.0;

    #[test]
    fn identity_maps_world_to_canvas() {
        let viewport = ViewportTransform::default();
        assert_eq!(viewport.apply(vec2(50.0, 50.0)), pos2(50.0, 50.0));
        assert_eq!(viewport.invert(pos2(50.0, 50.0)), vec2(50.0, 50.0));
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut viewport = ViewportTransform::default();
        viewport.pan_by(vec2(30.0, -12.0));
        let anchor = pos2(200.0, 150.0);
        let world = viewport.invert(anchor);

        assert!(viewport.zoom_about(anchor, 2.5, &EXTENT));
        assert_eq!(viewport.scale(), 2.5);
        assert!((viewport.apply(world) - anchor).length() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped_to_extent() {
        let mut viewport = ViewportTransform::default();
        viewport.zoom_about(pos2(0.0, 0.0), 100.0, &EXTENT);
        assert_eq!(viewport.scale(), 4.0);
        assert!(!viewport.zoom_about(pos2(0.0, 0.0), 2.0, &EXTENT));

        viewport.zoom_about(pos2(0.0, 0.0), 1.0e-6, &EXTENT);
        assert_eq!(viewport.scale(), 0.2);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut viewport = ViewportTransform::default();
        assert!(!viewport.pan_by(vec2(f32::NAN, 1.0)));
        assert!(!viewport.zoom_about(pos2(0.0, 0.0), f32::INFINITY, &EXTENT));
        assert!(!viewport.zoom_about(pos2(f32::NAN, 0.0), 2.0, &EXTENT));
        assert!(!viewport.zoom_about(pos2(0.0, 0.0), -1.0, &EXTENT));
        assert_eq!(viewport, ViewportTransform::default());
    }

    #[test]
    fn wheel_factor_is_symmetric() {
        assert_eq!(wheel_zoom_factor(0.0), 1.0);
        assert!((wheel_zoom_factor(500.0) - 2.0).abs() < 1e-5);
        assert!((wheel_zoom_factor(120.0) * wheel_zoom_factor(-120.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn pinch_and_wheel_are_not_compounded() {
        assert_eq!(input_zoom_factor(120.0, 1.25), 1.25);
        assert_eq!(input_zoom_factor(120.0, 1.0), wheel_zoom_factor(120.0));
        assert_eq!(input_zoom_factor(0.0, 1.0), 1.0);
        assert_eq!(input_zoom_factor(-60.0, f32::NAN), wheel_zoom_factor(-60.0));
    }

    #[test]
    fn canvas_points_round_trip() {
        let origin = pos2(240.0, 60.0);
        let screen = pos2(300.0, 100.0);
        assert_eq!(canvas_point(origin, screen), pos2(60.0, 40.0));
        assert_eq!(screen_point(origin, canvas_point(origin, screen)), screen);
    }
}
