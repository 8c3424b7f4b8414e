use eframe::egui::{Painter, Pos2, Rect, Stroke, StrokeKind};

use super::style::GraphStyle;

pub(super) fn draw_background(painter: &Painter, rect: Rect, style: &GraphStyle) {
    painter.rect_filled(rect, 8.0, style.canvas_fill);
    painter.rect_stroke(
        rect,
        8.0,
        Stroke::new(1.0, style.canvas_border),
        StrokeKind::Inside,
    );
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Whether any part of the segment, widened by `padding`, lies inside `rect`.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let bounds = Rect::from_two_pos(start, end).expand(padding);
    if !bounds.intersects(rect) {
        return false;
    }
    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    (0..4).any(|side| segments_intersect(start, end, corners[side], corners[(side + 1) % 4]))
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let straddles = |c1: f32, c2: f32| (c1 <= 0.0 && c2 >= 0.0) || (c1 >= 0.0 && c2 <= 0.0);
    straddles(cross(a1, a2, b1), cross(a1, a2, b2))
        && straddles(cross(b1, b2, a1), cross(b1, b2, a2))
}
