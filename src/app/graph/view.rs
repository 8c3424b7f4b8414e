use eframe::egui::{
    self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2, vec2,
};

use super::super::ViewModel;
use super::super::render_sync::{FrameContent, FrameEdge, FrameInput, FrameText, FrameTooltip};
use super::super::render_utils::{circle_visible, draw_background, edge_visible};
use super::super::style::GraphStyle;
use super::super::viewport::screen_point;

const DASH_LENGTH: f32 = 4.0;
const GAP_LENGTH: f32 = 3.0;

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.observe_canvas(rect.size());

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.config.style);

        self.handle_canvas_input(ui, rect, &response);

        let frame_delta_seconds = ui.ctx().input(|input| input.stable_dt);
        if let Some(simulation) = self.epoch.simulation.as_mut() {
            simulation.advance(frame_delta_seconds);
            if simulation.is_running() {
                ui.ctx().request_repaint();
            }
        }

        self.search.refresh(self.epoch.id, &self.epoch.view);
        let frame = self.render.sync(FrameInput {
            epoch: self.epoch.id,
            view: &self.epoch.view,
            simulation: self.epoch.simulation.as_ref(),
            controller: &self.controller,
            style: &self.config.style,
            search_matches: self.search.matches(),
            search_revision: self.search.revision(),
            search_active: self.search.is_active(),
        });

        let style = &self.config.style;
        let origin = rect.min;
        match &frame.content {
            FrameContent::Empty => {
                let message = if self.snapshot.is_empty() {
                    "No entities yet — upload contracts first".to_owned()
                } else {
                    format!("No {} entities in this snapshot", self.filter.label())
                };
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    message,
                    FontId::proportional(13.0),
                    style.muted_text,
                );
            }
            FrameContent::Graph { edges, nodes } => {
                for edge in edges {
                    paint_edge(&painter, rect, edge);
                }

                for node in nodes {
                    let center = screen_point(origin, node.center);
                    let reach = node
                        .rings
                        .iter()
                        .map(|ring| ring.radius)
                        .fold(node.radius, f32::max);
                    if !circle_visible(rect, center, reach) {
                        continue;
                    }

                    painter.circle_filled(center, node.radius, node.fill);
                    painter.circle_stroke(
                        center,
                        node.radius,
                        Stroke::new(node.outline_width, node.outline),
                    );
                    for ring in &node.rings {
                        painter.circle_stroke(center, ring.radius, Stroke::new(ring.width, ring.color));
                    }
                    if let Some(label) = &node.label {
                        paint_text(&painter, origin, label, Align2::LEFT_BOTTOM);
                    }
                }
            }
        }

        if !self.snapshot.is_empty() {
            draw_legend(&painter, rect, style);
        }
        if let Some(tooltip) = &frame.tooltip {
            draw_tooltip(&painter, rect, tooltip, style);
        }
    }
}

fn paint_edge(painter: &Painter, rect: Rect, edge: &FrameEdge) {
    let from = screen_point(rect.min, edge.from);
    let to = screen_point(rect.min, edge.to);
    if !edge_visible(rect, from, to, edge.width.max(1.0)) {
        return;
    }

    let stroke = Stroke::new(edge.width, edge.color);
    if edge.dashed {
        painter.extend(Shape::dashed_line(&[from, to], stroke, DASH_LENGTH, GAP_LENGTH));
    } else {
        painter.line_segment([from, to], stroke);
    }

    if let Some(arrow) = edge.arrow {
        painter.add(Shape::convex_polygon(
            arrow.iter().map(|point| screen_point(rect.min, *point)).collect(),
            edge.color,
            Stroke::NONE,
        ));
    }
    if let Some(label) = &edge.label {
        paint_text(painter, rect.min, label, Align2::CENTER_CENTER);
    }
}

fn paint_text(painter: &Painter, origin: Pos2, text: &FrameText, anchor: Align2) {
    painter.text(
        screen_point(origin, text.position),
        anchor,
        &text.text,
        FontId::proportional(text.size),
        text.color,
    );
}

fn draw_legend(painter: &Painter, rect: Rect, style: &GraphStyle) {
    let font = FontId::proportional(11.0);
    let row_height = 16.0;
    let mut cursor = rect.left_top() + vec2(12.0, 12.0);

    for (kind, node) in style.nodes.entries() {
        painter.circle_filled(cursor + vec2(5.0, 0.0), 5.0, node.fill);
        painter.text(
            cursor + vec2(16.0, 0.0),
            Align2::LEFT_CENTER,
            kind.label(),
            font.clone(),
            style.muted_text,
        );
        cursor.y += row_height;
    }

    painter.text(
        cursor,
        Align2::LEFT_CENTER,
        "╌╌ CONFLICTS_WITH",
        font.clone(),
        style.risk_high,
    );
    cursor.y += row_height;
    painter.text(
        cursor,
        Align2::LEFT_CENTER,
        "Drag to rearrange",
        font,
        style.muted_text,
    );
}

fn draw_tooltip(
    painter: &Painter,
    rect: Rect,
    tooltip: &FrameTooltip,
    style: &GraphStyle,
) {
    let padding = vec2(10.0, 8.0);
    let mut lines = vec![
        painter.layout_no_wrap(
            tooltip.kind_text.clone(),
            FontId::proportional(10.0),
            tooltip.kind_color,
        ),
        painter.layout_no_wrap(
            tooltip.label.clone(),
            FontId::proportional(13.0),
            Color32::from_gray(226),
        ),
    ];
    if let Some((risk, color)) = &tooltip.risk {
        lines.push(painter.layout_no_wrap(risk.clone(), FontId::proportional(11.0), *color));
    }

    let content = lines.iter().fold(Vec2::ZERO, |size, galley| {
        vec2(size.x.max(galley.size().x), size.y + galley.size().y + 2.0)
    });
    let mut min = screen_point(rect.min, tooltip.anchor);
    // keep the box on the canvas near the right and bottom edges
    min.x = min.x.min(rect.right() - content.x - padding.x * 2.0);
    min.y = min.y.min(rect.bottom() - content.y - padding.y * 2.0);
    let frame = Rect::from_min_size(min, content + padding * 2.0);

    painter.rect_filled(frame, 8.0, style.canvas_fill);
    painter.rect_stroke(
        frame,
        8.0,
        Stroke::new(1.0, style.canvas_border),
        egui::StrokeKind::Inside,
    );

    let mut cursor: Pos2 = frame.min + padding;
    for galley in lines {
        let height = galley.size().y;
        painter.galley(cursor, galley, Color32::WHITE);
        cursor.y += height + 2.0;
    }
}
