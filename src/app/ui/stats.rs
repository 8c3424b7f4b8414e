use eframe::egui::{self, Color32, RichText, Sense, Ui, vec2};

use crate::graph::{GraphStats, NodeKind, RelationKind};
use crate::util::format_count;

use super::super::ViewModel;

const BAR_HEIGHT: f32 = 6.0;

impl ViewModel {
    pub(in crate::app) fn draw_stats(&self, ui: &mut Ui, stats: Option<&GraphStats>) {
        ui.heading("Graph Stats");
        ui.add_space(6.0);

        let Some(stats) = stats else {
            ui.label("Waiting for statistics…");
            ui.spinner();
            return;
        };

        let style = &self.config.style;
        ui.label(RichText::new("Relational store").strong());
        egui::Grid::new("store_totals")
            .num_columns(2)
            .spacing(vec2(16.0, 4.0))
            .show(ui, |ui| {
                for (name, value) in [
                    ("Contracts", stats.contracts),
                    ("Queries", stats.queries),
                    ("Risks", stats.risks),
                ] {
                    ui.label(name);
                    ui.label(RichText::new(format_count(value)).strong());
                    ui.end_row();
                }
            });

        ui.separator();
        ui.label(RichText::new("Entities").strong());
        if stats.node_counts.is_empty() {
            ui.small("No entities stored.");
        }
        let max_nodes = stats.max_node_count();
        for (label, count) in &stats.node_counts {
            let color = style.node(NodeKind::from_label(label)).fill;
            count_row(ui, label, *count, max_nodes, color);
        }

        ui.separator();
        ui.label(RichText::new("Relationships").strong());
        if stats.relationship_counts.is_empty() {
            ui.small("No relationships stored.");
        }
        let max_relationships = stats.max_relationship_count();
        egui::ScrollArea::vertical()
            .id_salt("relationship_counts")
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (name, count) in &stats.relationship_counts {
                    let color = style.relation(RelationKind::from_name(name)).label;
                    count_row(ui, name, *count, max_relationships, color);
                }
            });
    }
}

fn count_row(ui: &mut Ui, name: &str, count: u64, max: u64, color: Color32) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(name).color(color));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(format_count(count));
        });
    });

    let width = ui.available_width();
    let (rect, _) = ui.allocate_exact_size(vec2(width, BAR_HEIGHT), Sense::hover());
    let painter = ui.painter();
    painter.rect_filled(rect, 3.0, Color32::from_rgb(0x1e, 0x24, 0x33));

    let share = count as f32 / max.max(1) as f32;
    let mut filled = rect;
    filled.set_width(rect.width() * share.clamp(0.0, 1.0));
    painter.rect_filled(filled, 3.0, color);
    ui.add_space(4.0);
}
