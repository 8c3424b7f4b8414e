use eframe::egui::{self, Align, Context, Layout, RichText};

use crate::graph::{GraphStats, TypeFilter};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        stats: Option<&GraphStats>,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Knowledge Graph");
                    ui.separator();

                    let mut selected = None;
                    let filters = std::iter::once(&TypeFilter::All).chain(&self.type_filters);
                    for filter in filters {
                        if ui
                            .selectable_label(self.filter == *filter, filter.label())
                            .clicked()
                        {
                            selected = Some(filter.clone());
                        }
                    }
                    if let Some(filter) = selected {
                        self.select_filter(filter);
                    }

                    ui.separator();
                    ui.add(
                        egui::TextEdit::singleline(&mut self.search.query)
                            .hint_text("Search labels")
                            .desired_width(180.0),
                    );

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let reload_button =
                            ui.add_enabled(!is_reloading, egui::Button::new("Reload"));
                        if reload_button.clicked() {
                            *reload_requested = true;
                        }
                        if is_reloading {
                            ui.spinner();
                        }
                    });
                });
            });

        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| self.draw_status(ui));
            });

        egui::SidePanel::right("stats")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_stats(ui, stats));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }

    fn draw_status(&self, ui: &mut egui::Ui) {
        ui.label(format!(
            "snapshot: {} nodes, {} edges",
            self.snapshot.nodes().len(),
            self.snapshot.edges().len()
        ));
        ui.separator();
        ui.label(format!(
            "view: {} nodes, {} edges",
            self.epoch.view.nodes().len(),
            self.epoch.view.edges().len()
        ));
        if self.epoch.view.dropped_edges() > 0 {
            ui.separator();
            ui.label(format!("dropped edges: {}", self.epoch.view.dropped_edges()));
        }
        if let Some(simulation) = &self.epoch.simulation {
            ui.separator();
            ui.label(format!(
                "{} (alpha {:.3}, {} ticks)",
                simulation.phase().label(),
                simulation.alpha(),
                simulation.tick_count()
            ));
        }
        if let Some(node) = self
            .controller
            .dragged_index()
            .and_then(|index| self.epoch.view.node(index))
        {
            ui.separator();
            ui.label(format!("dragging {}", node.label));
        }
        if let Some(error) = &self.load_error {
            ui.separator();
            ui.label(
                RichText::new(format!("load failed: {error}")).color(self.config.style.risk_high),
            );
        }
    }
}
