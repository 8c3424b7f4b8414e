use std::time::Duration;

use eframe::egui::{self, Context, Vec2};
use tracing::info;

use crate::api::ApiClient;
use crate::graph::{FilteredView, GraphSnapshot, GraphStats, TypeFilter};

mod controller;
mod graph;
mod loader;
mod physics;
mod render_sync;
mod render_utils;
mod search;
mod style;
mod ui;
mod viewport;

use controller::InteractionController;
use loader::{SnapshotLoader, StatsPoller};
use physics::ForceSimulation;
use render_sync::RenderSync;
use search::LabelSearch;
use style::GraphConfig;

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub node_limit: usize,
    pub stats_interval: Duration,
}

pub struct ContractGraphApp {
    client: ApiClient,
    settings: AppSettings,
    loader: SnapshotLoader,
    stats_poller: StatsPoller,
    stats: Option<GraphStats>,
    state: AppState,
}

enum AppState {
    Loading,
    Ready(Box<ViewModel>),
}

/// One filtered view and the simulation laying it out. Replaced wholesale on
/// every filter change or reload.
struct Epoch {
    id: u64,
    view: FilteredView,
    simulation: Option<ForceSimulation>,
}

struct ViewModel {
    config: GraphConfig,
    snapshot: GraphSnapshot,
    /// Filter choices offered for the current snapshot, `All` excluded.
    type_filters: Vec<TypeFilter>,
    filter: TypeFilter,
    epoch: Epoch,
    next_epoch_id: u64,
    canvas_size: Vec2,
    controller: InteractionController,
    render: RenderSync,
    search: LabelSearch,
    load_error: Option<String>,
}

impl ContractGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, client: ApiClient, settings: AppSettings) -> Self {
        info!(api = client.base_url(), limit = settings.node_limit, "starting contract graph");

        let stats_client = client.clone();
        let stats_poller = StatsPoller::spawn(settings.stats_interval, move || {
            stats_client.fetch_stats()
        });

        let mut app = Self {
            client,
            settings,
            loader: SnapshotLoader::new(),
            stats_poller,
            stats: None,
            state: AppState::Loading,
        };
        app.request_snapshot();
        app
    }

    fn request_snapshot(&mut self) {
        let client = self.client.clone();
        let limit = self.settings.node_limit;
        self.loader.request(move || client.fetch_graph(limit));
    }

    fn apply_load_result(&mut self) {
        let Some(result) = self.loader.poll() else {
            return;
        };

        let (snapshot, load_error) = match result {
            Ok(snapshot) => (snapshot, None),
            Err(error) => (GraphSnapshot::default(), Some(error.to_string())),
        };

        if let AppState::Ready(model) = &mut self.state {
            model.replace_snapshot(snapshot, load_error);
            return;
        }
        self.state = AppState::Ready(Box::new(ViewModel::new(
            GraphConfig::default(),
            snapshot,
            load_error,
        )));
    }
}

impl eframe::App for ContractGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.apply_load_result();
        if let Some(stats) = self.stats_poller.latest() {
            self.stats = Some(stats);
        }

        let is_reloading = self.loader.is_pending();
        let mut reload_requested = false;

        match &mut self.state {
            AppState::Loading => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading graph…");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Ready(model) => {
                model.show(ctx, self.stats.as_ref(), &mut reload_requested, is_reloading);
            }
        }

        if reload_requested && !is_reloading {
            self.request_snapshot();
        }

        // keep polling background work without waiting for input
        if self.loader.is_pending() {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_secs(1));
        }
    }
}

impl Drop for ContractGraphApp {
    fn drop(&mut self) {
        self.loader.cancel();
        self.stats_poller.stop();
        if let AppState::Ready(model) = &mut self.state {
            model.shutdown();
        }
        info!("contract graph closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeKind};

    fn contract_graph() -> GraphSnapshot {
        GraphSnapshot::new(
            vec![
                Node::new("1", "Contract", "MSA"),
                Node::new("2", "Party", "Acme"),
                Node::new("3", "Party", "Globex"),
                Node::new("4", "Clause", "Termination"),
            ],
            vec![
                Edge::new("1", "2", "HAS_PARTY"),
                Edge::new("1", "3", "HAS_PARTY"),
                Edge::new("1", "4", "CONTAINS"),
                Edge::new("2", "3", "RELATED_TO"),
            ],
        )
    }

    fn model(snapshot: GraphSnapshot) -> ViewModel {
        ViewModel::new(GraphConfig::default(), snapshot, None)
    }

    #[test]
    fn first_epoch_shows_everything() {
        let model = model(contract_graph());
        assert_eq!(model.filter, TypeFilter::All);
        assert_eq!(model.epoch.view.nodes().len(), 4);
        assert_eq!(model.epoch.view.edges().len(), 4);
        assert!(model.epoch.simulation.is_some());
        assert_eq!(
            model.type_filters,
            vec![
                TypeFilter::Kind(NodeKind::Contract),
                TypeFilter::Kind(NodeKind::Party),
                TypeFilter::Kind(NodeKind::Clause),
            ]
        );
    }

    #[test]
    fn filter_change_starts_a_new_epoch_with_carried_positions() {
        let mut model = model(contract_graph());
        if let Some(simulation) = model.epoch.simulation.as_mut() {
            for _ in 0..30 {
                simulation.tick();
            }
        }
        let first_epoch = model.epoch.id;
        let acme = model.position_of("2").expect("acme placed");

        model.select_filter(TypeFilter::Kind(NodeKind::Party));
        assert!(model.epoch.id > first_epoch);
        assert_eq!(model.epoch.view.nodes().len(), 2);
        assert_eq!(model.epoch.view.edges().len(), 1);

        let simulation = model.epoch.simulation.as_ref().expect("parties simulated");
        assert_eq!(simulation.epoch(), model.epoch.id);
        assert_eq!(simulation.tick_count(), 0);
        assert_eq!(model.position_of("2"), Some(acme));
    }

    #[test]
    fn reselecting_the_same_filter_keeps_the_epoch() {
        let mut model = model(contract_graph());
        let epoch = model.epoch.id;
        model.select_filter(TypeFilter::All);
        assert_eq!(model.epoch.id, epoch);
    }

    #[test]
    fn filter_matching_nothing_has_no_simulation() {
        let mut model = model(contract_graph());
        model.select_filter(TypeFilter::Kind(NodeKind::Obligation));
        assert!(model.epoch.view.is_empty());
        assert!(model.epoch.simulation.is_none());
    }

    #[test]
    fn empty_snapshot_starts_no_simulation() {
        let model = model(GraphSnapshot::default());
        assert!(model.epoch.simulation.is_none());
        assert!(model.type_filters.is_empty());
    }

    #[test]
    fn failed_reload_keeps_viewport_and_reports_error() {
        let mut model = model(contract_graph());
        model.controller.pan_by(eframe::egui::vec2(40.0, 0.0));
        let viewport = *model.controller.viewport();

        model.replace_snapshot(GraphSnapshot::default(), Some("connection refused".to_owned()));
        assert!(model.snapshot.is_empty());
        assert!(model.epoch.simulation.is_none());
        assert_eq!(model.load_error.as_deref(), Some("connection refused"));
        assert_eq!(*model.controller.viewport(), viewport);
    }

    #[test]
    fn reload_drops_filter_for_vanished_kind() {
        let mut model = model(contract_graph());
        model.select_filter(TypeFilter::Kind(NodeKind::Clause));

        let parties_only = GraphSnapshot::new(vec![Node::new("2", "Party", "Acme")], Vec::new());
        model.replace_snapshot(parties_only, None);
        assert_eq!(model.filter, TypeFilter::All);
        assert_eq!(model.epoch.view.nodes().len(), 1);
    }

    #[test]
    fn reload_keeps_label_filter_while_the_type_remains() {
        let mut model = model(GraphSnapshot::new(
            vec![
                Node::new("1", "Contract", "MSA"),
                Node::new("5", "Chunk", "section 4"),
                Node::new("6", "Embedding", "vector"),
            ],
            Vec::new(),
        ));
        model.select_filter(TypeFilter::Label("Chunk".to_owned()));
        assert_eq!(model.epoch.view.nodes().len(), 1);

        let reloaded = GraphSnapshot::new(
            vec![
                Node::new("5", "Chunk", "section 4"),
                Node::new("7", "Chunk", "section 9"),
            ],
            Vec::new(),
        );
        model.replace_snapshot(reloaded, None);
        assert_eq!(model.filter, TypeFilter::Label("Chunk".to_owned()));
        assert_eq!(model.epoch.view.nodes().len(), 2);

        model.replace_snapshot(GraphSnapshot::new(vec![Node::new("1", "Contract", "MSA")], Vec::new()), None);
        assert_eq!(model.filter, TypeFilter::All);
    }

    #[test]
    fn shutdown_stops_the_running_epoch() {
        let mut model = model(contract_graph());
        model.shutdown();
        let simulation = model.epoch.simulation.as_mut().expect("simulation");
        assert!(!simulation.tick());
    }
}
