use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use crate::graph::{GraphSnapshot, TypeFilter, filter_by_type, type_filters};

use super::super::controller::InteractionController;
use super::super::physics::ForceSimulation;
use super::super::render_sync::RenderSync;
use super::super::search::LabelSearch;
use super::super::style::GraphConfig;
use super::super::{Epoch, ViewModel};

/// Canvas size assumed until the first frame reports the real one.
const DEFAULT_CANVAS: Vec2 = vec2(900.0, 540.0);

impl ViewModel {
    pub(in crate::app) fn new(
        config: GraphConfig,
        snapshot: GraphSnapshot,
        load_error: Option<String>,
    ) -> Self {
        let mut model = Self {
            config,
            type_filters: type_filters(&snapshot),
            snapshot,
            filter: TypeFilter::All,
            epoch: Epoch {
                id: 0,
                view: Default::default(),
                simulation: None,
            },
            next_epoch_id: 1,
            canvas_size: DEFAULT_CANVAS,
            controller: InteractionController::default(),
            render: RenderSync::default(),
            search: LabelSearch::default(),
            load_error,
        };
        model.rebuild_epoch();
        model
    }

    pub(in crate::app) fn select_filter(&mut self, filter: TypeFilter) {
        if filter == self.filter {
            return;
        }
        debug!(from = self.filter.label(), to = filter.label(), "filter changed");
        self.filter = filter;
        self.rebuild_epoch();
    }

    /// Swaps in a freshly loaded snapshot. The viewport and search query stay;
    /// pointer state and the running epoch do not.
    pub(in crate::app) fn replace_snapshot(
        &mut self,
        snapshot: GraphSnapshot,
        load_error: Option<String>,
    ) {
        self.type_filters = type_filters(&snapshot);
        self.snapshot = snapshot;
        self.load_error = load_error;

        if self.filter != TypeFilter::All && !self.type_filters.contains(&self.filter) {
            self.filter = TypeFilter::All;
        }

        if let Some(simulation) = self.epoch.simulation.as_mut() {
            simulation.stop();
        }
        self.controller.reset_pointer_state();
        self.rebuild_epoch();
    }

    pub(in crate::app) fn shutdown(&mut self) {
        if let Some(simulation) = self.epoch.simulation.as_mut() {
            simulation.stop();
        }
    }

    /// Current drawn position of a node, by id.
    pub(in crate::app) fn position_of(&self, id: &str) -> Option<Vec2> {
        let index = self.epoch.view.index_of(id)?;
        let simulation = self.epoch.simulation.as_ref()?;
        simulation
            .bodies()
            .get(index)
            .map(|body| body.display_position())
    }

    /// Records the canvas size; a simulation that has not ticked yet is moved
    /// to the new centre.
    pub(in crate::app) fn observe_canvas(&mut self, size: Vec2) {
        if !(size.x > 0.0 && size.y > 0.0) {
            return;
        }
        self.canvas_size = size;
        if let Some(simulation) = self.epoch.simulation.as_mut() {
            simulation.recenter(size * 0.5);
        }
    }

    fn carry_over(&self) -> HashMap<String, Vec2> {
        let Some(simulation) = self.epoch.simulation.as_ref() else {
            return HashMap::new();
        };

        self.epoch
            .view
            .nodes()
            .iter()
            .zip(simulation.bodies())
            .map(|(node, body)| (node.id.clone(), body.position))
            .collect()
    }

    fn rebuild_epoch(&mut self) {
        let carry_over = self.carry_over();
        if let Some(simulation) = self.epoch.simulation.as_mut() {
            simulation.stop();
        }

        let id = self.next_epoch_id;
        self.next_epoch_id += 1;

        let view = filter_by_type(&self.snapshot, &self.filter);
        let style = &self.config.style;
        let mut simulation = ForceSimulation::start(
            &view,
            id,
            self.config.simulation,
            self.canvas_size * 0.5,
            &carry_over,
            |node| style.node(node.kind).radius,
        );

        self.controller
            .rebind(&view, simulation.as_mut(), &self.config.simulation);

        debug!(
            epoch = id,
            filter = self.filter.label(),
            nodes = view.nodes().len(),
            edges = view.edges().len(),
            dropped_edges = view.dropped_edges(),
            "epoch started"
        );

        self.epoch = Epoch {
            id,
            view,
            simulation,
        };
        self.render.invalidate();
    }
}
