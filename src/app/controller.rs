use std::ops::RangeInclusive;

use eframe::egui::{Pos2, Vec2};
use tracing::debug;

use crate::graph::{FilteredView, NodeKind, Severity};

use super::physics::{ForceSimulation, SimulationConfig};
use super::style::GraphStyle;
use super::viewport::ViewportTransform;

/// Hover descriptor, anchored in canvas-local screen space.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct Tooltip {
    pub anchor: Pos2,
    pub label: String,
    pub type_label: String,
    pub kind: NodeKind,
    pub severity: Option<Severity>,
}

#[derive(Clone, Debug, PartialEq)]
struct ActiveDrag {
    node_id: String,
    index: usize,
    pinned_at: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
struct Hover {
    node_id: String,
    index: usize,
}

/// Turns pointer input into pin updates on the running simulation and into
/// viewport changes. Owns the viewport, which outlives every epoch.
#[derive(Debug, Default)]
pub(in crate::app) struct InteractionController {
    viewport: ViewportTransform,
    viewport_revision: u64,
    drag: Option<ActiveDrag>,
    hover: Option<Hover>,
    tooltip: Option<Tooltip>,
    tooltip_revision: u64,
}

impl InteractionController {
    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn viewport_revision(&self) -> u64 {
        self.viewport_revision
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn tooltip_revision(&self) -> u64 {
        self.tooltip_revision
    }

    pub fn dragged_index(&self) -> Option<usize> {
        self.drag.as_ref().map(|drag| drag.index)
    }

    pub fn hovered_index(&self) -> Option<usize> {
        self.hover.as_ref().map(|hover| hover.index)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Node under a canvas-local point, using each node's drawn radius.
    pub fn node_at(
        &self,
        view: &FilteredView,
        simulation: &ForceSimulation,
        point: Pos2,
        style: &GraphStyle,
    ) -> Option<usize> {
        let world = self.viewport.invert(point);
        simulation.body_at(world, |index| {
            view.node(index)
                .map(|node| style.node(node.kind).radius)
                .unwrap_or(0.0)
        })
    }

    /// Pins `index` where it currently is and keeps the simulation warm.
    pub fn begin_node_drag(
        &mut self,
        view: &FilteredView,
        simulation: &mut ForceSimulation,
        index: usize,
        config: &SimulationConfig,
    ) -> bool {
        let (Some(node), Some(body)) = (view.node(index), simulation.bodies().get(index)) else {
            return false;
        };
        let position = body.display_position();

        // a second drag replaces the first
        if let Some(previous) = self.drag.take() {
            simulation.unpin(previous.index);
        }

        if !simulation.pin(index, position) {
            return false;
        }
        simulation.set_alpha_target(config.drag_alpha_target);
        simulation.reheat();

        debug!(node = %node.id, epoch = simulation.epoch(), "drag started");
        self.drag = Some(ActiveDrag {
            node_id: node.id.clone(),
            index,
            pinned_at: position,
        });
        true
    }

    /// Moves the dragged node's pin to the world point under `point`.
    pub fn drag_to(&mut self, simulation: &mut ForceSimulation, point: Pos2) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let world = self.viewport.invert(point);
        if simulation.pin(drag.index, world) {
            drag.pinned_at = world;
        }
    }

    pub fn end_node_drag(&mut self, simulation: Option<&mut ForceSimulation>) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if let Some(simulation) = simulation {
            simulation.unpin(drag.index);
            simulation.set_alpha_target(0.0);
            debug!(node = %drag.node_id, epoch = simulation.epoch(), "drag released");
        }
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if self.viewport.pan_by(delta) {
            self.viewport_revision += 1;
            self.refresh_tooltip_anchor(delta);
        }
    }

    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32, extent: &RangeInclusive<f32>) {
        if self.viewport.zoom_about(anchor, factor, extent) {
            self.viewport_revision += 1;
        }
    }

    /// Updates hover and the tooltip for a pointer at a canvas-local point;
    /// `None` means the pointer left the canvas.
    pub fn hover(
        &mut self,
        view: &FilteredView,
        simulation: Option<&ForceSimulation>,
        pointer: Option<Pos2>,
        style: &GraphStyle,
    ) {
        let hit = pointer.zip(simulation).and_then(|(point, simulation)| {
            let index = self.node_at(view, simulation, point, style)?;
            Some((point, index, view.node(index)?))
        });

        let (hover, tooltip) = match hit {
            Some((point, index, node)) => (
                Some(Hover {
                    node_id: node.id.clone(),
                    index,
                }),
                Some(Tooltip {
                    anchor: point + style.tooltip_offset,
                    label: node.label.clone(),
                    type_label: node.type_label.clone(),
                    kind: node.kind,
                    severity: node.severity,
                }),
            ),
            None => (None, None),
        };

        self.hover = hover;
        self.set_tooltip(tooltip);
    }

    /// Carries interaction state into a freshly started epoch. Drag and hover
    /// survive only if their node is still in the new view.
    pub fn rebind(
        &mut self,
        view: &FilteredView,
        simulation: Option<&mut ForceSimulation>,
        config: &SimulationConfig,
    ) {
        if let Some(hover) = self.hover.take() {
            match view.index_of(&hover.node_id) {
                Some(index) => {
                    self.hover = Some(Hover {
                        node_id: hover.node_id,
                        index,
                    });
                }
                None => self.set_tooltip(None),
            }
        }

        let Some(drag) = self.drag.take() else {
            return;
        };
        let (Some(index), Some(simulation)) = (view.index_of(&drag.node_id), simulation) else {
            debug!(node = %drag.node_id, "drag dropped by view change");
            return;
        };

        if simulation.pin(index, drag.pinned_at) {
            simulation.set_alpha_target(config.drag_alpha_target);
            self.drag = Some(ActiveDrag { index, ..drag });
        }
    }

    /// Forgets the drag and hover without touching any simulation, used when
    /// the snapshot itself is replaced.
    pub fn reset_pointer_state(&mut self) {
        self.drag = None;
        self.hover = None;
        self.set_tooltip(None);
    }

    fn refresh_tooltip_anchor(&mut self, delta: Vec2) {
        if let Some(mut tooltip) = self.tooltip.clone() {
            tooltip.anchor += delta;
            self.set_tooltip(Some(tooltip));
        }
    }

    fn set_tooltip(&mut self, tooltip: Option<Tooltip>) {
        if self.tooltip != tooltip {
            self.tooltip = tooltip;
            self.tooltip_revision += 1;
        }
    }
}
