use std::collections::HashSet;

use eframe::egui::{Color32, Pos2, Vec2, vec2};
use tracing::trace;

use crate::graph::{FilteredView, NodeKind};
use crate::util::truncate_label;

use super::controller::{InteractionController, Tooltip};
use super::physics::ForceSimulation;
use super::style::GraphStyle;

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FrameText {
    pub text: String,
    pub position: Pos2,
    pub size: f32,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FrameRing {
    pub radius: f32,
    pub width: f32,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FrameNode {
    pub index: usize,
    pub center: Pos2,
    pub radius: f32,
    pub fill: Color32,
    pub outline: Color32,
    pub outline_width: f32,
    pub rings: Vec<FrameRing>,
    pub label: Option<FrameText>,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FrameEdge {
    pub from: Pos2,
    pub to: Pos2,
    pub color: Color32,
    pub width: f32,
    pub dashed: bool,
    /// Arrowhead triangle touching the target's outline.
    pub arrow: Option<[Pos2; 3]>,
    pub label: Option<FrameText>,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FrameTooltip {
    pub anchor: Pos2,
    pub kind_text: String,
    pub kind_color: Color32,
    pub label: String,
    pub risk: Option<(String, Color32)>,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum FrameContent {
    /// Nothing to simulate: the snapshot or the filtered view has no nodes.
    Empty,
    Graph {
        edges: Vec<FrameEdge>,
        nodes: Vec<FrameNode>,
    },
}

/// Everything that can change what a frame looks like. Equal keys mean the
/// cached frame is still exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct FrameKey {
    pub epoch: u64,
    pub simulation_revision: u64,
    pub viewport_revision: u64,
    pub tooltip_revision: u64,
    pub search_revision: u64,
    pub search_active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct Frame {
    pub key: FrameKey,
    pub content: FrameContent,
    pub tooltip: Option<FrameTooltip>,
}

#[cfg(test)]
impl Frame {
    pub fn is_empty(&self) -> bool {
        matches!(self.content, FrameContent::Empty)
    }

    pub fn node(&self, index: usize) -> Option<&FrameNode> {
        match &self.content {
            FrameContent::Empty => None,
            FrameContent::Graph { nodes, .. } => nodes.iter().find(|node| node.index == index),
        }
    }

    pub fn edges(&self) -> &[FrameEdge] {
        match &self.content {
            FrameContent::Empty => &[],
            FrameContent::Graph { edges, .. } => edges,
        }
    }
}

pub(in crate::app) struct FrameInput<'a> {
    pub epoch: u64,
    pub view: &'a FilteredView,
    pub simulation: Option<&'a ForceSimulation>,
    pub controller: &'a InteractionController,
    pub style: &'a GraphStyle,
    pub search_matches: &'a HashSet<usize>,
    pub search_revision: u64,
    pub search_active: bool,
}

impl FrameInput<'_> {
    fn key(&self) -> FrameKey {
        FrameKey {
            epoch: self.epoch,
            simulation_revision: self.simulation.map_or(0, ForceSimulation::revision),
            viewport_revision: self.controller.viewport_revision(),
            tooltip_revision: self.controller.tooltip_revision(),
            search_revision: self.search_revision,
            search_active: self.search_active,
        }
    }
}

/// Turns simulation state and viewport into a drawable frame, reusing the
/// previous frame while nothing it depends on has moved.
#[derive(Debug, Default)]
pub(in crate::app) struct RenderSync {
    frame: Option<Frame>,
    frames_built: u64,
}

impl RenderSync {
    #[cfg(test)]
    pub fn frames_built(&self) -> u64 {
        self.frames_built
    }

    pub fn invalidate(&mut self) {
        self.frame = None;
    }

    pub fn sync(&mut self, input: FrameInput<'_>) -> &Frame {
        let key = input.key();
        if self.frame.as_ref().is_some_and(|frame| frame.key != key) {
            self.frame = None;
        }

        let frames_built = &mut self.frames_built;
        self.frame.get_or_insert_with(|| {
            *frames_built += 1;
            trace!(epoch = key.epoch, frames = *frames_built, "frame rebuilt");
            build_frame(key, &input)
        })
    }
}

fn build_frame(key: FrameKey, input: &FrameInput<'_>) -> Frame {
    let tooltip = input
        .controller
        .tooltip()
        .map(|tooltip| frame_tooltip(tooltip, input.style));

    let content = match input.simulation {
        Some(simulation) if !input.view.is_empty() => graph_content(simulation, input),
        _ => FrameContent::Empty,
    };

    Frame {
        key,
        content,
        tooltip,
    }
}

fn visible_text(
    text: String,
    position: Pos2,
    size: f32,
    color: Color32,
    style: &GraphStyle,
) -> Option<FrameText> {
    (size >= style.min_text_px && !text.is_empty()).then_some(FrameText {
        text,
        position,
        size,
        color,
    })
}

fn graph_content(simulation: &ForceSimulation, input: &FrameInput<'_>) -> FrameContent {
    let style = input.style;
    let viewport = input.controller.viewport();
    let scale = viewport.scale();
    let bodies = simulation.bodies();
    let nodes = input.view.nodes();

    let screen = bodies
        .iter()
        .map(|body| viewport.apply(body.display_position()))
        .collect::<Vec<_>>();
    let radii = nodes
        .iter()
        .map(|node| style.node(node.kind).radius * scale)
        .collect::<Vec<_>>();

    let edges = input
        .view
        .edges()
        .iter()
        .filter_map(|edge| {
            let from = *screen.get(edge.source)?;
            let to = *screen.get(edge.target)?;
            let target_radius = *radii.get(edge.target)?;
            let relation = style.relation(edge.relation.kind);

            let label = visible_text(
                edge.relation.name.clone(),
                from + (to - from) * 0.5,
                style.edge_label_size * scale,
                relation.label.gamma_multiply(style.edge_label_opacity),
                style,
            );

            Some(FrameEdge {
                from,
                to,
                color: relation.stroke.gamma_multiply(style.edge_opacity),
                width: relation.width * scale,
                dashed: relation.dashed,
                arrow: arrowhead(from, to, target_radius, style.arrow_length * scale),
                label,
            })
        })
        .collect();

    let nodes = nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let center = *screen.get(index)?;
            let radius = radii[index];
            let node_style = style.node(node.kind);
            let matched = input.search_matches.contains(&index);
            let dimmed = input.search_active && !matched;

            let mut rings = Vec::new();
            if node.kind == NodeKind::RiskFlag {
                rings.push(FrameRing {
                    radius: style.risk_ring.radius * scale,
                    width: style.risk_ring.width * scale,
                    color: style.risk_ring.color.gamma_multiply(style.risk_ring.opacity),
                });
            }
            if matched {
                rings.push(FrameRing {
                    radius: radius + 4.0 * scale,
                    width: 2.0 * scale,
                    color: style.search_ring,
                });
            }

            let label = visible_text(
                truncate_label(&node.label, style.label_max_chars),
                center + style.node_label_offset * scale,
                style.node_label_size * scale,
                style.node_label_color,
                style,
            );

            Some(FrameNode {
                index,
                center,
                radius,
                fill: if dimmed {
                    node_style.fill.gamma_multiply(0.35)
                } else {
                    node_style.fill
                },
                outline: style.node_outline,
                outline_width: style.node_outline_width * scale,
                rings,
                label,
            })
        })
        .collect();

    FrameContent::Graph { edges, nodes }
}

fn arrowhead(from: Pos2, to: Pos2, target_radius: f32, length: f32) -> Option<[Pos2; 3]> {
    let delta = to - from;
    let distance = delta.length();
    if !distance.is_finite() || distance <= target_radius + length {
        return None;
    }

    let direction = delta / distance;
    let normal = vec2(-direction.y, direction.x);
    let tip = to - direction * target_radius;
    let base = tip - direction * length;
    let half_width: Vec2 = normal * (length * 0.5);
    Some([tip, base + half_width, base - half_width])
}

fn frame_tooltip(tooltip: &Tooltip, style: &GraphStyle) -> FrameTooltip {
    FrameTooltip {
        anchor: tooltip.anchor,
        kind_text: tooltip.type_label.clone(),
        kind_color: style.node(tooltip.kind).fill,
        label: tooltip.label.clone(),
        risk: tooltip.severity.map(|severity| {
            (
                format!("risk: {}", severity.label()),
                style.risk_color(severity),
            )
        }),
    }
}
