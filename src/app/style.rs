use std::ops::RangeInclusive;

use eframe::egui::{Color32, Vec2, vec2};

use crate::graph::{NodeKind, RelationKind, Severity};

use super::physics::SimulationConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct NodeStyle {
    pub fill: Color32,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct RelationStyle {
    pub stroke: Color32,
    pub label: Color32,
    pub width: f32,
    pub dashed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct RingStyle {
    pub radius: f32,
    pub color: Color32,
    pub width: f32,
    pub opacity: f32,
}

/// Finite lookup table with an explicit fallback for keys it does not list.
#[derive(Clone, Debug)]
pub(in crate::app) struct Palette<K, V> {
    entries: Vec<(K, V)>,
    fallback: V,
}

impl<K: PartialEq + Copy, V> Palette<K, V> {
    pub fn new(entries: Vec<(K, V)>, fallback: V) -> Self {
        Self { entries, fallback }
    }

    pub fn get(&self, key: K) -> &V {
        self.entries
            .iter()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, value)| value)
            .unwrap_or(&self.fallback)
    }

    pub fn entries(&self) -> impl Iterator<Item = &(K, V)> {
        self.entries.iter()
    }
}

#[derive(Clone, Debug)]
pub(in crate::app) struct GraphStyle {
    pub nodes: Palette<NodeKind, NodeStyle>,
    pub relations: Palette<RelationKind, RelationStyle>,
    pub node_outline: Color32,
    pub node_outline_width: f32,
    pub risk_ring: RingStyle,
    pub search_ring: Color32,
    pub edge_opacity: f32,
    pub edge_label_opacity: f32,
    pub edge_label_size: f32,
    pub arrow_length: f32,
    pub node_label_color: Color32,
    pub node_label_size: f32,
    pub node_label_offset: Vec2,
    pub label_max_chars: usize,
    /// Text smaller than this on screen is not drawn.
    pub min_text_px: f32,
    pub tooltip_offset: Vec2,
    pub risk_high: Color32,
    pub risk_other: Color32,
    pub canvas_fill: Color32,
    pub canvas_border: Color32,
    pub muted_text: Color32,
}

impl GraphStyle {
    pub fn node(&self, kind: NodeKind) -> NodeStyle {
        *self.nodes.get(kind)
    }

    pub fn relation(&self, kind: RelationKind) -> RelationStyle {
        *self.relations.get(kind)
    }

    pub fn risk_color(&self, severity: Severity) -> Color32 {
        match severity {
            Severity::High => self.risk_high,
            Severity::Low | Severity::Medium => self.risk_other,
        }
    }
}

const CONTRACT: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);
const PARTY: Color32 = Color32::from_rgb(0x02, 0x84, 0xc7);
const CLAUSE: Color32 = Color32::from_rgb(0x7c, 0x3a, 0xed);
const JURISDICTION: Color32 = Color32::from_rgb(0x05, 0x96, 0x69);
const RISK_FLAG: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
const OBLIGATION: Color32 = Color32::from_rgb(0x64, 0x74, 0x8b);

impl Default for GraphStyle {
    fn default() -> Self {
        let node = |fill, radius| NodeStyle { fill, radius };
        let relation = |color, width, dashed| RelationStyle {
            stroke: color,
            label: color,
            width,
            dashed,
        };

        Self {
            nodes: Palette::new(
                vec![
                    (NodeKind::Contract, node(CONTRACT, 12.0)),
                    (NodeKind::Party, node(PARTY, 9.0)),
                    (NodeKind::Clause, node(CLAUSE, 7.0)),
                    (NodeKind::Jurisdiction, node(JURISDICTION, 7.0)),
                    (NodeKind::RiskFlag, node(RISK_FLAG, 7.0)),
                    (NodeKind::Obligation, node(OBLIGATION, 7.0)),
                ],
                node(Color32::from_rgb(0x47, 0x55, 0x69), 7.0),
            ),
            relations: Palette::new(
                vec![
                    (RelationKind::HasParty, relation(PARTY, 1.2, false)),
                    (RelationKind::PartyTo, relation(PARTY, 1.2, false)),
                    (RelationKind::Contains, relation(CLAUSE, 1.2, false)),
                    (RelationKind::GovernedBy, relation(JURISDICTION, 1.2, false)),
                    (RelationKind::ConflictsWith, relation(RISK_FLAG, 2.5, true)),
                    (RelationKind::RelatedTo, relation(CONTRACT, 1.2, false)),
                    (RelationKind::HasRisk, relation(RISK_FLAG, 1.2, false)),
                    (RelationKind::Imposes, relation(OBLIGATION, 1.2, false)),
                ],
                RelationStyle {
                    stroke: Color32::from_rgb(0x1e, 0x24, 0x33),
                    label: Color32::from_rgb(0x33, 0x41, 0x55),
                    width: 1.2,
                    dashed: false,
                },
            ),
            node_outline: Color32::from_rgb(0x08, 0x0b, 0x12),
            node_outline_width: 2.0,
            risk_ring: RingStyle {
                radius: 11.0,
                color: RISK_FLAG,
                width: 1.5,
                opacity: 0.4,
            },
            search_ring: Color32::from_rgb(103, 196, 255),
            edge_opacity: 0.6,
            edge_label_opacity: 0.7,
            edge_label_size: 7.0,
            arrow_length: 6.0,
            node_label_color: OBLIGATION,
            node_label_size: 9.0,
            node_label_offset: vec2(14.0, 4.0),
            label_max_chars: 22,
            min_text_px: 4.0,
            tooltip_offset: vec2(12.0, -8.0),
            risk_high: RISK_FLAG,
            risk_other: CONTRACT,
            canvas_fill: Color32::from_rgb(0x0d, 0x11, 0x17),
            canvas_border: Color32::from_rgb(0x1e, 0x24, 0x33),
            muted_text: Color32::from_rgb(0x47, 0x55, 0x69),
        }
    }
}

/// Everything the view needs that would otherwise be a module-level constant.
#[derive(Clone, Debug)]
pub(in crate::app) struct GraphConfig {
    pub style: GraphStyle,
    pub simulation: SimulationConfig,
    pub zoom_extent: RangeInclusive<f32>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            style: GraphStyle::default(),
            simulation: SimulationConfig::default(),
            zoom_extent: 0.2..=4.0,
        }
    }
}
