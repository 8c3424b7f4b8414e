mod forces;
mod quadtree;

use std::collections::HashMap;
use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};
use tracing::{debug, warn};

use crate::graph::{FilteredView, Node};
use forces::{
    CollisionParams, LinkTerm, ManyBodyParams, accumulate_collisions, apply_centering,
    apply_links, apply_many_body, link_terms,
};
use quadtree::QuadNode;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SimulationConfig {
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    /// Alpha target held while a node is being dragged.
    pub drag_alpha_target: f32,
    pub link_distance: f32,
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    pub theta: f32,
    pub center_strength: f32,
    /// Lower bound for the collision radius; visual radii above it win.
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub collision_iterations: usize,
    pub initial_radius: f32,
    pub tick_rate: f32,
    pub max_ticks_per_frame: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            link_distance: 100.0,
            charge_strength: -200.0,
            charge_distance_min: 1.0,
            theta: 0.9,
            center_strength: 1.0,
            collision_radius: 22.0,
            collision_strength: 1.0,
            collision_iterations: 1,
            initial_radius: 10.0,
            tick_rate: 60.0,
            max_ticks_per_frame: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum SimulationPhase {
    Seeding,
    Heating,
    Settled,
    Stopped,
}

impl SimulationPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Heating => "heating",
            Self::Settled => "settled",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Set by the interaction layer; the integrator forces the body here.
    pub pinned: Option<Vec2>,
}

impl Body {
    /// Where the body should be drawn right now. A fresh pin shows before the
    /// next tick applies it.
    pub fn display_position(&self) -> Vec2 {
        self.pinned.unwrap_or(self.position)
    }
}

fn is_finite(value: Vec2) -> bool {
    value.x.is_finite() && value.y.is_finite()
}

/// Sunflower spiral offset used to seed bodies with no previous position.
fn phyllotaxis(index: usize, initial_radius: f32) -> Vec2 {
    let angle = PI * (3.0 - 5.0_f32.sqrt());
    let radius = initial_radius * (0.5 + index as f32).sqrt();
    let theta = index as f32 * angle;
    vec2(radius * theta.cos(), radius * theta.sin())
}

/// Converts frame time into a whole number of fixed-rate ticks.
#[derive(Debug, Default)]
pub(in crate::app) struct SimulationClock {
    pending: f32,
}

impl SimulationClock {
    pub fn steps(&mut self, delta_seconds: f32, config: &SimulationConfig) -> usize {
        let step = 1.0 / config.tick_rate.max(1.0);
        let ceiling = step * config.max_ticks_per_frame as f32;
        self.pending = (self.pending + delta_seconds.max(0.0)).min(ceiling);

        // tolerate float drift at exact multiples of the step
        let steps = ((self.pending + step * 1e-3) / step).floor() as usize;
        let steps = steps.min(config.max_ticks_per_frame);
        self.pending = (self.pending - steps as f32 * step).max(0.0);
        steps
    }

    pub fn reset(&mut self) {
        self.pending = 0.0;
    }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    predicted: Vec<Vec2>,
    corrections: Vec<Vec2>,
}

/// Force-directed layout for one filtered view. Bodies are indexed like
/// [`FilteredView::nodes`]; a new view means a new simulation.
pub(in crate::app) struct ForceSimulation {
    epoch: u64,
    config: SimulationConfig,
    center: Vec2,
    bodies: Vec<Body>,
    charges: Vec<f32>,
    radii: Vec<f32>,
    max_radius: f32,
    links: Vec<LinkTerm>,
    alpha: f32,
    alpha_target: f32,
    phase: SimulationPhase,
    revision: u64,
    tick_count: u64,
    clock: SimulationClock,
    scratch: PhysicsScratch,
}

impl ForceSimulation {
    /// Seeds a simulation for `view`. Bodies whose id appears in `carry_over`
    /// start where they were; the rest are laid on a spiral around `center`.
    /// Returns `None` for an empty view, which has nothing to simulate.
    pub fn start(
        view: &FilteredView,
        epoch: u64,
        config: SimulationConfig,
        center: Vec2,
        carry_over: &HashMap<String, Vec2>,
        visual_radius: impl Fn(&Node) -> f32,
    ) -> Option<Self> {
        if view.is_empty() {
            return None;
        }

        let mut carried = 0usize;
        let bodies = view
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let position = match carry_over.get(&node.id).copied().filter(|p| is_finite(*p)) {
                    Some(previous) => {
                        carried += 1;
                        previous
                    }
                    None => center + phyllotaxis(index, config.initial_radius),
                };
                Body {
                    position,
                    velocity: Vec2::ZERO,
                    pinned: None,
                }
            })
            .collect::<Vec<_>>();

        let radii = view
            .nodes()
            .iter()
            .map(|node| visual_radius(node).max(config.collision_radius))
            .collect::<Vec<_>>();
        let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);

        let pairs = view
            .edges()
            .iter()
            .map(|edge| (edge.source, edge.target))
            .collect::<Vec<_>>();

        debug!(
            epoch,
            nodes = bodies.len(),
            links = pairs.len(),
            carried,
            "seeded force simulation"
        );

        Some(Self {
            epoch,
            config,
            center,
            charges: vec![config.charge_strength; bodies.len()],
            links: link_terms(&pairs, bodies.len()),
            bodies,
            radii,
            max_radius,
            alpha: 1.0,
            alpha_target: 0.0,
            phase: SimulationPhase::Seeding,
            revision: 0,
            tick_count: 0,
            clock: SimulationClock::default(),
            scratch: PhysicsScratch::default(),
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> SimulationPhase {
        self.phase
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[cfg(test)]
    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    /// Bumped whenever a tick moves bodies or a pin changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    #[cfg(test)]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Moves the centre before the first tick, shifting the seeds with it.
    /// Once ticking has begun the centre is fixed for the epoch.
    pub fn recenter(&mut self, center: Vec2) -> bool {
        if self.phase != SimulationPhase::Seeding || !is_finite(center) || center == self.center {
            return false;
        }

        let shift = center - self.center;
        for body in &mut self.bodies {
            body.position += shift;
        }
        self.center = center;
        self.revision += 1;
        true
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            SimulationPhase::Seeding | SimulationPhase::Heating
        )
    }

    /// Runs as many fixed-rate ticks as `delta_seconds` covers.
    pub fn advance(&mut self, delta_seconds: f32) -> bool {
        if !self.is_running() {
            self.clock.reset();
            return false;
        }

        let steps = self.clock.steps(delta_seconds, &self.config);
        let mut moved = false;
        for _ in 0..steps {
            moved |= self.tick();
        }
        moved
    }

    /// One integration step. Returns `false` once settled or stopped.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        self.phase = SimulationPhase::Heating;
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        // a corrupt body must not feed the shared centroid or its links
        self.recover_non_finite();
        self.apply_forces();
        self.integrate();
        self.recover_non_finite();
        self.revision += 1;
        self.tick_count += 1;

        if self.alpha < self.config.alpha_min {
            self.phase = SimulationPhase::Settled;
            debug!(epoch = self.epoch, ticks = self.tick_count, "simulation settled");
        }
        true
    }

    /// Terminal: no further ticks run and pins are ignored.
    pub fn stop(&mut self) {
        if self.phase != SimulationPhase::Stopped {
            debug!(epoch = self.epoch, ticks = self.tick_count, "simulation stopped");
        }
        self.phase = SimulationPhase::Stopped;
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        if target.is_finite() {
            self.alpha_target = target.clamp(0.0, 1.0);
        }
    }

    /// Resumes ticking after the simulation settled.
    pub fn reheat(&mut self) {
        if self.phase == SimulationPhase::Settled {
            self.phase = SimulationPhase::Heating;
        }
    }

    /// Holds body `index` at `position`. Non-finite targets and unknown
    /// indices are ignored.
    pub fn pin(&mut self, index: usize, position: Vec2) -> bool {
        if self.phase == SimulationPhase::Stopped || !is_finite(position) {
            return false;
        }
        let Some(body) = self.bodies.get_mut(index) else {
            return false;
        };

        body.pinned = Some(position);
        self.revision += 1;
        true
    }

    pub fn unpin(&mut self, index: usize) {
        let released = self
            .bodies
            .get_mut(index)
            .is_some_and(|body| body.pinned.take().is_some());
        if released {
            self.revision += 1;
        }
    }

    /// Topmost body whose disc contains `point`; later bodies draw on top.
    pub fn body_at(&self, point: Vec2, radius_of: impl Fn(usize) -> f32) -> Option<usize> {
        self.bodies
            .iter()
            .enumerate()
            .rev()
            .find(|(index, body)| {
                let radius = radius_of(*index);
                (body.display_position() - point).length_sq() <= radius * radius
            })
            .map(|(index, _)| index)
    }

    fn apply_forces(&mut self) {
        let count = self.bodies.len();
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        for body in &self.bodies {
            scratch.positions.push(body.position);
            scratch.velocities.push(body.velocity);
        }

        apply_links(
            &self.links,
            &scratch.positions,
            &mut scratch.velocities,
            self.config.link_distance,
            self.alpha,
        );

        if let Some(tree) = QuadNode::build(&scratch.positions, &self.charges) {
            apply_many_body(
                &tree,
                &scratch.positions,
                &self.charges,
                ManyBodyParams {
                    theta_sq: self.config.theta * self.config.theta,
                    distance_min_sq: self.config.charge_distance_min
                        * self.config.charge_distance_min,
                    alpha: self.alpha,
                },
                &mut scratch.velocities,
            );
        }

        apply_centering(
            &mut scratch.positions,
            self.center,
            self.config.center_strength,
        );

        let reach = self.max_radius * 2.0;
        for _ in 0..self.config.collision_iterations {
            scratch.predicted.clear();
            for index in 0..count {
                scratch
                    .predicted
                    .push(scratch.positions[index] + scratch.velocities[index]);
            }
            scratch.corrections.clear();
            scratch.corrections.resize(count, Vec2::ZERO);

            let Some(tree) = QuadNode::build(&scratch.predicted, &self.charges) else {
                break;
            };
            accumulate_collisions(
                &tree,
                &tree,
                true,
                &scratch.predicted,
                &self.radii,
                CollisionParams {
                    strength: self.config.collision_strength,
                    reach_sq: reach * reach,
                },
                &mut scratch.corrections,
            );
            for (velocity, correction) in scratch.velocities.iter_mut().zip(&scratch.corrections) {
                *velocity += *correction;
            }
        }

        for (index, body) in self.bodies.iter_mut().enumerate() {
            body.position = scratch.positions[index];
            body.velocity = scratch.velocities[index];
        }
    }

    fn integrate(&mut self) {
        let retain = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            match body.pinned {
                Some(pin) => {
                    body.position = pin;
                    body.velocity = Vec2::ZERO;
                }
                None => {
                    body.velocity *= retain;
                    body.position += body.velocity;
                }
            }
        }
    }

    fn recover_non_finite(&mut self) {
        let mut reseeded = 0usize;
        for (index, body) in self.bodies.iter_mut().enumerate() {
            if is_finite(body.position) && is_finite(body.velocity) {
                continue;
            }
            body.position = body
                .pinned
                .filter(|pin| is_finite(*pin))
                .unwrap_or_else(|| self.center + phyllotaxis(index, self.config.initial_radius));
            body.velocity = Vec2::ZERO;
            reseeded += 1;
        }

        if reseeded > 0 {
            warn!(epoch = self.epoch, reseeded, "reseeded bodies with non-finite state");
        }
    }

    #[cfg(test)]
    fn body_mut(&mut self, index: usize) -> &mut Body {
        &mut self.bodies[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, GraphSnapshot, TypeFilter, filter_by_type};

    const CENTER: Vec2 = vec2(450.0, 270.0);

    fn view(node_count: usize, edges: &[(usize, usize)]) -> FilteredView {
        let nodes = (0..node_count)
            .map(|index| Node::new(index.to_string(), "Clause", format!("clause {index}")))
            .collect();
        let edges = edges
            .iter()
            .map(|(source, target)| Edge::new(source.to_string(), target.to_string(), "RELATED_TO"))
            .collect();
        filter_by_type(&GraphSnapshot::new(nodes, edges), &TypeFilter::All)
    }

    fn start(view: &FilteredView, carry_over: &HashMap<String, Vec2>) -> ForceSimulation {
        ForceSimulation::start(
            view,
            1,
            SimulationConfig::default(),
            CENTER,
            carry_over,
            |_| 7.0,
        )
        .expect("non-empty view")
    }

    fn run_until_settled(simulation: &mut ForceSimulation) {
        for _ in 0..1_000 {
            if !simulation.tick() {
                return;
            }
        }
        panic!("simulation did not settle");
    }

    #[test]
    fn empty_view_has_no_simulation() {
        let empty = view(0, &[]);
        let simulation = ForceSimulation::start(
            &empty,
            1,
            SimulationConfig::default(),
            CENTER,
            &HashMap::new(),
            |_| 7.0,
        );
        assert!(simulation.is_none());
    }

    #[test]
    fn fresh_bodies_spiral_around_center() {
        let simulation = start(&view(5, &[]), &HashMap::new());
        assert_eq!(simulation.phase(), SimulationPhase::Seeding);
        assert_eq!(simulation.alpha(), 1.0);

        let first = simulation.bodies()[0].position;
        assert!(((first - CENTER).length() - 10.0 * 0.5_f32.sqrt()).abs() < 1e-3);
        for pair in simulation.bodies().windows(2) {
            assert!((pair[0].position - pair[1].position).length() > 1.0);
        }
    }

    #[test]
    fn carried_positions_are_reused_by_id() {
        let carry_over = HashMap::from([("1".to_owned(), vec2(12.0, 34.0))]);
        let simulation = start(&view(3, &[]), &carry_over);
        assert_eq!(simulation.bodies()[1].position, vec2(12.0, 34.0));
        assert_ne!(simulation.bodies()[0].position, vec2(12.0, 34.0));
    }

    #[test]
    fn alpha_decays_until_settled() {
        let mut simulation = start(&view(12, &[(0, 1), (1, 2), (2, 3)]), &HashMap::new());
        simulation.tick();
        assert_eq!(simulation.phase(), SimulationPhase::Heating);
        assert!(simulation.alpha() < 1.0);

        run_until_settled(&mut simulation);
        assert_eq!(simulation.phase(), SimulationPhase::Settled);
        assert!(simulation.tick_count() > 250 && simulation.tick_count() < 350);

        let revision = simulation.revision();
        assert!(!simulation.tick());
        assert_eq!(simulation.revision(), revision);
    }

    #[test]
    fn linked_pair_settles_near_link_distance() {
        let mut simulation = start(&view(2, &[(0, 1)]), &HashMap::new());
        run_until_settled(&mut simulation);

        let bodies = simulation.bodies();
        let distance = (bodies[0].position - bodies[1].position).length();
        assert!((80.0..140.0).contains(&distance), "distance {distance}");

        let centroid = (bodies[0].position + bodies[1].position) * 0.5;
        assert!((centroid - CENTER).length() < 1.0);
    }

    #[test]
    fn coincident_seeds_spread_out_and_stay_finite() {
        let carry_over = (0..30)
            .map(|index| (index.to_string(), vec2(100.0, 100.0)))
            .collect::<HashMap<_, _>>();
        let mut simulation = start(&view(30, &[(0, 1), (2, 3)]), &carry_over);
        for _ in 0..60 {
            simulation.tick();
        }

        let bodies = simulation.bodies();
        assert!(bodies.iter().all(|body| is_finite(body.position) && is_finite(body.velocity)));
        assert!((bodies[0].position - bodies[29].position).length() > 1.0);
    }

    #[test]
    fn non_finite_body_is_reseeded() {
        let mut simulation = start(&view(4, &[]), &HashMap::new());
        simulation.body_mut(2).position = vec2(f32::NAN, 3.0);
        simulation.body_mut(3).velocity = vec2(f32::INFINITY, 0.0);
        simulation.tick();

        assert!(
            simulation
                .bodies()
                .iter()
                .all(|body| is_finite(body.position) && is_finite(body.velocity))
        );
    }

    #[test]
    fn non_finite_body_leaves_healthy_bodies_in_place() {
        let carry_over = (0..6)
            .map(|index| (index.to_string(), vec2(150.0 + 150.0 * index as f32, 300.0)))
            .collect::<HashMap<_, _>>();
        let view = view(6, &[(0, 1), (1, 2), (4, 5)]);
        let mut corrupted = start(&view, &carry_over);
        let mut reference = start(&view, &carry_over);
        for _ in 0..5 {
            corrupted.tick();
            reference.tick();
        }

        // the reference body lands exactly where the reseed puts the corrupt one
        corrupted.body_mut(5).position = vec2(f32::NAN, 0.0);
        *reference.body_mut(5) = Body {
            position: CENTER + phyllotaxis(5, SimulationConfig::default().initial_radius),
            velocity: Vec2::ZERO,
            pinned: None,
        };
        corrupted.tick();
        reference.tick();

        let pairs = corrupted.bodies().iter().zip(reference.bodies());
        for (index, (body, expected)) in pairs.enumerate() {
            let drift = (body.position - expected.position).length();
            assert!(drift < 1e-3, "body {index} drifted {drift}");
        }
    }

    #[test]
    fn pinned_body_is_held_and_released() {
        let mut simulation = start(&view(6, &[(0, 1), (1, 2)]), &HashMap::new());
        assert!(simulation.pin(1, vec2(50.0, 50.0)));
        assert_eq!(simulation.bodies()[1].display_position(), vec2(50.0, 50.0));

        for _ in 0..20 {
            simulation.tick();
            assert_eq!(simulation.bodies()[1].position, vec2(50.0, 50.0));
            assert_eq!(simulation.bodies()[1].velocity, Vec2::ZERO);
        }

        simulation.unpin(1);
        assert_eq!(simulation.bodies()[1].pinned, None);
        simulation.tick();
        assert_ne!(simulation.bodies()[1].position, vec2(50.0, 50.0));
    }

    #[test]
    fn pin_rejects_non_finite_targets_and_unknown_indices() {
        let mut simulation = start(&view(2, &[]), &HashMap::new());
        assert!(!simulation.pin(0, vec2(f32::NAN, 1.0)));
        assert!(!simulation.pin(7, vec2(1.0, 1.0)));
        assert_eq!(simulation.bodies()[0].pinned, None);
    }

    #[test]
    fn drag_target_reheats_a_settled_simulation() {
        let mut simulation = start(&view(8, &[(0, 1)]), &HashMap::new());
        run_until_settled(&mut simulation);

        simulation.set_alpha_target(0.3);
        simulation.reheat();
        assert!(simulation.tick());
        let heated = simulation.alpha();
        for _ in 0..30 {
            simulation.tick();
        }
        assert!(simulation.alpha() > heated);
        assert!(simulation.is_running());

        simulation.set_alpha_target(0.0);
        run_until_settled(&mut simulation);
        assert_eq!(simulation.phase(), SimulationPhase::Settled);
    }

    #[test]
    fn stopped_simulation_never_ticks_again() {
        let mut simulation = start(&view(3, &[]), &HashMap::new());
        simulation.stop();
        assert!(!simulation.tick());
        assert!(!simulation.advance(1.0));
        assert!(!simulation.pin(0, vec2(1.0, 1.0)));
        simulation.reheat();
        assert_eq!(simulation.phase(), SimulationPhase::Stopped);
    }

    #[test]
    fn recenter_only_before_first_tick() {
        let mut simulation = start(&view(3, &[]), &HashMap::new());
        let before = simulation.bodies()[0].position;
        assert!(simulation.recenter(CENTER + vec2(100.0, 0.0)));
        assert_eq!(simulation.bodies()[0].position, before + vec2(100.0, 0.0));

        simulation.tick();
        assert!(!simulation.recenter(CENTER));
        assert_eq!(simulation.center(), CENTER + vec2(100.0, 0.0));
    }

    #[test]
    fn clock_caps_catch_up_ticks() {
        let config = SimulationConfig::default();
        let mut clock = SimulationClock::default();
        assert_eq!(clock.steps(1.0, &config), 4);
        assert_eq!(clock.steps(0.5 / 60.0, &config), 0);
        assert_eq!(clock.steps(0.5 / 60.0, &config), 1);
        assert_eq!(clock.steps(f32::NAN, &config), 0);
        assert_eq!(clock.steps(-3.0, &config), 0);
    }

    #[test]
    fn body_at_prefers_topmost() {
        let carry_over = HashMap::from([
            ("0".to_owned(), vec2(10.0, 10.0)),
            ("1".to_owned(), vec2(14.0, 10.0)),
        ]);
        let simulation = start(&view(2, &[]), &carry_over);
        assert_eq!(simulation.body_at(vec2(12.0, 10.0), |_| 7.0), Some(1));
        assert_eq!(simulation.body_at(vec2(300.0, 300.0), |_| 7.0), None);
    }
}
