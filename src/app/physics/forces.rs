use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const JIGGLE: f32 = 1.0e-3;

/// Tiny separation used when two bodies sit on the same point. Antisymmetric
/// in its arguments so each body of the pair is pushed the opposite way.
pub(super) fn jiggle(a: usize, b: usize) -> Vec2 {
    let (low, high, sign) = if a <= b { (a, b, 1.0) } else { (b, a, -1.0) };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin()) * (JIGGLE * sign)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct LinkTerm {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    /// Share of the correction taken by the target.
    pub(super) bias: f32,
}

/// Builds link terms from endpoint pairs; self loops carry no force.
pub(super) fn link_terms(pairs: &[(usize, usize)], node_count: usize) -> Vec<LinkTerm> {
    let pairs = pairs
        .iter()
        .copied()
        .filter(|&(source, target)| source != target && source < node_count && target < node_count)
        .collect::<Vec<_>>();

    let mut degree = vec![0usize; node_count];
    for &(source, target) in &pairs {
        degree[source] += 1;
        degree[target] += 1;
    }

    pairs
        .into_iter()
        .map(|(source, target)| {
            let source_degree = degree[source] as f32;
            let target_degree = degree[target] as f32;
            LinkTerm {
                source,
                target,
                strength: 1.0 / source_degree.min(target_degree),
                bias: source_degree / (source_degree + target_degree),
            }
        })
        .collect()
}

/// Spring toward `distance`, evaluated on positions advanced by the current
/// velocities. Corrections are applied in place, link by link.
pub(super) fn apply_links(
    links: &[LinkTerm],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    distance: f32,
    alpha: f32,
) {
    for link in links {
        let (source, target) = (link.source, link.target);
        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta == Vec2::ZERO {
            delta = jiggle(source, target);
        }

        let length = delta.length();
        let pull = delta * ((length - distance) / length * alpha * link.strength);
        velocities[target] -= pull * link.bias;
        velocities[source] += pull * (1.0 - link.bias);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ManyBodyParams {
    pub(super) theta_sq: f32,
    pub(super) distance_min_sq: f32,
    pub(super) alpha: f32,
}

pub(super) fn apply_many_body(
    tree: &QuadNode,
    positions: &[Vec2],
    charges: &[f32],
    params: ManyBodyParams,
    velocities: &mut [Vec2],
) {
    for (index, velocity) in velocities.iter_mut().enumerate() {
        accumulate_charge(tree, index, positions, charges, params, velocity);
    }
}

fn softened(distance_sq: f32, distance_min_sq: f32) -> f32 {
    if distance_sq < distance_min_sq {
        (distance_min_sq * distance_sq).sqrt()
    } else {
        distance_sq
    }
}

fn accumulate_charge(
    cell: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    params: ManyBodyParams,
    velocity: &mut Vec2,
) {
    if cell.charge == 0.0 {
        return;
    }

    let point = positions[index];

    if cell.is_leaf() {
        for &other in &cell.indices {
            if other == index {
                continue;
            }

            let mut delta = positions[other] - point;
            if delta == Vec2::ZERO {
                delta = jiggle(index, other);
            }
            let distance_sq = softened(delta.length_sq(), params.distance_min_sq);
            *velocity += delta * (charges[other] * params.alpha / distance_sq);
        }
        return;
    }

    let delta = cell.center_of_charge - point;
    let distance_sq = delta.length_sq();
    let width = cell.bounds.width();
    if !cell.bounds.contains(point) && width * width / params.theta_sq < distance_sq {
        let distance_sq = softened(distance_sq, params.distance_min_sq);
        *velocity += delta * (cell.charge * params.alpha / distance_sq);
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, positions, charges, params, velocity);
    }
}

/// Translates every position so the centroid moves toward `center`.
pub(super) fn apply_centering(positions: &mut [Vec2], center: Vec2, strength: f32) {
    if positions.is_empty() {
        return;
    }

    let mut sum = Vec2::ZERO;
    for position in positions.iter() {
        sum += *position;
    }
    let shift = (sum / positions.len() as f32 - center) * strength;
    for position in positions.iter_mut() {
        *position -= shift;
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    /// Squared largest possible contact distance; cells further apart are skipped.
    pub(super) reach_sq: f32,
}

/// Soft circle separation over predicted positions. Each overlapping pair is
/// visited once; the push is split by squared radius so small nodes move more.
pub(super) fn accumulate_collisions(
    cell_a: &QuadNode,
    cell_b: &QuadNode,
    same_cell: bool,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    corrections: &mut [Vec2],
) {
    if cell_a.bounds.gap_sq(cell_b.bounds) > params.reach_sq {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        if same_cell {
            for (offset, &from) in cell_a.indices.iter().enumerate() {
                for &to in &cell_a.indices[offset + 1..] {
                    separate_pair(from, to, predicted, radii, params.strength, corrections);
                }
            }
        } else {
            for &from in &cell_a.indices {
                for &to in &cell_b.indices {
                    separate_pair(from, to, predicted, radii, params.strength, corrections);
                }
            }
        }
        return;
    }

    if same_cell {
        let children = cell_a.children().collect::<Vec<_>>();
        for (position, child_a) in children.iter().enumerate() {
            accumulate_collisions(child_a, child_a, true, predicted, radii, params, corrections);
            for child_b in &children[position + 1..] {
                accumulate_collisions(
                    child_a,
                    child_b,
                    false,
                    predicted,
                    radii,
                    params,
                    corrections,
                );
            }
        }
        return;
    }

    let split_a = if cell_a.is_leaf() {
        false
    } else if cell_b.is_leaf() {
        true
    } else {
        cell_a.bounds.half_extent >= cell_b.bounds.half_extent
    };

    if split_a {
        for child in cell_a.children() {
            accumulate_collisions(child, cell_b, false, predicted, radii, params, corrections);
        }
    } else {
        for child in cell_b.children() {
            accumulate_collisions(cell_a, child, false, predicted, radii, params, corrections);
        }
    }
}

fn separate_pair(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    corrections: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    let mut delta = predicted[from] - predicted[to];
    if delta.length_sq() >= reach * reach {
        return;
    }
    if delta == Vec2::ZERO {
        delta = jiggle(from, to);
    }

    let length = delta.length();
    let push = delta * ((reach - length) / length * strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = to_sq / (from_sq + to_sq);
    corrections[from] += push * share;
    corrections[to] -= push * (1.0 - share);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scattered(count: usize) -> Vec<Vec2> {
        let mut state = 0x2545_f491_u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 10_000) as f32 / 10.0
        };
        (0..count).map(|_| vec2(next(), next())).collect()
    }

    fn charge_velocities(positions: &[Vec2], theta: f32) -> Vec<Vec2> {
        let charges = vec![-200.0; positions.len()];
        let tree = QuadNode::build(positions, &charges).expect("finite positions");
        let mut velocities = vec![Vec2::ZERO; positions.len()];
        apply_many_body(
            &tree,
            positions,
            &charges,
            ManyBodyParams {
                theta_sq: theta * theta,
                distance_min_sq: 1.0,
                alpha: 1.0,
            },
            &mut velocities,
        );
        velocities
    }

    #[test]
    fn jiggle_is_antisymmetric_and_non_zero() {
        let forward = jiggle(3, 8);
        let backward = jiggle(8, 3);
        assert!(forward.length() > 0.0);
        assert!((forward + backward).length() < 1e-9);
    }

    #[test]
    fn link_terms_skip_self_loops_and_weight_by_degree() {
        let links = link_terms(&[(0, 1), (0, 2), (1, 1), (0, 9)], 3);
        assert_eq!(links.len(), 2);
        // node 0 has degree 2, nodes 1 and 2 degree 1
        assert_eq!(links[0].strength, 1.0);
        assert!((links[0].bias - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn stretched_link_pulls_endpoints_together() {
        let links = link_terms(&[(0, 1)], 2);
        let positions = [vec2(0.0, 0.0), vec2(300.0, 0.0)];
        let mut velocities = [Vec2::ZERO; 2];
        apply_links(&links, &positions, &mut velocities, 100.0, 1.0);

        assert!(velocities[0].x > 0.0);
        assert!(velocities[1].x < 0.0);
        assert!((velocities[0].x + velocities[1].x).abs() < 1e-3);
    }

    #[test]
    fn negative_charge_repels() {
        let velocities = charge_velocities(&[vec2(0.0, 0.0), vec2(10.0, 0.0)], 0.9);
        assert!(velocities[0].x < 0.0);
        assert!(velocities[1].x > 0.0);
    }

    #[test]
    fn barnes_hut_tracks_exact_summation() {
        let positions = scattered(300);
        let approximate = charge_velocities(&positions, 0.9);
        let exact = charge_velocities(&positions, 0.0);

        let error = approximate
            .iter()
            .zip(&exact)
            .map(|(a, b)| (*a - *b).length())
            .sum::<f32>();
        let magnitude = exact.iter().map(|v| v.length()).sum::<f32>();
        assert!(error / magnitude < 0.2, "relative error {}", error / magnitude);
    }

    #[test]
    fn coincident_bodies_get_finite_opposite_kicks() {
        let velocities = charge_velocities(&[vec2(4.0, 4.0), vec2(4.0, 4.0)], 0.9);
        assert!(velocities.iter().all(|v| v.x.is_finite() && v.y.is_finite()));
        assert!((velocities[0] + velocities[1]).length() < 1e-3);
        assert!(velocities[0].length() > 1.0);
    }

    #[test]
    fn centering_moves_centroid_onto_target() {
        let mut positions = [vec2(0.0, 0.0), vec2(10.0, 20.0)];
        apply_centering(&mut positions, vec2(100.0, 100.0), 1.0);

        let centroid = (positions[0] + positions[1]) * 0.5;
        assert!((centroid - vec2(100.0, 100.0)).length() < 1e-4);
        assert!((positions[1] - positions[0] - vec2(10.0, 20.0)).length() < 1e-4);
    }

    #[test]
    fn overlapping_circles_are_pushed_apart() {
        let predicted = vec![vec2(0.0, 0.0), vec2(5.0, 0.0), vec2(500.0, 500.0)];
        let radii = [22.0, 22.0, 22.0];
        let charges = [1.0; 3];
        let tree = QuadNode::build(&predicted, &charges).expect("finite positions");
        let mut corrections = vec![Vec2::ZERO; 3];
        accumulate_collisions(
            &tree,
            &tree,
            true,
            &predicted,
            &radii,
            CollisionParams {
                strength: 1.0,
                reach_sq: 44.0 * 44.0,
            },
            &mut corrections,
        );

        assert!(corrections[0].x < 0.0);
        assert!(corrections[1].x > 0.0);
        assert_eq!(corrections[2], Vec2::ZERO);
        // equal radii split the overlap evenly: (44 - 5) / 2 each
        assert!((corrections[1].x - 19.5).abs() < 1e-3);
    }

    #[test]
    fn collision_pairs_match_brute_force_on_dense_cloud() {
        let predicted = scattered(120)
            .into_iter()
            .map(|point| point * 0.2)
            .collect::<Vec<_>>();
        let radii = vec![22.0; predicted.len()];
        let charges = vec![1.0; predicted.len()];
        let tree = QuadNode::build(&predicted, &charges).expect("finite positions");

        let mut via_tree = vec![Vec2::ZERO; predicted.len()];
        accumulate_collisions(
            &tree,
            &tree,
            true,
            &predicted,
            &radii,
            CollisionParams {
                strength: 1.0,
                reach_sq: 44.0 * 44.0,
            },
            &mut via_tree,
        );

        let mut brute = vec![Vec2::ZERO; predicted.len()];
        for from in 0..predicted.len() {
            for to in from + 1..predicted.len() {
                separate_pair(from, to, &predicted, &radii, 1.0, &mut brute);
            }
        }

        for (a, b) in via_tree.iter().zip(&brute) {
            assert!((*a - *b).length() < 1e-2);
        }
    }
}
