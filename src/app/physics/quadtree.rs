use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 12;
const MAX_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn around(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    pub(super) fn width(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two cells; zero when they touch or overlap.
    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        dx * dx + dy * dy
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };
        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        match (point.x >= self.center.x, point.y >= self.center.y) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }
}

/// Region quadtree over body positions. Every cell carries the summed charge
/// of the bodies below it and their charge-weighted centre, which is what the
/// many-body pass needs to treat a far cell as one body.
pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    pub(super) center_of_charge: Vec2,
    pub(super) charge: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    /// Returns `None` when any point is non-finite.
    pub(super) fn build(points: &[Vec2], charges: &[f32]) -> Option<Self> {
        let bounds = QuadBounds::around(points)?;
        let indices = (0..points.len()).collect::<Vec<_>>();
        Some(Self::build_cell(bounds, indices, points, charges, 0))
    }

    /// Builds the cell for `indices` inside `bounds`, splitting it into
    /// quadrants until a cell holds at most `LEAF_CAPACITY` bodies or
    /// `MAX_DEPTH` is reached. Only leaves keep their body indices.
    fn build_cell(
        bounds: QuadBounds,
        indices: Vec<usize>,
        points: &[Vec2],
        charges: &[f32],
        depth: usize,
    ) -> Self {
        let (charge, center_of_charge) =
            aggregate_charge(&indices, points, charges).unwrap_or((0.0, bounds.center));

        let mut cell = Self {
            bounds,
            center_of_charge,
            charge,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.indices.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &cell.indices {
            buckets[bounds.quadrant_for(points[index])].push(index);
        }

        // Coincident points never separate; keep them in one leaf.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            cell.children[quadrant] = Some(Box::new(Self::build_cell(
                bounds.child(quadrant),
                bucket,
                points,
                charges,
                depth + 1,
            )));
        }
        cell.indices.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

/// Summed charge of `indices` and their centre weighted by charge magnitude,
/// so a cell of mixed signs still sits among its bodies. `None` when every
/// charge is zero.
fn aggregate_charge(indices: &[usize], points: &[Vec2], charges: &[f32]) -> Option<(f32, Vec2)> {
    let mut charge = 0.0;
    let mut weight = 0.0;
    let mut weighted = Vec2::ZERO;
    for &index in indices {
        let value = charges.get(index).copied().unwrap_or(0.0);
        charge += value;
        weight += value.abs();
        weighted += points[index] * value.abs();
    }
    (weight > 0.0).then(|| (charge, weighted / weight))
}
