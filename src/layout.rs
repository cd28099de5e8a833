//! Graph layout of connected rectangles
//!
//! Nodes are rectangles connected by edges. Each connected component is laid out
//! by stress majorization (SMACOF) with graph distances as targets, directed edges
//! add separation constraints along y-axis, overlapping rectangles are pushed apart
//! and components are finally separated from each other. The result is a translation
//! of each node.
use crate::{BBox, Point, Scalar};
use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

/// Maximum number of sweeps of the overlap removal and constraint projection
const MAX_SWEEPS: usize = 100;

/// Overlap smaller than this is ignored
const OVERLAP_TOLERANCE: Scalar = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutEdge {
    pub source: usize,
    pub target: usize,
    /// Target is placed below the source
    pub directed: bool,
}

impl LayoutEdge {
    pub fn new(source: usize, target: usize) -> Self {
        Self {
            source,
            target,
            directed: false,
        }
    }

    pub fn directed(source: usize, target: usize) -> Self {
        Self {
            source,
            target,
            directed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutOptions {
    /// Desired length of a single edge
    pub ideal_edge_length: Scalar,
    /// Margin added around every rectangle
    pub spacing: Scalar,
    /// Respect `directed` flag of the edges
    pub directed: bool,
    pub avoid_overlaps: bool,
    /// Relative stress change at which iterations stop
    pub tolerance: Scalar,
    pub max_iterations: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            ideal_edge_length: 100.0,
            spacing: 0.0,
            directed: false,
            avoid_overlaps: false,
            tolerance: 1e-4,
            max_iterations: 100,
        }
    }
}

/// Connected components of the graph, each sorted by node index
pub fn connected_components(count: usize, edges: &[LayoutEdge]) -> Vec<Vec<usize>> {
    let adjacency = adjacency(count, edges);
    let mut component_of = vec![usize::MAX; count];
    let mut components = Vec::new();
    for root in 0..count {
        if component_of[root] != usize::MAX {
            continue;
        }
        let index = components.len();
        let mut component = vec![root];
        component_of[root] = index;
        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            for &next in &adjacency[node] {
                if component_of[next] == usize::MAX {
                    component_of[next] = index;
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

fn adjacency(count: usize, edges: &[LayoutEdge]) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); count];
    for edge in edges {
        if edge.source >= count || edge.target >= count || edge.source == edge.target {
            continue;
        }
        adjacency[edge.source].push(edge.target);
        adjacency[edge.target].push(edge.source);
    }
    adjacency
}

/// Hop distances from `source` within the graph
fn hop_distances(adjacency: &[Vec<usize>], source: usize) -> Vec<Option<usize>> {
    let mut distances = vec![None; adjacency.len()];
    distances[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(node) = queue.pop_front() {
        let distance = distances[node].unwrap_or(0);
        for &next in &adjacency[node] {
            if distances[next].is_none() {
                distances[next] = Some(distance + 1);
                queue.push_back(next);
            }
        }
    }
    distances
}

/// Translation for each rectangle so that no two of them overlap
///
/// Overlaps are resolved along the axis with smaller penetration, x-axis first,
/// both rectangles of a pair move by half of the overlap.
pub fn remove_overlaps(rects: &[BBox]) -> Vec<Point> {
    let mut centers: Vec<Point> = rects.iter().map(BBox::mid).collect();
    let sizes: Vec<Point> = rects
        .iter()
        .map(|rect| Point::new(rect.width(), rect.height()))
        .collect();
    for horizontal in [true, false] {
        for _ in 0..MAX_SWEEPS {
            let mut moved = false;
            for i in 0..centers.len() {
                for j in i + 1..centers.len() {
                    let half = 0.5 * (sizes[i] + sizes[j]);
                    let diff = centers[j] - centers[i];
                    let overlap_x = half.x() - diff.x().abs();
                    let overlap_y = half.y() - diff.y().abs();
                    if overlap_x <= OVERLAP_TOLERANCE || overlap_y <= OVERLAP_TOLERANCE {
                        continue;
                    }
                    // x pass only takes overlaps which are cheaper to resolve horizontally
                    if horizontal && overlap_x > overlap_y {
                        continue;
                    }
                    let shift = if horizontal {
                        let sign = if diff.x() < 0.0 { -1.0 } else { 1.0 };
                        Point::new(sign * overlap_x / 2.0, 0.0)
                    } else {
                        let sign = if diff.y() < 0.0 { -1.0 } else { 1.0 };
                        Point::new(0.0, sign * overlap_y / 2.0)
                    };
                    centers[i] = centers[i] - shift;
                    centers[j] = centers[j] + shift;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
    }
    centers
        .iter()
        .zip(rects)
        .map(|(center, rect)| *center - rect.mid())
        .collect()
}

/// Enforce `y[target] >= y[source] + gap` by repeated projection
fn project_directed(ys: &mut [Scalar], constraints: &[(usize, usize)], gap: Scalar) {
    for _ in 0..MAX_SWEEPS {
        let mut violation: Scalar = 0.0;
        for &(source, target) in constraints {
            let deficit = ys[source] + gap - ys[target];
            if deficit > 0.0 {
                ys[source] -= deficit / 2.0;
                ys[target] += deficit / 2.0;
                violation = violation.max(deficit);
            }
        }
        if violation < OVERLAP_TOLERANCE {
            break;
        }
    }
}

/// Stress majorization of a single component, `positions` are updated in place
fn smacof(
    positions: &mut [Point],
    adjacency: &[Vec<usize>],
    directed: &[(usize, usize)],
    options: &LayoutOptions,
) {
    let count = positions.len();
    let ideal = options.ideal_edge_length;

    // targets and weights
    let mut distance = DMatrix::<Scalar>::zeros(count, count);
    let mut weight = DMatrix::<Scalar>::zeros(count, count);
    for i in 0..count {
        for (j, hops) in hop_distances(adjacency, i).into_iter().enumerate() {
            if let Some(hops) = hops.filter(|hops| *hops > 0) {
                let d = hops as Scalar * ideal;
                distance[(i, j)] = d;
                weight[(i, j)] = 1.0 / (d * d);
            }
        }
    }

    // weighted laplacian with a rank one term fixing the centroid
    let mut laplacian = DMatrix::<Scalar>::from_element(count, count, 1.0 / count as Scalar);
    for i in 0..count {
        for j in 0..count {
            if i != j {
                laplacian[(i, j)] -= weight[(i, j)];
                laplacian[(i, i)] += weight[(i, j)];
            }
        }
    }
    let Some(solver) = laplacian.cholesky() else {
        tracing::debug!("[layout] singular laplacian");
        return;
    };

    let stress = |xs: &DVector<Scalar>, ys: &DVector<Scalar>| -> Scalar {
        let mut stress = 0.0;
        for i in 0..count {
            for j in i + 1..count {
                let length = Point::new(xs[i] - xs[j], ys[i] - ys[j]).length();
                let error = length - distance[(i, j)];
                stress += weight[(i, j)] * error * error;
            }
        }
        stress
    };

    let centroid = positions.iter().fold(Point::new(0.0, 0.0), |acc, p| acc + *p)
        / count as Scalar;
    let mut xs = DVector::from_fn(count, |i, _| positions[i].x() - centroid.x());
    let mut ys = DVector::from_fn(count, |i, _| positions[i].y() - centroid.y());
    let mut current = stress(&xs, &ys);
    for iteration in 0..options.max_iterations {
        let mut b = DMatrix::<Scalar>::zeros(count, count);
        for i in 0..count {
            for j in 0..count {
                if i == j {
                    continue;
                }
                let length = Point::new(xs[i] - xs[j], ys[i] - ys[j]).length();
                if length > OVERLAP_TOLERANCE {
                    let value = weight[(i, j)] * distance[(i, j)] / length;
                    b[(i, j)] -= value;
                    b[(i, i)] += value;
                }
            }
        }
        xs = solver.solve(&(&b * &xs));
        ys = solver.solve(&(&b * &ys));
        if !directed.is_empty() {
            project_directed(ys.as_mut_slice(), directed, ideal);
        }
        let next = stress(&xs, &ys);
        let converged = current <= 0.0 || (current - next).abs() / current < options.tolerance;
        current = next;
        if converged {
            tracing::debug!("[layout] converged after {} iterations", iteration + 1);
            break;
        }
    }

    for (i, position) in positions.iter_mut().enumerate() {
        *position = Point::new(xs[i] + centroid.x(), ys[i] + centroid.y());
    }
}

/// Lay out graph of rectangles, returns translation of each rectangle
pub fn graph_layout(rects: &[BBox], edges: &[LayoutEdge], options: &LayoutOptions) -> Vec<Point> {
    tracing::debug_span!("[layout]", nodes = rects.len(), edges = edges.len()).in_scope(|| {
        let rects: Vec<BBox> = rects.iter().map(|rect| rect.inflate(options.spacing)).collect();
        let mut centers: Vec<Point> = rects.iter().map(BBox::mid).collect();
        let components = connected_components(rects.len(), edges);

        for component in &components {
            let local: Vec<Option<usize>> = {
                let mut local = vec![None; rects.len()];
                for (index, node) in component.iter().enumerate() {
                    local[*node] = Some(index);
                }
                local
            };
            let component_edges: Vec<LayoutEdge> = edges
                .iter()
                .filter_map(|edge| {
                    Some(LayoutEdge {
                        source: local.get(edge.source).copied().flatten()?,
                        target: local.get(edge.target).copied().flatten()?,
                        directed: edge.directed && options.directed,
                    })
                })
                .filter(|edge| edge.source != edge.target)
                .collect();
            if component_edges.len() < 2 {
                continue;
            }
            let adjacency = adjacency(component.len(), &component_edges);
            let directed: Vec<(usize, usize)> = component_edges
                .iter()
                .filter(|edge| edge.directed)
                .map(|edge| (edge.source, edge.target))
                .collect();
            let mut positions: Vec<Point> = component.iter().map(|node| centers[*node]).collect();
            smacof(&mut positions, &adjacency, &directed, options);
            if options.avoid_overlaps {
                let boxes: Vec<BBox> = component
                    .iter()
                    .zip(&positions)
                    .map(|(node, position)| rects[*node].translate(*position - rects[*node].mid()))
                    .collect();
                for (position, shift) in positions.iter_mut().zip(remove_overlaps(&boxes)) {
                    *position = *position + shift;
                }
            }
            for (node, position) in component.iter().zip(positions) {
                centers[*node] = position;
            }
        }

        // separate components by their bounding boxes
        if components.len() > 1 {
            let boxes: Vec<BBox> = components
                .iter()
                .filter_map(|component| {
                    component
                        .iter()
                        .map(|node| rects[*node].translate(centers[*node] - rects[*node].mid()))
                        .reduce(|acc, rect| acc.union(rect))
                })
                .collect();
            for (component, shift) in components.iter().zip(remove_overlaps(&boxes)) {
                for node in component {
                    centers[*node] = centers[*node] + shift;
                }
            }
        }

        centers
            .iter()
            .zip(&rects)
            .map(|(center, rect)| *center - rect.mid())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    fn rect(x: Scalar, y: Scalar, size: Scalar) -> BBox {
        BBox::new((x, y), (x + size, y + size))
    }

    fn overlaps(a: BBox, b: BBox) -> bool {
        a.intersect(b)
            .is_some_and(|rect| rect.width() > 1e-6 && rect.height() > 1e-6)
    }

    #[test]
    fn test_components() {
        let edges = [LayoutEdge::new(0, 1), LayoutEdge::new(2, 1), LayoutEdge::new(3, 4)];
        let components = connected_components(6, &edges);
        assert_eq!(components, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn test_remove_overlaps() {
        let rects = [rect(0.0, 0.0, 10.0), rect(4.0, 1.0, 10.0), rect(50.0, 50.0, 10.0)];
        let shifts = remove_overlaps(&rects);
        let moved: Vec<BBox> = rects
            .iter()
            .zip(&shifts)
            .map(|(rect, shift)| rect.translate(*shift))
            .collect();
        assert!(!overlaps(moved[0], moved[1]));
        // separated horizontally with equal moves
        assert_approx_eq!(shifts[0].x(), -3.0, 1e-9);
        assert_approx_eq!(shifts[1].x(), 3.0, 1e-9);
        assert_approx_eq!(shifts[0].y(), 0.0, 1e-9);
        assert_eq!(shifts[2], Point::new(0.0, 0.0));
    }

    #[test]
    fn test_path_graph() {
        let rects = [rect(0.0, 0.0, 10.0), rect(10.0, 5.0, 10.0), rect(20.0, -3.0, 10.0)];
        let edges = [LayoutEdge::new(0, 1), LayoutEdge::new(1, 2)];
        let options = LayoutOptions {
            max_iterations: 500,
            tolerance: 1e-9,
            ..LayoutOptions::default()
        };
        let shifts = graph_layout(&rects, &edges, &options);
        let centers: Vec<Point> = rects
            .iter()
            .zip(&shifts)
            .map(|(rect, shift)| rect.mid() + *shift)
            .collect();
        assert_approx_eq!(centers[0].dist(centers[1]), 100.0, 1.0);
        assert_approx_eq!(centers[1].dist(centers[2]), 100.0, 1.0);
        assert_approx_eq!(centers[0].dist(centers[2]), 200.0, 2.0);
    }

    #[test]
    fn test_directed() {
        let rects = [rect(0.0, 0.0, 10.0), rect(30.0, 0.0, 10.0), rect(60.0, 0.0, 10.0)];
        let edges = [LayoutEdge::directed(0, 1), LayoutEdge::directed(1, 2)];
        let options = LayoutOptions {
            directed: true,
            ..LayoutOptions::default()
        };
        let shifts = graph_layout(&rects, &edges, &options);
        let ys: Vec<Scalar> = rects
            .iter()
            .zip(&shifts)
            .map(|(rect, shift)| rect.mid().y() + shift.y())
            .collect();
        assert!(ys[1] >= ys[0] + 100.0 - 1e-6, "{:?}", ys);
        assert!(ys[2] >= ys[1] + 100.0 - 1e-6, "{:?}", ys);
    }

    #[test]
    fn test_isolated_and_separated() {
        // single edge components are not laid out, only separated
        let rects = [rect(0.0, 0.0, 10.0), rect(5.0, 0.0, 10.0), rect(500.0, 500.0, 10.0)];
        let shifts = graph_layout(&rects, &[], &LayoutOptions::default());
        assert_eq!(shifts[2], Point::new(0.0, 0.0));
        let a = rects[0].translate(shifts[0]);
        let b = rects[1].translate(shifts[1]);
        assert!(!overlaps(a, b));
    }

    #[test]
    fn test_avoid_overlaps() {
        let rects = [
            rect(0.0, 0.0, 80.0),
            rect(1.0, 1.0, 80.0),
            rect(2.0, 2.0, 80.0),
            rect(3.0, 0.0, 80.0),
        ];
        let edges = [LayoutEdge::new(0, 1), LayoutEdge::new(1, 2), LayoutEdge::new(2, 3)];
        let options = LayoutOptions {
            avoid_overlaps: true,
            spacing: 5.0,
            ..LayoutOptions::default()
        };
        let shifts = graph_layout(&rects, &edges, &options);
        let moved: Vec<BBox> = rects
            .iter()
            .zip(&shifts)
            .map(|(rect, shift)| rect.translate(*shift))
            .collect();
        for i in 0..moved.len() {
            for j in i + 1..moved.len() {
                assert!(!overlaps(moved[i], moved[j]), "{} {}", i, j);
            }
        }
    }
}
