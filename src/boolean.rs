//! Boolean operations on filled regions
//!
//! All contours are split at mutual crossings, each piece is classified by testing
//! the resulting region on both of its sides. Pieces separating filled and empty
//! space are kept, oriented so the filled region is on the left (counter-clockwise
//! outer contours when y-axis points up), and chained into closed contours.
use crate::{
    Curve, EPSILON, FillRule, Path, Point, Scalar, Segment, SubPath, intersect::INTERSECT_TOLERANCE,
};

/// Distance at which pieces are considered to be connected
const CHAIN_TOLERANCE: Scalar = 1e-6;

/// Boolean operation on two regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
    /// Covered by exactly one of the regions
    Exclusion,
}

impl BooleanOp {
    fn eval(self, a: bool, b: bool) -> bool {
        match self {
            BooleanOp::Union => a || b,
            BooleanOp::Difference => a && !b,
            BooleanOp::Intersection => a && b,
            BooleanOp::Exclusion => a != b,
        }
    }
}

/// Normalize region into non-overlapping closed contours according to the fill rule
///
/// Open sub-paths are treated as closed with a straight line.
pub fn flatten(path: &Path, fill_rule: FillRule) -> Path {
    tracing::debug_span!("[boolean:flatten]")
        .in_scope(|| regions(&[path], |point| path.contains(point, fill_rule)))
}

/// Union of two regions, both filled with the non-zero rule
pub fn union(a: &Path, b: &Path) -> Path {
    boolean(a, b, BooleanOp::Union, FillRule::NonZero)
}

/// Part of the region `a` not covered by `b`
pub fn difference(a: &Path, b: &Path) -> Path {
    boolean(a, b, BooleanOp::Difference, FillRule::NonZero)
}

/// Part of the region covered by both `a` and `b`
pub fn intersection(a: &Path, b: &Path) -> Path {
    boolean(a, b, BooleanOp::Intersection, FillRule::NonZero)
}

/// Generic boolean operation between two regions filled with `fill_rule`
pub fn boolean(a: &Path, b: &Path, op: BooleanOp, fill_rule: FillRule) -> Path {
    boolean_with(
        a,
        b,
        op,
        |point| a.contains(point, fill_rule),
        |point| b.contains(point, fill_rule),
    )
}

/// Boolean operation where each region decides which points it covers
pub fn boolean_with(
    a: &Path,
    b: &Path,
    op: BooleanOp,
    inside_a: impl Fn(Point) -> bool,
    inside_b: impl Fn(Point) -> bool,
) -> Path {
    tracing::debug_span!("[boolean]", ?op)
        .in_scope(|| regions(&[a, b], |point| op.eval(inside_a(point), inside_b(point))))
}

/// Cut sub-paths of `path` at the crossings with the boundary of `cutter`
///
/// A piece is kept when `keep` accepts its middle point, consecutive kept pieces
/// stay connected. Closed sub-paths which are not cut and kept whole stay closed.
pub fn slice(path: &Path, cutter: &Path, keep: impl Fn(Point) -> bool) -> Path {
    let _span = tracing::debug_span!("[boolean:slice]").entered();
    let edges: Vec<Segment> = cutter
        .subpaths()
        .iter()
        .filter_map(|subpath| SubPath::new(subpath.segments().to_vec(), true))
        .flat_map(|contour| contour.into_segments())
        .collect();
    let mut result = Vec::new();
    for subpath in path.subpaths() {
        let mut runs: Vec<Vec<Segment>> = Vec::new();
        let mut current = Vec::new();
        let mut whole = true;
        for segment in subpath.segments() {
            for (index, piece) in split_segment(*segment, usize::MAX, &edges)
                .into_iter()
                .enumerate()
            {
                if index > 0 {
                    whole = false;
                    runs.extend((!current.is_empty()).then(|| std::mem::take(&mut current)));
                }
                if keep(piece.at(0.5)) {
                    current.push(piece);
                } else {
                    whole = false;
                    runs.extend((!current.is_empty()).then(|| std::mem::take(&mut current)));
                }
            }
        }
        if whole {
            result.push(subpath.clone());
            continue;
        }
        // closed sub-path continues through its start unless it was cut there
        let first_kept = runs
            .first()
            .and_then(|run| run.first())
            .is_some_and(|piece| piece.start().is_close_to(subpath.start()));
        if subpath.closed() && first_kept && !current.is_empty() && !runs.is_empty() {
            let head = runs.remove(0);
            current.extend(head);
        }
        runs.extend((!current.is_empty()).then_some(current));
        result.extend(runs.into_iter().filter_map(|run| SubPath::new(run, false)));
    }
    Path::new(result)
}

/// Piece of the input contour together with the exact position of its ends
#[derive(Debug, Clone, Copy)]
struct Piece {
    segment: Segment,
    used: bool,
}

/// Boundary of the region defined by `inside` predicate, `paths` provide candidate edges
fn regions(paths: &[&Path], inside: impl Fn(Point) -> bool) -> Path {
    let contours: Vec<SubPath> = paths
        .iter()
        .flat_map(|path| path.subpaths())
        .filter_map(|subpath| SubPath::new(subpath.segments().to_vec(), true))
        .collect();
    let segments: Vec<Segment> = contours
        .iter()
        .flat_map(|contour| contour.segments().iter().copied())
        .collect();
    let Some(bbox) = contours
        .iter()
        .fold(None, |bbox, contour| Some(contour.bbox(bbox, crate::Transform::identity())))
    else {
        return Path::empty();
    };
    let nudge = 1e-6 * (1.0 + bbox.diag().length());

    let mut pieces = Vec::new();
    for (index, segment) in segments.iter().enumerate() {
        for piece in split_segment(*segment, index, &segments) {
            let Some((mid, left)) = side_normal(piece) else {
                continue;
            };
            let left_inside = inside(mid + nudge * left);
            let right_inside = inside(mid - nudge * left);
            let oriented = match (left_inside, right_inside) {
                (true, false) => piece,
                (false, true) => piece.reverse(),
                _ => continue,
            };
            let duplicate = pieces.iter().any(|other: &Piece| same_piece(other.segment, oriented));
            if !duplicate {
                pieces.push(Piece {
                    segment: oriented,
                    used: false,
                });
            }
        }
    }
    tracing::debug!("[boolean:pieces] {}", pieces.len());
    chain(pieces)
}

/// Split segment at crossings with all other segments and at their nodes lying on it
fn split_segment(segment: Segment, index: usize, segments: &[Segment]) -> Vec<Segment> {
    let mut splits: Vec<(Scalar, Point)> = Vec::new();
    for (other_index, other) in segments.iter().enumerate() {
        if other_index == index {
            continue;
        }
        for (t, _) in segment.intersect(*other, INTERSECT_TOLERANCE) {
            splits.push((t, segment.at(t)));
        }
        for node in [other.start(), other.end()] {
            let (t, dist) = segment.nearest(node);
            if dist < CHAIN_TOLERANCE {
                splits.push((t, node));
            }
        }
    }
    splits.retain(|(t, _)| *t > EPSILON.sqrt() && *t < 1.0 - EPSILON.sqrt());
    splits.sort_by(|a, b| a.0.total_cmp(&b.0));
    splits.dedup_by(|a, b| a.1.is_near(b.1, CHAIN_TOLERANCE));

    let mut result = Vec::with_capacity(splits.len() + 1);
    let mut prev = (0.0, segment.start());
    for split in splits.into_iter().chain(Some((1.0, segment.end()))) {
        if split.0 - prev.0 > EPSILON {
            let piece = segment
                .cut(prev.0, split.0)
                .with_start(prev.1)
                .with_end(split.1);
            result.push(piece);
        }
        prev = split;
    }
    result
}

/// Middle point of the piece and unit vector pointing to its left side
fn side_normal(piece: Segment) -> Option<(Point, Point)> {
    let mid = piece.at(0.5);
    let tangent = piece
        .deriv()
        .at(0.5)
        .normalize()
        .or_else(|| (piece.end() - piece.start()).normalize())?;
    Some((mid, tangent.rot90()))
}

/// Whether two pieces cover the same curve in the same direction
fn same_piece(a: Segment, b: Segment) -> bool {
    a.start().is_near(b.start(), CHAIN_TOLERANCE)
        && a.end().is_near(b.end(), CHAIN_TOLERANCE)
        && a.at(0.5).is_near(b.at(0.5), CHAIN_TOLERANCE * 10.0)
}

/// Connect oriented pieces into closed contours
fn chain(mut pieces: Vec<Piece>) -> Path {
    let mut subpaths = Vec::new();
    while let Some(start) = pieces.iter().position(|piece| !piece.used) {
        pieces[start].used = true;
        let mut contour = vec![pieces[start].segment];
        let origin = pieces[start].segment.start();
        loop {
            let Some(last) = contour.last().copied() else {
                break;
            };
            if contour.len() > 1 && last.end().is_near(origin, CHAIN_TOLERANCE) {
                break;
            }
            let incoming = last.end_tangent().unwrap_or_default();
            let next = pieces
                .iter()
                .enumerate()
                .filter(|(_, piece)| !piece.used && piece.segment.start().is_near(last.end(), CHAIN_TOLERANCE))
                .map(|(index, piece)| {
                    let outgoing = piece.segment.start_tangent().unwrap_or_default();
                    // prefer the sharpest turn to the left
                    let turn = incoming.angle_between(outgoing).unwrap_or(0.0);
                    (index, turn)
                })
                .max_by(|a, b| a.1.total_cmp(&b.1));
            match next {
                Some((index, _)) => {
                    pieces[index].used = true;
                    let segment = pieces[index].segment.with_start(last.end());
                    contour.push(segment);
                }
                None => {
                    if !last.end().is_near(origin, CHAIN_TOLERANCE) {
                        tracing::debug!("[boolean:chain] contour is not closed");
                    }
                    break;
                }
            }
        }
        if let Some(last) = contour.last_mut() {
            if last.end().is_near(origin, CHAIN_TOLERANCE) {
                *last = last.with_end(origin);
            }
        }
        subpaths.extend(SubPath::new(contour, true));
    }
    Path::new(subpaths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Transform, assert_approx_eq};

    fn area(path: &Path) -> Scalar {
        path.subpaths().iter().map(SubPath::signed_area).sum()
    }

    #[test]
    fn test_flatten_overlap() -> Result<(), crate::Error> {
        let path: Path = "M0,0 L10,0 L10,10 L0,10 Z M5,5 L15,5 L15,15 L5,15 Z".parse()?;
        let nonzero = flatten(&path, FillRule::NonZero);
        assert_eq!(nonzero.subpaths().len(), 1);
        assert_approx_eq!(area(&nonzero), 175.0, 1e-6);
        assert!(nonzero.subpaths()[0].is_ccw());
        assert_eq!(nonzero.segments_count(), 8);

        let evenodd = flatten(&path, FillRule::EvenOdd);
        assert_approx_eq!(area(&evenodd).abs(), 150.0, 1e-6);
        assert!(!evenodd.contains(Point::new(7.5, 7.5), FillRule::NonZero));
        assert!(evenodd.contains(Point::new(2.0, 2.0), FillRule::NonZero));
        Ok(())
    }

    #[test]
    fn test_flatten_orientation() -> Result<(), crate::Error> {
        // clockwise square is re-oriented
        let path: Path = "M0,0 L0,10 L10,10 L10,0 Z".parse()?;
        let flat = flatten(&path, FillRule::NonZero);
        assert_eq!(flat.subpaths().len(), 1);
        assert_approx_eq!(area(&flat), 100.0, 1e-9);

        // hole keeps the opposite orientation
        let path: Path = "M0,0 L10,0 L10,10 L0,10 Z M3,3 L3,7 L7,7 L7,3 Z".parse()?;
        let flat = flatten(&path, FillRule::NonZero);
        assert_eq!(flat.subpaths().len(), 2);
        assert_approx_eq!(area(&flat), 84.0, 1e-9);
        Ok(())
    }

    #[test]
    fn test_boolean_ops() -> Result<(), crate::Error> {
        let a: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let b = a.transformed(Transform::new_translate(5.0, 0.0));
        assert_approx_eq!(area(&union(&a, &b)), 150.0, 1e-6);
        assert_approx_eq!(area(&difference(&a, &b)), 50.0, 1e-6);
        assert_approx_eq!(area(&intersection(&a, &b)), 50.0, 1e-6);

        let bbox = difference(&a, &b).bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.width(), 5.0, 1e-9);

        let exclusion = boolean(&a, &b, BooleanOp::Exclusion, FillRule::NonZero);
        assert_eq!(exclusion.subpaths().len(), 2);
        assert_approx_eq!(area(&exclusion), 100.0, 1e-6);
        assert!(!exclusion.contains(Point::new(7.5, 5.0), FillRule::NonZero));

        let far = a.transformed(Transform::new_translate(50.0, 0.0));
        assert!(intersection(&a, &far).is_empty());
        assert_eq!(union(&a, &far).subpaths().len(), 2);
        Ok(())
    }

    #[test]
    fn test_boolean_with_predicates() -> Result<(), crate::Error> {
        // same contour twice, only positive winding counts as inside
        let a: Path = "M0,0 L10,0 L10,10 L0,10 Z M0,0 L0,10 L10,10 L10,0 Z".parse()?;
        let b: Path = "M5,0 L15,0 L15,10 L5,10 Z".parse()?;
        let result = boolean_with(
            &a,
            &b,
            BooleanOp::Union,
            |point| a.winding(point) > 0,
            |point| b.contains(point, FillRule::NonZero),
        );
        assert_eq!(result.subpaths().len(), 1);
        assert_approx_eq!(area(&result), 100.0, 1e-6);
        Ok(())
    }

    #[test]
    fn test_slice() -> Result<(), crate::Error> {
        let line: Path = "M-5,5 L15,5".parse()?;
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;

        let inside = slice(&line, &square, |p| square.contains(p, FillRule::NonZero));
        assert_eq!(inside.subpaths().len(), 1);
        assert_approx_eq!(inside.subpaths()[0].start().x(), 0.0, 1e-9);
        assert_approx_eq!(inside.subpaths()[0].end().x(), 10.0, 1e-9);

        let outside = slice(&line, &square, |p| !square.contains(p, FillRule::NonZero));
        assert_eq!(outside.subpaths().len(), 2);

        let all = slice(&line, &square, |_| true);
        assert_eq!(all.subpaths().len(), 3);
        assert!(all.subpaths().iter().all(|subpath| !subpath.closed()));

        // closed contour is cut into two open halves joined through its start
        let cut = slice(&square, &line, |_| true);
        assert_eq!(cut.subpaths().len(), 2);
        assert_eq!(cut.segments_count(), 6);

        // nothing to cut
        let far = line.transformed(Transform::new_translate(0.0, 50.0));
        let whole = slice(&square, &far, |_| true);
        assert_eq!(whole, square);
        Ok(())
    }

    #[test]
    fn test_boolean_curves() {
        let mut builder = Path::builder();
        builder.move_to((0.0, 0.0)).circle(5.0);
        let circle = builder.build();
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse().unwrap();
        let quarter = intersection(&circle, &square);
        assert_eq!(quarter.subpaths().len(), 1);
        assert_approx_eq!(area(&quarter), 25.0 * std::f64::consts::PI / 4.0, 0.05);
    }
}
