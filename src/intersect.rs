//! Self intersection of sub-paths
use crate::{Curve, Line, PathTime, Point, Scalar, Segment, SubPath};

/// Default tolerance used to locate crossings
pub const INTERSECT_TOLERANCE: Scalar = 1e-7;

/// Path times closer than this are considered to be the same position
const TIME_EPSILON: Scalar = 1e-6;

/// Crossing of a sub-path with itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Smaller path time of the crossing
    pub ta: PathTime,
    /// Larger path time of the crossing
    pub tb: PathTime,
    /// Position of the crossing
    pub point: Point,
}

impl Crossing {
    /// Crossing which does not form a loop (node shared by consecutive segments,
    /// or the seam of a closed sub-path)
    fn is_trivial(&self, subpath: &SubPath) -> bool {
        let end = subpath.segments().len() as Scalar;
        self.tb - self.ta < TIME_EPSILON || (self.ta < TIME_EPSILON && end - self.tb < TIME_EPSILON)
    }
}

/// Find all non-trivial crossings of the sub-path with itself, sorted by `ta`
pub fn self_crossings(subpath: &SubPath, tolerance: Scalar) -> Vec<Crossing> {
    let segments = subpath.segments();
    let mut result = Vec::new();
    for (i, seg_i) in segments.iter().enumerate() {
        // loop inside of a single cubic
        if let Segment::Cubic(cubic) = seg_i {
            let (head, tail) = cubic.split();
            for (t0, t1) in Segment::from(head).intersect(tail, tolerance) {
                let crossing = Crossing {
                    ta: i as Scalar + t0 / 2.0,
                    tb: i as Scalar + 0.5 + t1 / 2.0,
                    point: head.at(t0),
                };
                if !crossing.is_trivial(subpath) {
                    result.push(crossing);
                }
            }
        }
        for (j, seg_j) in segments.iter().enumerate().skip(i + 1) {
            for (t0, t1) in seg_i.intersect(*seg_j, tolerance) {
                let crossing = Crossing {
                    ta: i as Scalar + t0,
                    tb: j as Scalar + t1,
                    point: seg_i.at(t0),
                };
                if !crossing.is_trivial(subpath) {
                    result.push(crossing);
                }
            }
        }
    }
    result.sort_by(|a, b| a.ta.total_cmp(&b.ta));
    result.dedup_by(|a, b| (a.ta - b.ta).abs() < TIME_EPSILON && (a.tb - b.tb).abs() < TIME_EPSILON);
    result
}

/// Remove loops formed by self crossings
///
/// Loop between the first crossing's times is cut out and the procedure repeats.
/// For a closed sub-path the loop enclosing smaller area is removed. Number of
/// repetitions is bounded by the number of crossings initially found.
pub fn remove_self_intersections(subpath: &SubPath, tolerance: Scalar) -> SubPath {
    tracing::debug_span!("[remove_self_intersections]").in_scope(|| {
        let mut current = subpath.clone();
        let budget = self_crossings(&current, tolerance).len();
        for _ in 0..budget {
            let Some(crossing) = self_crossings(&current, tolerance).into_iter().next() else {
                break;
            };
            match excise_loop(&current, crossing) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    })
}

/// Remove the part of the sub-path between crossing times
fn excise_loop(subpath: &SubPath, crossing: Crossing) -> Option<SubPath> {
    let end = subpath.segments().len() as Scalar;
    let outer = join_at(
        subpath.portion(0.0, crossing.ta),
        subpath.portion(crossing.tb, end),
        crossing.point,
    );
    if !subpath.closed() {
        return SubPath::new(outer, false);
    }
    let inner = join_at(
        subpath.portion(crossing.ta, crossing.tb),
        Vec::new(),
        crossing.point,
    );
    let outer = SubPath::new(outer, true);
    let inner = SubPath::new(inner, true);
    match (outer, inner) {
        (Some(outer), Some(inner)) => {
            if outer.signed_area().abs() >= inner.signed_area().abs() {
                Some(outer)
            } else {
                Some(inner)
            }
        }
        (outer, inner) => outer.or(inner),
    }
}

/// Concatenate two runs of segments making both meet exactly at `point`
fn join_at(mut head: Vec<Segment>, tail: Vec<Segment>, point: Point) -> Vec<Segment> {
    if let Some(last) = head.last_mut() {
        *last = last.with_end(point);
    }
    let mut tail = tail.into_iter();
    if let Some(first) = tail.next() {
        head.push(first.with_start(point));
    }
    head.extend(tail);
    head.retain(|segment| {
        !(matches!(segment, Segment::Line(Line([p0, p1])) if p0.is_close_to(*p1)))
    });
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Path, assert_approx_eq};

    fn subpath(text: &str) -> SubPath {
        let path: Path = text.parse().unwrap();
        path.subpaths()[0].clone()
    }

    #[test]
    fn test_self_crossings() {
        let sp = subpath("M0,0 L4,0 L4,2 L2,2 L2,-2");
        let crossings = self_crossings(&sp, INTERSECT_TOLERANCE);
        assert_eq!(crossings.len(), 1);
        assert_approx_eq!(crossings[0].ta, 0.5, 1e-9);
        assert_approx_eq!(crossings[0].tb, 3.5, 1e-9);
        assert!(crossings[0].point.is_near(Point::new(2.0, 0.0), 1e-9));

        // consecutive segments and closing seam are not crossings
        let square = subpath("M0,0 L10,0 L10,10 L0,10 Z");
        assert!(self_crossings(&square, INTERSECT_TOLERANCE).is_empty());

        // cubic with a loop
        let looped = subpath("M0,0 C20,10 -10,10 10,0");
        let crossings = self_crossings(&looped, INTERSECT_TOLERANCE);
        assert_eq!(crossings.len(), 1);
        assert!(crossings[0].ta < 0.5 && crossings[0].tb > 0.5);
    }

    #[test]
    fn test_remove_self_intersections() {
        let sp = subpath("M0,0 L4,0 L4,2 L2,2 L2,-2 L10,-2 L10,2 L8,2 L8,-4");
        assert_eq!(self_crossings(&sp, INTERSECT_TOLERANCE).len(), 2);
        let clean = remove_self_intersections(&sp, INTERSECT_TOLERANCE);
        assert!(self_crossings(&clean, INTERSECT_TOLERANCE).is_empty());
        let nodes = clean.nodes();
        let expected = [(0.0, 0.0), (2.0, 0.0), (2.0, -2.0), (8.0, -2.0), (8.0, -4.0)];
        assert_eq!(nodes.len(), expected.len());
        for (node, expected) in nodes.iter().zip(expected) {
            assert!(node.is_near(expected.into(), 1e-9), "{:?} {:?}", node, expected);
        }
    }

    #[test]
    fn test_remove_loop_closed() {
        // bow tie, the larger lobe survives
        let sp = subpath("M0,0 L10,10 L10,0 L-2,12 Z");
        let clean = remove_self_intersections(&sp, INTERSECT_TOLERANCE);
        assert!(clean.closed());
        assert!(self_crossings(&clean, INTERSECT_TOLERANCE).is_empty());
        let bbox = clean.bbox(None, crate::Transform::identity());
        assert_approx_eq!(bbox.x(), -2.0, 1e-6);
        assert_approx_eq!(bbox.max().x(), 5.0, 1e-6);
        assert_approx_eq!(clean.signed_area().abs(), 35.0, 1e-6);
    }
}
