//! Subdivision of segments with random displacement of the new nodes
use crate::{
    Cubic, Curve, EffectInput, EffectOutput, EffectType, Line, ParamSet, ParamSpec, ParamValue,
    Path, PathEffect, Point, Reason, Scalar, Segment, SubPath, param::impl_choice,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DivisionMethod {
    /// Fixed number of pieces per segment
    #[default]
    Segments,
    /// Pieces no longer than maximum segment size
    Size,
}

impl_choice!(DivisionMethod, {
    Segments => "segments",
    Size => "size",
});

#[derive(Debug, Clone)]
pub struct Roughen {
    pub method: DivisionMethod,
    pub max_segment_size: Scalar,
    pub segments: usize,
    pub displace_x: Scalar,
    pub displace_y: Scalar,
    pub shift_nodes: bool,
    pub shift_handles: bool,
    pub seed: u64,
}

/// Source of node and handle displacements
struct Jitter {
    rng: StdRng,
    max: Point,
}

impl Jitter {
    fn new(seed: u64, max: Point) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max,
        }
    }

    fn signed(&mut self, max: Scalar) -> Scalar {
        let value = self.rng.gen_range(0.0..1.0) * max;
        if self.rng.gen_bool(0.5) { -value } else { value }
    }

    fn displacement(&mut self) -> Point {
        let x = self.signed(self.max.x());
        let y = self.signed(self.max.y());
        Point::new(x, y)
    }
}

impl Roughen {
    fn splits(&self, segment: &Segment) -> usize {
        match self.method {
            DivisionMethod::Segments => self.segments.max(1),
            DivisionMethod::Size if self.max_segment_size > 0.0 => {
                let length = segment.arc_length(0.0, 1.0);
                ((length / self.max_segment_size).ceil() as usize).max(1)
            }
            DivisionMethod::Size => 1,
        }
    }

    fn node_shift(&self, jitter: &mut Jitter) -> Point {
        if self.shift_nodes {
            jitter.displacement()
        } else {
            Point::new(0.0, 0.0)
        }
    }

    /// Handle displacement, handles follow their node unless shifted on their own
    fn handle_shift(&self, jitter: &mut Jitter, node_shift: Point) -> Point {
        if self.shift_handles {
            jitter.displacement()
        } else {
            node_shift
        }
    }

    fn roughen_subpath(&self, subpath: &SubPath, jitter: &mut Jitter) -> Option<SubPath> {
        let initial_shift = self.node_shift(jitter);
        let start = subpath.start() + initial_shift;
        let count = subpath.segments().len();

        let mut output = Vec::new();
        let mut position = start;
        let mut position_shift = initial_shift;
        for (index, segment) in subpath.segments().iter().enumerate() {
            let segment = match segment {
                Segment::Line(line) if self.shift_handles => {
                    let [p0, p1] = line.points();
                    Segment::from(Cubic::new(p0, p0.lerp(p1, 1.0 / 3.0), p0.lerp(p1, 2.0 / 3.0), p1))
                }
                segment => *segment,
            };
            let last_segment = index + 1 == count;
            let splits = self.splits(&segment);
            for piece_index in 0..splits {
                let t0 = piece_index as Scalar / splits as Scalar;
                let t1 = (piece_index + 1) as Scalar / splits as Scalar;
                let piece = segment.cut(t0, t1);
                let last_piece = piece_index + 1 == splits;
                // original nodes stay in place once the segment is subdivided
                let (end, end_shift) = if last_piece && last_segment && subpath.closed() {
                    (start, initial_shift)
                } else if last_piece && splits > 1 {
                    (piece.end(), Point::new(0.0, 0.0))
                } else {
                    let shift = self.node_shift(jitter);
                    (piece.end() + shift, shift)
                };
                let piece = match piece {
                    Segment::Cubic(cubic) => {
                        let [_, p1, p2, _] = cubic.points();
                        let p1 = p1 + self.handle_shift(jitter, position_shift);
                        let p2 = p2 + self.handle_shift(jitter, end_shift);
                        Segment::from(Cubic::new(position, p1, p2, end))
                    }
                    _ => Segment::from(Line::new(position, end)),
                };
                output.push(piece);
                position = end;
                position_shift = end_shift;
            }
        }
        SubPath::new(output, subpath.closed())
    }
}

impl PathEffect for Roughen {
    const TYPE: EffectType = EffectType::Roughen;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::choice("method", DivisionMethod::KEYS, "segments"),
            ParamSpec::scalar("maxSegmentSize", 10.0).range(0.0, Scalar::INFINITY),
            ParamSpec::int("segments", 2).range(1.0, Scalar::INFINITY),
            ParamSpec::scalar("displaceX", 10.0).range(0.0, Scalar::INFINITY),
            ParamSpec::scalar("displaceY", 10.0).range(0.0, Scalar::INFINITY),
            ParamSpec::bool("shiftNodes", true),
            ParamSpec::bool("shiftNodeHandles", true),
            ParamSpec::int("seed", 1).range(0.0, Scalar::INFINITY),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            method: DivisionMethod::default(),
            max_segment_size: 10.0,
            segments: 2,
            displace_x: 10.0,
            displace_y: 10.0,
            shift_nodes: true,
            shift_handles: true,
            seed: 1,
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.method = params.choice("method").unwrap_or(self.method);
        self.max_segment_size = params
            .scalar("maxSegmentSize")
            .unwrap_or(self.max_segment_size);
        if let Some(segments) = params.int("segments") {
            self.segments = segments.max(1) as usize;
        }
        self.displace_x = params.scalar("displaceX").unwrap_or(self.displace_x).max(0.0);
        self.displace_y = params.scalar("displaceY").unwrap_or(self.displace_y).max(0.0);
        self.shift_nodes = params.bool("shiftNodes").unwrap_or(self.shift_nodes);
        self.shift_handles = params
            .bool("shiftNodeHandles")
            .unwrap_or(self.shift_handles);
        if let Some(seed) = params.int("seed") {
            self.seed = seed.max(0) as u64;
        }
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("method", ParamValue::Enum(self.method.key().to_owned()))
            .with("maxSegmentSize", ParamValue::Scalar(self.max_segment_size))
            .with("segments", ParamValue::Int(self.segments as i64))
            .with("displaceX", ParamValue::Scalar(self.displace_x))
            .with("displaceY", ParamValue::Scalar(self.displace_y))
            .with("shiftNodes", ParamValue::Bool(self.shift_nodes))
            .with("shiftNodeHandles", ParamValue::Bool(self.shift_handles))
            .with("seed", ParamValue::Int(self.seed as i64))
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        if input.path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        // same seed gives the same path on every invocation
        let mut jitter = Jitter::new(self.seed, Point::new(self.displace_x, self.displace_y));
        let output: Path = input
            .path
            .to_line_and_cubic()
            .subpaths()
            .iter()
            .filter_map(|subpath| self.roughen_subpath(subpath, &mut jitter))
            .collect();
        EffectOutput::applied(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use proptest::prelude::*;

    fn roughen() -> Roughen {
        Roughen::from_params(&ParamSet::defaults(&Roughen::specs()))
    }

    fn square() -> Path {
        "M0,0 L10,0 L10,10 L0,10 Z".parse().unwrap()
    }

    #[test]
    fn test_defaults() {
        let effect = roughen();
        assert_eq!(effect.method, DivisionMethod::Segments);
        assert_eq!(effect.segments, 2);
        assert_eq!(effect.seed, 1);
        assert_approx_eq!(effect.displace_x, 10.0);
        assert!(effect.shift_nodes && effect.shift_handles);
    }

    #[test]
    fn test_deterministic() {
        let input = EffectInput::new(square());
        let effect = roughen();
        let first = effect.do_effect(&input);
        let second = effect.do_effect(&input);
        assert!(first.is_applied());
        assert_eq!(first.path, second.path);
        assert_ne!(first.path, input.path);

        let mut other = roughen();
        other.seed = 7;
        assert_ne!(other.do_effect(&input).path, first.path);
    }

    #[test]
    fn test_subdivision() {
        let mut effect = roughen();
        effect.displace_x = 0.0;
        effect.displace_y = 0.0;
        effect.shift_handles = false;
        let output = effect.do_effect(&EffectInput::new(square()));
        let subpath = &output.path.subpaths()[0];
        assert!(subpath.closed());
        assert_eq!(subpath.segments().len(), 8);
        assert!(subpath.segments()[0].end().is_close_to(Point::new(5.0, 0.0)));
        assert!(subpath.segments()[1].end().is_close_to(Point::new(10.0, 0.0)));

        effect.method = DivisionMethod::Size;
        effect.max_segment_size = 3.0;
        let output = effect.do_effect(&EffectInput::new("M0,0 L10,0".parse().unwrap()));
        assert_eq!(output.path.segments_count(), 4);
        assert!(output.path.subpaths()[0].end().is_close_to(Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_displacement_bounds() {
        let mut effect = roughen();
        effect.displace_x = 1.0;
        effect.displace_y = 0.5;
        effect.shift_handles = false;
        effect.segments = 4;
        let output = effect.do_effect(&EffectInput::new("M0,0 L20,0".parse().unwrap()));
        let subpath = &output.path.subpaths()[0];
        assert_eq!(subpath.segments().len(), 4);
        for (index, segment) in subpath.segments().iter().enumerate() {
            assert!(matches!(segment, Segment::Line(_)));
            let expected = Point::new(5.0 * (index + 1) as Scalar, 0.0);
            let diff = segment.end() - expected;
            assert!(diff.x().abs() <= 1.0 && diff.y().abs() <= 0.5, "{:?}", diff);
        }
        // new node is displaced, original end node is kept
        assert!(subpath.end().is_close_to(Point::new(20.0, 0.0)));
    }

    #[test]
    fn test_handles_follow_nodes() {
        let mut effect = roughen();
        effect.shift_handles = false;
        let input = EffectInput::new("M0,0 C0,5 10,5 10,0".parse().unwrap());
        let output = effect.do_effect(&input);
        let segments = output.path.subpaths()[0].segments();
        assert_eq!(segments.len(), 2);
        let (first, second) = (segments[0].to_cubic().unwrap(), segments[1].to_cubic().unwrap());
        let (left, right) = input.path.subpaths()[0].first().split_at(0.5);
        let shift = first.points()[3] - left.end();
        assert!((first.points()[2] - left.to_cubic().unwrap().points()[2]).is_near(shift, 1e-9));
        assert!((second.points()[1] - right.to_cubic().unwrap().points()[1]).is_near(shift, 1e-9));
    }

    proptest! {
        #[test]
        fn test_closed_stay_closed(seed in 0u64..1000, segments in 1usize..5) {
            let mut effect = roughen();
            effect.seed = seed;
            effect.segments = segments;
            let output = effect.do_effect(&EffectInput::new(square()));
            let subpath = &output.path.subpaths()[0];
            prop_assert!(subpath.closed());
            prop_assert_eq!(subpath.segments().len(), 4 * segments);
            prop_assert!(subpath.end().is_close_to(subpath.start()));
            for pair in subpath.segments().windows(2) {
                prop_assert!(pair[0].end().is_close_to(pair[1].start()));
            }
        }
    }
}
