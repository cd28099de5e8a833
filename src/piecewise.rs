//! Piecewise polynomial curves
//!
//! Curve is represented as a sequence of polynomial pieces defined over consecutive
//! intervals of the parameter, boundaries of the intervals are called cuts. Each piece
//! is evaluated on its own local parameter in `[0, 1]`. Derivatives, composition and
//! arc length re-parametrization are much simpler to express in this form than on
//! bezier segments.
use crate::{
    Cubic, Curve, EPSILON, Line, Path, Point, Scalar, Segment, SubPath,
    utils::{bisect, integrate},
};
use std::{
    fmt,
    ops::{Add, Mul, Neg, Sub},
};

// -----------------------------------------------------------------------------
// Polynomial
// -----------------------------------------------------------------------------

/// Polynomial in power basis `c0 + c1 * t + c2 * t^2 + ...`
#[derive(Clone, PartialEq, Default)]
pub struct Poly(Vec<Scalar>);

impl fmt::Debug for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Poly{:?}", self.0)
    }
}

impl Poly {
    pub fn new(coeffs: impl Into<Vec<Scalar>>) -> Self {
        let mut coeffs = coeffs.into();
        while coeffs.len() > 1 && coeffs.last() == Some(&0.0) {
            coeffs.pop();
        }
        Self(coeffs)
    }

    pub fn constant(value: Scalar) -> Self {
        Self(vec![value])
    }

    /// Linear function equal to `a` at zero and to `b` at one
    pub fn linear(a: Scalar, b: Scalar) -> Self {
        Self::new(vec![a, b - a])
    }

    pub fn coeffs(&self) -> &[Scalar] {
        &self.0
    }

    pub fn degree(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn eval(&self, t: Scalar) -> Scalar {
        self.0.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    pub fn deriv(&self) -> Self {
        if self.0.len() < 2 {
            return Self::constant(0.0);
        }
        Self::new(
            self.0
                .iter()
                .enumerate()
                .skip(1)
                .map(|(power, c)| power as Scalar * c)
                .collect::<Vec<_>>(),
        )
    }

    /// Multiply by a constant
    pub fn scale(&self, k: Scalar) -> Self {
        Self::new(self.0.iter().map(|c| c * k).collect::<Vec<_>>())
    }

    /// Add a constant
    pub fn shift(&self, value: Scalar) -> Self {
        let mut coeffs = self.0.clone();
        match coeffs.first_mut() {
            Some(c0) => *c0 += value,
            None => coeffs.push(value),
        }
        Self::new(coeffs)
    }

    /// Composition `self(other(t))`
    pub fn compose(&self, other: &Poly) -> Self {
        self.0
            .iter()
            .rev()
            .fold(Poly::constant(0.0), |acc, c| (&acc * other).shift(*c))
    }

    /// Same polynomial on the local parameter remapped from `[a, b]` to `[0, 1]`
    pub fn portion(&self, a: Scalar, b: Scalar) -> Self {
        self.compose(&Poly::linear(a, b))
    }

    /// Change values at zero and one by `d0` and `d1` with a linear correction
    pub fn adjust_ends(&mut self, d0: Scalar, d1: Scalar) {
        if self.0.is_empty() {
            self.0.push(0.0);
        }
        if self.0.len() < 2 {
            self.0.push(0.0);
        }
        self.0[0] += d0;
        self.0[1] += d1 - d0;
    }

    /// Roots in the `[0, 1]` interval, in increasing order
    pub fn roots(&self) -> Vec<Scalar> {
        let mut result = Vec::new();
        match self.degree() {
            0 => {}
            1 => {
                let [c0, c1] = [self.0[0], self.0[1]];
                if c1.abs() > EPSILON {
                    let t = -c0 / c1;
                    if (0.0..=1.0).contains(&t) {
                        result.push(t);
                    }
                }
            }
            _ => {
                // derivative roots split the interval into monotonic pieces
                let mut knots = vec![0.0];
                knots.extend(self.deriv().roots());
                knots.push(1.0);
                for pair in knots.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    let (fa, fb) = (self.eval(a), self.eval(b));
                    if fa * fb > 0.0 || b - a < EPSILON {
                        continue;
                    }
                    let t = bisect(|t| self.eval(t), a, b, 1e-14);
                    if result.last().is_none_or(|last: &Scalar| t - last > 1e-10) {
                        result.push(t);
                    }
                }
            }
        }
        result
    }

    /// Minimum and maximum values on `[0, 1]`
    pub fn bounds(&self) -> (Scalar, Scalar) {
        let mut min = self.eval(0.0).min(self.eval(1.0));
        let mut max = self.eval(0.0).max(self.eval(1.0));
        for t in self.deriv().roots() {
            let value = self.eval(t);
            min = min.min(value);
            max = max.max(value);
        }
        (min, max)
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, other: &Poly) -> Poly {
        let size = self.0.len().max(other.0.len());
        Poly::new(
            (0..size)
                .map(|i| self.0.get(i).unwrap_or(&0.0) + other.0.get(i).unwrap_or(&0.0))
                .collect::<Vec<_>>(),
        )
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, other: &Poly) -> Poly {
        self + &(-other)
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        self.scale(-1.0)
    }
}

impl Mul for &Poly {
    type Output = Poly;

    fn mul(self, other: &Poly) -> Poly {
        if self.0.is_empty() || other.0.is_empty() {
            return Poly::constant(0.0);
        }
        let mut coeffs = vec![0.0; self.0.len() + other.0.len() - 1];
        for (i, a) in self.0.iter().enumerate() {
            for (j, b) in other.0.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Poly::new(coeffs)
    }
}

// -----------------------------------------------------------------------------
// Fragment
// -----------------------------------------------------------------------------

/// Two dimensional polynomial curve on `[0, 1]`
#[derive(Clone, PartialEq, Default)]
pub struct Fragment {
    pub x: Poly,
    pub y: Poly,
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fragment x:{:?} y:{:?}", self.x, self.y)
    }
}

impl Fragment {
    pub fn new(x: Poly, y: Poly) -> Self {
        Self { x, y }
    }

    /// Build from the power basis coefficients given as points
    fn from_coeffs(coeffs: &[Point]) -> Self {
        Self {
            x: Poly::new(coeffs.iter().map(|p| p.x()).collect::<Vec<_>>()),
            y: Poly::new(coeffs.iter().map(|p| p.y()).collect::<Vec<_>>()),
        }
    }

    /// Exact polynomial representation of the segment
    pub fn from_segment(segment: Segment) -> Self {
        match segment {
            Segment::Line(Line([p0, p1])) => Self::from_coeffs(&[p0, p1 - p0]),
            Segment::Quad(quad) => {
                let [p0, p1, p2] = quad.points();
                Self::from_coeffs(&[p0, 2.0 * (p1 - p0), p0 - 2.0 * p1 + p2])
            }
            Segment::Cubic(Cubic([p0, p1, p2, p3])) => Self::from_coeffs(&[
                p0,
                3.0 * (p1 - p0),
                3.0 * (p0 - 2.0 * p1 + p2),
                3.0 * (p1 - p2) + p3 - p0,
            ]),
        }
    }

    pub fn degree(&self) -> usize {
        self.x.degree().max(self.y.degree())
    }

    pub fn at(&self, t: Scalar) -> Point {
        Point::new(self.x.eval(t), self.y.eval(t))
    }

    pub fn deriv(&self) -> Self {
        Self::new(self.x.deriv(), self.y.deriv())
    }

    pub fn scale(&self, k: Scalar) -> Self {
        Self::new(self.x.scale(k), self.y.scale(k))
    }

    /// Substitute the parameter with a scalar polynomial
    pub fn compose(&self, poly: &Poly) -> Self {
        Self::new(self.x.compose(poly), self.y.compose(poly))
    }

    pub fn portion(&self, a: Scalar, b: Scalar) -> Self {
        self.compose(&Poly::linear(a, b))
    }

    /// Vector field rotated by 90 degrees
    pub fn rot90(&self) -> Self {
        Self::new(-&self.y, self.x.clone())
    }

    /// Move start point to `point` keeping the end
    pub fn move_start(&mut self, point: Point) {
        let delta = point - self.at(0.0);
        self.x.adjust_ends(delta.x(), 0.0);
        self.y.adjust_ends(delta.y(), 0.0);
    }

    /// Move end point to `point` keeping the start
    pub fn move_end(&mut self, point: Point) {
        let delta = point - self.at(1.0);
        self.x.adjust_ends(0.0, delta.x());
        self.y.adjust_ends(0.0, delta.y());
    }

    /// Arc length of the fragment between local parameters `t0` and `t1`
    pub fn length(&self, t0: Scalar, t1: Scalar) -> Scalar {
        let deriv = self.deriv();
        integrate(|t| deriv.at(t).length(), t0, t1, 4)
    }

    /// Convert fragment to bezier segments
    ///
    /// Conversion is exact up to the third degree, higher degrees are approximated
    /// by cubic hermite interpolation with maximum deviation `tolerance`.
    pub fn to_segments(&self, tolerance: Scalar) -> Vec<Segment> {
        let mut result = Vec::new();
        self.to_segments_rec(tolerance, 0, &mut result);
        result
    }

    fn to_segments_rec(&self, tolerance: Scalar, depth: usize, out: &mut Vec<Segment>) {
        let p0 = self.at(0.0);
        let p3 = self.at(1.0);
        let degree = self.degree();
        if degree <= 1 {
            out.push(Line::new(p0, p3).into());
            return;
        }
        let cubic = if degree <= 3 {
            let c = |index: usize| {
                Point::new(
                    self.x.coeffs().get(index).copied().unwrap_or(0.0),
                    self.y.coeffs().get(index).copied().unwrap_or(0.0),
                )
            };
            let (a0, a1, a2) = (c(0), c(1), c(2));
            Cubic::new(
                a0,
                a0 + a1 / 3.0,
                a0 + (2.0 / 3.0) * a1 + a2 / 3.0,
                p3,
            )
        } else {
            let deriv = self.deriv();
            Cubic::new(p0, p0 + deriv.at(0.0) / 3.0, p3 - deriv.at(1.0) / 3.0, p3)
        };
        if degree > 3 && depth < 8 {
            let error = (1..8)
                .map(|index| {
                    let t = index as Scalar / 8.0;
                    cubic.at(t).dist(self.at(t))
                })
                .fold(0.0, Scalar::max);
            if error > tolerance {
                self.portion(0.0, 0.5)
                    .to_segments_rec(tolerance, depth + 1, out);
                self.portion(0.5, 1.0)
                    .to_segments_rec(tolerance, depth + 1, out);
                return;
            }
        }
        let segment = Segment::from(cubic);
        if segment.is_straight() {
            out.push(Line::new(p0, p3).into());
        } else {
            out.push(segment);
        }
    }
}

impl Add for &Fragment {
    type Output = Fragment;

    fn add(self, other: &Fragment) -> Fragment {
        Fragment::new(&self.x + &other.x, &self.y + &other.y)
    }
}

/// Piece of a piecewise function
pub trait Piece: Clone {
    type Value;

    /// Evaluate at local parameter `t` in `[0, 1]`
    fn eval(&self, t: Scalar) -> Self::Value;

    /// Restrict to local parameter range `[a, b]`
    fn portion(&self, a: Scalar, b: Scalar) -> Self;

    /// Derivative with respect to the local parameter
    fn deriv(&self) -> Self;

    /// Multiply values by a constant
    fn scale(&self, k: Scalar) -> Self;
}

impl Piece for Poly {
    type Value = Scalar;

    fn eval(&self, t: Scalar) -> Scalar {
        Poly::eval(self, t)
    }

    fn portion(&self, a: Scalar, b: Scalar) -> Self {
        Poly::portion(self, a, b)
    }

    fn deriv(&self) -> Self {
        Poly::deriv(self)
    }

    fn scale(&self, k: Scalar) -> Self {
        Poly::scale(self, k)
    }
}

impl Piece for Fragment {
    type Value = Point;

    fn eval(&self, t: Scalar) -> Point {
        self.at(t)
    }

    fn portion(&self, a: Scalar, b: Scalar) -> Self {
        Fragment::portion(self, a, b)
    }

    fn deriv(&self) -> Self {
        Fragment::deriv(self)
    }

    fn scale(&self, k: Scalar) -> Self {
        Fragment::scale(self, k)
    }
}

// -----------------------------------------------------------------------------
// Piecewise
// -----------------------------------------------------------------------------

/// Function defined by pieces over consecutive intervals
///
/// Invariant: `cuts` is strictly increasing and `cuts.len() == segs.len() + 1`
/// unless the function is empty.
#[derive(Clone, PartialEq)]
pub struct Piecewise<T> {
    cuts: Vec<Scalar>,
    segs: Vec<T>,
}

impl<T> Default for Piecewise<T> {
    fn default() -> Self {
        Self {
            cuts: Vec::new(),
            segs: Vec::new(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Piecewise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, seg) in self.segs.iter().enumerate() {
            writeln!(
                f,
                "[{:.4}, {:.4}] {:?}",
                self.cuts[index],
                self.cuts[index + 1],
                seg
            )?;
        }
        Ok(())
    }
}

impl<T: Piece> Piecewise<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single piece over `[0, 1]`
    pub fn from_piece(seg: T) -> Self {
        Self {
            cuts: vec![0.0, 1.0],
            segs: vec![seg],
        }
    }

    /// Construct from cuts and pieces, `None` if the invariant does not hold
    pub fn from_parts(cuts: Vec<Scalar>, segs: Vec<T>) -> Option<Self> {
        let valid = (segs.is_empty() && cuts.is_empty())
            || (cuts.len() == segs.len() + 1 && cuts.windows(2).all(|pair| pair[0] < pair[1]));
        valid.then_some(Self { cuts, segs })
    }

    pub fn cuts(&self) -> &[Scalar] {
        &self.cuts
    }

    pub fn segs(&self) -> &[T] {
        &self.segs
    }

    pub fn len(&self) -> usize {
        self.segs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    /// Interval on which function is defined
    pub fn domain(&self) -> Option<(Scalar, Scalar)> {
        Some((*self.cuts.first()?, *self.cuts.last()?))
    }

    /// Append piece covering `[from, to]`, zero width pieces are ignored
    ///
    /// `from` is only used for the first piece, later pieces start at the last cut.
    pub fn push(&mut self, seg: T, from: Scalar, to: Scalar) {
        if self.cuts.is_empty() {
            self.cuts.push(from);
        }
        if let Some(last) = self.cuts.last() {
            if to <= *last {
                return;
            }
        }
        self.cuts.push(to);
        self.segs.push(seg);
    }

    /// Index of the piece containing the parameter, values outside of the domain
    /// are mapped onto the first or the last piece.
    pub fn segment_index(&self, x: Scalar) -> usize {
        if self.segs.len() <= 1 {
            return 0;
        }
        let inner = &self.cuts[1..self.cuts.len() - 1];
        inner.partition_point(|cut| *cut <= x)
    }

    /// Local parameter of `x` inside of the piece with `index`
    fn local(&self, index: usize, x: Scalar) -> Scalar {
        let (c0, c1) = (self.cuts[index], self.cuts[index + 1]);
        (x - c0) / (c1 - c0)
    }

    /// Evaluate function at the parameter `x`
    pub fn at(&self, x: Scalar) -> Option<T::Value> {
        if self.is_empty() {
            return None;
        }
        let index = self.segment_index(x);
        Some(self.segs[index].eval(self.local(index, x)))
    }

    /// Value at the start of the domain
    pub fn first_value(&self) -> Option<T::Value> {
        self.segs.first().map(|seg| seg.eval(0.0))
    }

    /// Value at the end of the domain
    pub fn last_value(&self) -> Option<T::Value> {
        self.segs.last().map(|seg| seg.eval(1.0))
    }

    /// Append other function, its domain is shifted to start at the end of this one
    pub fn concat(&mut self, other: &Self) {
        let (Some((start, _)), Some(end)) = (other.domain(), self.cuts.last().copied()) else {
            if self.is_empty() {
                *self = other.clone();
            }
            return;
        };
        for (index, seg) in other.segs.iter().enumerate() {
            let to = other.cuts[index + 1] - start + end;
            self.push(seg.clone(), end, to);
        }
    }

    /// Derivative with respect to the global parameter
    pub fn derivative(&self) -> Self {
        Self {
            cuts: self.cuts.clone(),
            segs: self
                .segs
                .iter()
                .enumerate()
                .map(|(index, seg)| {
                    let width = self.cuts[index + 1] - self.cuts[index];
                    seg.deriv().scale(1.0 / width)
                })
                .collect(),
        }
    }

    /// Split pieces so cuts of the result are the provided `cuts`
    ///
    /// `cuts` must be sorted and include all cuts of this function inside of the range
    /// they cover.
    pub fn partition(&self, cuts: &[Scalar]) -> Self {
        let mut result = Self::new();
        if self.is_empty() {
            return result;
        }
        for pair in cuts.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b <= a {
                continue;
            }
            let index = self.segment_index((a + b) / 2.0);
            let seg = self.segs[index].portion(self.local(index, a), self.local(index, b));
            result.push(seg, a, b);
        }
        result
    }

    /// Drop pieces shorter than `tolerance`, the following piece takes over their interval
    pub fn remove_short_cuts(&self, tolerance: Scalar) -> Self {
        let mut result = Self::new();
        let Some(start) = self.cuts.first().copied() else {
            return result;
        };
        result.cuts.push(start);
        let last = self.segs.len() - 1;
        for (index, seg) in self.segs.iter().enumerate() {
            if self.cuts[index + 1] - self.cuts[index] >= tolerance || index == last {
                result.cuts.push(self.cuts[index + 1]);
                result.segs.push(seg.clone());
            }
        }
        result
    }

    /// Linearly remap domain onto `[a, b]`
    pub fn set_domain(&mut self, a: Scalar, b: Scalar) {
        let Some((start, end)) = self.domain() else {
            return;
        };
        let scale = (b - a) / (end - start);
        for cut in self.cuts.iter_mut() {
            *cut = a + (*cut - start) * scale;
        }
    }
}

/// Merge two sorted cut lists restricted to their common range
fn merge_cuts(a: &[Scalar], b: &[Scalar]) -> Vec<Scalar> {
    let (Some(a0), Some(a1), Some(b0), Some(b1)) = (a.first(), a.last(), b.first(), b.last())
    else {
        return Vec::new();
    };
    let (start, end) = (a0.max(*b0), a1.min(*b1));
    let mut cuts: Vec<Scalar> = a
        .iter()
        .chain(b.iter())
        .copied()
        .filter(|cut| *cut >= start && *cut <= end)
        .collect();
    cuts.sort_by(|x, y| x.total_cmp(y));
    let tolerance = 1e-12 * (1.0 + (end - start).abs());
    cuts.dedup_by(|x, y| (*x - *y).abs() <= tolerance);
    cuts
}

impl Piecewise<Poly> {
    /// Minimum and maximum values over the whole domain
    pub fn bounds(&self) -> Option<(Scalar, Scalar)> {
        self.segs.iter().map(Poly::bounds).reduce(|(min0, max0), (min1, max1)| {
            (min0.min(min1), max0.max(max1))
        })
    }

    /// Add a constant to the values
    pub fn shift(&self, value: Scalar) -> Self {
        Self {
            cuts: self.cuts.clone(),
            segs: self.segs.iter().map(|seg| seg.shift(value)).collect(),
        }
    }

    /// Multiply values by a constant
    pub fn scale(&self, k: Scalar) -> Self {
        Self {
            cuts: self.cuts.clone(),
            segs: self.segs.iter().map(|seg| seg.scale(k)).collect(),
        }
    }

    /// Pointwise product of a scalar function and a curve
    pub fn mul_curve(&self, curve: &Piecewise<Fragment>) -> Piecewise<Fragment> {
        let cuts = merge_cuts(&self.cuts, &curve.cuts);
        let scalar = self.partition(&cuts);
        let curve = curve.partition(&cuts);
        Piecewise {
            cuts: scalar.cuts,
            segs: scalar
                .segs
                .iter()
                .zip(curve.segs.iter())
                .map(|(s, c)| Fragment::new(s * &c.x, s * &c.y))
                .collect(),
        }
    }
}

impl Piecewise<Fragment> {
    /// Curve of the sub-path, each segment occupies unit interval of the parameter
    pub fn from_subpath(subpath: &SubPath) -> Self {
        let mut result = Self::new();
        for (index, segment) in subpath.segments().iter().enumerate() {
            let from = index as Scalar;
            result.push(Fragment::from_segment(*segment), from, from + 1.0);
        }
        result
    }

    /// Curve of all sub-paths concatenated together
    pub fn from_path(path: &Path) -> Self {
        let mut result = Self::new();
        for subpath in path.subpaths() {
            result.concat(&Self::from_subpath(subpath));
        }
        result
    }

    /// Split the curve into independent `x` and `y` scalar functions with the same cuts
    pub fn make_cuts_independent(&self) -> (Piecewise<Poly>, Piecewise<Poly>) {
        let x = Piecewise {
            cuts: self.cuts.clone(),
            segs: self.segs.iter().map(|seg| seg.x.clone()).collect(),
        };
        let y = Piecewise {
            cuts: self.cuts.clone(),
            segs: self.segs.iter().map(|seg| seg.y.clone()).collect(),
        };
        (x, y)
    }

    /// Rotate every value by 90 degrees
    pub fn rot90(&self) -> Self {
        Self {
            cuts: self.cuts.clone(),
            segs: self.segs.iter().map(Fragment::rot90).collect(),
        }
    }

    /// Total arc length of the curve
    pub fn length(&self) -> Scalar {
        self.segs.iter().map(|seg| seg.length(0.0, 1.0)).sum()
    }

    /// Pointwise sum of two curves over their common domain
    pub fn add(&self, other: &Self) -> Self {
        let cuts = merge_cuts(&self.cuts, &other.cuts);
        let left = self.partition(&cuts);
        let right = other.partition(&cuts);
        Piecewise {
            cuts: left.cuts,
            segs: left
                .segs
                .iter()
                .zip(right.segs.iter())
                .map(|(l, r)| l + r)
                .collect(),
        }
    }

    /// Composition `self(g(t))`
    ///
    /// Each piece of `g` is split at parameters where it crosses cuts of this curve,
    /// so every resulting piece is a polynomial composition. Values of `g` outside of
    /// the domain extrapolate the first or the last piece.
    pub fn compose(&self, g: &Piecewise<Poly>) -> Self {
        let mut result = Self::new();
        if self.is_empty() {
            return result;
        }
        let inner = &self.cuts[1..self.cuts.len() - 1];
        for (index, poly) in g.segs.iter().enumerate() {
            let (a, b) = (g.cuts[index], g.cuts[index + 1]);
            let mut splits = vec![0.0, 1.0];
            for cut in inner {
                splits.extend(
                    poly.shift(-cut)
                        .roots()
                        .into_iter()
                        .filter(|u| *u > 1e-12 && *u < 1.0 - 1e-12),
                );
            }
            splits.sort_by(|x, y| x.total_cmp(y));
            splits.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
            for pair in splits.windows(2) {
                let (u0, u1) = (pair[0], pair[1]);
                let sub = poly.portion(u0, u1);
                let seg_index = self.segment_index(sub.eval(0.5));
                let (c0, c1) = (self.cuts[seg_index], self.cuts[seg_index + 1]);
                let local = sub.shift(-c0).scale(1.0 / (c1 - c0));
                let piece = self.segs[seg_index].compose(&local);
                result.push(piece, a + (b - a) * u0, a + (b - a) * u1);
            }
        }
        result
    }

    /// Re-parametrize curve so that parameter equals the distance travelled along it
    ///
    /// Result is defined on `[0, length]`, pieces of zero length are dropped. Inverse arc
    /// length function is approximated by cubic hermite interpolation, pieces are
    /// subdivided until arc length error is within `tolerance`.
    pub fn arc_length_parametrization(&self, tolerance: Scalar) -> Self {
        tracing::debug_span!("[arc_length_parametrization]").in_scope(|| {
            let mut result = Self::new();
            let mut length = 0.0;
            for seg in self.segs.iter() {
                let deriv = seg.deriv();
                arc_length_rec(seg, &deriv, 0.0, 1.0, tolerance, 0, &mut length, &mut result);
            }
            result
        })
    }

    /// Make consecutive pieces join exactly
    ///
    /// Ends closer than `tolerance` (any distance if `tolerance <= 0`) are moved to
    /// their middle point. With `closed` the last piece is joined to the first one.
    pub fn force_continuity(&self, tolerance: Scalar, closed: bool) -> Self {
        let mut result = self.clone();
        let count = result.segs.len();
        if count == 0 {
            return result;
        }
        let joins = if closed { count } else { count - 1 };
        for prev in 0..joins {
            let next = (prev + 1) % count;
            let p0 = result.segs[prev].at(1.0);
            let p1 = result.segs[next].at(0.0);
            if tolerance <= 0.0 || p0.dist(p1) < tolerance {
                let mid = (p0 + p1) / 2.0;
                result.segs[prev].move_end(mid);
                result.segs[next].move_start(mid);
            }
        }
        result
    }

    /// Convert to path, discontinuities start new sub-paths
    ///
    /// Sub-path is closed when its ends coincide within `tolerance`.
    pub fn to_path(&self, tolerance: Scalar) -> Path {
        let mut subpaths = Vec::new();
        let mut current: Vec<Segment> = Vec::new();
        let flush = |current: &mut Vec<Segment>, subpaths: &mut Vec<SubPath>| {
            let segments = std::mem::take(current);
            let closed = match (segments.first(), segments.last()) {
                (Some(first), Some(last)) => {
                    first.start().is_near(last.end(), tolerance)
                        && !(segments.len() == 1 && first.is_straight())
                }
                _ => false,
            };
            let segments = match segments.split_last() {
                Some((last, init)) if closed => {
                    let mut segments = init.to_vec();
                    segments.push(last.with_end(segments.first().unwrap_or(last).start()));
                    segments
                }
                _ => segments,
            };
            subpaths.extend(SubPath::new(segments, closed));
        };
        for seg in self.segs.iter() {
            for segment in seg.to_segments(tolerance) {
                let degenerate =
                    segment.is_straight() && segment.start().is_near(segment.end(), EPSILON);
                if degenerate {
                    continue;
                }
                match current.last() {
                    Some(last) if last.end().is_near(segment.start(), tolerance) => {
                        let start = last.end();
                        current.push(segment.with_start(start));
                    }
                    Some(_) => {
                        flush(&mut current, &mut subpaths);
                        current.push(segment);
                    }
                    None => current.push(segment),
                }
            }
        }
        flush(&mut current, &mut subpaths);
        Path::new(subpaths)
    }
}

/// Arc length re-parametrization of the `seg` restricted to `[t0, t1]`
#[allow(clippy::too_many_arguments)]
fn arc_length_rec(
    seg: &Fragment,
    deriv: &Fragment,
    t0: Scalar,
    t1: Scalar,
    tolerance: Scalar,
    depth: usize,
    length: &mut Scalar,
    out: &mut Piecewise<Fragment>,
) {
    let speed = |t: Scalar| deriv.at(t).length();
    let len = integrate(speed, t0, t1, 4);
    if len <= EPSILON {
        return;
    }
    let (d0, d1) = (speed(t0), speed(t1));
    // hermite interpolation of the inverse arc length function on the local parameter
    let (m0, m1) = if d0 > EPSILON && d1 > EPSILON {
        (len / d0, len / d1)
    } else {
        (t1 - t0, t1 - t0)
    };
    let reparam = Poly::new(vec![
        t0,
        m0,
        -3.0 * t0 - 2.0 * m0 + 3.0 * t1 - m1,
        2.0 * t0 + m0 - 2.0 * t1 + m1,
    ]);
    let monotonic = reparam
        .deriv()
        .roots()
        .iter()
        .all(|u| *u <= 1e-9 || *u >= 1.0 - 1e-9);
    let accurate = monotonic
        && [0.25, 0.5, 0.75].iter().all(|u| {
            let t = reparam.eval(*u);
            (integrate(speed, t0, t, 4) - u * len).abs() <= tolerance
        });
    if !accurate && depth < 12 {
        let mid = (t0 + t1) / 2.0;
        arc_length_rec(seg, deriv, t0, mid, tolerance, depth + 1, length, out);
        arc_length_rec(seg, deriv, mid, t1, tolerance, depth + 1, length, out);
        return;
    }
    let [_, _, c2, c3] = [0, 1, 2, 3].map(|i| reparam.coeffs().get(i).copied().unwrap_or(0.0));
    let piece = if c2.abs() < 1e-9 && c3.abs() < 1e-9 {
        seg.portion(t0, t1)
    } else {
        seg.compose(&reparam)
    };
    out.push(piece, *length, *length + len);
    *length += len;
}
