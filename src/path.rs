use crate::{
    BBox, Cubic, Curve, EPSILON, EllipArc, Error, Line, PI, Point, Quad, Scalar, Segment,
    SvgPathParser, Transform, ellipse::unit_arc_path, utils::bisect,
};
use std::{
    fmt,
    io::{Read, Write},
    str::FromStr,
};

/// flatness of 0.05px gives good accuracy tradeoff
pub const DEFAULT_FLATNESS: Scalar = 0.05;

/// Tolerance used when piecewise curves are converted back to segments
pub const LPE_CONVERSION_TOLERANCE: Scalar = 1e-4;

/// Corner treatment between two consecutive offset segments
///
/// Limits are expressed as a ratio of the miter length to the stroke width.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum LineJoin {
    Miter(Scalar),
    /// Miter which is cut at the limit instead of falling back to a bevel
    MiterClip(Scalar),
    Bevel,
    Round,
    /// Circular arc extrapolating the incoming segment, miter-clip when the arc is too long
    Extrapolate(Scalar),
}

impl Default for LineJoin {
    fn default() -> Self {
        Self::Miter(4.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Square,
    Round,
    /// Triangle with the tip half of the width away from the end
    Peak,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct StrokeStyle {
    pub width: Scalar,
    pub line_join: LineJoin,
    pub line_cap: LineCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    /// Whether a point with the given winding number is filled
    pub fn is_inside(&self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }
}

/// Distance below which ends of a closed sub-path are considered identical
pub const CLOSE_TOLERANCE: Scalar = 1e-9;

/// Position on a sub-path, integer part is the index of the segment and
/// fractional part is the parameter of the curve
pub type PathTime = Scalar;

/// Non-empty collections of segments where end of each segments conisides with the start of the next one.
///
/// Closed sub-path always ends exactly where it has started, closing line is stored explicitly.
#[derive(Clone, PartialEq)]
pub struct SubPath {
    /// List of segments representing SubPath
    segments: Vec<Segment>,
    /// Whether SubPath is closed
    closed: bool,
}

impl fmt::Debug for SubPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments.iter() {
            writeln!(f, "{:?}", segment)?;
        }
        if self.closed {
            writeln!(f, "Close")?;
        } else {
            writeln!(f, "End")?
        }
        Ok(())
    }
}

impl SubPath {
    /// Create sub-path, closed sub-path gets a closing line if its ends do not match
    ///
    /// Ends which are closer than `CLOSE_TOLERANCE` are snapped together instead.
    pub fn new(mut segments: Vec<Segment>, closed: bool) -> Option<Self> {
        let first = segments.first()?.start();
        let last = segments.last_mut()?;
        if closed && !last.end().is_close_to(first) {
            if last.end().is_near(first, CLOSE_TOLERANCE) {
                *last = last.with_end(first);
            } else {
                let line = Line::new(last.end(), first);
                segments.push(line.into());
            }
        }
        Some(Self { segments, closed })
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn first(&self) -> Segment {
        *self.segments.first().expect("SubPath is never emtpy")
    }

    pub fn last(&self) -> Segment {
        *self.segments.last().expect("SubPath is never empty")
    }

    /// Apply transformation to the sub-path in place
    pub fn transform(&mut self, tr: Transform) {
        for segment in self.segments.iter_mut() {
            *segment = segment.transform(tr);
        }
    }

    /// Convert sub-path to an iterator over line segments
    ///
    /// With `close` open sub-path gets an extra line from its end to its start.
    pub fn flatten(
        &self,
        tr: Transform,
        flatness: Scalar,
        close: bool,
    ) -> impl Iterator<Item = Line> + '_ {
        let last = if close && !self.closed && !self.end().is_close_to(self.start()) {
            Some(Line::new(self.end(), self.start()).transform(tr))
        } else {
            None
        };
        self.segments
            .iter()
            .flat_map(move |segment| segment.flatten(tr, flatness))
            .chain(last)
    }

    pub fn start(&self) -> Point {
        self.first().start()
    }

    pub fn end(&self) -> Point {
        self.last().end()
    }

    pub fn bbox(&self, init: Option<BBox>, tr: Transform) -> BBox {
        self.segments
            .iter()
            .fold(init, |bbox, seg| Some(seg.transform(tr).bbox(bbox)))
            .expect("SubPath is never empty")
    }

    pub fn reverse(&self) -> Self {
        Self {
            segments: self.segments.iter().rev().map(|s| s.reverse()).collect(),
            closed: self.closed,
        }
    }

    /// Node positions, closed sub-path has one node per segment
    pub fn nodes(&self) -> Vec<Point> {
        let mut nodes: Vec<_> = self.segments.iter().map(Segment::start).collect();
        if !self.closed {
            nodes.push(self.end());
        }
        nodes
    }

    pub fn nodes_count(&self) -> usize {
        if self.closed {
            self.segments.len()
        } else {
            self.segments.len() + 1
        }
    }

    /// Convert quadratic segments to cubic ones
    pub fn to_line_and_cubic(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(Segment::to_line_or_cubic)
                .collect(),
            closed: self.closed,
        }
    }

    /// Split path time into segment index and curve parameter
    pub fn split_time(&self, time: PathTime) -> (usize, Scalar) {
        let last = self.segments.len() - 1;
        let time = time.clamp(0.0, self.segments.len() as Scalar);
        let index = (time.floor() as usize).min(last);
        (index, time - index as Scalar)
    }

    /// Evaluate sub-path at path time
    pub fn at(&self, time: PathTime) -> Point {
        let (index, t) = self.split_time(time);
        self.segments[index].at(t)
    }

    /// Segments covering path time range `[t0, t1]`, where `t0 <= t1`
    pub fn portion(&self, t0: PathTime, t1: PathTime) -> Vec<Segment> {
        let (i0, s0) = self.split_time(t0);
        let (i1, s1) = self.split_time(t1);
        let mut result = Vec::new();
        if i0 == i1 {
            if s1 - s0 > EPSILON {
                result.push(self.segments[i0].cut(s0, s1));
            }
            return result;
        }
        if s0 < 1.0 - EPSILON {
            result.push(self.segments[i0].cut(s0, 1.0));
        }
        result.extend(self.segments[i0 + 1..i1].iter().copied());
        if s1 > EPSILON {
            result.push(self.segments[i1].cut(0.0, s1));
        }
        result
    }

    /// Signed area enclosed by the sub-path, positive for counter-clockwise direction
    /// when y-axis points up.
    pub fn signed_area(&self) -> Scalar {
        self.flatten(Transform::identity(), DEFAULT_FLATNESS / 10.0, true)
            .map(|Line([p0, p1])| p0.cross(p1))
            .sum::<Scalar>()
            / 2.0
    }

    /// Whether sub-path goes counter-clockwise (y-axis pointing up)
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Winding number of the sub-path around the point
    ///
    /// Open sub-path is treated as closed with a straight line. Positive for
    /// counter-clockwise direction.
    pub fn winding(&self, point: Point) -> i32 {
        let tr = Transform::new_translate(-point.x(), -point.y());
        let closing = if !self.closed && !self.end().is_close_to(self.start()) {
            Some(Segment::from(Line::new(self.end(), self.start())))
        } else {
            None
        };
        self.segments
            .iter()
            .copied()
            .chain(closing)
            .map(|segment| segment_winding(segment.transform(tr)))
            .sum()
    }

    /// Find nearest point on the sub-path, returns path time and distance
    pub fn nearest(&self, point: Point) -> (PathTime, Scalar) {
        self.segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let (t, dist) = segment.nearest(point);
                (index as Scalar + t, dist)
            })
            .fold((0.0, Scalar::INFINITY), |best, candidate| {
                if candidate.1 < best.1 { candidate } else { best }
            })
    }

    /// Offset whole sub-path to the distance `dist`
    ///
    /// Positive distance offsets to the right side of the direction of travel (outside of
    /// a counter-clockwise contour), segments are connected with a join specified by `style`.
    pub fn offset(&self, dist: Scalar, style: StrokeStyle) -> Option<SubPath> {
        let style = StrokeStyle {
            width: 2.0 * dist.abs(),
            ..style
        };
        let mut segments = Vec::new();
        for segment in self.segments.iter() {
            offset_segment(&mut segments, *segment, dist, style, Segment::line_join);
        }
        if self.closed {
            if let (Some(first), Some(last)) = (segments.first().copied(), segments.last().copied())
            {
                segments.extend(last.line_join(first, style));
            }
        }
        SubPath::new(segments, self.closed)
    }
}

/// Winding contribution of the segment around the origin
///
/// Segment is cut into pieces monotonic along y-axis, each piece crossing the positive
/// x-axis counts with half-open rule so shared end points are counted once.
fn segment_winding(segment: Segment) -> i32 {
    let bbox = segment.bbox(None);
    if bbox.max().x() <= 0.0 || bbox.min().y() > 0.0 || bbox.max().y() <= 0.0 {
        return 0;
    }
    let mut cuts: Vec<Scalar> = segment
        .extremities()
        .filter(|t| *t > EPSILON && *t < 1.0 - EPSILON)
        .collect();
    cuts.sort_by(|a, b| a.total_cmp(b));
    cuts.push(1.0);
    let mut winding = 0;
    let mut prev = 0.0;
    for cut in cuts {
        let piece = segment.cut(prev, cut);
        prev = cut;
        let (y0, y1) = (piece.start().y(), piece.end().y());
        let direction = if y0 <= 0.0 && y1 > 0.0 {
            1
        } else if y1 <= 0.0 && y0 > 0.0 {
            -1
        } else {
            continue;
        };
        let t = bisect(|t| piece.at(t).y(), 0.0, 1.0, 1e-12);
        if piece.at(t).x() > 0.0 {
            winding += direction;
        }
    }
    winding
}

/// Collection of the SubPath treated as a signle unit
#[derive(Clone, PartialEq, Default)]
pub struct Path {
    subpaths: Vec<SubPath>,
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subpaths.is_empty() {
            write!(f, "Empty")?;
        } else {
            for subpath in self.subpaths.iter() {
                subpath.fmt(f)?
            }
        }
        Ok(())
    }
}

impl Path {
    /// Create path from the list of subpaths
    pub fn new(subpaths: Vec<SubPath>) -> Self {
        Self { subpaths }
    }

    pub fn empty() -> Self {
        Self {
            subpaths: Default::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }

    pub fn subpaths(&self) -> &[SubPath] {
        &self.subpaths
    }

    pub fn push(&mut self, subpath: SubPath) {
        self.subpaths.push(subpath)
    }

    /// Convenience method to create `PathBuilder`
    pub fn builder() -> PathBuilder {
        PathBuilder::new()
    }

    pub fn into_builder(self) -> PathBuilder {
        PathBuilder::from_path(self)
    }

    /// Apply transformation to the path in place
    pub fn transform(&mut self, tr: Transform) {
        for subpath in self.subpaths.iter_mut() {
            subpath.transform(tr);
        }
    }

    /// Transformed copy of the path
    pub fn transformed(&self, tr: Transform) -> Self {
        let mut path = self.clone();
        path.transform(tr);
        path
    }

    pub fn segments_count(&self) -> usize {
        self.subpaths
            .iter()
            .fold(0usize, |acc, subpath| acc + subpath.segments().len())
    }

    pub fn nodes_count(&self) -> usize {
        self.subpaths.iter().map(SubPath::nodes_count).sum()
    }

    /// Node positions of all sub-paths
    pub fn nodes(&self) -> Vec<Point> {
        self.subpaths.iter().flat_map(SubPath::nodes).collect()
    }

    /// Convert quadratic segments to cubic ones
    pub fn to_line_and_cubic(&self) -> Self {
        Self {
            subpaths: self
                .subpaths
                .iter()
                .map(SubPath::to_line_and_cubic)
                .collect(),
        }
    }

    /// Stroke path
    ///
    /// Stroked path is the path constructed from original by offsetting by `distance/2` and
    /// joinging it with the path offsetted by `-distance/2`. Closed sub-paths produce two
    /// contours with opposite directions.
    /// Resource usefull for debugging: https://yqnn.github.io/svg-path-editor/
    pub fn stroke(&self, style: StrokeStyle) -> Path {
        let dist = style.width / 2.0;
        let mut subpaths = Vec::new();
        for subpath in self.subpaths.iter() {
            if subpath.closed() {
                subpaths.extend(subpath.offset(dist, style));
                subpaths.extend(subpath.reverse().offset(dist, style));
                continue;
            }
            let mut segments = Vec::new();
            // forward
            for segment in subpath.segments().iter() {
                offset_segment(&mut segments, *segment, dist, style, Segment::line_join);
            }
            let mut backward = subpath.segments.iter().rev().map(Segment::reverse);
            // cap
            if let Some(segment) = backward.next() {
                offset_segment(&mut segments, segment, dist, style, Segment::line_cap);
            }
            // backward
            for segment in backward {
                offset_segment(&mut segments, segment, dist, style, Segment::line_join);
            }
            // cap
            let last = segments.last().copied();
            let first = segments.first().copied();
            if let (Some(last), Some(first)) = (last, first) {
                segments.extend(last.line_cap(first, style));
            }
            subpaths.extend(SubPath::new(segments, /* closed = */ true));
        }
        Path::new(subpaths)
    }

    /// Convert path to an iterator over line segments
    pub fn flatten(
        &self,
        tr: Transform,
        flatness: Scalar,
        close: bool,
    ) -> impl Iterator<Item = Line> + '_ {
        self.subpaths
            .iter()
            .flat_map(move |subpath| subpath.flatten(tr, flatness, close))
    }

    /// Bounding box of the path after provided transformation is applied.
    pub fn bbox(&self, tr: Transform) -> Option<BBox> {
        self.subpaths
            .iter()
            .fold(None, |bbox, subpath| Some(subpath.bbox(bbox, tr)))
    }

    /// Rreverse order and direction of all segments
    pub fn reverse(&self) -> Self {
        Self {
            subpaths: self.subpaths.iter().map(|s| s.reverse()).collect(),
        }
    }

    /// Winding number of the path around the point
    pub fn winding(&self, point: Point) -> i32 {
        self.subpaths.iter().map(|sp| sp.winding(point)).sum()
    }

    /// Whether point is inside of the path according to the fill rule
    pub fn contains(&self, point: Point, fill_rule: FillRule) -> bool {
        fill_rule.is_inside(self.winding(point))
    }

    /// Find the nearest point of the path
    ///
    /// Returns index of the sub-path, path time inside of it and the distance.
    pub fn nearest(&self, point: Point) -> Option<(usize, PathTime, Scalar)> {
        self.subpaths
            .iter()
            .enumerate()
            .map(|(index, subpath)| {
                let (time, dist) = subpath.nearest(point);
                (index, time, dist)
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    /// Save path in SVG path format.
    ///
    /// Closing line of a closed sub-path is represented by `Z` command.
    pub fn save(&self, mut out: impl Write) -> std::io::Result<()> {
        for subpath in self.subpaths.iter() {
            write!(&mut out, "M{:?} ", subpath.start())?;
            let segments = match subpath.segments() {
                [init @ .., Segment::Line(_)] if subpath.closed() && !init.is_empty() => init,
                segments => segments,
            };
            let mut segment_type: Option<u8> = None;
            for segment in segments.iter() {
                match segment {
                    Segment::Line(line) => {
                        if segment_type.replace(b'L') != Some(b'L') {
                            out.write_all(b"L")?;
                        }
                        write!(&mut out, "{:?} ", line.end())?;
                    }
                    Segment::Quad(quad) => {
                        let [_, p1, p2] = quad.points();
                        if segment_type.replace(b'Q') != Some(b'Q') {
                            out.write_all(b"Q")?;
                        }
                        write!(&mut out, "{:?} {:?} ", p1, p2)?;
                    }
                    Segment::Cubic(cubic) => {
                        let [_, p1, p2, p3] = cubic.points();
                        if segment_type.replace(b'C') != Some(b'C') {
                            out.write_all(b"C")?;
                        }
                        write!(&mut out, "{:?} {:?} {:?} ", p1, p2, p3)?;
                    }
                }
            }
            if subpath.closed() {
                out.write_all(b"Z")?;
            }
        }
        Ok(())
    }

    /// Convert path to SVG path representation
    pub fn to_svg_path(&self) -> String {
        let mut output = Vec::new();
        self.save(&mut output).expect("failed in memory write");
        String::from_utf8(output).expect("path save internal error")
    }

    /// Load path from SVG path representation
    pub fn load(input: impl Read) -> Result<Self, Error> {
        let mut builder = PathBuilder::new();
        for cmd in SvgPathParser::new(input) {
            cmd?.apply(&mut builder);
        }
        Ok(builder.build())
    }
}

impl IntoIterator for Path {
    type Item = SubPath;
    type IntoIter = <Vec<SubPath> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.subpaths.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a SubPath;
    type IntoIter = <&'a Vec<SubPath> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.subpaths.iter()
    }
}

impl Extend<SubPath> for Path {
    fn extend<T: IntoIterator<Item = SubPath>>(&mut self, iter: T) {
        self.subpaths.extend(iter)
    }
}

impl FromIterator<SubPath> for Path {
    fn from_iter<T: IntoIterator<Item = SubPath>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Extend segments with the offset segment and join between those segments.
fn offset_segment<F, S>(
    segments: &mut Vec<Segment>,
    segment: Segment,
    dist: Scalar,
    style: StrokeStyle,
    join: F,
) where
    F: Fn(Segment, Segment, StrokeStyle) -> S,
    S: IntoIterator<Item = Segment>,
{
    let offset = segments.len();
    segment.offset(dist, segments);
    if offset != 0 {
        let src = segments.get(offset - 1).copied();
        let dst = segments.get(offset).copied();
        if let (Some(src), Some(dst)) = (src, dst) {
            segments.splice(offset..offset, join(src, dst, style));
        }
    }
}

/// Path builder similar to Canvas/Cairo interface.
#[derive(Clone)]
pub struct PathBuilder {
    position: Point,
    subpath: Vec<Segment>,
    subpaths: Vec<SubPath>,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PathBuilder {
    pub fn new() -> Self {
        Self {
            position: Point::new(0.0, 0.0),
            subpath: Default::default(),
            subpaths: Default::default(),
        }
    }

    pub fn from_path(path: Path) -> Self {
        let mut builder = Self::new();
        builder.subpaths = path.subpaths;
        builder
    }

    /// Build path
    pub fn build(&mut self) -> Path {
        let PathBuilder {
            subpath,
            mut subpaths,
            ..
        } = std::mem::take(self);
        subpaths.extend(SubPath::new(subpath, false));
        Path::new(subpaths)
    }

    /// Extend path from string, which is specified in the same format as SVGs path element.
    pub fn append_svg_path(&mut self, string: impl AsRef<[u8]>) -> Result<&mut Self, Error> {
        for cmd in SvgPathParser::new(string.as_ref()) {
            cmd?.apply(self);
        }
        Ok(self)
    }

    /// Move current position, ending current subpath
    pub fn move_to(&mut self, p: impl Into<Point>) -> &mut Self {
        let subpath = std::mem::take(&mut self.subpath);
        self.subpaths.extend(SubPath::new(subpath, false));
        self.position = p.into();
        self
    }

    /// Close current subpath, closing line is added if needed
    pub fn close(&mut self) -> &mut Self {
        let subpath = std::mem::take(&mut self.subpath);
        if let Some(seg) = subpath.first() {
            self.position = seg.start();
        }
        self.subpaths.extend(SubPath::new(subpath, true));
        self
    }

    /// Add line from the current position to the specified point
    pub fn line_to(&mut self, p: impl Into<Point>) -> &mut Self {
        let p = p.into();
        if !self.position.is_close_to(p) {
            let line = Line::new(self.position, p);
            self.position = line.end();
            self.subpath.push(line.into());
        }
        self
    }

    /// Add quadratic bezier curve
    pub fn quad_to(&mut self, p1: impl Into<Point>, p2: impl Into<Point>) -> &mut Self {
        let quad = Quad::new(self.position, p1, p2);
        self.position = quad.end();
        self.subpath.push(quad.into());
        self
    }

    /// Add cubic beizer curve
    pub fn cubic_to(
        &mut self,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> &mut Self {
        let cubic = Cubic::new(self.position, p1, p2, p3);
        self.position = cubic.end();
        self.subpath.push(cubic.into());
        self
    }

    /// Add segment starting at the current position
    pub fn segment(&mut self, segment: Segment) -> &mut Self {
        match segment {
            Segment::Line(line) => self.line_to(line.end()),
            segment => {
                self.position = segment.end();
                self.subpath.push(segment);
                self
            }
        }
    }

    /// Add elliptic arc segment
    pub fn arc_to(
        &mut self,
        radii: impl Into<Point>,
        x_axis_rot: Scalar,
        large: bool,
        sweep: bool,
        p: impl Into<Point>,
    ) -> &mut Self {
        let radii: Point = radii.into();
        let p = p.into();
        let arc = EllipArc::new_param(
            self.position,
            p,
            radii.x(),
            radii.y(),
            x_axis_rot,
            large,
            sweep,
        );
        match arc {
            None => self.line_to(p),
            Some(arc) => {
                self.subpath.extend(arc.to_cubics().map(Segment::from));
                self.position = p;
                self
            }
        }
    }

    /// Add circle with the center at current position and provided radius.
    ///
    /// Current position is not changed after invocation.
    pub fn circle(&mut self, radius: Scalar) -> &mut Self {
        let center = self.position();
        let tr = Transform::new_translate(center.x(), center.y()).scale(radius, radius);
        self.move_to(center);
        self.subpaths.extend(unit_arc_path(0.0, 2.0 * PI, false, tr));
        self
    }

    /// Current possition of the builder
    pub fn position(&self) -> Point {
        self.position
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Path {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_svg_path().trim_end())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Path {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(text: &str) -> Result<Path, Self::Err> {
        Path::load(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    pub(crate) const SQUIRREL: &str = r#"
    M12 1C9.79 1 8 2.31 8 3.92c0 1.94.5 3.03 0 6.08 0-4.5-2.77-6.34-4-6.34.05-.5-.48
    -.66-.48-.66s-.22.11-.3.34c-.27-.31-.56-.27-.56-.27l-.13.58S.7 4.29 .68 6.87c.2.33
    1.53.6 2.47.43.89.05.67.79.47.99C2.78 9.13 2 8 1 8S0 9 1 9s1 1 3 1c-3.09 1.2 0 4 0 4
    H3c-1 0-1 1-1 1h6c3 0 5-1 5-3.47 0-.85-.43-1.79 -1-2.53-1.11-1.46.23-2.68 1-2
    .77.68 3 1 3-2 0-2.21-1.79-4-4-4zM2.5 6 c-.28 0-.5-.22-.5-.5s.22-.5.5-.5.5.22.5.5
    -.22.5-.5.5z
    "#;

    #[test]
    fn test_bbox() {
        let path: Path = SQUIRREL.parse().unwrap();
        let bbox = path.bbox(Transform::default()).unwrap();
        assert_approx_eq!(bbox.x(), 0.25, 1e-9);
        assert_approx_eq!(bbox.y(), 1.0, 1e-9);
        assert_approx_eq!(bbox.width(), 15.75, 1e-9);
        assert_approx_eq!(bbox.height(), 14.0, 1e-9);
    }

    #[test]
    fn test_path_parse() -> Result<(), Error> {
        let path: Path = SQUIRREL.parse()?;
        assert_eq!(path.subpaths().len(), 2);
        assert!(path.subpaths().iter().all(SubPath::closed));
        assert_eq!(path.subpaths()[0].segments().len(), 22);
        assert_eq!(path.subpaths()[1].segments().len(), 4);

        let path: Path = " M0,0L1-1L1,0ZL0,1 L1,1Z ".parse()?;
        let reference = Path::new(vec![
            SubPath::new(
                vec![
                    Line::new((0.0, 0.0), (1.0, -1.0)).into(),
                    Line::new((1.0, -1.0), (1.0, 0.0)).into(),
                    Line::new((1.0, 0.0), (0.0, 0.0)).into(),
                ],
                true,
            )
            .unwrap(),
            SubPath::new(
                vec![
                    Line::new((0.0, 0.0), (0.0, 1.0)).into(),
                    Line::new((0.0, 1.0), (1.0, 1.0)).into(),
                ],
                true,
            )
            .unwrap(),
        ]);
        assert_eq!(format!("{:?}", path), format!("{:?}", reference));
        assert_eq!(path.subpaths()[1].segments().len(), 3);
        Ok(())
    }

    #[test]
    fn test_save_load() -> Result<(), Error> {
        let path: Path = SQUIRREL.parse()?;
        let mut path_save = Vec::new();
        path.save(&mut path_save)?;
        let path_load = Path::load(std::io::Cursor::new(path_save))?;
        assert_eq!(format!("{:?}", path), format!("{:?}", path_load));

        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        assert_eq!(square.to_svg_path(), "M0,0 L10,0 10,10 0,10 Z");
        Ok(())
    }

    #[test]
    fn test_flatten() -> Result<(), Error> {
        let path: Path = SQUIRREL.parse()?;
        let tr = Transform::default()
            .rotate(PI / 3.0)
            .translate(-10.0, -20.0);
        for subpath in path.subpaths() {
            let lines: Vec<_> = subpath.flatten(tr, DEFAULT_FLATNESS, false).collect();
            for ls in lines.windows(2) {
                assert!(ls[0].end().is_close_to(ls[1].start()));
            }
            let first = lines.first().unwrap();
            let last = lines.last().unwrap();
            assert!(last.end().is_near(first.start(), 1e-9));
        }
        Ok(())
    }

    #[test]
    fn test_winding() -> Result<(), Error> {
        let path: Path = r#"
            M50,0 21,90 98,35 2,35 79,90z
            M110,0 h90 v90 h-90z
            M130,20 h50 v50 h-50 z
            M210,0  h90 v90 h-90 z
            M230,20 v50 h50 v-50 z
        "#
        .parse()?;
        let star = Point::new(50.0, 50.0);
        let box0 = Point::new(150.0, 50.0);
        let box1 = Point::new(250.0, 50.0);
        assert_eq!(path.winding(star).abs(), 2);
        assert_eq!(path.winding(box0).abs(), 2);
        assert_eq!(path.winding(box1), 0);
        assert_eq!(path.winding(Point::new(500.0, 50.0)), 0);

        assert!(!path.contains(star, FillRule::EvenOdd));
        assert!(!path.contains(box0, FillRule::EvenOdd));
        assert!(path.contains(star, FillRule::NonZero));
        assert!(path.contains(box0, FillRule::NonZero));
        assert!(!path.contains(box1, FillRule::NonZero));
        // between boxes of the second group
        assert!(path.contains(Point::new(215.0, 50.0), FillRule::NonZero));

        // ray passing exactly through a vertex
        let diamond: Path = "M0,-1 L1,0 L0,1 L-1,0 Z".parse()?;
        assert_eq!(diamond.winding(Point::new(0.0, 0.0)).abs(), 1);
        assert_eq!(diamond.winding(Point::new(-2.0, 0.0)), 0);

        // circle made of cubics
        let circle = Path::builder().move_to((5.0, 5.0)).circle(3.0).build();
        assert_eq!(circle.winding(Point::new(5.0, 5.0)), 1);
        assert_eq!(circle.winding(Point::new(8.5, 5.0)), 0);
        Ok(())
    }

    #[test]
    fn test_signed_area() -> Result<(), Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let subpath = &square.subpaths()[0];
        assert_approx_eq!(subpath.signed_area(), 100.0, 1e-9);
        assert!(subpath.is_ccw());
        assert!(!subpath.reverse().is_ccw());
        assert_eq!(subpath.nodes_count(), 4);
        assert_eq!(subpath.nodes().len(), 4);
        assert_eq!(subpath.winding(Point::new(5.0, 5.0)), 1);

        let open: Path = "M0,0 L10,0 L10,10".parse()?;
        assert_eq!(open.nodes_count(), 3);
        Ok(())
    }

    #[test]
    fn test_nearest_and_portion() -> Result<(), Error> {
        let path: Path = "M0,0 L10,0 L10,10".parse()?;
        let (index, time, dist) = path.nearest(Point::new(12.0, 5.0)).unwrap();
        assert_eq!(index, 0);
        assert_approx_eq!(time, 1.5, 1e-6);
        assert_approx_eq!(dist, 2.0, 1e-6);

        let subpath = &path.subpaths()[0];
        assert!(subpath.at(1.5).is_near(Point::new(10.0, 5.0), 1e-12));
        let portion = subpath.portion(0.5, 1.5);
        assert_eq!(portion.len(), 2);
        assert!(portion[0].start().is_near(Point::new(5.0, 0.0), 1e-12));
        assert!(portion[1].end().is_near(Point::new(10.0, 5.0), 1e-12));
        Ok(())
    }

    #[test]
    fn test_offset_closed() -> Result<(), Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let style = StrokeStyle {
            width: 0.0,
            line_join: LineJoin::Miter(4.0),
            line_cap: LineCap::Butt,
        };
        let outer = square.subpaths()[0].offset(2.0, style).unwrap();
        assert!(outer.closed());
        let bbox = outer.bbox(None, Transform::identity());
        assert_approx_eq!(bbox.x(), -2.0, 1e-9);
        assert_approx_eq!(bbox.y(), -2.0, 1e-9);
        assert_approx_eq!(bbox.width(), 14.0, 1e-9);
        assert!(outer.start().is_close_to(outer.end()));

        let stroke = square.stroke(StrokeStyle {
            width: 2.0,
            ..style
        });
        assert_eq!(stroke.subpaths().len(), 2);
        assert!(stroke.contains(Point::new(0.0, 5.0), FillRule::NonZero));
        assert!(!stroke.contains(Point::new(5.0, 5.0), FillRule::NonZero));
        Ok(())
    }
}
