//! Circle, ellipse and perspective fitting
use crate::{Ellipse, PI, Point, Scalar, Transform};
use nalgebra::{DMatrix, DVector, Matrix2, Matrix6, SMatrix, SVD, SVector, Vector2};
use std::fmt;

/// Relative singular value below which a least squares system is rank deficient
const RANK_TOLERANCE: Scalar = 1e-10;

/// Center and scale used to condition least squares problems
fn normalization(points: &[Point]) -> Option<(Point, Scalar)> {
    if points.is_empty() {
        return None;
    }
    let center = points
        .iter()
        .fold(Point::new(0.0, 0.0), |acc, p| acc + *p)
        / points.len() as Scalar;
    let spread =
        points.iter().map(|p| p.dist(center)).sum::<Scalar>() / points.len() as Scalar;
    if spread < 1e-12 {
        return None;
    }
    Some((center, spread))
}

#[derive(Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: Scalar,
}

impl fmt::Debug for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circle center:{:?} radius:{:.3?}", self.center, self.radius)
    }
}

impl Circle {
    pub fn new(center: impl Into<Point>, radius: Scalar) -> Self {
        Self {
            center: center.into(),
            radius,
        }
    }

    /// Circle having segment `p0, p1` as its diameter
    pub fn from_diameter(p0: Point, p1: Point) -> Option<Self> {
        let radius = p0.dist(p1) / 2.0;
        if radius < 1e-9 {
            return None;
        }
        Some(Self::new((p0 + p1) / 2.0, radius))
    }

    /// Algebraic least squares circle fit
    ///
    /// Minimizes `sum (x^2 + y^2 + D x + E y + F)^2`, requires at least three
    /// points which are not collinear.
    pub fn fit(points: &[Point]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let (origin, scale) = normalization(points)?;
        let local: Vec<Point> = points.iter().map(|p| (*p - origin) / scale).collect();
        let a = DMatrix::from_fn(local.len(), 3, |row, col| match col {
            0 => local[row].x(),
            1 => local[row].y(),
            _ => 1.0,
        });
        let b = DVector::from_fn(local.len(), |row, _| {
            let p = local[row];
            -(p.x() * p.x() + p.y() * p.y())
        });
        let svd = a.svd(true, true);
        let max = svd.singular_values.max();
        if svd.singular_values.min() <= max * RANK_TOLERANCE {
            return None;
        }
        let solution = svd.solve(&b, RANK_TOLERANCE).ok()?;
        let (d, e, f) = (solution[0], solution[1], solution[2]);
        let center = Point::new(-d / 2.0, -e / 2.0);
        let radius_sq = center.x() * center.x() + center.y() * center.y() - f;
        if radius_sq <= 0.0 || !radius_sq.is_finite() {
            return None;
        }
        Some(Self::new(origin + scale * center, radius_sq.sqrt() * scale))
    }

    /// Transformation mapping the unit circle onto this circle
    pub fn unit_transform(&self) -> Transform {
        Transform::new_translate(self.center.x(), self.center.y()).scale(self.radius, self.radius)
    }
}

impl Ellipse {
    /// Least squares fit of a general conic, the conic must be an ellipse
    ///
    /// Requires at least five points, five points in general position lie on the
    /// resulting ellipse exactly.
    pub fn fit(points: &[Point]) -> Option<Self> {
        if points.len() < 5 {
            return None;
        }
        let (origin, scale) = normalization(points)?;
        // scatter matrix of the rows [x^2, xy, y^2, x, y, 1]
        let mut scatter = Matrix6::<Scalar>::zeros();
        for point in points {
            let p = (*point - origin) / scale;
            let (x, y) = (p.x(), p.y());
            let row = SVector::<Scalar, 6>::from([x * x, x * y, y * y, x, y, 1.0]);
            scatter += row * row.transpose();
        }
        let svd = SVD::new(scatter, true, true);
        let v_t = svd.v_t?;
        let values = svd.singular_values;
        let (index, _) = values.argmin();
        let max = values.max();
        let null_count = values.iter().filter(|v| **v <= max * RANK_TOLERANCE).count();
        if null_count > 1 {
            // conic is not unique
            return None;
        }
        let conic = v_t.row(index);
        let [a, b, c, d, e, f] = [0, 1, 2, 3, 4, 5].map(|i| conic[i]);
        ellipse_from_conic([a, b, c, d, e, f])
            .map(|ellipse| {
                let (rx, ry) = ellipse.radii();
                Ellipse::new(
                    origin + scale * ellipse.center(),
                    rx * scale,
                    ry * scale,
                    ellipse.angle(),
                )
            })
    }
}

/// Ellipse of the conic `a x^2 + b xy + c y^2 + d x + e y + f = 0`
fn ellipse_from_conic([a, b, c, d, e, f]: [Scalar; 6]) -> Option<Ellipse> {
    if b * b - 4.0 * a * c >= 0.0 {
        return None;
    }
    let center = Matrix2::new(2.0 * a, b, b, 2.0 * c)
        .lu()
        .solve(&Vector2::new(-d, -e))?;
    let (x0, y0) = (center[0], center[1]);
    let value = a * x0 * x0 + b * x0 * y0 + c * y0 * y0 + d * x0 + e * y0 + f;
    let angle = 0.5 * b.atan2(a - c);
    let (sin, cos) = angle.sin_cos();
    let a1 = a * cos * cos + b * cos * sin + c * sin * sin;
    let c1 = a * sin * sin - b * sin * cos + c * cos * cos;
    let (rx_sq, ry_sq) = (-value / a1, -value / c1);
    if !(rx_sq > 0.0 && ry_sq > 0.0 && rx_sq.is_finite() && ry_sq.is_finite()) {
        return None;
    }
    Some(Ellipse::new(
        Point::new(x0, y0),
        rx_sq.sqrt(),
        ry_sq.sqrt(),
        angle,
    ))
}

/// Projective map of the unit square `(0,0) (1,0) (1,1) (0,1)` onto a quadrilateral
#[derive(Clone, Copy, PartialEq)]
pub struct Perspective([Scalar; 8]);

impl fmt::Debug for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Perspective {:?}", self.0)
    }
}

impl Perspective {
    /// Solve for the map sending unit square corners onto `quad` in order
    ///
    /// Returns `None` if the quadrilateral is not convex or the system is singular.
    pub fn from_square(quad: [Point; 4]) -> Option<Self> {
        if !is_convex(&quad) {
            tracing::debug!("[perspective] quadrilateral is not convex");
            return None;
        }
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let mut a = SMatrix::<Scalar, 8, 8>::zeros();
        let mut b = SVector::<Scalar, 8>::zeros();
        for (index, ((u, v), p)) in square.iter().zip(quad.iter()).enumerate() {
            let (x, y) = (p.x(), p.y());
            let row = 2 * index;
            // x * (h6 u + h7 v + 1) = h0 u + h1 v + h2
            a.row_mut(row)
                .copy_from_slice(&[*u, *v, 1.0, 0.0, 0.0, 0.0, -u * x, -v * x]);
            b[row] = x;
            // y * (h6 u + h7 v + 1) = h3 u + h4 v + h5
            a.row_mut(row + 1)
                .copy_from_slice(&[0.0, 0.0, 0.0, *u, *v, 1.0, -u * y, -v * y]);
            b[row + 1] = y;
        }
        let h = a.lu().solve(&b)?;
        let mut coeffs = [0.0; 8];
        coeffs.copy_from_slice(h.as_slice());
        coeffs
            .iter()
            .all(|c| c.is_finite())
            .then_some(Self(coeffs))
    }

    /// Map point of the square space
    pub fn apply(&self, point: Point) -> Option<Point> {
        let [h0, h1, h2, h3, h4, h5, h6, h7] = self.0;
        let (u, v) = (point.x(), point.y());
        let w = h6 * u + h7 * v + 1.0;
        if w.abs() < 1e-12 {
            return None;
        }
        Some(Point::new(
            (h0 * u + h1 * v + h2) / w,
            (h3 * u + h4 * v + h5) / w,
        ))
    }

    /// Image of the circle inscribed into the unit square
    pub fn inscribed_ellipse(&self) -> Option<Ellipse> {
        let points = (0..5)
            .map(|index| {
                let angle = 2.0 * PI * index as Scalar / 5.0;
                self.apply(Point::new(0.5, 0.5) + Point::polar(angle, 0.5))
            })
            .collect::<Option<Vec<_>>>()?;
        Ellipse::fit(&points)
    }
}

/// Whether all turns of the closed polygon go in the same direction
pub fn is_convex(points: &[Point]) -> bool {
    let count = points.len();
    if count < 3 {
        return false;
    }
    let mut sign = 0.0;
    for index in 0..count {
        let p0 = points[index];
        let p1 = points[(index + 1) % count];
        let p2 = points[(index + 2) % count];
        let cross = (p1 - p0).cross(p2 - p1);
        if cross.abs() < 1e-12 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_circle_fit() {
        let points: Vec<_> = [0.3, 1.2, 2.5, 4.0]
            .iter()
            .map(|a| Point::new(3.0, -2.0) + Point::polar(*a, 7.0))
            .collect();
        let circle = Circle::fit(&points).unwrap();
        assert!(circle.center.is_near(Point::new(3.0, -2.0), 1e-9));
        assert_approx_eq!(circle.radius, 7.0, 1e-9);

        let collinear = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ];
        assert!(Circle::fit(&collinear).is_none());
        let same = [Point::new(1.0, 1.0); 4];
        assert!(Circle::fit(&same).is_none());

        let circle = Circle::from_diameter(Point::new(0.0, 0.0), Point::new(10.0, 0.0)).unwrap();
        assert!(circle.center.is_near(Point::new(5.0, 0.0), 1e-12));
        assert_approx_eq!(circle.radius, 5.0);
        assert!(Circle::from_diameter(Point::new(1.0, 1.0), Point::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_ellipse_fit() {
        let ellipse = Ellipse::new(Point::new(10.0, 5.0), 6.0, 2.0, PI / 6.0);
        let points: Vec<_> = (0..7).map(|i| ellipse.at(i as Scalar * 0.9)).collect();
        let fitted = Ellipse::fit(&points).unwrap();
        assert!(fitted.center().is_near(Point::new(10.0, 5.0), 1e-6));
        let (rx, ry) = fitted.radii();
        let (major, minor) = (rx.max(ry), rx.min(ry));
        assert_approx_eq!(major, 6.0, 1e-6);
        assert_approx_eq!(minor, 2.0, 1e-6);
        for point in points {
            let local = fitted.unit_transform().invert().unwrap().apply(point);
            assert_approx_eq!(local.length(), 1.0, 1e-6);
        }

        // hyperbola branch points are rejected
        let hyperbola: Vec<_> = [0.5, 1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|x| Point::new(*x, 1.0 / x))
            .collect();
        assert!(Ellipse::fit(&hyperbola).is_none());
        assert!(Ellipse::fit(&hyperbola[..4]).is_none());
    }

    #[test]
    fn test_perspective() {
        let quad = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(3.0, 2.0),
            Point::new(1.0, 2.0),
        ];
        let perspective = Perspective::from_square(quad).unwrap();
        for (corner, expected) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .zip(quad.iter())
        {
            let point = perspective.apply((*corner).into()).unwrap();
            assert!(point.is_near(*expected, 1e-9));
        }
        let ellipse = perspective.inscribed_ellipse().unwrap();
        let (rx, ry) = ellipse.radii();
        assert!(rx > 0.0 && ry > 0.0);
        // symmetric trapezoid keeps the ellipse centered horizontally
        assert_approx_eq!(ellipse.center().x(), 2.0, 1e-6);

        let concave = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 4.0),
        ];
        assert!(Perspective::from_square(concave).is_none());
    }
}
