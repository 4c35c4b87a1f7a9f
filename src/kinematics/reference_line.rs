// Reference line backed by an arc-length parameterized cubic spline
//
// Spline construction follows the classic natural cubic spline
// (PythonRobotics CubicSpline by Atsushi Sakai, CppRobotics by TAI Lei).

use itertools::Itertools;
use nalgebra as na;
use ordered_float::OrderedFloat;

use crate::common::{PlanningError, PlanningResult, Point2D};

/// Spacing of the projection lookup samples [m]
const SAMPLE_RESOLUTION: f64 = 0.5;
/// How far before the start or past the end a projection may land [m]
const PROJECTION_END_TOLERANCE: f64 = 1.0;
const MIN_SEGMENT_LENGTH: f64 = 1e-6;

/// Frenet coordinate on a reference line
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SLPoint {
    pub s: f64,
    pub l: f64,
}

impl SLPoint {
    pub fn new(s: f64, l: f64) -> Self {
        Self { s, l }
    }
}

/// Geometric sample of a reference line
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReferencePoint {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub kappa: f64,
    pub s: f64,
}

#[derive(Debug, Clone)]
struct Spline {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    x: Vec<f64>,
}

impl Spline {
    fn new(x: &[f64], y: &[f64]) -> PlanningResult<Spline> {
        let nx = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let a = y.to_vec();

        let c_vec = Spline::calc_a(&h)
            .lu()
            .solve(&Spline::calc_b(&h, &a))
            .ok_or_else(|| {
                PlanningError::InvalidParameter("singular spline system".to_string())
            })?;
        let c: Vec<f64> = c_vec.iter().copied().collect();

        let mut b = Vec::with_capacity(nx - 1);
        let mut d = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            d.push((c[i + 1] - c[i]) / (3.0 * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(Spline {
            a,
            b,
            c,
            d,
            x: x.to_vec(),
        })
    }

    fn calc_a(h: &[f64]) -> na::DMatrix<f64> {
        let nx = h.len() + 1;
        let mut a = na::DMatrix::zeros(nx, nx);
        a[(0, 0)] = 1.0;
        for i in 0..nx - 1 {
            if i != nx - 2 {
                a[(i + 1, i + 1)] = 2.0 * (h[i] + h[i + 1]);
            }
            a[(i + 1, i)] = h[i];
            a[(i, i + 1)] = h[i];
        }
        a[(0, 1)] = 0.0;
        a[(nx - 1, nx - 2)] = 0.0;
        a[(nx - 1, nx - 1)] = 1.0;
        a
    }

    fn calc_b(h: &[f64], a: &[f64]) -> na::DVector<f64> {
        let nx = h.len() + 1;
        let mut b = na::DVector::zeros(nx);
        for i in 0..nx.saturating_sub(2) {
            b[i + 1] = 3.0 * (a[i + 2] - a[i + 1]) / h[i + 1] - 3.0 * (a[i + 1] - a[i]) / h[i];
        }
        b
    }

    fn search_index(&self, t: f64) -> usize {
        let i = self.x.partition_point(|&xi| xi <= t);
        i.saturating_sub(1).min(self.x.len() - 2)
    }

    fn calc(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    fn calc_d(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx.powi(2)
    }

    fn calc_dd(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        2.0 * self.c[i] + 6.0 * self.d[i] * dx
    }
}

/// Immutable arc-length parameterized path with a lane corridor around it
#[derive(Debug, Clone)]
pub struct ReferenceLine {
    sx: Spline,
    sy: Spline,
    length: f64,
    lane_half_width: f64,
    samples: Vec<ReferencePoint>,
}

impl ReferenceLine {
    /// Fit a reference line through `waypoints`.
    ///
    /// Consecutive duplicate waypoints are dropped; at least two distinct
    /// waypoints are required.
    pub fn new(waypoints: &[Point2D], lane_half_width: f64) -> PlanningResult<Self> {
        let points: Vec<Point2D> = waypoints
            .iter()
            .copied()
            .coalesce(|a, b| {
                if a.distance(&b) < MIN_SEGMENT_LENGTH {
                    Ok(a)
                } else {
                    Err((a, b))
                }
            })
            .collect();
        if points.len() < 2 {
            return Err(PlanningError::InvalidParameter(format!(
                "reference line needs at least 2 distinct waypoints, got {}",
                points.len()
            )));
        }

        let mut s = Vec::with_capacity(points.len());
        s.push(0.0);
        for (p0, p1) in points.iter().tuple_windows() {
            let last = s[s.len() - 1];
            s.push(last + p0.distance(p1));
        }
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();

        let mut line = ReferenceLine {
            sx: Spline::new(&s, &x)?,
            sy: Spline::new(&s, &y)?,
            length: s[s.len() - 1],
            lane_half_width,
            samples: Vec::new(),
        };
        let n = (line.length / SAMPLE_RESOLUTION).ceil().max(1.0) as usize;
        line.samples = (0..=n)
            .map(|i| line.reference_point(line.length * i as f64 / n as f64))
            .collect();
        Ok(line)
    }

    /// Total arc length [m]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Geometric sample at arc length `s`, clamped to the line
    pub fn reference_point(&self, s: f64) -> ReferencePoint {
        let s = s.max(0.0).min(self.length);
        let dx = self.sx.calc_d(s);
        let dy = self.sy.calc_d(s);
        let ddx = self.sx.calc_dd(s);
        let ddy = self.sy.calc_dd(s);
        let norm = (dx.powi(2) + dy.powi(2)).powf(1.5);
        let kappa = if norm > 0.0 {
            (ddy * dx - ddx * dy) / norm
        } else {
            0.0
        };
        ReferencePoint {
            x: self.sx.calc(s),
            y: self.sy.calc(s),
            theta: dy.atan2(dx),
            kappa,
            s,
        }
    }

    /// Project a world point onto the line
    pub fn xy_to_sl(&self, x: f64, y: f64) -> PlanningResult<SLPoint> {
        if !x.is_finite() || !y.is_finite() {
            return Err(PlanningError::ProjectionFailed { x, y });
        }
        let target = Point2D::new(x, y);
        let nearest = self
            .samples
            .iter()
            .position_min_by_key(|p| OrderedFloat(Point2D::new(p.x, p.y).distance_squared(&target)))
            .ok_or(PlanningError::ProjectionFailed { x, y })?;

        // refine on the segment toward whichever neighbour the point lies
        let (i0, i1) = if nearest + 1 == self.samples.len() {
            (nearest - 1, nearest)
        } else if nearest == 0 {
            (0, 1)
        } else {
            let prev = &self.samples[nearest - 1];
            let cur = &self.samples[nearest];
            let along = (x - cur.x) * (cur.x - prev.x) + (y - cur.y) * (cur.y - prev.y);
            if along < 0.0 {
                (nearest - 1, nearest)
            } else {
                (nearest, nearest + 1)
            }
        };
        let p0 = &self.samples[i0];
        let p1 = &self.samples[i1];
        let seg = Point2D::new(p1.x - p0.x, p1.y - p0.y);
        let seg_len = seg.x.hypot(seg.y);
        if seg_len < MIN_SEGMENT_LENGTH {
            return Err(PlanningError::ProjectionFailed { x, y });
        }
        let ux = seg.x / seg_len;
        let uy = seg.y / seg_len;
        let vx = x - p0.x;
        let vy = y - p0.y;

        let mut along = vx * ux + vy * uy;
        if i0 != 0 && i1 + 1 != self.samples.len() {
            along = along.max(0.0).min(seg_len);
        }
        let s = p0.s + along * (p1.s - p0.s) / seg_len;
        let l = ux * vy - uy * vx;

        if s < -PROJECTION_END_TOLERANCE || s > self.length + PROJECTION_END_TOLERANCE {
            return Err(PlanningError::ProjectionFailed { x, y });
        }
        Ok(SLPoint::new(s, l))
    }

    /// Whether an (s, l) pair lies inside this line's lane corridor
    pub fn is_on_lane(&self, sl: &SLPoint) -> bool {
        sl.s >= 0.0 && sl.s <= self.length && sl.l.abs() <= self.lane_half_width
    }

    /// Map a Frenet coordinate back to the world frame
    pub fn sl_to_xy(&self, sl: &SLPoint) -> Point2D {
        let rp = self.reference_point(sl.s);
        Point2D::new(
            rp.x - sl.l * rp.theta.sin(),
            rp.y + sl.l * rp.theta.cos(),
        )
    }
}
