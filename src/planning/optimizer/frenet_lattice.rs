// Frenet lattice trajectory optimizer
//
// Samples end states in the Frenet frame of every planning target, builds
// lateral (quintic) and longitudinal (quartic velocity keeping or quintic
// stopping) profiles, maps them back to world coordinates and keeps the
// cheapest candidate that respects dynamic limits and clears every obstacle
// prediction.
//
// Sampling scheme after Werling et al., "Optimal Trajectory Generation for
// Dynamic Street Scenarios in a Frenet Frame" (PythonRobotics port).

use log::debug;
use ordered_float::OrderedFloat;

use crate::common::{normalize_angle, PlanningError, PlanningResult, TrajectoryOptimizer};
use crate::config::PlanningConfig;
use crate::kinematics::{Trajectory, TrajectoryPoint, TrajectoryStatus};
use crate::planning::{Obstacle, PlanningTarget};

use super::polynomials::Polynomial;

/// Configuration for the Frenet lattice optimizer
#[derive(Debug, Clone)]
pub struct FrenetLatticeConfig {
    /// Output horizon [s]
    pub horizon: f64,
    /// Output time step [s]
    pub dt: f64,
    /// Shortest manoeuvre duration sampled [s]
    pub min_maneuver_time: f64,
    /// Manoeuvre duration sampling step [s]
    pub maneuver_time_step: f64,
    /// Lateral offsets sampled on each side of the line
    pub lateral_samples: usize,
    /// Lateral offset sampling step [m]
    pub lateral_step: f64,
    /// Fraction of desired velocity used as extra speed samples
    pub speed_sample_ratios: Vec<f64>,
    pub max_speed: f64,
    pub max_accel: f64,
    pub max_curvature: f64,
    /// Clearance between ego and obstacle centres [m]
    pub collision_radius: f64,
    /// Jerk cost weight
    pub k_j: f64,
    /// Time cost weight
    pub k_t: f64,
    /// Lateral offset cost weight
    pub k_d: f64,
    /// Speed error cost weight
    pub k_v: f64,
    /// Penalty for targets whose lane does not contain the origin
    pub k_lane: f64,
}

impl Default for FrenetLatticeConfig {
    fn default() -> Self {
        Self::from_planning_config(&PlanningConfig::default())
    }
}

impl FrenetLatticeConfig {
    pub fn from_planning_config(config: &PlanningConfig) -> Self {
        Self {
            horizon: config.max_lookahead_time,
            dt: config.delta_t,
            min_maneuver_time: (config.max_lookahead_time / 2.0).max(config.delta_t),
            maneuver_time_step: 1.0,
            lateral_samples: 1,
            lateral_step: config.lane_half_width / 2.0,
            speed_sample_ratios: vec![1.0, 0.5],
            max_speed: config.desired_velocity * 1.5,
            max_accel: config.max_lon_acc * 1.5,
            max_curvature: config.max_curvature,
            collision_radius: config.collision_radius,
            k_j: 0.1,
            k_t: 0.1,
            k_d: 1.0,
            k_v: 1.0,
            k_lane: 10.0,
        }
    }
}

/// Candidate trajectory with its cost
#[derive(Debug, Clone)]
struct Candidate {
    points: Vec<TrajectoryPoint>,
    cost: f64,
}

/// Longitudinal motion profile in the Frenet frame
enum LonProfile {
    /// Quartic reaching a target speed
    Keep(Polynomial),
    /// Quintic coming to rest at the stop point
    Stop(Polynomial),
}

impl LonProfile {
    fn polynomial(&self) -> &Polynomial {
        match self {
            LonProfile::Keep(p) | LonProfile::Stop(p) => p,
        }
    }

    /// (s, s_d, s_dd, s_ddd) at time t; the end state is held after `duration`
    fn eval(&self, t: f64, duration: f64) -> (f64, f64, f64, f64) {
        let te = t.min(duration);
        let p = self.polynomial();
        let (s, v, a, j) = (
            p.derivative(0, te),
            p.derivative(1, te),
            p.derivative(2, te),
            p.derivative(3, te),
        );
        if t > duration {
            (s + v * (t - duration), v, 0.0, 0.0)
        } else {
            (s, v, a, j)
        }
    }
}

pub struct FrenetLatticeOptimizer {
    config: FrenetLatticeConfig,
}

impl FrenetLatticeOptimizer {
    pub const NAME: &'static str = "frenet_lattice";

    pub fn new(config: FrenetLatticeConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FrenetLatticeConfig::default())
    }

    fn lateral_offsets(&self) -> Vec<f64> {
        let n = self.config.lateral_samples as i64;
        (-n..=n)
            .map(|i| i as f64 * self.config.lateral_step)
            .collect()
    }

    fn maneuver_times(&self) -> Vec<f64> {
        let mut times = Vec::new();
        let mut ti = self.config.min_maneuver_time;
        while ti <= self.config.horizon + 1e-9 {
            times.push(ti);
            ti += self.config.maneuver_time_step;
        }
        times
    }

    fn candidates_for_target(
        &self,
        origin: &TrajectoryPoint,
        target: &PlanningTarget,
    ) -> Vec<Candidate> {
        let line = &target.reference_line;
        let s0 = target.origin_sl.s;
        let d0 = target.origin_sl.l;
        let ref_point = line.reference_point(s0);
        let dtheta = normalize_angle(origin.theta - ref_point.theta);
        let s_d0 = origin.v * dtheta.cos();
        let d_d0 = origin.v * dtheta.sin();
        let s_dd0 = origin.a * dtheta.cos();

        let mut candidates = Vec::new();
        for &ti in self.maneuver_times().iter() {
            let mut lon_profiles = Vec::new();
            if target.has_stop_point {
                let stop_distance = (target.stop_s - s0).max(0.0);
                lon_profiles.push(LonProfile::Stop(Polynomial::quintic(
                    [s0, s_d0, s_dd0],
                    [s0 + stop_distance, 0.0, 0.0],
                    ti,
                )));
            } else {
                for ratio in self.config.speed_sample_ratios.iter() {
                    lon_profiles.push(LonProfile::Keep(Polynomial::quartic(
                        [s0, s_d0, s_dd0],
                        [target.desired_velocity * ratio, 0.0],
                        ti,
                    )));
                }
            }

            for &di in self.lateral_offsets().iter() {
                let lat = Polynomial::quintic([d0, d_d0, 0.0], [di, 0.0, 0.0], ti);
                for lon in lon_profiles.iter() {
                    if let Some(candidate) = self.build_candidate(origin, target, &lat, lon, ti, di)
                    {
                        candidates.push(candidate);
                    }
                }
            }
        }
        candidates
    }

    fn build_candidate(
        &self,
        origin: &TrajectoryPoint,
        target: &PlanningTarget,
        lat: &Polynomial,
        lon: &LonProfile,
        ti: f64,
        di: f64,
    ) -> Option<Candidate> {
        let line = &target.reference_line;
        let n = (self.config.horizon / self.config.dt).floor() as usize;

        let mut xs = Vec::with_capacity(n + 1);
        let mut ys = Vec::with_capacity(n + 1);
        let mut samples = Vec::with_capacity(n + 1);
        let mut lat_jerk = 0.0;
        let mut lon_jerk = 0.0;
        for i in 0..=n {
            let t = i as f64 * self.config.dt;
            let (s, s_d, s_dd, s_ddd) = lon.eval(t, ti);
            if s > line.length() + 1e-6 {
                break;
            }
            let te = t.min(ti);
            let d = lat.calc_point(te);
            let d_ddd = if t > ti { 0.0 } else { lat.calc_third_derivative(te) };
            lat_jerk += d_ddd * d_ddd;
            lon_jerk += s_ddd * s_ddd;

            let rp = line.reference_point(s);
            xs.push(rp.x - d * rp.theta.sin());
            ys.push(rp.y + d * rp.theta.cos());
            samples.push((t, s_d, s_dd, s_ddd));
        }
        if samples.len() < 2 {
            return None;
        }

        let mut points = Vec::with_capacity(samples.len());
        let mut arc = 0.0;
        for i in 0..samples.len() {
            let (t, v, a, jerk) = samples[i];
            let j = if i + 1 < samples.len() { i } else { i - 1 };
            let theta = (ys[j + 1] - ys[j]).atan2(xs[j + 1] - xs[j]);
            if i > 0 {
                arc += (xs[i] - xs[i - 1]).hypot(ys[i] - ys[i - 1]);
            }
            points.push(TrajectoryPoint {
                x: xs[i],
                y: ys[i],
                theta,
                s: arc,
                kappa: 0.0,
                dkappa: 0.0,
                v,
                a,
                jerk,
                steer_angle: 0.0,
                relative_time: origin.relative_time + t,
            });
        }
        for i in 0..points.len() - 1 {
            let ds = points[i + 1].s - points[i].s;
            points[i].kappa = if ds > 1e-6 {
                normalize_angle(points[i + 1].theta - points[i].theta) / ds
            } else {
                0.0
            };
        }
        let last_kappa = points[points.len() - 2].kappa;
        let last = points.len() - 1;
        points[last].kappa = last_kappa;
        // the plan starts exactly at the origin
        points[0] = TrajectoryPoint { s: 0.0, ..*origin };

        let (_, v_end, _, _) = lon.eval(ti, ti);
        let speed_error = match lon {
            LonProfile::Keep(_) => (target.desired_velocity - v_end).powi(2),
            LonProfile::Stop(_) => v_end.powi(2),
        };
        let lane_penalty = if target.is_best_behaviour {
            0.0
        } else {
            self.config.k_lane
        };
        let cost = self.config.k_j * (lat_jerk + lon_jerk)
            + 2.0 * self.config.k_t * ti
            + self.config.k_d * di * di
            + self.config.k_v * speed_error
            + lane_penalty;

        Some(Candidate { points, cost })
    }

    fn is_feasible(&self, candidate: &Candidate) -> bool {
        candidate.points.iter().skip(1).all(|p| {
            p.v <= self.config.max_speed
                && p.v >= -1e-3
                && p.a.abs() <= self.config.max_accel
                && p.kappa.abs() <= self.config.max_curvature
        })
    }

    fn is_collision_free(&self, candidate: &Candidate, obstacles: &[Obstacle]) -> bool {
        let t0 = candidate.points[0].relative_time;
        obstacles.iter().all(|obstacle| {
            let prediction = obstacle.predicted_trajectory();
            if prediction.is_empty() {
                return true;
            }
            let (length, width) = obstacle.footprint();
            let clearance = self.config.collision_radius + 0.5 * length.min(width);
            candidate.points.iter().all(|p| {
                let t = p.relative_time - t0;
                let idx = prediction.partition_point(|o| o.relative_time < t - 1e-6);
                let o = &prediction[idx.min(prediction.len() - 1)];
                (p.x - o.x).hypot(p.y - o.y) > clearance
            })
        })
    }
}

impl TrajectoryOptimizer for FrenetLatticeOptimizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &mut self,
        obstacles: &[Obstacle],
        origin: &TrajectoryPoint,
        targets: &[PlanningTarget],
    ) -> PlanningResult<Trajectory> {
        if targets.is_empty() {
            return Err(PlanningError::OptimizationFailed(
                "no planning target".to_string(),
            ));
        }
        let candidates: Vec<Candidate> = targets
            .iter()
            .flat_map(|target| self.candidates_for_target(origin, target))
            .collect();
        let total = candidates.len();
        let best = candidates
            .into_iter()
            .filter(|c| self.is_feasible(c))
            .filter(|c| self.is_collision_free(c, obstacles))
            .min_by_key(|c| OrderedFloat(c.cost));
        match best {
            Some(candidate) => {
                debug!("frenet lattice: best cost {:.3} of {} candidates", candidate.cost, total);
                Ok(Trajectory::new(candidate.points, 0.0, TrajectoryStatus::Normal))
            }
            None => Err(PlanningError::OptimizationFailed(format!(
                "none of {} candidates is feasible",
                total
            ))),
        }
    }
}
