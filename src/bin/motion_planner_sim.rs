// Closed-loop motion planner simulation
//
// The ego vehicle follows each published trajectory for one cycle, with
// noisy localization, while a slower vehicle drives ahead in the same lane.
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use gnuplot::{AxesCommon, Caption, Color, Figure, PointSize, PointSymbol};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use motion_planning_core::planning::stitching::time_match_index;
use motion_planning_core::planning::{OptimizerRegistry, RouteReferenceProvider};
use motion_planning_core::world::{
    EgoVehicleInfo, EgoVehicleStatus, Lane, ObjectState, RouteResponse,
};
use motion_planning_core::{
    CycleOutcome, MotionPlanner, PlanningConfig, PlanningResult, Point2D, Pose, RouteService,
    Trajectory, TrajectoryStatus, WorldState,
};

const EGO_ID: i32 = 0;
const LEAD_ID: i32 = 1;
const LANE_WIDTH: f64 = 3.5;
const ROAD_LENGTH: f64 = 300.0;
const SIM_STEPS: usize = 400;
const LOCALIZATION_NOISE: f64 = 0.02;

fn road_center(x: f64) -> f64 {
    3.0 * (x / 40.0).sin()
}

fn road_heading(x: f64) -> f64 {
    (3.0 / 40.0 * (x / 40.0).cos()).atan()
}

fn lanes() -> Vec<Lane> {
    (0..2)
        .map(|id| Lane {
            id,
            waypoints: (0..=(ROAD_LENGTH / 5.0) as usize)
                .map(|i| {
                    let x = i as f64 * 5.0;
                    Point2D::new(x, road_center(x) + id as f64 * LANE_WIDTH)
                })
                .collect(),
        })
        .collect()
}

struct SimRoutes;

impl RouteService for SimRoutes {
    fn plan_route(&mut self, _start: &Pose, _goal: &Pose) -> PlanningResult<RouteResponse> {
        Ok(RouteResponse { lanes: lanes() })
    }

    fn agent_routes(&mut self, _agent_id: i32) -> PlanningResult<Vec<Lane>> {
        Ok(lanes())
    }
}

fn lead_vehicle(x: f64, speed: f64) -> ObjectState {
    ObjectState {
        id: LEAD_ID,
        pose: Pose::new(x, road_center(x), 0.0, road_heading(x)),
        speed,
        length: 4.5,
        width: 2.0,
        height: 1.6,
        ..Default::default()
    }
}

fn main() {
    println!("Motion planner simulation start!");

    let config = PlanningConfig::default();
    let dt = config.cycle_period();
    let world = Arc::new(WorldState::new());
    let published: Rc<RefCell<Option<Trajectory>>> = Rc::new(RefCell::new(None));
    let sink = {
        let published = Rc::clone(&published);
        move |t: &Trajectory| *published.borrow_mut() = Some(t.clone())
    };

    let mut planner = match MotionPlanner::new(
        config.clone(),
        &OptimizerRegistry::with_builtin(),
        Arc::clone(&world),
        Box::new(RouteReferenceProvider::from_config(&config)),
        Box::new(SimRoutes),
        Box::new(sink),
    ) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("Failed to start planner: {}", e);
            return;
        }
    };

    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, LOCALIZATION_NOISE).unwrap();

    let mut ego = ObjectState {
        id: EGO_ID,
        pose: Pose::new(0.0, road_center(0.0), 0.0, road_heading(0.0)),
        speed: 5.0,
        length: 4.8,
        width: 1.9,
        height: 1.5,
        ..Default::default()
    };
    let mut ego_acc = 0.0;
    let mut lead_x = 40.0;
    let lead_speed = 4.0;

    world.update_ego_info(EgoVehicleInfo {
        id: EGO_ID,
        type_name: "vehicle.sim".to_string(),
    });
    world.update_objects(vec![ego, lead_vehicle(lead_x, lead_speed)]);
    world.update_ego_status(EgoVehicleStatus {
        velocity: ego.speed,
        acceleration: 0.0,
        steer: 0.0,
    });

    let goal = Pose::new(ROAD_LENGTH, road_center(ROAD_LENGTH), 0.0, 0.0);
    if let Err(e) = planner.handle_goal_request(&goal) {
        eprintln!("Goal rejected: {}", e);
        return;
    }

    let mut ego_x = vec![ego.pose.position.x];
    let mut ego_y = vec![ego.pose.position.y];
    let mut lead_path_x = vec![lead_x];
    let mut lead_path_y = vec![road_center(lead_x)];
    let mut emergency_stops = 0;

    for step in 0..SIM_STEPS {
        let now = step as f64 * dt;
        match planner.run_once_at(now) {
            CycleOutcome::Published(TrajectoryStatus::EmergencyStop) => emergency_stops += 1,
            CycleOutcome::Published(_) => {}
            outcome => {
                println!("cycle skipped: {:?}", outcome);
                continue;
            }
        }

        let trajectory = match published.borrow_mut().take() {
            Some(t) if !t.is_empty() => t,
            _ => break,
        };
        // the vehicle tracks the point one cycle ahead
        let next_index = time_match_index(&trajectory.points, dt, config.time_match_epsilon);
        let next = trajectory.points[next_index];
        ego.pose = Pose::new(
            next.x + noise.sample(&mut rng),
            next.y + noise.sample(&mut rng),
            0.0,
            next.theta,
        );
        ego.speed = next.v;
        ego.yaw_rate = next.kappa * next.v;
        ego_acc = next.a;

        lead_x += lead_speed * dt;
        world.update_objects(vec![ego, lead_vehicle(lead_x, lead_speed)]);
        world.update_ego_status(EgoVehicleStatus {
            velocity: ego.speed,
            acceleration: ego_acc,
            steer: next.steer_angle,
        });

        ego_x.push(ego.pose.position.x);
        ego_y.push(ego.pose.position.y);
        lead_path_x.push(lead_x);
        lead_path_y.push(road_center(lead_x));

        if ego.pose.position.x > ROAD_LENGTH - 20.0 {
            println!("Goal reached!");
            break;
        }
        if trajectory.status == TrajectoryStatus::EmergencyStop && ego.speed == 0.0 {
            println!("Vehicle stopped at x = {:.1}", ego.pose.position.x);
            break;
        }
    }

    println!(
        "Done! final speed {:.2} m/s, acc {:.2} m/s^2, {} emergency stops",
        ego.speed, ego_acc, emergency_stops
    );

    let mut fig = Figure::new();
    let lane_lines: Vec<(Vec<f64>, Vec<f64>)> = lanes()
        .iter()
        .map(|lane| {
            (
                lane.waypoints.iter().map(|p| p.x).collect(),
                lane.waypoints.iter().map(|p| p.y).collect(),
            )
        })
        .collect();
    {
        let axes = fig
            .axes2d()
            .set_title("Motion Planner Simulation", &[])
            .set_x_label("x [m]", &[])
            .set_y_label("y [m]", &[]);
        for (x, y) in &lane_lines {
            axes.lines(x, y, &[Color("gray")]);
        }
        axes.lines(&ego_x, &ego_y, &[Caption("Ego"), Color("green")])
            .points(
                &lead_path_x,
                &lead_path_y,
                &[Caption("Lead vehicle"), Color("black"), PointSymbol('O'), PointSize(0.5)],
            );
    }

    match fig.save_to_svg("./img/motion_planner_sim.svg", 640, 480) {
        Ok(_) => println!("Plot saved to ./img/motion_planner_sim.svg"),
        Err(e) => eprintln!("Failed to save SVG: {:?}", e),
    }
}
