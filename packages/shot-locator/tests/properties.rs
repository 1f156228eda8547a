//! End-to-end behavior of `find_shot_source` on synthetic, noiseless and
//! inconsistent arrival times.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shot_locator::residual::predict_times;
use shot_locator::{find_shot_source, locate, FailureReason, SolveError, SolverConfig};
use shot_types::{angular_difference, Point3, SensorArray, ShotEstimate};

const C: f64 = 343.0;

fn cube(half_edge: f64) -> Vec<Point3> {
    let mut v = Vec::with_capacity(8);
    for &x in &[-half_edge, half_edge] {
        for &y in &[-half_edge, half_edge] {
            for &z in &[-half_edge, half_edge] {
                v.push(Point3::new(x, y, z));
            }
        }
    }
    v
}

fn ring(count: usize, radius: f64) -> Vec<Point3> {
    (0..count)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / count as f64;
            Point3::new(radius * a.cos(), radius * a.sin(), 0.0)
        })
        .collect()
}

fn cross() -> Vec<Point3> {
    vec![
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(-10.0, 0.0, 0.0),
        Point3::new(0.0, 10.0, 0.0),
        Point3::new(0.0, -10.0, 0.0),
    ]
}

fn arrival_times(source: Point3, t0: f64, positions: &[Point3]) -> Vec<f64> {
    predict_times(&ShotEstimate::new(source, t0), positions, C)
}

fn tight() -> SolverConfig {
    SolverConfig::default()
        .with_tolerance(1e-14)
        .with_step_scales(0.3, 0.3)
        .with_max_iterations(20_000)
}

#[test]
fn reference_cross_scenario() {
    let positions = cross();
    let times = arrival_times(Point3::origin(), 0.0, &positions);
    let cfg = SolverConfig::default()
        .with_tolerance(1e-3)
        .with_step_scales(0.01, 0.01)
        .with_max_iterations(1000);

    let sol = find_shot_source(&times, &positions, &cfg).expect("reference scenario converges");
    assert!(sol.iterations <= 1000);
    assert!(sol.estimate.time.abs() < 1e-3);
    assert!(sol.estimate.position.norm() < 1e-3);
}

#[test]
fn exact_recovery_inside_cube() {
    let positions = cube(10.0);
    let mut rng = StdRng::seed_from_u64(1234);

    for _ in 0..25 {
        let source = Point3::new(
            rng.gen_range(-8.0..8.0),
            rng.gen_range(-8.0..8.0),
            rng.gen_range(-8.0..8.0),
        );
        let t0 = rng.gen_range(0.01..0.1);
        let times = arrival_times(source, t0, &positions);

        let sol = find_shot_source(&times, &positions, &tight())
            .unwrap_or_else(|e| panic!("source {source:?} did not converge: {e}"));
        assert!(
            sol.estimate.position.dist(&source) < 1e-3,
            "source {source:?} estimated at {:?}",
            sol.estimate.position
        );
        assert!((sol.estimate.time - t0).abs() < 1e-6);
    }
}

#[test]
fn exact_recovery_inside_helmet_ring() {
    let positions = ring(8, 10.0);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..25 {
        let r = rng.gen_range(0.5..6.0);
        let a = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
        let source = Point3::new(r * a.cos(), r * a.sin(), 0.0);
        let times = arrival_times(source, 0.0, &positions);

        let sol = find_shot_source(&times, &positions, &tight())
            .unwrap_or_else(|e| panic!("source {source:?} did not converge: {e}"));
        assert!(sol.estimate.position.dist(&source) < 1e-3);
        assert!(sol.estimate.time.abs() < 1e-6);
        let az_err = angular_difference(sol.estimate.position.azimuth_rad(), source.azimuth_rad());
        assert!(az_err.abs() < 1e-3);
    }
}

#[test]
fn permuting_sensors_gives_same_answer() {
    let positions = cube(10.0);
    let source = Point3::new(2.5, -1.0, 4.0);
    let times = arrival_times(source, 0.05, &positions);
    let array = SensorArray::new(positions.clone());
    let base = locate(&array, &times, &tight()).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    let mut order: Vec<usize> = (0..positions.len()).collect();
    for _ in 0..5 {
        order.shuffle(&mut rng);
        let shuffled = array.permuted(&order).unwrap();
        let t: Vec<f64> = order.iter().map(|&i| times[i]).collect();

        let sol = locate(&shuffled, &t, &tight()).unwrap();
        assert!(sol.estimate.position.dist(&base.estimate.position) < 1e-4);
        assert!((sol.estimate.time - base.estimate.time).abs() < 1e-7);
    }
}

#[test]
fn looser_tolerance_never_needs_more_iterations() {
    let positions = cube(10.0);
    let sources = [
        (Point3::new(1.5, -2.5, 0.75), 0.1),
        (Point3::new(-6.0, 3.0, -1.0), 0.02),
    ];
    let tolerances = [1e-12, 1e-10, 1e-8, 1e-6, 1e-4, 1e-2];

    for (source, t0) in sources {
        let times = arrival_times(source, t0, &positions);
        let mut previous = usize::MAX;
        for tol in tolerances {
            let cfg = tight().with_tolerance(tol);
            let sol = find_shot_source(&times, &positions, &cfg).unwrap();
            assert!(
                sol.iterations <= previous,
                "tol {tol:e} took {} iterations, tighter took {previous}",
                sol.iterations
            );
            previous = sol.iterations;
        }
    }
}

#[test]
fn inconsistent_times_report_non_convergence() {
    let positions = cross();
    // no single source explains a 0.9 s spread across a 20 m array
    let times = [0.01, 0.2, 0.05, 0.9];
    let cfg = SolverConfig::default()
        .with_tolerance(1e-12)
        .with_step_scales(0.01, 0.01)
        .with_max_iterations(10);

    let err = find_shot_source(&times, &positions, &cfg).unwrap_err();
    assert!(!err.is_precondition());
    match err {
        SolveError::NotConverged(f) => {
            assert_eq!(f.reason, FailureReason::BudgetExhausted);
            assert!(f.best.is_finite());
            assert!(f.loss.is_finite() && f.loss > 1e-12);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn noisy_times_with_generous_budget_still_fail_cleanly() {
    let positions = cube(10.0);
    let mut times = arrival_times(Point3::new(1.0, 2.0, 3.0), 0.05, &positions);
    times[3] += 0.01;
    let cfg = tight().with_tolerance(1e-20).with_max_iterations(500);

    let err = find_shot_source(&times, &positions, &cfg).unwrap_err();
    let best = err.best_estimate().expect("numerical failure carries an estimate");
    assert!(best.is_finite());
}

#[test]
fn all_equal_times_stay_finite() {
    let positions = cross();
    for value in [0.0, 0.05, 10.0 / C] {
        let times = [value; 4];
        let cfg = SolverConfig::default().with_tolerance(1e-9).with_max_iterations(5000);
        let estimate = match find_shot_source(&times, &positions, &cfg) {
            Ok(sol) => sol.estimate,
            Err(e) => *e.best_estimate().expect("not a precondition error"),
        };
        assert!(estimate.is_finite(), "times {value} gave {estimate:?}");
        assert!(estimate.position.norm() < 1e-9);
    }
}

#[test]
fn all_equal_times_on_cube_stay_finite() {
    let positions = cube(5.0);
    let times = [0.0; 8];
    let cfg = SolverConfig::default().with_tolerance(1e-12).with_max_iterations(200);
    let estimate = match find_shot_source(&times, &positions, &cfg) {
        Ok(sol) => sol.estimate,
        Err(e) => *e.best_estimate().expect("not a precondition error"),
    };
    assert!(estimate.is_finite());
}
