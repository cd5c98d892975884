//! Unit tests for the simulation core.

use crate::config::Config;
use crate::engine::{Engine, FramePacer, MIN_SECONDS_PER_DAY, SENSOR};
use crate::solar;
use crate::tracker::{Pose, Tracker, TrackerStatus, loss_pressure, yield_fraction};
use crate::weather::{Environment, WeatherMode, environment};

use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

fn seeded_config(seed: u64) -> Config {
    let mut cfg = Config::default();
    cfg.model.seed = Some(seed);
    cfg
}

/// Environment with no weather interference at all.
fn clear_env() -> Environment {
    Environment {
        irradiance: 1.0,
        cloud_cover: 0.0,
        sensor_contamination: 0.0,
    }
}

/// Environment saturating the loss pressure.
fn harsh_env() -> Environment {
    Environment {
        irradiance: 1.0,
        cloud_cover: 1.0,
        sensor_contamination: 1.0,
    }
}

const DT: f64 = 1.0 / 60.0;

/// Card slots not named by the engine itself.
const FIXED: usize = 0;
const ALGORITHMIC: usize = 2;

mod solar_tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn elevation_stays_normalized() {
        for k in 0..1000 {
            let t = k as f64 / 1000.0;
            let sun = solar::sun_position(t);
            assert!((0.0..=1.0).contains(&sun.y_norm), "y_norm out of range at {t}");
            assert_relative_eq!(sun.x_norm, t);
        }
    }

    #[test]
    fn horizon_at_both_ends_peak_at_noon() {
        assert_abs_diff_eq!(solar::sun_position(0.0).y_norm, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(solar::sun_position(1.0 - 1e-9).y_norm, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solar::sun_position(0.5).y_norm, 1.0, epsilon = 1e-12);

        let noon = solar::sun_position(0.5).y_norm;
        for k in 1..100 {
            let t = k as f64 / 100.0;
            assert!(solar::sun_position(t).y_norm <= noon);
        }
    }

    #[test]
    fn target_angle_sweeps_symmetrically() {
        assert_abs_diff_eq!(
            solar::target_angle(&solar::sun_position(0.0)),
            (-60.0f64).to_radians(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            solar::target_angle(&solar::sun_position(0.5)),
            0.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            solar::target_angle(&solar::sun_position(1.0)),
            60.0f64.to_radians(),
            epsilon = 1e-12
        );
    }
}

mod weather_tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn outputs_stay_normalized() {
        for mode in [WeatherMode::Sunny, WeatherMode::Cloudy, WeatherMode::Dusty] {
            for k in 0..100 {
                let t = k as f64 / 100.0;
                let env = environment(mode, t);
                assert!((0.0..=1.0).contains(&env.irradiance));
                assert!((0.0..=1.0).contains(&env.cloud_cover));
                assert!((0.0..=1.0).contains(&env.sensor_contamination));
            }
        }
    }

    #[test]
    fn sunny_means_clean_air() {
        for k in 0..100 {
            let env = environment(WeatherMode::Sunny, k as f64 / 100.0);
            assert_eq!(env.cloud_cover, 0.0);
            assert_eq!(env.sensor_contamination, 0.0);
        }
    }

    #[test]
    fn full_irradiance_at_sunny_noon() {
        assert_relative_eq!(environment(WeatherMode::Sunny, 0.5).irradiance, 1.0);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = environment(WeatherMode::Cloudy, 0.37);
        let b = environment(WeatherMode::Cloudy, 0.37);
        assert_eq!(a, b);
    }

    #[test]
    fn dawn_dimmer_than_noon_in_every_mode() {
        for mode in [WeatherMode::Sunny, WeatherMode::Cloudy, WeatherMode::Dusty] {
            assert!(environment(mode, 0.02).irradiance < environment(mode, 0.5).irradiance);
        }
    }
}

mod tracker_tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn fixed_angle_invariant_under_environment() {
        let mut tracker = Tracker::fixed();
        let mut rng = rng(1);
        let baseline = tracker.pose();
        assert_eq!(baseline.status, TrackerStatus::Ok);

        for (env, t) in [
            (clear_env(), 0.1),
            (harsh_env(), 0.5),
            (environment(WeatherMode::Dusty, 0.9), 0.9),
        ] {
            let sun = solar::sun_position(t);
            let pose = tracker.step(&sun, &env, DT, &mut rng).unwrap();
            assert_eq!(pose.angle, baseline.angle);
            assert_eq!(pose.status, TrackerStatus::Ok);
        }
    }

    #[test]
    fn algorithmic_never_reports_a_fault() {
        for mode in [WeatherMode::Sunny, WeatherMode::Cloudy, WeatherMode::Dusty] {
            let mut tracker = Tracker::algorithmic();
            let mut rng = rng(2);
            for k in 0..2000 {
                let t = (k % 1000) as f64 / 1000.0;
                let pose = tracker
                    .step(&solar::sun_position(t), &environment(mode, t), DT, &mut rng)
                    .unwrap();
                assert_eq!(pose.status, TrackerStatus::Locked);
            }
        }
    }

    #[test]
    fn zero_loss_pressure_never_loses_lock() {
        let sun = solar::sun_position(0.5);
        let env = clear_env();
        assert_eq!(loss_pressure(&sun, &env), 0.0);

        let mut tracker = Tracker::sensor();
        let mut rng = rng(3);
        for _ in 0..50_000 {
            let pose = tracker.step(&sun, &env, DT, &mut rng).unwrap();
            assert_eq!(pose.status, TrackerStatus::Tracking);
        }
    }

    #[test]
    fn saturated_loss_pressure_eventually_loses_lock() {
        let sun = solar::sun_position(0.5);
        let env = harsh_env();
        assert_eq!(loss_pressure(&sun, &env), 1.0);

        let mut tracker = Tracker::sensor();
        let mut rng = rng(4);
        let lost = (0..50_000).any(|_| {
            tracker
                .step(&sun, &env, DT, &mut rng)
                .unwrap()
                .status
                .is_fault()
        });
        assert!(lost, "tracker kept lock through a saturated loss pressure");
    }

    #[test]
    fn low_sun_raises_loss_pressure() {
        let env = clear_env();
        let low = loss_pressure(&solar::sun_position(0.02), &env);
        let high = loss_pressure(&solar::sun_position(0.5), &env);
        assert!(low > high);
        assert!((0.0..=1.0).contains(&low));
    }

    #[test]
    fn yield_is_zero_at_the_horizon() {
        let sun = solar::sun_position(0.0);
        assert!(sun.y_norm <= crate::tracker::HORIZON_Y);
        let env = clear_env();

        for pose in [
            Tracker::fixed().pose(),
            Tracker::sensor().pose(),
            Tracker::algorithmic().pose(),
            Pose {
                angle: 0.3,
                status: TrackerStatus::Lost,
            },
        ] {
            assert_eq!(yield_fraction(&sun, &env, &pose), 0.0);
        }
    }

    #[test]
    fn lost_sensor_pays_the_hunting_penalty() {
        let sun = solar::sun_position(0.5);
        let env = clear_env();
        let angle = solar::target_angle(&sun);

        let tracking = yield_fraction(
            &sun,
            &env,
            &Pose {
                angle,
                status: TrackerStatus::Tracking,
            },
        );
        let lost = yield_fraction(
            &sun,
            &env,
            &Pose {
                angle,
                status: TrackerStatus::Lost,
            },
        );
        assert_relative_eq!(lost, 0.35 * tracking, epsilon = 1e-12);
    }

    #[test]
    fn converged_strategies_rank_as_expected_at_noon() {
        let sun = solar::sun_position(0.5);
        let env = environment(WeatherMode::Sunny, 0.5);
        let mut rng = rng(5);

        let mut fixed = Tracker::fixed();
        let mut sensor = Tracker::sensor();
        let mut algorithmic = Tracker::algorithmic();

        let mut poses = [fixed.pose(), sensor.pose(), algorithmic.pose()];
        for _ in 0..600 {
            poses = [
                fixed.step(&sun, &env, DT, &mut rng).unwrap(),
                sensor.step(&sun, &env, DT, &mut rng).unwrap(),
                algorithmic.step(&sun, &env, DT, &mut rng).unwrap(),
            ];
        }

        let yields = poses.map(|pose| yield_fraction(&sun, &env, &pose));
        assert!(yields[0] < yields[2], "fixed should trail the algorithm");
        assert_abs_diff_eq!(yields[1], yields[2], epsilon = 0.02);
    }
}

mod engine_tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn reset_restores_the_initial_state() {
        let mut engine = Engine::new(seeded_config(10)).unwrap();
        for _ in 0..500 {
            engine.tick(DT).unwrap();
        }
        assert!(engine.state().day_fraction > 0.0);

        engine.reset();

        let state = engine.state();
        assert_eq!(state.day_fraction, 0.0);
        assert_eq!(state.step, 0);
        match &state.trackers[SENSOR] {
            Tracker::Sensor {
                angle,
                locked,
                hunt_phase,
            } => {
                assert_eq!(*angle, 0.0);
                assert!(*locked);
                assert_eq!(*hunt_phase, 0.0);
            }
            other => panic!("unexpected tracker in the sensor slot: {other:?}"),
        }
        match &state.trackers[ALGORITHMIC] {
            Tracker::Algorithmic { angle } => assert_eq!(*angle, 0.0),
            other => panic!("unexpected tracker in the algorithmic slot: {other:?}"),
        }
    }

    #[test]
    fn weather_change_restores_sensor_lock() {
        let mut cfg = seeded_config(11);
        cfg.model.weather = WeatherMode::Cloudy;
        let mut engine = Engine::new(cfg).unwrap();

        let mut lost = false;
        for _ in 0..100_000 {
            let frame = engine.tick(DT).unwrap();
            if frame.panels[SENSOR].pose.status.is_fault() {
                lost = true;
                break;
            }
        }
        assert!(lost, "sensor never lost lock under clouds");

        engine.set_weather(WeatherMode::Cloudy);

        match &engine.state().trackers[SENSOR] {
            Tracker::Sensor {
                locked, hunt_phase, ..
            } => {
                assert!(*locked);
                assert_eq!(*hunt_phase, 0.0);
            }
            other => panic!("unexpected tracker in the sensor slot: {other:?}"),
        }
        assert_eq!(
            engine.frame().panels[SENSOR].pose.status,
            TrackerStatus::Tracking
        );
    }

    #[test]
    fn frame_delta_is_clamped() {
        let mut engine = Engine::new(seeded_config(12)).unwrap();
        let frame = engine.tick(10.0).unwrap();

        // One tick can advance at most max_frame_delta / seconds_per_day.
        let expected = 0.05 / 12.0;
        assert_relative_eq!(frame.day_fraction, expected, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_deltas_are_ignored() {
        let mut engine = Engine::new(seeded_config(13)).unwrap();
        engine.tick(f64::NAN).unwrap();
        engine.tick(f64::INFINITY).unwrap();
        assert_eq!(engine.state().day_fraction, 0.0);
    }

    #[test]
    fn pause_and_visibility_stop_time() {
        let mut engine = Engine::new(seeded_config(14)).unwrap();

        engine.toggle_running();
        engine.tick(DT).unwrap();
        assert_eq!(engine.state().day_fraction, 0.0);
        engine.toggle_running();

        engine.set_visible(false);
        engine.tick(DT).unwrap();
        assert_eq!(engine.state().day_fraction, 0.0);

        // No catch-up jump once visible again.
        engine.set_visible(true);
        let frame = engine.tick(DT).unwrap();
        assert_relative_eq!(frame.day_fraction, DT / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn speed_is_sanitized() {
        let mut engine = Engine::new(seeded_config(15)).unwrap();

        engine.set_speed(f64::NAN);
        assert_eq!(engine.state().seconds_per_day, MIN_SECONDS_PER_DAY);

        engine.set_speed(-3.0);
        assert_eq!(engine.state().seconds_per_day, MIN_SECONDS_PER_DAY);

        engine.set_speed(0.0);
        assert_eq!(engine.state().seconds_per_day, MIN_SECONDS_PER_DAY);

        engine.set_speed(48.0);
        assert_eq!(engine.state().seconds_per_day, 48.0);
    }

    #[test]
    fn day_fraction_wraps() {
        let mut cfg = seeded_config(16);
        cfg.model.seconds_per_day = 4.0;
        let mut engine = Engine::new(cfg).unwrap();

        for _ in 0..1000 {
            let frame = engine.tick(0.05).unwrap();
            assert!((0.0..1.0).contains(&frame.day_fraction));
        }
    }

    #[test]
    fn noon_frame_matches_the_closed_form() {
        let mut engine = Engine::new(seeded_config(17)).unwrap();

        // 6 s of animation at 12 s/day lands on solar noon.
        for _ in 0..300 {
            engine.tick(0.02).unwrap();
        }

        let frame = engine.frame();
        assert_relative_eq!(frame.day_fraction, 0.5, epsilon = 1e-9);
        assert_relative_eq!(frame.sun.x_norm, 0.5, epsilon = 1e-9);
        assert_relative_eq!(frame.sun.y_norm, 1.0, epsilon = 1e-9);
        assert_relative_eq!(frame.env.irradiance, 1.0, epsilon = 1e-9);
        assert!(frame.panels[FIXED].yield_fraction < frame.panels[ALGORITHMIC].yield_fraction);
    }

    #[test]
    fn same_seed_same_records() {
        let mut a = Engine::new(seeded_config(18)).unwrap();
        let mut b = Engine::new(seeded_config(18)).unwrap();

        for _ in 0..500 {
            a.tick(DT).unwrap();
            b.tick(DT).unwrap();
        }

        assert_eq!(a.record(), b.record());
    }

    #[test]
    fn pacer_carries_the_remainder() {
        let mut pacer = FramePacer::new(10.0);
        assert!(!pacer.ready(0.04));
        assert!(pacer.ready(0.07)); // 0.11 accumulated, ~0.01 carried
        assert!(!pacer.ready(0.05)); // ~0.06
        assert!(pacer.ready(0.05)); // ~0.11
    }

    #[test]
    fn pacer_bounds_the_backlog_after_a_stall() {
        let mut pacer = FramePacer::new(10.0);
        assert!(pacer.ready(10.0));
        assert!(pacer.ready(0.0));
        assert!(!pacer.ready(0.0));
    }

    #[test]
    fn pacer_interval_follows_the_target() {
        let pacer = FramePacer::new(30.0);
        assert_abs_diff_eq!(pacer.interval(), 1.0 / 30.0, epsilon = 1e-12);
    }
}

mod stats_tests {
    use super::*;
    use crate::stats::Accumulator;
    use approx::assert_relative_eq;

    #[test]
    fn known_stream() {
        let mut acc = Accumulator::new();
        for val in [1.0, 2.0, 3.0, 4.0] {
            acc.add(val);
        }

        let report = acc.report();
        assert_eq!(acc.count(), 4);
        assert_relative_eq!(report.mean, 2.5);
        assert_relative_eq!(report.std_dev, (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(report.min, 1.0);
        assert_relative_eq!(report.max, 4.0);
    }

    #[test]
    fn empty_stream_reports_nan() {
        let report = Accumulator::new().report();
        assert!(report.mean.is_nan());
        assert!(report.std_dev.is_nan());
        assert!(report.min.is_nan());
        assert!(report.max.is_nan());
    }
}

mod surface_tests {
    use crate::surface::{Color, Surface};

    #[test]
    fn clear_and_read_back() {
        let mut surface = Surface::new(8, 8);
        surface.clear(Color::rgb(10, 20, 30));
        assert_eq!(surface.pixel(3, 3), Color::rgb(10, 20, 30));
        assert_eq!(surface.pixel(100, 100), Color::rgb(0, 0, 0));
    }

    #[test]
    fn opaque_blend_replaces_translucent_blend_mixes() {
        let mut surface = Surface::new(4, 4);
        surface.clear(Color::rgb(0, 0, 0));

        surface.blend_pixel(1, 1, Color::rgb(200, 100, 50));
        assert_eq!(surface.pixel(1, 1), Color::rgb(200, 100, 50));

        surface.blend_pixel(2, 2, Color::rgba(200, 200, 200, 128));
        let mixed = surface.pixel(2, 2);
        assert!(mixed.r > 90 && mixed.r < 110, "got {mixed:?}");
    }

    #[test]
    fn out_of_bounds_draws_are_ignored() {
        let mut surface = Surface::new(4, 4);
        surface.blend_pixel(-1, 0, Color::rgb(255, 255, 255));
        surface.blend_pixel(0, 99, Color::rgb(255, 255, 255));
        surface.draw_line(-10.0, -10.0, 10.0, 10.0, Color::rgb(255, 255, 255));
        surface.fill_rect(-5.0, -5.0, 3.0, 3.0, Color::rgb(255, 255, 255));
    }

    #[test]
    fn line_hits_both_endpoints() {
        let mut surface = Surface::new(8, 8);
        surface.clear(Color::rgb(0, 0, 0));
        surface.draw_line(1.0, 1.0, 6.0, 4.0, Color::rgb(255, 0, 0));
        assert_eq!(surface.pixel(1, 1), Color::rgb(255, 0, 0));
        assert_eq!(surface.pixel(6, 4), Color::rgb(255, 0, 0));
    }

    #[test]
    fn quad_covers_its_center() {
        let mut surface = Surface::new(16, 16);
        surface.clear(Color::rgb(0, 0, 0));
        surface.fill_quad(
            [[4.0, 4.0], [12.0, 4.0], [12.0, 12.0], [4.0, 12.0]],
            Color::rgb(0, 255, 0),
        );
        assert_eq!(surface.pixel(8, 8), Color::rgb(0, 255, 0));
        assert_eq!(surface.pixel(1, 1), Color::rgb(0, 0, 0));
    }
}

mod scene_tests {
    use super::*;
    use crate::scene::Scene;
    use crate::surface::{Color, Surface};

    #[test]
    fn renders_without_touching_state() {
        let mut engine = Engine::new(seeded_config(20)).unwrap();
        for _ in 0..100 {
            engine.tick(DT).unwrap();
        }
        let before = engine.record();

        let mut surface = Surface::new(120, 60);
        let scene = Scene::new(120, 60);
        scene.render(&mut surface, &engine.frame());

        assert_eq!(engine.record(), before);

        // Something must have been painted over the background.
        let background = Color::rgb(7, 10, 20);
        let painted = (0..60)
            .flat_map(|y| (0..120).map(move |x| (x, y)))
            .any(|(x, y)| surface.pixel(x, y) != background);
        assert!(painted);
    }

    #[test]
    fn layout_spans_three_cards() {
        let scene = Scene::new(300, 100);
        let cards = &scene.layout().cards;
        assert!(cards[0].card.x < cards[1].card.x);
        assert!(cards[1].card.x < cards[2].card.x);
        assert!(cards[2].card.x + cards[2].card.w <= 300.0);
    }
}

mod ephemeris_tests {
    use crate::ephemeris::sun_position_at;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn zenith_and_altitude_are_complementary() {
        let pos = sun_position_at(date(2026, 8, 5), time(15, 30), 49.946, 82.604, 5.0);
        assert_relative_eq!(pos.zenith + pos.altitude, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn equinox_noon_at_the_equator_is_nearly_overhead() {
        let pos = sun_position_at(date(2026, 3, 20), time(12, 0), 0.0, 0.0, 0.0);
        assert!(pos.altitude > 80.0, "altitude {}", pos.altitude);
    }

    #[test]
    fn azimuth_is_normalized() {
        for hour in [0, 6, 12, 18, 23] {
            let pos = sun_position_at(date(2026, 6, 21), time(hour, 0), 40.0, -74.0, -5.0);
            assert!((0.0..360.0).contains(&pos.azimuth), "azimuth {}", pos.azimuth);
        }
    }

    #[test]
    fn solar_noon_near_clock_noon_at_the_reference_meridian() {
        let pos = sun_position_at(date(2026, 3, 20), time(12, 0), 0.0, 0.0, 0.0);
        assert!((600.0..840.0).contains(&pos.solar_noon));
        assert_eq!(pos.solar_noon_hhmm().len(), 5);
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let cfg = Config::load_or_default(None).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.model.weather, WeatherMode::Sunny);
        assert_eq!(cfg.model.seconds_per_day, 12.0);
    }

    #[test]
    fn partial_tables_fall_back_to_defaults() {
        let cfg: Config = toml::from_str("[model]\nweather = \"cloudy\"\n").unwrap();
        assert_eq!(cfg.model.weather, WeatherMode::Cloudy);
        assert_eq!(cfg.model.seconds_per_day, 12.0);
        assert_eq!(cfg.output.saves_per_file, 64);
    }
}
