//! Random point feed for a [`Quadtree`].
//!
//! Holds the timing state that drives insertion, so the tree itself knows nothing about
//! frames or clocks. Call [`Spawner::populate`] once for an eager fill, or
//! [`Spawner::advance`] every frame with the elapsed time.

use crate::quadtree::Quadtree;
use crate::{BoundingSquare, Coordinate, Error, Result};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpawnerConfig {
    /// Points inserted by `populate`.
    #[serde(default)]
    pub start_count: usize,
    /// Insertion rate used by `advance`.
    #[serde(default = "default_points_per_second")]
    pub points_per_second: f64,
    /// When set, points arrive over time through `advance` instead of all at once.
    #[serde(default)]
    pub run_demo: bool,
    /// Half of the side length of the spawn area, centered on the origin.
    #[serde(default = "default_half_dimension")]
    pub half_dimension: f64,
}

fn default_points_per_second() -> f64 {
    10.0
}

fn default_half_dimension() -> f64 {
    50.0
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            start_count: 0,
            points_per_second: default_points_per_second(),
            run_demo: false,
            half_dimension: default_half_dimension(),
        }
    }
}

impl SpawnerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), ?config, "loaded spawner config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.points_per_second.is_finite() || self.points_per_second < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "points_per_second must be finite and non-negative, got {}",
                self.points_per_second
            )));
        }
        if !self.half_dimension.is_finite() || self.half_dimension <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "half_dimension must be finite and positive, got {}",
                self.half_dimension
            )));
        }
        Ok(())
    }
}

// 2^53, past this the fractional carry is lost
const MAX_TIMER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnerConfig,
    // fractional points owed, carried between frames
    timer: f64,
    inserted: usize,
}

impl Spawner {
    pub fn new(config: SpawnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            timer: 0.0,
            inserted: 0,
        })
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Points accepted by the tree so far.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Square the spawned points are drawn from.
    pub fn root_boundary(&self) -> BoundingSquare {
        BoundingSquare::new(Coordinate::default(), self.config.half_dimension)
    }

    /// Empty tree covering the spawn area.
    pub fn make_tree(&self) -> Quadtree {
        Quadtree::new(self.root_boundary())
    }

    /// Eager fill of `start_count` points. Does nothing in demo mode.
    pub fn populate<R: Rng + ?Sized>(&mut self, tree: &mut Quadtree, rng: &mut R) -> usize {
        if self.config.run_demo {
            return 0;
        }
        (0..self.config.start_count)
            .filter(|_| self.spawn_one(tree, rng))
            .count()
    }

    /// Advance the clock by `dt` seconds and insert every point that became due.
    /// Returns the number of points the tree accepted. Does nothing outside demo mode,
    /// or when `dt` is negative or not finite.
    pub fn advance<R: Rng + ?Sized>(&mut self, tree: &mut Quadtree, dt: f64, rng: &mut R) -> usize {
        if !self.config.run_demo {
            return 0;
        }
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "ignoring invalid frame time");
            return 0;
        }

        let timer = self.timer + self.config.points_per_second * dt;
        if !(timer < MAX_TIMER) {
            warn!(dt, "frame time overflows the spawn timer");
            return 0;
        }
        let due = timer.floor();
        self.timer = timer - due;

        (0..due as usize)
            .filter(|_| self.spawn_one(tree, rng))
            .count()
    }

    fn spawn_one<R: Rng + ?Sized>(&mut self, tree: &mut Quadtree, rng: &mut R) -> bool {
        let h = self.config.half_dimension;
        // closed interval, the tree accepts points on its edges
        let side = Uniform::new_inclusive(-h, h);
        let point = Coordinate::new(side.sample(rng), side.sample(rng));
        if tree.insert(point) {
            self.inserted += 1;
            true
        } else {
            warn!(?point, boundary = ?tree.boundary(), "tree rejected spawned point");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn get_rand() -> SmallRng {
        SmallRng::seed_from_u64(0xdeadbeef)
    }

    fn demo_config(points_per_second: f64) -> SpawnerConfig {
        SpawnerConfig {
            run_demo: true,
            points_per_second,
            ..Default::default()
        }
    }

    #[test]
    fn populate_inserts_start_count() {
        let mut rng = get_rand();
        let mut spawner = Spawner::new(SpawnerConfig {
            start_count: 300,
            ..Default::default()
        })
        .unwrap();
        let mut tree = spawner.make_tree();

        assert_eq!(spawner.populate(&mut tree, &mut rng), 300);
        assert_eq!(spawner.inserted(), 300);
        assert_eq!(tree.len(), 300);
        assert_eq!(spawner.advance(&mut tree, 10.0, &mut rng), 0);
    }

    #[test]
    fn advance_accumulates_fractional_points() {
        let mut rng = get_rand();
        let mut spawner = Spawner::new(demo_config(4.0)).unwrap();
        let mut tree = spawner.make_tree();

        // 4 points per second at 0.1s per frame: 0.4, 0.8, 1.2, 1.6, 2.0
        let per_frame = (0..5)
            .map(|_| spawner.advance(&mut tree, 0.1, &mut rng))
            .collect::<Vec<_>>();

        assert_eq!(per_frame, vec![0, 0, 1, 0, 1]);
        assert_eq!(spawner.inserted(), 2);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn advance_catches_up_after_long_frame() {
        let mut rng = get_rand();
        let mut spawner = Spawner::new(demo_config(25.0)).unwrap();
        let mut tree = spawner.make_tree();

        assert_eq!(spawner.advance(&mut tree, 2.0, &mut rng), 50);
        assert_eq!(spawner.populate(&mut tree, &mut rng), 0);
        assert_eq!(tree.len(), 50);
    }

    #[test]
    fn advance_ignores_invalid_frame_times() {
        let mut rng = get_rand();
        let mut spawner = Spawner::new(demo_config(10.0)).unwrap();
        let mut tree = spawner.make_tree();

        assert_eq!(spawner.advance(&mut tree, f64::INFINITY, &mut rng), 0);
        assert_eq!(spawner.advance(&mut tree, f64::NAN, &mut rng), 0);
        assert_eq!(spawner.advance(&mut tree, -1.0, &mut rng), 0);
        assert!(tree.is_empty());

        // the timer was left untouched
        assert_eq!(spawner.advance(&mut tree, 0.35, &mut rng), 3);
        assert_eq!(spawner.advance(&mut tree, 0.05, &mut rng), 1);
        assert_eq!(spawner.inserted(), 4);
    }

    #[test]
    fn advance_overflowing_timer_returns() {
        let mut rng = get_rand();
        let mut spawner = Spawner::new(demo_config(f64::MAX)).unwrap();
        let mut tree = spawner.make_tree();

        assert_eq!(spawner.advance(&mut tree, 10.0, &mut rng), 0);
        assert_eq!(spawner.advance(&mut tree, 1e-200, &mut rng), 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn spawned_points_cover_the_closed_domain() {
        let mut spawner = Spawner::new(SpawnerConfig {
            start_count: 1,
            ..Default::default()
        })
        .unwrap();
        let h = spawner.config().half_dimension;

        let mut tree = spawner.make_tree();
        let mut low = StepRng::new(0, 0);
        assert_eq!(spawner.populate(&mut tree, &mut low), 1);
        assert_eq!(tree.query_range(tree.boundary()), vec![Coordinate::new(-h, -h)]);

        let mut tree = spawner.make_tree();
        let mut high = StepRng::new(u64::MAX, 0);
        assert_eq!(spawner.populate(&mut tree, &mut high), 1);
        let res = tree.query_range(tree.boundary());
        assert_eq!(res.len(), 1);
        assert!(h - res[0].x() < 1e-9 && res[0].x() <= h, "{:?}", res);
    }

    #[test]
    fn rejected_points_are_not_counted() {
        let mut rng = get_rand();
        let mut spawner = Spawner::new(demo_config(10.0)).unwrap();
        let mut tree = Quadtree::new(BoundingSquare::new(Coordinate::new(1000.0, 1000.0), 1.0));

        assert_eq!(spawner.advance(&mut tree, 1.0, &mut rng), 0);
        assert_eq!(spawner.inserted(), 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn config_from_toml_fills_defaults() {
        let config = SpawnerConfig::from_toml_str("start_count = 12\nrun_demo = true\n").unwrap();

        assert_eq!(
            config,
            SpawnerConfig {
                start_count: 12,
                run_demo: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn config_rejects_bad_values() {
        let res = SpawnerConfig::from_toml_str("half_dimension = 0.0");
        assert!(matches!(res, Err(Error::InvalidConfig(_))), "{:?}", res);

        let res = SpawnerConfig::from_toml_str("points_per_second = -1.0");
        assert!(matches!(res, Err(Error::InvalidConfig(_))), "{:?}", res);

        let res = SpawnerConfig::from_toml_str("start_count = \"many\"");
        assert!(matches!(res, Err(Error::Config(_))), "{:?}", res);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let res = SpawnerConfig::load("/nonexistent/spawner.toml");
        assert!(matches!(res, Err(Error::Io(_))), "{:?}", res);
    }
}
