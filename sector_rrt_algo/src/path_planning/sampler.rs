//! Uniform and sector-biased sampling of candidate points.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::geometry::{Bounds, Point};

/// Angular wedge around a frontier node used to bias sampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    /// Wedge center in degrees, 0 along +x
    pub center_angle: f64,
    /// Full opening of the wedge in degrees
    pub span_angle: f64,
    /// Selection weight in [0, 1]
    pub priority: f64,
}

impl Sector {
    pub fn new(center_angle: f64, span_angle: f64, priority: f64) -> Self {
        Self {
            center_angle,
            span_angle,
            priority,
        }
    }

    /// Angle range `(low, high)` in radians
    fn angle_range_rad(&self) -> (f64, f64) {
        let half = self.span_angle / 2.0;
        (
            (self.center_angle - half).to_radians(),
            (self.center_angle + half).to_radians(),
        )
    }
}

/// Random point source over a fixed bounded region
pub struct SectorSampler {
    bounds: Bounds,
    x_dist: Uniform<f64>,
    y_dist: Uniform<f64>,
    rng: StdRng,
}

impl SectorSampler {
    /// `bounds` must be valid (see [`Bounds::is_valid`])
    pub fn new(bounds: Bounds, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            bounds,
            x_dist: Uniform::new_inclusive(bounds.x_min, bounds.x_max),
            y_dist: Uniform::new_inclusive(bounds.y_min, bounds.y_max),
            rng,
        }
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Independent uniform draws over both axes of the bounds
    pub fn sample_uniform(&mut self) -> Point {
        Point::new(
            self.x_dist.sample(&mut self.rng),
            self.y_dist.sample(&mut self.rng),
        )
    }

    /// Draw a point inside `sector` within `max_radius` of `origin`,
    /// redrawing until it falls inside the bounds.
    ///
    /// Precondition: some part of the wedge around `origin` must lie inside
    /// the bounds, otherwise this never returns. Use
    /// [`try_sample_in_sector`](Self::try_sample_in_sector) to cap the retries.
    pub fn sample_in_sector(&mut self, origin: &Point, sector: &Sector, max_radius: f64) -> Point {
        loop {
            let p = self.draw_in_sector(origin, sector, max_radius);
            if self.bounds.contains(&p) {
                return p;
            }
        }
    }

    /// Bounded variant of [`sample_in_sector`](Self::sample_in_sector):
    /// returns `None` after `max_attempts` out-of-bounds draws.
    pub fn try_sample_in_sector(
        &mut self,
        origin: &Point,
        sector: &Sector,
        max_radius: f64,
        max_attempts: usize,
    ) -> Option<Point> {
        let bounds = self.bounds;
        (0..max_attempts)
            .map(|_| self.draw_in_sector(origin, sector, max_radius))
            .find(|p| bounds.contains(p))
    }

    fn draw_in_sector(&mut self, origin: &Point, sector: &Sector, max_radius: f64) -> Point {
        let distance = self.rng.gen_range(0.0..=max_radius);
        let (low, high) = sector.angle_range_rad();
        let angle = self.rng.gen_range(low..=high);
        Point::new(
            origin.x + distance * angle.cos(),
            origin.y + distance * angle.sin(),
        )
    }

    /// Weighted random choice of a sector; `None` for an empty set.
    pub fn select_sector<'a>(&mut self, sectors: &'a [Sector]) -> Option<&'a Sector> {
        let u: f64 = self.rng.gen();
        select_sector_with(sectors, u)
    }
}

/// Pick a sector given a uniform draw `u` in `[0, 1)`.
///
/// Priorities are normalized into a prefix-sum table and `u` is located by
/// binary search. Negative or non-finite priorities weigh zero; a set whose
/// weights sum to zero falls back to uniform choice over the set.
pub fn select_sector_with(sectors: &[Sector], u: f64) -> Option<&Sector> {
    if sectors.is_empty() {
        return None;
    }

    let weights: Vec<f64> = sectors
        .iter()
        .map(|s| {
            if s.priority.is_finite() {
                s.priority.max(0.0)
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();

    if total <= 0.0 || !total.is_finite() {
        let idx = ((u * sectors.len() as f64) as usize).min(sectors.len() - 1);
        return Some(&sectors[idx]);
    }

    let mut cumulative = Vec::with_capacity(weights.len());
    let mut acc = 0.0;
    for w in &weights {
        acc += w / total;
        cumulative.push(acc);
    }

    // First entry strictly greater than u; zero-weight entries share their
    // predecessor's cumulative value and are never hit. Rounding can leave
    // the last sum just under 1.0, so overshoot lands on the last weighted
    // sector.
    let last_weighted = weights.iter().rposition(|&w| w > 0.0).unwrap_or(0);
    let idx = cumulative
        .partition_point(|&c| c <= u)
        .min(last_weighted);
    Some(&sectors[idx])
}
