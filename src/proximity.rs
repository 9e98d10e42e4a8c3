/*
Exclusion-radius lookups used by the selector.

An index is built for one radius and answers a single question: is any stored point
strictly closer than the radius to a query point? A NaN distance counts as "closer",
so points whose distance cannot be computed never slip through.

LinearScan checks every stored point. GridIndex buckets points into equal-angle
lat/lon cells and only checks the cells overlapping the query circle's bounding box,
which gives the same answer for far fewer haversine evaluations.
*/

use std::ops::RangeInclusive;

use fnv::FnvHashMap;

use crate::geo::{distance_miles, GeoPoint, EARTH_RADIUS_MILES};

pub trait ProximityIndex {
    fn with_radius(radius_miles: f64) -> Self
    where
        Self: Sized;

    fn insert(&mut self, point: GeoPoint);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if some stored point is closer than the radius to `point`, or its distance is NaN.
    fn has_point_within(&self, point: &GeoPoint) -> bool;
}

fn too_close(a: &GeoPoint, b: &GeoPoint, radius_miles: f64) -> bool {
    // Written as a negation so NaN lands on the rejecting side.
    !(distance_miles(a, b) >= radius_miles)
}

#[derive(Debug, Clone)]
pub struct LinearScan {
    radius_miles: f64,
    points: Vec<GeoPoint>,
}

impl ProximityIndex for LinearScan {
    fn with_radius(radius_miles: f64) -> Self {
        Self {
            radius_miles,
            points: Vec::new(),
        }
    }

    fn insert(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn has_point_within(&self, point: &GeoPoint) -> bool {
        self.points
            .iter()
            .any(|p| too_close(point, p, self.radius_miles))
    }
}

// Cells never get smaller than this, which caps the column count for tiny radii.
const MIN_CELL_DEGREES: f64 = 0.01;
// Slack added to every search window so rounding can only widen it.
const WINDOW_SLACK_DEGREES: f64 = 1e-6;

type Cell = (i64, i64);

#[derive(Copy, Clone)]
enum Columns {
    All,
    Span(i64, i64),
}

#[derive(Debug, Clone)]
pub struct GridIndex {
    radius_miles: f64,
    /// Search radius as a central angle, in degrees.
    reach_degrees: f64,
    cell_degrees: f64,
    columns: i64,
    len: usize,
    cells: FnvHashMap<Cell, Vec<GeoPoint>>,
    /// Points outside the valid lat/lon domain; always checked one by one.
    strays: Vec<GeoPoint>,
}

impl GridIndex {
    fn row_of(&self, latitude: f64) -> i64 {
        ((latitude + 90.0) / self.cell_degrees).floor() as i64
    }

    fn unwrapped_column_of(&self, longitude: f64) -> i64 {
        ((longitude + 180.0) / self.cell_degrees).floor() as i64
    }

    fn cell_of(&self, point: &GeoPoint) -> Cell {
        (
            self.row_of(point.latitude),
            self.unwrapped_column_of(point.longitude).rem_euclid(self.columns),
        )
    }

    /// Bounding box of the query circle in cell coordinates, or None when it is cheaper or
    /// necessary to look at everything.
    fn window(&self, point: &GeoPoint) -> Option<(RangeInclusive<i64>, Columns)> {
        if !point.is_valid() || !self.reach_degrees.is_finite() || self.reach_degrees >= 90.0 {
            return None;
        }
        let reach = self.reach_degrees * (1.0 + 1e-9) + WINDOW_SLACK_DEGREES;
        let lat_lo = point.latitude - reach;
        let lat_hi = point.latitude + reach;
        let rows = self.row_of(lat_lo.max(-90.0))..=self.row_of(lat_hi.min(90.0));

        // A circle reaching a pole spans every longitude.
        if lat_lo <= -90.0 || lat_hi >= 90.0 {
            return Some((rows, Columns::All));
        }
        let ratio = self.reach_degrees.to_radians().sin() / point.latitude.to_radians().cos();
        if !(ratio < 1.0) {
            return Some((rows, Columns::All));
        }
        let lon_reach = ratio.asin().to_degrees() * (1.0 + 1e-9) + WINDOW_SLACK_DEGREES;
        // One extra column either side absorbs rounding at the antimeridian seam.
        let lo = self.unwrapped_column_of(point.longitude - lon_reach) - 1;
        let hi = self.unwrapped_column_of(point.longitude + lon_reach) + 1;
        if hi - lo + 1 >= self.columns {
            Some((rows, Columns::All))
        } else {
            Some((rows, Columns::Span(lo, hi)))
        }
    }

    fn scan_all(&self, point: &GeoPoint) -> bool {
        self.cells
            .values()
            .flatten()
            .any(|p| too_close(point, p, self.radius_miles))
    }

    fn scan_cell(&self, cell: Cell, point: &GeoPoint) -> bool {
        self.cells.get(&cell).map_or(false, |points| {
            points.iter().any(|p| too_close(point, p, self.radius_miles))
        })
    }
}

impl ProximityIndex for GridIndex {
    fn with_radius(radius_miles: f64) -> Self {
        let reach_degrees = (radius_miles / EARTH_RADIUS_MILES).to_degrees();
        let desired = if reach_degrees.is_finite() {
            reach_degrees.clamp(MIN_CELL_DEGREES, 360.0)
        } else {
            360.0
        };
        let columns = ((360.0 / desired).floor() as i64).max(1);
        Self {
            radius_miles,
            reach_degrees,
            cell_degrees: 360.0 / columns as f64,
            columns,
            len: 0,
            cells: FnvHashMap::default(),
            strays: Vec::new(),
        }
    }

    fn insert(&mut self, point: GeoPoint) {
        self.len += 1;
        if !point.is_valid() {
            self.strays.push(point);
            return;
        }
        let cell = self.cell_of(&point);
        self.cells.entry(cell).or_default().push(point);
    }

    fn len(&self) -> usize {
        self.len
    }

    fn has_point_within(&self, point: &GeoPoint) -> bool {
        if self
            .strays
            .iter()
            .any(|p| too_close(point, p, self.radius_miles))
        {
            return true;
        }
        let (rows, columns) = match self.window(point) {
            Some(window) => window,
            None => return self.scan_all(point),
        };
        let row_count = (rows.end() - rows.start() + 1) as usize;
        let column_count = match columns {
            Columns::All => self.columns as usize,
            Columns::Span(lo, hi) => (hi - lo + 1) as usize,
        };
        if row_count.saturating_mul(column_count) > self.cells.len() {
            return self.scan_all(point);
        }
        for row in rows {
            let hit = match columns {
                Columns::All => (0..self.columns).any(|col| self.scan_cell((row, col), point)),
                Columns::Span(lo, hi) => (lo..=hi)
                    .any(|col| self.scan_cell((row, col.rem_euclid(self.columns)), point)),
            };
            if hit {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_point(rng: &mut ChaCha8Rng) -> GeoPoint {
        // Bias a share of points towards the poles and the antimeridian.
        match rng.gen_range(0..4) {
            0 => GeoPoint::new(rng.gen_range(85.0..=90.0), rng.gen_range(-180.0..=180.0)),
            1 => GeoPoint::new(rng.gen_range(-60.0..60.0), rng.gen_range(179.0..=180.0)),
            2 => GeoPoint::new(rng.gen_range(-60.0..60.0), rng.gen_range(-180.0..-179.0)),
            _ => GeoPoint::new(rng.gen_range(-90.0..=90.0), rng.gen_range(-180.0..=180.0)),
        }
    }

    #[test]
    fn empty_index_has_no_neighbors() {
        let linear = LinearScan::with_radius(5.0);
        let grid = GridIndex::with_radius(5.0);
        let p = GeoPoint::new(10.0, 10.0);
        assert!(linear.is_empty());
        assert!(grid.is_empty());
        assert!(!linear.has_point_within(&p));
        assert!(!grid.has_point_within(&p));
    }

    #[test]
    fn threshold_is_strict() {
        // ~69 miles apart.
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let d = distance_miles(&a, &b);

        let mut at_distance = GridIndex::with_radius(d);
        at_distance.insert(b);
        assert!(!at_distance.has_point_within(&a));

        let mut just_beyond = GridIndex::with_radius(d + 0.01);
        just_beyond.insert(b);
        assert!(just_beyond.has_point_within(&a));
    }

    #[test]
    fn zero_radius_never_conflicts() {
        let p = GeoPoint::new(33.0, -97.0);
        let mut linear = LinearScan::with_radius(0.0);
        let mut grid = GridIndex::with_radius(0.0);
        linear.insert(p);
        grid.insert(p);
        assert!(!linear.has_point_within(&p));
        assert!(!grid.has_point_within(&p));
    }

    #[test]
    fn grid_sees_across_the_antimeridian() {
        let mut grid = GridIndex::with_radius(5.0);
        grid.insert(GeoPoint::new(0.0, 179.99));
        assert!(grid.has_point_within(&GeoPoint::new(0.0, -179.99)));
        assert!(!grid.has_point_within(&GeoPoint::new(0.0, -179.5)));
    }

    #[test]
    fn grid_sees_across_the_pole() {
        let mut grid = GridIndex::with_radius(5.0);
        grid.insert(GeoPoint::new(89.99, 0.0));
        assert!(grid.has_point_within(&GeoPoint::new(89.99, 180.0)));
        assert!(!grid.has_point_within(&GeoPoint::new(89.0, 180.0)));
    }

    #[test]
    fn invalid_points_fail_closed() {
        let mut linear = LinearScan::with_radius(1.0);
        let mut grid = GridIndex::with_radius(1.0);
        linear.insert(GeoPoint::new(f64::NAN, 0.0));
        grid.insert(GeoPoint::new(f64::NAN, 0.0));
        let far = GeoPoint::new(45.0, 45.0);
        assert!(linear.has_point_within(&far));
        assert!(grid.has_point_within(&far));

        let mut grid = GridIndex::with_radius(1.0);
        grid.insert(GeoPoint::new(45.0, 45.0));
        assert!(grid.has_point_within(&GeoPoint::new(0.0, f64::NAN)));
    }

    #[test]
    fn grid_matches_linear_scan() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for &radius in &[0.5, 3.0, 25.0, 400.0, 7000.0] {
            let mut linear = LinearScan::with_radius(radius);
            let mut grid = GridIndex::with_radius(radius);
            for _ in 0..300 {
                let p = random_point(&mut rng);
                linear.insert(p);
                grid.insert(p);
            }
            assert_eq!(linear.len(), grid.len());
            for _ in 0..500 {
                let q = random_point(&mut rng);
                assert_eq!(
                    linear.has_point_within(&q),
                    grid.has_point_within(&q),
                    "radius {} query {:?}",
                    radius,
                    q
                );
            }
        }
    }

    #[test]
    fn grid_matches_linear_scan_for_clustered_points() {
        // Dense cluster so most queries sit near the threshold.
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let radius = 2.0;
        let mut linear = LinearScan::with_radius(radius);
        let mut grid = GridIndex::with_radius(radius);
        for _ in 0..200 {
            let p = GeoPoint::new(rng.gen_range(42.0..42.5), rng.gen_range(-71.5..-71.0));
            linear.insert(p);
            grid.insert(p);
        }
        for _ in 0..1000 {
            let q = GeoPoint::new(rng.gen_range(41.9..42.6), rng.gen_range(-71.6..-70.9));
            assert_eq!(linear.has_point_within(&q), grid.has_point_within(&q));
        }
    }
}
