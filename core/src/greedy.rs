//! Streaming greedy piecewise linear segmentation.
//!
//! Points arrive one at a time in increasing key order. The first two points
//! of a segment open an error cone, bounded below by `rho_lower` and above by
//! `rho_upper`, whose lines cross at a fixed pivot. Every later point that
//! falls strictly inside the cone narrows it by rotating the bounding lines
//! around the pivot; the first point outside closes the segment and becomes
//! the first anchor of the next one.
//!
//! A segment never reopens and the engine never looks ahead, so each point
//! costs `O(1)` work.

use tracing::{debug, trace};

use crate::error::{PlrError, Result};
use crate::geometry::{Line, Point};
use crate::key::{key_from_f64, Key};
use crate::segment::Segment;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    AwaitingFirstTwoPoints,
    AwaitingSecondPoint,
    Fitting,
    Finished,
}

/// The greedy PLR state machine. Feed it points with [`GreedyPlr::feed`] and
/// close the stream with [`GreedyPlr::finish`]; every completed segment is
/// handed back as soon as it is known.
///
/// Segments carry an exclusive end key: one past the key of the last point the
/// segment accepted.
pub struct GreedyPlr<K> {
    state: State,
    gamma: f64,

    s0: Point,
    s1: Point,
    /// Key of the last accepted point, used both as the end marker and to
    /// drop out-of-order input
    last_key: Option<K>,

    pivot: Point,
    rho_lower: Line,
    rho_upper: Line,

    emitted: usize,
}

impl<K: Key> GreedyPlr<K> {
    /// Creates an engine with error bound `gamma`, which must be finite and
    /// strictly positive.
    pub fn new(gamma: f64) -> Result<Self> {
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(PlrError::InvalidGamma(gamma));
        }

        Ok(Self {
            state: State::AwaitingFirstTwoPoints,
            gamma,
            s0: Point::default(),
            s1: Point::default(),
            last_key: None,
            pivot: Point::default(),
            rho_lower: Line::default(),
            rho_upper: Line::default(),
            emitted: 0,
        })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of segments handed out so far, including the one from `finish`.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Processes the next point, returning the segment it closed, if any.
    ///
    /// A point whose key is not strictly greater than the last accepted key is
    /// dropped. Points must have finite coordinates and an integral x that fits
    /// in `K`.
    ///
    /// # Panics
    ///
    /// Panics if called after [`GreedyPlr::finish`].
    pub fn feed(&mut self, pt: Point) -> Result<Option<Segment<K>>> {
        assert!(
            self.state != State::Finished,
            "GreedyPlr::feed called after finish"
        );

        if !pt.is_finite() {
            return Err(PlrError::NonFiniteInput { x: pt.x, y: pt.y });
        }
        let key = to_key::<K>(pt.x)?;

        if let Some(last) = self.last_key {
            if key <= last {
                trace!(key = ?key, last = ?last, "dropping out-of-order point");
                return Ok(None);
            }
        }

        match self.state {
            State::AwaitingFirstTwoPoints => {
                self.s0 = pt;
                self.last_key = Some(key);
                self.state = State::AwaitingSecondPoint;
                Ok(None)
            }
            State::AwaitingSecondPoint => {
                self.s1 = pt;
                self.open_cone()?;
                self.last_key = Some(key);
                self.state = State::Fitting;
                Ok(None)
            }
            State::Fitting => self.fit(pt, key),
            State::Finished => unreachable!(),
        }
    }

    /// Closes the stream and returns the final segment, if any points were
    /// seen since the last emitted segment.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn finish(&mut self) -> Result<Option<Segment<K>>> {
        assert!(
            self.state != State::Finished,
            "GreedyPlr::finish called twice"
        );

        let segment = match std::mem::replace(&mut self.state, State::Finished) {
            State::AwaitingFirstTwoPoints => None,
            State::AwaitingSecondPoint => {
                // Only one anchor, no cone to speak of
                let x_start = to_key::<K>(self.s0.x)?;
                Some(Segment::with_end(
                    x_start,
                    x_start.saturating_add(K::one()),
                    0.0,
                    self.s0.y,
                ))
            }
            State::Fitting => Some(self.current_segment()?),
            State::Finished => unreachable!(),
        };

        if let Some(segment) = &segment {
            self.emit(segment);
        }

        Ok(segment)
    }

    fn open_cone(&mut self) -> Result<()> {
        let gamma = self.gamma;
        let rho_lower = Line::from_points(self.s0.upper_bound(gamma), self.s1.lower_bound(gamma))?;
        let rho_upper = Line::from_points(self.s0.lower_bound(gamma), self.s1.upper_bound(gamma))?;

        self.pivot = rho_lower.intersection(&rho_upper)?;
        self.rho_lower = rho_lower;
        self.rho_upper = rho_upper;
        Ok(())
    }

    fn fit(&mut self, pt: Point, key: K) -> Result<Option<Segment<K>>> {
        if !(self.rho_lower.is_above(pt) && self.rho_upper.is_below(pt)) {
            let segment = self.current_segment()?;
            self.emit(&segment);

            self.s0 = pt;
            self.last_key = Some(key);
            self.state = State::AwaitingSecondPoint;
            return Ok(Some(segment));
        }

        let upper = pt.upper_bound(self.gamma);
        let lower = pt.lower_bound(self.gamma);

        // The pivot lies strictly between s0 and s1, so it never shares an x
        // with a later point
        if self.rho_upper.is_below(upper) {
            self.rho_upper = Line::from_points(self.pivot, upper)?;
        }
        if self.rho_lower.is_above(lower) {
            self.rho_lower = Line::from_points(self.pivot, lower)?;
        }

        self.last_key = Some(key);
        Ok(None)
    }

    fn current_segment(&self) -> Result<Segment<K>> {
        let x_start = to_key::<K>(self.s0.x)?;
        let x_end = self.last_key.unwrap_or(x_start).saturating_add(K::one());

        let slope = (self.rho_upper.slope + self.rho_lower.slope) / 2.0;
        let intercept = -slope * self.pivot.x + self.pivot.y;

        Ok(Segment::with_end(x_start, x_end, slope, intercept))
    }

    fn emit(&mut self, segment: &Segment<K>) {
        self.emitted += 1;
        debug!(
            x_start = ?segment.x_start,
            x_end = ?segment.x_end,
            slope = segment.slope,
            intercept = segment.intercept,
            "emitted segment"
        );
    }
}

fn to_key<K: Key>(x: f64) -> Result<K> {
    if x.fract() != 0.0 {
        return Err(PlrError::FractionalKey(x));
    }
    key_from_f64(x).ok_or(PlrError::KeyOutOfRange(x))
}

/// Runs the greedy segmentation over a whole sorted stream of points.
pub fn greedy_segmentation<K: Key>(
    gamma: f64,
    points: impl IntoIterator<Item = Point>,
) -> Result<Vec<Segment<K>>> {
    let mut plr = GreedyPlr::new(gamma)?;
    let mut segments = Vec::new();

    for point in points {
        if let Some(segment) = plr.feed(point)? {
            segments.push(segment);
        }
    }
    segments.extend(plr.finish()?);

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use rand::{distributions::Uniform, Rng};
    use rand_distr::Normal;

    use super::*;

    fn points(pairs: &[(f64, f64)]) -> Vec<Point> {
        pairs.iter().copied().map(Point::from).collect()
    }

    /// Checks that every point is predicted within `gamma` by the segment that
    /// starts at or before its key
    fn assert_within_bound(points: &[Point], segments: &[Segment<u64>], gamma: f64) {
        let mut ix = 0;
        for pt in points {
            let key = pt.x as u64;
            while ix + 1 < segments.len() && segments[ix + 1].x_start <= key {
                ix += 1;
            }
            let seg = &segments[ix];
            assert!(seg.covers(key), "{seg:?} does not cover {key}");

            let err = (seg.predict(key) - pt.y).abs();
            assert!(
                err <= gamma + 1e-6,
                "point {pt:?} is {err} away from {seg:?} (gamma {gamma})"
            );
        }
    }

    #[test]
    fn no_points_no_segment() {
        let mut plr = GreedyPlr::<u64>::new(0.5).unwrap();
        assert_eq!(plr.finish().unwrap(), None);
        assert_eq!(plr.state(), State::Finished);
        assert_eq!(plr.emitted(), 0);
    }

    #[test]
    fn single_point_is_flat_segment() {
        let mut plr = GreedyPlr::<u64>::new(0.5).unwrap();
        assert_eq!(plr.feed(Point::new(7.0, 3.25)).unwrap(), None);
        assert_eq!(plr.state(), State::AwaitingSecondPoint);

        let seg = plr.finish().unwrap().unwrap();
        assert_eq!(seg.x_start, 7);
        assert_eq!(seg.x_end, Some(8));
        assert_eq!(seg.slope, 0.0);
        assert_eq!(seg.intercept, 3.25);
        assert_eq!(plr.emitted(), 1);
    }

    #[test]
    fn collinear_points_form_one_segment() {
        let data: Vec<Point> = (0..1_000)
            .map(|i| Point::new(i as f64, 2.0 * i as f64 + 1.0))
            .collect();
        let segments = greedy_segmentation::<u64>(0.01, data.clone()).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0], Segment::with_end(0, 1_000, 2.0, 1.0));
        assert_within_bound(&data, &segments, 0.01);
    }

    #[test]
    fn two_points_fit_exactly() {
        let segments = greedy_segmentation::<u64>(0.5, points(&[(1.0, 1.0), (3.0, 2.0)])).unwrap();
        assert_eq!(segments.len(), 1);

        let seg = segments[0];
        assert_eq!((seg.x_start, seg.x_end), (1, Some(4)));
        assert!((seg.predict(1) - 1.0).abs() < 1e-9);
        assert!((seg.predict(3) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn step_splits_segments() {
        let data = points(&[
            (1.0, 0.0),
            (2.0, 1.0),
            (3.0, 2.0),
            (4.0, 3.0),
            (10.0, 100.0),
            (11.0, 101.0),
            (12.0, 102.0),
        ]);
        let mut plr = GreedyPlr::<u64>::new(0.1).unwrap();

        let mut emitted = vec![];
        for (i, pt) in data.iter().enumerate() {
            if let Some(seg) = plr.feed(*pt).unwrap() {
                // The jump is the first point outside the cone
                assert_eq!(i, 4);
                emitted.push(seg);
            }
        }
        emitted.extend(plr.finish().unwrap());

        assert_eq!(emitted.len(), 2);
        assert_eq!((emitted[0].x_start, emitted[0].x_end), (1, Some(5)));
        assert_eq!((emitted[1].x_start, emitted[1].x_end), (10, Some(13)));
        assert_within_bound(&data, &emitted, 0.1);
    }

    #[test]
    fn rejected_point_alone_at_end() {
        let data = points(&[(1.0, 0.0), (2.0, 1.0), (3.0, 2.0), (4.0, 50.0)]);
        let segments = greedy_segmentation::<u64>(0.1, data.clone()).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], Segment::with_end(4, 5, 0.0, 50.0));
        assert_within_bound(&data, &segments, 0.1);
    }

    #[test]
    fn out_of_order_points_are_dropped() {
        let clean = points(&[(1.0, 0.0), (2.0, 1.0), (3.0, 2.0), (4.0, 3.0)]);
        let noisy = points(&[
            (1.0, 0.0),
            (1.0, 40.0),
            (2.0, 1.0),
            (0.0, -5.0),
            (3.0, 2.0),
            (2.0, 9.0),
            (4.0, 3.0),
        ]);

        let expected = greedy_segmentation::<u64>(0.1, clean).unwrap();
        let actual = greedy_segmentation::<u64>(0.1, noisy).unwrap();
        assert_eq!(expected, actual);
        assert_eq!(actual.len(), 1);
    }

    #[test]
    fn fractional_keys_are_rejected() {
        let data = points(&[(1.2, 0.0), (1.5, 0.0), (1.7, 100.0)]);
        assert_eq!(
            greedy_segmentation::<u64>(0.5, data),
            Err(PlrError::FractionalKey(1.2))
        );

        // Integral floats are fine, whatever their spelling
        let segments = greedy_segmentation::<u64>(0.5, points(&[(1.0, 0.0), (2e0, 1.0)])).unwrap();
        assert_eq!((segments[0].x_start, segments[0].x_end), (1, Some(3)));
    }

    #[test]
    fn order_is_checked_on_keys() {
        let mut plr = GreedyPlr::<i64>::new(0.5).unwrap();
        plr.feed(Point::new(-4.0, 0.0)).unwrap();
        plr.feed(Point::new(-2.0, 1.0)).unwrap();
        assert_eq!(plr.feed(Point::new(-3.0, 9.0)).unwrap(), None);
        assert_eq!(plr.feed(Point::new(-2.0, 9.0)).unwrap(), None);

        let seg = plr.finish().unwrap().unwrap();
        assert_eq!((seg.x_start, seg.x_end), (-4, Some(-1)));
        assert!((seg.predict(-2) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_point_is_idempotent() {
        let once = points(&[(1.0, 0.0), (4.0, 1.0), (6.0, 2.2), (9.0, 2.9), (15.0, 9.0)]);
        let twice = points(&[
            (1.0, 0.0),
            (4.0, 1.0),
            (6.0, 2.2),
            (6.0, 2.2),
            (9.0, 2.9),
            (15.0, 9.0),
        ]);

        assert_eq!(
            greedy_segmentation::<u64>(0.3, once).unwrap(),
            greedy_segmentation::<u64>(0.3, twice).unwrap()
        );
    }

    #[test]
    fn invalid_gamma() {
        assert!(matches!(GreedyPlr::<u64>::new(0.0), Err(PlrError::InvalidGamma(_))));
        assert!(matches!(GreedyPlr::<u64>::new(-1.0), Err(PlrError::InvalidGamma(_))));
        assert!(matches!(GreedyPlr::<u64>::new(f64::NAN), Err(PlrError::InvalidGamma(_))));
        assert!(matches!(GreedyPlr::<u64>::new(f64::INFINITY), Err(PlrError::InvalidGamma(_))));
    }

    #[test]
    fn bad_input_is_reported() {
        let mut plr = GreedyPlr::<u64>::new(0.5).unwrap();
        assert!(matches!(
            plr.feed(Point::new(1.0, f64::NAN)),
            Err(PlrError::NonFiniteInput { .. })
        ));
        assert_eq!(plr.feed(Point::new(-3.0, 1.0)), Err(PlrError::KeyOutOfRange(-3.0)));
        assert_eq!(plr.feed(Point::new(1.5, 1.0)), Err(PlrError::FractionalKey(1.5)));

        // Nothing was accepted
        assert_eq!(plr.state(), State::AwaitingFirstTwoPoints);
    }

    #[test]
    #[should_panic(expected = "after finish")]
    fn feed_after_finish_panics() {
        let mut plr = GreedyPlr::<u64>::new(0.5).unwrap();
        plr.feed(Point::new(1.0, 1.0)).unwrap();
        plr.finish().unwrap();
        let _ = plr.feed(Point::new(2.0, 2.0));
    }

    #[test]
    #[should_panic(expected = "called twice")]
    fn finish_twice_panics() {
        let mut plr = GreedyPlr::<u64>::new(0.5).unwrap();
        plr.finish().unwrap();
        let _ = plr.finish();
    }

    #[test]
    fn random_walk_stays_within_bound() {
        let mut rng = rand::thread_rng();
        let jumps = Normal::new(500.0, 100.0).unwrap();

        for gamma in [0.0005, 0.5, 2.0, 16.0] {
            let mut key = 1.0f64;
            let mut data = Vec::new();
            for rank in 0..5_000 {
                data.push(Point::new(key.floor(), rank as f64));
                let jump: f64 = rng.sample(jumps);
                key += jump.max(1.0);
            }

            let segments = greedy_segmentation::<u64>(gamma, data.clone()).unwrap();
            assert!(!segments.is_empty());
            assert!(segments.windows(2).all(|w| w[0].x_start < w[1].x_start));
            assert_within_bound(&data, &segments, gamma);
        }
    }

    #[test]
    fn random_positions_stay_within_bound() {
        let mut rng = rand::thread_rng();
        let gaps = Uniform::from(1u64..1_000);
        let noise = Uniform::from(-3.0..3.0);

        let mut key = 0u64;
        let data: Vec<Point> = (0..10_000)
            .map(|rank| {
                key += rng.sample(gaps);
                Point::new(key as f64, rank as f64 + rng.sample(noise))
            })
            .collect();

        let segments = greedy_segmentation::<u64>(4.0, data.clone()).unwrap();
        assert_within_bound(&data, &segments, 4.0);

        let coarse = greedy_segmentation::<u64>(64.0, data.clone()).unwrap();
        assert!(coarse.len() < data.len() / 10);
        assert_within_bound(&data, &coarse, 64.0);
    }
}
