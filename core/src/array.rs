//! The segment array: an error bound plus key-ordered segments, queried with
//! a floor search over segment start keys.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::{self, Layout};
use crate::error::{LookupError, PlrError, Result};
use crate::geometry::Point;
use crate::greedy::GreedyPlr;
use crate::key::Key;
use crate::search::{floor_index, OptimalSearch, Search};
use crate::segment::Segment;

/// What to do with a key smaller than every segment start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRange {
    /// Report [`LookupError::BeforeFirstSegment`].
    #[default]
    Reject,
    /// Answer with the first segment.
    Clamp,
}

/// Inclusive range of candidate positions for a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApproxPos {
    pub lo: i64,
    pub hi: i64,
}

impl ApproxPos {
    pub fn contains(&self, pos: i64) -> bool {
        self.lo <= pos && pos <= self.hi
    }
}

/// A collection of segments sorted by `x_start` with unique starts, together
/// with the error bound they were fitted with.
///
/// Lookups take `&self`, so a built array can be shared by any number of
/// readers.
#[derive(Clone, Debug)]
pub struct SegmentArray<K> {
    gamma: f64,
    layout: Layout,
    out_of_range: OutOfRange,
    segments: Vec<Segment<K>>,
}

impl<K: Key> SegmentArray<K> {
    pub fn new(gamma: f64, layout: Layout) -> Self {
        Self {
            gamma,
            layout,
            out_of_range: OutOfRange::default(),
            segments: Vec::new(),
        }
    }

    /// Builds an array from a list of segments, checking that it is sorted and
    /// finite. End keys are discarded under the compact layout.
    pub fn from_segments(gamma: f64, layout: Layout, segments: Vec<Segment<K>>) -> Result<Self> {
        let mut array = Self::new(gamma, layout);
        array.segments.reserve(segments.len());
        array.extend(segments)?;
        Ok(array)
    }

    pub(crate) fn from_sorted(gamma: f64, layout: Layout, segments: Vec<Segment<K>>) -> Self {
        debug_assert!(segments.windows(2).all(|w| w[0].x_start < w[1].x_start));
        Self {
            gamma,
            layout,
            out_of_range: OutOfRange::default(),
            segments,
        }
    }

    /// Fits a sorted stream of points with the greedy segmentation and
    /// collects the result.
    pub fn train(
        gamma: f64,
        layout: Layout,
        points: impl IntoIterator<Item = Point>,
    ) -> Result<Self> {
        let mut plr = GreedyPlr::new(gamma)?;
        let mut array = Self::new(gamma, layout);

        for point in points {
            if let Some(segment) = plr.feed(point)? {
                array.push(segment)?;
            }
        }
        if let Some(segment) = plr.finish()? {
            array.push(segment)?;
        }

        Ok(array)
    }

    pub fn with_out_of_range(mut self, out_of_range: OutOfRange) -> Self {
        self.out_of_range = out_of_range;
        self
    }

    pub fn set_out_of_range(&mut self, out_of_range: OutOfRange) {
        self.out_of_range = out_of_range;
    }

    /// Appends a segment, which must be finite and start after the current
    /// last one. The compact layout stores no end key, so one is dropped here
    /// to keep encoding lossless.
    pub fn push(&mut self, mut segment: Segment<K>) -> Result<()> {
        if !(segment.slope.is_finite() && segment.intercept.is_finite()) {
            return Err(PlrError::NonFiniteSegment {
                index: self.segments.len(),
            });
        }
        if let Some(last) = self.segments.last() {
            if last.x_start >= segment.x_start {
                return Err(PlrError::UnsortedSegments {
                    index: self.segments.len(),
                });
            }
        }

        if self.layout == Layout::Compact {
            segment.x_end = None;
        }

        self.segments.push(segment);
        Ok(())
    }

    /// Appends every segment in order, stopping at the first one [`push`]
    /// refuses.
    ///
    /// [`push`]: SegmentArray::push
    pub fn extend(&mut self, segments: impl IntoIterator<Item = Segment<K>>) -> Result<()> {
        segments.into_iter().try_for_each(|segment| self.push(segment))
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn out_of_range(&self) -> OutOfRange {
        self.out_of_range
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment<K>] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment<K>> {
        self.segments.iter()
    }

    pub fn first(&self) -> Option<&Segment<K>> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment<K>> {
        self.segments.last()
    }

    /// The last segment starting at or before `key`, subject to the
    /// out-of-range policy for keys before the first segment.
    pub fn segment_for(&self, key: K) -> std::result::Result<&Segment<K>, LookupError> {
        if self.segments.is_empty() {
            return Err(LookupError::Empty);
        }

        match floor_index(OptimalSearch::search_by_key(&self.segments, &key)) {
            Some(index) => Ok(&self.segments[index]),
            None => match self.out_of_range {
                OutOfRange::Reject => Err(LookupError::BeforeFirstSegment),
                OutOfRange::Clamp => Ok(&self.segments[0]),
            },
        }
    }

    /// Raw predicted position of `key`.
    pub fn predict(&self, key: K) -> std::result::Result<f64, LookupError> {
        self.segment_for(key).map(|segment| segment.predict(key))
    }

    /// Range of positions guaranteed to hold `key`'s true position, if `key`
    /// was part of the fitted data: `[floor(p - gamma), ceil(p + gamma)]` for
    /// the prediction `p`.
    pub fn lookup(&self, key: K) -> std::result::Result<ApproxPos, LookupError> {
        let predicted = self.predict(key)?;

        Ok(ApproxPos {
            lo: (predicted - self.gamma).floor() as i64,
            hi: (predicted + self.gamma).ceil() as i64,
        })
    }

    /// Encodes as a portable framed blob, leaving the array intact.
    pub fn encode(&self) -> Result<Bytes> {
        codec::encode(self)
    }

    /// Encodes as a raw native-endian blob, leaving the array intact.
    pub fn encode_raw(&self) -> Result<Bytes> {
        codec::encode_raw(self)
    }

    /// Encodes as a framed blob, consuming the array.
    pub fn into_bytes(self) -> Result<Bytes> {
        codec::encode(&self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }

    pub fn decode_raw(bytes: &[u8], layout: Layout) -> Result<Self> {
        codec::decode_raw(bytes, layout)
    }
}

/// Gamma must match exactly, segments approximately and in the same order.
impl<K: PartialEq> PartialEq for SegmentArray<K> {
    fn eq(&self, other: &Self) -> bool {
        self.gamma == other.gamma && self.layout == other.layout && self.segments == other.segments
    }
}

impl<'a, K> IntoIterator for &'a SegmentArray<K> {
    type Item = &'a Segment<K>;
    type IntoIter = std::slice::Iter<'a, Segment<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
