//! `plr_engine` builds error-bounded piecewise linear indexes over sorted
//! integer keys, and answers position queries with a guaranteed range.
//!
//! A stream of `(key, position)` pairs, sorted by key, is compressed into a
//! small array of line segments. Every key that was part of the training data
//! can later be located to within `gamma` of its true position:
//!
//! ```
//! use plr_engine::prelude::*;
//!
//! # fn main() -> plr_engine::Result<()> {
//! let keys: Vec<u64> = (0..10_000).map(|i| i * i / 64 + 3 * i).collect();
//! let points = keys
//!     .iter()
//!     .enumerate()
//!     .map(|(rank, &key)| Point::new(key as f64, rank as f64));
//!
//! let index: SegmentArray<u64> = SegmentArray::train(0.5, Layout::Ranged, points)?;
//!
//! let pos = index.lookup(keys[1234]).unwrap();
//! assert!(pos.contains(1234));
//! # Ok(())
//! # }
//! ```
//!
//! Segments can also be produced one at a time with [`GreedyPlr`], which
//! never buffers more than the current segment:
//!
//! ```
//! use plr_engine::prelude::*;
//!
//! # fn main() -> plr_engine::Result<()> {
//! let mut plr = GreedyPlr::<u32>::new(0.25)?;
//! let mut segments = Vec::new();
//!
//! for (x, y) in [(1.0, 0.0), (2.0, 1.0), (3.0, 2.0), (40.0, 3.0), (41.0, 4.0)] {
//!     segments.extend(plr.feed(Point::new(x, y))?);
//! }
//! segments.extend(plr.finish()?);
//!
//! assert_eq!(segments.len(), 2);
//! assert_eq!(segments[1].x_start, 40);
//! # Ok(())
//! # }
//! ```
//!
//! A built index is persisted with [`SegmentArray::encode`], a portable
//! framed blob, or [`SegmentArray::encode_raw`], the bare native-endian
//! record format.
#![deny(missing_docs)]

/// Include this at the top of the file when training or querying an index.
pub mod prelude {
    pub use plr_core::{
        ApproxPos, GreedyPlr, Key, Layout, LookupError, OutOfRange, PlrConfig, PlrError, Point,
        Segment, SegmentArray,
    };
}

pub use plr_core::{greedy_segmentation, key_from_f64, key_to_f64};
pub use plr_core::{
    ApproxPos, GreedyPlr, Key, Layout, Line, LookupError, OutOfRange, PlrConfig, PlrError, Point,
    Result, Segment, SegmentArray, State,
};

/// Binary blob formats.
pub mod codec {
    pub use plr_core::codec::*;
}

#[doc(hidden)]
pub use plr_core as private;
