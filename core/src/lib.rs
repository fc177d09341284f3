pub mod array;
pub mod codec;
pub mod config;
pub mod error;
pub mod geometry;
pub mod greedy;
pub mod key;
pub mod search;
pub mod segment;

pub use array::*;
pub use codec::Layout;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use greedy::*;
pub use key::*;
pub use search::*;
pub use segment::*;
