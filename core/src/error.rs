use thiserror::Error;

/// Errors raised while fitting, encoding or decoding a PLR index.
///
/// The geometric variants (`DegenerateLine`, `ParallelLines`, `InvalidGamma`,
/// `NonFiniteInput`, `KeyOutOfRange`, `FractionalKey`) mean the caller broke a precondition and
/// the computation cannot continue. The remaining variants describe a blob or
/// segment list which is malformed and can be reported back to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlrError {
    #[error("cannot build a line through two points sharing x = {x}")]
    DegenerateLine { x: f64 },

    #[error("lines with equal slope {slope} have no unique intersection")]
    ParallelLines { slope: f64 },

    #[error("error bound must be finite and positive, got {0}")]
    InvalidGamma(f64),

    #[error("point ({x}, {y}) has a non-finite coordinate")]
    NonFiniteInput { x: f64, y: f64 },

    #[error("x = {0} cannot be represented by the key type")]
    KeyOutOfRange(f64),

    #[error("x = {0} is not an integral key")]
    FractionalKey(f64),

    #[error("blob of {len} bytes is not a gamma field followed by whole {record}-byte records")]
    TruncatedBlob { len: usize, record: usize },

    #[error("blob does not start with the PLR index magic")]
    InvalidMagic,

    #[error("unsupported blob version {0}")]
    UnsupportedVersion(u16),

    #[error("blob stores {found}-byte keys, expected {expected}")]
    KeyWidthMismatch { expected: usize, found: usize },

    #[error("segment {index} does not start after its predecessor")]
    UnsortedSegments { index: usize },

    #[error("segment {index} has no end key, which the ranged layout requires")]
    MissingEndKey { index: usize },

    #[error("segment {index} has a non-finite slope or intercept")]
    NonFiniteSegment { index: usize },
}

pub type Result<T> = std::result::Result<T, PlrError>;

/// Why a lookup produced no position range.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    #[error("segment array is empty")]
    Empty,

    #[error("key precedes the first segment")]
    BeforeFirstSegment,
}
