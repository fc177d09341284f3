use serde::{Deserialize, Serialize};

use crate::array::OutOfRange;
use crate::codec::Layout;
use crate::error::{PlrError, Result};

pub const DEFAULT_GAMMA: f64 = 0.0005;

/// Parameters for building and querying an index. Missing fields take their
/// default when deserialized.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct PlrConfig {
    pub gamma: f64,
    pub layout: Layout,
    pub out_of_range: OutOfRange,
}

impl Default for PlrConfig {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            layout: Layout::default(),
            out_of_range: OutOfRange::default(),
        }
    }
}

impl PlrConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(PlrError::InvalidGamma(self.gamma));
        }
        Ok(())
    }
}
