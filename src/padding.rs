// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For deciding how much padding a rewritten file should have

use crate::Error;
use crate::file::PaddingInfo;

const KIB: u64 = 1024;

/// Padding thresholds, all in KiB
///
/// Existing padding whose size falls between the lower
/// and upper thresholds (inclusive) is left exactly as it is.
/// Anything else is replaced by padding of the target size.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PaddingConfig {
    target: u32,
    upper: u32,
    lower: u32,
}

impl PaddingConfig {
    /// Builds configuration from target size and thresholds, in KiB
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThresholds`] if the lower
    /// threshold is above the upper one.
    ///
    /// # Example
    ///
    /// ```
    /// use flac_fixer::{Error, padding::PaddingConfig};
    ///
    /// assert!(PaddingConfig::new(8, 20, 4).is_ok());
    /// assert!(matches!(
    ///     PaddingConfig::new(8, 4, 20),
    ///     Err(Error::InvalidThresholds { lower: 20, upper: 4 }),
    /// ));
    /// ```
    pub fn new(target: u32, upper: u32, lower: u32) -> Result<Self, Error> {
        if lower <= upper {
            Ok(Self {
                target,
                upper,
                lower,
            })
        } else {
            Err(Error::InvalidThresholds { lower, upper })
        }
    }

    /// Padding size written when existing padding is out of bounds, in KiB
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Upper threshold, in KiB
    pub fn upper(&self) -> u32 {
        self.upper
    }

    /// Lower threshold, in KiB
    pub fn lower(&self) -> u32 {
        self.lower
    }

    /// Given the current padding size in bytes, returns the new size in bytes
    ///
    /// A negative current size means there is no room for padding
    /// at all, which is always out of bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use flac_fixer::padding::PaddingConfig;
    ///
    /// let config = PaddingConfig::default();  // 8 KiB, between 4 and 20 KiB
    ///
    /// assert_eq!(config.padding(10240), 10240);  // left as found
    /// assert_eq!(config.padding(4096), 4096);    // thresholds are inclusive
    /// assert_eq!(config.padding(2048), 8192);    // too small
    /// assert_eq!(config.padding(65536), 8192);   // too large
    /// assert_eq!(config.padding(-4), 8192);      // no room
    /// ```
    pub fn padding(&self, current: i64) -> u64 {
        let band = u64::from(self.lower) * KIB..=u64::from(self.upper) * KIB;

        match u64::try_from(current) {
            Ok(current) if band.contains(&current) => current,
            _ => u64::from(self.target) * KIB,
        }
    }

    /// Applies ourself to the space available when committing a file
    pub fn apply(&self, info: PaddingInfo) -> u64 {
        self.padding(info.padding)
    }
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            target: 8,
            upper: 20,
            lower: 4,
        }
    }
}
