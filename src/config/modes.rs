//! Conversion level and variant policy definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far the pipeline runs after the segments are downloaded.
///
/// Levels are ordered: each one implies every lower level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConversionLevel {
    /// Keep the individual `.ts` segment files only.
    Segments,
    /// Concatenate the segments into one `.ts` file.
    Merged,
    /// Merge, then transcode into a playable `.mp4` file (default).
    #[default]
    Mp4,
}

impl fmt::Display for ConversionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionLevel::Segments => write!(f, "segments"),
            ConversionLevel::Merged => write!(f, "merged"),
            ConversionLevel::Mp4 => write!(f, "mp4"),
        }
    }
}

impl FromStr for ConversionLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "segments" => Ok(ConversionLevel::Segments),
            "merged" => Ok(ConversionLevel::Merged),
            "mp4" => Ok(ConversionLevel::Mp4),
            _ => Err(format!("Unknown conversion level: {}", s)),
        }
    }
}

/// Which variant to follow when a master playlist offers several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantPolicy {
    /// Largest `width x height` (default).
    #[default]
    LargestResolution,
    HighestBandwidth,
    LowestBandwidth,
}

impl fmt::Display for VariantPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantPolicy::LargestResolution => write!(f, "largest-resolution"),
            VariantPolicy::HighestBandwidth => write!(f, "highest-bandwidth"),
            VariantPolicy::LowestBandwidth => write!(f, "lowest-bandwidth"),
        }
    }
}

impl FromStr for VariantPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "largest-resolution" => Ok(VariantPolicy::LargestResolution),
            "highest-bandwidth" => Ok(VariantPolicy::HighestBandwidth),
            "lowest-bandwidth" => Ok(VariantPolicy::LowestBandwidth),
            _ => Err(format!("Unknown variant policy: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_level_ordering() {
        assert!(ConversionLevel::Segments < ConversionLevel::Merged);
        assert!(ConversionLevel::Merged < ConversionLevel::Mp4);
    }

    #[test]
    fn test_conversion_level_round_trip_names() {
        for level in [
            ConversionLevel::Segments,
            ConversionLevel::Merged,
            ConversionLevel::Mp4,
        ] {
            assert_eq!(level.to_string().parse::<ConversionLevel>(), Ok(level));
        }
        assert!("avi".parse::<ConversionLevel>().is_err());
    }

    #[test]
    fn test_variant_policy_from_str() {
        assert_eq!(
            "HIGHEST-BANDWIDTH".parse::<VariantPolicy>(),
            Ok(VariantPolicy::HighestBandwidth)
        );
        assert!("best".parse::<VariantPolicy>().is_err());
    }
}
