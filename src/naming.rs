//! Filename convention shared by every stage of the chain.
//!
//! All progress bookkeeping rests on these names: a file's trailing number
//! is its per-channel sequence number, and each stage prefixes the name of
//! the stage before it. Names that do not match the convention contribute
//! nothing to sequence computation; shared directories may hold foreign
//! files and that is not an error.

use regex::Regex;
use std::sync::OnceLock;

/// One phase of the pipeline, in fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generated,
    Converted,
    DetectorSim,
    Reconstructed,
    Sorted,
    Merged,
}

impl Stage {
    /// Canonical filename for `(channel, sequence)` at this stage.
    pub fn file_name(self, channel: &str, sequence: u32) -> String {
        match self {
            Stage::Generated => format!("sim_{channel}_{sequence:02}.root"),
            Stage::Converted => format!("sim_{channel}_{sequence:02}_mkin.root"),
            Stage::DetectorSim => format!("g4_sim_{channel}_{sequence:02}.root"),
            Stage::Reconstructed => format!("Acqu_g4_sim_{channel}_{sequence:02}.root"),
            Stage::Sorted => format!("GoAT_g4_sim_{channel}_{sequence:02}.root"),
            Stage::Merged => format!("Goat_merged_{channel}_{sequence:02}.root"),
        }
    }

    /// Human label used in run-state markers and log banners.
    pub fn describe(self) -> &'static str {
        match self {
            Stage::Generated => "Pluto simulation",
            Stage::Converted => "Converting files for Geant",
            Stage::DetectorSim => "Processing Geant simulation",
            Stage::Reconstructed => "AcquRoot particle reconstruction",
            Stage::Sorted => "GoAT particle sorting",
            Stage::Merged => "hadd file merging",
        }
    }
}

fn sequence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^.+_(\d+)(_mkin)?\..*$").expect("valid pattern"))
}

/// Extract the trailing sequence number from a chain filename.
///
/// Returns `None` for anything outside the convention instead of erroring.
pub fn sequence_number(file_name: &str) -> Option<u32> {
    let captures = sequence_pattern().captures(file_name)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Whether a filename carries the converter's `_mkin` marker.
pub fn is_converted(file_name: &str) -> bool {
    sequence_pattern()
        .captures(file_name)
        .is_some_and(|c| c.get(2).is_some())
}
