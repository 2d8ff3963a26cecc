//! Filesystem-derived progress bookkeeping.
//!
//! The chain persists no structured state: the directories themselves are
//! the source of truth, rescanned at the start of every run. For each
//! channel the inventory computes the highest sequence number seen per
//! stage and derives the resume point as the overall maximum, so new work
//! always extends past every existing file and never overwrites one.
//!
//! Cross-stage misalignment is reported through the [`Confirm`] port and
//! must be acknowledged before the run proceeds; a wrong resume point
//! would corrupt later merges, which is irreversible.

use anyhow::{Context, Result};
use std::path::Path;

use crate::channel::display_channel;
use crate::naming::{is_converted, sequence_number};

/// Blocking acknowledgment port; terminal and test front ends both fit.
pub trait Confirm {
    fn acknowledge(&mut self, message: &str) -> Result<()>;
}

/// Directory listings captured once per run, split by stage convention.
#[derive(Debug, Clone, Default)]
pub struct StageInventory {
    pluto: Vec<String>,
    mkin: Vec<String>,
    geant: Vec<String>,
}

/// Highest sequence number observed per stage for one channel; 0 if none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMaxima {
    pub generated: u32,
    pub converted: u32,
    pub detector: u32,
}

impl StageInventory {
    /// Scan the generator and detector output directories.
    pub fn scan(pluto_dir: &Path, geant_dir: &Path) -> Result<StageInventory> {
        let sim_files = list_dir(pluto_dir)?;
        let geant = list_dir(geant_dir)?;
        let (mkin, pluto) = sim_files.into_iter().partition(|name| is_converted(name));
        Ok(StageInventory {
            pluto,
            mkin,
            geant,
        })
    }

    /// Build an inventory from in-memory listings; scan() ends here too.
    pub fn from_listings(pluto: Vec<String>, mkin: Vec<String>, geant: Vec<String>) -> Self {
        StageInventory { pluto, mkin, geant }
    }

    pub fn channel_maxima(&self, channel: &str) -> ChannelMaxima {
        ChannelMaxima {
            generated: max_sequence(&self.pluto, channel),
            converted: max_sequence(&self.mkin, channel),
            detector: max_sequence(&self.geant, channel),
        }
    }

    /// Count files present per stage for one channel.
    pub fn channel_counts(&self, channel: &str) -> (usize, usize, usize) {
        (
            count_matching(&self.pluto, channel),
            count_matching(&self.mkin, channel),
            count_matching(&self.geant, channel),
        )
    }

    /// Resume point for a channel: the largest per-stage maximum, after any
    /// consistency warnings have been acknowledged.
    pub fn resume_point(&self, channel: &str, confirm: &mut dyn Confirm) -> Result<u32> {
        let maxima = self.channel_maxima(channel);
        let pretty = display_channel(channel, false);
        let mut max = maxima.generated;

        match maxima.generated.cmp(&maxima.converted) {
            std::cmp::Ordering::Greater => {
                confirm.acknowledge(&format!(
                    "Maybe there are some files for channel {pretty} that\n\
                     aren't converted yet (and hence simulated with Geant4)"
                ))?;
            }
            std::cmp::Ordering::Less => {
                confirm.acknowledge(&format!(
                    "There are more converted files than Pluto generated ones\n\
                     for channel {pretty} - proceed at your own risk"
                ))?;
                max = maxima.converted;
            }
            std::cmp::Ordering::Equal => {}
        }

        match maxima.detector.cmp(&max) {
            std::cmp::Ordering::Greater => {
                // Extra detector files are permitted; the resume point still
                // moves past them so nothing gets overwritten.
                confirm.acknowledge(&format!(
                    "There are more Geant4 simulation files than Pluto generated\n\
                     files for channel {pretty}"
                ))?;
                max = maxima.detector;
            }
            std::cmp::Ordering::Less => {
                confirm.acknowledge(&format!(
                    "Some Geant4 simulation files are missing for channel {pretty}"
                ))?;
            }
            std::cmp::Ordering::Equal => {}
        }

        Ok(max)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn max_sequence(names: &[String], channel: &str) -> u32 {
    names
        .iter()
        .filter(|name| name.contains(channel))
        .filter_map(|name| sequence_number(name))
        .max()
        .unwrap_or(0)
}

fn count_matching(names: &[String], channel: &str) -> usize {
    names
        .iter()
        .filter(|name| name.contains(channel) && sequence_number(name).is_some())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) struct Recorder(pub Vec<String>);

    impl Confirm for Recorder {
        fn acknowledge(&mut self, message: &str) -> Result<()> {
            self.0.push(message.to_string());
            Ok(())
        }
    }

    fn inventory(pluto: &[&str], mkin: &[&str], geant: &[&str]) -> StageInventory {
        StageInventory::from_listings(
            pluto.iter().map(|s| s.to_string()).collect(),
            mkin.iter().map(|s| s.to_string()).collect(),
            geant.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn aligned_stages_need_no_confirmation() {
        let inv = inventory(
            &["sim_pi0_gg_01.root", "sim_pi0_gg_05.root"],
            &["sim_pi0_gg_01_mkin.root", "sim_pi0_gg_05_mkin.root"],
            &["g4_sim_pi0_gg_05.root"],
        );
        let mut confirm = Recorder(Vec::new());
        let max = inv.resume_point("pi0_gg", &mut confirm).expect("resume");
        assert_eq!(max, 5);
        // Detector lags the maximum within 1..5 but its max matches; the
        // resume contract only compares maxima.
        assert!(confirm.0.is_empty());
    }

    #[test]
    fn foreign_files_are_ignored() {
        let inv = inventory(
            &["sim_pi0_gg_02.root", "README", "plot.pdf"],
            &[],
            &["notes.txt"],
        );
        let maxima = inv.channel_maxima("pi0_gg");
        assert_eq!(maxima.generated, 2);
        assert_eq!(maxima.detector, 0);
    }

    #[test]
    fn maxima_are_monotonic_in_added_files() {
        let mut pluto = vec!["sim_pi0_gg_03.root".to_string()];
        let inv = StageInventory::from_listings(pluto.clone(), Vec::new(), Vec::new());
        let before = inv.channel_maxima("pi0_gg").generated;
        pluto.push("sim_pi0_gg_07.root".to_string());
        let inv = StageInventory::from_listings(pluto, Vec::new(), Vec::new());
        let after = inv.channel_maxima("pi0_gg").generated;
        assert!(after >= before);
        assert_eq!(after, 7);
    }

    #[test]
    fn unconverted_surplus_warns_and_keeps_generated_max() {
        let inv = inventory(
            &["sim_pi0_gg_04.root"],
            &["sim_pi0_gg_02_mkin.root"],
            &["g4_sim_pi0_gg_04.root"],
        );
        let mut confirm = Recorder(Vec::new());
        let max = inv.resume_point("pi0_gg", &mut confirm).expect("resume");
        assert_eq!(max, 4);
        assert_eq!(confirm.0.len(), 1);
        assert!(confirm.0[0].contains("aren't converted yet"));
    }

    #[test]
    fn extra_detector_files_warn_but_extend_resume_point() {
        let inv = inventory(
            &["sim_pi0_gg_03.root"],
            &["sim_pi0_gg_03_mkin.root"],
            &["g4_sim_pi0_gg_06.root"],
        );
        let mut confirm = Recorder(Vec::new());
        let max = inv.resume_point("pi0_gg", &mut confirm).expect("resume");
        assert_eq!(max, 6);
        assert_eq!(confirm.0.len(), 1);
        assert!(confirm.0[0].contains("more Geant4 simulation files"));
    }

    #[test]
    fn missing_detector_files_warn_without_lowering_resume_point() {
        let inv = inventory(
            &["sim_pi0_gg_05.root"],
            &["sim_pi0_gg_05_mkin.root"],
            &["g4_sim_pi0_gg_02.root"],
        );
        let mut confirm = Recorder(Vec::new());
        let max = inv.resume_point("pi0_gg", &mut confirm).expect("resume");
        assert_eq!(max, 5);
        assert_eq!(confirm.0.len(), 1);
        assert!(confirm.0[0].contains("missing"));
    }

    #[test]
    fn empty_directories_resume_at_zero() {
        let inv = inventory(&[], &[], &[]);
        let mut confirm = Recorder(Vec::new());
        assert_eq!(inv.resume_point("pi0_gg", &mut confirm).expect("resume"), 0);
        assert!(confirm.0.is_empty());
    }
}
