//! Process-wide configuration and preflight path resolution.
//!
//! `Settings` is deserialized once at startup (or defaulted) and never
//! mutated afterwards; everything downstream receives it by reference.
//! `Paths::resolve` turns the raw settings into validated absolute
//! directories and tool locations, failing with a remedial instruction
//! before any compute is spent.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::fsguard::{ensure_dir, is_readable, is_writable, require_file};

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root under which all chain output and logs are stored.
    pub output_root: String,
    /// Per-stage subdirectory names under the output root.
    pub pluto_dir: String,
    pub geant_dir: String,
    pub acqu_dir: String,
    pub goat_dir: String,
    pub merged_dir: String,
    /// Directory holding `simulate.C`; the ROOT driver script is written
    /// and executed here.
    pub generator_dir: String,
    /// Directory holding the per-channel `g4run_<channel>.mac` templates.
    pub macro_dir: String,
    /// A2 Geant4 install root (contains the `A2` and `pluto2mkin` binaries).
    pub geant_path: String,
    /// Run reconstruction, sorting and merging after the detector stage.
    pub reconstruct: bool,
    pub acqu_path: String,
    pub acqu_build: String,
    /// AcquRoot config, relative to `<acqu_path>/acqu_user`.
    pub acqu_config: String,
    pub goat_path: String,
    pub goat_build: String,
    /// GoAT config, relative to `goat_path`.
    pub goat_config: String,
    /// Smear the event vertex during conversion: uniform along the target,
    /// gaussian across the beam spot.
    pub smear_vertex: bool,
    pub target_length_cm: f64,
    pub beam_diameter_cm: f64,
    /// Command lines for the PATH-resolved tools, shell-words syntax.
    pub root_command: String,
    pub hadd_command: String,
    /// Events per file assumed by the `--list-events` estimate.
    pub nominal_events_per_file: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output_root: "~/MC".to_string(),
            pluto_dir: "sim_data".to_string(),
            geant_dir: "g4_sim".to_string(),
            acqu_dir: "acqu".to_string(),
            goat_dir: "goat".to_string(),
            merged_dir: "merged".to_string(),
            generator_dir: ".".to_string(),
            macro_dir: "g4run".to_string(),
            geant_path: "~/a2geant".to_string(),
            reconstruct: true,
            acqu_path: "~/acqu".to_string(),
            acqu_build: "~/acqu/build".to_string(),
            acqu_config: "data/AR.MC".to_string(),
            goat_path: "~/a2GoAT".to_string(),
            goat_build: "~/a2GoAT/build".to_string(),
            goat_config: "configfiles/GoAT-Convert.dat".to_string(),
            smear_vertex: false,
            target_length_cm: 10.0,
            beam_diameter_cm: 2.0,
            root_command: "root -l -b -q".to_string(),
            hadd_command: "hadd".to_string(),
            nominal_events_per_file: 1000,
        }
    }
}

pub const DEFAULT_SETTINGS_FILE: &str = "simchain.json";

impl Settings {
    /// Load settings from an explicit file, the default `simchain.json`
    /// when present, or built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Settings> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !default.is_file() {
                    return Ok(Settings::default());
                }
                default
            }
        };
        let bytes =
            std::fs::read(&path).with_context(|| format!("read settings {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse settings {}", path.display()))
    }

    pub fn output_root(&self) -> PathBuf {
        expand_user(&self.output_root)
    }

    pub fn pluto_data(&self) -> PathBuf {
        self.output_root().join(&self.pluto_dir)
    }

    pub fn geant_data(&self) -> PathBuf {
        self.output_root().join(&self.geant_dir)
    }
}

/// Expand a leading `~` against the user's home directory.
pub fn expand_user(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~") {
        if rest.is_empty() {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        } else if let Some(stripped) = rest.strip_prefix('/') {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
    }
    PathBuf::from(path)
}

/// Split a configured command string into program + leading arguments.
pub fn parse_command(command: &str, label: &str) -> Result<Vec<String>> {
    let words = shell_words::split(command)
        .with_context(|| format!("parse configured {label} command '{command}'"))?;
    if words.is_empty() {
        return Err(anyhow!("configured {label} command is empty"));
    }
    Ok(words)
}

/// Validated absolute locations for one run; constructed once by preflight.
#[derive(Debug, Clone)]
pub struct Paths {
    pub output_root: PathBuf,
    pub pluto_data: PathBuf,
    pub geant_data: PathBuf,
    pub generator_dir: PathBuf,
    pub macro_dir: PathBuf,
    pub geant_path: PathBuf,
    pub acqu_user: PathBuf,
    pub acqu_bin: PathBuf,
    pub acqu_config: String,
    pub acqu_data: PathBuf,
    pub goat_path: PathBuf,
    pub goat_bin: PathBuf,
    pub goat_config: String,
    pub goat_data: PathBuf,
    pub merged_data: PathBuf,
    pub root_command: Vec<String>,
    pub hadd_command: Vec<String>,
}

impl Paths {
    /// Run the full preflight and resolve every location the stages need.
    ///
    /// A single run may take days, so everything is checked before any
    /// stage spends compute. Reconstruction-only checks are skipped when
    /// reconstruction is disabled.
    pub fn resolve(settings: &Settings) -> Result<Paths> {
        let output_root = settings.output_root();
        if !ensure_dir(&output_root, false)? {
            return Err(anyhow!(
                "please make sure the specified output directory exists"
            ));
        }
        if !is_writable(&output_root) {
            return Err(anyhow!(
                "the output directory '{}' is not writable",
                output_root.display()
            ));
        }

        let geant_path = expand_user(&settings.geant_path);
        if !ensure_dir(&geant_path, false)? {
            return Err(anyhow!(
                "please make sure your Geant4 installation can be found within the specified path"
            ));
        }
        if !is_readable(&geant_path) {
            return Err(anyhow!(
                "the Geant4 directory '{}' is not readable",
                geant_path.display()
            ));
        }
        if !require_file(&geant_path, "A2") {
            return Err(anyhow!(
                "A2 Geant4 executable not found in '{}'",
                geant_path.display()
            ));
        }
        if !require_file(&geant_path, "pluto2mkin") {
            return Err(anyhow!(
                "no pluto2mkin executable in the Geant directory found; \
                 please make sure it is there or build it"
            ));
        }

        let pluto_data = settings.pluto_data();
        if !ensure_dir(&pluto_data, true)? {
            return Err(anyhow!(
                "please make sure the Pluto output directory exists or could be created"
            ));
        }
        let geant_data = settings.geant_data();
        if !ensure_dir(&geant_data, true)? {
            return Err(anyhow!(
                "please make sure the Geant output directory exists or could be created"
            ));
        }

        let generator_dir = expand_user(&settings.generator_dir);
        if !require_file(&generator_dir, "simulate.C") {
            return Err(anyhow!(
                "please make sure simulate.C is available in '{}'",
                generator_dir.display()
            ));
        }
        let macro_dir = expand_user(&settings.macro_dir);

        let root_command = parse_command(&settings.root_command, "ROOT")?;
        locate_tool(&root_command[0], "ROOT")?;

        let mut paths = Paths {
            output_root,
            pluto_data,
            geant_data,
            generator_dir,
            macro_dir,
            geant_path,
            acqu_user: PathBuf::new(),
            acqu_bin: PathBuf::new(),
            acqu_config: settings.acqu_config.clone(),
            acqu_data: PathBuf::new(),
            goat_path: PathBuf::new(),
            goat_bin: PathBuf::new(),
            goat_config: settings.goat_config.clone(),
            goat_data: PathBuf::new(),
            merged_data: PathBuf::new(),
            root_command,
            hadd_command: Vec::new(),
        };

        if settings.reconstruct {
            paths.resolve_reconstruction(settings)?;
        }

        Ok(paths)
    }

    fn resolve_reconstruction(&mut self, settings: &Settings) -> Result<()> {
        let acqu_path = expand_user(&settings.acqu_path);
        if !ensure_dir(&acqu_path, false)? {
            return Err(anyhow!(
                "please make sure your acqu directory can be found at the given path"
            ));
        }
        self.acqu_user = acqu_path.join("acqu_user");
        if !ensure_dir(&self.acqu_user, false)? {
            return Err(anyhow!("please make sure you installed acqu properly"));
        }
        self.acqu_bin = expand_user(&settings.acqu_build).join("bin");
        if !require_file(&self.acqu_bin, "AcquRoot") {
            return Err(anyhow!(
                "could not find the main AcquRoot executable; \
                 please make sure you installed acqu properly"
            ));
        }
        if !require_file(&self.acqu_user, &settings.acqu_config) {
            return Err(anyhow!(
                "could not find your specified AcquRoot config file"
            ));
        }
        self.acqu_data = self.output_root.join(&settings.acqu_dir);
        if !ensure_dir(&self.acqu_data, true)? {
            return Err(anyhow!(
                "please make sure the AcquRoot output directory exists or could be created"
            ));
        }
        check_goat_analysis(&self.acqu_user, &settings.acqu_config)?;

        self.goat_path = expand_user(&settings.goat_path);
        if !ensure_dir(&self.goat_path, false)? {
            return Err(anyhow!(
                "please make sure your goat directory can be found at the given path"
            ));
        }
        self.goat_bin = expand_user(&settings.goat_build).join("bin");
        if !require_file(&self.goat_bin, "goat") {
            return Err(anyhow!(
                "could not find the main goat executable; \
                 please make sure you installed GoAT properly"
            ));
        }
        if !require_file(&self.goat_path, &settings.goat_config) {
            return Err(anyhow!("could not find your specified goat config file"));
        }
        self.goat_data = self.output_root.join(&settings.goat_dir);
        if !ensure_dir(&self.goat_data, true)? {
            return Err(anyhow!(
                "please make sure the GoAT output directory exists or could be created"
            ));
        }

        self.merged_data = self.output_root.join(&settings.merged_dir);
        if !ensure_dir(&self.merged_data, true)? {
            return Err(anyhow!(
                "please make sure the output directory for merged files exists or could be created"
            ));
        }

        self.hadd_command = parse_command(&settings.hadd_command, "hadd")?;
        locate_tool(&self.hadd_command[0], "hadd")?;
        Ok(())
    }
}

fn locate_tool(program: &str, label: &str) -> Result<()> {
    if program.contains('/') {
        let path = Path::new(program);
        if !path.is_file() {
            return Err(anyhow!("configured {label} binary '{program}' not found"));
        }
        return Ok(());
    }
    which::which(program)
        .map(|_| ())
        .map_err(|_| anyhow!("'{program}' ({label}) not found on PATH"))
}

/// Verify the AcquRoot analysis referenced by the config runs TA2GoAT;
/// without it the reconstruction stage cannot feed the sorter.
fn check_goat_analysis(acqu_user: &Path, acqu_config: &str) -> Result<()> {
    let config_path = acqu_user.join(acqu_config);
    let config_text = std::fs::read_to_string(&config_path)
        .with_context(|| format!("read {}", config_path.display()))?;
    let analysis = config_text
        .lines()
        .filter(|line| line.contains("AnalysisSetup:"))
        .filter_map(|line| line.split_whitespace().last())
        .last()
        .ok_or_else(|| {
            anyhow!(
                "no AnalysisSetup: entry in AcquRoot config '{}'",
                config_path.display()
            )
        })?;

    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow!("AcquRoot config has no parent directory"))?;
    let analysis_path = config_dir.join(analysis);
    let analysis_text = std::fs::read_to_string(&analysis_path)
        .with_context(|| format!("read {}", analysis_path.display()))?;
    for line in analysis_text.lines() {
        if line.contains("Physics-Analysis:") && !line.trim_start().starts_with('#') {
            if line.contains("TA2GoAT") {
                return Ok(());
            }
            return Err(anyhow!(
                "specified analysis class in AcquRoot config '{analysis}' is not TA2GoAT; \
                 can't create files for GoAT this way"
            ));
        }
    }
    Err(anyhow!(
        "no active Physics-Analysis: entry in '{}'",
        analysis_path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.pluto_dir, "sim_data");
        assert!(settings.reconstruct);
        assert_eq!(settings.nominal_events_per_file, 1000);
    }

    #[test]
    fn parses_partial_settings_with_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"output_root": "/tmp/mc", "reconstruct": false}"#)
                .expect("parse");
        assert_eq!(settings.output_root, "/tmp/mc");
        assert!(!settings.reconstruct);
        assert_eq!(settings.geant_dir, "g4_sim");
    }

    #[test]
    fn rejects_unknown_settings_fields() {
        let result = serde_json::from_str::<Settings>(r#"{"output_rot": "/tmp/mc"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn expands_home_prefix_only() {
        assert_eq!(expand_user("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_user("rel/path"), PathBuf::from("rel/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_user("~/MC"), home.join("MC"));
            assert_eq!(expand_user("~"), home);
        }
    }

    #[test]
    fn splits_command_overrides() {
        let words = parse_command("root -l -b -q", "ROOT").expect("split");
        assert_eq!(words, vec!["root", "-l", "-b", "-q"]);
        assert!(parse_command("", "ROOT").is_err());
    }

    #[test]
    fn goat_analysis_check_reads_referenced_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let data = dir.path().join("acqu_user").join("data");
        std::fs::create_dir_all(&data).expect("mkdir");
        std::fs::write(data.join("AR.MC"), "AnalysisSetup:\tGoAT.analysis\n").expect("write");
        std::fs::write(
            data.join("GoAT.analysis"),
            "#Physics-Analysis: TA2Other\nPhysics-Analysis: TA2GoAT\n",
        )
        .expect("write");
        check_goat_analysis(&dir.path().join("acqu_user"), "data/AR.MC").expect("check");

        std::fs::write(data.join("GoAT.analysis"), "Physics-Analysis: TA2Other\n")
            .expect("write");
        let err = check_goat_analysis(&dir.path().join("acqu_user"), "data/AR.MC");
        assert!(err.is_err());
    }
}
