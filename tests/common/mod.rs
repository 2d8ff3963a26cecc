//! Shared sandbox for integration tests.
//!
//! Builds a complete fake chain environment in a temp directory: every
//! external tool is a small shell script that produces the files the real
//! tool would, so a full run exercises the orchestration end to end
//! without ROOT, Geant4, AcquRoot or GoAT installed.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub struct ChainSandbox {
    root: TempDir,
}

const FAKE_ROOT: &str = r#"#!/bin/sh
# Reads the throwaway driver script and creates the Pluto output file.
clean=$(tr -d '\\' < "$1")
args=$(echo "$clean" | sed 's/.*simulate\.C(//; s/).*//')
seqno=$(echo "$args" | cut -d, -f2 | tr -d ' ')
chan=$(echo "$args" | cut -d, -f3 | tr -d ' "')
dir=$(echo "$args" | cut -d, -f4 | tr -d ' "')
echo "Pluto input: $args"
echo "informational noise" >&2
touch "$dir/sim_${chan}_$(printf '%02d' "$seqno").root"
"#;

const FAKE_PLUTO2MKIN: &str = r#"#!/bin/sh
# args: --input <path> [--target length=L --beam diam=D]
in="$2"
base=$(basename "$in" .root)
echo "Warning in <TBufferFile::ReadClassBuffer>: no dictionary for PParticle" >&2
touch "${base}_mkin.root"
"#;

const FAKE_A2: &str = r#"#!/bin/sh
out=$(sed -n 's|^/A2/event/setOutputFile ||p' macros/g4run_multi.mac)
touch "$out"
"#;

// Variant that fails for one specific sequence number.
const FAKE_A2_FAILING: &str = r#"#!/bin/sh
out=$(sed -n 's|^/A2/event/setOutputFile ||p' macros/g4run_multi.mac)
case "$out" in
*_03.root) exit 7 ;;
esac
touch "$out"
"#;

const FAKE_ACQUROOT: &str = r#"#!/bin/sh
input=$(sed -n 's/^TreeFile:[[:space:]]*//p' "$1")
outdir=$(sed -n 's/^Directory:[[:space:]]*//p' "$1")
touch "$outdir/Acqu_$(basename "$input")"
"#;

const FAKE_GOAT: &str = r#"#!/bin/sh
# args: <config> -d <acqu_dir> -D <goat_dir> -f <file>
goatdir="$5"
f="$7"
touch "$goatdir/GoAT_${f#Acqu_}"
"#;

const FAKE_HADD: &str = r#"#!/bin/sh
echo "hadd Target file: $1"
echo "no dictionary for class PParticle is available" >&2
touch "$1"
"#;

// Kills the orchestrator mid-stage to simulate an abrupt termination.
const FAKE_ROOT_KILLER: &str = r#"#!/bin/sh
kill -9 $PPID
sleep 1
"#;

impl Default for ChainSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainSandbox {
    pub fn new() -> ChainSandbox {
        let root = TempDir::new().expect("create sandbox");
        let sandbox = ChainSandbox { root };
        sandbox.populate();
        sandbox
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn output_root(&self) -> PathBuf {
        self.path().join("mc")
    }

    fn populate(&self) {
        let root = self.path();
        std::fs::create_dir_all(self.output_root()).expect("mkdir mc");

        // Generator: simulate.C plus the fake ROOT driver.
        let generator = root.join("generator");
        std::fs::create_dir_all(&generator).expect("mkdir generator");
        std::fs::write(generator.join("simulate.C"), "// stub\n").expect("write simulate.C");
        write_tool(&root.join("bin").join("root"), FAKE_ROOT);
        write_tool(&root.join("bin").join("hadd"), FAKE_HADD);

        // Detector sim install root with fake binaries and macro dirs.
        let geant = root.join("a2geant");
        std::fs::create_dir_all(geant.join("macros")).expect("mkdir macros");
        write_tool(&geant.join("A2"), FAKE_A2);
        write_tool(&geant.join("pluto2mkin"), FAKE_PLUTO2MKIN);

        // Per-channel macro templates.
        let macros = root.join("g4run");
        std::fs::create_dir_all(&macros).expect("mkdir g4run");
        for channel in ["pi0_gg", "eta_gg"] {
            std::fs::write(
                macros.join(format!("g4run_{channel}.mac")),
                "/control/verbose 0\n",
            )
            .expect("write macro template");
        }

        // AcquRoot: user dir with config + analysis, build dir with binary.
        let acqu_data = root.join("acqu").join("acqu_user").join("data");
        std::fs::create_dir_all(&acqu_data).expect("mkdir acqu data");
        std::fs::write(
            acqu_data.join("AR.MC"),
            "AnalysisSetup:\tGoAT.analysis\nDirectory:\t/unset\nTreeFile:\tunset.root\n",
        )
        .expect("write AR.MC");
        std::fs::write(
            acqu_data.join("GoAT.analysis"),
            "Physics-Analysis: TA2GoAT\n",
        )
        .expect("write analysis");
        write_tool(&root.join("acqu").join("build").join("bin").join("AcquRoot"), FAKE_ACQUROOT);

        // GoAT install plus config.
        let goat = root.join("a2GoAT");
        std::fs::create_dir_all(goat.join("configfiles")).expect("mkdir goat config");
        std::fs::write(goat.join("configfiles").join("GoAT-Convert.dat"), "# goat\n")
            .expect("write goat config");
        write_tool(&root.join("a2GoAT").join("build").join("bin").join("goat"), FAKE_GOAT);

        self.write_settings();
    }

    fn write_settings(&self) {
        let root = self.path();
        let settings = serde_json::json!({
            "output_root": self.output_root(),
            "generator_dir": root.join("generator"),
            "macro_dir": root.join("g4run"),
            "geant_path": root.join("a2geant"),
            "acqu_path": root.join("acqu"),
            "acqu_build": root.join("acqu").join("build"),
            "goat_path": root.join("a2GoAT"),
            "goat_build": root.join("a2GoAT").join("build"),
            "root_command": root.join("bin").join("root"),
            "hadd_command": root.join("bin").join("hadd"),
        });
        std::fs::write(
            root.join("simchain.json"),
            serde_json::to_vec_pretty(&settings).expect("serialize settings"),
        )
        .expect("write settings");
    }

    /// Swap the detector binary for one that fails on sequence 03.
    pub fn break_detector_on_file_3(&self) {
        write_tool(&self.path().join("a2geant").join("A2"), FAKE_A2_FAILING);
    }

    /// Swap the generator for one that kills the orchestrator.
    pub fn kill_during_generation(&self) {
        write_tool(&self.path().join("bin").join("root"), FAKE_ROOT_KILLER);
    }

    /// Seed aligned generated/converted/detector files up to `up_to`.
    pub fn seed_channel(&self, channel: &str, up_to: u32) {
        let pluto = self.output_root().join("sim_data");
        let geant = self.output_root().join("g4_sim");
        std::fs::create_dir_all(&pluto).expect("mkdir sim_data");
        std::fs::create_dir_all(&geant).expect("mkdir g4_sim");
        for sequence in 1..=up_to {
            for (dir, name) in [
                (&pluto, format!("sim_{channel}_{sequence:02}.root")),
                (&pluto, format!("sim_{channel}_{sequence:02}_mkin.root")),
                (&geant, format!("g4_sim_{channel}_{sequence:02}.root")),
            ] {
                std::fs::write(dir.join(name), b"").expect("seed file");
            }
        }
    }

    pub fn write_plan(&self, text: &str) -> PathBuf {
        let path = self.path().join("plan.txt");
        std::fs::write(&path, text).expect("write plan");
        path
    }

    /// Run the simchain binary inside the sandbox.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_simchain"))
            .args(args)
            .current_dir(self.path())
            .stdin(Stdio::null())
            .output()
            .expect("run simchain")
    }

    pub fn stage_file(&self, dir: &str, name: &str) -> PathBuf {
        self.output_root().join(dir).join(name)
    }
}

fn write_tool(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir tool dir");
    }
    std::fs::write(path, body).expect("write tool");
    let mut permissions = std::fs::metadata(path).expect("stat tool").permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions).expect("chmod tool");
}
