//! Cross-process determinism: spawns the `solve_fixture` binary under
//! several environment variants and asserts identical output.

use std::io::Write;
use std::path::Path;
use std::process::Command;

fn binary_path() -> String {
    let mut path = std::env::current_exe()
        .expect("can resolve test binary path")
        .parent()
        .expect("binary dir exists")
        .parent()
        .expect("deps parent exists")
        .to_path_buf();
    path.push("solve_fixture");
    path.to_string_lossy().to_string()
}

fn workspace_root() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tests/ exists")
        .parent()
        .expect("workspace root exists")
        .to_string_lossy()
        .to_string()
}

fn run_variant(args: &[&str], work_dir: &str, env_overrides: &[(&str, &str)]) -> String {
    let bin = binary_path();

    let mut command = Command::new(&bin);
    command.args(args).current_dir(work_dir);

    command
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE")
        .env_remove("RUST_LOG");

    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command.output().unwrap_or_else(|e| {
        panic!("failed to spawn {bin} (work_dir={work_dir}, overrides={env_overrides:?}): {e}")
    });

    assert!(
        output.status.success(),
        "solve_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

#[test]
fn crossproc_determinism_four_env_variants() {
    let root = workspace_root();
    let tmp = std::env::temp_dir().to_string_lossy().to_string();
    let mut config = tempfile::NamedTempFile::new().expect("temp config");
    config
        .write_all(br#"{"maxTrials": 30, "maxTrialDepth": 40, "seed": 7}"#)
        .expect("write config");
    let config_path = config.path().to_string_lossy().to_string();
    for (world, algorithm) in [("tiger", "artdp"), ("slippery_corridor", "frtdp")] {
        let args = [world, algorithm, config_path.as_str()];
        let baseline = run_variant(&args, &root, &[]);

        assert!(
            baseline.contains("report_digest=sha256:"),
            "missing report_digest: {baseline}"
        );
        assert!(baseline.contains(&format!("algorithm={algorithm}")));

        let variants: [(&str, &[(&str, &str)]); 3] = [
            ("other work dir", &[]),
            ("C locale", &[("LC_ALL", "C")]),
            ("debug logging", &[("RUST_LOG", "debug")]),
        ];
        for (label, overrides) in variants {
            let dir = if label == "other work dir" { &tmp } else { &root };
            let output = run_variant(&args, dir, overrides);
            assert_eq!(output, baseline, "{world}/{algorithm}: {label} diverged");
        }
    }
}

#[test]
fn bad_arguments_exit_with_usage_error() {
    let output = Command::new(binary_path())
        .arg("tiger")
        .output()
        .expect("spawn solve_fixture");
    assert_eq!(output.status.code(), Some(2));

    let output = Command::new(binary_path())
        .args(["tiger", "value_iteration"])
        .output()
        .expect("spawn solve_fixture");
    assert_eq!(output.status.code(), Some(2));

    let output = Command::new(binary_path())
        .args(["maze", "rtdp"])
        .output()
        .expect("spawn solve_fixture");
    assert_eq!(output.status.code(), Some(1));
}
