use assert_cmd::Command;
use predicates::prelude::*;

fn macos_dist() -> Command {
    Command::cargo_bin("macos_dist").unwrap()
}

#[test]
fn help_lists_both_commands() {
    macos_dist()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("package"))
        .stdout(predicate::str::contains("probe"));
}

#[test]
fn package_without_version_prints_usage_and_fails() {
    macos_dist()
        .arg("package")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "ERROR: Neither snapshot or release selected. Bailing.",
        ))
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--release"));
}

#[test]
fn package_with_conflicting_versions_fails() {
    macos_dist()
        .args(["package", "--release", "0.5", "--git"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("mutually exclusive"));
}

#[test]
fn probe_with_blank_namespace_prints_usage_and_fails() {
    macos_dist()
        .args(["probe", "--namespace", " "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--namespace must not be empty"))
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn probe_reports_missing_override() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("dist.toml");
    std::fs::write(&config, "[probe]\nsearch_roots = []\n").unwrap();

    macos_dist()
        .args(["probe", "--ndn-cpp-dir", "/definitely/missing", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "ndn-cpp not found in /definitely/missing",
        ));
}

#[test]
fn configured_library_option_is_accepted_and_suggested() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("dist.toml");
    std::fs::write(
        &config,
        "[probe]\nname = \"zlib\"\noption = \"zlib-dir\"\nsearch_roots = []\n",
    )
    .unwrap();

    macos_dist()
        .args(["probe", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "zlib not found, please provide a --zlib-dir argument (see help)",
        ));

    macos_dist()
        .args(["probe", "--zlib-dir", "/definitely/missing", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("zlib not found in /definitely/missing"));

    macos_dist()
        .args(["probe", "--help", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("zlib-dir"));
}

#[test]
fn malformed_config_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("dist.toml");
    std::fs::write(&config, "[probe]\nunknown_key = 1\n").unwrap();

    macos_dist()
        .args(["probe", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TOML error"));
}

/// A stand-in compiler that emits a program printing a fixed version.
#[cfg(unix)]
fn fake_compiler(dir: &std::path::Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-cxx");
    std::fs::write(
        &path,
        "#!/bin/sh\n\
         out=\"\"\n\
         while [ $# -gt 0 ]; do\n\
           if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n\
           shift\n\
         done\n\
         printf '#!/bin/sh\\necho 0.3.1\\n' > \"$out\"\n\
         chmod +x \"$out\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn probe_prints_build_variables() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("ndn");
    std::fs::create_dir_all(root.join("include/ndn-cpp")).unwrap();
    std::fs::write(root.join("include/ndn-cpp/ndn-cpp-config.h"), "").unwrap();
    let cxx = fake_compiler(tmp.path());

    macos_dist()
        .env("CXX", &cxx)
        .args(["probe", "--ndn-cpp"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("LIB_NDNCPP=ndn-cpp"))
        .stdout(predicate::str::contains(format!(
            "LIBPATH_NDNCPP={}",
            root.join("lib").display()
        )))
        .stdout(predicate::str::contains("NDNCPP_VERSION=0.3.1"));

    macos_dist()
        .env("CXX", &cxx)
        .args(["probe", "--format", "cargo", "--namespace", "NDN", "--dir"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("cargo:rustc-link-lib=ndn-cpp"))
        .stdout(predicate::str::contains("cargo:version=0.3.1"));
}
