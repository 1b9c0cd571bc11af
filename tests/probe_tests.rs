mod common;

use common::{FakeToolchain, touch};
use macos_dist::ProbeError;
use macos_dist::bundler::ToolOutput;
use macos_dist::probe::{LibraryProbe, LibrarySpec};
use std::path::{Path, PathBuf};

fn install_root(dir: &Path) -> PathBuf {
    touch(&dir.join("include/ndn-cpp/ndn-cpp-config.h"));
    dir.to_path_buf()
}

fn spec_with_roots(roots: Vec<PathBuf>) -> LibrarySpec {
    LibrarySpec {
        search_roots: roots,
        ..LibrarySpec::default()
    }
}

#[test]
fn override_root_wins_when_it_holds_the_library() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(&tmp.path().join("ndn"));
    let fake = FakeToolchain::new();
    let probe = LibraryProbe::new(spec_with_roots(vec![]), &fake);

    assert_eq!(probe.locate_install_root(Some(&root)).unwrap(), root);
}

#[test]
fn default_roots_are_searched_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let empty = tmp.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();
    let second = install_root(&tmp.path().join("second"));
    let third = install_root(&tmp.path().join("third"));
    let fake = FakeToolchain::new();
    let probe = LibraryProbe::new(spec_with_roots(vec![empty.clone(), second.clone(), third]), &fake);

    assert_eq!(probe.locate_install_root(None).unwrap(), second);
    assert_eq!(probe.locate_install_root(Some(&empty)).unwrap(), second);
}

#[test]
fn not_found_message_names_the_override() {
    let fake = FakeToolchain::new();
    let probe = LibraryProbe::new(spec_with_roots(vec![]), &fake);

    let err = probe
        .locate_install_root(Some(Path::new("/definitely/missing")))
        .unwrap_err();
    assert!(matches!(err, ProbeError::NotFound { .. }));
    assert_eq!(err.to_string(), "ndn-cpp not found in /definitely/missing");

    let err = probe.locate_install_root(None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "ndn-cpp not found, please provide a --ndn-cpp-dir argument (see help)"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn version_is_first_word_of_probe_output_and_cached() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(tmp.path());
    let fake = FakeToolchain::new().with_output("version", ToolOutput::success("0.3.1 extra\n"));
    let mut probe = LibraryProbe::new(LibrarySpec::default(), &fake).with_compiler("sh");

    assert_eq!(probe.probe_version(&root).await.unwrap(), "0.3.1");
    assert_eq!(probe.probe_version(&root).await.unwrap(), "0.3.1");

    let compiles = fake.calls_to("sh");
    assert_eq!(compiles.len(), 1);
    assert_eq!(compiles[0][0], format!("-I{}", root.join("include").display()));
    assert!(compiles[0][1].ends_with("version.cpp"));
    assert_eq!(compiles[0][2], "-o");
}

#[cfg(unix)]
#[tokio::test]
async fn compiler_command_with_arguments_runs_in_scratch_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(tmp.path());
    let fake = FakeToolchain::new().with_output("version", ToolOutput::success("0.3.1\n"));
    let mut probe =
        LibraryProbe::new(LibrarySpec::default(), &fake).with_compiler("sh -e -x");

    assert_eq!(probe.probe_version(&root).await.unwrap(), "0.3.1");

    let compile = fake
        .calls()
        .into_iter()
        .find(|inv| inv.program() == "sh")
        .unwrap();
    let args: Vec<String> = compile
        .get_args()
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert_eq!(&args[..2], ["-e", "-x"]);
    assert_eq!(args[2], format!("-I{}", root.join("include").display()));

    let source = Path::new(&args[3]);
    assert_eq!(compile.get_current_dir(), source.parent());
}

#[cfg(unix)]
#[tokio::test]
async fn compile_failure_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(tmp.path());
    let fake = FakeToolchain::new().with_output("sh", ToolOutput::failure(1, "fatal error: ndn-cpp-config.h\n"));
    let mut probe = LibraryProbe::new(LibrarySpec::default(), &fake).with_compiler("sh");

    let err = probe.probe_version(&root).await.unwrap_err();
    match err {
        ProbeError::Compile { reason, .. } => assert!(reason.contains("fatal error")),
        other => panic!("expected a compile error, got {other}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn silent_probe_is_an_empty_version() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(tmp.path());
    let fake = FakeToolchain::new().with_output("version", ToolOutput::success("  \n"));
    let mut probe = LibraryProbe::new(LibrarySpec::default(), &fake).with_compiler("sh");

    let err = probe.probe_version(&root).await.unwrap_err();
    assert!(matches!(err, ProbeError::EmptyVersion { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn failing_probe_program_is_an_execute_error() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(tmp.path());
    let fake = FakeToolchain::new().with_output("version", ToolOutput::failure(139, ""));
    let mut probe = LibraryProbe::new(LibrarySpec::default(), &fake).with_compiler("sh");

    let err = probe.probe_version(&root).await.unwrap_err();
    assert!(matches!(err, ProbeError::Execute { .. }));
}

#[tokio::test]
async fn missing_compiler_is_detected_before_compiling() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(tmp.path());
    let fake = FakeToolchain::new();
    let mut probe = LibraryProbe::new(LibrarySpec::default(), &fake)
        .with_compiler("definitely-not-a-compiler-7f3a");

    let err = probe.probe_version(&root).await.unwrap_err();
    assert!(matches!(err, ProbeError::CompilerMissing { .. }));
    assert!(fake.calls().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn check_publishes_namespaced_variables() {
    let tmp = tempfile::tempdir().unwrap();
    let root = install_root(&tmp.path().join("ndn"));
    let fake = FakeToolchain::new().with_output("version", ToolOutput::success("0.3.1"));
    let mut probe = LibraryProbe::new(spec_with_roots(vec![]), &fake).with_compiler("sh");

    let before = probe.publish(&root, "NDNCPP");
    assert_eq!(before.get("NDNCPP_VERSION"), None);

    let vars = probe.check(Some(&root), "NDNCPP").await.unwrap();

    assert_eq!(
        vars.get("INCLUDES_NDNCPP"),
        Some(root.join("include").display().to_string())
    );
    assert_eq!(vars.get("LIB_NDNCPP"), Some("ndn-cpp".to_string()));
    assert_eq!(
        vars.get("LIBPATH_NDNCPP"),
        Some(root.join("lib").display().to_string())
    );
    assert_eq!(vars.get("NDNCPP_VERSION"), Some("0.3.1".to_string()));
}
