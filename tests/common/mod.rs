//! Shared fixtures: a scripted tool runner and `.app` templates.

#![allow(dead_code)]

use macos_dist::bundler::{Invocation, Result, ToolOutput, ToolRunner};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stands in for otool, install_name_tool, codesign, hdiutil and friends.
///
/// * `otool -L <file>` prints the dependencies registered for the file name.
/// * `hdiutil create ... <file>` writes a placeholder image to `<file>`.
/// * Programs with a scripted output return it verbatim; lookups use the
///   program's file name, so a compiled probe at `/tmp/x/version` answers
///   to `"version"`.
/// * Everything else succeeds silently.
#[derive(Debug, Default)]
pub struct FakeToolchain {
    deps: HashMap<String, Vec<String>>,
    outputs: HashMap<String, ToolOutput>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependencies `otool -L` reports for any binary named `file_name`.
    pub fn with_deps(mut self, file_name: &str, deps: &[&str]) -> Self {
        self.deps.insert(
            file_name.to_string(),
            deps.iter().map(|d| d.to_string()).collect(),
        );
        self
    }

    /// Fixed result for `program`.
    pub fn with_output(mut self, program: &str, output: ToolOutput) -> Self {
        self.outputs.insert(program.to_string(), output);
        self
    }

    /// Every invocation so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Argument lists of every call to `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .iter()
            .filter(|inv| inv.program() == program)
            .map(|inv| {
                inv.get_args()
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect()
            })
            .collect()
    }

    fn respond(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(invocation.clone());

        let program_name = file_name(Path::new(invocation.program()));
        if let Some(output) = self.outputs.get(&program_name) {
            return Ok(output.clone());
        }

        let last_arg = invocation
            .get_args()
            .last()
            .map(|a| PathBuf::from(a.clone()))
            .unwrap_or_default();

        match invocation.program() {
            "otool" => {
                let mut stdout = format!("{}:\n", last_arg.display());
                for dep in self.deps.get(&file_name(&last_arg)).into_iter().flatten() {
                    stdout.push_str(&format!(
                        "\t{} (compatibility version 1.0.0, current version 1.0.0)\n",
                        dep
                    ));
                }
                Ok(ToolOutput::success(stdout))
            }
            "hdiutil" => {
                std::fs::write(&last_arg, b"fake image")?;
                Ok(ToolOutput::success("created: image\n"))
            }
            _ => Ok(ToolOutput::success("")),
        }
    }
}

impl ToolRunner for FakeToolchain {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<ToolOutput>> {
        let response = self.respond(invocation);
        async move { response }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Creates `<dir>/<name>.app` with an executable named `name`.
pub fn make_template(dir: &Path, name: &str) -> PathBuf {
    let app = dir.join(format!("{name}.app"));
    std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
    std::fs::create_dir_all(app.join("Contents/Resources")).unwrap();
    std::fs::write(app.join("Contents/MacOS").join(name), b"\xcf\xfa\xed\xfe").unwrap();

    let mut info = plist::Dictionary::new();
    info.insert("CFBundleExecutable".into(), name.into());
    info.insert("CFBundleName".into(), name.into());
    info.insert("CFBundlePackageType".into(), "APPL".into());
    plist::Value::Dictionary(info)
        .to_file_xml(app.join("Contents/Info.plist"))
        .unwrap();
    app
}

/// Creates an empty file at `path`, with parents.
pub fn touch(path: &Path) -> PathBuf {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
    path.to_path_buf()
}

/// Reads back a bundle's Info.plist.
pub fn read_info(app: &Path) -> plist::Dictionary {
    plist::Value::from_file(app.join("Contents/Info.plist"))
        .unwrap()
        .into_dictionary()
        .unwrap()
}

/// Display form of a path, as it appears in tool arguments.
pub fn s(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
