#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const CLASS: &str = "operating-systems";

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Writable copy of the fixture project.
pub fn project() -> TempDir {
    let src = fixture_path("project");
    let dir = TempDir::new().unwrap();
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let dest = dir.path().join(entry.path().strip_prefix(&src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).unwrap();
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
    dir
}

pub fn config_path(dir: &TempDir) -> PathBuf {
    dir.path().join("guidegen.toml")
}

/// Replace the last occurrence of `from` in a project file.
pub fn edit_last(dir: &TempDir, file: &str, from: &str, to: &str) {
    let path = dir.path().join(file);
    let mut content = fs::read_to_string(&path).unwrap();
    let at = content
        .rfind(from)
        .unwrap_or_else(|| panic!("'{}' not found in {}", from, file));
    content.replace_range(at..at + from.len(), to);
    fs::write(&path, content).unwrap();
}

pub fn append(dir: &TempDir, file: &str, text: &str) {
    let path = dir.path().join(file);
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str(text);
    fs::write(&path, content).unwrap();
}

pub fn expected(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).unwrap()
}
