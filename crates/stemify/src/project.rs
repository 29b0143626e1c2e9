//! Project folders
//!
//! Each processed track gets its own `<name>.stemifyproj` folder holding one
//! audio file per stem. When the name is taken, `<name>(1).stemifyproj`,
//! `<name>(2).stemifyproj` and so on are tried in turn.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extension of project folders
pub const PROJECT_EXTENSION: &str = "stemifyproj";

/// Candidate folder paths for `name`, in the order they are tried
fn project_dir_candidates<'a>(
    output_dir: &'a Path,
    name: &'a str,
) -> impl Iterator<Item = PathBuf> + 'a {
    let first = std::iter::once(output_dir.join(format!("{}.{}", name, PROJECT_EXTENSION)));
    let numbered =
        (1u32..).map(move |n| output_dir.join(format!("{}({}).{}", name, n, PROJECT_EXTENSION)));
    first.chain(numbered)
}

/// Create a fresh project folder for the audio file at `input`
///
/// The folder is named after the input's file stem. Each candidate is
/// claimed with a single `create_dir`, so concurrent runs never share a
/// folder.
pub fn create_project_dir(output_dir: &Path, input: &Path) -> io::Result<PathBuf> {
    let name = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "untitled".to_string());

    fs::create_dir_all(output_dir)?;

    for dir in project_dir_candidates(output_dir, &name) {
        match fs::create_dir(&dir) {
            Ok(()) => {
                log::debug!("Created project folder {:?}", dir);
                return Ok(dir);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("No free project folder name for {:?}", name),
    ))
}
