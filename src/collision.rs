/// Collision-free destination naming.
///
/// When a file with the same name already sits in the destination folder, the
/// moved file gets a numbered name instead: `report.txt` becomes
/// `report (1).txt`, then `report (2).txt`, and so on.
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Returns a path inside `dest_dir` for `file_name` that does not exist yet.
///
/// The name is returned unchanged when it is free. Otherwise the counter is
/// inserted between stem and suffix, starting at 1, and the first free
/// candidate wins. There is no upper bound on the counter. Names that are not
/// valid Unicode are handled byte for byte.
///
/// The result reflects the filesystem at call time only; a file created
/// between this call and the move is not detected.
///
/// # Examples
///
/// ```no_run
/// use filesorter::collision::resolve_collision;
/// use std::path::Path;
///
/// let target = resolve_collision(Path::new("/home/me/Pictures"), "beach.jpg");
/// println!("moving to {}", target.display());
/// ```
pub fn resolve_collision(dest_dir: &Path, file_name: impl AsRef<OsStr>) -> PathBuf {
    let file_name = file_name.as_ref();
    let candidate = dest_dir.join(file_name);
    if !exists(&candidate) {
        return candidate;
    }

    let (stem, extension) = split_name(file_name);
    (1u64..)
        .map(|counter| dest_dir.join(numbered_name(stem, counter, extension)))
        .find(|candidate| !exists(candidate))
        .unwrap_or_else(|| dest_dir.join(file_name))
}

/// Stem and extension (without its dot). Same rules as
/// [`split_suffix`](crate::extensions::split_suffix): a leading or trailing
/// dot does not start an extension.
fn split_name(file_name: &OsStr) -> (&OsStr, Option<&OsStr>) {
    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(extension)) if !extension.is_empty() => (stem, Some(extension)),
        _ => (file_name, None),
    }
}

fn numbered_name(stem: &OsStr, counter: u64, extension: Option<&OsStr>) -> OsString {
    let mut name = stem.to_os_string();
    name.push(format!(" ({})", counter));
    if let Some(extension) = extension {
        name.push(".");
        name.push(extension);
    }
    name
}

/// Existence check that also counts dangling symlinks as taken.
fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_free_name_is_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let resolved = resolve_collision(temp_dir.path(), "report.txt");
        assert_eq!(resolved, temp_dir.path().join("report.txt"));
    }

    #[test]
    fn test_first_collision_gets_counter_one() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("report.txt"), "a").expect("Failed to write file");

        let resolved = resolve_collision(temp_dir.path(), "report.txt");
        assert_eq!(resolved, temp_dir.path().join("report (1).txt"));
    }

    #[test]
    fn test_skips_taken_counters() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("report.txt"), "a").expect("Failed to write file");
        fs::write(temp_dir.path().join("report (1).txt"), "b").expect("Failed to write file");

        let resolved = resolve_collision(temp_dir.path(), "report.txt");
        assert_eq!(resolved, temp_dir.path().join("report (2).txt"));
    }

    #[test]
    fn test_name_without_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("Makefile"), "all:").expect("Failed to write file");

        let resolved = resolve_collision(temp_dir.path(), "Makefile");
        assert_eq!(resolved, temp_dir.path().join("Makefile (1)"));
    }

    #[test]
    fn test_multi_dot_name_keeps_last_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("backup.tar.gz"), "x").expect("Failed to write file");

        let resolved = resolve_collision(temp_dir.path(), "backup.tar.gz");
        assert_eq!(resolved, temp_dir.path().join("backup.tar (1).gz"));
    }

    #[test]
    fn test_directory_with_same_name_counts_as_collision() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("notes.md")).expect("Failed to create directory");

        let resolved = resolve_collision(temp_dir.path(), "notes.md");
        assert_eq!(resolved, temp_dir.path().join("notes (1).md"));
    }

    #[test]
    fn test_dotfile_and_trailing_dot_have_no_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join(".bashrc"), "a").expect("Failed to write file");
        fs::write(temp_dir.path().join("notes."), "b").expect("Failed to write file");

        assert_eq!(
            resolve_collision(temp_dir.path(), ".bashrc"),
            temp_dir.path().join(".bashrc (1)")
        );
        assert_eq!(
            resolve_collision(temp_dir.path(), "notes."),
            temp_dir.path().join("notes. (1)")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_unicode_name_keeps_its_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let name = OsStr::from_bytes(b"caf\xe9.jpg");
        fs::write(temp_dir.path().join(name), "a").expect("Failed to write file");

        let resolved = resolve_collision(temp_dir.path(), name);
        assert_eq!(
            resolved,
            temp_dir.path().join(OsStr::from_bytes(b"caf\xe9 (1).jpg"))
        );
    }
}
