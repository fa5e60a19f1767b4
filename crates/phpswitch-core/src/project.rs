use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use phpswitch_backend::PhpVersion;

pub const PIN_FILE: &str = ".php-version";

/// Walk upward from `start_dir` to the filesystem root looking for a
/// `.php-version` pin; the first parseable one wins.
///
/// The walk is lexical (parent by parent), so it always terminates; the
/// visited set of canonical paths keeps symlinked directories from being
/// scanned twice.
#[must_use]
pub fn find_project_version(start_dir: &Path) -> Option<PhpVersion> {
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut dir = start_dir.to_path_buf();

    loop {
        let fresh = match dir.canonicalize() {
            Ok(real) => visited.insert(real),
            // An unreadable directory can still have readable ancestors.
            Err(_) => true,
        };

        if fresh && let Some(version) = read_pin(&dir.join(PIN_FILE)) {
            return Some(version);
        }

        if !dir.pop() {
            return None;
        }
    }
}

fn read_pin(pin: &Path) -> Option<PhpVersion> {
    let content = std::fs::read_to_string(pin).ok()?;
    let line = content.lines().next().unwrap_or("").trim();

    match line.parse() {
        Ok(version) => {
            debug!("Found project pin {} = {version}", pin.display());
            Some(version)
        }
        Err(error) => {
            warn!("Ignoring malformed pin {}: {error}", pin.display());
            None
        }
    }
}

/// Write (or overwrite) the pin file in `dir`; returns its path.
///
/// # Errors
/// Propagates the underlying write error.
pub fn write_project_version(dir: &Path, version: &PhpVersion) -> std::io::Result<PathBuf> {
    let pin = dir.join(PIN_FILE);
    std::fs::write(&pin, format!("{version}\n"))?;
    Ok(pin)
}

#[cfg(test)]
mod tests {
    use phpswitch_backend::PhpVersion;

    use super::{PIN_FILE, find_project_version, write_project_version};

    #[test]
    fn pin_in_the_starting_directory_wins() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        std::fs::write(temp_dir.path().join(PIN_FILE), "8.2\n").expect("write pin");

        assert_eq!(
            find_project_version(temp_dir.path()),
            Some(PhpVersion::new(8, 2))
        );
    }

    #[test]
    fn pin_three_directories_up_is_found() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let nested = temp_dir.path().join("src").join("app").join("controllers");
        std::fs::create_dir_all(&nested).expect("create nested dirs");
        std::fs::write(temp_dir.path().join(PIN_FILE), "8.1\n").expect("write pin");

        assert_eq!(find_project_version(&nested), Some(PhpVersion::new(8, 1)));
    }

    #[test]
    fn nearest_pin_shadows_outer_ones() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let nested = temp_dir.path().join("vendor-project");
        std::fs::create_dir_all(&nested).expect("create nested dir");
        std::fs::write(temp_dir.path().join(PIN_FILE), "7.4\n").expect("write outer pin");
        std::fs::write(nested.join(PIN_FILE), "8.3\n").expect("write inner pin");

        assert_eq!(find_project_version(&nested), Some(PhpVersion::new(8, 3)));
    }

    #[test]
    fn no_pin_anywhere_returns_none() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let nested = temp_dir.path().join("empty");
        std::fs::create_dir_all(&nested).expect("create nested dir");

        // The walk continues above the temp dir; a stray pin in a system
        // temp ancestor would be a broken test environment.
        assert_eq!(find_project_version(&nested), None);
    }

    #[test]
    fn malformed_pin_is_skipped_and_the_walk_continues() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let nested = temp_dir.path().join("project");
        std::fs::create_dir_all(&nested).expect("create nested dir");
        std::fs::write(nested.join(PIN_FILE), "latest-and-greatest\n").expect("write bad pin");
        std::fs::write(temp_dir.path().join(PIN_FILE), "8.0\n").expect("write good pin");

        assert_eq!(find_project_version(&nested), Some(PhpVersion::new(8, 0)));
    }

    #[test]
    fn pin_accepts_formula_spelling_and_extra_lines() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        std::fs::write(temp_dir.path().join(PIN_FILE), "php@8.1\n# project note\n")
            .expect("write pin");

        assert_eq!(
            find_project_version(temp_dir.path()),
            Some(PhpVersion::new(8, 1))
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_scanned_twice() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let real = temp_dir.path().join("real");
        std::fs::create_dir_all(&real).expect("create real dir");
        let alias = real.join("alias");
        std::os::unix::fs::symlink(&real, &alias).expect("create symlink loop");
        std::fs::write(temp_dir.path().join(PIN_FILE), "8.2\n").expect("write pin");

        // Starting inside the self-referencing alias still terminates and
        // still finds the pin above.
        assert_eq!(find_project_version(&alias), Some(PhpVersion::new(8, 2)));
    }

    #[test]
    fn write_then_find_round_trips() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");

        let pin = write_project_version(temp_dir.path(), &PhpVersion::new(8, 3))
            .expect("pin should be written");

        assert!(pin.ends_with(PIN_FILE));
        assert_eq!(
            find_project_version(temp_dir.path()),
            Some(PhpVersion::new(8, 3))
        );
    }
}
