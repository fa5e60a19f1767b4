use std::path::Path;

use crate::detect::ShellKind;

pub const BLOCK_BEGIN: &str = "# >>> phpswitch managed block >>>";
pub const BLOCK_END: &str = "# <<< phpswitch managed block <<<";

/// Render the marker block that puts the target version's binaries first on
/// the search path, in the detected shell's dialect. The block carries no
/// trailing newline; [`replace_block`] handles line assembly.
#[must_use]
pub fn render_path_block(kind: ShellKind, bin_dir: &Path, sbin_dir: &Path) -> String {
    let directive = match kind {
        ShellKind::Fish => format!(
            "fish_add_path --move --path \"{}\" \"{}\"",
            bin_dir.display(),
            sbin_dir.display()
        ),
        ShellKind::Bash | ShellKind::Zsh | ShellKind::Unknown => format!(
            "export PATH=\"{}:{}:$PATH\"",
            bin_dir.display(),
            sbin_dir.display()
        ),
    };

    format!("{BLOCK_BEGIN}\n{directive}\n{BLOCK_END}")
}

/// Splice `block` into `content`, replacing every existing marker block.
///
/// The new block lands where the first old one stood, or is appended after
/// a separating blank line when none exists. The result always ends with a
/// newline, and applying the same block twice is byte-stable.
#[must_use]
pub fn replace_block(content: &str, block: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut inside = false;
    let mut insert_at = None;

    for line in content.lines() {
        if line.trim() == BLOCK_BEGIN {
            inside = true;
            if insert_at.is_none() {
                insert_at = Some(kept.len());
            }
            continue;
        }
        if inside {
            if line.trim() == BLOCK_END {
                inside = false;
            }
            continue;
        }
        kept.push(line);
    }

    let mut lines: Vec<&str> = Vec::with_capacity(kept.len() + 4);
    match insert_at {
        Some(index) => {
            lines.extend(&kept[..index]);
            lines.extend(block.lines());
            lines.extend(&kept[index..]);
        }
        None => {
            lines.extend(&kept);
            if kept.last().is_some_and(|line| !line.trim().is_empty()) {
                lines.push("");
            }
            lines.extend(block.lines());
        }
    }

    let mut result = lines.join("\n");
    result.push('\n');
    result
}
