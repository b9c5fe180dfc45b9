//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! photo.jpg
//!     Size: 4000x3000
//!     Format: JPEG
//!     Color: Rgb8
//!     Orientation: 6 (rotate-90-cw)
//!     Displayed: 3000x4000
//! ```
//!
//! `Displayed` only appears when the orientation swaps width and height.
//!
//! ## Effects
//!
//! ```text
//! blur (sigma 2.5): photo.jpg → blurred.png
//!     Size: 4000x3000
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use std::path::Path;

use crate::imaging::ImageInfo;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Info
// ============================================================================

/// Format the `info` report for one file.
pub fn format_info(path: &Path, info: &ImageInfo) -> Vec<String> {
    let mut lines = vec![file_label(path)];
    lines.push(format!("{}Size: {}x{}", indent(1), info.width, info.height));
    let format = info
        .format
        .map(|f| f.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    lines.push(format!("{}Format: {}", indent(1), format));
    lines.push(format!("{}Color: {}", indent(1), info.color));
    lines.push(format!("{}Orientation: {}", indent(1), info.orientation));
    if info.orientation.swaps_dimensions() {
        lines.push(format!(
            "{}Displayed: {}x{}",
            indent(1),
            info.height,
            info.width
        ));
    }
    lines
}

pub fn print_info(path: &Path, info: &ImageInfo) {
    for line in format_info(path, info) {
        println!("{}", line);
    }
}

/// Pretty-printed JSON for `info --json`.
pub fn format_info_json(info: &ImageInfo) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(info)
}

// ============================================================================
// Effects
// ============================================================================

/// Format the summary line for a saved result.
///
/// `action` describes what was done, e.g. `"blur (sigma 2.5)"`.
pub fn format_saved(action: &str, input: &Path, output: &Path, size: (u32, u32)) -> Vec<String> {
    vec![
        format!(
            "{}: {} \u{2192} {}",
            action,
            file_label(input),
            output.display()
        ),
        format!("{}Size: {}x{}", indent(1), size.0, size.1),
    ]
}

pub fn print_saved(action: &str, input: &Path, output: &Path, size: (u32, u32)) {
    for line in format_saved(action, input, output, size) {
        println!("{}", line);
    }
}
