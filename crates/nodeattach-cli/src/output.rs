//! Table rendering for `ls -l`.

use std::fs::FileType;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

/// Table with the attachment listing columns already in place.
pub fn attachment_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Type", "Size", "Name"]);
    table
}

/// Binary-prefixed size with one decimal, e.g. `1.5K`. Plain bytes below 1K.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [char; 4] = ['K', 'M', 'G', 'T'];

    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut unit = 0;
    let mut scale: u64 = 1024;
    while unit + 1 < UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }
    // tenths, rounded half up
    let tenths = (u128::from(bytes) * 10 + u128::from(scale) / 2) / u128::from(scale);
    format!("{}.{}{}", tenths / 10, tenths % 10, UNITS[unit])
}

/// `ls`-style marker for an entry; `?` when its metadata could not be read.
pub fn entry_marker(file_type: Option<FileType>) -> &'static str {
    match file_type {
        Some(t) if t.is_symlink() => "l",
        Some(t) if t.is_dir() => "d",
        Some(_) => "-",
        None => "?",
    }
}
