// Output file names.
//
// Deflating appends `.deflate`. Inflating removes the first `.deflate`
// from the name, or falls back to a fixed name when there is none.

use crate::codec::Direction;

/// Extension appended to deflated files.
pub const DEFLATE_EXTENSION: &str = ".deflate";

/// Name used when an inflated file's original name cannot be recovered.
pub const INFLATE_FALLBACK_NAME: &str = "InflatedFile.txt";

/// Name of the deflated output for `input_name`.
pub fn deflated_name(input_name: &str) -> String {
    format!("{input_name}{DEFLATE_EXTENSION}")
}

/// Name of the inflated output for `input_name`.
pub fn inflated_name(input_name: &str) -> String {
    if input_name.contains(DEFLATE_EXTENSION) {
        let name = input_name.replacen(DEFLATE_EXTENSION, "", 1);
        if !matches!(name.as_str(), "" | "." | "..") {
            return name;
        }
    }
    INFLATE_FALLBACK_NAME.to_string()
}

/// Output name for a run in `direction`.
pub fn output_name(direction: Direction, input_name: &str) -> String {
    match direction {
        Direction::Deflate => deflated_name(input_name),
        Direction::Inflate => inflated_name(input_name),
    }
}
