//! Byte-offset to line/column conversion for diagnostic positions.

/// Convert a byte offset into a 1-based (line, column) pair.
///
/// Columns count bytes, not grapheme clusters; offsets past the end of the
/// source clamp to the final position.
pub fn offset_to_line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line: u32 = 1;
    let mut col: u32 = 1;
    for byte in source.as_bytes()[..offset].iter() {
        if *byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_of_source() {
        assert_eq!(offset_to_line_col("a = 1\n", 0), (1, 1));
    }

    #[test]
    fn after_newlines() {
        let src = "a = 1\nb = 2\nc = 3\n";
        assert_eq!(offset_to_line_col(src, 6), (2, 1));
        assert_eq!(offset_to_line_col(src, 16), (3, 5));
    }

    #[test]
    fn clamps_past_end() {
        assert_eq!(offset_to_line_col("ab", 99), (1, 3));
    }
}
