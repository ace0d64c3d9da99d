/// Stand-in for characters that can never be hex. Keeps every remaining
/// character one byte wide so offsets can be sliced directly.
pub const REPLACEMENT: char = '?';

/// Cleans up a pasted blob: drops whitespace and a leading `0x`, lowercases,
/// and replaces non-ASCII characters with [`REPLACEMENT`].
///
/// Bad characters are kept (not dropped) so they get reported against the
/// field they land in.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if c.is_ascii() {
                c.to_ascii_lowercase()
            } else {
                REPLACEMENT
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use crate::blob::normalize;
    use test_case::test_case;

    #[test_case("0A490A140D" => "0a490a140d")]
    #[test_case("  0a49 0a14\n0d\t" => "0a490a140d")]
    #[test_case("0x0a49" => "0a49")]
    #[test_case("0a4é" => "0a4?")]
    #[test_case("" => "")]
    fn cleans(input: &str) -> String {
        normalize(input)
    }
}
