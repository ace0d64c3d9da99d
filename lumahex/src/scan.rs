use nom::bytes::complete::take_until;
use nom::error::ErrorKind;
use nom::IResult;

type I<'a> = &'a str;

fn until<'a>(marker: &'a str) -> impl Fn(I<'a>) -> IResult<I<'a>, I<'a>, (I<'a>, ErrorKind)> {
    take_until(marker)
}

/// Finds the first byte-aligned occurrence of `marker` (hex) in `haystack`
/// (hex), returning its offset in hex characters.
///
/// Matches that start halfway through a byte are skipped: `0a0f0d` must not
/// be found inside `a0a0f0d0`.
pub fn find_marker(haystack: &str, marker: &str) -> Option<usize> {
    if marker.is_empty() {
        return Some(0);
    }
    let mut from = 0;
    while from < haystack.len() {
        let (_, skipped) = until(marker)(&haystack[from..]).ok()?;
        let pos = from + skipped.len();
        if pos % 2 == 0 {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

/// All byte-aligned occurrences, non-overlapping, in order.
pub fn marker_positions(haystack: &str, marker: &str) -> Vec<usize> {
    let mut found = Vec::new();
    if marker.is_empty() {
        return found;
    }
    let mut from = 0;
    while let Some(pos) = haystack.get(from..).and_then(|rest| find_marker(rest, marker)) {
        found.push(from + pos);
        from += pos + marker.len();
    }
    found
}
