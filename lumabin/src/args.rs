//! Parsing for the argument shapes clap doesn't handle itself.

use std::fs;
use std::io::{self, Read};

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum ArgError {
        Point(text: String) {
            display("can't read point {:?}; expected INDEX=VALUE", text)
        }
        Number(name: &'static str, text: String) {
            display("{} must be a number, got {:?}", name, text)
        }
    }
}

/// `8=0.75` moves point 8 to 0.75.
pub fn parse_point(text: &str) -> Result<(usize, f32), ArgError> {
    let bad = || ArgError::Point(text.to_string());
    let mut sides = text.splitn(2, '=');
    let index = sides.next().ok_or_else(bad)?.trim();
    let value = sides.next().ok_or_else(bad)?.trim();
    let index = index.parse::<usize>().map_err(|_| bad())?;
    let value = value.parse::<f32>().map_err(|_| bad())?;
    Ok((index, value))
}

pub fn parse_number<T: std::str::FromStr>(name: &'static str, text: &str) -> Result<T, ArgError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| ArgError::Number(name, text.to_string()))
}

/// Where a blob comes from: given inline, read from a file, or `-` for stdin.
pub fn read_blob(inline: Option<&str>, input: Option<&str>) -> io::Result<String> {
    match (inline, input) {
        (_, Some(path)) => fs::read_to_string(path),
        (Some("-"), None) | (None, None) => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
        (Some(blob), None) => Ok(blob.to_string()),
    }
}

#[cfg(test)]
mod test {
    use crate::args::{parse_number, parse_point, read_blob, ArgError};
    use test_case::test_case;

    #[test_case("8=0.75" => Ok((8, 0.75)))]
    #[test_case(" 0 = 1 " => Ok((0, 1.0)))]
    #[test_case("8" => Err(ArgError::Point("8".to_string())))]
    #[test_case("-1=0.5" => Err(ArgError::Point("-1=0.5".to_string())))]
    #[test_case("P8=0.5" => Err(ArgError::Point("P8=0.5".to_string())))]
    fn points(text: &str) -> Result<(usize, f32), ArgError> {
        parse_point(text)
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number::<u32>("precision", "4"), Ok(4));
        assert_eq!(
            parse_number::<u32>("precision", "four"),
            Err(ArgError::Number("precision", "four".to_string()))
        );
    }

    #[test]
    fn inline_blob_is_used_as_is() {
        assert_eq!(read_blob(Some("0a49"), None).unwrap(), "0a49");
    }
}
