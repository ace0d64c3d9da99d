use chrono::{DateTime, Utc};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

quick_error! {
    #[derive(Debug)]
    pub enum PathError {
        NoDownloadDir {
            display("couldn't find a download directory; set output_dir in the settings")
        }
        Io(err: std::io::Error) {
            from()
            display("{}", err)
            cause(err)
        }
    }
}

/// Lowercase, with anything that isn't alphanumeric turned into `-`.
pub fn slug(label: &str) -> String {
    label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn output_filename(label: &str, at: DateTime<Utc>) -> String {
    format!("luma-{0}-{1}.hex", at.format("%F-%H%M%S"), slug(label))
}

/// A fresh timestamped path in `output_dir`, or the user's download
/// directory if that's not set.
pub fn get_output_path(label: &str, output_dir: Option<&Path>) -> Result<PathBuf, PathError> {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let ud = UserDirs::new().ok_or(PathError::NoDownloadDir)?;
            ud.download_dir().ok_or(PathError::NoDownloadDir)?.to_path_buf()
        }
    };
    Ok(dir.join(output_filename(label, Utc::now())))
}

pub fn set_readonly(filename: impl AsRef<Path>) -> Result<(), PathError> {
    let metadata = fs::metadata(&filename)?;
    // Set readonly so that a saved blob doesn't get edited by accident later.
    let mut p = metadata.permissions();
    p.set_readonly(true);
    fs::set_permissions(&filename, p)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::pathutils::{get_output_path, output_filename, slug};
    use chrono::{TimeZone, Utc};
    use std::path::Path;
    use test_case::test_case;

    #[test_case("Sharp high" => "sharp-high")]
    #[test_case("Bayer luma denoise" => "bayer-luma-denoise")]
    #[test_case("  Tone / curve  " => "tone-curve")]
    fn slugs(label: &str) -> String {
        slug(label)
    }

    #[test]
    fn filename_is_timestamped() {
        let at = Utc.ymd(2020, 11, 3).and_hms(14, 5, 9);
        assert_eq!(
            output_filename("Sharp high", at),
            "luma-2020-11-03-140509-sharp-high.hex"
        );
    }

    #[test]
    fn output_dir_wins() {
        let path = get_output_path("Sharp", Some(Path::new("/tmp/blobs"))).unwrap();
        assert_eq!(path.parent(), Some(Path::new("/tmp/blobs")));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("luma-"));
        assert!(name.ends_with("-sharp.hex"));
    }
}
