use crate::registry::{Drift, Family, Level};
use lumahex::layout::SLOT_SIGIL;

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum PatchError {
        UnknownLevel { family: String, level: String } {
            display("{:?} has no level called {:?}", family, level)
        }
        DuplicateRequest { level: String } {
            display("{:?} was requested more than once", level)
        }
        ValueCount { level: String, expected: usize, got: usize } {
            display("{:?} takes {} values, got {}", level, expected, got)
        }
        TemplateMismatch { level: String, marker: String } {
            display("template for {:?} doesn't line up with its family at {}", level, marker)
        }
    }
}

/// One level to patch, with values in the family's field order.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRequest {
    pub level: String,
    pub values: Vec<f32>,
}

impl LevelRequest {
    pub fn new(level: &str, values: Vec<f32>) -> Self {
        LevelRequest {
            level: level.to_string(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchedLevel {
    pub level: String,
    pub hex: String,
}

/// Result of patching several levels of one family. `blob` holds the levels
/// that worked; the rest are in `errors`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub blob: String,
    pub levels: Vec<PatchedLevel>,
    pub errors: Vec<PatchError>,
}

impl Batch {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

fn mismatch(level: &Level, name: &str) -> PatchError {
    PatchError::TemplateMismatch {
        level: level.name().to_string(),
        marker: format!("{}{}", SLOT_SIGIL, name),
    }
}

/// Renders just the level's own bytes, no header or footer.
fn render_level(family: &Family, level: &Level, values: &[f32]) -> Result<String, PatchError> {
    if values.len() != family.expected_count() {
        return Err(PatchError::ValueCount {
            level: level.name().to_string(),
            expected: family.expected_count(),
            got: values.len(),
        });
    }
    // Refuse to emit a level whose slots don't match the fields one-to-one;
    // otherwise some value would silently keep whatever the template had.
    for drift in family.drift(level) {
        match drift {
            Drift::MissingSlot { field, .. } => return Err(mismatch(level, &field)),
            Drift::UnknownSlot { slot, .. } | Drift::DuplicateSlot { slot, .. } => {
                return Err(mismatch(level, &slot))
            }
            // Defaults aren't used here.
            Drift::DefaultsCount { .. } => {}
        }
    }
    let hex = level.layout().try_render(|name| {
        family
            .field_index(name)
            .map(|idx| values[idx])
            .ok_or_else(|| mismatch(level, name))
    })?;
    debug!("Patched {:?}: {} hex chars", level.name(), hex.len());
    Ok(hex)
}

fn frame<'a>(family: &Family, bodies: impl Iterator<Item = &'a str>) -> String {
    let mut out = family.header().literal_hex();
    for body in bodies {
        out.push_str(body);
    }
    out.push_str(&family.footer().literal_hex());
    out
}

/// Header, the patched level, footer.
pub fn patch_level(family: &Family, level: &Level, values: &[f32]) -> Result<String, PatchError> {
    let body = render_level(family, level, values)?;
    Ok(frame(family, std::iter::once(body.as_str())))
}

/// Patches every request independently. A failing level is left out of the
/// blob and reported; it doesn't stop the others. Levels come out in
/// registry order whatever order they were asked for in.
pub fn patch_batch(family: &Family, requests: &[LevelRequest]) -> Batch {
    let mut patched: Vec<(usize, PatchedLevel)> = Vec::with_capacity(requests.len());
    let mut errors = Vec::new();
    let mut requested: Vec<usize> = Vec::with_capacity(requests.len());

    for request in requests {
        let idx = match family.level_index(&request.level) {
            Some(idx) => idx,
            None => {
                errors.push(PatchError::UnknownLevel {
                    family: family.name().to_string(),
                    level: request.level.clone(),
                });
                continue;
            }
        };
        if requested.contains(&idx) {
            errors.push(PatchError::DuplicateRequest {
                level: request.level.clone(),
            });
            continue;
        }
        requested.push(idx);

        let level = &family.levels()[idx];
        match render_level(family, level, &request.values) {
            Ok(hex) => patched.push((
                idx,
                PatchedLevel {
                    level: request.level.clone(),
                    hex,
                },
            )),
            Err(err) => {
                warn!("Skipping {:?}: {}", request.level, err);
                errors.push(err);
            }
        }
    }

    patched.sort_by_key(|(idx, _)| *idx);
    let levels: Vec<PatchedLevel> = patched.into_iter().map(|(_, level)| level).collect();
    let blob = frame(family, levels.iter().map(|level| level.hex.as_str()));
    info!(
        "Patched {} of {} requested levels of {:?}",
        levels.len(),
        requests.len(),
        family.name()
    );
    Batch {
        blob,
        levels,
        errors,
    }
}

/// Every level of the family at its default values.
pub fn patch_defaults(family: &Family) -> Batch {
    let requests: Vec<LevelRequest> = family
        .levels()
        .iter()
        .map(|level| LevelRequest::new(level.name(), level.defaults().to_vec()))
        .collect();
    patch_batch(family, &requests)
}

#[cfg(test)]
mod test {
    use crate::patch::{patch_batch, patch_defaults, patch_level, LevelRequest, PatchError};
    use crate::registry::{Family, Level, Registry};
    use lumahex::{encode, Layout};

    fn sharp() -> &'static Family {
        Registry::builtin().unwrap().family("Sharp").unwrap()
    }

    #[test]
    fn sharp_very_low_scenario() {
        let family = sharp();
        let level = family.level("Sharp very low").unwrap();
        let values = [7.0, 0.060, 3.075, 0.040, 1.875, 0.058];
        let blob = patch_level(family, level, &values).unwrap();

        let expected = format!(
            "0a490a140d{}1d{}0d{}1d{}120a0d{}1d{}2801",
            encode(7.0),
            encode(0.060),
            encode(3.075),
            encode(0.040),
            encode(1.875),
            encode(0.058)
        );
        assert_eq!(blob, expected);
        assert!(blob.starts_with("0a490a140d0000e0401d"));
    }

    #[test]
    fn pairs_sit_inline_with_separator() {
        let family = sharp();
        let level = family.level("Sharp high").unwrap();
        let values = [10.0, 0.066, 3.87, 0.040, 4.62, 0.0224];
        let blob = patch_level(family, level, &values).unwrap();
        for pair in values.chunks(2) {
            let inline = format!("{}1d{}", encode(pair[0]), encode(pair[1]));
            assert!(blob.contains(&inline), "missing {}", inline);
        }
        // First pair sits right after the header and the level's opening marker.
        let first = format!("{}1d{}", encode(10.0), encode(0.066));
        assert_eq!(blob.find(&first), Some("0a490a140d".len()));
    }

    #[test]
    fn is_deterministic() {
        let family = sharp();
        let level = family.level("Sharp low").unwrap();
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(
            patch_level(family, level, &values).unwrap(),
            patch_level(family, level, &values).unwrap()
        );
    }

    #[test]
    fn literals_are_preserved_in_order() {
        let registry = Registry::builtin().unwrap();
        for family in registry.families() {
            for level in family.levels() {
                let values: Vec<f32> = (0..family.expected_count()).map(|i| i as f32 * 1.5).collect();
                let blob = patch_level(family, level, &values).unwrap();
                let mut from = 0;
                for literal in level.layout().literals() {
                    let literal = hex::encode(literal);
                    let found = blob[from..].find(&literal).map(|pos| pos + from);
                    assert!(found.is_some(), "{} lost {}", level.name(), literal);
                    from = found.unwrap() + literal.len();
                }
                let expected_len = family.header().hex_len()
                    + level.layout().hex_len()
                    + family.footer().hex_len();
                assert_eq!(blob.len(), expected_len);
            }
        }
    }

    #[test]
    fn bayer_tail_pair_follows_terminal_marker() {
        let registry = Registry::builtin().unwrap();
        let family = registry.family("Bayer luma denoise").unwrap();
        let level = family.level("Bayer luma denoise medium").unwrap();
        let mut values = level.defaults().to_vec();
        values[12] = 9.5;
        values[13] = 0.25;
        let blob = patch_level(family, level, &values).unwrap();
        let tail = format!("0a0a0d{}15{}", encode(9.5), encode(0.25));
        assert!(blob.contains(&tail));
        // L1 keeps its own value; it must not be clobbered by L5.
        assert!(blob.starts_with(&format!("2aa4010a0f0d{}", encode(2.0))));
    }

    #[test]
    fn wrong_value_count() {
        let family = sharp();
        let level = family.level("Sharp low").unwrap();
        assert_eq!(
            patch_level(family, level, &[1.0, 2.0]),
            Err(PatchError::ValueCount {
                level: "Sharp low".to_string(),
                expected: 6,
                got: 2
            })
        );
    }

    fn drifted_family() -> Family {
        let ok = Level::new(
            "ok",
            vec![1.0, 2.0],
            Layout::parse("0a0f0d @L1 15 @L1A").unwrap(),
        );
        // Lost its L1A slot when the template was re-captured.
        let drifted = Level::new("drifted", vec![1.0, 2.0], Layout::parse("0a0f0d @L1 15").unwrap());
        let also_ok = Level::new(
            "also ok",
            vec![3.0, 4.0],
            Layout::parse("0a0a0d @L1 15 @L1A").unwrap(),
        );
        Family::new(
            "Test",
            &["L1", "L1A"],
            Layout::parse("aa").unwrap(),
            Layout::parse("ff").unwrap(),
            vec![ok, drifted, also_ok],
        )
    }

    #[test]
    fn drift_is_a_mismatch_not_a_silent_skip() {
        let family = drifted_family();
        let level = family.level("drifted").unwrap();
        assert_eq!(
            patch_level(&family, level, &[1.0, 2.0]),
            Err(PatchError::TemplateMismatch {
                level: "drifted".to_string(),
                marker: "@L1A".to_string()
            })
        );
    }

    #[test]
    fn batch_isolates_failures() {
        let family = drifted_family();
        let batch = patch_batch(
            &family,
            &[
                LevelRequest::new("also ok", vec![5.0, 6.0]),
                LevelRequest::new("drifted", vec![1.0, 2.0]),
                LevelRequest::new("missing", vec![1.0, 2.0]),
                LevelRequest::new("ok", vec![1.0, 2.0]),
                LevelRequest::new("ok", vec![1.0, 2.0]),
            ],
        );
        assert!(!batch.is_complete());
        assert_eq!(batch.errors.len(), 3);
        assert!(matches!(batch.errors[0], PatchError::TemplateMismatch { .. }));
        assert!(matches!(batch.errors[1], PatchError::UnknownLevel { .. }));
        assert!(matches!(batch.errors[2], PatchError::DuplicateRequest { .. }));

        // Registry order, not request order.
        let names: Vec<&str> = batch.levels.iter().map(|l| l.level.as_str()).collect();
        assert_eq!(names, vec!["ok", "also ok"]);
        let expected = format!(
            "aa0a0f0d{}15{}0a0a0d{}15{}ff",
            encode(1.0),
            encode(2.0),
            encode(5.0),
            encode(6.0)
        );
        assert_eq!(batch.blob, expected);
    }

    #[test]
    fn defaults_cover_every_level() {
        let batch = patch_defaults(sharp());
        assert!(batch.is_complete());
        assert_eq!(batch.levels.len(), 5);
        assert!(batch.blob.starts_with("0a49"));
        assert_eq!(batch.blob.matches("0a490a140d").count(), 1);
    }
}
