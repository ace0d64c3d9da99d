use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::num::ParseFloatError;
use std::path::Path;
use std::str::FromStr;

use crate::patch::LevelRequest;
use crate::registry::{Family, Level};

quick_error! {
    #[derive(Debug)]
    pub enum ValuesError {
        BadOverride(text: String) {
            display("can't read {:?}; expected FIELD=VALUE or LEVEL:FIELD=VALUE", text)
        }
        BadNumber(text: String, err: ParseFloatError) {
            display("{:?} isn't a number: {}", text, err)
            cause(err)
        }
        UnknownField { family: String, field: String } {
            display("{:?} has no field called {:?}", family, field)
        }
        UnknownLevel { family: String, level: String } {
            display("{:?} has no level called {:?}", family, level)
        }
        Io(err: std::io::Error) {
            from()
            display("couldn't read values: {}", err)
            cause(err)
        }
        Json(err: serde_json::Error) {
            from()
            display("couldn't parse values: {}", err)
            cause(err)
        }
    }
}

/// `L1=10.0`, or `Sharp high:L1=10.0` to pin it to one level.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOverride {
    pub level: Option<String>,
    pub field: String,
    pub value: f32,
}

impl FromStr for FieldOverride {
    type Err = ValuesError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bad = || ValuesError::BadOverride(text.to_string());
        let mut sides = text.splitn(2, '=');
        let target = sides.next().ok_or_else(bad)?.trim();
        let number = sides.next().ok_or_else(bad)?.trim();
        // Level names have spaces in them but never colons.
        let (level, field) = match target.rfind(':') {
            Some(idx) => (Some(target[..idx].trim()), target[idx + 1..].trim()),
            None => (None, target),
        };
        if field.is_empty() || level.map_or(false, str::is_empty) {
            return Err(bad());
        }
        let value = number
            .parse::<f32>()
            .map_err(|err| ValuesError::BadNumber(number.to_string(), err))?;
        Ok(FieldOverride {
            level: level.map(str::to_string),
            field: field.to_string(),
            value,
        })
    }
}

impl FieldOverride {
    fn applies_to(&self, level: &str) -> bool {
        self.level.as_ref().map_or(true, |l| l == level)
    }
}

/// Values for one level in a values file: either the full ordered list, or
/// a partial map that's merged over the level's defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LevelInput {
    Ordered(Vec<f32>),
    Named(BTreeMap<String, f32>),
}

/// Level name to values.
pub type ValuesFile = BTreeMap<String, LevelInput>;

pub fn parse_values(text: &str) -> Result<ValuesFile, ValuesError> {
    Ok(serde_json::from_str(text)?)
}

pub fn load_values(path: impl AsRef<Path>) -> Result<ValuesFile, ValuesError> {
    let text = fs::read_to_string(path)?;
    parse_values(&text)
}

fn set_field(family: &Family, values: &mut [f32], field: &str, value: f32) -> Result<(), ValuesError> {
    let idx = family
        .field_index(field)
        .ok_or_else(|| ValuesError::UnknownField {
            family: family.name().to_string(),
            field: field.to_string(),
        })?;
    // Short default lists are left for the patcher to report.
    if let Some(slot) = values.get_mut(idx) {
        *slot = value;
    }
    Ok(())
}

fn apply(family: &Family, level: &str, values: &mut [f32], overrides: &[FieldOverride]) -> Result<(), ValuesError> {
    for o in overrides.iter().filter(|o| o.applies_to(level)) {
        set_field(family, values, &o.field, o.value)?;
    }
    Ok(())
}

/// The level's defaults with `overrides` applied.
pub fn resolve(family: &Family, level: &Level, overrides: &[FieldOverride]) -> Result<Vec<f32>, ValuesError> {
    let mut values = level.defaults().to_vec();
    apply(family, level.name(), &mut values, overrides)?;
    Ok(values)
}

/// Builds one request per selected level. A level is selected if it's in
/// `levels`, in the values file, or named by an override; with none of
/// those, every level in the family is used. Overrides without a level
/// apply to every selected level.
///
/// Ordered lists are passed through untouched so a wrong count gets reported
/// by the patcher against that level.
pub fn build_requests(
    family: &Family,
    levels: &[String],
    file: Option<&ValuesFile>,
    overrides: &[FieldOverride],
) -> Result<Vec<LevelRequest>, ValuesError> {
    let mut selected: Vec<&str> = Vec::new();
    let file_levels = file.into_iter().flat_map(|f| f.keys());
    let override_levels = overrides.iter().filter_map(|o| o.level.as_ref());
    for name in levels.iter().chain(file_levels).chain(override_levels) {
        if !selected.contains(&name.as_str()) {
            selected.push(name);
        }
    }
    if selected.is_empty() {
        selected = family.levels().iter().map(|level| level.name()).collect();
    }

    let mut requests = Vec::with_capacity(selected.len());
    for name in selected {
        let level = family.level(name).ok_or_else(|| ValuesError::UnknownLevel {
            family: family.name().to_string(),
            level: name.to_string(),
        })?;
        let mut values = match file.and_then(|f| f.get(name)) {
            Some(LevelInput::Ordered(values)) => values.clone(),
            Some(LevelInput::Named(named)) => {
                let mut values = level.defaults().to_vec();
                for (field, value) in named {
                    set_field(family, &mut values, field, *value)?;
                }
                values
            }
            None => level.defaults().to_vec(),
        };
        apply(family, name, &mut values, overrides)?;
        requests.push(LevelRequest::new(name, values));
    }
    Ok(requests)
}
