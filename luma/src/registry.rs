use itertools::Itertools;
use lumahex::{Layout, LayoutError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::builtin;

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum RegistryError {
        Template { family: String, level: String, err: LayoutError } {
            display("bad template for {:?} in {:?}: {}", level, family, err)
            cause(err)
        }
        Frame { family: String, part: &'static str, err: LayoutError } {
            display("bad {} for {:?}: {}", part, family, err)
            cause(err)
        }
        SlotInFrame { family: String, part: &'static str } {
            display("{} for {:?} can't contain slots", part, family)
        }
        DuplicateFamily(family: String) {
            display("family {:?} defined twice", family)
        }
        DuplicateField { family: String, field: String } {
            display("field {:?} listed twice in {:?}", field, family)
        }
        DuplicateLevel { family: String, level: String } {
            display("level {:?} defined twice in {:?}", level, family)
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum LoadError {
        Io(err: std::io::Error) {
            from()
            display("couldn't read registry: {}", err)
            cause(err)
        }
        Json(err: serde_json::Error) {
            from()
            display("couldn't parse registry: {}", err)
            cause(err)
        }
        Registry(err: RegistryError) {
            from()
            display("{}", err)
            cause(err)
        }
    }
}

/// On-disk form of a registry. Templates and headers use the token syntax
/// from [`Layout::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: String,
    pub families: Vec<FamilyFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyFile {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub footer: String,
    pub levels: Vec<LevelFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFile {
    pub name: String,
    pub defaults: Vec<f32>,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    name: String,
    defaults: Vec<f32>,
    layout: Layout,
}

impl Level {
    pub fn new(name: &str, defaults: Vec<f32>, layout: Layout) -> Self {
        Level {
            name: name.to_string(),
            defaults,
            layout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &[f32] {
        &self.defaults
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

/// A group of levels sharing the same field list and framing.
#[derive(Debug, Clone, PartialEq)]
pub struct Family {
    name: String,
    fields: Vec<String>,
    header: Layout,
    footer: Layout,
    levels: Vec<Level>,
}

/// Ways a level can disagree with its family. Captured templates drift, so
/// these get reported rather than refused at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum Drift {
    MissingSlot { level: String, field: String },
    UnknownSlot { level: String, slot: String },
    DuplicateSlot { level: String, slot: String },
    DefaultsCount { level: String, expected: usize, got: usize },
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Drift::MissingSlot { level, field } => {
                write!(f, "{}: no slot for field {}", level, field)
            }
            Drift::UnknownSlot { level, slot } => {
                write!(f, "{}: slot {} isn't a field of this family", level, slot)
            }
            Drift::DuplicateSlot { level, slot } => write!(f, "{}: slot {} appears twice", level, slot),
            Drift::DefaultsCount {
                level,
                expected,
                got,
            } => write!(f, "{}: {} defaults, expected {}", level, got, expected),
        }
    }
}

impl Family {
    pub fn new(name: &str, fields: &[&str], header: Layout, footer: Layout, levels: Vec<Level>) -> Self {
        Family {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            header,
            footer,
            levels,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field names in the order values are supplied.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn expected_count(&self) -> usize {
        self.fields.len()
    }

    pub fn header(&self) -> &Layout {
        &self.header
    }

    pub fn footer(&self) -> &Layout {
        &self.footer
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, name: &str) -> Option<&Level> {
        self.levels.iter().find(|level| level.name == name)
    }

    pub fn level_index(&self, name: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    /// Everything that's wrong with `level` relative to this family's fields.
    pub fn drift(&self, level: &Level) -> Vec<Drift> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for slot in level.layout.slot_names() {
            if !seen.insert(slot) {
                issues.push(Drift::DuplicateSlot {
                    level: level.name.clone(),
                    slot: slot.to_string(),
                });
            } else if self.field_index(slot).is_none() {
                issues.push(Drift::UnknownSlot {
                    level: level.name.clone(),
                    slot: slot.to_string(),
                });
            }
        }
        for field in &self.fields {
            if !seen.contains(field.as_str()) {
                issues.push(Drift::MissingSlot {
                    level: level.name.clone(),
                    field: field.clone(),
                });
            }
        }
        if level.defaults.len() != self.fields.len() {
            issues.push(Drift::DefaultsCount {
                level: level.name.clone(),
                expected: self.fields.len(),
                got: level.defaults.len(),
            });
        }
        issues
    }

    fn from_file(file: &FamilyFile) -> Result<Family, RegistryError> {
        let frame = |part: &'static str, text: &str| -> Result<Layout, RegistryError> {
            let layout = Layout::parse(text).map_err(|err| RegistryError::Frame {
                family: file.name.clone(),
                part,
                err,
            })?;
            if layout.slot_names().next().is_some() {
                return Err(RegistryError::SlotInFrame {
                    family: file.name.clone(),
                    part,
                });
            }
            Ok(layout)
        };
        let repeated = file
            .fields
            .iter()
            .enumerate()
            .find(|(idx, field)| file.fields[..*idx].contains(*field));
        if let Some((_, field)) = repeated {
            return Err(RegistryError::DuplicateField {
                family: file.name.clone(),
                field: field.clone(),
            });
        }
        let header = frame("header", &file.header)?;
        let footer = frame("footer", &file.footer)?;

        let mut levels: Vec<Level> = Vec::with_capacity(file.levels.len());
        for level in &file.levels {
            if levels.iter().any(|l| l.name == level.name) {
                return Err(RegistryError::DuplicateLevel {
                    family: file.name.clone(),
                    level: level.name.clone(),
                });
            }
            let layout = Layout::parse(&level.template).map_err(|err| RegistryError::Template {
                family: file.name.clone(),
                level: level.name.clone(),
                err,
            })?;
            levels.push(Level::new(&level.name, level.defaults.clone(), layout));
        }

        Ok(Family {
            name: file.name.clone(),
            fields: file.fields.clone(),
            header,
            footer,
            levels,
        })
    }

    fn to_file(&self) -> FamilyFile {
        FamilyFile {
            name: self.name.clone(),
            fields: self.fields.clone(),
            header: self.header.to_tokens(),
            footer: self.footer.to_tokens(),
            levels: self
                .levels
                .iter()
                .map(|level| LevelFile {
                    name: level.name.clone(),
                    defaults: level.defaults.clone(),
                    template: level.layout.to_tokens(),
                })
                .collect(),
        }
    }
}

/// An immutable, versioned table of families.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    version: String,
    families: Vec<Family>,
}

lazy_static! {
    static ref BUILTIN: Result<Registry, RegistryError> = Registry::from_file(&builtin::registry_file());
}

impl Registry {
    pub fn new(version: &str, families: Vec<Family>) -> Self {
        Registry {
            version: version.to_string(),
            families,
        }
    }

    /// The compiled-in tables. Parsed on first use.
    pub fn builtin() -> Result<&'static Registry, RegistryError> {
        BUILTIN.as_ref().map_err(|err| err.clone())
    }

    pub fn from_file(file: &RegistryFile) -> Result<Registry, RegistryError> {
        let mut families: Vec<Family> = Vec::with_capacity(file.families.len());
        for family in &file.families {
            if families.iter().any(|f| f.name == family.name) {
                return Err(RegistryError::DuplicateFamily(family.name.clone()));
            }
            families.push(Family::from_file(family)?);
        }
        Ok(Registry {
            version: file.version.clone(),
            families,
        })
    }

    pub fn from_json(text: &str) -> Result<Registry, LoadError> {
        let file: RegistryFile = serde_json::from_str(text)?;
        Ok(Registry::from_file(&file)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Registry, LoadError> {
        let text = fs::read_to_string(path.as_ref())?;
        let registry = Registry::from_json(&text)?;
        info!(
            "Loaded registry {} from {}: {} families",
            registry.version,
            path.as_ref().display(),
            registry.families.len()
        );
        Ok(registry)
    }

    pub fn to_file(&self) -> RegistryFile {
        RegistryFile {
            version: self.version.clone(),
            families: self.families.iter().map(Family::to_file).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn family(&self, name: &str) -> Option<&Family> {
        self.families.iter().find(|family| family.name == name)
    }

    /// First family containing a level called `name`.
    pub fn find_level(&self, name: &str) -> Option<(&Family, &Level)> {
        self.families
            .iter()
            .filter_map(|family| family.level(name).map(|level| (family, level)))
            .next()
    }

    /// Drift across every level, tagged with its family name.
    pub fn check(&self) -> Vec<(String, Drift)> {
        self.families
            .iter()
            .flat_map(|family| {
                family
                    .levels
                    .iter()
                    .flat_map(move |level| family.drift(level))
                    .map(move |drift| (family.name.clone(), drift))
            })
            .collect_vec()
    }
}

#[cfg(test)]
mod test {
    use crate::registry::{Drift, LoadError, Registry, RegistryError};

    const SMALL: &str = r#"{
        "version": "test-1",
        "families": [
            {
                "name": "Sharp",
                "fields": ["L1", "L1A"],
                "header": "0a49",
                "levels": [
                    { "name": "a", "defaults": [1.0, 2.0], "template": "0a140d @L1 1d @L1A 2801" },
                    { "name": "b", "defaults": [1.0], "template": "0a140d @L1 1d @L2 @L2" }
                ]
            }
        ]
    }"#;

    #[test]
    fn builtin_is_consistent() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.check(), vec![]);
        let names: Vec<&str> = registry.families().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "Sharp",
                "Sharp bento",
                "Bayer luma denoise",
                "Bayer chroma denoise",
                "Tone curve"
            ]
        );
    }

    #[test]
    fn builtin_field_counts() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.family("Sharp").unwrap().expected_count(), 6);
        assert_eq!(registry.family("Sharp bento").unwrap().expected_count(), 6);
        assert_eq!(registry.family("Bayer luma denoise").unwrap().expected_count(), 14);
        assert_eq!(registry.family("Tone curve").unwrap().expected_count(), 17);
    }

    #[test]
    fn find_level_searches_all_families() {
        let registry = Registry::builtin().unwrap();
        let (family, level) = registry.find_level("Sharp bento low").unwrap();
        assert_eq!(family.name(), "Sharp bento");
        assert_eq!(level.name(), "Sharp bento low");
        assert!(registry.find_level("Sharp bento extreme").is_none());
    }

    #[test]
    fn bayer_slots_follow_markers() {
        let registry = Registry::builtin().unwrap();
        let family = registry.family("Bayer luma denoise").unwrap();
        let positions = family.levels()[0].layout().slot_positions();
        let anchor = |name: &str| {
            positions
                .iter()
                .find(|p| p.name == name)
                .and_then(|p| p.anchor.clone())
                .map(hex::encode)
        };
        for first in &["L1", "L2", "L3", "L4"] {
            assert_eq!(anchor(first), Some("0a0f0d".to_string()));
        }
        assert_eq!(anchor("L5"), Some("0a0a0d".to_string()));
        assert_eq!(anchor("L5A"), Some("15".to_string()));
        assert_eq!(anchor("L1B"), Some("1d".to_string()));
    }

    #[test]
    fn drift_is_reported_not_refused() {
        let registry = Registry::from_json(SMALL).unwrap();
        let issues: Vec<Drift> = registry.check().into_iter().map(|(_, d)| d).collect();
        assert_eq!(
            issues,
            vec![
                Drift::UnknownSlot {
                    level: "b".to_string(),
                    slot: "L2".to_string()
                },
                Drift::DuplicateSlot {
                    level: "b".to_string(),
                    slot: "L2".to_string()
                },
                Drift::MissingSlot {
                    level: "b".to_string(),
                    field: "L1A".to_string()
                },
                Drift::DefaultsCount {
                    level: "b".to_string(),
                    expected: 2,
                    got: 1
                },
            ]
        );
    }

    #[test]
    fn json_roundtrip() {
        let registry = Registry::builtin().unwrap();
        let text = registry.to_json().unwrap();
        let reloaded = Registry::from_json(&text).unwrap();
        assert_eq!(&reloaded, registry);
    }

    #[test]
    fn duplicate_level_is_refused() {
        let text = SMALL.replace(r#""name": "b""#, r#""name": "a""#);
        match Registry::from_json(&text) {
            Err(LoadError::Registry(RegistryError::DuplicateLevel { level, .. })) => {
                assert_eq!(level, "a")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn duplicate_field_is_refused() {
        let text = SMALL.replace(r#"["L1", "L1A"]"#, r#"["L1", "L1A", "L1"]"#);
        match Registry::from_json(&text) {
            Err(LoadError::Registry(RegistryError::DuplicateField { field, .. })) => {
                assert_eq!(field, "L1")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_header_is_refused() {
        let text = SMALL.replace(r#""header": "0a49""#, r#""header": "0a49 @L1""#);
        match Registry::from_json(&text) {
            Err(LoadError::Registry(RegistryError::SlotInFrame { part, .. })) => {
                assert_eq!(part, "header")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_template_names_level() {
        let text = SMALL.replace("2801", "28z1");
        match Registry::from_json(&text) {
            Err(LoadError::Registry(RegistryError::Template { level, .. })) => assert_eq!(level, "a"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
