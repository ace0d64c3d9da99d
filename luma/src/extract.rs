use lumahex::blob::normalize;
use lumahex::scan::find_marker;
use lumahex::{decode, FormatError, Segment, HEX_WIDTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::registry::{Drift, Family, Level};

pub const DEFAULT_PRECISION: u32 = 6;
/// More decimals than this say nothing more about an `f32`.
pub const MAX_PRECISION: u32 = 9;

/// How literals are located while walking a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Every literal must sit exactly where the layout puts it.
    Fixed,
    /// Like `Fixed`, but anything in front of the first literal or after
    /// the last one is skipped.
    Scan,
}

impl Default for ExtractMode {
    fn default() -> Self {
        ExtractMode::Fixed
    }
}

impl FromStr for ExtractMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(ExtractMode::Fixed),
            "scan" => Ok(ExtractMode::Scan),
            other => Err(format!("unknown extract mode {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    pub mode: ExtractMode,
    /// Decimal places kept in [`DecodedField::value`].
    pub precision: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            mode: ExtractMode::Fixed,
            precision: DEFAULT_PRECISION,
        }
    }
}

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum FieldErrorKind {
        Decode { offset: usize, err: FormatError } {
            display("can't decode the value at offset {}: {}", offset, err)
            cause(err)
        }
        TemplateMismatch { marker: String, offset: usize } {
            display("expected {} at offset {}", marker, offset)
        }
        TrailingData { offset: usize, len: usize } {
            display("{} unexpected hex characters from offset {}", len, offset)
        }
    }
}

/// A problem with one field of one level. `field` is `None` for problems
/// that don't belong to a slot, like a broken trailer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub level: String,
    pub field: Option<String>,
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} {}: {}", self.level, field, self.kind),
            None => write!(f, "{}: {}", self.level, self.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub name: String,
    /// Exactly what was in the blob.
    pub raw: f32,
    /// `raw`, rounded for display.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelExtraction {
    pub level: String,
    pub fields: Vec<DecodedField>,
    pub errors: Vec<FieldError>,
}

impl LevelExtraction {
    fn new(level: &str) -> Self {
        LevelExtraction {
            level: level.to_string(),
            fields: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&DecodedField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Raw values in the family's field order, if every field decoded.
    pub fn values(&self, family: &Family) -> Option<Vec<f32>> {
        family
            .fields()
            .iter()
            .map(|name| self.field(name).map(|field| field.raw))
            .collect()
    }
}

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum PrecisionError {
        TooHigh(places: u32) {
            display("precision can be at most {} decimals, got {}", MAX_PRECISION, places)
        }
    }
}

pub fn check_precision(places: u32) -> Result<u32, PrecisionError> {
    if places > MAX_PRECISION {
        Err(PrecisionError::TooHigh(places))
    } else {
        Ok(places)
    }
}

/// Rounds to `places` decimals, at most [`MAX_PRECISION`]. Non-finite values
/// pass through.
pub fn round_to(value: f32, places: u32) -> f64 {
    let value = f64::from(value);
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(places.min(MAX_PRECISION) as i32);
    (value * scale).round() / scale
}

/// A literal that wasn't where it should have been. It's charged to the next
/// slot, or reported on its own if another literal turns up first.
struct Pending {
    owner: usize,
    marker: String,
    offset: usize,
}

struct Walk<'a> {
    blob: &'a str,
    mode: ExtractMode,
    cursor: usize,
    pending: Option<Pending>,
    /// Set once the first literal has been stepped over. From then on
    /// literals have to be exactly where the layout puts them.
    anchored: bool,
}

impl<'a> Walk<'a> {
    fn new(blob: &'a str, mode: ExtractMode) -> Self {
        Walk {
            blob,
            mode,
            cursor: 0,
            pending: None,
            anchored: false,
        }
    }

    fn locate(&self, marker: &str) -> Option<usize> {
        let rest = self.blob.get(self.cursor..)?;
        match self.mode {
            ExtractMode::Scan if !self.anchored => {
                find_marker(rest, marker).map(|pos| self.cursor + pos)
            }
            _ if rest.starts_with(marker) => Some(self.cursor),
            _ => None,
        }
    }

    /// Steps over a literal. Returns a previous mismatch that never reached a
    /// slot.
    fn literal(&mut self, owner: usize, bytes: &[u8]) -> Option<Pending> {
        let marker = hex::encode(bytes);
        let stale = self.pending.take();
        let found = self.locate(&marker);
        self.anchored = true;
        match found {
            Some(pos) => {
                if pos > self.cursor {
                    debug!("Skipped {} hex chars before {}", pos - self.cursor, marker);
                }
                self.cursor = pos + marker.len();
            }
            None => {
                let offset = self.cursor;
                // The slots after it are still where the layout says they are.
                self.cursor += marker.len();
                self.pending = Some(Pending {
                    owner,
                    marker,
                    offset,
                });
            }
        }
        stale
    }

    fn slot(&mut self) -> Result<f32, FieldErrorKind> {
        let start = self.cursor;
        self.cursor += HEX_WIDTH;
        if let Some(Pending { marker, offset, .. }) = self.pending.take() {
            return Err(FieldErrorKind::TemplateMismatch { marker, offset });
        }
        let len = self.blob.len();
        let slice = self.blob.get(start.min(len)..self.cursor.min(len)).unwrap_or("");
        decode(slice).map_err(|err| FieldErrorKind::Decode { offset: start, err })
    }

    /// Whatever's left once the layout is used up.
    fn finish(mut self) -> (Option<Pending>, Option<FieldErrorKind>) {
        let stale = self.pending.take();
        let trailing = match self.mode {
            ExtractMode::Fixed if self.cursor < self.blob.len() => Some(FieldErrorKind::TrailingData {
                offset: self.cursor,
                len: self.blob.len() - self.cursor,
            }),
            _ => None,
        };
        (stale, trailing)
    }
}

struct Results {
    levels: Vec<LevelExtraction>,
}

impl Results {
    fn error(&mut self, owner: usize, field: Option<&str>, kind: FieldErrorKind) {
        let level = &mut self.levels[owner];
        let err = FieldError {
            level: level.level.clone(),
            field: field.map(str::to_string),
            kind,
        };
        warn!("{}", err);
        level.errors.push(err);
    }

    fn stale(&mut self, pending: Option<Pending>) {
        if let Some(Pending {
            owner,
            marker,
            offset,
        }) = pending
        {
            self.error(owner, None, FieldErrorKind::TemplateMismatch { marker, offset });
        }
    }
}

/// Walks header, levels, footer as one sequence. Header problems are charged
/// to the first level and footer or trailing problems to the last.
fn walk(blob: &str, family: &Family, levels: &[&Level], options: &ExtractOptions) -> Vec<LevelExtraction> {
    let mut results = Results {
        levels: levels.iter().map(|level| LevelExtraction::new(level.name())).collect(),
    };
    if levels.is_empty() {
        return results.levels;
    }
    let last = levels.len() - 1;
    let blob = normalize(blob);
    let mut walk = Walk::new(&blob, options.mode);

    for bytes in family.header().literals() {
        let stale = walk.literal(0, bytes);
        results.stale(stale);
    }

    for (idx, level) in levels.iter().enumerate() {
        let start = walk.cursor;
        let mut seen: Vec<&str> = Vec::new();
        for segment in level.layout().segments() {
            match segment {
                Segment::Literal(bytes) => {
                    let stale = walk.literal(idx, bytes);
                    results.stale(stale);
                }
                // The patcher refuses these, so nothing here is trusted either.
                Segment::Slot(name) if family.field_index(name).is_none() || seen.contains(&name.as_str()) => {
                    let offset = walk.cursor;
                    let kind = match walk.slot() {
                        Err(kind @ FieldErrorKind::TemplateMismatch { .. }) => kind,
                        _ => FieldErrorKind::TemplateMismatch {
                            marker: format!("{}{}", lumahex::layout::SLOT_SIGIL, name),
                            offset,
                        },
                    };
                    results.error(idx, Some(name.as_str()), kind);
                }
                Segment::Slot(name) => match walk.slot() {
                    Ok(raw) => {
                        seen.push(name);
                        debug!("{} {} = {}", level.name(), name, raw);
                        results.levels[idx].fields.push(DecodedField {
                            name: name.clone(),
                            raw,
                            value: round_to(raw, options.precision),
                        })
                    }
                    Err(kind) => {
                        seen.push(name);
                        results.error(idx, Some(name.as_str()), kind)
                    }
                },
            }
        }
        // A field with nowhere to come from is a mismatch, not a gap.
        for drift in family.drift(level) {
            if let Drift::MissingSlot { field, .. } = drift {
                let marker = format!("{}{}", lumahex::layout::SLOT_SIGIL, field);
                results.error(
                    idx,
                    Some(field.as_str()),
                    FieldErrorKind::TemplateMismatch { marker, offset: start },
                );
            }
        }
    }

    for bytes in family.footer().literals() {
        let stale = walk.literal(last, bytes);
        results.stale(stale);
    }

    let (stale, trailing) = walk.finish();
    results.stale(stale);
    if let Some(kind) = trailing {
        results.error(last, None, kind);
    }
    results.levels
}

/// Reads one level's fields out of a blob produced by patching that level
/// alone (header, level, footer).
pub fn extract_level(blob: &str, family: &Family, level: &Level, options: &ExtractOptions) -> LevelExtraction {
    let mut levels = walk(blob, family, &[level], options);
    let extraction = levels.remove(0);
    info!(
        "Extracted {} fields of {:?} ({} errors)",
        extraction.fields.len(),
        level.name(),
        extraction.errors.len()
    );
    extraction
}

/// Reads a blob holding every level of the family in registry order, as
/// produced by patching all of them together.
pub fn extract_family(blob: &str, family: &Family, options: &ExtractOptions) -> Vec<LevelExtraction> {
    let levels: Vec<&Level> = family.levels().iter().collect();
    let extractions = walk(blob, family, &levels, options);
    info!(
        "Extracted {} levels of {:?} ({} with errors)",
        extractions.len(),
        family.name(),
        extractions.iter().filter(|e| !e.is_complete()).count()
    );
    extractions
}
