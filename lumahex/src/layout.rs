use crate::codec::{encode, is_lower_hex, HEX_WIDTH};
use itertools::Itertools;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::char;
use nom::combinator::{all_consuming, map, map_res};
use nom::sequence::preceded;
use nom::IResult;
use std::fmt;

type I<'a> = &'a str;

/// Prefix that marks a token as a slot rather than literal bytes.
pub const SLOT_SIGIL: char = '@';

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum LayoutError {
        InvalidToken(token: String, index: usize) {
            display("invalid template token {:?} (token #{})", token, index)
        }
    }
}

/// One piece of a captured template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Bytes copied through unchanged. We don't know what they mean.
    Literal(Vec<u8>),
    /// Four bytes that hold the named float.
    Slot(String),
}

impl Segment {
    /// Length of this segment once rendered, in hex characters.
    pub fn hex_len(&self) -> usize {
        match self {
            Segment::Literal(bytes) => bytes.len() * 2,
            Segment::Slot(_) => HEX_WIDTH,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Segment::Literal(bytes) => write!(f, "{}", hex::encode(bytes)),
            Segment::Slot(name) => write!(f, "{}{}", SLOT_SIGIL, name),
        }
    }
}

/// Where a slot sits inside a rendered layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotPosition {
    pub name: String,
    /// Offset in hex characters from the start of the layout.
    pub offset: usize,
    /// The literal directly in front of the slot, if there is one.
    pub anchor: Option<Vec<u8>>,
}

/// An ordered list of segments. Both directions (patching and extracting)
/// walk this same list, so there's a single description of each layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout(Vec<Segment>);

fn is_slot_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn slot(input: I) -> IResult<I, Segment> {
    map(
        preceded(char(SLOT_SIGIL), take_while1(is_slot_char)),
        |name: &str| Segment::Slot(name.to_string()),
    )(input)
}

fn literal(input: I) -> IResult<I, Segment> {
    map_res(take_while1(is_lower_hex), |digits: &str| {
        hex::decode(digits).map(Segment::Literal)
    })(input)
}

fn token(input: I) -> IResult<I, Segment> {
    all_consuming(alt((slot, literal)))(input)
}

impl Layout {
    /// Adjacent literals are merged, so a slot's anchor is always the whole
    /// run of bytes in front of it.
    pub fn new(segments: Vec<Segment>) -> Self {
        let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
        for segment in segments {
            if let Segment::Literal(bytes) = &segment {
                if let Some(Segment::Literal(prev)) = merged.last_mut() {
                    prev.extend_from_slice(bytes);
                    continue;
                }
            }
            merged.push(segment);
        }
        Layout(merged)
    }

    /// Parses whitespace-separated tokens: lowercase hex bytes, or `@NAME`
    /// for a slot. e.g. `0a0f0d @L1 15 @L1A`.
    pub fn parse(text: &str) -> Result<Layout, LayoutError> {
        let segments = text
            .split_whitespace()
            .enumerate()
            .map(|(index, tok)| {
                token(tok)
                    .map(|(_, segment)| segment)
                    .map_err(|_| LayoutError::InvalidToken(tok.to_string(), index))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Layout::new(segments))
    }

    /// Just the fixed bytes, no slots. Used for headers and footers.
    pub fn literal(bytes: &[u8]) -> Layout {
        if bytes.is_empty() {
            Layout::default()
        } else {
            Layout(vec![Segment::Literal(bytes.to_vec())])
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hex_len(&self) -> usize {
        self.0.iter().map(Segment::hex_len).sum()
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|segment| match segment {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn literals(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().filter_map(|segment| match segment {
            Segment::Literal(bytes) => Some(bytes.as_slice()),
            Segment::Slot(_) => None,
        })
    }

    pub fn slot_positions(&self) -> Vec<SlotPosition> {
        let mut offset = 0;
        let mut positions = Vec::new();
        let mut anchor: Option<&[u8]> = None;
        for segment in &self.0 {
            match segment {
                Segment::Literal(bytes) => anchor = Some(bytes.as_slice()),
                Segment::Slot(name) => {
                    positions.push(SlotPosition {
                        name: name.clone(),
                        offset,
                        anchor: anchor.take().map(|bytes| bytes.to_vec()),
                    });
                }
            }
            offset += segment.hex_len();
        }
        positions
    }

    /// Renders the layout, asking `value_for` for each slot in order.
    pub fn try_render<E>(
        &self,
        mut value_for: impl FnMut(&str) -> Result<f32, E>,
    ) -> Result<String, E> {
        let mut out = String::with_capacity(self.hex_len());
        for segment in &self.0 {
            match segment {
                Segment::Literal(bytes) => out.push_str(&hex::encode(bytes)),
                Segment::Slot(name) => out.push_str(&encode(value_for(name)?)),
            }
        }
        Ok(out)
    }

    /// Hex of the literal bytes only. Meant for headers and footers, which
    /// never hold slots.
    pub fn literal_hex(&self) -> String {
        self.literals().map(hex::encode).collect()
    }

    /// Token form that [`Layout::parse`] reads back.
    pub fn to_tokens(&self) -> String {
        self.0.iter().map(|segment| segment.to_string()).join(" ")
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_tokens())
    }
}
