//! Single-pass notation parser.
//!
//! ```text
//! item      := tag* (group | chord | note | rest) | directive
//! group     := ("+(" | "sequence(") item* ")"        sequence
//!            | ("*(" | "overlapped(") item* ")"      overlapped
//! chord     := ("=(" | "chord(") pitch* ")" ">"? lengths  ">": last member leads
//! note      := pitch lengths
//! rest      := "r" lengths
//! directive := ("%" | "mode ") int                   mode, 1-based
//!            | ("^" | "inversion ") int              chord inversion
//!            | ("@(" | "scale(") pitch* ")"          scale declaration
//!            | "!" beat | "set(" beat ")"            default length
//!            | "set(" ("pitch=" pitch | "length=" beat)+ ")"
//! pitch     := degree accidental* shift              relative dialect
//!            | letter accidental* octave? shift      absolute dialect
//! shift     := ("+" | "-")* | ("+" | "-") int
//! lengths   := ("," beat ("," beat)?)?
//! tag       := "<" text ">"
//! ```
//!
//! Items are separated by whitespace. Several top-level items form a
//! sequence; a single one is returned as is.

use crate::error::{Position, SyntaxError};
use crate::item::{Chord, ChordMember, Group, Item, Note, PitchSymbol};
use cadenza_core::Beat;
use cadenza_synth::{accidental, PitchName, Tag};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Deepest group nesting accepted.
pub const MAX_DEPTH: usize = 256;

/// How bare pitch tokens are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Digits are degrees of the scale in scope. Letter names may appear in
    /// scale declarations.
    #[default]
    Relative,
    /// Letter names with an optional octave number.
    Absolute,
}

/// Parse `source` into an item tree.
pub fn parse(source: &str, dialect: Dialect) -> Result<Item, SyntaxError> {
    let mut parser = Parser::new(source, dialect);
    let mut items = parser.items()?;
    trace!(items = items.len(), ?dialect, "Notation parsed");
    Ok(if items.len() == 1 {
        items.remove(0)
    } else {
        Item::Sequence(Group::new(items))
    })
}

/// Where a pitch token appears; letters are always fine in scale
/// declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PitchSite {
    Note,
    Scale,
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
    dialect: Dialect,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, dialect: Dialect) -> Self {
        Self {
            source,
            pos: 0,
            dialect,
            depth: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// A keyword followed by whitespace or a digit, e.g. `mode 2`.
    fn eat_word(&mut self, word: &str) -> bool {
        let Some(after) = self.rest().strip_prefix(word) else {
            return false;
        };
        match after.chars().next() {
            Some(c) if c.is_whitespace() || c.is_ascii_digit() => {
                self.pos += word.len();
                true
            }
            _ => false,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn error_at(&self, offset: usize, expected: Vec<&'static str>) -> SyntaxError {
        let found = self.source[offset..]
            .chars()
            .next()
            .map_or_else(|| "end of input".to_string(), |c| format!("{:?}", c));
        SyntaxError {
            position: Position::locate(self.source, offset),
            expected,
            found,
        }
    }

    fn error(&self, expected: Vec<&'static str>) -> SyntaxError {
        self.error_at(self.pos, expected)
    }

    fn expect(&mut self, c: char, name: &'static str) -> Result<(), SyntaxError> {
        if self.peek() == Some(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(vec![name]))
        }
    }

    /// Items up to the closing `)` of the current group, or to the end of
    /// input at the top level.
    fn items(&mut self) -> Result<Vec<Item>, SyntaxError> {
        let mut items = Vec::new();
        let mut tags = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(')') if !tags.is_empty() => return Err(self.error(vec!["item"])),
                None if self.depth == 0 => break,
                None => return Err(self.error(vec!["item", "')'"])),
                Some(')') if self.depth > 0 => {
                    self.advance();
                    break;
                }
                Some(')') if self.depth == 0 => {
                    return Err(self.error(vec!["item", "end of input"]))
                }
                Some('<') => tags.push(self.tag()?),
                Some(_) => items.push(self.item(std::mem::take(&mut tags))?),
            }
        }
        Ok(items)
    }

    fn tag(&mut self) -> Result<Tag, SyntaxError> {
        self.expect('<', "'<'")?;
        let start = self.pos;
        let Some(len) = self.rest().find('>') else {
            return Err(self.error_at(self.source.len(), vec!["'>'"]));
        };
        self.pos += len + 1;
        Ok(Tag::new(self.source[start..start + len].trim()))
    }

    fn item(&mut self, tags: Vec<Tag>) -> Result<Item, SyntaxError> {
        let start = self.pos;
        let item = if self.eat("+(") || self.eat("sequence(") {
            Item::Sequence(self.group(tags)?)
        } else if self.eat("*(") || self.eat("overlapped(") {
            Item::Overlapped(self.group(tags)?)
        } else if self.eat("=(") || self.eat("chord(") {
            Item::Chord(self.chord(tags)?)
        } else if self.peek() == Some('r') && self.at_boundary(1) {
            self.advance();
            let (length, duration) = self.lengths()?;
            if duration.is_some() {
                return Err(self.error(vec!["end of rest"]));
            }
            self.untagged(&tags, start)?;
            Item::Rest { length }
        } else if let Some(directive) = self.directive()? {
            self.untagged(&tags, start)?;
            directive
        } else {
            let pitch = self.pitch(PitchSite::Note)?;
            let (length, duration) = self.lengths()?;
            Item::Note(Note {
                pitch,
                length,
                duration,
                tags,
            })
        };
        self.boundary()?;
        Ok(item)
    }

    fn untagged(&self, tags: &[Tag], start: usize) -> Result<(), SyntaxError> {
        if tags.is_empty() {
            Ok(())
        } else {
            Err(self.error_at(start, vec!["note", "chord", "group"]))
        }
    }

    fn directive(&mut self) -> Result<Option<Item>, SyntaxError> {
        let item = if self.eat("%") || self.eat_word("mode") {
            self.skip_whitespace();
            let at = self.pos;
            match self.integer()? {
                0 => return Err(self.error_at(at, vec!["mode from 1"])),
                mode => Item::Mode(mode),
            }
        } else if self.eat("^") || self.eat_word("inversion") {
            self.skip_whitespace();
            Item::Inversion(self.integer()?)
        } else if self.eat("@(") || self.eat("scale(") {
            Item::Scale(self.pitch_list(PitchSite::Scale)?)
        } else if self.eat("!") {
            Item::Set {
                pitch: None,
                length: Some(self.beat()?),
            }
        } else if self.eat("set(") {
            self.set()?
        } else {
            return Ok(None);
        };
        Ok(Some(item))
    }

    /// The body of `set(...)`: a bare default length, or `pitch=` and
    /// `length=` fields, each at most once.
    fn set(&mut self) -> Result<Item, SyntaxError> {
        self.skip_whitespace();
        if !(self.rest().starts_with("pitch=") || self.rest().starts_with("length=")) {
            let length = self.beat()?;
            self.skip_whitespace();
            self.expect(')', "')'")?;
            return Ok(Item::Set {
                pitch: None,
                length: Some(length),
            });
        }

        let (mut pitch, mut length) = (None, None);
        loop {
            self.skip_whitespace();
            let at = self.pos;
            if pitch.is_none() && self.eat("pitch=") {
                pitch = Some(self.pitch(PitchSite::Note)?);
            } else if length.is_none() && self.eat("length=") {
                length = Some(self.beat()?);
            } else if self.eat(")") {
                return Ok(Item::Set { pitch, length });
            } else {
                let mut expected = Vec::new();
                if pitch.is_none() {
                    expected.push("pitch=");
                }
                if length.is_none() {
                    expected.push("length=");
                }
                expected.push("')'");
                return Err(self.error_at(at, expected));
            }
            self.boundary()?;
        }
    }

    fn group(&mut self, tags: Vec<Tag>) -> Result<Group, SyntaxError> {
        self.enter()?;
        let items = self.items()?;
        self.depth -= 1;
        Ok(Group { items, tags })
    }

    fn chord(&mut self, tags: Vec<Tag>) -> Result<Chord, SyntaxError> {
        let pitches = self.pitch_list(PitchSite::Note)?;
        let reference = if self.eat(">") {
            ChordMember::Last
        } else {
            ChordMember::First
        };
        let (length, duration) = self.lengths()?;
        Ok(Chord {
            pitches,
            length,
            duration,
            tags,
            reference,
        })
    }

    fn pitch_list(&mut self, site: PitchSite) -> Result<Vec<PitchSymbol>, SyntaxError> {
        self.enter()?;
        let mut pitches = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(')') => {
                    self.advance();
                    break;
                }
                None => return Err(self.error(vec!["pitch", "')'"])),
                Some(_) => {
                    pitches.push(self.pitch(site)?);
                    self.boundary()?;
                }
            }
        }
        self.depth -= 1;
        Ok(pitches)
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(vec!["shallower nesting"]));
        }
        self.depth += 1;
        Ok(())
    }

    /// True if the token ending `skip` characters ahead is complete.
    fn at_boundary(&self, skip: usize) -> bool {
        matches!(
            self.rest().chars().nth(skip),
            None | Some(',' | ')' | '<') | Some(' ' | '\t' | '\n' | '\r')
        )
    }

    fn boundary(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None | Some(')' | '<') => Ok(()),
            Some(c) if c.is_whitespace() => Ok(()),
            Some(_) => Err(self.error(vec!["whitespace", "')'"])),
        }
    }

    fn pitch(&mut self, site: PitchSite) -> Result<PitchSymbol, SyntaxError> {
        let start = self.pos;
        let letters_ok = self.dialect == Dialect::Absolute || site == PitchSite::Scale;
        let degrees_ok = self.dialect == Dialect::Relative;
        let expected = match (degrees_ok, letters_ok) {
            (true, true) => vec!["scale degree", "pitch name"],
            (true, false) => vec!["note"],
            _ => vec!["pitch name"],
        };

        let symbol = match self.peek() {
            Some(c) if c.is_ascii_digit() && degrees_ok => {
                let degree = self.integer()?;
                if degree == 0 {
                    return Err(self.error_at(start, vec!["scale degree from 1"]));
                }
                PitchSymbol::Degree {
                    degree,
                    adjustment: self.accidentals(),
                    octave_shift: 0,
                }
            }
            Some(c) if letters_ok => match PitchName::from_letter(c) {
                Some(name) => {
                    self.advance();
                    let adjustment = self.accidentals();
                    let octave = match self.peek() {
                        Some(d) if d.is_ascii_digit() => {
                            let at = self.pos;
                            let octave = i32::try_from(self.integer()?)
                                .map_err(|_| self.error_at(at, vec!["octave"]))?;
                            Some(octave)
                        }
                        _ => None,
                    };
                    PitchSymbol::Absolute {
                        name,
                        adjustment,
                        octave,
                        octave_shift: 0,
                    }
                }
                None => return Err(self.error(expected)),
            },
            _ => return Err(self.error(expected)),
        };
        let shift = self.octave_shift()?;
        Ok(symbol.with_octave_shift(shift))
    }

    fn accidentals(&mut self) -> f64 {
        let mut adjustment = 0.0;
        while let Some(semitones) = self.peek().and_then(accidental) {
            self.advance();
            adjustment += semitones;
        }
        adjustment
    }

    /// `+`/`-` marks, or a single sign followed by a count.
    fn octave_shift(&mut self) -> Result<i32, SyntaxError> {
        let mut shift = 0i32;
        while let Some(sign @ ('+' | '-')) = self.peek() {
            if self.peek_second() == Some('(') {
                break;
            }
            self.advance();
            let step = if sign == '+' { 1 } else { -1 };
            match self.peek() {
                Some(d) if d.is_ascii_digit() => {
                    let at = self.pos;
                    shift = i32::try_from(self.integer()?)
                        .ok()
                        .and_then(|count| shift.checked_add(step * count))
                        .ok_or_else(|| self.error_at(at, vec!["octave count"]))?;
                    break;
                }
                _ => shift += step,
            }
        }
        Ok(shift)
    }

    fn lengths(&mut self) -> Result<(Option<Beat>, Option<Beat>), SyntaxError> {
        if !self.eat(",") {
            return Ok((None, None));
        }
        let length = self.beat()?;
        let duration = if self.eat(",") {
            Some(self.beat()?)
        } else {
            None
        };
        Ok((Some(length), duration))
    }

    fn beat(&mut self) -> Result<Beat, SyntaxError> {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '/'))
            .unwrap_or(self.rest().len());
        self.pos += len;
        self.source[start..start + len]
            .parse()
            .map_err(|_| self.error_at(start, vec!["beat length"]))
    }

    fn integer(&mut self) -> Result<u32, SyntaxError> {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest().len());
        self.pos += len;
        self.source[start..start + len]
            .parse()
            .map_err(|_| self.error_at(start, vec!["number"]))
    }
}
