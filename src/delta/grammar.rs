//! Response body grammars.
//!
//! Every status response carries its readings as a run of decimal digit
//! slots joined by `;`. Each slot has a maximum digit count and may be empty,
//! in which case the reading is absent rather than zero. The grammar is
//! searched for anywhere inside the fixed response window; bytes before and
//! after the first match are ignored.

use crate::error::UpsError;

use nom::bytes::complete::take_while_m_n;
use nom::character::complete::char;
use nom::IResult;

/// One optional raw value per grammar slot, in slot order.
pub type FieldRecord = Vec<Option<i32>>;

pub const DELIMITER: char = ';';

// line, freq, volt
pub const INPUT: Grammar = Grammar::new(&[1, 3, 4]);
// mode, freq, line, volt, amp, watt, percent
pub const OUTPUT: Grammar = Grammar::new(&[1, 3, 1, 4, 5, 6, 3]);
// health, status, charge mode, seconds on battery, est. minutes remaining,
// est. charge remaining, volt, amp, temperature, level
pub const BATTERY: Grammar = Grammar::new(&[1, 1, 1, 5, 4, 3, 4, 4, 3, 3]);
// last change, next change (YYYYMMDD)
pub const REPLACEMENT_DATE: Grammar = Grammar::new(&[8, 8]);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Grammar {
    delimiter: char,
    widths: &'static [usize],
}

impl Grammar {
    pub const fn new(widths: &'static [usize]) -> Self {
        Self {
            delimiter: DELIMITER,
            widths,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Maximum digit count of each slot.
    pub fn widths(&self) -> &'static [usize] {
        self.widths
    }

    pub fn slot_count(&self) -> usize {
        self.widths.len()
    }

    /// Parse a response window into raw slot values.
    ///
    /// `None` stands for a response that never arrived and yields one absent
    /// value per slot. Text that contains no match for the grammar is a
    /// `Format` error.
    pub fn parse(&self, text: Option<&str>) -> Result<FieldRecord, UpsError> {
        let Some(text) = text else {
            return Ok(vec![None; self.slot_count()]);
        };

        let slots = self.find(text).ok_or_else(|| {
            UpsError::Format(format!("no match for slots {} in {:?}", self, text))
        })?;

        slots
            .into_iter()
            .map(|slot| {
                if slot.is_empty() {
                    Ok(None)
                } else {
                    slot.parse::<i32>()
                        .map(Some)
                        .map_err(|err| UpsError::Format(format!("slot {:?}: {}", slot, err)))
                }
            })
            .collect()
    }

    /// Leftmost match of the grammar in `text`, split into slots.
    pub fn find<'a>(&self, text: &'a str) -> Option<Vec<&'a str>> {
        (0..=text.len())
            .filter(|offset| text.is_char_boundary(*offset))
            .find_map(|offset| self.slots(&text[offset..]).ok().map(|(_, slots)| slots))
    }

    // match the grammar anchored at the start of `input`
    fn slots<'a>(&self, input: &'a str) -> IResult<&'a str, Vec<&'a str>> {
        let mut slots = Vec::with_capacity(self.widths.len());
        let mut rest = input;

        for (i, width) in self.widths.iter().enumerate() {
            if i > 0 {
                (rest, _) = delimiter(self.delimiter, rest)?;
            }
            let (remaining, slot) = digits(*width, rest)?;
            slots.push(slot);
            rest = remaining;
        }

        Ok((rest, slots))
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths: Vec<String> = self.widths.iter().map(|w| format!("\\d{{0,{}}}", w)).collect();
        write!(f, "{}", widths.join(&self.delimiter.to_string()))
    }
}

// greedy run of up to `width` ASCII digits, possibly empty
fn digits(width: usize, input: &str) -> IResult<&str, &str> {
    take_while_m_n(0, width, |c: char| c.is_ascii_digit())(input)
}

fn delimiter(delimiter: char, input: &str) -> IResult<&str, char> {
    char(delimiter)(input)
}
