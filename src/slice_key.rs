//! Numeric ordering of slice identifiers.
//!
//! Slices are ordered by the digits embedded in their identifier, taken
//! together as one decimal number: `slice2` < `slice10`, and
//! `IM-0001-0012` sorts as 10012. Digit strings of any length are compared
//! without overflow.

use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("slice identifier {0:?} contains no digits")]
pub struct SliceKeyError(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceKey {
    // Decimal digits with leading zeros removed; empty means zero.
    digits: String,
}

impl SliceKey {
    pub fn parse(identifier: &str) -> Result<Self, SliceKeyError> {
        let digits: String = identifier.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(SliceKeyError(identifier.to_string()));
        }
        Ok(Self {
            digits: digits.trim_start_matches('0').to_string(),
        })
    }
}

impl Ord for SliceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl PartialOrd for SliceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Stable numeric sort of `items` by the identifier `id_of` returns.
///
/// Items with equal keys keep their relative order. Fails on the first
/// identifier without digits, leaving `items` untouched.
pub fn sort_by_slice_key<T>(
    items: &mut Vec<T>,
    id_of: impl Fn(&T) -> &str,
) -> Result<(), SliceKeyError> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items.iter() {
        keyed.push(SliceKey::parse(id_of(item))?);
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| keyed[a].cmp(&keyed[b]));

    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    items.extend(order.into_iter().filter_map(|i| slots[i].take()));
    Ok(())
}
