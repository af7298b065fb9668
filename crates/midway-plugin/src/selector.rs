// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `"<name> (<uid>)"` selection format.
//!
//! Presentation surfaces list units as selection strings and hand the chosen
//! string back. Only the identifier inside the first parenthesised group is
//! significant when resolving; the name part is display text.

use std::cmp::Ordering;

use midway_core::MidwayError;

use crate::registry::MiddlewareRegistry;
use crate::unit::UnitClass;

/// Formats a unit as a selection string.
pub fn format_selection(name: &str, uid: &str) -> String {
    format!("{name} ({uid})")
}

/// Selection strings for every registered unit, naturally sorted.
pub fn list_selectable_units(registry: &MiddlewareRegistry) -> Vec<String> {
    let mut choices: Vec<String> = registry
        .iter()
        .map(|class| format_selection(class.name(), class.uid()))
        .collect();
    choices.sort_by(|a, b| natural_cmp(a, b));
    choices
}

/// Extracts the identifier from a selection string.
///
/// Returns `Ok(None)` for an empty or whitespace-only selection. The
/// identifier is the text between the first `(` and the next `)`.
pub fn parse_selection(selection: &str) -> Result<Option<&str>, MidwayError> {
    if selection.trim().is_empty() {
        return Ok(None);
    }
    let malformed = || MidwayError::MalformedSelection {
        selection: selection.to_string(),
    };

    let (_, after_open) = selection.split_once('(').ok_or_else(malformed)?;
    let (uid, _) = after_open.split_once(')').ok_or_else(malformed)?;
    if uid.is_empty() {
        return Err(malformed());
    }
    Ok(Some(uid))
}

/// Resolves a selection string to a registered unit class.
pub fn resolve<'r>(
    registry: &'r MiddlewareRegistry,
    selection: Option<&str>,
) -> Result<&'r UnitClass, MidwayError> {
    let uid = match selection {
        Some(s) => parse_selection(s)?.ok_or(MidwayError::NoSelection)?,
        None => return Err(MidwayError::NoSelection),
    };
    registry.get(uid).ok_or_else(|| MidwayError::UnknownUnit {
        uid: uid.to_string(),
    })
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Text(String),
    Digits(&'a str),
}

/// Splits `s` into alternating text and digit runs. Text is lowercased.
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(chunk(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(chunk(&s[start..], prev));
    }
    out
}

fn chunk(run: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(run)
    } else {
        Chunk::Text(run.to_lowercase())
    }
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Digits(x), Chunk::Digits(y)) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
        // A digit run sorts before text at the same position.
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
    }
}

/// Case-insensitive ordering that compares digit runs by numeric value.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = chunks(a);
    let b = chunks(b);
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = cmp_chunk(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
