//! Terminal-safe rendering of strings that come from the remote API.
//!
//! Device names are user-editable on the phone and arrive verbatim from the
//! server, so they are untrusted. An embedded escape sequence could clear the
//! screen, rewrite earlier report lines or set the clipboard (OSC 52).

use std::borrow::Cow;

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Strip escape sequences and control characters, and fold line breaks into
/// spaces so a label always renders on one line.
///
/// Returns `Cow::Borrowed` for clean input.
///
/// ```
/// use waypost_types::sanitize_label;
///
/// assert_eq!(sanitize_label("Galaxy S23"), "Galaxy S23");
/// assert_eq!(sanitize_label("Galaxy\x1b[2J S23"), "Galaxy S23");
/// assert_eq!(sanitize_label("Kid's\nTag"), "Kid's Tag");
/// ```
#[must_use]
pub fn sanitize_label(input: &str) -> Cow<'_, str> {
    if !input.chars().any(needs_attention) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ESC => skip_escape(&mut chars),
            '\u{009b}' => skip_csi(&mut chars),
            '\n' | '\r' | '\t' => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    Cow::Owned(out.trim_end().to_string())
}

fn needs_attention(c: char) -> bool {
    c.is_control() || c == BEL
}

fn skip_escape<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) {
    match chars.peek() {
        Some('[') => {
            chars.next();
            skip_csi(chars);
        }
        // OSC, DCS, PM, APC: terminated by BEL or ST (ESC \)
        Some(']' | 'P' | '^' | '_') => {
            chars.next();
            while let Some(c) = chars.next() {
                if c == BEL {
                    break;
                }
                if c == ESC && chars.peek() == Some(&'\\') {
                    chars.next();
                    break;
                }
            }
        }
        Some('(' | ')' | '#') => {
            chars.next();
            chars.next();
        }
        Some(_) => {
            chars.next();
        }
        None => {}
    }
}

fn skip_csi<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) {
    while let Some(&c) = chars.peek() {
        if ('\x40'..='\x7e').contains(&c) {
            chars.next();
            return;
        }
        if ('\x20'..='\x3f').contains(&c) {
            chars.next();
        } else {
            return;
        }
    }
}
