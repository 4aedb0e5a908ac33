// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Byte cursor used by the frame grammars.
//!
//! Every method either consumes what it matched and returns it, or leaves the
//! cursor untouched. Only ASCII bytes are ever consumed, so every position the
//! cursor reaches is a valid `str` boundary.

pub(crate) struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Start at `pos`, which must be the index of an ASCII byte.
    pub(crate) fn at(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    pub(crate) fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume one byte out of `set`.
    pub(crate) fn one_of(&mut self, set: &[u8]) -> Option<u8> {
        let b = self.peek()?;
        if set.contains(&b) {
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }

    /// Consume a run of one or more ASCII digits.
    pub(crate) fn digits(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let len = self.src.as_bytes()[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&self.src[start..self.pos])
    }

    /// Consume exactly `n` ASCII digits.
    pub(crate) fn digits_exact(&mut self, n: usize) -> Option<&'a str> {
        let end = self.pos + n;
        let slice = self.src.as_bytes().get(self.pos..end)?;
        if !slice.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let start = self.pos;
        self.pos = end;
        Some(&self.src[start..end])
    }

    /// Consume ASCII whitespace and return how many bytes were skipped.
    pub(crate) fn whitespace(&mut self) -> usize {
        let len = self.src.as_bytes()[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.pos += len;
        len
    }

    /// Consume the longest run of bytes accepted by `pred`.
    pub(crate) fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        let len = self.src.as_bytes()[start..]
            .iter()
            .take_while(|&&b| b.is_ascii() && pred(b))
            .count();
        self.pos += len;
        &self.src[start..self.pos]
    }

    /// Consume a decimal separator (`.` or `,`) only if a digit follows it.
    pub(crate) fn decimal_separator(&mut self) -> Option<u8> {
        let sep = self.peek().filter(|&b| matches!(b, b'.' | b','))?;
        if !self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            return None;
        }
        self.pos += 1;
        Some(sep)
    }
}

/// Byte offsets of every occurrence of `needle` in `haystack`, in order.
pub(crate) fn positions_of(haystack: &str, needle: u8) -> impl Iterator<Item = usize> + '_ {
    haystack
        .bytes()
        .enumerate()
        .filter(move |&(_, b)| b == needle)
        .map(|(i, _)| i)
}

/// Parse a digit run captured by the scanner.
pub(crate) fn digits_value(digits: &str) -> f64 {
    digits
        .bytes()
        .fold(0.0, |acc, b| acc * 10.0 + f64::from(b - b'0'))
}
