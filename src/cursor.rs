//! Bounds-checked forward reads over an in-memory payload.
//!
//! [`Cursor`] is the sequential reader used by the triplet and control
//! sequence decoders: it hands out exactly the bytes asked for, never seeks
//! backward, and a [`Cursor::subview`] is bounded to a declared length so
//! nested decoding cannot overrun the enclosing construct.
//!
//! [`slice_at`] is the absolute, non-advancing accessor used by the syntax
//! engine, which addresses parameters by fixed offsets within one payload.
//! It distinguishes a parameter that is entirely absent from one that is
//! present but cut short, because policy treats the two differently.

use crate::error::ParseErrorKind;

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read exactly `n` bytes, or fail with `TruncatedInput` naming `what`.
    pub fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], ParseErrorKind> {
        if self.remaining() < n {
            return Err(ParseErrorKind::TruncatedInput(what));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn take_u8(&mut self, what: &'static str) -> Result<u8, ParseErrorKind> {
        Ok(self.take(1, what)?[0])
    }

    /// The next two bytes as a big-endian u16, without advancing.
    pub fn peek_u16_be(&self) -> Option<u16> {
        if self.remaining() < 2 {
            return None;
        }
        Some(u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]))
    }

    /// Everything left, without advancing.
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Consume and return everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// Consume `n` bytes and return them as a new bounded cursor.
    pub fn subview(&mut self, n: usize, what: &'static str) -> Result<Cursor<'a>, ParseErrorKind> {
        Ok(Cursor::new(self.take(n, what)?))
    }
}

/// Outcome of an absolute fixed-offset read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slice<'a> {
    /// The parameter begins at or beyond the end of the payload.
    Absent,
    /// The parameter begins inside the payload but its declared width
    /// overruns the end.
    Partial,
    Full(&'a [u8]),
}

/// Read `n` bytes at `offset`.  `n == 0` means "to the end of the payload",
/// which for an offset at the very end is `Absent`, matching how optional
/// trailing parameters behave.
pub(crate) fn slice_at(data: &[u8], offset: usize, n: usize) -> Slice<'_> {
    if offset >= data.len() {
        return Slice::Absent;
    }
    if n == 0 {
        return Slice::Full(&data[offset..]);
    }
    if offset + n > data.len() {
        return Slice::Partial;
    }
    Slice::Full(&data[offset..offset + n])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_advances_and_bounds() {
        let mut cur = Cursor::new(&[1, 2, 3, 4]);
        assert_eq!(cur.take(2, "x").unwrap(), &[1, 2]);
        assert_eq!(cur.remaining(), 2);
        assert!(matches!(
            cur.take(3, "x"),
            Err(ParseErrorKind::TruncatedInput("x"))
        ));
        // A failed take consumes nothing.
        assert_eq!(cur.take(2, "x").unwrap(), &[3, 4]);
        assert!(cur.is_empty());
    }

    #[test]
    fn subview_is_bounded() {
        let mut cur = Cursor::new(&[1, 2, 3, 4, 5]);
        let mut sub = cur.subview(3, "sub").unwrap();
        assert_eq!(sub.remaining(), 3);
        assert!(sub.take(4, "over").is_err());
        // Parent advanced past the subview regardless.
        assert_eq!(cur.remaining(), 2);
    }

    #[test]
    fn slice_at_classifies() {
        let data = [1u8, 2, 3];
        assert_eq!(slice_at(&data, 0, 2), Slice::Full(&[1, 2]));
        assert_eq!(slice_at(&data, 2, 2), Slice::Partial);
        assert_eq!(slice_at(&data, 3, 1), Slice::Absent);
        assert_eq!(slice_at(&data, 1, 0), Slice::Full(&[2, 3]));
        assert_eq!(slice_at(&data, 3, 0), Slice::Absent);
    }
}
