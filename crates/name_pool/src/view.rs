//! Narrow and wide string views.
//!
//! Names are stored either as pure-ASCII bytes (narrow) or as UTF-16 code
//! units (wide). [`NameView`] borrows one of the two forms, [`NameBuf`] owns
//! one. Conversions between the widths are explicit.

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt::{self, Write as _};

/// Size of a name buffer in code units, including room for a terminator.
pub const NAME_SIZE: usize = 1024;

/// Longest name, in code units, the pool will store.
pub const MAX_NAME_LEN: usize = NAME_SIZE - 1;

/// Case sensitivity of a hash or comparison.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Case {
    Ignore,
    Sensitive,
}

/// Borrowed view of a name in its stored width.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum NameView<'a> {
    /// Pure-ASCII bytes.
    Narrow(&'a [u8]),
    /// UTF-16 code units.
    Wide(&'a [u16]),
}

impl<'a> NameView<'a> {
    /// Length in code units.
    #[inline]
    pub fn len(self) -> usize {
        match self {
            NameView::Narrow(bytes) => bytes.len(),
            NameView::Wide(units) => units.len(),
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_wide(self) -> bool {
        matches!(self, NameView::Wide(_))
    }

    /// Payload size in bytes.
    #[inline]
    pub fn byte_len(self) -> usize {
        match self {
            NameView::Narrow(bytes) => bytes.len(),
            NameView::Wide(units) => units.len() * 2,
        }
    }

    /// Code unit at `index`, widened to 16 bits.
    #[inline]
    pub fn unit(self, index: usize) -> u16 {
        match self {
            NameView::Narrow(bytes) => u16::from(bytes[index]),
            NameView::Wide(units) => units[index],
        }
    }

    /// The first `len` code units.
    #[inline]
    pub fn prefix(self, len: usize) -> NameView<'a> {
        match self {
            NameView::Narrow(bytes) => NameView::Narrow(&bytes[..len]),
            NameView::Wide(units) => NameView::Wide(&units[..len]),
        }
    }

    /// Iterator over the code units, narrow bytes widened.
    pub fn units(self) -> Units<'a> {
        Units {
            view: self,
            pos: 0,
        }
    }

    /// True when every code unit is below 0x80.
    pub fn is_pure_ansi(self) -> bool {
        match self {
            NameView::Narrow(bytes) => bytes.is_ascii(),
            NameView::Wide(units) => units.iter().fold(0u16, |bits, &unit| bits | unit) < 0x80,
        }
    }

    /// Appends the payload in its stored byte order (UTF-16LE for wide).
    pub(crate) fn extend_payload(self, out: &mut SmallVec<[u8; 256]>) {
        match self {
            NameView::Narrow(bytes) => out.extend_from_slice(bytes),
            NameView::Wide(units) => {
                for unit in units {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
        }
    }

    pub fn to_buf(self) -> NameBuf {
        match self {
            NameView::Narrow(bytes) => NameBuf::Narrow(SmallVec::from_slice(bytes)),
            NameView::Wide(units) => NameBuf::Wide(SmallVec::from_slice(units)),
        }
    }

    /// Converts a pure-ANSI wide view to narrow; other views are copied as-is.
    pub fn to_narrowest(self) -> NameBuf {
        match self {
            NameView::Wide(units) if self.is_pure_ansi() => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "pure ANSI code units are below 0x80"
                )]
                let bytes = units.iter().map(|&unit| unit as u8).collect();
                NameBuf::Narrow(bytes)
            }
            _ => self.to_buf(),
        }
    }
}

impl fmt::Display for NameView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NameView::Narrow(bytes) => bytes
                .iter()
                .try_for_each(|&byte| f.write_char(char::from(byte))),
            NameView::Wide(units) => char::decode_utf16(units.iter().copied())
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .try_for_each(|c| f.write_char(c)),
        }
    }
}

impl fmt::Debug for NameView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = if self.is_wide() { "Wide" } else { "Narrow" };
        write!(f, "{width}(\"{self}\")")
    }
}

/// Code units of a [`NameView`].
#[derive(Clone)]
pub struct Units<'a> {
    view: NameView<'a>,
    pos: usize,
}

impl Iterator for Units<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.pos < self.view.len() {
            let unit = self.view.unit(self.pos);
            self.pos += 1;
            Some(unit)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Units<'_> {}

/// Owned name in its stored width.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum NameBuf {
    Narrow(SmallVec<[u8; 64]>),
    Wide(SmallVec<[u16; 32]>),
}

/// Narrow for pure-ASCII strings, UTF-16 otherwise.
impl From<&str> for NameBuf {
    fn from(s: &str) -> Self {
        if s.is_ascii() {
            NameBuf::Narrow(SmallVec::from_slice(s.as_bytes()))
        } else {
            NameBuf::Wide(s.encode_utf16().collect())
        }
    }
}

impl NameBuf {
    #[inline]
    pub fn as_view(&self) -> NameView<'_> {
        match self {
            NameBuf::Narrow(bytes) => NameView::Narrow(bytes),
            NameBuf::Wide(units) => NameView::Wide(units),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_view().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_wide(&self) -> bool {
        matches!(self, NameBuf::Wide(_))
    }
}

impl fmt::Display for NameBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_view(), f)
    }
}

impl fmt::Debug for NameBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}

/// Calls `f` with the stored-width view of `s` without allocating for ASCII.
pub fn with_str_view<R>(s: &str, f: impl FnOnce(NameView<'_>) -> R) -> R {
    if s.is_ascii() {
        f(NameView::Narrow(s.as_bytes()))
    } else {
        let units: SmallVec<[u16; 128]> = s.encode_utf16().collect();
        f(NameView::Wide(&units))
    }
}

#[inline]
pub(crate) fn fold_narrow(byte: u8) -> u8 {
    byte.to_ascii_lowercase()
}

/// Lower-cases one UTF-16 code unit. Surrogates and characters whose lower
/// case is not a single BMP character are left unchanged.
pub(crate) fn fold_wide(unit: u16) -> u16 {
    if unit < 0x80 {
        #[expect(clippy::cast_possible_truncation, reason = "checked below 0x80")]
        return u16::from(fold_narrow(unit as u8));
    }
    let Some(c) = char::from_u32(u32::from(unit)) else {
        return unit;
    };
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => u16::try_from(u32::from(single)).unwrap_or(unit),
        _ => unit,
    }
}

/// Equality of two views with identical width and length.
pub(crate) fn equals_same_dims(a: NameView<'_>, b: NameView<'_>, case: Case) -> bool {
    match (a, b, case) {
        (NameView::Narrow(x), NameView::Narrow(y), Case::Sensitive) => x == y,
        (NameView::Narrow(x), NameView::Narrow(y), Case::Ignore) => x.eq_ignore_ascii_case(y),
        (NameView::Wide(x), NameView::Wide(y), Case::Sensitive) => x == y,
        (NameView::Wide(x), NameView::Wide(y), Case::Ignore) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|(&l, &r)| l == r || fold_wide(l) == fold_wide(r))
        }
        _ => false,
    }
}

/// Case-insensitive lexical ordering. A narrow side is widened when the
/// widths differ; a shorter common prefix sorts first.
pub(crate) fn compare_ignore_case(a: NameView<'_>, b: NameView<'_>) -> Ordering {
    for (l, r) in a.units().zip(b.units()) {
        let (l, r) = (fold_wide(l), fold_wide(r));
        if l != r {
            return l.cmp(&r);
        }
    }
    a.len().cmp(&b.len())
}
