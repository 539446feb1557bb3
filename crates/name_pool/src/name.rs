//! `Name` handles: an interned string plus an optional number suffix.
//!
//! `Actor_12` is stored as the string `Actor` with number 12, so numbered
//! variants of one base share a single pool entry.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::entry::NameEntryId;
use crate::error::NameError;
use crate::pool::NamePool;
use crate::view::{compare_ignore_case, fold_wide, with_str_view, NameView};
use crate::well_known::WellKnownName;

/// Internal number meaning "no suffix".
pub const NAME_NO_NUMBER: u32 = 0;

/// Internal numbers are the external suffix plus one.
#[inline]
pub const fn name_external_to_internal(external: u32) -> u32 {
    external + 1
}

/// Inverse of [`name_external_to_internal`]. [`NAME_NO_NUMBER`] has no
/// external form and yields `None`.
#[inline]
pub const fn name_internal_to_external(internal: u32) -> Option<u32> {
    internal.checked_sub(1)
}

const MAX_SUFFIX_DIGITS: usize = 10;

/// How [`NamePool::intern`] treats names that are not in the pool yet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FindName {
    /// Only look up; misses yield [`Name::NONE`].
    Find,
    /// Look up and create on miss.
    #[default]
    Add,
    /// Like `Add`, then overwrite the stored casing of the existing entry.
    /// Concurrent readers may observe torn casing.
    ReplaceNotSafeForThreading,
}

/// Interned name with a number suffix.
///
/// Equality and hashing use the comparison entry and the number, so names
/// differing only in casing are equal.
#[derive(Copy, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Name {
    comparison: NameEntryId,
    display: NameEntryId,
    number: u32,
}

impl Name {
    /// The reserved `None` name.
    pub const NONE: Name = Name {
        comparison: NameEntryId::NONE,
        display: NameEntryId::NONE,
        number: NAME_NO_NUMBER,
    };

    #[inline]
    pub(crate) const fn new(comparison: NameEntryId, display: NameEntryId, number: u32) -> Self {
        Name {
            comparison,
            display,
            number,
        }
    }

    #[inline]
    pub const fn comparison_id(self) -> NameEntryId {
        self.comparison
    }

    /// Entry holding the casing this name was created with.
    #[inline]
    pub const fn display_id(self) -> NameEntryId {
        self.display
    }

    /// Internal number; [`NAME_NO_NUMBER`] when there is no suffix.
    #[inline]
    pub const fn number(self) -> u32 {
        self.number
    }

    /// The suffix as written in text.
    #[inline]
    pub const fn external_number(self) -> Option<u32> {
        name_internal_to_external(self.number)
    }

    #[inline]
    #[must_use]
    pub const fn with_number(self, number: u32) -> Self {
        Name { number, ..self }
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.comparison.is_none() && self.number == NAME_NO_NUMBER
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.comparison == other.comparison && self.number == other.number
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.comparison.hash(state);
        self.number.hash(state);
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({}", self.comparison.to_unstable_int())?;
        if self.display != self.comparison {
            write!(f, ", display={}", self.display.to_unstable_int())?;
        }
        if let Some(number) = self.external_number() {
            write!(f, ", #{number}")?;
        }
        f.write_str(")")
    }
}

/// Splits a trailing `_<digits>` suffix.
///
/// Returns the length of the base and the internal number. The suffix is
/// kept as part of the base when it has more than ten digits, a leading
/// zero followed by more digits, no base before the underscore, or a value
/// of at least `i32::MAX`.
pub fn split_number(view: NameView<'_>) -> (usize, u32) {
    let len = view.len();
    let is_digit = |unit: u16| (u16::from(b'0')..=u16::from(b'9')).contains(&unit);

    let mut digits = 0;
    while digits < len && is_digit(view.unit(len - 1 - digits)) {
        digits += 1;
    }

    if digits == 0
        || digits >= len
        || digits > MAX_SUFFIX_DIGITS
        || view.unit(len - digits - 1) != u16::from(b'_')
    {
        return (len, NAME_NO_NUMBER);
    }

    let first_digit = len - digits;
    if digits > 1 && view.unit(first_digit) == u16::from(b'0') {
        return (len, NAME_NO_NUMBER);
    }

    let number = (first_digit..len).fold(0i64, |acc, index| {
        acc * 10 + i64::from(view.unit(index) - u16::from(b'0'))
    });
    match u32::try_from(number) {
        Ok(number) if i64::from(number) < i64::from(i32::MAX) => {
            (first_digit - 1, name_external_to_internal(number))
        }
        _ => (len, NAME_NO_NUMBER),
    }
}

impl NamePool {
    /// Interns `s`, splitting off a number suffix.
    ///
    /// # Panics
    /// Panics if the name is longer than the configured maximum. Use
    /// [`NamePool::try_intern`] to handle that case.
    pub fn intern(&self, s: &str, mode: FindName) -> Name {
        self.try_intern(s, mode).unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn try_intern(&self, s: &str, mode: FindName) -> Result<Name, NameError> {
        with_str_view(s, |view| self.try_intern_view(view, mode))
    }

    /// Interns `s` as-is with an explicit internal number.
    ///
    /// # Panics
    /// Panics if the name is longer than the configured maximum.
    pub fn intern_with_number(&self, s: &str, number: u32, mode: FindName) -> Name {
        self.try_intern_with_number(s, number, mode)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn try_intern_with_number(
        &self,
        s: &str,
        number: u32,
        mode: FindName,
    ) -> Result<Name, NameError> {
        with_str_view(s, |view| self.make(view, mode, number))
    }

    /// # Panics
    /// Panics if the name is longer than the configured maximum.
    pub fn intern_view(&self, view: NameView<'_>, mode: FindName) -> Name {
        self.try_intern_view(view, mode)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn try_intern_view(&self, view: NameView<'_>, mode: FindName) -> Result<Name, NameError> {
        let (len, number) = split_number(view);
        self.make(view.prefix(len), mode, number)
    }

    /// Looks `s` up without creating anything.
    pub fn find_name(&self, s: &str) -> Option<Name> {
        with_str_view(s, |view| {
            let (len, number) = split_number(view);
            let base = view.prefix(len);
            if base.is_empty() {
                return Some(Name::NONE);
            }
            if base.len() > self.config().max_name_len {
                return None;
            }
            let display = self.find(base)?;
            Some(Name::new(self.comparison_id_of(display), display, number))
        })
    }

    fn make(&self, view: NameView<'_>, mode: FindName, number: u32) -> Result<Name, NameError> {
        let max = self.config().max_name_len;
        if view.len() > max {
            return Err(NameError::TooLong {
                len: view.len(),
                max,
            });
        }
        if view.is_empty() {
            return Ok(Name::NONE);
        }

        let display = match mode {
            FindName::Add => self.store(view),
            FindName::Find => match self.find(view) {
                Some(id) => id,
                None => return Ok(Name::NONE),
            },
            FindName::ReplaceNotSafeForThreading => self.store_replacing(view),
        };
        Ok(Name::new(self.comparison_id_of(display), display, number))
    }

    /// The reserved name as a `Name`.
    pub fn well_known(&self, name: WellKnownName) -> Name {
        let display = self.well_known_id(name);
        Name::new(self.comparison_id_of(display), display, NAME_NO_NUMBER)
    }

    /// The reserved name `name` refers to, if it has no number.
    pub fn to_well_known(&self, name: Name) -> Option<WellKnownName> {
        if name.number != NAME_NO_NUMBER {
            return None;
        }
        self.find_well_known(name.comparison)
    }

    /// Display string without the number suffix.
    pub fn plain_name(&self, name: Name) -> String {
        self.resolve(name.display).to_string()
    }

    /// Display string with the number suffix, e.g. `Actor_3`.
    pub fn name_to_string(&self, name: Name) -> String {
        let mut out = self.plain_name(name);
        if let Some(number) = name.external_number() {
            out.push('_');
            out.push_str(&number.to_string());
        }
        out
    }

    /// Case-insensitive equality of `name` (with suffix) and `s`. The empty
    /// string equals only [`Name::NONE`].
    pub fn name_eq_str(&self, name: Name, s: &str) -> bool {
        if s.is_empty() {
            return name.is_none();
        }
        let mut expected = self.resolve(name.comparison).to_string();
        if let Some(number) = name.external_number() {
            expected.push('_');
            expected.push_str(&number.to_string());
        }
        let mut lhs = expected.encode_utf16();
        let mut rhs = s.encode_utf16();
        loop {
            match (lhs.next(), rhs.next()) {
                (None, None) => return true,
                (Some(l), Some(r)) if l == r || fold_wide(l) == fold_wide(r) => {}
                _ => return false,
            }
        }
    }

    /// Orders names case-insensitively by string, then by number.
    pub fn compare(&self, a: Name, b: Name) -> Ordering {
        if a.comparison == b.comparison {
            a.number.cmp(&b.number)
        } else {
            self.compare_ids(a.comparison, b.comparison)
        }
    }

    /// Case-insensitive lexical order of two entries. A narrow entry is
    /// widened when compared with a wide one.
    pub fn compare_ids(&self, a: NameEntryId, b: NameEntryId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (a, b) = (self.resolve(a), self.resolve(b));
        compare_ignore_case(a.view(), b.view())
    }
}
