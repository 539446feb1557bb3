//! Reserved names registered by every pool at construction.
//!
//! Looking one up is a direct array index; no hashing is involved.

/// Defines [`WellKnownName`] from a list of identifiers.
///
/// The generated enum has:
/// - one variant per name, in declaration order, `#[repr(u16)]`
/// - `ALL` and `STRINGS` tables in the same order
/// - `as_str()`, `index()` and `from_index()`
macro_rules! define_well_known_names {
    ($($name:ident),* $(,)?) => {
        /// A name reserved by the pool, resolvable without a table lookup.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum WellKnownName {
            $($name,)*
        }

        impl WellKnownName {
            pub const ALL: &'static [WellKnownName] = &[$(WellKnownName::$name,)*];
            pub const STRINGS: &'static [&'static str] = &[$(stringify!($name),)*];
            pub const COUNT: usize = Self::ALL.len();

            #[inline]
            pub const fn as_str(self) -> &'static str {
                Self::STRINGS[self as usize]
            }

            #[inline]
            pub const fn index(self) -> usize {
                self as usize
            }

            #[inline]
            pub fn from_index(index: usize) -> Option<Self> {
                Self::ALL.get(index).copied()
            }
        }

        impl ::std::fmt::Display for WellKnownName {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// `None` must stay first so it receives entry id 0.
define_well_known_names!(
    // Property types
    None,
    ByteProperty,
    IntProperty,
    BoolProperty,
    FloatProperty,
    DoubleProperty,
    ObjectProperty,
    ClassProperty,
    NameProperty,
    StrProperty,
    TextProperty,
    ArrayProperty,
    MapProperty,
    SetProperty,
    StructProperty,
    EnumProperty,
    // Packages
    Core,
    Engine,
    Editor,
    CoreUObject,
    // Math and core structs
    Vector,
    Vector4,
    Rotator,
    Quat,
    Transform,
    Color,
    LinearColor,
    Box,
    Sphere,
    Cylinder,
    Plane,
    Matrix,
    Guid,
    Timespan,
    DateTime,
    // Object model
    Actor,
    Object,
    Class,
    Function,
    Package,
    Default,
    Root,
    // Lifecycle
    Main,
    Game,
    Tick,
    Init,
    Exit,
    Begin,
    End,
    Loop,
    Select,
    Timer,
    // Logging
    Error,
    Warning,
    Log,
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_none_is_first() {
        assert_eq!(WellKnownName::None.index(), 0);
        assert_eq!(WellKnownName::None.as_str(), "None");
    }

    #[test]
    fn test_tables_line_up() {
        assert_eq!(WellKnownName::ALL.len(), WellKnownName::STRINGS.len());
        for (index, name) in WellKnownName::ALL.iter().enumerate() {
            assert_eq!(name.index(), index);
            assert_eq!(WellKnownName::from_index(index), Some(*name));
            assert_eq!(name.to_string(), WellKnownName::STRINGS[index]);
        }
        assert_eq!(WellKnownName::from_index(WellKnownName::COUNT), None);
    }
}
