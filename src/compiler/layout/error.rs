use crate::compiler::{CompilerDisplay, CompilerDisplayError, ErrorKind, SourceMap, StringId, StringTable};

/// Errors found while laying out types.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutError {
    Undefined(StringId),
    NotAType(StringId),

    /// A type declared as another declared type rather than as `uint<N>`.
    UnknownType(StringId),

    RangeOutsideBitfield,
    RangeReversed { hi: u64, lo: u64 },

    /// A bitfield wider than the register it is packed into.
    TooLarge { size: u64, limit: u64 },

    /// A `[N]{...}` bitfield whose fields need more than `N` bits.
    TooWide { size: u64, width: u64 },

    RegisterWidth(u64),
    Misaligned { field: String, offset: u64 },
    SizeNotBytes(u64),
    Overlap(String),
    DuplicateDefault,
    Cycle(String),
    Unsupported(&'static str),
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        use LayoutError::*;
        match self {
            Undefined(_) | NotAType(_) | UnknownType(_) => ErrorKind::UndefinedIdentifier,
            RangeOutsideBitfield | RangeReversed { .. } => ErrorKind::BitRange,
            TooLarge { .. } | TooWide { .. } | RegisterWidth(_) => ErrorKind::SizeOverflow,
            Misaligned { .. } | SizeNotBytes(_) | Overlap(_) => ErrorKind::Alignment,
            DuplicateDefault => ErrorKind::RedeclaredIdentifier,
            Cycle(_) => ErrorKind::Cycle,
            Unsupported(_) => ErrorKind::UnsupportedConstruct,
        }
    }
}

impl CompilerDisplay for LayoutError {
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        use LayoutError::*;
        let msg = match self {
            Undefined(sid) => format!("undefined: {}", sid.fmt(sm, st)?),
            NotAType(sid) => format!("{} is not a type", sid.fmt(sm, st)?),
            UnknownType(sid) => format!("unknown type {}", sid.fmt(sm, st)?),
            RangeOutsideBitfield => "[hi:lo] not in bitfield".into(),
            RangeReversed { hi, lo } => format!("hi < lo in bit range [{}:{}]", hi, lo),
            TooLarge { size, limit } => {
                format!("size {} larger than reg size {}", size, limit)
            }
            TooWide { size, width } => {
                format!("size {} larger than declared width {}", size, width)
            }
            RegisterWidth(size) => {
                format!("register size {} is not 8, 16, 32 or 64", size)
            }
            Misaligned { field, offset } => {
                format!("field {} at bit {} is not byte aligned", field, offset)
            }
            SizeNotBytes(size) => format!("struct size of {} bits is not a whole number of bytes", size),
            Overlap(field) => format!("field {} overlaps the previous field", field),
            DuplicateDefault => "default type redeclared".into(),
            Cycle(name) => format!("cycle in type reference {}", name),
            Unsupported(what) => format!("internal error: unsupported construct: {}", what),
        };
        Ok(msg)
    }
}
