//! Intermediate model types — the bridge between line matching and fragment
//! emission.
//!
//! An [`Annotation`] is created for each recognized marker and handed to the
//! emitter straight away; nothing here outlives the line it came from.

use std::fmt;

/// One recognized marker instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// `EXPCONST<flag>(type NAME)`
    Const {
        flag: ConstFlag,
        ty: ConstType,
        name: String,
    },
    /// `PyFB_name(args...)`
    Func { name: String, conv: CallConv },
    /// `DECLTYPE(TypeObject, objstruct)`
    Type {
        type_name: String,
        object_name: String,
    },
    /// `LIB_DEPENDS(name)`
    LibDep { name: String },
}

impl Annotation {
    /// Short kind label used in verbose reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Annotation::Const { .. } => "Constant",
            Annotation::Func { .. } => "Function",
            Annotation::Type { .. } => "Type",
            Annotation::LibDep { .. } => "Library",
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Const { ty, name, .. } => write!(f, "{}: {} {}", self.kind(), ty, name),
            Annotation::Func { name, conv } => write!(f, "{}: {} {}", self.kind(), name, conv),
            Annotation::Type {
                type_name,
                object_name,
            } => write!(f, "{}: {} {}", self.kind(), type_name, object_name),
            Annotation::LibDep { name } => write!(f, "{}: {}", self.kind(), name),
        }
    }
}

/// Availability condition attached to a constant marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstFlag {
    /// Plain `EXPCONST` — always exported.
    Always,
    /// `EXPCONST_IFAVAIL` — exported only when the macro is defined.
    IfAvail,
    /// `EXPCONST_MIN_OSREL(rev, ...)` — exported from OS revision `rev` on.
    MinOsRel(u64),
    /// `EXPCONST_MAX_OSREL(rev, ...)` — exported below OS revision `rev`.
    MaxOsRel(u64),
}

/// C type of an exported constant, as spelled in the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstType {
    Int,
    UInt,
    Long,
    ULong,
    Double,
    Char,
    Str,
}

impl ConstType {
    /// Parse a marker type spelling. Internal whitespace is normalized, so
    /// `unsigned  int` and `char*` are accepted.
    pub fn parse(spelling: &str) -> Option<ConstType> {
        let norm = spelling
            .replace('*', " * ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Some(match norm.as_str() {
            "int" => ConstType::Int,
            "unsigned int" => ConstType::UInt,
            "long" => ConstType::Long,
            "unsigned long" => ConstType::ULong,
            "double" => ConstType::Double,
            "char" => ConstType::Char,
            "char *" => ConstType::Str,
            _ => return None,
        })
    }

    /// Suffix of the `SETDICT_*` macro that stores a value of this type.
    pub fn category(self) -> &'static str {
        match self {
            ConstType::Int => "INT",
            ConstType::UInt => "UINT",
            ConstType::Long => "LONG",
            ConstType::ULong => "ULONG",
            ConstType::Double => "DOUBLE",
            ConstType::Char => "CHAR",
            ConstType::Str => "STR",
        }
    }
}

impl fmt::Display for ConstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstType::Int => "int",
            ConstType::UInt => "unsigned int",
            ConstType::Long => "long",
            ConstType::ULong => "unsigned long",
            ConstType::Double => "double",
            ConstType::Char => "char",
            ConstType::Str => "char *",
        })
    }
}

/// Calling convention of a registered function, selected by argument count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallConv {
    NoArgs,
    VarArgs,
    Keywords,
}

impl CallConv {
    /// Map a C argument count to a calling convention.
    pub fn from_arg_count(count: usize) -> Option<CallConv> {
        match count {
            1 => Some(CallConv::NoArgs),
            2 => Some(CallConv::VarArgs),
            3 => Some(CallConv::Keywords),
            _ => None,
        }
    }

    /// The `ml_flags` spelling written into the method table.
    pub fn tag(self) -> &'static str {
        match self {
            CallConv::NoArgs => "METH_NOARGS",
            CallConv::VarArgs => "METH_VARARGS",
            CallConv::Keywords => "METH_VARARGS|METH_KEYWORDS",
        }
    }
}

impl fmt::Display for CallConv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
