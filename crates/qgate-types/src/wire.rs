use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage/serialization type code understood by the execution engine.
///
/// The discriminants are part of the C ABI and must never be renumbered.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireTypeCode {
    NullValueType = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    #[default]
    Int64 = 4,
    String = 5,
    Bool = 6,
    Float = 7,
    Double = 8,
    Binary = 9,
    Timestamp = 10,
    Decimal = 11,
    Varint = 12,
    Inet = 13,
    List = 14,
    Map = 15,
    Set = 16,
    Uuid = 17,
    Timeuuid = 18,
    Tuple = 19,
    Typeargs = 20,
    UserDefinedType = 21,
    Frozen = 22,
    Date = 23,
    Time = 24,
    Jsonb = 25,
}

impl WireTypeCode {
    pub const ALL: [WireTypeCode; 26] = [
        WireTypeCode::NullValueType,
        WireTypeCode::Int8,
        WireTypeCode::Int16,
        WireTypeCode::Int32,
        WireTypeCode::Int64,
        WireTypeCode::String,
        WireTypeCode::Bool,
        WireTypeCode::Float,
        WireTypeCode::Double,
        WireTypeCode::Binary,
        WireTypeCode::Timestamp,
        WireTypeCode::Decimal,
        WireTypeCode::Varint,
        WireTypeCode::Inet,
        WireTypeCode::List,
        WireTypeCode::Map,
        WireTypeCode::Set,
        WireTypeCode::Uuid,
        WireTypeCode::Timeuuid,
        WireTypeCode::Tuple,
        WireTypeCode::Typeargs,
        WireTypeCode::UserDefinedType,
        WireTypeCode::Frozen,
        WireTypeCode::Date,
        WireTypeCode::Time,
        WireTypeCode::Jsonb,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|w| w.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WireTypeCode::NullValueType => "null_value_type",
            WireTypeCode::Int8 => "int8",
            WireTypeCode::Int16 => "int16",
            WireTypeCode::Int32 => "int32",
            WireTypeCode::Int64 => "int64",
            WireTypeCode::String => "string",
            WireTypeCode::Bool => "bool",
            WireTypeCode::Float => "float",
            WireTypeCode::Double => "double",
            WireTypeCode::Binary => "binary",
            WireTypeCode::Timestamp => "timestamp",
            WireTypeCode::Decimal => "decimal",
            WireTypeCode::Varint => "varint",
            WireTypeCode::Inet => "inet",
            WireTypeCode::List => "list",
            WireTypeCode::Map => "map",
            WireTypeCode::Set => "set",
            WireTypeCode::Uuid => "uuid",
            WireTypeCode::Timeuuid => "timeuuid",
            WireTypeCode::Tuple => "tuple",
            WireTypeCode::Typeargs => "typeargs",
            WireTypeCode::UserDefinedType => "user_defined_type",
            WireTypeCode::Frozen => "frozen",
            WireTypeCode::Date => "date",
            WireTypeCode::Time => "time",
            WireTypeCode::Jsonb => "jsonb",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|w| w.as_str() == s)
    }
}

impl fmt::Display for WireTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
