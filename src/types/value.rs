/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The dynamically-typed [`Value`] stored in contract-scoped app state and passed as transaction
//! arguments.
//!
//! Contract functions executed by the external execution engine take heterogeneous arguments and
//! write heterogeneous state. Rather than statically typing every contract's shapes, both are
//! carried as `Value`s. Code inside this crate that needs typed data (e.g., governance proposals)
//! converts from and to `Value` at its boundary.

use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    io::{self, Read, Write},
};

use borsh::{BorshDeserialize, BorshSerialize};

/// How deeply lists and maps may be nested in a deserialized `Value`.
pub const MAX_NESTING: usize = 32;

/// A dynamically-typed value.
///
/// Maps are ordered by key, so that the Borsh serialization of a `Value` (and therefore any hash
/// computed over it) is deterministic. The serialization is a one-byte tag (the index of the
/// variant) followed by the Borsh serialization of the variant's content.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i128),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty `Value::Map`.
    pub fn map() -> Value {
        Value::Map(BTreeMap::new())
    }

    /// Insert `value` under `key` if this is a `Value::Map`, returning self for chaining. On any other
    /// variant, this is a no-op.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Value {
        if let Value::Map(map) = &mut self {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Get the value stored under `key` if this is a `Value::Map`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get this value as a `u64`, if it is a `Value::Int` in the range of `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_int().and_then(|i| u64::try_from(i).ok())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Render this value the way it should appear in an event attribute: strings verbatim, everything
    /// else as JSON.
    pub fn render(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_STR: u8 = 3;
const TAG_LIST: u8 = 4;
const TAG_MAP: u8 = 5;

impl BorshSerialize for Value {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Value::Null => TAG_NULL.serialize(writer),
            Value::Bool(b) => {
                TAG_BOOL.serialize(writer)?;
                b.serialize(writer)
            }
            Value::Int(i) => {
                TAG_INT.serialize(writer)?;
                i.serialize(writer)
            }
            Value::Str(s) => {
                TAG_STR.serialize(writer)?;
                s.serialize(writer)
            }
            Value::List(list) => {
                TAG_LIST.serialize(writer)?;
                (list.len() as u32).serialize(writer)?;
                for item in list {
                    item.serialize(writer)?;
                }
                Ok(())
            }
            Value::Map(map) => {
                TAG_MAP.serialize(writer)?;
                (map.len() as u32).serialize(writer)?;
                for (key, value) in map {
                    key.serialize(writer)?;
                    value.serialize(writer)?;
                }
                Ok(())
            }
        }
    }
}

impl BorshDeserialize for Value {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        Value::read_nested(reader, 0)
    }
}

impl Value {
    fn read_nested<R: Read>(reader: &mut R, depth: usize) -> io::Result<Value> {
        if depth > MAX_NESTING {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Value nested too deeply",
            ));
        }
        match u8::deserialize_reader(reader)? {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOL => Ok(Value::Bool(bool::deserialize_reader(reader)?)),
            TAG_INT => Ok(Value::Int(i128::deserialize_reader(reader)?)),
            TAG_STR => Ok(Value::Str(String::deserialize_reader(reader)?)),
            TAG_LIST => {
                let len = u32::deserialize_reader(reader)?;
                // Not preallocated: `len` is untrusted.
                let mut list = Vec::new();
                for _ in 0..len {
                    list.push(Value::read_nested(reader, depth + 1)?);
                }
                Ok(Value::List(list))
            }
            TAG_MAP => {
                let len = u32::deserialize_reader(reader)?;
                let mut map = BTreeMap::new();
                for _ in 0..len {
                    let key = String::deserialize_reader(reader)?;
                    let value = Value::read_nested(reader, depth + 1)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            tag => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown Value tag {}", tag),
            )),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Int(i as i128)
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(list: Vec<T>) -> Self {
        Value::List(list.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Value::Null, Into::into)
    }
}

/// Keyword arguments of a contract function call.
pub type Kwargs = BTreeMap<String, Value>;
