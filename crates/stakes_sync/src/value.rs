//! Typed ledger values and their consensus binary encoding.
//!
//! Read-only calls exchange values as `0x`-prefixed hex of the binary form:
//! a one-byte type prefix followed by the payload. Integers are 16-byte
//! big-endian, lengths are 4-byte big-endian, tuple keys are sorted.

use derive_more::{Display, Error};
use stakes_ledger::Identity;
use std::collections::BTreeMap;
use tracing::instrument;

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_STANDARD_PRINCIPAL: u8 = 0x05;
const TYPE_CONTRACT_PRINCIPAL: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_OPTIONAL_NONE: u8 = 0x09;
const TYPE_OPTIONAL_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

/// Deepest nesting accepted when decoding untrusted bytes.
pub const MAX_DEPTH: usize = 32;

/// Error decoding or interpreting a ledger value.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum CodecError {
    /// Input ended in the middle of a value.
    #[display("Unexpected end of input")]
    UnexpectedEnd,
    /// Unknown type prefix byte.
    #[display("Unknown type prefix 0x{_0:02x}")]
    UnknownType(#[error(not(source))] u8),
    /// Bytes left over after a complete value.
    #[display("{_0} trailing bytes after value")]
    TrailingBytes(#[error(not(source))] usize),
    /// Nesting deeper than [`MAX_DEPTH`].
    #[display("Value nested deeper than {}", MAX_DEPTH)]
    TooDeep,
    /// Hex text could not be decoded.
    #[display("Invalid hex: {_0}")]
    InvalidHex(#[error(not(source))] String),
    /// A string payload was not valid text.
    #[display("Invalid string payload")]
    InvalidString,
    /// A principal could not be rebuilt.
    #[display("Invalid principal: {_0}")]
    InvalidPrincipal(#[error(not(source))] String),
    /// Value had a different type than the reader expected.
    #[display("Expected {expected}, found {found}")]
    UnexpectedType {
        /// What the reader wanted.
        expected: &'static str,
        /// What the value was.
        found: &'static str,
    },
    /// A tuple lacked a required key.
    #[display("Missing tuple field '{_0}'")]
    MissingField(#[error(not(source))] &'static str),
    /// A board list was not nine cells long.
    #[display("Board has {_0} cells, expected 9")]
    BoardLength(#[error(not(source))] usize),
    /// A board cell held an unknown code.
    #[display("Invalid board cell code {_0}")]
    InvalidCell(#[error(not(source))] u128),
    /// An `(err uN)` code the contract does not define.
    #[display("Unknown contract error code u{_0}")]
    UnknownErrorCode(#[error(not(source))] u128),
    /// A status string outside the known lifecycle names.
    #[display("Unknown game status '{_0}'")]
    UnknownStatus(#[error(not(source))] String),
    /// `is-draw` disagreed with the status string.
    #[display("Draw flag disagrees with status '{_0}'")]
    InconsistentStatus(#[error(not(source))] stakes_ledger::GameStatus),
    /// A contract call carried the wrong number of arguments.
    #[display("Expected 3 arguments, found {_0}")]
    ArgumentCount(#[error(not(source))] usize),
    /// A payload named a function the contract does not export.
    #[display("Unknown contract function '{_0}'")]
    UnknownFunction(#[error(not(source))] String),
    /// A payload longer than the wire length field allows.
    #[display("Payload of {_0} bytes is too long to encode")]
    TooLong(#[error(not(source))] usize),
}

/// A typed value as exchanged with the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    /// Signed 128-bit integer.
    Int(i128),
    /// Unsigned 128-bit integer.
    UInt(u128),
    /// Raw bytes.
    Buffer(Vec<u8>),
    /// Boolean.
    Bool(bool),
    /// Account or contract principal.
    Principal(Identity),
    /// `(ok value)`
    ResponseOk(Box<ClarityValue>),
    /// `(err value)`
    ResponseErr(Box<ClarityValue>),
    /// `none`
    OptionalNone,
    /// `(some value)`
    OptionalSome(Box<ClarityValue>),
    /// Homogeneous list.
    List(Vec<ClarityValue>),
    /// Named fields, kept sorted by key.
    Tuple(BTreeMap<String, ClarityValue>),
    /// ASCII string.
    StringAscii(String),
    /// UTF-8 string.
    StringUtf8(String),
}

impl ClarityValue {
    /// Wraps a value in `some`.
    pub fn some(value: ClarityValue) -> Self {
        Self::OptionalSome(Box::new(value))
    }

    /// Wraps a value in `ok`.
    pub fn ok(value: ClarityValue) -> Self {
        Self::ResponseOk(Box::new(value))
    }

    /// Wraps a value in `err`.
    pub fn err(value: ClarityValue) -> Self {
        Self::ResponseErr(Box::new(value))
    }

    /// `some(principal)` or `none`.
    pub fn optional_principal(who: Option<&Identity>) -> Self {
        match who {
            Some(who) => Self::some(Self::Principal(who.clone())),
            None => Self::OptionalNone,
        }
    }

    /// Builds a tuple from key/value pairs.
    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, ClarityValue)>) -> Self {
        Self::Tuple(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Buffer(_) => "buffer",
            Self::Bool(_) => "bool",
            Self::Principal(_) => "principal",
            Self::ResponseOk(_) => "response-ok",
            Self::ResponseErr(_) => "response-err",
            Self::OptionalNone => "none",
            Self::OptionalSome(_) => "some",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::StringAscii(_) => "string-ascii",
            Self::StringUtf8(_) => "string-utf8",
        }
    }

    fn unexpected(&self, expected: &'static str) -> CodecError {
        CodecError::UnexpectedType {
            expected,
            found: self.type_name(),
        }
    }

    /// Reads a `uint`.
    pub fn as_uint(&self) -> Result<u128, CodecError> {
        match self {
            Self::UInt(n) => Ok(*n),
            other => Err(other.unexpected("uint")),
        }
    }

    /// Reads a `bool`.
    pub fn as_bool(&self) -> Result<bool, CodecError> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.unexpected("bool")),
        }
    }

    /// Reads a principal.
    pub fn as_principal(&self) -> Result<&Identity, CodecError> {
        match self {
            Self::Principal(who) => Ok(who),
            other => Err(other.unexpected("principal")),
        }
    }

    /// Reads either string flavor.
    pub fn as_str(&self) -> Result<&str, CodecError> {
        match self {
            Self::StringAscii(s) | Self::StringUtf8(s) => Ok(s),
            other => Err(other.unexpected("string")),
        }
    }

    /// Reads a list.
    pub fn as_list(&self) -> Result<&[ClarityValue], CodecError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.unexpected("list")),
        }
    }

    /// Reads a tuple.
    pub fn as_tuple(&self) -> Result<&BTreeMap<String, ClarityValue>, CodecError> {
        match self {
            Self::Tuple(fields) => Ok(fields),
            other => Err(other.unexpected("tuple")),
        }
    }

    /// Reads an optional: `Ok(None)` for `none`, the inner value for `some`.
    pub fn as_optional(&self) -> Result<Option<&ClarityValue>, CodecError> {
        match self {
            Self::OptionalNone => Ok(None),
            Self::OptionalSome(inner) => Ok(Some(inner)),
            other => Err(other.unexpected("optional")),
        }
    }

    /// Encodes to the consensus binary form.
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Encodes to `0x`-prefixed hex.
    pub fn to_hex(&self) -> Result<String, CodecError> {
        Ok(format!("0x{}", hex::encode(self.serialize()?)))
    }

    /// Decodes one complete value from bytes.
    #[instrument(skip(bytes), fields(len = bytes.len()))]
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader { bytes, pos: 0 };
        let value = reader.read_value(0)?;
        match bytes.len() - reader.pos {
            0 => Ok(value),
            rest => Err(CodecError::TrailingBytes(rest)),
        }
    }

    /// Decodes `0x`-prefixed (or bare) hex.
    pub fn from_hex(text: &str) -> Result<Self, CodecError> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(digits).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::Int(n) => {
                out.push(TYPE_INT);
                out.extend_from_slice(&n.to_be_bytes());
            }
            Self::UInt(n) => {
                out.push(TYPE_UINT);
                out.extend_from_slice(&n.to_be_bytes());
            }
            Self::Buffer(bytes) => {
                out.push(TYPE_BUFFER);
                write_len(out, bytes.len())?;
                out.extend_from_slice(bytes);
            }
            Self::Bool(true) => out.push(TYPE_TRUE),
            Self::Bool(false) => out.push(TYPE_FALSE),
            Self::Principal(who) => {
                match who.contract_name() {
                    None => out.push(TYPE_STANDARD_PRINCIPAL),
                    Some(_) => out.push(TYPE_CONTRACT_PRINCIPAL),
                }
                out.push(who.version());
                out.extend_from_slice(who.hash160());
                if let Some(name) = who.contract_name() {
                    let len = u8::try_from(name.len())
                        .map_err(|_| CodecError::TooLong(name.len()))?;
                    out.push(len);
                    out.extend_from_slice(name.as_bytes());
                }
            }
            Self::ResponseOk(inner) => {
                out.push(TYPE_RESPONSE_OK);
                inner.write_to(out)?;
            }
            Self::ResponseErr(inner) => {
                out.push(TYPE_RESPONSE_ERR);
                inner.write_to(out)?;
            }
            Self::OptionalNone => out.push(TYPE_OPTIONAL_NONE),
            Self::OptionalSome(inner) => {
                out.push(TYPE_OPTIONAL_SOME);
                inner.write_to(out)?;
            }
            Self::List(items) => {
                out.push(TYPE_LIST);
                write_len(out, items.len())?;
                for item in items {
                    item.write_to(out)?;
                }
            }
            Self::Tuple(fields) => {
                out.push(TYPE_TUPLE);
                write_len(out, fields.len())?;
                for (key, value) in fields {
                    let len =
                        u8::try_from(key.len()).map_err(|_| CodecError::TooLong(key.len()))?;
                    out.push(len);
                    out.extend_from_slice(key.as_bytes());
                    value.write_to(out)?;
                }
            }
            Self::StringAscii(text) => {
                if !text.is_ascii() {
                    return Err(CodecError::InvalidString);
                }
                out.push(TYPE_STRING_ASCII);
                write_len(out, text.len())?;
                out.extend_from_slice(text.as_bytes());
            }
            Self::StringUtf8(text) => {
                out.push(TYPE_STRING_UTF8);
                write_len(out, text.len())?;
                out.extend_from_slice(text.as_bytes());
            }
        }
        Ok(())
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::TooLong(len))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEnd)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(CodecError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn len(&mut self) -> Result<usize, CodecError> {
        let len = u32::from_be_bytes(self.take_array()?);
        Ok(len as usize)
    }

    fn text(&mut self, len: usize) -> Result<String, CodecError> {
        String::from_utf8(self.take(len)?.to_vec()).map_err(|_| CodecError::InvalidString)
    }

    fn principal(&mut self, with_name: bool) -> Result<Identity, CodecError> {
        let version = self.byte()?;
        let hash = self.take_array::<20>()?;
        let who = Identity::standard(version, hash)
            .map_err(|e| CodecError::InvalidPrincipal(e.to_string()))?;
        if !with_name {
            return Ok(who);
        }
        let len = self.byte()? as usize;
        let name = self.text(len)?;
        who.with_contract(name)
            .map_err(|e| CodecError::InvalidPrincipal(e.to_string()))
    }

    fn read_value(&mut self, depth: usize) -> Result<ClarityValue, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep);
        }
        let value = match self.byte()? {
            TYPE_INT => ClarityValue::Int(i128::from_be_bytes(self.take_array()?)),
            TYPE_UINT => ClarityValue::UInt(u128::from_be_bytes(self.take_array()?)),
            TYPE_BUFFER => {
                let len = self.len()?;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            TYPE_TRUE => ClarityValue::Bool(true),
            TYPE_FALSE => ClarityValue::Bool(false),
            TYPE_STANDARD_PRINCIPAL => ClarityValue::Principal(self.principal(false)?),
            TYPE_CONTRACT_PRINCIPAL => ClarityValue::Principal(self.principal(true)?),
            TYPE_RESPONSE_OK => ClarityValue::ok(self.read_value(depth + 1)?),
            TYPE_RESPONSE_ERR => ClarityValue::err(self.read_value(depth + 1)?),
            TYPE_OPTIONAL_NONE => ClarityValue::OptionalNone,
            TYPE_OPTIONAL_SOME => ClarityValue::some(self.read_value(depth + 1)?),
            TYPE_LIST => {
                let count = self.len()?;
                // Each item is at least one byte; reject counts the input cannot hold.
                if count > self.bytes.len() - self.pos {
                    return Err(CodecError::UnexpectedEnd);
                }
                let items = (0..count)
                    .map(|_| self.read_value(depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                ClarityValue::List(items)
            }
            TYPE_TUPLE => {
                let count = self.len()?;
                if count > self.bytes.len() - self.pos {
                    return Err(CodecError::UnexpectedEnd);
                }
                let mut fields = BTreeMap::new();
                for _ in 0..count {
                    let key_len = self.byte()? as usize;
                    let key = self.text(key_len)?;
                    let value = self.read_value(depth + 1)?;
                    fields.insert(key, value);
                }
                ClarityValue::Tuple(fields)
            }
            TYPE_STRING_ASCII => {
                let len = self.len()?;
                let text = self.text(len)?;
                if !text.is_ascii() {
                    return Err(CodecError::InvalidString);
                }
                ClarityValue::StringAscii(text)
            }
            TYPE_STRING_UTF8 => {
                let len = self.len()?;
                ClarityValue::StringUtf8(self.text(len)?)
            }
            other => return Err(CodecError::UnknownType(other)),
        };
        Ok(value)
    }
}
