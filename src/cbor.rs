//! Binary object codec (the CBOR subset the wire format uses).
//!
//! Values are 64-bit signed integers (negative map keys included), byte
//! strings, UTF-8 text strings, arrays, maps, semantic tags, and the
//! simple values `false`/`true`/`null`. The decoder is a cursor over the
//! input that reports the byte offset of every failure and exposes its
//! position via [`Decoder::pos`], so a caller can bracket
//! [`Decoder::decode_value`] calls and recover the exact byte range of any
//! element. The signature envelope relies on that: signed byte ranges are
//! re-used as received, never rebuilt from parsed values, because the
//! encoding is not canonical and re-encoding can silently change the
//! signed bytes.
//!
//! The encoder always emits minimal-length headers; the decoder accepts
//! non-minimal ones (they occur on the wire).

use crate::errors::HcertError;

/// Nesting cap for arrays, maps, and tags. Certificates nest a handful of
/// levels; anything deeper is hostile input.
pub const MAX_NESTING_DEPTH: u32 = 32;

/// A decoded binary object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed 64-bit integer (majors 0 and 1).
    Integer(i64),
    /// Byte string (major 2).
    Bytes(Vec<u8>),
    /// UTF-8 text string (major 3).
    Text(String),
    /// Ordered array (major 4).
    Array(Vec<Value>),
    /// Map with insertion-ordered entries (major 5). Keys are not required
    /// to be unique or sorted by the decoder; lookups take the first match.
    Map(Vec<(Value, Value)>),
    /// Semantic tag (major 6).
    Tag(u64, Box<Value>),
    /// Boolean simple value.
    Bool(bool),
    /// Null simple value.
    Null,
}

impl Value {
    /// The integer value, if this is an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The byte-string contents, if this is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The text contents, if this is a text string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The entries, if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up an integer-keyed map entry.
    #[must_use]
    pub fn map_get(&self, key: i64) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_integer() == Some(key))
            .map(|(_, v)| v)
    }

    /// Look up a text-keyed map entry.
    #[must_use]
    pub fn map_get_text(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    /// Strip one semantic tag, if present.
    #[must_use]
    pub fn untag(&self) -> &Self {
        match self {
            Self::Tag(_, inner) => inner,
            other => other,
        }
    }
}

// ——— Encoding ———————————————————————————————————————————————————————

/// Encode a value to bytes.
#[must_use]
pub fn to_vec(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_value(value, &mut out);
    out
}

/// Append the encoding of `value` to `out`.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(n) => {
            if *n >= 0 {
                encode_header(0, *n as u64, out);
            } else {
                encode_header(1, !(*n) as u64, out);
            }
        }
        Value::Bytes(bytes) => {
            encode_header(2, bytes.len() as u64, out);
            out.extend_from_slice(bytes);
        }
        Value::Text(text) => {
            encode_header(3, text.len() as u64, out);
            out.extend_from_slice(text.as_bytes());
        }
        Value::Array(items) => {
            encode_header(4, items.len() as u64, out);
            for item in items {
                encode_value(item, out);
            }
        }
        Value::Map(entries) => {
            encode_header(5, entries.len() as u64, out);
            for (key, val) in entries {
                encode_value(key, out);
                encode_value(val, out);
            }
        }
        Value::Tag(tag, inner) => {
            encode_header(6, *tag, out);
            encode_value(inner, out);
        }
        Value::Bool(b) => out.push(0xE0 | if *b { 21 } else { 20 }),
        Value::Null => out.push(0xE0 | 22),
    }
}

/// Minimal-length head: major type in the top three bits, argument in the
/// shortest additional-info form that holds it.
fn encode_header(major: u8, arg: u64, out: &mut Vec<u8>) {
    let m = major << 5;
    if arg < 24 {
        out.push(m | arg as u8);
    } else if arg <= 0xFF {
        out.push(m | 24);
        out.push(arg as u8);
    } else if arg <= 0xFFFF {
        out.push(m | 25);
        out.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg <= 0xFFFF_FFFF {
        out.push(m | 26);
        out.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        out.push(m | 27);
        out.extend_from_slice(&arg.to_be_bytes());
    }
}

// ——— Decoding ———————————————————————————————————————————————————————

/// Decode exactly one value from `bytes`, rejecting trailing input.
pub fn from_slice(bytes: &[u8]) -> Result<Value, HcertError> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode_value()?;
    if decoder.pos() != bytes.len() {
        return Err(HcertError::Parse {
            offset: decoder.pos(),
            reason: "trailing bytes after value",
        });
    }
    Ok(value)
}

/// Cursor decoder over a byte slice.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Start decoding at the beginning of `buf`.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset. Bracketing a [`Self::decode_value`] call with
    /// two `pos()` reads yields the exact byte range of that element.
    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left in the input.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Decode the value starting at the cursor, advancing past it.
    pub fn decode_value(&mut self) -> Result<Value, HcertError> {
        self.value_at_depth(0)
    }

    fn fail(&self, reason: &'static str) -> HcertError {
        HcertError::Parse {
            offset: self.pos,
            reason,
        }
    }

    fn take(&mut self, n: usize, reason: &'static str) -> Result<&'a [u8], HcertError> {
        if self.remaining() < n {
            return Err(self.fail(reason));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read an item head: `(major, additional-info, argument)`.
    fn header(&mut self) -> Result<(u8, u8, u64), HcertError> {
        let initial = self.take(1, "truncated item head")?[0];
        let major = initial >> 5;
        let info = initial & 0x1F;
        let arg = match info {
            0..=23 => u64::from(info),
            24 => u64::from(self.take(1, "truncated 1-byte argument")?[0]),
            25 => {
                let b = self.take(2, "truncated 2-byte argument")?;
                u64::from(u16::from_be_bytes([b[0], b[1]]))
            }
            26 => {
                let b = self.take(4, "truncated 4-byte argument")?;
                u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            27 => {
                let b = self.take(8, "truncated 8-byte argument")?;
                u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
            28..=30 => return Err(self.fail("reserved additional-info value")),
            _ => return Err(self.fail("indefinite lengths not supported")),
        };
        Ok((major, info, arg))
    }

    /// Argument as a length, checked against the remaining input so a
    /// declared length can never outrun the buffer (or its allocation).
    fn length(&mut self, arg: u64) -> Result<usize, HcertError> {
        let len = usize::try_from(arg).map_err(|_| self.fail("length exceeds platform"))?;
        if len > self.remaining() {
            return Err(self.fail("declared length exceeds input"));
        }
        Ok(len)
    }

    fn value_at_depth(&mut self, depth: u32) -> Result<Value, HcertError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(self.fail("nesting too deep"));
        }
        let (major, info, arg) = self.header()?;
        match major {
            0 => {
                let n = i64::try_from(arg).map_err(|_| self.fail("integer overflow"))?;
                Ok(Value::Integer(n))
            }
            1 => {
                let n = i64::try_from(arg).map_err(|_| self.fail("integer underflow"))?;
                Ok(Value::Integer(-1 - n))
            }
            2 => {
                let len = self.length(arg)?;
                let bytes = self.take(len, "truncated byte string")?;
                Ok(Value::Bytes(bytes.to_vec()))
            }
            3 => {
                let len = self.length(arg)?;
                let bytes = self.take(len, "truncated text string")?;
                let text = core::str::from_utf8(bytes)
                    .map_err(|_| self.fail("invalid utf-8 in text string"))?;
                Ok(Value::Text(text.to_owned()))
            }
            4 => {
                let count = self.length(arg)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.value_at_depth(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            5 => {
                let count = self.length(arg)?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = self.value_at_depth(depth + 1)?;
                    let val = self.value_at_depth(depth + 1)?;
                    entries.push((key, val));
                }
                Ok(Value::Map(entries))
            }
            6 => {
                let inner = self.value_at_depth(depth + 1)?;
                Ok(Value::Tag(arg, Box::new(inner)))
            }
            // Simple values dispatch on the additional info, not the
            // argument: 0xF9.. is a float16, not simple(arg).
            _ => match info {
                20 => Ok(Value::Bool(false)),
                21 => Ok(Value::Bool(true)),
                22 => Ok(Value::Null),
                _ => Err(self.fail("unsupported simple or float value")),
            },
        }
    }
}
