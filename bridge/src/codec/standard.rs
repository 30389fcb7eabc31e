//! Standard binary codec
//!
//! Byte-compatible with Flutter's `StandardMessageCodec` / `StandardMethodCodec`
//! on little-endian hosts. Each value is a one-byte type tag followed by its
//! payload. Sizes use a variable-length prefix, and numeric payloads are
//! padded with zero bytes so they start at a multiple of their width,
//! measured from the start of the whole message.
//!
//! Example: `Value::Float(1.0)` encodes as the tag `6`, seven padding bytes,
//! then the eight little-endian bytes of the float.

use super::{MethodCall, MethodCodec};
use crate::error::{BridgeError, Result};
use crate::value::Value;
use std::sync::Arc;

const NULL: u8 = 0;
const TRUE: u8 = 1;
const FALSE: u8 = 2;
const INT32: u8 = 3;
const INT64: u8 = 4;
const LARGE_INT: u8 = 5;
const FLOAT64: u8 = 6;
const STRING: u8 = 7;
const UINT8_LIST: u8 = 8;
const INT32_LIST: u8 = 9;
const INT64_LIST: u8 = 10;
const FLOAT64_LIST: u8 = 11;
const LIST: u8 = 12;
const MAP: u8 = 13;
const FLOAT32_LIST: u8 = 14;

/// Largest size written as a single byte
const SIZE_ONE_BYTE_MAX: usize = 253;
const SIZE_U16_MARKER: u8 = 254;
const SIZE_U32_MARKER: u8 = 255;

/// Deepest list/map nesting accepted when decoding
const MAX_NESTING_DEPTH: usize = 128;

const SUCCESS_FLAG: u8 = 0;
const ERROR_FLAG: u8 = 1;

/// Output buffer handed to value writers
pub struct WriteParcel {
    codec: StandardMessageCodec,
    buf: Vec<u8>,
}

impl WriteParcel {
    fn new(codec: StandardMessageCodec) -> Self {
        Self {
            codec,
            buf: Vec::new(),
        }
    }

    /// Append one encoded value
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        let codec = self.codec;
        codec.write_value(self, value)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn put_u8(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn align(&mut self, alignment: usize) {
        let rem = self.buf.len() % alignment;
        if rem != 0 {
            self.buf.resize(self.buf.len() + alignment - rem, 0);
        }
    }

    fn put_size(&mut self, size: usize) -> Result<()> {
        if size <= SIZE_ONE_BYTE_MAX {
            self.put_u8(size as u8);
        } else if let Ok(size) = u16::try_from(size) {
            self.put_u8(SIZE_U16_MARKER);
            self.put(&size.to_le_bytes());
        } else if let Ok(size) = u32::try_from(size) {
            self.put_u8(SIZE_U32_MARKER);
            self.put(&size.to_le_bytes());
        } else {
            return Err(BridgeError::Codec(format!(
                "Value of {} elements is too large to encode",
                size
            )));
        }
        Ok(())
    }
}

/// Input cursor handed to value readers
pub struct ReadParcel<'a> {
    codec: StandardMessageCodec,
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> ReadParcel<'a> {
    fn new(codec: StandardMessageCodec, buf: &'a [u8]) -> Self {
        Self {
            codec,
            buf,
            pos: 0,
            depth: 0,
        }
    }

    /// Read the next encoded value
    pub fn read_value(&mut self) -> Result<Value> {
        let codec = self.codec;
        codec.read_value(self)
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(BridgeError::Codec(format!(
                "Message corrupted: needed {} bytes at offset {}, {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let buf: &'a [u8] = self.buf;
        let slice = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn align(&mut self, alignment: usize) -> Result<()> {
        let rem = self.pos % alignment;
        if rem != 0 {
            self.take(alignment - rem)?;
        }
        Ok(())
    }

    /// Step into a nested collection
    fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(BridgeError::Codec(
                "Message corrupted: nesting too deep".to_string(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Wide prefixes are accepted for small sizes too, as Flutter's decoder does
    fn read_size(&mut self) -> Result<usize> {
        let size = match self.read_u8()? {
            SIZE_U16_MARKER => u16::from_le_bytes(self.read_array()?) as usize,
            SIZE_U32_MARKER => u32::from_le_bytes(self.read_array()?) as usize,
            byte => byte as usize,
        };
        Ok(size)
    }

    /// Read `count` fixed-width elements, failing before allocating if they cannot fit
    fn take_elements(&mut self, count: usize, width: usize) -> Result<&'a [u8]> {
        let len = count.checked_mul(width).ok_or_else(|| {
            BridgeError::Codec(format!("Message corrupted: list of {} elements", count))
        })?;
        self.take(len)
    }
}

/// Encoder/decoder for single values in the standard binary format
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMessageCodec;

impl StandardMessageCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode one value into a fresh buffer
    pub fn encode_message(&self, value: &Value) -> Result<Vec<u8>> {
        let mut parcel = WriteParcel::new(*self);
        self.write_value(&mut parcel, value)?;
        Ok(parcel.into_bytes())
    }

    /// Decode a buffer holding exactly one value
    pub fn decode_message(&self, message: &[u8]) -> Result<Value> {
        let mut parcel = ReadParcel::new(*self, message);
        let value = self.read_value(&mut parcel)?;
        if parcel.has_remaining() {
            return Err(BridgeError::Codec("Message corrupted".to_string()));
        }
        Ok(value)
    }

    pub fn write_value(&self, out: &mut WriteParcel, value: &Value) -> Result<()> {
        match value {
            Value::Null => out.put_u8(NULL),
            Value::Bool(true) => out.put_u8(TRUE),
            Value::Bool(false) => out.put_u8(FALSE),
            Value::Int(i) => match i32::try_from(*i) {
                Ok(small) => {
                    out.put_u8(INT32);
                    out.put(&small.to_le_bytes());
                }
                Err(_) => {
                    out.put_u8(INT64);
                    out.put(&i.to_le_bytes());
                }
            },
            Value::Float(f) => {
                out.put_u8(FLOAT64);
                out.align(8);
                out.put(&f.to_le_bytes());
            }
            Value::String(s) => {
                out.put_u8(STRING);
                out.put_size(s.len())?;
                out.put(s.as_bytes());
            }
            Value::Bytes(bytes) => {
                out.put_u8(UINT8_LIST);
                out.put_size(bytes.len())?;
                out.put(bytes);
            }
            Value::Int32List(items) => {
                out.put_u8(INT32_LIST);
                out.put_size(items.len())?;
                out.align(4);
                items.iter().for_each(|i| out.put(&i.to_le_bytes()));
            }
            Value::Int64List(items) => {
                out.put_u8(INT64_LIST);
                out.put_size(items.len())?;
                out.align(8);
                items.iter().for_each(|i| out.put(&i.to_le_bytes()));
            }
            Value::Float32List(items) => {
                out.put_u8(FLOAT32_LIST);
                out.put_size(items.len())?;
                out.align(4);
                items.iter().for_each(|f| out.put(&f.to_le_bytes()));
            }
            Value::Float64List(items) => {
                out.put_u8(FLOAT64_LIST);
                out.put_size(items.len())?;
                out.align(8);
                items.iter().for_each(|f| out.put(&f.to_le_bytes()));
            }
            Value::List(items) => {
                out.put_u8(LIST);
                out.put_size(items.len())?;
                for item in items {
                    self.write_value(out, item)?;
                }
            }
            Value::Map(entries) => {
                out.put_u8(MAP);
                out.put_size(entries.len())?;
                for (key, value) in entries {
                    self.write_value(out, key)?;
                    self.write_value(out, value)?;
                }
            }
        }
        Ok(())
    }

    pub fn read_value(&self, input: &mut ReadParcel<'_>) -> Result<Value> {
        let tag = input.read_u8()?;
        let value = match tag {
            NULL => Value::Null,
            TRUE => Value::Bool(true),
            FALSE => Value::Bool(false),
            INT32 => Value::Int(i64::from(i32::from_le_bytes(input.read_array()?))),
            INT64 => Value::Int(i64::from_le_bytes(input.read_array()?)),
            LARGE_INT => {
                let len = input.read_size()?;
                let hex = std::str::from_utf8(input.take(len)?)
                    .map_err(|e| BridgeError::Codec(format!("Invalid large int: {}", e)))?;
                let parsed = i64::from_str_radix(hex, 16).map_err(|_| {
                    BridgeError::Codec(format!("Large int 0x{} does not fit in 64 bits", hex))
                })?;
                Value::Int(parsed)
            }
            FLOAT64 => {
                input.align(8)?;
                Value::Float(f64::from_le_bytes(input.read_array()?))
            }
            STRING => {
                let len = input.read_size()?;
                let text = std::str::from_utf8(input.take(len)?)
                    .map_err(|e| BridgeError::Codec(format!("Invalid UTF-8 string: {}", e)))?;
                Value::String(text.to_string())
            }
            UINT8_LIST => {
                let len = input.read_size()?;
                Value::Bytes(input.take(len)?.to_vec())
            }
            INT32_LIST => {
                let count = input.read_size()?;
                input.align(4)?;
                let raw = input.take_elements(count, 4)?;
                Value::Int32List(
                    raw.chunks_exact(4)
                        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            }
            INT64_LIST => {
                let count = input.read_size()?;
                input.align(8)?;
                let raw = input.take_elements(count, 8)?;
                Value::Int64List(
                    raw.chunks_exact(8)
                        .map(le_u64_chunk)
                        .map(i64::from_le_bytes)
                        .collect(),
                )
            }
            FLOAT32_LIST => {
                let count = input.read_size()?;
                input.align(4)?;
                let raw = input.take_elements(count, 4)?;
                Value::Float32List(
                    raw.chunks_exact(4)
                        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            }
            FLOAT64_LIST => {
                let count = input.read_size()?;
                input.align(8)?;
                let raw = input.take_elements(count, 8)?;
                Value::Float64List(
                    raw.chunks_exact(8)
                        .map(le_u64_chunk)
                        .map(f64::from_le_bytes)
                        .collect(),
                )
            }
            LIST => {
                let count = input.read_size()?;
                let mut items = Vec::with_capacity(count.min(input.remaining()));
                input.enter()?;
                for _ in 0..count {
                    items.push(self.read_value(input)?);
                }
                input.leave();
                Value::List(items)
            }
            MAP => {
                let count = input.read_size()?;
                let mut entries = Vec::with_capacity(count.min(input.remaining()));
                input.enter()?;
                for _ in 0..count {
                    let key = self.read_value(input)?;
                    let value = self.read_value(input)?;
                    entries.push((key, value));
                }
                input.leave();
                Value::Map(entries)
            }
            other => {
                return Err(BridgeError::Codec(format!(
                    "Message corrupted: unknown type tag {}",
                    other
                )))
            }
        };
        Ok(value)
    }
}

fn le_u64_chunk(chunk: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(chunk);
    out
}

/// Per-method layout for call arguments and results
///
/// Lets a method write its payload as a fixed sequence of values instead of
/// one self-describing value, e.g. a struct flattened into its fields.
pub trait ArgumentsCodec: Send + Sync {
    fn write_value(&self, method: &str, value: &Value, parcel: &mut WriteParcel) -> Result<()>;

    fn read_value(&self, method: &str, parcel: &mut ReadParcel<'_>) -> Result<Value>;
}

/// Method codec using the standard binary encoding
#[derive(Clone, Default)]
pub struct StandardMethodCodec {
    message_codec: StandardMessageCodec,
    arguments_codec: Option<Arc<dyn ArgumentsCodec>>,
}

impl StandardMethodCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route call arguments and results through a per-method codec
    pub fn with_arguments_codec(arguments_codec: Arc<dyn ArgumentsCodec>) -> Self {
        Self {
            message_codec: StandardMessageCodec,
            arguments_codec: Some(arguments_codec),
        }
    }

    fn write_payload(&self, method: &str, value: &Value, out: &mut WriteParcel) -> Result<()> {
        match &self.arguments_codec {
            Some(codec) => codec.write_value(method, value, out),
            None => self.message_codec.write_value(out, value),
        }
    }

    fn read_payload(&self, method: &str, input: &mut ReadParcel<'_>) -> Result<Value> {
        match &self.arguments_codec {
            Some(codec) => codec.read_value(method, input),
            None => self.message_codec.read_value(input),
        }
    }
}

impl MethodCodec for StandardMethodCodec {
    fn encode_method_call(&self, call: &MethodCall) -> Result<Vec<u8>> {
        let mut out = WriteParcel::new(self.message_codec);
        self.message_codec
            .write_value(&mut out, &Value::String(call.method.clone()))?;
        self.write_payload(&call.method, &call.arguments, &mut out)?;
        Ok(out.into_bytes())
    }

    fn decode_method_call(&self, message: &[u8]) -> Result<MethodCall> {
        let mut input = ReadParcel::new(self.message_codec, message);
        let method = match self.message_codec.read_value(&mut input)? {
            Value::String(method) => method,
            _ => return Err(BridgeError::Codec("Method call corrupted".to_string())),
        };
        let arguments = self.read_payload(&method, &mut input)?;
        if input.has_remaining() {
            return Err(BridgeError::Codec("Method call corrupted".to_string()));
        }
        Ok(MethodCall { method, arguments })
    }

    fn encode_success_envelope(&self, method: &str, result: &Value) -> Result<Vec<u8>> {
        let mut out = WriteParcel::new(self.message_codec);
        out.put_u8(SUCCESS_FLAG);
        self.write_payload(method, result, &mut out)?;
        Ok(out.into_bytes())
    }

    fn encode_error_envelope(
        &self,
        method: &str,
        code: &str,
        message: Option<&str>,
        details: &Value,
    ) -> Result<Vec<u8>> {
        let mut out = WriteParcel::new(self.message_codec);
        out.put_u8(ERROR_FLAG);
        self.write_payload(method, &Value::from(code), &mut out)?;
        let message = message.map(Value::from).unwrap_or_default();
        self.write_payload(method, &message, &mut out)?;
        self.write_payload(method, details, &mut out)?;
        Ok(out.into_bytes())
    }

    fn decode_envelope(&self, method: &str, envelope: &[u8]) -> Result<Value> {
        let mut input = ReadParcel::new(self.message_codec, envelope);
        let flag = input.read_u8()?;

        if flag == SUCCESS_FLAG {
            let result = self.read_payload(method, &mut input)?;
            if !input.has_remaining() {
                return Ok(result);
            }
            // Trailing bytes: reinterpret the rest as an error triple
        }

        if flag == SUCCESS_FLAG || flag == ERROR_FLAG {
            let code = self.read_payload(method, &mut input)?;
            let message = self.read_payload(method, &mut input)?;
            let details = self.read_payload(method, &mut input)?;

            if let Value::String(code) = code {
                let message = match message {
                    Value::Null => Some(None),
                    Value::String(m) => Some(Some(m)),
                    _ => None,
                };
                if let (Some(message), false) = (message, input.has_remaining()) {
                    return Err(BridgeError::Platform {
                        code,
                        message,
                        details,
                    });
                }
            }
        }

        Err(BridgeError::Codec("Envelope corrupted".to_string()))
    }
}
