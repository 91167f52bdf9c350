//! Chip-independent description of registers and the bit-fields inside them.
//!
//! A register is read as a big-endian byte sequence (the byte at the base
//! address is the most significant one). Fields are located by their lowest
//! bit and width within that sequence and carry a [`Codec`] that turns the
//! raw bit pattern into something meaningful.

use std::fmt;

use crate::error::{Result, SensorError};

/// Symbolic side of a lookup table entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Symbol {
    Name(&'static str),
    Number(f64),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Symbol::Name(name) => write!(f, "'{name}'"),
            Symbol::Number(number) => write!(f, "{number}"),
        }
    }
}

/// Decoded value of a field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Symbol(Symbol),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldValue::Unsigned(value) => write!(f, "{value}"),
            FieldValue::Signed(value) => write!(f, "{value}"),
            FieldValue::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

impl From<Symbol> for FieldValue {
    fn from(symbol: Symbol) -> Self {
        FieldValue::Symbol(symbol)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Codec {
    /// Bits are the value.
    RawUnsigned,
    /// Two's-complement reinterpretation at the given bit width.
    SignedFromUnsigned { bits: u32 },
    /// 16 bit unsigned stored low byte first.
    UnsignedLe16,
    /// 16 bit two's-complement stored low byte first.
    SignedLe16,
    /// Bidirectional table between symbols and raw codes.
    Lookup(&'static [(Symbol, u64)]),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Position of the lowest bit, counted from the register's least significant bit.
    pub shift: u32,
    pub width: u32,
    pub codec: Codec,
    pub read_only: bool,
}

impl FieldDescriptor {
    /// Field located by a contiguous bit-mask no wider than 64 bits.
    pub const fn masked(name: &'static str, mask: u64, codec: Codec) -> Self {
        let shift = mask.trailing_zeros();
        let width = 64 - mask.leading_zeros() - shift;
        FieldDescriptor { name, shift, width, codec, read_only: false }
    }

    /// Field located by its lowest bit and width, for registers wider than 64 bits.
    pub const fn bits(name: &'static str, shift: u32, width: u32, codec: Codec) -> Self {
        FieldDescriptor { name, shift, width, codec, read_only: false }
    }

    pub const fn read_only(self) -> Self {
        FieldDescriptor { read_only: true, ..self }
    }

    fn max_raw(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    pub fn decode(&self, raw: u64) -> Result<FieldValue> {
        let value = match self.codec {
            Codec::RawUnsigned => FieldValue::Unsigned(raw),
            Codec::SignedFromUnsigned { bits } => FieldValue::Signed(sign_extend(raw, bits)),
            Codec::UnsignedLe16 => FieldValue::Unsigned(swap16(raw)),
            Codec::SignedLe16 => FieldValue::Signed(sign_extend(swap16(raw), 16)),
            Codec::Lookup(table) => match table.iter().find(|(_, code)| *code == raw) {
                Some((symbol, _)) => FieldValue::Symbol(*symbol),
                None => {
                    return Err(SensorError::UnknownSymbol {
                        field: self.name,
                        value: format!("code {raw:#b}"),
                    })
                }
            },
        };
        Ok(value)
    }

    /// Turns a value into its raw code, checking that it fits the field.
    pub fn encode(&self, value: FieldValue) -> Result<u64> {
        let raw = match (self.codec, value) {
            (Codec::Lookup(table), FieldValue::Symbol(symbol)) => {
                match table.iter().find(|(entry, _)| *entry == symbol) {
                    Some((_, code)) => *code,
                    None => return Err(self.unknown_symbol(value)),
                }
            }
            (Codec::Lookup(_), _) | (_, FieldValue::Symbol(_)) => return Err(self.unknown_symbol(value)),
            (Codec::RawUnsigned, FieldValue::Unsigned(v)) => v,
            (Codec::RawUnsigned, FieldValue::Signed(v)) => u64::try_from(v).map_err(|_| self.overflow(v as i128))?,
            (Codec::SignedFromUnsigned { bits }, v) => to_twos_complement(self, v, bits)?,
            (Codec::SignedLe16, v) => swap16(to_twos_complement(self, v, 16)?),
            (Codec::UnsignedLe16, FieldValue::Unsigned(v)) if v <= 0xffff => swap16(v),
            (Codec::UnsignedLe16, FieldValue::Unsigned(v)) => return Err(self.overflow(v as i128)),
            (Codec::UnsignedLe16, FieldValue::Signed(v)) => match u16::try_from(v) {
                Ok(v) => swap16(v as u64),
                Err(_) => return Err(self.overflow(v as i128)),
            },
        };
        if raw > self.max_raw() {
            return Err(self.overflow(raw as i128));
        }
        Ok(raw)
    }

    fn unknown_symbol(&self, value: FieldValue) -> SensorError {
        SensorError::UnknownSymbol { field: self.name, value: value.to_string() }
    }

    fn overflow(&self, value: i128) -> SensorError {
        SensorError::FieldOverflow { field: self.name, value, width: self.width }
    }
}

fn sign_extend(raw: u64, bits: u32) -> i64 {
    let unused = 64 - bits;
    ((raw << unused) as i64) >> unused
}

fn swap16(raw: u64) -> u64 {
    (raw as u16).swap_bytes() as u64
}

fn to_twos_complement(field: &FieldDescriptor, value: FieldValue, bits: u32) -> Result<u64> {
    let value: i128 = match value {
        FieldValue::Unsigned(v) => v as i128,
        FieldValue::Signed(v) => v as i128,
        FieldValue::Symbol(_) => return Err(field.unknown_symbol(value)),
    };
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << (bits - 1)) - 1;
    if value < min || value > max {
        return Err(field.overflow(value));
    }
    Ok((value as u64) & ((1u128 << bits) - 1) as u64)
}

#[derive(Debug, PartialEq)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub address: u8,
    pub bit_width: u32,
    pub fields: &'static [FieldDescriptor],
}

impl RegisterDescriptor {
    pub fn len(&self) -> usize {
        (self.bit_width as usize + 7) / 8
    }

    pub fn field(&self, name: &str) -> Result<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name).ok_or_else(|| SensorError::UnknownField {
            register: self.name,
            field: name.to_string(),
        })
    }

    /// Decodes one named field out of a raw register value.
    pub fn decode(&self, raw: &RegisterValue, field: &str) -> Result<FieldValue> {
        let field = self.field(field)?;
        field.decode(raw.extract(field.shift, field.width))
    }

    /// Merges the given field values into `raw`, leaving all other bits untouched.
    pub fn encode(&self, raw: &mut RegisterValue, values: &[(&str, FieldValue)]) -> Result<()> {
        for (name, value) in values {
            let field = self.field(name)?;
            if field.read_only {
                return Err(SensorError::ReadOnlyField(field.name));
            }
            let code = field.encode(*value)?;
            raw.insert(field.shift, field.width, code);
        }
        Ok(())
    }
}

/// Raw content of a register, most significant byte first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterValue {
    bytes: Vec<u8>,
}

impl RegisterValue {
    pub fn zeroed(len: usize) -> Self {
        RegisterValue { bytes: vec![0; len] }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        RegisterValue { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn bit_position(&self, bit: u32) -> (usize, u8) {
        let byte = self.bytes.len() - 1 - (bit / 8) as usize;
        (byte, (bit % 8) as u8)
    }

    pub fn extract(&self, shift: u32, width: u32) -> u64 {
        (0..width).rev().fold(0u64, |acc, i| {
            let (byte, bit) = self.bit_position(shift + i);
            (acc << 1) | ((self.bytes[byte] >> bit) & 1) as u64
        })
    }

    pub fn insert(&mut self, shift: u32, width: u32, value: u64) {
        for i in 0..width {
            let (byte, bit) = self.bit_position(shift + i);
            if (value >> i) & 1 == 1 {
                self.bytes[byte] |= 1 << bit;
            } else {
                self.bytes[byte] &= !(1 << bit);
            }
        }
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.bytes {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
