//! Built-in serializers for the primitive payload types.
//!
//! Every writer here has the shape `fn(&mut Writer, T)` and every reader the
//! shape `fn(&mut Reader<'_>) -> Result<T>`. The build pipeline scans this file
//! and registers each procedure under its payload type before any user-defined
//! serializer.

use crate::Error;
use crate::Reader;
use crate::Result;
use crate::Writer;

pub fn write_bool(writer: &mut Writer, value: bool) {
    writer.write_byte(value as u8);
}

pub fn read_bool(reader: &mut Reader<'_>) -> Result<bool> {
    match reader.read_byte()? {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(Error::InvalidBool(b)),
    }
}

pub fn write_u8(writer: &mut Writer, value: u8) {
    writer.write_byte(value);
}

pub fn read_u8(reader: &mut Reader<'_>) -> Result<u8> {
    reader.read_byte()
}

pub fn write_i8(writer: &mut Writer, value: i8) {
    writer.write_byte(value as u8);
}

pub fn read_i8(reader: &mut Reader<'_>) -> Result<i8> {
    Ok(reader.read_byte()? as i8)
}

pub fn write_u16(writer: &mut Writer, value: u16) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_u16(reader: &mut Reader<'_>) -> Result<u16> {
    Ok(u16::from_le_bytes(reader.read_array()?))
}

pub fn write_i16(writer: &mut Writer, value: i16) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_i16(reader: &mut Reader<'_>) -> Result<i16> {
    Ok(i16::from_le_bytes(reader.read_array()?))
}

pub fn write_u32(writer: &mut Writer, value: u32) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_u32(reader: &mut Reader<'_>) -> Result<u32> {
    Ok(u32::from_le_bytes(reader.read_array()?))
}

pub fn write_i32(writer: &mut Writer, value: i32) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_i32(reader: &mut Reader<'_>) -> Result<i32> {
    Ok(i32::from_le_bytes(reader.read_array()?))
}

pub fn write_u64(writer: &mut Writer, value: u64) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_u64(reader: &mut Reader<'_>) -> Result<u64> {
    Ok(u64::from_le_bytes(reader.read_array()?))
}

pub fn write_i64(writer: &mut Writer, value: i64) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_i64(reader: &mut Reader<'_>) -> Result<i64> {
    Ok(i64::from_le_bytes(reader.read_array()?))
}

pub fn write_f32(writer: &mut Writer, value: f32) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_f32(reader: &mut Reader<'_>) -> Result<f32> {
    Ok(f32::from_le_bytes(reader.read_array()?))
}

pub fn write_f64(writer: &mut Writer, value: f64) {
    writer.write_bytes(&value.to_le_bytes());
}

pub fn read_f64(reader: &mut Reader<'_>) -> Result<f64> {
    Ok(f64::from_le_bytes(reader.read_array()?))
}

/// Writes the UTF-8 encoding of `value` (1 to 4 bytes).
pub fn write_char(writer: &mut Writer, value: char) {
    let mut buf = [0u8; 4];
    writer.write_bytes(value.encode_utf8(&mut buf).as_bytes());
}

/// Reads one UTF-8 encoded char, using the leading byte to find its width.
pub fn read_char(reader: &mut Reader<'_>) -> Result<char> {
    let lead = reader.read_byte()?;
    let width = match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Err(Error::InvalidUtf8),
    };

    let mut buf = [0u8; 4];
    buf[0] = lead;
    buf[1..width].copy_from_slice(reader.read_bytes(width - 1)?);

    let s = std::str::from_utf8(&buf[..width]).map_err(|_| Error::InvalidUtf8)?;
    s.chars().next().ok_or(Error::InvalidUtf8)
}

/// Writes a varint byte length followed by the UTF-8 bytes of `value`.
///
/// The length is never truncated. Strings longer than `u32::MAX` bytes are
/// written in full, and `read_string` rejects them with
/// `Error::LengthOverflow`.
pub fn write_string(writer: &mut Writer, value: String) {
    writer.write_var_u64(value.len() as u64);
    writer.write_bytes(value.as_bytes());
}

pub fn read_string(reader: &mut Reader<'_>) -> Result<String> {
    let len = reader.read_var_u32()? as usize;
    let bytes = reader.read_bytes(len)?;
    let s = std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
    Ok(s.to_owned())
}
