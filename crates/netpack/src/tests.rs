use crate::hash::fnv1a_32;
use crate::hash::stable_hash;
use crate::primitives::*;
use crate::*;

use rand::Rng;

// ============================================================================
//  SCALAR TESTS (Happy Path)
// ============================================================================

#[test]
fn test_bool_roundtrip() -> Result<()> {
    let mut w = Writer::new();
    write_bool(&mut w, true);
    write_bool(&mut w, false);
    assert_eq!(w.as_bytes(), &[1, 0]);

    let bytes = w.into_bytes();
    let mut r = Reader::new(&bytes);
    assert!(read_bool(&mut r)?);
    assert!(!read_bool(&mut r)?);
    assert!(r.is_empty());
    Ok(())
}

#[test]
fn test_integers_are_little_endian() {
    let mut w = Writer::new();
    write_u16(&mut w, 0x1234);
    write_i32(&mut w, -2);
    write_u64(&mut w, 1);
    assert_eq!(
        w.as_bytes(),
        &[0x34, 0x12, 0xfe, 0xff, 0xff, 0xff, 1, 0, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn test_integer_extremes_roundtrip() -> Result<()> {
    let mut w = Writer::new();
    write_u8(&mut w, u8::MAX);
    write_i8(&mut w, i8::MIN);
    write_u16(&mut w, u16::MAX);
    write_i16(&mut w, i16::MIN);
    write_u32(&mut w, u32::MAX);
    write_i32(&mut w, i32::MIN);
    write_u64(&mut w, u64::MAX);
    write_i64(&mut w, i64::MIN);
    assert_eq!(w.len(), 1 + 1 + 2 + 2 + 4 + 4 + 8 + 8);

    let bytes = w.into_bytes();
    let mut r = Reader::new(&bytes);
    assert_eq!(read_u8(&mut r)?, u8::MAX);
    assert_eq!(read_i8(&mut r)?, i8::MIN);
    assert_eq!(read_u16(&mut r)?, u16::MAX);
    assert_eq!(read_i16(&mut r)?, i16::MIN);
    assert_eq!(read_u32(&mut r)?, u32::MAX);
    assert_eq!(read_i32(&mut r)?, i32::MIN);
    assert_eq!(read_u64(&mut r)?, u64::MAX);
    assert_eq!(read_i64(&mut r)?, i64::MIN);
    assert_eq!(r.remaining(), 0);
    Ok(())
}

#[test]
fn test_float_specials_roundtrip() -> Result<()> {
    let mut w = Writer::new();
    write_f32(&mut w, f32::NEG_INFINITY);
    write_f64(&mut w, f64::NAN);
    write_f64(&mut w, -0.0);

    let bytes = w.into_bytes();
    let mut r = Reader::new(&bytes);
    assert_eq!(read_f32(&mut r)?, f32::NEG_INFINITY);
    assert!(read_f64(&mut r)?.is_nan());
    assert!(read_f64(&mut r)?.is_sign_negative());
    Ok(())
}

#[test]
fn test_char_widths() -> Result<()> {
    for (c, width) in [('a', 1), ('é', 2), ('€', 3), ('🦀', 4)] {
        let mut w = Writer::new();
        write_char(&mut w, c);
        assert_eq!(w.len(), width, "width of {:?}", c);

        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(read_char(&mut r)?, c);
        assert!(r.is_empty());
    }
    Ok(())
}

#[test]
fn test_string_layout() -> Result<()> {
    let mut w = Writer::new();
    write_string(&mut w, "hey".to_string());
    assert_eq!(w.as_bytes(), &[3, b'h', b'e', b'y']);

    let long = "x".repeat(300);
    let mut w = Writer::new();
    write_string(&mut w, long.clone());
    // 300 = 0b10_0101100 -> [0xac, 0x02]
    assert_eq!(&w.as_bytes()[..2], &[0xac, 0x02]);

    let bytes = w.into_bytes();
    let mut r = Reader::new(&bytes);
    assert_eq!(read_string(&mut r)?, long);
    Ok(())
}

// ============================================================================
//  VARINT
// ============================================================================

#[test]
fn test_varint_boundaries() -> Result<()> {
    for v in [0u32, 0x7f, 0x80, 0x3fff, 0x4000, u32::MAX] {
        let mut w = Writer::new();
        w.write_var_u32(v);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_var_u32()?, v);
        assert!(r.is_empty());
    }
    Ok(())
}

#[test]
fn test_varint_overflow() {
    let bytes = [0xff, 0xff, 0xff, 0xff, 0x1f];
    let mut r = Reader::new(&bytes);
    assert_eq!(r.read_var_u32(), Err(Error::LengthOverflow));

    let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
    let mut r = Reader::new(&bytes);
    assert_eq!(r.read_var_u32(), Err(Error::LengthOverflow));
}

#[test]
fn test_oversized_length_is_not_truncated() {
    // A string one byte past the 32-bit limit keeps its full length prefix.
    let mut w = Writer::new();
    w.write_var_u64(u64::from(u32::MAX) + 1);
    w.write_bytes(b"tail");
    let bytes = w.into_bytes();
    assert_eq!(&bytes[..5], &[0x80, 0x80, 0x80, 0x80, 0x10]);

    let mut r = Reader::new(&bytes);
    assert_eq!(read_string(&mut r), Err(Error::LengthOverflow));

    let mut w = Writer::new();
    w.write_var_u64(300);
    assert_eq!(w.as_bytes(), &[0xac, 0x02]);
}

// ============================================================================
//  ERROR CASES
// ============================================================================

#[test]
fn test_truncated_reads() {
    let bytes = [1u8, 2, 3];
    let mut r = Reader::new(&bytes);
    assert_eq!(read_u32(&mut r), Err(Error::UnexpectedEnd { needed: 4, remaining: 3 }));
    // A failed read does not consume.
    assert_eq!(r.position(), 0);
}

#[test]
fn test_invalid_bool() {
    let bytes = [2u8];
    let mut r = Reader::new(&bytes);
    assert_eq!(read_bool(&mut r), Err(Error::InvalidBool(2)));
}

#[test]
fn test_invalid_utf8() {
    let bytes = [2u8, 0xc3, 0x28];
    let mut r = Reader::new(&bytes);
    assert_eq!(read_string(&mut r), Err(Error::InvalidUtf8));

    let bytes = [0xff];
    let mut r = Reader::new(&bytes);
    assert_eq!(read_char(&mut r), Err(Error::InvalidUtf8));
}

#[test]
fn test_string_length_past_end() {
    let bytes = [10u8, b'a'];
    let mut r = Reader::new(&bytes);
    assert_eq!(read_string(&mut r), Err(Error::UnexpectedEnd { needed: 10, remaining: 1 }));
}

// ============================================================================
//  RANDOMIZED ROUND TRIPS
// ============================================================================

#[test]
fn test_random_roundtrip_fresh_writers() -> Result<()> {
    let mut rng = rand::thread_rng();

    for _ in 0..256 {
        let b: bool = rng.r#gen();
        let x8: i8 = rng.r#gen();
        let u16v: u16 = rng.r#gen();
        let x32: i32 = rng.r#gen();
        let u64v: u64 = rng.r#gen();
        let f: f32 = rng.r#gen();
        let d: f64 = rng.r#gen();
        let c: char = rng.r#gen();
        let len = rng.gen_range(0..64);
        let s: String = (0..len).map(|_| rng.r#gen::<char>()).collect();

        let mut w = Writer::new();
        write_bool(&mut w, b);
        write_i8(&mut w, x8);
        write_u16(&mut w, u16v);
        write_i32(&mut w, x32);
        write_u64(&mut w, u64v);
        write_f32(&mut w, f);
        write_f64(&mut w, d);
        write_char(&mut w, c);
        write_string(&mut w, s.clone());

        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(read_bool(&mut r)?, b);
        assert_eq!(read_i8(&mut r)?, x8);
        assert_eq!(read_u16(&mut r)?, u16v);
        assert_eq!(read_i32(&mut r)?, x32);
        assert_eq!(read_u64(&mut r)?, u64v);
        assert_eq!(read_f32(&mut r)?.to_bits(), f.to_bits());
        assert_eq!(read_f64(&mut r)?.to_bits(), d.to_bits());
        assert_eq!(read_char(&mut r)?, c);
        assert_eq!(read_string(&mut r)?, s);
        assert!(r.is_empty());
    }
    Ok(())
}

#[test]
fn test_reset_writer_reuse() -> Result<()> {
    let mut rng = rand::thread_rng();
    let mut w = Writer::with_capacity(8);

    for _ in 0..64 {
        let v: i64 = rng.r#gen();
        w.reset();
        write_i64(&mut w, v);
        assert_eq!(w.len(), 8);

        let mut r = Reader::new(w.as_bytes());
        assert_eq!(read_i64(&mut r)?, v);
    }
    Ok(())
}

// ============================================================================
//  HASH
// ============================================================================

#[test]
fn test_fnv_reference_vectors() {
    assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
    assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
    assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
}

#[test]
fn test_stable_hash_fold() {
    assert_eq!(stable_hash(""), 0x1cd9);
    assert_eq!(stable_hash("a"), 0xcd20);
    assert_eq!(stable_hash("foobar"), 0x46f4);
}

#[test]
fn test_stable_hash_is_const() {
    const ID: u16 = stable_hash("sample::lobby::Lobby::chat(i32, String)");
    assert_eq!(ID, 0x17ad);
    assert_eq!(ID, stable_hash("sample::lobby::Lobby::chat(i32, String)"));
}
