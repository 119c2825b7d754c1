//! Typed values on top of `InputStream` and `OutputStream`. All numbers are little-endian.

use byteorder::{ByteOrder, LittleEndian};
use cgmath::{Quaternion, Vector1, Vector2, Vector3, Vector4};

use super::input::InputStream;
use super::output::OutputStream;

/// A value that can be read from an `InputStream`. On failure the stream flags are raised and a
/// zeroed value is returned.
pub trait Decode: Sized {
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self;
}

/// A value that can be written into an `OutputStream`.
pub trait Encode {
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S);
}

macro_rules! impl_number {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl Decode for $ty {
            #[inline]
            fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
                let mut buf = [0; $size];
                if s.read_exact_bytes(&mut buf) {
                    LittleEndian::$read(&buf)
                } else {
                    0 as $ty
                }
            }
        }

        impl Encode for $ty {
            #[inline]
            fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
                let mut buf = [0; $size];
                LittleEndian::$write(&mut buf, *self);
                s.write_all_bytes(&buf);
            }
        }
    };
}

impl_number!(u16, 2, read_u16, write_u16);
impl_number!(u32, 4, read_u32, write_u32);
impl_number!(u64, 8, read_u64, write_u64);
impl_number!(i16, 2, read_i16, write_i16);
impl_number!(i32, 4, read_i32, write_i32);
impl_number!(i64, 8, read_i64, write_i64);
impl_number!(f32, 4, read_f32, write_f32);
impl_number!(f64, 8, read_f64, write_f64);

impl Decode for u8 {
    #[inline]
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        let mut buf = [0; 1];
        s.read_exact_bytes(&mut buf);
        buf[0]
    }
}

impl Encode for u8 {
    #[inline]
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        s.write_all_bytes(&[*self]);
    }
}

impl Decode for i8 {
    #[inline]
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        u8::decode(s) as i8
    }
}

impl Encode for i8 {
    #[inline]
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        (*self as u8).encode(s);
    }
}

impl Decode for bool {
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        match u8::decode(s) {
            0 => false,
            1 => true,
            _ => {
                s.set_invalid();
                false
            }
        }
    }
}

impl Encode for bool {
    #[inline]
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        (*self as u8).encode(s);
    }
}

/// Reads a u64 length prefix. Raises `eof` if `len * min_elem_size` could not possibly be
/// satisfied by the rest of the stream, or does not fit into memory.
fn decode_len<S: InputStream + ?Sized>(s: &mut S, min_elem_size: u64) -> Option<usize> {
    let len = u64::decode(s);
    if s.eof() {
        return None;
    }

    let fits = len
        .checked_mul(min_elem_size)
        .map(|bytes| bytes <= s.remaining())
        .unwrap_or(false);

    if !fits || len > usize::max_value() as u64 {
        s.set_eof();
        return None;
    }

    Some(len as usize)
}

impl Decode for String {
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        let len = match decode_len(s, 1) {
            Some(len) => len,
            None => return String::new(),
        };

        let mut buf = vec![0; len];
        if !s.read_exact_bytes(&mut buf) {
            return String::new();
        }

        match String::from_utf8(buf) {
            Ok(v) => v,
            Err(_) => {
                s.set_invalid();
                String::new()
            }
        }
    }
}

impl Encode for str {
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        (self.len() as u64).encode(s);
        s.write_all_bytes(self.as_bytes());
    }
}

impl Encode for String {
    #[inline]
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        self.as_str().encode(s);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        // Every element we know of occupies at least one byte.
        let len = match decode_len(s, 1) {
            Some(len) => len,
            None => return Vec::new(),
        };

        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let v = T::decode(s);
            if s.flags().any() {
                break;
            }

            items.push(v);
        }

        items
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        (self.len() as u64).encode(s);
        for v in self {
            v.encode(s);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    #[inline]
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        self.as_slice().encode(s);
    }
}

impl<'a, T: Encode + ?Sized> Encode for &'a T {
    #[inline]
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        (**self).encode(s);
    }
}

macro_rules! impl_components {
    ($ty:ident, $($field:ident),+) => {
        impl<T: Decode> Decode for $ty<T> {
            #[inline]
            fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
                $(let $field = T::decode(s);)+
                $ty { $($field),+ }
            }
        }

        impl<T: Encode> Encode for $ty<T> {
            #[inline]
            fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
                $(self.$field.encode(s);)+
            }
        }
    };
}

impl_components!(Vector1, x);
impl_components!(Vector2, x, y);
impl_components!(Vector3, x, y, z);
impl_components!(Vector4, x, y, z, w);

// Quaternions go as (s, x, y, z) in both directions.
impl<T: Decode> Decode for Quaternion<T> {
    fn decode<S: InputStream + ?Sized>(s: &mut S) -> Self {
        let w = T::decode(s);
        let v = Vector3::<T>::decode(s);
        Quaternion { s: w, v }
    }
}

impl<T: Encode> Encode for Quaternion<T> {
    fn encode<S: OutputStream + ?Sized>(&self, s: &mut S) {
        self.s.encode(s);
        self.v.encode(s);
    }
}

/// Typed read helpers for every `InputStream`.
pub trait StreamRead: InputStream {
    #[inline]
    fn read_value<T: Decode>(&mut self) -> T {
        T::decode(self)
    }

    #[inline]
    fn read_u8(&mut self) -> u8 {
        self.read_value()
    }

    #[inline]
    fn read_u16(&mut self) -> u16 {
        self.read_value()
    }

    #[inline]
    fn read_u32(&mut self) -> u32 {
        self.read_value()
    }

    #[inline]
    fn read_u64(&mut self) -> u64 {
        self.read_value()
    }

    #[inline]
    fn read_i32(&mut self) -> i32 {
        self.read_value()
    }

    #[inline]
    fn read_i64(&mut self) -> i64 {
        self.read_value()
    }

    #[inline]
    fn read_f32(&mut self) -> f32 {
        self.read_value()
    }

    #[inline]
    fn read_f64(&mut self) -> f64 {
        self.read_value()
    }

    #[inline]
    fn read_string(&mut self) -> String {
        self.read_value()
    }

    /// Reads a u64 element count followed by that many elements.
    #[inline]
    fn read_seq<T: Decode>(&mut self) -> Vec<T> {
        self.read_value()
    }

    /// Reads exactly `out.len()` elements without a length prefix.
    fn read_array<T: Decode>(&mut self, out: &mut [T]) {
        for v in out.iter_mut() {
            *v = T::decode(self);
        }
    }
}

impl<S: InputStream + ?Sized> StreamRead for S {}

/// Typed write helpers for every `OutputStream`.
pub trait StreamWrite: OutputStream {
    #[inline]
    fn write_value<T: Encode + ?Sized>(&mut self, v: &T) {
        v.encode(self);
    }

    #[inline]
    fn write_u8(&mut self, v: u8) {
        v.encode(self);
    }

    #[inline]
    fn write_u16(&mut self, v: u16) {
        v.encode(self);
    }

    #[inline]
    fn write_u32(&mut self, v: u32) {
        v.encode(self);
    }

    #[inline]
    fn write_u64(&mut self, v: u64) {
        v.encode(self);
    }

    #[inline]
    fn write_i32(&mut self, v: i32) {
        v.encode(self);
    }

    #[inline]
    fn write_i64(&mut self, v: i64) {
        v.encode(self);
    }

    #[inline]
    fn write_f32(&mut self, v: f32) {
        v.encode(self);
    }

    #[inline]
    fn write_f64(&mut self, v: f64) {
        v.encode(self);
    }

    #[inline]
    fn write_string(&mut self, v: &str) {
        v.encode(self);
    }

    /// Writes a u64 element count followed by the elements.
    #[inline]
    fn write_seq<T: Encode>(&mut self, v: &[T]) {
        v.encode(self);
    }

    /// Writes the elements without a length prefix.
    fn write_array<T: Encode>(&mut self, v: &[T]) {
        for item in v {
            item.encode(self);
        }
    }
}

impl<S: OutputStream + ?Sized> StreamWrite for S {}
