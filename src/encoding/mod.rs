// Fixed-width little-endian record encoding.
//
// Every value a record is made of has a width known up front (`Encode::WIDTH`),
// so a record always occupies the same number of bytes and a file of records
// needs no framing: record `i` lives at byte `i * WIDTH`.

use anyhow::{bail, Context};

#[derive(Debug, Default)]
pub struct RecordWriter {
    pub(crate) buf: Vec<u8>,
}

impl RecordWriter {
    pub fn new() -> Self {
        RecordWriter { buf: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.buf.clear()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write(&mut self, buf: &[u8]) {
        self.buf.extend_from_slice(buf);
    }

    /// Writes `buf` followed by zero bytes up to `width`. `buf` must not be
    /// longer than `width`.
    pub fn write_padded(&mut self, buf: &[u8], width: usize) {
        debug_assert!(buf.len() <= width);
        self.buf.extend_from_slice(buf);
        self.buf.resize(self.buf.len() + (width - buf.len()), 0);
    }
}

pub struct RecordReader<'a> {
    buf: &'a [u8],
    from: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        RecordReader { buf, from: 0 }
    }

    pub fn next(&mut self, n: usize) -> anyhow::Result<&'a [u8]> {
        if self.buf.len() - self.from < n {
            bail!(
                "record truncated: wanted {} bytes at offset {}, have {}",
                n,
                self.from,
                self.buf.len() - self.from
            );
        }
        let out = &self.buf[self.from..self.from + n];
        self.from += n;
        Ok(out)
    }

    fn next_array<const N: usize>(&mut self) -> anyhow::Result<[u8; N]> {
        Ok(self.next(N)?.try_into()?)
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.from
    }
}

pub trait Encode {
    /// Number of bytes `write_bytes` always produces.
    const WIDTH: usize;

    fn write_bytes(&self, w: &mut RecordWriter);
}

pub trait Decode: Sized {
    fn decode(r: &mut RecordReader) -> anyhow::Result<Self>;
}

/// A value that can be stored as one slot of a record file.
pub trait Record: Encode + Decode {}

impl<T: Encode + Decode> Record for T {}

/// Decodes a whole record from exactly `T::WIDTH` bytes.
pub fn decode_record<T: Record>(buf: &[u8]) -> anyhow::Result<T> {
    let mut r = RecordReader::new(buf);
    let v = T::decode(&mut r)?;
    if r.remaining() != 0 {
        bail!("{} trailing bytes after record", r.remaining());
    }
    Ok(v)
}

macro_rules! le_primitive {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn write_bytes(&self, w: &mut RecordWriter) {
                    w.write(&self.to_le_bytes())
                }
            }

            impl Decode for $t {
                fn decode(r: &mut RecordReader) -> anyhow::Result<Self> {
                    Ok(Self::from_le_bytes(r.next_array()?))
                }
            }
        )*
    };
}

le_primitive!(u8, u16, u32, u64, i32, i64, f32, f64);

impl Encode for bool {
    const WIDTH: usize = 1;

    fn write_bytes(&self, w: &mut RecordWriter) {
        w.write(&[*self as u8])
    }
}

impl Decode for bool {
    fn decode(r: &mut RecordReader) -> anyhow::Result<Self> {
        match r.next(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            b => bail!("invalid bool byte {:#04x}", b),
        }
    }
}

impl<A> Encode for &A
where
    A: Encode,
{
    const WIDTH: usize = A::WIDTH;

    fn write_bytes(&self, w: &mut RecordWriter) {
        (*self).write_bytes(w)
    }
}

impl<A, B> Encode for (A, B)
where
    A: Encode,
    B: Encode,
{
    const WIDTH: usize = A::WIDTH + B::WIDTH;

    fn write_bytes(&self, w: &mut RecordWriter) {
        self.0.write_bytes(w);
        self.1.write_bytes(w);
    }
}

impl<A, B> Decode for (A, B)
where
    A: Decode,
    B: Decode,
{
    fn decode(r: &mut RecordReader) -> anyhow::Result<Self> {
        let a = A::decode(r)?;
        let b = B::decode(r)?;
        Ok((a, b))
    }
}

/// A string stored in exactly `N` bytes: UTF-8, right-padded with zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedStr<const N: usize>(String);

impl<const N: usize> FixedStr<N> {
    pub fn new<S: Into<String>>(s: S) -> anyhow::Result<Self> {
        let s = s.into();
        if s.len() > N {
            bail!("{:?} is {} bytes, field holds {}", s, s.len(), N);
        }
        if s.contains('\0') {
            bail!("{:?} contains a NUL byte", s);
        }
        Ok(FixedStr(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> std::fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> PartialEq<str> for FixedStr<N> {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<const N: usize> PartialEq<&str> for FixedStr<N> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl<const N: usize> Encode for FixedStr<N> {
    const WIDTH: usize = N;

    fn write_bytes(&self, w: &mut RecordWriter) {
        w.write_padded(self.0.as_bytes(), N)
    }
}

impl<const N: usize> Decode for FixedStr<N> {
    fn decode(r: &mut RecordReader) -> anyhow::Result<Self> {
        let raw = r.next(N)?;
        let len = raw.iter().position(|b| *b == 0).unwrap_or(N);
        if raw[len..].iter().any(|b| *b != 0) {
            bail!("text field has bytes after its padding");
        }
        let s = std::str::from_utf8(&raw[..len]).context("text field is not UTF-8")?;
        Ok(FixedStr(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_record, Encode, FixedStr, RecordWriter};

    fn encode<T: Encode>(v: &T) -> Vec<u8> {
        let mut w = RecordWriter::new();
        v.write_bytes(&mut w);
        assert_eq!(w.as_bytes().len(), T::WIDTH);
        w.buf
    }

    #[test]
    fn test_little_endian_layout() {
        assert_eq!(encode(&0x0102_0304_u32), vec![4, 3, 2, 1]);
        assert_eq!(encode(&-2_i32), vec![0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(encode(&1.0_f32), vec![0, 0, 0x80, 0x3f]);
        assert_eq!(encode(&(7_u8, true)), vec![7, 1]);
    }

    #[test]
    fn test_fixed_str_padding() {
        let s: FixedStr<6> = FixedStr::new("abc").unwrap();
        assert_eq!(encode(&s), b"abc\0\0\0".to_vec());
        assert_eq!(decode_record::<FixedStr<6>>(b"abc\0\0\0").unwrap(), s);

        let full: FixedStr<3> = FixedStr::new("xyz").unwrap();
        assert_eq!(decode_record::<FixedStr<3>>(&encode(&full)).unwrap(), full);

        let empty: FixedStr<2> = FixedStr::new("").unwrap();
        assert_eq!(encode(&empty), vec![0, 0]);
    }

    #[test]
    fn test_fixed_str_rejects() {
        assert!(FixedStr::<2>::new("abc").is_err());
        assert!(FixedStr::<8>::new("a\0b").is_err());
        // Multi-byte characters count by bytes.
        assert!(FixedStr::<3>::new("héé").is_err());
        assert!(decode_record::<FixedStr<4>>(b"a\0b\0").is_err());
        assert!(decode_record::<FixedStr<2>>(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_decode_bad_input() {
        assert!(decode_record::<u32>(&[1, 2, 3]).is_err());
        assert!(decode_record::<u32>(&[1, 2, 3, 4, 5]).is_err());
        assert!(decode_record::<bool>(&[2]).is_err());
        assert_eq!(decode_record::<(u8, u16)>(&[9, 1, 0]).unwrap(), (9, 1));
    }
}
