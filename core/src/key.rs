use bytes::{Buf, BufMut};
use num::PrimInt;
use std::fmt::Debug;
use trait_set::trait_set;

/// A primitive integer that can be written to and read from a segment blob
/// as a fixed number of raw bytes.
pub trait WireKey: Sized {
    /// Number of bytes a key occupies in a blob.
    const WIDTH: usize;

    fn put_ne(self, buf: &mut impl BufMut);
    fn put_le(self, buf: &mut impl BufMut);

    /// Panics if `buf` holds fewer than `WIDTH` bytes.
    fn get_ne(buf: &mut impl Buf) -> Self;
    fn get_le(buf: &mut impl Buf) -> Self;
}

// Until `trait_alias` is stabilized, we have to use a macro
trait_set! {
    /// General key type for segments, thread-safe primitive integer
    pub trait Key = WireKey + PrimInt + Debug + Default + Send + Sync + 'static;
}

macro_rules! impl_integer {
    ($($t:ty),+) => {
        $(
            impl WireKey for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn put_ne(self, buf: &mut impl BufMut) {
                    buf.put_slice(&self.to_ne_bytes());
                }

                fn put_le(self, buf: &mut impl BufMut) {
                    buf.put_slice(&self.to_le_bytes());
                }

                fn get_ne(buf: &mut impl Buf) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_to_slice(&mut raw);
                    <$t>::from_ne_bytes(raw)
                }

                fn get_le(buf: &mut impl Buf) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_to_slice(&mut raw);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    }
}

impl_integer!(usize, u8, u16, u32, u64, u128, isize, i8, i16, i32, i64, i128);

/// Converts a real-valued coordinate into a key, truncating any fraction.
/// Returns `None` for NaN or values outside the range of `K`.
pub fn key_from_f64<K: Key>(x: f64) -> Option<K> {
    num::cast::<f64, K>(x)
}

/// Every primitive integer converts to `f64`, possibly losing precision
/// above 2^53.
pub fn key_to_f64<K: Key>(key: K) -> f64 {
    num::cast::<K, f64>(key).unwrap_or(f64::NAN)
}
