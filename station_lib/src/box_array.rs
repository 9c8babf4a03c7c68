//! Fixed-size arrays big enough that they must live on the heap (RAM, BIOS ROM). `Box<[T; N]>`
//! can't be built directly without blowing the stack first, so we go through a `Vec` and convert
//! the boxed slice in place.

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::ops;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BoxArray<T, const N: usize>(Box<[T; N]>);

impl<T, const N: usize> BoxArray<T, N> {
    /// Build a BoxArray from `v` without copying. Panics if the length of the vector is not
    /// exactly `N`.
    pub fn from_vec(v: Vec<T>) -> BoxArray<T, N> {
        let slice: Box<[T]> = v.into_boxed_slice();

        match slice.try_into() {
            Ok(array) => BoxArray(array),
            Err(slice) => panic!(
                "Attempted to create a BoxArray of {} elements from a Vec of {}",
                N,
                slice.len()
            ),
        }
    }
}

impl<T: Clone, const N: usize> BoxArray<T, N> {
    /// Build a BoxArray with every entry set to `fill`
    pub fn filled_with(fill: T) -> BoxArray<T, N> {
        BoxArray::from_vec(vec![fill; N])
    }
}

impl<T, const N: usize> ops::Deref for BoxArray<T, N> {
    type Target = [T; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T, const N: usize> ops::DerefMut for BoxArray<T, N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Serialize, const N: usize> Serialize for BoxArray<T, N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = serializer.serialize_tuple(N)?;

        for v in self.0.iter() {
            tup.serialize_element(v)?;
        }

        tup.end()
    }
}

impl<'de, T, const N: usize> Deserialize<'de> for BoxArray<T, N>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ArrayVisitor<T, const N: usize>(PhantomData<T>);

        impl<'de, T, const N: usize> Visitor<'de> for ArrayVisitor<T, N>
        where
            T: Deserialize<'de>,
        {
            type Value = BoxArray<T, N>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "an array of {} elements", N)
            }

            fn visit_seq<S>(self, mut seq: S) -> Result<BoxArray<T, N>, S::Error>
            where
                S: SeqAccess<'de>,
            {
                let mut v = Vec::with_capacity(N);

                for i in 0..N {
                    match seq.next_element()? {
                        Some(e) => v.push(e),
                        None => return Err(de::Error::invalid_length(i, &self)),
                    }
                }

                Ok(BoxArray::from_vec(v))
            }
        }

        deserializer.deserialize_tuple(N, ArrayVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::BoxArray;
    use serde::{Deserialize, Serialize};

    #[test]
    fn serialize_round_trip() {
        let mut ba: BoxArray<u8, 1024> = BoxArray::filled_with(0);

        for (i, b) in ba.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(31);
        }

        let mut fb = flexbuffers::FlexbufferSerializer::new();
        ba.serialize(&mut fb).unwrap();

        let reader = flexbuffers::Reader::get_root(fb.view()).unwrap();
        let out = BoxArray::<u8, 1024>::deserialize(reader).unwrap();

        assert_eq!(ba, out);
    }

    #[test]
    #[should_panic]
    fn wrong_length_panics() {
        let _: BoxArray<u8, 16> = BoxArray::from_vec(vec![0; 15]);
    }
}
