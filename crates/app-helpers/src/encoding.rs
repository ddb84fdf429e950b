use base64::Engine;

#[must_use]
pub fn to_base64<T>(data: T) -> String
where
    T: AsRef<[u8]>,
{
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

pub const BASE36_CHARS: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub trait BaseEncoding: Sized {
    /// Encode using the first `base` characters of [`BASE36_CHARS`].
    ///
    /// # Panics
    /// Panics if `base` is not in `2..=36`.
    fn to_base(self, base: u32) -> String;
}

macro_rules! impl_base_encoding {
    ($type:ty) => {
        impl BaseEncoding for $type {
            #[allow(clippy::cast_possible_truncation)]
            fn to_base(self, base: u32) -> String {
                assert!(
                    (2..=BASE36_CHARS.len()).contains(&(base as usize)),
                    "Invalid base: {}",
                    base
                );

                if self == 0 {
                    return BASE36_CHARS[0].to_string();
                }

                let base = <$type>::from(base);
                let mut result = Vec::new();
                let mut data = self;

                while data > 0 {
                    // Remainder is always below 36.
                    result.push(BASE36_CHARS[(data % base) as usize]);
                    data /= base;
                }

                result.iter().rev().collect()
            }
        }
    };
}

impl_base_encoding!(u128);
impl_base_encoding!(u64);
impl_base_encoding!(u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_encodes() {
        assert_eq!(0_u64.to_base(36), "0");
        assert_eq!(35_u64.to_base(36), "z");
        assert_eq!(36_u64.to_base(36), "10");
        assert_eq!(255_u32.to_base(16), "ff");
        assert_eq!(5_u128.to_base(2), "101");
    }

    #[test]
    fn base64_is_url_safe() {
        let out = to_base64([0xfb, 0xff]);

        assert!(!out.contains(['+', '/', '=']));
    }
}
