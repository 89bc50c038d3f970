//! The `packed_record!` generator.

/// Generate a fixed-layout record type from a field list.
///
/// Each field is either `name: Type => packed(bits)` for an unsigned integer
/// stored in exactly `bits` bits, or `name: Type => natural` for a value
/// stored at its full [`PackedValue::BITS`](crate::PackedValue::BITS) width.
/// Fields are laid out back to back in declaration order.
///
/// The generated type:
/// - wraps `[u8; N]` with `N = ceil(sum(bits) / 8)`, asserted at build time,
/// - has `new`, taking one value per field in order and rejecting any
///   packed value that is not strictly below `2^bits`,
/// - has one accessor per field,
/// - implements [`PackedRecord`](crate::PackedRecord) and
///   [`PackedValue`](crate::PackedValue), so records nest inside records.
///
/// A packed field wider than its type, or a duplicated field name, fails to
/// compile.
///
/// ```
/// use recircuit_layout::packed_record;
///
/// packed_record! {
///     /// A three-field header.
///     pub struct Header {
///         kind: u8 => packed(3),
///         length: u16 => packed(13),
///         scale: f32 => natural,
///     }
/// }
///
/// let header = Header::new(5, 4000, 0.5).unwrap();
/// assert_eq!(Header::SIZE_BYTES, 6);
/// assert_eq!(header.length(), 4000);
/// assert_eq!(header.scale(), 0.5);
/// assert!(Header::new(8, 0, 0.0).is_err());
/// ```
#[macro_export]
macro_rules! packed_record {
    (@width $fty:ty, packed($width:expr)) => {
        $width
    };
    (@width $fty:ty, natural) => {
        <$fty as $crate::PackedValue>::BITS
    };

    (@check_width $field:ident, $fty:ty, packed($width:expr)) => {
        assert!(
            $width > 0 && $width <= <$fty as $crate::PackedValue>::BITS,
            concat!(
                "packed field `",
                stringify!($field),
                "` must be between 1 bit and its type's width"
            )
        );
    };
    (@check_width $field:ident, $fty:ty, natural) => {};

    (@pack $record:ident, $buf:ident, $offset:ident, $field:ident, $fty:ty, packed($width:expr)) => {{
        let raw = $crate::PackedUint::to_u64($field);
        if !$crate::bits::fits(raw, $width) {
            return ::core::result::Result::Err($crate::LayoutError::ValueOutOfRange {
                record: ::std::string::String::from(stringify!($record)),
                field: ::std::string::String::from(stringify!($field)),
                value: raw,
                bit_width: $width,
            });
        }
        $crate::bits::write_bits(&mut $buf, $offset, $width, raw);
    }};
    (@pack $record:ident, $buf:ident, $offset:ident, $field:ident, $fty:ty, natural) => {
        $crate::PackedValue::pack_into(&$field, &mut $buf, $offset)
    };

    (@unpack $bytes:expr, $offset:expr, $fty:ty, packed($width:expr)) => {
        <$fty as $crate::PackedUint>::from_u64_truncating($crate::bits::read_bits(
            &$bytes, $offset, $width,
        ))
    };
    (@unpack $bytes:expr, $offset:expr, $fty:ty, natural) => {
        <$fty as $crate::PackedValue>::unpack_from(&$bytes, $offset)
    };

    (@field_def $field:ident, $fty:ty, packed($width:expr)) => {
        $crate::FieldDef::packed(
            stringify!($field),
            <$fty as $crate::PackedValue>::scalar_type(),
            $width,
        )
    };
    (@field_def $field:ident, $fty:ty, natural) => {
        $crate::FieldDef::natural(
            stringify!($field),
            <$fty as $crate::PackedValue>::scalar_type(),
        )
    };

    (@accessors [$offset:expr]) => {};
    (@accessors [$offset:expr]
        $(#[$fmeta:meta])*
        $field:ident : $fty:ty => $kind:ident $(($width:expr))?
        $(, $($rest:tt)*)?
    ) => {
        $(#[$fmeta])*
        #[inline]
        pub fn $field(&self) -> $fty {
            $crate::packed_record!(@unpack self.bytes, $offset, $fty, $kind $(($width))?)
        }

        $crate::packed_record!(
            @accessors [$offset + $crate::packed_record!(@width $fty, $kind $(($width))?)]
            $($($rest)*)?
        );
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $fty:ty => $kind:ident $(($width:expr))?
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name {
            bytes: [u8; $crate::bits::bytes_for_bits(
                0 $(+ $crate::packed_record!(@width $fty, $kind $(($width))?))+
            )],
        }

        impl $name {
            /// Number of fields in the schema.
            pub const FIELD_COUNT: usize = [$(stringify!($field)),+].len();
            /// Sum of the field widths.
            pub const TOTAL_BITS: u32 =
                0 $(+ $crate::packed_record!(@width $fty, $kind $(($width))?))+;
            /// `TOTAL_BITS` rounded up to whole bytes.
            pub const SIZE_BYTES: usize = $crate::bits::bytes_for_bits($name::TOTAL_BITS);

            /// Build a record from one value per field, in declaration order.
            #[allow(clippy::too_many_arguments)]
            pub fn new($($field: $fty),+) -> ::core::result::Result<Self, $crate::LayoutError> {
                let mut bytes = [0u8; $name::SIZE_BYTES];
                let mut offset: u32 = 0;
                $(
                    $crate::packed_record!(@pack $name, bytes, offset, $field, $fty, $kind $(($width))?);
                    offset += $crate::packed_record!(@width $fty, $kind $(($width))?);
                )+
                let _ = offset;
                ::core::result::Result::Ok(Self { bytes })
            }

            /// The record's raw bytes.
            pub fn as_bytes(&self) -> &[u8] {
                &self.bytes
            }

            $crate::packed_record!(
                @accessors [0u32]
                $( $(#[$fmeta])* $field : $fty => $kind $(($width))? ),+
            );
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(stringify!($name))
                    $(.field(stringify!($field), &self.$field()))+
                    .finish()
            }
        }

        // SAFETY: a transparent wrapper around `[u8; N]` has alignment 1, no
        // padding, and accepts every bit pattern.
        unsafe impl $crate::bytemuck::Zeroable for $name {}
        unsafe impl $crate::bytemuck::Pod for $name {}

        impl $crate::PackedValue for $name {
            const BITS: u32 = $name::TOTAL_BITS;

            fn scalar_type() -> $crate::ScalarType {
                $crate::ScalarType::composite(stringify!($name), $name::TOTAL_BITS)
            }

            fn pack_into(&self, buf: &mut [u8], bit_offset: u32) {
                $crate::bits::copy_bits_in(buf, bit_offset, &self.bytes, $name::TOTAL_BITS);
            }

            fn unpack_from(buf: &[u8], bit_offset: u32) -> Self {
                let mut bytes = [0u8; $name::SIZE_BYTES];
                $crate::bits::copy_bits_out(buf, bit_offset, $name::TOTAL_BITS, &mut bytes);
                Self { bytes }
            }
        }

        impl $crate::PackedRecord for $name {
            const NAME: &'static str = stringify!($name);
            const TOTAL_BITS: u32 = $name::TOTAL_BITS;
            const SIZE_BYTES: usize = $name::SIZE_BYTES;

            fn schema() -> $crate::Schema {
                $crate::Schema::new(
                    stringify!($name),
                    ::std::vec![
                        $($crate::packed_record!(@field_def $field, $fty, $kind $(($width))?)),+
                    ],
                )
            }
        }

        const _: () = {
            assert!(::core::mem::size_of::<$name>() == $name::SIZE_BYTES);
            assert!(::core::mem::align_of::<$name>() == 1);
            $( $crate::packed_record!(@check_width $field, $fty, $kind $(($width))?); )+
        };
    };
}

#[cfg(test)]
mod tests {
    use crate::{FieldValue, LayoutError, PackedRecord, PackedValue, ScalarType};

    crate::packed_record! {
        /// Mixed sub-byte and byte-aligned fields.
        struct Mixed {
            tag: u8 => packed(3),
            count: u16 => packed(10),
            index: u32 => packed(32),
            weight: f32 => natural,
        }
    }

    crate::packed_record! {
        struct Outer {
            flag: u8 => packed(1),
            inner: Mixed => natural,
        }
    }

    #[test]
    fn size_is_rounded_bit_sum() {
        assert_eq!(Mixed::TOTAL_BITS, 3 + 10 + 32 + 32);
        assert_eq!(Mixed::SIZE_BYTES, 10);
        assert_eq!(core::mem::size_of::<Mixed>(), 10);
        assert_eq!(Mixed::FIELD_COUNT, 4);
    }

    #[test]
    fn accessors_return_constructed_values() {
        let m = Mixed::new(5, 1000, 0xDEAD_BEEF, -3.5).unwrap();
        assert_eq!(m.tag(), 5);
        assert_eq!(m.count(), 1000);
        assert_eq!(m.index(), 0xDEAD_BEEF);
        assert_eq!(m.weight(), -3.5);
    }

    #[test]
    fn constructor_rejects_values_at_the_limit() {
        assert!(Mixed::new(7, 1023, u32::MAX, 0.0).is_ok());
        assert_eq!(
            Mixed::new(8, 0, 0, 0.0).unwrap_err(),
            LayoutError::ValueOutOfRange {
                record: "Mixed".into(),
                field: "tag".into(),
                value: 8,
                bit_width: 3,
            }
        );
        assert!(matches!(
            Mixed::new(0, 1024, 0, 0.0),
            Err(LayoutError::ValueOutOfRange { bit_width: 10, .. })
        ));
    }

    #[test]
    fn schema_compiles_to_the_generated_size() {
        let layout = Mixed::layout().unwrap();
        assert_eq!(layout.size_bytes, Mixed::SIZE_BYTES);
        assert_eq!(layout.total_bits, Mixed::TOTAL_BITS);
        assert_eq!(layout.field("index").unwrap().bit_offset, 13);
        assert_eq!(layout.field("weight").unwrap().scalar, ScalarType::F32);
    }

    #[test]
    fn generated_bytes_match_dynamic_encoding() {
        let m = Mixed::new(6, 513, 77, 1.25).unwrap();
        let dynamic = Mixed::layout()
            .unwrap()
            .encode(&[
                FieldValue::Uint(6),
                FieldValue::Uint(513),
                FieldValue::Uint(77),
                FieldValue::Float(1.25),
            ])
            .unwrap();
        assert_eq!(m.as_bytes(), dynamic.as_slice());
    }

    #[test]
    fn records_nest_at_unaligned_offsets() {
        let inner = Mixed::new(1, 2, 3, 4.0).unwrap();
        let outer = Outer::new(1, inner).unwrap();
        assert_eq!(Outer::TOTAL_BITS, 1 + Mixed::TOTAL_BITS);
        assert_eq!(outer.inner(), inner);
        assert_eq!(outer.flag(), 1);
        assert_eq!(
            <Mixed as PackedValue>::scalar_type(),
            ScalarType::composite("Mixed", 77)
        );
    }

    #[test]
    fn byte_views_round_trip() {
        let m = Mixed::new(2, 3, 4, 5.0).unwrap();
        let copy = Mixed::from_bytes(m.as_bytes()).unwrap();
        assert_eq!(copy, m);
        assert!(matches!(
            Mixed::from_bytes(&[0; 3]),
            Err(LayoutError::ByteLength { expected: 10, found: 3, .. })
        ));
    }

    #[test]
    fn debug_lists_fields() {
        let m = Mixed::new(1, 2, 3, 0.5).unwrap();
        let text = format!("{m:?}");
        assert!(text.starts_with("Mixed {"));
        assert!(text.contains("count: 2"));
    }
}
