//! Property tests for the record layout compiler.

use proptest::prelude::*;
use recircuit_layout::{
    packed_record, FieldDef, FieldValue, LayoutError, PackedRecord, ScalarType, Schema,
};

packed_record! {
    struct Narrow {
        low: u8 => packed(5),
        mid: u16 => packed(11),
        high: u32 => packed(23),
        tail: u8 => packed(1),
    }
}

fn scalar_for(bits: u32) -> ScalarType {
    match bits {
        1..=8 => ScalarType::U8,
        9..=16 => ScalarType::U16,
        _ => ScalarType::U32,
    }
}

fn widths_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..=32, 1..12)
}

fn schema_for(widths: &[u32]) -> Schema {
    widths
        .iter()
        .enumerate()
        .fold(Schema::builder("Generated"), |schema, (i, &w)| {
            schema.field(FieldDef::packed(format!("f{i}"), scalar_for(w), w))
        })
}

proptest! {
    // Size is the declared bit sum rounded up to whole bytes.
    #[test]
    fn size_is_ceiling_of_bit_sum(widths in widths_strategy()) {
        let layout = schema_for(&widths).compile().unwrap();
        let bits: u32 = widths.iter().sum();
        prop_assert_eq!(layout.total_bits, bits);
        prop_assert_eq!(layout.size_bytes, bits.div_ceil(8) as usize);
    }

    // Any in-range assignment reads back unchanged.
    #[test]
    fn in_range_values_round_trip(widths in widths_strategy(), seed in any::<u64>()) {
        let layout = schema_for(&widths).compile().unwrap();
        let values: Vec<FieldValue> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let mixed = seed.rotate_left(i as u32 * 7) ^ (i as u64);
                FieldValue::Uint(mixed & ((1u64 << w) - 1))
            })
            .collect();
        let bytes = layout.encode(&values).unwrap();
        prop_assert_eq!(layout.decode(&bytes).unwrap(), values);
    }

    // Construction succeeds exactly when v < 2^b.
    #[test]
    fn construction_succeeds_iff_value_fits(bits in 1u32..=31, value in any::<u32>()) {
        let layout = Schema::builder("One")
            .field(FieldDef::packed("v", ScalarType::U32, bits))
            .compile()
            .unwrap();
        let fits = u64::from(value) < (1u64 << bits);
        let result = layout.encode(&[FieldValue::Uint(u64::from(value))]);
        prop_assert_eq!(result.is_ok(), fits);
    }

    // The generated type agrees with the dynamic encoder byte for byte.
    #[test]
    fn generated_record_matches_dynamic_layout(
        low in 0u8..32,
        mid in 0u16..2048,
        high in 0u32..(1 << 23),
        tail in 0u8..2,
    ) {
        let record = Narrow::new(low, mid, high, tail).unwrap();
        prop_assert_eq!(record.low(), low);
        prop_assert_eq!(record.mid(), mid);
        prop_assert_eq!(record.high(), high);
        prop_assert_eq!(record.tail(), tail);

        let dynamic = Narrow::layout().unwrap().encode(&[
            FieldValue::Uint(low.into()),
            FieldValue::Uint(mid.into()),
            FieldValue::Uint(high.into()),
            FieldValue::Uint(tail.into()),
        ]).unwrap();
        prop_assert_eq!(record.as_bytes(), dynamic.as_slice());
    }
}

#[test]
fn value_equal_to_two_pow_width_fails() {
    for (bits, value) in [(5u32, 32u64), (11, 2048), (23, 1 << 23), (1, 2)] {
        let layout = Schema::builder("Edge")
            .field(FieldDef::packed("v", scalar_for(bits), bits))
            .compile()
            .unwrap();
        assert!(
            matches!(
                layout.encode(&[FieldValue::Uint(value)]),
                Err(LayoutError::ValueOutOfRange { .. })
            ),
            "{value} should not fit in {bits} bits"
        );
    }

    assert!(Narrow::new(32, 0, 0, 0).is_err());
    assert!(Narrow::new(0, 2048, 0, 0).is_err());
    assert!(Narrow::new(0, 0, 1 << 23, 0).is_err());
    assert!(Narrow::new(0, 0, 0, 2).is_err());
}

#[test]
fn generated_size_is_five_bytes() {
    assert_eq!(Narrow::TOTAL_BITS, 40);
    assert_eq!(std::mem::size_of::<Narrow>(), 5);
}
