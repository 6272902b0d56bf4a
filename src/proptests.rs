use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

fn validate_array<T: PartialEq + std::fmt::Debug>(a: &SparseArray<T>, m: &BTreeMap<u32, T>) {
    assert_eq!(a.len(), a.bitmap().count_ones() as usize);
    assert_eq!(a.len(), m.len(), "stored value count must match model");
    assert_eq!(a.values().len(), a.len());
    for slot in 0..MAX_SLOTS {
        let bit_set = a.bitmap() & (1u64 << slot) != 0;
        assert_eq!(a.get(slot).is_some(), bit_set, "slot {slot}");
        assert_eq!(a.get(slot), m.get(&slot), "slot {slot}");
    }
    let got: Vec<(u32, &T)> = a.iter().collect();
    let expected: Vec<(u32, &T)> = m.iter().map(|(k, v)| (*k, v)).collect();
    assert_eq!(got, expected);
}

fn parts_strategy() -> impl Strategy<Value = (u64, Vec<i64>)> {
    any::<u64>().prop_flat_map(|bitmap| {
        (
            Just(bitmap),
            prop::collection::vec(any::<i64>(), bitmap.count_ones() as usize),
        )
    })
}

fn model_of(bitmap: u64, values: &[i64]) -> BTreeMap<u32, i64> {
    Slots::new(bitmap).zip(values.iter().copied()).collect()
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Get(#[proptest(strategy = "0u32..64")] u32),
    Set(#[proptest(strategy = "0u32..64")] u32, i64),
    /// Clone, then diverge the clone so sharing would show.
    CloneAndDiverge(i64),
    /// Flip one slot's occupancy by rebuilding from parts.
    Toggle(#[proptest(strategy = "0u32..64")] u32, i64),
    TryGet(#[proptest(strategy = "0u32..80")] u32),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_round_trip((bitmap, values) in parts_strategy()) {
        let a = SparseArray::from_bitmap_and_values(bitmap, values.clone()).unwrap();
        prop_assert_eq!(a.len(), bitmap.count_ones() as usize);
        prop_assert_eq!(a.bitmap(), bitmap);
        prop_assert_eq!(a.values(), values.as_slice());
        validate_array(&a, &model_of(bitmap, &values));

        let (b2, v2) = a.into_parts();
        prop_assert_eq!(b2, bitmap);
        prop_assert_eq!(v2, values);
    }

    #[test]
    fn prop_wrong_count_rejected(bitmap in any::<u64>(), extra in 1usize..4, short in any::<bool>()) {
        let n = bitmap.count_ones() as usize;
        let count = if short { n.saturating_sub(extra) } else { n + extra };
        prop_assume!(count != n);
        let values: Vec<String> = (0..count).map(|i| i.to_string()).collect();
        let err = SparseArray::from_bitmap_and_values(bitmap, values).unwrap_err();
        prop_assert_eq!(err, SparseArrayError::LengthMismatch { expected: n, actual: count });
    }

    #[test]
    fn prop_equivalence(init in parts_strategy(), ops in prop::collection::vec(any::<Op>(), 0..=200)) {
        let (bitmap, values) = init;
        let mut m = model_of(bitmap, &values);
        let mut a = SparseArray::from_bitmap_and_values(bitmap, values).unwrap();

        for op in ops {
            match op {
                Op::Get(slot) => {
                    prop_assert_eq!(a.get(slot), m.get(&slot));
                }
                Op::Set(slot, value) => {
                    let got = a.get_mut(slot).map(|v| { *v = value; });
                    let expected = m.get_mut(&slot).map(|v| { *v = value; });
                    prop_assert_eq!(got, expected);
                }
                Op::CloneAndDiverge(value) => {
                    let mut c = a.clone();
                    prop_assert_eq!(&c, &a);
                    for v in c.values_mut() {
                        *v = v.wrapping_add(value) ^ 1;
                    }
                    validate_array(&a, &m);
                }
                Op::Toggle(slot, value) => {
                    let (bitmap, mut values) = a.into_parts();
                    let idx = (bitmap & ((1u64 << slot) - 1)).count_ones() as usize;
                    if bitmap & (1u64 << slot) != 0 {
                        values.remove(idx);
                        m.remove(&slot);
                    } else {
                        values.insert(idx, value);
                        m.insert(slot, value);
                    }
                    a = SparseArray::from_bitmap_and_values(bitmap ^ (1u64 << slot), values).unwrap();
                }
                Op::TryGet(slot) => {
                    if slot < MAX_SLOTS {
                        prop_assert_eq!(a.try_get(slot), Ok(m.get(&slot)));
                    } else {
                        prop_assert_eq!(a.try_get(slot), Err(SparseArrayError::SlotOutOfRange { slot }));
                    }
                }
            }

            prop_assert_eq!(a.len(), m.len());
        }

        validate_array(&a, &m);
    }

    #[test]
    fn prop_clone_owned_values_independent((bitmap, values) in parts_strategy()) {
        let strings: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let a = SparseArray::from_bitmap_and_values(bitmap, strings.clone()).unwrap();
        let mut b = a.clone();
        for s in b.values_mut() {
            s.push('!');
        }
        prop_assert_eq!(a.values(), strings.as_slice());
        for (x, y) in a.values().iter().zip(b.values()) {
            prop_assert_eq!(format!("{x}!"), y.as_str());
        }
    }
}

#[test]
fn exhaustive_single_and_pair_slots() {
    for i in 0..MAX_SLOTS {
        for j in i..MAX_SLOTS {
            let bitmap = (1u64 << i) | (1u64 << j);
            let values: Vec<u32> = Slots::new(bitmap).map(|s| s * 10).collect();
            let a = SparseArray::from_bitmap_and_values(bitmap, values.clone()).unwrap();
            let m = model_of(bitmap, &values.iter().map(|&v| v as i64).collect::<Vec<_>>());
            assert_eq!(a.len(), m.len());
            for slot in 0..MAX_SLOTS {
                assert_eq!(a.get(slot).map(|&v| v as i64), m.get(&slot).copied());
                assert_eq!(
                    a.physical_index(slot),
                    (bitmap & (1u64 << slot) != 0)
                        .then(|| (bitmap & ((1u64 << slot) - 1)).count_ones() as usize)
                );
            }
        }
    }
}
