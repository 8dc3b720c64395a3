//! Equality Kernel
//!
//! Structural difference checks used by `writable` (dedup-on-write) and
//! `gate` (change filtering).
//!
//! # Identity
//!
//! A shallow check compares the *top level* of a value structurally and
//! every nested element by identity. In Rust, identity only exists where
//! data is shared: an `Arc<T>` is identical to another `Arc<T>` iff both
//! point at the same allocation. Owned values have no separate identity and
//! are compared by value wherever identity is asked for.
//!
//! So for `Vec<Arc<Person>>` a shallow check looks at the pointers while a
//! deep check looks inside each `Person`; for `Vec<Vec<i32>>` the two agree.
//!
//! # Temporal values
//!
//! `SystemTime` is a leaf compared by the instant it denotes. That is the
//! only special-cased value type.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use serde_json::Value;

/// A value that can be compared for change.
///
/// All three checks must be pure.
pub trait Structural {
    /// Identity comparison, used for nested elements during a shallow pass.
    fn same(&self, other: &Self) -> bool;

    /// Top level compared structurally, nested elements by [`same`](Structural::same).
    fn shallow_differs(&self, other: &Self) -> bool {
        !self.same(other)
    }

    /// Full structural comparison.
    fn deep_differs(&self, other: &Self) -> bool {
        !self.same(other)
    }
}

/// Shallow structural difference.
pub fn not_equal<T: Structural + ?Sized>(a: &T, b: &T) -> bool {
    a.shallow_differs(b)
}

/// Deep structural difference.
pub fn not_equal_deep<T: Structural + ?Sized>(a: &T, b: &T) -> bool {
    a.deep_differs(b)
}

/// Register `PartialEq` types as leaf values for the equality kernel.
///
/// ```
/// #[derive(Clone, PartialEq)]
/// struct Celsius(f64);
/// ripple_core::structural_leaf!(Celsius);
///
/// assert!(ripple_core::not_equal(&Celsius(1.0), &Celsius(2.0)));
/// ```
#[macro_export]
macro_rules! structural_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Structural for $ty {
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

structural_leaf!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    str, String, Duration, SystemTime,
);

fn seq_shallow<'a, T: Structural + 'a>(
    a: impl ExactSizeIterator<Item = &'a T>,
    b: impl ExactSizeIterator<Item = &'a T>,
) -> bool {
    a.len() != b.len() || a.zip(b).any(|(x, y)| !x.same(y))
}

fn seq_deep<'a, T: Structural + 'a>(
    a: impl ExactSizeIterator<Item = &'a T>,
    b: impl ExactSizeIterator<Item = &'a T>,
) -> bool {
    a.len() != b.len() || a.zip(b).any(|(x, y)| x.deep_differs(y))
}

impl<T: Structural> Structural for [T] {
    fn same(&self, other: &Self) -> bool {
        !self.deep_differs(other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        seq_shallow(self.iter(), other.iter())
    }

    fn deep_differs(&self, other: &Self) -> bool {
        seq_deep(self.iter(), other.iter())
    }
}

impl<T: Structural> Structural for Vec<T> {
    fn same(&self, other: &Self) -> bool {
        self.as_slice().same(other.as_slice())
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        self.as_slice().shallow_differs(other.as_slice())
    }

    fn deep_differs(&self, other: &Self) -> bool {
        self.as_slice().deep_differs(other.as_slice())
    }
}

impl<T: Structural> Structural for VecDeque<T> {
    fn same(&self, other: &Self) -> bool {
        !self.deep_differs(other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        seq_shallow(self.iter(), other.iter())
    }

    fn deep_differs(&self, other: &Self) -> bool {
        seq_deep(self.iter(), other.iter())
    }
}

impl<T: Structural> Structural for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        }
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => false,
            (Some(a), Some(b)) => a.shallow_differs(b),
            _ => true,
        }
    }

    fn deep_differs(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => false,
            (Some(a), Some(b)) => a.deep_differs(b),
            _ => true,
        }
    }
}

impl<T: Structural + ?Sized> Structural for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        !Arc::ptr_eq(self, other) && (**self).shallow_differs(&**other)
    }

    fn deep_differs(&self, other: &Self) -> bool {
        !Arc::ptr_eq(self, other) && (**self).deep_differs(&**other)
    }
}

impl<T: Structural + ?Sized> Structural for &T {
    fn same(&self, other: &Self) -> bool {
        (**self).same(*other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        (**self).shallow_differs(*other)
    }

    fn deep_differs(&self, other: &Self) -> bool {
        (**self).deep_differs(*other)
    }
}

// Records: key count first, then every key of `a` looked up in `b`.
fn record_differs<'a, K: 'a, V: Structural + 'a>(
    len_a: usize,
    len_b: usize,
    mut entries: impl Iterator<Item = (&'a K, &'a V)>,
    lookup: impl Fn(&K) -> Option<&'a V>,
    differs: impl Fn(&V, &V) -> bool,
) -> bool {
    len_a != len_b || entries.any(|(k, v)| lookup(k).map_or(true, |w| differs(v, w)))
}

impl<K: Eq + Hash, V: Structural, S: BuildHasher> Structural for HashMap<K, V, S> {
    fn same(&self, other: &Self) -> bool {
        !self.deep_differs(other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        record_differs(self.len(), other.len(), self.iter(), |k| other.get(k), |a, b| !a.same(b))
    }

    fn deep_differs(&self, other: &Self) -> bool {
        record_differs(self.len(), other.len(), self.iter(), |k| other.get(k), V::deep_differs)
    }
}

impl<K: Eq + Hash, V: Structural, S: BuildHasher> Structural for IndexMap<K, V, S> {
    fn same(&self, other: &Self) -> bool {
        !self.deep_differs(other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        record_differs(self.len(), other.len(), self.iter(), |k| other.get(k), |a, b| !a.same(b))
    }

    fn deep_differs(&self, other: &Self) -> bool {
        record_differs(self.len(), other.len(), self.iter(), |k| other.get(k), V::deep_differs)
    }
}

impl<K: Ord, V: Structural> Structural for BTreeMap<K, V> {
    fn same(&self, other: &Self) -> bool {
        !self.deep_differs(other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        record_differs(self.len(), other.len(), self.iter(), |k| other.get(k), |a, b| !a.same(b))
    }

    fn deep_differs(&self, other: &Self) -> bool {
        record_differs(self.len(), other.len(), self.iter(), |k| other.get(k), V::deep_differs)
    }
}

macro_rules! structural_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Structural),+> Structural for ($($name,)+) {
            fn same(&self, other: &Self) -> bool {
                !self.deep_differs(other)
            }

            fn shallow_differs(&self, other: &Self) -> bool {
                $(!self.$idx.same(&other.$idx))||+
            }

            fn deep_differs(&self, other: &Self) -> bool {
                $(self.$idx.deep_differs(&other.$idx))||+
            }
        }
    };
}

structural_tuple!(A: 0);
structural_tuple!(A: 0, B: 1);
structural_tuple!(A: 0, B: 1, C: 2);
structural_tuple!(A: 0, B: 1, C: 2, D: 3);

/// The dynamic "any shape" value: arrays and objects behave like `Vec` and
/// records, everything else is a leaf.
impl Structural for Value {
    fn same(&self, other: &Self) -> bool {
        !self.deep_differs(other)
    }

    fn shallow_differs(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.shallow_differs(b),
            (Value::Object(a), Value::Object(b)) => {
                record_differs(a.len(), b.len(), a.iter(), |k| b.get(k), |x, y| !x.same(y))
            }
            _ => self != other,
        }
    }

    fn deep_differs(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.deep_differs(b),
            (Value::Object(a), Value::Object(b)) => {
                record_differs(a.len(), b.len(), a.iter(), |k| b.get(k), Value::deep_differs)
            }
            _ => self != other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Record = Arc<BTreeMap<&'static str, Arc<Value>>>;

    fn person(name: &str, pet: Arc<Value>) -> Record {
        Arc::new(BTreeMap::from([("name", Arc::new(json!(name))), ("pet", pet)]))
    }

    #[test]
    fn shallow_primitives() {
        assert!(not_equal(&None, &Some(1)));
        assert!(not_equal("a", "b"));
        assert!(not_equal(&1, &2));
        assert!(!not_equal(&1.5, &1.5));
        assert!(not_equal(&f64::NAN, &f64::NAN));
    }

    #[test]
    fn shallow_sequences() {
        let empty: Vec<i32> = Vec::new();
        assert!(!not_equal(&empty, &Vec::new()));
        assert!(!not_equal(&vec!["a"], &vec!["a"]));

        let p = Arc::new(json!({ "nam": "dog", "age": "human", "skills": 0 }));
        assert!(!not_equal(&vec![p.clone()], &vec![p.clone()]));
        assert!(not_equal(&Vec::new(), &vec![p]));
    }

    #[test]
    fn shallow_records() {
        let a = json!({ "a": 1 });
        assert!(not_equal(&json!({}), &Value::Null));
        assert!(!not_equal(&json!({}), &json!({})));
        assert!(!not_equal(&a, &a));
        assert!(!not_equal(&a, &json!({ "a": 1 })));
        assert!(not_equal(&a, &json!({ "a": 1, "b": 2 })));

        let left = HashMap::from([("x", 1), ("y", 2)]);
        let right = HashMap::from([("y", 2), ("x", 1)]);
        assert!(!not_equal(&left, &right));
        assert!(not_equal(&left, &HashMap::from([("x", 1), ("z", 2)])));
    }

    #[test]
    fn deep_sees_through_identity() {
        let loading = Arc::new(json!({ "state": "loading" }));
        let billy = Arc::new(json!({ "name": "billy", "type": "iguana" }));

        let a = vec![person("alice", loading)];
        let b = vec![person("alice", billy.clone())];
        assert!(not_equal(&a, &b), "children have different identities");
        assert!(not_equal_deep(&a, &b), "differences in children detected");

        // alice steals b's pet
        let a = vec![person("alice", billy.clone())];
        assert!(not_equal(&a, &b), "children still have different identities");
        assert!(!not_equal_deep(&a, &b), "equality in children detected");

        let c = vec![person("alice", Arc::new(json!({ "name": "billy", "type": "iguana" })))];
        assert!(!not_equal_deep(&b, &c), "detects deep equalities");

        let d = b.clone();
        assert!(!not_equal(&d, &b), "shallow identity equality");
        assert!(!not_equal_deep(&d, &b), "deep check has same result");
    }

    #[test]
    fn system_time_compares_instants() {
        let now = SystemTime::now();
        let later = now + Duration::from_secs(1);
        assert!(!not_equal(&now, &now.clone()));
        assert!(not_equal(&now, &later));
    }

    #[test]
    fn tuples_compare_fieldwise() {
        let shared = Arc::new(vec![1, 2]);
        assert!(!not_equal(&(1, shared.clone()), &(1, shared.clone())));
        assert!(not_equal(&(1, shared.clone()), &(1, Arc::new(vec![1, 2]))));
        assert!(!not_equal_deep(&(1, shared), &(1, Arc::new(vec![1, 2]))));
    }
}
