use std::{
    cmp::Ordering,
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};

use imbl::Vector;

use crate::{Error, Position};

/// A canonical hash of a [`Value`], invariant under permutation of set
/// elements and of function/record domain ordering.
///
/// Fingerprints are the sole basis for value equality and for set/state
/// de-duplication; the evaluator must never compare values structurally,
/// since [`Value::Set`] and [`Value::FcnRcd`] have unspecified internal
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Fingerprint {
    /// Wraps a raw hash value, for callers outside this module (such as
    /// [`crate::State::fingerprint`]) that hash their own composite keys.
    pub(crate) fn from_hash(h: u64) -> Self {
        Fingerprint(h)
    }
}

/// The TLA+ value universe supported by this interpreter.
///
/// NOTE: [`Value::Set`], [`Value::Tuple`] and [`Value::FcnRcd`] are built on
/// [`imbl`]'s persistent vector so that forking a [`crate::Context`] during
/// disjunctive evaluation shares structure rather than deep-copying.
#[derive(Debug, Clone)]
pub enum Value {
    /// A signed integer.
    Int(i64),
    /// A boolean.
    Bool(bool),
    /// A string, also used as a record field key.
    Str(String),
    /// A set, stored de-duplicated by fingerprint. Element order is
    /// unspecified but stable for the lifetime of the value.
    Set(Vector<Value>),
    /// An ordered, 1-indexed sequence of values.
    Tuple(Vector<Value>),
    /// A function or record: parallel domain/range sequences.
    ///
    /// Records are the special case where every domain element is a
    /// [`Value::Str`]; `is_record` additionally distinguishes a record from
    /// a function that merely happens to have an all-string domain, so that
    /// ITF serialization can tell them apart.
    FcnRcd {
        /// Domain elements, in construction order.
        domain: Vector<Value>,
        /// Range elements, index-aligned with `domain`.
        range: Vector<Value>,
        /// Whether this value was constructed as a record literal.
        is_record: bool,
    },
}

impl Value {
    /// The two-element set `{TRUE, FALSE}`, i.e. the `BOOLEAN` constant.
    pub fn boolean_set() -> Self {
        Value::Set(Vector::from(vec![Value::Bool(true), Value::Bool(false)]))
    }

    /// Construct a set from `elems`, removing duplicates by fingerprint.
    pub fn set(elems: impl IntoIterator<Item = Value>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vector::new();
        for e in elems {
            if seen.insert(e.fingerprint()) {
                out.push_back(e);
            }
        }
        Value::Set(out)
    }

    /// Construct a tuple from `elems` in order.
    pub fn tuple(elems: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(elems.into_iter().collect())
    }

    /// Construct a record from `fields`, preserving insertion order.
    pub fn record(fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        let (domain, range) = fields
            .into_iter()
            .map(|(k, v)| (Value::Str(k), v))
            .unzip();
        Value::FcnRcd {
            domain,
            range,
            is_record: true,
        }
    }

    /// Construct a function from parallel `domain` and `range` sequences.
    ///
    /// The domain is de-duplicated by fingerprint, keeping the first
    /// occurrence's range value.
    pub fn function(domain: Vector<Value>, range: Vector<Value>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut d = Vector::new();
        let mut r = Vector::new();
        for (k, v) in domain.into_iter().zip(range) {
            if seen.insert(k.fingerprint()) {
                d.push_back(k);
                r.push_back(v);
            }
        }
        let is_record = !d.is_empty() && d.iter().all(|v| matches!(v, Value::Str(_)));
        Value::FcnRcd {
            domain: d,
            range: r,
            is_record,
        }
    }

    /// The interpreter's type name for `self`, used in [`Error::TypeMismatch`].
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "Str",
            Value::Set(_) => "Set",
            Value::Tuple(_) => "Tuple",
            Value::FcnRcd { is_record: true, .. } => "Record",
            Value::FcnRcd { is_record: false, .. } => "Function",
        }
    }

    /// Returns the inner integer, or a [`Error::TypeMismatch`].
    pub fn as_int(&self, at: Position) -> Result<i64, Error> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(Error::TypeMismatch {
                expected: "Int",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// Returns the inner boolean, or a [`Error::TypeMismatch`].
    pub fn as_bool(&self, at: Position) -> Result<bool, Error> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::TypeMismatch {
                expected: "Bool",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// Returns the elements of a [`Value::Set`], or a [`Error::TypeMismatch`].
    pub fn as_set(&self, at: Position) -> Result<&Vector<Value>, Error> {
        match self {
            Value::Set(s) => Ok(s),
            other => Err(Error::TypeMismatch {
                expected: "Set",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// Returns the elements of a [`Value::Tuple`], or a [`Error::TypeMismatch`].
    pub fn as_tuple(&self, at: Position) -> Result<&Vector<Value>, Error> {
        match self {
            Value::Tuple(t) => Ok(t),
            other => Err(Error::TypeMismatch {
                expected: "Tuple",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// The elements of `self`, ordered by fingerprint, for deterministic
    /// iteration (used by `CHOOSE` and bounded quantifiers).
    pub fn sorted_elems(&self, at: Position) -> Result<Vec<&Value>, Error> {
        let set = self.as_set(at)?;
        let mut out: Vec<&Value> = set.iter().collect();
        out.sort_by_key(|v| v.fingerprint());
        Ok(out)
    }

    /// `Cardinality(self)`.
    pub fn cardinality(&self, at: Position) -> Result<i64, Error> {
        Ok(self.as_set(at)?.len() as i64)
    }

    /// `self \cup other`.
    pub fn union(&self, other: &Value, at: Position) -> Result<Value, Error> {
        let a = self.as_set(at)?;
        let b = other.as_set(at)?;
        Ok(Value::set(a.iter().chain(b.iter()).cloned()))
    }

    /// `self \cap other`.
    pub fn intersection(&self, other: &Value, at: Position) -> Result<Value, Error> {
        let a = self.as_set(at)?;
        let b = other.as_set(at)?;
        let b_fps: std::collections::HashSet<_> = b.iter().map(Value::fingerprint).collect();
        Ok(Value::set(
            a.iter().filter(|v| b_fps.contains(&v.fingerprint())).cloned(),
        ))
    }

    /// `self \ other`.
    pub fn difference(&self, other: &Value, at: Position) -> Result<Value, Error> {
        let a = self.as_set(at)?;
        let b = other.as_set(at)?;
        let b_fps: std::collections::HashSet<_> = b.iter().map(Value::fingerprint).collect();
        Ok(Value::set(
            a.iter().filter(|v| !b_fps.contains(&v.fingerprint())).cloned(),
        ))
    }

    /// `self \X other`: the cartesian product, as a set of 2-tuples.
    pub fn cartesian(&self, other: &Value, at: Position) -> Result<Value, Error> {
        let a = self.as_set(at)?;
        let b = other.as_set(at)?;
        let mut out = Vec::with_capacity(a.len() * b.len());
        for x in a {
            for y in b {
                out.push(Value::tuple([x.clone(), y.clone()]));
            }
        }
        Ok(Value::set(out))
    }

    /// `SUBSET self`, the powerset.
    pub fn powerset(&self, at: Position) -> Result<Value, Error> {
        let elems: Vec<&Value> = self.as_set(at)?.iter().collect();
        let mut subsets = vec![Vec::new()];
        for e in &elems {
            let mut grown: Vec<Vec<Value>> = Vec::with_capacity(subsets.len() * 2);
            for s in &subsets {
                grown.push(s.clone());
                let mut with_e = s.clone();
                with_e.push((*e).clone());
                grown.push(with_e);
            }
            subsets = grown;
        }
        Ok(Value::set(subsets.into_iter().map(Value::tuple_as_set)))
    }

    fn tuple_as_set(elems: Vec<Value>) -> Value {
        Value::set(elems)
    }

    /// The domain of a function, tuple, or record.
    pub fn domain(&self, at: Position) -> Result<Value, Error> {
        match self {
            Value::FcnRcd { domain, .. } => Ok(Value::set(domain.iter().cloned())),
            Value::Tuple(t) => Ok(Value::set((1..=t.len() as i64).map(Value::Int))),
            other => Err(Error::TypeMismatch {
                expected: "Function, Tuple or Record",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// `self[arg]`, fingerprint-matching `arg` against the domain.
    pub fn apply(&self, arg: &Value, at: Position) -> Result<Value, Error> {
        match self {
            Value::FcnRcd { domain, range, .. } => {
                let fp = arg.fingerprint();
                domain
                    .iter()
                    .position(|d| d.fingerprint() == fp)
                    .map(|i| range[i].clone())
                    .ok_or_else(|| Error::DomainError {
                        arg: arg.to_tla_string(),
                        at,
                    })
            }
            Value::Tuple(t) => {
                let idx = arg.as_int(at)?;
                usize::try_from(idx - 1)
                    .ok()
                    .and_then(|i| t.get(i).cloned())
                    .ok_or_else(|| Error::DomainError {
                        arg: arg.to_tla_string(),
                        at,
                    })
            }
            other => Err(Error::TypeMismatch {
                expected: "Function, Tuple or Record",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// `self[args[0]][args[1]]...`, applying each argument in turn.
    pub fn apply_path(&self, args: &[Value], at: Position) -> Result<Value, Error> {
        let mut cur = self.clone();
        for a in args {
            cur = cur.apply(a, at)?;
        }
        Ok(cur)
    }

    /// Returns a new value equal to `self` except that `arg` now maps to `v`.
    ///
    /// If `arg` is not already in the domain it is appended (this matches
    /// `EXCEPT`'s semantics for functions; record literals always have their
    /// full domain established at construction).
    pub fn update(&self, arg: &Value, v: Value, at: Position) -> Result<Value, Error> {
        match self {
            Value::FcnRcd {
                domain,
                range,
                is_record,
            } => {
                let fp = arg.fingerprint();
                match domain.iter().position(|d| d.fingerprint() == fp) {
                    Some(i) => {
                        let mut range = range.clone();
                        range[i] = v;
                        Ok(Value::FcnRcd {
                            domain: domain.clone(),
                            range,
                            is_record: *is_record,
                        })
                    }
                    None => {
                        let mut domain = domain.clone();
                        let mut range = range.clone();
                        domain.push_back(arg.clone());
                        range.push_back(v);
                        Ok(Value::FcnRcd {
                            domain,
                            range,
                            is_record: *is_record,
                        })
                    }
                }
            }
            Value::Tuple(t) => {
                let idx = arg.as_int(at)?;
                let i = usize::try_from(idx - 1).map_err(|_| Error::DomainError {
                    arg: arg.to_tla_string(),
                    at,
                })?;
                if i >= t.len() {
                    return Err(Error::DomainError {
                        arg: arg.to_tla_string(),
                        at,
                    });
                }
                let mut t = t.clone();
                t[i] = v;
                Ok(Value::Tuple(t))
            }
            other => Err(Error::TypeMismatch {
                expected: "Function, Tuple or Record",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// Nested `EXCEPT` update along `args`, applying `f` to the value
    /// currently at that path before writing it back.
    pub fn update_path(
        &self,
        args: &[Value],
        f: impl FnOnce(&Value) -> Result<Value, Error>,
        at: Position,
    ) -> Result<Value, Error> {
        match args.split_first() {
            None => f(self),
            Some((head, rest)) => {
                let child = self.apply(head, at)?;
                let updated = child.update_path(rest, f, at)?;
                self.update(head, updated, at)
            }
        }
    }

    /// `self @@ other`: domain-union, `self`'s values win on overlap.
    pub fn compose(&self, other: &Value, at: Position) -> Result<Value, Error> {
        let (sd, sr) = match self {
            Value::FcnRcd { domain, range, .. } => (domain.clone(), range.clone()),
            other => {
                return Err(Error::TypeMismatch {
                    expected: "Function or Record",
                    got: other.type_name(),
                    at,
                })
            }
        };
        let (od, or) = match other {
            Value::FcnRcd { domain, range, .. } => (domain.clone(), range.clone()),
            other => {
                return Err(Error::TypeMismatch {
                    expected: "Function or Record",
                    got: other.type_name(),
                    at,
                })
            }
        };
        let seen: std::collections::HashSet<_> = sd.iter().map(Value::fingerprint).collect();
        let mut domain = sd;
        let mut range = sr;
        for (k, v) in od.into_iter().zip(or) {
            if !seen.contains(&k.fingerprint()) {
                domain.push_back(k);
                range.push_back(v);
            }
        }
        let is_record = !domain.is_empty() && domain.iter().all(|v| matches!(v, Value::Str(_)));
        Ok(Value::FcnRcd {
            domain,
            range,
            is_record,
        })
    }

    /// `Len(self)`, for a [`Value::Tuple`] or an integral-domain function.
    pub fn len(&self, at: Position) -> Result<i64, Error> {
        Ok(self.as_sequence(at)?.len() as i64)
    }

    /// `Head(self)`.
    pub fn head(&self, at: Position) -> Result<Value, Error> {
        self.as_sequence(at)?
            .front()
            .cloned()
            .ok_or(Error::DomainError {
                arg: "Head of empty sequence".to_string(),
                at,
            })
    }

    /// `Tail(self)`.
    pub fn tail(&self, at: Position) -> Result<Value, Error> {
        let seq = self.as_sequence(at)?;
        if seq.is_empty() {
            return Err(Error::DomainError {
                arg: "Tail of empty sequence".to_string(),
                at,
            });
        }
        Ok(Value::Tuple(seq.skip(1)))
    }

    /// `Append(self, v)`.
    pub fn append(&self, v: Value, at: Position) -> Result<Value, Error> {
        let mut seq = self.as_sequence(at)?;
        seq.push_back(v);
        Ok(Value::Tuple(seq))
    }

    /// `self \o other`: sequence concatenation.
    pub fn concat(&self, other: &Value, at: Position) -> Result<Value, Error> {
        let mut a = self.as_sequence(at)?;
        let b = other.as_sequence(at)?;
        a.append(b);
        Ok(Value::Tuple(a))
    }

    /// Views `self` as a sequence, accepting either a [`Value::Tuple`] or a
    /// function whose domain is exactly `{1..n}`.
    fn as_sequence(&self, at: Position) -> Result<Vector<Value>, Error> {
        match self {
            Value::Tuple(t) => Ok(t.clone()),
            Value::FcnRcd { .. } => Ok(self.to_tuple(at)?.as_tuple(at)?.clone()),
            other => Err(Error::TypeMismatch {
                expected: "Tuple or Sequence",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// View a [`Value::Tuple`] as a function with domain `{1..n}`.
    pub fn to_fcn(&self, at: Position) -> Result<Value, Error> {
        let t = self.as_tuple(at)?;
        let domain = (1..=t.len() as i64).map(Value::Int).collect();
        Ok(Value::function(domain, t.clone()))
    }

    /// View a function with domain exactly `{1..n}` as a [`Value::Tuple`].
    pub fn to_tuple(&self, at: Position) -> Result<Value, Error> {
        match self {
            Value::Tuple(_) => Ok(self.clone()),
            Value::FcnRcd { domain, range, .. } => {
                let n = domain.len();
                let expect: Vec<i64> = (1..=n as i64).collect();
                let mut got: Vec<(i64, Value)> = domain
                    .iter()
                    .cloned()
                    .zip(range.iter().cloned())
                    .map(|(d, v)| match d {
                        Value::Int(i) => Ok((i, v)),
                        _ => Err(Error::TypeMismatch {
                            expected: "integral domain",
                            got: d.type_name(),
                            at,
                        }),
                    })
                    .collect::<Result<_, _>>()?;
                got.sort_by_key(|(i, _)| *i);
                let indices: Vec<i64> = got.iter().map(|(i, _)| *i).collect();
                if indices != expect {
                    return Err(Error::TypeMismatch {
                        expected: "domain {1..n}",
                        got: "sparse or non-integral domain",
                        at,
                    });
                }
                Ok(Value::Tuple(got.into_iter().map(|(_, v)| v).collect()))
            }
            other => Err(Error::TypeMismatch {
                expected: "Tuple or Function",
                got: other.type_name(),
                at,
            }),
        }
    }

    /// Integer ordering comparison; fails on non-integer operands.
    pub fn cmp_int(&self, other: &Value, at: Position) -> Result<Ordering, Error> {
        Ok(self.as_int(at)?.cmp(&other.as_int(at)?))
    }

    /// The canonical fingerprint for `self`.
    ///
    /// Sets hash the sorted multiset of child fingerprints; functions and
    /// records hash their (domain, range) pairs sorted by domain
    /// fingerprint, so two values that differ only in construction order
    /// fingerprint identically.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = DefaultHasher::new();
        self.hash_into(&mut h);
        Fingerprint(h.finish())
    }

    fn hash_into(&self, h: &mut DefaultHasher) {
        match self {
            Value::Int(n) => {
                0u8.hash(h);
                n.hash(h);
            }
            Value::Bool(b) => {
                1u8.hash(h);
                b.hash(h);
            }
            Value::Str(s) => {
                2u8.hash(h);
                s.hash(h);
            }
            Value::Set(elems) => {
                3u8.hash(h);
                let mut fps: Vec<u64> = elems.iter().map(|v| v.fingerprint().0).collect();
                fps.sort_unstable();
                fps.hash(h);
            }
            Value::Tuple(elems) => {
                4u8.hash(h);
                for e in elems {
                    e.fingerprint().0.hash(h);
                }
            }
            Value::FcnRcd {
                domain,
                range,
                is_record,
            } => {
                5u8.hash(h);
                is_record.hash(h);
                let mut pairs: Vec<(u64, u64)> = domain
                    .iter()
                    .zip(range.iter())
                    .map(|(d, r)| (d.fingerprint().0, r.fingerprint().0))
                    .collect();
                pairs.sort_unstable();
                pairs.hash(h);
            }
        }
    }

    /// Render `self` in TLA+ concrete syntax, used for error messages.
    pub fn to_tla_string(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Str(s) => format!("{s:?}"),
            Value::Set(elems) => {
                let inner: Vec<_> = elems.iter().map(Value::to_tla_string).collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Tuple(elems) => {
                let inner: Vec<_> = elems.iter().map(Value::to_tla_string).collect();
                format!("<<{}>>", inner.join(", "))
            }
            Value::FcnRcd {
                domain,
                range,
                is_record,
            } => {
                let inner: Vec<_> = domain
                    .iter()
                    .zip(range.iter())
                    .map(|(d, r)| {
                        if *is_record {
                            if let Value::Str(k) = d {
                                return format!("{k} |-> {}", r.to_tla_string());
                            }
                        }
                        format!("{} :> {}", d.to_tla_string(), r.to_tla_string())
                    })
                    .collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

impl PartialEq for Value {
    /// Value equality is always fingerprint equality; never a structural
    /// walk, since [`Value::Set`]/[`Value::FcnRcd`] child order is
    /// unspecified.
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

impl Eq for Value {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pos() -> Position {
        Position::default()
    }

    #[test]
    fn fingerprint_stable_under_clone() {
        let v = Value::set([Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(v.fingerprint(), v.clone().fingerprint());
    }

    #[test]
    fn set_union_is_commutative_by_fingerprint() {
        let a = Value::set([Value::Int(1), Value::Int(2)]);
        let b = Value::set([Value::Int(2), Value::Int(3)]);
        assert_eq!(
            a.union(&b, pos()).unwrap().fingerprint(),
            b.union(&a, pos()).unwrap().fingerprint()
        );
    }

    #[test]
    fn set_intersection_is_commutative_by_fingerprint() {
        let a = Value::set([Value::Int(1), Value::Int(2)]);
        let b = Value::set([Value::Int(2), Value::Int(3)]);
        assert_eq!(
            a.intersection(&b, pos()).unwrap().fingerprint(),
            b.intersection(&a, pos()).unwrap().fingerprint()
        );
    }

    #[test]
    fn set_construction_deduplicates_by_fingerprint() {
        let v = Value::set([Value::Int(1), Value::Int(1), Value::Int(2)]);
        assert_eq!(v.cardinality(pos()).unwrap(), 2);
    }

    #[test]
    fn set_is_permutation_invariant() {
        let a = Value::set([Value::Int(1), Value::Int(2), Value::Int(3)]);
        let b = Value::set([Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert_eq!(a, b);
    }

    #[test]
    fn function_update_with_own_value_is_idempotent() {
        let f = Value::function(
            Vector::from(vec![Value::Int(1), Value::Int(2)]),
            Vector::from(vec![Value::Int(10), Value::Int(20)]),
        );
        for d in [Value::Int(1), Value::Int(2)] {
            let applied = f.apply(&d, pos()).unwrap();
            let updated = f.update(&d, applied, pos()).unwrap();
            assert_eq!(updated.fingerprint(), f.fingerprint());
        }
    }

    #[test]
    fn tuple_round_trips_through_function_view() {
        let t = Value::tuple([Value::Int(1), Value::Int(2), Value::Int(3)]);
        let round_tripped = t.to_fcn(pos()).unwrap().to_tuple(pos()).unwrap();
        assert_eq!(round_tripped.fingerprint(), t.fingerprint());
    }

    #[test]
    fn record_field_order_does_not_affect_fingerprint() {
        let a = Value::record([("a".into(), Value::Int(1)), ("b".into(), Value::Int(2))]);
        let b = Value::record([("b".into(), Value::Int(2)), ("a".into(), Value::Int(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn compose_prefers_self_on_overlap() {
        let a = Value::function(
            Vector::from(vec![Value::Int(1)]),
            Vector::from(vec![Value::Int(100)]),
        );
        let b = Value::function(
            Vector::from(vec![Value::Int(1), Value::Int(2)]),
            Vector::from(vec![Value::Int(1), Value::Int(2)]),
        );
        let composed = a.compose(&b, pos()).unwrap();
        assert_eq!(composed.apply(&Value::Int(1), pos()).unwrap(), Value::Int(100));
        assert_eq!(composed.apply(&Value::Int(2), pos()).unwrap(), Value::Int(2));
    }

    #[test]
    fn powerset_has_two_to_the_n_elements() {
        let s = Value::set([Value::Int(1), Value::Int(2), Value::Int(3)]);
        let ps = s.powerset(pos()).unwrap();
        assert_eq!(ps.cardinality(pos()).unwrap(), 8);
    }
}
