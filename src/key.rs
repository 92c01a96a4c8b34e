//! Canonical keys for probability mass functions.
//!
//! A PMF over several variables is keyed by tuples of values. Callers build
//! those tuples in many shapes: a bare value, a pair, a key of a conditioning
//! PMF followed by another value, and so on. All of them are normalized into a
//! [`Key`], a flat tuple of values. A one-element key is the same key as the
//! bare scalar, so `pmf.p(x)`, `pmf.p((x,))` and `pmf.p(vec![x])` agree, just
//! as `pmf.p((x, y))` agrees with `pmf.p((Key::from(x), y))`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// A flat tuple of values.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Vec<Value>);

impl Key {
    pub fn empty() -> Self {
        Key(Vec::new())
    }

    pub fn scalar(value: Value) -> Self {
        Key(vec![value])
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Key(values)
    }

    /// Normalizes any supported key shape into a flat key.
    pub fn of(parts: impl KeyPart) -> Self {
        let mut values = Vec::new();
        parts.push_values(&mut values);
        Key(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// The value at `index` of the tuple.
    pub fn at(&self, index: usize) -> Value {
        self.0[index]
    }

    /// Projects the key onto the given positions, in the given order.
    pub fn project(&self, positions: &[usize]) -> Key {
        Key(positions.iter().map(|&i| self.0[i]).collect())
    }

    /// Returns the key without the value at `index`.
    pub fn without(&self, index: usize) -> Key {
        let mut values = self.0.clone();
        values.remove(index);
        Key(values)
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key::scalar(value)
    }
}

impl From<Vec<Value>> for Key {
    fn from(values: Vec<Value>) -> Self {
        Key(values)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            return write!(f, "{}", self.0[0]);
        }
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

/// A dynamically shaped key: scalars, or sequences nested arbitrarily deep.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum KeyShape {
    Scalar(Value),
    Seq(Vec<KeyShape>),
}

impl KeyShape {
    /// Flattens the shape depth-first, left to right.
    pub fn flatten(&self) -> Key {
        let mut values = Vec::new();
        let mut stack = vec![self];
        while let Some(shape) = stack.pop() {
            match shape {
                KeyShape::Scalar(v) => values.push(*v),
                KeyShape::Seq(items) => stack.extend(items.iter().rev()),
            }
        }
        Key(values)
    }
}

/// Anything that can be flattened into the values of a [`Key`].
pub trait KeyPart {
    fn push_values(&self, out: &mut Vec<Value>);
}

impl KeyPart for Value {
    fn push_values(&self, out: &mut Vec<Value>) {
        out.push(*self);
    }
}

impl KeyPart for Key {
    fn push_values(&self, out: &mut Vec<Value>) {
        out.extend_from_slice(&self.0);
    }
}

impl KeyPart for KeyShape {
    fn push_values(&self, out: &mut Vec<Value>) {
        out.extend_from_slice(self.flatten().values());
    }
}

impl<T: KeyPart> KeyPart for [T] {
    fn push_values(&self, out: &mut Vec<Value>) {
        for part in self {
            part.push_values(out);
        }
    }
}

impl<T: KeyPart> KeyPart for Vec<T> {
    fn push_values(&self, out: &mut Vec<Value>) {
        self.as_slice().push_values(out);
    }
}

impl<T: KeyPart, const N: usize> KeyPart for [T; N] {
    fn push_values(&self, out: &mut Vec<Value>) {
        self.as_slice().push_values(out);
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn push_values(&self, out: &mut Vec<Value>) {
        (**self).push_values(out);
    }
}

impl<A: KeyPart> KeyPart for (A,) {
    fn push_values(&self, out: &mut Vec<Value>) {
        self.0.push_values(out);
    }
}

impl<A: KeyPart, B: KeyPart> KeyPart for (A, B) {
    fn push_values(&self, out: &mut Vec<Value>) {
        self.0.push_values(out);
        self.1.push_values(out);
    }
}

impl<A: KeyPart, B: KeyPart, C: KeyPart> KeyPart for (A, B, C) {
    fn push_values(&self, out: &mut Vec<Value>) {
        self.0.push_values(out);
        self.1.push_values(out);
        self.2.push_values(out);
    }
}

impl<A: KeyPart, B: KeyPart, C: KeyPart, D: KeyPart> KeyPart for (A, B, C, D) {
    fn push_values(&self, out: &mut Vec<Value>) {
        self.0.push_values(out);
        self.1.push_values(out);
        self.2.push_values(out);
        self.3.push_values(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_element_collapses_to_scalar() {
        assert_eq!(Key::of(3u32), Key::scalar(3));
        assert_eq!(Key::of((3u32,)), Key::scalar(3));
        assert_eq!(Key::of(vec![3u32]), Key::scalar(3));
        assert_eq!(Key::of([[3u32]]), Key::scalar(3));
    }

    #[test]
    fn test_tuples_and_nested_tuples_flatten() {
        let flat = Key::from_values(vec![1, 2, 3]);
        let (a, b, c): (Value, Value, Value) = (1, 2, 3);
        assert_eq!(Key::of((a, b, c)), flat);
        assert_eq!(Key::of(((a, b), c)), flat);
        assert_eq!(Key::of((a, (b, (c,)))), flat);
        assert_eq!(Key::of((Key::of((a, b)), c)), flat);
        assert_eq!(Key::of(vec![vec![a], vec![b, c]]), flat);
    }

    #[test]
    fn test_shape_flatten_is_depth_first() {
        let shape = KeyShape::Seq(vec![
            KeyShape::Scalar(1),
            KeyShape::Seq(vec![KeyShape::Scalar(2), KeyShape::Seq(vec![KeyShape::Scalar(3)])]),
            KeyShape::Scalar(4),
        ]);
        assert_eq!(shape.flatten(), Key::from_values(vec![1, 2, 3, 4]));
        assert_eq!(Key::of((&shape, 5u32)).values(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_project_and_without() {
        let key = Key::from_values(vec![7, 8, 9]);
        assert_eq!(key.project(&[2, 0]), Key::from_values(vec![9, 7]));
        assert_eq!(key.without(1), Key::from_values(vec![7, 9]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::scalar(5).to_string(), "5");
        assert_eq!(Key::from_values(vec![1, 0]).to_string(), "(1, 0)");
    }
}
