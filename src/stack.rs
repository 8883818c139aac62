//! The single linear working stack that holds in-progress values,
//! interleaved with pending object keys, alongside a parallel stack of
//! container-start markers.

use std::collections::HashMap;

use crate::value::Value;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    #[error("too many closes")]
    TooManyCloses,
    #[error("unexpected array close")]
    UnexpectedArrayClose,
    #[error("unexpected object close")]
    UnexpectedObjectClose,
}

#[derive(Debug, Clone)]
enum Slot {
    /// A completed value, either an array element or (once an object has
    /// been opened) the in-progress `Object` being built in place.
    Value(Value),
    /// A parsed object key, waiting for its value to arrive.
    Key(String),
    /// Marks the position of an array's first element; the array itself is
    /// materialized only when the array closes.
    ArrayStart,
}

/// Which kind of container the innermost open container is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Array,
    Object,
}

/// `stack[]` plus the parallel `starts[]` from spec §3/§4.3. A non-negative
/// `starts[k]` is the index of the matching array's `ArrayStart` marker; `-1`
/// marks an object.
#[derive(Debug, Clone, Default)]
pub struct ContainerStack {
    stack: Vec<Slot>,
    starts: Vec<i64>,
}

impl ContainerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.starts.clear();
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.starts.len()
    }

    /// Which container is innermost, if any are open.
    #[must_use]
    pub fn current_container(&self) -> Option<Container> {
        match self.starts.last() {
            Some(&n) if n >= 0 => Some(Container::Array),
            Some(_) => Some(Container::Object),
            None => None,
        }
    }

    pub fn open_array(&mut self) {
        self.starts.push(self.stack.len() as i64);
        self.stack.push(Slot::ArrayStart);
    }

    pub fn open_object(&mut self) {
        self.starts.push(-1);
        self.stack.push(Slot::Value(Value::Object(HashMap::new())));
    }

    /// Push a parsed key, to be consumed by the next `add`.
    pub fn push_key(&mut self, key: String) {
        self.stack.push(Slot::Key(key));
    }

    /// Insert `v` into the object above which a key is pending, append it as
    /// an array element, or — at depth 0 — leave it as the lone item on the
    /// stack to be picked up as the top-level result.
    pub fn add(&mut self, v: Value) {
        if matches!(self.stack.last(), Some(Slot::Key(_))) {
            let Some(Slot::Key(key)) = self.stack.pop() else {
                unreachable!()
            };
            match self.stack.last_mut() {
                Some(Slot::Value(Value::Object(map))) => {
                    map.insert(key, v);
                }
                _ => unreachable!("key sentinel without an object beneath it"),
            }
        } else {
            self.stack.push(Slot::Value(v));
        }
    }

    pub fn close_array(&mut self) -> Result<(), StackError> {
        if self.depth() == 0 {
            return Err(StackError::TooManyCloses);
        }
        if *self.starts.last().unwrap() < 0 {
            return Err(StackError::UnexpectedArrayClose);
        }
        let marker_idx = self.starts.pop().unwrap() as usize;
        let elements = self
            .stack
            .split_off(marker_idx + 1)
            .into_iter()
            .map(|slot| match slot {
                Slot::Value(v) => v,
                _ => unreachable!("array element slot must hold a value"),
            })
            .collect();
        self.stack.truncate(marker_idx);
        self.add(Value::Array(elements));
        Ok(())
    }

    pub fn close_object(&mut self) -> Result<(), StackError> {
        if self.depth() == 0 {
            return Err(StackError::TooManyCloses);
        }
        if *self.starts.last().unwrap() >= 0 {
            return Err(StackError::UnexpectedObjectClose);
        }
        self.starts.pop();
        let Some(Slot::Value(obj)) = self.stack.pop() else {
            unreachable!("object marker must hold its in-progress Value::Object")
        };
        self.add(obj);
        Ok(())
    }

    /// `true` once parsing has produced exactly one root value and nothing
    /// else is pending (i.e. `depth() == 0` and the stack holds one slot).
    #[must_use]
    pub fn has_root(&self) -> bool {
        self.depth() == 0 && matches!(self.stack.last(), Some(Slot::Value(_)))
    }

    /// Take the root value once `has_root()` is true, leaving the stack
    /// empty.
    pub fn take_root(&mut self) -> Option<Value> {
        if !self.has_root() {
            return None;
        }
        let Some(Slot::Value(v)) = self.stack.pop() else {
            unreachable!()
        };
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_array() {
        let mut cs = ContainerStack::new();
        cs.open_array();
        cs.add(Value::Int(1));
        cs.add(Value::Int(2));
        cs.close_array().unwrap();
        assert_eq!(
            cs.take_root(),
            Some(Value::Array(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn nested_object_in_array() {
        let mut cs = ContainerStack::new();
        cs.open_array();
        cs.open_object();
        cs.push_key("x".to_string());
        cs.add(Value::Int(7));
        cs.close_object().unwrap();
        cs.close_array().unwrap();
        let root = cs.take_root().unwrap();
        let arr = root.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0].as_object().unwrap().get("x"), Some(&Value::Int(7)));
    }

    #[test]
    fn scalar_root() {
        let mut cs = ContainerStack::new();
        cs.add(Value::Bool(true));
        assert_eq!(cs.take_root(), Some(Value::Bool(true)));
    }

    #[test]
    fn unbalanced_close_errors() {
        let mut cs = ContainerStack::new();
        assert_eq!(cs.close_array(), Err(StackError::TooManyCloses));

        let mut cs2 = ContainerStack::new();
        cs2.open_array();
        assert_eq!(cs2.close_object(), Err(StackError::UnexpectedObjectClose));

        let mut cs3 = ContainerStack::new();
        cs3.open_object();
        assert_eq!(cs3.close_array(), Err(StackError::UnexpectedArrayClose));
    }
}
