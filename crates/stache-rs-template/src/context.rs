//! Execution contexts.
//!
//! Entering a section pushes a new [`Context`] frame whose parent is the
//! enclosing one. Frames live on the call stack for the duration of the
//! section, so the chain is a list of borrowed references.

use crate::value::Value;

/// One frame of the context chain.
#[derive(Debug)]
pub struct Context<'a> {
    /// The value names are resolved against first.
    pub data: Value,
    /// The enclosing frame, if any.
    pub parent: Option<&'a Context<'a>>,
    /// 1-based position within the enclosing iteration; 0 outside iteration.
    pub index: usize,
    pub on_first: bool,
    pub on_last: bool,
}

impl Context<'static> {
    /// Creates a root frame with no parent.
    pub const fn root(data: Value) -> Self {
        Self {
            data,
            parent: None,
            index: 0,
            on_first: false,
            on_last: false,
        }
    }
}

impl<'a> Context<'a> {
    /// Pushes a frame for a non-iterating section. Iteration state is
    /// inherited so `-index` still works inside a nested object section.
    pub const fn nest(&self, data: Value) -> Context<'_> {
        Context {
            data,
            parent: Some(self),
            index: self.index,
            on_first: self.on_first,
            on_last: self.on_last,
        }
    }

    /// Pushes a frame for one element of an iterated section.
    pub const fn nest_iteration(
        &self,
        data: Value,
        index: usize,
        on_first: bool,
        on_last: bool,
    ) -> Context<'_> {
        Context {
            data,
            parent: Some(self),
            index,
            on_first,
            on_last,
        }
    }

    /// Iterates this frame and its ancestors, innermost first.
    pub fn frames(&self) -> impl Iterator<Item = &Context<'a>> {
        std::iter::successors(Some(self), |ctx| ctx.parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nest_inherits_iteration_state() {
        let root = Context::root(Value::from("root"));
        let item = root.nest_iteration(Value::from("item"), 2, false, true);
        let inner = item.nest(Value::from("inner"));
        assert_eq!(inner.index, 2);
        assert!(!inner.on_first);
        assert!(inner.on_last);
    }

    #[test]
    fn test_frames_walk_outward() {
        let root = Context::root(Value::Int(0));
        let a = root.nest(Value::Int(1));
        let b = a.nest(Value::Int(2));
        let data: Vec<Value> = b.frames().map(|ctx| ctx.data.clone()).collect();
        assert_eq!(data, vec![Value::Int(2), Value::Int(1), Value::Int(0)]);
    }
}
