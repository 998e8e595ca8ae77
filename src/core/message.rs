//! The polymorphic message hierarchy.
//!
//! A [`Message`] is an opaque unit of work: a human-readable name (debugging only) and
//! a `process` operation returning a success flag. [`InputMessage`] runs on the child
//! thread; [`OutputMessage`] runs on the main thread. Both are modeled as sealed traits
//! rather than a shared base, since a queue only ever holds one or the other and never
//! needs to treat them polymorphically as the same type.
//!
//! `process` returning `false` is a hard signal (Invariant M2) that the thread that ran
//! it should terminate after the current iteration — for input messages this means the
//! child thread; for output messages, the manager stops draining early (see
//! [`crate::manager`]).

/// Shared naming contract for both message kinds. Not exported on its own — implement
/// [`InputMessage`] or [`OutputMessage`] instead.
pub trait Named {
    /// Human-readable name, for diagnostics only. Never parsed or matched on.
    fn name(&self) -> &str;
}

/// A unit of work executed on the child thread.
pub trait InputMessage: Named + Send {
    /// Runs the message's work. Returning `false` latches the owning thread's
    /// terminating flag after this call (Invariant M2).
    fn process(&mut self) -> bool;
}

/// A unit of work executed on the main thread.
pub trait OutputMessage: Named + Send {
    /// Runs the message's work. Returning `false` is advisory only on the output
    /// side: the manager stops draining the rest of this thread's batch but does not
    /// itself terminate anything.
    fn process(&mut self) -> bool;
}

/// A message enqueued alongside the forced bit decided at send time (see
/// [`crate::core::sender`]). Carrying the bit with the message lets the final drain
/// in [`crate::core::msg_thread`] re-apply the same forced/non-forced drop rule
/// (Invariant M1) to messages that raced into the queue around the terminating
/// transition.
pub struct Envelope<T> {
    pub msg: T,
    pub forced: bool,
}

/// Generic, owned-payload input message: an ergonomic wrapper around a typed payload
/// `O` and a closure that operates on it. This is the concrete realization of the
/// source spec's `InputMessage<O>` template — ownership is explicit (owned-by-message,
/// per the recommended resolution of the Open Question in spec.md §9). A payload that
/// must be visible to the producing side after the message runs (e.g. a shared
/// accumulator) uses an explicitly-synchronized handle, such as `Arc<Mutex<T>>`, as `O`
/// itself; that is still owned by the message, just backed by shared state.
pub struct TypedInputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    name: String,
    payload: O,
    op: F,
}

impl<O, F> TypedInputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    pub fn new(name: impl Into<String>, payload: O, op: F) -> Self {
        Self {
            name: name.into(),
            payload,
            op,
        }
    }

    pub fn payload(&self) -> &O {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut O {
        &mut self.payload
    }
}

impl<O, F> Named for TypedInputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    fn name(&self) -> &str {
        &self.name
    }
}

impl<O, F> InputMessage for TypedInputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    fn process(&mut self) -> bool {
        (self.op)(&mut self.payload)
    }
}

/// Generic, owned-payload output message. Mirrors [`TypedInputMessage`] for the
/// child→main direction.
pub struct TypedOutputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    name: String,
    payload: O,
    op: F,
}

impl<O, F> TypedOutputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    pub fn new(name: impl Into<String>, payload: O, op: F) -> Self {
        Self {
            name: name.into(),
            payload,
            op,
        }
    }

    pub fn payload(&self) -> &O {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut O {
        &mut self.payload
    }
}

impl<O, F> Named for TypedOutputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    fn name(&self) -> &str {
        &self.name
    }
}

impl<O, F> OutputMessage for TypedOutputMessage<O, F>
where
    O: Send,
    F: FnMut(&mut O) -> bool + Send,
{
    fn process(&mut self) -> bool {
        (self.op)(&mut self.payload)
    }
}

/// Convenience constructor for a payload-less input message backed by a closure.
pub fn input_fn(
    name: impl Into<String>,
    mut f: impl FnMut() -> bool + Send + 'static,
) -> TypedInputMessage<(), impl FnMut(&mut ()) -> bool + Send> {
    TypedInputMessage::new(name, (), move |_| f())
}

/// Convenience constructor for a payload-less output message backed by a closure.
pub fn output_fn(
    name: impl Into<String>,
    mut f: impl FnMut() -> bool + Send + 'static,
) -> TypedOutputMessage<(), impl FnMut(&mut ()) -> bool + Send> {
    TypedOutputMessage::new(name, (), move |_| f())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_input_message_mutates_owned_payload() {
        let mut msg = TypedInputMessage::new("accumulate", 0i64, |acc: &mut i64| {
            *acc += 1;
            true
        });
        assert!(msg.process());
        assert!(msg.process());
        assert_eq!(*msg.payload(), 2);
        assert_eq!(msg.name(), "accumulate");
    }

    #[test]
    fn process_returning_false_is_observable_by_caller() {
        let mut msg = input_fn("stop-me", || false);
        assert!(!msg.process());
    }
}
