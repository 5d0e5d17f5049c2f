//! Pull-based producers of controls.

use crate::core::Pose;

use super::Control;

/// Time and pose at which the previous control ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resume {
    pub t: f64,
    pub pose: Pose,
}

/// A lazily evaluated, possibly unbounded, sequence of controls.
///
/// The first pull passes `None`; every later pull passes the time and pose at
/// which the previous control ended. Returning `None` signals exhaustion.
pub trait ControlSequence: Send {
    fn next_control(&mut self, resume: Option<&Resume>) -> Option<Box<dyn Control>>;
}

impl<F> ControlSequence for F
where
    F: FnMut(Option<&Resume>) -> Option<Box<dyn Control>> + Send,
{
    fn next_control(&mut self, resume: Option<&Resume>) -> Option<Box<dyn Control>> {
        self(resume)
    }
}

/// Sequence over an iterator of controls, ignoring resume values.
pub struct IterSequence<I> {
    iter: I,
}

impl<I> IterSequence<I>
where
    I: Iterator<Item = Box<dyn Control>> + Send,
{
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I> ControlSequence for IterSequence<I>
where
    I: Iterator<Item = Box<dyn Control>> + Send,
{
    fn next_control(&mut self, _resume: Option<&Resume>) -> Option<Box<dyn Control>> {
        self.iter.next()
    }
}
