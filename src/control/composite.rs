//! Sequential composition of controls.

use std::fmt;

use tracing::info;

use crate::core::Pose;
use crate::error::{MargaError, Result};

use super::{Control, ControlSequence, MotionCommand, Resume};

/// Runs the controls of a [`ControlSequence`] one after another.
///
/// On every update the active control is replaced while it reports `end`;
/// the composite ends once the sequence is exhausted. Composites nest.
pub struct CompositeControl {
    label: String,
    sequence: Box<dyn ControlSequence>,
    active: Box<dyn Control>,
    finished: bool,
}

impl CompositeControl {
    /// Pulls the first control right away; an empty sequence is an error.
    pub fn new(label: impl Into<String>, sequence: impl ControlSequence + 'static) -> Result<Self> {
        let label = label.into();
        let mut sequence: Box<dyn ControlSequence> = Box::new(sequence);
        let active = sequence
            .next_control(None)
            .ok_or(MargaError::EmptySequence)?;
        info!("{}: starting {}", label, active);
        Ok(Self {
            label,
            sequence,
            active,
            finished: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for CompositeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeControl({})", self.label)
    }
}

impl Control for CompositeControl {
    fn update(&mut self, t: f64, pose: &Pose) -> Result<Option<MotionCommand>> {
        if self.finished {
            return Ok(None);
        }

        while self.active.end(t, pose) {
            let resume = Resume { t, pose: *pose };
            match self.sequence.next_control(Some(&resume)) {
                Some(next) => {
                    info!("{}: {} ended, starting {}", self.label, self.active, next);
                    self.active = next;
                }
                None => {
                    info!("{}: {} ended, sequence complete", self.label, self.active);
                    self.finished = true;
                    return Ok(None);
                }
            }
        }

        self.active.update(t, pose)
    }

    fn end(&mut self, _t: f64, _pose: &Pose) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{GetStateControl, IterSequence, TimeControl2};

    fn boxed<C: Control + 'static>(c: C) -> Box<dyn Control> {
        Box::new(c)
    }

    #[test]
    fn test_empty_sequence_is_error() {
        let empty = IterSequence::new(std::iter::empty::<Box<dyn Control>>());
        assert!(matches!(
            CompositeControl::new("empty", empty),
            Err(MargaError::EmptySequence)
        ));
    }

    #[test]
    fn test_runs_controls_in_order() {
        let controls = vec![
            boxed(TimeControl2::new(0.1, 0.0, 1.0)),
            boxed(TimeControl2::new(0.2, 0.0, 2.0)),
        ];
        let mut c = CompositeControl::new("two", IterSequence::new(controls.into_iter())).unwrap();
        let pose = Pose::default();

        assert_eq!(
            c.update(0.5, &pose).unwrap(),
            Some(MotionCommand::move_at(0.1, 0.0, 0.5))
        );
        assert_eq!(
            c.update(1.5, &pose).unwrap(),
            Some(MotionCommand::move_at(0.2, 0.0, 1.5))
        );
        assert!(!c.end(1.5, &pose));
        assert_eq!(c.update(2.5, &pose).unwrap(), None);
        assert!(c.end(2.5, &pose));
        assert_eq!(c.update(3.0, &pose).unwrap(), None);
    }

    #[test]
    fn test_skips_every_ended_control_in_one_tick() {
        let controls = vec![
            boxed(GetStateControl),
            boxed(GetStateControl),
            boxed(TimeControl2::new(0.3, 0.0, 10.0)),
        ];
        let mut c = CompositeControl::new("skip", IterSequence::new(controls.into_iter())).unwrap();
        assert_eq!(
            c.update(1.0, &Pose::default()).unwrap(),
            Some(MotionCommand::move_at(0.3, 0.0, 1.0))
        );
    }

    #[test]
    fn test_passes_resume_values() {
        // each pause lasts one second from the time the previous control ended
        let mut pulls = 0;
        let sequence = move |resume: Option<&Resume>| -> Option<Box<dyn Control>> {
            pulls += 1;
            match (pulls, resume) {
                (1, None) => Some(boxed(GetStateControl)),
                (2, Some(r)) => Some(boxed(TimeControl2::new(0.0, 0.0, r.t + 1.0))),
                _ => None,
            }
        };
        let mut c = CompositeControl::new("resume", sequence).unwrap();
        let pose = Pose::default();
        assert!(c.update(10.0, &pose).unwrap().is_some());
        assert!(c.update(10.9, &pose).unwrap().is_some());
        assert_eq!(c.update(11.0, &pose).unwrap(), None);
        assert!(c.end(11.0, &pose));
    }

    #[test]
    fn test_nested_composites() {
        let inner = || {
            let controls = vec![boxed(TimeControl2::new(0.1, 0.0, 1.0))];
            CompositeControl::new("inner", IterSequence::new(controls.into_iter())).unwrap()
        };
        let outer_controls = vec![boxed(inner()), boxed(TimeControl2::new(0.2, 0.0, 2.0))];
        let mut c =
            CompositeControl::new("outer", IterSequence::new(outer_controls.into_iter())).unwrap();
        let pose = Pose::default();
        assert_eq!(
            c.update(0.0, &pose).unwrap(),
            Some(MotionCommand::move_at(0.1, 0.0, 0.0))
        );
        // inner finishes on this tick and returns None; outer ends it next tick
        assert_eq!(c.update(1.0, &pose).unwrap(), None);
        assert_eq!(
            c.update(1.1, &pose).unwrap(),
            Some(MotionCommand::move_at(0.2, 0.0, 1.1))
        );
    }
}
