//! Test utilities for Marga integration tests.
//!
//! Channels, a scripted control and helpers to drive a runner or a control
//! without the real robot.

#![allow(dead_code)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use marga::config::RunnerConfig;
use marga::control::{Control, MotionCommand};
use marga::core::{Pose, PoseSample};
use marga::error::{MargaError, Result};
use marga::geometry::{Polygon, Ring};
use marga::mission::{Clock, Mission, MissionRunner, RobotContext};
use marga::sim::Unicycle;

/// Clock frozen at one instant.
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now(&self) -> f64 {
        self.0
    }
}

/// Runner wired to in-memory channels.
pub struct Harness {
    pub runner: MissionRunner,
    pub context: Arc<RobotContext>,
    pub poses: Sender<PoseSample>,
    pub pose_rx: Receiver<PoseSample>,
    pub commands: Receiver<MotionCommand>,
    pub events: Receiver<Mission>,
}

/// Runner with no fault oracle, no geofence and a fixed clock.
pub fn harness(config: RunnerConfig) -> Harness {
    let context = Arc::new(RobotContext::new());
    let (command_tx, commands) = crossbeam_channel::unbounded();
    let (event_tx, events) = crossbeam_channel::unbounded();
    let (poses, pose_rx) = crossbeam_channel::unbounded();
    let runner = MissionRunner::new(Arc::clone(&context), command_tx, event_tx, config)
        .with_faults(Arc::new(|_t: f64| -> Option<String> { None }))
        .with_clock(Arc::new(FixedClock(1000.0)));
    Harness {
        runner,
        context,
        poses,
        pose_rx,
        commands,
        events,
    }
}

pub fn sample(t: f64, x: f64, y: f64) -> PoseSample {
    PoseSample::new(t, Pose::new(x, y, 0.0))
}

pub fn stop_count(commands: &[MotionCommand]) -> usize {
    commands
        .iter()
        .filter(|c| **c == MotionCommand::Stop)
        .count()
}

enum Outcome {
    Move,
    Fail(String),
    Panic(String),
}

/// Control that moves at constant speed until `end_time`, counting updates.
pub struct Scripted {
    pub updates: Arc<AtomicUsize>,
    end_time: f64,
    outcome: Outcome,
}

impl Scripted {
    pub fn until(end_time: f64) -> Self {
        Self {
            updates: Arc::new(AtomicUsize::new(0)),
            end_time,
            outcome: Outcome::Move,
        }
    }

    /// Never ends; every update fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Outcome::Fail(message.to_string()),
            ..Self::until(f64::INFINITY)
        }
    }

    /// Never ends; every update panics with `message`.
    pub fn panicking(message: &str) -> Self {
        Self {
            outcome: Outcome::Panic(message.to_string()),
            ..Self::until(f64::INFINITY)
        }
    }

    pub fn update_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.updates)
    }
}

impl fmt::Display for Scripted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scripted({})", self.end_time)
    }
}

impl Control for Scripted {
    fn update(&mut self, t: f64, _pose: &Pose) -> Result<Option<MotionCommand>> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Move => Ok(Some(MotionCommand::move_at(0.1, 0.0, t))),
            Outcome::Fail(message) => Err(MargaError::Contract(message.clone())),
            Outcome::Panic(message) => panic!("{}", message),
        }
    }

    fn end(&mut self, t: f64, _pose: &Pose) -> bool {
        t >= self.end_time
    }
}

pub fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
    Polygon::new(Ring::rectangle(x0, y0, x1, y1).unwrap(), Vec::new())
}

/// Drive `control` with simulated kinematics until it ends.
///
/// Returns the visited poses. Panics after `max_steps`.
pub fn drive(control: &mut dyn Control, start: Pose, dt: f64, max_steps: usize) -> Vec<Pose> {
    let mut body = Unicycle::new(start);
    let mut trace = vec![start];
    for step in 0..max_steps {
        let t = step as f64 * dt;
        let pose = body.pose();
        if control.end(t, &pose) {
            return trace;
        }
        let (speed, omega) = match control.update(t, &pose).unwrap() {
            Some(MotionCommand::Move { speed, omega, .. }) => (speed, omega),
            _ => (0.0, 0.0),
        };
        trace.push(body.step(speed, omega, dt));
    }
    panic!("control did not end within {max_steps} steps");
}
