//! Simulated differential-drive robot.
//!
//! Stands in for the motor driver, tracker and depth camera: it executes
//! motion commands, integrates unicycle kinematics on its own clock and
//! publishes poses, robot time and a clear obstacle reading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info};

use crate::config::{MargaConfig, RobotConfig};
use crate::control::{MotionCommand, ObstacleDetection};
use crate::core::{Pose, PoseSample};
use crate::error::Result;
use crate::mission::RobotContext;

/// Unicycle kinematics with mid-point heading integration.
#[derive(Clone, Copy, Debug)]
pub struct Unicycle {
    pose: Pose,
}

impl Unicycle {
    pub fn new(pose: Pose) -> Self {
        Self { pose }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Advance by `dt` seconds at constant velocity.
    pub fn step(&mut self, speed: f64, omega: f64, dt: f64) -> Pose {
        let dist = speed * dt;
        let dtheta = omega * dt;
        let mid_theta = self.pose.theta + dtheta / 2.0;
        self.pose = Pose::new(
            self.pose.x + dist * mid_theta.cos(),
            self.pose.y + dist * mid_theta.sin(),
            self.pose.theta + dtheta,
        );
        self.pose
    }
}

/// Simulated robot driven by motion commands.
pub struct SimulatedRobot {
    body: Unicycle,
    robot: RobotConfig,
    context: Arc<RobotContext>,
    commands: Receiver<MotionCommand>,
    poses: Sender<PoseSample>,
    ticks: u64,
    /// Robot clock in seconds
    time: f64,
    dt: f64,
    time_scale: f64,
    /// Active velocity and its expiry; `timeout <= 0` never expires
    velocity: (f64, f64),
    timeout: f64,
    cutter: f64,
}

impl SimulatedRobot {
    pub fn new(
        config: &MargaConfig,
        context: Arc<RobotContext>,
        commands: Receiver<MotionCommand>,
        poses: Sender<PoseSample>,
    ) -> Self {
        let [x, y, theta] = config.simulation.start;
        Self {
            body: Unicycle::new(Pose::new(x, y, theta)),
            robot: config.robot,
            context,
            commands,
            poses,
            ticks: 0,
            time: 0.0,
            dt: 1.0 / config.simulation.rate_hz,
            time_scale: config.simulation.time_scale,
            velocity: (0.0, 0.0),
            timeout: 0.0,
            cutter: 0.0,
        }
    }

    pub fn pose(&self) -> Pose {
        self.body.pose()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn cutter(&self) -> f64 {
        self.cutter
    }

    fn apply(&mut self, command: MotionCommand) {
        debug!("Simulated {} command", command.command_type());
        match command {
            MotionCommand::Move {
                speed,
                omega,
                timeout,
            } => {
                let max_speed = self.robot.max_speed;
                let max_omega = self.robot.max_omega;
                self.velocity = (
                    speed.clamp(-max_speed, max_speed),
                    omega.clamp(-max_omega, max_omega),
                );
                self.timeout = timeout;
            }
            MotionCommand::Stop | MotionCommand::Dock | MotionCommand::Reset => {
                self.velocity = (0.0, 0.0);
            }
            MotionCommand::Cut { power } => {
                self.cutter = power;
            }
        }
    }

    /// Apply pending commands, advance one tick and publish.
    pub fn step(&mut self) -> PoseSample {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }

        // independent hardware timeout
        if self.timeout > 0.0 && self.time >= self.timeout && self.velocity != (0.0, 0.0) {
            debug!("Move timed out at {:.2}", self.time);
            self.velocity = (0.0, 0.0);
        }

        let (speed, omega) = self.velocity;
        let pose = self.body.step(speed, omega, self.dt);
        self.ticks += 1;
        self.time = self.ticks as f64 * self.dt;

        self.context.set_robot_time(self.time);
        self.context
            .set_obstacle(Some(ObstacleDetection::clear(self.time)));
        let sample = PoseSample::new(self.time, pose);
        let _ = self.poses.try_send(sample);
        sample
    }

    /// Run on a thread at the configured rate until `shutdown` is raised.
    pub fn spawn(mut self, shutdown: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let period = Duration::from_secs_f64(self.dt / self.time_scale);
        let handle = thread::Builder::new()
            .name("simulation".into())
            .spawn(move || {
                info!("Simulated robot started at {:?}", self.pose());
                while !shutdown.load(Ordering::Acquire) {
                    self.step();
                    thread::sleep(period);
                }
                info!("Simulated robot stopped at {:?}", self.pose());
            })?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn robot() -> (
        SimulatedRobot,
        Sender<MotionCommand>,
        Receiver<PoseSample>,
        Arc<RobotContext>,
    ) {
        let mut config = MargaConfig::default();
        config.simulation.start = [0.0, 0.0, 0.0];
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (pose_tx, pose_rx) = crossbeam_channel::unbounded();
        let context = Arc::new(RobotContext::new());
        let sim = SimulatedRobot::new(&config, context.clone(), cmd_rx, pose_tx);
        (sim, cmd_tx, pose_rx, context)
    }

    #[test]
    fn test_unicycle_quarter_circle() {
        let mut body = Unicycle::new(Pose::default());
        // radius 1 m: 100 steps of π/200 rad
        for _ in 0..100 {
            body.step(PI / 2.0, PI / 2.0, 0.01);
        }
        let pose = body.pose();
        assert_relative_eq!(pose.x, 1.0, epsilon = 1e-3);
        assert_relative_eq!(pose.y, 1.0, epsilon = 1e-3);
        assert_relative_eq!(pose.theta, PI / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_moves_until_timeout() {
        let (mut sim, tx, rx, context) = robot();
        tx.send(MotionCommand::move_at(0.2, 0.0, 1.0)).unwrap();
        for _ in 0..30 {
            sim.step();
        }
        // ten ticks at 0.1 s before the move expires
        assert_relative_eq!(sim.pose().x, 0.2, epsilon = 1e-9);
        assert_relative_eq!(sim.time(), 3.0, epsilon = 1e-9);
        assert_eq!(rx.try_iter().count(), 30);
        assert_relative_eq!(context.robot_time().unwrap(), 3.0, epsilon = 1e-9);
        assert_eq!(context.obstacle().map(|o| o.center_blocked()), Some(false));
    }

    #[test]
    fn test_clamps_and_stops() {
        let (mut sim, tx, _rx, _) = robot();
        tx.send(MotionCommand::move_at(5.0, 0.0, 0.0)).unwrap();
        sim.step();
        assert_relative_eq!(sim.pose().x, 0.05, epsilon = 1e-9);

        tx.send(MotionCommand::Stop).unwrap();
        tx.send(MotionCommand::Cut { power: 0.5 }).unwrap();
        sim.step();
        assert_relative_eq!(sim.pose().x, 0.05, epsilon = 1e-9);
        assert_relative_eq!(sim.cutter(), 0.5);
    }
}
