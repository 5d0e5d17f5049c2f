//! Real-time mission loop: one control driven by the pose stream.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info, warn};

use crate::config::{GeofenceConfig, RunnerConfig};
use crate::control::{Control, MotionCommand};
use crate::core::PoseSample;

use super::interfaces::{Clock, CommandSink, FaultOracle, Geofence, MissionReporter, SystemClock};
use super::{Mission, RobotContext};

const FAULT_CANCELLED: &str = "cancelled";
const FAULT_DISCONNECTED: &str = "pose source disconnected";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Drives a [`Control`] until it ends, fails or is cancelled.
///
/// Each pose sample is checked against the geofence and the fault oracle
/// before the control sees it. Move commands get their expiry restamped
/// from the robot clock, so a stalled loop stops the robot by itself.
pub struct MissionRunner {
    context: Arc<RobotContext>,
    commands: Box<dyn CommandSink>,
    reporter: Box<dyn MissionReporter>,
    faults: Arc<dyn FaultOracle>,
    geofence: Option<Arc<dyn Geofence>>,
    clock: Arc<dyn Clock>,
    config: RunnerConfig,
    geofence_config: GeofenceConfig,
}

impl MissionRunner {
    /// Runner with the context as fault oracle, the system clock and no geofence.
    pub fn new(
        context: Arc<RobotContext>,
        commands: impl CommandSink + 'static,
        reporter: impl MissionReporter + 'static,
        config: RunnerConfig,
    ) -> Self {
        Self {
            faults: context.clone(),
            context,
            commands: Box::new(commands),
            reporter: Box::new(reporter),
            geofence: None,
            clock: Arc::new(SystemClock),
            config,
            geofence_config: GeofenceConfig::default(),
        }
    }

    pub fn with_faults(mut self, faults: Arc<dyn FaultOracle>) -> Self {
        self.faults = faults;
        self
    }

    /// Pause control while off site. Ignored unless `config.enabled`.
    pub fn with_geofence(mut self, geofence: Arc<dyn Geofence>, config: GeofenceConfig) -> Self {
        self.geofence = config.enabled.then_some(geofence);
        self.geofence_config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn context(&self) -> &Arc<RobotContext> {
        &self.context
    }

    /// Run one mission to its end and return the final record.
    ///
    /// Never fails: controller errors and panics, cancellation and a lost
    /// pose source abort the mission and stop the robot.
    pub fn run(
        &self,
        name: &str,
        control: &mut dyn Control,
        poses: &Receiver<PoseSample>,
        cancel: &AtomicBool,
    ) -> Mission {
        let mut mission = Mission::start(name, self.clock.now());
        self.context.set_mission(mission.clone());
        self.reporter.report(&mission);
        info!("Mission {} started: {}", name, control);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.control_loop(control, poses, cancel)
        }))
        .unwrap_or_else(|payload| {
            let fault = format!("controller panicked: {}", panic_message(payload.as_ref()));
            error!("Mission {}: {}", name, fault);
            Err(fault)
        });

        let stop_time = self.clock.now();
        let duration = mission.duration(stop_time);
        match outcome {
            Ok(()) => {
                info!("Mission {} completed in {:.1}s", name, duration);
                mission.complete(stop_time);
            }
            Err(fault) => {
                warn!("Mission {} aborted in {:.1}s: {}", name, duration, fault);
                self.commands.publish(MotionCommand::Stop);
                mission.abort(stop_time, fault);
            }
        }

        self.context.set_mission(mission.clone());
        self.reporter.report(&mission);
        mission
    }

    /// `Ok` when the control ended, `Err(fault)` otherwise.
    fn control_loop(
        &self,
        control: &mut dyn Control,
        poses: &Receiver<PoseSample>,
        cancel: &AtomicBool,
    ) -> std::result::Result<(), String> {
        let timeout = Duration::from_secs_f64(self.config.pose_timeout_secs);
        let mut on_site = true;
        let mut on_site_time: Option<f64> = None;

        loop {
            if cancel.load(Ordering::Acquire) {
                return Err(FAULT_CANCELLED.to_string());
            }

            let sample = match poses.recv_timeout(timeout) {
                Ok(sample) => sample,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Control paused without pose");
                    self.commands.publish(MotionCommand::Stop);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(FAULT_DISCONNECTED.to_string());
                }
            };
            let (t, pose) = (sample.time, sample.pose);
            debug!("state {:.3} {:.3} {:.3} {:.3}", t, pose.x, pose.y, pose.theta);

            if let Some(fence) = &self.geofence {
                let due = on_site_time.map_or(true, |last| t >= last + self.geofence_config.interval);
                if due {
                    on_site_time = Some(t);
                    on_site = fence.on_site(pose.x, pose.y, self.geofence_config.buffer);
                }
                if !on_site {
                    warn!("Control paused while outside site: {:.3} {:.3}", pose.x, pose.y);
                    self.commands.publish(MotionCommand::Stop);
                    continue;
                }
            }

            if let Some(fault) = self.faults.fault(t) {
                warn!("{}", fault);
                continue;
            }

            if control.end(t, &pose) {
                return Ok(());
            }

            match control.update(t, &pose) {
                Ok(None) => {}
                Ok(Some(command)) => {
                    let base = self.context.robot_time().unwrap_or(t);
                    let command = command.with_timeout(base + self.config.command_validity_secs);
                    debug!("Control command: {:?}", command);
                    self.commands.publish(command);
                }
                Err(e) => {
                    error!("Mission error in {}: {}", control, e);
                    return Err(e.to_string());
                }
            }
        }
    }
}
