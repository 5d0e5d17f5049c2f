//! Single-mission supervisor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::MargaConfig;
use crate::control::Control;
use crate::core::PoseSample;
use crate::error::{MargaError, Result};

use super::catalog::build_mission;
use super::{Mission, MissionRunner};

/// Requests from the operator.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum MissionCommand {
    Start { name: String },
    Abort,
}

struct ActiveMission {
    name: String,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<Mission>,
}

/// Runs at most one mission at a time, each on its own thread.
pub struct MissionControl {
    runner: Arc<MissionRunner>,
    poses: Receiver<PoseSample>,
    config: MargaConfig,
    active: Option<ActiveMission>,
}

impl MissionControl {
    pub fn new(runner: MissionRunner, poses: Receiver<PoseSample>, config: MargaConfig) -> Self {
        Self {
            runner: Arc::new(runner),
            poses,
            config,
            active: None,
        }
    }

    /// Whether a mission thread is still running.
    pub fn in_progress(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    fn ensure_idle(&self, name: &str) -> Result<()> {
        match &self.active {
            Some(active) if !active.handle.is_finished() => {
                warn!(
                    "Mission start {} ignored - mission {} already in progress",
                    name, active.name
                );
                Err(MargaError::MissionInProgress(active.name.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Start `control` as mission `name` on a new thread.
    pub fn start(&mut self, name: &str, control: Box<dyn Control>) -> Result<()> {
        self.ensure_idle(name)?;
        // release the finished thread of the previous mission
        self.wait();

        let stale = self.poses.try_iter().count();
        if stale > 0 {
            info!("Dropped {} stale poses", stale);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let runner = Arc::clone(&self.runner);
        let poses = self.poses.clone();
        let flag = Arc::clone(&cancel);
        let mission_name = name.to_string();

        info!("Starting mission {}", name);
        let handle = thread::Builder::new()
            .name("mission".into())
            .spawn(move || {
                let mut control = control;
                runner.run(&mission_name, control.as_mut(), &poses, &flag)
            })?;

        self.active = Some(ActiveMission {
            name: name.to_string(),
            cancel,
            handle,
        });
        Ok(())
    }

    /// Request cancellation of the running mission.
    ///
    /// Returns false when no mission is running.
    pub fn abort(&self) -> bool {
        match &self.active {
            Some(active) if !active.handle.is_finished() => {
                info!("Aborting mission {}", active.name);
                active.cancel.store(true, Ordering::Release);
                true
            }
            _ => {
                warn!("Abort ignored - no mission in progress");
                false
            }
        }
    }

    /// Dispatch an operator command through the mission catalog.
    pub fn handle(&mut self, command: MissionCommand) -> Result<()> {
        info!("Mission command: {:?}", command);
        match command {
            MissionCommand::Start { name } => {
                self.ensure_idle(&name)?;
                let control = build_mission(&name, &self.config, Arc::clone(self.runner.context()))?;
                self.start(&name, Box::new(control))
            }
            MissionCommand::Abort => {
                self.abort();
                Ok(())
            }
        }
    }

    /// Join the current mission thread and return its final record.
    pub fn wait(&mut self) -> Option<Mission> {
        let active = self.active.take()?;
        match active.handle.join() {
            Ok(mission) => Some(mission),
            Err(_) => {
                error!("Mission thread {} panicked", active.name);
                None
            }
        }
    }
}
