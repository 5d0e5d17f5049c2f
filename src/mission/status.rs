//! Mission lifecycle record.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MissionState {
    Running,
    Completed,
    Aborted,
}

/// One mission run: created running, finished exactly once.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mission {
    /// Start time in UNIX seconds
    pub start_time: f64,
    pub name: String,
    pub status: MissionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

/// Serialized form carrying the derived mission id.
#[derive(Serialize)]
struct MissionRecord<'a> {
    mission_id: String,
    #[serde(flatten)]
    mission: &'a Mission,
}

impl Mission {
    pub fn start(name: impl Into<String>, start_time: f64) -> Self {
        Self {
            start_time,
            name: name.into(),
            status: MissionState::Running,
            stop_time: None,
            fault: None,
        }
    }

    /// Start time in whole milliseconds.
    pub fn mission_id(&self) -> String {
        ((self.start_time * 1000.0) as i64).to_string()
    }

    pub fn is_running(&self) -> bool {
        self.status == MissionState::Running
    }

    /// Mark completed. Returns false, leaving the record untouched, unless running.
    pub fn complete(&mut self, stop_time: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stop_time = Some(stop_time);
        self.status = MissionState::Completed;
        true
    }

    /// Mark aborted with a fault. Returns false, leaving the record untouched, unless running.
    pub fn abort(&mut self, stop_time: f64, fault: impl Into<String>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stop_time = Some(stop_time);
        self.fault = Some(fault.into());
        self.status = MissionState::Aborted;
        true
    }

    /// Duration in seconds, up to `now` while still running.
    pub fn duration(&self, now: f64) -> f64 {
        self.stop_time.unwrap_or(now) - self.start_time
    }

    /// JSON event line including the mission id.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&MissionRecord {
            mission_id: self.mission_id(),
            mission: self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mission_id_is_start_millis() {
        let m = Mission::start("Mowing", 1_700_000_000.1234);
        assert_eq!(m.mission_id(), "1700000000123");
    }

    #[test]
    fn test_finishes_once() {
        let mut m = Mission::start("Turns", 10.0);
        assert!(m.complete(12.5));
        assert!(!m.abort(13.0, "late"));
        assert_eq!(m.status, MissionState::Completed);
        assert_eq!(m.fault, None);
        assert_relative_eq!(m.duration(100.0), 2.5);

        let mut m = Mission::start("Turns", 10.0);
        assert!(m.abort(11.0, "cancelled"));
        assert!(!m.complete(12.0));
        assert_eq!(m.status, MissionState::Aborted);
        assert_eq!(m.fault.as_deref(), Some("cancelled"));
    }

    #[test]
    fn test_json_event() {
        let mut m = Mission::start("Triangle", 2.0);
        let running: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        assert_eq!(running["mission_id"], "2000");
        assert_eq!(running["status"], "Running");
        assert!(running.get("stop_time").is_none());

        m.abort(3.0, "cancelled");
        let aborted: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        assert_eq!(aborted["status"], "Aborted");
        assert_eq!(aborted["fault"], "cancelled");
        assert_eq!(aborted["stop_time"], 3.0);
    }
}
