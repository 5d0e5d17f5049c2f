//! Configuration loading for Marga
//!
//! All sections are optional in the TOML file; missing fields fall back to
//! the defaults below.

use crate::core::math::sq;
use crate::core::Point2D;
use crate::error::{MargaError, Result};
use crate::geometry::{Polygon, Ring};
use serde::Deserialize;
use std::f64::consts::FRAC_PI_2;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MargaConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub geofence: GeofenceConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub missions: MissionsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Gains and limits of the steering laws.
///
/// The shared laws (`angle_to_line`, `speed_from_distance`, `speed_from_angle`,
/// `omega_from_angle`) are methods so every controller reads one copy.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ControlConfig {
    /// Cruise speed in m/s (default: 0.3)
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Maximum turn rate in rad/s (default: 0.2)
    #[serde(default = "default_omega")]
    pub omega: f64,

    /// Cross-track distance scale of the line approach angle (default: 0.2 m)
    #[serde(default = "default_theta_distance")]
    pub theta_distance: f64,

    /// Heading error scale of the speed reduction (default: 0.25 rad)
    #[serde(default = "default_speed_theta")]
    pub speed_theta: f64,

    /// Distance over which speed relaxes towards a target (default: 2.0)
    #[serde(default = "default_speed_relax")]
    pub speed_relax: f64,

    /// Minimum speed near a target (default: 0.02 m/s)
    #[serde(default = "default_speed_overshoot")]
    pub speed_overshoot: f64,

    /// Heading error over which omega relaxes (default: 1.0)
    #[serde(default = "default_omega_relax")]
    pub omega_relax: f64,

    /// Minimum turn rate for a non-zero heading error (default: 0.01 rad/s)
    #[serde(default = "default_omega_overshoot")]
    pub omega_overshoot: f64,

    /// Early-termination distance for line following in missions (default: 1.0 m)
    #[serde(default = "default_proximity")]
    pub proximity: f64,
}

impl ControlConfig {
    /// Approach angle towards a line at cross-track distance `d`.
    ///
    /// Zero on the line, tending to π/2 far from it.
    pub fn angle_to_line(&self, d: f64) -> f64 {
        FRAC_PI_2 * (1.0 - (-sq(d / self.theta_distance)).exp())
    }

    /// Speed limit at distance `d` from the target.
    pub fn speed_from_distance(&self, d: f64) -> f64 {
        (d / self.speed_relax + self.speed_overshoot).min(self.speed)
    }

    /// Speed for heading error `angle`; slows down on large errors.
    pub fn speed_from_angle(&self, angle: f64) -> f64 {
        self.speed * (-sq(angle / self.speed_theta)).exp()
    }

    /// Turn rate for heading error `angle`, signed like the error.
    pub fn omega_from_angle(&self, angle: f64) -> f64 {
        if angle == 0.0 {
            return 0.0;
        }
        (angle.abs() / self.omega_relax + self.omega_overshoot)
            .min(self.omega)
            .copysign(angle)
    }

    /// Check gains against the robot limits.
    pub fn validate(&self, robot: &RobotConfig) -> Result<()> {
        if self.speed <= 0.0 || self.speed > robot.max_speed {
            return Err(MargaError::Config(format!(
                "control speed {} must be in (0, {}]",
                self.speed, robot.max_speed
            )));
        }
        if self.omega <= 0.0 || self.omega > robot.max_omega {
            return Err(MargaError::Config(format!(
                "control omega {} must be in (0, {}]",
                self.omega, robot.max_omega
            )));
        }
        let scales = [
            ("theta_distance", self.theta_distance),
            ("speed_theta", self.speed_theta),
            ("speed_relax", self.speed_relax),
            ("omega_relax", self.omega_relax),
        ];
        for (name, value) in scales {
            if value <= 0.0 {
                return Err(MargaError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            omega: default_omega(),
            theta_distance: default_theta_distance(),
            speed_theta: default_speed_theta(),
            speed_relax: default_speed_relax(),
            speed_overshoot: default_speed_overshoot(),
            omega_relax: default_omega_relax(),
            omega_overshoot: default_omega_overshoot(),
            proximity: default_proximity(),
        }
    }
}

/// On-site check of the robot position against the site exterior.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct GeofenceConfig {
    /// Stop the robot while it is off site (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between on-site recomputations (default: 1.0)
    #[serde(default = "default_geofence_interval")]
    pub interval: f64,

    /// Required clearance inside the site boundary in meters (default: 0.2)
    #[serde(default = "default_geofence_buffer")]
    pub buffer: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_geofence_interval(),
            buffer: default_geofence_buffer(),
        }
    }
}

/// Mission runner timing.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RunnerConfig {
    /// Wait for a pose before stopping the robot (default: 1.0 s)
    #[serde(default = "default_pose_timeout")]
    pub pose_timeout_secs: f64,

    /// Lifetime of a published move command on the robot clock (default: 2.0 s)
    #[serde(default = "default_command_validity")]
    pub command_validity_secs: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pose_timeout_secs: default_pose_timeout(),
            command_validity_secs: default_command_validity(),
        }
    }
}

/// Area coverage planning.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CoverageConfig {
    /// Shape area below which a ring counts as covered (default: 0.0001 m²)
    #[serde(default = "default_min_area")]
    pub min_area: f64,

    /// Mitre length limit, in multiples of the offset distance (default: 5.0)
    #[serde(default = "default_mitre_limit")]
    pub mitre_limit: f64,

    /// Tolerance outside the fence for planned paths (default: 0.01 m)
    #[serde(default = "default_fence_buffer")]
    pub fence_buffer: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_area: default_min_area(),
            mitre_limit: default_mitre_limit(),
            fence_buffer: default_fence_buffer(),
        }
    }
}

/// Robot physical parameters
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RobotConfig {
    /// Distance between wheels in meters (default: 0.4)
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f64,

    /// Maximum wheel speed in m/s (default: 0.5)
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,

    /// Maximum turn rate in rad/s (default: 1.0)
    #[serde(default = "default_max_omega")]
    pub max_omega: f64,

    /// Cutter diameter in meters (default: 0.3)
    #[serde(default = "default_cut_diameter")]
    pub cut_diameter: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_base: default_wheel_base(),
            max_speed: default_max_speed(),
            max_omega: default_max_omega(),
            cut_diameter: default_cut_diameter(),
        }
    }
}

/// Site geometry in local metric coordinates.
#[derive(Clone, Debug, Deserialize)]
pub struct SiteConfig {
    /// Site boundary vertices (default: 20 m square)
    #[serde(default = "default_exterior")]
    pub exterior: Vec<[f64; 2]>,

    /// Obstacles inside the site
    #[serde(default)]
    pub holes: Vec<Vec<[f64; 2]>>,

    /// Area of interest for mowing; the whole exterior when absent
    #[serde(default)]
    pub aoi: Option<Vec<[f64; 2]>>,

    /// Dock position
    #[serde(default = "default_dock")]
    pub dock: [f64; 2],
}

impl SiteConfig {
    /// Site fence: exterior with holes.
    pub fn fence(&self) -> Result<Polygon> {
        let exterior = ring_from(&self.exterior)?;
        let holes = self
            .holes
            .iter()
            .map(|h| ring_from(h))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(exterior, holes))
    }

    /// Area of interest ring, falling back to the exterior.
    pub fn area_of_interest(&self) -> Result<Ring> {
        match &self.aoi {
            Some(aoi) => ring_from(aoi),
            None => ring_from(&self.exterior),
        }
    }

    pub fn dock(&self) -> Point2D {
        Point2D::from(self.dock)
    }
}

fn ring_from(coords: &[[f64; 2]]) -> Result<Ring> {
    Ring::new(coords.iter().copied().map(Point2D::from).collect())
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            exterior: default_exterior(),
            holes: Vec::new(),
            aoi: None,
            dock: default_dock(),
        }
    }
}

/// Parameters of the built-in missions.
#[derive(Clone, Debug, Deserialize)]
pub struct MissionsConfig {
    /// Scan/loop rectangle as [x0, y0, x1, y1] (default: [2, 2, 8, 6])
    #[serde(default = "default_rectangle")]
    pub rectangle: [f64; 4],

    /// Number of laps for lap missions (default: 3)
    #[serde(default = "default_laps")]
    pub laps: usize,

    /// Triangle patrol vertices
    #[serde(default = "default_triangle")]
    pub triangle: Vec<[f64; 2]>,

    /// Pause between turns in seconds (default: 5.0)
    #[serde(default = "default_pause")]
    pub pause_secs: f64,
}

impl Default for MissionsConfig {
    fn default() -> Self {
        Self {
            rectangle: default_rectangle(),
            laps: default_laps(),
            triangle: default_triangle(),
            pause_secs: default_pause(),
        }
    }
}

/// Simulated robot used by the binary.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct SimulationConfig {
    /// Pose publishing rate (default: 10 Hz)
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Start pose as [x, y, theta] (default: [2, 2, 0])
    #[serde(default = "default_start")]
    pub start: [f64; 3],

    /// Simulated seconds per wall-clock second (default: 1.0)
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            start: default_start(),
            time_scale: default_time_scale(),
        }
    }
}

// Default value functions
fn default_speed() -> f64 {
    0.3
}
fn default_omega() -> f64 {
    0.2
}
fn default_theta_distance() -> f64 {
    0.2
}
fn default_speed_theta() -> f64 {
    0.25
}
fn default_speed_relax() -> f64 {
    2.0
}
fn default_speed_overshoot() -> f64 {
    0.02
}
fn default_omega_relax() -> f64 {
    1.0
}
fn default_omega_overshoot() -> f64 {
    0.01
}
fn default_proximity() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_geofence_interval() -> f64 {
    1.0
}
fn default_geofence_buffer() -> f64 {
    0.2
}
fn default_pose_timeout() -> f64 {
    1.0
}
fn default_command_validity() -> f64 {
    2.0
}
fn default_min_area() -> f64 {
    0.0001
}
fn default_mitre_limit() -> f64 {
    5.0
}
fn default_fence_buffer() -> f64 {
    0.01
}
fn default_wheel_base() -> f64 {
    0.4
}
fn default_max_speed() -> f64 {
    0.5
}
fn default_max_omega() -> f64 {
    1.0
}
fn default_cut_diameter() -> f64 {
    0.3
}
fn default_exterior() -> Vec<[f64; 2]> {
    vec![[0.0, 0.0], [20.0, 0.0], [20.0, 20.0], [0.0, 20.0]]
}
fn default_dock() -> [f64; 2] {
    [1.0, 1.0]
}
fn default_rectangle() -> [f64; 4] {
    [2.0, 2.0, 8.0, 6.0]
}
fn default_laps() -> usize {
    3
}
fn default_triangle() -> Vec<[f64; 2]> {
    vec![[4.0, 2.0], [4.0, 5.0], [1.5, 2.0]]
}
fn default_pause() -> f64 {
    5.0
}
fn default_rate_hz() -> f64 {
    10.0
}
fn default_start() -> [f64; 3] {
    [2.0, 2.0, 0.0]
}
fn default_time_scale() -> f64 {
    1.0
}

impl MargaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MargaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the controllers cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.control.validate(&self.robot)?;
        if self.geofence.interval < 0.0 || self.geofence.buffer < 0.0 {
            return Err(MargaError::Config(
                "geofence interval and buffer must not be negative".to_string(),
            ));
        }
        if self.runner.pose_timeout_secs <= 0.0 || self.runner.command_validity_secs <= 0.0 {
            return Err(MargaError::Config(
                "runner timeouts must be positive".to_string(),
            ));
        }
        if self.coverage.min_area < 0.0 || self.coverage.mitre_limit < 1.0 {
            return Err(MargaError::Config(
                "coverage min_area must be >= 0 and mitre_limit >= 1".to_string(),
            ));
        }
        if self.simulation.rate_hz <= 0.0 || self.simulation.time_scale <= 0.0 {
            return Err(MargaError::Config(
                "simulation rate and time scale must be positive".to_string(),
            ));
        }
        self.site.fence()?;
        self.site.area_of_interest()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_default_laws() {
        let c = ControlConfig::default();
        assert_relative_eq!(c.angle_to_line(0.0), 0.0);
        assert!(c.angle_to_line(10.0) > 1.57);
        assert_relative_eq!(c.speed_from_distance(10.0), c.speed);
        assert_relative_eq!(c.speed_from_distance(0.0), c.speed_overshoot);
        assert_relative_eq!(c.speed_from_angle(0.0), c.speed);
        assert_eq!(c.omega_from_angle(0.0), 0.0);
        assert_relative_eq!(c.omega_from_angle(0.05), 0.06);
        assert_relative_eq!(c.omega_from_angle(-2.0), -c.omega);
    }

    #[test]
    fn test_validate_rejects_fast_speed() {
        let mut config = MargaConfig::default();
        assert!(config.validate().is_ok());
        config.control.speed = 2.0;
        assert!(matches!(config.validate(), Err(MargaError::Config(_))));
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[control]
speed = 0.25

[geofence]
enabled = false

[site]
exterior = [[0.0, 0.0], [10.0, 0.0], [10.0, 5.0], [0.0, 5.0]]
holes = [[[4.0, 2.0], [5.0, 2.0], [5.0, 3.0], [4.0, 3.0]]]
"#
        )
        .unwrap();

        let config = MargaConfig::load(file.path()).unwrap();
        assert_relative_eq!(config.control.speed, 0.25);
        assert_relative_eq!(config.control.omega, 0.2);
        assert!(!config.geofence.enabled);
        assert_relative_eq!(config.geofence.buffer, 0.2);
        let fence = config.site.fence().unwrap();
        assert_eq!(fence.holes().len(), 1);
        assert_relative_eq!(fence.area(), 49.0);
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[control\nspeed = ").unwrap();
        assert!(matches!(
            MargaConfig::load(file.path()),
            Err(MargaError::Config(_))
        ));
    }
}
