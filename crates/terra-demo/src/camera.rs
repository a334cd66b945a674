//! Scripted orbit camera.

use glam::{DMat4, DVec3};
use terra_config::CameraConfig;
use terra_lod::{CameraView, Planet};

/// Circles the planet's polar axis at a fixed distance and pitch.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    centre: DVec3,
    radius: f64,
    distance: f64,
    pitch: f64,
    yaw: f64,
    yaw_step: f64,
    fov_y: f64,
    aspect: f64,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, planet: &Planet) -> Self {
        let height = f64::from(config.viewport_height.max(1));
        Self {
            centre: planet.position,
            radius: planet.radius,
            distance: config.start_distance_radii.max(1.0 + 1e-6) * planet.radius,
            pitch: config.pitch_degrees.clamp(-89.0, 89.0).to_radians(),
            yaw: 0.0,
            yaw_step: config.orbit_degrees_per_frame.to_radians(),
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: f64::from(config.viewport_width.max(1)) / height,
        }
    }

    pub fn position(&self) -> DVec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.centre + DVec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    pub fn altitude(&self) -> f64 {
        self.distance - self.radius
    }

    pub fn fov_y(&self) -> f64 {
        self.fov_y
    }

    /// Move one frame along the orbit.
    pub fn advance(&mut self) {
        self.yaw = (self.yaw + self.yaw_step).rem_euclid(std::f64::consts::TAU);
    }

    pub fn view(&self) -> CameraView {
        CameraView::looking_at(self.position(), self.centre)
    }

    /// Perspective with clip planes hugging the visible part of the planet.
    pub fn view_projection(&self) -> DMat4 {
        let near = (0.5 * self.altitude()).max(1e-4 * self.radius);
        let far = self.distance + self.radius;
        let projection = DMat4::perspective_rh_gl(self.fov_y, self.aspect, near, far);
        projection * DMat4::look_at_rh(self.position(), self.centre, DVec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(pitch_degrees: f64) -> OrbitCamera {
        let config = CameraConfig {
            start_distance_radii: 2.0,
            orbit_degrees_per_frame: 90.0,
            pitch_degrees,
            ..CameraConfig::default()
        };
        OrbitCamera::new(&config, &Planet::new(100.0))
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = camera(30.0);
        for _ in 0..7 {
            assert!((camera.position().length() - 200.0).abs() < 1e-9);
            camera.advance();
        }
        assert!((camera.altitude() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_quarter_turn_moves_to_positive_x() {
        let mut camera = camera(0.0);
        assert!((camera.position() - DVec3::new(0.0, 0.0, 200.0)).length() < 1e-9);
        camera.advance();
        assert!((camera.position() - DVec3::new(200.0, 0.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_view_looks_at_centre() {
        let camera = camera(45.0);
        let view = camera.view();
        let expected = -camera.position().normalize();
        assert!((view.forward - expected).length() < 1e-12);
    }

    #[test]
    fn test_planet_centre_projects_inside_clip_volume() {
        let camera = camera(10.0);
        let clip = camera.view_projection() * DVec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-9 && ndc.y.abs() < 1e-9);
        assert!(ndc.z > -1.0 && ndc.z < 1.0, "centre lies between the clip planes");
    }

    #[test]
    fn test_pitch_is_clamped_below_pole() {
        let camera = camera(120.0);
        assert!(camera.position().y < 200.0);
    }
}
