use glam::{Mat4, Vec3};

/// Perspective camera looking from `eye` at `target`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(3.0, 2.5, 4.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            ..Self::default()
        }
    }

    /// Places the eye on a circle of `radius` around `target` at `height`.
    pub fn orbit(target: Vec3, radius: f32, height: f32, angle: f32) -> Self {
        let eye = target + Vec3::new(radius * angle.cos(), height, radius * angle.sin());
        Self::look_at(eye, target)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Right-handed projection with wgpu's 0..1 depth range.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(1e-4), self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }
}

/// Single directional light.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels (need not be normalized).
    pub direction: Vec3,
    /// Ambient term added to diffuse lighting, 0..1.
    pub ambient: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.4, -1.0, -0.3),
            ambient: 0.15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_projects_to_screen_center() {
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let clip = cam.view_proj(16.0 / 9.0) * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn orbit_keeps_distance() {
        let cam = Camera::orbit(Vec3::ZERO, 4.0, 0.0, 1.3);
        assert!((cam.eye.length() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn zero_aspect_does_not_produce_nan() {
        let m = Camera::default().projection(0.0);
        assert!(m.is_finite());
    }
}
