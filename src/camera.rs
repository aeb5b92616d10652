//! Camera, projection and the orbit controller.
//!
//! The controller orbits the camera around a target point on a sphere. Pointer
//! drags and wheel steps accumulate into a pending spherical delta which is
//! applied, damped, on every [`OrbitController::update`]. Polar angle, azimuth
//! and distance are clamped to the configured limits.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::event::{MouseScrollDelta, WindowEvent};

use crate::config::{CameraConfig, OrbitConfig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps `phi` away from the poles where the view matrix degenerates.
const POLE_EPSILON: f32 = 0.000_001;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            target: Point3::origin(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn from_config(width: u32, height: u32, config: &CameraConfig) -> Self {
        Self::new(
            width,
            height,
            cgmath::Deg(config.fovy),
            config.znear,
            config.zfar,
        )
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Radius, polar angle from +Y (`phi`) and azimuth around +Y measured from +Z (`theta`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Clamps an azimuth into `[min, max]` after wrapping both limits into `[-PI, PI]`.
///
/// When the wrapped interval is inverted it spans the `±PI` seam, and `theta` is
/// pulled toward whichever limit is closer.
pub fn clamp_azimuth(theta: f32, min: f32, max: f32) -> f32 {
    if !min.is_finite() || !max.is_finite() {
        return theta;
    }
    let wrap = |angle: f32| {
        if angle < -PI {
            angle + 2.0 * PI
        } else if angle > PI {
            angle - 2.0 * PI
        } else {
            angle
        }
    };
    let (min, max) = (wrap(min), wrap(max));
    if min <= max {
        theta.clamp(min, max)
    } else if theta > (min + max) / 2.0 {
        theta.max(min)
    } else {
        theta.min(max)
    }
}

#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Point3<f32>,
    limits: OrbitConfig,
    spherical_delta: Spherical,
    scale: f32,
}

impl OrbitController {
    pub fn new(limits: OrbitConfig) -> Self {
        Self {
            target: Point3::origin(),
            limits,
            spherical_delta: Spherical {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            },
            scale: 1.0,
        }
    }

    pub fn limits(&self) -> &OrbitConfig {
        &self.limits
    }

    /// Queues a rotation for a pointer drag of `(dx, dy)` pixels on a viewport
    /// `viewport_height` pixels tall. A full-height drag turns by one revolution.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64, viewport_height: u32) {
        let height = viewport_height.max(1) as f32;
        let speed = self.limits.rotate_speed;
        self.spherical_delta.theta -= 2.0 * PI * dx as f32 / height * speed;
        self.spherical_delta.phi -= 2.0 * PI * dy as f32 / height * speed;
    }

    /// Positive `steps` zoom in.
    pub fn handle_scroll(&mut self, steps: f32) {
        let zoom_scale = 0.95f32.powf(self.limits.zoom_speed);
        if steps > 0.0 {
            self.scale *= zoom_scale;
        } else if steps < 0.0 {
            self.scale /= zoom_scale;
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        if let WindowEvent::MouseWheel { delta, .. } = event {
            let steps = match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
            };
            self.handle_scroll(steps);
        }
    }

    /// Applies the pending motion to `camera` and decays it by the damping factor.
    pub fn update(&mut self, camera: &mut Camera) {
        let damping = self.limits.damping_factor;
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        spherical.theta += self.spherical_delta.theta * damping;
        spherical.phi += self.spherical_delta.phi * damping;

        spherical.theta = clamp_azimuth(
            spherical.theta,
            self.limits.min_azimuth_angle,
            self.limits.max_azimuth_angle,
        );
        // max/min rather than clamp: limits come from user config and may be inverted
        spherical.phi = spherical
            .phi
            .max(self.limits.min_polar_angle)
            .min(self.limits.max_polar_angle)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);

        spherical.radius = (spherical.radius * self.scale)
            .max(self.limits.min_distance)
            .min(self.limits.max_distance);

        camera.position = self.target + spherical.to_offset();
        camera.target = self.target;

        self.spherical_delta.theta *= 1.0 - damping;
        self.spherical_delta.phi *= 1.0 - damping;
        self.scale = 1.0;
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}
