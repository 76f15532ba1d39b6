//! The manipulable object: transform, visual feedback and physics overlay.

use super::math::{add, lerp, scale, Vec3, ZERO};

/// Velocities below this are snapped to zero so a resting object is exactly still.
const REST_EPSILON: f32 = 1e-5;

// ── Bounds ─────────────────────────────────────────────────

/// Axis-aligned box the object position is clamped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: [-3.0, -2.0, -2.0],
            max: [3.0, 2.0, 2.0],
        }
    }
}

impl Bounds {
    pub fn clamp(&self, p: Vec3) -> Vec3 {
        [
            p[0].clamp(self.min[0], self.max[0]),
            p[1].clamp(self.min[1], self.max[1]),
            p[2].clamp(self.min[2], self.max[2]),
        ]
    }

    pub fn contains(&self, p: Vec3) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }
}

// ── Physics ────────────────────────────────────────────────

/// Damping and optional free fall, applied per frame while not held.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Per-frame velocity multiplier (0.0-1.0).
    pub damping: f32,
    pub gravity_enabled: bool,
    /// Per-frame change of vertical velocity when gravity is on.
    pub gravity: f32,
    pub floor_y: f32,
    /// Fraction of vertical speed kept on a floor bounce.
    pub restitution: f32,
    /// Angular velocity multiplier on a floor bounce.
    pub bounce_spin_damping: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            damping: 0.95,
            gravity_enabled: false,
            gravity: -0.001,
            floor_y: -1.5,
            restitution: 0.6,
            bounce_spin_damping: 0.8,
        }
    }
}

// ── Transform ──────────────────────────────────────────────

/// Position, orientation and scale of the cube plus its motion state.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTransform {
    pub position: Vec3,
    /// Euler angles (x, y, z) in radians.
    pub rotation: Vec3,
    /// Uniform manipulated scale, always within the configured range.
    pub scale: f32,
    /// Per-frame linear velocity.
    pub velocity: Vec3,
    /// Per-frame angular velocity (radians).
    pub angular_velocity: Vec3,
    pub rest_position: Vec3,
}

impl ObjectTransform {
    pub fn new(rest_position: Vec3) -> Self {
        Self {
            position: rest_position,
            rotation: ZERO,
            scale: 1.0,
            velocity: ZERO,
            angular_velocity: ZERO,
            rest_position,
        }
    }

    pub fn stop(&mut self) {
        self.velocity = ZERO;
        self.angular_velocity = ZERO;
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.iter().chain(self.angular_velocity.iter()).any(|v| *v != 0.0)
    }

    /// Clamp into `bounds`, killing velocity on the clamped axes.
    pub fn clamp_to(&mut self, bounds: &Bounds) {
        let clamped = bounds.clamp(self.position);
        for i in 0..3 {
            if clamped[i] != self.position[i] {
                self.velocity[i] = 0.0;
            }
        }
        self.position = clamped;
    }

    /// Advance one frame of free motion.
    pub fn step(&mut self, physics: &PhysicsConfig, bounds: &Bounds) {
        if physics.gravity_enabled {
            self.velocity[1] += physics.gravity;
        }

        self.position = add(self.position, self.velocity);
        self.rotation = add(self.rotation, self.angular_velocity);
        self.velocity = scale(self.velocity, physics.damping);
        self.angular_velocity = scale(self.angular_velocity, physics.damping);

        if physics.gravity_enabled && self.position[1] < physics.floor_y {
            self.position[1] = physics.floor_y;
            self.velocity[1] *= -physics.restitution;
            self.angular_velocity = scale(self.angular_velocity, physics.bounce_spin_damping);
        }

        self.clamp_to(bounds);

        for v in self.velocity.iter_mut().chain(self.angular_velocity.iter_mut()) {
            if v.abs() < REST_EPSILON {
                *v = 0.0;
            }
        }
    }
}

// ── Appearance ─────────────────────────────────────────────

/// Visual feedback layered over the transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    /// Feedback multiplier on top of `ObjectTransform::scale`.
    pub feedback_scale: f32,
    /// RGB colour as 0xRRGGBB.
    pub color: u32,
    pub opacity: f32,
}

impl Appearance {
    pub const REST: Appearance = Appearance {
        feedback_scale: 1.0,
        color: 0xff3030,
        opacity: 0.9,
    };

    pub fn ease_scale(&mut self, target: f32, t: f32) {
        self.feedback_scale = lerp(self.feedback_scale, target, t);
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self::REST
    }
}
