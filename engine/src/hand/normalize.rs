//! Landmark normalizer: raw image-space landmarks to interaction space.
//!
//! `x' = (x - 0.5) * sx`, `y' = -(y - 0.5) * sy`, `z' = -z * sz`.
//! The scale constants size the mapped hand range to the object's world.

use super::landmarks::Landmark;
use crate::interaction::math::Vec3;

/// Axis scales for the image-to-interaction mapping.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub scale_x: f32,
    pub scale_y: f32,
    pub scale_z: f32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            scale_x: 6.0,
            scale_y: 4.0,
            scale_z: 2.0,
        }
    }
}

/// Fixed affine mapping into interaction space. Pure, no state.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    pub config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, lm: &Landmark) -> Vec3 {
        [
            (lm.x - 0.5) * self.config.scale_x,
            -(lm.y - 0.5) * self.config.scale_y,
            -lm.z * self.config.scale_z,
        ]
    }

    /// Inverse of `normalize`, used to place synthetic hands.
    pub fn denormalize(&self, p: Vec3) -> Landmark {
        Landmark::new(
            p[0] / self.config.scale_x + 0.5,
            0.5 - p[1] / self.config.scale_y,
            -p[2] / self.config.scale_z,
        )
    }
}
