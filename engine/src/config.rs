//! Engine configuration.
//!
//! Every component owns its own `*Config` with defaults; `EngineConfig`
//! aggregates them and can be loaded from an s-expression plist such as
//!
//! ```text
//! (:grab-distance 0.8 :hover-distance 1.2 :pinch-threshold 0.08
//!  :gravity nil :bounds-min (-3 -2 -2) :bounds-max (3 2 2))
//! ```
//!
//! Missing keys keep their defaults.  Present but unparsable values and
//! inconsistent combinations are errors.

use std::path::Path;

use anyhow::{bail, Context};
use lexpr::Value;
use tracing::info;

use crate::hand::{ClassifierConfig, NormalizerConfig, TrackerConfig};
use crate::interaction::math::Vec3;
use crate::interaction::{InteractionConfig, PhysicsConfig, WatchdogConfig};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub normalizer: NormalizerConfig,
    pub classifier: ClassifierConfig,
    pub tracker: TrackerConfig,
    pub interaction: InteractionConfig,
    pub physics: PhysicsConfig,
    pub watchdog: WatchdogConfig,
}

impl EngineConfig {
    pub fn from_sexp(text: &str) -> anyhow::Result<Self> {
        let value = lexpr::from_str(text).context("config is not a valid s-expression")?;
        Self::from_value(&value)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config =
            Self::from_sexp(&text).with_context(|| format!("in config {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_value(value: &Value) -> anyhow::Result<Self> {
        if !(value.is_cons() || value.is_null()) {
            bail!("config must be a plist, got {}", value);
        }
        let mut c = Self::default();

        let n = &mut c.normalizer;
        set_float(value, "scale-x", &mut n.scale_x)?;
        set_float(value, "scale-y", &mut n.scale_y)?;
        set_float(value, "scale-z", &mut n.scale_z)?;

        let g = &mut c.classifier;
        set_float(value, "grab-threshold", &mut g.grab_threshold)?;
        set_float(value, "pinch-threshold", &mut g.pinch_threshold)?;
        set_float(value, "min-confidence", &mut g.min_confidence)?;
        if let Some(v) = get_int(value, "min-closed-fingers")? {
            if !(1..=5).contains(&v) {
                bail!(":min-closed-fingers must be 1-5, got {}", v);
            }
            g.min_closed_fingers = v as u8;
        }

        set_float(value, "max-match-distance", &mut c.tracker.max_match_distance)?;

        let i = &mut c.interaction;
        set_float(value, "grab-distance", &mut i.grab_distance)?;
        set_float(value, "hover-distance", &mut i.hover_distance)?;
        set_float(value, "two-hand-proximity", &mut i.two_hand_proximity)?;
        set_float(value, "reference-distance", &mut i.reference_distance)?;
        set_float(value, "scale-min", &mut i.scale_min)?;
        set_float(value, "scale-max", &mut i.scale_max)?;
        set_float(value, "follow-lerp", &mut i.follow_lerp)?;
        set_float(value, "two-hand-position-lerp", &mut i.two_hand_position_lerp)?;
        set_float(value, "two-hand-rotation-lerp", &mut i.two_hand_rotation_lerp)?;
        set_float(value, "attraction-gain", &mut i.attraction_gain)?;
        set_float(value, "release-velocity-gain", &mut i.release_velocity_gain)?;
        set_float(value, "rotation-rate-gain", &mut i.rotation_rate_gain)?;
        set_float(value, "rotation-axis-gain", &mut i.rotation_axis_gain)?;
        set_float(value, "roll-gain", &mut i.roll_gain)?;
        if let Some(v) = get_vec3(value, "bounds-min")? {
            i.bounds.min = v;
        }
        if let Some(v) = get_vec3(value, "bounds-max")? {
            i.bounds.max = v;
        }
        if let Some(v) = get_vec3(value, "rest-position")? {
            i.rest_position = v;
        }

        let p = &mut c.physics;
        set_float(value, "damping", &mut p.damping)?;
        if let Some(v) = get_bool(value, "gravity") {
            p.gravity_enabled = v;
        }
        set_float(value, "gravity-accel", &mut p.gravity)?;
        set_float(value, "floor-y", &mut p.floor_y)?;
        set_float(value, "restitution", &mut p.restitution)?;

        if let Some(v) = get_float(value, "stall-threshold-ms")? {
            c.watchdog.stall_threshold_ms = v;
        }

        c.validate()?;
        Ok(c)
    }

    /// Reject combinations the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let n = &self.normalizer;
        positive("scale-x", n.scale_x)?;
        positive("scale-y", n.scale_y)?;
        positive("scale-z", n.scale_z)?;

        let g = &self.classifier;
        positive("grab-threshold", g.grab_threshold)?;
        positive("pinch-threshold", g.pinch_threshold)?;
        unit("min-confidence", g.min_confidence)?;
        positive("max-match-distance", self.tracker.max_match_distance)?;

        let i = &self.interaction;
        positive("grab-distance", i.grab_distance)?;
        positive("hover-distance", i.hover_distance)?;
        if i.hover_distance < i.grab_distance {
            bail!(
                ":hover-distance {} is inside :grab-distance {}",
                i.hover_distance,
                i.grab_distance
            );
        }
        positive("two-hand-proximity", i.two_hand_proximity)?;
        positive("reference-distance", i.reference_distance)?;
        positive("scale-min", i.scale_min)?;
        positive("scale-max", i.scale_max)?;
        if i.scale_min > i.scale_max {
            bail!(":scale-min {} exceeds :scale-max {}", i.scale_min, i.scale_max);
        }
        lerp_factor("follow-lerp", i.follow_lerp)?;
        lerp_factor("two-hand-position-lerp", i.two_hand_position_lerp)?;
        lerp_factor("two-hand-rotation-lerp", i.two_hand_rotation_lerp)?;
        unit("attraction-gain", i.attraction_gain)?;
        unit("release-velocity-gain", i.release_velocity_gain)?;
        non_negative("rotation-rate-gain", i.rotation_rate_gain)?;
        non_negative("rotation-axis-gain", i.rotation_axis_gain)?;
        non_negative("roll-gain", i.roll_gain)?;
        if !i.bounds.is_valid() {
            bail!("bounds min {:?} exceeds max {:?}", i.bounds.min, i.bounds.max);
        }
        if !i.bounds.contains(i.rest_position) {
            bail!("rest position {:?} lies outside the bounds", i.rest_position);
        }

        let p = &self.physics;
        unit("damping", p.damping)?;
        unit("restitution", p.restitution)?;
        if !p.gravity.is_finite() || !p.floor_y.is_finite() {
            bail!("gravity settings must be finite");
        }

        let stall = self.watchdog.stall_threshold_ms;
        if !(stall.is_finite() && stall > 0.0) {
            bail!(":stall-threshold-ms must be positive, got {}", stall);
        }
        Ok(())
    }

    /// Generate s-expression for the effective configuration.
    pub fn config_sexp(&self) -> String {
        let n = &self.normalizer;
        let g = &self.classifier;
        let i = &self.interaction;
        let p = &self.physics;
        let v = |a: Vec3| format!("({:.2} {:.2} {:.2})", a[0], a[1], a[2]);
        format!(
            "(:scale-x {:.2} :scale-y {:.2} :scale-z {:.2} :grab-threshold {:.3} :pinch-threshold {:.3} :min-closed-fingers {} :min-confidence {:.2} :max-match-distance {:.2} :grab-distance {:.3} :hover-distance {:.3} :two-hand-proximity {:.3} :reference-distance {:.3} :scale-min {:.2} :scale-max {:.2} :follow-lerp {:.2} :two-hand-position-lerp {:.2} :two-hand-rotation-lerp {:.2} :attraction-gain {:.4} :release-velocity-gain {:.2} :rotation-rate-gain {:.2} :rotation-axis-gain {:.2} :roll-gain {:.2} :bounds-min {} :bounds-max {} :rest-position {} :damping {:.3} :gravity {} :gravity-accel {:.4} :floor-y {:.2} :restitution {:.2} :stall-threshold-ms {:.0})",
            n.scale_x,
            n.scale_y,
            n.scale_z,
            g.grab_threshold,
            g.pinch_threshold,
            g.min_closed_fingers,
            g.min_confidence,
            self.tracker.max_match_distance,
            i.grab_distance,
            i.hover_distance,
            i.two_hand_proximity,
            i.reference_distance,
            i.scale_min,
            i.scale_max,
            i.follow_lerp,
            i.two_hand_position_lerp,
            i.two_hand_rotation_lerp,
            i.attraction_gain,
            i.release_velocity_gain,
            i.rotation_rate_gain,
            i.rotation_axis_gain,
            i.roll_gain,
            v(i.bounds.min),
            v(i.bounds.max),
            v(i.rest_position),
            p.damping,
            if p.gravity_enabled { "t" } else { "nil" },
            p.gravity,
            p.floor_y,
            p.restitution,
            self.watchdog.stall_threshold_ms,
        )
    }
}

fn positive(name: &str, v: f32) -> anyhow::Result<()> {
    if !(v.is_finite() && v > 0.0) {
        bail!(":{} must be positive, got {}", name, v);
    }
    Ok(())
}

fn non_negative(name: &str, v: f32) -> anyhow::Result<()> {
    if !(v.is_finite() && v >= 0.0) {
        bail!(":{} must be zero or more, got {}", name, v);
    }
    Ok(())
}

fn unit(name: &str, v: f32) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&v) {
        bail!(":{} must be within 0-1, got {}", name, v);
    }
    Ok(())
}

fn lerp_factor(name: &str, v: f32) -> anyhow::Result<()> {
    if !(v > 0.0 && v <= 1.0) {
        bail!(":{} must be within (0, 1], got {}", name, v);
    }
    Ok(())
}

// ── Plist access ───────────────────────────────────────────

/// Find the value following `:key` in a plist.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Scalar value rendered as a string, `nil`/`t` for booleans.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    Some(match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s = v.to_string();
            s.strip_prefix(':').unwrap_or(&s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "t" } else { "nil" }).to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    })
}

fn get_float(value: &Value, key: &str) -> anyhow::Result<Option<f64>> {
    match get_keyword(value, key) {
        None => Ok(None),
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => bail!(":{} expects a number, got {}", key, s),
        },
    }
}

fn set_float(value: &Value, key: &str, target: &mut f32) -> anyhow::Result<()> {
    if let Some(v) = get_float(value, key)? {
        *target = v as f32;
    }
    Ok(())
}

fn get_int(value: &Value, key: &str) -> anyhow::Result<Option<i64>> {
    match get_keyword(value, key) {
        None => Ok(None),
        Some(s) => match s.parse::<i64>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => bail!(":{} expects an integer, got {}", key, s),
        },
    }
}

/// Treats `nil` and `#f` as false, anything else as true.
fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

/// Three-number list such as `(-3 -2 -2)`.
fn get_vec3(value: &Value, key: &str) -> anyhow::Result<Option<Vec3>> {
    let Some(val) = get_value(value, key) else {
        return Ok(None);
    };
    let items: Option<Vec<f64>> = val
        .list_iter()
        .and_then(|iter| iter.map(|v| v.as_f64()).collect::<Option<Vec<f64>>>());
    match items.as_deref() {
        Some([x, y, z]) if x.is_finite() && y.is_finite() && z.is_finite() => {
            Ok(Some([*x as f32, *y as f32, *z as f32]))
        }
        _ => bail!(":{} expects a list of three numbers, got {}", key, val),
    }
}
