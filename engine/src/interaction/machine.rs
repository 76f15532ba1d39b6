//! Interaction state machine.
//!
//! Turns each frame's tracked hands into mode transitions and mutations
//! of the single manipulable object.  Modes:
//!
//! - `Idle`: nothing in reach, object eases back to its resting look
//! - `Hover`: a hand within hover distance, object swells slightly
//! - `Grabbing`: one fist inside grab distance drags the object
//! - `TwoHandTransform`: two pinching hands scale, move and turn it
//!
//! The two-hand path is always evaluated first when two reliable hands
//! are present; single-hand heuristics are skipped that frame.

use tracing::{debug, info};

use super::math::{
    add, distance, is_finite, length, lerp3, lerp_angle, midpoint, scale, sub, Vec3, ZERO,
};
use super::proximity::{indicator, nearest_proximity, Indicator, IndicatorCue, Proximity};
use super::transform::{Appearance, Bounds, ObjectTransform, PhysicsConfig};
use crate::hand::tracker::{HandId, TrackedHand};

// ── Configuration ──────────────────────────────────────────

/// Distances, smoothing factors and feedback levels for the state machine.
#[derive(Debug, Clone)]
pub struct InteractionConfig {
    /// Hand-to-object distance under which a fist grabs.
    pub grab_distance: f32,
    /// Hand-to-object distance under which the object reacts.
    pub hover_distance: f32,
    /// Both hands must be this close to start a two-hand transform.
    pub two_hand_proximity: f32,
    /// Hand separation that maps to scale 1.0.
    pub reference_distance: f32,
    pub scale_min: f32,
    pub scale_max: f32,
    /// Per-frame lerp toward the grab target.
    pub follow_lerp: f32,
    pub two_hand_position_lerp: f32,
    pub two_hand_rotation_lerp: f32,
    /// Hand movement per frame below which grab rotation is skipped.
    pub rotation_deadzone: f32,
    /// Hand speed to rotation rate factor, before the cap.
    pub rotation_rate_gain: f32,
    /// Cap on the grab rotation rate factor.
    pub max_rotation_rate: f32,
    /// Pitch and yaw increment per unit of hand movement and rate.
    pub rotation_axis_gain: f32,
    /// Roll increment per unit of summed x/y hand movement and rate.
    pub roll_gain: f32,
    /// Cap on any single per-axis rotation increment (radians).
    pub max_rotation_step: f32,
    /// Fraction of hand movement kept as object velocity while held.
    pub release_velocity_gain: f32,
    /// Spring gain pulling the object toward a nearby open hand.
    pub attraction_gain: f32,
    pub grab_feedback_scale: f32,
    pub grab_opacity: f32,
    pub hover_feedback_scale: f32,
    pub hover_opacity: f32,
    pub two_hands_near_feedback_scale: f32,
    pub two_hands_near_color: u32,
    pub two_hand_color: u32,
    pub two_hand_opacity: f32,
    /// Feedback easing while hovering or transforming.
    pub feedback_ease: f32,
    /// Feedback easing back to rest.
    pub rest_ease: f32,
    pub bounds: Bounds,
    pub rest_position: Vec3,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            grab_distance: 0.8,
            hover_distance: 1.2,
            two_hand_proximity: 1.5,
            reference_distance: 1.5,
            scale_min: 0.3,
            scale_max: 2.5,
            follow_lerp: 0.4,
            two_hand_position_lerp: 0.15,
            two_hand_rotation_lerp: 0.1,
            rotation_deadzone: 0.005,
            rotation_rate_gain: 5.0,
            max_rotation_rate: 0.2,
            rotation_axis_gain: 10.0,
            roll_gain: 5.0,
            max_rotation_step: 0.2,
            release_velocity_gain: 0.15,
            attraction_gain: 0.002,
            grab_feedback_scale: 0.85,
            grab_opacity: 0.7,
            hover_feedback_scale: 1.05,
            hover_opacity: 0.95,
            two_hands_near_feedback_scale: 1.1,
            two_hands_near_color: 0xffaa00,
            two_hand_color: 0x0066ff,
            two_hand_opacity: 0.8,
            feedback_ease: 0.1,
            rest_ease: 0.05,
            bounds: Bounds::default(),
            rest_position: ZERO,
        }
    }
}

// ── Modes ──────────────────────────────────────────────────

/// Payload-free mode tag, for events and status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Idle,
    Hover,
    Grabbing,
    TwoHandTransform,
}

impl ModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hover => "hover",
            Self::Grabbing => "grabbing",
            Self::TwoHandTransform => "two-hand",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverState {
    /// Nearest reliable hand.
    pub hand: HandId,
    pub distance: f32,
    /// Two reliable hands within two-hand proximity, not both pinching.
    pub two_hands: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabState {
    pub hand: HandId,
    /// Object position minus hand centre, fixed at grab start.
    pub grab_offset: Vec3,
    pub last_hand_position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionMode {
    Idle,
    Hover(HoverState),
    Grabbing(GrabState),
    TwoHandTransform { hands: [HandId; 2], separation: f32 },
}

impl InteractionMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Idle => ModeKind::Idle,
            Self::Hover(_) => ModeKind::Hover,
            Self::Grabbing(_) => ModeKind::Grabbing,
            Self::TwoHandTransform { .. } => ModeKind::TwoHandTransform,
        }
    }

    pub fn grabbing_hand(&self) -> Option<HandId> {
        match self {
            Self::Grabbing(g) => Some(g.hand),
            _ => None,
        }
    }
}

// ── Events ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    ModeChanged { from: ModeKind, to: ModeKind },
    GrabStarted { hand: HandId, offset: Vec3 },
    /// The object keeps `velocity` as it leaves the hand.
    GrabReleased { hand: HandId, velocity: Vec3 },
    TwoHandStarted { hands: [HandId; 2] },
    TwoHandEnded,
}

/// What the renderer reads once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSnapshot {
    pub position: Vec3,
    pub rotation: Vec3,
    /// Manipulated scale times feedback scale.
    pub scale: f32,
    pub color: u32,
    pub opacity: f32,
}

// ── Engine ─────────────────────────────────────────────────

/// Owns the object and the interaction mode.  Never touches a renderer.
#[derive(Debug)]
pub struct InteractionEngine {
    pub config: InteractionConfig,
    pub physics: PhysicsConfig,
    transform: ObjectTransform,
    appearance: Appearance,
    mode: InteractionMode,
    proximity: Proximity,
    detected_hands: usize,
    reliable_hands: usize,
}

impl InteractionEngine {
    pub fn new(config: InteractionConfig, physics: PhysicsConfig) -> Self {
        let transform = ObjectTransform::new(config.rest_position);
        Self {
            config,
            physics,
            transform,
            appearance: Appearance::REST,
            mode: InteractionMode::Idle,
            proximity: Proximity::NONE,
            detected_hands: 0,
            reliable_hands: 0,
        }
    }

    /// Advance the state machine by one frame of freshly observed hands.
    pub fn update(&mut self, hands: &[TrackedHand]) -> Vec<InteractionEvent> {
        self.update_frame(hands, true)
    }

    /// Advance by one frame.  `fresh` is false when `hands` repeat the
    /// previous frame's batch; hand motion is then not re-measured.
    pub fn update_frame(&mut self, hands: &[TrackedHand], fresh: bool) -> Vec<InteractionEvent> {
        let from = self.mode.kind();
        let mut events = Vec::new();

        let mut usable: Vec<&TrackedHand> = hands
            .iter()
            .filter(|t| t.hand.reliable && is_finite(t.hand.center))
            .collect();
        self.detected_hands = hands.len();
        self.reliable_hands = usable.len();
        if usable.len() > 2 {
            usable.sort_by(|a, b| {
                b.hand
                    .confidence
                    .partial_cmp(&a.hand.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            usable.truncate(2);
        }

        match usable.as_slice() {
            [] => {
                self.end_two_hand(&mut events);
                self.release(&mut events);
                self.idle();
            }
            [one] => self.update_single(one, fresh, &mut events),
            [a, b, ..] => self.update_pair(a, b, &mut events),
        }

        let to = self.mode.kind();
        if from != to {
            debug!("interaction {} -> {}", from.as_str(), to.as_str());
            // Released objects coast; other ways into idle stop the object.
            if to == ModeKind::Idle && from != ModeKind::Grabbing && !self.physics.gravity_enabled
            {
                self.transform.stop();
            }
            events.push(InteractionEvent::ModeChanged { from, to });
        }

        self.proximity = nearest_proximity(
            self.transform.position,
            usable.iter().map(|t| t.hand.center),
            self.config.grab_distance,
            self.config.hover_distance,
        );
        events
    }

    /// Run the physics overlay for one frame.  Held objects are skipped.
    pub fn step_physics(&mut self) {
        match self.mode {
            InteractionMode::Idle | InteractionMode::Hover(_) => {
                self.transform.step(&self.physics, &self.config.bounds);
            }
            InteractionMode::Grabbing(_) | InteractionMode::TwoHandTransform { .. } => {}
        }
    }

    /// Drop straight to idle, releasing anything held.  Used when tracking stops.
    pub fn force_idle(&mut self) -> Vec<InteractionEvent> {
        let from = self.mode.kind();
        let mut events = Vec::new();
        self.end_two_hand(&mut events);
        self.release(&mut events);
        self.mode = InteractionMode::Idle;
        self.transform.stop();
        self.appearance = Appearance::REST;
        self.proximity = Proximity::NONE;
        self.detected_hands = 0;
        self.reliable_hands = 0;
        if from != ModeKind::Idle {
            events.push(InteractionEvent::ModeChanged {
                from,
                to: ModeKind::Idle,
            });
        }
        events
    }

    /// Put the object back at rest, forgetting all interaction state.
    pub fn reset(&mut self) {
        self.transform = ObjectTransform::new(self.config.rest_position);
        self.appearance = Appearance::REST;
        self.mode = InteractionMode::Idle;
        self.proximity = Proximity::NONE;
        self.detected_hands = 0;
        self.reliable_hands = 0;
    }

    // ── Single hand ────────────────────────────────────────

    fn update_single(&mut self, t: &TrackedHand, fresh: bool, events: &mut Vec<InteractionEvent>) {
        self.end_two_hand(events);

        if let InteractionMode::Grabbing(grab) = self.mode {
            if grab.hand == t.id && t.hand.is_grabbing() {
                self.continue_grab(grab, t.hand.center, fresh);
                return;
            }
            self.release(events);
        }

        let d = distance(self.transform.position, t.hand.center);
        if d < self.config.grab_distance && t.hand.is_grabbing() {
            self.start_grab(t, events);
        } else if d < self.config.hover_distance {
            self.hover(t.id, d, false);
            if d < self.config.grab_distance {
                self.attract(t.hand.center);
            }
        } else {
            self.idle();
        }
    }

    fn start_grab(&mut self, t: &TrackedHand, events: &mut Vec<InteractionEvent>) {
        let offset = sub(self.transform.position, t.hand.center);
        self.transform.stop();
        self.appearance.feedback_scale = self.config.grab_feedback_scale;
        self.appearance.color = Appearance::REST.color;
        self.appearance.opacity = self.config.grab_opacity;
        self.mode = InteractionMode::Grabbing(GrabState {
            hand: t.id,
            grab_offset: offset,
            last_hand_position: t.hand.center,
        });
        info!("{} grabbed object", t.id);
        events.push(InteractionEvent::GrabStarted {
            hand: t.id,
            offset,
        });
    }

    fn continue_grab(&mut self, mut grab: GrabState, center: Vec3, fresh: bool) {
        let cfg = &self.config;
        let target = add(center, grab.grab_offset);
        self.transform.position = lerp3(self.transform.position, target, cfg.follow_lerp);
        self.transform.clamp_to(&cfg.bounds);

        // A repeated batch carries no new motion; keep the last measured
        // velocity so a release on the next batch still coasts.
        if !fresh {
            return;
        }

        let delta = sub(center, grab.last_hand_position);
        let speed = length(delta);
        let mut spin = ZERO;
        if speed > cfg.rotation_deadzone {
            let rate = (speed * cfg.rotation_rate_gain).min(cfg.max_rotation_rate);
            let cap = cfg.max_rotation_step;
            spin = [
                (delta[1] * rate * cfg.rotation_axis_gain).clamp(-cap, cap),
                (delta[0] * rate * cfg.rotation_axis_gain).clamp(-cap, cap),
                ((delta[0] + delta[1]) * rate * cfg.roll_gain).clamp(-cap, cap),
            ];
            self.transform.rotation = add(self.transform.rotation, spin);
        }

        self.transform.velocity = scale(delta, cfg.release_velocity_gain);
        self.transform.angular_velocity = scale(spin, cfg.release_velocity_gain);
        grab.last_hand_position = center;
        self.mode = InteractionMode::Grabbing(grab);
    }

    /// Let go of a held object, keeping its velocity.
    fn release(&mut self, events: &mut Vec<InteractionEvent>) {
        if let InteractionMode::Grabbing(grab) = self.mode {
            info!("{} released object", grab.hand);
            events.push(InteractionEvent::GrabReleased {
                hand: grab.hand,
                velocity: self.transform.velocity,
            });
            self.mode = InteractionMode::Idle;
        }
    }

    fn hover(&mut self, hand: HandId, distance: f32, two_hands: bool) {
        let cfg = &self.config;
        if two_hands {
            self.appearance
                .ease_scale(cfg.two_hands_near_feedback_scale, cfg.feedback_ease);
            self.appearance.color = cfg.two_hands_near_color;
            self.appearance.opacity = Appearance::REST.opacity;
        } else {
            self.appearance
                .ease_scale(cfg.hover_feedback_scale, cfg.feedback_ease);
            self.appearance.color = Appearance::REST.color;
            self.appearance.opacity = cfg.hover_opacity;
        }
        self.mode = InteractionMode::Hover(HoverState {
            hand,
            distance,
            two_hands,
        });
    }

    /// Spring impulse toward an open hand inside grab distance.
    fn attract(&mut self, center: Vec3) {
        let pull = scale(
            sub(center, self.transform.position),
            self.config.attraction_gain,
        );
        self.transform.velocity = add(self.transform.velocity, pull);
    }

    fn idle(&mut self) {
        self.appearance
            .ease_scale(Appearance::REST.feedback_scale, self.config.rest_ease);
        self.appearance.color = Appearance::REST.color;
        self.appearance.opacity = Appearance::REST.opacity;
        self.mode = InteractionMode::Idle;
    }

    // ── Two hands ──────────────────────────────────────────

    fn update_pair(&mut self, a: &TrackedHand, b: &TrackedHand, events: &mut Vec<InteractionEvent>) {
        let pos = self.transform.position;
        let da = distance(pos, a.hand.center);
        let db = distance(pos, b.hand.center);
        let near = da < self.config.two_hand_proximity && db < self.config.two_hand_proximity;
        let both_pinching = a.hand.is_pinching() && b.hand.is_pinching();
        let transforming = matches!(self.mode, InteractionMode::TwoHandTransform { .. });

        if both_pinching && (transforming || near) {
            if !transforming {
                self.release(events);
                info!("two-hand transform with {} and {}", a.id, b.id);
                events.push(InteractionEvent::TwoHandStarted {
                    hands: [a.id, b.id],
                });
            }
            self.two_hand_transform(a, b);
            return;
        }

        self.end_two_hand(events);
        self.release(events);
        if near {
            let (hand, d) = if da <= db { (a.id, da) } else { (b.id, db) };
            self.hover(hand, d, true);
        } else {
            self.idle();
        }
    }

    fn two_hand_transform(&mut self, a: &TrackedHand, b: &TrackedHand) {
        // Order by x so the yaw does not flip when the pose model swaps hands.
        let (left, right) = if a.hand.center[0] <= b.hand.center[0] {
            (a, b)
        } else {
            (b, a)
        };
        let separation = distance(left.hand.center, right.hand.center);
        self.mode = InteractionMode::TwoHandTransform {
            hands: [left.id, right.id],
            separation,
        };

        let cfg = &self.config;
        self.appearance.ease_scale(1.0, cfg.feedback_ease);
        self.appearance.color = cfg.two_hand_color;
        self.appearance.opacity = cfg.two_hand_opacity;
        self.transform.stop();

        if cfg.reference_distance <= 0.0
            || !cfg.reference_distance.is_finite()
            || !separation.is_finite()
        {
            debug!(
                "two-hand update skipped: separation {} reference {}",
                separation, cfg.reference_distance
            );
            return;
        }

        self.transform.scale = (separation / cfg.reference_distance).clamp(cfg.scale_min, cfg.scale_max);

        let center = midpoint(left.hand.center, right.hand.center);
        self.transform.position = cfg.bounds.clamp(lerp3(
            self.transform.position,
            center,
            cfg.two_hand_position_lerp,
        ));

        let dir = sub(right.hand.center, left.hand.center);
        let yaw = dir[0].atan2(dir[2]);
        let pitch = dir[1].atan2((dir[0] * dir[0] + dir[2] * dir[2]).sqrt());
        let rot = &mut self.transform.rotation;
        rot[0] = lerp_angle(rot[0], pitch, cfg.two_hand_rotation_lerp);
        rot[1] = lerp_angle(rot[1], yaw, cfg.two_hand_rotation_lerp);
    }

    fn end_two_hand(&mut self, events: &mut Vec<InteractionEvent>) {
        if let InteractionMode::TwoHandTransform { hands, .. } = self.mode {
            info!("two-hand transform with {} and {} ended", hands[0], hands[1]);
            events.push(InteractionEvent::TwoHandEnded);
            self.mode = InteractionMode::Idle;
        }
    }

    // ── Accessors ──────────────────────────────────────────

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn transform(&self) -> &ObjectTransform {
        &self.transform
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Proximity of the nearest reliable hand as of the last update.
    pub fn proximity(&self) -> Proximity {
        self.proximity
    }

    /// (detected, reliable) hand counts from the last update.
    pub fn hand_counts(&self) -> (usize, usize) {
        (self.detected_hands, self.reliable_hands)
    }

    pub fn render(&self) -> RenderSnapshot {
        RenderSnapshot {
            position: self.transform.position,
            rotation: self.transform.rotation,
            scale: self.transform.scale * self.appearance.feedback_scale,
            color: self.appearance.color,
            opacity: self.appearance.opacity,
        }
    }

    pub fn indicator(&self) -> Indicator {
        let cue = match self.mode {
            InteractionMode::TwoHandTransform { .. } => IndicatorCue::TwoHandTransform,
            InteractionMode::Grabbing(_) => IndicatorCue::Grabbing,
            InteractionMode::Hover(HoverState {
                two_hands: true, ..
            }) => IndicatorCue::TwoHandsNear,
            _ => IndicatorCue::Zone(self.proximity.zone),
        };
        indicator(cue)
    }

    /// Generate s-expression for status display.
    pub fn status_sexp(&self) -> String {
        let hand = match self.mode {
            InteractionMode::Hover(h) => h.hand.0.to_string(),
            InteractionMode::Grabbing(g) => g.hand.0.to_string(),
            InteractionMode::TwoHandTransform { hands, .. } => {
                format!("({} {})", hands[0].0, hands[1].0)
            }
            InteractionMode::Idle => "nil".to_string(),
        };
        let distance = if self.proximity.distance.is_finite() {
            format!("{:.3}", self.proximity.distance)
        } else {
            "nil".to_string()
        };
        let p = self.transform.position;
        let r = self.transform.rotation;
        let render = self.render();
        format!(
            "(:mode {} :hand {} :zone {} :distance {} :hands {} :reliable {} :position ({:.3} {:.3} {:.3}) :rotation ({:.3} {:.3} {:.3}) :scale {:.3} :render-scale {:.3} :color \"#{:06x}\" :opacity {:.2})",
            self.mode.kind().as_str(),
            hand,
            self.proximity.zone.as_str(),
            distance,
            self.detected_hands,
            self.reliable_hands,
            p[0],
            p[1],
            p[2],
            r[0],
            r[1],
            r[2],
            self.transform.scale,
            render.scale,
            render.color,
            render.opacity,
        )
    }

    /// Generate s-expression for the effective interaction config.
    pub fn config_sexp(&self) -> String {
        let c = &self.config;
        format!(
            "(:grab-distance {:.3} :hover-distance {:.3} :two-hand-proximity {:.3} :reference-distance {:.3} :scale-min {:.2} :scale-max {:.2} :follow-lerp {:.2} :damping {:.3} :gravity {})",
            c.grab_distance,
            c.hover_distance,
            c.two_hand_proximity,
            c.reference_distance,
            c.scale_min,
            c.scale_max,
            c.follow_lerp,
            self.physics.damping,
            if self.physics.gravity_enabled { "t" } else { "nil" },
        )
    }
}

impl Default for InteractionEngine {
    fn default() -> Self {
        Self::new(InteractionConfig::default(), PhysicsConfig::default())
    }
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
fn tracked(id: u32, center: Vec3, pose: crate::hand::HandPose) -> TrackedHand {
    use crate::hand::{ClassifiedHand, Handedness, HandPose};

    TrackedHand {
        id: HandId(id),
        hand: ClassifiedHand {
            center,
            pose,
            pinch_distance: if pose == HandPose::Pinching { 0.02 } else { 0.2 },
            closed_finger_count: if pose == HandPose::Grabbing { 5 } else { 0 },
            confidence: 0.95,
            handedness: Handedness::Right,
            reliable: true,
        },
    }
}

#[cfg(test)]
fn pair(sep: f32) -> [TrackedHand; 2] {
    use crate::hand::HandPose;

    [
        tracked(1, [-sep / 2.0, 0.0, 0.0], HandPose::Pinching),
        tracked(2, [sep / 2.0, 0.0, 0.0], HandPose::Pinching),
    ]
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::HandPose;
    use crate::interaction::proximity::ProximityZone;

    fn assert_close(a: Vec3, b: Vec3, eps: f32) {
        assert!(distance(a, b) < eps, "{:?} vs {:?}", a, b);
    }

    #[test]
    fn test_starts_idle_at_rest() {
        let engine = InteractionEngine::default();
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
        assert_eq!(engine.transform().position, ZERO);
        assert_eq!(engine.render().scale, 1.0);
        assert_eq!(engine.indicator().opacity, 0.0);
    }

    #[test]
    fn test_grab_in_one_frame() {
        let mut engine = InteractionEngine::default();
        let events = engine.update(&[tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing)]);
        assert_eq!(engine.mode().kind(), ModeKind::Grabbing);
        assert!(events.contains(&InteractionEvent::GrabStarted {
            hand: HandId(1),
            offset: [-0.5, 0.0, 0.0],
        }));
        assert!(events.contains(&InteractionEvent::ModeChanged {
            from: ModeKind::Idle,
            to: ModeKind::Grabbing,
        }));
        assert!((engine.render().scale - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_release_to_hover_when_near() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing)]);
        let events = engine.update(&[tracked(1, [0.5, 0.0, 0.0], HandPose::Open)]);
        assert_eq!(engine.mode().kind(), ModeKind::Hover);
        assert!(events
            .iter()
            .any(|e| matches!(e, InteractionEvent::GrabReleased { hand, .. } if *hand == HandId(1))));
    }

    #[test]
    fn test_release_to_idle_when_far() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [2.5, 0.0, 0.0], HandPose::Open)]);
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
    }

    #[test]
    fn test_fist_outside_grab_distance_only_hovers() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [1.0, 0.0, 0.0], HandPose::Grabbing)]);
        assert_eq!(engine.mode().kind(), ModeKind::Hover);
        assert_eq!(engine.proximity().zone, ProximityZone::Near);
    }

    #[test]
    fn test_grab_round_trip_tracks_offset() {
        let mut engine = InteractionEngine::default();
        let h0 = [0.3, 0.2, 0.1];
        engine.update(&[tracked(1, h0, HandPose::Grabbing)]);
        let d = [1.0, 0.5, 0.0];
        let moved = add(h0, d);
        for _ in 0..60 {
            engine.update(&[tracked(1, moved, HandPose::Grabbing)]);
            engine.step_physics();
        }
        // (H0 + D) + (P - H0) with P at the origin.
        assert_close(engine.transform().position, d, 1e-3);
    }

    #[test]
    fn test_grab_clamped_to_bounds() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        for _ in 0..60 {
            engine.update(&[tracked(1, [6.0, 0.0, 0.5], HandPose::Grabbing)]);
        }
        assert_eq!(engine.transform().position[0], 3.0);
        assert!(engine.config.bounds.contains(engine.transform().position));
    }

    #[test]
    fn test_static_grab_converges() {
        let mut engine = InteractionEngine::default();
        let hand = [0.4, 0.1, 0.0];
        engine.update(&[tracked(1, hand, HandPose::Grabbing)]);
        for _ in 0..100 {
            engine.update(&[tracked(1, hand, HandPose::Grabbing)]);
        }
        let before = engine.transform().clone();
        engine.update(&[tracked(1, hand, HandPose::Grabbing)]);
        assert_close(engine.transform().position, before.position, 1e-6);
        assert_eq!(engine.transform().rotation, before.rotation);
    }

    #[test]
    fn test_grab_rotation_from_hand_motion() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [0.1, 0.0, 0.5], HandPose::Grabbing)]);
        let rot = engine.transform().rotation;
        // rate = min(0.1 * 5, 0.2) = 0.2; y += 0.1 * 0.2 * 10
        assert!((rot[1] - 0.2).abs() < 1e-5);
        assert_eq!(rot[0], 0.0);
        assert!((rot[2] - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_grab_rotation_gains_tunable() {
        let config = InteractionConfig {
            rotation_axis_gain: 5.0,
            roll_gain: 0.0,
            ..InteractionConfig::default()
        };
        let mut engine = InteractionEngine::new(config, PhysicsConfig::default());
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [0.1, 0.0, 0.5], HandPose::Grabbing)]);
        let rot = engine.transform().rotation;
        // y += 0.1 * 0.2 * 5
        assert!((rot[1] - 0.1).abs() < 1e-5);
        assert_eq!(rot[2], 0.0);
    }

    #[test]
    fn test_repeated_batch_keeps_grab_velocity() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [0.1, 0.0, 0.5], HandPose::Grabbing)]);
        let velocity = engine.transform().velocity;
        let rotation = engine.transform().rotation;
        assert!((velocity[0] - 0.015).abs() < 1e-6);

        // Same hands again: the object still follows, motion is not re-measured.
        engine.update_frame(&[tracked(1, [0.1, 0.0, 0.5], HandPose::Grabbing)], false);
        assert_eq!(engine.transform().velocity, velocity);
        assert_eq!(engine.transform().rotation, rotation);

        let events = engine.update(&[tracked(1, [0.1, 0.0, 0.5], HandPose::Open)]);
        assert!(events.contains(&InteractionEvent::GrabReleased {
            hand: HandId(1),
            velocity,
        }));
    }

    #[test]
    fn test_grab_rotation_deadzone() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [0.003, 0.0, 0.5], HandPose::Grabbing)]);
        assert_eq!(engine.transform().rotation, ZERO);
    }

    #[test]
    fn test_release_keeps_velocity() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [0.1, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[]);
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
        assert!(engine.transform().is_moving());
        let x = engine.transform().position[0];
        engine.step_physics();
        assert!(engine.transform().position[0] > x);
    }

    #[test]
    fn test_idle_from_hover_stops_object() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.6, 0.0, 0.0], HandPose::Open)]);
        engine.step_physics();
        assert!(engine.transform().position[0] > 0.0, "attraction pulls toward hand");
        engine.update(&[]);
        assert!(!engine.transform().is_moving());
    }

    #[test]
    fn test_hover_attraction_settles() {
        let mut engine = InteractionEngine::default();
        let hand = [0.6, 0.2, 0.0];
        for _ in 0..4000 {
            engine.update(&[tracked(1, hand, HandPose::Open)]);
            engine.step_physics();
        }
        let before = engine.transform().position;
        engine.update(&[tracked(1, hand, HandPose::Open)]);
        engine.step_physics();
        assert_close(engine.transform().position, before, 1e-4);
        assert_eq!(engine.mode().kind(), ModeKind::Hover);
    }

    #[test]
    fn test_unreliable_hand_ignored() {
        let mut engine = InteractionEngine::default();
        let mut t = tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing);
        t.hand.reliable = false;
        let events = engine.update(&[t]);
        assert!(events.is_empty());
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
        assert_eq!(engine.hand_counts(), (1, 0));
    }

    #[test]
    fn test_nan_hand_ignored() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [f32::NAN, 0.0, 0.0], HandPose::Grabbing)]);
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
        assert!(is_finite(engine.transform().position));
    }

    #[test]
    fn test_vanished_grabber_releases() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing)]);
        // Grabbing hand vanished, another fist appears in reach.
        let events = engine.update(&[tracked(2, [0.3, 0.0, 0.0], HandPose::Grabbing)]);
        assert!(events
            .iter()
            .any(|e| matches!(e, InteractionEvent::GrabReleased { hand, .. } if *hand == HandId(1))));
        assert_eq!(engine.mode().grabbing_hand(), Some(HandId(2)));
    }

    #[test]
    fn test_two_hand_transform_entry() {
        let mut engine = InteractionEngine::default();
        let events = engine.update(&pair(1.0));
        assert_eq!(engine.mode().kind(), ModeKind::TwoHandTransform);
        assert!(events.contains(&InteractionEvent::TwoHandStarted {
            hands: [HandId(1), HandId(2)],
        }));
        assert!((engine.transform().scale - 1.0 / 1.5).abs() < 1e-5);
        assert_eq!(engine.indicator().color, 0x0066ff);
    }

    #[test]
    fn test_two_hand_needs_both_pinching() {
        let mut engine = InteractionEngine::default();
        engine.update(&[
            tracked(1, [-0.5, 0.0, 0.0], HandPose::Pinching),
            tracked(2, [0.5, 0.0, 0.0], HandPose::Open),
        ]);
        assert_eq!(engine.mode().kind(), ModeKind::Hover);
        assert_eq!(engine.appearance().color, 0xffaa00);
        assert_eq!(engine.indicator().color, 0xffaa00);
    }

    #[test]
    fn test_two_hand_needs_proximity_to_start() {
        let mut engine = InteractionEngine::default();
        engine.update(&pair(4.0));
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
    }

    #[test]
    fn test_two_hand_scale_monotonic() {
        let mut engine = InteractionEngine::default();
        engine.update(&pair(0.4));
        let mut last = engine.transform().scale;
        let mut sep = 0.4;
        while sep < 5.5 {
            sep += 0.1;
            engine.update(&pair(sep));
            assert_eq!(engine.mode().kind(), ModeKind::TwoHandTransform);
            let s = engine.transform().scale;
            assert!(s >= last, "scale dropped from {} to {} at {}", last, s, sep);
            assert!((0.3..=2.5).contains(&s));
            last = s;
        }
        assert_eq!(last, 2.5);
    }

    #[test]
    fn test_two_hand_ends_when_pinch_stops() {
        let mut engine = InteractionEngine::default();
        engine.update(&pair(1.0));
        let [a, mut b] = pair(1.0);
        b.hand.pose = HandPose::Open;
        let events = engine.update(&[a, b]);
        assert!(events.contains(&InteractionEvent::TwoHandEnded));
        assert_eq!(engine.mode().kind(), ModeKind::Hover);
    }

    #[test]
    fn test_two_hands_release_grab() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing)]);
        let events = engine.update(&[
            tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing),
            tracked(2, [-0.5, 0.0, 0.0], HandPose::Open),
        ]);
        assert!(events
            .iter()
            .any(|e| matches!(e, InteractionEvent::GrabReleased { .. })));
        assert_ne!(engine.mode().kind(), ModeKind::Grabbing);
    }

    #[test]
    fn test_two_hand_static_converges() {
        let mut engine = InteractionEngine::default();
        let hands = [
            tracked(1, [-0.4, 0.3, 0.2], HandPose::Pinching),
            tracked(2, [0.6, 0.5, -0.2], HandPose::Pinching),
        ];
        for _ in 0..400 {
            engine.update(&hands);
        }
        let before = engine.transform().clone();
        engine.update(&hands);
        assert_close(engine.transform().position, before.position, 1e-5);
        assert_close(engine.transform().rotation, before.rotation, 1e-5);
        assert_close(engine.transform().position, [0.1, 0.4, 0.0], 1e-3);
    }

    #[test]
    fn test_zero_reference_distance_guarded() {
        let config = InteractionConfig {
            reference_distance: 0.0,
            ..InteractionConfig::default()
        };
        let mut engine = InteractionEngine::new(config, PhysicsConfig::default());
        engine.update(&pair(1.0));
        assert_eq!(engine.mode().kind(), ModeKind::TwoHandTransform);
        assert_eq!(engine.transform().scale, 1.0);
        assert!(is_finite(engine.transform().position));
    }

    #[test]
    fn test_extra_hands_lowest_confidence_dropped() {
        let mut engine = InteractionEngine::default();
        let [a, b] = pair(1.0);
        let mut extra = tracked(3, [0.0, 0.2, 0.0], HandPose::Open);
        extra.hand.confidence = 0.85;
        engine.update(&[extra, a, b]);
        assert_eq!(engine.mode().kind(), ModeKind::TwoHandTransform);
        assert_eq!(engine.hand_counts(), (3, 3));
    }

    #[test]
    fn test_no_hands_returns_to_idle() {
        let mut engine = InteractionEngine::default();
        engine.update(&pair(1.0));
        let events = engine.update(&[]);
        assert!(events.contains(&InteractionEvent::TwoHandEnded));
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
        assert_eq!(engine.proximity(), Proximity::NONE);
    }

    #[test]
    fn test_feedback_eases_back_to_rest() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.5, 0.0, 0.0], HandPose::Grabbing)]);
        engine.update(&[]);
        let first = engine.appearance().feedback_scale;
        assert!(first < 1.0, "not snapped back");
        for _ in 0..300 {
            engine.update(&[]);
        }
        assert!((engine.appearance().feedback_scale - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_force_idle_releases() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [0.2, 0.0, 0.5], HandPose::Grabbing)]);
        let events = engine.force_idle();
        assert!(events
            .iter()
            .any(|e| matches!(e, InteractionEvent::GrabReleased { .. })));
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
        assert!(!engine.transform().is_moving());
        assert_eq!(*engine.appearance(), Appearance::REST);
    }

    #[test]
    fn test_reset() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(1, [0.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.update(&[tracked(1, [1.0, 0.0, 0.5], HandPose::Grabbing)]);
        engine.reset();
        assert_eq!(engine.transform().position, ZERO);
        assert_eq!(engine.mode().kind(), ModeKind::Idle);
    }

    #[test]
    fn test_status_sexp() {
        let mut engine = InteractionEngine::default();
        engine.update(&[tracked(4, [0.5, 0.0, 0.0], HandPose::Grabbing)]);
        let sexp = engine.status_sexp();
        assert!(sexp.contains(":mode grabbing"));
        assert!(sexp.contains(":hand 4"));
        assert!(sexp.contains(":zone contact"));
        assert!(sexp.contains(":color \"#ff3030\""));
    }

    #[test]
    fn test_config_sexp() {
        let engine = InteractionEngine::default();
        let sexp = engine.config_sexp();
        assert!(sexp.contains(":grab-distance 0.800"));
        assert!(sexp.contains(":gravity nil"));
    }

    #[test]
    fn test_mode_as_str() {
        assert_eq!(ModeKind::Idle.as_str(), "idle");
        assert_eq!(ModeKind::TwoHandTransform.as_str(), "two-hand");
    }
}
