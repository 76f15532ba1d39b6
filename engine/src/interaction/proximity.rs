//! Proximity feedback: distance zones and the ground-ring indicator.
//!
//! Read-only observer of object and hand positions.  Nothing here
//! feeds back into interaction transitions.

use super::math::{distance, Vec3};

/// Coarse distance band between the object and the nearest hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityZone {
    Far,
    Near,
    Contact,
}

impl ProximityZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Far => "far",
            Self::Near => "near",
            Self::Contact => "contact",
        }
    }
}

/// Zone plus the continuous signals behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    pub zone: ProximityZone,
    pub distance: f32,
    /// 1.0 at the object, falling to 0.0 at the hover distance.
    pub intensity: f32,
}

impl Proximity {
    /// No hand to measure against.
    pub const NONE: Proximity = Proximity {
        zone: ProximityZone::Far,
        distance: f32::INFINITY,
        intensity: 0.0,
    };
}

/// Classify the distance between the object and one hand.
pub fn proximity(object: Vec3, hand: Vec3, grab_distance: f32, hover_distance: f32) -> Proximity {
    let d = distance(object, hand);
    if !d.is_finite() {
        return Proximity::NONE;
    }
    let zone = if d < grab_distance {
        ProximityZone::Contact
    } else if d < hover_distance {
        ProximityZone::Near
    } else {
        ProximityZone::Far
    };
    let intensity = if hover_distance > 0.0 {
        (1.0 - d / hover_distance).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Proximity {
        zone,
        distance: d,
        intensity,
    }
}

/// Proximity to whichever hand is closest, or `Proximity::NONE`.
pub fn nearest_proximity<I>(object: Vec3, hands: I, grab_distance: f32, hover_distance: f32) -> Proximity
where
    I: IntoIterator<Item = Vec3>,
{
    hands
        .into_iter()
        .map(|h| proximity(object, h, grab_distance, hover_distance))
        .min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(Proximity::NONE)
}

/// Ground ring under the object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    pub color: u32,
    pub opacity: f32,
}

impl Indicator {
    pub const HIDDEN: Indicator = Indicator {
        color: 0x00ff00,
        opacity: 0.0,
    };
}

/// What the ring should show, most specific interaction first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorCue {
    TwoHandTransform,
    Grabbing,
    TwoHandsNear,
    Zone(ProximityZone),
}

pub fn indicator(cue: IndicatorCue) -> Indicator {
    match cue {
        IndicatorCue::TwoHandTransform => Indicator {
            color: 0x0066ff,
            opacity: 0.8,
        },
        IndicatorCue::Grabbing => Indicator {
            color: 0xff0000,
            opacity: 0.6,
        },
        IndicatorCue::TwoHandsNear => Indicator {
            color: 0xffaa00,
            opacity: 0.5,
        },
        IndicatorCue::Zone(ProximityZone::Contact) | IndicatorCue::Zone(ProximityZone::Near) => {
            Indicator {
                color: 0xffff00,
                opacity: 0.4,
            }
        }
        IndicatorCue::Zone(ProximityZone::Far) => Indicator::HIDDEN,
    }
}
