//! Core data structures for geofence registration
//!
//! A [`GeofenceSpec`] is the full argument tuple a caller supplies when
//! registering a geofence. The same ten-field array layout is used for the
//! inbound method arguments and for the persisted cache entry, so a spec
//! read back from storage can be replayed without any translation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::time::Duration;
use thiserror::Error;

/// Errors decoding a serialized geofence spec
#[derive(Error, Debug)]
pub enum SpecError {
    /// Argument list does not match the fixed ten-field layout
    #[error("Invalid geofence arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
}

// ============================================================================
// Trigger Mask
// ============================================================================

/// Bitmask of geofence transitions (enter/exit/dwell)
///
/// Unknown bits are preserved as given; providers decide what they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerMask(pub i32);

impl TriggerMask {
    /// Entering the region
    pub const ENTER: Self = Self(1);
    /// Leaving the region
    pub const EXIT: Self = Self(2);
    /// Staying inside the region for the loitering delay
    pub const DWELL: Self = Self(4);

    /// Raw bitmask value
    pub fn bits(self) -> i32 {
        self.0
    }

    /// Check whether every bit of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TriggerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for TriggerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::ENTER) {
            names.push("enter");
        }
        if self.contains(Self::EXIT) {
            names.push("exit");
        }
        if self.contains(Self::DWELL) {
            names.push("dwell");
        }
        if names.is_empty() {
            write!(f, "none({})", self.0)
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

// ============================================================================
// Expiration
// ============================================================================

/// How long a geofence stays registered with the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Expiration {
    /// Never expires
    #[default]
    Never,
    /// Expires after the given number of milliseconds
    After(u64),
}

impl Expiration {
    /// Wire value used by providers for "never expire"
    pub const NEVER_MILLIS: i64 = -1;

    /// Decode from the wire value; `-1` means never, other negatives are invalid
    pub fn from_millis(millis: i64) -> Option<Self> {
        match millis {
            Self::NEVER_MILLIS => Some(Self::Never),
            ms if ms >= 0 => Some(Self::After(ms as u64)),
            _ => None,
        }
    }

    /// Encode to the wire value
    pub fn as_millis(self) -> i64 {
        match self {
            Self::Never => Self::NEVER_MILLIS,
            Self::After(ms) => i64::try_from(ms).unwrap_or(i64::MAX),
        }
    }

    /// Duration until expiry, `None` for [`Expiration::Never`]
    pub fn duration(self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::After(ms) => Some(Duration::from_millis(ms)),
        }
    }
}

// ============================================================================
// Geofence Spec
// ============================================================================

/// Geographic center of a circular geofence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// One registered geofence, keyed by its caller-supplied `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SpecArgs", try_from = "SpecArgs")]
pub struct GeofenceSpec {
    /// Unique key across the cache
    pub id: String,

    /// Region center
    pub center: LatLng,

    /// Region radius in meters
    pub radius_meters: f32,

    /// Transitions that fire events
    pub transition_triggers: TriggerMask,

    /// Transitions that fire immediately if already satisfied at registration
    pub initial_triggers: TriggerMask,

    /// Registration lifetime
    pub expiration: Expiration,

    /// Dwell time before a DWELL transition fires
    pub loitering_delay_ms: i32,

    /// Best-effort notification latency hint
    pub notification_responsiveness_ms: i32,

    /// Opaque handle the event dispatcher uses to find the handler
    pub callback_token: i64,
}

/// Fixed field order of the serialized argument array
#[derive(Serialize, Deserialize)]
struct SpecArgs(i64, String, f64, f64, f32, i32, i32, i64, i32, i32);

impl From<GeofenceSpec> for SpecArgs {
    fn from(spec: GeofenceSpec) -> Self {
        SpecArgs(
            spec.callback_token,
            spec.id,
            spec.center.latitude,
            spec.center.longitude,
            spec.radius_meters,
            spec.transition_triggers.bits(),
            spec.initial_triggers.bits(),
            spec.expiration.as_millis(),
            spec.loitering_delay_ms,
            spec.notification_responsiveness_ms,
        )
    }
}

impl TryFrom<SpecArgs> for GeofenceSpec {
    type Error = String;

    fn try_from(args: SpecArgs) -> Result<Self, Self::Error> {
        let SpecArgs(
            callback_token,
            id,
            latitude,
            longitude,
            radius_meters,
            transitions,
            initial,
            expiration,
            loitering_delay_ms,
            notification_responsiveness_ms,
        ) = args;

        let expiration = Expiration::from_millis(expiration)
            .ok_or_else(|| format!("invalid expiration duration {expiration}ms"))?;

        Ok(Self {
            id,
            center: LatLng {
                latitude,
                longitude,
            },
            radius_meters,
            transition_triggers: TriggerMask(transitions),
            initial_triggers: TriggerMask(initial),
            expiration,
            loitering_delay_ms,
            notification_responsiveness_ms,
            callback_token,
        })
    }
}

impl GeofenceSpec {
    /// Create a spec with enter/exit triggers that never expires
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64, radius_meters: f32) -> Self {
        Self {
            id: id.into(),
            center: LatLng {
                latitude,
                longitude,
            },
            radius_meters,
            transition_triggers: TriggerMask::ENTER | TriggerMask::EXIT,
            initial_triggers: TriggerMask::ENTER,
            expiration: Expiration::Never,
            loitering_delay_ms: 0,
            notification_responsiveness_ms: 0,
            callback_token: 0,
        }
    }

    pub fn with_callback_token(mut self, token: i64) -> Self {
        self.callback_token = token;
        self
    }

    pub fn with_triggers(mut self, transitions: TriggerMask, initial: TriggerMask) -> Self {
        self.transition_triggers = transitions;
        self.initial_triggers = initial;
        self
    }

    pub fn with_expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn with_loitering_delay_ms(mut self, delay_ms: i32) -> Self {
        self.loitering_delay_ms = delay_ms;
        self
    }

    pub fn with_notification_responsiveness_ms(mut self, responsiveness_ms: i32) -> Self {
        self.notification_responsiveness_ms = responsiveness_ms;
        self
    }

    /// Decode from the ten-field argument array
    pub fn from_args(args: serde_json::Value) -> Result<Self, SpecError> {
        Ok(serde_json::from_value(args)?)
    }

    /// Encode to the ten-field argument array
    pub fn to_args(&self) -> serde_json::Value {
        // A tuple of primitives always converts
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Decode the persisted JSON text form
    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode to the persisted JSON text form
    pub fn to_json(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string(self)?)
    }
}
