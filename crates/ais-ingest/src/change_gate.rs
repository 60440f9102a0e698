//! Per-vessel write throttle.
//!
//! Decides whether a pending update is worth a registry write, in order:
//!
//! 1. Unknown vessel → write.
//! 2. Last accepted write younger than the minimum interval → skip, unless
//!    the vessel moved (rule 3).
//! 3. Latitude or longitude moved more than the position delta → write.
//! 4. No accepted write remembered, or the forced-refresh period has passed
//!    → write.
//! 5. Otherwise → skip.
//!
//! This is a heuristic throttle. A status-only change (no movement) inside
//! the minimum interval is skipped until the next eligible window.

use ais_core::config::GateConfig;
use ais_core::rate_limit::RateLimitState;
use ais_core::time_util::elapsed_ms;
use ais_core::types::{CanonicalUpdate, VesselRecord};

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No registry record yet.
    NewVessel,
    /// Position moved beyond the delta.
    Moved,
    /// First write since restart, or the refresh period elapsed.
    ForcedRefresh,
    /// Inside the minimum interval without movement.
    Throttled,
    /// Outside the minimum interval, but nothing significant changed.
    Unchanged,
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::NewVessel | Self::Moved | Self::ForcedRefresh)
    }
}

/// The change gate. Owns the process-wide [`RateLimitState`].
pub struct ChangeGate {
    state: RateLimitState,
    min_interval_ms: u64,
    forced_refresh_ms: u64,
    position_delta_deg: f64,
}

impl ChangeGate {
    pub fn new(cfg: &GateConfig) -> Self {
        Self {
            state: RateLimitState::new(cfg.rate_limit_capacity, cfg.rate_limit_retain),
            min_interval_ms: cfg.min_update_interval_secs * 1_000,
            forced_refresh_ms: cfg.forced_refresh_secs * 1_000,
            position_delta_deg: cfg.position_delta_deg,
        }
    }

    /// Whether `update` should be written. Acceptance is recorded.
    pub fn should_apply(&mut self, update: &CanonicalUpdate, existing: Option<&VesselRecord>, now_ms: u64) -> bool {
        self.evaluate(update, existing, now_ms).is_accepted()
    }

    /// Evaluate the gate rules, recording the write time when accepted.
    pub fn evaluate(&mut self, update: &CanonicalUpdate, existing: Option<&VesselRecord>, now_ms: u64) -> GateDecision {
        let decision = self.decide(update, existing, now_ms);
        if decision.is_accepted() {
            self.record(&update.mmsi, now_ms);
        }
        decision
    }

    /// Remember an accepted write for `mmsi`.
    ///
    /// Callers using [`ChangeGate::decide`] record only once the write is
    /// actually going ahead.
    pub fn record(&mut self, mmsi: &str, now_ms: u64) {
        self.state.record(mmsi, now_ms);
    }

    /// Evaluate the gate rules without recording anything.
    pub fn decide(&self, update: &CanonicalUpdate, existing: Option<&VesselRecord>, now_ms: u64) -> GateDecision {
        let Some(existing) = existing else {
            return GateDecision::NewVessel;
        };

        let last = self.state.last_write(&update.mmsi);
        let moved = match (update.position(), existing.position()) {
            (Some((lat, lon)), Some((prev_lat, prev_lon))) => {
                (lat - prev_lat).abs() > self.position_delta_deg || (lon - prev_lon).abs() > self.position_delta_deg
            }
            _ => false,
        };

        if let Some(last) = last {
            if elapsed_ms(last, now_ms) < self.min_interval_ms && !moved {
                return GateDecision::Throttled;
            }
        }
        if moved {
            return GateDecision::Moved;
        }
        match last {
            None => GateDecision::ForcedRefresh,
            Some(last) if elapsed_ms(last, now_ms) > self.forced_refresh_ms => GateDecision::ForcedRefresh,
            Some(_) => GateDecision::Unchanged,
        }
    }

    pub fn state(&self) -> &RateLimitState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use ais_core::types::{ImoId, NavStatus, NewVessel, VesselId};

    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn record_at(lat: f64, lon: f64) -> VesselRecord {
        VesselRecord::from_new(
            VesselId("v1".into()),
            NewVessel {
                mmsi: "403456789".into(),
                imo_number: ImoId::synthetic("403456789"),
                vessel_name: "SAUDI TRADER".into(),
                call_sign: None,
                vessel_category: None,
                latitude: Some(lat),
                longitude: Some(lon),
                speed_knots: None,
                course_degrees: None,
                nav_status: None,
                destination: None,
                last_update_ms: T0,
            },
        )
    }

    fn update_at(lat: f64, lon: f64) -> CanonicalUpdate {
        CanonicalUpdate { latitude: Some(lat), longitude: Some(lon), ..CanonicalUpdate::new("403456789") }
    }

    fn gate() -> ChangeGate {
        ChangeGate::new(&GateConfig::default())
    }

    #[test]
    fn new_vessel_always_written() {
        let mut g = gate();
        assert_eq!(g.evaluate(&update_at(1.0, 1.0), None, T0), GateDecision::NewVessel);
        assert_eq!(g.evaluate(&update_at(1.0, 1.0), None, T0 + 1), GateDecision::NewVessel);
        assert_eq!(g.state().last_write("403456789"), Some(T0 + 1));
    }

    #[test]
    fn identical_updates_inside_window_accept_only_first() {
        let mut g = gate();
        let existing = record_at(21.5, 39.2);
        let u = update_at(21.5, 39.2);

        assert!(g.should_apply(&u, Some(&existing), T0));
        assert!(!g.should_apply(&u, Some(&existing), T0 + 5_000));
        assert!(!g.should_apply(&u, Some(&existing), T0 + 29_999));
    }

    #[test]
    fn forced_refresh_after_gap() {
        let mut g = gate();
        let existing = record_at(21.5, 39.2);
        let u = update_at(21.5, 39.2);

        assert!(g.should_apply(&u, Some(&existing), T0));
        assert_eq!(g.evaluate(&u, Some(&existing), T0 + 31_000), GateDecision::Unchanged);
        assert_eq!(g.evaluate(&u, Some(&existing), T0 + 301_000), GateDecision::ForcedRefresh);
        assert_eq!(g.state().last_write("403456789"), Some(T0 + 301_000));
    }

    #[test]
    fn movement_accepted() {
        let mut g = gate();
        let existing = record_at(21.5, 39.2);
        assert!(g.should_apply(&update_at(21.5, 39.2), Some(&existing), T0));

        assert_eq!(g.evaluate(&update_at(21.5, 39.2015), Some(&existing), T0 + 40_000), GateDecision::Moved);
        assert_eq!(g.evaluate(&update_at(21.5005, 39.2), Some(&existing), T0 + 80_000), GateDecision::Unchanged);
    }

    #[test]
    fn movement_overrides_window() {
        let mut g = gate();
        let existing = record_at(21.5, 39.2);
        assert!(g.should_apply(&update_at(21.5, 39.2), Some(&existing), T0));
        assert_eq!(g.evaluate(&update_at(21.51, 39.2), Some(&existing), T0 + 1_000), GateDecision::Moved);
    }

    #[test]
    fn status_only_change_inside_window_is_dropped() {
        let mut g = gate();
        let existing = record_at(21.5, 39.2);
        assert!(g.should_apply(&update_at(21.5, 39.2), Some(&existing), T0));

        let aground = CanonicalUpdate { nav_status: Some(NavStatus::Aground), ..update_at(21.5, 39.2) };
        assert_eq!(g.evaluate(&aground, Some(&existing), T0 + 10_000), GateDecision::Throttled);
    }

    #[test]
    fn first_update_after_restart_is_written() {
        let mut g = gate();
        let existing = record_at(21.5, 39.2);
        let named = CanonicalUpdate { vessel_name: Some("X".into()), ..CanonicalUpdate::new("403456789") };
        assert_eq!(g.evaluate(&named, Some(&existing), T0), GateDecision::ForcedRefresh);
    }

    #[test]
    fn decide_leaves_state_untouched() {
        let mut g = gate();
        let existing = record_at(21.5, 39.2);
        let u = update_at(21.5, 39.2);

        assert_eq!(g.decide(&u, Some(&existing), T0), GateDecision::ForcedRefresh);
        assert_eq!(g.state().last_write("403456789"), None);
        assert_eq!(g.decide(&u, Some(&existing), T0 + 1_000), GateDecision::ForcedRefresh);

        g.record("403456789", T0 + 1_000);
        assert_eq!(g.decide(&u, Some(&existing), T0 + 2_000), GateDecision::Throttled);
    }

    #[test]
    fn thresholds_are_configurable() {
        let mut g = ChangeGate::new(&GateConfig {
            min_update_interval_secs: 1,
            forced_refresh_secs: 2,
            ..GateConfig::default()
        });
        let existing = record_at(21.5, 39.2);
        let u = update_at(21.5, 39.2);
        assert!(g.should_apply(&u, Some(&existing), T0));
        assert!(!g.should_apply(&u, Some(&existing), T0 + 1_500));
        assert!(g.should_apply(&u, Some(&existing), T0 + 2_500));
    }
}
