use chrono::{DateTime, Utc};
use std::time::Duration;

/// Cooldown gate deciding whether a new alert may be dispatched
#[derive(Debug, Clone)]
pub struct AlertGate {
    cooldown: Duration,
    last_alert: Option<DateTime<Utc>>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_alert(&self) -> Option<DateTime<Utc>> {
        self.last_alert
    }

    /// True when no alert was sent yet or the cooldown has strictly elapsed
    pub fn may_alert(&self, now: DateTime<Utc>) -> bool {
        match self.last_alert {
            None => true,
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed > self.cooldown,
                // Clock went backwards
                Err(_) => false,
            },
        }
    }

    /// Arm the cooldown starting at `now`
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.last_alert = Some(now);
    }

    /// Forget the last alert, reopening the gate immediately
    pub fn reset(&mut self) {
        self.last_alert = None;
    }

    /// Time left before the gate reopens; zero when it is open
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let Some(last) = self.last_alert else {
            return Duration::ZERO;
        };
        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
        self.cooldown.saturating_sub(elapsed)
    }

    /// Fraction of the cooldown still to run, in `0.0..=1.0`
    pub fn remaining_fraction(&self, now: DateTime<Utc>) -> f64 {
        if self.cooldown.is_zero() {
            return 0.0;
        }
        (self.remaining(now).as_secs_f64() / self.cooldown.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Operator-facing status line
    pub fn status_text(&self, now: DateTime<Utc>) -> String {
        if self.last_alert.is_none() {
            return "Alert system ready".to_string();
        }
        let remaining = self.remaining(now).as_secs();
        format!(
            "Next alert available in: {}m {}s",
            remaining / 60,
            remaining % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    #[test]
    fn open_before_first_alert() {
        let gate = AlertGate::new(Duration::from_secs(30));
        assert!(gate.may_alert(t0()));
        assert_eq!(gate.remaining(t0()), Duration::ZERO);
        assert_eq!(gate.status_text(t0()), "Alert system ready");
    }

    #[test]
    fn suppresses_within_cooldown_and_reopens_after() {
        let mut gate = AlertGate::new(Duration::from_secs(30));
        gate.record(t0());

        assert!(!gate.may_alert(t0() + secs(29)));
        assert!(!gate.may_alert(t0() + secs(30)));
        assert!(gate.may_alert(t0() + secs(31)));
    }

    #[test]
    fn long_gaps_count_whole_days() {
        let mut gate = AlertGate::new(Duration::from_secs(300));
        gate.record(t0());
        assert!(gate.may_alert(t0() + chrono::Duration::days(1) + secs(10)));
    }

    #[test]
    fn reset_reopens_immediately() {
        let mut gate = AlertGate::new(Duration::from_secs(30));
        gate.record(t0());
        assert!(!gate.may_alert(t0() + secs(1)));

        gate.reset();
        assert!(gate.may_alert(t0() + secs(1)));
        assert!(gate.last_alert().is_none());
    }

    #[test]
    fn clock_going_backwards_keeps_gate_closed() {
        let mut gate = AlertGate::new(Duration::from_secs(30));
        gate.record(t0());
        assert!(!gate.may_alert(t0() - secs(100)));
    }

    #[test]
    fn countdown_reporting() {
        let mut gate = AlertGate::new(Duration::from_secs(90));
        gate.record(t0());

        let now = t0() + secs(15);
        assert_eq!(gate.remaining(now), Duration::from_secs(75));
        assert_eq!(gate.status_text(now), "Next alert available in: 1m 15s");
        assert!((gate.remaining_fraction(now) - 75.0 / 90.0).abs() < 1e-9);

        let later = t0() + secs(200);
        assert_eq!(gate.remaining(later), Duration::ZERO);
        assert_eq!(gate.remaining_fraction(later), 0.0);
    }
}
