//! Eased display progress
//!
//! [`ProgressAnimator`] interpolates linearly from the current on-screen value to
//! the latest reported value over a fixed window. Retargeting mid-animation
//! restarts from wherever the bar currently is, so updates never queue and the
//! value never jumps backwards or past its target.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct ProgressAnimator {
    duration: Duration,
    from: f64,
    target: f64,
    started_at: Option<Instant>,
}

impl ProgressAnimator {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            from: 0.0,
            target: 0.0,
            started_at: None,
        }
    }

    /// Exact position at `now`
    pub fn position(&self, now: Instant) -> f64 {
        let Some(started_at) = self.started_at else {
            return self.target;
        };

        let fraction = if self.duration.is_zero() {
            1.0
        } else {
            let elapsed = now.saturating_duration_since(started_at);
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };

        self.from + (self.target - self.from) * fraction
    }

    /// Rounded value for display
    pub fn display(&self, now: Instant) -> u8 {
        self.position(now).round().clamp(0.0, 100.0) as u8
    }

    /// Start a new animation toward `target` from the current position
    pub fn retarget(&mut self, target: u8, now: Instant) {
        self.from = self.position(now);
        self.target = f64::from(target.min(100));
        self.started_at = Some(now);
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        match self.started_at {
            None => true,
            Some(started_at) => now.saturating_duration_since(started_at) >= self.duration,
        }
    }

    pub fn reset(&mut self) {
        self.from = 0.0;
        self.target = 0.0;
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn test_linear_interpolation() {
        let t0 = Instant::now();
        let mut animator = ProgressAnimator::new(WINDOW);
        animator.retarget(40, t0);

        assert_eq!(animator.display(t0), 0);
        assert_eq!(animator.display(t0 + Duration::from_millis(250)), 20);
        assert_eq!(animator.display(t0 + WINDOW), 40);
        assert_eq!(animator.display(t0 + Duration::from_secs(5)), 40);
        assert!(animator.is_settled(t0 + WINDOW));
        assert!(!animator.is_settled(t0 + Duration::from_millis(499)));
    }

    #[test]
    fn test_retarget_starts_from_current_position() {
        let t0 = Instant::now();
        let mut animator = ProgressAnimator::new(WINDOW);
        animator.retarget(100, t0);

        // Halfway to 100 a new target arrives
        let mid = t0 + Duration::from_millis(250);
        animator.retarget(60, mid);

        assert_eq!(animator.display(mid), 50);
        assert_eq!(animator.display(mid + Duration::from_millis(250)), 55);
        assert_eq!(animator.display(mid + WINDOW), 60);
    }

    #[test]
    fn test_never_overshoots() {
        let t0 = Instant::now();
        let mut animator = ProgressAnimator::new(WINDOW);
        animator.retarget(20, t0);
        let settled = t0 + WINDOW;
        animator.retarget(55, settled);

        let mut previous = animator.position(settled);
        for step in 0..=60 {
            let now = settled + Duration::from_millis(step * 10);
            let value = animator.position(now);
            assert!(value >= previous);
            assert!((20.0..=55.0).contains(&value));
            previous = value;
        }
    }

    #[test]
    fn test_zero_duration_jumps() {
        let t0 = Instant::now();
        let mut animator = ProgressAnimator::new(Duration::ZERO);
        animator.retarget(70, t0);
        assert_eq!(animator.display(t0), 70);
        assert!(animator.is_settled(t0));
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let t0 = Instant::now();
        let mut animator = ProgressAnimator::new(WINDOW);
        animator.retarget(80, t0);
        animator.reset();
        assert_eq!(animator.display(t0 + WINDOW), 0);
        assert!(animator.is_settled(t0));
    }
}
