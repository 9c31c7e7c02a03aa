//! Reply throttling.
//!
//! A matched message triggers a reply when the running counter is a
//! multiple of `interval + 1`, or, with the day-reset option on, when it is
//! the first matched message of a new local calendar day. Counter and
//! timestamp advance on every matched message whether or not a reply goes
//! out.

use chrono::{DateTime, Local};
use keyreply_config::ThrottleRecord;

/// Why a reply was or was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// The counter hit a multiple of the divisor.
    Interval,
    /// First matched message since the calendar day changed.
    NewDay,
    /// Neither rule fired.
    Throttled,
}

/// Outcome of one throttle decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub should_reply: bool,
    pub reason: DecisionReason,
    /// Counter value the decision was made on (0-based position of the
    /// matched message).
    pub position: u64,
}

/// Counter and last-event timestamp shared by all matched messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleState {
    pub reply_count: u64,
    pub last_event_time: DateTime<Local>,
}

impl ThrottleState {
    pub fn new(reply_count: u64, last_event_time: DateTime<Local>) -> Self {
        Self {
            reply_count,
            last_event_time,
        }
    }

    /// Decide whether the matched message at `now` gets a reply, then
    /// advance the counter and timestamp.
    pub fn decide(&mut self, interval: u64, tomorrow_reset: bool, now: DateTime<Local>) -> Decision {
        let divisor = interval.saturating_add(1);
        let position = self.reply_count;

        let reason = if position % divisor == 0 {
            DecisionReason::Interval
        } else if tomorrow_reset && self.last_event_time.date_naive() != now.date_naive() {
            DecisionReason::NewDay
        } else {
            DecisionReason::Throttled
        };

        self.last_event_time = now;
        self.reply_count = self.reply_count.saturating_add(1);

        Decision {
            should_reply: reason != DecisionReason::Throttled,
            reason,
            position,
        }
    }

    pub fn to_record(&self) -> ThrottleRecord {
        ThrottleRecord {
            reply_count: self.reply_count,
            last_event_time: self.last_event_time,
        }
    }
}

impl From<&ThrottleRecord> for ThrottleState {
    fn from(record: &ThrottleRecord) -> Self {
        Self::new(record.reply_count, record.last_event_time)
    }
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self::new(0, Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32, hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, d, hour, 0, 0).unwrap()
    }

    fn replies(state: &mut ThrottleState, interval: u64, reset: bool, times: &[DateTime<Local>]) -> Vec<bool> {
        times
            .iter()
            .map(|t| state.decide(interval, reset, *t).should_reply)
            .collect()
    }

    #[test]
    fn test_interval_two_replies_every_third() {
        let mut state = ThrottleState::new(0, day(19, 8));
        let times = vec![day(19, 9); 4];
        assert_eq!(replies(&mut state, 2, false, &times), vec![true, false, false, true]);
    }

    #[test]
    fn test_interval_zero_replies_every_time() {
        let mut state = ThrottleState::new(0, day(19, 8));
        let times = vec![day(19, 9); 5];
        assert!(replies(&mut state, 0, false, &times).into_iter().all(|r| r));
    }

    #[test]
    fn test_reply_count_matches_ceiling_formula() {
        for interval in 0..8u64 {
            for n in 0..30u64 {
                let mut state = ThrottleState::new(0, day(19, 8));
                let mut positions = Vec::new();
                for i in 0..n {
                    if state.decide(interval, false, day(19, 10)).should_reply {
                        positions.push(i);
                    }
                }
                let divisor = interval + 1;
                assert_eq!(positions.len() as u64, n.div_ceil(divisor), "interval={interval} n={n}");
                assert!(positions.iter().all(|p| p % divisor == 0));
                assert_eq!(state.reply_count, n);
            }
        }
    }

    #[test]
    fn test_new_day_overrides_counter() {
        let yesterday = day(18, 22);
        let mut state = ThrottleState::new(2, yesterday);
        let decision = state.decide(5, true, day(19, 7));
        assert!(decision.should_reply);
        assert_eq!(decision.reason, DecisionReason::NewDay);
        assert_eq!(decision.position, 2);
        assert_eq!(state.reply_count, 3);
        assert_eq!(state.last_event_time, day(19, 7));
    }

    #[test]
    fn test_new_day_ignored_without_reset() {
        let mut state = ThrottleState::new(2, day(18, 22));
        let decision = state.decide(5, false, day(19, 7));
        assert!(!decision.should_reply);
        assert_eq!(decision.reason, DecisionReason::Throttled);
    }

    #[test]
    fn test_non_reply_event_moves_day_reference() {
        let mut state = ThrottleState::new(1, day(18, 22));
        // First message of the new day replies and moves the reference.
        assert!(state.decide(5, true, day(19, 7)).should_reply);
        // Later the same day: counter 2, not divisible, same day.
        assert!(!state.decide(5, true, day(19, 8)).should_reply);
        assert_eq!(state.last_event_time, day(19, 8));
    }

    #[test]
    fn test_same_day_of_month_next_month_is_a_new_day() {
        let mut state = ThrottleState::new(1, day(19, 12));
        let next_month = day(19, 12) + Duration::days(31);
        assert!(state.decide(5, true, next_month).should_reply);
    }

    #[test]
    fn test_counter_advances_on_every_match() {
        let mut state = ThrottleState::new(0, day(19, 8));
        for expected in 1..=7 {
            state.decide(3, true, day(19, 9));
            assert_eq!(state.reply_count, expected);
        }
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let mut state = ThrottleState::new(1, day(19, 8));
        let decision = state.decide(u64::MAX, false, day(19, 9));
        assert!(!decision.should_reply);
    }

    #[test]
    fn test_record_round_trip() {
        let state = ThrottleState::new(9, day(19, 8));
        assert_eq!(ThrottleState::from(&state.to_record()), state);
    }
}
