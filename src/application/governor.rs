//! # Safety Governor
//!
//! Bounds unattended tool use within one session. Four independent limits:
//! - consecutive tool uses without user input
//! - tool uses per one-minute window
//! - consecutive calls to the same tool
//! - total session duration (checked by the orchestrator once per iteration)
//!
//! Counters live in an explicit [`GovernorState`] owned by the orchestrator, never
//! in process globals. [`SharedGovernor`] serializes access when one instance has
//! to be shared across sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::config::GovernorConfig;
use crate::domain::errors::LoopViolation;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Per-session counters.
#[derive(Debug, Clone)]
pub struct GovernorState {
    pub total_tool_uses: u64,
    pub consecutive_tool_uses: u32,
    pub window_count: u32,
    pub window_start: Option<Instant>,
    pub last_tool: Option<String>,
    pub same_tool_streak: u32,
    pub session_start: Instant,
}

impl GovernorState {
    pub fn new(session_start: Instant) -> Self {
        Self {
            total_tool_uses: 0,
            consecutive_tool_uses: 0,
            window_count: 0,
            window_start: None,
            last_tool: None,
            same_tool_streak: 0,
            session_start,
        }
    }
}

impl Default for GovernorState {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

#[derive(Debug, Clone)]
pub struct Governor {
    config: GovernorConfig,
}

impl Governor {
    pub fn new(config: GovernorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Record one dispatch attempt for `tool` and decide whether it may run.
    ///
    /// Checks run in order consecutive, rate, same-tool. The total, consecutive
    /// and rate counters all advance before any check; the same-tool streak
    /// advances only once the earlier checks pass.
    pub fn check_and_record(
        &self,
        state: &mut GovernorState,
        tool: &str,
        now: Instant,
    ) -> Result<(), LoopViolation> {
        state.total_tool_uses += 1;
        state.consecutive_tool_uses += 1;
        let elapsed = self.advance_window(state, now);

        if state.consecutive_tool_uses > self.config.max_consecutive_tool_uses {
            let violation = LoopViolation::Consecutive {
                current: state.consecutive_tool_uses,
                max: self.config.max_consecutive_tool_uses,
            };
            tracing::error!(
                consecutive_uses = state.consecutive_tool_uses,
                limit = self.config.max_consecutive_tool_uses,
                "Consecutive tool use limit exceeded"
            );
            return Err(violation);
        }

        self.check_rate(state, elapsed)?;

        if state.last_tool.as_deref() == Some(tool) {
            state.same_tool_streak += 1;
            if state.same_tool_streak >= self.config.max_same_tool_calls {
                tracing::error!(
                    tool,
                    call_count = state.same_tool_streak,
                    limit = self.config.max_same_tool_calls,
                    "Same tool call limit exceeded"
                );
                return Err(LoopViolation::SameTool {
                    tool: tool.to_string(),
                    count: state.same_tool_streak,
                    max: self.config.max_same_tool_calls,
                });
            }
        } else {
            state.last_tool = Some(tool.to_string());
            state.same_tool_streak = 1;
        }

        Ok(())
    }

    /// Count one use in the rate window, starting a new window when none is
    /// open or the current one is over. Returns the time since the anchor.
    fn advance_window(&self, state: &mut GovernorState, now: Instant) -> Duration {
        match state.window_start {
            Some(start) if now.saturating_duration_since(start) <= RATE_WINDOW => {
                state.window_count += 1;
                now.saturating_duration_since(start)
            }
            _ => {
                state.window_start = Some(now);
                state.window_count = 1;
                Duration::ZERO
            }
        }
    }

    fn check_rate(&self, state: &GovernorState, elapsed: Duration) -> Result<(), LoopViolation> {
        if state.window_count >= self.config.max_tool_uses_per_minute {
            tracing::error!(
                use_count = state.window_count,
                elapsed_secs = elapsed.as_secs_f64(),
                limit = self.config.max_tool_uses_per_minute,
                "Tool use rate limit exceeded"
            );
            return Err(LoopViolation::Rate {
                count: state.window_count,
                max: self.config.max_tool_uses_per_minute,
                elapsed_secs: elapsed.as_secs_f64(),
            });
        }
        Ok(())
    }

    /// Called each time a line of user input is read. Total and rate counters
    /// are kept.
    pub fn reset_for_user_input(&self, state: &mut GovernorState) {
        state.consecutive_tool_uses = 0;
        state.last_tool = None;
        state.same_tool_streak = 0;
    }

    pub fn session_expired(&self, state: &GovernorState, now: Instant) -> bool {
        now.saturating_duration_since(state.session_start) > self.config.max_session_duration()
    }
}

/// A governor and its state behind one lock, for process-wide sharing.
#[derive(Debug, Clone)]
pub struct SharedGovernor {
    inner: Arc<Mutex<(Governor, GovernorState)>>,
}

impl SharedGovernor {
    pub fn new(governor: Governor, state: GovernorState) -> Self {
        Self {
            inner: Arc::new(Mutex::new((governor, state))),
        }
    }

    pub async fn check_and_record(&self, tool: &str, now: Instant) -> Result<(), LoopViolation> {
        let mut guard = self.inner.lock().await;
        let (governor, state) = &mut *guard;
        governor.check_and_record(state, tool, now)
    }

    pub async fn reset_for_user_input(&self) {
        let mut guard = self.inner.lock().await;
        let (governor, state) = &mut *guard;
        governor.reset_for_user_input(state);
    }

    pub async fn snapshot(&self) -> GovernorState {
        self.inner.lock().await.1.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ViolationKind;

    fn config(consecutive: u32, rate: u32, same: u32) -> GovernorConfig {
        GovernorConfig {
            max_consecutive_tool_uses: consecutive,
            max_tool_uses_per_minute: rate,
            max_same_tool_calls: same,
            max_session_secs: 60,
        }
    }

    #[test]
    fn test_first_use_moves_counters_to_one() {
        let governor = Governor::new(GovernorConfig::standard());
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        governor.check_and_record(&mut state, "list_files", now).unwrap();
        assert_eq!(state.total_tool_uses, 1);
        assert_eq!(state.consecutive_tool_uses, 1);
        assert_eq!(state.window_count, 1);
        assert_eq!(state.same_tool_streak, 1);
        assert_eq!(state.window_start, Some(now));
    }

    #[test]
    fn test_consecutive_counter_tracks_attempts_since_reset() {
        let governor = Governor::new(config(100, 1000, 1000));
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        for round in 1..=3u32 {
            for i in 0..(round * 2) {
                let tool = if i % 2 == 0 { "a" } else { "b" };
                governor.check_and_record(&mut state, tool, now).unwrap();
            }
            assert_eq!(state.consecutive_tool_uses, round * 2);
            governor.reset_for_user_input(&mut state);
            assert_eq!(state.consecutive_tool_uses, 0);
        }
        assert_eq!(state.total_tool_uses, 12);
    }

    #[test]
    fn test_consecutive_limit_denies_after_max() {
        let governor = Governor::new(config(15, 1000, 1000));
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        for i in 0..15 {
            let tool = format!("tool_{}", i);
            governor.check_and_record(&mut state, &tool, now).unwrap();
        }
        let err = governor.check_and_record(&mut state, "tool_15", now).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::Consecutive);
        assert_eq!(err, LoopViolation::Consecutive { current: 16, max: 15 });
    }

    #[test]
    fn test_same_tool_streak_resets_on_change() {
        let governor = Governor::new(config(100, 1000, 5));
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        governor.check_and_record(&mut state, "read_file", now).unwrap();
        governor.check_and_record(&mut state, "read_file", now).unwrap();
        assert_eq!(state.same_tool_streak, 2);

        governor.check_and_record(&mut state, "list_files", now).unwrap();
        assert_eq!(state.same_tool_streak, 1);
        assert_eq!(state.last_tool.as_deref(), Some("list_files"));
    }

    #[test]
    fn test_same_tool_denies_when_streak_reaches_max() {
        let governor = Governor::new(config(100, 1000, 5));
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        for expected in 1..=4 {
            governor.check_and_record(&mut state, "read_file", now).unwrap();
            assert_eq!(state.same_tool_streak, expected);
        }
        let err = governor.check_and_record(&mut state, "read_file", now).unwrap_err();
        assert_eq!(
            err,
            LoopViolation::SameTool {
                tool: "read_file".into(),
                count: 5,
                max: 5
            }
        );
    }

    #[test]
    fn test_rate_limit_within_window() {
        let governor = Governor::new(config(1000, 3, 1000));
        let start = Instant::now();
        let mut state = GovernorState::new(start);

        governor.check_and_record(&mut state, "a", start).unwrap();
        governor
            .check_and_record(&mut state, "b", start + Duration::from_secs(10))
            .unwrap();
        let err = governor
            .check_and_record(&mut state, "c", start + Duration::from_secs(20))
            .unwrap_err();
        assert_eq!(err.kind(), ViolationKind::Rate);
        assert_eq!(state.window_count, 3);
    }

    #[test]
    fn test_rate_window_resets_after_a_minute() {
        let governor = Governor::new(config(1000, 3, 1000));
        let start = Instant::now();
        let mut state = GovernorState::new(start);

        governor.check_and_record(&mut state, "a", start).unwrap();
        governor.check_and_record(&mut state, "b", start).unwrap();

        let later = start + Duration::from_secs(61);
        governor.check_and_record(&mut state, "c", later).unwrap();
        assert_eq!(state.window_count, 1);
        assert_eq!(state.window_start, Some(later));
    }

    #[test]
    fn test_denial_keeps_earlier_counters() {
        let governor = Governor::new(config(1000, 1000, 2));
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        governor.check_and_record(&mut state, "x", now).unwrap();
        assert!(governor.check_and_record(&mut state, "x", now).is_err());
        assert_eq!(state.consecutive_tool_uses, 2);
        assert_eq!(state.window_count, 2);
        assert_eq!(state.total_tool_uses, 2);
    }

    #[test]
    fn test_consecutive_denial_still_counts_toward_rate() {
        let governor = Governor::new(config(1, 3, 1000));
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        governor.check_and_record(&mut state, "a", now).unwrap();
        let err = governor.check_and_record(&mut state, "b", now).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::Consecutive);
        assert_eq!(state.window_count, 2);

        governor.reset_for_user_input(&mut state);
        let err = governor.check_and_record(&mut state, "c", now).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::Rate);
        assert_eq!(state.window_count, 3);
    }

    #[test]
    fn test_reset_keeps_totals() {
        let governor = Governor::new(GovernorConfig::standard());
        let now = Instant::now();
        let mut state = GovernorState::new(now);

        governor.check_and_record(&mut state, "a", now).unwrap();
        governor.reset_for_user_input(&mut state);
        assert_eq!(state.total_tool_uses, 1);
        assert_eq!(state.window_count, 1);
        assert_eq!(state.same_tool_streak, 0);
        assert!(state.last_tool.is_none());
    }

    #[test]
    fn test_session_expiry() {
        let governor = Governor::new(config(1, 1, 1));
        let start = Instant::now();
        let state = GovernorState::new(start);
        assert!(!governor.session_expired(&state, start + Duration::from_secs(60)));
        assert!(governor.session_expired(&state, start + Duration::from_secs(61)));
    }

    #[tokio::test]
    async fn test_shared_governor_serializes_updates() {
        let now = Instant::now();
        let shared = SharedGovernor::new(
            Governor::new(config(1000, 1000, 1000)),
            GovernorState::new(now),
        );

        let mut handles = Vec::new();
        for i in 0..8 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                let tool = format!("t{}", i);
                shared.check_and_record(&tool, now).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = shared.snapshot().await;
        assert_eq!(snapshot.total_tool_uses, 8);
        assert_eq!(snapshot.consecutive_tool_uses, 8);

        shared.reset_for_user_input().await;
        assert_eq!(shared.snapshot().await.consecutive_tool_uses, 0);
    }
}
