use chatgpt_source_core::GenerationError;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;

/// Allowance of generation calls per UTC calendar day.
///
/// The counter rolls over on the first call of a new day. A limit of `0`
/// disables the quota.
#[derive(Debug)]
pub struct DailyQuota {
    limit: u32,
    state: Mutex<QuotaState>,
}

#[derive(Debug)]
struct QuotaState {
    day: NaiveDate,
    used: u32,
}

impl DailyQuota {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            state: Mutex::new(QuotaState {
                day: today(),
                used: 0,
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Claims one call from today's allowance.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::QuotaExhausted`] when today's allowance is
    /// used up.
    pub fn try_acquire(&self) -> Result<(), GenerationError> {
        self.try_acquire_on(today())
    }

    pub(crate) fn try_acquire_on(&self, day: NaiveDate) -> Result<(), GenerationError> {
        let mut state = self.state.lock();
        if state.day != day {
            tracing::info!(previous = %state.day, used = state.used, "Daily quota rolled over");
            state.day = day;
            state.used = 0;
        }

        if self.limit != 0 && state.used >= self.limit {
            return Err(GenerationError::QuotaExhausted { limit: self.limit });
        }

        state.used = state.used.saturating_add(1);
        Ok(())
    }

    /// Clears today's usage.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.day = today();
        state.used = 0;
    }

    /// Calls claimed so far on the current day.
    pub fn used(&self) -> u32 {
        let state = self.state.lock();
        if state.day == today() {
            state.used
        } else {
            0
        }
    }

    /// Calls left today, or `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        (self.limit != 0).then(|| self.limit.saturating_sub(self.used()))
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
