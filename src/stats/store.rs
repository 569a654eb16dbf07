// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Durable usage statistics, updated once per finalized session.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::Session;

/// How many of the most recent session durations feed the rolling average.
pub const ROLLING_WINDOW: usize = 100;

/// The persisted statistics state.
///
/// Every field defaults when absent from the backing file, so records
/// written by older builds keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsRecord {
    /// Sessions ever recorded.
    pub total_sessions: u64,
    /// Sessions recorded since the last local midnight.
    pub sessions_today: u32,
    /// Local date `sessions_today` was last reset (or counted) on.
    pub last_reset_date: NaiveDate,
    /// Duration of the most recent session, in fractional minutes.
    pub last_session_minutes: Option<f64>,
    /// When the most recent session ended.
    pub last_session_at: Option<DateTime<Utc>>,
    /// Durations of the most recent sessions, oldest first, at most
    /// [`ROLLING_WINDOW`] entries.
    pub recent_minutes: VecDeque<f64>,
}

impl Default for StatisticsRecord {
    fn default() -> Self {
        Self {
            total_sessions: 0,
            sessions_today: 0,
            last_reset_date: NaiveDate::MIN,
            last_session_minutes: None,
            last_session_at: None,
            recent_minutes: VecDeque::new(),
        }
    }
}

impl StatisticsRecord {
    /// Mean duration over the trailing window, `None` before any session.
    #[must_use]
    pub fn average_session_minutes(&self) -> Option<f64> {
        if self.recent_minutes.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.recent_minutes.len() as f64;
        Some(self.recent_minutes.iter().sum::<f64>() / count)
    }

    /// Zeroes the daily counter once the local date has moved past the last
    /// counted one. Called lazily on every read and write; there is no
    /// midnight timer.
    pub fn roll_over_if_new_day(&mut self, today: NaiveDate) {
        if today > self.last_reset_date {
            self.sessions_today = 0;
            self.last_reset_date = today;
        }
    }

    /// Folds one finalized session into the counters and the window.
    pub fn apply(&mut self, session: &Session) {
        let minutes = session.duration_minutes().unwrap_or_default();
        self.total_sessions += 1;
        self.sessions_today += 1;
        self.last_session_minutes = Some(minutes);
        self.last_session_at = session.ended_at.or(Some(session.started_at));
        self.recent_minutes.push_back(minutes);
        while self.recent_minutes.len() > ROLLING_WINDOW {
            self.recent_minutes.pop_front();
        }
    }
}

/// JSON-file-backed statistics, safe to share across tasks.
///
/// A single mutex guards the record; sessions arrive at most once per
/// detector finalization, so contention is nil. Saves go through a
/// temporary file and a rename, so a crash mid-write leaves the previous
/// record intact.
#[derive(Debug)]
pub struct StatisticsStore {
    record: Mutex<StatisticsRecord>,
    path: Option<PathBuf>,
}

impl StatisticsStore {
    /// Opens statistics backed by the given file, starting fresh when the
    /// file is missing or unreadable.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = Self::load(&path);
        Self {
            record: Mutex::new(record),
            path: Some(path),
        }
    }

    /// Opens statistics that live only as long as the process. Nothing is
    /// ever written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            record: Mutex::new(StatisticsRecord::default()),
            path: None,
        }
    }

    /// The backing file, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(path: &Path) -> StatisticsRecord {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(record) => {
                    tracing::info!(path = %path.display(), "loaded statistics");
                    record
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "statistics file unreadable, starting fresh"
                    );
                    StatisticsRecord::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no statistics file yet, starting fresh");
                StatisticsRecord::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "statistics file unreadable, starting fresh"
                );
                StatisticsRecord::default()
            }
        }
    }

    /// A copy of the current record, with the daily counter rolled over if
    /// local midnight has passed.
    #[must_use]
    pub fn snapshot(&self) -> StatisticsRecord {
        self.snapshot_on(Local::now().date_naive())
    }

    fn snapshot_on(&self, today: NaiveDate) -> StatisticsRecord {
        let mut record = self.record.lock();
        record.roll_over_if_new_day(today);
        record.clone()
    }

    /// Records one finalized session and persists the updated record.
    ///
    /// # Errors
    ///
    /// Fails when the backing file cannot be written; the in-memory record
    /// is updated regardless.
    pub fn record_session(&self, session: &Session) -> Result<(), StoreError> {
        self.record_on(session, Local::now().date_naive())
    }

    fn record_on(&self, session: &Session, today: NaiveDate) -> Result<(), StoreError> {
        let updated = {
            let mut record = self.record.lock();
            record.roll_over_if_new_day(today);
            record.apply(session);
            record.clone()
        };
        self.persist(&updated)
    }

    fn persist(&self, record: &StatisticsRecord) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), "statistics saved");
        Ok(())
    }
}
