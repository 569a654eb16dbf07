// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `volcano_ble` library.
//!
//! This module provides a comprehensive error hierarchy for handling failures
//! across the library: value validation, link communication, payload decoding,
//! and statistics persistence.

use thiserror::Error;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when interacting
/// with the appliance.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the Bluetooth link.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Error occurred while decoding a payload.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error occurred while persisting statistics.
    #[error("statistics store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors related to value validation and constraints.
///
/// These errors occur when attempting to create constrained types
/// with invalid values. They are raised before any I/O is attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// A brightness value is outside the valid range (0-100).
    #[error("brightness value {0} is out of range [0, 100]")]
    InvalidBrightness(u8),
}

/// Errors related to communication over the Bluetooth link.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The appliance is not connected.
    #[error("device is not connected")]
    NotConnected,

    /// An I/O transaction did not complete within its bounded window.
    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    /// All transparent retries failed.
    #[error("retries exhausted after {attempts} attempts")]
    Exhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// The underlying transport reported a failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl LinkError {
    /// Returns `true` if the failure is worth retrying on the same link.
    ///
    /// Timeouts and transport hiccups are transient; a missing connection
    /// is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_))
    }
}

/// Errors related to decoding appliance payloads.
///
/// Any of these means a read returned bytes the codec refuses to interpret;
/// the caller decides whether to retry or skip the poll cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A characteristic required for the snapshot was not read.
    #[error("missing characteristic in reads: {0}")]
    MissingCharacteristic(String),

    /// A payload is shorter than its fixed layout.
    #[error("{characteristic} payload is {actual} bytes, expected at least {expected}")]
    Truncated {
        /// The characteristic whose payload was too short.
        characteristic: String,
        /// Minimum number of bytes the layout requires.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },

    /// A text payload is not valid UTF-8.
    #[error("{0} payload is not valid UTF-8")]
    InvalidText(String),

    /// A decoded value is outside its wire range.
    #[error("{characteristic} value {actual} is outside its wire range")]
    ValueOutOfRange {
        /// The characteristic whose value was out of range.
        characteristic: String,
        /// The decoded value.
        actual: u32,
    },
}

/// Errors related to loading or saving the statistics record.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted record could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
