// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pure translation between characteristic payloads and typed values.
//!
//! Encoders validate their argument and produce the exact bytes to write;
//! decoders accept payloads at least as long as the fixed layout and read the
//! layout prefix, since some firmware revisions pad reads to the attribute
//! size. Nothing in this module performs I/O or knows about connection state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{DecodeError, ValueError};
use crate::state::DeviceSnapshot;
use crate::types::{Brightness, FanTimer, Temperature};

use super::Characteristic;

// ===== Encoders =====

/// Encodes a heater setpoint write.
///
/// # Errors
///
/// Returns `ValueError::OutOfRange` if `celsius` is outside the supported
/// envelope [40, 230] °C. The error is raised before any I/O is attempted.
pub fn encode_set_temperature(celsius: u16) -> Result<Vec<u8>, ValueError> {
    let target = Temperature::setpoint(celsius)?;
    Ok(target.deci().to_le_bytes().to_vec())
}

/// Encodes a heater on/off write.
#[must_use]
pub fn encode_set_heater(on: bool) -> Vec<u8> {
    vec![u8::from(on)]
}

/// Encodes a fan on/off write.
#[must_use]
pub fn encode_set_fan(on: bool) -> Vec<u8> {
    vec![u8::from(on)]
}

/// Encodes an LED panel brightness write.
///
/// # Errors
///
/// Returns `ValueError::InvalidBrightness` if `percent` exceeds 100.
pub fn encode_set_brightness(percent: u8) -> Result<Vec<u8>, ValueError> {
    let brightness = Brightness::new(percent)?;
    Ok(vec![brightness.percent()])
}

/// Encodes a fan auto-off timer write.
///
/// # Errors
///
/// Returns `ValueError::OutOfRange` if `seconds` is outside [5, 300].
pub fn encode_set_fan_timer(seconds: u16) -> Result<Vec<u8>, ValueError> {
    let timer = FanTimer::new(seconds)?;
    Ok(timer.seconds().to_le_bytes().to_vec())
}

// ===== Decoders =====

/// Decodes a deci-degree temperature payload.
///
/// # Errors
///
/// Returns `DecodeError::Truncated` if the payload is shorter than two bytes.
pub fn decode_temperature(
    characteristic: Characteristic,
    data: &[u8],
) -> Result<Temperature, DecodeError> {
    Ok(Temperature::from_deci(le_u16(characteristic, data)?))
}

/// Decodes a single-byte on/off flag. Any non-zero byte reads as "on".
///
/// # Errors
///
/// Returns `DecodeError::Truncated` if the payload is empty.
pub fn decode_flag(characteristic: Characteristic, data: &[u8]) -> Result<bool, DecodeError> {
    let Some(&byte) = data.first() else {
        return Err(DecodeError::Truncated {
            characteristic: characteristic.to_string(),
            expected: 1,
            actual: 0,
        });
    };
    Ok(byte != 0)
}

/// Decodes an LED panel brightness payload.
///
/// # Errors
///
/// Returns `DecodeError::Truncated` for an empty payload and
/// `DecodeError::ValueOutOfRange` for a percentage above 100.
pub fn decode_brightness(data: &[u8]) -> Result<Brightness, DecodeError> {
    let characteristic = Characteristic::Brightness;
    let Some(&percent) = data.first() else {
        return Err(DecodeError::Truncated {
            characteristic: characteristic.to_string(),
            expected: 1,
            actual: 0,
        });
    };
    Brightness::new(percent).map_err(|_| DecodeError::ValueOutOfRange {
        characteristic: characteristic.to_string(),
        actual: u32::from(percent),
    })
}

/// Decodes a fan auto-off timer payload.
///
/// # Errors
///
/// Returns `DecodeError::Truncated` for a short payload and
/// `DecodeError::ValueOutOfRange` for a value outside [5, 300] seconds.
pub fn decode_fan_timer(data: &[u8]) -> Result<FanTimer, DecodeError> {
    let characteristic = Characteristic::FanTimer;
    let seconds = le_u16(characteristic, data)?;
    FanTimer::new(seconds).map_err(|_| DecodeError::ValueOutOfRange {
        characteristic: characteristic.to_string(),
        actual: u32::from(seconds),
    })
}

/// Decodes a NUL-padded UTF-8 text payload (firmware versions, serial number).
///
/// # Errors
///
/// Returns `DecodeError::InvalidText` if the payload is not valid UTF-8.
pub fn decode_text(characteristic: Characteristic, data: &[u8]) -> Result<String, DecodeError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| DecodeError::InvalidText(characteristic.to_string()))?;
    Ok(text.trim_matches(['\0', ' ', '\t', '\r', '\n']).to_string())
}

/// Decodes the lifetime operation counter (minutes).
///
/// # Errors
///
/// Returns `DecodeError::Truncated` if the payload is shorter than four bytes.
pub fn decode_operation_minutes(data: &[u8]) -> Result<u32, DecodeError> {
    let characteristic = Characteristic::OperationTime;
    let Some(&bytes) = data.first_chunk::<4>() else {
        return Err(DecodeError::Truncated {
            characteristic: characteristic.to_string(),
            expected: 4,
            actual: data.len(),
        });
    };
    Ok(u32::from_le_bytes(bytes))
}

/// Assembles a [`DeviceSnapshot`] from one poll cycle's raw reads.
///
/// The four telemetry characteristics are required; metadata characteristics
/// are decoded when present and left `None` otherwise. `taken_at` becomes the
/// snapshot timestamp, keeping this function free of any clock.
///
/// # Errors
///
/// Returns `DecodeError::MissingCharacteristic` if a telemetry read is absent
/// and the payload-shaped `DecodeError`s if any present read is malformed.
pub fn decode_snapshot(
    reads: &HashMap<Characteristic, Vec<u8>>,
    taken_at: DateTime<Utc>,
) -> Result<DeviceSnapshot, DecodeError> {
    let current_temperature = decode_temperature(
        Characteristic::CurrentTemperature,
        require(reads, Characteristic::CurrentTemperature)?,
    )?;
    let target_temperature = decode_temperature(
        Characteristic::TargetTemperature,
        require(reads, Characteristic::TargetTemperature)?,
    )?;
    let heater_on = decode_flag(
        Characteristic::HeaterFlag,
        require(reads, Characteristic::HeaterFlag)?,
    )?;
    let fan_on = decode_flag(
        Characteristic::FanFlag,
        require(reads, Characteristic::FanFlag)?,
    )?;

    let firmware_version = reads
        .get(&Characteristic::Firmware)
        .map(|data| decode_text(Characteristic::Firmware, data))
        .transpose()?;
    let ble_firmware_version = reads
        .get(&Characteristic::BleFirmware)
        .map(|data| decode_text(Characteristic::BleFirmware, data))
        .transpose()?;
    let serial_number = reads
        .get(&Characteristic::SerialNumber)
        .map(|data| decode_text(Characteristic::SerialNumber, data))
        .transpose()?;
    let operation_minutes = reads
        .get(&Characteristic::OperationTime)
        .map(|data| decode_operation_minutes(data))
        .transpose()?;

    Ok(DeviceSnapshot {
        current_temperature,
        target_temperature,
        heater_on,
        fan_on,
        firmware_version,
        ble_firmware_version,
        serial_number,
        operation_minutes,
        taken_at,
    })
}

fn require(
    reads: &HashMap<Characteristic, Vec<u8>>,
    characteristic: Characteristic,
) -> Result<&[u8], DecodeError> {
    reads
        .get(&characteristic)
        .map(Vec::as_slice)
        .ok_or_else(|| DecodeError::MissingCharacteristic(characteristic.to_string()))
}

fn le_u16(characteristic: Characteristic, data: &[u8]) -> Result<u16, DecodeError> {
    let Some(&bytes) = data.first_chunk::<2>() else {
        return Err(DecodeError::Truncated {
            characteristic: characteristic.to_string(),
            expected: 2,
            actual: data.len(),
        });
    };
    Ok(u16::from_le_bytes(bytes))
}
