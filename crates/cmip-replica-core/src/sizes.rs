// SPDX-License-Identifier: Apache-2.0

use crate::errors::{Error, Result};

const UNITS: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Decimal (powers of 1000) rendering used by `synda queue`, e.g. `1.5 TB`.
#[must_use]
pub fn bytes_to_human(bytes: u64) -> String {
    match bytes {
        0 => "0 Bytes".to_string(),
        1 => "1 Byte".to_string(),
        n if n < 1000 => format!("{n} Bytes"),
        n => {
            let mut size = 0.0;
            let mut unit = UNITS[0];
            for (idx, candidate) in UNITS.iter().enumerate() {
                size = n as f64 / 1000_f64.powi(idx as i32 + 1);
                unit = *candidate;
                if size < 1000.0 {
                    break;
                }
            }
            format!("{size:.1} {unit}")
        }
    }
}

/// Inverse of [`bytes_to_human`], truncating toward zero.
pub fn human_to_bytes(value: &str) -> Result<u64> {
    let mut parts = value.split_whitespace();
    let (Some(number), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::InvalidSize {
            value: value.to_string(),
            reason: "expected `<number> <unit>`",
        });
    };
    let number: f64 = number.parse().map_err(|_| Error::InvalidSize {
        value: value.to_string(),
        reason: "number is not numeric",
    })?;
    if !number.is_finite() || number < 0.0 {
        return Err(Error::InvalidSize {
            value: value.to_string(),
            reason: "number must be finite and non-negative",
        });
    }
    let exponent = match unit {
        "B" | "Byte" | "Bytes" => 0,
        other => match UNITS.iter().position(|u| *u == other) {
            Some(idx) => idx as i32 + 1,
            None => {
                return Err(Error::InvalidSize {
                    value: value.to_string(),
                    reason: "unknown unit",
                })
            }
        },
    };
    Ok((number * 1000_f64.powi(exponent)) as u64)
}
