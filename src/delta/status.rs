//! Typed readings built from raw slot values.
//!
//! Scaling only touches present values; an absent slot stays absent.
//! Enumerations carry the device's integer code only, display text lives in
//! the payload layer.
//!
//! An enumeration code or date outside its valid range nulls that one field
//! and is kept in `field_errors`; the neighbouring slots are still decoded.

use crate::error::UpsError;

use chrono::NaiveDate;
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OutputMode {
    Normal = 0,
    Battery = 1,
    Bypass = 2,
    Reducing = 3,
    Boosting = 4,
    ManualBypass = 5,
    Other = 6,
    NoOutput = 7,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BatteryHealth {
    Good = 0,
    Weak = 1,
    Replace = 2,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ChargeStatus {
    Ok = 0,
    Low = 1,
    Depleted = 2,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ChargeMode {
    Floating = 0,
    Boost = 1,
    Resting = 2,
    Discharging = 3,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputStatus {
    pub line: Option<i32>,
    pub frequency_hz: Option<f64>,
    pub voltage: Option<f64>,
}

impl InputStatus {
    pub fn from_fields(fields: &[Option<i32>]) -> Result<Self, UpsError> {
        let &[line, freq, volt] = fields else {
            return Err(slot_count_mismatch("input", 3, fields));
        };

        Ok(Self {
            line,
            frequency_hz: div10(freq),
            voltage: div10(volt),
        })
    }
}

// input carries no enumerations or dates
impl FieldErrors for InputStatus {
    fn field_errors(&self) -> &[UpsError] {
        Default::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputStatus {
    pub mode: Option<OutputMode>,
    pub frequency_hz: Option<f64>,
    pub line: Option<i32>,
    pub voltage: Option<f64>,
    pub amperes: Option<f64>,
    /// `amperes` was computed as watts / volts because the device left the
    /// current slot empty.
    pub amperes_derived: bool,
    pub watts: Option<i32>,
    pub kilowatts: Option<f64>,
    pub percent: Option<i32>,
    pub field_errors: Vec<UpsError>,
}

impl OutputStatus {
    pub fn from_fields(fields: &[Option<i32>]) -> Result<Self, UpsError> {
        let &[mode, freq, line, volt, amp, watt, percent] = fields else {
            return Err(slot_count_mismatch("output", 7, fields));
        };

        let voltage = div10(volt);
        let (amperes, amperes_derived) = match (div10(amp), watt, voltage) {
            (Some(amperes), _, _) => (Some(amperes), false),
            (None, Some(watts), Some(volts)) if volts != 0.0 => {
                (Some(round3(f64::from(watts) / volts)), true)
            }
            _ => (None, false),
        };

        let mut field_errors = Vec::new();

        Ok(Self {
            mode: code("output mode", mode)
                .unwrap_or_else(|err| keep(&mut field_errors, err)),
            frequency_hz: div10(freq),
            line,
            voltage,
            amperes,
            amperes_derived,
            watts: watt,
            kilowatts: watt.map(|w| round3(f64::from(w) / 1000.0)),
            percent,
            field_errors,
        })
    }
}

impl FieldErrors for OutputStatus {
    fn field_errors(&self) -> &[UpsError] {
        &self.field_errors
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatteryStatus {
    pub health: Option<BatteryHealth>,
    pub charge_status: Option<ChargeStatus>,
    pub charge_mode: Option<ChargeMode>,
    pub seconds_on_battery: Option<i32>,
    pub estimated_minutes_remaining: Option<i32>,
    pub estimated_charge_remaining: Option<i32>,
    pub voltage: Option<f64>,
    pub amperes: Option<f64>,
    pub internal_temp_c: Option<i32>,
    pub level_percent: Option<i32>,
    pub field_errors: Vec<UpsError>,
}

impl BatteryStatus {
    pub fn from_fields(fields: &[Option<i32>]) -> Result<Self, UpsError> {
        let &[health, status, charge_mode, seconds, minutes, charge, volt, amp, temp, level] =
            fields
        else {
            return Err(slot_count_mismatch("battery", 10, fields));
        };

        let mut field_errors = Vec::new();

        Ok(Self {
            health: code("battery health", health)
                .unwrap_or_else(|err| keep(&mut field_errors, err)),
            charge_status: code("battery status", status)
                .unwrap_or_else(|err| keep(&mut field_errors, err)),
            charge_mode: code("charge mode", charge_mode)
                .unwrap_or_else(|err| keep(&mut field_errors, err)),
            seconds_on_battery: seconds,
            estimated_minutes_remaining: minutes,
            estimated_charge_remaining: charge,
            voltage: div10(volt),
            amperes: div10(amp),
            internal_temp_c: temp,
            level_percent: level,
            field_errors,
        })
    }
}

impl FieldErrors for BatteryStatus {
    fn field_errors(&self) -> &[UpsError] {
        &self.field_errors
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReplacementDateInfo {
    pub last_changed: Option<NaiveDate>,
    pub next_due: Option<NaiveDate>,
    pub field_errors: Vec<UpsError>,
}

impl ReplacementDateInfo {
    pub fn from_fields(fields: &[Option<i32>]) -> Result<Self, UpsError> {
        let &[last, next] = fields else {
            return Err(slot_count_mismatch("replacement date", 2, fields));
        };

        let mut field_errors = Vec::new();

        Ok(Self {
            last_changed: date(last).unwrap_or_else(|err| keep(&mut field_errors, err)),
            next_due: date(next).unwrap_or_else(|err| keep(&mut field_errors, err)),
            field_errors,
        })
    }
}

impl FieldErrors for ReplacementDateInfo {
    fn field_errors(&self) -> &[UpsError] {
        &self.field_errors
    }
}

/// Per-field decoding failures carried by a status record.
pub trait FieldErrors {
    fn field_errors(&self) -> &[UpsError];
}

fn div10(raw: Option<i32>) -> Option<f64> {
    raw.map(|v| f64::from(v) / 10.0)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

// translate a raw code, rejecting anything outside the table
fn code<T>(name: &str, raw: Option<i32>) -> Result<Option<T>, UpsError>
where
    T: TryFromPrimitive<Primitive = u8>,
{
    raw.map(|v| {
        u8::try_from(v)
            .ok()
            .and_then(|c| T::try_from_primitive(c).ok())
            .ok_or_else(|| UpsError::Format(format!("{} code {} out of range", name, v)))
    })
    .transpose()
}

fn date(raw: Option<i32>) -> Result<Option<NaiveDate>, UpsError> {
    raw.map(yyyymmdd).transpose()
}

// record a field failure, leaving the field null
fn keep<T>(errors: &mut Vec<UpsError>, err: UpsError) -> Option<T> {
    errors.push(err);
    None
}

fn yyyymmdd(raw: i32) -> Result<NaiveDate, UpsError> {
    let (year, month, day) = (raw / 10000, (raw / 100 % 100) as u32, (raw % 100) as u32);

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| UpsError::Format(format!("{:08} is not a valid YYYYMMDD date", raw)))
}

fn slot_count_mismatch(name: &str, expected: usize, fields: &[Option<i32>]) -> UpsError {
    UpsError::Format(format!(
        "{} status expects {} slots, got {}",
        name,
        expected,
        fields.len()
    ))
}
