//! Published payload shape and display labels.

use crate::delta::status::{
    BatteryHealth, BatteryStatus, ChargeMode, ChargeStatus, InputStatus, OutputMode,
    OutputStatus,
};
use crate::poller::Snapshot;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Display text for a device enumeration code.
pub trait Label {
    fn label(&self) -> &'static str;
}

impl Label for OutputMode {
    fn label(&self) -> &'static str {
        use OutputMode::*;

        match self {
            Normal => "Normal (市電輸入)",
            Battery => "Battery (電池轉換)",
            Bypass => "Bypass(3phase Reserve Power Path)",
            Reducing => "Reducing",
            Boosting => "Boosting",
            ManualBypass => "Manual Bypass (手動屏蔽)",
            Other => "Other (其他)",
            NoOutput => "No output (無輸出)",
        }
    }
}

impl Label for BatteryHealth {
    fn label(&self) -> &'static str {
        match self {
            BatteryHealth::Good => "Good (良好)",
            BatteryHealth::Weak => "Weak (虛弱)",
            BatteryHealth::Replace => "Replace (需更換)",
        }
    }
}

impl Label for ChargeStatus {
    fn label(&self) -> &'static str {
        match self {
            ChargeStatus::Ok => "OK (良好)",
            ChargeStatus::Low => "Low (低電量)",
            ChargeStatus::Depleted => "Depleted (耗盡)",
        }
    }
}

impl Label for ChargeMode {
    fn label(&self) -> &'static str {
        match self {
            ChargeMode::Floating => "Floating charging (微量充電)",
            ChargeMode::Boost => "Boost charging (快速充電)",
            ChargeMode::Resting => "Resting (休眠)",
            ChargeMode::Discharging => "Discharging (未充電)",
        }
    }
}

fn label<T: Label>(value: Option<T>) -> Option<&'static str> {
    value.map(|v| v.label())
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Payload {
    pub temp: Option<i32>,
    pub input: Input,
    pub output: Output,
    pub battery: Battery,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Input {
    pub line: Option<i32>,
    pub freq: Option<f64>,
    pub volt: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Output {
    pub mode: Option<&'static str>,
    pub freq: Option<f64>,
    pub line: Option<i32>,
    pub volt: Option<f64>,
    pub amp: Option<f64>,
    /// kW
    pub watt: Option<f64>,
    pub percent: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Battery {
    pub status: BatteryState,
    pub last_change: Date,
    pub next_change: Date,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryState {
    pub health: Option<&'static str>,
    pub status: Option<&'static str>,
    pub charge_mode: Option<&'static str>,
    pub volt: Option<f64>,
    pub remain_percent: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Date {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl Payload {
    /// Groups missing from the snapshot are published with null leaves.
    pub fn new(snapshot: &Snapshot) -> Self {
        let input = snapshot.input.as_ref().map(Input::from).unwrap_or_default();
        let output = snapshot.output.as_ref().map(Output::from).unwrap_or_default();

        let mut battery = Battery::default();
        let mut temp = None;
        if let Some(status) = &snapshot.battery {
            temp = status.internal_temp_c;
            battery.status = BatteryState::from(status);
        }
        if let Some(dates) = &snapshot.replacement {
            battery.last_change = Date::from(dates.last_changed);
            battery.next_change = Date::from(dates.next_due);
        }

        Self {
            temp,
            input,
            output,
            battery,
        }
    }
}

impl From<&InputStatus> for Input {
    fn from(status: &InputStatus) -> Self {
        Self {
            line: status.line,
            freq: status.frequency_hz,
            volt: status.voltage,
        }
    }
}

impl From<&OutputStatus> for Output {
    fn from(status: &OutputStatus) -> Self {
        Self {
            mode: label(status.mode),
            freq: status.frequency_hz,
            line: status.line,
            volt: status.voltage,
            amp: status.amperes,
            watt: status.kilowatts,
            percent: status.percent,
        }
    }
}

impl From<&BatteryStatus> for BatteryState {
    fn from(status: &BatteryStatus) -> Self {
        Self {
            health: label(status.health),
            status: label(status.charge_status),
            charge_mode: label(status.charge_mode),
            volt: status.voltage,
            remain_percent: status.level_percent,
        }
    }
}

impl From<Option<NaiveDate>> for Date {
    fn from(date: Option<NaiveDate>) -> Self {
        Self {
            year: date.map(|d| d.year()),
            month: date.map(|d| d.month()),
            day: date.map(|d| d.day()),
        }
    }
}
