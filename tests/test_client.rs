mod common;
use common::*;

use chrono::NaiveDate;
use delta_ups_bridge::delta::status::*;
use delta_ups_bridge::payload::Label;
use delta_ups_bridge::prelude::*;
use delta_ups_bridge::delta::SerialConnector;
use std::io;
use std::time::Duration;

#[test]
fn input_status_is_scaled() {
    common_setup();

    let connector = ScriptedConnector::new();
    connector.respond("1;600;2190");
    let client = UpsClient::new(connector.clone());

    assert_eq!(
        client.input_status().unwrap(),
        InputStatus {
            line: Some(1),
            frequency_hz: Some(60.0),
            voltage: Some(219.0),
        }
    );
    assert_eq!(connector.written(), vec![b"~00P003STI".to_vec()]);
}

#[test]
fn output_status_derives_missing_amperage() {
    common_setup();

    let connector = ScriptedConnector::new();
    connector.respond("0;600;1;2210;;03169;037");
    let client = UpsClient::new(connector.clone());

    let status = client.output_status().unwrap();

    assert_eq!(status.mode, Some(OutputMode::Normal));
    assert!(status.mode.unwrap().label().starts_with("Normal"));
    assert_eq!(status.frequency_hz, Some(60.0));
    assert_eq!(status.line, Some(1));
    assert_eq!(status.voltage, Some(221.0));
    assert_eq!(status.amperes, Some(14.339));
    assert!(status.amperes_derived);
    assert_eq!(status.watts, Some(3169));
    assert_eq!(status.kilowatts, Some(3.169));
    assert_eq!(status.percent, Some(37));
    assert_eq!(connector.written(), vec![b"~00P003STO".to_vec()]);
}

#[test]
fn output_status_prefers_reported_amperage() {
    let connector = ScriptedConnector::new();
    connector.respond("1;500;1;2300;00125;02000;050");
    let client = UpsClient::new(connector);

    let status = client.output_status().unwrap();

    assert_eq!(status.mode, Some(OutputMode::Battery));
    assert_eq!(status.amperes, Some(12.5));
    assert!(!status.amperes_derived);
}

#[test]
fn output_status_without_voltage_has_no_amperage() {
    let connector = ScriptedConnector::new();
    connector.respond("0;600;1;;;03169;037");
    let client = UpsClient::new(connector);

    let status = client.output_status().unwrap();

    assert_eq!(status.voltage, None);
    assert_eq!(status.amperes, None);
    assert!(!status.amperes_derived);
}

#[test]
fn battery_status_is_decoded() {
    common_setup();

    let connector = ScriptedConnector::new();
    connector.respond("0;0;1;;;000;2720;;031;100");
    let client = UpsClient::new(connector.clone());

    let status = client.battery_status().unwrap();

    assert_eq!(status.health, Some(BatteryHealth::Good));
    assert_eq!(status.charge_status, Some(ChargeStatus::Ok));
    assert_eq!(status.charge_mode, Some(ChargeMode::Boost));
    assert!(status.health.unwrap().label().starts_with("Good"));
    assert!(status.charge_status.unwrap().label().starts_with("OK"));
    assert!(status.charge_mode.unwrap().label().starts_with("Boost charging"));
    assert_eq!(status.seconds_on_battery, None);
    assert_eq!(status.estimated_minutes_remaining, None);
    assert_eq!(status.estimated_charge_remaining, Some(0));
    assert_eq!(status.voltage, Some(272.0));
    assert_eq!(status.amperes, None);
    assert_eq!(status.internal_temp_c, Some(31));
    assert_eq!(status.level_percent, Some(100));
    assert_eq!(connector.written(), vec![b"~00P003STB".to_vec()]);
}

#[test]
fn replacement_dates_are_parsed() {
    let connector = ScriptedConnector::new();
    connector.respond("20170322;20200322");
    let client = UpsClient::new(connector.clone());

    assert_eq!(
        client.battery_replacement_date().unwrap(),
        ReplacementDateInfo {
            last_changed: NaiveDate::from_ymd_opt(2017, 3, 22),
            next_due: NaiveDate::from_ymd_opt(2020, 3, 22),
            field_errors: Vec::new(),
        }
    );
    assert_eq!(connector.written(), vec![b"~00P003BRD".to_vec()]);
}

#[test]
fn missing_replacement_date_is_null() {
    let info = ReplacementDateInfo::from_fields(&[None, Some(20200322)]).unwrap();

    assert_eq!(info.last_changed, None);
    assert_eq!(info.next_due, NaiveDate::from_ymd_opt(2020, 3, 22));
}

#[test]
fn invalid_calendar_date_only_nulls_that_date() {
    let connector = ScriptedConnector::new();
    connector.respond("20171322;20200322");
    let client = UpsClient::new(connector);

    let info = client.battery_replacement_date().unwrap();

    assert_eq!(info.last_changed, None);
    assert_eq!(info.next_due, NaiveDate::from_ymd_opt(2020, 3, 22));
    assert_eq!(info.field_errors.len(), 1);
    assert!(info.field_errors[0].is_format());
}

#[test]
fn out_of_range_output_mode_only_nulls_the_mode() {
    let connector = ScriptedConnector::new();
    connector.respond("9;600;1;2210;;03169;037");
    let client = UpsClient::new(connector);

    let status = client.output_status().unwrap();

    assert_eq!(status.mode, None);
    assert_eq!(status.voltage, Some(221.0));
    assert_eq!(status.percent, Some(37));
    assert_eq!(status.field_errors.len(), 1);
    assert!(status.field_errors[0].is_format());
}

#[test]
fn out_of_range_battery_codes_only_null_their_field() {
    let connector = ScriptedConnector::new();
    connector.respond("3;0;1;;;000;2720;;031;100");
    let client = UpsClient::new(connector);

    let status = client.battery_status().unwrap();

    assert_eq!(status.health, None);
    assert_eq!(status.charge_status, Some(ChargeStatus::Ok));
    assert_eq!(status.charge_mode, Some(ChargeMode::Boost));
    assert_eq!(status.voltage, Some(272.0));
    assert_eq!(status.internal_temp_c, Some(31));
    assert_eq!(status.field_errors.len(), 1);

    for body in ["0;3;1;;;000;2720;;031;100", "0;0;4;;;000;2720;;031;100", "3;3;4;;;000;2720;;031;100"] {
        let connector = ScriptedConnector::new();
        connector.respond(body);
        let client = UpsClient::new(connector);

        let status = client.battery_status().unwrap();
        assert!(!status.field_errors.is_empty(), "{}", body);
        assert!(status.field_errors.iter().all(UpsError::is_format), "{}", body);
        assert_eq!(status.level_percent, Some(100), "{}", body);
    }
}

#[test]
fn every_code_in_the_tables_decodes() {
    for mode in 0..=7 {
        let status = OutputStatus::from_fields(&[Some(mode), None, None, None, None, None, None]).unwrap();
        assert_eq!(status.mode.map(u8::from), Some(mode as u8));
    }
    for mode in 0..=3 {
        let status = BatteryStatus::from_fields(&[
            None, None, Some(mode), None, None, None, None, None, None, None,
        ])
        .unwrap();
        assert_eq!(status.charge_mode.map(u8::from), Some(mode as u8));
    }
}

#[test]
fn unanswered_query_reports_nulls() {
    common_setup();

    let connector = ScriptedConnector::new();
    connector.fail_read(io::ErrorKind::TimedOut);
    let client = UpsClient::new(connector.clone());

    assert_eq!(client.output_status().unwrap(), OutputStatus::default());
    assert_eq!(connector.opened(), 2);
    assert_eq!(connector.released(), 2);
}

#[test]
fn absent_device_reports_nulls() {
    let connector = ScriptedConnector::new();
    connector.refuse_connect();
    let client = UpsClient::new(connector.clone());

    assert_eq!(client.input_status().unwrap(), InputStatus::default());
    assert_eq!(client.battery_status().unwrap(), BatteryStatus::default());
    assert_eq!(
        client.battery_replacement_date().unwrap(),
        ReplacementDateInfo::default()
    );
    assert_eq!(connector.opened(), 0);
}

#[test]
fn failed_write_reports_nulls_without_reading() {
    let connector = ScriptedConnector::new();
    connector.fail_write();
    connector.respond("1;600;2190");
    let client = UpsClient::new(connector.clone());

    assert_eq!(client.input_status().unwrap(), InputStatus::default());
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.released(), 1);
}

#[test]
fn short_reply_is_parsed() {
    let connector = ScriptedConnector::new();
    connector.respond_bytes(b"~00D0101;600;2190XX".to_vec());
    let client = UpsClient::new(connector.clone());

    let status = client.input_status().unwrap();

    assert_eq!(status.line, Some(1));
    assert_eq!(status.frequency_hz, Some(60.0));
    assert_eq!(status.voltage, Some(219.0));
    assert_eq!(connector.released(), 2);
}

#[test]
fn short_reply_is_returned_as_received() {
    let connector = ScriptedConnector::new();
    connector.respond_bytes(b"~00D0101;600;2190".to_vec());
    let client = UpsClient::new(connector);

    assert_eq!(client.transport().receive_response().unwrap(), "~00D0101;600;2190");
}

#[test]
fn empty_reply_reports_nulls() {
    let connector = ScriptedConnector::new();
    connector.respond_bytes(Vec::new());
    let client = UpsClient::new(connector.clone());

    assert!(matches!(
        client.transport().receive_response(),
        Err(UpsError::Transport(_))
    ));

    connector.respond_bytes(Vec::new());
    assert_eq!(client.input_status().unwrap(), InputStatus::default());
    assert_eq!(connector.opened(), connector.released());
}

#[test]
fn non_ascii_response_reports_nulls_and_releases_port() {
    let connector = ScriptedConnector::new();
    let mut window = Factory::window("1;600;2190");
    window[120] = 0xff;
    connector.respond_bytes(window);
    let client = UpsClient::new(connector.clone());

    assert!(matches!(
        client.transport().receive_response(),
        Err(UpsError::Decode(_))
    ));
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.released(), 1);
}

#[test]
fn garbled_response_is_a_format_error() {
    let connector = ScriptedConnector::new();
    connector.respond_bytes(vec![b'?'; 137]);
    let client = UpsClient::new(connector.clone());

    assert!(client.input_status().unwrap_err().is_format());
    assert_eq!(connector.opened(), connector.released());
}

#[test]
fn queries_are_idempotent() {
    let connector = ScriptedConnector::new();
    connector
        .respond("0;600;1;2210;;03169;037")
        .respond("0;600;1;2210;;03169;037");
    let client = UpsClient::new(connector.clone());

    let first = client.output_status().unwrap();
    let second = client.output_status().unwrap();

    assert_eq!(first, second);
    assert_eq!(connector.written(), vec![b"~00P003STO".to_vec(); 2]);
}

#[test]
fn transport_errors_are_typed() {
    let connector = ScriptedConnector::new();
    connector.fail_read(io::ErrorKind::TimedOut);
    let client = UpsClient::new(connector);

    let err = client.exchange(Command::Input).unwrap_err();
    assert!(matches!(err, UpsError::Transport(_)));
    assert!(err.is_missing_response());
}

#[test]
fn unopenable_port_is_a_transport_error() {
    let connector = SerialConnector::new("/dev/ttyNOSUCHUPS", 2400, Duration::from_millis(10));
    assert_eq!(connector.port(), "/dev/ttyNOSUCHUPS");

    let err = connector.connect().err().unwrap();
    assert!(matches!(&err, UpsError::Transport(msg) if msg.contains("/dev/ttyNOSUCHUPS")));
    assert!(err.is_missing_response());
}
