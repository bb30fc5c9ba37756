use crate::prelude::*;
use crate::delta::status::{
    BatteryStatus, FieldErrors, InputStatus, OutputStatus, ReplacementDateInfo,
};
use crate::payload::Payload;

use std::sync::{Arc, Mutex};

/// Readings from one poll cycle. A group is `None` when its response broke
/// the protocol grammar; the other groups are unaffected. A bad enumeration
/// code or date only nulls that field. Both kinds count as format errors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub input: Option<InputStatus>,
    pub output: Option<OutputStatus>,
    pub battery: Option<BatteryStatus>,
    pub replacement: Option<ReplacementDateInfo>,
    pub format_errors: usize,
}

impl Snapshot {
    /// Run every status query once, in order.
    pub fn read<C: Connect>(client: &UpsClient<C>) -> Self {
        let mut r = Self::default();

        r.input = r.group(Command::Input, client.input_status());
        r.output = r.group(Command::Output, client.output_status());
        r.battery = r.group(Command::Battery, client.battery_status());
        r.replacement = r.group(Command::ReplacementDate, client.battery_replacement_date());

        r
    }

    fn group<T: FieldErrors>(&mut self, command: Command, result: Result<T, UpsError>) -> Option<T> {
        match result {
            Ok(status) => {
                for err in status.field_errors() {
                    error!("{}: dropping field: {}", command, err);
                    self.format_errors += 1;
                }
                Some(status)
            }
            Err(err) => {
                error!("{}: dropping readings: {}", command, err);
                self.format_errors += 1;
                None
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PollStats {
    pub cycles: u64,
    pub format_errors: u64,
    pub messages_queued: u64,
    pub mqtt_messages_sent: u64,
    pub mqtt_errors: u64,
}

impl PollStats {
    pub fn print_summary(&self) {
        info!("Poll Statistics:");
        info!("  Cycles: {}", self.cycles);
        info!("  Format errors: {}", self.format_errors);
        info!("  MQTT:");
        info!("    Messages queued: {}", self.messages_queued);
        info!("    Messages sent: {}", self.mqtt_messages_sent);
        info!("    Errors: {}", self.mqtt_errors);
    }
}

pub struct Poller<C> {
    config: ConfigWrapper,
    channels: Channels,
    client: Arc<Mutex<UpsClient<C>>>,
    shared_stats: Arc<Mutex<PollStats>>,
}

impl<C> Clone for Poller<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            channels: self.channels.clone(),
            client: self.client.clone(),
            shared_stats: self.shared_stats.clone(),
        }
    }
}

impl<C: Connect + Send + 'static> Poller<C> {
    pub fn new(
        config: ConfigWrapper,
        channels: Channels,
        client: UpsClient<C>,
        shared_stats: Arc<Mutex<PollStats>>,
    ) -> Self {
        Self {
            config,
            channels,
            client: Arc::new(Mutex::new(client)),
            shared_stats,
        }
    }

    /// Query the UPS on a blocking worker. The client lock keeps exchanges
    /// from different callers from interleaving on the serial line.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let client = self.client.clone();

        tokio::task::spawn_blocking(move || {
            let client = client
                .lock()
                .map_err(|_| anyhow!("poller.rs:ups client lock poisoned"))?;
            Ok::<_, anyhow::Error>(Snapshot::read(&*client))
        })
        .await?
    }

    /// One full cycle: query, build the payload and hand it to MQTT.
    pub async fn poll_once(&self) -> Result<Payload> {
        let snapshot = self.snapshot().await?;
        let payload = Payload::new(&snapshot);

        if let Ok(mut stats) = self.shared_stats.lock() {
            stats.cycles += 1;
            stats.format_errors += snapshot.format_errors as u64;
        }

        if !self.config.mqtt().enabled() {
            debug!("mqtt disabled, not publishing {:?}", payload);
            return Ok(payload);
        }

        let message = mqtt::Message::for_payload(self.config.ups().device_number(), &payload)?;
        if self
            .channels
            .to_mqtt
            .send(mqtt::ChannelData::Message(message))
            .is_err()
        {
            bail!("send(to_mqtt) failed - channel closed?");
        }

        if let Ok(mut stats) = self.shared_stats.lock() {
            stats.messages_queued += 1;
        }

        Ok(payload)
    }
}
