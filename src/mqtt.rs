use crate::prelude::*;
use crate::payload::Payload;
use crate::poller::PollStats;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use std::sync::{Arc, Mutex};

// Message {{{
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub retain: bool,
    pub payload: String,
}

impl Message {
    /// Status message for one poll cycle. The namespace is prepended when
    /// publishing, giving `{namespace}/{device_number}/Monitor`.
    pub fn for_payload(device_number: &str, payload: &Payload) -> Result<Message> {
        Ok(mqtt::Message {
            topic: format!("{}/Monitor", device_number),
            retain: false,
            payload: serde_json::to_string(payload)?,
        })
    }
} // }}}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelData {
    Message(Message),
    Shutdown,
}

pub type Sender = broadcast::Sender<ChannelData>;

pub struct Mqtt {
    config: ConfigWrapper,
    receiver: broadcast::Receiver<ChannelData>,
    shared_stats: Arc<Mutex<PollStats>>,
}

impl Mqtt {
    /// Subscribes to the outgoing channel immediately so messages queued
    /// before `start` runs are not lost.
    pub fn new(config: ConfigWrapper, channels: Channels, shared_stats: Arc<Mutex<PollStats>>) -> Self {
        Self {
            config,
            receiver: channels.to_mqtt.subscribe(),
            shared_stats,
        }
    }

    pub async fn start(self) -> Result<()> {
        let c = &self.config;

        if !c.mqtt().enabled() {
            info!("mqtt disabled, skipping");
            return Ok(());
        }

        let mut options = MqttOptions::new(c.mqtt().client_id(), c.mqtt().host(), c.mqtt().port());

        let will = LastWill {
            topic: self.lwt_topic(),
            message: bytes::Bytes::from("offline"),
            qos: QoS::AtLeastOnce,
            retain: true,
        };
        options.set_last_will(will);

        options.set_keep_alive(std::time::Duration::from_secs(60));
        if let (Some(u), Some(p)) = (c.mqtt().username(), c.mqtt().password()) {
            options.set_credentials(u, p);
        }

        info!(
            "initializing mqtt at {}:{}",
            c.mqtt().host(),
            c.mqtt().port()
        );

        let (client, eventloop) = AsyncClient::new(options, 10);

        client
            .try_publish(self.lwt_topic(), QoS::AtLeastOnce, true, "online")
            .map_err(|err| anyhow!("mqtt.rs:queueing online status: {}", err))?;

        self.run(client, eventloop).await
    }

    // drives the connection and publishes whatever arrives on to_mqtt
    async fn run(mut self, client: AsyncClient, mut eventloop: EventLoop) -> Result<()> {
        use ChannelData::*;

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => info!("mqtt connected"),
                    Ok(_) => {} // keepalives etc
                    Err(e) => {
                        error!("{}", e);
                        info!("reconnecting in 5s");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                },
                data = self.receiver.recv() => match data {
                    Ok(Shutdown) => {
                        info!("MQTT sender received shutdown signal");
                        let _ = client.try_disconnect();
                        break;
                    }
                    Ok(Message(message)) => self.publish(&client, message),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("mqtt sender lagged, {} messages dropped", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        info!("MQTT loop exiting");
        Ok(())
    }

    // best effort: queued once at QoS 0, failures are counted and dropped
    fn publish(&self, client: &AsyncClient, message: Message) {
        let topic = format!("{}/{}", self.config.mqtt().namespace(), message.topic);
        info!("publishing: {} = {}", topic, message.payload);

        match client.try_publish(&topic, QoS::AtMostOnce, message.retain, message.payload) {
            Ok(_) => {
                if let Ok(mut stats) = self.shared_stats.lock() {
                    stats.mqtt_messages_sent += 1;
                }
            }
            Err(err) => {
                error!("MQTT publish to {} failed: {:?}", topic, err);
                if let Ok(mut stats) = self.shared_stats.lock() {
                    stats.mqtt_errors += 1;
                }
            }
        }
    }

    fn lwt_topic(&self) -> String {
        format!("{}/LWT", self.config.mqtt().namespace())
    }
}
