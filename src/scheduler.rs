use crate::prelude::*;
use crate::poller::Poller;

use tokio::time::MissedTickBehavior;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelData {
    Shutdown,
}

pub struct Scheduler<C> {
    config: ConfigWrapper,
    poller: Poller<C>,
    receiver: broadcast::Receiver<ChannelData>,
}

impl<C: Connect + Send + 'static> Scheduler<C> {
    pub fn new(config: ConfigWrapper, channels: Channels, poller: Poller<C>) -> Self {
        Self {
            config,
            poller,
            receiver: channels.to_scheduler.subscribe(),
        }
    }

    /// Poll on a fixed interval until shutdown. Each cycle is awaited before
    /// the next tick, so cycles never overlap; a slow cycle delays the
    /// following ticks instead of bunching them up.
    pub async fn start(mut self) -> Result<()> {
        let period = self.config.scheduler().interval();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("polling every {}s", period.as_secs());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.poller.poll_once().await {
                        Ok(_) => debug!("poll cycle complete"),
                        Err(e) => error!("poll cycle failed: {}", e),
                    }
                }
                _ = self.receiver.recv() => {
                    info!("scheduler received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }
}
