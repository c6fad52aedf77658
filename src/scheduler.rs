// SPDX-License-Identifier: MPL-2.0

//! Periodic tick loop.
//!
//! A single task owns the [`Monitor`] and is the only thing that ever calls
//! [`Monitor::tick`], so ticks cannot overlap. Everything else talks to the
//! loop through a [`MonitorHandle`].

use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::monitor::{ConnectionInfoSource, Monitor, Probe, StatusSnapshot};
use crate::presentation::{Presenter, StatusView};

enum Command {
    RefreshNow(oneshot::Sender<StatusSnapshot>),
    Pause,
    Resume,
    Shutdown,
}

/// Cloneable control handle for a running [`Scheduler`].
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<Command>,
}

impl MonitorHandle {
    /// Run a tick right away and return the resulting state.
    ///
    /// While paused no check runs and the last known state is returned.
    /// `None` means the loop has stopped.
    pub async fn refresh_now(&self) -> Option<StatusSnapshot> {
        let (reply, response) = oneshot::channel();
        self.tx.send(Command::RefreshNow(reply)).await.ok()?;
        response.await.ok()
    }

    pub async fn pause(&self) {
        let _ = self.tx.send(Command::Pause).await;
    }

    /// Resume and immediately run one tick.
    pub async fn resume(&self) {
        let _ = self.tx.send(Command::Resume).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }
}

pub struct Scheduler<P, C> {
    monitor: Monitor<P, C>,
    presenter: Box<dyn Presenter + Send>,
    period: Duration,
    rx: mpsc::Receiver<Command>,
}

impl<P, C> Scheduler<P, C>
where
    P: Probe,
    C: ConnectionInfoSource,
{
    pub fn new(
        monitor: Monitor<P, C>,
        presenter: Box<dyn Presenter + Send>,
        period: Duration,
    ) -> (Self, MonitorHandle) {
        let (tx, rx) = mpsc::channel(8);
        let scheduler = Self {
            monitor,
            presenter,
            period,
            rx,
        };
        (scheduler, MonitorHandle { tx })
    }

    /// Tick until shut down or every handle is dropped.
    ///
    /// The first tick runs immediately. Returns the monitor so its final
    /// state can be inspected.
    pub async fn run(mut self) -> Monitor<P, C> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Monitoring every {:?}", self.period);

        // The interval's first tick completes at once; consume it so the
        // initial check runs before any queued command is looked at.
        interval.tick().await;
        self.tick().await;

        loop {
            // Scheduled ticks win over queued commands
            tokio::select! {
                biased;
                _ = interval.tick() => {
                    self.tick().await;
                }
                command = self.rx.recv() => match command {
                    Some(Command::RefreshNow(reply)) => {
                        self.tick().await;
                        let _ = reply.send(self.monitor.snapshot());
                    }
                    Some(Command::Pause) => {
                        self.monitor.pause();
                        self.render();
                    }
                    Some(Command::Resume) => {
                        self.monitor.resume();
                        self.tick().await;
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        log::info!("Monitoring stopped");
        self.monitor
    }

    async fn tick(&mut self) {
        if self.monitor.tick().await.is_some() {
            self.render();
        }
    }

    fn render(&mut self) {
        let view = StatusView::render(&self.monitor.snapshot(), Local::now());
        self.presenter.show(&view);
    }
}
