use anyhow::{Context, Result, anyhow};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::audio::{AudioEvent, EventSink};
use crate::effect::ProfileController;
use crate::system::{AudioSystemInterface, EffectEngineFactory, PreferenceStore};

pub type EventReceiver = mpsc::UnboundedReceiver<AudioEvent>;

type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

enum Command<C> {
    Run(Job<C>),
    Shutdown,
}

/// Channel pair connecting audio subscriptions to the service queue
pub fn event_channel() -> (EventSink, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Runs the controller on a single task. Front-end commands and audio
/// notifications share one queue, so the effect handle and the callback
/// registration are never touched concurrently.
pub struct EnhancementService<F, A, P>
where
    F: EffectEngineFactory,
    A: AudioSystemInterface,
    P: PreferenceStore,
{
    controller: ProfileController<F, A, P>,
    commands: mpsc::UnboundedReceiver<Command<ProfileController<F, A, P>>>,
    events: EventReceiver,
}

/// Cloneable handle for submitting work to an [`EnhancementService`]
pub struct ControllerHandle<F, A, P>
where
    F: EffectEngineFactory,
    A: AudioSystemInterface,
    P: PreferenceStore,
{
    commands: mpsc::UnboundedSender<Command<ProfileController<F, A, P>>>,
}

impl<F, A, P> Clone for ControllerHandle<F, A, P>
where
    F: EffectEngineFactory,
    A: AudioSystemInterface,
    P: PreferenceStore,
{
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<F, A, P> EnhancementService<F, A, P>
where
    F: EffectEngineFactory,
    A: AudioSystemInterface,
    P: PreferenceStore,
{
    /// `events` must be the receiving end of the sink the controller was built with
    pub fn new(
        controller: ProfileController<F, A, P>,
        events: EventReceiver,
    ) -> (Self, ControllerHandle<F, A, P>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            controller,
            commands: rx,
            events,
        };
        (service, ControllerHandle { commands: tx })
    }

    /// Process commands and events until shutdown or until every handle is gone
    pub async fn run(mut self) -> Result<()> {
        info!("Enhancement service started");

        loop {
            // Notifications already queued are handled before the next command
            tokio::select! {
                biased;

                Some(event) = self.events.recv() => {
                    debug!("Handling {:?} event", event.kind());
                    if let Err(e) = self.controller.handle_event(event) {
                        error!("Failed to re-apply profile: {:#}", e);
                    }
                }
                command = self.commands.recv() => match command {
                    Some(Command::Run(job)) => job(&mut self.controller),
                    Some(Command::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    None => {
                        debug!("All controller handles dropped");
                        break;
                    }
                },
            }
        }

        info!("Enhancement service stopped");
        Ok(())
    }
}

impl<F, A, P> ControllerHandle<F, A, P>
where
    F: EffectEngineFactory + 'static,
    A: AudioSystemInterface + 'static,
    P: PreferenceStore + 'static,
{
    /// Run `f` on the service task and wait for its result
    pub async fn call<R, G>(&self, f: G) -> Result<R>
    where
        R: Send + 'static,
        G: FnOnce(&mut ProfileController<F, A, P>) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job<ProfileController<F, A, P>> = Box::new(move |controller| {
            let _ = reply_tx.send(f(controller));
        });

        self.commands
            .send(Command::Run(job))
            .map_err(|_| anyhow!("Enhancement service is not running"))?;
        reply_rx
            .await
            .context("Enhancement service stopped before replying")
    }

    pub async fn boot_completed(&self) -> Result<()> {
        self.call(|c| c.on_boot_completed()).await?
    }

    pub async fn set_ds_on(&self, on: bool) -> Result<()> {
        self.call(move |c| c.set_ds_on(on)).await?
    }

    pub async fn ds_on(&self) -> Result<bool> {
        self.call(|c| c.ds_on()).await?
    }

    pub async fn set_profile(&self, index: i32) -> Result<()> {
        self.call(move |c| c.set_profile(index)).await?
    }

    pub async fn profile(&self) -> Result<i32> {
        self.call(|c| c.profile()).await?
    }

    pub async fn profile_name(&self) -> Result<Option<String>> {
        self.call(|c| c.profile_name()).await?
    }

    pub async fn apply_current_profile(&self) -> Result<()> {
        self.call(|c| c.apply_current_profile()).await?
    }

    pub async fn sync_with_engine(&self) -> Result<()> {
        self.call(|c| c.sync_with_engine()).await?
    }

    /// Ask the service to stop after the work already queued
    pub fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .map_err(|_| anyhow!("Enhancement service is not running"))
    }
}
