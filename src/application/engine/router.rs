//! FlowRouter - the dispatch core.
//!
//! For every inbound event the router serializes on the sender, loads the
//! session, intercepts global navigation, validates the stored position
//! against the active flow's step set, delegates to the flow handler,
//! follows any handoff the handler requested and saves the session on every
//! exit path.

use std::sync::Arc;

use crate::domain::conversation::{
    ConversationSession, FlowName, IncomingEvent, NavigationCommand, MENU_ID, RETRY_ID,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{Button, Messenger, SessionStore};

use super::context::FlowContext;
use super::errors::{FlowError, RouterError};
use super::handler::{FlowHandler, StepOutcome};
use super::locks::SessionLocks;
use super::registry::FlowRegistry;

/// Sent when a handler fails; the session has been rolled back.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Something went wrong on our side and nothing was changed. You can try again or go back to the main menu.";

/// Sent when a handler fails after its action was saved.
pub const COMMITTED_ERROR_MESSAGE: &str =
    "Your last action was saved, but we could not finish replying. Tap Menu to continue.";

/// Router tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Seconds of inactivity after which an active flow is abandoned.
    /// Zero disables expiry.
    pub idle_timeout_secs: u64,
    /// Longest chain of flow handoffs followed for one event.
    pub max_handoffs: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1_800,
            max_handoffs: 4,
        }
    }
}

/// How an event was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A flow was started (first contact, idle session or fallback).
    Started,
    /// The active handler accepted the input.
    Handled,
    /// The active handler rejected the input; the session did not move.
    InvalidInput,
    /// The stored step was not valid for its flow; the flow was restarted.
    Recovered,
    /// A global navigation command was applied.
    Navigated,
    /// A handler failed; the session was rolled back and a retry offered.
    Failed,
    /// A handler failed after committing its action; the session kept the
    /// committed position.
    Committed,
}

/// Summary of one dispatch, mainly for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub flow: Option<FlowName>,
    pub step: Option<String>,
    pub outcome: DispatchOutcome,
}

/// Routes inbound events to flow handlers.
pub struct FlowRouter {
    registry: FlowRegistry,
    store: Arc<dyn SessionStore>,
    messenger: Arc<dyn Messenger>,
    locks: SessionLocks,
    config: RouterConfig,
}

impl FlowRouter {
    pub fn new(
        registry: FlowRegistry,
        store: Arc<dyn SessionStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            registry,
            store,
            messenger,
            locks: SessionLocks::new(),
            config: RouterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn locks(&self) -> &SessionLocks {
        &self.locks
    }

    /// Processes one inbound event.
    ///
    /// # Errors
    ///
    /// - `MissingSender` if the event carries no sender
    /// - `Store` if the session cannot be loaded or saved
    ///
    /// Handler failures are not returned: they are logged, rolled back and
    /// answered with a retry prompt. Failures after a [`FlowContext::commit`]
    /// keep the committed session and only notify the user.
    pub async fn dispatch(&self, event: &IncomingEvent) -> Result<DispatchReport, RouterError> {
        if event.sender().is_blank() {
            return Err(RouterError::MissingSender);
        }

        // 1. Serialize on the sender; the lock entry goes away with the last holder
        let guard = self.locks.acquire(event.sender()).await;
        let result = self.dispatch_locked(event).await;
        drop(guard);
        self.locks.release(event.sender());
        result
    }

    async fn dispatch_locked(&self, event: &IncomingEvent) -> Result<DispatchReport, RouterError> {
        let mut session = self.store.load(event.sender()).await?;

        // 2. Abandon flows left alone for too long
        if !session.is_idle() && session.is_expired(self.config.idle_timeout_secs, Timestamp::now())
        {
            tracing::info!(
                user = %session.user_identifier(),
                flow = ?session.current_flow(),
                "Session idle past timeout; abandoning flow"
            );
            session.idle();
        }

        // 3. Route against a snapshot so failures leave nothing uncommitted behind
        let snapshot = session.clone();
        let (routed, checkpoint) = {
            let mut ctx = FlowContext::new(&mut session, self.messenger.as_ref());
            let routed = self.route(&mut ctx, event).await;
            (routed, ctx.take_checkpoint())
        };

        let outcome = match (routed, checkpoint) {
            (Ok(outcome), _) => outcome,
            (Err(err), Some(committed)) => {
                session = committed;
                self.notify_committed(&session, &err).await;
                DispatchOutcome::Committed
            }
            (Err(err), None) => {
                session = snapshot;
                self.offer_retry(&session, event, &err).await;
                DispatchOutcome::Failed
            }
        };

        // 4. Persist on every path
        session.touch();
        self.store.save(&session).await?;

        tracing::debug!(
            user = %session.user_identifier(),
            flow = ?session.current_flow(),
            step = ?session.current_step(),
            outcome = ?outcome,
            "Event dispatched"
        );

        Ok(DispatchReport {
            flow: session.current_flow(),
            step: session.current_step().map(str::to_string),
            outcome,
        })
    }

    async fn route(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<DispatchOutcome, FlowError> {
        let Some(flow) = ctx.session().current_flow() else {
            ctx.return_to_menu();
            self.follow_handoffs(ctx).await?;
            return Ok(DispatchOutcome::Started);
        };

        let Some(handler) = self.registry.get(flow) else {
            tracing::error!(
                user = %ctx.user(),
                flow = %flow,
                "No handler registered for flow; falling back to main menu"
            );
            ctx.return_to_menu();
            self.follow_handoffs(ctx).await?;
            return Ok(DispatchOutcome::Started);
        };

        let command = NavigationCommand::detect(event);
        if command == Some(NavigationCommand::Menu) {
            ctx.return_to_menu();
            self.follow_handoffs(ctx).await?;
            return Ok(DispatchOutcome::Navigated);
        }

        let step = match ctx.session().current_step() {
            Some(step) if handler.can_handle_step(step) => step.to_string(),
            stale => {
                tracing::warn!(
                    user = %ctx.user(),
                    flow = %flow,
                    step = ?stale,
                    "Stored step not handled by flow; restarting it"
                );
                handler.start(ctx).await?;
                self.follow_handoffs(ctx).await?;
                return Ok(DispatchOutcome::Recovered);
            }
        };

        match command {
            Some(NavigationCommand::Back) => {
                match handler.previous_step(&step) {
                    Some(previous) => {
                        ctx.set_step_name(previous)?;
                        handler.prompt_step(ctx).await?;
                    }
                    None => handler.start(ctx).await?,
                }
                self.follow_handoffs(ctx).await?;
                return Ok(DispatchOutcome::Navigated);
            }
            Some(NavigationCommand::Retry) => {
                handler.prompt_step(ctx).await?;
                return Ok(DispatchOutcome::Navigated);
            }
            _ => {}
        }

        let before = ctx.session().clone();
        let outcome = match handler.handle(ctx, event).await? {
            StepOutcome::Advanced => DispatchOutcome::Handled,
            StepOutcome::Invalid(invalid) => {
                tracing::debug!(
                    user = %ctx.user(),
                    flow = %flow,
                    step = %step,
                    reason = %invalid,
                    "Input rejected"
                );
                if ctx.session() != &before {
                    tracing::warn!(
                        user = %ctx.user(),
                        flow = %flow,
                        step = %step,
                        "Handler moved the session on invalid input; reverting"
                    );
                    let restore = ctx.checkpoint().cloned().unwrap_or(before);
                    ctx.reset_to(restore);
                }
                handler.handle_invalid_input(ctx, &invalid).await?;
                DispatchOutcome::InvalidInput
            }
        };

        self.follow_handoffs(ctx).await?;
        Ok(outcome)
    }

    /// Starts (or re-prompts) every flow handed off to, up to the configured
    /// chain length.
    async fn follow_handoffs(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let mut hops = 0;
        while let Some(handoff) = ctx.take_handoff() {
            hops += 1;
            if hops > self.config.max_handoffs {
                tracing::warn!(
                    user = %ctx.user(),
                    flow = %handoff.flow,
                    max_handoffs = self.config.max_handoffs,
                    "Handoff chain too long; showing main menu"
                );
                ctx.return_to_menu();
                ctx.take_handoff();
                self.registry.main_menu().start(ctx).await?;
                ctx.take_handoff();
                return Ok(());
            }

            let handler: Arc<dyn FlowHandler> = match self.registry.get(handoff.flow) {
                Some(handler) => handler,
                None => {
                    tracing::error!(
                        user = %ctx.user(),
                        flow = %handoff.flow,
                        "Handoff to unregistered flow; falling back to main menu"
                    );
                    ctx.return_to_menu();
                    continue;
                }
            };

            if handoff.resume_step {
                handler.prompt_step(ctx).await?;
            } else {
                handler.start(ctx).await?;
            }
        }
        Ok(())
    }

    async fn offer_retry(
        &self,
        session: &ConversationSession,
        event: &IncomingEvent,
        err: &FlowError,
    ) {
        if err.is_defect() {
            tracing::error!(
                user = %session.user_identifier(),
                flow = ?session.current_flow(),
                step = ?session.current_step(),
                event = %event.kind(),
                error = %err,
                "Flow handler defect; session rolled back"
            );
        } else {
            tracing::warn!(
                user = %session.user_identifier(),
                flow = ?session.current_flow(),
                step = ?session.current_step(),
                event = %event.kind(),
                error = %err,
                "Flow handler failed; session rolled back"
            );
        }

        let buttons = vec![
            Button::new(RETRY_ID, "Try again"),
            Button::new(MENU_ID, "Main menu"),
        ];
        if let Err(send_err) = self
            .messenger
            .send_buttons(session.user_identifier(), GENERIC_ERROR_MESSAGE, buttons)
            .await
        {
            tracing::warn!(
                user = %session.user_identifier(),
                error = %send_err,
                "Failed to deliver retry prompt"
            );
        }
    }

    async fn notify_committed(&self, session: &ConversationSession, err: &FlowError) {
        tracing::warn!(
            user = %session.user_identifier(),
            flow = ?session.current_flow(),
            step = ?session.current_step(),
            error = %err,
            "Flow handler failed after commit; keeping committed position"
        );

        let buttons = vec![Button::new(MENU_ID, "Main menu")];
        if let Err(send_err) = self
            .messenger
            .send_buttons(session.user_identifier(), COMMITTED_ERROR_MESSAGE, buttons)
            .await
        {
            tracing::warn!(
                user = %session.user_identifier(),
                error = %send_err,
                "Failed to deliver post-commit notice"
            );
        }
    }
}
