//! In-process rule scheduler — arms cron triggers and matches host
//! events against the active rules.
//!
//! One task owns the loop. It watches the coordinator's context
//! channel and rearms everything on a swap, receives host events from
//! the broadcast stream, and sleeps until the earliest armed cron
//! instant. Rule firing is serialised by the loop itself; the
//! per-shutter locks inside the engine and executor cover overlap
//! with coordinator activity.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use lamella_domain::event::ItemEvent;
use lamella_domain::schedule::cron::daily_trigger;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::coordinator::{ActiveRule, ActiveRuleKind, AutomationContext, ReloadRequest};
use crate::executor::RuleExecutor;
use crate::exposure::ExposureEngine;
use crate::locks::ShutterLocks;
use crate::ports::ItemGateway;

/// Dispatches triggers to the executor and the exposure engine.
pub struct RuleScheduler<G> {
    gateway: G,
    executor: RuleExecutor<G>,
    engine: ExposureEngine<G>,
    ctx_rx: watch::Receiver<Arc<AutomationContext>>,
    events_rx: broadcast::Receiver<ItemEvent>,
    reload_tx: mpsc::Sender<ReloadRequest>,
}

impl<G: ItemGateway + Clone> RuleScheduler<G> {
    pub fn new(
        gateway: G,
        locks: Arc<ShutterLocks>,
        ctx_rx: watch::Receiver<Arc<AutomationContext>>,
        events_rx: broadcast::Receiver<ItemEvent>,
        reload_tx: mpsc::Sender<ReloadRequest>,
    ) -> Self {
        Self {
            executor: RuleExecutor::new(gateway.clone(), Arc::clone(&locks)),
            engine: ExposureEngine::new(gateway.clone(), locks),
            gateway,
            ctx_rx,
            events_rx,
            reload_tx,
        }
    }

    /// Run until the context channel or the event stream closes.
    pub async fn run(mut self) {
        let mut context = self.ctx_rx.borrow_and_update().clone();
        let mut crons = arm_crons(&context, Local::now());
        info!(
            rules = context.rules.len(),
            crons = crons.len(),
            "scheduler armed"
        );

        loop {
            let wake = next_wake(&crons);
            tokio::select! {
                changed = self.ctx_rx.changed() => {
                    if changed.is_err() {
                        info!("context channel closed, scheduler stopping");
                        break;
                    }
                    context = self.ctx_rx.borrow_and_update().clone();
                    crons = arm_crons(&context, Local::now());
                    info!(
                        schedule = context.schedule_name.as_deref().unwrap_or("none"),
                        rules = context.rules.len(),
                        "rules rearmed"
                    );
                }
                event = self.events_rx.recv() => match event {
                    Ok(event) => self.dispatch_event(&context, &event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "event stream lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("event stream closed, scheduler stopping");
                        break;
                    }
                },
                () = sleep_until(wake) => {
                    let now = Local::now();
                    for index in due_rules(&mut crons, now) {
                        if let Some(rule) = context.rules.get(index) {
                            if self.conditions_hold(rule).await {
                                self.fire(&context, rule, None).await;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn dispatch_event(&self, context: &AutomationContext, event: &ItemEvent) {
        for rule in &context.rules {
            if !rule.triggers().iter().any(|t| t.matches_event(event)) {
                continue;
            }
            if self.conditions_hold(rule).await {
                self.fire(context, rule, Some(event)).await;
            }
        }
    }

    /// Evaluate a rule's guard conditions against live item state.
    /// An unreadable item keeps the rule from firing.
    async fn conditions_hold(&self, rule: &ActiveRule) -> bool {
        for condition in rule.conditions() {
            let actual = match self.gateway.state(condition.item()).await {
                Ok(state) => state,
                Err(err) => {
                    error!(
                        rule = %rule.name,
                        item = %condition.item(),
                        error = %err,
                        "cannot evaluate condition"
                    );
                    return false;
                }
            };
            if !condition.holds(actual.as_deref()) {
                debug!(rule = %rule.name, condition = %condition, "condition not met");
                return false;
            }
        }
        true
    }

    async fn fire(&self, context: &AutomationContext, rule: &ActiveRule, event: Option<&ItemEvent>) {
        info!(rule = %rule.name, id = %rule.id, "firing rule");
        match &rule.kind {
            ActiveRuleKind::Schedule(rule) => self.executor.apply(&context.items, rule).await,
            ActiveRuleKind::SunExposure { .. } => {
                let Some(ItemEvent::StateChanged { to, .. }) = event else {
                    debug!("sun rule fired without an azimuth update, skipping");
                    return;
                };
                let Ok(azimuth) = to.parse::<f64>() else {
                    warn!(state = %to, "azimuth update is not numeric");
                    return;
                };
                if let Err(err) = self
                    .engine
                    .evaluate_all(&context.catalog, &context.items, azimuth)
                    .await
                {
                    error!(error = %err, "sun evaluation sweep failed");
                }
            }
            ActiveRuleKind::DailyReload { .. } => {
                if let Err(err) = self.reload_tx.send(ReloadRequest::DailyRollover).await {
                    error!(error = %err, "cannot request daily rollover reload");
                }
            }
        }
    }
}

/// One cron trigger armed on its timeline.
struct ArmedCron {
    rule_index: usize,
    schedule: cron::Schedule,
    next: Option<DateTime<Local>>,
}

fn arm_crons(context: &AutomationContext, now: DateTime<Local>) -> Vec<ArmedCron> {
    let mut armed = Vec::new();
    for (rule_index, rule) in context.rules.iter().enumerate() {
        for trigger in rule.triggers() {
            let Some(expr) = trigger.cron_expr() else {
                continue;
            };
            match daily_trigger(expr) {
                Ok(schedule) => {
                    let next = schedule.after(&now).next();
                    armed.push(ArmedCron {
                        rule_index,
                        schedule,
                        next,
                    });
                }
                Err(err) => {
                    error!(rule = %rule.name, error = %err, "cannot arm cron trigger");
                }
            }
        }
    }
    armed
}

/// Indexes of the rules whose cron instant has passed, each advanced
/// to its next instant.
fn due_rules(crons: &mut [ArmedCron], now: DateTime<Local>) -> Vec<usize> {
    let mut due = Vec::new();
    for armed in crons.iter_mut() {
        let Some(next) = armed.next else { continue };
        if next <= now {
            due.push(armed.rule_index);
            armed.next = armed.schedule.after(&now).next();
        }
    }
    due.dedup();
    due
}

fn next_wake(crons: &[ArmedCron]) -> Option<DateTime<Local>> {
    crons.iter().filter_map(|armed| armed.next).min()
}

async fn sleep_until(wake: Option<DateTime<Local>>) {
    match wake {
        Some(at) => {
            let delay = (at - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(delay).await;
        }
        None => std::future::pending().await,
    }
}
