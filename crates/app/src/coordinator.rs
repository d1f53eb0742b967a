//! Coordinator — builds the automation context and owns the reload
//! cycle.
//!
//! The context bundles everything a running installation needs: the
//! host item names, the exposure catalog, today's resolved schedule
//! and the armed rules. It is built as one piece off to the side and
//! published through a `watch` channel, so a reload either swaps in a
//! complete new context or leaves the old one untouched. Reload
//! requests from the file watcher and from the daily rollover rule are
//! funneled through one mpsc consumer, which serialises them.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Local};
use lamella_domain::error::LamellaError;
use lamella_domain::id::RuleId;
use lamella_domain::item::{HostItems, ItemName};
use lamella_domain::schedule::{Condition, Rule, Trigger};
use lamella_domain::shutter::{AutoState, SunlitState};
use lamella_domain::sun::ExposureCatalog;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::config::{ConfigError, DocumentPaths, ScheduleDocument, ShutterDocument};
use crate::locks::ShutterLocks;
use crate::ports::ItemGateway;

/// Time of day the standing rollover rule re-resolves the calendar,
/// as `sec min hour`.
const RELOAD_CRON: &str = "0 10 0";

/// Why a reload was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRequest {
    /// A configuration document changed on disk.
    ConfigChanged,
    /// The standing daily rule rolled the day over.
    DailyRollover,
}

impl std::fmt::Display for ReloadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigChanged => write!(f, "config changed"),
            Self::DailyRollover => write!(f, "daily rollover"),
        }
    }
}

/// Everything the scheduler works from, swapped atomically on reload.
#[derive(Debug, Clone)]
pub struct AutomationContext {
    pub items: HostItems,
    pub catalog: ExposureCatalog,
    /// Daily schedule resolved for today, if any matched.
    pub schedule_name: Option<String>,
    pub rules: Vec<ActiveRule>,
}

impl AutomationContext {
    /// Every host item this context refers to, deduplicated. Used to
    /// verify the references against the host registry.
    #[must_use]
    pub fn referenced_items(&self) -> Vec<ItemName> {
        let mut items = BTreeSet::new();
        items.insert(self.items.azimuth.clone());
        items.insert(self.items.elevation.clone());
        items.insert(self.items.weather_sunny.clone());
        items.insert(self.items.shutter_automation.clone());
        for shutter in self.catalog.shutters() {
            items.insert(shutter.device_item());
        }
        for active in &self.rules {
            let ActiveRuleKind::Schedule(rule) = &active.kind else {
                continue;
            };
            for shutter in &rule.shutters {
                items.insert(shutter.device_item());
            }
            for condition in &rule.conditions {
                items.insert(condition.item().clone());
            }
            for trigger in &rule.triggers {
                if let Trigger::ItemChanged { item } = trigger {
                    items.insert(item.clone());
                }
            }
        }
        items.into_iter().collect()
    }
}

/// One armed rule instance.
#[derive(Debug, Clone)]
pub struct ActiveRule {
    /// Registration handle, fresh per arming.
    pub id: RuleId,
    pub name: String,
    pub kind: ActiveRuleKind,
}

#[derive(Debug, Clone)]
pub enum ActiveRuleKind {
    /// A rule from today's daily schedule.
    Schedule(Rule),
    /// The standing sun-evaluation rule, fired by azimuth updates.
    SunExposure { trigger: Trigger },
    /// The standing rollover rule, fired once a day.
    DailyReload { trigger: Trigger },
}

impl ActiveRule {
    fn schedule(rule: Rule) -> Self {
        Self {
            id: RuleId::new(),
            name: rule.name.clone(),
            kind: ActiveRuleKind::Schedule(rule),
        }
    }

    #[must_use]
    pub fn triggers(&self) -> &[Trigger] {
        match &self.kind {
            ActiveRuleKind::Schedule(rule) => &rule.triggers,
            ActiveRuleKind::SunExposure { trigger } | ActiveRuleKind::DailyReload { trigger } => {
                std::slice::from_ref(trigger)
            }
        }
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        match &self.kind {
            ActiveRuleKind::Schedule(rule) => &rule.conditions,
            ActiveRuleKind::SunExposure { .. } | ActiveRuleKind::DailyReload { .. } => &[],
        }
    }
}

/// Loads configuration and serialises reloads.
pub struct Coordinator<G> {
    gateway: G,
    locks: Arc<ShutterLocks>,
    paths: DocumentPaths,
    ctx_tx: watch::Sender<Arc<AutomationContext>>,
}

impl<G: ItemGateway> Coordinator<G> {
    /// Load both documents, initialise undefined state items and
    /// publish the first context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when either document cannot be read,
    /// parsed or validated. Missing host items are logged but do not
    /// fail the load.
    pub async fn load(
        gateway: G,
        locks: Arc<ShutterLocks>,
        paths: DocumentPaths,
    ) -> Result<(Self, watch::Receiver<Arc<AutomationContext>>), ConfigError> {
        let context = build_context(&paths, Local::now())?;
        init_state_items(&gateway, &locks, &context).await;
        check_item_references(&gateway, &context).await;
        info!(
            schedule = context.schedule_name.as_deref().unwrap_or("none"),
            rules = context.rules.len(),
            "configuration loaded"
        );
        let (ctx_tx, ctx_rx) = watch::channel(Arc::new(context));
        Ok((
            Self {
                gateway,
                locks,
                paths,
                ctx_tx,
            },
            ctx_rx,
        ))
    }

    /// Another handle on the published context.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<AutomationContext>> {
        self.ctx_tx.subscribe()
    }

    /// Consume reload requests until all senders are gone.
    pub async fn run(self, mut requests: mpsc::Receiver<ReloadRequest>) {
        while let Some(request) = requests.recv().await {
            info!(reason = %request, "reloading configuration");
            self.reload().await;
        }
    }

    /// Rebuild the context from the documents and swap it in. On
    /// failure the previous context stays active.
    async fn reload(&self) {
        match build_context(&self.paths, Local::now()) {
            Ok(context) => {
                init_state_items(&self.gateway, &self.locks, &context).await;
                check_item_references(&self.gateway, &context).await;
                info!(
                    schedule = context.schedule_name.as_deref().unwrap_or("none"),
                    rules = context.rules.len(),
                    "configuration swapped"
                );
                self.ctx_tx.send_replace(Arc::new(context));
            }
            Err(err) => {
                error!(error = %err, "reload failed, keeping previous configuration");
            }
        }
    }
}

fn build_context(
    paths: &DocumentPaths,
    now: DateTime<Local>,
) -> Result<AutomationContext, ConfigError> {
    let shutters = ShutterDocument::load(&paths.shutters)?;
    let catalog = shutters.build_catalog()?;
    let set = ScheduleDocument::load(&paths.schedule)?.build()?;

    let schedule_name = set
        .calendar
        .resolve(&now, &set.schedules)
        .map_err(ConfigError::from)?
        .map(str::to_string);

    let mut rules = Vec::new();
    if let Some(name) = &schedule_name {
        if let Some(rule_names) = set.schedules.rule_names(name) {
            for rule_name in rule_names {
                if let Some(rule) = set.rules.get(rule_name) {
                    rules.push(ActiveRule::schedule(rule.clone()));
                }
            }
        }
    } else {
        warn!("no calendar entry matches today, only standing rules are armed");
    }

    rules.push(ActiveRule {
        id: RuleId::new(),
        name: "sun_exposure".to_string(),
        kind: ActiveRuleKind::SunExposure {
            trigger: Trigger::ItemChanged {
                item: shutters.items.azimuth.clone(),
            },
        },
    });
    rules.push(ActiveRule {
        id: RuleId::new(),
        name: "daily_reload".to_string(),
        kind: ActiveRuleKind::DailyReload {
            trigger: Trigger::Cron {
                expr: RELOAD_CRON.to_string(),
            },
        },
    });

    Ok(AutomationContext {
        items: shutters.items,
        catalog,
        schedule_name,
        rules,
    })
}

/// Give every catalog shutter a defined automation mode and sunlit
/// flag. Live state is never overwritten, only undefined items are
/// seeded.
async fn init_state_items<G: ItemGateway>(
    gateway: &G,
    locks: &ShutterLocks,
    context: &AutomationContext,
) {
    for shutter in context.catalog.shutters() {
        let _guard = locks.acquire(shutter).await;
        let seeds = [
            (shutter.auto_state_item(), AutoState::Down.as_str()),
            (shutter.sunlit_state_item(), SunlitState::False.as_str()),
        ];
        for (item, default) in seeds {
            if let Err(err) = init_if_undefined(gateway, &item, default).await {
                error!(shutter = %shutter, item = %item, error = %err, "cannot seed state item");
            }
        }
    }
}

async fn init_if_undefined<G: ItemGateway>(
    gateway: &G,
    item: &ItemName,
    default: &str,
) -> Result<(), LamellaError> {
    if gateway.state(item).await?.is_none() {
        info!(item = %item, state = default, "seeding undefined state item");
        gateway.post_update(item, default).await?;
    }
    Ok(())
}

/// Probe every referenced item once. A missing item is an operator
/// error worth logging, but the rules stay armed so a later fix needs
/// no reload.
async fn check_item_references<G: ItemGateway>(gateway: &G, context: &AutomationContext) {
    for item in context.referenced_items() {
        if let Err(err) = gateway.state(&item).await {
            error!(item = %item, error = %err, "configured item is not registered with the host");
        }
    }
}
