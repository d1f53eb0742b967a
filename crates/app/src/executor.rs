//! Applies schedule rule actions to their target shutters.
//!
//! A rule carries one action (`UP`, `DOWN`, `SUN` or `MANUAL`) and a
//! list of shutters. Applying it moves the shutters where the action
//! says and records the new automation mode. Handing a shutter over to
//! sun tracking additionally seeds the sunlit flag from the mode the
//! shutter is leaving, so the next sun update starts from a sensible
//! baseline instead of commanding blindly.

use std::sync::Arc;

use lamella_domain::error::LamellaError;
use lamella_domain::item::{HostItems, ShutterId};
use lamella_domain::schedule::Rule;
use lamella_domain::shutter::{AutoState, ShutterCommand, SunlitState};
use tracing::warn;

use crate::commands::{dispatch_enabled, send_shutter_command};
use crate::locks::ShutterLocks;
use crate::ports::ItemGateway;

/// Applies rule actions shutter by shutter.
pub struct RuleExecutor<G> {
    gateway: G,
    locks: Arc<ShutterLocks>,
}

impl<G: ItemGateway> RuleExecutor<G> {
    pub fn new(gateway: G, locks: Arc<ShutterLocks>) -> Self {
        Self { gateway, locks }
    }

    /// Apply a rule to all of its shutters. Forced rules dispatch
    /// commands even while the master switch is off. A failing shutter
    /// is logged and the rest are still applied.
    #[tracing::instrument(skip(self, items, rule), fields(rule = %rule.name))]
    pub async fn apply(&self, items: &HostItems, rule: &Rule) {
        let enabled =
            rule.forced || dispatch_enabled(&self.gateway, &items.shutter_automation).await;
        for shutter in &rule.shutters {
            if let Err(err) = self.apply_to_shutter(shutter, rule.action, enabled).await {
                tracing::error!(shutter = %shutter, error = %err, "rule action failed");
            }
        }
    }

    async fn apply_to_shutter(
        &self,
        shutter: &ShutterId,
        action: AutoState,
        enabled: bool,
    ) -> Result<(), LamellaError> {
        let _guard = self.locks.acquire(shutter).await;
        match action {
            AutoState::Up => {
                send_shutter_command(&self.gateway, shutter, ShutterCommand::Up, enabled).await?;
            }
            AutoState::Down => {
                send_shutter_command(&self.gateway, shutter, ShutterCommand::Down, enabled).await?;
            }
            AutoState::Sun => self.hand_over_to_sun(shutter, enabled).await?,
            AutoState::Manual => {}
        }
        self.gateway
            .post_update(&shutter.auto_state_item(), action.as_str())
            .await
    }

    /// Seed the sunlit flag from the mode being left behind. A shutter
    /// that was held down is stopped halfway and counted as sunlit, a
    /// raised one as shaded, a manual one as unknown.
    async fn hand_over_to_sun(
        &self,
        shutter: &ShutterId,
        enabled: bool,
    ) -> Result<(), LamellaError> {
        let seeded = match self.current_mode(shutter).await? {
            Some(AutoState::Down) => {
                send_shutter_command(&self.gateway, shutter, ShutterCommand::Stop, enabled).await?;
                Some(SunlitState::True)
            }
            Some(AutoState::Up) => Some(SunlitState::False),
            Some(AutoState::Manual) => Some(SunlitState::Unknown),
            Some(AutoState::Sun) | None => None,
        };
        if let Some(next) = seeded {
            self.gateway
                .post_update(&shutter.sunlit_state_item(), next.as_str())
                .await?;
        }
        Ok(())
    }

    async fn current_mode(&self, shutter: &ShutterId) -> Result<Option<AutoState>, LamellaError> {
        let item = shutter.auto_state_item();
        let Some(text) = self.gateway.state(&item).await? else {
            return Ok(None);
        };
        match text.parse() {
            Ok(mode) => Ok(Some(mode)),
            Err(_) => {
                warn!(item = %item, state = %text, "unrecognised automation mode");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;

    use lamella_domain::error::NotFoundError;
    use lamella_domain::item::ItemName;

    use super::*;

    struct FakeHost {
        items: Mutex<HashMap<ItemName, Option<String>>>,
        commands: Mutex<Vec<(ItemName, ShutterCommand)>>,
    }

    impl FakeHost {
        fn with_items(items: &[(&str, Option<&str>)]) -> Self {
            let map = items
                .iter()
                .map(|(name, state)| (ItemName::new(*name), state.map(str::to_string)))
                .collect();
            Self {
                items: Mutex::new(map),
                commands: Mutex::new(Vec::new()),
            }
        }

        fn state_of(&self, name: &str) -> Option<String> {
            self.items
                .lock()
                .unwrap()
                .get(&ItemName::new(name))
                .cloned()
                .flatten()
        }

        fn sent_commands(&self) -> Vec<(String, ShutterCommand)> {
            self.commands
                .lock()
                .unwrap()
                .iter()
                .map(|(item, command)| (item.as_str().to_string(), *command))
                .collect()
        }
    }

    impl ItemGateway for &FakeHost {
        fn state(
            &self,
            item: &ItemName,
        ) -> impl Future<Output = Result<Option<String>, LamellaError>> + Send {
            let result = match self.items.lock().unwrap().get(item) {
                Some(state) => Ok(state.clone()),
                None => Err(NotFoundError::item(item.as_str()).into()),
            };
            async { result }
        }

        fn post_update(
            &self,
            item: &ItemName,
            state: &str,
        ) -> impl Future<Output = Result<(), LamellaError>> + Send {
            let mut items = self.items.lock().unwrap();
            let result = match items.get_mut(item) {
                Some(slot) => {
                    *slot = Some(state.to_string());
                    Ok(())
                }
                None => Err(NotFoundError::item(item.as_str()).into()),
            };
            async { result }
        }

        fn send_command(
            &self,
            item: &ItemName,
            command: ShutterCommand,
        ) -> impl Future<Output = Result<(), LamellaError>> + Send {
            let result = if self.items.lock().unwrap().contains_key(item) {
                self.commands.lock().unwrap().push((item.clone(), command));
                Ok(())
            } else {
                Err(NotFoundError::item(item.as_str()).into())
            };
            async { result }
        }
    }

    fn host_items() -> HostItems {
        HostItems {
            azimuth: ItemName::new("azimuth"),
            elevation: ItemName::new("elevation"),
            weather_sunny: ItemName::new("weather_sunny"),
            shutter_automation: ItemName::new("shutter_automation"),
        }
    }

    fn shutter_host(auto: &str, sunlit: &str) -> FakeHost {
        FakeHost::with_items(&[
            ("shutter_automation", Some("ON")),
            ("shutter_office", Some("0")),
            ("state_auto_shutter_office", Some(auto)),
            ("state_sunlit_shutter_office", Some(sunlit)),
        ])
    }

    fn rule(action: AutoState) -> Rule {
        Rule::builder("evening", action)
            .shutter(ShutterId::new("shutter_office"))
            .build()
            .unwrap()
    }

    fn executor(host: &FakeHost) -> RuleExecutor<&FakeHost> {
        RuleExecutor::new(host, Arc::new(ShutterLocks::new()))
    }

    #[tokio::test]
    async fn should_lower_and_record_down_mode() {
        let host = shutter_host("UP", "False");
        executor(&host).apply(&host_items(), &rule(AutoState::Down)).await;
        assert_eq!(
            host.sent_commands(),
            vec![("shutter_office".to_string(), ShutterCommand::Down)]
        );
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("DOWN")
        );
        assert_eq!(
            host.state_of("state_sunlit_shutter_office").as_deref(),
            Some("False")
        );
    }

    #[tokio::test]
    async fn should_raise_and_record_up_mode() {
        let host = shutter_host("DOWN", "False");
        executor(&host).apply(&host_items(), &rule(AutoState::Up)).await;
        assert_eq!(
            host.sent_commands(),
            vec![("shutter_office".to_string(), ShutterCommand::Up)]
        );
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("UP")
        );
    }

    #[tokio::test]
    async fn should_record_manual_mode_without_commanding() {
        let host = shutter_host("SUN", "True");
        executor(&host)
            .apply(&host_items(), &rule(AutoState::Manual))
            .await;
        assert!(host.sent_commands().is_empty());
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("MANUAL")
        );
        assert_eq!(
            host.state_of("state_sunlit_shutter_office").as_deref(),
            Some("True")
        );
    }

    #[tokio::test]
    async fn should_stop_halfway_when_taking_over_a_lowered_shutter() {
        let host = shutter_host("DOWN", "False");
        executor(&host).apply(&host_items(), &rule(AutoState::Sun)).await;
        assert_eq!(
            host.sent_commands(),
            vec![("shutter_office".to_string(), ShutterCommand::Stop)]
        );
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("SUN")
        );
        assert_eq!(
            host.state_of("state_sunlit_shutter_office").as_deref(),
            Some("True")
        );
    }

    #[tokio::test]
    async fn should_mark_shaded_when_taking_over_a_raised_shutter() {
        let host = shutter_host("UP", "True");
        executor(&host).apply(&host_items(), &rule(AutoState::Sun)).await;
        assert!(host.sent_commands().is_empty());
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("SUN")
        );
        assert_eq!(
            host.state_of("state_sunlit_shutter_office").as_deref(),
            Some("False")
        );
    }

    #[tokio::test]
    async fn should_reset_sunlit_when_taking_over_a_manual_shutter() {
        let host = shutter_host("MANUAL", "True");
        executor(&host).apply(&host_items(), &rule(AutoState::Sun)).await;
        assert!(host.sent_commands().is_empty());
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("SUN")
        );
        assert_eq!(
            host.state_of("state_sunlit_shutter_office").as_deref(),
            Some("Unknown")
        );
    }

    #[tokio::test]
    async fn should_leave_sunlit_alone_when_already_sun_tracking() {
        let host = shutter_host("SUN", "True");
        executor(&host).apply(&host_items(), &rule(AutoState::Sun)).await;
        assert!(host.sent_commands().is_empty());
        assert_eq!(
            host.state_of("state_sunlit_shutter_office").as_deref(),
            Some("True")
        );
    }

    #[tokio::test]
    async fn should_suppress_commands_while_master_switch_is_off() {
        let host = FakeHost::with_items(&[
            ("shutter_automation", Some("OFF")),
            ("shutter_office", Some("0")),
            ("state_auto_shutter_office", Some("UP")),
            ("state_sunlit_shutter_office", Some("False")),
        ]);
        executor(&host).apply(&host_items(), &rule(AutoState::Down)).await;
        assert!(host.sent_commands().is_empty());
        // Mode bookkeeping still happens.
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("DOWN")
        );
    }

    #[tokio::test]
    async fn should_force_commands_past_a_disabled_master_switch() {
        let host = FakeHost::with_items(&[
            ("shutter_automation", Some("OFF")),
            ("shutter_office", Some("0")),
            ("state_auto_shutter_office", Some("UP")),
            ("state_sunlit_shutter_office", Some("False")),
        ]);
        let rule = Rule::builder("storm", AutoState::Down)
            .shutter(ShutterId::new("shutter_office"))
            .forced(true)
            .build()
            .unwrap();
        executor(&host).apply(&host_items(), &rule).await;
        assert_eq!(
            host.sent_commands(),
            vec![("shutter_office".to_string(), ShutterCommand::Down)]
        );
    }

    #[tokio::test]
    async fn should_keep_applying_after_a_broken_shutter() {
        let host = FakeHost::with_items(&[
            ("shutter_automation", Some("ON")),
            ("shutter_office", Some("0")),
            ("state_auto_shutter_office", Some("UP")),
            ("state_sunlit_shutter_office", Some("False")),
        ]);
        let rule = Rule::builder("evening", AutoState::Down)
            .shutters(vec![
                ShutterId::new("shutter_missing"),
                ShutterId::new("shutter_office"),
            ])
            .build()
            .unwrap();
        executor(&host).apply(&host_items(), &rule).await;
        assert_eq!(
            host.sent_commands(),
            vec![("shutter_office".to_string(), ShutterCommand::Down)]
        );
        assert_eq!(
            host.state_of("state_auto_shutter_office").as_deref(),
            Some("DOWN")
        );
    }
}
