//! Sun exposure evaluator — tracks the sun across every shutter in
//! sun mode.
//!
//! Runs on each sun azimuth update. For every shutter whose
//! automation mode is `SUN` it compares the freshly computed exposure
//! with the stored sunlit flag and reacts to the two edges: newly
//! sunlit under a clear sky closes the lamellas (`STOP`), newly shaded
//! reopens (`UP`). Cloudy weather holds the close edge but never the
//! reopen edge, so shutters don't stay down behind a cloud front.

use std::str::FromStr;
use std::sync::Arc;

use lamella_domain::error::LamellaError;
use lamella_domain::item::{HostItems, ItemName, ShutterId};
use lamella_domain::shutter::{AutoState, ShutterCommand, SunlitState};
use lamella_domain::sun::{ExposureCatalog, SunExposure, SunPosition};
use tracing::{debug, warn};

use crate::commands::{dispatch_enabled, send_shutter_command};
use crate::locks::ShutterLocks;
use crate::ports::ItemGateway;

/// Outcome of one evaluation for one shutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureDecision {
    pub command: Option<ShutterCommand>,
    pub next: SunlitState,
}

/// Decide what a sun-tracking shutter should do.
///
/// `sunlit` is the geometric exposure, `sunny` the weather flag, and
/// `prior` the stored sunlit flag from the previous evaluation.
#[must_use]
pub fn decide(sunlit: bool, sunny: bool, prior: SunlitState) -> ExposureDecision {
    if sunlit {
        if !sunny {
            // Geometrically sunlit but overcast: hold everything until
            // the sky clears.
            return ExposureDecision {
                command: None,
                next: prior,
            };
        }
        let command = match prior {
            SunlitState::False => Some(ShutterCommand::Stop),
            SunlitState::True | SunlitState::Unknown => None,
        };
        ExposureDecision {
            command,
            next: SunlitState::True,
        }
    } else {
        match prior {
            SunlitState::True => ExposureDecision {
                command: Some(ShutterCommand::Up),
                next: SunlitState::False,
            },
            SunlitState::False => ExposureDecision {
                command: None,
                next: SunlitState::False,
            },
            // An unobserved shutter in the shade is flagged sunlit so
            // the next shade evaluation reopens it once, putting it in
            // a known position.
            SunlitState::Unknown => ExposureDecision {
                command: None,
                next: SunlitState::True,
            },
        }
    }
}

/// Evaluates sun exposure for all configured shutters.
pub struct ExposureEngine<G> {
    gateway: G,
    locks: Arc<ShutterLocks>,
}

impl<G: ItemGateway> ExposureEngine<G> {
    pub fn new(gateway: G, locks: Arc<ShutterLocks>) -> Self {
        Self { gateway, locks }
    }

    /// Evaluate every shutter in the catalog against a new sun
    /// azimuth. Per-shutter failures are logged and do not stop the
    /// sweep.
    #[tracing::instrument(skip(self, catalog, items))]
    pub async fn evaluate_all(
        &self,
        catalog: &ExposureCatalog,
        items: &HostItems,
        azimuth: f64,
    ) -> Result<(), LamellaError> {
        let Some(elevation) = self.read_number(&items.elevation).await? else {
            warn!(item = %items.elevation, "sun elevation unavailable, skipping evaluation");
            return Ok(());
        };
        let position = SunPosition { azimuth, elevation };
        let sunny = self.switch_is_on(&items.weather_sunny).await;
        let enabled = dispatch_enabled(&self.gateway, &items.shutter_automation).await;

        for (shutter, exposure) in catalog.iter() {
            if let Err(err) = self
                .evaluate_shutter(shutter, exposure, position, sunny, enabled)
                .await
            {
                tracing::error!(shutter = %shutter, error = %err, "sun evaluation failed");
            }
        }
        Ok(())
    }

    async fn evaluate_shutter(
        &self,
        shutter: &ShutterId,
        exposure: &SunExposure,
        position: SunPosition,
        sunny: bool,
        enabled: bool,
    ) -> Result<(), LamellaError> {
        let _guard = self.locks.acquire(shutter).await;

        let Some(mode) = self.read_parsed::<AutoState>(&shutter.auto_state_item()).await? else {
            debug!(shutter = %shutter, "automation mode undefined, skipping");
            return Ok(());
        };
        if mode != AutoState::Sun {
            debug!(shutter = %shutter, mode = %mode, "not tracking the sun");
            return Ok(());
        }

        let Some(prior) = self
            .read_parsed::<SunlitState>(&shutter.sunlit_state_item())
            .await?
        else {
            warn!(shutter = %shutter, "sunlit flag undefined, skipping");
            return Ok(());
        };

        let sunlit = exposure.is_sunlit(position);
        debug!(shutter = %shutter, %position, sunlit, sunny, "evaluated exposure");

        let decision = decide(sunlit, sunny, prior);
        if let Some(command) = decision.command {
            send_shutter_command(&self.gateway, shutter, command, enabled).await?;
        }
        if decision.next != prior {
            self.gateway
                .post_update(&shutter.sunlit_state_item(), decision.next.as_str())
                .await?;
        }
        Ok(())
    }

    async fn read_number(&self, item: &ItemName) -> Result<Option<f64>, LamellaError> {
        let Some(text) = self.gateway.state(item).await? else {
            return Ok(None);
        };
        match text.parse::<f64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!(item = %item, state = %text, "item state is not numeric");
                Ok(None)
            }
        }
    }

    async fn read_parsed<T: FromStr>(&self, item: &ItemName) -> Result<Option<T>, LamellaError> {
        let Some(text) = self.gateway.state(item).await? else {
            return Ok(None);
        };
        match text.parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!(item = %item, state = %text, "unrecognised item state");
                Ok(None)
            }
        }
    }

    async fn switch_is_on(&self, item: &ItemName) -> bool {
        match self.gateway.state(item).await {
            Ok(state) => matches!(state.as_deref(), Some("ON")),
            Err(err) => {
                warn!(item = %item, error = %err, "cannot read switch, treating as off");
                false
            }
        }
    }
}
