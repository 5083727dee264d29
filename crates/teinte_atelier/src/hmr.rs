//! Hot-update coordination.
//!
//! Driven by two host events:
//!
//! - a file change ([`HotUpdateCoordinator::handle_hot_update`]) resets the
//!   tracking state and flags the style modules that must recompile;
//! - a style transform ([`HotUpdateCoordinator::on_transform`]) counts a
//!   recompiled module. When every flagged module has recompiled, the theme is
//!   recomputed and pushed once over the live-update channel.
//!
//! ```text
//! Idle --file change--> Waiting { affected, transformed } --all transformed--> push --> Idle
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use teinte_carton::path::path_to_posix;
use teinte_carton::FxHashSet;

use crate::arbitrary::{create_set_custom_theme, CreateThemeOptions, ThemeOutput};
use crate::codegen::CUSTOM_THEME_UPDATE_EVENT;
use crate::error::{ThemeError, ThemeResult};
use crate::options::is_style_module;
use crate::plugin::{PluginHandle, PLUGIN_NAME};
use crate::session::ThemeSession;

/// Payload of the `custom-theme-update` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomThemeUpdate {
    pub source_theme_style: String,
    pub hybrid_value_map: BTreeMap<String, String>,
    pub other_values: BTreeMap<String, String>,
    pub gradient_values: BTreeMap<String, String>,
    pub source_color_map: BTreeMap<String, Vec<String>>,
}

impl From<&ThemeOutput> for CustomThemeUpdate {
    fn from(output: &ThemeOutput) -> Self {
        Self {
            source_theme_style: output.style_content.clone(),
            hybrid_value_map: output.hybrid_value_map.clone(),
            other_values: output.other_values.clone(),
            gradient_values: output.gradient_values.clone(),
            source_color_map: output.source_color_map.clone(),
        }
    }
}

/// Error reported by a live-update channel.
#[derive(Debug, thiserror::Error)]
#[error("hot channel error: {0}")]
pub struct HotChannelError(pub String);

/// The dev server's socket to connected pages.
pub trait HotChannel: Send + Sync {
    fn send(&self, event: &str, payload: serde_json::Value) -> Result<(), HotChannelError>;
}

/// A module of the host module graph touched by a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleNode {
    pub id: Option<String>,
    /// Ids of the modules importing this one.
    pub importers: Vec<String>,
}

/// A file-change event.
#[derive(Debug, Clone, Copy)]
pub struct HotUpdateContext<'a> {
    pub file: &'a Path,
    pub modules: &'a [ModuleNode],
}

/// What the host should do with the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotUpdateOutcome {
    /// Host default handling.
    Default,
    /// Update no modules.
    NoModules,
}

/// Tracking state between a change and its push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HmrPhase {
    #[default]
    Idle,
    Waiting {
        affected: FxHashSet<String>,
        transformed: FxHashSet<String>,
    },
}

pub struct HotUpdateCoordinator {
    session: Arc<ThemeSession>,
    phase: Mutex<HmrPhase>,
    channel: Mutex<Option<Arc<dyn HotChannel>>>,
}

impl HotUpdateCoordinator {
    pub fn new(session: Arc<ThemeSession>) -> Self {
        Self {
            session,
            phase: Mutex::new(HmrPhase::Idle),
            channel: Mutex::new(None),
        }
    }

    /// Attach to the resolved theme plugin among the host's plugins.
    pub fn from_plugins(plugins: &[PluginHandle]) -> ThemeResult<Self> {
        let base = plugins
            .iter()
            .find(|plugin| plugin.name == PLUGIN_NAME)
            .ok_or_else(|| ThemeError::MissingBasePlugin {
                name: PLUGIN_NAME.to_string(),
            })?;
        let session = base.api.clone().ok_or(ThemeError::SessionNotResolved)?;
        Ok(Self::new(session))
    }

    pub fn session(&self) -> &Arc<ThemeSession> {
        &self.session
    }

    pub fn phase(&self) -> HmrPhase {
        self.phase.lock().clone()
    }

    pub fn set_channel(&self, channel: Arc<dyn HotChannel>) {
        *self.channel.lock() = Some(channel);
    }

    /// Handle a file change.
    pub fn handle_hot_update(
        &self,
        ctx: &HotUpdateContext<'_>,
        channel: Option<Arc<dyn HotChannel>>,
    ) -> HotUpdateOutcome {
        if !self.session.options().arbitrary_mode {
            return HotUpdateOutcome::Default;
        }
        if let Some(channel) = channel {
            self.set_channel(channel);
        }

        let mut phase = self.phase.lock();
        *phase = HmrPhase::Idle;

        let file = path_to_posix(ctx.file);
        if file == path_to_posix(&self.session.runtime_output_path()) {
            tracing::debug!(file = %file, "ignoring change of the generated runtime module");
            return HotUpdateOutcome::NoModules;
        }

        let affected: FxHashSet<String> = if self.session.is_scope_source(ctx.file) {
            self.session.invalidate_theme_cache();
            ctx.modules
                .first()
                .map(|module| {
                    module
                        .importers
                        .iter()
                        .filter(|id| is_style_module(id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        } else {
            ctx.modules
                .iter()
                .filter_map(|module| module.id.as_deref())
                .filter(|id| is_style_module(id))
                .map(str::to_string)
                .collect()
        };

        if !affected.is_empty() {
            tracing::debug!(file = %file, affected = affected.len(), "waiting for style transforms");
            *phase = HmrPhase::Waiting {
                affected,
                transformed: FxHashSet::default(),
            };
        }
        HotUpdateOutcome::Default
    }

    /// Count a transformed style module. Returns the pushed theme when this
    /// transform completed the pending change.
    pub fn on_transform(&self, module_id: &str) -> Option<Arc<ThemeOutput>> {
        if !self.session.options().arbitrary_mode || !is_style_module(module_id) {
            return None;
        }

        {
            let mut phase = self.phase.lock();
            let HmrPhase::Waiting {
                affected,
                transformed,
            } = &mut *phase
            else {
                return None;
            };
            transformed.insert(module_id.to_string());
            if transformed.len() < affected.len() {
                return None;
            }
            *phase = HmrPhase::Idle;
        }

        let output = create_set_custom_theme(
            &self.session,
            &CreateThemeOptions {
                use_cache: true,
                write_runtime_file: true,
                primary_color: None,
            },
        )?;
        self.push(&output);
        Some(output)
    }

    /// Fire and forget.
    fn push(&self, output: &ThemeOutput) {
        let Some(channel) = self.channel.lock().clone() else {
            tracing::debug!("no hot channel attached, skipping theme push");
            return;
        };
        let payload = match serde_json::to_value(CustomThemeUpdate::from(output)) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("failed to serialize theme update: {e}");
                return;
            }
        };
        if let Err(e) = channel.send(CUSTOM_THEME_UPDATE_EVENT, payload) {
            tracing::debug!("theme push failed: {e}");
        }
    }
}

impl std::fmt::Debug for HotUpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotUpdateCoordinator")
            .field("phase", &*self.phase.lock())
            .finish_non_exhaustive()
    }
}
