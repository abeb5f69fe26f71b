//! File-level effects and the registry that dispatches to them.
//!
//! An effect processes one still image or one video file per call and reports through a
//! [`TaskReporter`]. Calls run synchronously on the caller's thread; [`MediaEffect::cancel`] may be
//! called from any other thread while a call is in flight.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{EncodeConfig, WarpSettings};
use crate::foundation::error::{BitterError, BitterResult};
use crate::task::{TaskId, TaskReporter};

pub mod bitter_face;

/// Stable name an effect is registered under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EffectKey(String);

impl EffectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EffectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EffectKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Still image job.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub warp: WarpSettings,
}

/// Video file job.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub warp: WarpSettings,
    pub encode: EncodeConfig,
    pub keep_audio: bool,
}

/// A file-level effect.
///
/// Each `process_*` call emits exactly one terminal event through `reporter`, preceded by zero or
/// more progress events.
pub trait MediaEffect: Send + Sync {
    fn process_image(&self, request: &ImageRequest, reporter: TaskReporter);

    fn process_video(&self, request: &VideoRequest, reporter: TaskReporter);

    fn cancel(&self, task: TaskId) -> bool;
}

/// Explicit map from [`EffectKey`] to effect.
#[derive(Default)]
pub struct EffectRegistry {
    effects: BTreeMap<EffectKey, Arc<dyn MediaEffect>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        key: impl Into<EffectKey>,
        effect: Arc<dyn MediaEffect>,
    ) -> Option<Arc<dyn MediaEffect>> {
        let key = key.into();
        tracing::debug!(%key, "effect registered");
        self.effects.insert(key, effect)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EffectKey> {
        self.effects.keys()
    }

    pub fn get(&self, key: &EffectKey) -> BitterResult<Arc<dyn MediaEffect>> {
        self.effects
            .get(key)
            .cloned()
            .ok_or_else(|| BitterError::unsupported(format!("no effect registered as '{key}'")))
    }

    pub fn process_image(&self, key: &EffectKey, request: &ImageRequest, reporter: TaskReporter) {
        match self.get(key) {
            Ok(effect) => effect.process_image(request, reporter),
            Err(e) => {
                reporter.fail(&e);
            }
        }
    }

    pub fn process_video(&self, key: &EffectKey, request: &VideoRequest, reporter: TaskReporter) {
        match self.get(key) {
            Ok(effect) => effect.process_video(request, reporter),
            Err(e) => {
                reporter.fail(&e);
            }
        }
    }

    pub fn cancel(&self, key: &EffectKey, task: TaskId) -> bool {
        self.effects.get(key).is_some_and(|e| e.cancel(task))
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.effects.keys()).finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effect/mod.rs"]
mod tests;
