//! Configuration: figment-loaded scalar settings plus a validating builder
//! that freezes collaborators into an immutable [`CompareConfig`].
//!
//! The two phases are deliberate. [`CompareSettings`] is the declarative
//! part — timeouts, flags, attempt limits — loadable from TOML and
//! environment. The builder then combines settings with the things only code
//! can supply (pools, closures, the reporter) and validates the whole bundle
//! once. The built config is shared read-only across invocations.

use std::sync::Arc;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use tokio::runtime::Handle;

use crate::error::ConfigError;
use crate::report::Reporter;

/// Extracts a stable string key from a compared value. Must be pure: the
/// same logical value yields the same key on both sides and across retries.
pub type KeyExtractor<O> = Arc<dyn Fn(&O) -> String + Send + Sync>;

/// Decides whether two values under the same key count as equal. Native
/// `==` is never used by the diff engine.
pub type Equivalence<O> = Arc<dyn Fn(&O, &O) -> bool + Send + Sync>;

/// Scalar configuration knobs, loadable from TOML file and environment.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`GRAY_` prefix)
/// 2. TOML config file
/// 3. Defaults
#[derive(Debug, Clone, Deserialize)]
pub struct CompareSettings {
    /// Bounded wait for the old-path query, in milliseconds.
    #[serde(default = "default_query_wait_millis")]
    pub old_query_wait_millis: u64,

    /// Bounded wait for the new-path query, in milliseconds.
    #[serde(default = "default_query_wait_millis")]
    pub new_query_wait_millis: u64,

    /// Sleep between comparison attempts, in milliseconds.
    #[serde(default = "default_cmp_sleep_millis")]
    pub cmp_sleep_millis: u64,

    /// Maximum number of comparison attempts per invocation.
    #[serde(default = "default_max_cmp_times")]
    pub max_cmp_times: u32,

    /// When set, the new path is authoritative and the old path is the shadow.
    #[serde(default)]
    pub switch_to_new_query: bool,

    /// When unset, the shadow path is never queried at all.
    #[serde(default)]
    pub switch_to_cmp: bool,

    /// Business identifier used for reporting and log tagging.
    #[serde(default = "default_business_flag")]
    pub business_flag: String,
}

fn default_query_wait_millis() -> u64 {
    3000
}

fn default_cmp_sleep_millis() -> u64 {
    1000
}

fn default_max_cmp_times() -> u32 {
    1
}

fn default_business_flag() -> String {
    "default".to_string()
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            old_query_wait_millis: default_query_wait_millis(),
            new_query_wait_millis: default_query_wait_millis(),
            cmp_sleep_millis: default_cmp_sleep_millis(),
            max_cmp_times: default_max_cmp_times(),
            switch_to_new_query: false,
            switch_to_cmp: false,
            business_flag: default_business_flag(),
        }
    }
}

impl CompareSettings {
    /// Load settings from a TOML file merged with `GRAY_`-prefixed
    /// environment variables. A missing file falls through to defaults.
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let settings = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("GRAY_"))
            .extract()?;
        Ok(settings)
    }
}

/// Immutable, validated configuration for one gray-release comparison
/// domain. Built once via [`CompareConfigBuilder`], then shared via `Arc`
/// across all invocations; no invocation mutates it.
pub struct CompareConfig<O> {
    pub(crate) old_query_pool: Handle,
    pub(crate) new_query_pool: Handle,
    pub(crate) cmp_pool: Handle,
    pub(crate) old_query_wait: Duration,
    pub(crate) new_query_wait: Duration,
    pub(crate) cmp_sleep: Duration,
    pub(crate) switch_to_new_query: bool,
    pub(crate) switch_to_cmp: bool,
    pub(crate) max_cmp_times: u32,
    pub(crate) key_extractor: Option<KeyExtractor<O>>,
    pub(crate) equivalence: Equivalence<O>,
    pub(crate) zero: Option<O>,
    pub(crate) business_flag: String,
    pub(crate) reporter: Option<Arc<dyn Reporter<O>>>,
}

impl<O> std::fmt::Debug for CompareConfig<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompareConfig")
            .field("old_query_wait", &self.old_query_wait)
            .field("new_query_wait", &self.new_query_wait)
            .field("cmp_sleep", &self.cmp_sleep)
            .field("switch_to_new_query", &self.switch_to_new_query)
            .field("switch_to_cmp", &self.switch_to_cmp)
            .field("max_cmp_times", &self.max_cmp_times)
            .field("business_flag", &self.business_flag)
            .finish_non_exhaustive()
    }
}

impl<O> CompareConfig<O> {
    pub fn builder() -> CompareConfigBuilder<O> {
        CompareConfigBuilder::new()
    }

    pub fn business_flag(&self) -> &str {
        &self.business_flag
    }

    pub fn switch_to_cmp(&self) -> bool {
        self.switch_to_cmp
    }

    pub fn switch_to_new_query(&self) -> bool {
        self.switch_to_new_query
    }
}

/// Accumulates optional settings, then validates and freezes them into a
/// [`CompareConfig`].
pub struct CompareConfigBuilder<O> {
    old_query_pool: Option<Handle>,
    new_query_pool: Option<Handle>,
    cmp_pool: Option<Handle>,
    old_query_wait: Duration,
    new_query_wait: Duration,
    cmp_sleep: Duration,
    switch_to_new_query: bool,
    switch_to_cmp: bool,
    max_cmp_times: u32,
    key_extractor: Option<KeyExtractor<O>>,
    equivalence: Option<Equivalence<O>>,
    zero: Option<O>,
    business_flag: String,
    reporter: Option<Arc<dyn Reporter<O>>>,
}

impl<O> CompareConfigBuilder<O> {
    pub fn new() -> Self {
        let defaults = CompareSettings::default();
        let mut builder = Self {
            old_query_pool: None,
            new_query_pool: None,
            cmp_pool: None,
            old_query_wait: Duration::ZERO,
            new_query_wait: Duration::ZERO,
            cmp_sleep: Duration::ZERO,
            switch_to_new_query: false,
            switch_to_cmp: false,
            max_cmp_times: 0,
            key_extractor: None,
            equivalence: None,
            zero: None,
            business_flag: String::new(),
            reporter: None,
        };
        builder.apply_settings(&defaults);
        builder
    }

    fn apply_settings(&mut self, settings: &CompareSettings) {
        self.old_query_wait = Duration::from_millis(settings.old_query_wait_millis);
        self.new_query_wait = Duration::from_millis(settings.new_query_wait_millis);
        self.cmp_sleep = Duration::from_millis(settings.cmp_sleep_millis);
        self.max_cmp_times = settings.max_cmp_times;
        self.switch_to_new_query = settings.switch_to_new_query;
        self.switch_to_cmp = settings.switch_to_cmp;
        self.business_flag = settings.business_flag.clone();
    }

    /// Apply a whole settings bundle (timeouts, flags, business flag).
    pub fn settings(mut self, settings: &CompareSettings) -> Self {
        self.apply_settings(settings);
        self
    }

    /// Pool executing old-path queries. Caller-owned and pre-sized.
    pub fn old_query_pool(mut self, pool: Handle) -> Self {
        self.old_query_pool = Some(pool);
        self
    }

    /// Pool executing new-path queries. Caller-owned and pre-sized.
    pub fn new_query_pool(mut self, pool: Handle) -> Self {
        self.new_query_pool = Some(pool);
        self
    }

    /// Pool executing comparison tasks. Caller-owned and pre-sized.
    pub fn cmp_pool(mut self, pool: Handle) -> Self {
        self.cmp_pool = Some(pool);
        self
    }

    pub fn old_query_wait(mut self, wait: Duration) -> Self {
        self.old_query_wait = wait;
        self
    }

    pub fn new_query_wait(mut self, wait: Duration) -> Self {
        self.new_query_wait = wait;
        self
    }

    pub fn cmp_sleep(mut self, sleep: Duration) -> Self {
        self.cmp_sleep = sleep;
        self
    }

    pub fn switch_to_new_query(mut self, on: bool) -> Self {
        self.switch_to_new_query = on;
        self
    }

    pub fn switch_to_cmp(mut self, on: bool) -> Self {
        self.switch_to_cmp = on;
        self
    }

    pub fn max_cmp_times(mut self, times: u32) -> Self {
        self.max_cmp_times = times;
        self
    }

    /// Key extractor. Required whenever compared values are list- or
    /// scalar-shaped; ignored for map-shaped values.
    pub fn key_extractor(
        mut self,
        extractor: impl Fn(&O) -> String + Send + Sync + 'static,
    ) -> Self {
        self.key_extractor = Some(Arc::new(extractor));
        self
    }

    /// Equivalence predicate defining "equal" for the comparison domain.
    /// Always required.
    pub fn equivalence(
        mut self,
        equivalence: impl Fn(&O, &O) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.equivalence = Some(Arc::new(equivalence));
        self
    }

    /// Zero/sentinel value: one-sided diff entries equivalence-equal to it
    /// are suppressed as false positives.
    pub fn zero(mut self, zero: O) -> Self {
        self.zero = Some(zero);
        self
    }

    pub fn business_flag(mut self, flag: impl Into<String>) -> Self {
        self.business_flag = flag.into();
        self
    }

    pub fn reporter(mut self, reporter: impl Reporter<O> + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Validate and freeze. Pools and the equivalence predicate must be
    /// present, the business flag non-empty, and every numeric setting
    /// strictly positive.
    pub fn build(self) -> Result<CompareConfig<O>, ConfigError> {
        let old_query_pool = self
            .old_query_pool
            .ok_or(ConfigError::Missing("old_query_pool"))?;
        let new_query_pool = self
            .new_query_pool
            .ok_or(ConfigError::Missing("new_query_pool"))?;
        let cmp_pool = self.cmp_pool.ok_or(ConfigError::Missing("cmp_pool"))?;
        let equivalence = self.equivalence.ok_or(ConfigError::Missing("equivalence"))?;

        if self.business_flag.is_empty() {
            return Err(ConfigError::EmptyBusinessFlag);
        }
        if self.old_query_wait.is_zero() {
            return Err(ConfigError::NotPositive("old_query_wait"));
        }
        if self.new_query_wait.is_zero() {
            return Err(ConfigError::NotPositive("new_query_wait"));
        }
        if self.cmp_sleep.is_zero() {
            return Err(ConfigError::NotPositive("cmp_sleep"));
        }
        if self.max_cmp_times == 0 {
            return Err(ConfigError::NotPositive("max_cmp_times"));
        }

        Ok(CompareConfig {
            old_query_pool,
            new_query_pool,
            cmp_pool,
            old_query_wait: self.old_query_wait,
            new_query_wait: self.new_query_wait,
            cmp_sleep: self.cmp_sleep,
            switch_to_new_query: self.switch_to_new_query,
            switch_to_cmp: self.switch_to_cmp,
            max_cmp_times: self.max_cmp_times,
            key_extractor: self.key_extractor,
            equivalence,
            zero: self.zero,
            business_flag: self.business_flag,
            reporter: self.reporter,
        })
    }
}

impl<O> Default for CompareConfigBuilder<O> {
    fn default() -> Self {
        Self::new()
    }
}
