//! Metric Cache
//!
//! Owns the mapping from [`CacheKey`] to cached metric and the lock guarding
//! it. Lifecycle:
//!
//! ```text
//! Uninitialized ──bootstrap()──► Bootstrapping ──► Ready
//! ```
//!
//! - Descriptors are created once, during bootstrap, and never change.
//! - `refresh()` only updates values and label values of existing entries.
//!   Records for unknown keys are dropped and stale entries are kept.
//! - Provider calls never happen while the lock is held.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::{Condvar, Mutex};
use prometheus::core::{Collector, Desc};
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use quotas_checks::QuotasSource;
use quotas_common::{
    CacheKey, QuotaUsage, QuotasError, Result, METRIC_NAMESPACE, REGION_LABEL, RESOURCE_LABEL,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Cache lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Bootstrapping,
    Ready,
}

/// Metric cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Value of the constant `region` label
    pub region: String,
    /// Normalized tag keys projected as labels, in label order
    pub tag_labels: Vec<String>,
    /// Span every cache operation is logged in
    pub span: Span,
}

impl CacheConfig {
    pub fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        let span = info_span!("metric_cache", region = %region);
        Self {
            region,
            tag_labels: Vec::new(),
            span,
        }
    }

    pub fn with_tag_labels(mut self, tag_labels: Vec<String>) -> Self {
        self.tag_labels = tag_labels;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Variable label names: `resource` followed by the tag labels
    pub fn label_names(&self) -> Vec<String> {
        std::iter::once(RESOURCE_LABEL.to_string())
            .chain(self.tag_labels.iter().cloned())
            .collect()
    }
}

/// Descriptor pair shared by every entry of one quota family
#[derive(Debug, Clone)]
struct FamilyDescs {
    usage: Arc<Desc>,
    limit: Arc<Desc>,
}

impl FamilyDescs {
    fn new(config: &CacheConfig, quota: &QuotaUsage) -> Result<Self> {
        let const_labels = HashMap::from([(REGION_LABEL.to_string(), config.region.clone())]);
        let desc = |suffix: &str, help: String| {
            Desc::new(
                format!("{}_{}_{}", METRIC_NAMESPACE, quota.name, suffix),
                help,
                config.label_names(),
                const_labels.clone(),
            )
            .map(Arc::new)
        };

        Ok(Self {
            usage: desc("used_total", format!("Used amount of {}", quota.description))?,
            limit: desc("limit_total", format!("Limit of {}", quota.description))?,
        })
    }
}

/// A cached metric: fixed descriptors plus the latest values
#[derive(Debug, Clone)]
struct CachedMetric {
    usage_desc: Arc<Desc>,
    limit_desc: Arc<Desc>,
    usage: f64,
    limit: f64,
    label_values: Vec<String>,
}

impl CachedMetric {
    fn update(&mut self, quota: &QuotaUsage, tag_labels: &[String]) {
        self.usage = quota.usage;
        self.limit = quota.quota;
        self.label_values = quota.label_values(tag_labels);
    }
}

struct CacheInner {
    state: CacheState,
    metrics: HashMap<CacheKey, CachedMetric>,
}

/// Concurrent cache of quota metrics
pub struct MetricCache {
    config: CacheConfig,
    source: Arc<dyn QuotasSource>,
    inner: Mutex<CacheInner>,
    /// Wakes blocking `desc()` callers once ready
    ready_cond: Condvar,
    /// Readiness broadcast for async waiters
    ready_tx: watch::Sender<bool>,
    /// Distinct descriptors, set once at the end of bootstrap
    descs: OnceLock<Vec<Arc<Desc>>>,
}

impl MetricCache {
    /// Create an uninitialized cache
    pub fn new(config: CacheConfig, source: Arc<dyn QuotasSource>) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            config,
            source,
            inner: Mutex::new(CacheInner {
                state: CacheState::Uninitialized,
                metrics: HashMap::new(),
            }),
            ready_cond: Condvar::new(),
            ready_tx,
            descs: OnceLock::new(),
        }
    }

    /// Create a cache and bootstrap it on a background task.
    ///
    /// The returned handle resolves to the bootstrap result; a bootstrap
    /// error means no metric can ever be served.
    pub fn start(
        config: CacheConfig,
        source: Arc<dyn QuotasSource>,
    ) -> (Arc<Self>, JoinHandle<Result<()>>) {
        let cache = Arc::new(Self::new(config, source));
        let task = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.bootstrap().await })
        };
        (cache, task)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn state(&self) -> CacheState {
        self.inner.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == CacheState::Ready
    }

    /// Number of cached metrics
    pub fn len(&self) -> usize {
        self.inner.lock().metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch all quotas once and create a cached metric per distinct key.
    ///
    /// Must run exactly once. On success the cache becomes ready and all
    /// waiters are released.
    pub async fn bootstrap(&self) -> Result<()> {
        let span = self.config.span.clone();
        async {
            {
                let mut inner = self.inner.lock();
                if inner.state != CacheState::Uninitialized {
                    error!(state = ?inner.state, "Bootstrap called more than once");
                    return Err(QuotasError::Internal(format!(
                        "bootstrap called in state {:?}",
                        inner.state
                    )));
                }
                inner.state = CacheState::Bootstrapping;
            }

            let quotas = match self.source.quotas_and_usage().await {
                Ok(quotas) => quotas,
                Err(e) => {
                    error!(error = %e, "Bootstrap failed, no metrics can be served");
                    self.inner.lock().state = CacheState::Uninitialized;
                    return Err(e);
                }
            };

            let mut families: BTreeMap<String, FamilyDescs> = BTreeMap::new();
            let mut metrics: HashMap<CacheKey, CachedMetric> = HashMap::new();
            let mut duplicates = 0usize;

            for quota in &quotas {
                let key = CacheKey::from(quota);
                if metrics.contains_key(&key) {
                    duplicates += 1;
                    continue;
                }

                let family = match families.get(&quota.name) {
                    Some(family) => family.clone(),
                    None => match FamilyDescs::new(&self.config, quota) {
                        Ok(family) => {
                            families.insert(quota.name.clone(), family.clone());
                            family
                        }
                        Err(e) => {
                            error!(quota = %quota.name, error = %e, "Invalid metric descriptor");
                            self.inner.lock().state = CacheState::Uninitialized;
                            return Err(e);
                        }
                    },
                };

                metrics.insert(
                    key,
                    CachedMetric {
                        usage_desc: family.usage,
                        limit_desc: family.limit,
                        usage: quota.usage,
                        limit: quota.quota,
                        label_values: quota.label_values(&self.config.tag_labels),
                    },
                );
            }

            let descs = families
                .into_values()
                .flat_map(|family| [family.usage, family.limit])
                .collect();
            if self.descs.set(descs).is_err() {
                error!("Descriptors already set");
                return Err(QuotasError::Internal("descriptors already set".to_string()));
            }

            let entries = metrics.len();
            {
                let mut inner = self.inner.lock();
                inner.metrics = metrics;
                inner.state = CacheState::Ready;
            }
            self.ready_cond.notify_all();
            self.ready_tx.send_replace(true);

            info!(entries, duplicates, "Metric cache ready");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Fetch all quotas again and update the values of existing entries.
    ///
    /// Returns the number of updated entries. On error the cache is left
    /// untouched.
    pub async fn refresh(&self) -> Result<usize> {
        let span = self.config.span.clone();
        async {
            if !self.is_ready() {
                warn!("Refresh requested before bootstrap completed");
                return Err(QuotasError::Internal(
                    "refresh requested before bootstrap completed".to_string(),
                ));
            }

            let quotas = self.source.quotas_and_usage().await?;

            let mut seen: HashSet<CacheKey> = HashSet::with_capacity(quotas.len());
            let mut updated = 0usize;
            let mut dropped = 0usize;
            let mut duplicates = 0usize;
            {
                let mut inner = self.inner.lock();
                for quota in &quotas {
                    let key = CacheKey::from(quota);
                    // first record of a key wins, as in bootstrap
                    if seen.contains(&key) {
                        duplicates += 1;
                        continue;
                    }
                    match inner.metrics.get_mut(&key) {
                        Some(metric) => {
                            metric.update(quota, &self.config.tag_labels);
                            updated += 1;
                        }
                        None => dropped += 1,
                    }
                    seen.insert(key);
                }
            }

            if dropped > 0 {
                // new resources only show up after a restart
                debug!(dropped, "Ignored records without a cached metric");
            }
            debug!(updated, duplicates, "Refreshed metric cache");
            Ok(updated)
        }
        .instrument(span)
        .await
    }

    /// Resolve once the cache is ready
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        // the sender lives as long as self, so this only returns once ready
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Distinct descriptors of all cached metrics, once the cache is ready
    pub async fn describe(&self) -> Vec<Arc<Desc>> {
        let span = self.config.span.clone();
        async {
            if !self.is_ready() {
                debug!("Waiting for bootstrap before describing");
            }
            self.wait_ready().await;
            self.descs.get().cloned().unwrap_or_default()
        }
        .instrument(span)
        .await
    }

    /// Block the calling thread until the cache is ready
    fn wait_ready_blocking(&self) {
        let mut inner = self.inner.lock();
        while inner.state != CacheState::Ready {
            debug!(parent: &self.config.span, "Waiting for bootstrap before describing");
            self.ready_cond.wait(&mut inner);
        }
    }

    /// Current values as gauge families, one family per descriptor.
    ///
    /// Only holds the lock while copying values; never touches the provider.
    pub fn collect_families(&self) -> Vec<MetricFamily> {
        let _entered = self.config.span.enter();
        let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();

        let inner = self.inner.lock();
        for metric in inner.metrics.values() {
            for (desc, value) in [
                (&metric.limit_desc, metric.limit),
                (&metric.usage_desc, metric.usage),
            ] {
                families
                    .entry(desc.fq_name.clone())
                    .or_insert_with(|| gauge_family(desc))
                    .mut_metric()
                    .push(gauge_metric(desc, &metric.label_values, value));
            }
        }
        drop(inner);

        families.into_values().collect()
    }

    #[cfg(test)]
    fn descriptors_of(&self, key: &CacheKey) -> Option<(Arc<Desc>, Arc<Desc>)> {
        self.inner
            .lock()
            .metrics
            .get(key)
            .map(|m| (m.usage_desc.clone(), m.limit_desc.clone()))
    }

    #[cfg(test)]
    fn values_of(&self, key: &CacheKey) -> Option<(f64, f64, Vec<String>)> {
        self.inner
            .lock()
            .metrics
            .get(key)
            .map(|m| (m.usage, m.limit, m.label_values.clone()))
    }
}

fn gauge_family(desc: &Desc) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(desc.fq_name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(MetricType::GAUGE);
    family
}

fn gauge_metric(desc: &Desc, label_values: &[String], value: f64) -> Metric {
    let mut labels: Vec<LabelPair> = desc.const_label_pairs.clone();
    labels.extend(
        desc.variable_labels
            .iter()
            .zip(label_values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            }),
    );
    labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut gauge = Gauge::default();
    gauge.set_value(value);

    let mut metric = Metric::default();
    metric.set_label(labels.into());
    metric.set_gauge(gauge);
    metric
}

/// Prometheus collector backed by a shared [`MetricCache`].
///
/// `desc()` blocks until the cache is ready. Await
/// [`MetricCache::wait_ready`] before registering from async code.
#[derive(Clone)]
pub struct CacheCollector {
    cache: Arc<MetricCache>,
}

impl CacheCollector {
    pub fn new(cache: Arc<MetricCache>) -> Self {
        Self { cache }
    }
}

impl Collector for CacheCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.cache.wait_ready_blocking();
        self.cache
            .descs
            .get()
            .map(|descs| descs.iter().map(|desc| desc.as_ref()).collect())
            .unwrap_or_default()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.cache.collect_families()
    }
}
