use crate::FilterSpec;
use herald_delivery::{OverflowPolicy, SenderSettings};
use herald_deserialize::OneOrMany;
use herald_factory::impl_deserialize_field;
use herald_util::BackoffConfig;
use humantime::parse_duration;
use secure_string::SecureString;
use serde::de::{Error, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::fmt::Formatter;
use std::time::Duration;

/// The `notifier` configuration section: where reports go and how hard the
/// notifier tries to get them there.
///
/// Besides a map, the section may be given as a bare string, taken as the
/// endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifierConfig {
    endpoint: String,
    api_key: SecureString,
    environment: Option<String>,
    ignore_environments: BTreeSet<String>,
    max_retries: u32,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
    workers: usize,
    attempt_timeout: Duration,
    sync_timeout: Duration,
    drain_timeout: Duration,
    backoff: BackoffConfig,
    filters: Vec<FilterSpec>,
}

impl NotifierConfig {
    /// Creates a config posting to `endpoint`, everything else at defaults.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<SecureString>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Replaces the environment stamped on reports.
    pub fn with_environment(self, environment: impl Into<String>) -> Self {
        Self {
            environment: Some(environment.into()),
            ..self
        }
    }

    /// Adds an environment whose reports are dropped.
    pub fn with_ignored_environment(mut self, environment: impl AsRef<str>) -> Self {
        self.ignore_environments
            .insert(environment.as_ref().to_ascii_lowercase());

        self
    }

    /// Replaces the retry budget.
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Replaces the queue capacity and overflow policy.
    pub fn with_queue(self, queue_capacity: usize, overflow_policy: OverflowPolicy) -> Self {
        Self {
            queue_capacity,
            overflow_policy,
            ..self
        }
    }

    /// Replaces the number of delivery workers.
    pub fn with_workers(self, workers: usize) -> Self {
        Self { workers, ..self }
    }

    /// Replaces the per-attempt, synchronous and drain time limits.
    pub fn with_timeouts(
        self,
        attempt_timeout: Duration,
        sync_timeout: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            attempt_timeout,
            sync_timeout,
            drain_timeout,
            ..self
        }
    }

    /// Replaces the retry backoff.
    pub fn with_backoff(self, backoff: BackoffConfig) -> Self {
        Self { backoff, ..self }
    }

    /// Appends a declared filter.
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);

        self
    }
}

impl NotifierConfig {
    /// The URL reports are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The bearer token sent with every report.
    pub fn api_key(&self) -> &SecureString {
        &self.api_key
    }

    /// The environment stamped on reports. When unset, the
    /// [active environment](herald_config::ActiveEnvironment) is used.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Environments whose reports are dropped before processing, lowercased.
    pub fn ignore_environments(&self) -> &BTreeSet<String> {
        &self.ignore_environments
    }

    /// Retries allowed after the first delivery attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Maximum number of queued reports.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// What happens to a report arriving at a full queue.
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    /// Number of background delivery workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Upper bound on a single delivery attempt.
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Upper bound on a whole synchronous delivery, retries included.
    ///
    /// The limit wins over the retry schedule: a delivery still retrying when
    /// it runs out is cut short. Exhausting every retry against a slow backend
    /// can take up to `max_retries + 1` attempt timeouts plus the
    /// [`retry_wait_budget`](NotifierConfig::retry_wait_budget). The defaults
    /// (5s here, 5.25s of backoff alone) favor returning promptly at process
    /// exit over using up every retry.
    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }

    /// The longest total backoff wait a delivery can go through between its
    /// attempts, with every delay at the top of its jitter range.
    pub fn retry_wait_budget(&self) -> Duration {
        let backoff = &self.backoff;
        let ceiling = backoff.max_interval().as_secs_f64();
        let mut interval = backoff.initial_interval().as_secs_f64().min(ceiling);
        let mut total = 0.0;

        for _ in 0..self.max_retries {
            total += interval * (1.0 + backoff.randomization_factor());
            interval = (interval * backoff.multiplier()).min(ceiling);
        }

        Duration::try_from_secs_f64(total).unwrap_or(Duration::MAX)
    }

    /// Time granted to drain the queue on shutdown.
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Delay growth between attempts.
    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// Filters declared in configuration.
    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// The sender knobs derived from this config.
    pub fn sender_settings(&self) -> SenderSettings {
        SenderSettings {
            max_retries: self.max_retries,
            attempt_timeout: self.attempt_timeout,
            backoff: self.backoff.clone(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            api_key: Self::default_api_key(),
            environment: None,
            ignore_environments: BTreeSet::new(),
            max_retries: Self::default_max_retries(),
            queue_capacity: Self::default_queue_capacity(),
            overflow_policy: OverflowPolicy::default(),
            workers: Self::default_workers(),
            attempt_timeout: Self::default_attempt_timeout(),
            sync_timeout: Self::default_sync_timeout(),
            drain_timeout: Self::default_drain_timeout(),
            backoff: BackoffConfig::default(),
            filters: Vec::new(),
        }
    }
}

impl NotifierConfig {
    fn default_endpoint() -> String {
        "http://localhost:8080/api/v1/reports".to_string()
    }

    fn default_api_key() -> SecureString {
        "".into()
    }

    fn default_max_retries() -> u32 {
        3
    }

    fn default_queue_capacity() -> usize {
        1000
    }

    fn default_workers() -> usize {
        1
    }

    fn default_attempt_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn default_sync_timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn default_drain_timeout() -> Duration {
        Duration::from_secs(2)
    }
}

impl AsRef<NotifierConfig> for NotifierConfig {
    fn as_ref(&self) -> &NotifierConfig {
        self
    }
}

const _: () = {
    impl<'de> Deserialize<'de> for NotifierConfig {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(NotifierConfigVisitor)
        }
    }

    struct NotifierConfigVisitor;

    impl<'de> Visitor<'de> for NotifierConfigVisitor {
        type Value = NotifierConfig;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map of notifier configuration or a string endpoint")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(NotifierConfig {
                endpoint: value.to_string(),
                ..NotifierConfig::default()
            })
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut endpoint = None;
            let mut api_key = None;
            let mut environment: Option<String> = None;
            let mut ignore_environments: Option<OneOrMany<String>> = None;
            let mut max_retries = None;
            let mut queue_capacity = None;
            let mut overflow_policy = None;
            let mut workers = None;
            let mut attempt_timeout = None;
            let mut sync_timeout = None;
            let mut drain_timeout = None;
            let mut backoff = None;
            let mut filters: Option<Vec<FilterSpec>> = None;

            while let Some(key) = map.next_key()? {
                match key {
                    NotifierConfigField::endpoint => key.poll(&mut map, &mut endpoint)?,
                    NotifierConfigField::api_key => key.poll(&mut map, &mut api_key)?,
                    NotifierConfigField::environment => key.poll(&mut map, &mut environment)?,
                    NotifierConfigField::ignore_environments => {
                        key.poll(&mut map, &mut ignore_environments)?
                    }
                    NotifierConfigField::max_retries => key.poll(&mut map, &mut max_retries)?,
                    NotifierConfigField::queue_capacity => {
                        key.poll(&mut map, &mut queue_capacity)?
                    }
                    NotifierConfigField::overflow_policy => {
                        key.poll(&mut map, &mut overflow_policy)?
                    }
                    NotifierConfigField::workers => key.poll(&mut map, &mut workers)?,
                    NotifierConfigField::attempt_timeout => {
                        attempt_timeout = Some(next_duration(&mut map)?);
                        IgnoredAny
                    }
                    NotifierConfigField::sync_timeout => {
                        sync_timeout = Some(next_duration(&mut map)?);
                        IgnoredAny
                    }
                    NotifierConfigField::drain_timeout => {
                        drain_timeout = Some(next_duration(&mut map)?);
                        IgnoredAny
                    }
                    NotifierConfigField::backoff => key.poll(&mut map, &mut backoff)?,
                    NotifierConfigField::filters => key.poll(&mut map, &mut filters)?,
                    NotifierConfigField::__ignore => map.next_value()?,
                };
            }

            let endpoint: String = endpoint.unwrap_or_else(NotifierConfig::default_endpoint);
            if endpoint.trim().is_empty() {
                return Err(Error::invalid_value(
                    serde::de::Unexpected::Str(&endpoint),
                    &"a non-empty endpoint URL",
                ));
            }

            let queue_capacity = queue_capacity.unwrap_or_else(NotifierConfig::default_queue_capacity);
            if queue_capacity == 0 {
                return Err(Error::invalid_value(
                    serde::de::Unexpected::Unsigned(0),
                    &"a queue capacity of at least 1",
                ));
            }

            let workers = workers.unwrap_or_else(NotifierConfig::default_workers);
            if workers == 0 {
                return Err(Error::invalid_value(
                    serde::de::Unexpected::Unsigned(0),
                    &"at least 1 worker",
                ));
            }

            Ok(NotifierConfig {
                endpoint,
                api_key: api_key.unwrap_or_else(NotifierConfig::default_api_key),
                environment: environment.filter(|name| !name.trim().is_empty()),
                ignore_environments: ignore_environments
                    .unwrap_or_default()
                    .into_iter()
                    .map(|name| name.to_ascii_lowercase())
                    .collect(),
                max_retries: max_retries.unwrap_or_else(NotifierConfig::default_max_retries),
                queue_capacity,
                overflow_policy: overflow_policy.unwrap_or_default(),
                workers,
                attempt_timeout: attempt_timeout
                    .unwrap_or_else(NotifierConfig::default_attempt_timeout),
                sync_timeout: sync_timeout.unwrap_or_else(NotifierConfig::default_sync_timeout),
                drain_timeout: drain_timeout
                    .unwrap_or_else(NotifierConfig::default_drain_timeout),
                backoff: backoff.unwrap_or_default(),
                filters: filters.unwrap_or_default(),
            })
        }
    }

    fn next_duration<'de, A>(map: &mut A) -> Result<Duration, A::Error>
    where
        A: MapAccess<'de>,
    {
        let duration_string = map.next_value::<String>()?;

        parse_duration(&duration_string).map_err(Error::custom)
    }

    impl_deserialize_field!(
        NotifierConfigField,
        herald_deserialize::Slug::eq_as_slugs,
        endpoint | url | host,
        api_key | key | token | project_key,
        environment | env,
        ignore_environments | ignored_environments | ignore_envs,
        max_retries | retries,
        queue_capacity | queue_size | capacity,
        overflow_policy | overflow,
        workers | worker_count | concurrency,
        attempt_timeout | timeout,
        sync_timeout,
        drain_timeout | shutdown_timeout,
        backoff | retry_backoff,
        filters,
    );
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::sql::SqlDialect;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_empty() {
        // Given
        let input = "{}";
        let expected_output = NotifierConfig::default();

        // When
        let actual_output = serde_yml::from_str::<NotifierConfig>(input).unwrap();

        // Then
        assert_eq!(actual_output, expected_output);
    }

    #[test]
    fn from_string() {
        // Given
        let input = "\"https://errors.example.com/reports\"";
        let expected_output = NotifierConfig {
            endpoint: "https://errors.example.com/reports".to_string(),
            ..NotifierConfig::default()
        };

        // When
        let actual_output = serde_yml::from_str::<NotifierConfig>(input).unwrap();

        // Then
        assert_eq!(actual_output, expected_output);
    }

    #[test]
    fn from_full() {
        // Given
        let input = r#"
url: https://errors.example.com/reports
ApiKey: s3cr3t
env: production
ignore_environments: [Development, test]
retries: 5
queue-size: 50
overflow: reject_new
workers: 4
timeout: 3s
sync_timeout: 1s 500ms
shutdown_timeout: 10s
backoff:
    initial: 100ms
    max: 5s
    jitter: 0.0
    factor: 3
filters:
    - kind: sql
      dialect: mysql
"#;
        let expected_output = NotifierConfig {
            endpoint: "https://errors.example.com/reports".to_string(),
            api_key: "s3cr3t".into(),
            environment: Some("production".to_string()),
            ignore_environments: BTreeSet::from(["development".to_string(), "test".to_string()]),
            max_retries: 5,
            queue_capacity: 50,
            overflow_policy: OverflowPolicy::RejectNew,
            workers: 4,
            attempt_timeout: Duration::from_secs(3),
            sync_timeout: Duration::from_millis(1500),
            drain_timeout: Duration::from_secs(10),
            backoff: BackoffConfig::new(
                Duration::from_millis(100),
                Duration::from_secs(5),
                0.0,
                3.0,
            ),
            filters: vec![FilterSpec::Sql {
                dialect: SqlDialect::Mysql,
                priority: 0,
            }],
        };

        // When
        let actual_output = serde_yml::from_str::<NotifierConfig>(input).unwrap();

        // Then
        assert_eq!(actual_output, expected_output);
    }

    #[test]
    fn single_ignored_environment() {
        // When
        let config = serde_yml::from_str::<NotifierConfig>("ignore_environments: Test").unwrap();

        // Then
        assert!(config.ignore_environments().contains("test"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(serde_yml::from_str::<NotifierConfig>("endpoint: ''").is_err());
        assert!(serde_yml::from_str::<NotifierConfig>("queue_capacity: 0").is_err());
        assert!(serde_yml::from_str::<NotifierConfig>("workers: 0").is_err());
        assert!(serde_yml::from_str::<NotifierConfig>("timeout: soon").is_err());
        assert!(serde_yml::from_str::<NotifierConfig>("overflow: drop_all").is_err());
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        // Given
        let config = NotifierConfig::new("https://errors.example.com", "s3cr3t");

        // When
        let debug = format!("{:?}", config);

        // Then
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn sender_settings() {
        // Given
        let config = NotifierConfig::default()
            .with_max_retries(7)
            .with_timeouts(
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
            );

        // When
        let settings = config.sender_settings();

        // Then
        assert_eq!(settings.max_retries, 7);
        assert_eq!(settings.attempt_timeout, Duration::from_secs(1));
        assert_eq!(config.sync_timeout(), Duration::from_secs(2));
        assert_eq!(config.drain_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn default_retry_budget_exceeds_sync_timeout() {
        // Given
        let config = NotifierConfig::default();

        // When
        let budget = config.retry_wait_budget();

        // Then
        assert_eq!(budget, Duration::from_millis(750 + 1500 + 3000));
        assert!(budget > config.sync_timeout());
        assert_eq!(
            config.with_max_retries(0).retry_wait_budget(),
            Duration::ZERO,
        );
    }

    #[test]
    fn retry_budget_respects_max_interval() {
        // Given
        let config = NotifierConfig::default().with_backoff(BackoffConfig::new(
            Duration::from_secs(10),
            Duration::from_secs(15),
            0.0,
            2.0,
        ));

        // When
        let budget = config.retry_wait_budget();

        // Then
        assert_eq!(budget, Duration::from_secs(10 + 15 + 15));
    }
}
