use crate::facade::notifier::Inner;
use crate::facade::notifier::stats::{Counters, Listener, Outcomes};
use crate::integration::Capabilities;
use crate::{FilterSpec, Notifier, NotifierConfig, NotifierError};
use herald_config::ActiveEnvironment;
use herald_core::{Filter, FilterChain, Normalizer, Report};
use herald_delivery::{
    DeliveryQueue, DeliveryResult, HttpTransport, OutcomeSink, Sender, Transport, WorkerPool,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Assembles a [`Notifier`]: configuration, extra filters, capabilities and an
/// optional result listener.
pub struct NotifierBuilder {
    config: NotifierConfig,
    transport: Option<Arc<dyn Transport>>,
    filters: Vec<(Box<dyn Filter>, i32)>,
    listener: Option<Listener>,
    capabilities: Capabilities,
}

impl NotifierBuilder {
    pub(crate) fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            transport: None,
            filters: Vec::new(),
            listener: None,
            capabilities: Capabilities::default(),
        }
    }

    /// Replaces the HTTP transport built from the configured endpoint.
    pub fn transport(self, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            ..self
        }
    }

    /// Adds a filter to the chain, next to those declared in configuration.
    pub fn filter(mut self, filter: impl Filter + 'static, priority: i32) -> Self {
        self.filters.push((Box::new(filter), priority));

        self
    }

    /// Sets the callback receiving every terminal delivery result, from the
    /// background workers as well as from synchronous deliveries.
    pub fn listener<F>(self, listener: F) -> Self
    where
        F: Fn(&Report, &DeliveryResult) + Send + Sync + 'static,
    {
        Self {
            listener: Some(Arc::new(listener)),
            ..self
        }
    }

    /// Declares the integrations in use.
    pub fn capabilities(self, capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..self
        }
    }

    /// Assembles the filter chain and starts the delivery workers on the
    /// current tokio runtime.
    pub fn build(self) -> Result<Notifier, NotifierError> {
        tokio::runtime::Handle::try_current().map_err(NotifierError::NoRuntime)?;

        let config = self.config;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                config.endpoint(),
                config.api_key().clone(),
            )?),
        };

        let mut capabilities = self.capabilities;
        let mut chain = FilterChain::new();

        for spec in config.filters() {
            let filter = spec.build().map_err(|source| NotifierError::InvalidFilter {
                filter: describe(spec).to_string(),
                source,
            })?;
            chain.add_boxed_filter(filter, spec.priority());

            if let FilterSpec::Sql { dialect, .. } = spec {
                if capabilities.sql().is_none() {
                    capabilities = capabilities.with_sql(*dialect);
                }
            }
        }

        for (filter, priority) in self.filters {
            chain.add_boxed_filter(filter, priority);
        }

        capabilities
            .install(&mut chain)
            .map_err(|source| NotifierError::InvalidFilter {
                filter: "capabilities".to_string(),
                source,
            })?;

        let environment = config
            .environment()
            .unwrap_or_else(|| ActiveEnvironment::name())
            .to_string();
        let gated_environment = config
            .ignore_environments()
            .contains(&environment.to_ascii_lowercase())
            .then(|| environment.clone());

        if gated_environment.is_some() {
            info!(
                environment = environment.as_str(),
                "Environment is ignored; faults will not be reported",
            );
        }

        let counters = Arc::new(Counters::default());
        let outcomes = Arc::new(Outcomes {
            counters: counters.clone(),
            listener: self.listener,
        });

        let queue = Arc::new(DeliveryQueue::new(
            config.queue_capacity(),
            config.overflow_policy(),
        ));
        let sender = Sender::new(transport, config.sender_settings());
        let pool = WorkerPool::start(
            queue.clone(),
            sender.clone(),
            config.workers(),
            outcomes.clone() as Arc<dyn OutcomeSink>,
        );

        info!(
            environment = environment.as_str(),
            filters = chain.len(),
            workers = config.workers(),
            "Notifier started",
        );

        Ok(Notifier::from_inner(Inner {
            normalizer: Normalizer::new(Some(environment)),
            chain,
            gated_environment,
            queue,
            sender,
            sync_timeout: config.sync_timeout(),
            drain_timeout: config.drain_timeout(),
            pool: Mutex::new(Some(pool)),
            counters,
            outcomes,
            capabilities,
        }))
    }
}

fn describe(spec: &FilterSpec) -> &'static str {
    match spec {
        FilterSpec::KeysBlocklist { .. } => "keys_blocklist",
        FilterSpec::IgnoreKinds { .. } => "ignore_kinds",
        FilterSpec::Sql { .. } => "sql",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::sql::SqlDialect;
    use crate::{Skipped, Submission};
    use herald_core::{Context, RawFault};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn sql_filter_in_config_declares_capability() {
        // Given
        let config = NotifierConfig::default().with_filter(FilterSpec::Sql {
            dialect: SqlDialect::Mysql,
            priority: 0,
        });

        // When
        let notifier = Notifier::builder(config).build().unwrap();

        // Then
        assert_eq!(notifier.capabilities().sql(), Some(SqlDialect::Mysql));
    }

    #[tokio::test]
    async fn invalid_pattern_fails_build() {
        // Given
        let config = NotifierConfig::default().with_filter(FilterSpec::KeysBlocklist {
            keys: vec![],
            patterns: vec!["(".to_string()],
            priority: 0,
        });

        // When
        let built = Notifier::builder(config).build();

        // Then
        assert!(matches!(
            built,
            Err(NotifierError::InvalidFilter { ref filter, .. }) if filter == "keys_blocklist"
        ));
    }

    #[tokio::test]
    async fn invalid_endpoint_fails_build() {
        // When
        let built = Notifier::builder(NotifierConfig::new("not a url", "key")).build();

        // Then
        assert!(matches!(built, Err(NotifierError::Transport(_))));
    }

    #[tokio::test]
    async fn ignored_environment_gates_everything() {
        // Given
        let config = NotifierConfig::default()
            .with_environment("Staging")
            .with_ignored_environment("staging");
        let notifier = Notifier::builder(config).build().unwrap();

        // When
        let submission = notifier.notify(&RawFault::new("Boom", "it broke"), Context::new());

        // Then
        assert_eq!(
            submission,
            Submission::Skipped(Skipped::IgnoredEnvironment("Staging".to_string())),
        );
        assert_eq!(notifier.stats().ignored, 1);
    }
}
