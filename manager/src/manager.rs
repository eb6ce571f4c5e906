//! The assembled trust manager: store, coordinator, evaluator and settings.

use std::sync::Arc;

use trustgate_store::KeyStore;
use trustgate_store_lmdb::LmdbEnvironment;
use trustgate_types::{Certificate, ForegroundHint, TrustError, TrustRecord};

use crate::config::ManagerConfig;
use crate::coordinator::DecisionCoordinator;
use crate::evaluator::{TrustEvaluator, Verdict};
use crate::hostname::{HostnameMatcher, HostnameVerifier};
use crate::provider::DecisionProvider;
use crate::settings::{AppSettings, Settings};
use crate::system::SystemTrust;
use crate::trust_store::TrustStore;
use crate::ManagerError;

/// Auth type reported to the system trust when the TLS layer gives none.
pub const DEFAULT_AUTH_TYPE: &str = "TLS";

/// One trust domain: every connection sharing a `TrustManager` shares its
/// decisions and its pending requests.
pub struct TrustManager {
    store: Arc<TrustStore>,
    coordinator: DecisionCoordinator,
    evaluator: TrustEvaluator,
    settings: Arc<dyn Settings>,
}

impl TrustManager {
    /// Open the LMDB key store under `config.data_dir` and assemble a manager
    /// on top of it.
    pub fn open(
        config: &ManagerConfig,
        system: Arc<dyn SystemTrust>,
        provider: Arc<dyn DecisionProvider>,
    ) -> Result<Self, ManagerError> {
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size)?;
        tracing::info!(path = %env.path().display(), "opened trust store");
        Ok(Self::with_key_store(
            config,
            Arc::new(env.key_store()),
            system,
            provider,
        ))
    }

    pub fn with_key_store(
        config: &ManagerConfig,
        key_store: Arc<dyn KeyStore>,
        system: Arc<dyn SystemTrust>,
        provider: Arc<dyn DecisionProvider>,
    ) -> Self {
        let store = Arc::new(TrustStore::new(key_store));
        let coordinator = DecisionCoordinator::with_timeout(Arc::clone(&store), config.user_timeout());
        let evaluator = TrustEvaluator::new(
            Arc::clone(&store),
            coordinator.clone(),
            system,
            provider,
        );
        let hint = config.interactive.then_some(ForegroundHint::Foreground);
        let settings: Arc<dyn Settings> =
            Arc::new(AppSettings::new(hint, config.trust_system_roots));

        Self {
            store,
            coordinator,
            evaluator,
            settings,
        }
    }

    /// Replace the settings derived from the config with host-owned state,
    /// e.g. an [`AppSettings`] the host updates as it moves in and out of the
    /// foreground.
    pub fn with_settings(mut self, settings: Arc<dyn Settings>) -> Self {
        self.settings = settings;
        self
    }

    /// Multi-threaded runtime for blocking checks made from threads that are
    /// not its workers.
    pub fn with_runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.evaluator = self.evaluator.with_runtime(handle);
        self
    }

    pub fn store(&self) -> &Arc<TrustStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &DecisionCoordinator {
        &self.coordinator
    }

    pub fn evaluator(&self) -> &TrustEvaluator {
        &self.evaluator
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    /// Evaluate `chain` using the current settings.
    pub async fn check_server_trusted(
        &self,
        chain: &[Certificate],
        auth_type: &str,
    ) -> Result<bool, TrustError> {
        self.evaluator
            .evaluate(
                chain,
                auth_type,
                self.settings.trust_system_roots(),
                self.settings.foreground_hint(),
            )
            .await
    }

    /// Blocking [`check_server_trusted`](Self::check_server_trusted).
    pub fn check_server_trusted_blocking(
        &self,
        chain: &[Certificate],
        auth_type: &str,
    ) -> Result<bool, TrustError> {
        self.evaluator.evaluate_blocking(
            chain,
            auth_type,
            self.settings.trust_system_roots(),
            self.settings.foreground_hint(),
        )
    }

    /// What an evaluation of `chain` would conclude without asking anyone.
    pub fn explain(&self, chain: &[Certificate], auth_type: &str) -> Result<Verdict, TrustError> {
        self.evaluator.explain(
            chain,
            auth_type,
            self.settings.trust_system_roots(),
            self.settings.foreground_hint(),
        )
    }

    /// Hostname verifier sharing this manager's trust store.
    pub fn hostname_verifier(&self, default: Option<Arc<dyn HostnameMatcher>>) -> HostnameVerifier {
        HostnameVerifier::new(Arc::clone(&self.store), default)
    }

    pub fn record(&self, cert: &Certificate) -> TrustRecord {
        self.store.record(cert)
    }

    /// Apply a decision made by the user outside of a provider future.
    pub fn submit_decision(&self, cert: &Certificate, trusted: bool) -> usize {
        self.coordinator.submit_decision(cert, trusted)
    }

    /// Forget all trust and distrust decisions.
    pub fn reset_certificates(&self) -> Result<(), TrustError> {
        self.store.try_clear_all_decisions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Basis;
    use crate::provider::PolicyDecisionProvider;
    use crate::system::RejectAllSystemTrust;

    fn config(dir: &std::path::Path) -> ManagerConfig {
        ManagerConfig {
            data_dir: dir.to_path_buf(),
            ..ManagerConfig::default()
        }
    }

    #[tokio::test]
    async fn decisions_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cert = Certificate::from_der(vec![0x30, 0x03, 0x01, 0x01, 0xff]);

        {
            let manager = TrustManager::open(
                &config(dir.path()),
                Arc::new(RejectAllSystemTrust),
                Arc::new(PolicyDecisionProvider::accept_all()),
            )
            .unwrap();
            assert!(manager.check_server_trusted(&[cert.clone()], DEFAULT_AUTH_TYPE).await.unwrap());
        }

        let settings = Arc::new(AppSettings::default());
        let manager = TrustManager::open(
            &config(dir.path()),
            Arc::new(RejectAllSystemTrust),
            Arc::new(PolicyDecisionProvider::reject_all()),
        )
        .unwrap()
        .with_settings(settings.clone());
        assert_eq!(manager.record(&cert), TrustRecord::UserTrusted);
        settings.set_foreground_hint(None);
        assert_eq!(
            manager.explain(&[cert.clone()], DEFAULT_AUTH_TYPE).unwrap(),
            Verdict::Accept(Basis::UserTrusted)
        );

        manager.reset_certificates().unwrap();
        assert_eq!(manager.record(&cert), TrustRecord::Unknown);
    }

    #[test]
    fn non_interactive_config_disables_prompts() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ManagerConfig {
            interactive: false,
            ..config(dir.path())
        };
        let manager = TrustManager::open(
            &config,
            Arc::new(RejectAllSystemTrust),
            Arc::new(PolicyDecisionProvider::accept_all()),
        )
        .unwrap();
        let cert = Certificate::from_der(vec![0x30, 0x00]);
        assert_eq!(
            manager.explain(&[cert], DEFAULT_AUTH_TYPE).unwrap(),
            Verdict::Reject(Basis::NonInteractive)
        );
    }
    fn accept_all(_: &[Certificate], _: &str) -> bool {
        true
    }

    struct Backgrounded;

    impl Settings for Backgrounded {
        fn foreground_hint(&self) -> Option<ForegroundHint> {
            Some(ForegroundHint::Background)
        }

        fn trust_system_roots(&self) -> bool {
            false
        }
    }

    #[test]
    fn host_settings_replace_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ManagerConfig {
            interactive: false,
            ..config(dir.path())
        };
        let manager = TrustManager::open(
            &config,
            Arc::new(accept_all),
            Arc::new(PolicyDecisionProvider::accept_all()),
        )
        .unwrap()
        .with_settings(Arc::new(Backgrounded));

        let cert = Certificate::from_der(vec![0x30, 0x01, 0x07]);
        assert_eq!(
            manager.explain(&[cert], DEFAULT_AUTH_TYPE).unwrap(),
            Verdict::NeedsDecision(ForegroundHint::Background)
        );
    }

    #[test]
    fn unusable_data_dir_is_an_lmdb_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("not-a-directory");
        std::fs::write(&file, b"occupied").unwrap();

        let result = TrustManager::open(
            &config(&file),
            Arc::new(RejectAllSystemTrust),
            Arc::new(PolicyDecisionProvider::reject_all()),
        );
        assert!(matches!(result, Err(ManagerError::Lmdb(_))));
    }
}
