//! Construct-once client handle and the live/stub selection.
//!
//! # Design
//! `ClientFactory` is created once at application startup and passed to
//! whatever needs a client. The first `get_instance` call decides between a
//! [`StubClient`] (testing mode: no server configured, or the test detector
//! fires) and a bootstrapped [`LiveClient`], and every later call returns that
//! same instance regardless of its arguments. Construction is serialised by a
//! mutex so the bootstrap sequence never runs twice for one factory.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::api::PadApi;
use crate::bootstrap::Bootstrap;
use crate::client::LiveClient;
use crate::config::{parse_flag, ClientConfig};
use crate::envelope::Params;
use crate::error::{ApiError, BootstrapError};
use crate::http::{HttpMethod, Transport};
use crate::security::{PrivateNetworkPolicy, SecurityPolicy};
use crate::transport::{TransportOptions, UreqTransport};
use crate::types::SessionSettings;

/// Environment variable that switches the factory into testing mode.
pub const TESTING_ENV_VAR: &str = "ETHERPAD_CLIENT_TESTING";

/// Reports whether the process runs under an automated test harness.
pub trait TestDetector: fmt::Debug + Send + Sync {
    fn is_test_environment(&self) -> bool;
}

/// Testing mode when [`TESTING_ENV_VAR`] holds a truthy value.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvTestDetector;

impl TestDetector for EnvTestDetector {
    fn is_test_environment(&self) -> bool {
        std::env::var(TESTING_ENV_VAR)
            .ok()
            .and_then(|value| parse_flag(TESTING_ENV_VAR, &value).ok())
            .unwrap_or(false)
    }
}

/// Stand-in used in testing mode. Never performs I/O; every call succeeds
/// with a fixed payload shaped like the real server's.
#[derive(Debug, Clone)]
pub struct StubClient {
    session: SessionSettings,
}

impl StubClient {
    pub fn new(session: SessionSettings) -> Self {
        Self { session }
    }
}

impl PadApi for StubClient {
    fn call(&self, function: &str, params: Params, _method: HttpMethod) -> Result<Value, ApiError> {
        debug!(function, "stub pad API call");
        let data = match function {
            "createGroup" | "createGroupIfNotExistsFor" => json!({ "groupID": "g.stub" }),
            "createGroupPad" => {
                let group = params.get("groupID").unwrap_or("g.stub");
                let name = params.get("padName").unwrap_or("stub");
                json!({ "padID": format!("{group}${name}") })
            }
            "createAuthor" | "createAuthorIfNotExistsFor" => json!({ "authorID": "a.stub" }),
            "createSession" => json!({ "sessionID": "s.stub" }),
            "getSessionInfo" => json!({ "groupID": "g.stub", "authorID": "a.stub", "validUntil": 0 }),
            "listPads" | "listPadsOfAuthor" => json!({ "padIDs": [] }),
            "listAllGroups" => json!({ "groupIDs": [] }),
            "listAuthorsOfPad" => json!({ "authorIDs": [] }),
            "getText" => json!({ "text": "" }),
            "getHTML" => json!({ "html": "" }),
            "getRevisionsCount" => json!({ "revisions": 0 }),
            "padUsersCount" => json!({ "padUsersCount": 0 }),
            "padUsers" => json!({ "padUsers": [] }),
            "getLastEdited" => json!({ "lastEdited": 0 }),
            "getReadOnlyID" => json!({ "readOnlyID": "r.stub" }),
            "getPublicStatus" => json!({ "publicStatus": false }),
            "isPasswordProtected" => json!({ "isPasswordProtected": false }),
            _ => Value::Null,
        };
        Ok(data)
    }

    fn session_settings(&self) -> &SessionSettings {
        &self.session
    }
}

/// The client handed out by [`ClientFactory`].
#[derive(Debug, Clone)]
pub enum PadClient {
    Live(LiveClient),
    Stub(StubClient),
}

impl PadClient {
    pub fn is_stub(&self) -> bool {
        matches!(self, PadClient::Stub(_))
    }
}

impl PadApi for PadClient {
    fn call(&self, function: &str, params: Params, method: HttpMethod) -> Result<Value, ApiError> {
        match self {
            PadClient::Live(client) => client.call(function, params, method),
            PadClient::Stub(client) => client.call(function, params, method),
        }
    }

    fn session_settings(&self) -> &SessionSettings {
        match self {
            PadClient::Live(client) => client.session_settings(),
            PadClient::Stub(client) => client.session_settings(),
        }
    }
}

pub struct ClientFactory {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    policy: Arc<dyn SecurityPolicy>,
    detector: Arc<dyn TestDetector>,
    instance: OnceLock<Arc<PadClient>>,
    init: Mutex<()>,
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("policy", &self.policy)
            .field("detector", &self.detector)
            .field("initialized", &self.instance.get().is_some())
            .finish()
    }
}

impl ClientFactory {
    /// Factory using [`UreqTransport`], [`PrivateNetworkPolicy`], and
    /// [`EnvTestDetector`].
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(TransportOptions::from_config(&config));
        Self {
            config,
            transport: Arc::new(transport),
            policy: Arc::new(PrivateNetworkPolicy),
            detector: Arc::new(EnvTestDetector),
            instance: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_security_policy(mut self, policy: Arc<dyn SecurityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_test_detector(mut self, detector: Arc<dyn TestDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Testing mode: no server URL configured, or the detector says so.
    pub fn is_testing(&self) -> bool {
        self.config.url.trim().is_empty() || self.detector.is_test_environment()
    }

    /// The client, if one has been constructed.
    pub fn instance(&self) -> Option<Arc<PadClient>> {
        self.instance.get().cloned()
    }

    /// Return the client, constructing it on first use.
    ///
    /// Only the first successful call's `api_key` and `base_url` are used. A
    /// failed bootstrap leaves the factory empty.
    pub fn get_instance(&self, api_key: &str, base_url: &str) -> Result<Arc<PadClient>, BootstrapError> {
        if let Some(client) = self.instance.get() {
            return Ok(Arc::clone(client));
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = self.instance.get() {
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(self.build(api_key, base_url)?);
        Ok(Arc::clone(self.instance.get_or_init(|| client)))
    }

    /// [`get_instance`](Self::get_instance) with the key and URL from the
    /// host configuration.
    pub fn get_configured_instance(&self) -> Result<Arc<PadClient>, BootstrapError> {
        self.get_instance(&self.config.api_key, &self.config.url)
    }

    fn build(&self, api_key: &str, base_url: &str) -> Result<PadClient, BootstrapError> {
        if self.is_testing() {
            info!("testing mode, using stub pad API client");
            return Ok(PadClient::Stub(StubClient::new(SessionSettings {
                domain: self.config.cookie_domain.clone(),
                lifetime_secs: self.config.cookie_lifetime_secs,
                secure: base_url.trim().starts_with("https://"),
            })));
        }

        Bootstrap::new(&self.config, Arc::clone(&self.transport), self.policy.as_ref())
            .connect(api_key, base_url)
            .map(PadClient::Live)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use url::Url;

    use super::*;
    use crate::testing::FakeTransport;
    use crate::types::SessionCookie;

    #[derive(Debug)]
    struct Detector(AtomicBool);

    impl TestDetector for Detector {
        fn is_test_environment(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug)]
    struct AllowAll;

    impl SecurityPolicy for AllowAll {
        fn is_blocked(&self, _url: &Url) -> bool {
            false
        }
    }

    fn config(url: &str) -> ClientConfig {
        ClientConfig {
            api_key: "secret".to_string(),
            url: url.to_string(),
            ..ClientConfig::default()
        }
    }

    fn factory(url: &str, testing: bool, transport: Arc<FakeTransport>) -> ClientFactory {
        ClientFactory::new(config(url))
            .with_transport(transport)
            .with_security_policy(Arc::new(AllowAll))
            .with_test_detector(Arc::new(Detector(AtomicBool::new(testing))))
    }

    fn healthy() -> Arc<FakeTransport> {
        FakeTransport::server("1.2.13", |_, _| Value::Null)
    }

    #[test]
    fn missing_url_selects_stub() {
        let transport = healthy();
        let client = factory("", false, transport.clone()).get_instance("secret", "").unwrap();
        assert!(client.is_stub());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn detector_selects_stub() {
        let transport = healthy();
        let client = factory("https://pad", true, transport.clone())
            .get_instance("secret", "https://pad")
            .unwrap();
        assert!(client.is_stub());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn production_mode_bootstraps_live_client() {
        let transport = healthy();
        let client = factory("https://pad", false, transport.clone())
            .get_instance("secret", "https://pad")
            .unwrap();
        assert!(!client.is_stub());
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn later_calls_return_the_same_instance() {
        let transport = healthy();
        let factory = factory("https://pad", false, transport.clone());

        let first = factory.get_instance("secret", "https://pad").unwrap();
        let second = factory.get_instance("other", "https://elsewhere").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &factory.instance().unwrap()));
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn concurrent_callers_bootstrap_once() {
        let transport = healthy();
        let factory = Arc::new(factory("https://pad", false, transport.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = Arc::clone(&factory);
                thread::spawn(move || factory.get_instance("secret", "https://pad").unwrap())
            })
            .collect();
        let clients: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(clients.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn failed_bootstrap_leaves_factory_empty() {
        let transport = healthy();
        let factory = factory("https://pad", false, transport);

        let err = factory.get_instance("", "https://pad").unwrap_err();
        assert!(matches!(err, BootstrapError::MissingApiKey));
        assert!(factory.instance().is_none());

        assert!(factory.get_instance("secret", "https://pad").is_ok());
    }

    #[test]
    fn configured_instance_uses_host_settings() {
        let transport = healthy();
        let factory = factory("https://pad", false, transport.clone());
        factory.get_configured_instance().unwrap();
        assert!(transport.requests()[1].url.contains("apikey=secret"));
    }

    #[test]
    fn stub_operations_succeed_without_io() {
        let stub = StubClient::new(SessionSettings {
            domain: String::new(),
            lifetime_secs: 60,
            secure: true,
        });
        assert_eq!(stub.create_group().unwrap(), "g.stub");
        assert_eq!(stub.create_group_pad("g.1", "notes", None).unwrap(), "g.1$notes");
        assert_eq!(stub.create_author_if_not_exists_for("u", None).unwrap(), "a.stub");
        assert_eq!(stub.get_text("p", None).unwrap(), "");
        assert_eq!(stub.get_revisions_count("p").unwrap(), 0);
        assert!(!stub.is_password_protected("p").unwrap());
        assert!(stub.list_sessions_of_group("g").unwrap().is_empty());
        assert_eq!(stub.get_author_name("a").unwrap(), None);
        stub.set_public_status("p", true).unwrap();
        stub.check_token().unwrap();

        let cookie = stub.create_session("g", "a", &|_: &SessionCookie| {}).unwrap();
        assert_eq!(cookie.value, "s.stub");
        assert!(cookie.secure);
    }
}
