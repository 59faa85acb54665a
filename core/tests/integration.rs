//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then bootstraps a client through
//! `ClientFactory` with the default ureq transport and exercises the pad API
//! over real HTTP.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::Arc;

use etherpad_core::{
    is_url_blocked, ApiError, BootstrapError, ClientConfig, ClientFactory, LegacyClient, PadApi,
    ResponseCode, SessionCookie, TestDetector,
};
use mock_server::{ServerConfig, DEFAULT_API_KEY};

#[derive(Debug)]
struct NeverTesting;

impl TestDetector for NeverTesting {
    fn is_test_environment(&self) -> bool {
        false
    }
}

/// Start the mock server on a random port and return its address.
fn start_server(config: ServerConfig) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, config).await
        })
        .unwrap();
    });

    addr
}

fn factory_for(addr: SocketAddr, api_key: &str, api_version: Option<&str>) -> ClientFactory {
    let config = ClientConfig {
        api_key: api_key.to_string(),
        url: format!("http://{addr}"),
        api_version: api_version.map(str::to_string),
        connect_timeout_ms: 5_000,
        timeout_ms: 10_000,
        ignore_security: true,
        ..ClientConfig::default()
    };
    ClientFactory::new(config).with_test_detector(Arc::new(NeverTesting))
}

#[test]
fn pad_lifecycle() {
    let addr = start_server(ServerConfig::default());
    let factory = factory_for(addr, DEFAULT_API_KEY, None);

    // Step 1: bootstrap.
    let client = factory.get_configured_instance().unwrap();
    assert!(!client.is_stub());
    client.check_token().unwrap();

    // Step 2: group and author.
    let group = client.create_group_if_not_exists_for("course-42").unwrap();
    assert_eq!(client.create_group_if_not_exists_for("course-42").unwrap(), group);
    assert!(client.list_all_groups().unwrap().contains(&group));

    let author = client.create_author_if_not_exists_for("user-7", Some("Ada")).unwrap();
    assert_eq!(client.get_author_name(&author).unwrap().as_deref(), Some("Ada"));

    // Step 3: group pad with initial text.
    let pad = client.create_group_pad(&group, "notes", Some("hello")).unwrap();
    assert_eq!(pad, format!("{group}$notes"));
    assert_eq!(client.list_pads(&group).unwrap(), vec![pad.clone()]);
    assert_eq!(client.get_text(&pad, None).unwrap(), "hello\n");

    // Step 4: edit and read history.
    client.set_text(&pad, "second draft").unwrap();
    assert_eq!(client.get_revisions_count(&pad).unwrap(), 1);
    assert_eq!(client.get_text(&pad, Some(0)).unwrap(), "hello\n");
    assert_eq!(client.get_text(&pad, None).unwrap(), "second draft\n");
    assert!(client.get_html(&pad, None).unwrap().contains("second draft"));

    client.set_html(&pad, "<p>from html</p>").unwrap();
    assert_eq!(client.get_text(&pad, None).unwrap(), "from html\n");
    assert!(client.get_last_edited(&pad).unwrap() > 0);
    assert!(client.get_read_only_id(&pad).unwrap().starts_with("r."));

    // Step 5: access control.
    assert!(!client.get_public_status(&pad).unwrap());
    client.set_public_status(&pad, true).unwrap();
    assert!(client.get_public_status(&pad).unwrap());

    assert!(!client.is_password_protected(&pad).unwrap());
    client.set_password(&pad, "hunter2").unwrap();
    assert!(client.is_password_protected(&pad).unwrap());

    assert_eq!(client.pad_users_count(&pad).unwrap(), 0);
    assert!(client.pad_users(&pad).unwrap().is_empty());
    client.send_clients_message(&pad, "hello everyone").unwrap();

    // Step 6: session with cookie.
    let cookies = RefCell::new(Vec::new());
    let sink = |cookie: &SessionCookie| cookies.borrow_mut().push(cookie.clone());
    let cookie = client.create_session(&group, &author, &sink).unwrap();
    assert_eq!(cookies.borrow().as_slice(), std::slice::from_ref(&cookie));
    assert!(!cookie.secure);

    let info = client.get_session_info(&cookie.value).unwrap();
    assert_eq!(info.group_id, group);
    assert_eq!(info.author_id, author);
    assert_eq!(info.valid_until, cookie.expires);

    let by_group = client.list_sessions_of_group(&group).unwrap();
    assert_eq!(by_group.get(&cookie.value), Some(&info));
    let by_author = client.list_sessions_of_author(&author).unwrap();
    assert!(by_author.contains_key(&cookie.value));

    client.delete_session(&cookie.value).unwrap();
    assert!(client.list_sessions_of_group(&group).unwrap().is_empty());

    // Step 7: teardown.
    client.delete_pad(&pad).unwrap();
    assert!(client.list_pads(&group).unwrap().is_empty());
    client.delete_group(&group).unwrap();
    assert!(!client.list_all_groups().unwrap().contains(&group));
}

#[test]
fn standalone_pads_and_author_listing() {
    let addr = start_server(ServerConfig::default());
    let client = factory_for(addr, DEFAULT_API_KEY, None)
        .get_configured_instance()
        .unwrap();

    let author = client.create_author(None).unwrap();
    assert_eq!(client.get_author_name(&author).unwrap(), None);

    client.create_pad("standalone", Some("text")).unwrap();
    assert_eq!(client.get_text("standalone", None).unwrap(), "text\n");
    assert!(client.list_pads_of_author(&author).unwrap().is_empty());
    assert!(client.list_authors_of_pad("standalone").unwrap().is_empty());

    let err = client.create_pad("standalone", None).unwrap_err();
    assert_eq!(err.remote_code(), Some(ResponseCode::InvalidParameters));
}

#[test]
fn remote_errors_are_structured() {
    let addr = start_server(ServerConfig::default());
    let client = factory_for(addr, DEFAULT_API_KEY, None)
        .get_configured_instance()
        .unwrap();

    match client.get_text("missing", None) {
        Err(ApiError::Remote { code, message }) => {
            assert_eq!(code, ResponseCode::InvalidParameters);
            assert_eq!(message, "padID does not exist");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn legacy_client_collapses_remote_errors() {
    let addr = start_server(ServerConfig::default());
    let client = factory_for(addr, DEFAULT_API_KEY, None)
        .get_configured_instance()
        .unwrap();
    let legacy = LegacyClient::new(&*client);

    assert!(!legacy.delete_pad("missing"));
    assert_eq!(legacy.get_text("missing", None), None);
    assert!(!legacy.is_password_protected("missing$pad"));

    assert!(legacy.create_pad("present", None));
    assert_eq!(legacy.get_text("present", None).as_deref(), Some("\n"));
}

#[test]
fn wrong_api_key_fails_bootstrap() {
    let addr = start_server(ServerConfig::default());
    let factory = factory_for(addr, "not-the-key", None);

    let err = factory.get_configured_instance().unwrap_err();
    match err {
        BootstrapError::InvalidApiKey(source) => {
            assert_eq!(source.remote_code(), Some(ResponseCode::InvalidApiKey));
        }
        other => panic!("expected InvalidApiKey, got {other:?}"),
    }
    assert!(factory.instance().is_none());
}

#[test]
fn newer_configured_version_is_unsupported() {
    let addr = start_server(ServerConfig::default());
    let factory = factory_for(addr, DEFAULT_API_KEY, Some("9.9"));

    match factory.get_configured_instance().unwrap_err() {
        BootstrapError::UnsupportedApiVersion { configured, server } => {
            assert_eq!(configured, "9.9");
            assert_eq!(server, mock_server::DEFAULT_VERSION);
        }
        other => panic!("expected UnsupportedApiVersion, got {other:?}"),
    }
}

#[test]
fn same_instance_after_first_bootstrap() {
    let addr = start_server(ServerConfig::default());
    let factory = factory_for(addr, DEFAULT_API_KEY, None);

    let first = factory.get_configured_instance().unwrap();
    let second = factory.get_instance("ignored", "http://ignored.invalid").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn loopback_server_url_is_blocked_by_default() {
    let addr = start_server(ServerConfig::default());
    let url = format!("http://{addr}");

    let reason = is_url_blocked(&url).unwrap();
    assert!(reason.contains("127.0.0.1"), "{reason}");

    let config = ClientConfig {
        api_key: DEFAULT_API_KEY.to_string(),
        url,
        ..ClientConfig::default()
    };
    let factory = ClientFactory::new(config).with_test_detector(Arc::new(NeverTesting));
    assert!(matches!(
        factory.get_configured_instance(),
        Err(BootstrapError::BlockedUrl(_))
    ));
}

#[test]
fn unreachable_server_is_unable_to_retrieve_version() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let factory = factory_for(addr, DEFAULT_API_KEY, None);

    assert!(matches!(
        factory.get_configured_instance(),
        Err(BootstrapError::UnableToRetrieveVersion(ApiError::Transport(_)))
    ));
}
