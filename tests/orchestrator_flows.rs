//! 安装 / 运行 / 卸载流程测试
//!
//! 宿主使用 mockall 生成的连接器，其余协作者为 common 中的假实现。

mod common;

use common::{weather_definition, FakeEngine, FakeFetcher, MemorySecretStore, ScriptedPrompter, StaticCatalog};
use mockall::mock;
use pretty_assertions::assert_eq;
use smp::{
    Collaborators, EnvValue, ErrorCategory, HostConnector, HostError, HostRegistry, InstallOptions,
    InstalledState, Orchestrator, SmpError, StateStore,
};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

mock! {
    pub Host {}

    impl HostConnector for Host {
        fn name(&self) -> &str;
        fn available(&self) -> bool;
        fn connect(&self, executable: &Path, server: &str) -> Result<(), HostError>;
        fn disconnect(&self, server: &str) -> Result<bool, HostError>;
    }
}

const EXECUTABLE: &str = "/usr/local/bin/smp";

fn host(name: &str) -> MockHost {
    let mut mock = MockHost::new();
    mock.expect_name().return_const(name.to_string());
    mock.expect_available().return_const(true);
    mock
}

fn write_failure(host: &str) -> HostError {
    HostError::Write {
        path: PathBuf::from(format!("/hosts/{}.json", host)),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only file system"),
    }
}

struct Fixture {
    temp: TempDir,
    store: StateStore,
    catalog: StaticCatalog,
    fetcher: FakeFetcher,
    engine: FakeEngine,
    secrets: MemorySecretStore,
    prompter: ScriptedPrompter,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("home"));
        Self {
            store,
            catalog: StaticCatalog::with([weather_definition()]),
            fetcher: FakeFetcher::default(),
            engine: FakeEngine::default(),
            secrets: MemorySecretStore::default(),
            prompter: ScriptedPrompter::new(&[("API_REGION", "eu-west-1"), ("API_KEY", "s3cr3t")]),
            temp,
        }
    }

    fn orchestrator<'a>(&'a self, hosts: &'a HostRegistry) -> Orchestrator<'a> {
        Orchestrator::new(Collaborators {
            catalog: &self.catalog,
            store: &self.store,
            fetcher: &self.fetcher,
            engine: &self.engine,
            secrets: &self.secrets,
            hosts,
            prompter: &self.prompter,
        })
        .with_scratch_root(self.temp.path())
    }
}

#[test]
fn install_tolerates_a_failing_host() {
    let fx = Fixture::new();

    let mut a = host("A");
    a.expect_connect()
        .withf(|exe, server| exe.to_str() == Some(EXECUTABLE) && server.to_string() == "weather")
        .times(1)
        .returning(|_, _| Ok(()));
    let mut b = host("B");
    b.expect_connect()
        .times(1)
        .returning(|_, _| Err(write_failure("B")));

    let mut registry = HostRegistry::new(EXECUTABLE);
    registry.register(Box::new(a));
    registry.register(Box::new(b));

    let report = fx
        .orchestrator(&registry)
        .install("weather", &InstallOptions::default())
        .unwrap();

    assert_eq!(report.tag, "mcp-weather:latest");
    assert_eq!(report.connected, vec!["A".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "B");

    let state = fx.store.load("weather").unwrap();
    assert_eq!(state.configured_hosts, vec!["A".to_string()]);
    assert_eq!(state.local_image_tag, "mcp-weather:latest");
    assert_eq!(
        state.env("API_REGION"),
        Some(&EnvValue::Plain("eu-west-1".into()))
    );
    assert_eq!(
        state.env("API_KEY"),
        Some(&EnvValue::SecretRef("weather_API_KEY".into()))
    );
    assert_eq!(fx.secrets.get("weather_API_KEY").as_deref(), Some("s3cr3t"));
    assert_eq!(
        fx.fetcher.fetched.borrow().as_slice(),
        &[(
            "https://example.com/weather-mcp.git".to_string(),
            Some("main".to_string())
        )]
    );
}

#[test]
fn uninstall_stops_at_the_first_failing_host() {
    let fx = Fixture::new();

    let mut state = InstalledState::new("weather");
    state.set_local_image_tag("mcp-weather:latest");
    state.set_env("API_KEY", EnvValue::SecretRef("weather_API_KEY".into()));
    state.record_host("A");
    state.record_host("B");
    fx.store.save(&state).unwrap();
    fx.secrets
        .values
        .borrow_mut()
        .insert("weather_API_KEY".into(), "s3cr3t".into());

    let mut a = host("A");
    a.expect_disconnect()
        .times(1)
        .returning(|_| Err(write_failure("A")));
    let mut b = host("B");
    b.expect_disconnect().times(0);

    let mut registry = HostRegistry::new(EXECUTABLE);
    registry.register(Box::new(a));
    registry.register(Box::new(b));

    let err = fx.orchestrator(&registry).uninstall("weather").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Persistence);

    // image removal happens before any host is touched
    assert_eq!(fx.engine.removed.borrow().as_slice(), &["mcp-weather:latest".to_string()]);
    assert_eq!(fx.store.load("weather").unwrap(), state);
    assert!(fx.secrets.get("weather_API_KEY").is_some());
}

#[test]
fn uninstall_cleans_up_everything_on_success() {
    let fx = Fixture::new();

    let mut state = InstalledState::new("weather");
    state.set_local_image_tag("mcp-weather:latest");
    state.set_env("API_KEY", EnvValue::SecretRef("weather_API_KEY".into()));
    state.record_host("A");
    state.record_host("B");
    fx.store.save(&state).unwrap();
    fx.secrets
        .values
        .borrow_mut()
        .insert("weather_API_KEY".into(), "s3cr3t".into());

    let mut a = host("A");
    a.expect_disconnect().times(1).returning(|_| Ok(true));
    let mut b = host("B");
    // entry already removed by hand: not an error
    b.expect_disconnect().times(1).returning(|_| Ok(false));

    let mut registry = HostRegistry::new(EXECUTABLE);
    registry.register(Box::new(a));
    registry.register(Box::new(b));

    let report = fx.orchestrator(&registry).uninstall("weather").unwrap();
    assert_eq!(
        report.disconnected,
        vec![("A".to_string(), true), ("B".to_string(), false)]
    );
    assert_eq!(report.removed_secrets, 1);
    assert!(fx.secrets.get("weather_API_KEY").is_none());
    assert!(fx.store.list().unwrap().is_empty());
}

#[test]
fn image_removal_failure_aborts_before_hosts() {
    let mut fx = Fixture::new();
    fx.engine.fail_remove = true;

    let mut state = InstalledState::new("weather");
    state.set_local_image_tag("mcp-weather:latest");
    state.record_host("A");
    fx.store.save(&state).unwrap();

    let mut a = host("A");
    a.expect_disconnect().times(0);
    let mut registry = HostRegistry::new(EXECUTABLE);
    registry.register(Box::new(a));

    let err = fx.orchestrator(&registry).uninstall("weather").unwrap_err();
    assert!(matches!(err, SmpError::Engine(_)));
    assert_eq!(fx.store.load("weather").unwrap(), state);
}

#[test]
fn run_resolves_secret_references() {
    let fx = Fixture::new();
    let registry = HostRegistry::new(EXECUTABLE);

    let mut state = InstalledState::new("weather");
    state.set_local_image_tag("mcp-weather:latest");
    state.set_env("API_REGION", EnvValue::Plain("eu-west-1".into()));
    state.set_env("API_KEY", EnvValue::SecretRef("weather_API_KEY".into()));
    fx.store.save(&state).unwrap();
    fx.secrets
        .values
        .borrow_mut()
        .insert("weather_API_KEY".into(), "s3cr3t".into());

    fx.orchestrator(&registry).run("weather").unwrap();

    let runs = fx.engine.runs.borrow();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, "mcp-weather:latest");
    assert_eq!(runs[0].1.get("API_KEY").map(String::as_str), Some("s3cr3t"));
    assert_eq!(runs[0].1.get("API_REGION").map(String::as_str), Some("eu-west-1"));
}

#[test]
fn run_fails_when_a_secret_is_missing() {
    let fx = Fixture::new();
    let registry = HostRegistry::new(EXECUTABLE);

    let mut state = InstalledState::new("weather");
    state.set_local_image_tag("mcp-weather:latest");
    state.set_env("API_KEY", EnvValue::SecretRef("weather_API_KEY".into()));
    fx.store.save(&state).unwrap();

    let err = fx.orchestrator(&registry).run("weather").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Secret);
    assert!(fx.engine.runs.borrow().is_empty());
}

#[test]
fn run_requires_a_built_image() {
    let fx = Fixture::new();
    let registry = HostRegistry::new(EXECUTABLE);

    let err = fx.orchestrator(&registry).run("weather").unwrap_err();
    assert!(matches!(err, SmpError::NotInstalled(name) if name == "weather"));
}

#[test]
fn unknown_definition_is_a_resolution_error() {
    let fx = Fixture::new();
    let registry = HostRegistry::new(EXECUTABLE);

    let err = fx
        .orchestrator(&registry)
        .install("nope", &InstallOptions::default())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resolution);
    assert!(fx.engine.builds.borrow().is_empty());
}

#[test]
fn build_failure_leaves_no_tag() {
    let mut fx = Fixture::new();
    fx.engine.fail_build = true;
    let registry = HostRegistry::new(EXECUTABLE);

    let err = fx
        .orchestrator(&registry)
        .install("weather", &InstallOptions::default())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Build);
    assert!(!fx.store.load("weather").unwrap().is_built());
}

#[test]
fn reinstall_keeps_earlier_answers_and_hosts() {
    let fx = Fixture::new();

    let mut state = InstalledState::new("weather");
    state.set_env("API_REGION", EnvValue::Plain("us-east-1".into()));
    state.set_env("API_KEY", EnvValue::SecretRef("weather_API_KEY".into()));
    state.record_host("A");
    fx.store.save(&state).unwrap();

    let mut a = host("A");
    // same executable already configured: idempotent success
    a.expect_connect().times(1).returning(|_, _| Ok(()));
    let mut registry = HostRegistry::new(EXECUTABLE);
    registry.register(Box::new(a));

    fx.orchestrator(&registry)
        .install("weather", &InstallOptions::default())
        .unwrap();

    assert!(fx.prompter.asked.borrow().is_empty());
    let state = fx.store.load("weather").unwrap();
    assert_eq!(state.configured_hosts, vec!["A".to_string()]);
    assert_eq!(state.env("API_REGION"), Some(&EnvValue::Plain("us-east-1".into())));
}

#[test]
fn explicit_values_skip_prompts_and_secure_store_can_be_declined() {
    let fx = Fixture::new();
    let registry = HostRegistry::new(EXECUTABLE);

    let options = InstallOptions {
        env: [
            ("API_REGION".to_string(), "ap-south-1".to_string()),
            ("API_KEY".to_string(), "inline".to_string()),
        ]
        .into_iter()
        .collect(),
        secure_store: false,
        ..InstallOptions::default()
    };

    fx.orchestrator(&registry).install("weather", &options).unwrap();

    assert!(fx.prompter.asked.borrow().is_empty());
    let state = fx.store.load("weather").unwrap();
    assert_eq!(state.env("API_KEY"), Some(&EnvValue::Plain("inline".into())));
    assert!(fx.secrets.values.borrow().is_empty());
}

#[test]
fn missing_required_value_fails_install() {
    let mut fx = Fixture::new();
    fx.prompter = ScriptedPrompter::new(&[("API_REGION", "eu-west-1")]);
    let registry = HostRegistry::new(EXECUTABLE);

    let err = fx
        .orchestrator(&registry)
        .install("weather", &InstallOptions::default())
        .unwrap_err();
    assert!(matches!(err, SmpError::MissingValue(var) if var == "API_KEY"));
}

#[test]
fn explicit_unknown_host_is_reported_not_fatal() {
    let fx = Fixture::new();
    let mut a = host("A");
    a.expect_connect().times(1).returning(|_, _| Ok(()));
    let mut registry = HostRegistry::new(EXECUTABLE);
    registry.register(Box::new(a));

    let options = InstallOptions {
        hosts: Some(vec!["A".into(), "vim".into()]),
        ..InstallOptions::default()
    };
    let report = fx.orchestrator(&registry).install("weather", &options).unwrap();

    assert_eq!(report.connected, vec!["A".to_string()]);
    assert!(matches!(report.failed[0].1, HostError::UnknownHost(ref name) if name == "vim"));
}

#[test]
fn explicit_host_that_is_not_installed_is_skipped() {
    let fx = Fixture::new();
    let mut missing = MockHost::new();
    missing.expect_name().return_const("C".to_string());
    missing.expect_available().return_const(false);
    missing.expect_connect().times(0);
    let mut registry = HostRegistry::new(EXECUTABLE);
    registry.register(Box::new(missing));

    let options = InstallOptions {
        hosts: Some(vec!["C".into()]),
        ..InstallOptions::default()
    };
    let report = fx.orchestrator(&registry).install("weather", &options).unwrap();

    assert!(report.connected.is_empty());
    assert!(matches!(report.failed[0].1, HostError::Unavailable(ref name) if name == "C"));
    assert!(fx.store.load("weather").unwrap().configured_hosts.is_empty());
}

#[test]
fn plain_value_replacing_a_secret_reference_drops_the_stored_secret() {
    let fx = Fixture::new();
    let registry = HostRegistry::new(EXECUTABLE);
    let orchestrator = fx.orchestrator(&registry);

    orchestrator.install("weather", &InstallOptions::default()).unwrap();
    assert_eq!(fx.secrets.get("weather_API_KEY").as_deref(), Some("s3cr3t"));

    let options = InstallOptions {
        env: [("API_KEY".to_string(), "second".to_string())].into_iter().collect(),
        secure_store: false,
        ..InstallOptions::default()
    };
    orchestrator.install("weather", &options).unwrap();

    assert_eq!(fx.secrets.get("weather_API_KEY"), None);
    let state = fx.store.load("weather").unwrap();
    assert_eq!(state.env("API_KEY"), Some(&EnvValue::Plain("second".into())));

    let report = orchestrator.uninstall("weather").unwrap();
    assert_eq!(report.removed_secrets, 0);
    assert!(fx.secrets.values.borrow().is_empty());
}

#[test]
fn test_run_reuses_saved_plain_values() {
    let fx = Fixture::new();
    let mut state = InstalledState::new("weather");
    state.set_env("API_REGION", EnvValue::Plain("us-east-1".into()));
    state.set_env("API_KEY", EnvValue::SecretRef("weather_API_KEY".into()));
    fx.store.save(&state).unwrap();

    let registry = HostRegistry::new(EXECUTABLE);
    fx.orchestrator(&registry)
        .build_and_test_run("weather", &InstallOptions::default())
        .unwrap();

    assert_eq!(fx.prompter.asked.borrow().as_slice(), &["API_KEY".to_string()]);
    let runs = fx.engine.runs.borrow();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].1["API_REGION"], "us-east-1");
    assert_eq!(runs[0].1["API_KEY"], "s3cr3t");
    // the saved record keeps its secret reference
    assert_eq!(
        fx.store.load("weather").unwrap().env("API_KEY"),
        Some(&EnvValue::SecretRef("weather_API_KEY".into()))
    );
}
