//! Engine load and binding behavior: candidate order, declines, fail-fast
//! propagation, configuration-driven disabling, and context resolution.

use std::sync::Arc;

use skipper::adaptors::MyProxyModule;
use skipper::{
    AdaptorModule, Capability, Context, CredentialProvider, Engine, EngineConfig, ErrorKind,
    JobDescription, Session, SkipReason,
};
use skipper_testkit::{MockCredentialProvider, MockJobFactory, ProviderBehavior, StaticModule};

fn engine_with(modules: Vec<Arc<dyn AdaptorModule>>) -> Engine {
    Engine::load(&EngineConfig::default(), &modules)
}

#[tokio::test]
async fn first_registered_candidate_is_tried_first() {
    let first = MockJobFactory::accepting();
    let second = MockJobFactory::accepting();
    let engine = engine_with(vec![
        Arc::new(StaticModule::new(
            "test.first",
            vec![first.descriptor("first", ["test"])],
        )),
        Arc::new(StaticModule::new(
            "test.second",
            vec![second.descriptor("second", ["test"])],
        )),
    ]);

    let service = engine
        .job_service("test://somewhere", &Session::new())
        .await
        .unwrap();
    assert_eq!(service.url().scheme(), "test");
    assert_eq!(first.bind_attempts(), 1);
    assert_eq!(second.bind_attempts(), 0);
}

#[tokio::test]
async fn decline_advances_to_the_next_candidate() {
    let first = MockJobFactory::declining("endpoint not applicable");
    let second = MockJobFactory::accepting();
    let engine = engine_with(vec![
        Arc::new(StaticModule::new(
            "test.first",
            vec![first.descriptor("first", ["test"])],
        )),
        Arc::new(StaticModule::new(
            "test.second",
            vec![second.descriptor("second", ["test"])],
        )),
    ]);

    let service = engine
        .job_service("test://somewhere", &Session::new())
        .await
        .unwrap();
    assert_eq!(first.bind_attempts(), 1);
    assert_eq!(second.bind_attempts(), 1);

    // the bound service is live
    let job = service
        .create_job(JobDescription::new("/bin/true"))
        .await
        .unwrap();
    assert_eq!(job.state(), skipper::JobState::New);
}

#[tokio::test]
async fn operational_bind_error_aborts_the_scan() {
    let first = MockJobFactory::failing(ErrorKind::NoSuccess, "backend unreachable");
    let second = MockJobFactory::accepting();
    let engine = engine_with(vec![
        Arc::new(StaticModule::new(
            "test.first",
            vec![first.descriptor("first", ["test"])],
        )),
        Arc::new(StaticModule::new(
            "test.second",
            vec![second.descriptor("second", ["test"])],
        )),
    ]);

    let err = engine
        .job_service("test://somewhere", &Session::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuccess);
    assert_eq!(first.bind_attempts(), 1);
    assert_eq!(second.bind_attempts(), 0);
}

#[tokio::test]
async fn all_candidates_declining_resolves_to_not_found() {
    let factories: Vec<_> = (0..3)
        .map(|i| MockJobFactory::declining(format!("decline {i}")))
        .collect();
    let modules: Vec<Arc<dyn AdaptorModule>> = factories
        .iter()
        .enumerate()
        .map(|(i, f)| {
            Arc::new(StaticModule::new(
                format!("test.{i}"),
                vec![f.descriptor(format!("adaptor-{i}"), ["test"])],
            )) as Arc<dyn AdaptorModule>
        })
        .collect();
    let engine = Engine::load(&EngineConfig::default(), &modules);

    let err = engine
        .job_service("test://somewhere", &Session::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    for factory in &factories {
        assert_eq!(factory.bind_attempts(), 1);
    }
}

#[tokio::test]
async fn lone_acceptor_wins_regardless_of_position() {
    let decline_a = MockJobFactory::declining("not me");
    let decline_b = MockJobFactory::declining("not me either");
    let acceptor = MockJobFactory::accepting();
    let engine = engine_with(vec![Arc::new(StaticModule::new(
        "test.all",
        vec![
            decline_a.descriptor("a", ["test"]),
            decline_b.descriptor("b", ["test"]),
            acceptor.descriptor("c", ["test"]),
        ],
    ))]);

    engine
        .job_service("test://somewhere", &Session::new())
        .await
        .unwrap();
    assert_eq!(decline_a.bind_attempts(), 1);
    assert_eq!(decline_b.bind_attempts(), 1);
    assert_eq!(acceptor.bind_attempts(), 1);
}

#[tokio::test]
async fn unknown_scheme_is_not_found() {
    let engine = engine_with(vec![]);
    let err = engine
        .job_service("gram://grid.example.org", &Session::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn malformed_url_is_a_bad_parameter() {
    let engine = engine_with(vec![]);
    let err = engine
        .job_service("not a url", &Session::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadParameter);
}

#[tokio::test]
async fn disabling_a_module_removes_all_its_schemes() {
    let factory = MockJobFactory::accepting();
    let modules: Vec<Arc<dyn AdaptorModule>> = vec![Arc::new(StaticModule::new(
        "test.disabled",
        vec![factory.descriptor("adaptor", ["test", "other"])],
    ))];
    let config = EngineConfig::new().disable("test.disabled");
    let engine = Engine::load(&config, &modules);

    for url in ["test://host", "other://host"] {
        let err = engine.job_service(url, &Session::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    assert_eq!(factory.bind_attempts(), 0);
    assert_eq!(engine.skipped().len(), 1);
    assert_eq!(engine.skipped()[0].reason, SkipReason::Disabled);
    assert_eq!(engine.skipped()[0].module, "test.disabled");
}

#[tokio::test]
async fn registration_failure_is_recovered_locally() {
    let good = MockJobFactory::accepting();
    let engine = engine_with(vec![
        Arc::new(StaticModule::failing("test.broken", "platform check blew up")),
        Arc::new(StaticModule::new(
            "test.good",
            vec![good.descriptor("good", ["test"])],
        )),
    ]);

    // the broken module is skipped, the engine stays usable
    engine
        .job_service("test://somewhere", &Session::new())
        .await
        .unwrap();
    assert_eq!(engine.skipped().len(), 1);
    assert_eq!(engine.skipped()[0].reason, SkipReason::Failed);
}

#[tokio::test]
async fn module_self_decline_is_recorded() {
    let engine = engine_with(vec![Arc::new(StaticModule::declining("test.absent"))]);
    assert!(engine.list_loaded().is_empty());
    assert_eq!(engine.skipped().len(), 1);
    assert_eq!(engine.skipped()[0].reason, SkipReason::Declined);
}

#[tokio::test]
async fn list_loaded_reflects_registration_order() {
    let first = MockJobFactory::declining("x");
    let second = MockJobFactory::declining("x");
    let engine = engine_with(vec![
        Arc::new(StaticModule::new(
            "test.first",
            vec![first.descriptor("alpha", ["test"])],
        )),
        Arc::new(StaticModule::new(
            "test.second",
            vec![second.descriptor("beta", ["test"])],
        )),
    ]);

    let entries = engine.list_loaded();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].capability, Capability::Job);
    assert_eq!(entries[0].scheme, "test");
    assert_eq!(entries[0].adaptors, ["alpha", "beta"]);
}

#[tokio::test]
async fn context_initialization_attaches_derived_context() {
    let provider = Arc::new(MockCredentialProvider::new(ProviderBehavior::Succeed));
    let store = tempfile::tempdir().unwrap();
    let modules: Vec<Arc<dyn AdaptorModule>> = vec![Arc::new(
        MyProxyModule::with_provider(Arc::clone(&provider) as Arc<dyn CredentialProvider>)
            .with_store(store.path()),
    )];
    let engine = Engine::load(&EngineConfig::default(), &modules);

    let session = Session::new();
    let context = Context::new("MyProxy")
        .with_server("myproxy.example.org:7512")
        .with_user_id("alice")
        .with_user_pass("secret")
        .with_life_time(12);
    engine.initialize_context(&session, context).await.unwrap();

    let contexts = session.contexts();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].context_type(), "X509");
    assert_eq!(contexts[0].life_time(), Some(12));
    let proxy = contexts[0].user_proxy().unwrap();
    assert!(proxy.starts_with(store.path()));
    assert!(proxy.exists());

    // attribute values arrived as discrete fields, not a command string
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].server.as_deref(), Some("myproxy.example.org"));
    assert_eq!(requests[0].port, Some(7512));
    assert_eq!(requests[0].user_id.as_deref(), Some("alice"));
    assert_eq!(requests[0].life_time, Some(12));
}

#[tokio::test]
async fn rejected_credential_leaves_the_session_untouched() {
    let provider = Arc::new(MockCredentialProvider::new(ProviderBehavior::Reject(
        "invalid password\n".to_string(),
    )));
    let store = tempfile::tempdir().unwrap();
    let modules: Vec<Arc<dyn AdaptorModule>> = vec![Arc::new(
        MyProxyModule::with_provider(provider).with_store(store.path()),
    )];
    let engine = Engine::load(&EngineConfig::default(), &modules);

    let session = Session::new();
    let err = engine
        .initialize_context(&session, Context::new("myproxy").with_user_id("alice"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuccess);
    // the tool's diagnostic output is carried for operator debugging
    assert!(err.message().contains("invalid password"));
    assert!(session.is_empty());
}

#[tokio::test]
async fn mismatched_context_type_resolves_to_not_found() {
    let provider = Arc::new(MockCredentialProvider::new(ProviderBehavior::Succeed));
    let modules: Vec<Arc<dyn AdaptorModule>> =
        vec![Arc::new(MyProxyModule::with_provider(provider))];
    let engine = Engine::load(&EngineConfig::default(), &modules);

    let session = Session::new();
    let err = engine
        .initialize_context(&session, Context::new("X.509"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(session.is_empty());
}

#[tokio::test]
async fn default_engine_registers_builtin_adaptors() {
    let engine = Engine::with_defaults();
    let entries = engine.list_loaded();

    let schemes: Vec<&str> = entries.iter().map(|e| e.scheme.as_str()).collect();
    assert!(schemes.contains(&"fork"));
    assert!(schemes.contains(&"local"));
    assert!(schemes.contains(&"myproxy"));
}
