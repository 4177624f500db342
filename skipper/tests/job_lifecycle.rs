//! Lifecycle state machine behavior exercised against the in-memory mock
//! backend, covering transitions the local adaptor cannot produce.

use std::time::Duration;

use skipper::{
    AdaptorModule, Engine, EngineConfig, ErrorKind, JobDescription, JobService, JobState, Session,
};
use skipper_testkit::{MockJobFactory, StaticModule};
use std::sync::Arc;

async fn mock_service(factory: &Arc<MockJobFactory>) -> JobService {
    let modules: Vec<Arc<dyn AdaptorModule>> = vec![Arc::new(StaticModule::new(
        "test.mock",
        vec![factory.descriptor("mock", ["mock"])],
    ))];
    Engine::load(&EngineConfig::default(), &modules)
        .job_service("mock://backend", &Session::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn suspend_and_resume_cycle() {
    let factory = MockJobFactory::with_job(Duration::from_secs(30), 0);
    let service = mock_service(&factory).await;
    let job = service
        .create_job(JobDescription::new("/bin/work"))
        .await
        .unwrap();
    job.run().await.unwrap();
    assert_eq!(job.state(), JobState::Running);

    job.suspend().await.unwrap();
    assert_eq!(job.state(), JobState::Suspended);

    // only resume is valid from Suspended
    let err = job.suspend().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectState);

    job.resume().await.unwrap();
    assert_eq!(job.state(), JobState::Running);

    let err = job.resume().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectState);

    job.cancel().await.unwrap();
    assert_eq!(job.state(), JobState::Canceled);
}

#[tokio::test]
async fn resume_before_suspend_is_an_incorrect_state() {
    let factory = MockJobFactory::with_job(Duration::from_secs(30), 0);
    let service = mock_service(&factory).await;
    let job = service
        .create_job(JobDescription::new("/bin/work"))
        .await
        .unwrap();
    job.run().await.unwrap();

    let err = job.resume().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectState);
    assert_eq!(job.state(), JobState::Running);
}

#[tokio::test]
async fn failed_cancel_leaves_the_job_running() {
    let factory = MockJobFactory::with_unreachable_cancel(Duration::from_secs(30));
    let service = mock_service(&factory).await;
    let job = service
        .create_job(JobDescription::new("/bin/work"))
        .await
        .unwrap();
    job.run().await.unwrap();

    let err = job.cancel().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuccess);
    // the handle still tracks a live job
    assert_eq!(job.state(), JobState::Running);
}

#[tokio::test]
async fn zero_timeout_polls_the_current_state() {
    let factory = MockJobFactory::with_job(Duration::from_secs(30), 0);
    let service = mock_service(&factory).await;
    let job = service
        .create_job(JobDescription::new("/bin/work"))
        .await
        .unwrap();
    job.run().await.unwrap();

    assert!(!job.wait(Some(Duration::ZERO)).await.unwrap());

    job.cancel().await.unwrap();
    assert!(job.wait(Some(Duration::ZERO)).await.unwrap());
}

#[tokio::test]
async fn completion_is_observed_through_wait() {
    let factory = MockJobFactory::with_job(Duration::from_millis(50), 7);
    let service = mock_service(&factory).await;
    let job = service
        .create_job(JobDescription::new("/bin/work"))
        .await
        .unwrap();
    job.run().await.unwrap();
    assert_eq!(job.execution_hosts(), ["mock-host"]);

    assert!(job.wait(Some(Duration::from_secs(5))).await.unwrap());
    assert_eq!(job.state(), JobState::Done);
    assert_eq!(job.exit_code(), Some(7));
    // finished jobs are no longer visible at the endpoint
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn late_completion_does_not_overwrite_a_cancel() {
    let factory = MockJobFactory::with_job(Duration::from_millis(50), 0);
    let service = mock_service(&factory).await;
    let job = service
        .create_job(JobDescription::new("/bin/work"))
        .await
        .unwrap();
    job.run().await.unwrap();
    job.cancel().await.unwrap();
    assert_eq!(job.state(), JobState::Canceled);

    // the scripted completion fires after the cancel; terminal states stick
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(job.state(), JobState::Canceled);
    assert!(job.exit_code().is_none());
}

#[tokio::test]
async fn subscribers_see_every_transition() {
    let factory = MockJobFactory::with_job(Duration::from_millis(50), 0);
    let service = mock_service(&factory).await;
    let job = service
        .create_job(JobDescription::new("/bin/work"))
        .await
        .unwrap();

    let mut rx = job.subscribe();
    assert_eq!(rx.borrow().state, JobState::New);

    job.run().await.unwrap();
    rx.wait_for(|info| info.state == JobState::Running)
        .await
        .unwrap();

    rx.wait_for(|info| info.state.is_terminal()).await.unwrap();
    assert_eq!(job.state(), JobState::Done);
}
