mod common;

use std::sync::Arc;

use common::FakeDevice;
use droidmux::action::Action;
use droidmux::device::DeviceBinding;
use droidmux::session::{Session, SessionState};
use uuid::Uuid;

fn session_on(fake: Arc<FakeDevice>, serial: &str) -> Session {
    Session::new(
        Uuid::new_v4(),
        DeviceBinding::new(serial),
        fake,
        None,
    )
}

#[tokio::test]
async fn state_tracks_the_lifecycle() {
    let fake = Arc::new(FakeDevice::new());
    let mut session = session_on(fake, "emulator-5554");
    assert_eq!(session.state(), SessionState::Created);
    assert!(session.last_observation().is_none());

    let obs = session.step(&Action::Click { x: 10, y: 20 }).await.unwrap();
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.last_observation(), Some(&obs));

    let snapshot_ref = session.save().await.unwrap();
    assert_eq!(session.state(), SessionState::Saved);
    assert_eq!(snapshot_ref.trajectory_id, session.trajectory_id());
    assert_eq!(&snapshot_ref.device, session.device());

    session.load(&snapshot_ref).await.unwrap();
    assert_eq!(session.state(), SessionState::Running);

    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Removed);
}

#[tokio::test]
async fn timeout_leaves_the_session_running() {
    let fake = Arc::new(FakeDevice::new());
    let mut session = session_on(fake.clone(), "emulator-5554");

    session.step(&Action::Screenshot).await.unwrap();
    fake.set_fail_execution(true);
    assert!(session.step(&Action::Screenshot).await.is_err());
    assert_eq!(session.state(), SessionState::Running);
}
