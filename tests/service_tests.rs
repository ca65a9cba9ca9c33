use std::time::Duration;

use dolby_control::audio::PlayerState;
use dolby_control::service::EnhancementService;
use dolby_control::MockEffectFactory;
use tokio_test::{assert_err, assert_ok};

mod test_utils;
use test_utils::{AudioDeviceBuilder, ControllerBuilder, ControllerFixture, device_added_event, playback_event};

/// Poll until the engine has seen `count` profile writes
async fn wait_for_profile_calls(factory: &MockEffectFactory, count: usize) -> Vec<i32> {
    for _ in 0..200 {
        let calls = factory.profile_calls();
        if calls.len() >= count {
            return calls;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    factory.profile_calls()
}

#[tokio::test]
async fn test_commands_run_on_service_task() {
    let ControllerFixture {
        controller,
        factory,
        events,
        ..
    } = ControllerBuilder::new().stored_profile("1").build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    assert_ok!(handle.set_ds_on(true).await);
    assert!(assert_ok!(handle.ds_on().await));
    assert_eq!(assert_ok!(handle.profile().await), 1);
    assert_eq!(
        assert_ok!(handle.profile_name().await).as_deref(),
        Some("Movie")
    );
    assert_eq!(factory.profile_calls(), vec![1]);

    assert_ok!(handle.shutdown());
    assert_ok!(assert_ok!(task.await));
}

#[tokio::test]
async fn test_playback_event_reapplies_through_service() {
    let ControllerFixture {
        controller,
        factory,
        audio_system,
        events,
        ..
    } = ControllerBuilder::new().stored_profile("2").build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    assert_ok!(handle.set_ds_on(true).await);
    assert_eq!(audio_system.emit(playback_event(&[PlayerState::Started])), 1);

    assert_eq!(wait_for_profile_calls(&factory, 2).await, vec![2, 2]);

    assert_ok!(handle.shutdown());
    assert_ok!(assert_ok!(task.await));
}

#[tokio::test]
async fn test_device_event_reapplies_through_service() {
    let ControllerFixture {
        controller,
        factory,
        audio_system,
        events,
        ..
    } = ControllerBuilder::new().build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    assert_ok!(handle.set_ds_on(true).await);
    audio_system.emit(device_added_event(
        AudioDeviceBuilder::new().headphones().build(),
    ));

    assert_eq!(wait_for_profile_calls(&factory, 2).await, vec![0, 0]);

    assert_ok!(handle.shutdown());
    assert_ok!(assert_ok!(task.await));
}

#[tokio::test]
async fn test_event_errors_do_not_stop_service() {
    let ControllerFixture {
        controller,
        factory,
        audio_system,
        preferences,
        events,
    } = ControllerBuilder::new().build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    assert_ok!(handle.set_ds_on(true).await);
    preferences.put("dolby_profile", "not-a-number");
    audio_system.emit(playback_event(&[PlayerState::Started]));
    assert_ok!(handle.call(|_| ()).await);
    assert_eq!(factory.profile_calls(), vec![0]);

    // The failed re-apply is logged; the service keeps answering
    preferences.put("dolby_profile", "3");
    assert_ok!(handle.apply_current_profile().await);
    assert_eq!(factory.profile_calls(), vec![0, 3]);

    assert_ok!(handle.shutdown());
    assert_ok!(assert_ok!(task.await));
}

#[tokio::test]
async fn test_boot_through_handle() {
    let ControllerFixture {
        controller,
        factory,
        events,
        ..
    } = ControllerBuilder::new()
        .ds_on()
        .speaker_virtualizer_on()
        .build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    assert_ok!(handle.boot_completed().await);
    assert!(assert_ok!(handle.call(|c| c.is_callbacks_registered()).await));
    assert!(factory.enabled());

    drop(handle);
    assert_ok!(assert_ok!(task.await));
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() {
    let ControllerFixture {
        controller, events, ..
    } = ControllerBuilder::new().build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    assert_ok!(handle.shutdown());
    assert_ok!(assert_ok!(task.await));

    assert_err!(handle.set_profile(1).await);
    assert_err!(handle.shutdown());
}

#[tokio::test]
async fn test_cloned_handles_share_service() {
    let ControllerFixture {
        controller,
        factory,
        events,
        ..
    } = ControllerBuilder::new().build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    let other = handle.clone();
    assert_ok!(handle.set_profile(1).await);
    assert_ok!(other.set_profile(2).await);
    assert_eq!(assert_ok!(handle.profile().await), 2);
    assert_eq!(factory.profile_calls(), vec![1, 2]);

    drop(handle);
    drop(other);
    assert_ok!(assert_ok!(task.await));
}

#[tokio::test]
async fn test_resync_picks_up_external_enable() {
    let ControllerFixture {
        controller,
        factory,
        audio_system,
        events,
        ..
    } = ControllerBuilder::new().stored_profile("3").build();
    let (service, handle) = EnhancementService::new(controller, events);
    let task = tokio::spawn(service.run());

    assert_ok!(handle.boot_completed().await);
    assert_eq!(audio_system.emit(playback_event(&[PlayerState::Started])), 0);

    // Another client switches enhancement on behind the service's back
    factory.force_ds_on(true);
    assert_ok!(handle.sync_with_engine().await);
    assert!(assert_ok!(handle.call(|c| c.is_callbacks_registered()).await));
    assert_eq!(factory.profile_calls(), vec![3]);

    assert_eq!(audio_system.emit(playback_event(&[PlayerState::Started])), 1);
    assert_eq!(wait_for_profile_calls(&factory, 2).await, vec![3, 3]);

    assert_ok!(handle.shutdown());
    assert_ok!(assert_ok!(task.await));
}
