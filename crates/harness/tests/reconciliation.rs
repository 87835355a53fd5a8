use std::cell::Cell;
use std::rc::Rc;

use shadowtracks_core::{Track, TrackId};
use shadowtracks_engine::Updater;
use shadowtracks_harness::TestProject;
use shadowtracks_list::TrackListEvent;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn shadow_name(test: &TestProject, id: TrackId) -> Option<String> {
    test.project
        .pending()
        .pending_track(id)
        .map(|t| t.name().to_string())
}

fn shadow_bytes(test: &TestProject, id: TrackId) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let shadow = test.project.pending().pending_track(id).ok_or("no shadow")?;
    Ok(shadow.to_msgpack()?)
}

fn counting_updater() -> (Updater, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let updater = Updater::infallible(move |_, _| counter.set(counter.get() + 1));
    (updater, calls)
}

#[test]
fn structural_events_refresh_shadows() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[0])?;

    // A data change alone is not structural.
    test.edit_original(ids[0], |t| t.set_name("renamed"))?;
    assert_eq!(shadow_name(&test, ids[0]).as_deref(), Some("a"));

    test.project.tracks_mut().set_height(ids[1], 60)?;
    assert_eq!(shadow_name(&test, ids[0]).as_deref(), Some("renamed"));
    Ok(())
}

#[test]
fn every_structural_kind_triggers_a_pass() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b", "c"]);
    let (updater, calls) = counting_updater();
    test.change(ids[0], updater)?;

    let tracks = test.project.tracks_mut();
    tracks.permute(&[2, 1, 0])?;
    assert!(tracks.move_down(ids[1])?);
    tracks.set_height(ids[2], 40)?;
    tracks.add(Track::new("d"));
    tracks.remove(ids[1])?;
    assert_eq!(calls.get(), 5);

    tracks.set_selected(ids[0], true)?;
    tracks.notify_data_change(ids[0])?;
    assert_eq!(calls.get(), 5);
    Ok(())
}

#[test]
fn repeated_passes_are_idempotent() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a"]);
    test.begin_recording(ids[0])?;
    test.record(ids[0], &[0.1, 0.2])?;
    test.edit_original(ids[0], |t| {
        t.set_gain(0.5);
        t.set_muted(true);
    })?;

    test.project.update_pending_tracks()?;
    let first = shadow_bytes(&test, ids[0])?;
    test.project.update_pending_tracks()?;
    assert_eq!(shadow_bytes(&test, ids[0])?, first);

    let shadow = test.project.pending().pending_track(ids[0]).ok_or("no shadow")?;
    assert!(shadow.is_muted());
    assert_eq!(shadow.gain(), 0.5);
    assert_eq!(shadow.leader().channel().samples(), &[0.1, 0.2]);
    Ok(())
}

#[test]
fn orphaned_shadows_are_skipped() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    let (updater, calls) = counting_updater();
    test.change(ids[0], updater)?;

    test.delete(ids[0])?;
    test.project.tracks_mut().add(Track::new("c"));
    test.project.update_pending_tracks()?;

    assert_eq!(calls.get(), 0);
    assert_eq!(test.project.pending().pending_ids(), vec![ids[0]]);
    Ok(())
}

#[test]
fn events_are_passed_on_unchanged() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[0])?;
    let direct = test.list_events();
    let passed_on = test.pending_events();

    test.project.tracks_mut().set_selected(ids[1], true)?;
    test.project.tracks_mut().move_up(ids[1])?;
    test.edit_original(ids[1], |t| t.set_pan(0.5))?;
    test.add_pending("c");

    assert_eq!(passed_on.events(), direct.events());
    assert_eq!(
        passed_on.kinds(),
        vec!["selection_change", "permuted", "track_data_change", "addition"]
    );
    Ok(())
}

#[test]
fn downstream_listeners_see_refreshed_shadows() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[0])?;
    test.edit_original(ids[0], |t| t.set_solo(true))?;

    // Listeners on the coordinator hear an event after the refresh pass.
    let seen = Rc::new(Cell::new(0));
    let sink = Rc::clone(&seen);
    let _subscription = test.project.subscribe(move |_, event| {
        if event.is_structural() {
            sink.set(sink.get() + 1);
        }
    });
    test.project.tracks_mut().move_down(ids[0])?;

    assert_eq!(seen.get(), 1);
    let shadow = test.project.pending().pending_track(ids[0]).ok_or("no shadow")?;
    assert!(shadow.is_solo());
    Ok(())
}

#[test]
fn held_view_defers_the_pass() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[0])?;
    test.edit_original(ids[0], |t| t.set_name("renamed"))?;

    {
        let (pending, tracks) = test.project.parts_mut();
        let view = pending.pending_track(ids[0]).ok_or("no shadow")?;
        tracks.move_up(ids[1])?;
        assert_eq!(view.name(), "a");
    }

    // The skipped pass runs as soon as the shadow is free again.
    assert_eq!(shadow_name(&test, ids[0]).as_deref(), Some("renamed"));
    assert!(test.project.apply_pending_tracks()?);
    assert_eq!(test.names(), vec!["b", "renamed"]);
    Ok(())
}

#[test]
fn edits_in_progress_are_refreshed_afterwards() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[0])?;
    test.edit_original(ids[0], |t| t.set_muted(true))?;

    {
        let (pending, tracks) = test.project.parts_mut();
        let mut shadow = pending.pending_track_mut(ids[0]).ok_or("no shadow")?;
        tracks.set_height(ids[1], 90)?;
        for channel in shadow.channels_mut() {
            channel.append(&[0.5]);
        }
        assert!(!shadow.is_muted());
    }

    let view = test.project.editing_view(ids[0]).ok_or("missing track")?;
    assert!(view.is_pending());
    assert!(view.is_muted());
    assert_eq!(view.leader().channel().samples(), &[0.5]);
    Ok(())
}

#[test]
fn events_raised_by_listeners_reach_every_observer() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[0])?;
    let direct = test.list_events();
    let passed_on = test.pending_events();
    let touched = ids[1];
    let _echo = test.project.subscribe(move |list, event| {
        if *event == TrackListEvent::Permuted {
            let _ = list.notify_data_change(touched);
        }
    });

    test.project.tracks_mut().move_up(ids[1])?;

    assert_eq!(direct.kinds(), vec!["permuted", "track_data_change"]);
    assert_eq!(passed_on.events(), direct.events());
    Ok(())
}
