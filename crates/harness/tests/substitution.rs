use std::ptr;

use shadowtracks_engine::Updater;
use shadowtracks_harness::TestProject;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn unshadowed_tracks_resolve_to_themselves() -> TestResult {
    let (test, ids) = TestProject::with_tracks(&["a", "b"]);
    let pending = test.project.pending();
    let tracks = test.tracks();
    let a = tracks.find_by_id(ids[0]).ok_or("missing track")?;

    let view = pending.substitute_pending_changed_track(a);
    assert!(!view.is_pending());
    assert!(ptr::eq(&*view, a));
    assert!(ptr::eq(pending.substitute_original_track(tracks, a), a));
    Ok(())
}

#[test]
fn shadowed_track_round_trips() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[1])?;
    test.record(ids[1], &[0.5, 0.25])?;

    let pending = test.project.pending();
    let tracks = test.tracks();
    let original = tracks.find_by_id(ids[1]).ok_or("missing track")?;

    let shadow = pending.substitute_pending_changed_track(original);
    assert!(shadow.is_pending());
    assert_eq!(shadow.id(), ids[1]);
    assert_eq!(shadow.leader().channel().samples(), &[0.5, 0.25]);
    assert!(original.leader().channel().is_empty());

    let back = pending.substitute_original_track(tracks, &shadow);
    assert!(ptr::eq(back, original));

    let again = pending.substitute_pending_changed_track(back);
    assert!(ptr::eq(&*again, &*shadow));
    Ok(())
}

#[test]
fn channels_map_by_index() -> TestResult {
    let mut test = TestProject::new();
    let id = test.add_track("stereo", 2);
    test.begin_recording(id)?;

    let pending = test.project.pending();
    let tracks = test.tracks();
    let original = tracks.find_by_id(id).ok_or("missing track")?;
    for channel in original.channel_refs() {
        let forward = pending.substitute_pending_changed_channel(channel);
        assert!(forward.is_pending());
        assert_eq!(forward.index(), channel.index());
        assert_eq!(forward.group().id(), id);
        assert!(!ptr::eq(forward.group(), original));

        let back = pending.substitute_original_channel(tracks, forward.as_channel_ref());
        assert!(back.same_channel(&channel));

        let again = pending.substitute_pending_changed_channel(back);
        assert!(again.as_channel_ref().same_channel(&forward.as_channel_ref()));
    }
    Ok(())
}

#[test]
fn orphaned_shadow_resolves_to_itself() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a"]);
    test.begin_recording(ids[0])?;
    test.delete(ids[0])?;

    let pending = test.project.pending();
    let shadow = pending.pending_track(ids[0]).ok_or("no shadow")?;
    let resolved = pending.substitute_original_track(test.tracks(), &shadow);
    assert!(ptr::eq(resolved, &*shadow));
    Ok(())
}

#[test]
fn pending_additions_pass_through() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a"]);
    test.begin_recording(ids[0])?;
    test.add_pending("new");

    let pending = test.project.pending();
    let addition = test.tracks().get(1).ok_or("missing track")?;
    assert!(!pending.substitute_pending_changed_track(addition).is_pending());
    assert!(ptr::eq(
        pending.substitute_original_track(test.tracks(), addition),
        addition
    ));
    Ok(())
}

#[test]
fn first_registration_wins() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a"]);
    test.project
        .register_pending_changed_track(Updater::none(), ids[0])?
        .set_name("first");
    test.project
        .register_pending_changed_track(Updater::none(), ids[0])?
        .set_name("second");
    assert_eq!(test.project.pending().pending_count(), 2);

    let view = test.project.editing_view(ids[0]).ok_or("missing track")?;
    assert_eq!(view.name(), "first");
    Ok(())
}

#[test]
fn lookups_leave_state_alone() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    test.begin_recording(ids[0])?;
    test.add_pending("c");
    let before = test.snapshot()?;
    let events = test.pending_events();

    {
        let pending = test.project.pending();
        for track in test.tracks().iter() {
            let view = pending.substitute_pending_changed_track(track);
            let _ = pending.substitute_original_track(test.tracks(), &view);
        }
    }

    assert_eq!(test.snapshot()?, before);
    assert!(events.is_empty());
    assert_eq!(test.project.pending().pending_count(), 1);
    assert!(test.project.has_pending_tracks());
    Ok(())
}
