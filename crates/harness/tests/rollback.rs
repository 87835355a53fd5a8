use shadowtracks_core::Track;
use shadowtracks_harness::TestProject;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn rollback_discards_everything_pending() -> TestResult {
    let (mut test, ids) = TestProject::with_tracks(&["a", "b"]);
    let committed = test.snapshot()?;
    test.begin_recording(ids[0])?;
    test.record(ids[0], &[1.0])?;
    test.add_pending("new");

    test.project.clear_pending_tracks(None);

    assert_eq!(test.snapshot()?, committed);
    assert_eq!(test.project.pending().pending_count(), 0);
    assert!(!test.project.has_pending_tracks());
    Ok(())
}

#[test]
fn rollback_reports_removed_additions_in_order() -> TestResult {
    let mut test = TestProject::new();
    test.add_track("a", 1);
    test.add_pending("n1");
    test.add_track("b", 1);
    test.add_pending("n2");
    test.add_track("c", 1);
    let events = test.pending_events();

    let mut added = Vec::new();
    test.project.clear_pending_tracks(Some(&mut added));

    let shape: Vec<Option<String>> = added
        .iter()
        .map(|t| t.as_ref().map(|t| t.name().to_string()))
        .collect();
    assert_eq!(shape, vec![None, Some("n1".into()), None, Some("n2".into())]);
    assert!(added.iter().flatten().all(Track::is_pending_addition));
    assert_eq!(test.names(), vec!["a", "b", "c"]);
    assert_eq!(events.kinds(), vec!["deletion", "deletion"]);

    // Removed additions can be placed somewhere else.
    let mut other = TestProject::new();
    for track in added.into_iter().flatten() {
        other.project.add_track(track);
    }
    assert_eq!(other.names(), vec!["n1", "n2"]);
    Ok(())
}

#[test]
fn rollback_with_nothing_pending_is_harmless() -> TestResult {
    let (mut test, _) = TestProject::with_tracks(&["a"]);
    let before = test.snapshot()?;
    let events = test.list_events();

    let mut added = vec![Some(Track::new("stale"))];
    test.project.clear_pending_tracks(Some(&mut added));
    test.project.clear_pending_tracks(None);

    assert!(added.is_empty());
    assert_eq!(test.snapshot()?, before);
    assert!(events.is_empty());

    let mut empty = TestProject::new();
    empty.project.clear_pending_tracks(None);
    assert!(empty.tracks().is_empty());
    Ok(())
}
