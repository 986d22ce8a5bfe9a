mod support;

use std::time::Duration;

use crew_timeline::calc::padded_range;
use crew_timeline::io::{FetchError, FlightCrew};
use crew_timeline::model::{
    CommandError, FilterSet, LoadState, RowType, TimelineKind,
};
use crew_timeline::session::{NoticeLevel, PublishRowOutcome};

use support::{flight, harness, wait_until, RecordingZoom, ScriptedSource, ZoomCall};

#[tokio::test]
async fn empty_filter_never_fetches() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    h.orchestrator
        .set_timeline_flights(id, vec![flight("P1", "T1", 0, 2)]);

    h.orchestrator
        .update_timeline(id, FilterSet::new(), TimelineKind::Roster, false)
        .await;

    assert_eq!(source.activity_calls(), 0);
    let entry = h.orchestrator.timeline(id).unwrap();
    assert!(entry.flights.is_empty());
    assert!(!entry.state.is_loading());
    assert_eq!(entry.progress, 100);
}

#[tokio::test]
async fn update_stores_annotated_records_and_fits() {
    let source = ScriptedSource::new();
    let records = vec![flight("P1", "T1", 0, 2), flight("P1", "T1", 4, 6)];
    source.push_page(records.clone());
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let zoom = RecordingZoom::new(12.0);
    h.zoom.register(id, Box::new(zoom.clone()), 12.0);

    let filters = FilterSet::new().with("person_id", "P1");
    h.orchestrator
        .update_timeline(id, filters.clone(), TimelineKind::Roster, true)
        .await;

    let entry = h.orchestrator.timeline(id).unwrap();
    assert_eq!(entry.state, LoadState::Ready);
    assert_eq!(entry.progress, 100);
    assert_eq!(entry.filters, filters);
    assert_eq!(entry.flights.len(), 2);
    assert!(entry.flights[0].rest.is_none());
    assert!(entry.flights[1].rest.is_some());
    assert_eq!(
        entry.visible_row_types.get("P1"),
        Some(&vec![RowType::Actual])
    );
    assert_eq!(
        zoom.calls(),
        vec![ZoomCall::Fit(padded_range(&records).unwrap())]
    );
}

#[tokio::test]
async fn empty_result_resets_zoom() {
    let source = ScriptedSource::new();
    source.push_page(Vec::new());
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let zoom = RecordingZoom::new(12.0);
    h.zoom.register(id, Box::new(zoom.clone()), 12.0);

    h.orchestrator
        .update_timeline(id, FilterSet::new().with("person_id", "nobody"), TimelineKind::Roster, true)
        .await;

    assert_eq!(zoom.calls(), vec![ZoomCall::Reset]);
}

#[tokio::test]
async fn fetch_failure_marks_error_state() {
    let source = ScriptedSource::new();
    source.push_error(FetchError::Transport("refused".into()));
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    h.orchestrator
        .set_timeline_flights(id, vec![flight("P1", "T1", 0, 2)]);

    h.orchestrator
        .update_timeline(id, FilterSet::new().with("person_id", "P1"), TimelineKind::Roster, false)
        .await;

    let entry = h.orchestrator.timeline(id).unwrap();
    assert_eq!(entry.state.error(), Some("Connection failed: refused"));
    assert!(entry.flights.is_empty());
}

#[tokio::test]
async fn superseded_fetch_is_discarded() {
    let source = ScriptedSource::new();
    let gate = source.push_gate();
    source.push_page(vec![flight("NEW", "T2", 0, 1)]);
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);

    let orchestrator = h.orchestrator.clone();
    let slow = tokio::spawn(async move {
        orchestrator
            .update_timeline(id, FilterSet::new().with("person_id", "OLD"), TimelineKind::Roster, false)
            .await;
    });
    wait_until(|| source.activity_calls() == 1).await;

    h.orchestrator
        .update_timeline(id, FilterSet::new().with("person_id", "NEW"), TimelineKind::Roster, false)
        .await;

    gate.send(Ok(support::page(vec![flight("OLD", "T1", 0, 1)])))
        .unwrap();
    slow.await.unwrap();

    let entry = h.orchestrator.timeline(id).unwrap();
    assert_eq!(entry.state, LoadState::Ready);
    assert_eq!(entry.persons(), vec!["NEW".to_string()]);
    assert_eq!(entry.filters.get("person_id"), Some("NEW"));
}

#[tokio::test]
async fn superseded_failure_is_discarded() {
    let source = ScriptedSource::new();
    let gate = source.push_gate();
    source.push_page(vec![flight("NEW", "T2", 0, 1)]);
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);

    let orchestrator = h.orchestrator.clone();
    let slow = tokio::spawn(async move {
        orchestrator
            .update_timeline(id, FilterSet::new().with("person_id", "OLD"), TimelineKind::Roster, false)
            .await;
    });
    wait_until(|| source.activity_calls() == 1).await;
    h.orchestrator
        .update_timeline(id, FilterSet::new().with("person_id", "NEW"), TimelineKind::Roster, false)
        .await;

    gate.send(Err(FetchError::SessionExpired)).unwrap();
    slow.await.unwrap();

    let entry = h.orchestrator.timeline(id).unwrap();
    assert_eq!(entry.state, LoadState::Ready);
    assert_eq!(entry.flights.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_advances_while_loading_and_completes() {
    let source = ScriptedSource::new();
    let gate = source.push_gate();
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move {
        orchestrator
            .update_timeline(id, FilterSet::new().with("person_id", "P1"), TimelineKind::Roster, false)
            .await;
    });
    wait_until(|| source.activity_calls() == 1).await;

    tokio::time::sleep(Duration::from_millis(350)).await;
    let loading = h.orchestrator.timeline(id).unwrap();
    assert!(loading.state.is_loading());
    assert!(loading.progress > 0 && loading.progress <= 95);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.orchestrator.timeline(id).unwrap().progress, 95);

    gate.send(Ok(support::page(vec![flight("P1", "T1", 0, 1)])))
        .unwrap();
    task.await.unwrap();
    assert_eq!(h.orchestrator.timeline(id).unwrap().progress, 100);
}

#[tokio::test]
async fn indexed_command_targets_existing_timeline() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());
    let first = h.orchestrator.add_new_empty_timeline(TimelineKind::Trip);
    h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);

    h.orchestrator
        .handle_global_search("1/c 109403")
        .await
        .unwrap();

    assert_eq!(h.orchestrator.len(), 2);
    assert_eq!(
        source.last_filters(),
        Some(FilterSet::new().with("person_id", "109403"))
    );
    let entry = h.orchestrator.timeline(first).unwrap();
    assert_eq!(entry.kind, TimelineKind::Trip);
    assert_eq!(entry.filters.get("person_id"), Some("109403"));
}

#[tokio::test]
async fn rotation_prefix_opens_new_timeline() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());
    h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);

    h.orchestrator
        .handle_global_search("/rot t TRIP-07")
        .await
        .unwrap();

    let timelines = h.orchestrator.snapshot();
    assert_eq!(timelines.len(), 2);
    let opened = &timelines[1];
    assert_eq!(opened.kind, TimelineKind::Rotation);
    assert_eq!(opened.filters, FilterSet::new().with("trip_id", "TRIP-07"));
}

#[tokio::test]
async fn bare_kind_prefix_opens_empty_timeline() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());

    h.orchestrator.handle_global_search("/t").await.unwrap();

    let timelines = h.orchestrator.snapshot();
    assert_eq!(timelines.len(), 1);
    assert_eq!(timelines[0].kind, TimelineKind::Trip);
    assert!(timelines[0].filters.is_empty());
    assert_eq!(timelines[0].state, LoadState::Ready);
    assert_eq!(timelines[0].progress, 100);
    assert_eq!(source.activity_calls(), 0);
}

#[tokio::test]
async fn bare_index_prefix_reruns_existing_filters() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());
    h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let second = h.orchestrator.add_new_empty_timeline(TimelineKind::Trip);
    source.push_page(vec![flight("P1", "T1", 0, 2)]);
    h.orchestrator.handle_global_search("2/c P1").await.unwrap();
    assert_eq!(source.activity_calls(), 1);

    source.push_page(vec![flight("P1", "T1", 0, 2), flight("P1", "T1", 3, 5)]);
    h.orchestrator.handle_global_search("2/").await.unwrap();

    assert_eq!(source.activity_calls(), 2);
    assert_eq!(
        source.last_filters(),
        Some(FilterSet::new().with("person_id", "P1"))
    );
    let entry = h.orchestrator.timeline(second).unwrap();
    assert_eq!(entry.kind, TimelineKind::Trip);
    assert_eq!(entry.flights.len(), 2);
}

#[tokio::test]
async fn queries_merge_into_existing_filters() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());
    h.orchestrator.handle_global_search("c 1").await.unwrap();
    h.orchestrator.handle_global_search("dp IST").await.unwrap();

    assert_eq!(h.orchestrator.len(), 1);
    assert_eq!(
        source.last_filters(),
        Some(
            FilterSet::new()
                .with("person_id", "1")
                .with("departure_port", "IST")
        )
    );
}

#[tokio::test]
async fn bad_commands_leave_state_untouched() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());
    h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let before = h.orchestrator.snapshot();

    assert_eq!(
        h.orchestrator.handle_global_search("3/c 1").await,
        Err(CommandError::NoSuchTimeline(3))
    );
    assert!(matches!(
        h.orchestrator.handle_global_search("/x c 1").await,
        Err(CommandError::UnknownPrefix(_))
    ));
    assert!(matches!(
        h.orchestrator.handle_global_search("1/zz nothing").await,
        Err(CommandError::InvalidCommand(_))
    ));

    assert_eq!(source.activity_calls(), 0);
    let after = h.orchestrator.snapshot();
    assert_eq!(after.len(), before.len());
    assert_eq!(after[0].generation, before[0].generation);
}

#[tokio::test]
async fn blank_search_clears_every_timeline() {
    let source = ScriptedSource::new();
    let h = harness(source.clone());
    let a = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let b = h.orchestrator.add_new_empty_timeline(TimelineKind::Trip);
    h.orchestrator.set_timeline_flights(a, vec![flight("P1", "T1", 0, 1)]);
    h.orchestrator.set_timeline_flights(b, vec![flight("P2", "T2", 0, 1)]);

    h.orchestrator.handle_global_search("   ").await.unwrap();

    assert_eq!(source.activity_calls(), 0);
    for entry in h.orchestrator.snapshot() {
        assert!(entry.flights.is_empty());
        assert_eq!(entry.progress, 100);
    }
}

#[tokio::test]
async fn minimized_timelines_sort_last_and_ratios_sum_to_one() {
    let h = harness(ScriptedSource::new());
    let a = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let b = h.orchestrator.add_new_empty_timeline(TimelineKind::Trip);
    let c = h.orchestrator.add_new_empty_timeline(TimelineKind::Rotation);

    h.orchestrator.toggle_minimize(a);
    let timelines = h.orchestrator.snapshot();
    assert_eq!(
        timelines.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![b, c, a]
    );
    let open: f32 = timelines
        .iter()
        .filter(|t| !t.minimized)
        .map(|t| t.height_ratio)
        .sum();
    assert!((open - 1.0).abs() < 1e-5);

    h.orchestrator.toggle_minimize(b);
    let timelines = h.orchestrator.snapshot();
    assert!(!timelines[0].minimized);
    assert!(timelines[1..].iter().all(|t| t.minimized));
    assert!((timelines[0].height_ratio - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn closing_rebalances_and_drops_zoom_controller() {
    let h = harness(ScriptedSource::new());
    let a = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let b = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    h.zoom.register(a, Box::new(RecordingZoom::new(1.0)), 1.0);

    assert!(h.orchestrator.remove_timeline(a));
    assert!(!h.orchestrator.remove_timeline(a));
    assert!(h.zoom.get(a).is_none());
    assert_eq!(h.orchestrator.ids(), vec![b]);
    assert!((h.orchestrator.timeline(b).unwrap().height_ratio - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn publish_row_is_inserted_once_below_actual_row() {
    let source = ScriptedSource::new();
    source.set_published(
        "P1",
        Ok(vec![flight("P1", "PT", 1, 3), flight("P1", "PT", 20, 22)]),
    );
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    h.orchestrator.set_timeline_flights(
        id,
        vec![
            flight("P1", "T1", 0, 2),
            flight("P1", "T1", 5, 7),
            flight("P2", "T2", 0, 2),
        ],
    );

    let first = h.orchestrator.insert_publish_row_below("P1", id).await;
    let second = h.orchestrator.insert_publish_row_below("P1", id).await;

    assert_eq!(first, PublishRowOutcome::Inserted(2));
    assert_eq!(second, PublishRowOutcome::AlreadyPresent);
    assert_eq!(source.published_calls(), 1);

    let entry = h.orchestrator.timeline(id).unwrap();
    let layout: Vec<(&str, RowType)> = entry
        .flights
        .iter()
        .map(|r| (r.person_id.as_str(), r.row_type))
        .collect();
    assert_eq!(
        layout,
        vec![
            ("P1", RowType::Actual),
            ("P1", RowType::Actual),
            ("P1", RowType::Publish),
            ("P1", RowType::Publish),
            ("P2", RowType::Actual),
        ]
    );
    assert_eq!(
        entry.visible_row_types.get("P1"),
        Some(&vec![RowType::Actual, RowType::Publish])
    );
    // Published trip legs are rest-annotated like any fetch.
    assert!(entry.person_records("P1", RowType::Publish)[1].rest.is_some());
}

#[tokio::test]
async fn missing_published_schedule_posts_warning() {
    let source = ScriptedSource::new();
    source.set_published("P2", Err(FetchError::Server {
        status: 500,
        message: "boom".into(),
    }));
    let h = harness(source.clone());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    h.orchestrator.set_timeline_flights(
        id,
        vec![flight("P1", "T1", 0, 2), flight("P2", "T2", 0, 2)],
    );

    assert_eq!(
        h.orchestrator.insert_publish_row_below("P1", id).await,
        PublishRowOutcome::NotPublished
    );
    assert!(matches!(
        h.orchestrator.insert_publish_row_below("P2", id).await,
        PublishRowOutcome::Failed(_)
    ));
    assert_eq!(
        h.orchestrator.insert_publish_row_below("P9", id).await,
        PublishRowOutcome::NoActualRow
    );

    let notices = h.notices.drain();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert_eq!(notices[0].title, "No published record");
    assert_eq!(notices[1].level, NoticeLevel::Error);
    assert_eq!(notices[1].title, "API error");
    assert!(!h.orchestrator.timeline(id).unwrap().has_row("P1", RowType::Publish));
}

#[tokio::test]
async fn crew_of_flight_opens_roster_timeline() {
    let source = ScriptedSource::new();
    let mut crew = FlightCrew::default();
    crew.person_ids = vec!["B".into(), "A".into()];
    crew.by_person
        .insert("A".into(), vec![flight("A", "TA", 0, 2)]);
    crew.by_person
        .insert("B".into(), vec![flight("B", "TB", 0, 2), flight("B", "TB", 3, 5)]);
    source.set_crew("F0", crew);
    let h = harness(source.clone());

    let id = h.orchestrator.show_flight_crew_in_new_timeline("F0").await;

    let entry = h.orchestrator.timeline(id).unwrap();
    assert_eq!(entry.kind, TimelineKind::Roster);
    assert_eq!(entry.state, LoadState::Ready);
    assert_eq!(entry.persons(), vec!["B".to_string(), "A".to_string()]);
    assert!(entry.flights[1].rest.is_some());
}

#[tokio::test]
async fn crew_lookup_failure_leaves_error_timeline() {
    let h = harness(ScriptedSource::new());
    let id = h.orchestrator.show_flight_crew_in_new_timeline("missing").await;
    let entry = h.orchestrator.timeline(id).unwrap();
    assert!(entry.state.error().is_some());
    assert_eq!(entry.progress, 0);
}

#[tokio::test]
async fn dragged_row_moves_between_timelines() {
    let h = harness(ScriptedSource::new());
    let src = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let dst = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    h.orchestrator.set_timeline_flights(
        src,
        vec![flight("P1", "T1", 0, 2), flight("P2", "T2", 0, 2)],
    );
    h.orchestrator.set_timeline_flights(
        dst,
        vec![flight("P3", "T3", 0, 2), flight("P4", "T4", 0, 2)],
    );

    assert!(!h.orchestrator.drop_dragged_row(dst, None));

    let dragged = h
        .orchestrator
        .timeline(src)
        .unwrap()
        .flights
        .into_iter()
        .filter(|r| r.person_id == "P1")
        .collect::<Vec<_>>();
    h.drag.begin(src, "P1", dragged, 40.0, 5.0);
    assert!(h.orchestrator.drop_dragged_row(dst, Some("P4")));

    assert!(!h.drag.is_active());
    let source = h.orchestrator.timeline(src).unwrap();
    assert_eq!(source.persons(), vec!["P2".to_string()]);
    assert!(!source.visible_row_types.contains_key("P1"));
    let target = h.orchestrator.timeline(dst).unwrap();
    assert_eq!(
        target.persons(),
        vec!["P3".to_string(), "P1".to_string(), "P4".to_string()]
    );
    assert_eq!(
        target.visible_row_types.get("P1"),
        Some(&vec![RowType::Actual])
    );
}

#[tokio::test]
async fn dropping_into_source_reorders_rows() {
    let h = harness(ScriptedSource::new());
    let id = h.orchestrator.add_new_empty_timeline(TimelineKind::Roster);
    let records = vec![flight("P1", "T1", 0, 2), flight("P2", "T2", 0, 2)];
    h.orchestrator.set_timeline_flights(id, records.clone());

    h.drag.begin(id, "P2", vec![records[1].clone()], 0.0, 0.0);
    assert!(h.orchestrator.drop_dragged_row(id, Some("P1")));

    assert_eq!(
        h.orchestrator.timeline(id).unwrap().persons(),
        vec!["P2".to_string(), "P1".to_string()]
    );
}

#[tokio::test]
async fn shared_orchestrator_is_usable_across_tasks() {
    let source = ScriptedSource::new();
    for person in ["A", "B", "C"] {
        source.push_page(vec![flight(person, "T", 0, 1)]);
    }
    let h = harness(source.clone());

    let mut tasks = Vec::new();
    for kind in [TimelineKind::Roster, TimelineKind::Trip, TimelineKind::Rotation] {
        let orchestrator = h.orchestrator.clone();
        let id = orchestrator.add_new_empty_timeline(kind);
        tasks.push(tokio::spawn(async move {
            orchestrator
                .update_timeline(id, FilterSet::new().with("trip_id", "T"), kind, false)
                .await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(source.activity_calls(), 3);
    assert!(h.orchestrator.snapshot().iter().all(|t| t.state == LoadState::Ready));
}
