use hashbrown::HashSet;
use proptest::prelude::*;

use questmap::{
    core::state::{CreationBlocked, MarkerHandle, MarkerState},
    types::{LatLng, MarkerId, OverlayId},
};

#[derive(Debug, Clone)]
enum Action {
    Bind { key: u8 },
    Create { ok: bool },
    Remove { target: u8 },
    Select { target: u8 },
    Deselect,
    RetainEven,
    Clear,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..16).prop_map(|key| Action::Bind { key }),
        any::<bool>().prop_map(|ok| Action::Create { ok }),
        (0u8..16).prop_map(|target| Action::Remove { target }),
        (0u8..16).prop_map(|target| Action::Select { target }),
        Just(Action::Deselect),
        Just(Action::RetainEven),
        Just(Action::Clear),
    ]
}

fn marker_id(key: u8) -> MarkerId {
    format!("m{key}")
}

fn check_invariants(state: &MarkerState) -> Result<(), TestCaseError> {
    let mut seen = HashSet::new();
    for handle in state.handles() {
        prop_assert!(seen.insert(handle.id.clone()), "duplicate id {}", handle.id);
        prop_assert_eq!(state.get(&handle.id), Some(handle));
        prop_assert_eq!(state.marker_for_overlay(handle.overlay), Some(&handle.id));
    }
    if let Some(selected) = state.selected() {
        prop_assert!(state.contains(selected));
        prop_assert_eq!(state.creation_blocked(), Some(CreationBlocked::MarkerSelected));
    } else {
        prop_assert_eq!(state.creation_blocked(), None);
    }
    prop_assert!(state.pending_overlays().is_empty());
    Ok(())
}

proptest! {
    #[test]
    fn random_sequences_keep_handles_indexed_and_selection_valid(actions in prop::collection::vec(action_strategy(), 1..200)) {
        let mut state = MarkerState::new();
        state.set_map_ready();
        let mut next_overlay: OverlayId = 0;
        let mut next_created = 100u32;

        for action in actions {
            match action {
                Action::Bind { key } => {
                    next_overlay += 1;
                    let id = marker_id(key);
                    let was_held = state.contains(&id);
                    let res = state.bind(MarkerHandle {
                        id,
                        overlay: next_overlay,
                        location: LatLng::new(f64::from(key), 0.0),
                        reports_drag: false,
                    });
                    prop_assert_eq!(res.is_err(), was_held);
                }
                Action::Create { ok } => {
                    next_overlay += 1;
                    let before = state.len();
                    state.begin_pending(next_overlay, LatLng::new(1.0, 1.0));
                    prop_assert_eq!(state.marker_for_overlay(next_overlay), None);
                    if ok {
                        next_created += 1;
                        let handle = state
                            .confirm_pending(next_overlay, format!("c{next_created}"))
                            .expect("confirm");
                        prop_assert!(handle.reports_drag);
                        prop_assert_eq!(state.len(), before + 1);
                    } else {
                        prop_assert!(state.abandon_pending(next_overlay).is_some());
                        prop_assert_eq!(state.len(), before);
                    }
                }
                Action::Remove { target } => {
                    let ids = state.ids();
                    if ids.is_empty() {
                        continue;
                    }
                    let id = ids[usize::from(target) % ids.len()].clone();
                    let removed = state.remove(&id).expect("held");
                    prop_assert_eq!(&removed.id, &id);
                    prop_assert!(!state.contains(&id));
                    prop_assert_eq!(state.marker_for_overlay(removed.overlay), None);
                    prop_assert_ne!(state.selected(), Some(&id));
                }
                Action::Select { target } => {
                    let overlays: Vec<OverlayId> = state.handles().iter().map(|h| h.overlay).collect();
                    if overlays.is_empty() {
                        continue;
                    }
                    let overlay = overlays[usize::from(target) % overlays.len()];
                    prop_assert!(state.select_overlay(overlay).is_some());
                }
                Action::Deselect => {
                    state.clear_selection();
                }
                Action::RetainEven => {
                    let keep: HashSet<MarkerId> = state
                        .ids()
                        .into_iter()
                        .enumerate()
                        .filter(|(i, _)| i % 2 == 0)
                        .map(|(_, id)| id)
                        .collect();
                    state.retain_ids(&keep);
                    let held: HashSet<MarkerId> = state.ids().into_iter().collect();
                    prop_assert_eq!(held, keep);
                }
                Action::Clear => {
                    state.clear();
                    prop_assert!(state.is_empty());
                    prop_assert_eq!(state.selected(), None);
                }
            }

            check_invariants(&state)?;
        }
    }
}

#[test]
fn creation_is_blocked_until_map_ready_and_while_selected() {
    let mut state = MarkerState::new();
    assert_eq!(state.creation_blocked(), Some(CreationBlocked::MapNotReady));

    state.set_map_ready();
    assert_eq!(state.creation_blocked(), None);

    state
        .bind(MarkerHandle {
            id: "m1".to_string(),
            overlay: 1,
            location: LatLng::new(1.0, 2.0),
            reports_drag: false,
        })
        .expect("bind");
    assert_eq!(state.select_overlay(1), Some("m1".to_string()));
    assert_eq!(state.creation_blocked(), Some(CreationBlocked::MarkerSelected));

    state.clear_selection();
    assert_eq!(state.creation_blocked(), None);
}

#[test]
fn pending_overlays_are_not_selectable_until_confirmed() {
    let mut state = MarkerState::new();
    state.set_map_ready();
    state.begin_pending(7, LatLng::new(5.0, 5.0));

    assert_eq!(state.pending_overlays(), vec![7]);
    assert_eq!(state.select_overlay(7), None);
    assert!(state.drag_target(7).is_none());

    state.confirm_pending(7, "m1".to_string()).expect("confirm");
    assert!(state.pending_overlays().is_empty());
    assert_eq!(state.drag_target(7).map(|h| h.id.as_str()), Some("m1"));
    assert_eq!(state.select_overlay(7), Some("m1".to_string()));
    assert_eq!(state.handles()[0].location, LatLng::new(5.0, 5.0));
}
