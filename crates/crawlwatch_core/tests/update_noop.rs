use crawlwatch_core::{update, Msg, SyncState};

#[test]
fn update_is_noop() {
    let state = SyncState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn tick_without_view_is_noop() {
    let state = SyncState::new();
    let (mut next, effects) = update(state, Msg::Tick);

    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
    assert_eq!(next.view().crawl_id, None);
}
