//! Property-based tests for pane navigation
//!
//! Random key sequences and catalog changes must never move the topic selection or the
//! scroll cursor outside their ranges.

use mqtt_browser::gateway::GatewayEvent;
use mqtt_browser::messages::Message;
use mqtt_browser::tui::{Action, BrowserState, Focus, PaneViewport};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Key(Action),
    Topics(Vec<String>),
    Message(String),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::ToggleFocus),
        Just(Action::MoveUp),
        Just(Action::MoveDown),
        Just(Action::ToggleSubscription),
        Just(Action::ResetMessages),
    ]
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => action_strategy().prop_map(Step::Key),
        1 => prop::collection::vec("[a-z]{1,2}/[0-9]", 0..8).prop_map(Step::Topics),
        2 => "[a-z]{1,2}/[0-9]".prop_map(Step::Message),
    ]
}

fn assert_viewport(view: &PaneViewport) -> Result<(), TestCaseError> {
    prop_assert!(view.scroll() <= view.len().saturating_sub(view.capacity()));
    if view.is_empty() {
        prop_assert_eq!(view.selection(), 0);
    } else {
        prop_assert!(view.selection() < view.len());
        prop_assert!(view.selection() >= view.scroll());
        prop_assert!(view.selection() < view.scroll() + view.capacity());
    }
    Ok(())
}

// =============================================================================
// Property 1: viewport invariants hold after any move or resize
// =============================================================================

proptest! {
    #[test]
    fn property_1_viewport_stays_clamped(
        capacity in 1usize..12,
        len in 0usize..40,
        moves in prop::collection::vec(-15isize..15, 0..40),
        new_len in 0usize..40,
    ) {
        let mut view = PaneViewport::new(capacity);
        view.set_len(len);
        assert_viewport(&view)?;
        for delta in moves {
            view.move_by(delta);
            assert_viewport(&view)?;
        }
        view.set_len(new_len);
        assert_viewport(&view)?;
        prop_assert!(view.scroll() <= view.selection());
    }

    #[test]
    fn property_1_capacity_change_keeps_selection_visible(
        len in 1usize..40,
        selection in 0usize..40,
        capacity in 1usize..12,
    ) {
        let mut view = PaneViewport::new(5);
        view.set_len(len);
        view.clamp_and_follow(selection);
        view.set_capacity(capacity);
        assert_viewport(&view)?;
    }
}

// =============================================================================
// Property 2: the browser state never leaves its ranges
// =============================================================================

proptest! {
    #[test]
    fn property_2_browser_state_stays_clamped(
        topic_rows in 1usize..8,
        message_rows in 1usize..6,
        steps in prop::collection::vec(step_strategy(), 0..80),
    ) {
        let mut state = BrowserState::default();
        state.set_viewport(topic_rows, message_rows);
        state.handle_event(GatewayEvent::Connected);

        for step in steps {
            match step {
                Step::Key(action) => {
                    state.handle_action(action);
                }
                Step::Topics(topics) => {
                    state.handle_event(GatewayEvent::TopicsDiscovered(topics));
                }
                Step::Message(topic) => {
                    state.handle_event(GatewayEvent::MessageReceived(Message::new(topic, "x")));
                }
            }
            assert_viewport(state.topic_view())?;
            prop_assert_eq!(state.topic_view().len(), state.topics().len());

            let messages = state.messages();
            prop_assert!(messages.scroll() <= messages.max_scroll());
            prop_assert!(messages.visible().len() <= message_rows);
        }
    }

    #[test]
    fn property_2_toggle_only_touches_selected_topic(
        topics in prop::collection::btree_set("[a-z]{1,3}", 1..10),
        moves in 0usize..10,
    ) {
        let mut state = BrowserState::default();
        state.set_viewport(4, 4);
        state.set_topics(&topics);
        for _ in 0..moves {
            state.handle_action(Action::MoveDown);
        }
        let selected = state.selected_topic().map(str::to_string);
        state.handle_action(Action::ToggleSubscription);

        for topic in state.topics() {
            prop_assert_eq!(
                state.subscriptions().is_desired(topic),
                Some(topic) == selected.as_ref()
            );
        }
        prop_assert_eq!(state.focus(), Focus::Topics);
    }
}
