use crate::shared::types::{InternalState, SelectionType, StateChangeReason};

/// Where the machine goes once the work of a state has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(InternalState),
    /// Abandon the sequence and go back to `Idle`.
    Reset(StateChangeReason),
    /// End of a successful sequence.
    Rest,
    /// Finishing work while idle; nothing to do.
    Abort,
}

/// The transition table.
///
/// Depends only on the state that finished, the state it was entered from,
/// the gesture of the current sequence and whether that gesture resolves.
pub fn transition_from(
    finished: InternalState,
    previous: InternalState,
    gesture: SelectionType,
    should_resolve: bool,
) -> Transition {
    use InternalState::*;

    match finished {
        Undefined | Idle => Transition::Abort,
        LongPressRecognized | ResolvingLongPressRecognized | TapGestureCommit => {
            Transition::To(GatheringSurroundings)
        }
        SelectionClearedRecognized => {
            if previous.is_idle() {
                Transition::Reset(StateChangeReason::ClearedSelection)
            } else {
                Transition::To(WaitingForPossibleTapNearPrevious)
            }
        }
        WaitingForPossibleTapNearPrevious => Transition::Reset(StateChangeReason::BasePageTap),
        TapRecognized => {
            if previous.is_idle() {
                Transition::To(TapGestureCommit)
            } else {
                Transition::To(WaitingForPossibleTapOnTapSelection)
            }
        }
        WaitingForPossibleTapOnTapSelection => Transition::To(TapGestureCommit),
        GatheringSurroundings => match gesture {
            SelectionType::LongPress => Transition::To(ShowingLiteralSearch),
            SelectionType::ResolvingLongPress => Transition::To(ShowResolvingUi),
            SelectionType::Tap | SelectionType::Undetermined => Transition::To(DecidingSuppression),
        },
        DecidingSuppression => Transition::To(StartShowingTapUi),
        StartShowingTapUi => Transition::To(ShowResolvingUi),
        ShowResolvingUi => {
            if should_resolve {
                Transition::To(Resolving)
            } else {
                Transition::To(ShowingTapSearch)
            }
        }
        Resolving => {
            if gesture == SelectionType::Tap {
                Transition::To(ShowingTapSearch)
            } else {
                Transition::To(ShowingResolvedLongPressSearch)
            }
        }
        ShowingLiteralSearch | ShowingTapSearch | ShowingResolvedLongPressSearch => {
            Transition::To(SearchCompleted)
        }
        SearchCompleted => Transition::Rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InternalState::*;

    const GESTURES: [SelectionType; 4] = [
        SelectionType::Undetermined,
        SelectionType::Tap,
        SelectionType::LongPress,
        SelectionType::ResolvingLongPress,
    ];

    #[test]
    fn test_table_is_deterministic() {
        for state in InternalState::ALL {
            for previous in InternalState::ALL {
                for gesture in GESTURES {
                    for resolve in [false, true] {
                        assert_eq!(
                            transition_from(state, previous, gesture, resolve),
                            transition_from(state, previous, gesture, resolve)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_no_transition_targets_a_start_state() {
        for state in InternalState::ALL {
            for previous in InternalState::ALL {
                for gesture in GESTURES {
                    for resolve in [false, true] {
                        if let Transition::To(next) = transition_from(state, previous, gesture, resolve) {
                            assert!(!next.is_start_state(), "{} -> {}", state, next);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_tap_waits_only_when_something_is_showing() {
        assert_eq!(
            transition_from(TapRecognized, Idle, SelectionType::Tap, true),
            Transition::To(TapGestureCommit)
        );
        assert_eq!(
            transition_from(TapRecognized, Undefined, SelectionType::Tap, true),
            Transition::To(TapGestureCommit)
        );
        assert_eq!(
            transition_from(TapRecognized, SearchCompleted, SelectionType::Tap, true),
            Transition::To(WaitingForPossibleTapOnTapSelection)
        );
    }

    #[test]
    fn test_cleared_selection() {
        assert_eq!(
            transition_from(SelectionClearedRecognized, Idle, SelectionType::Undetermined, false),
            Transition::Reset(StateChangeReason::ClearedSelection)
        );
        assert_eq!(
            transition_from(SelectionClearedRecognized, SearchCompleted, SelectionType::Undetermined, false),
            Transition::To(WaitingForPossibleTapNearPrevious)
        );
        assert!(matches!(
            transition_from(WaitingForPossibleTapNearPrevious, SearchCompleted, SelectionType::Undetermined, false),
            Transition::Reset(_)
        ));
    }

    #[test]
    fn test_gathering_branches_on_gesture() {
        assert_eq!(
            transition_from(GatheringSurroundings, Idle, SelectionType::LongPress, true),
            Transition::To(ShowingLiteralSearch)
        );
        assert_eq!(
            transition_from(GatheringSurroundings, Idle, SelectionType::ResolvingLongPress, true),
            Transition::To(ShowResolvingUi)
        );
        assert_eq!(
            transition_from(GatheringSurroundings, Idle, SelectionType::Tap, true),
            Transition::To(DecidingSuppression)
        );
    }

    #[test]
    fn test_resolve_branches() {
        assert_eq!(
            transition_from(ShowResolvingUi, Idle, SelectionType::Tap, true),
            Transition::To(Resolving)
        );
        assert_eq!(
            transition_from(ShowResolvingUi, Idle, SelectionType::Tap, false),
            Transition::To(ShowingTapSearch)
        );
        assert_eq!(
            transition_from(Resolving, Idle, SelectionType::Tap, true),
            Transition::To(ShowingTapSearch)
        );
        assert_eq!(
            transition_from(Resolving, Idle, SelectionType::ResolvingLongPress, true),
            Transition::To(ShowingResolvedLongPressSearch)
        );
    }

    #[test]
    fn test_terminal_and_idle_states() {
        assert_eq!(
            transition_from(SearchCompleted, Idle, SelectionType::Tap, true),
            Transition::Rest
        );
        assert_eq!(transition_from(Idle, Idle, SelectionType::Tap, true), Transition::Abort);
        assert_eq!(
            transition_from(Undefined, Idle, SelectionType::Tap, true),
            Transition::Abort
        );
    }
}
