use crate::error::StateMachineError;
use crate::types::ProxyState;

/// Validates a proxy state transition.
///
/// Illegal transitions return an error; with the `strict-debug` feature they
/// panic instead so the offending call site shows up immediately.
pub fn validate_transition(from: ProxyState, to: ProxyState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal proxy state transition attempted: {:?} -> {:?}", from, to);

        Err(StateMachineError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: ProxyState) -> Vec<ProxyState> {
    use ProxyState::*;
    match from {
        Empty => vec![Checking],
        // Invalidated: host failure mid-check, retried on the next opportunity.
        Checking => vec![Valid, AwaitingParent, Rejected, Invalidated, Empty],
        Valid => vec![Invalidated, Empty],
        Invalidated => vec![Checking, Empty],
        AwaitingParent => vec![Checking, Rejected, Empty],
        Rejected => vec![Empty],
    }
}

fn allowed(from: ProxyState, to: ProxyState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
