use ahash::AHashSet;

use crate::atn::{Atn, BlockKind, StateId, StateKind, TransitionKind};

/// Strip `p-x->q-ε->end` down to `p-x->end` everywhere along an alternative
/// that was just hooked up to the block end `end`.
///
/// The walk follows transition targets and stays inside the rule of `start`.
/// Rule calls end the walk since the called rule is not linked back yet.
pub(crate) fn remove_tail_epsilons(atn: &mut Atn, start: StateId) {
    let Some(rule_index) = atn.state(start).map(|s| s.rule_index()) else {
        return;
    };

    let mut visited = AHashSet::new();
    let mut stack = vec![start];

    while let Some(p) = stack.pop() {
        if !visited.insert(p) {
            continue;
        }

        let Some(state) = atn.state(p) else {
            continue;
        };

        if state.rule_index() != rule_index {
            continue;
        }

        visit_state(atn, p);

        if let Some(state) = atn.state(p) {
            // push in reverse so that the first transition is walked first
            stack.extend(state.transitions().iter().rev().map(|t| t.target));
        }
    }
}

fn visit_state(atn: &mut Atn, p: StateId) {
    let state = &atn[p];

    if state.kind() != &StateKind::Basic || state.transitions().len() != 1 {
        return;
    }

    let transition = &state.transitions()[0];
    let q = match &transition.kind {
        TransitionKind::Rule { follow, .. } => *follow,
        _ => transition.target,
    };

    let Some(q_state) = atn.state(q) else {
        return;
    };

    if q_state.kind() != &StateKind::Basic || q_state.transitions().len() != 1 {
        return;
    }

    let trans = &q_state.transitions()[0];

    if !trans.is_epsilon() || matches!(trans.kind, TransitionKind::Action { .. }) {
        return;
    }

    let block_end = trans.target;

    let Some(StateKind::BlockEnd { start }) = atn.state(block_end).map(|s| s.kind()) else {
        return;
    };

    // tails of star blocks stay
    let in_star_block = start
        .and_then(|s| atn.state(s))
        .map(|s| matches!(s.kind(), StateKind::BlockStart { kind: BlockKind::Star, .. }))
        .unwrap_or(false);

    if in_star_block {
        return;
    }

    let transition = &mut atn[p].transitions_mut()[0];

    match &mut transition.kind {
        TransitionKind::Rule { follow, .. } => *follow = block_end,
        _ => transition.target = block_end,
    }

    atn.remove_state(q);
}
