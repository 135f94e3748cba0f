//! Roadmap column ordering.
//!
//! Workflow states are grouped into five buckets (backlog, unstarted,
//! started, completed, canceled) and sorted by `(bucket, position)`. States
//! whose type Linear doesn't report in a known form get a bucket from their
//! relative position instead.

use std::cmp::Ordering;

use serde::Serialize;

use crate::types::{Issue, StateType, WorkflowState};

const LAST_BUCKET: usize = 4;
const BUCKET_COUNT: usize = 5;
/// Bucket for a lone state of unknown type ("unstarted").
const SINGLE_STATE_BUCKET: u8 = 1;

/// One roadmap column and the issues currently in it.
#[derive(Serialize, Debug, Clone)]
pub struct Column {
    pub state: WorkflowState,
    pub group_order: u8,
    pub issues: Vec<Issue>,
}

fn type_bucket(state_type: StateType) -> Option<u8> {
    match state_type {
        StateType::Backlog => Some(0),
        StateType::Unstarted => Some(1),
        StateType::Started => Some(2),
        StateType::Completed => Some(3),
        StateType::Canceled => Some(4),
        StateType::Unknown => None,
    }
}

fn cmp_rank(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Bucket of every state, in input order.
pub fn buckets(states: &[WorkflowState]) -> Vec<u8> {
    let total = states.len();
    let mut sorted_positions: Vec<f64> = states.iter().map(WorkflowState::rank).collect();
    sorted_positions.sort_by(|a, b| cmp_rank(*a, *b));

    states
        .iter()
        .map(|state| {
            type_bucket(state.state_type).unwrap_or_else(|| {
                if total <= 1 {
                    return SINGLE_STATE_BUCKET;
                }
                // First occurrence, so equal positions share a bucket
                let index = sorted_positions
                    .iter()
                    .position(|p| cmp_rank(*p, state.rank()) == Ordering::Equal)
                    .unwrap_or(0);
                (index * BUCKET_COUNT / total).min(LAST_BUCKET) as u8
            })
        })
        .collect()
}

/// States paired with their bucket, sorted for column rendering.
pub fn classify(states: Vec<WorkflowState>) -> Vec<(u8, WorkflowState)> {
    let mut classified: Vec<(u8, WorkflowState)> =
        buckets(&states).into_iter().zip(states).collect();

    // Vec::sort_by is stable: ties keep their input order
    classified.sort_by(|(a_bucket, a), (b_bucket, b)| {
        a_bucket
            .cmp(b_bucket)
            .then_with(|| cmp_rank(a.rank(), b.rank()))
    });
    classified
}

pub fn classify_and_sort(states: Vec<WorkflowState>) -> Vec<WorkflowState> {
    classify(states).into_iter().map(|(_, state)| state).collect()
}

/// Group issues into the team's sorted state columns.
///
/// Issues whose state is not one of `states` (or that have no state) are
/// left off the board.
pub fn build_board(states: Vec<WorkflowState>, issues: Vec<Issue>) -> Vec<Column> {
    let mut columns: Vec<Column> = classify(states)
        .into_iter()
        .map(|(group_order, state)| Column {
            state,
            group_order,
            issues: Vec::new(),
        })
        .collect();

    for issue in issues {
        let Some(state_id) = issue.state.as_ref().map(|s| s.id.clone()) else {
            continue;
        };
        if let Some(column) = columns.iter_mut().find(|c| c.state.id == state_id) {
            column.issues.push(issue);
        }
    }

    columns
}
