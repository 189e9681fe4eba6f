use crate::domain::models::{Schedule, MAX_BLOCK_MINUTES};
use crate::domain::schedule::lay_out;
use rand::Rng;

/// Moves the task at task-order position `from` to position `to` and rebuilds
/// the timeline from `start_minute` with freshly drawn breaks.
///
/// Positions count task blocks only. Out-of-range positions or `from == to`
/// return the schedule unchanged.
pub fn reorder<R: Rng + ?Sized>(
    schedule: &Schedule,
    from: usize,
    to: usize,
    start_minute: u32,
    break_title: &str,
    rng: &mut R,
) -> Schedule {
    let mut tasks: Vec<(&str, u32)> = schedule
        .task_blocks()
        .map(|block| (block.title.as_str(), block.duration))
        .collect();
    if from == to || from >= tasks.len() || to >= tasks.len() {
        return schedule.clone();
    }

    let moved = tasks.remove(from);
    tasks.insert(to, moved);
    lay_out(tasks, start_minute, break_title, rng)
}

pub fn reorder_by_block_index<R: Rng + ?Sized>(
    schedule: &Schedule,
    dragged_block: usize,
    target_block: usize,
    start_minute: u32,
    break_title: &str,
    rng: &mut R,
) -> Schedule {
    if dragged_block == target_block {
        return schedule.clone();
    }
    let positions = schedule.task_positions();
    let from = positions.iter().position(|&index| index == dragged_block);
    let to = positions.iter().position(|&index| index == target_block);
    match (from, to) {
        (Some(from), Some(to)) => reorder(schedule, from, to, start_minute, break_title, rng),
        _ => schedule.clone(),
    }
}

/// Sets the duration of the break at `block_index` and re-times every block.
///
/// `None`, zero or more than a day cancels the edit, as does an index that is
/// not a break.
pub fn edit_break_duration(
    schedule: &Schedule,
    block_index: usize,
    new_duration: Option<u32>,
    start_minute: u32,
) -> Schedule {
    let Some(new_duration) = new_duration.filter(|value| (1..=MAX_BLOCK_MINUTES).contains(value)) else {
        return schedule.clone();
    };
    if !schedule.get(block_index).is_some_and(|block| block.is_break()) {
        return schedule.clone();
    }

    let mut edited = schedule.clone();
    edited.blocks_mut()[block_index].duration = new_duration;
    recalculate(&edited, start_minute)
}

pub fn recalculate(schedule: &Schedule, start_minute: u32) -> Schedule {
    let mut recalculated = schedule.clone();
    let mut cursor = start_minute;
    for block in recalculated.blocks_mut() {
        block.start = cursor;
        block.end = cursor.saturating_add(block.duration);
        cursor = block.end;
    }
    recalculated
}
