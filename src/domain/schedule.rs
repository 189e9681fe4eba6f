use crate::domain::break_policy::compute_break;
use crate::domain::models::{Schedule, ScheduleBlock, Task};
use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_BREAK_TITLE: &str = "Break ☕";

pub fn generate<R: Rng + ?Sized>(
    tasks: &[Task],
    start_minute: u32,
    break_title: &str,
    rng: &mut R,
) -> Schedule {
    if tasks.is_empty() {
        return Schedule::new();
    }

    let mut order = tasks.to_vec();
    order.shuffle(rng);
    lay_out(
        order.iter().map(|task| (task.name.as_str(), task.duration)),
        start_minute,
        break_title,
        rng,
    )
}

pub fn lay_out<'a, I, R>(tasks: I, start_minute: u32, break_title: &str, rng: &mut R) -> Schedule
where
    I: IntoIterator<Item = (&'a str, u32)>,
    R: Rng + ?Sized,
{
    let mut tasks = tasks.into_iter().peekable();
    let mut blocks = Vec::new();
    let mut cursor = start_minute;

    while let Some((title, duration)) = tasks.next() {
        blocks.push(ScheduleBlock::task(title, cursor, duration));
        cursor = cursor.saturating_add(duration);

        if tasks.peek().is_some() {
            let break_minutes = compute_break(duration, rng);
            blocks.push(ScheduleBlock::rest(break_title, cursor, break_minutes));
            cursor = cursor.saturating_add(break_minutes);
        }
    }

    Schedule::from_blocks(blocks)
}
