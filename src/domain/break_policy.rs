use rand::Rng;

pub const MIN_BREAK_MINUTES: u32 = 5;
pub const MAX_BREAK_MINUTES: u32 = 20;
const MAX_JITTER_MINUTES: f64 = 3.0;

pub fn base_break_minutes(task_duration: u32) -> u32 {
    match task_duration {
        0..20 => 5,
        20..=45 => 10,
        _ => 15,
    }
}

pub fn compute_break<R: Rng + ?Sized>(task_duration: u32, rng: &mut R) -> u32 {
    let jitter = rng.gen_range(-MAX_JITTER_MINUTES..=MAX_JITTER_MINUTES);
    let raw = f64::from(base_break_minutes(task_duration)) + jitter;
    let clamped = raw.clamp(f64::from(MIN_BREAK_MINUTES), f64::from(MAX_BREAK_MINUTES));
    clamped.round() as u32
}
