/// Bootcamp average cost: the mean course tuition rounded up to the next
/// multiple of 10. `None` when the bootcamp has no courses.
pub fn average_cost(tuitions: &[f64]) -> Option<f64> {
    if tuitions.is_empty() {
        return None;
    }
    let mean = tuitions.iter().sum::<f64>() / tuitions.len() as f64;
    Some((mean / 10.0).ceil() * 10.0)
}
