/// Aggregates a batch of round-trip-time samples with a 10%-trimmed mean:
/// sort ascending, drop `floor(n * 0.1)` samples from each tail, average
/// what's left. Falls back to the untrimmed arithmetic mean if trimming
/// would leave nothing (this is always the case for `n <= 9`, since
/// `floor(n * 0.1) * 2 < n` only once `n >= 10`). Returns `None` for an
/// empty batch.
#[must_use]
pub fn trimmed_mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let trim = ((n as f64) * 0.1).floor() as usize;

    let trimmed = if trim * 2 < n { &sorted[trim..n - trim] } else { &sorted[..] };

    #[allow(clippy::cast_precision_loss)]
    Some(trimmed.iter().sum::<f64>() / trimmed.len() as f64)
}
