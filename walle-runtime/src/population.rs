//! Population composition and spawn ordering

/// Split `users` across `weights` by largest remainder
///
/// Quotas are `users * weight / total`; leftover users go to the largest
/// fractional parts, ties to the earlier archetype. Zero weights get no users.
pub fn apportion(users: usize, weights: &[f64]) -> Vec<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if users == 0 || total <= 0.0 {
        return vec![0; weights.len()];
    }

    let quotas: Vec<f64> = weights
        .iter()
        .map(|w| if *w > 0.0 { users as f64 * w / total } else { 0.0 })
        .collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();

    let assigned: usize = counts.iter().sum();
    let mut by_remainder: Vec<usize> = (0..weights.len()).filter(|&i| weights[i] > 0.0).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    for &index in by_remainder.iter().cycle().take(users.saturating_sub(assigned)) {
        counts[index] += 1;
    }
    counts
}

/// Interleave archetype indices by smooth weighted round-robin
///
/// Every prefix of the result stays close to the final proportions, so a
/// ramp cut short still has a representative mix.
pub fn spawn_order(counts: &[usize]) -> Vec<usize> {
    let total: i64 = counts.iter().map(|&c| c as i64).sum();
    let mut current = vec![0i64; counts.len()];
    let mut order = Vec::with_capacity(total as usize);

    for _ in 0..total {
        let mut best = None;
        for (index, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            current[index] += count as i64;
            if best.is_none_or(|b: usize| current[index] > current[b]) {
                best = Some(index);
            }
        }
        if let Some(index) = best {
            current[index] -= total;
            order.push(index);
        }
    }
    order
}
