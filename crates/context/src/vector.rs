//! Vector similarity utilities.

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank `items` by cosine similarity of their vector to `query`.
///
/// Returns at most `limit` `(item, similarity)` pairs, most similar first.
/// Equal scores keep their original order.
pub fn top_k<'a, T, F>(items: &'a [T], vector: F, query: &[f32], limit: usize) -> Vec<(&'a T, f32)>
where
    F: Fn(&T) -> &[f32],
{
    let mut scored: Vec<(&T, f32)> = items
        .iter()
        .map(|item| (item, cosine_similarity(vector(item), query)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}
