//! Vector similarity and ranking helpers for embedding-based labelling.

use itertools::Itertools;

/// Cosine similarity of two vectors. Zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let Some(max) = logits.iter().copied().reduce(f32::max) else {
        return Vec::new();
    };
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Softmax over `scale * cosine(query, candidate)` for every candidate.
pub fn scaled_similarity_probs(query: &[f32], candidates: &[Vec<f32>], scale: f32) -> Vec<f32> {
    let logits: Vec<f32> = candidates
        .iter()
        .map(|c| scale * cosine_similarity(query, c))
        .collect();
    softmax(&logits)
}

/// Indices of `scores` in decreasing order; equal scores keep their original order.
pub fn ranked_indices(scores: &[f32]) -> Vec<usize> {
    (0..scores.len())
        .sorted_by(|&a, &b| scores[b].total_cmp(&scores[a]))
        .collect()
}
