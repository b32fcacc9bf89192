// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Ranked word lists along the latent axes.

use std::collections::HashSet;

use ndarray::ArrayView2;

use crate::corpus::Vocabulary;
use crate::{LexRankError, LexRankResult, Scalar};

/// A vocabulary word with its score on one latent axis.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedWord {
    pub word: String,
    pub score: Scalar,
}

/// Ranks the vocabulary along every latent axis of a word-factor matrix.
///
/// Each returned list is sorted descending by score; ties fall back to
/// lexicographic order so repeated runs produce identical lists.
pub fn axis_rankings(
    word_factor: ArrayView2<'_, Scalar>,
    vocabulary: &Vocabulary,
) -> LexRankResult<Vec<Vec<RankedWord>>> {
    let (rows, axes) = word_factor.dim();
    if rows != vocabulary.len() {
        return Err(LexRankError::VocabularySize {
            words: vocabulary.len(),
            rows,
        });
    }

    let mut rankings = Vec::with_capacity(axes);
    for axis in 0..axes {
        let mut entries: Vec<RankedWord> = word_factor
            .column(axis)
            .iter()
            .zip(vocabulary.words())
            .map(|(&score, word)| RankedWord {
                word: word.clone(),
                score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.word.cmp(&b.word)));
        rankings.push(entries);
    }
    Ok(rankings)
}

/// Words appearing in the top `n` of every ranking, sorted.
///
/// Combining several runs by top-`n` intersection keeps only the words that
/// rank highly under every configuration; an empty input yields an empty
/// list.
pub fn shared_top_words(rankings: &[Vec<RankedWord>], n: usize) -> Vec<String> {
    let mut shared: Option<HashSet<&str>> = None;
    for ranking in rankings {
        let top: HashSet<&str> = ranking
            .iter()
            .take(n)
            .map(|entry| entry.word.as_str())
            .collect();
        shared = Some(match shared {
            Some(existing) => existing.intersection(&top).copied().collect(),
            None => top,
        });
    }

    let mut words: Vec<String> = shared
        .unwrap_or_default()
        .into_iter()
        .map(str::to_owned)
        .collect();
    words.sort();
    words
}
