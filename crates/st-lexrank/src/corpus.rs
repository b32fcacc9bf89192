// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Vocabulary bookkeeping and embedding-stack assembly.

use std::collections::HashMap;

use ndarray::{Array3, ArrayView2};

use crate::{LexRankError, LexRankResult, Scalar};

/// Row-aligned vocabulary: word `i` labels row `i` of both embedding
/// matrices and of the word factor the solver returns.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary, rejecting duplicate words.
    pub fn new(words: Vec<String>) -> LexRankResult<Self> {
        let mut index = HashMap::with_capacity(words.len());
        for (position, word) in words.iter().enumerate() {
            if index.insert(word.clone(), position).is_some() {
                return Err(LexRankError::DuplicateWord { word: word.clone() });
            }
        }
        Ok(Self { words, index })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word labelling the given row.
    pub fn word(&self, row: usize) -> Option<&str> {
        self.words.get(row).map(String::as_str)
    }

    /// Row labelled by the given word.
    pub fn row(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}

/// Stacks two equal-shape embedding matrices along a new third axis:
/// slice 0 holds corpus A, slice 1 corpus B.
pub fn stack_embeddings(
    corpus_a: ArrayView2<'_, Scalar>,
    corpus_b: ArrayView2<'_, Scalar>,
) -> LexRankResult<Array3<Scalar>> {
    let (a_rows, a_cols) = corpus_a.dim();
    let (b_rows, b_cols) = corpus_b.dim();
    if (a_rows, a_cols) != (b_rows, b_cols) {
        return Err(LexRankError::EmbeddingShapeMismatch {
            a_rows,
            a_cols,
            b_rows,
            b_cols,
        });
    }

    let mut stacked = Array3::zeros((a_rows, a_cols, 2));
    for ((i, j), &value) in corpus_a.indexed_iter() {
        stacked[[i, j, 0]] = value;
    }
    for ((i, j), &value) in corpus_b.indexed_iter() {
        stacked[[i, j, 1]] = value;
    }
    Ok(stacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn vocab(words: &[&str]) -> Vocabulary {
        Vocabulary::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    #[test]
    fn lookups_round_trip() {
        let vocabulary = vocab(&["rain", "snow", "neon"]);
        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.word(1), Some("snow"));
        assert_eq!(vocabulary.row("neon"), Some(2));
        assert_eq!(vocabulary.row("absent"), None);
    }

    #[test]
    fn duplicate_words_are_rejected() {
        let err = Vocabulary::new(vec!["echo".into(), "echo".into()]).unwrap_err();
        assert!(matches!(err, LexRankError::DuplicateWord { word } if word == "echo"));
    }

    #[test]
    fn stacking_places_each_corpus_in_its_slice() {
        let corpus_a = array![[1.0, 2.0], [3.0, 4.0]];
        let corpus_b = array![[5.0, 6.0], [7.0, 8.0]];
        let stacked = stack_embeddings(corpus_a.view(), corpus_b.view()).unwrap();
        assert_eq!(stacked.dim(), (2, 2, 2));
        assert_eq!(stacked[[0, 1, 0]], 2.0);
        assert_eq!(stacked[[0, 1, 1]], 6.0);
        assert_eq!(stacked[[1, 0, 0]], 3.0);
        assert_eq!(stacked[[1, 0, 1]], 7.0);
    }

    #[test]
    fn mismatched_embeddings_are_rejected() {
        let left = array![[1.0, 2.0]];
        let right = array![[1.0], [2.0]];
        let err = stack_embeddings(left.view(), right.view()).unwrap_err();
        assert!(matches!(err, LexRankError::EmbeddingShapeMismatch { .. }));
    }
}
