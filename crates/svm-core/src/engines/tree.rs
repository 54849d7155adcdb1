//! Reduction tree and output stage shared by both engines.

use crate::fixed::{tree_level, QFormat};
use crate::scorer::Score;
use svm_chip::timing::tree_levels;

/// Value travelling down the tree: the current partial sums plus the
/// product-scale bias delayed alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub terms: Vec<i64>,
    pub bias: i64,
}

/// `⌈log2 inputs⌉` level registers followed by the output register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReductionTree {
    levels: Vec<Option<Token>>,
    out: Option<Score>,
}

impl ReductionTree {
    pub fn new(inputs: usize) -> Self {
        Self {
            levels: vec![None; tree_levels(inputs) as usize],
            out: None,
        }
    }

    pub fn output(&self) -> Option<Score> {
        self.out
    }

    pub fn occupancy(&self) -> usize {
        self.levels.iter().filter(|l| l.is_some()).count() + usize::from(self.out.is_some())
    }

    /// State after one edge.
    ///
    /// `feed` is the register in front of the tree as it stands this cycle.
    /// The bias joins at the last level (or at the output stage when there
    /// is no level); `live_bias` replaces the delayed copy when set.
    pub fn next(&self, feed: Option<&Token>, live_bias: Option<i64>, format: &QFormat) -> Self {
        let depth = self.levels.len();
        let levels = (0..depth)
            .map(|d| {
                let src = if d == 0 { feed } else { self.levels[d - 1].as_ref() };
                src.map(|t| {
                    let mut terms = tree_level(&t.terms);
                    if d + 1 == depth {
                        if let Some(first) = terms.first_mut() {
                            *first += live_bias.unwrap_or(t.bias);
                        }
                    }
                    Token {
                        terms,
                        bias: t.bias,
                    }
                })
            })
            .collect();

        let last = if depth == 0 {
            feed
        } else {
            self.levels[depth - 1].as_ref()
        };
        let out = last.map(|t| {
            let mut sum: i64 = t.terms.iter().sum();
            if depth == 0 {
                sum += live_bias.unwrap_or(t.bias);
            }
            Score::from_sum(format, sum)
        });

        Self { levels, out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: QFormat = QFormat::Q8_8;

    fn run(tree: &mut ReductionTree, token: Token) -> (usize, Score) {
        let mut feed = Some(token);
        for cycle in 1.. {
            *tree = tree.next(feed.as_ref(), None, &Q);
            feed = None;
            if let Some(s) = tree.output() {
                return (cycle, s);
            }
            assert!(cycle < 64, "tree never produced output");
        }
        unreachable!()
    }

    #[test]
    fn five_terms_take_three_levels_plus_output() {
        let mut tree = ReductionTree::new(5);
        let (cycles, score) = run(
            &mut tree,
            Token {
                terms: vec![256, 512, 768, 1024, 1280],
                bias: 256 * 256,
            },
        );
        assert_eq!(cycles, 4);
        // (3840 + 65536) >> 8
        assert_eq!(score.decision, 271);
        assert_eq!(tree.next(None, None, &Q).output(), None);
    }

    #[test]
    fn single_term_adds_bias_at_output() {
        let mut tree = ReductionTree::new(1);
        let (cycles, score) = run(
            &mut tree,
            Token {
                terms: vec![-512],
                bias: 256,
            },
        );
        assert_eq!(cycles, 1);
        assert_eq!(score.sum, -256);
        assert_eq!(score.decision, -1);
        assert!(!score.class);
    }

    #[test]
    fn live_bias_replaces_delayed_copy() {
        let tree = ReductionTree::new(2);
        let token = Token {
            terms: vec![0, 0],
            bias: 1000,
        };
        let t1 = tree.next(Some(&token), Some(-1), &Q);
        let t2 = t1.next(None, Some(-1), &Q);
        assert_eq!(t2.output().map(|s| s.sum), Some(-1));
    }
}
