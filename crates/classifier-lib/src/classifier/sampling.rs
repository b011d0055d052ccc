//! Monte-Carlo voting over the predictive distribution

use crate::posterior::{argmax, softmax_in_place, ScoreDistribution};
use rand::Rng;

/// Outcome of drawing `samples` posterior samples for one input
#[derive(Debug, Clone)]
pub struct VoteTally {
    /// Class with the most arg-max votes, lowest index on ties
    pub winner: usize,
    /// Votes per class
    pub votes: Vec<usize>,
    /// Mean of the winner's probability across draws
    pub mean_probability: f64,
    /// Population standard deviation of the winner's probability
    pub std_deviation: f64,
}

impl VoteTally {
    pub fn vote_share(&self) -> f64 {
        let total: usize = self.votes.iter().sum();
        if total == 0 {
            return 0.0;
        }
        self.votes[self.winner] as f64 / total as f64
    }
}

/// Draw `samples` score vectors, vote, and summarize the winner's probability
///
/// Each draw samples every class score jointly from its Gaussian marginal,
/// applies softmax and votes for the arg-max class. The winner is only known
/// after all votes are in, so running sums of every class probability and
/// its square are kept instead of the draws themselves.
pub fn draw_votes<R: Rng + ?Sized>(
    scores: &[ScoreDistribution],
    samples: usize,
    rng: &mut R,
) -> VoteTally {
    let classes = scores.len();
    let mut votes = vec![0usize; classes];
    let mut sums = vec![0.0; classes];
    let mut squares = vec![0.0; classes];
    let mut draw = vec![0.0; classes];

    for _ in 0..samples {
        for (slot, dist) in draw.iter_mut().zip(scores) {
            *slot = dist.sample(rng);
        }
        softmax_in_place(&mut draw);
        votes[argmax(&draw)] += 1;
        for k in 0..classes {
            sums[k] += draw[k];
            squares[k] += draw[k] * draw[k];
        }
    }

    let winner = most_votes(&votes);
    if classes == 0 || samples == 0 {
        return VoteTally {
            winner,
            votes,
            mean_probability: 0.0,
            std_deviation: 0.0,
        };
    }
    let n = samples as f64;
    let mean_probability = sums[winner] / n;
    let variance = (squares[winner] / n - mean_probability * mean_probability).max(0.0);

    VoteTally {
        winner,
        votes,
        mean_probability,
        std_deviation: variance.sqrt(),
    }
}

fn most_votes(votes: &[usize]) -> usize {
    let mut best = 0;
    for (i, v) in votes.iter().enumerate().skip(1) {
        if *v > votes[best] {
            best = i;
        }
    }
    best
}
