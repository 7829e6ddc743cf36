//! Viterbi-smoothed pitch decoding
//!
//! A 360-state hidden Markov model over activation bins. Transitions are
//! banded (`max(12 - |i - j|, 0)`, row-normalized) so the path can move at
//! most 11 bins per frame, trading instantaneous peak accuracy for temporal
//! consistency. Observations are the per-frame argmax bins; emission places
//! probability 0.1 on the observed state and spreads the rest uniformly.
//! Cents are then decoded by local averaging around the chosen state.

use ndarray::Array2;

use crate::features::pitch::decoder::{argmax, local_average_cents};
use crate::ml::ACTIVATION_BINS;

/// Maximum per-frame state jump; transitions at or beyond this distance have
/// zero probability
const TRANSITION_BAND: usize = 12;

/// Probability mass the emission model puts on the observed state
const SELF_EMISSION: f64 = 0.1;

/// Row-normalized log transition probability from state `i` to state `j`
fn log_transition(i: usize, j: usize) -> f64 {
    let dist = i.abs_diff(j);
    if dist >= TRANSITION_BAND {
        return f64::NEG_INFINITY;
    }

    // Row sum of max(12 - |i - j|, 0) over j, accounting for edge clipping
    let mut row_sum = 0.0f64;
    let lo = i.saturating_sub(TRANSITION_BAND - 1);
    let hi = (i + TRANSITION_BAND).min(ACTIVATION_BINS);
    for k in lo..hi {
        row_sum += (TRANSITION_BAND - i.abs_diff(k)) as f64;
    }

    (((TRANSITION_BAND - dist) as f64) / row_sum).ln()
}

/// Log emission probability of observing bin `obs` from state `state`
fn log_emission(state: usize, obs: usize) -> f64 {
    if state == obs {
        (SELF_EMISSION + (1.0 - SELF_EMISSION) / ACTIVATION_BINS as f64).ln()
    } else {
        ((1.0 - SELF_EMISSION) / ACTIVATION_BINS as f64).ln()
    }
}

/// Most likely state path for a sequence of observed argmax bins
fn viterbi_path(observations: &[usize]) -> Vec<usize> {
    let n_frames = observations.len();
    if n_frames == 0 {
        return vec![];
    }

    let uniform_start = (1.0 / ACTIVATION_BINS as f64).ln();

    let mut cost = vec![0.0f64; ACTIVATION_BINS];
    for (state, c) in cost.iter_mut().enumerate() {
        *c = uniform_start + log_emission(state, observations[0]);
    }

    // back[t][state] = predecessor that maximized the path into `state`
    let mut back = vec![vec![0usize; ACTIVATION_BINS]; n_frames];

    let mut next_cost = vec![0.0f64; ACTIVATION_BINS];
    for t in 1..n_frames {
        for state in 0..ACTIVATION_BINS {
            let lo = state.saturating_sub(TRANSITION_BAND - 1);
            let hi = (state + TRANSITION_BAND).min(ACTIVATION_BINS);

            let mut best_prev = lo;
            let mut best_score = f64::NEG_INFINITY;
            for prev in lo..hi {
                let score = cost[prev] + log_transition(prev, state);
                if score > best_score {
                    best_score = score;
                    best_prev = prev;
                }
            }

            next_cost[state] = best_score + log_emission(state, observations[t]);
            back[t][state] = best_prev;
        }
        std::mem::swap(&mut cost, &mut next_cost);
    }

    // Backtrace from the best final state
    let mut path = vec![0usize; n_frames];
    let mut state = 0usize;
    let mut best = f64::NEG_INFINITY;
    for (s, &c) in cost.iter().enumerate() {
        if c > best {
            best = c;
            state = s;
        }
    }
    path[n_frames - 1] = state;
    for t in (1..n_frames).rev() {
        state = back[t][state];
        path[t - 1] = state;
    }

    path
}

/// Decode cents for the whole sequence with Viterbi path smoothing
///
/// The path is computed over per-frame argmax observations; each frame's
/// cents value is then the weighted local average of the original salience
/// around the path state (not around the frame's own peak).
pub fn to_viterbi_cents(activation: &Array2<f32>) -> Vec<f64> {
    let observations: Vec<usize> = activation.outer_iter().map(|row| argmax(row)).collect();
    let path = viterbi_path(&observations);

    activation
        .outer_iter()
        .zip(path.iter())
        .map(|(row, &state)| local_average_cents(row, state))
        .collect()
}
