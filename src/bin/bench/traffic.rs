// Call Traffic Generator: seedable, Poisson arrivals plus weighted call selection
// Drives the engine with the random operation sequences of one workload run

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::scenarios::CallWeights;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Propose,
    Dispute,
    Accept,
    DaoResolve,
    DaoCancel,
    DaoApprove,
    Timeout,
    RegistryCancel,
    Reconcile,
    Withdraw,
    TuneParams,
}

pub struct CallGenerator {
    rng: ChaCha8Rng,
    table: Vec<(Call, u32)>,
    total_weight: u32,
    arrival_rate: f64,
    pub arrivals: u32,
    pub calls: u64,
}

impl CallGenerator {
    pub fn new(rng: ChaCha8Rng, weights: CallWeights, arrival_rate: f64) -> Self {
        let table: Vec<(Call, u32)> = vec![
            (Call::Propose, weights.propose),
            (Call::Dispute, weights.dispute),
            (Call::Accept, weights.accept),
            (Call::DaoResolve, weights.dao_resolve),
            (Call::DaoCancel, weights.dao_cancel),
            (Call::DaoApprove, weights.dao_approve),
            (Call::Timeout, weights.timeout),
            (Call::RegistryCancel, weights.registry_cancel),
            (Call::Reconcile, weights.reconcile),
            (Call::Withdraw, weights.withdraw),
            (Call::TuneParams, weights.tune_params),
        ]
        .into_iter()
        .filter(|(_, w)| *w > 0)
        .collect();
        let total_weight = table.iter().map(|(_, w)| w).sum();
        Self {
            rng,
            table,
            total_weight,
            arrival_rate,
            arrivals: 0,
            calls: 0,
        }
    }

    /// Number of conditions to create this step.
    pub fn arrivals(&mut self) -> u32 {
        let n = poisson_sample(&mut self.rng, self.arrival_rate);
        self.arrivals += n;
        n
    }

    pub fn next_call(&mut self) -> Option<Call> {
        if self.total_weight == 0 {
            return None;
        }
        self.calls += 1;
        let mut r = self.rng.gen_range(0..self.total_weight);
        for (call, weight) in &self.table {
            if r < *weight {
                return Some(*call);
            }
            r -= weight;
        }
        None
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.rng.gen_range(0..items.len()))
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform in `[mean / 2, mean * 3 / 2]`.
    pub fn jitter(&mut self, mean: u64) -> u64 {
        let lo = mean / 2;
        let hi = mean + mean / 2;
        if hi <= lo {
            return mean;
        }
        self.rng.gen_range(lo..=hi)
    }

    pub fn range(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }
}

/// Poisson sampling via Knuth algorithm.
/// For λ < 30, uses direct method. For larger λ, uses normal approximation.
fn poisson_sample(rng: &mut ChaCha8Rng, lambda: f64) -> u32 {
    if lambda <= 0.0 {
        return 0;
    }
    if lambda < 30.0 {
        let l = (-lambda).exp();
        let mut k: u32 = 0;
        let mut p: f64 = 1.0;
        loop {
            k += 1;
            p *= rng.gen::<f64>();
            if p <= l {
                return k - 1;
            }
        }
    } else {
        let u1: f64 = rng.gen();
        let u2: f64 = rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        let result = lambda + lambda.sqrt() * z;
        result.round().max(0.0) as u32
    }
}
