//! Probabilistic finality.
//!
//! A transaction included `z` blocks deep is `z - 1` blocks ahead of any
//! competing fork. Following the double-spend race analysis of the Bitcoin
//! paper, the probability that an adversary controlling a share `q` of the
//! block production never catches up from `n` blocks behind is
//!
//! ```text
//! λ = n·q/p
//! confidence = Σ_{k=0}^{n} Poisson(k; λ)·(1 − (q/p)^(n−k))
//! ```
//!
//! With `q >= 0.5` the race is lost asymptotically. The series is then
//! evaluated with `q` clamped just below one half and capped at the
//! configured saturation ceiling, so confidence keeps growing with depth but
//! never claims more than the operator allows.
//!
//! Evaluation cost does not grow with the depth. Deep transactions are
//! settled by a closed-form bound on the catch-up probability, and the series
//! only visits the Poisson terms within a fixed number of standard deviations
//! of `λ`.

use crate::AdapterError;
use gateway_types::Transaction;
use std::f64::consts::PI;

/// Adversary share used in place of any `q >= 0.5`.
const SATURATED_RATIO: f64 = 0.49;

/// Deepest depth examined by [`ConfidenceCalculator::required_depth`].
pub const MAX_SEARCH_DEPTH: u64 = 1 << 16;

/// Catch-up probabilities below this round `1 - p` to exactly 1.0.
const NEGLIGIBLE_RISK: f64 = f64::EPSILON / 4.0;

/// Half-width of the summed Poisson window, in standard deviations.
const WINDOW_SIGMAS: f64 = 12.0;

/// Below this, `ln k!` is summed exactly instead of using Stirling's series.
const STIRLING_THRESHOLD: u64 = 20;

/// Converts block depth into a probability of irreversibility.
///
/// Stateless apart from its two parameters. Never blocks and performs no I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceCalculator {
	adversary_ratio: f64,
	saturation_ceiling: f64,
}

impl ConfidenceCalculator {
	/// Creates a calculator for one chain.
	///
	/// # Arguments
	///
	/// * `adversary_ratio` - Share `q` of block production held by an adversary, in `[0, 1)`
	/// * `saturation_ceiling` - Cap applied when `q >= 0.5`, in `(0, 1)`
	///
	/// # Returns
	///
	/// The calculator, or `AdapterError::Configuration` when a parameter is
	/// out of range. A ceiling of 1 would let a saturated chain claim
	/// certainty, so it is rejected.
	pub fn new(adversary_ratio: f64, saturation_ceiling: f64) -> Result<Self, AdapterError> {
		if !(0.0..1.0).contains(&adversary_ratio) {
			return Err(AdapterError::Configuration(format!(
				"adversary ratio {} must be in [0, 1)",
				adversary_ratio
			)));
		}
		if !(saturation_ceiling > 0.0 && saturation_ceiling < 1.0) {
			return Err(AdapterError::Configuration(format!(
				"saturation ceiling {} must be in (0, 1)",
				saturation_ceiling
			)));
		}
		Ok(Self {
			adversary_ratio,
			saturation_ceiling,
		})
	}

	pub fn adversary_ratio(&self) -> f64 {
		self.adversary_ratio
	}

	pub fn saturation_ceiling(&self) -> f64 {
		self.saturation_ceiling
	}

	fn is_saturated(&self) -> bool {
		self.adversary_ratio >= 0.5
	}

	/// Confidence of a transaction given the current chain height.
	///
	/// A transaction without a block, or whose block lies above the current
	/// height, has confidence 0.
	pub fn confidence(&self, transaction: &Transaction, current_height: u64) -> f64 {
		match transaction.block_number() {
			Some(number) if current_height >= number => {
				self.for_depth(current_height - number + 1)
			},
			_ => 0.0,
		}
	}

	/// Confidence for a block depth, where depth 1 is the chain head.
	pub fn for_depth(&self, depth: u64) -> f64 {
		if depth == 0 {
			return 0.0;
		}
		if self.adversary_ratio == 0.0 {
			return 1.0;
		}

		let q = if self.is_saturated() {
			SATURATED_RATIO
		} else {
			self.adversary_ratio
		};
		let ratio = q / (1.0 - q);
		let n = depth - 1;
		if n == 0 {
			return 0.0;
		}

		let risk = catch_up_bound(n, ratio);
		if risk < NEGLIGIBLE_RISK {
			return self.cap(1.0);
		}
		if self.is_saturated() && 1.0 - risk >= self.saturation_ceiling {
			return self.saturation_ceiling;
		}
		self.cap(race_series(n, ratio))
	}

	fn cap(&self, confidence: f64) -> f64 {
		if self.is_saturated() {
			confidence.min(self.saturation_ceiling)
		} else {
			confidence
		}
	}

	/// Smallest depth whose confidence reaches `target`.
	///
	/// Returns `None` when the target cannot be reached within
	/// [`MAX_SEARCH_DEPTH`] blocks, which is always the case for targets above
	/// the saturation ceiling of a saturated chain.
	pub fn required_depth(&self, target: f64) -> Option<u64> {
		if target <= 0.0 {
			return Some(0);
		}
		if self.is_saturated() && target > self.saturation_ceiling {
			return None;
		}

		let mut high = 1;
		while self.for_depth(high) < target {
			if high >= MAX_SEARCH_DEPTH {
				return None;
			}
			high = (high * 2).min(MAX_SEARCH_DEPTH);
		}

		let mut low = high / 2;
		while low + 1 < high {
			let mid = low + (high - low) / 2;
			if self.for_depth(mid) >= target {
				high = mid;
			} else {
				low = mid;
			}
		}
		Some(high)
	}
}

/// Upper bound on the probability that the adversary ever catches up from
/// `n` blocks behind.
///
/// Splits the attacker's progress at `m`, halfway between `λ` and `n`: below
/// `m` the race term is at most `ratio^(n-m)`, and reaching `m` at all is
/// bounded by the Chernoff tail `e^-λ (eλ/m)^m`.
fn catch_up_bound(n: u64, ratio: f64) -> f64 {
	let n = n as f64;
	let lambda = n * ratio;
	let m = (lambda + n) / 2.0;
	let poisson_tail = (m - lambda + m * (lambda / m).ln()).exp();
	let race = ((n - m) * ratio.ln()).exp();
	poisson_tail + race
}

/// The confidence series restricted to `λ ± WINDOW_SIGMAS·√λ`.
fn race_series(n: u64, ratio: f64) -> f64 {
	let lambda = n as f64 * ratio;
	let spread = WINDOW_SIGMAS * lambda.sqrt() + WINDOW_SIGMAS;
	let first = (lambda - spread).floor().max(0.0) as u64;
	let last = ((lambda + spread).ceil() as u64).min(n);

	let ln_lambda = lambda.ln();
	let ln_ratio = ratio.ln();

	// Poisson terms in log space: ln P(k) = ln P(k-1) + ln λ - ln k
	let mut ln_poisson = -lambda + first as f64 * ln_lambda - ln_factorial(first);
	let mut sum = 0.0;
	for k in first..=last {
		if k > first {
			ln_poisson += ln_lambda - (k as f64).ln();
		}
		let caught_up = ((n - k) as f64 * ln_ratio).exp();
		sum += ln_poisson.exp() * (1.0 - caught_up);
	}
	sum.clamp(0.0, 1.0)
}

fn ln_factorial(k: u64) -> f64 {
	if k < STIRLING_THRESHOLD {
		return (2..=k).map(|i| (i as f64).ln()).sum();
	}
	let x = k as f64;
	x * x.ln() - x + 0.5 * (2.0 * PI * x).ln() + 1.0 / (12.0 * x) - 1.0 / (360.0 * x.powi(3))
		+ 1.0 / (1260.0 * x.powi(5))
}

/// Rejects confidence thresholds outside [0, 1].
pub fn check_required_confidence(required: f64) -> Result<(), AdapterError> {
	if (0.0..=1.0).contains(&required) {
		Ok(())
	} else {
		Err(AdapterError::InvalidParameters(format!(
			"required confidence {} must be in [0, 1]",
			required
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gateway_types::Block;

	fn calculator(q: f64) -> ConfidenceCalculator {
		ConfidenceCalculator::new(q, 0.99).unwrap()
	}

	#[test]
	fn test_reference_value() {
		let c = calculator(0.2).for_depth(13);
		assert!((c - 0.99970567).abs() < 1e-7, "got {}", c);
	}

	#[test]
	fn test_honest_chain_is_final_at_first_block() {
		let calc = calculator(0.0);
		assert_eq!(calc.for_depth(1), 1.0);
		assert_eq!(calc.for_depth(50), 1.0);
		assert_eq!(calc.for_depth(0), 0.0);
	}

	#[test]
	fn test_monotonic_and_converges() {
		for q in [0.05, 0.1, 0.3] {
			let calc = calculator(q);
			let mut previous = 0.0;
			for depth in 1..=400 {
				let c = calc.for_depth(depth);
				assert!((0.0..=1.0).contains(&c));
				assert!(c + 1e-12 >= previous, "q={} depth={}", q, depth);
				previous = c;
			}
			assert!(previous > 0.999_999, "q={} ended at {}", q, previous);
		}
	}

	#[test]
	fn test_saturated_ratio_stays_below_ceiling() {
		let calc = ConfidenceCalculator::new(0.6, 0.95).unwrap();
		let mut previous = 0.0;
		for depth in 1..=300 {
			let c = calc.for_depth(depth);
			assert!(c <= 0.95);
			assert!(c + 1e-12 >= previous);
			previous = c;
		}
		assert!(previous > 0.0);
		assert_eq!(calc.required_depth(0.96), None);
	}

	#[test]
	fn test_transaction_confidence_uses_inclusion_depth() {
		let calc = calculator(0.1);
		let mut tx = gateway_types::Transaction::return_value(vec![]);
		assert_eq!(calc.confidence(&tx, 100), 0.0);

		tx.block = Some(Block {
			number: 10,
			hash: "0x0a".into(),
		});
		assert_eq!(calc.confidence(&tx, 9), 0.0);
		assert_eq!(calc.confidence(&tx, 12), calc.for_depth(3));
	}

	#[test]
	fn test_required_depth_is_minimal() {
		let calc = calculator(0.1);
		let depth = calc.required_depth(0.99).unwrap();
		assert_eq!(depth, 5);
		assert!(calc.for_depth(depth) >= 0.99);
		assert!(calc.for_depth(depth - 1) < 0.99);

		assert_eq!(calculator(0.0).required_depth(1.0), Some(1));
		assert_eq!(calc.required_depth(0.0), Some(0));
	}

	/// Full series over every `k` in `0..=n`, for comparison.
	fn full_series(n: u64, q: f64) -> f64 {
		let ratio = q / (1.0 - q);
		let lambda = n as f64 * ratio;
		let mut ln_poisson = -lambda;
		let mut sum = 0.0;
		for k in 0..=n {
			if k > 0 {
				ln_poisson += lambda.ln() - (k as f64).ln();
			}
			sum += ln_poisson.exp() * (1.0 - ((n - k) as f64 * ratio.ln()).exp());
		}
		sum
	}

	#[test]
	fn test_windowed_series_matches_full_sum() {
		for (q, depth) in [(0.45, 1001), (0.45, 3001), (0.3, 401), (0.49, 2001)] {
			let expected = full_series(depth - 1, q);
			let got = calculator(q).for_depth(depth);
			assert!(
				(got - expected).abs() < 1e-10,
				"q={} depth={}: {} vs {}",
				q,
				depth,
				got,
				expected
			);
		}
	}

	#[test]
	fn test_deep_transactions_settle_immediately() {
		assert_eq!(calculator(0.1).for_depth(20_000_000), 1.0);
		assert_eq!(calculator(0.45).for_depth(u64::MAX), 1.0);

		let saturated = ConfidenceCalculator::new(0.6, 0.95).unwrap();
		assert_eq!(saturated.for_depth(20_000_000), 0.95);
		assert_eq!(saturated.for_depth(u64::MAX), 0.95);
	}

	#[test]
	fn test_catch_up_bound_dominates_risk() {
		for (q, depth) in [(0.1, 5), (0.2, 13), (0.3, 60), (0.45, 500)] {
			let ratio = q / (1.0 - q);
			let risk = 1.0 - calculator(q).for_depth(depth);
			assert!(catch_up_bound(depth - 1, ratio) >= risk, "q={} depth={}", q, depth);
		}
	}

	#[test]
	fn test_rejects_invalid_parameters() {
		assert!(ConfidenceCalculator::new(1.0, 0.99).is_err());
		assert!(ConfidenceCalculator::new(-0.1, 0.99).is_err());
		assert!(ConfidenceCalculator::new(0.1, 0.0).is_err());
		assert!(ConfidenceCalculator::new(0.6, 1.0).is_err());
		assert!(ConfidenceCalculator::new(0.6, 0.999).is_ok());
		assert!(check_required_confidence(1.5).is_err());
		assert!(check_required_confidence(0.9).is_ok());
	}
}
