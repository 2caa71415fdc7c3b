use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal};

use crate::config::NetConfig;
use crate::lcg::Lcg64;

/// Fixed per-stream offsets XORed into the round seed (§9 "Per-stream
/// RNGs"). Each sampler gets its own decoupled LCG stream so that varying
/// one scalar config value across a sweep only perturbs the draws that
/// config value actually governs.
const STREAM_OFFSET_OWD_P2P: u64 = 0x0001_0000_0000_0001;
const STREAM_OFFSET_OWD_P2H: u64 = 0x0002_0000_0000_0003;
const STREAM_OFFSET_TX_TIME: u64 = 0x0003_0000_0000_0005;
const STREAM_OFFSET_BLOCK_TIME: u64 = 0x0004_0000_0000_0007;
const STREAM_OFFSET_TAIL_SPIKE: u64 = 0x0005_0000_0000_0009;
const STREAM_OFFSET_NTP_DRIFT: u64 = 0x0006_0000_0000_000b;

/// Base spike probability parameters (§4.3 "Tail spikes").
const SPIKE_BASE_P2P: f64 = 0.01;
const SPIKE_BASE_P2H: f64 = 0.04;

/// Owns the six decoupled RNG streams a round needs and exposes the noise
/// samplers from §4.3 in terms of them. One `NoiseEngine` per round.
pub struct NoiseEngine {
    cfg: NetConfig,
    owd_p2p: Lcg64,
    owd_p2h: Lcg64,
    tx_time: Lcg64,
    block_time: Lcg64,
    tail_spike: Lcg64,
    ntp_drift: Lcg64,
}

/// Computes `(mu, sigma)` for a log-normal sampler whose *mean* (not
/// median) equals `mean`, given the shared coefficient of variation (§4.3).
fn lognormal_params(mean: f64, cv: f64) -> (f64, f64) {
    let sigma = (1.0 + cv * cv).ln().sqrt();
    let mu = mean.max(f64::MIN_POSITIVE).ln() - sigma * sigma / 2.0;
    (mu, sigma)
}

fn spike_prob(base: f64, ping_secs: f64) -> f64 {
    (base - 0.01) + (1.0 - base) * ping_secs / (ping_secs + 5.0)
}

fn spike_multiplier(ping_secs: f64) -> f64 {
    1.0 + (1.0 + ping_secs).powf(0.7)
}

impl NoiseEngine {
    pub fn new(round_seed: u64, cfg: NetConfig) -> NoiseEngine {
        NoiseEngine {
            cfg,
            owd_p2p: Lcg64::new(round_seed ^ STREAM_OFFSET_OWD_P2P),
            owd_p2h: Lcg64::new(round_seed ^ STREAM_OFFSET_OWD_P2H),
            tx_time: Lcg64::new(round_seed ^ STREAM_OFFSET_TX_TIME),
            block_time: Lcg64::new(round_seed ^ STREAM_OFFSET_BLOCK_TIME),
            tail_spike: Lcg64::new(round_seed ^ STREAM_OFFSET_TAIL_SPIKE),
            ntp_drift: Lcg64::new(round_seed ^ STREAM_OFFSET_NTP_DRIFT),
        }
    }

    fn lognormal_sample(rng: &mut Lcg64, mean: f64, cv: f64) -> f64 {
        let (mu, sigma) = lognormal_params(mean, cv);
        LogNormal::new(mu, sigma)
            .expect("mean/cv produce a valid log-normal shape")
            .sample(rng)
    }

    fn maybe_spike(&mut self, base: f64, ping_secs: f64, sample: f64) -> f64 {
        let prob = spike_prob(base, ping_secs).clamp(0.0, 1.0);
        if self.tail_spike.gen::<f64>() < prob {
            sample * spike_multiplier(ping_secs)
        } else {
            sample
        }
    }

    /// Pool-to-pool one-way delay, in seconds.
    pub fn owd_p2p(&mut self) -> f64 {
        let ping = self.cfg.ping_secs;
        let cv = self.cfg.cv;
        let sample = Self::lognormal_sample(&mut self.owd_p2p, ping, cv);
        self.maybe_spike(SPIKE_BASE_P2P, ping, sample)
    }

    /// Pool-to-hasher one-way delay (template send), in seconds.
    pub fn owd_p2h(&mut self) -> f64 {
        let ping = self.cfg.ping_secs;
        let cv = self.cfg.cv;
        let sample = Self::lognormal_sample(&mut self.owd_p2h, 2.0 * ping, cv);
        self.maybe_spike(SPIKE_BASE_P2H, ping, sample)
    }

    /// Full-block transmission time for an explicit ancestor fetch, in seconds.
    pub fn tx_time(&mut self) -> f64 {
        let mean = self.cfg.tx_time_mean_secs();
        Self::lognormal_sample(&mut self.tx_time, mean, self.cfg.cv)
    }

    /// Poisson inter-arrival time for a pool mining at rate `lambda`
    /// (blocks/sec), i.e. `Exponential(lambda)`.
    pub fn block_time(&mut self, lambda: f64) -> f64 {
        Exp::new(lambda.max(f64::MIN_POSITIVE))
            .expect("lambda is positive")
            .sample(&mut self.block_time)
    }

    /// One-time per-pool NTP drift, `N(0, ntp_stdev)`.
    pub fn ntp_drift(&mut self) -> f64 {
        use rand_distr::Normal;
        Normal::new(0.0, self.cfg.ntp_stdev.max(0.0))
            .expect("ntp_stdev is non-negative")
            .sample(&mut self.ntp_drift)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> NetConfig {
        NetConfig {
            ping_secs: 0.07,
            cv: 0.5,
            mbps: 10.0,
            block_size_kb: 100.0,
            ntp_stdev: 1.0,
        }
    }

    #[test]
    fn same_seed_reproduces_owd_sequence() {
        let mut a = NoiseEngine::new(7, cfg());
        let mut b = NoiseEngine::new(7, cfg());
        for _ in 0..32 {
            assert_eq!(a.owd_p2p(), b.owd_p2p());
            assert_eq!(a.owd_p2h(), b.owd_p2h());
            assert_eq!(a.tx_time(), b.tx_time());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = NoiseEngine::new(1, cfg());
        let mut b = NoiseEngine::new(2, cfg());
        assert_ne!(a.owd_p2p(), b.owd_p2p());
    }

    #[test]
    fn owd_samples_are_positive() {
        let mut e = NoiseEngine::new(42, cfg());
        for _ in 0..1000 {
            assert!(e.owd_p2p() > 0.0);
            assert!(e.owd_p2h() > 0.0);
            assert!(e.tx_time() > 0.0);
            assert!(e.block_time(1.0 / 60.0) > 0.0);
        }
    }

    #[test]
    fn lognormal_params_match_formula() {
        let (mu, sigma) = lognormal_params(10.0, 0.5);
        let expected_sigma = (1.0f64 + 0.25).ln().sqrt();
        assert!((sigma - expected_sigma).abs() < 1e-12);
        assert!((mu - (10.0f64.ln() - expected_sigma * expected_sigma / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn spike_prob_matches_base_at_zero_ping() {
        // ping -> 0 drives the ping/(ping+5) term to 0, leaving base-0.01.
        assert!((spike_prob(SPIKE_BASE_P2P, 0.0) - (SPIKE_BASE_P2P - 0.01)).abs() < 1e-12);
    }
}
