/// Network and bandwidth parameters shared by every pool in a round (§6
/// "Difficulty/internet/dynamic config"). `ping` is symmetric between any
/// pair of pools — the simulator does not model per-pair topology, only a
/// single network-wide latency/bandwidth profile.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NetConfig {
    /// Average one-way pool-to-pool ping, in seconds.
    pub ping_secs: f64,
    /// Coefficient of variation shared by the owd/txTime log-normal samplers.
    pub cv: f64,
    /// Uplink bandwidth, in megabits per second.
    pub mbps: f64,
    /// Average block size, in kilobytes.
    pub block_size_kb: f64,
    /// Stdev of the per-pool NTP drift, in seconds.
    pub ntp_stdev: f64,
}

impl NetConfig {
    /// Mean transmission time for a full block at the configured bandwidth
    /// (§4.3): `blockSize / (mbps * 1024/8)` seconds.
    pub fn tx_time_mean_secs(&self) -> f64 {
        let kb_per_sec = self.mbps * 1024.0 / 8.0;
        self.block_size_kb / kb_per_sec
    }
}
