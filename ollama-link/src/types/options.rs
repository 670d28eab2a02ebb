use serde::Serialize;

use super::shared::is_zero;

/// Sampling and generation parameters attached to generate/chat/embed requests.
///
/// Every field starts at zero and is left out of the request while it stays
/// there, so the server applies its own default. An explicit `0` can therefore
/// not be sent; this matches how Ollama treats these knobs. Non-finite floats
/// have no JSON form and are treated as unset.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// Mirostat sampling (0 = disabled, 1 = Mirostat, 2 = Mirostat 2.0).
    #[serde(skip_serializing_if = "is_zero")]
    pub mirostat: i32,
    /// Mirostat learning rate.
    #[serde(skip_serializing_if = "is_unset")]
    pub mirostat_eta: f64,
    /// Mirostat balance between coherence and diversity.
    #[serde(skip_serializing_if = "is_unset")]
    pub mirostat_tau: f64,
    /// Size of the context window.
    #[serde(skip_serializing_if = "is_zero")]
    pub num_ctx: i32,
    /// How far back to look to prevent repetition (-1 = num_ctx).
    #[serde(skip_serializing_if = "is_zero")]
    pub repeat_last_n: i32,
    #[serde(skip_serializing_if = "is_unset")]
    pub repeat_penalty: f64,
    #[serde(skip_serializing_if = "is_unset")]
    pub temperature: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub seed: i32,
    /// Stop sequences; generation halts when any of them is produced.
    #[serde(skip_serializing_if = "is_zero")]
    pub stop: Vec<String>,
    /// Tail free sampling (1.0 disables).
    #[serde(skip_serializing_if = "is_unset")]
    pub tfs_z: f64,
    /// Maximum number of tokens to predict (-1 = unbounded).
    #[serde(skip_serializing_if = "is_zero")]
    pub num_predict: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub top_k: i32,
    #[serde(skip_serializing_if = "is_unset")]
    pub top_p: f64,
    #[serde(skip_serializing_if = "is_unset")]
    pub min_p: f64,
}

fn is_unset(value: &f64) -> bool {
    *value == 0.0 || !value.is_finite()
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no parameter has been set.
    pub fn is_empty(&self) -> bool {
        is_zero(&self.mirostat)
            && is_unset(&self.mirostat_eta)
            && is_unset(&self.mirostat_tau)
            && is_zero(&self.num_ctx)
            && is_zero(&self.repeat_last_n)
            && is_unset(&self.repeat_penalty)
            && is_unset(&self.temperature)
            && is_zero(&self.seed)
            && is_zero(&self.stop)
            && is_unset(&self.tfs_z)
            && is_zero(&self.num_predict)
            && is_zero(&self.top_k)
            && is_unset(&self.top_p)
            && is_unset(&self.min_p)
    }

    pub fn mirostat(mut self, mode: i32, eta: f64, tau: f64) -> Self {
        self.mirostat = mode;
        self.mirostat_eta = eta;
        self.mirostat_tau = tau;
        self
    }

    pub fn num_ctx(mut self, num_ctx: i32) -> Self {
        self.num_ctx = num_ctx;
        self
    }

    pub fn repeat_last_n(mut self, repeat_last_n: i32) -> Self {
        self.repeat_last_n = repeat_last_n;
        self
    }

    pub fn repeat_penalty(mut self, repeat_penalty: f64) -> Self {
        self.repeat_penalty = repeat_penalty;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn seed(mut self, seed: i32) -> Self {
        self.seed = seed;
        self
    }

    pub fn stop(mut self, sequence: impl Into<String>) -> Self {
        self.stop.push(sequence.into());
        self
    }

    pub fn tfs_z(mut self, tfs_z: f64) -> Self {
        self.tfs_z = tfs_z;
        self
    }

    pub fn num_predict(mut self, num_predict: i32) -> Self {
        self.num_predict = num_predict;
        self
    }

    pub fn top_k(mut self, top_k: i32) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn min_p(mut self, min_p: f64) -> Self {
        self.min_p = min_p;
        self
    }
}
