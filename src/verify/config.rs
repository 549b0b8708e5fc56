//! Configuration for verification runs

/// Default bound of the hasher pool's work and result queues
pub const DEFAULT_QUEUE_DEPTH: usize = 4;

/// Configuration for piece verification
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Number of hashing workers (0 = auto-detect)
    pub threads: usize,
    /// Whether to hash in parallel (false = one worker)
    pub parallel: bool,
    /// Capacity of the bounded queues between reader, hashers and collector
    pub queue_depth: usize,
    /// Report progress and results on the console
    pub echo: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            threads: 0, // Auto-detect CPU cores
            parallel: true,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            echo: false,
        }
    }
}

impl VerificationConfig {
    pub fn new(threads: usize, parallel: bool) -> Self {
        Self {
            threads,
            parallel,
            ..Self::default()
        }
    }

    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn from_args(matches: &clap::ArgMatches) -> Self {
        let threads = matches
            .get_one::<String>("threads")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let parallel = !matches.get_flag("no-parallel");
        let echo = !matches.get_flag("quiet");

        Self::new(threads, parallel).with_echo(echo)
    }

    /// Get effective worker count (auto-detect if 0)
    pub fn effective_threads(&self) -> usize {
        match (self.parallel, self.threads) {
            (false, _) => 1, // Sequential mode always uses a single worker
            (true, 0) => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            (true, n) => n,
        }
    }

    /// Queue capacity, never below one slot
    pub fn effective_queue_depth(&self) -> usize {
        self.queue_depth.max(1)
    }
}
