use anyhow::bail;
use clap::Parser;
use core::time::Duration;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Runtime configuration for the `chatgpt-source-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file in the working directory is loaded first). Only the listen port and
/// the API key matter to most deployments; the rest tune the bridge and the
/// collaborators around it.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chatgpt-source-server",
    version,
    about = "Turns HTTP prompts into CloudEvents carrying generated text"
)]
pub struct CliArgs {
    /// Port the HTTP intake listens on.
    ///
    /// Environment variable: `PORT`
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address the HTTP intake binds to.
    ///
    /// Environment variable: `HOST`
    #[arg(long, env = "HOST", default_value_t = String::from("0.0.0.0"))]
    pub host: String,

    /// Maximum number of events that may be queued or in delivery at once.
    ///
    /// Requests beyond this bound wait for capacity instead of failing, so
    /// latency grows under load while no event is dropped.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 100)]
    pub queue_capacity: usize,

    /// Number of tasks delivering events concurrently.
    ///
    /// Environment variable: `NUM_CONSUMERS`
    #[arg(long, env = "NUM_CONSUMERS", default_value_t = 1)]
    pub num_consumers: usize,

    /// Upper bound, in milliseconds, on how long a request waits for its event
    /// to be delivered. `0` waits until delivery completes or the service
    /// shuts down.
    ///
    /// Environment variable: `COMPLETION_TIMEOUT_MS`
    #[arg(long, env = "COMPLETION_TIMEOUT_MS", default_value_t = 0)]
    pub completion_timeout_ms: u64,

    /// Grace period, in seconds, for in-flight requests during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout: u64,

    /// Largest accepted request body, in bytes.
    ///
    /// Environment variable: `MAX_BODY_BYTES`
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// URL events are POSTed to. When unset, events are only logged.
    ///
    /// Environment variable: `TARGET`
    #[arg(long, env = "TARGET")]
    pub target: Option<String>,

    /// Timeout, in seconds, of a single delivery attempt.
    ///
    /// Environment variable: `DELIVERY_TIMEOUT`
    #[arg(long, env = "DELIVERY_TIMEOUT", default_value_t = 10)]
    pub delivery_timeout: u64,

    /// API key for the completion endpoint.
    ///
    /// Environment variable: `OPENAI_API_KEY`
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Chat completions endpoint.
    ///
    /// Environment variable: `OPENAI_API_URL`
    #[arg(long, env = "OPENAI_API_URL", default_value_t = String::from(DEFAULT_API_URL))]
    pub api_url: String,

    /// Model used for completions.
    ///
    /// Environment variable: `OPENAI_MODEL`
    #[arg(long, env = "OPENAI_MODEL", default_value_t = String::from("gpt-3.5-turbo"))]
    pub model: String,

    /// Maximum tokens per completion.
    ///
    /// Environment variable: `OPENAI_MAX_TOKENS`
    #[arg(long, env = "OPENAI_MAX_TOKENS", default_value_t = 3500)]
    pub max_tokens: u32,

    /// Sampling temperature, between 0.0 and 2.0.
    ///
    /// Environment variable: `OPENAI_TEMPERATURE`
    #[arg(long, env = "OPENAI_TEMPERATURE", default_value_t = 0.7)]
    pub temperature: f32,

    /// Timeout, in seconds, of a single completion request.
    ///
    /// Environment variable: `GENERATION_TIMEOUT`
    #[arg(long, env = "GENERATION_TIMEOUT", default_value_t = 60)]
    pub generation_timeout: u64,

    /// Completion calls allowed per UTC day. `0` means unlimited.
    ///
    /// Environment variable: `MAX_DAILY_REQUESTS`
    #[arg(long, env = "MAX_DAILY_REQUESTS", default_value_t = 100)]
    pub max_daily_requests: u32,
}

/// Settings of the completion client.
#[derive(Clone)]
pub struct GenerationConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_daily_requests: u32,
}

impl core::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("max_daily_requests", &self.max_daily_requests)
            .finish()
    }
}

/// Settings of the delivery side.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub target: Option<String>,
    pub timeout: Duration,
    pub num_consumers: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub queue_capacity: usize,
    pub completion_timeout: Option<Duration>,
    pub shutdown_timeout: Duration,
    pub max_body_bytes: usize,
    pub delivery: DeliveryConfig,
    pub generation: GenerationConfig,
}

impl ServerConfig {
    /// `host:port` the intake listens on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }

        if args.num_consumers == 0 {
            bail!("NUM_CONSUMERS must be greater than 0");
        }

        if args.max_body_bytes == 0 {
            bail!("MAX_BODY_BYTES must be greater than 0");
        }

        if args.api_key.trim().is_empty() {
            bail!("OPENAI_API_KEY must not be empty");
        }

        if !(0.0..=2.0).contains(&args.temperature) {
            bail!(
                "OPENAI_TEMPERATURE ({}) must be between 0.0 and 2.0",
                args.temperature
            );
        }

        // An empty TARGET means the same as none: events are only logged.
        let target = args.target.filter(|t| !t.is_empty());
        if let Some(target) = &target {
            if !(target.starts_with("http://") || target.starts_with("https://")) {
                bail!("TARGET ({target}) must be an http:// or https:// URL");
            }
        }

        let completion_timeout = (args.completion_timeout_ms > 0)
            .then(|| Duration::from_millis(args.completion_timeout_ms));

        Ok(Self {
            host: args.host,
            port: args.port,
            queue_capacity: args.queue_capacity,
            completion_timeout,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            max_body_bytes: args.max_body_bytes,
            delivery: DeliveryConfig {
                target,
                timeout: Duration::from_secs(args.delivery_timeout),
                num_consumers: args.num_consumers,
            },
            generation: GenerationConfig {
                api_url: args.api_url,
                api_key: args.api_key,
                model: args.model,
                max_tokens: args.max_tokens,
                temperature: args.temperature,
                timeout: Duration::from_secs(args.generation_timeout),
                max_daily_requests: args.max_daily_requests,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec!["chatgpt-source-server", "--api-key", "sk-test"];
        argv.extend_from_slice(extra);
        let args = CliArgs::try_parse_from(argv)?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = parse(&[]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.completion_timeout, None);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.delivery.num_consumers, 1);
        assert_eq!(config.delivery.target, None);
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.generation.api_url, DEFAULT_API_URL);
        assert_eq!(config.generation.max_daily_requests, 100);
    }

    #[test]
    fn completion_timeout_is_enabled_by_a_positive_value() {
        let config = parse(&["--completion-timeout-ms", "1500"]).unwrap();
        assert_eq!(config.completion_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = parse(&["--queue-capacity", "0"]).unwrap_err();
        assert!(err.to_string().contains("QUEUE_CAPACITY"));
    }

    #[test]
    fn zero_consumers_are_rejected() {
        let err = parse(&["--num-consumers", "0"]).unwrap_err();
        assert!(err.to_string().contains("NUM_CONSUMERS"));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let err = parse(&["--temperature", "3.5"]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_TEMPERATURE"));
    }

    #[test]
    fn non_http_target_is_rejected() {
        let err = parse(&["--target", "ftp://example.com"]).unwrap_err();
        assert!(err.to_string().contains("TARGET"));
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let config = parse(&[]).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-test"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn empty_target_logs_only() {
        let config = parse(&["--target", ""]).unwrap();
        assert_eq!(config.delivery.target, None);
    }

    #[test]
    fn http_target_is_kept() {
        let config = parse(&["--target", "http://localhost:9000/events"]).unwrap();
        assert_eq!(
            config.delivery.target.as_deref(),
            Some("http://localhost:9000/events")
        );
    }
}
