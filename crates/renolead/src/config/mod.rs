use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::domain::FactorKind;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the service binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Weights for the seven scoring factors. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub completeness: f64,
    pub source: f64,
    pub engagement: f64,
    pub budget: f64,
    pub complexity: f64,
    pub geography: f64,
    pub urgency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            completeness: 0.20,
            source: 0.18,
            engagement: 0.17,
            budget: 0.15,
            complexity: 0.12,
            geography: 0.10,
            urgency: 0.08,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.completeness
            + self.source
            + self.engagement
            + self.budget
            + self.complexity
            + self.geography
            + self.urgency
    }

    /// Reject configurations whose weights are negative or do not sum to 1.0
    /// before they can be applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let entries = [
            ("completeness", self.completeness),
            ("source", self.source),
            ("engagement", self.engagement),
            ("budget", self.budget),
            ("complexity", self.complexity),
            ("geography", self.geography),
            ("urgency", self.urgency),
        ];
        for (name, weight) in entries {
            if weight < 0.0 {
                return Err(ConfigError::NegativeWeight { name });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }

    pub fn weight(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::DataCompleteness => self.completeness,
            FactorKind::SourceQuality => self.source,
            FactorKind::Engagement => self.engagement,
            FactorKind::BudgetAlignment => self.budget,
            FactorKind::ProjectComplexity => self.complexity,
            FactorKind::GeographicFit => self.geography,
            FactorKind::Urgency => self.urgency,
        }
    }
}

/// Weights for the hybrid assignment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub skill: f64,
    pub workload: f64,
    pub experience: f64,
    pub availability: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            skill: 0.3,
            workload: 0.4,
            experience: 0.2,
            availability: 0.1,
        }
    }
}

/// Rule-defined weights for the flexible/territory-aware strategy. The
/// availability and role weights are layered on top of the rule weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlexibleWeights {
    pub workload: f64,
    pub skill: f64,
    pub territory: f64,
    pub availability: f64,
    pub role: f64,
}

impl Default for FlexibleWeights {
    fn default() -> Self {
        Self {
            workload: 0.4,
            skill: 0.4,
            territory: 0.2,
            availability: 0.1,
            role: 0.2,
        }
    }
}

/// Weights for the territory-matching sub-rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerritoryRuleWeights {
    pub geographic: f64,
    pub product: f64,
    pub budget: f64,
    pub client_type: f64,
}

impl Default for TerritoryRuleWeights {
    fn default() -> Self {
        Self {
            geographic: 0.4,
            product: 0.3,
            budget: 0.3,
            client_type: 0.2,
        }
    }
}

/// Assignment-engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Applied when an assignee declares no capacity of their own.
    pub default_max_capacity: u32,
    pub hybrid: HybridWeights,
    pub flexible: FlexibleWeights,
    pub territory: TerritoryRuleWeights,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            default_max_capacity: 15,
            hybrid: HybridWeights::default(),
            flexible: FlexibleWeights::default(),
            territory: TerritoryRuleWeights::default(),
        }
    }
}

/// Partial per-source override merged onto the default lifecycle rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRuleOverride {
    pub expiration_days: Option<i64>,
    pub warning_days: Option<i64>,
    pub auto_archive_expired: Option<bool>,
    /// Disables expiration entirely, e.g. for synthetic test data.
    pub expiration_disabled: Option<bool>,
}

/// Effective lifecycle rules after merging a source override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRules {
    pub expiration_days: i64,
    pub warning_days: i64,
    pub auto_archive_expired: bool,
    pub expiration_disabled: bool,
}

/// Lifecycle rules: expiration windows, reactivation limit, and per-source
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRules {
    pub expiration_days: i64,
    pub warning_days: i64,
    pub max_reactivations: u8,
    pub auto_archive_expired: bool,
    pub source_overrides: BTreeMap<String, SourceRuleOverride>,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            expiration_days: 14,
            warning_days: 3,
            max_reactivations: 3,
            auto_archive_expired: true,
            source_overrides: BTreeMap::new(),
        }
    }
}

impl LifecycleRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiration_days <= 0 || self.warning_days < 0 {
            return Err(ConfigError::InvalidWindow {
                expiration_days: self.expiration_days,
                warning_days: self.warning_days,
            });
        }
        Ok(())
    }

    /// Merge the override for `source` (case-insensitive key) onto the
    /// defaults.
    pub fn for_source(&self, source: &str) -> EffectiveRules {
        let wanted = source.to_ascii_lowercase();
        let overrides = self
            .source_overrides
            .iter()
            .find(|(key, _)| key.to_ascii_lowercase() == wanted)
            .map(|(_, value)| value);

        EffectiveRules {
            expiration_days: overrides
                .and_then(|o| o.expiration_days)
                .unwrap_or(self.expiration_days),
            warning_days: overrides
                .and_then(|o| o.warning_days)
                .unwrap_or(self.warning_days),
            auto_archive_expired: overrides
                .and_then(|o| o.auto_archive_expired)
                .unwrap_or(self.auto_archive_expired),
            expiration_disabled: overrides.and_then(|o| o.expiration_disabled).unwrap_or(false),
        }
    }
}

/// Full decision-engine configuration with documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub scoring: ScoringWeights,
    pub assignment: AssignmentConfig,
    pub lifecycle: LifecycleRules,
    /// Freshness window for the reference caches and the score cache.
    pub cache_ttl_minutes: i64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringWeights::default(),
            assignment: AssignmentConfig::default(),
            lifecycle: LifecycleRules::default(),
            cache_ttl_minutes: 5,
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.lifecycle.validate()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    WeightSum { sum: f64 },
    NegativeWeight { name: &'static str },
    InvalidWindow { expiration_days: i64, warning_days: i64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::WeightSum { sum } => {
                write!(f, "scoring factor weights must sum to 1.0, got {sum:.6}")
            }
            ConfigError::NegativeWeight { name } => {
                write!(f, "scoring weight '{name}' must not be negative")
            }
            ConfigError::InvalidWindow {
                expiration_days,
                warning_days,
            } => write!(
                f,
                "lifecycle windows invalid: expiration_days={expiration_days}, warning_days={warning_days}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
