use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use std::ops::RangeInclusive;
use tracing::info;

/// Display colors a new board can be assigned.
pub const DEFAULT_BOARD_PALETTE: [&str; 10] = [
    "#FFF0E5", "#66C4FF", "#C3C5CB", "#AEE938", "#FFFAE5", "#FFF5FF", "#BE1809", "#FF8C00",
    "#E0E0E0", "#3A10E5",
];

/// Number of seeded reference tags; new boards pick one of `1..=count`.
pub const DEFAULT_BOARD_TAG_COUNT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "prod")]
    Prod,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "pr")]
    Pr,
}

impl Env {
    /// Value reported in the `x-service-version` header.
    ///
    /// - Prod: `stable:{version}`
    /// - PR: `pr:{commit}`
    /// - Local/Test: `main:{commit}`
    pub fn version_label(&self) -> String {
        let commit = env!("BUILD_COMMIT");
        match self {
            Env::Prod => format!("stable:{}", env!("CARGO_PKG_VERSION")),
            Env::Pr => format!("pr:{commit}"),
            Env::Local | Env::Test => format!("main:{commit}"),
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Prod => write!(f, "prod"),
            Env::Test => write!(f, "test"),
            Env::Pr => write!(f, "pr"),
        }
    }
}

/// Connection settings for the S3-compatible image bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible stores. `None` means AWS.
    pub endpoint: Option<String>,
    /// Base URL objects are publicly served from, without a trailing slash.
    pub public_url: String,
}

/// Reference data used when a board is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDefaults {
    palette: Vec<String>,
    tag_count: i64,
}

impl BoardDefaults {
    pub fn new(palette: Vec<String>, tag_count: i64) -> anyhow::Result<Self> {
        if palette.is_empty() {
            anyhow::bail!("BOARD_PALETTE must contain at least one color");
        }
        if tag_count < 1 {
            anyhow::bail!("BOARD_TAG_COUNT must be at least 1, got {tag_count}");
        }
        Ok(Self { palette, tag_count })
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Tag ids a new board may be attached to.
    pub fn tag_ids(&self) -> RangeInclusive<i64> {
        1..=self.tag_count
    }
}

impl Default for BoardDefaults {
    fn default() -> Self {
        Self {
            palette: DEFAULT_BOARD_PALETTE
                .iter()
                .map(|color| (*color).to_owned())
                .collect(),
            tag_count: DEFAULT_BOARD_TAG_COUNT,
        }
    }
}

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    database_url: String,
    server_addr: String,
    port: u16,
    s3: Option<S3Config>,
    board_defaults: BoardDefaults,
    // JWT secret the auth service signs session tokens with
    jwt_secret: String,
}

// An intermediate struct for deserializing environment variables
// where most fields are optional.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    database_url: String,
    server_addr: Option<String>,
    port: Option<u16>,
    s3_bucket: Option<String>,
    s3_region: Option<String>,
    s3_access_key_id: Option<String>,
    s3_secret_access_key: Option<String>,
    s3_endpoint: Option<String>,
    s3_public_url: Option<String>,
    board_palette: Option<String>,
    board_tag_count: Option<i64>,
    jwt_secret: Option<String>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// Available to unit and integration tests. Not for production use.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            database_url: "postgres://localhost:5432/test".to_owned(),
            server_addr: "127.0.0.1".to_owned(),
            port: 8080,
            s3: None,
            board_defaults: BoardDefaults::default(),
            jwt_secret: "test-jwt-secret-key-for-local-development".to_owned(),
        }
    }

    /// Same as [`Config::new_for_test`] with custom board defaults.
    pub fn new_for_test_with_board_defaults(board_defaults: BoardDefaults) -> Self {
        Self {
            board_defaults,
            ..Self::new_for_test()
        }
    }

    #[cfg(test)]
    pub fn new_for_test_with_env(env: Env) -> Self {
        Self {
            env,
            ..Self::new_for_test()
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    pub fn s3(&self) -> Option<&S3Config> {
        self.s3.as_ref()
    }

    pub fn board_defaults(&self) -> &BoardDefaults {
        &self.board_defaults
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            database_url,
            server_addr,
            port,
            s3_bucket,
            s3_region,
            s3_access_key_id,
            s3_secret_access_key,
            s3_endpoint,
            s3_public_url,
            board_palette,
            board_tag_count,
            jwt_secret,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_owned()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        let jwt_secret = match jwt_secret {
            Some(secret) => secret,
            None if matches!(env, Env::Local | Env::Test) => {
                info!("JWT_SECRET not set, using default for {} environment", env);
                "default-jwt-secret-for-local-development-only".to_owned()
            }
            None => anyhow::bail!("JWT_SECRET must be set for {} environment", env),
        };

        let s3 = match (s3_bucket, s3_access_key_id, s3_secret_access_key) {
            (Some(bucket), Some(access_key_id), Some(secret_access_key)) => {
                let region = s3_region.unwrap_or_else(|| "ap-northeast-2".to_owned());
                let public_url = s3_public_url
                    .unwrap_or_else(|| format!("https://{bucket}.s3.{region}.amazonaws.com"))
                    .trim_end_matches('/')
                    .to_owned();
                info!(bucket = %bucket, region = %region, "S3 storage configured");
                Some(S3Config {
                    bucket,
                    region,
                    access_key_id,
                    secret_access_key,
                    endpoint: s3_endpoint,
                    public_url,
                })
            }
            (bucket, access_key_id, secret_access_key)
                if !matches!(env, Env::Local | Env::Test) =>
            {
                let missing: Vec<&str> = [
                    ("S3_BUCKET", bucket.is_none()),
                    ("S3_ACCESS_KEY_ID", access_key_id.is_none()),
                    ("S3_SECRET_ACCESS_KEY", secret_access_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, is_missing)| is_missing.then_some(name))
                .collect();
                anyhow::bail!(
                    "{} must be set for {} environment",
                    missing.join(", "),
                    env
                );
            }
            _ => {
                info!("S3 credentials not set, images are kept in memory");
                None
            }
        };

        let palette = match board_palette {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|color| !color.is_empty())
                .map(str::to_owned)
                .collect(),
            None => BoardDefaults::default().palette,
        };
        let board_defaults =
            BoardDefaults::new(palette, board_tag_count.unwrap_or(DEFAULT_BOARD_TAG_COUNT))?;

        Ok(Config {
            env,
            database_url,
            server_addr,
            port,
            s3,
            board_defaults,
            jwt_secret,
        })
    }
}
