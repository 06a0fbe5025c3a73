//! CLI command definitions using clap

use crate::error::{CliError, CliResult};
use clap::{Args, Parser, Subcommand, ValueEnum};
use shopflow::{
    AdminCredentials, BrowserEngine, DeviceProfile, HarnessConfig, DEFAULT_BASE_URL,
};
use std::path::PathBuf;
use std::time::Duration;

/// Shopflow: end-to-end checkout flow tests for a subscription shop
#[derive(Parser, Debug)]
#[command(name = "shopflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run checkout scenarios against the shop
    Run(RunArgs),

    /// List available scenarios
    List(ListArgs),

    /// Print one scenario's steps as YAML
    Show(ShowArgs),

    /// Clear customers, subscriptions and transactions from the shop database
    Reset(ResetArgs),
}

/// Shop database location
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the shop's SQLite database
    #[arg(long, env = "DB_FULL_PATH")]
    pub db_path: PathBuf,
}

/// Where scenarios come from
#[derive(Args, Debug, Clone, Default)]
pub struct ScenarioSourceArgs {
    /// YAML scenario file (defaults to the built-in scenarios)
    #[arg(long)]
    pub scenarios_file: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub source: ScenarioSourceArgs,

    /// Base URL of the shop under test
    #[arg(long, env = "SHOPFLOW_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Admin dashboard email
    #[arg(long, env = "SHOPFLOW_ADMIN_EMAIL", default_value = "admin@example.com")]
    pub admin_email: String,

    /// Admin dashboard password
    #[arg(
        long,
        env = "SHOPFLOW_ADMIN_PASSWORD",
        default_value = "password",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub admin_password: String,

    /// Browser engines to run each scenario on
    #[arg(long = "engine", value_delimiter = ',', default_value = "chromium")]
    pub engines: Vec<EngineArg>,

    /// Only run these scenarios (repeatable)
    #[arg(long = "scenario")]
    pub scenarios: Vec<String>,

    /// Default wait for each action, in milliseconds
    #[arg(long, default_value = "10000")]
    pub timeout_ms: u64,

    /// Wait for the order confirmation page, in milliseconds
    #[arg(long, default_value = "30000")]
    pub confirmation_timeout_ms: u64,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Emulate a device
    #[arg(long)]
    pub device: Option<DeviceArg>,

    /// Directory for diagnostic screenshots
    #[arg(long, default_value = "snapshots")]
    pub snapshot_dir: PathBuf,

    /// Chromium executable (auto-detected when unset)
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Stop after the first failed scenario
    #[arg(long)]
    pub fail_fast: bool,
}

impl RunArgs {
    /// Admin login from the flags
    #[must_use]
    pub fn admin(&self) -> AdminCredentials {
        AdminCredentials::new(&self.admin_email, &self.admin_password)
    }

    /// Harness configuration from the flags
    pub fn harness_config(&self) -> CliResult<HarnessConfig> {
        if self.timeout_ms == 0 {
            return Err(CliError::invalid_argument("--timeout-ms must be positive"));
        }
        let config = HarnessConfig::default()
            .with_base_url(&self.base_url)
            .with_db_path(&self.store.db_path)
            .with_admin(self.admin())
            .with_engines(self.engines.iter().copied().map(BrowserEngine::from).collect())
            .with_default_timeout(Duration::from_millis(self.timeout_ms))
            .with_confirmation_timeout(Duration::from_millis(self.confirmation_timeout_ms))
            .with_headless(!self.headed)
            .with_device(self.device.map(DeviceProfile::from))
            .with_snapshot_dir(&self.snapshot_dir)
            .with_chromium_path(self.chromium_path.clone())
            .with_sandbox(!self.no_sandbox)
            .with_fail_fast(self.fail_fast);
        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: ScenarioSourceArgs,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Scenario id
    pub id: String,

    #[command(flatten)]
    pub source: ScenarioSourceArgs,
}

/// Arguments for the reset command
#[derive(Parser, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

/// Browser engine
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineArg {
    /// Chromium over CDP
    Chromium,
    /// Firefox
    Firefox,
    /// WebKit
    Webkit,
}

impl From<EngineArg> for BrowserEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Chromium => Self::Chromium,
            EngineArg::Firefox => Self::Firefox,
            EngineArg::Webkit => Self::Webkit,
        }
    }
}

/// Emulated device
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    /// iPhone 6 (375x667)
    #[value(name = "iphone-6")]
    Iphone6,
    /// iPhone 14 Pro (393x852)
    #[value(name = "iphone-14-pro")]
    Iphone14Pro,
    /// Desktop 1920x1080
    #[value(name = "desktop-1080p")]
    Desktop1080p,
}

impl From<DeviceArg> for DeviceProfile {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Iphone6 => Self::iphone_6(),
            DeviceArg::Iphone14Pro => Self::iphone_14_pro(),
            DeviceArg::Desktop1080p => Self::desktop_1080p(),
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
