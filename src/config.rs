//! Configuration layer: typed settings with layered precedence.
//!
//! Lowest to highest:
//!
//! 1. built-in defaults
//! 2. `rasid.toml` in the working directory, then `--config-file`
//! 3. `RASID__SECTION__KEY` environment variables
//! 4. `PRINTER_COM_PORT` / `PRINTER_BAUD_RATE`
//! 5. command-line flags

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::ir::CutMode;
use crate::pipeline::Pipeline;
use crate::printer::{PaperWidth, PrinterConfig};
use crate::protocol::codepage::{CodeTable, Codepage};
use crate::render::glyphs::FontConfig;
use crate::strategy::{BuildOptions, DEFAULT_FONT_SIZE_PT, DEFAULT_MAX_HEIGHT, RenderStrategy};
use crate::transport::{
    Connector, DEFAULT_RAW_PORT, LockPolicy, SurfaceHandle, TargetLocks, TransportTarget,
};

const LOCAL_CONFIG_BASENAME: &str = "rasid";
const ENV_PREFIX: &str = "RASID";
const DEFAULT_SERIAL_PORT: &str = "COM7";
const DEFAULT_BAUD_RATE: u32 = 9600;
const DEFAULT_FEED_LINES: u8 = 3;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// Command-line arguments for the rasid binary.
#[derive(Debug, Parser)]
#[command(name = "rasid", version, about = "Receipt printing for ESC/POS thermal printers")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "RASID_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print a receipt from a JSON file.
    Print(PrintArgs),
    /// Encode a receipt for one strategy without sending it.
    Encode(EncodeArgs),
    /// Render a receipt to a PNG as the raster strategy would print it.
    Preview(PreviewArgs),
    /// List printers known to the system spooler.
    Printers(PrintersArgs),
    /// Print the built-in Arabic sample receipt.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PrintArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Receipt JSON; `-` reads standard input.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub receipt: PathBuf,

    /// Echo the validated receipt as JSON before printing.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Receipt JSON; the Arabic sample when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub receipt: Option<PathBuf>,

    /// Write the bytes here instead of printing a hex dump.
    #[arg(long, short, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Receipt JSON; the Arabic sample when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub receipt: Option<PathBuf>,

    /// PNG to write.
    #[arg(long, short, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone, Default)]
pub struct PrintersArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Show every queue, not only likely receipt printers.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Args, Clone, Default)]
pub struct DemoArgs {
    #[command(flatten)]
    pub overrides: Overrides,
}

/// Flags shared by every command.
#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Serial device (COM7, /dev/ttyUSB0).
    #[arg(long = "serial-port", value_name = "PORT")]
    pub serial_port: Option<String>,

    #[arg(long = "baud-rate", value_name = "BAUD")]
    pub baud_rate: Option<u32>,

    /// Print over TCP to this host instead of a serial port.
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Print through this spooler queue instead of a device.
    #[arg(long = "queue", value_name = "NAME")]
    pub queue: Option<String>,

    /// Paper width: 58mm or 80mm.
    #[arg(long = "paper", value_name = "WIDTH")]
    pub paper: Option<String>,

    /// Code page for direct text (pc437, wpc1256, ...).
    #[arg(long = "codepage", value_name = "TABLE")]
    pub codepage: Option<String>,

    /// Printer-specific `ESC t` slot for the code page.
    #[arg(long = "codepage-slot", value_name = "N")]
    pub codepage_slot: Option<u8>,

    /// TrueType font for raster output.
    #[arg(long = "font", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub font: Option<PathBuf>,

    #[arg(long = "font-size", value_name = "PT")]
    pub font_size_pt: Option<f32>,

    /// Refuse rasters taller than this many rows.
    #[arg(long = "max-height", value_name = "ROWS")]
    pub max_height: Option<usize>,

    /// Strategy order, comma separated.
    #[arg(long = "strategy", value_name = "NAME", value_delimiter = ',')]
    pub strategies: Option<Vec<String>>,

    /// wait or reject when the printer is busy.
    #[arg(long = "lock-policy", value_name = "POLICY")]
    pub lock_policy: Option<String>,

    /// Base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(long = "log-json", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub log_json: Option<bool>,
}

impl Command {
    pub fn overrides(&self) -> &Overrides {
        match self {
            Command::Print(args) => &args.overrides,
            Command::Encode(args) => &args.overrides,
            Command::Preview(args) => &args.overrides,
            Command::Printers(args) => &args.overrides,
            Command::Demo(args) => &args.overrides,
        }
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub printer: PrinterSettings,
    pub target: TransportTarget,
    pub render: RenderSettings,
    pub transport: TransportSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct PrinterSettings {
    pub profile: PrinterConfig,
    pub codepage: Codepage,
    pub cut_mode: CutMode,
    pub feed_lines: u8,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub font_size_pt: f32,
    pub max_height: usize,
    pub font: FontConfig,
    pub strategies: Vec<RenderStrategy>,
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub lock_policy: LockPolicy,
    pub lock_wait: Option<Duration>,
    pub compositor_queue: Option<String>,
    pub dialog_surface: Option<SurfaceHandle>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings for `cli` from every source.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("render.strategies"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_printer_env(|name| std::env::var(name).ok())?;
    raw.apply_overrides(cli.command.overrides());
    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    printer: RawPrinter,
    target: RawTarget,
    render: RawRender,
    transport: RawTransport,
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPrinter {
    paper: Option<String>,
    codepage: Option<String>,
    codepage_slot: Option<u8>,
    cut: Option<String>,
    feed_lines: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTarget {
    /// serial, network or spooler. Inferred from the other keys if absent.
    kind: Option<String>,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    host: Option<String>,
    port: Option<u16>,
    queue: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRender {
    font_size_pt: Option<f32>,
    max_height: Option<usize>,
    font_path: Option<PathBuf>,
    system_fonts: Option<bool>,
    strategies: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTransport {
    connect_timeout_seconds: Option<u64>,
    send_timeout_seconds: Option<u64>,
    lock_policy: Option<String>,
    lock_wait_seconds: Option<u64>,
    compositor_queue: Option<String>,
    dialog_surface: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLogging {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    /// Variables the first release of the printing tool read directly.
    fn apply_printer_env(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), LoadError> {
        if let Some(port) = var("PRINTER_COM_PORT") {
            self.target.serial_port = Some(port);
        }
        if let Some(baud) = var("PRINTER_BAUD_RATE") {
            let baud = baud
                .trim()
                .parse()
                .map_err(|_| LoadError::invalid("PRINTER_BAUD_RATE", format!("`{baud}` is not a number")))?;
            self.target.baud_rate = Some(baud);
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(port) = overrides.serial_port.as_ref() {
            self.target.serial_port = Some(port.clone());
            self.target.kind = Some("serial".into());
        }
        if let Some(baud) = overrides.baud_rate {
            self.target.baud_rate = Some(baud);
        }
        if let Some(host) = overrides.host.as_ref() {
            self.target.host = Some(host.clone());
            self.target.kind = Some("network".into());
        }
        if let Some(port) = overrides.port {
            self.target.port = Some(port);
        }
        if let Some(queue) = overrides.queue.as_ref() {
            self.target.queue = Some(queue.clone());
            self.target.kind = Some("spooler".into());
        }
        if let Some(paper) = overrides.paper.as_ref() {
            self.printer.paper = Some(paper.clone());
        }
        if let Some(codepage) = overrides.codepage.as_ref() {
            self.printer.codepage = Some(codepage.clone());
        }
        if let Some(slot) = overrides.codepage_slot {
            self.printer.codepage_slot = Some(slot);
        }
        if let Some(font) = overrides.font.as_ref() {
            self.render.font_path = Some(font.clone());
        }
        if let Some(size) = overrides.font_size_pt {
            self.render.font_size_pt = Some(size);
        }
        if let Some(max) = overrides.max_height {
            self.render.max_height = Some(max);
        }
        if let Some(strategies) = overrides.strategies.as_ref() {
            self.render.strategies = Some(strategies.clone());
        }
        if let Some(policy) = overrides.lock_policy.as_ref() {
            self.transport.lock_policy = Some(policy.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let printer = PrinterSettings::from_raw(raw.printer)?;
        let target = target_from_raw(raw.target)?;
        let render = RenderSettings::from_raw(raw.render, printer.codepage)?;
        let transport = TransportSettings::from_raw(raw.transport)?;
        let logging = LoggingSettings::from_raw(raw.logging)?;
        Ok(Self {
            printer,
            target,
            render,
            transport,
            logging,
        })
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            printer: self.printer.profile,
            cut_mode: self.printer.cut_mode,
            feed_lines: self.printer.feed_lines,
            ..BuildOptions::default()
        }
    }

    pub fn locks(&self) -> TargetLocks {
        let locks = TargetLocks::new(self.transport.lock_policy);
        match self.transport.lock_wait {
            Some(wait) => locks.with_wait_timeout(wait),
            None => locks,
        }
    }

    /// A pipeline configured from these settings.
    pub fn pipeline(&self, connector: Arc<dyn Connector>) -> Pipeline {
        let mut pipeline = Pipeline::new(connector)
            .with_strategies(self.render.strategies.clone())
            .with_options(self.build_options())
            .with_locks(Arc::new(self.locks()));
        if let Some(queue) = &self.transport.compositor_queue {
            pipeline = pipeline.with_compositor_queue(queue.clone());
        }
        if let Some(surface) = &self.transport.dialog_surface {
            pipeline = pipeline.with_dialog_surface(surface.clone());
        }
        pipeline
    }
}

impl PrinterSettings {
    fn from_raw(raw: RawPrinter) -> Result<Self, LoadError> {
        let paper = match raw.paper.as_deref().map(str::trim) {
            None => PaperWidth::default(),
            Some("58" | "58mm") => PaperWidth::Mm58,
            Some("80" | "80mm") => PaperWidth::Mm80,
            Some(other) => {
                return Err(LoadError::invalid("printer.paper", format!("`{other}` is not 58mm or 80mm")));
            }
        };

        let mut codepage = match raw.codepage.as_deref() {
            None => Codepage::default(),
            Some(name) => CodeTable::from_str(name)
                .map(Codepage::new)
                .map_err(|reason| LoadError::invalid("printer.codepage", reason))?,
        };
        if let Some(slot) = raw.codepage_slot {
            codepage = codepage.with_slot(slot);
        }

        let cut_mode = match raw.cut.as_deref().map(str::trim) {
            None | Some("partial") => CutMode::Partial,
            Some("full") => CutMode::Full,
            Some("partial-ascii") => CutMode::PartialAscii,
            Some("full-ascii") => CutMode::FullAscii,
            Some(other) => {
                return Err(LoadError::invalid("printer.cut", format!("unknown cut mode `{other}`")));
            }
        };

        Ok(Self {
            profile: PrinterConfig::for_paper(paper),
            codepage,
            cut_mode,
            feed_lines: raw.feed_lines.unwrap_or(DEFAULT_FEED_LINES),
        })
    }
}

fn target_from_raw(raw: RawTarget) -> Result<TransportTarget, LoadError> {
    let kind = raw.kind.as_deref().map(str::trim).unwrap_or_else(|| {
        if raw.queue.is_some() {
            "spooler"
        } else if raw.host.is_some() {
            "network"
        } else {
            "serial"
        }
    });

    match kind {
        "serial" => Ok(TransportTarget::SerialPort {
            path: raw.serial_port.unwrap_or_else(|| DEFAULT_SERIAL_PORT.to_string()),
            baud: raw.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
        }),
        "network" => {
            let host = raw
                .host
                .ok_or_else(|| LoadError::invalid("target.host", "required for network targets"))?;
            Ok(TransportTarget::NetworkSocket {
                host,
                port: raw.port.unwrap_or(DEFAULT_RAW_PORT),
            })
        }
        "spooler" => {
            let queue = raw
                .queue
                .ok_or_else(|| LoadError::invalid("target.queue", "required for spooler targets"))?;
            Ok(TransportTarget::SpoolerQueue(queue))
        }
        other => Err(LoadError::invalid(
            "target.kind",
            format!("`{other}` is not serial, network or spooler"),
        )),
    }
}

impl RenderSettings {
    fn from_raw(raw: RawRender, codepage: Codepage) -> Result<Self, LoadError> {
        let font_size_pt = raw.font_size_pt.unwrap_or(DEFAULT_FONT_SIZE_PT);
        if !(font_size_pt.is_finite() && font_size_pt > 0.0) {
            return Err(LoadError::invalid("render.font_size_pt", "must be positive"));
        }
        let max_height = raw.max_height.unwrap_or(DEFAULT_MAX_HEIGHT);
        if max_height == 0 {
            return Err(LoadError::invalid("render.max_height", "must be at least 1"));
        }

        let strategies = match raw.strategies {
            None => RenderStrategy::defaults(),
            Some(names) => names
                .iter()
                .filter(|name| !name.trim().is_empty())
                .map(|name| RenderStrategy::from_str(name))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|reason| LoadError::invalid("render.strategies", reason))?,
        };
        // Names carry no parameters; fill them in from the other settings.
        let strategies = strategies
            .into_iter()
            .map(|strategy| match strategy {
                RenderStrategy::DirectText(_) => RenderStrategy::DirectText(codepage),
                RenderStrategy::RasterBitmap { .. } => RenderStrategy::RasterBitmap {
                    font_size_pt,
                    max_height,
                },
                other => other,
            })
            .collect();

        Ok(Self {
            font_size_pt,
            max_height,
            font: FontConfig {
                path: raw.font_path,
                search_system: raw.system_fonts.unwrap_or(true),
            },
            strategies,
        })
    }
}

impl TransportSettings {
    fn from_raw(raw: RawTransport) -> Result<Self, LoadError> {
        let lock_policy = match raw.lock_policy.as_deref().map(str::trim) {
            None | Some("wait") => LockPolicy::Wait,
            Some("reject") => LockPolicy::Reject,
            Some(other) => {
                return Err(LoadError::invalid("transport.lock_policy", format!("`{other}` is not wait or reject")));
            }
        };
        Ok(Self {
            connect_timeout: Duration::from_secs(
                raw.connect_timeout_seconds.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            send_timeout: Duration::from_secs(raw.send_timeout_seconds.unwrap_or(DEFAULT_SEND_TIMEOUT_SECS)),
            lock_policy,
            lock_wait: raw.lock_wait_seconds.map(Duration::from_secs),
            compositor_queue: raw.compositor_queue.filter(|q| !q.trim().is_empty()),
            dialog_surface: raw.dialog_surface.filter(|s| !s.trim().is_empty()).map(SurfaceHandle),
        })
    }
}

impl LoggingSettings {
    fn from_raw(raw: RawLogging) -> Result<Self, LoadError> {
        let level = match raw.level.as_deref() {
            None => LevelFilter::INFO,
            Some(level) => LevelFilter::from_str(level)
                .map_err(|err| LoadError::invalid("logging.level", err.to_string()))?,
        };
        let format = if raw.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };
        Ok(Self { level, format })
    }
}
