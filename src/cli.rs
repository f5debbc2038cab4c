//! Shared command-line front-end for the three programs.
//!
//! Exit codes: 0 on a normal finish or `--help`, 1 for argument,
//! configuration or runtime failures, 2 when the capture source does not open.

use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::{Input, VideoSource};
use crate::config::DetectionConfig;
use crate::detect::select_backends;
use crate::detection_log::{DetectionLog, DEFAULT_LOG_PATH};
use crate::display::{parse_key_script, Display, HeadlessDisplay};
use crate::session::{self, Program, RunSummary, Session};
use crate::ui::Ui;

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Capture video from camera (device index starting from 0).
    #[arg(short = 'c', long, default_value_t = 0)]
    pub camera: i32,

    /// Use a video file, an image directory or a stub:// source as input.
    #[arg(short = 'v', long)]
    pub video: Option<String>,

    /// Log file name for pedestrian detection data.
    #[arg(
        long,
        default_value = DEFAULT_LOG_PATH,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub store: String,

    /// JSON detection config (falls back to LANESNPEDS_CONFIG).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run without a window and stop at the end of the stream.
    #[arg(long)]
    pub headless: bool,

    /// Scripted key presses for headless runs, e.g. `3:l,6:p,9:q`.
    #[arg(long, requires = "headless", value_name = "SCRIPT")]
    pub keys: Option<String>,

    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, default_value = "auto", value_name = "MODE")]
    pub ui: String,
}

impl Args {
    /// Parse `argv` for `program`. `Ok(None)` means help or version was shown.
    pub fn parse_for<I, T>(program: Program, argv: I) -> Result<Option<Self>, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let command = Self::command().about(program.about());
        let matches = match command.try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err)
                if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
            {
                print!("{}", err.render());
                return Ok(None);
            }
            Err(err) => return Err(CliError::Usage(err.render().to_string())),
        };
        Self::from_arg_matches(&matches)
            .map(Some)
            .map_err(|err| CliError::Usage(err.render().to_string()))
    }

    /// Log path after applying the empty/`true` fallback.
    pub fn store_path(&self) -> PathBuf {
        resolve_store(&self.store)
    }

    pub fn source(&self) -> Input {
        Input::from_args(self.camera, self.video.as_deref())
    }
}

pub fn resolve_store(value: &str) -> PathBuf {
    let value = value.trim();
    if value.is_empty() || value == "true" {
        PathBuf::from(DEFAULT_LOG_PATH)
    } else {
        PathBuf::from(value)
    }
}

/// Failure classes that map to distinct exit codes.
#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Setup(anyhow::Error),
    Source { name: String, cause: anyhow::Error },
    Runtime(anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Source { .. } => 2,
            CliError::Usage(_) | CliError::Setup(_) | CliError::Runtime(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(message) => write!(f, "{}", message.trim_end()),
            CliError::Setup(err) => write!(f, "{err:#}"),
            CliError::Source { name, .. } => write!(f, "Can not open video stream: '{name}'"),
            CliError::Runtime(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Parse arguments, run `program` to completion and map the result to an exit code.
pub fn run_program<I, T>(program: Program, argv: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match execute(program, argv) {
        Ok(Some(summary)) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            if let CliError::Source { cause, .. } = &err {
                log::error!("{cause:#}");
            }
            println!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Run `program`; `Ok(None)` when only help was requested.
pub fn execute<I, T>(program: Program, argv: I) -> Result<Option<RunSummary>, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = Args::parse_for(program, argv)? else {
        return Ok(None);
    };
    let ui = Ui::from_args(
        Some(&args.ui),
        std::io::stderr().is_terminal(),
        !std::io::stdout().is_terminal(),
    );

    let config = {
        let _stage = ui.stage("Load detection config");
        DetectionConfig::load(args.config.as_deref()).map_err(CliError::Setup)?
    };
    let keys = match args.keys.as_deref() {
        Some(script) => {
            parse_key_script(script).map_err(|err| CliError::Usage(format!("{err:#}")))?
        }
        None => Vec::new(),
    };

    let input = args.source();
    let mut source = {
        let _stage = ui.stage("Open video source");
        VideoSource::open(&input).map_err(|cause| CliError::Source {
            name: input.display_name().to_string(),
            cause,
        })?
    };
    println!("{}", program.key_hint());

    let backends = {
        let _stage = ui.stage("Load detectors");
        select_backends(&config).map_err(CliError::Setup)?
    };
    let log = if program.writes_log() {
        let path = args.store_path();
        Some(DetectionLog::create(&path, config.log_batch).map_err(CliError::Setup)?)
    } else {
        None
    };
    let mut session = Session::new(program, &config, backends, log).map_err(CliError::Setup)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    if let Err(err) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        log::warn!("Ctrl-C handler not installed: {err}");
    }

    let mut display = open_display(program, &args, keys, &ui, source.frame_count())
        .map_err(CliError::Setup)?;
    let summary = session::run(&mut source, display.as_mut(), &mut session, &stop)
        .map_err(CliError::Runtime)?;
    log::info!(
        "{}: stopped ({:?}) after {} frames from {}",
        program.window_title(),
        summary.stop,
        summary.frames,
        source.stats().description
    );
    Ok(Some(summary))
}

fn open_display(
    program: Program,
    args: &Args,
    keys: Vec<(u64, char)>,
    ui: &Ui,
    frame_count: Option<u64>,
) -> anyhow::Result<Box<dyn Display>> {
    if !args.headless {
        if let Some(window) = open_window(program)? {
            return Ok(window);
        }
    }
    let mut display = HeadlessDisplay::new().with_keys(keys);
    if let Some(bar) = ui.frame_progress(frame_count) {
        display = display.with_progress(bar);
    }
    Ok(Box::new(display))
}

#[cfg(feature = "opencv")]
fn open_window(program: Program) -> anyhow::Result<Option<Box<dyn Display>>> {
    let window = crate::display::HighguiWindow::new(program.window_title())?;
    Ok(Some(Box::new(window)))
}

#[cfg(not(feature = "opencv"))]
fn open_window(program: Program) -> anyhow::Result<Option<Box<dyn Display>>> {
    log::warn!(
        "{}: no window support without the opencv feature, running headless",
        program.window_title()
    );
    Ok(None)
}
