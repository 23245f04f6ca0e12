use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
    fs,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
};

use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;

use puttrack::{
    LifetimeCounters, PuttrackError, Sample, SessionLogEntry, TrackerConfig,
    TrajectoryClassifier, ZoneSet, aggregate_career_with, career::load_stored_sessions,
    load_calibration, load_session_log, report_session, run_session,
    tracking::{JsonlSampleSource, LatestSampleSource, SampleSource},
    writer,
};

const STDIN_PATH: &str = "-";
// frames queued between the stdin reader and the classifier
const LIVE_QUEUE_FRAMES: usize = 8;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify detector output and print the session summary
    Track {
        /// JSON lines of samples, `-` to read live frames from stdin
        #[arg(short, long)]
        samples: PathBuf,

        /// Zone calibration file
        #[arg(short, long)]
        zones: PathBuf,

        /// Seconds without a detection before an attempt times out
        #[arg(long)]
        timeout: Option<f64>,

        /// Stop the session after this many seconds
        #[arg(long)]
        time_limit: Option<f64>,

        /// Attempt log to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Store the effective settings in the user config file
        #[arg(long, default_value_t = false)]
        save_config: bool,
    },
    /// Rebuild a session summary from an attempt log
    Report {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Recompute lifetime statistics from stored sessions
    Career {
        #[arg(short, long)]
        player_id: u64,

        /// JSON lines of stored session rows
        #[arg(short, long)]
        sessions: PathBuf,

        /// JSON file of lifetime counters kept outside the session rows
        #[arg(short, long)]
        lifetime: Option<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> Result<(), PuttrackError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PuttrackError::SessionSerializeError { source: e })?;
    println!("{}", json);
    Ok(())
}

fn stdin_source(cancel: Arc<AtomicBool>) -> LatestSampleSource {
    let (frames, source) = LatestSampleSource::bounded(LIVE_QUEUE_FRAMES);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match serde_json::from_str::<Sample>(&line) {
                Ok(sample) => {
                    if !frames.push(sample) {
                        break;
                    }
                }
                Err(e) => warn!("Skipping unreadable frame: {}", e),
            }
        }
    });
    source.with_cancel(cancel)
}

fn track(
    samples: &Path,
    zones: &Path,
    timeout: Option<f64>,
    time_limit: Option<f64>,
    output: Option<PathBuf>,
    save_config: bool,
    cancel: Arc<AtomicBool>,
) -> Result<(), PuttrackError> {
    let mut config = TrackerConfig::from_local_file().unwrap_or_default();
    if let Some(timeout) = timeout {
        config.detection_timeout_s = timeout;
    }
    if time_limit.is_some() {
        config.session_time_limit_s = time_limit;
    }
    config.validate()?;
    if save_config {
        config.save()?;
        info!("Saved settings to the user config file");
    }

    let (zone_set, warnings) = ZoneSet::new(load_calibration(zones)?, config.zone_roles.clone());
    if !warnings.is_empty() {
        warn!("Tracking with {} calibration warnings", warnings.len());
    }
    let mut classifier = TrajectoryClassifier::from_config(zone_set, &config);

    let source: Box<dyn SampleSource> = if samples == Path::new(STDIN_PATH) {
        Box::new(stdin_source(cancel.clone()))
    } else {
        Box::new(JsonlSampleSource::from_file(samples)?)
    };

    // with an output file, every log entry is also sent to the writer thread
    let (log_sender, writer_handle) = match output {
        Some(output_file) => {
            let (log_tx, log_rx) = mpsc::channel::<SessionLogEntry>();
            let handle =
                thread::spawn(move || writer::write_session_log(&output_file, log_rx));
            (Some(log_tx), Some(handle))
        }
        None => (None, None),
    };

    let session_log = run_session(
        source,
        &mut classifier,
        config.session_time_limit_s,
        &cancel,
        log_sender,
    )?;
    if let Some(handle) = writer_handle {
        handle.join().map_err(|_| PuttrackError::WriterError {
            source: io::Error::other("attempt log writer panicked"),
        })??;
    }

    print_json(&report_session(&session_log)?)
}

fn report(input: &Path) -> Result<(), PuttrackError> {
    if !input.exists() {
        return Err(PuttrackError::InvalidUserInput {
            field: "input".to_string(),
            reason: format!("{:?} does not exist", input),
        });
    }
    print_json(&report_session(&load_session_log(input)?)?)
}

fn load_lifetime(path: &Path) -> Result<LifetimeCounters, PuttrackError> {
    let contents = fs::read_to_string(path).map_err(|e| PuttrackError::InvalidUserInput {
        field: "lifetime".to_string(),
        reason: format!("could not read {:?}: {}", path, e),
    })?;
    serde_json::from_str(&contents).map_err(|e| PuttrackError::InvalidUserInput {
        field: "lifetime".to_string(),
        reason: e.to_string(),
    })
}

fn career(player_id: u64, sessions: &Path, lifetime: Option<&Path>) -> Result<(), PuttrackError> {
    let lifetime = lifetime.map(load_lifetime).transpose()?;
    let stored = load_stored_sessions(sessions)?;
    print_json(&aggregate_career_with(player_id, lifetime, &stored))
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_cancel.swap(true, Ordering::SeqCst) {
            println!("Exiting...");
            std::process::exit(1);
        }
        println!("Finishing session...");
    })
    .expect("Could not set Ctrl-C handler");

    match &cli.command {
        Commands::Track {
            samples,
            zones,
            timeout,
            time_limit,
            output,
            save_config,
        } => track(
            samples,
            zones,
            *timeout,
            *time_limit,
            output.clone(),
            *save_config,
            cancel,
        )
        .expect("Error while tracking session"),
        Commands::Report { input } => report(input).expect("Error while reporting session"),
        Commands::Career {
            player_id,
            sessions,
            lifetime,
        } => career(*player_id, sessions, lifetime.as_deref())
            .expect("Error while aggregating career"),
    };
}
