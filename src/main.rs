//! ttsrec main entry point
//!
//! Sets up logging and configuration, creates the speech engine and the
//! microphone, then hands control to the event loop.

use anyhow::Context;
use log::{debug, error, info, warn};
use std::process;
use ttsrec::app::App;
use ttsrec::recording::{CpalMicrophone, Microphone};
use ttsrec::speech::create_engine;
use ttsrec::state::config::Config;
use ttsrec::state::FormState;
use ttsrec::ui::{Surface, TerminalSurface};

/// Command line options
#[derive(Debug, Default)]
struct Options {
    debug: bool,
    list_voices: bool,
    json: bool,
    /// Remaining arguments, joined into the initial text
    text: Vec<String>,
}

impl Options {
    fn parse(args: impl Iterator<Item = String>) -> Self {
        let mut options = Options::default();
        for arg in args {
            match arg.as_str() {
                "--debug" | "-d" => options.debug = true,
                "--list-voices" | "-l" => options.list_voices = true,
                "--json" => options.json = true,
                _ => options.text.push(arg),
            }
        }
        options
    }
}

fn main() {
    let options = Options::parse(std::env::args().skip(1));

    // Initialize logger
    if options.debug {
        // Debug mode: write to ttsrec.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("ttsrec.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open ttsrec.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "ttsrec version {} starting (debug mode, logging to ttsrec.log)",
            ttsrec::VERSION
        );
    } else {
        // Normal mode: only errors, unless RUST_LOG says otherwise
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Error)
            .parse_default_env()
            .init();
    }

    if let Err(e) = run(options) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(options: Options) -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    info!("Configuration loaded from {}", config.path().display());

    let mut engine = create_engine(config.backend())?;
    if let Some(volume) = config.volume() {
        if let Err(e) = engine.set_volume(volume) {
            warn!("Could not set volume: {}", e);
        }
    }

    if options.list_voices {
        let voices = engine.list_voices().context("Failed to list voices")?;
        if options.json {
            println!("{}", serde_json::to_string_pretty(&voices)?);
        } else {
            let mut surface = TerminalSurface::new(config.output_dir());
            surface.show_voices(&voices);
        }
        return Ok(());
    }

    let mut surface = TerminalSurface::new(config.output_dir());

    let microphone: Option<Box<dyn Microphone>> = if config.recording_enabled() {
        match CpalMicrophone::probe() {
            Ok(microphone) => {
                info!("Recording from {}", microphone.device_name());
                Some(Box::new(microphone))
            }
            Err(e) => {
                // Speech still works without a microphone
                surface.report(&e);
                None
            }
        }
    } else {
        debug!("Recording disabled in configuration");
        None
    };

    let mut form = FormState::from_config(&config);
    if !options.text.is_empty() {
        form.set_text(options.text.join(" "));
    }

    println!(
        "{} {} ready ({} speech). Type text, then :play or :record. :help lists commands.",
        ttsrec::APP_NAME,
        ttsrec::VERSION,
        engine.name()
    );

    let mut app = App::new(engine, microphone, Box::new(surface), form)
        .context("Failed to start the playback coordinator")?;
    app.spawn_stdin_reader()
        .context("Failed to start the input reader")?;
    app.run()?;

    info!("ttsrec exiting");
    Ok(())
}
