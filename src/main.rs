use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tunedeck::app::Controller;
use tunedeck::app::events::Event;
use tunedeck::catalog::local::LocalLibrary;
use tunedeck::config::{self, Config};
use tunedeck::input;
use tunedeck::lyrics::{LrclibClient, LyricTimer, LyricTrack, TokioLyricLoader};
use tunedeck::playback::{PlayMode, PlaybackSession, SessionSettings, SessionStore};
use tunedeck::player::mpv::MpvHandle;
use tunedeck::storage::{Storage, StorageHandle};
use tunedeck::tui::{self, TerminalGuard};

#[derive(Debug, Parser)]
#[command(name = "tunedeck", version, about = "Terminal music session with synced lyrics")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play local files, directories or stream URLs interactively.
    Play {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the lyric window of an LRC file at a point in time (headless).
    Lyrics {
        file: PathBuf,
        /// Playback time in seconds.
        #[arg(long, default_value_t = 0.0)]
        at: f64,
        /// Window height, 3 or 5.
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Print the saved play queue (headless).
    Queue,
    /// Print or change the saved play mode.
    Mode {
        /// list_loop, order, single_loop, random or intelligent.
        mode: Option<PlayMode>,
        /// Advance to the next mode.
        #[arg(long, conflicts_with = "mode")]
        cycle: bool,
    },

    /// Audio output device management (mpv).
    Audio {
        #[command(subcommand)]
        cmd: AudioCommand,
    },
}

#[derive(Debug, Subcommand)]
enum AudioCommand {
    /// List mpv audio devices.
    List,
    /// Set mpv audio device (name as shown in list).
    Set { device: String },
    /// Clear mpv audio device override.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Command::Play { paths } => {
            init_file_logging(&cfg)?;
            run_session(cfg, paths).await?;
        }
        Command::Lyrics { file, at, rows } => {
            init_logging();
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let track = LyricTrack::parse(&raw).with_context(|| format!("parse {}", file.display()))?;
            let mut timer = LyricTimer::new(rows);
            timer.start(track);
            if let Some(window) = timer.on_tick(Duration::from_secs_f64(at.max(0.0))) {
                for (i, line) in window.lines.iter().enumerate() {
                    let marker = if i == window.lines.len() / 2 { ">" } else { " " };
                    println!("{marker} {line}");
                }
            }
        }
        Command::Queue => {
            init_logging();
            let storage = Storage::open(&cfg.cache_db())?;
            match storage.load_queue_snapshot()? {
                Some(snap) => {
                    for (i, t) in snap.tracks.iter().enumerate() {
                        let marker = if snap.current_index == Some(i) { "*" } else { " " };
                        println!("{marker}{:02}. {}  {}", i + 1, t.title, t.artist_line());
                    }
                }
                None => println!("No saved queue."),
            }
        }
        Command::Mode { mode, cycle } => {
            init_logging();
            let storage = Storage::open(&cfg.cache_db())?;
            let current = storage.load_play_mode()?.unwrap_or_default();
            let next = match (mode, cycle) {
                (Some(m), _) => Some(m),
                (None, true) => Some(current.cycle()),
                (None, false) => None,
            };
            match next {
                Some(m) => {
                    storage.save_play_mode(m)?;
                    println!("Play mode: {}", m.label());
                }
                None => println!("Play mode: {}", current.label()),
            }
        }
        Command::Audio { cmd } => match cmd {
            AudioCommand::List => {
                let out = tokio::process::Command::new("mpv")
                    .args(["--audio-device=help", "--no-video", "--idle=no"])
                    .output()
                    .await
                    .context("run mpv --audio-device=help")?;
                // mpv prints help to stdout.
                print!("{}", String::from_utf8_lossy(&out.stdout));
                eprint!("{}", String::from_utf8_lossy(&out.stderr));
            }
            AudioCommand::Set { device } => {
                let mut cfg = cfg;
                cfg.player.audio_device = Some(device);
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Updated audio device in config.");
            }
            AudioCommand::Clear => {
                let mut cfg = cfg;
                cfg.player.audio_device = None;
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Cleared audio device override.");
            }
        },
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// The interactive session owns the terminal, so logs go to a file.
fn init_file_logging(cfg: &Config) -> anyhow::Result<()> {
    let path = cfg.log_file();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

async fn run_session(cfg: Config, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let library = LocalLibrary::scan(&paths).context("scan sources")?;
    if library.tracks().is_empty() {
        anyhow::bail!("no audio files found");
    }

    let (tx, mut rx) = mpsc::channel::<Event>(256);

    let db_path = cfg.cache_db();
    let store = Storage::open(&db_path)?;
    let lrclib = if cfg.lyrics.lrclib {
        Some(LrclibClient::new()?)
    } else {
        None
    };
    let loader = TokioLyricLoader::new(
        tokio::runtime::Handle::current(),
        tx.clone(),
        StorageHandle::new(&db_path),
        lrclib,
    );

    let mpv_log = cfg.paths.data_dir.join("mpv.log");
    let mpv = MpvHandle::spawn(
        tx.clone(),
        cfg.player.audio_device.as_deref(),
        cfg.player.volume,
        Some(&mpv_log),
    )
    .await
    .context("start mpv")?;

    let settings = SessionSettings {
        max_failures: cfg.player.max_play_errors,
        stuck_tolerance: cfg.player.stuck_tolerance(),
        lyric_offset_ms: cfg.lyrics.offset_ms,
        lyrics_enabled: cfg.lyrics.show,
        ..SessionSettings::default()
    };
    let session = PlaybackSession::new(
        Box::new(mpv),
        Box::new(library.clone()),
        Box::new(loader),
        Box::new(store),
        settings,
    );

    let mut terminal = TerminalGuard::enter(cfg.input.mouse).context("init terminal")?;
    let size = crossterm::terminal::size().context("terminal size")?;
    let mut controller = Controller::new(Box::new(library), session, cfg.menu.clone(), size);

    input::spawn_input_task(tx, cfg.input.mouse);

    // All session state lives on this one blocking task.
    tokio::task::spawn_blocking(move || {
        controller.start();
        controller.run(&mut rx, |c| {
            if let Err(e) = tui::draw(terminal.terminal_mut(), c) {
                tracing::warn!(error = %format!("{e:#}"), "draw failed");
            }
        });
        drop(terminal);
    })
    .await
    .context("session loop")?;

    Ok(())
}
