use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use pmoconfig::Config;
use pmohotkeys::{HotKey, HotkeyEngine, HotkeyOutcome, HotkeysConfigExt, KeyEvent};
use pmomediacontrols::{
    ControlEvent, ControlEventBus, MediaControlsBridge, MediaControlsConfigExt, MediaMetadata,
    ThrottledPublisher, TracingSurface,
};
use pmoplayer::{
    BackendKind, ExternalSubtitle, Media, PlatformDescriptor, PlayerAction, PlayerConfigExt,
    PlayerCore, SeekIncrements, select_backend,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct AppOptions {
    config_dir: String,
    uri: String,
    subtitles: Vec<String>,
    start: Option<u64>,
}

fn resolve_options() -> Result<AppOptions> {
    let mut args = env::args().skip(1);
    let mut config_dir = String::new();
    let mut uri: Option<String> = None;
    let mut subtitles = Vec::new();
    let mut start = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_dir = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requiert un répertoire"))?;
            }
            "--sub" => {
                subtitles.push(
                    args.next()
                        .ok_or_else(|| anyhow!("--sub requiert une URI"))?,
                );
            }
            "--start" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--start requiert une valeur"))?;
                start = Some(
                    value
                        .parse()
                        .with_context(|| format!("Valeur invalide pour --start: {value}"))?,
                );
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other if other.starts_with("--") => {
                bail!("Argument inconnu: {other}. Utilise --help pour l'aide.")
            }
            other => {
                if uri.replace(other.to_string()).is_some() {
                    bail!("Une seule URI peut être ouverte");
                }
            }
        }
    }

    Ok(AppOptions {
        config_dir,
        uri: uri.ok_or_else(|| anyhow!("URI manquante. Utilise --help pour l'aide."))?,
        subtitles,
        start,
    })
}

fn print_usage() {
    println!("Usage: PMOPlayer [--config <dir>] [--sub <uri>]... [--start <secs>] <uri>");
    println!();
    println!("Une touche par ligne sur l'entrée standard, par exemple:");
    println!("  Space, shift+ArrowRight, KeyM, Escape");
    println!("Commandes:");
    println!("  :set <name> <value>   propriété brute du moteur");
    println!("  :get <name>");
    println!("  :cmd <args>...        commande brute du moteur");
    println!("  :sub <uri>            ajoute un sous-titre externe");
    println!("  :next, :previous      simule les touches multimédia");
    println!("  status                état courant");
    println!("  q                     quitter");
    println!();
    println!("  RUST_LOG              filtre tracing (ex: pmoplayer=debug)");
}

fn init_tracing(config: &Config) {
    if !config.get_log_enable_console().unwrap_or(true) {
        return;
    }
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = resolve_options()?;
    let config = Config::load_config(&options.config_dir)?;
    init_tracing(&config);

    // ========== PHASE 1 : Backend et session ==========

    let selection = select_backend(&PlatformDescriptor::current(), &config.get_backend_options()?);
    if selection.kind == BackendKind::Element {
        bail!("Le backend element a besoin d'un hôte navigateur");
    }
    info!(backend = %selection.kind, "🎬 Starting player session");

    let player = PlayerCore::new(selection.factory, config.get_core_options()?);
    let increments = config.get_seek_increments()?;
    let engine = HotkeyEngine::new(config.get_hotkeys()?);

    // ========== PHASE 2 : Contrôles média ==========

    let surface = Arc::new(TracingSurface::new());
    let publisher = Arc::new(ThrottledPublisher::new(
        surface.clone(),
        config.get_media_controls_throttle()?,
    ));
    let bridge = MediaControlsBridge::spawn(player.clone(), publisher.clone());

    spawn_error_logger(&player);
    spawn_navigation_logger(&bridge);

    // ========== PHASE 3 : Ouverture ==========

    let mut media = Media::new(options.uri.clone());
    for uri in &options.subtitles {
        media = media.with_subtitle(ExternalSubtitle::new(uri));
    }
    if let Some(secs) = options.start {
        media = media.with_start(Duration::from_secs(secs));
    }

    player.open(media, true).await?;

    let metadata = MediaMetadata {
        title: Some(options.uri.clone()),
        duration: player.state().duration,
        ..MediaMetadata::default()
    };
    if let Err(e) = publisher.set_metadata(&metadata).await {
        warn!(error = %e, "Failed to publish metadata");
    }

    // ========== PHASE 4 : Clavier ==========

    info!("⌨️ Reading keys from stdin (q to quit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        match dispatch(&player, &engine, &increments, surface.bus(), line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => warn!(error = %e, "Command failed"),
        }
        if player.is_disposed() {
            break;
        }
    }

    // ========== Arrêt ==========

    info!("👋 Shutting down");
    player.dispose().await;
    if let Err(e) = publisher.dispose().await {
        warn!(error = %e, "Failed to clear media controls");
    }
    bridge.shutdown().await;
    Ok(())
}

/// Handles one input line. Returns `false` when the user asked to quit.
async fn dispatch(
    player: &PlayerCore,
    engine: &HotkeyEngine<PlayerAction>,
    increments: &SeekIncrements,
    controls: &ControlEventBus,
    line: &str,
) -> Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }
    if matches!(line, "q" | "quit") {
        return Ok(false);
    }
    if line == "status" {
        print_status(player);
        return Ok(true);
    }
    if let Some(rest) = line.strip_prefix(':') {
        engine_command(player, controls, rest).await?;
        return Ok(true);
    }

    let hotkey: HotKey = line.parse()?;
    match engine.handle(&KeyEvent::from(&hotkey)) {
        HotkeyOutcome::Back => Ok(false),
        HotkeyOutcome::Handled(action) => {
            info!(action = %action, "Hotkey");
            player.perform(*action, increments).await?;
            Ok(true)
        }
        HotkeyOutcome::Unhandled => {
            println!("{hotkey}: aucune action");
            Ok(true)
        }
    }
}

async fn engine_command(
    player: &PlayerCore,
    controls: &ControlEventBus,
    line: &str,
) -> Result<()> {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("set") => {
            let (Some(name), Some(value)) = (words.next(), words.next()) else {
                bail!(":set <name> <value>");
            };
            player.set_property(name, value).await?;
        }
        Some("get") => {
            let name = words.next().ok_or_else(|| anyhow!(":get <name>"))?;
            match player.get_property(name).await? {
                Some(value) => println!("{name} = {value}"),
                None => println!("{name}: indisponible"),
            }
        }
        Some("cmd") => {
            let args: Vec<&str> = words.collect();
            if args.is_empty() {
                bail!(":cmd <args>...");
            }
            player.command(args).await?;
        }
        Some("sub") => {
            let uri = words.next().ok_or_else(|| anyhow!(":sub <uri>"))?;
            player
                .add_subtitle_track(ExternalSubtitle::new(uri), true)
                .await?;
        }
        // Simule les touches multimédia du système
        Some("next") => {
            controls.emit(ControlEvent::Next);
        }
        Some("previous") => {
            controls.emit(ControlEvent::Previous);
        }
        Some(other) => bail!("Commande inconnue: :{other}"),
        None => {}
    }
    Ok(())
}

fn print_status(player: &PlayerCore) {
    let state = player.state();
    println!(
        "{} {:.1}s / {:.1}s  volume {:.0}  vitesse {:.2}  sous-titres {}",
        if state.playing { "▶" } else { "⏸" },
        state.position.as_secs_f64(),
        state.duration.as_secs_f64(),
        state.volume,
        state.rate,
        state.track.subtitle.id,
    );
}

fn spawn_error_logger(player: &PlayerCore) {
    let mut errors = player.streams().error();
    tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(message) => warn!(error = %message, "Player error"),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn spawn_navigation_logger(bridge: &MediaControlsBridge) {
    let mut navigation = bridge.navigation();
    tokio::spawn(async move {
        loop {
            match navigation.recv().await {
                Ok(event) => info!(event = %event, "No playlist, navigation ignored"),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}
