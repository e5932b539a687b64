mod cli;

use std::fs::File;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use cli::{Args, Command};
use soundnav_core::config::Config;
use soundnav_core::geometry::Matrix4;
use soundnav_core::mapping::InstrumentTable;
use soundnav_core::paths;
use soundnav_core::pure_data::PureDataServer;
use soundnav_core::scene::TransformScene;
use soundnav_core::settings::{parse_port, FileSettings, Settings, HOSTNAME_KEY, PORT_KEY};
use soundnav_core::{ConnectionManager, Result};
use soundnav_types::{Endpoint, InstrumentSlot, OscMessage};

const DEMO_FRAME: Duration = Duration::from_millis(50);

fn init_logging(verbose: bool) {
    use simplelog::{ColorChoice, CombinedLogger, LevelFilter, TermLogger, TerminalMode, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let log_path = paths::log_file();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path).unwrap_or_else(|_| {
        File::create(std::env::temp_dir().join("soundnav.log")).expect("Cannot create log file")
    });

    CombinedLogger::init(vec![
        WriteLogger::new(log_level, simplelog::Config::default(), log_file),
        TermLogger::new(
            LevelFilter::Warn,
            simplelog::Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
    ])
    .expect("Failed to initialize logger");

    log::info!("soundnav starting (log level: {:?})", log_level);
}

fn main() -> ExitCode {
    let args = match cli::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("soundnav: {}\n\n{}", e, cli::USAGE);
            return ExitCode::from(2);
        }
    };
    init_logging(args.verbose);

    let config = Config::load();
    let mut settings = FileSettings::open_default();

    let result = match &args.command {
        Command::Help => {
            println!("{}", cli::USAGE);
            Ok(())
        }
        Command::Send { address, value } => {
            let msg = OscMessage::new(address.clone(), vec![value.clone()]);
            run_send(&args, &config, &mut settings, &msg)
        }
        Command::Demo { steps } => run_demo(&args, &config, &mut settings, *steps),
        Command::PureData { gui, patch } => {
            run_pure_data(&config, settings, *gui, patch.as_deref())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("soundnav: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Command line, then the last used endpoint, then the config file.
fn endpoint(args: &Args, config: &Config, settings: &FileSettings) -> Endpoint {
    let configured = config.endpoint();
    let hostname = args
        .host
        .clone()
        .or_else(|| settings.get(HOSTNAME_KEY))
        .unwrap_or(configured.hostname);
    let port = args.port.unwrap_or_else(|| {
        settings
            .get(PORT_KEY)
            .and_then(|p| {
                parse_port(&p)
                    .map_err(|e| log::warn!(target: "settings", "{}", e))
                    .ok()
            })
            .unwrap_or(configured.port)
    });
    Endpoint::new(hostname, port)
}

fn remember_endpoint(settings: &mut FileSettings, endpoint: &Endpoint) {
    for (key, value) in [(HOSTNAME_KEY, endpoint.hostname.clone()), (PORT_KEY, endpoint.port.to_string())] {
        if let Err(e) = settings.set(key, &value) {
            log::warn!(target: "settings", "{}", e);
        }
    }
}

fn connect(
    manager: &mut ConnectionManager<TransformScene>,
    args: &Args,
    config: &Config,
    settings: &mut FileSettings,
) -> Result<Endpoint> {
    let endpoint = endpoint(args, config, settings);
    manager.set_logging_enabled(args.log_messages || config.log_messages());
    manager.connect(&endpoint)?;
    remember_endpoint(settings, &endpoint);
    Ok(endpoint)
}

fn run_send(args: &Args, config: &Config, settings: &mut FileSettings, msg: &OscMessage) -> Result<()> {
    let mut manager = ConnectionManager::udp(TransformScene::new());
    let endpoint = connect(&mut manager, args, config, settings)?;
    manager.send_message(msg)?;
    println!("sent {} to {}", msg, endpoint);
    Ok(())
}

/// Scene nodes available to `[[instruments.slot]]` entries in the demo.
fn demo_scene() -> TransformScene {
    let mut scene = TransformScene::new();
    scene.add_transform("Tool", Matrix4::IDENTITY);
    scene.add_breach("Needle", 0.0);
    scene
}

fn demo_table(config: &Config, scene: &TransformScene) -> Result<InstrumentTable> {
    if config.slots().iter().any(|s| s.source.is_some()) {
        return config.instrument_table(|name| scene.find(name));
    }
    // No configured sources: stream the demo tool on the first slot.
    let mut table = InstrumentTable::new(config.max_instruments());
    if let Some(tool) = scene.find("Tool") {
        table.set_slot(0, InstrumentSlot::new("Tool", tool))?;
    }
    Ok(table)
}

fn run_demo(args: &Args, config: &Config, settings: &mut FileSettings, steps: usize) -> Result<()> {
    let scene = demo_scene();
    let table = demo_table(config, &scene)?;
    let root = args.root.as_deref().unwrap_or(config.address_root()).to_string();

    let mut manager = ConnectionManager::udp(scene);
    let endpoint = connect(&mut manager, args, config, settings)?;
    manager.start_transmission(&table, &root)?;
    println!(
        "streaming to {} under /{} ({} observers)",
        endpoint,
        root.trim_matches('/'),
        manager.observers().len()
    );

    let tool = manager.host().find("Tool");
    let needle = manager.host().find("Needle");
    let mut sent = 0;
    let mut failed = 0;
    for step in 0..steps {
        let t = step as f64 * 0.05;
        let mut tokens = Vec::new();
        if let Some(tool) = tool {
            let pose = Matrix4::from_translation(50.0 * t.cos(), 50.0 * t.sin(), 10.0 * (2.0 * t).sin())
                * Matrix4::rotation_z(t.to_degrees())
                * Matrix4::rotation_x(15.0 * t.sin());
            tokens.extend(manager.host_mut().set_matrix(tool, pose)?);
        }
        if let Some(needle) = needle {
            tokens.extend(manager.host_mut().set_signed_distance(needle, 5.0 * t.cos())?);
        }
        for token in tokens {
            let report = manager.handle_notification(token);
            sent += report.sent;
            failed += report.failures.len();
        }
        thread::sleep(DEMO_FRAME);
    }

    manager.disconnect();
    println!("sent {} messages ({} failed)", sent, failed);
    Ok(())
}

fn run_pure_data(
    config: &Config,
    settings: FileSettings,
    gui: bool,
    patch: Option<&std::path::Path>,
) -> Result<()> {
    let mut server = PureDataServer::system(settings);
    if let Some(executable) = config.pure_data_executable() {
        server.set_executable_path(executable)?;
    }
    let patch = patch.or(config.pure_data_patch());
    server.start(patch, gui || config.pure_data_show_gui())?;

    println!("Pure Data running; press Enter to stop");
    let mut line = String::new();
    if let Err(e) = std::io::stdin().read_line(&mut line) {
        log::warn!("stdin: {}", e);
    }
    server.stop();
    Ok(())
}
