use std::{env, process, rc::Rc, sync::Arc, time::Duration};

use meshrtc::{
    backend::WebRtcFactory,
    config::Config,
    core::{Engine, SessionConfig},
    event_bus::BusEvent,
    log::{
        LogSink,
        logger::{DEFAULT_QUEUE_CAP, Logger},
    },
    media::SyntheticDevices,
    signaling_client::{Connector, TungsteniteConnector},
};

fn usage(bin: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {bin} [CONFIG] [ROOM] [NAME]");
    eprintln!();
    eprintln!("Joins ROOM as NAME with synthetic media and prints every bus event");
    eprintln!("until the session ends. Logs go where [Logging] in CONFIG says.");
    process::exit(2);
}

fn main() {
    // --- Parse CLI args ----------------------------------------------------
    let args: Vec<String> = env::args().collect();
    let [_, config_path, room, name] = args.as_slice() else {
        usage(args.first().map_or("meshrtc-probe", String::as_str));
    };

    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[probe] {e}");
            process::exit(1);
        }
    };

    // --- Start process logger ----------------------------------------------
    let logger = Logger::start_from_config(&config, DEFAULT_QUEUE_CAP);
    let log: Arc<dyn LogSink> = Arc::new(logger.handle());
    eprintln!("[probe] logging to {}", logger.file_path().display());

    if let Err(e) = run(&config, room, name, log) {
        eprintln!("[probe] {e}");
        logger.shutdown();
        process::exit(1);
    }
    logger.shutdown();
}

fn run(
    config: &Config,
    room: &str,
    name: &str,
    log: Arc<dyn LogSink>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session_config = SessionConfig::from_config(config)?;

    let connector: Arc<dyn Connector> = match &session_config.signaling.ca_file {
        Some(ca) => Arc::new(TungsteniteConnector::with_ca_file(ca)?),
        None => Arc::new(TungsteniteConnector::new()),
    };
    let factory = Rc::new(WebRtcFactory::new(log.clone())?);

    let mut engine = Engine::new(
        session_config,
        factory,
        Box::new(SyntheticDevices::default()),
        connector,
        log,
    );
    let _printer = engine.bus().on_any(|ev| match ev {
        BusEvent::DcMessage { peer_id, text } => println!("dc-message {peer_id}: {text}"),
        other => println!("{}: {other:?}", other.name()),
    });

    engine.start_local_media(None)?;
    engine.connect(room, name)?;

    // --- Run until kicked, ended or dropped for good ------------------------
    while engine.in_session() {
        engine.wait_and_poll(Duration::from_millis(250));
    }
    Ok(())
}
