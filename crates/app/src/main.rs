use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use stream_overlay_core::fetch::{ConfigFetcher, FileFetcher};
use stream_overlay_core::timeline::manifestation_labels;
use stream_overlay_core::{
    AppConfig, ConfigProperty, ContainerBox, CustomizeStatus, JsonFileStore, MasterVolume,
    OverlayError, PlayerSession, PropertyValue, RecordedGraph,
};
use tracing_subscriber::EnvFilter;

type Session<'a> = PlayerSession<&'a dyn ConfigFetcher, JsonFileStore, RecordedGraph>;

fn main() -> stream_overlay_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = cli.common.settings()?;
    let fetcher = fetcher_for(&settings)?;
    let storage = JsonFileStore::new(settings.storage_dir.clone());
    let mut session: Session<'_> =
        PlayerSession::new(settings, fetcher.as_ref(), storage, RecordedGraph::default());
    session.open_scene(&cli.common.scene)?;

    match cli.command {
        Commands::Effective => run_effective(&session),
        Commands::Customize {
            instance_id,
            property,
            value,
        } => run_customize(&mut session, &instance_id, &property, &value),
        Commands::Reset { instance_id } => report(session.reset_element(&instance_id)),
        Commands::Routing {
            master_volume,
            muted,
        } => run_routing(&mut session, master_volume, muted),
        Commands::Schedule { until, step } => run_schedule(&mut session, until, step),
        Commands::Render { width, height } => run_render(&mut session, width, height),
    }
}

fn fetcher_for(settings: &AppConfig) -> stream_overlay_core::Result<Box<dyn ConfigFetcher>> {
    match settings.config_server_url.as_deref() {
        Some(server) if server.starts_with("http://") || server.starts_with("https://") => {
            http_fetcher()
        }
        _ => Ok(Box::new(FileFetcher)),
    }
}

#[cfg(feature = "http")]
fn http_fetcher() -> stream_overlay_core::Result<Box<dyn ConfigFetcher>> {
    let fetcher = stream_overlay_core::HttpFetcher::new(std::time::Duration::from_secs(10))?;
    Ok(Box::new(fetcher))
}

#[cfg(not(feature = "http"))]
fn http_fetcher() -> stream_overlay_core::Result<Box<dyn ConfigFetcher>> {
    Err(OverlayError::msg(
        "HTTP config servers are not supported. Build with --features http",
    ))
}

fn run_effective(session: &Session<'_>) -> stream_overlay_core::Result<()> {
    let effective = session
        .effective()
        .ok_or_else(|| OverlayError::msg("scene has no configuration"))?;
    println!("{}", effective.to_json_pretty()?);
    Ok(())
}

fn run_customize(
    session: &mut Session<'_>,
    instance_id: &str,
    property: &str,
    value: &str,
) -> stream_overlay_core::Result<()> {
    let result = property.parse::<ConfigProperty>().and_then(|property| {
        let value = PropertyValue::parse(property, value)?;
        session.customize(instance_id, property, value)
    });
    report(result)
}

fn report(result: stream_overlay_core::CustomizeResult) -> stream_overlay_core::Result<()> {
    println!("{}", serde_json::to_string(&CustomizeStatus::from(&result))?);
    result.map_err(|err| OverlayError::msg(err.to_string()))
}

fn run_routing(
    session: &mut Session<'_>,
    master_volume: f64,
    muted: bool,
) -> stream_overlay_core::Result<()> {
    session.set_master_volume(MasterVolume {
        volume: master_volume,
        muted,
    });
    let router = session.router();
    let graph = router.graph();
    let report = json!({
        "mapping": router.mapping(),
        "connections": graph.connections,
        "inputGains": graph.input_gains,
        "outputGain": graph.output_gain,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_schedule(session: &mut Session<'_>, until: f64, step: f64) -> stream_overlay_core::Result<()> {
    if step <= 0.0 {
        return Err(OverlayError::msg("--step must be positive"));
    }
    let scheduled: Vec<_> = session
        .effective()
        .map(|config| {
            config
                .elements
                .iter()
                .filter(|e| session.scheduler().is_mounted(&e.instance_id))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    for element in &scheduled {
        if let Some(labels) = manifestation_labels(element) {
            tracing::info!(instance_id = %element.instance_id, ?labels, "manifestation options");
        }
    }

    while session.now() <= until {
        let visible: Vec<_> = scheduled
            .iter()
            .map(|e| {
                json!({
                    "instanceId": e.instance_id,
                    "visible": session.scheduler().is_visible(&e.instance_id),
                })
            })
            .collect();
        println!("{}", json!({ "time": session.now(), "elements": visible }));
        session.advance(step);
    }
    Ok(())
}

fn run_render(session: &mut Session<'_>, width: f64, height: f64) -> stream_overlay_core::Result<()> {
    session.resize_viewport(ContainerBox::new(width, height));
    println!("{}", serde_json::to_string_pretty(&session.render())?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and edit viewer-customizable stream overlays", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Scene whose configuration is loaded.
    #[arg(short, long, global = true, default_value = "main")]
    scene: String,
    /// Player configuration file (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Config server URL or directory, overriding the configuration.
    #[arg(long, global = true)]
    server: Option<String>,
    /// Directory for viewer overrides, overriding the configuration.
    #[arg(long, global = true)]
    storage: Option<PathBuf>,
}

impl CommonArgs {
    fn settings(&self) -> stream_overlay_core::Result<AppConfig> {
        let mut settings = AppConfig::load(self.config.as_deref())?;
        if let Some(server) = &self.server {
            settings.config_server_url = Some(server.clone());
        }
        if let Some(storage) = &self.storage {
            settings.storage_dir = storage.clone();
        }
        Ok(settings)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective configuration (canonical merged with the viewer's).
    Effective,
    /// Change one property of one element and persist the override.
    Customize {
        instance_id: String,
        /// Property key, e.g. `opacity` or `isVolumeMuted`.
        property: String,
        /// JSON value, e.g. `0.5`, `true` or `{"x0":0,"y0":0,"x1":1,"y1":1}`.
        value: String,
    },
    /// Revert an element to the streamer's configuration.
    Reset { instance_id: String },
    /// Show how source audio channels are routed to the outputs.
    Routing {
        #[arg(long, default_value_t = 1.0)]
        master_volume: f64,
        #[arg(long)]
        muted: bool,
    },
    /// Simulate playback and print element visibility at every step.
    Schedule {
        /// Seconds to simulate.
        #[arg(long, default_value_t = 30.0)]
        until: f64,
        #[arg(long, default_value_t = 1.0)]
        step: f64,
    },
    /// Print the draw list for a player of the given size.
    Render {
        #[arg(long, default_value_t = 1920.0)]
        width: f64,
        #[arg(long, default_value_t = 1080.0)]
        height: f64,
    },
}
