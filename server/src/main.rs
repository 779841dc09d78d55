use anyhow::Context;
use bridge::control::ControlState;
use bridge::hub::ClientBridge;
use clap::Parser;
use generator::SyntheticStack;
use hazardcore::dispatch::{spawn_speech_worker, Mailbox};
use hazardcore::interface::ServerMessage;
use hazardcore::telemetry::MetricsRecorder;
use hazardcore::HazardEngine;
use speech::CommandSpeech;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::broadcast;
use workflow::config::ServerConfig;
use workflow::runner::{spawn_caption_preload, RunSummary, Runner};

mod bridge;
mod generator;
mod speech;
mod workflow;

const EVENT_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(author, version, about = "Hazard guidance server")]
struct Args {
    /// Load a server config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the WebSocket port
    #[arg(long)]
    port: Option<u16>,
    /// Run the engine on synthetic frames without opening a listener
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Frames to process in offline mode
    #[arg(long, default_value_t = 30)]
    frames: u64,
}

/// Engine plus the pieces of the stack that outlive it.
struct Assembly {
    runner: Runner,
    control: Arc<ControlState>,
    metrics: Arc<MetricsRecorder>,
    speech: Arc<Mailbox<String>>,
    events: broadcast::Sender<ServerMessage>,
    captioner: Arc<dyn hazardcore::interface::SceneCaptioner>,
}

fn assemble(config: &ServerConfig) -> anyhow::Result<Assembly> {
    let stack = SyntheticStack::build(config);
    let metrics = Arc::new(MetricsRecorder::new());
    let engine = HazardEngine::new(
        config.engine.clone(),
        stack.detector,
        Some(stack.depth),
        metrics.clone(),
    )
    .context("building hazard engine")?;

    let mut source = stack.source;
    source.open().context("opening capture source")?;

    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let control = Arc::new(ControlState::new());
    let speech = Arc::new(Mailbox::new());
    let runner = Runner::new(
        config.camera.clone(),
        engine,
        source,
        stack.captioner.clone(),
        speech.clone(),
        control.clone(),
        events.clone(),
    );

    Ok(Assembly {
        runner,
        control,
        metrics,
        speech,
        events,
        captioner: stack.captioner,
    })
}

async fn serve(config: ServerConfig) -> anyhow::Result<RunSummary> {
    let Assembly {
        mut runner,
        control,
        metrics,
        speech,
        events,
        captioner,
    } = assemble(&config)?;

    let speaker = spawn_speech_worker(speech.clone(), Arc::new(CommandSpeech::new(&config.speech)));
    if config.caption.preload {
        // detached: the frame loop never waits on it
        drop(spawn_caption_preload(captioner));
    }

    let bridge = ClientBridge::new(events, control.clone(), metrics);
    let bound = bridge.serve(config.bind_address()?)?;
    log::info!("[server] listening on ws://{}", bound);

    let frame_loop = tokio::spawn(async move { runner.run(None).await });

    signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
    log::info!("[server] shutting down");
    control.request_shutdown();
    let summary = frame_loop.await.context("joining frame loop")?;

    speech.close();
    speaker.await.context("joining speech worker")?;
    Ok(summary)
}

async fn run_offline(config: ServerConfig, frames: u64) -> anyhow::Result<RunSummary> {
    let Assembly {
        mut runner,
        metrics,
        speech,
        events,
        ..
    } = assemble(&config)?;

    let speaker = spawn_speech_worker(speech.clone(), Arc::new(CommandSpeech::new(&config.speech)));
    let mut feed = events.subscribe();
    drop(events);
    let printer = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(message) => match message.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(err) => log::warn!("[offline] unserializable event: {}", err),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("[offline] printer skipped {} events", skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let summary = runner.run(Some(frames)).await;
    drop(runner);
    printer.await.context("joining offline printer")?;
    speech.close();
    speaker.await.context("joining speech worker")?;

    let counters = metrics.snapshot();
    let report = format!(
        "frames={} alerts={} heartbeats={} detector_errors={} depth_fallbacks={} fps={:.1}\n",
        counters.frames_processed,
        counters.alerts,
        counters.heartbeats,
        counters.detector_errors,
        counters.depth_fallbacks,
        summary.processing_fps()
    );
    let report_path = PathBuf::from("tools/data/offline_alerts.log");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening {}", report_path.display()))?;
    file.write_all(report.as_bytes())
        .context("writing offline summary")?;
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    let summary = runtime.block_on(async move {
        if args.offline {
            run_offline(config, args.frames).await
        } else {
            serve(config).await
        }
    })?;

    println!(
        "Run finished -> captured {}, processed {}, scenes {}, read failures {}, {:.1} FPS",
        summary.captured,
        summary.processed,
        summary.scenes,
        summary.read_failures,
        summary.processing_fps()
    );
    Ok(())
}
