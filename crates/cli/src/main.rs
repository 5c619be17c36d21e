use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

use reelgen_api::ReelgenClient;
use reelgen_engine::{GenerationBackend, PushChannelConfig, PushSubscription, TrackUpdate, Tracker, build_clip_prompt_request};
use reelgen_engine::wizard::WizardController;
use reelgen_types::{
    AspectRatio, FieldId, FieldValue, FormData, GenerationStatus, ListGenerationsQuery, MusicStyle, Quality,
    VideoStyle, form::BrandColorField,
};
use reelgen_util::{ClipPromptHandoff, JsonDraftStore};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();

    let client = Arc::new(ReelgenClient::new_from_env()?);
    match matches.subcommand() {
        Some(("create", sub)) => run_create(client, sub).await,
        Some(("status", sub)) => run_status(&client, sub).await,
        Some(("watch", sub)) => run_watch(client, sub).await,
        Some(("list", sub)) => run_list(&client, sub).await,
        Some(("cancel", sub)) => run_cancel(&client, sub).await,
        Some(("delete", sub)) => run_delete(&client, sub).await,
        Some(("assets", sub)) => run_assets(&client, sub).await,
        Some(("prompts", sub)) => run_prompts(&client, sub).await,
        _ => bail!("expected a subcommand; run with --help"),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .try_init();
}

fn build_cli() -> Command {
    let id_arg = Arg::new("id").required(true).help("Generation job id");
    Command::new("reelgen")
        .about("Create and track Reelgen video generations")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Submit a new generation job")
                .arg(Arg::new("concept").long("concept").required(true).action(ArgAction::Set).help("What the video is about"))
                .arg(Arg::new("style").long("style").action(ArgAction::Set).help("cinematic|energetic|minimalist|playful"))
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("30")
                        .help("Duration in seconds (15, 30, 60, or 90)"),
                )
                .arg(Arg::new("aspect").long("aspect").action(ArgAction::Set).help("16:9, 9:16, or 1:1"))
                .arg(Arg::new("music").long("music").action(ArgAction::Set).help("upbeat|ambient|corporate|none"))
                .arg(Arg::new("brand-name").long("brand-name").action(ArgAction::Set))
                .arg(Arg::new("brand-color").long("brand-color").action(ArgAction::Set).help("Primary brand color, e.g. #ff8800"))
                .arg(Arg::new("secondary-color").long("secondary-color").action(ArgAction::Set))
                .arg(Arg::new("cta-text").long("cta-text").action(ArgAction::Set).help("Call-to-action overlay text"))
                .arg(Arg::new("quality").long("quality").action(ArgAction::Set).help("standard|high"))
                .arg(Arg::new("fast").long("fast").action(ArgAction::SetTrue).help("Trade quality for speed"))
                .arg(Arg::new("parallel").long("parallel").action(ArgAction::SetTrue).help("Generate clips in parallel"))
                .arg(Arg::new("watch").long("watch").action(ArgAction::SetTrue).help("Follow the job until it finishes")),
        )
        .subcommand(Command::new("status").about("Fetch the current status of a job").arg(id_arg.clone()))
        .subcommand(
            Command::new("watch")
                .about("Poll a job until it reaches a terminal state")
                .arg(id_arg.clone())
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("2000")
                        .help("Delay between status fetches"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List generation jobs")
                .arg(Arg::new("page").long("page").value_parser(clap::value_parser!(u32)).default_value("1"))
                .arg(Arg::new("limit").long("limit").value_parser(clap::value_parser!(u32)).default_value("20"))
                .arg(Arg::new("status").long("status").action(ArgAction::Set).help("Filter by lifecycle state"))
                .arg(Arg::new("sort").long("sort").action(ArgAction::Set)),
        )
        .subcommand(Command::new("cancel").about("Request cancellation of a running job").arg(id_arg.clone()))
        .subcommand(Command::new("delete").about("Delete a generation and its assets").arg(id_arg.clone()))
        .subcommand(Command::new("assets").about("List the output assets of a completed job").arg(id_arg))
        .subcommand(
            Command::new("prompts")
                .about("Preview the per-clip prompts for a concept")
                .arg(Arg::new("concept").long("concept").required(true).action(ArgAction::Set))
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("30"),
                ),
        )
}

async fn run_create(client: Arc<ReelgenClient>, matches: &ArgMatches) -> Result<()> {
    let store = Arc::new(JsonDraftStore::new(None::<std::path::PathBuf>)?);
    let mut controller = WizardController::new(store);
    // Flags describe a complete form; a saved draft from an interactive
    // session would only fight with them.
    controller.discard();

    let concept = matches.get_one::<String>("concept").context("--concept is required")?;
    controller.update_field(FieldId::Concept, FieldValue::Text(concept.clone()));
    if let Some(style) = matches.get_one::<String>("style") {
        controller.update_field(FieldId::Style, FieldValue::Style(parse_style(style)?));
    }
    if let Some(duration) = matches.get_one::<u32>("duration") {
        controller.update_field(FieldId::DurationSeconds, FieldValue::Duration(*duration));
    }
    if let Some(aspect) = matches.get_one::<String>("aspect") {
        controller.update_field(FieldId::AspectRatio, FieldValue::Aspect(parse_aspect(aspect)?));
    }
    if let Some(music) = matches.get_one::<String>("music") {
        controller.update_field(FieldId::MusicStyle, FieldValue::Music(parse_music(music)?));
    }
    if let Some(name) = matches.get_one::<String>("brand-name") {
        controller.update_field(FieldId::BrandName, FieldValue::Text(name.clone()));
    }
    if let Some(color) = matches.get_one::<String>("brand-color") {
        controller.update_field(FieldId::BrandColor(BrandColorField::Primary), FieldValue::Text(color.clone()));
    }
    if let Some(color) = matches.get_one::<String>("secondary-color") {
        controller.update_field(FieldId::BrandColor(BrandColorField::Secondary), FieldValue::Text(color.clone()));
    }
    if let Some(text) = matches.get_one::<String>("cta-text") {
        controller.update_field(FieldId::IncludeCta, FieldValue::Flag(true));
        controller.update_field(FieldId::CtaText, FieldValue::Text(text.clone()));
    }
    if let Some(quality) = matches.get_one::<String>("quality") {
        controller.update_field(FieldId::Quality, FieldValue::Quality(parse_quality(quality)?));
    }
    controller.update_field(FieldId::FastGeneration, FieldValue::Flag(matches.get_flag("fast")));
    controller.update_field(FieldId::Parallelize, FieldValue::Flag(matches.get_flag("parallel")));

    let response = match controller.submit(client.as_ref()).await {
        Ok(response) => response,
        Err(error) => {
            for (field, message) in controller.errors() {
                eprintln!("{}: {}", field.label(), message);
            }
            bail!("{error}");
        }
    };
    println!("{}", serde_json::to_string_pretty(&response)?);

    if matches.get_flag("watch") {
        let push = response
            .websocket_url
            .clone()
            .map(|url| PushSubscription::connect(url, response.generation_id.clone(), PushChannelConfig::default()));
        let mut tracker = Tracker::new(client as Arc<dyn GenerationBackend>);
        tracker.start(&response.generation_id, push, print_update);
        let terminal = tracker.wait().await?;
        println!("{}", serde_json::to_string_pretty(&terminal)?);
    }
    Ok(())
}

async fn run_status(client: &ReelgenClient, matches: &ArgMatches) -> Result<()> {
    let id = require_id(matches)?;
    let response = client.get_generation(id).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_watch(client: Arc<ReelgenClient>, matches: &ArgMatches) -> Result<()> {
    let id = require_id(matches)?.to_string();
    let interval = std::time::Duration::from_millis(*matches.get_one::<u64>("interval-ms").unwrap_or(&2000));

    let mut tracker = Tracker::new(client as Arc<dyn GenerationBackend>).with_interval(interval);
    tracker.start(&id, None, print_update);
    let terminal = tracker.wait().await?;
    println!("{}", serde_json::to_string_pretty(&terminal)?);
    Ok(())
}

async fn run_list(client: &ReelgenClient, matches: &ArgMatches) -> Result<()> {
    let status = matches
        .get_one::<String>("status")
        .map(|value| value.parse::<GenerationStatus>())
        .transpose()?;
    let query = ListGenerationsQuery {
        page: *matches.get_one::<u32>("page").unwrap_or(&1),
        limit: *matches.get_one::<u32>("limit").unwrap_or(&20),
        status,
        sort: matches.get_one::<String>("sort").cloned(),
    };
    let response = client.list_generations(&query).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_cancel(client: &ReelgenClient, matches: &ArgMatches) -> Result<()> {
    let id = require_id(matches)?;
    let response = client.cancel_generation(id).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_delete(client: &ReelgenClient, matches: &ArgMatches) -> Result<()> {
    let id = require_id(matches)?;
    client.delete_generation(id).await?;
    println!("deleted {id}");
    Ok(())
}

async fn run_assets(client: &ReelgenClient, matches: &ArgMatches) -> Result<()> {
    let id = require_id(matches)?;
    let response = client.generation_assets(id).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_prompts(client: &ReelgenClient, matches: &ArgMatches) -> Result<()> {
    let mut data = FormData::default();
    if let Some(concept) = matches.get_one::<String>("concept") {
        data.concept = concept.clone();
    }
    if let Some(duration) = matches.get_one::<u32>("duration") {
        data.duration_seconds = *duration;
    }

    let request = build_clip_prompt_request(&data);
    let handoff = ClipPromptHandoff::new();
    handoff.store(client.generate_clip_prompts(&request).await?);
    render_prompts(&handoff)
}

fn render_prompts(handoff: &ClipPromptHandoff) -> Result<()> {
    let response = handoff.take().context("no clip prompts to render")?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn print_update(update: TrackUpdate) {
    match update {
        TrackUpdate::Snapshot(snapshot) => match &snapshot.progress {
            Some(progress) => println!(
                "{} {} ({}/{} steps, {:.0}%)",
                snapshot.status, progress.current_step, progress.steps_completed, progress.total_steps, progress.percentage
            ),
            None => println!("{}", snapshot.status),
        },
        TrackUpdate::Event(event) => println!("event {:?} {}", event.kind, event.data),
    }
}

fn require_id(matches: &ArgMatches) -> Result<&str> {
    matches.get_one::<String>("id").map(String::as_str).context("expected a generation id")
}

fn parse_style(value: &str) -> Result<VideoStyle> {
    Ok(match value {
        "cinematic" => VideoStyle::Cinematic,
        "energetic" => VideoStyle::Energetic,
        "minimalist" => VideoStyle::Minimalist,
        "playful" => VideoStyle::Playful,
        other => bail!("unknown style: {other}"),
    })
}

fn parse_aspect(value: &str) -> Result<AspectRatio> {
    Ok(match value {
        "16:9" => AspectRatio::Landscape,
        "9:16" => AspectRatio::Portrait,
        "1:1" => AspectRatio::Square,
        other => bail!("unknown aspect ratio: {other}"),
    })
}

fn parse_music(value: &str) -> Result<MusicStyle> {
    Ok(match value {
        "upbeat" => MusicStyle::Upbeat,
        "ambient" => MusicStyle::Ambient,
        "corporate" => MusicStyle::Corporate,
        "none" => MusicStyle::None,
        other => bail!("unknown music style: {other}"),
    })
}

fn parse_quality(value: &str) -> Result<Quality> {
    Ok(match value {
        "standard" => Quality::Standard,
        "high" => Quality::High,
        other => bail!("unknown quality: {other}"),
    })
}
