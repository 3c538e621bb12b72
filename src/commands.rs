//! One-shot subcommands. Each prints its result on stdout, its notices on
//! stderr, and fails when a danger notice was raised.

use std::io::{self, BufRead, Write};

use capdeck_api::{ApiClient, ApiRequest, Transport, types::StreamAction};
use miette::{IntoDiagnostic, WrapErr, miette};
use owo_colors::OwoColorize;

use crate::{
    cli::{AudioCommand, PresetCommand, RecordingCommand, StreamArg},
    notice::{NoticeBoard, NoticeLevel},
    playback::StreamSources,
    presets::{PresetManager, describe},
    sync::{Synchronizer, ToggleOutcome},
};

fn finish(notices: &NoticeBoard) -> miette::Result<()> {
    let mut failed = None;
    for notice in notices.since(0) {
        eprintln!("{} {}", notice.level.tag(), notice.message);
        if notice.level == NoticeLevel::Danger {
            failed = Some(notice.message);
        }
    }
    failed.map_or(Ok(()), |message| Err(miette!("{message}")))
}

pub async fn status<T: Transport>(
    sync: &Synchronizer<T>,
    json: bool,
    base_url: &str,
) -> miette::Result<()> {
    if json {
        let value: serde_json::Value = sync
            .client()
            .fetch(ApiRequest::get("/status"))
            .await
            .into_diagnostic()
            .wrap_err("failed to load status")?;
        let text = serde_json::to_string_pretty(&value).into_diagnostic()?;
        println!("{text}");
        return Ok(());
    }

    sync.refresh_status()
        .await
        .into_diagnostic()
        .wrap_err("failed to load status")?;
    let status = sync.store().read(|s| s.status.clone());

    if status.streaming_active {
        println!("streaming: {}", "active".green());
    } else {
        println!("streaming: {}", "stopped".dimmed());
    }
    println!("clients:   {}", status.client_count);
    if !status.streaming_active && !status.can_start {
        println!("cooldown:  {}s", status.cooldown_secs());
    }
    if let Some(url) = &status.stream_url {
        println!("stream:    {url}");
    }
    println!(
        "playlist:  {}",
        StreamSources::new("/").absolute(base_url).playlist
    );
    finish(sync.notices())
}

pub async fn stream<T: Transport>(
    sync: &Synchronizer<T>,
    action: StreamArg,
) -> miette::Result<()> {
    sync.refresh_status()
        .await
        .into_diagnostic()
        .wrap_err("failed to load status")?;

    let active = sync.store().read(|s| s.status.streaming_active);
    if active == (action == StreamArg::Start) {
        println!(
            "streaming is already {}",
            if active { "running" } else { "stopped" }
        );
        return Ok(());
    }

    let outcome = sync.toggle_streaming().await;
    finish(sync.notices())?;
    match outcome {
        ToggleOutcome::Started => println!("streaming started"),
        ToggleOutcome::Stopped => println!("streaming stopped"),
        ToggleOutcome::Refused { remaining_secs } => {
            return Err(miette!("cooling down for {remaining_secs}s"));
        }
        ToggleOutcome::Busy | ToggleOutcome::Failed => {
            return Err(miette!("streaming did not change"));
        }
    }
    Ok(())
}

fn confirm(question: &str) -> bool {
    eprint!("{question} [y/N] ");
    let _ = io::stderr().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub async fn preset<T: Transport>(
    presets: &PresetManager<T>,
    notices: &NoticeBoard,
    command: PresetCommand,
) -> miette::Result<()> {
    match command {
        PresetCommand::List => {
            for preset in presets.list().await {
                if preset.description.is_empty() {
                    println!("{}  {}", preset.name.bold(), preset.title());
                } else {
                    println!(
                        "{}  {} - {}",
                        preset.name.bold(),
                        preset.title(),
                        preset.description
                    );
                }
            }
        }
        PresetCommand::Show { name } => {
            if let Some(detail) = presets.detail(&name).await {
                for line in describe(&detail) {
                    println!("{line}");
                }
            }
        }
        PresetCommand::Create(create) => {
            presets
                .create(&create.name, &create.description, !create.no_thumbnail)
                .await;
        }
        PresetCommand::Apply { name } => {
            presets.apply(&name).await;
        }
        PresetCommand::Delete { name, yes } => {
            let deleted = presets.delete(&name, |name| {
                yes || confirm(&format!("Delete preset \"{name}\"?"))
            }).await;
            if !deleted {
                println!("nothing deleted");
            }
        }
    }
    finish(notices)
}

async fn control_recording<T: Transport>(
    client: &ApiClient<T>,
    action: StreamAction,
) -> miette::Result<()> {
    let ack = client
        .control_recording(action)
        .await
        .into_diagnostic()
        .wrap_err("recording did not change")?;
    if ack.success {
        Ok(())
    } else {
        Err(miette!(
            "{}",
            ack.message.unwrap_or_else(|| "recording did not change".into())
        ))
    }
}

pub async fn recording<T: Transport>(
    sync: &Synchronizer<T>,
    command: RecordingCommand,
) -> miette::Result<()> {
    let client = sync.client();
    match command {
        RecordingCommand::List => {
            let list = client
                .recordings()
                .await
                .into_diagnostic()
                .wrap_err("failed to list recordings")?;
            if list.recordings.is_empty() {
                println!("no recordings");
            }
            for rec in list.recordings {
                println!(
                    "{}  {}  {}x{} @ {} fps  {}s  {}",
                    rec.id.bold(),
                    rec.filename,
                    rec.width,
                    rec.height,
                    rec.fps,
                    rec.duration_secs(),
                    rec.created_at.dimmed()
                );
            }
        }
        RecordingCommand::Status => {
            let status = client
                .recording_status()
                .await
                .into_diagnostic()
                .wrap_err("failed to load recording status")?;
            if !status.is_recording {
                println!("recording: {}", "stopped".dimmed());
                return Ok(());
            }
            println!("recording: {}", "active".red());
            println!("duration:  {}s", status.duration / 1_000_000);
            println!("size:      {} bytes", status.file_size);
            if let Some(file) = &status.current_file {
                println!("file:      {file}");
            }
            if let Some(active) = &status.settings {
                println!(
                    "format:    {}x{} @ {} fps, {}",
                    active.width, active.height, active.fps, active.codec
                );
            }
        }
        RecordingCommand::Start => {
            control_recording(client, StreamAction::Start).await?;
            println!("recording started");
        }
        RecordingCommand::Stop => {
            control_recording(client, StreamAction::Stop).await?;
            println!("recording stopped");
        }
        RecordingCommand::Settings { container, audio } => {
            let mut settings = client
                .recording_settings()
                .await
                .into_diagnostic()
                .wrap_err("failed to load recording settings")?;
            if container.is_some() || audio.is_some() {
                if let Some(container) = container {
                    settings.container = container;
                }
                if let Some(audio) = audio {
                    settings.include_audio = audio;
                }
                client
                    .set_recording_settings(&settings)
                    .await
                    .into_diagnostic()
                    .wrap_err("failed to update recording settings")?;
            }
            println!(
                "video:     {}x{} @ {} fps, {} at {} bps",
                settings.width,
                settings.height,
                settings.fps,
                settings.codec.as_str(),
                settings.bitrate
            );
            if settings.include_audio {
                println!(
                    "audio:     {} at {} bps",
                    settings.audio_codec.as_str(),
                    settings.audio_bitrate
                );
            } else {
                println!("audio:     {}", "off".dimmed());
            }
            println!("container: {}", settings.container);
            println!(
                "output:    {}{}",
                settings.output_path, settings.filename_template
            );
        }
        RecordingCommand::Show { id } => {
            let rec = client
                .recording(&id)
                .await
                .into_diagnostic()
                .wrap_err("failed to load recording")?;
            println!("{}", rec.filename.bold());
            println!("path:      {}", rec.filepath);
            println!(
                "format:    {}x{} @ {} fps, {} / {} in {}",
                rec.width,
                rec.height,
                rec.fps,
                rec.video_codec,
                rec.audio_codec,
                rec.container
            );
            println!("duration:  {}s", rec.duration_secs());
            println!("size:      {} bytes", rec.file_size);
            println!("created:   {}", rec.created_at);
        }
        RecordingCommand::Rename { id, name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(miette!("recording name cannot be empty"));
            }
            client
                .rename_recording(&id, name)
                .await
                .into_diagnostic()
                .wrap_err("failed to rename recording")?;
            println!("renamed {id} to {name}");
        }
        RecordingCommand::Delete { id, yes } => {
            if !(yes || confirm(&format!("Delete recording \"{id}\"?"))) {
                println!("nothing deleted");
                return Ok(());
            }
            client
                .delete_recording(&id)
                .await
                .into_diagnostic()
                .wrap_err("failed to delete recording")?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

pub async fn audio<T: Transport>(
    sync: &Synchronizer<T>,
    command: AudioCommand,
) -> miette::Result<()> {
    let client = sync.client();
    match command {
        AudioCommand::Sources => {
            let (list, status) = tokio::join!(
                client.audio_input_sources(),
                client.audio_status()
            );
            let list = list
                .into_diagnostic()
                .wrap_err("failed to list audio inputs")?;
            let current = status.ok().and_then(|s| s.source_id);
            for source in list.sources {
                let mark = if current.as_deref() == Some(source.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                if source.description.is_empty() {
                    println!("{mark} {}  {}", source.id, source.name);
                } else {
                    println!(
                        "{mark} {}  {} {}",
                        source.id,
                        source.name,
                        source.description.dimmed()
                    );
                }
            }
        }
        AudioCommand::Status => {
            let status = client
                .audio_status()
                .await
                .into_diagnostic()
                .wrap_err("failed to load audio status")?;
            match (status.connected, status.source_name.or(status.source_id)) {
                (true, Some(source)) => println!("audio input: {source}"),
                (true, None) => println!("audio input: connected"),
                (false, _) => println!("audio input: {}", "none".dimmed()),
            }
        }
        AudioCommand::Use { id } => {
            client
                .set_audio_input_source(&id)
                .await
                .into_diagnostic()
                .wrap_err("failed to select audio input")?;
            println!("audio input set to {id}");
        }
        AudioCommand::Disconnect => {
            client
                .disconnect_audio_input()
                .await
                .into_diagnostic()
                .wrap_err("failed to disconnect audio input")?;
            println!("audio input disconnected");
        }
    }
    Ok(())
}

pub async fn devices<T: Transport>(
    sync: &Synchronizer<T>,
    rescan: bool,
) -> miette::Result<()> {
    sync.refresh_platform().await;
    sync.refresh_source()
        .await
        .into_diagnostic()
        .wrap_err("failed to load source")?;

    let kind = sync.store().read(|s| s.source.kind);
    if kind.device_class().is_none() {
        return Err(miette!("source type {kind:?} has no devices"));
    }
    if rescan {
        sync.rescan_devices().await;
    }

    let (devices, current) = sync
        .store()
        .read(|s| (s.devices_for_source().to_vec(), s.source.device.clone()));
    for device in devices {
        let mark = if device.id == current { "*" } else { " " };
        if device.available {
            println!("{mark} {}  {}", device.id, device.name);
        } else {
            println!(
                "{mark} {}  {} {}",
                device.id,
                device.name,
                "(unavailable)".dimmed()
            );
        }
    }
    finish(sync.notices())
}
