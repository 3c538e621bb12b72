//! The interactive control panel.
//!
//! Widgets are addressed by id on stdin (`brightness 0.4`, `stream-button`)
//! next to a handful of commands. Every widget line that changed since the
//! last event is printed, followed by any new notices.

use std::{fmt::Write as _, future::Future, time::Duration};

use async_channel::Receiver;
use capdeck_api::Transport;
use itertools::Itertools;
use owo_colors::OwoColorize;
use rustc_hash::FxHashMap;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::{Config, ConfigPath},
    file_watcher::{FileWatcherEvent, watch_file},
    playback::{PlaybackSupervisor, StreamSources, check_playlist},
    presets::{PresetManager, describe},
    state::Section,
    sync::{Synchronizer, ToggleOutcome},
    views::{Edit, MemorySurface, Views, WidgetSurface, WidgetValue, surface::Widget},
};

const TICK: Duration = Duration::from_millis(250);

const HELP: &str = "\
<widget> [value]          set a widget, or press it when no value is given
show                      print every visible widget
refresh                   reload everything from the appliance
start | stop | toggle     control streaming
rescan                    rescan capture devices
playlist                  check that the stream playlist is served
flush                     send pending edits now
preset list
preset show NAME
preset create NAME [DESCRIPTION]
preset apply NAME
preset delete NAME [--yes]
help
quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Show,
    Refresh,
    Toggle,
    Start,
    Stop,
    Rescan,
    Playlist,
    Flush,
    Presets,
    ShowPreset(String),
    CreatePreset { name: String, description: String },
    ApplyPreset(String),
    DeletePreset { name: String, confirmed: bool },
    Set { id: String, raw: String },
}

fn split_word(s: &str) -> (&str, &str) {
    s.split_once(char::is_whitespace)
        .map_or((s, ""), |(head, rest)| (head, rest.trim()))
}

impl Command {
    /// `None` for blank lines and malformed preset commands.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (head, rest) = split_word(line);
        Some(match head {
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "show" => Command::Show,
            "refresh" => Command::Refresh,
            "toggle" => Command::Toggle,
            "start" => Command::Start,
            "stop" => Command::Stop,
            "rescan" => Command::Rescan,
            "playlist" => Command::Playlist,
            "flush" => Command::Flush,
            "preset" => return Self::parse_preset(rest),
            id => Command::Set {
                id: id.to_owned(),
                raw: rest.to_owned(),
            },
        })
    }

    fn parse_preset(rest: &str) -> Option<Self> {
        let (action, args) = split_word(rest);
        match action {
            "" | "list" => Some(Command::Presets),
            "create" => {
                let (name, description) = split_word(args);
                Some(Command::CreatePreset {
                    name: name.to_owned(),
                    description: description.to_owned(),
                })
            }
            "show" if !args.is_empty() => Some(Command::ShowPreset(args.to_owned())),
            "apply" if !args.is_empty() => Some(Command::ApplyPreset(args.to_owned())),
            "delete" => {
                let (name, confirmed) = match args.rsplit_once(char::is_whitespace) {
                    Some((name, "--yes" | "-y")) => (name.trim(), true),
                    _ => (args, false),
                };
                (!name.is_empty()).then(|| Command::DeletePreset {
                    name: name.to_owned(),
                    confirmed,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    Input(String),
    InputClosed,
    Section(Section),
    Config(FileWatcherEvent),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Panel<T> {
    sync: Synchronizer<T>,
    presets: PresetManager<T>,
    views: Views,
    surface: MemorySurface,
    base_url: String,
    config: Config,
    config_path: ConfigPath,
    rendered: FxHashMap<String, String>,
    last_notice: u64,
    tasks: JoinSet<()>,
    output: String,
}

impl<T: Transport> Panel<T> {
    pub fn new(
        sync: Synchronizer<T>,
        base_url: String,
        config: Config,
        config_path: ConfigPath,
    ) -> Self {
        let views = Views::new();
        let surface = MemorySurface::from_layout(&views.layout());
        let last_notice = sync.notices().last_id();
        Self {
            presets: PresetManager::new(sync.clone()),
            sync,
            views,
            surface,
            base_url,
            config,
            config_path,
            rendered: FxHashMap::default(),
            last_notice,
            tasks: JoinSet::new(),
            output: String::new(),
        }
    }

    /// Text produced since the last call.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn update(&mut self, event: PanelEvent) -> Flow {
        let flow = match event {
            PanelEvent::Input(line) => match Command::parse(&line) {
                Some(command) => self.run_command(command),
                None if line.trim().is_empty() => Flow::Continue,
                None => {
                    self.say(format!("cannot parse `{}`, try `help`", line.trim()));
                    Flow::Continue
                }
            },
            PanelEvent::InputClosed => Flow::Quit,
            PanelEvent::Section(section) => {
                self.resync(section);
                Flow::Continue
            }
            PanelEvent::Config(event) => {
                self.on_config_event(event);
                Flow::Continue
            }
            PanelEvent::Tick => {
                while let Some(done) = self.tasks.try_join_next() {
                    if let Err(e) = done {
                        error!("panel task failed: {e}");
                    }
                }
                Flow::Continue
            }
        };

        self.render_changes();
        self.render_notices();
        flow
    }

    fn run_command(&mut self, command: Command) -> Flow {
        debug!("command {command:?}");
        match command {
            Command::Help => self.say(HELP),
            Command::Quit => return Flow::Quit,
            Command::Show => {
                self.rendered.clear();
                for notice in self.sync.notices().live() {
                    self.say(format!("{} {}", notice.level.tag(), notice.message));
                }
            }
            Command::Refresh => {
                let sync = self.sync.clone();
                self.spawn(async move { sync.load_all().await });
            }
            Command::Toggle => self.toggle(),
            Command::Start => self.switch_streaming(true),
            Command::Stop => self.switch_streaming(false),
            Command::Rescan => self.apply_edit(Edit::RescanDevices),
            Command::Playlist => self.check_playlist(),
            Command::Flush => {
                if self.sync.debouncer().pending() == 0 {
                    self.say("no pending edits");
                } else {
                    self.sync.debouncer().fire_all();
                }
            }
            Command::ShowPreset(name) => {
                let presets = self.presets.clone();
                let notices = self.sync.notices().clone();
                self.spawn(async move {
                    if let Some(detail) = presets.detail(&name).await {
                        notices.info(describe(&detail).join("\n    "));
                    }
                });
            }
            Command::Presets => {
                let presets = self.presets.clone();
                self.spawn(async move {
                    presets.list().await;
                });
            }
            Command::CreatePreset { name, description } => {
                let presets = self.presets.clone();
                self.spawn(async move {
                    presets.create(&name, &description, true).await;
                });
            }
            Command::ApplyPreset(name) => self.apply_edit(Edit::ApplyPreset(name)),
            Command::DeletePreset {
                name,
                confirmed: false,
            } => {
                self.say(format!(
                    "delete preset \"{name}\"? confirm with `preset delete {name} --yes`"
                ));
            }
            Command::DeletePreset {
                name,
                confirmed: true,
            } => {
                let presets = self.presets.clone();
                self.spawn(async move {
                    presets.delete(&name, |_| true).await;
                });
            }
            Command::Set { id, raw } => self.set_widget(&id, &raw),
        }
        Flow::Continue
    }

    fn set_widget(&mut self, id: &str, raw: &str) {
        if !self.surface.has(id) {
            self.say(format!("no widget or command named `{id}`, try `help`"));
            return;
        }
        if !self.surface.is_shown(id) {
            self.say(format!("{id} is hidden right now"));
            return;
        }

        let value = WidgetValue::parse_like(self.surface.value(id), raw);
        let state = self.sync.store().snapshot();
        match self.views.read(id, &value, &state) {
            Some(edit) => self.apply_edit(edit),
            None if raw.is_empty() => self.say(format!("{id} needs a value")),
            None => self.say(format!("{id} does not accept {raw:?}")),
        }
    }

    fn apply_edit(&mut self, edit: Edit) {
        let sync = self.sync.clone();
        match edit {
            Edit::Image(image) => {
                sync.edit_image(|i| *i = image);
                self.resync(Section::Image);
            }
            Edit::Capture(capture) => {
                sync.edit_capture(|c| *c = capture);
                self.resync(Section::Capture);
            }
            Edit::Streaming(streaming) => {
                sync.edit_streaming(|s| *s = streaming);
                self.resync(Section::Streaming);
            }
            Edit::Control { name, value } => {
                if sync.edit_control(&name, value) {
                    self.resync(Section::Controls);
                }
            }
            Edit::ShaderParameter { name, value } => {
                if sync.edit_shader_parameter(&name, value) {
                    self.resync(Section::ShaderParameters);
                }
            }
            Edit::Shader(name) => {
                self.spawn(async move { sync.select_shader(&name).await });
            }
            Edit::SourceType(kind) => {
                self.spawn(async move { sync.select_source_type(kind).await });
            }
            Edit::Device(device) => {
                self.spawn(async move { sync.select_device(&device).await });
            }
            Edit::RescanDevices => {
                self.spawn(async move { sync.rescan_devices().await });
            }
            Edit::ToggleStreaming => self.toggle(),
            Edit::ApplyPreset(name) => {
                let presets = self.presets.clone();
                self.spawn(async move {
                    presets.apply(&name).await;
                });
            }
        }
    }

    fn switch_streaming(&mut self, on: bool) {
        let active = self.sync.store().read(|s| s.status.streaming_active);
        if active == on {
            self.sync.notices().info(if active {
                "Streaming is already running"
            } else {
                "Streaming is not running"
            });
        } else {
            self.toggle();
        }
    }

    fn toggle(&mut self) {
        let sync = self.sync.clone();
        self.spawn(async move {
            match sync.toggle_streaming().await {
                ToggleOutcome::Started => info!("streaming started"),
                ToggleOutcome::Stopped => info!("streaming stopped"),
                ToggleOutcome::Busy => debug!("toggle ignored, still settling"),
                outcome => debug!("toggle ended with {outcome:?}"),
            }
        });
    }

    fn check_playlist(&mut self) {
        let client = self.sync.client().clone();
        let notices = self.sync.notices().clone();
        let sources = StreamSources::new("/");
        let url = sources.absolute(&self.base_url).playlist;

        self.spawn(async move {
            let mut player = PlaybackSupervisor::new();
            player.handle(check_playlist(client.transport(), &sources).await);
            match player.warning() {
                None => notices.info(format!("{url}: {}", player.status())),
                Some(warning) => notices.warning(format!(
                    "{url}: {}: {}",
                    warning.title, warning.message
                )),
            };
        });
    }

    fn spawn(&mut self, task: impl Future<Output = ()> + Send + 'static) {
        self.tasks.spawn(task);
    }

    fn resync(&mut self, section: Section) {
        let state = self.sync.store().snapshot();
        self.views
            .synchronize_section(section, &state, &mut self.surface);
    }

    pub fn resync_all(&mut self) {
        let state = self.sync.store().snapshot();
        self.views.synchronize_all(&state, &mut self.surface);
    }

    // config

    fn on_config_event(&mut self, event: FileWatcherEvent) {
        match event {
            FileWatcherEvent::Changed => match Config::load(&self.config_path.file) {
                Ok(config) => self.reload_config(config),
                Err(e) => {
                    error!("{e:?}");
                    self.sync.notices().danger(
                        "Failed to parse config file, run `capdeck validate` to see the errors",
                    );
                }
            },
            FileWatcherEvent::Missing => {
                self.sync.notices().warning(format!(
                    "Config file not found at {}",
                    self.config_path.file.display()
                ));
            }
        }
    }

    fn reload_config(&mut self, config: Config) {
        if config == self.config {
            debug!("config unchanged");
            return;
        }

        self.sync
            .notices()
            .set_desktop(config.desktop_notifications);

        let reconnect = Config {
            desktop_notifications: self.config.desktop_notifications,
            ..config.clone()
        };
        if reconnect != self.config {
            self.sync
                .notices()
                .info("Connection settings take effect after a restart");
        }

        info!("config reloaded");
        self.config = config;
    }

    // output

    fn say(&mut self, text: impl AsRef<str>) {
        self.output.push_str(text.as_ref());
        self.output.push('\n');
    }

    fn render_changes(&mut self) {
        let lines: Vec<(String, String, bool)> = self
            .surface
            .shown()
            .map(|(id, widget)| (id.to_owned(), widget_line(widget), widget.enabled))
            .filter(|(_, line, _)| !line.is_empty())
            .collect();

        for (id, line, enabled) in lines {
            if self.rendered.get(&id) == Some(&line) {
                continue;
            }
            if enabled {
                let _ = writeln!(self.output, "{} {line}", id.cyan());
            } else {
                let _ = writeln!(self.output, "{} {}", id.cyan(), line.dimmed());
            }
            self.rendered.insert(id, line);
        }

        self.rendered.retain(|id, _| self.surface.is_shown(id));
    }

    fn render_notices(&mut self) {
        for notice in self.sync.notices().since(self.last_notice) {
            let _ = writeln!(self.output, "{} {}", notice.level.tag(), notice.message);
            self.last_notice = notice.id;
        }
    }

    async fn write_output<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> miette::Result<()> {
        let text = self.take_output();
        if text.is_empty() {
            return Ok(());
        }
        out.write_all(text.as_bytes())
            .await
            .and(out.flush().await)
            .map_err(|e| miette::miette!("writing to stdout failed: {e}"))
    }

    /// Runs until `quit`, end of input or `shutdown`. Pending writes and
    /// running actions finish before it returns.
    pub async fn run<R>(mut self, input: R, shutdown: CancellationToken) -> miette::Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let poller = {
            let sync = self.sync.clone();
            let token = shutdown.child_token();
            tokio::spawn(async move { sync.run_poller(token).await })
        };
        let lines = read_lines(input);
        let config_events = watch_file(self.config_path.file.clone(), shutdown.child_token());
        let updates = self.sync.updates();
        let mut tick = tokio::time::interval(TICK);
        let mut stdout = tokio::io::stdout();

        self.sync.load_all().await;
        self.resync_all();
        self.render_changes();
        self.render_notices();
        self.say("type `help` for commands");
        self.write_output(&mut stdout).await?;

        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => break,
                line = lines.recv() => line.map_or(PanelEvent::InputClosed, PanelEvent::Input),
                Ok(section) = updates.recv() => PanelEvent::Section(section),
                Ok(event) = config_events.recv() => PanelEvent::Config(event),
                _ = tick.tick() => PanelEvent::Tick,
            };

            let flow = self.update(event);
            self.write_output(&mut stdout).await?;
            if flow == Flow::Quit {
                break;
            }
        }

        shutdown.cancel();
        while self.tasks.join_next().await.is_some() {}
        self.sync.flush_pending().await;
        if let Err(e) = poller.await {
            warn!("poller ended badly: {e}");
        }

        self.render_notices();
        self.write_output(&mut stdout).await
    }
}

fn read_lines<R>(input: R) -> Receiver<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = async_channel::unbounded();
    tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("reading input failed: {e}");
                    break;
                }
            }
        }
    });
    rx
}

fn format_value(value: &WidgetValue) -> String {
    match value {
        WidgetValue::Text(text) => text.clone(),
        WidgetValue::Number(n) => n.to_string(),
        WidgetValue::Flag(true) => "on".to_owned(),
        WidgetValue::Flag(false) => "off".to_owned(),
    }
}

/// One line per widget, without colors.
fn widget_line(widget: &Widget) -> String {
    let mut parts = Vec::new();
    if let Some(label) = widget.label.as_deref().filter(|l| !l.is_empty()) {
        parts.push(label.to_owned());
    }
    if let Some(value) = &widget.value {
        let value = format_value(value);
        if !value.is_empty() {
            parts.push(format!("= {value}"));
        }
    }
    if let Some(range) = widget.range {
        parts.push(format!("[{} to {}, step {}]", range.min, range.max, range.step));
    }
    if !widget.options.is_empty() {
        let options = widget
            .options
            .iter()
            .map(|o| {
                if o.value == o.label {
                    o.value.clone()
                } else {
                    format!("{}={}", o.value, o.label)
                }
            })
            .join(" | ");
        parts.push(format!("({options})"));
    }
    if !parts.is_empty() && !widget.enabled {
        parts.push("(disabled)".to_owned());
    }
    parts.join(" ")
}
