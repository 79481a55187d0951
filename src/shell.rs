//! Line-oriented front end: one command per line on stdin, board state
//! rendered as text on stdout.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use base64::Engine as _;
use log::{info, warn};

use crate::background::Background;
use crate::board::{Color, ManifestEntry, SoundButton};
use crate::config::Config;
use crate::controller::{Controller, KeyOutcome};
use crate::engine::audio::AudioEngine;
use crate::engine::playback::AudioBackend;
use crate::store::{FileStore, KvStore, MemoryStore};

const HELP: &str = "\
commands:
  list                         visible buttons in order
  status                       volume, modes, background
  click ID                     play a button
  map ID                       capture the next key as ID's hotkey
  key KEY [text]               keydown; `text` when focus is in a text field
  pct N | boost N | commit N   volume inputs
  search [TEXT]                filter by label
  color NAME on|off            filter by color
  drag ID TARGET [before|after|FRACTION]
  chaos | loop | stop
  upload FILE [COLOR] [LABEL...]
  background color CSS | image PATH | none
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Status,
    Help,
    Click(String),
    Map(String),
    Key { key: String, in_text_field: bool },
    Pct(String),
    Boost(String),
    Commit(String),
    Search(String),
    Color { color: Color, enabled: bool },
    Drag { id: String, target: String, fraction: Option<f32> },
    Chaos,
    Loop,
    Stop,
    Upload { path: String, color: Color, label: Option<String> },
    Background(Option<Background>),
    Quit,
}

fn arg<'a>(args: &[&'a str], i: usize, what: &str) -> anyhow::Result<&'a str> {
    args.get(i).copied().ok_or_else(|| anyhow!("missing {}", what))
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();
    let cmd = match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "click" | "play" => Command::Click(arg(&args, 0, "button id")?.to_string()),
        "map" => Command::Map(arg(&args, 0, "button id")?.to_string()),
        "key" => {
            let key = arg(&args, 0, "key")?.to_string();
            let in_text_field = args.get(1).map_or(false, |a| a.eq_ignore_ascii_case("text"));
            Command::Key { key, in_text_field }
        }
        "pct" => Command::Pct(rest.to_string()),
        "boost" => Command::Boost(rest.to_string()),
        "commit" => Command::Commit(rest.to_string()),
        "search" => Command::Search(rest.to_string()),
        "color" => {
            let name = arg(&args, 0, "color")?;
            let color = Color::parse(name).ok_or_else(|| anyhow!("unknown color {:?}", name))?;
            let enabled = match arg(&args, 1, "on|off")? {
                "on" => true,
                "off" => false,
                other => bail!("expected on|off, got {:?}", other),
            };
            Command::Color { color, enabled }
        }
        "drag" => {
            let id = arg(&args, 0, "dragged id")?.to_string();
            let target = arg(&args, 1, "target id")?.to_string();
            let fraction = match args.get(2).copied() {
                None => None,
                Some("before") => Some(0.25),
                Some("after") => Some(0.75),
                Some(other) => match other.parse::<f32>() {
                    Ok(f) if (0.0..=1.0).contains(&f) => Some(f),
                    _ => bail!("expected before|after or a fraction in 0..1, got {:?}", other),
                },
            };
            Command::Drag { id, target, fraction }
        }
        "chaos" => Command::Chaos,
        "loop" => Command::Loop,
        "stop" => Command::Stop,
        "upload" => {
            let path = arg(&args, 0, "file")?.to_string();
            let (color, label_at) = match args.get(1).and_then(|c| Color::parse(c)) {
                Some(c) => (c, 2),
                None => (Color::Green, 1),
            };
            let label = (args.len() > label_at).then(|| args[label_at..].join(" "));
            Command::Upload { path, color, label }
        }
        "background" | "bg" => match arg(&args, 0, "color|image|none")? {
            "none" => Command::Background(None),
            "color" => Command::Background(Some(Background::Color(args[1..].join(" ")))),
            "image" => Command::Background(Some(Background::Image(arg(&args, 1, "image path")?.to_string()))),
            other => bail!("expected color|image|none, got {:?}", other),
        },
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {:?} (try `help`)", other),
    };
    Ok(Some(cmd))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "aif" | "aiff" => "audio/aiff",
        _ => "application/octet-stream",
    }
}

/// Reads a local file into a `data:` URL, the way an upload is stored.
pub fn file_to_data_url(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime_for(path), b64))
}

/// Built-in buttons. A missing manifest gives an empty board.
pub fn load_manifest(path: &Path) -> anyhow::Result<Vec<SoundButton>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("no manifest at {}, starting with an empty board", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let entries: Vec<ManifestEntry> =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(entries.into_iter().map(SoundButton::from).collect())
}

pub fn open_store(config: &Config) -> Box<dyn KvStore> {
    match &config.storage_path {
        Some(path) => {
            if let Some(dir) = path.parent() {
                if let Err(e) = fs::create_dir_all(dir) {
                    warn!("cannot create {}: {}", dir.display(), e);
                }
            }
            info!("storage at {}", path.display());
            Box::new(FileStore::open(path))
        }
        None => Box::new(MemoryStore::new()),
    }
}

pub fn render_board<B: AudioBackend>(ctl: &Controller<B>, out: &mut impl Write) -> io::Result<()> {
    for item in ctl.items().iter().filter(|i| !i.hidden) {
        let b = &item.button;
        writeln!(out, "{:>5}  {:<24} {:<7} {}", item.pill, b.label, b.color(), b.id)?;
    }
    Ok(())
}

pub fn render_status<B: AudioBackend>(ctl: &Controller<B>, out: &mut impl Write) -> io::Result<()> {
    let on = |b: bool| if b { "on" } else { "off" };
    let v = ctl.volume();
    writeln!(
        out,
        "volume {}%  boost {}%  chaos {}  loop {}  playing {}",
        v.pct_text(),
        v.boost_text(),
        on(ctl.chaos()),
        on(ctl.looping()),
        ctl.playback().playing().len()
    )?;
    if let Some(style) = ctl.background_style() {
        writeln!(out, "background {}", style)?;
    }
    Ok(())
}

/// Applies one command. Returns `false` once the session should end.
pub fn execute<B: AudioBackend>(ctl: &mut Controller<B>, cmd: Command, out: &mut impl Write) -> anyhow::Result<bool> {
    match cmd {
        Command::List => render_board(ctl, out)?,
        Command::Status => render_status(ctl, out)?,
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Click(id) => {
            // a failed play shows up as a notice
            if let Err(e) = ctl.on_click(&id) {
                log::debug!("click {}: {}", id, e);
            }
        }
        Command::Map(id) => {
            ctl.on_map_trigger(&id)?;
            writeln!(out, "press a key for {} (escape cancels)", id)?;
        }
        Command::Key { key, in_text_field } => match ctl.on_key_down(&key, in_text_field) {
            KeyOutcome::Capture(outcome) => {
                let id = outcome.id().to_string();
                let pill = ctl.item(&id).map(|i| i.pill.clone()).unwrap_or_default();
                writeln!(out, "{} {}", id, pill)?;
            }
            KeyOutcome::Chaos(on) => writeln!(out, "chaos {}", if on { "on" } else { "off" })?,
            KeyOutcome::Loop(on) => writeln!(out, "loop {}", if on { "on" } else { "off" })?,
            KeyOutcome::Stopped => writeln!(out, "stopped")?,
            KeyOutcome::Played(id) => writeln!(out, "play {}", id)?,
            KeyOutcome::Ignored => {}
        },
        Command::Pct(v) => {
            ctl.on_pct_input(&v);
            render_status(ctl, out)?;
        }
        Command::Boost(v) => {
            ctl.on_boost_input(&v);
            render_status(ctl, out)?;
        }
        Command::Commit(v) => {
            ctl.on_boost_commit(&v);
            render_status(ctl, out)?;
        }
        Command::Search(q) => {
            ctl.on_search_input(&q);
            render_board(ctl, out)?;
        }
        Command::Color { color, enabled } => {
            ctl.on_color_filter(color, enabled);
            render_board(ctl, out)?;
        }
        Command::Drag { id, target, fraction } => {
            if !ctl.on_drag_start(&id) {
                bail!("cannot drag {:?}", id);
            }
            ctl.on_drag_over(&target, fraction);
            ctl.on_drop();
            ctl.on_drag_end();
            render_board(ctl, out)?;
        }
        Command::Chaos => writeln!(out, "chaos {}", if ctl.toggle_chaos() { "on" } else { "off" })?,
        Command::Loop => writeln!(out, "loop {}", if ctl.toggle_loop() { "on" } else { "off" })?,
        Command::Stop => ctl.stop_all(),
        Command::Upload { path, color, label } => {
            let path = Path::new(&path);
            let data_url = file_to_data_url(path)?;
            let label = label.unwrap_or_else(|| {
                path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "upload".into())
            });
            let id = ctl.upload(&label, &data_url, color);
            writeln!(out, "added {}", id)?;
        }
        Command::Background(bg) => {
            ctl.set_background(bg);
            render_status(ctl, out)?;
        }
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Runs a session over `input` until `quit` or end of input.
pub fn repl<B: AudioBackend>(ctl: &mut Controller<B>, input: impl BufRead, out: &mut impl Write) -> anyhow::Result<()> {
    render_board(ctl, out)?;
    for line in input.lines() {
        let line = line?;
        let keep_going = match parse(&line) {
            Ok(Some(cmd)) => execute(ctl, cmd, out).unwrap_or_else(|e| {
                let _ = writeln!(out, "error: {:#}", e);
                true
            }),
            Ok(None) => true,
            Err(e) => {
                writeln!(out, "error: {:#}", e)?;
                true
            }
        };
        for notice in ctl.take_notices() {
            writeln!(out, "! {}", notice)?;
        }
        out.flush()?;
        if !keep_going {
            break;
        }
    }
    Ok(())
}

/// Starts audio, builds the board from `config` and serves stdin.
pub fn run(config: Config) -> anyhow::Result<()> {
    let mut engine = AudioEngine::new(config.channel_capacity, config.sample_rate);
    if let Err(e) = engine.start() {
        // the board stays usable; plays fail with a notice
        warn!("{}", e);
    }
    let backend = engine.backend(&config.board_root);
    let builtins = load_manifest(&config.manifest_path())?;
    let store = open_store(&config);
    let mut ctl = Controller::new(config, store, backend, builtins);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = repl(&mut ctl, stdin.lock(), &mut stdout.lock());

    ctl.stop_all();
    drop(ctl);
    engine.stop();
    result
}
