use super::{AudioEngine, Codec};
use crate::app::events::{AudioEvent, Event};
use anyhow::Context;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, WriteHalf},
    net::UnixStream,
    process::{Child, Command},
    sync::mpsc,
};

/// mpv driven over its JSON IPC socket.
///
/// Commands are queued on a channel and written by a background task, so
/// the session loop never waits on the socket.
#[derive(Debug)]
pub struct MpvHandle {
    child: Child,
    socket_path: PathBuf,
    commands: mpsc::UnboundedSender<serde_json::Value>,
}

impl MpvHandle {
    pub async fn spawn(
        event_tx: mpsc::Sender<Event>,
        audio_device: Option<&str>,
        volume: u8,
        log_file: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let socket_path =
            std::env::temp_dir().join(format!("tunedeck-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let mut cmd = Command::new("mpv");
        cmd.args([
            "--no-video",
            "--idle=yes",
            "--input-terminal=no",
            "--really-quiet",
            "--audio-channels=stereo",
        ]);
        cmd.arg(format!("--volume={volume}"));
        if let Some(dev) = audio_device {
            cmd.arg(format!("--audio-device={dev}"));
        }
        if let Some(p) = log_file {
            cmd.arg(format!("--log-file={}", p.display()));
        }
        let child = cmd
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .context("spawn mpv")?;

        // mpv creates the socket shortly after starting.
        let stream = connect_with_retry(&socket_path).await?;
        let (reader, writer) = tokio::io::split(stream);

        tokio::spawn(read_events_loop(reader, event_tx));

        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_commands_loop(writer, rx));

        let this = Self {
            child,
            socket_path,
            commands,
        };
        this.send(json!({"command":["request_log_messages", "warn"]}))?;
        this.send(json!({"command":["observe_property", 1, "time-pos"]}))?;
        Ok(this)
    }

    fn send(&self, v: serde_json::Value) -> anyhow::Result<()> {
        self.commands
            .send(v)
            .map_err(|_| anyhow::anyhow!("mpv command channel closed"))
    }
}

impl AudioEngine for MpvHandle {
    fn play(&mut self, url: &str, _codec: &Codec, _expected: Option<Duration>) -> anyhow::Result<()> {
        self.send(json!({"command":["loadfile", url, "replace"]}))?;
        self.send(json!({"command":["set_property", "pause", false]}))
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        self.send(json!({"command":["set_property", "pause", true]}))
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        self.send(json!({"command":["set_property", "pause", false]}))
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.send(json!({"command":["stop"]}))
    }

    fn seek(&mut self, position: Duration) -> anyhow::Result<()> {
        self.send(json!({"command":["seek", position.as_secs_f64(), "absolute"]}))
    }
}

impl Drop for MpvHandle {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn connect_with_retry(path: &Path) -> anyhow::Result<UnixStream> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match UnixStream::connect(path).await {
            Ok(s) => return Ok(s),
            Err(e) => {
                if tokio::time::Instant::now() > deadline {
                    return Err(e).with_context(|| format!("connect to mpv ipc {}", path.display()));
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

async fn write_commands_loop(
    mut writer: WriteHalf<UnixStream>,
    mut rx: mpsc::UnboundedReceiver<serde_json::Value>,
) {
    let mut request_id: u64 = 1;
    while let Some(mut v) = rx.recv().await {
        // Tag requests so errors come back as structured replies.
        if let serde_json::Value::Object(ref mut o) = v {
            o.insert("request_id".to_string(), serde_json::Value::from(request_id));
        }
        request_id += 1;
        let Ok(mut line) = serde_json::to_vec(&v) else {
            continue;
        };
        line.push(b'\n');
        if let Err(e) = writer.write_all(&line).await {
            tracing::warn!(error = %e, "mpv ipc write failed");
            break;
        }
        let _ = writer.flush().await;
    }
}

async fn read_events_loop(reader: tokio::io::ReadHalf<UnixStream>, event_tx: mpsc::Sender<Event>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        // command replies: {"request_id":..., "error":"..."}
        if let (Some(_), Some(err)) = (v.get("request_id"), v.get("error").and_then(|e| e.as_str()))
            && err != "success"
        {
            tracing::warn!(error = err, "mpv rejected command");
        }
        if let Some(ev) = map_mpv_event(&v)
            && event_tx.send(Event::Audio(ev)).await.is_err()
        {
            break;
        }
    }
}

fn map_mpv_event(v: &serde_json::Value) -> Option<AudioEvent> {
    match v.get("event")?.as_str()? {
        "property-change" if v.get("name")?.as_str()? == "time-pos" => {
            let secs = v.get("data")?.as_f64()?;
            Some(AudioEvent::Tick {
                elapsed: Duration::from_secs_f64(secs.max(0.0)),
            })
        }
        "end-file" => match v.get("reason").and_then(|x| x.as_str()).unwrap_or("") {
            "eof" => Some(AudioEvent::Done),
            "error" => {
                let err = v.get("file_error").or_else(|| v.get("error"));
                let err = err.and_then(|x| x.as_str()).unwrap_or("unknown");
                Some(AudioEvent::Failed(format!("mpv end-file error: {err}")))
            }
            // "stop" and "redirect" come from our own loadfile/stop commands
            _ => None,
        },
        "log-message" => {
            let level = v.get("level")?.as_str()?;
            let text = v.get("text")?.as_str()?.trim();
            if !text.is_empty() {
                tracing::debug!(level, "mpv: {text}");
            }
            None
        }
        _ => None,
    }
}
