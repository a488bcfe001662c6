//! One live codex subprocess.
//!
//! The instance owns four background threads: a stdin writer feeding the
//! prompt, a stderr collector, a run loop that tees and decodes the
//! NDJSON event stream from stdout, and a watchdog that kills the child
//! when the execute-time token is cancelled. Everything the child reads
//! or writes is mirrored into per-session log files before it is
//! interpreted, so a decode failure can still be diagnosed from disk.

use crate::agent::{ConversationId, ExecutionId, ExecutionInput};
use crate::cancel::CancelToken;
use crate::error::{MusterError, Result};
use crate::runtime::codex::CodexConfig;
use crate::runtime::{RuntimeEvent, RuntimeInstance, RuntimeResult};
use chrono::Utc;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Events are advisory; a small buffer absorbs a briefly slow consumer
/// and anything beyond that is dropped.
const EVENT_CHANNEL_CAPACITY: usize = 2;

const WATCHDOG_INTERVAL: Duration = Duration::from_millis(100);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(super) struct CodexInstance {
    events: Option<Receiver<RuntimeEvent>>,
    done: Receiver<Result<RuntimeResult>>,
}

impl CodexInstance {
    /// Spawn the codex subprocess and start its background run loop.
    ///
    /// The token governs the subprocess lifetime: a watchdog thread
    /// kills the child once it is cancelled. Raw stdin, stdout and
    /// stderr are teed into `<log_root>/codex/<execution>/<timestamp>/`.
    pub(super) fn spawn(
        cancel: &CancelToken,
        executable: &Path,
        id: &ExecutionId,
        log_root: &Path,
        config: &CodexConfig,
        input: &ExecutionInput,
    ) -> Result<CodexInstance> {
        cancel.check()?;

        let session_dir = session_log_dir(log_root, id);
        fs::create_dir_all(&session_dir).map_err(|e| {
            MusterError::io(
                format!("create session log dir '{}'", session_dir.display()),
                e,
            )
        })?;
        let stdin_log = create_log(&session_dir, "stdin.log")?;
        let stdout_log = create_log(&session_dir, "stdout.log")?;
        let stderr_log = create_log(&session_dir, "stderr.log")?;

        let mut command = Command::new(executable);
        command
            .args(build_args(config, input))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // A blank working directory means "wherever the runner is".
        if let Some(dir) = &input.working_directory
            && !dir.trim().is_empty()
        {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| MusterError::io(format!("start codex '{}'", executable.display()), e))?;

        let stdin = take_pipe(child.stdin.take(), "stdin")?;
        let stdout = take_pipe(child.stdout.take(), "stdout")?;
        let stderr = take_pipe(child.stderr.take(), "stderr")?;

        let (event_tx, event_rx) = sync_channel(EVENT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = sync_channel(1);
        let emitter = EventEmitter { tx: event_tx };
        emitter.emit(RuntimeEvent::Started {
            timestamp: Utc::now(),
        });

        let child = Arc::new(Mutex::new(child));
        let finished = Arc::new(AtomicBool::new(false));

        spawn_watchdog(
            Arc::clone(&child),
            Arc::clone(&finished),
            cancel.clone(),
        );

        let prompt = input.prompt.clone();
        thread::spawn(move || {
            let outcome = run(
                &child, stdin, stdout, stderr, stdin_log, stdout_log, stderr_log, prompt,
            );
            emitter.emit(RuntimeEvent::Finished {
                timestamp: Utc::now(),
            });
            finished.store(true, Ordering::SeqCst);
            if done_tx.send(outcome).is_err() {
                debug!("codex instance dropped before its outcome was read");
            }
        });

        Ok(CodexInstance {
            events: Some(event_rx),
            done: done_rx,
        })
    }
}

impl RuntimeInstance for CodexInstance {
    fn take_events(&mut self) -> Option<Receiver<RuntimeEvent>> {
        self.events.take()
    }

    fn wait(self: Box<Self>, cancel: &CancelToken) -> Result<RuntimeResult> {
        loop {
            match self.done.recv_timeout(WAIT_POLL_INTERVAL) {
                Ok(outcome) => return outcome,
                Err(RecvTimeoutError::Timeout) => cancel.check()?,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(MusterError::Runtime {
                        message: "codex run loop ended without reporting an outcome".into(),
                        exit_code: None,
                    });
                }
            }
        }
    }
}

/// Render the full codex argv for one execution.
fn build_args(config: &CodexConfig, input: &ExecutionInput) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    args.extend(config.args());

    if let Some(model) = &input.model
        && !model.trim().is_empty()
    {
        args.push("--model".to_string());
        args.push(model.trim().to_string());
    }

    args.push("--json".to_string());

    // The trailing "-" asks codex to read the prompt from stdin.
    match &input.conversation_id {
        Some(conversation) => {
            args.push("resume".to_string());
            args.push(conversation.0.clone());
            args.push("-".to_string());
        }
        None => args.push("-".to_string()),
    }

    args
}

fn session_log_dir(log_root: &Path, id: &ExecutionId) -> PathBuf {
    let timestamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    log_root.join("codex").join(id.as_str()).join(timestamp)
}

fn create_log(session_dir: &Path, name: &str) -> Result<File> {
    File::create(session_dir.join(name))
        .map_err(|e| MusterError::io(format!("create session log '{}'", name), e))
}

fn take_pipe<T>(pipe: Option<T>, name: &str) -> Result<T> {
    pipe.ok_or_else(|| MusterError::Runtime {
        message: format!("codex {} pipe missing", name),
        exit_code: None,
    })
}

fn spawn_watchdog(child: Arc<Mutex<Child>>, finished: Arc<AtomicBool>, cancel: CancelToken) {
    thread::spawn(move || {
        loop {
            if finished.load(Ordering::SeqCst) {
                break;
            }
            if cancel.is_cancelled() {
                if let Ok(mut guard) = child.lock() {
                    debug!("cancellation observed, killing codex subprocess");
                    let _ = guard.kill();
                }
                break;
            }
            thread::sleep(WATCHDOG_INTERVAL);
        }
    });
}

/// The run loop body. Feeds the prompt, decodes the event stream, and
/// folds the child's exit status and captured stderr into one outcome.
#[allow(clippy::too_many_arguments)]
fn run(
    child: &Arc<Mutex<Child>>,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: ChildStderr,
    stdin_log: File,
    mut stdout_log: File,
    stderr_log: File,
    prompt: String,
) -> Result<RuntimeResult> {
    let stdin_thread = thread::spawn(move || {
        let mut stdin = stdin;
        let mut log = stdin_log;
        let _ = log.write_all(prompt.as_bytes());
        // The child may exit before reading its prompt; a broken pipe
        // here is not the run's outcome.
        if let Err(e) = stdin.write_all(prompt.as_bytes()) {
            debug!(error = %e, "write prompt to codex stdin");
        }
        // Dropping stdin closes the pipe and signals end of input.
    });

    let stderr_thread = thread::spawn(move || collect_stderr(stderr, stderr_log));

    let mut reader = BufReader::new(stdout);
    let mut collected = CollectedOutput::default();
    let mut protocol_error: Option<String> = None;
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = match reader.read_until(b'\n', &mut line) {
            Ok(n) => n,
            Err(e) => {
                protocol_error = Some(format!("read codex output: {}", e));
                break;
            }
        };
        if n == 0 {
            break;
        }
        let _ = stdout_log.write_all(&line);

        let text = line.trim_ascii();
        if text.is_empty() {
            continue;
        }
        match serde_json::from_slice::<CodexEvent>(text) {
            Ok(event) => collected.apply(event),
            Err(e) => {
                protocol_error = Some(format!("decode codex event: {}", e));
                break;
            }
        }
    }
    if protocol_error.is_some() {
        // Keep consuming so the child is never blocked on a full pipe.
        let _ = io::copy(&mut reader, &mut io::sink());
    }

    if stdin_thread.join().is_err() {
        debug!("codex stdin writer panicked");
    }
    let stderr_output = stderr_thread.join().unwrap_or_default();

    let status = wait_for_exit(child);

    // A broken event stream is the outcome regardless of how the child
    // exited afterwards.
    if let Some(message) = protocol_error {
        return Err(MusterError::Protocol(message));
    }
    let status = status?;

    if !status.success() {
        let stderr_text = String::from_utf8_lossy(&stderr_output).trim().to_string();
        let message = if stderr_text.is_empty() {
            format!("codex exited with {}", status)
        } else {
            stderr_text
        };
        return Err(MusterError::Runtime {
            message,
            exit_code: status.code(),
        });
    }

    Ok(RuntimeResult {
        conversation_id: collected.conversation_id,
        response: collected.response,
    })
}

fn collect_stderr(mut stderr: ChildStderr, mut log: File) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let _ = log.write_all(&buf[..n]);
                captured.extend_from_slice(&buf[..n]);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    captured
}

fn wait_for_exit(child: &Arc<Mutex<Child>>) -> Result<ExitStatus> {
    loop {
        let polled = {
            let mut guard = child.lock().map_err(|_| MusterError::Runtime {
                message: "codex child handle poisoned".into(),
                exit_code: None,
            })?;
            guard
                .try_wait()
                .map_err(|e| MusterError::io("wait for codex", e))?
        };
        if let Some(status) = polled {
            return Ok(status);
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

/// What the event stream yields: the session identifier from
/// `thread.started` and the last `agent_message` item text.
#[derive(Debug, Default)]
struct CollectedOutput {
    conversation_id: Option<ConversationId>,
    response: String,
}

impl CollectedOutput {
    fn apply(&mut self, event: CodexEvent) {
        match event.kind.as_str() {
            "thread.started" => {
                if !event.thread_id.is_empty() {
                    self.conversation_id = Some(ConversationId(event.thread_id));
                }
            }
            "item.completed" => {
                // Later agent messages supersede earlier ones.
                if event.item.kind == "agent_message" {
                    self.response = event.item.text;
                }
            }
            _ => {}
        }
    }
}

/// Wire shape of one codex NDJSON event. Unknown event and item types
/// decode fine and are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CodexEvent {
    #[serde(rename = "type")]
    kind: String,
    thread_id: String,
    item: CodexItem,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CodexItem {
    #[serde(rename = "type")]
    kind: String,
    text: String,
}

#[derive(Clone)]
struct EventEmitter {
    tx: SyncSender<RuntimeEvent>,
}

impl EventEmitter {
    fn emit(&self, event: RuntimeEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(kind = event.kind(), "dropping runtime event, consumer is behind");
            }
            // Nobody took the receiver or it was dropped.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-codex");
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn input(prompt: &str) -> ExecutionInput {
        ExecutionInput {
            prompt: prompt.to_string(),
            model: None,
            conversation_id: None,
            working_directory: None,
        }
    }

    fn spawn_script(
        cancel: &CancelToken,
        script: &Path,
        logs: &Path,
        id: &ExecutionId,
        input: &ExecutionInput,
    ) -> CodexInstance {
        CodexInstance::spawn(cancel, script, id, logs, &CodexConfig::default(), input).unwrap()
    }

    #[test]
    fn successful_run_collects_session_and_last_agent_message() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            concat!(
                "#!/bin/sh\n",
                "cat > /dev/null\n",
                "echo '{\"type\":\"thread.started\",\"thread_id\":\"conv-42\"}'\n",
                "echo '{\"type\":\"turn.started\"}'\n",
                "echo '{\"type\":\"item.completed\",\"item\":{\"type\":\"reasoning\",\"text\":\"thinking\"}}'\n",
                "echo '{\"type\":\"item.completed\",\"item\":{\"type\":\"agent_message\",\"text\":\"first\"}}'\n",
                "echo '{\"type\":\"item.completed\",\"item\":{\"type\":\"agent_message\",\"text\":\"final answer\"}}'\n",
            ),
        );
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let instance = spawn_script(&cancel, &script, temp.path(), &id, &input("hello"));
        let result = Box::new(instance).wait(&cancel).unwrap();

        assert_eq!(result.conversation_id, Some(ConversationId("conv-42".into())));
        assert_eq!(result.response, "final answer");
    }

    #[test]
    fn events_arrive_started_then_finished() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "#!/bin/sh\ncat > /dev/null\n");
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let mut instance = spawn_script(&cancel, &script, temp.path(), &id, &input("hello"));
        let events = instance.take_events().unwrap();
        assert!(instance.take_events().is_none());

        Box::new(instance).wait(&cancel).unwrap();

        let received: Vec<&'static str> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(received, vec!["started", "finished"]);
    }

    #[test]
    fn nonzero_exit_reports_trimmed_stderr_and_code() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            "#!/bin/sh\ncat > /dev/null\necho 'boom' >&2\nexit 2\n",
        );
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let instance = spawn_script(&cancel, &script, temp.path(), &id, &input("hello"));
        let err = Box::new(instance).wait(&cancel).unwrap_err();

        match err {
            MusterError::Runtime { message, exit_code } => {
                assert_eq!(message, "boom");
                assert_eq!(exit_code, Some(2));
            }
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }

    #[test]
    fn nonzero_exit_without_stderr_reports_exit_status() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "#!/bin/sh\ncat > /dev/null\nexit 3\n");
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let instance = spawn_script(&cancel, &script, temp.path(), &id, &input("hello"));
        let err = Box::new(instance).wait(&cancel).unwrap_err();

        match err {
            MusterError::Runtime { message, exit_code } => {
                assert!(message.contains("exited"), "message was '{}'", message);
                assert_eq!(exit_code, Some(3));
            }
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_event_stream_is_a_protocol_error() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            "#!/bin/sh\ncat > /dev/null\necho 'not json'\necho 'more noise'\n",
        );
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let instance = spawn_script(&cancel, &script, temp.path(), &id, &input("hello"));
        let err = Box::new(instance).wait(&cancel).unwrap_err();

        assert!(matches!(err, MusterError::Protocol(_)), "got {:?}", err);
    }

    #[test]
    fn empty_event_stream_yields_empty_result() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "#!/bin/sh\ncat > /dev/null\n");
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let instance = spawn_script(&cancel, &script, temp.path(), &id, &input("hello"));
        let result = Box::new(instance).wait(&cancel).unwrap();

        assert_eq!(result.conversation_id, None);
        assert_eq!(result.response, "");
    }

    #[test]
    fn raw_streams_are_teed_to_session_logs() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            concat!(
                "#!/bin/sh\n",
                "cat > /dev/null\n",
                "echo '{\"type\":\"turn.started\"}'\n",
                "echo 'note' >&2\n",
            ),
        );
        let logs = temp.path().join("logs");
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let instance = spawn_script(&cancel, &script, &logs, &id, &input("hello"));
        Box::new(instance).wait(&cancel).unwrap();

        let execution_dir = logs.join("codex").join(id.as_str());
        let session_dir = fs::read_dir(&execution_dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();

        let stdin = fs::read_to_string(session_dir.join("stdin.log")).unwrap();
        let stdout = fs::read_to_string(session_dir.join("stdout.log")).unwrap();
        let stderr = fs::read_to_string(session_dir.join("stderr.log")).unwrap();
        assert_eq!(stdin, "hello");
        assert!(stdout.contains("turn.started"));
        assert_eq!(stderr.trim(), "note");
    }

    #[test]
    fn cancelling_the_execute_token_kills_the_subprocess() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "#!/bin/sh\nsleep 5\n");
        let execute_cancel = CancelToken::new();
        let wait_cancel = CancelToken::new();
        let id = ExecutionId::generate();

        let instance = spawn_script(&execute_cancel, &script, temp.path(), &id, &input("hello"));
        execute_cancel.cancel();

        // The watchdog kills the child, so wait completes long before
        // the script's sleep would.
        let err = Box::new(instance).wait(&wait_cancel).unwrap_err();
        assert!(matches!(err, MusterError::Runtime { .. }), "got {:?}", err);
    }

    #[test]
    fn cancelling_the_wait_token_abandons_without_killing() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "#!/bin/sh\nsleep 2\n");
        let execute_cancel = CancelToken::new();
        let wait_cancel = CancelToken::new();
        wait_cancel.cancel();
        let id = ExecutionId::generate();

        let instance = spawn_script(&execute_cancel, &script, temp.path(), &id, &input("hello"));
        let err = Box::new(instance).wait(&wait_cancel).unwrap_err();
        assert!(matches!(err, MusterError::Cancelled));

        // Reap the abandoned child.
        execute_cancel.cancel();
    }

    #[test]
    fn args_for_a_fresh_session() {
        let config = CodexConfig::default();
        let args = build_args(&config, &input("hello"));
        assert_eq!(args, vec!["exec", "--json", "-"]);
    }

    #[test]
    fn args_with_model_resume_and_options() {
        let config = CodexConfig {
            require_workspace_repository: false,
            enable_web_search: None,
            enable_network_access: Some(true),
        };
        let request = ExecutionInput {
            prompt: "hello".into(),
            model: Some("gpt-5-codex".into()),
            conversation_id: Some(ConversationId("conv-9".into())),
            working_directory: None,
        };

        let args = build_args(&config, &request);

        assert_eq!(
            args,
            vec![
                "exec",
                "--skip-git-repo-check",
                "--config",
                "sandbox_workspace_write.network_access=true",
                "--model",
                "gpt-5-codex",
                "--json",
                "resume",
                "conv-9",
                "-",
            ]
        );
    }

    #[test]
    fn model_is_trimmed_before_forwarding() {
        let request = ExecutionInput {
            prompt: "hello".into(),
            model: Some("  gpt-5-codex  ".into()),
            conversation_id: None,
            working_directory: None,
        };
        let args = build_args(&CodexConfig::default(), &request);
        assert_eq!(args, vec!["exec", "--model", "gpt-5-codex", "--json", "-"]);
    }

    #[test]
    fn blank_working_directory_falls_back_to_current_dir() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "#!/bin/sh\ncat > /dev/null\n");
        let cancel = CancelToken::new();
        let id = ExecutionId::generate();
        let request = ExecutionInput {
            prompt: "hello".into(),
            model: None,
            conversation_id: None,
            working_directory: Some("   ".into()),
        };

        let instance = spawn_script(&cancel, &script, temp.path(), &id, &request);
        let result = Box::new(instance).wait(&cancel).unwrap();
        assert_eq!(result.response, "");
    }

    #[test]
    fn blank_model_is_not_forwarded() {
        let request = ExecutionInput {
            prompt: "hello".into(),
            model: Some("   ".into()),
            conversation_id: None,
            working_directory: None,
        };
        let args = build_args(&CodexConfig::default(), &request);
        assert!(!args.iter().any(|a| a == "--model"));
    }
}
