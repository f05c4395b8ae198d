//! Python worker runtime
//!
//! One `python -u -c WORKER` child per session, speaking JSON lines:
//!
//! ```text
//! -> {"type":"init","module":"genesis","alias":"gs"}   <- {"type":"ready","engine":true,"error":null}
//! -> {"type":"exec","code":"...","capture":true}        <- {"type":"result","ok":true,"stdout":"...",...}
//! ```
//!
//! The worker keeps its protocol channel on a private duplicate of fd 1 and
//! points fd 1 at stderr, so native code printing to stdout cannot corrupt
//! the stream. Worker stderr is forwarded to `tracing` at debug level.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::runtime::{RawExecution, RuntimeInfo, SimulationRuntime};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

const WORKER_SCRIPT: &str = r#"
import importlib, io, json, os, sys, traceback, types

_proto = os.fdopen(os.dup(1), "w", buffering=1, encoding="utf-8")
os.dup2(2, 1)
_stderr = sys.__stderr__


class _Router(io.TextIOBase):
    capture = None

    def writable(self):
        return True

    def write(self, s):
        if self.capture is not None:
            self.capture.write(s)
        else:
            _stderr.write(s)
        return len(s)

    def flush(self):
        _stderr.flush()


_router = _Router()
sys.stdout = _router
sys.stderr = _router
ns = {"__name__": "__main__"}
_skip = (types.ModuleType, types.FunctionType, types.BuiltinFunctionType, type)


def _send(msg):
    _proto.write(json.dumps(msg) + "\n")
    _proto.flush()


def _bindings():
    out = {}
    for k, v in ns.items():
        if k.startswith("_") or isinstance(v, _skip):
            continue
        out[k] = type(v).__name__
    return out


for _line in sys.stdin:
    _line = _line.strip()
    if not _line:
        continue
    _msg = json.loads(_line)
    _kind = _msg.get("type")
    if _kind == "init":
        try:
            ns[_msg["alias"]] = importlib.import_module(_msg["module"])
            _send({"type": "ready", "engine": True, "error": None})
        except BaseException as e:
            _send({"type": "ready", "engine": False, "error": f"{type(e).__name__}: {e}"})
    elif _kind == "exec":
        _buf = io.StringIO()
        _router.capture = _buf if _msg.get("capture", True) else None
        _reply = {"type": "result", "ok": True}
        try:
            exec(compile(_msg["code"], "<fragment>", "exec"), ns, ns)
        except BaseException as e:
            _reply.update(
                ok=False,
                error=str(e),
                error_type=type(e).__name__,
                traceback=traceback.format_exc(),
            )
        finally:
            _router.capture = None
        _reply["stdout"] = _buf.getvalue()
        _reply["bindings"] = _bindings()
        _send(_reply)
"#;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WorkerReply {
    Ready { engine: bool, error: Option<String> },
    Result(RawExecution),
}

#[derive(Debug)]
struct Worker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Worker {
    async fn start(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let parts = shlex::split(&config.python)
            .filter(|parts| !parts.is_empty())
            .unwrap_or_else(|| vec![config.python.clone()]);
        let mut command = Command::new(&parts[0]);
        command
            .args(parts.iter().skip(1))
            .arg("-u")
            .arg("-c")
            .arg(WORKER_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| RuntimeError::Spawn {
            command: config.python.clone(),
            message: e.to_string(),
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RuntimeError::Protocol("failed to capture worker stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::Protocol("failed to capture worker stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "genesis_mcp::worker", "{}", line);
                }
            });
        }

        let mut worker = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        worker
            .send(&json!({"type": "init", "module": config.module, "alias": config.alias}))
            .await?;
        match worker.read().await? {
            WorkerReply::Ready { engine: true, .. } => {
                tracing::info!(module = %config.module, alias = %config.alias, "python worker ready");
            }
            WorkerReply::Ready { engine: false, error } => {
                // fragments will fail with NameError on the alias; the session stays usable
                tracing::warn!(
                    module = %config.module,
                    error = error.as_deref().unwrap_or("unknown"),
                    "engine module failed to import"
                );
            }
            other => {
                return Err(RuntimeError::Protocol(format!(
                    "expected ready, got {:?}",
                    other
                )))
            }
        }
        Ok(worker)
    }

    async fn send(&mut self, value: &serde_json::Value) -> Result<(), RuntimeError> {
        let mut line = serde_json::to_vec(value)
            .map_err(|e| RuntimeError::Protocol(e.to_string()))?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<WorkerReply, RuntimeError> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await?;
        if read == 0 {
            return Err(RuntimeError::WorkerExited);
        }
        serde_json::from_str(line.trim()).map_err(|e| {
            RuntimeError::Protocol(format!("invalid worker message: {}; raw={}", e, line.trim()))
        })
    }

    async fn exec(&mut self, code: &str, capture: bool) -> Result<RawExecution, RuntimeError> {
        self.send(&json!({"type": "exec", "code": code, "capture": capture}))
            .await?;
        match self.read().await? {
            WorkerReply::Result(raw) => Ok(raw),
            other => Err(RuntimeError::Protocol(format!(
                "expected result, got {:?}",
                other
            ))),
        }
    }

    async fn shutdown(&mut self) {
        let _ = self.stdin.shutdown().await;
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.child.start_kill().ok();
    }
}

/// Live Python interpreter holding the session namespace
pub struct PythonRuntime {
    config: RuntimeConfig,
    worker: Option<Worker>,
}

impl PythonRuntime {
    pub async fn start(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let worker = Worker::start(&config).await?;
        Ok(Self {
            config,
            worker: Some(worker),
        })
    }
}

#[async_trait]
impl SimulationRuntime for PythonRuntime {
    async fn execute(&mut self, code: &str, capture: bool) -> Result<RawExecution, RuntimeError> {
        if self.worker.is_none() {
            tracing::warn!("python worker is gone; starting a fresh interpreter");
            self.worker = Some(Worker::start(&self.config).await?);
        }
        let Some(worker) = self.worker.as_mut() else {
            return Err(RuntimeError::WorkerExited);
        };

        let result = worker.exec(code, capture).await;

        if matches!(result, Err(RuntimeError::WorkerExited) | Err(RuntimeError::Io(_))) {
            self.worker = None;
        }
        result
    }

    async fn reset(&mut self) -> Result<(), RuntimeError> {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown().await;
        }
        self.worker = Some(Worker::start(&self.config).await?);
        tracing::info!("python worker restarted");
        Ok(())
    }

    fn describe(&self) -> RuntimeInfo {
        RuntimeInfo {
            kind: "python",
            command: self.config.python.clone(),
            module: self.config.module.clone(),
            alias: self.config.alias.clone(),
        }
    }
}
