use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::paths::{has_traversal_segment, is_safe_segment, sanitize_route};
use crate::store::{Entry, StoreLocation};

pub const DEFAULT_PASS_COMMAND: &str = "pass";
pub const NOTIFY_TITLE: &str = "Password Manager";

pub type RequestId = u64;

pub trait Clipboard {
    fn place_on_clipboard(&mut self, secret: &str);
}

pub trait Notifier {
    fn notify_user(&mut self, title: &str, message: &str);
}

pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRoute(String);

impl SecretRoute {
    pub fn new(location: &StoreLocation, entry: &Entry) -> Result<Self, RetrievalError> {
        let not_a_secret = || RetrievalError::NotASecret {
            name: entry.name.clone(),
        };
        if entry.is_dir || !is_safe_segment(&entry.name) {
            return Err(not_a_secret());
        }
        let route = sanitize_route(&format!("{}{}", location, entry.name));
        if route.is_empty() || has_traversal_segment(&route) {
            return Err(not_a_secret());
        }
        Ok(Self(route))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("{name} is not a secret")]
    NotASecret { name: String },
    #[error("failed to start {program}")]
    CommandUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("retrieval command failed ({status})")]
    CommandFailed { status: String, diagnostics: String },
    #[error("retrieval command produced no secret")]
    EmptySecret,
}

#[derive(Debug, Clone)]
pub struct SecretCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl SecretCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

impl Default for SecretCommand {
    fn default() -> Self {
        Self::new(DEFAULT_PASS_COMMAND)
    }
}

pub fn run_retrieval(
    command: &SecretCommand,
    store_root: &Path,
    route: &SecretRoute,
) -> Result<Secret, RetrievalError> {
    let output = Command::new(&command.program)
        .args(&command.args)
        .arg("show")
        .arg(route.as_str())
        .env("PASSWORD_STORE_DIR", store_root)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| RetrievalError::CommandUnavailable {
            program: command.program_name(),
            source,
        })?;

    let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() || !diagnostics.is_empty() {
        return Err(RetrievalError::CommandFailed {
            status: output.status.to_string(),
            diagnostics,
        });
    }

    // Only the first line is the password; `pass` stores metadata below it.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next().map(str::trim).unwrap_or_default();
    if first.is_empty() {
        return Err(RetrievalError::EmptySecret);
    }
    Ok(Secret(first.to_string()))
}

struct RetrievalResponse {
    request_id: RequestId,
    route: SecretRoute,
    result: Result<Secret, RetrievalError>,
}

#[derive(Debug)]
pub enum RetrievalOutcome {
    Copied {
        request_id: RequestId,
        route: SecretRoute,
    },
    Failed {
        request_id: RequestId,
        route: SecretRoute,
        error: RetrievalError,
    },
}

pub struct SecretRetriever {
    command: SecretCommand,
    store_root: PathBuf,
    response_tx: Sender<RetrievalResponse>,
    response_rx: Receiver<RetrievalResponse>,
    next_request_id: RequestId,
    in_flight: usize,
    alive: Arc<AtomicBool>,
}

impl SecretRetriever {
    pub fn new(command: SecretCommand, store_root: &Path) -> Self {
        let (response_tx, response_rx) = mpsc::channel();
        Self {
            command,
            store_root: store_root.to_path_buf(),
            response_tx,
            response_rx,
            next_request_id: 1,
            in_flight: 0,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn retrieve(
        &mut self,
        location: &StoreLocation,
        entry: &Entry,
    ) -> Result<RequestId, RetrievalError> {
        let route = SecretRoute::new(location, entry)?;
        Ok(self.retrieve_route(route))
    }

    pub fn retrieve_route(&mut self, route: SecretRoute) -> RequestId {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.saturating_add(1);
        self.in_flight = self.in_flight.saturating_add(1);
        tracing::debug!(request_id, route = %route, "retrieval started");

        let command = self.command.clone();
        let store_root = self.store_root.clone();
        let tx = self.response_tx.clone();
        let alive = Arc::clone(&self.alive);
        thread::spawn(move || {
            let result = run_retrieval(&command, &store_root, &route);
            if !alive.load(Ordering::Acquire) {
                return;
            }
            let _ = tx.send(RetrievalResponse {
                request_id,
                route,
                result,
            });
        });
        request_id
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn poll(
        &mut self,
        clipboard: &mut dyn Clipboard,
        notifier: &mut dyn Notifier,
    ) -> Vec<RetrievalOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(response) = self.response_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if !self.is_alive() {
                continue;
            }
            outcomes.push(deliver(response, clipboard, notifier));
        }
        outcomes
    }
}

impl Drop for SecretRetriever {
    fn drop(&mut self) {
        self.close();
    }
}

fn deliver(
    response: RetrievalResponse,
    clipboard: &mut dyn Clipboard,
    notifier: &mut dyn Notifier,
) -> RetrievalOutcome {
    let RetrievalResponse {
        request_id,
        route,
        result,
    } = response;
    match result {
        Ok(secret) => {
            clipboard.place_on_clipboard(secret.expose());
            tracing::debug!(request_id, route = %route, "password copied to clipboard");
            notifier.notify_user(
                NOTIFY_TITLE,
                &format!("Password for \"{route}\" copied to clipboard."),
            );
            RetrievalOutcome::Copied { request_id, route }
        }
        Err(error) => {
            match &error {
                RetrievalError::CommandFailed {
                    status,
                    diagnostics,
                } => tracing::debug!(
                    request_id,
                    route = %route,
                    %status,
                    %diagnostics,
                    "failed to get password"
                ),
                other => tracing::debug!(request_id, route = %route, "failed to get password: {other}"),
            }
            notifier.notify_user(
                NOTIFY_TITLE,
                &format!("Failed to copy password for \"{route}\"."),
            );
            RetrievalOutcome::Failed {
                request_id,
                route,
                error,
            }
        }
    }
}
