use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::debug;

use crate::error::SessionError;
use crate::types::{EventSet, Metadata, INTERACTION_CATEGORY, NETWORK_CATEGORY};

/// Version written into every exported envelope.
pub const SESSION_VERSION: u32 = 1;

/// Type tag written into every exported envelope.
pub const SESSION_TYPE: &str = "SESSION";

/// Extension of exported session files.
pub const SESSION_FILE_EXTENSION: &str = "json";

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    #[serde(rename = "type")]
    kind: &'static str,
    data: EnvelopeData<'a>,
}

#[derive(Serialize)]
struct EnvelopeData<'a> {
    events: &'a EventSet,
    metadata: &'a Metadata,
}

/// The serialized session envelope, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedSession(String);

impl SerializedSession {
    pub(crate) fn from_text(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Re-indent with four spaces.
    pub fn prettify(&self) -> Result<SerializedSession, SessionError> {
        prettify(&self.0).map(SerializedSession)
    }

    /// Persist to `{target_dir}/{name}.json`.
    pub fn write(&self, name: &str, target_dir: &Path) -> Result<PathBuf, SessionError> {
        write_session_file(name, target_dir, &self.0)
    }
}

/// Builds the export envelope for one session.
///
/// Metadata is attached as-is. Event categories may be dropped whole, but
/// individual events are never touched.
#[derive(Debug, Default)]
pub struct SessionAssembler {
    metadata: Option<Metadata>,
    events: Option<EventSet>,
    prepared: Option<SerializedSession>,
}

impl SessionAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = Some(metadata);
    }

    pub fn set_events(&mut self, events: EventSet) {
        self.events = Some(events);
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn events(&self) -> Option<&EventSet> {
        self.events.as_ref()
    }

    /// Drop a category from the held events. No-op when it is absent.
    pub fn unset_category(&mut self, name: &str) -> bool {
        let removed = self
            .events
            .as_mut()
            .and_then(|events| events.remove(name))
            .is_some();
        if removed {
            debug!(category = name, "category removed");
        }
        removed
    }

    pub fn unset_interaction_data(&mut self) -> bool {
        self.unset_category(INTERACTION_CATEGORY)
    }

    pub fn unset_network_data(&mut self) -> bool {
        self.unset_category(NETWORK_CATEGORY)
    }

    /// Serialize `{version, type, data: {events, metadata}}` compactly.
    ///
    /// Call after all category removals; the result is also held for
    /// [`SessionAssembler::write`].
    pub fn prepare_envelope(&mut self) -> Result<SerializedSession, SessionError> {
        let events = self
            .events
            .as_ref()
            .ok_or(SessionError::State("events must be set before preparing the envelope"))?;
        let metadata = self
            .metadata
            .as_ref()
            .ok_or(SessionError::State("metadata must be set before preparing the envelope"))?;

        let envelope = Envelope {
            version: SESSION_VERSION,
            kind: SESSION_TYPE,
            data: EnvelopeData { events, metadata },
        };
        let text = serde_json::to_string(&envelope).map_err(SessionError::Serialize)?;

        let prepared = SerializedSession(text);
        self.prepared = Some(prepared.clone());
        Ok(prepared)
    }

    /// Pretty-print the prepared envelope in place.
    pub fn prettify(&mut self) -> Result<&SerializedSession, SessionError> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or(SessionError::State("prepare_envelope must be called before prettify"))?;
        let pretty = prepared.prettify()?;
        Ok(self.prepared.insert(pretty))
    }

    pub fn prepared(&self) -> Option<&SerializedSession> {
        self.prepared.as_ref()
    }

    /// Write the prepared envelope to `{target_dir}/{name}.json`.
    ///
    /// Fails with [`SessionError::State`] before touching the filesystem if
    /// no envelope has been prepared.
    pub fn write(&self, name: &str, target_dir: &Path) -> Result<PathBuf, SessionError> {
        let prepared = self.prepared.as_ref().ok_or(SessionError::State(
            "Session content is empty, prepare_envelope must be called before write",
        ))?;
        prepared.write(name, target_dir)
    }
}

/// Reformat JSON text with four-space indentation.
pub fn prettify(text: &str) -> Result<String, SessionError> {
    let value: Value = serde_json::from_str(text).map_err(SessionError::Format)?;

    let mut buf = Vec::with_capacity(text.len() * 2);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(SessionError::Serialize)?;

    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Path an exported session named `name` is written to.
pub fn session_file_path(name: &str, target_dir: &Path) -> PathBuf {
    target_dir.join(format!("{}.{}", name, SESSION_FILE_EXTENSION))
}

/// Write `content` to `{target_dir}/{name}.json`, creating the directory.
///
/// Content goes to a uniquely named temporary file in `target_dir` that is
/// then renamed over the final path, so a failure never leaves a truncated
/// session file behind and concurrent writers never share a temporary file.
pub fn write_session_file(
    name: &str,
    target_dir: &Path,
    content: &str,
) -> Result<PathBuf, SessionError> {
    let path = session_file_path(name, target_dir);

    fs::create_dir_all(target_dir).map_err(|e| SessionError::io(target_dir, e))?;

    let prefix = format!(".{}.", name);
    let mut partial = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".part")
        .tempfile_in(target_dir)
        .map_err(|e| SessionError::io(target_dir, e))?;

    partial
        .write_all(content.as_bytes())
        .and_then(|_| set_readable(partial.as_file()))
        .and_then(|_| partial.as_file().sync_all())
        .map_err(|e| SessionError::io(&path, e))?;
    // Dropping an unpersisted temporary file removes it
    partial
        .persist(&path)
        .map_err(|e| SessionError::io(&path, e.error))?;

    debug!(path = %path.display(), bytes = content.len(), "session written");
    Ok(path)
}

/// Temporary files are created owner-only; exported sessions are not.
#[cfg(unix)]
fn set_readable(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_readable(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}
