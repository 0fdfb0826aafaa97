//! Snapshot persistence.
//!
//! A snapshot is the full (items, borrowers) state plus both identity
//! generators. On disk it is a JSONL file of tagged records:
//!
//! ```text
//! {"record":"header","format":"lendkeep-ledger","version":1,...}
//! {"record":"item","id":1,"title":"Dune",...}
//! {"record":"borrower","id":1,"name":"Ada","held":[1],...}
//! {"record":"footer","items":1,"borrowers":1,"sha256":"..."}
//! ```
//!
//! The footer carries the record counts and a SHA-256 over every byte
//! before it, so a truncated or hand-edited file is detected on load.
//! Records are separate types from the in-memory model and are converted
//! through the model's validating constructors.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::borrower_store::BorrowerStore;
use crate::error::{LendError, Result};
use crate::item_store::ItemStore;
use crate::model::{Borrower, BorrowerDraft, BorrowerId, Item, ItemDraft, ItemId};

/// Value of the header's `format` field.
pub const FORMAT_NAME: &str = "lendkeep-ledger";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

// ============================================================================
// Snapshot
// ============================================================================

/// The complete persisted state at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub items: Vec<Item>,
    pub borrowers: Vec<Borrower>,
    pub next_item_id: u64,
    pub next_borrower_id: u64,
}

impl Snapshot {
    /// The first-run snapshot.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            borrowers: Vec::new(),
            next_item_id: 1,
            next_borrower_id: 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.borrowers.is_empty()
    }

    /// Copy the current contents of both stores.
    #[must_use]
    pub fn capture(items: &ItemStore, borrowers: &BorrowerStore) -> Self {
        Self {
            items: items.iter().cloned().collect(),
            borrowers: borrowers.iter().cloned().collect(),
            next_item_id: items.next_id(),
            next_borrower_id: borrowers.next_id(),
        }
    }

    /// Rebuild both stores.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if an ID repeats within a store.
    pub fn into_stores(self) -> Result<(ItemStore, BorrowerStore)> {
        let items = ItemStore::from_items(self.items, self.next_item_id)?;
        let borrowers = BorrowerStore::from_borrowers(self.borrowers, self.next_borrower_id)?;
        Ok((items, borrowers))
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// On-disk records
// ============================================================================

/// Header line metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub format: String,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub next_item_id: u64,
    pub next_borrower_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    id: u64,
    title: String,
    author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    catalog_code: Option<String>,
    total_copies: u32,
    available_copies: u32,
    added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BorrowerRecord {
    id: u64,
    name: String,
    #[serde(default)]
    contact: String,
    #[serde(default)]
    held: Vec<u64>,
    registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FooterRecord {
    items: usize,
    borrowers: usize,
    sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Header(SnapshotHeader),
    Item(ItemRecord),
    Borrower(BorrowerRecord),
    Footer(FooterRecord),
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id().value(),
            title: item.title().to_string(),
            author: item.author().to_string(),
            publisher: item.publisher().map(str::to_string),
            catalog_code: item.catalog_code().map(str::to_string),
            total_copies: item.total_copies(),
            available_copies: item.available_copies(),
            added_at: item.added_at(),
        }
    }
}

impl TryFrom<ItemRecord> for Item {
    type Error = LendError;

    fn try_from(record: ItemRecord) -> Result<Self> {
        let draft = ItemDraft {
            title: record.title,
            author: record.author,
            publisher: record.publisher,
            catalog_code: record.catalog_code,
            copies: record.total_copies,
        };
        Self::with_available(
            ItemId(record.id),
            draft,
            record.available_copies,
            record.added_at,
        )
    }
}

impl From<&Borrower> for BorrowerRecord {
    fn from(borrower: &Borrower) -> Self {
        Self {
            id: borrower.id().value(),
            name: borrower.name().to_string(),
            contact: borrower.contact().to_string(),
            held: borrower.held().iter().map(|id| id.value()).collect(),
            registered_at: borrower.registered_at(),
        }
    }
}

impl TryFrom<BorrowerRecord> for Borrower {
    type Error = LendError;

    fn try_from(record: BorrowerRecord) -> Result<Self> {
        let mut held = BTreeSet::new();
        for raw in &record.held {
            if !held.insert(ItemId(*raw)) {
                return Err(LendError::validation(
                    "held",
                    format!("item {} listed twice", ItemId(*raw)),
                ));
            }
        }
        Self::with_held(
            BorrowerId(record.id),
            BorrowerDraft::new(record.name, record.contact),
            held,
            record.registered_at,
        )
    }
}

// ============================================================================
// Codec
// ============================================================================

fn push_line(out: &mut String, record: &Record) -> Result<()> {
    out.push_str(&serde_json::to_string(record)?);
    out.push('\n');
    Ok(())
}

fn checksum(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Encode a snapshot as JSONL text.
///
/// # Errors
///
/// Returns `Json` if a record cannot be serialized.
pub fn encode(snapshot: &Snapshot, saved_at: DateTime<Utc>) -> Result<String> {
    let mut body = String::new();
    push_line(
        &mut body,
        &Record::Header(SnapshotHeader {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
            saved_at,
            next_item_id: snapshot.next_item_id,
            next_borrower_id: snapshot.next_borrower_id,
        }),
    )?;
    for item in &snapshot.items {
        push_line(&mut body, &Record::Item(item.into()))?;
    }
    for borrower in &snapshot.borrowers {
        push_line(&mut body, &Record::Borrower(borrower.into()))?;
    }

    let footer = Record::Footer(FooterRecord {
        items: snapshot.items.len(),
        borrowers: snapshot.borrowers.len(),
        sha256: checksum(&body),
    });
    push_line(&mut body, &footer)?;
    Ok(body)
}

/// Decode JSONL text, returning the header alongside the snapshot.
///
/// `origin` is only used to label errors.
///
/// # Errors
///
/// Returns `CorruptSnapshot` for any structural, checksum, or validation
/// problem.
pub fn decode_with_header(text: &str, origin: &Path) -> Result<(SnapshotHeader, Snapshot)> {
    let corrupt = |reason: String| LendError::corrupt(origin, reason);

    let mut header: Option<SnapshotHeader> = None;
    let mut footer: Option<(FooterRecord, usize)> = None;
    let mut items = Vec::new();
    let mut borrowers = Vec::new();
    let mut offset = 0usize;

    for (line_num, raw) in text.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw.len();

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if footer.is_some() {
            return Err(corrupt(format!(
                "unexpected data after footer at line {}",
                line_num + 1
            )));
        }

        let record: Record = serde_json::from_str(trimmed)
            .map_err(|e| corrupt(format!("line {}: {e}", line_num + 1)))?;

        match record {
            Record::Header(h) => {
                if header.is_some() || !items.is_empty() || !borrowers.is_empty() {
                    return Err(corrupt(format!(
                        "header out of place at line {}",
                        line_num + 1
                    )));
                }
                if h.format != FORMAT_NAME {
                    return Err(corrupt(format!("unknown format '{}'", h.format)));
                }
                if h.version != FORMAT_VERSION {
                    return Err(corrupt(format!(
                        "unsupported format version {} (expected {FORMAT_VERSION})",
                        h.version
                    )));
                }
                header = Some(h);
            }
            _ if header.is_none() => {
                return Err(corrupt("missing header record".to_string()));
            }
            Record::Item(record) => {
                let id = record.id;
                let item = Item::try_from(record)
                    .map_err(|e| corrupt(format!("item {id} at line {}: {e}", line_num + 1)))?;
                items.push(item);
            }
            Record::Borrower(record) => {
                let id = record.id;
                let borrower = Borrower::try_from(record).map_err(|e| {
                    corrupt(format!("borrower {id} at line {}: {e}", line_num + 1))
                })?;
                borrowers.push(borrower);
            }
            Record::Footer(f) => footer = Some((f, line_start)),
        }
    }

    let header = header.ok_or_else(|| corrupt("empty snapshot (no header record)".to_string()))?;
    let (footer, body_len) =
        footer.ok_or_else(|| corrupt("missing footer record (truncated write?)".to_string()))?;

    if footer.items != items.len() || footer.borrowers != borrowers.len() {
        return Err(corrupt(format!(
            "record count mismatch: footer says {} items / {} borrowers, found {} / {}",
            footer.items,
            footer.borrowers,
            items.len(),
            borrowers.len()
        )));
    }
    let actual = checksum(&text[..body_len]);
    if actual != footer.sha256 {
        return Err(corrupt("checksum mismatch".to_string()));
    }

    let snapshot = Snapshot {
        items,
        borrowers,
        next_item_id: header.next_item_id,
        next_borrower_id: header.next_borrower_id,
    };
    Ok((header, snapshot))
}

/// Decode JSONL text into a snapshot.
///
/// # Errors
///
/// See [`decode_with_header`].
pub fn decode(text: &str, origin: &Path) -> Result<Snapshot> {
    decode_with_header(text, origin).map(|(_, snapshot)| snapshot)
}

// ============================================================================
// Gateways
// ============================================================================

/// Durable storage for whole snapshots.
pub trait PersistenceGateway {
    /// Load the most recent snapshot.
    ///
    /// Returns `Snapshot::empty()` if nothing has ever been saved.
    ///
    /// # Errors
    ///
    /// Returns `CorruptSnapshot` if a snapshot exists but cannot be read.
    fn load(&self) -> Result<Snapshot>;

    /// Replace the stored snapshot. Either fully succeeds or leaves the
    /// previous snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the write does not complete.
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Whether a snapshot has been written at this location.
    fn exists(&self) -> bool;

    /// Delete the stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the snapshot cannot be removed.
    fn clear(&mut self) -> Result<()>;

    /// Human-readable location for logs and reports.
    fn location(&self) -> String;
}

/// File-backed gateway writing a single JSONL snapshot.
#[derive(Debug, Clone)]
pub struct JsonlGateway {
    path: PathBuf,
}

impl JsonlGateway {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Staging file used during `save`. A leftover one means a save was
    /// interrupted before the rename.
    #[must_use]
    pub fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("jsonl.tmp")
    }

    fn write_atomic(&self, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        if let Err(e) = sync_parent_dir(&self.path) {
            // The new snapshot is already in place; only its durability is in doubt.
            tracing::warn!(path = %self.path.display(), error = %e, "directory sync after rename failed");
        }
        Ok(())
    }
}

/// Flush the directory entry so a completed rename survives power loss.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl PersistenceGateway for JsonlGateway {
    fn load(&self) -> Result<Snapshot> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no snapshot found, starting fresh");
                return Ok(Snapshot::empty());
            }
            Err(e) => return Err(LendError::corrupt(&self.path, format!("unreadable: {e}"))),
        };

        let snapshot = decode(&text, &self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            items = snapshot.items.len(),
            borrowers = snapshot.borrowers.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let contents = encode(snapshot, Utc::now())
            .map_err(|e| LendError::persistence(format!("encode failed: {e}"), None))?;

        if let Err(e) = self.write_atomic(&contents) {
            let _ = fs::remove_file(self.tmp_path());
            return Err(LendError::persistence(
                format!("write to {} failed", self.path.display()),
                Some(e),
            ));
        }

        tracing::debug!(
            path = %self.path.display(),
            items = snapshot.items.len(),
            borrowers = snapshot.borrowers.len(),
            "saved snapshot"
        );
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LendError::persistence(
                format!("cannot remove {}", self.path.display()),
                Some(e),
            )),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process gateway holding the encoded snapshot text.
///
/// Goes through the same codec as the file gateway. `fail_next_save`
/// makes the next `save` return `PersistenceFailure` without touching the
/// stored text.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    stored: Option<String>,
    fail_next_save: bool,
    saves: usize,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrange for the next `save` to fail.
    pub fn fail_next_save(&mut self) {
        self.fail_next_save = true;
    }

    /// Number of successful saves.
    #[must_use]
    pub const fn saves(&self) -> usize {
        self.saves
    }

    /// The stored snapshot text, if any.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.stored.as_deref()
    }

    /// Replace the stored text directly (for corruption tests).
    pub fn set_raw(&mut self, text: impl Into<String>) {
        self.stored = Some(text.into());
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self) -> Result<Snapshot> {
        self.stored.as_deref().map_or_else(
            || Ok(Snapshot::empty()),
            |text| decode(text, Path::new("<memory>")),
        )
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        if std::mem::take(&mut self.fail_next_save) {
            return Err(LendError::persistence("injected save failure", None));
        }
        self.stored = Some(encode(snapshot, Utc::now())?);
        self.saves += 1;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.stored.is_some()
    }

    fn clear(&mut self) -> Result<()> {
        self.stored = None;
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
