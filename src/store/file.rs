//! File-backed [`TokenStore`] for native hosts that keep the session across restarts.

// std
use std::{
	fs::{self, OpenOptions},
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture, TokenStore},
};

type Entries = BTreeMap<String, String>;

/// JSON object file rewritten in full after every mutation.
///
/// Writes land in a sibling `.tmp` file that is synced and renamed over the target, so a crash
/// never leaves a half-written session file behind.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	entries: Arc<RwLock<Entries>>,
}
impl FileStore {
	/// Opens the store at `path`, loading any entries already on disk.
	///
	/// Missing files and blank files start empty; a file that is not a JSON string map is
	/// reported as [`StoreError::Serialization`].
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();
		let entries = match fs::read(&path) {
			Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Entries::new(),
			Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("{} is not a token snapshot: {e}", path.display()),
			})?,
			Err(e) if e.kind() == io::ErrorKind::NotFound => Entries::new(),
			Err(e) => return Err(backend("read", &path, e)),
		};

		Ok(Self { path, entries: Arc::new(RwLock::new(entries)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn flush(&self, entries: &Entries) -> Result<(), StoreError> {
		if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			fs::create_dir_all(dir).map_err(|e| backend("create", dir, e))?;
		}

		let snapshot = serde_json::to_vec_pretty(entries)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;
		let staging = self.path.with_extension("tmp");
		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.open(&staging)
			.map_err(|e| backend("open", &staging, e))?;

		file.write_all(&snapshot).map_err(|e| backend("write", &staging, e))?;
		file.sync_all().map_err(|e| backend("sync", &staging, e))?;
		drop(file);

		fs::rename(&staging, &self.path).map_err(|e| backend("replace", &self.path, e))
	}
}
impl TokenStore for FileStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let value = self.entries.read().get(key).cloned();

		Box::pin(async move { Ok(value) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let result = {
			let mut entries = self.entries.write();

			entries.insert(key.to_owned(), value);
			self.flush(&entries)
		};

		Box::pin(async move { result })
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let result = {
			let mut entries = self.entries.write();

			match entries.remove(key) {
				Some(_) => self.flush(&entries),
				None => Ok(()),
			}
		};

		Box::pin(async move { result })
	}
}

fn backend(action: &str, path: &Path, e: io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn scratch_file(label: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"leave_session_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		))
	}

	#[tokio::test]
	async fn token_survives_reopen_and_removal_is_persisted() {
		let path = scratch_file("reopen");
		let store = FileStore::open(&path).expect("Missing snapshot should open empty.");

		store.set("token", "persisted-token".into()).await.expect("Save should succeed.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Snapshot should reopen.");

		assert_eq!(
			reopened.get("token").await.expect("Fetch should succeed.").as_deref(),
			Some("persisted-token")
		);

		reopened.remove("token").await.expect("Removal should succeed.");
		reopened.remove("token").await.expect("Removing a missing key should succeed.");

		let emptied = FileStore::open(&path).expect("Emptied snapshot should reopen.");

		assert_eq!(emptied.get("token").await.expect("Fetch should succeed."), None);
		assert!(!path.with_extension("tmp").exists());

		fs::remove_file(&path).expect("Scratch snapshot should be removable.");
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let path = scratch_file("corrupt");

		fs::write(&path, b"not json").expect("Corrupt fixture should be writable.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshots should fail to open.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).expect("Scratch snapshot should be removable.");
	}

	#[test]
	fn blank_snapshot_opens_empty() {
		let path = scratch_file("blank");

		fs::write(&path, b"  \n").expect("Blank fixture should be writable.");

		let store = FileStore::open(&path).expect("Blank snapshots should open.");

		assert!(store.entries.read().is_empty());
		assert_eq!(store.path(), path.as_path());

		fs::remove_file(&path).expect("Scratch snapshot should be removable.");
	}
}
