use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{ArtifactStore, JobStore};
use crate::config::ProviderName;
use crate::error::StoreError;
use crate::schema::{Job, JobPatch, Round};

const JOBS_DIR: &str = "jobs";
const JOB_FILE: &str = "job.json";
const ROUNDS_DIR: &str = "rounds";
const FILES_DIR: &str = "files";

/// Filesystem layout under `root`:
///
/// ```text
/// jobs/<job_id>/job.json
/// jobs/<job_id>/rounds/<round>/<provider>.json
/// jobs/<job_id>/files/<name>
/// ```
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn job_dir(&self, job_id: &str) -> Result<PathBuf, StoreError> {
        check_name(job_id)?;
        Ok(self.root.join(JOBS_DIR).join(job_id))
    }

    fn round_path(
        &self,
        job_id: &str,
        round: Round,
        provider: ProviderName,
    ) -> Result<PathBuf, StoreError> {
        Ok(self
            .job_dir(job_id)?
            .join(ROUNDS_DIR)
            .join(round.as_str())
            .join(format!("{}.json", provider)))
    }

    fn blob_path(&self, job_id: &str, name: &str) -> Result<PathBuf, StoreError> {
        check_name(name)?;
        Ok(self.job_dir(job_id)?.join(FILES_DIR).join(name))
    }

    fn read_job(&self, path: &Path) -> Result<Option<Job>, StoreError> {
        let Some(bytes) = read_optional(path)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

impl JobStore for FsStore {
    fn create(&self, job: &Job) -> Result<(), StoreError> {
        let path = self.job_dir(&job.job_id)?.join(JOB_FILE);
        write_atomic(&path, &serde_json::to_vec_pretty(job)?)
    }

    fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        self.read_job(&self.job_dir(job_id)?.join(JOB_FILE))
    }

    fn update(&self, job_id: &str, patch: &JobPatch) -> Result<Option<Job>, StoreError> {
        let path = self.job_dir(job_id)?.join(JOB_FILE);
        let Some(mut job) = self.read_job(&path)? else {
            return Ok(None);
        };

        patch.apply(&mut job, Utc::now());
        write_atomic(&path, &serde_json::to_vec_pretty(&job)?)?;
        Ok(Some(job))
    }

    fn list(&self) -> Result<Vec<Job>, StoreError> {
        let jobs_dir = self.root.join(JOBS_DIR);
        let entries = match fs::read_dir(&jobs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&jobs_dir, e)),
        };

        let mut jobs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&jobs_dir, e))?;
            match self.read_job(&entry.path().join(JOB_FILE)) {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping job record: {}", e),
            }
        }

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    fn delete(&self, job_id: &str) -> Result<bool, StoreError> {
        let dir = self.job_dir(job_id)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&dir, e)),
        }
    }
}

impl ArtifactStore for FsStore {
    fn read_round_output(
        &self,
        job_id: &str,
        round: Round,
        provider: ProviderName,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        read_optional(&self.round_path(job_id, round, provider)?)
    }

    fn write_round_output(
        &self,
        job_id: &str,
        round: Round,
        provider: ProviderName,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        write_once(&self.round_path(job_id, round, provider)?, bytes)
    }

    fn read_blob(&self, job_id: &str, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        read_optional(&self.blob_path(job_id, name)?)
    }

    fn write_blob(&self, job_id: &str, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        write_atomic(&self.blob_path(job_id, name)?, bytes)
    }

    fn delete_job_files(&self, job_id: &str) -> Result<(), StoreError> {
        let dir = self.job_dir(job_id)?;
        for sub in [ROUNDS_DIR, FILES_DIR] {
            let path = dir.join(sub);
            match fs::remove_dir_all(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path, e)),
            }
        }
        Ok(())
    }
}

/// Names become single path components
fn check_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

/// Write through a temp file in the same directory, then rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    staged(path, bytes)?
        .persist(path)
        .map_err(|e| io_error(path, e.error))?;
    Ok(())
}

/// Like `write_atomic`, but an existing target is left untouched
fn write_once(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    match staged(path, bytes)?.persist_noclobber(path) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(StoreError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => Err(io_error(path, e.error)),
    }
}

fn staged(path: &Path, bytes: &[u8]) -> Result<tempfile::NamedTempFile, StoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::InvalidName(path.display().to_string()))?;
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;
    tmp.write_all(bytes).map_err(|e| io_error(path, e))?;
    Ok(tmp)
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ContractType, DebateMode, JobStatus, Side, Stage};
    use chrono::Duration;

    fn job(id: &str, age_hours: i64) -> Job {
        let created = Utc::now() - Duration::hours(age_hours);
        Job {
            job_id: id.into(),
            tenant_id: "default".into(),
            status: JobStatus::Created,
            contract_type: ContractType::Saas,
            side: Side::Contracted,
            jurisdiction: "Brazil".into(),
            current_stage: None,
            progress: None,
            debate_mode: DebateMode::Debate,
            selected_providers: None,
            error_code: None,
            error_message: None,
            feedback: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_job_roundtrip_and_partial_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        store.create(&job("j1", 0)).unwrap();
        let updated = store
            .update("j1", &JobPatch::stage(Stage::Ingest))
            .unwrap()
            .unwrap();
        assert_eq!(updated.current_stage, Some(Stage::Ingest));

        let updated = store
            .update("j1", &JobPatch::status(JobStatus::Processing))
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert_eq!(updated.current_stage, Some(Stage::Ingest));
        assert_eq!(updated.debate_mode, DebateMode::Debate);

        assert_eq!(store.get("j1").unwrap(), Some(updated));
        assert!(store.update("missing", &JobPatch::default()).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());

        store.create(&job("old", 10)).unwrap();
        store.create(&job("new", 1)).unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|j| j.job_id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_round_outputs_and_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.create(&job("j1", 0)).unwrap();

        assert!(store
            .read_round_output("j1", Round::Debate, ProviderName::Gpt)
            .unwrap()
            .is_none());

        store
            .write_round_output("j1", Round::Debate, ProviderName::Gpt, b"{}")
            .unwrap();
        store.write_blob("j1", "docast.json", b"[]").unwrap();

        assert_eq!(
            store
                .read_round_output("j1", Round::Debate, ProviderName::Gpt)
                .unwrap(),
            Some(b"{}".to_vec())
        );
        assert!(dir
            .path()
            .join("jobs/j1/rounds/debate/gpt.json")
            .exists());

        store.delete_job_files("j1").unwrap();
        assert!(store.read_blob("j1", "docast.json").unwrap().is_none());
        assert!(store.get("j1").unwrap().is_some());

        assert!(store.delete("j1").unwrap());
        assert!(!store.delete("j1").unwrap());
    }

    #[test]
    fn test_round_output_is_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.create(&job("j1", 0)).unwrap();

        store
            .write_round_output("j1", Round::Analysis, ProviderName::Claude, b"{\"first\":1}")
            .unwrap();
        let second =
            store.write_round_output("j1", Round::Analysis, ProviderName::Claude, b"{\"second\":2}");
        assert!(matches!(second, Err(StoreError::AlreadyExists(_))));

        assert_eq!(
            store
                .read_round_output("j1", Round::Analysis, ProviderName::Claude)
                .unwrap(),
            Some(b"{\"first\":1}".to_vec())
        );

        store
            .write_round_output("j1", Round::Analysis, ProviderName::Gemini, b"{}")
            .unwrap();
        store.write_blob("j1", "report.json", b"[1]").unwrap();
        store.write_blob("j1", "report.json", b"[2]").unwrap();
        assert_eq!(
            store.read_blob("j1", "report.json").unwrap(),
            Some(b"[2]".to_vec())
        );

        store.delete_job_files("j1").unwrap();
        store
            .write_round_output("j1", Round::Analysis, ProviderName::Claude, b"{}")
            .unwrap();
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        assert!(matches!(
            store.write_blob("j1", "../escape", b"x"),
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(store.get(".."), Err(StoreError::InvalidName(_))));
    }
}
