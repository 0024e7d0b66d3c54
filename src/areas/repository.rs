use crate::areas::database::Database;
use crate::areas::refs::{Head, Refs};
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::errors::{GitError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const GIT_DIR_NAME: &str = ".git";
const GITDIR_PREFIX: &str = "gitdir:";

/// Handle to one on-disk repository, opened fresh for every query.
#[derive(Debug)]
pub struct Repository {
    path: Box<Path>,
    git_dir: Box<Path>,
    database: Arc<Database>,
    refs: Refs,
}

impl Repository {
    /// Open the repository at `path`.
    ///
    /// `path` may be a worktree root (with a `.git` directory or a `.git` file
    /// holding `gitdir: <path>`) or a bare repository directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let requested = path.as_ref();
        let not_found = || GitError::RepositoryNotFound {
            path: requested.to_path_buf(),
        };

        let path = requested.canonicalize().map_err(|_| not_found())?;
        let git_dir = Self::find_git_dir(&path)?.ok_or_else(not_found)?;

        let algorithm = Self::read_object_format(&git_dir)?;
        let database = Database::open(&git_dir.join("objects"), algorithm)?;
        let refs = Refs::new(git_dir.clone().into_boxed_path());

        tracing::debug!(
            repository = %path.display(),
            git_dir = %git_dir.display(),
            ?algorithm,
            "opened repository"
        );

        Ok(Repository {
            path: path.into_boxed_path(),
            git_dir: git_dir.into_boxed_path(),
            database: Arc::new(database),
            refs,
        })
    }

    fn find_git_dir(path: &Path) -> Result<Option<PathBuf>> {
        let dot_git = path.join(GIT_DIR_NAME);

        if dot_git.is_dir() && Self::looks_like_git_dir(&dot_git) {
            return Ok(Some(dot_git));
        }

        if dot_git.is_file() {
            let content = std::fs::read_to_string(&dot_git)?;
            let target = content
                .lines()
                .find_map(|line| line.strip_prefix(GITDIR_PREFIX))
                .map(|target| path.join(target.trim()));

            return Ok(target.filter(|target| Self::looks_like_git_dir(target)));
        }

        if Self::looks_like_git_dir(path) {
            return Ok(Some(path.to_path_buf()));
        }

        Ok(None)
    }

    fn looks_like_git_dir(path: &Path) -> bool {
        path.join("HEAD").is_file() && path.join("objects").is_dir()
    }

    /// Read `extensions.objectformat` from the repository config.
    fn read_object_format(git_dir: &Path) -> Result<HashAlgorithm> {
        let config = match std::fs::read_to_string(git_dir.join("config")) {
            Ok(config) => config,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashAlgorithm::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut in_extensions = false;
        for line in config.lines().map(str::trim) {
            if line.starts_with('[') {
                in_extensions = line.trim_matches(['[', ']']).trim().eq_ignore_ascii_case("extensions");
                continue;
            }

            if !in_extensions {
                continue;
            }
            if let Some((key, value)) = line.split_once('=')
                && key.trim().eq_ignore_ascii_case("objectformat")
            {
                return Ok(HashAlgorithm::from_object_format(value));
            }
        }

        Ok(HashAlgorithm::default())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Shared handle for work moved onto other threads
    pub fn shared_database(&self) -> Arc<Database> {
        self.database.clone()
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn head(&self) -> Result<Head> {
        self.refs.head()
    }

    /// The commit HEAD points at, `None` when the current branch is unborn.
    pub fn head_oid(&self) -> Result<Option<ObjectId>> {
        self.refs.read_head()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn init_git_dir(git_dir: &assert_fs::fixture::ChildPath) {
        git_dir.child("HEAD").write_str("ref: refs/heads/main\n").unwrap();
        git_dir.child("objects").create_dir_all().unwrap();
        git_dir.child("refs/heads").create_dir_all().unwrap();
    }

    #[rstest]
    fn opens_a_worktree_root(dir: TempDir) {
        init_git_dir(&dir.child(".git"));

        let repository = Repository::open(dir.path()).unwrap();

        assert!(repository.git_dir().ends_with(".git"));
        assert_eq!(repository.head_oid().unwrap(), None);
    }

    #[rstest]
    fn opens_a_bare_repository(dir: TempDir) {
        init_git_dir(&dir.child("repo.git"));

        let repository = Repository::open(dir.child("repo.git").path()).unwrap();

        assert!(repository.git_dir().ends_with("repo.git"));
    }

    #[rstest]
    fn follows_a_gitdir_file(dir: TempDir) {
        init_git_dir(&dir.child("storage"));
        dir.child("worktree/.git")
            .write_str("gitdir: ../storage\n")
            .unwrap();

        let repository = Repository::open(dir.child("worktree").path()).unwrap();

        assert!(repository.git_dir().ends_with("storage"));
    }

    #[rstest]
    fn reads_the_object_format(dir: TempDir) {
        let git_dir = dir.child(".git");
        init_git_dir(&git_dir);
        git_dir
            .child("config")
            .write_str("[core]\n\trepositoryformatversion = 1\n[extensions]\n\tobjectformat = sha256\n")
            .unwrap();

        let repository = Repository::open(dir.path()).unwrap();

        assert_eq!(repository.database().algorithm(), HashAlgorithm::Sha256);
    }

    #[rstest]
    fn plain_directory_is_not_a_repository(dir: TempDir) {
        let err = Repository::open(dir.path()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RepositoryNotFound);
    }

    #[rstest]
    fn missing_directory_is_not_a_repository(dir: TempDir) {
        let err = Repository::open(dir.path().join("nope")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RepositoryNotFound);
    }
}
