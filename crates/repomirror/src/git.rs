//! Git transport for mirror jobs.
//!
//! [`GitMirror`] is the seam between the mirror executor and git itself.
//! Both operations block, so the executor runs them on tokio's blocking
//! pool. [`Git2Mirror`] implements them with libgit2.

use std::cell::RefCell;
use std::path::Path;

use git2::{AutotagOption, Cred, CredentialType, FetchOptions, PushOptions, RemoteCallbacks};
use thiserror::Error;

use crate::platform::PlatformCredential;

/// Refspec a mirror push uses: every local ref to the same name remotely.
pub const MIRROR_REFSPEC: &str = "refs/*:refs/*";

/// Refspecs a bare clone fetches.
const CLONE_REFSPECS: [&str; 2] = ["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// libgit2 failed: authentication, missing repository, network, ...
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// The remote refused to update a ref.
    #[error("push of {refname} rejected: {message}")]
    PushRejected { refname: String, message: String },

    /// A refspec that is not `src:dst` with matching globs.
    #[error("invalid refspec: {0}")]
    InvalidRefspec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking clone/push operations used by mirror jobs.
pub trait GitMirror: Send + Sync {
    /// Create a bare repository at `dest` holding every branch and tag of `url`.
    fn clone_bare(
        &self,
        url: &str,
        credential: &PlatformCredential,
        dest: &Path,
    ) -> Result<(), GitError>;

    /// Push the refs of the repository at `dir` matching `refspec` to `url`.
    ///
    /// With `force`, remote refs are overwritten even when the update is not
    /// a fast-forward.
    fn push_mirror(
        &self,
        dir: &Path,
        url: &str,
        credential: &PlatformCredential,
        refspec: &str,
        force: bool,
    ) -> Result<(), GitError>;
}

/// [`GitMirror`] backed by libgit2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Mirror;

impl Git2Mirror {
    pub fn new() -> Self {
        Self
    }
}

/// Credential callback that answers once.
///
/// libgit2 calls the callback again after a rejected credential; failing the
/// second call stops it from retrying the same token forever.
fn credentials_once(
    credential: &PlatformCredential,
) -> impl FnMut(&str, Option<&str>, CredentialType) -> Result<Cred, git2::Error> + '_ {
    let mut attempted = false;
    move |_url, _username_from_url, allowed| {
        if attempted {
            return Err(git2::Error::from_str(&format!(
                "credentials for {} were rejected",
                credential.username
            )));
        }
        attempted = true;
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            Cred::userpass_plaintext(&credential.username, &credential.token)
        } else {
            Cred::default()
        }
    }
}

/// Expand a glob refspec (`refs/*:refs/*`) over concrete ref names.
///
/// Returns `(src, dst)` pairs. A refspec without `*` passes through as is.
pub fn expand_refspec<'a>(
    refspec: &str,
    refnames: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<(String, String)>, GitError> {
    let spec = refspec.trim_start_matches('+');
    let (src, dst) = spec
        .split_once(':')
        .ok_or_else(|| GitError::InvalidRefspec(refspec.to_string()))?;

    match (src.split_once('*'), dst.split_once('*')) {
        (None, None) => Ok(vec![(src.to_string(), dst.to_string())]),
        (Some((src_prefix, src_suffix)), Some((dst_prefix, dst_suffix))) => Ok(refnames
            .into_iter()
            .filter_map(|name| {
                let middle = name.strip_prefix(src_prefix)?.strip_suffix(src_suffix)?;
                Some((name.to_string(), format!("{dst_prefix}{middle}{dst_suffix}")))
            })
            .collect()),
        _ => Err(GitError::InvalidRefspec(refspec.to_string())),
    }
}

impl GitMirror for Git2Mirror {
    fn clone_bare(
        &self,
        url: &str,
        credential: &PlatformCredential,
        dest: &Path,
    ) -> Result<(), GitError> {
        let repo = git2::Repository::init_bare(dest)?;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(credentials_once(credential));
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);
        fetch.download_tags(AutotagOption::All);

        let mut remote = repo.remote_anonymous(url)?;
        remote.fetch(&CLONE_REFSPECS, Some(&mut fetch), None)?;

        tracing::debug!(dest = %dest.display(), "Bare clone finished");
        Ok(())
    }

    fn push_mirror(
        &self,
        dir: &Path,
        url: &str,
        credential: &PlatformCredential,
        refspec: &str,
        force: bool,
    ) -> Result<(), GitError> {
        let repo = git2::Repository::open_bare(dir)?;

        let mut refnames = Vec::new();
        for reference in repo.references()? {
            let reference = reference?;
            if reference.symbolic_target().is_some() {
                continue;
            }
            if let Some(name) = reference.name() {
                refnames.push(name.to_string());
            }
        }

        let specs: Vec<String> = expand_refspec(refspec, refnames.iter().map(String::as_str))?
            .into_iter()
            .map(|(src, dst)| format!("{}{src}:{dst}", if force { "+" } else { "" }))
            .collect();

        if specs.is_empty() {
            tracing::debug!(dir = %dir.display(), "No refs to push");
            return Ok(());
        }

        let rejected: RefCell<Vec<(String, String)>> = RefCell::new(Vec::new());
        {
            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(credentials_once(credential));
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejected
                        .borrow_mut()
                        .push((refname.to_string(), message.to_string()));
                }
                Ok(())
            });
            let mut push = PushOptions::new();
            push.remote_callbacks(callbacks);

            let mut remote = repo.remote_anonymous(url)?;
            remote.push(&specs, Some(&mut push))?;
        }

        if let Some((refname, message)) = rejected.into_inner().into_iter().next() {
            return Err(GitError::PushRejected { refname, message });
        }

        tracing::debug!(refs = specs.len(), "Mirror push finished");
        Ok(())
    }
}
