use anyhow::{Context, Result};
use nightshift_core::Layout;
use nightshift_git::WorkRepo;

/// Helper to open the working repository and its data layout.
pub fn open_repo_and_layout() -> Result<(WorkRepo, Layout)> {
    let repo = WorkRepo::open_current().context("Not inside a git repository")?;
    let workdir = repo
        .workdir()
        .context("Cannot run in bare repository")?
        .to_path_buf();
    let layout = Layout::new(workdir);

    Ok((repo, layout))
}
