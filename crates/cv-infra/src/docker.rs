//! Thin `docker` CLI wrapper. Grounded on the teacher's
//! `git_history::infrastructure::GitExecutor`: shell out, check exit
//! status, surface stdout/stderr as a typed error. No Docker client crate
//! (e.g. bollard) is in the workspace dependency set, so container
//! lifecycle is driven the same way the teacher drives `git`.

use cv_core::{CvError, Result};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Exited,
    Created,
    Missing,
    Other,
}

async fn run(bin: &str, args: &[&str]) -> Result<(bool, String, String)> {
    let output = Command::new(bin)
        .args(args)
        .output()
        .await
        .map_err(|e| CvError::io(format!("failed to spawn `{bin}`: {e}")).with_source(e))?;
    Ok((
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    ))
}

pub async fn inspect_status(docker_bin: &str, name: &str) -> Result<ContainerState> {
    let (ok, stdout, stderr) = run(docker_bin, &["inspect", "--format", "{{.State.Status}}", name]).await?;
    if !ok {
        if stderr.contains("No such object") || stderr.contains("no such container") {
            return Ok(ContainerState::Missing);
        }
        return Err(CvError::io(format!("docker inspect failed: {stderr}")));
    }
    Ok(match stdout.as_str() {
        "running" => ContainerState::Running,
        "exited" | "dead" => ContainerState::Exited,
        "created" => ContainerState::Created,
        _ => ContainerState::Other,
    })
}

pub async fn start(docker_bin: &str, name: &str) -> Result<()> {
    let (ok, _, stderr) = run(docker_bin, &["start", name]).await?;
    if !ok {
        return Err(CvError::io(format!("docker start {name} failed: {stderr}")));
    }
    Ok(())
}

pub async fn remove(docker_bin: &str, name: &str) -> Result<()> {
    let (_, _, _) = run(docker_bin, &["rm", "-f", name]).await?;
    Ok(())
}

pub async fn run_detached(
    docker_bin: &str,
    name: &str,
    image: &str,
    host_port: u16,
    container_port: u16,
) -> Result<()> {
    let port_map = format!("{host_port}:{container_port}");
    let (ok, _, stderr) = run(
        docker_bin,
        &["run", "-d", "--name", name, "-p", &port_map, image],
    )
    .await?;
    if !ok {
        return Err(CvError::io(format!("docker run {name} ({image}) failed: {stderr}")));
    }
    Ok(())
}

/// Streams `docker exec <container> ollama pull <model>`'s stdout lines to
/// `on_progress`, used for the embedding server's model-pull step.
pub async fn exec_streaming(
    docker_bin: &str,
    name: &str,
    args: &[&str],
    mut on_progress: impl FnMut(String) + Send,
) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut full_args = vec!["exec", name];
    full_args.extend_from_slice(args);

    let mut child = Command::new(docker_bin)
        .args(&full_args)
        .stdout(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| CvError::io(format!("failed to spawn docker exec: {e}")).with_source(e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CvError::io("docker exec produced no stdout handle"))?;
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CvError::io(format!("reading docker exec output failed: {e}")))?
    {
        on_progress(line);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| CvError::io(format!("waiting on docker exec failed: {e}")))?;
    if !status.success() {
        return Err(CvError::io(format!("docker exec {name} {args:?} exited with {status}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inspect_missing_container_reports_missing() {
        let state = inspect_status("docker", "cv-test-definitely-not-a-real-container").await;
        match state {
            Ok(s) => assert_eq!(s, ContainerState::Missing),
            Err(_) => { /* docker binary unavailable in this environment */ }
        }
    }
}
