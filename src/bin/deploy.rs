//! Builds the service, copies the artifacts to the remote host with `scp` and
//! restarts it over `ssh`.

use anyhow::{Context, bail};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Parser)]
#[command(name = "deploy", about = "Build, upload and restart the image service")]
struct Args {
    #[arg(long, env = "DEPLOY_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "SSHPORT", default_value_t = 22)]
    port: u16,

    #[arg(long, env = "DEPLOY_USER", default_value = "root")]
    user: String,

    /// Private key passed to ssh/scp with `-i`
    #[arg(long, env = "KEYFILE")]
    key_file: Option<PathBuf>,

    #[arg(long, env = "REMOTE_DIR", default_value = "/www/wwwroot/img-service")]
    remote_dir: String,

    #[arg(long, env = "BUILD_CMD", default_value = "cargo build --release")]
    build: String,

    #[arg(long, env = "RESTART_CMD", default_value = "systemctl restart img-service")]
    restart: String,

    #[arg(long)]
    skip_build: bool,

    /// Files to ship. Relative paths keep their layout under the remote directory.
    #[arg(default_values = ["target/release/img-service", ".env"])]
    artifacts: Vec<PathBuf>,
}

impl Args {
    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn key_args(&self) -> Vec<String> {
        match &self.key_file {
            Some(key) => vec!["-i".to_string(), key.display().to_string()],
            None => Vec::new(),
        }
    }

    fn ssh(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(self.key_args())
            .arg("-p")
            .arg(self.port.to_string())
            .arg(self.destination())
            .arg(remote_command);
        cmd
    }

    fn scp(&self, local: &Path, remote: &str) -> Command {
        let mut cmd = Command::new("scp");
        cmd.args(self.key_args())
            .arg("-P")
            .arg(self.port.to_string())
            .arg(local)
            .arg(format!("{}:{}", self.destination(), remote));
        cmd
    }
}

/// Remote path an artifact is copied to.
fn remote_path(remote_dir: &str, artifact: &Path) -> String {
    let rel = if artifact.is_absolute() {
        artifact
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| artifact.to_path_buf())
    } else {
        artifact.to_path_buf()
    };
    format!(
        "{}/{}",
        remote_dir.trim_end_matches('/'),
        rel.to_string_lossy().replace('\\', "/")
    )
}

fn parent_dir(remote: &str) -> &str {
    remote.rsplit_once('/').map_or(remote, |(parent, _)| parent)
}

/// Single-quotes a value for the remote POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    log::debug!("{}: {:?}", step, cmd);
    let status = cmd
        .status()
        .with_context(|| format!("{}: failed to launch", step))?;
    if !status.success() {
        bail!("{}: exited with {}", step, status);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    if !args.skip_build {
        log::info!("building: {}", args.build);
        run("build", Command::new("sh").arg("-c").arg(&args.build))?;
    }

    for artifact in &args.artifacts {
        if !artifact.is_file() {
            bail!("artifact {} not found", artifact.display());
        }
    }

    let targets: Vec<(PathBuf, String)> = args
        .artifacts
        .iter()
        .map(|a| (a.clone(), remote_path(&args.remote_dir, a)))
        .collect();

    let dirs: BTreeSet<&str> = targets.iter().map(|(_, r)| parent_dir(r)).collect();
    let mkdir = dirs
        .iter()
        .map(|d| shell_quote(d))
        .collect::<Vec<_>>()
        .join(" ");
    log::info!("connecting to {}:{}", args.host, args.port);
    run("mkdir", &mut args.ssh(&format!("mkdir -p {}", mkdir)))?;

    for (local, remote) in &targets {
        run("upload", &mut args.scp(local, remote))?;
        log::info!("uploaded {} -> {}", local.display(), remote);
    }
    log::info!("all {} files uploaded", targets.len());

    let restart = format!(
        "cd {} && ls -l && {}",
        shell_quote(&args.remote_dir),
        args.restart
    );
    run("restart", &mut args.ssh(&restart))?;
    log::info!("remote restart finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_artifacts_keep_layout() {
        assert_eq!(
            remote_path("/srv/app/", Path::new("target/release/img-service")),
            "/srv/app/target/release/img-service"
        );
        assert_eq!(remote_path("/srv/app", Path::new("/tmp/build/.env")), "/srv/app/.env");
        assert_eq!(parent_dir("/srv/app/target/release/img-service"), "/srv/app/target/release");
    }

    #[test]
    fn quotes_for_remote_shell() {
        assert_eq!(shell_quote("/srv/my app"), "'/srv/my app'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn builds_ssh_and_scp_commands() {
        let args = Args::parse_from([
            "deploy",
            "--host",
            "10.0.0.5",
            "--port",
            "2222",
            "--user",
            "ops",
            "--key-file",
            "/keys/id_ed25519",
            "--skip-build",
            "a.txt",
        ]);
        assert_eq!(args.artifacts, vec![PathBuf::from("a.txt")]);

        let ssh = args.ssh("uptime");
        let ssh_args: Vec<_> = ssh.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(ssh.get_program(), "ssh");
        assert_eq!(ssh_args, ["-i", "/keys/id_ed25519", "-p", "2222", "ops@10.0.0.5", "uptime"]);

        let scp = args.scp(Path::new("a.txt"), "/srv/a.txt");
        let scp_args: Vec<_> = scp.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(scp.get_program(), "scp");
        assert_eq!(
            scp_args,
            ["-i", "/keys/id_ed25519", "-P", "2222", "a.txt", "ops@10.0.0.5:/srv/a.txt"]
        );
    }
}
