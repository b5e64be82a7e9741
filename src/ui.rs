// UI layer: terminal prompts with `dialoguer` and upload progress with
// `indicatif`. Nothing here talks to the API; the deploy flow reports to
// `ConsoleObserver` through the `DeployObserver` trait.

use crate::config::DeployConfig;
use crate::deploy::DeployObserver;
use crate::files::FileSet;
use anyhow::Result;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Stdout, Write};
use std::path::PathBuf;

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Ask for the site and directory when neither flags, environment nor the
/// config file provided them. No-op without a terminal.
pub fn prompt_missing(config: &mut DeployConfig) -> Result<()> {
    if !is_interactive() {
        return Ok(());
    }
    if config.site.as_deref().map_or(true, |s| s.trim().is_empty()) {
        let site: String = Input::<String>::new()
            .with_prompt("Hosting site (the part before .web.app)")
            .interact_text()?;
        config.site = Some(site.trim().to_string());
    }
    if config.public.is_none() {
        let dir: String = Input::<String>::new()
            .with_prompt("Directory to deploy")
            .default("public".into())
            .interact_text()?;
        config.public = Some(PathBuf::from(dir));
    }
    Ok(())
}

/// Confirm before releasing to a live site. Skipped when `assume_yes` is set
/// or there is no terminal to ask on.
pub fn confirm_deploy(site: &str, dir: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes || !is_interactive() {
        return Ok(true);
    }
    let ok = Confirm::new()
        .with_prompt(format!("Deploy {} to {}.web.app?", dir, site))
        .default(true)
        .interact()?;
    Ok(ok)
}

/// Print `hash  path` lines and totals for a manifest.
pub fn print_manifest(files: &FileSet) {
    for (path, hash) in &files.path_to_hash {
        println!("{}  {}", hash, path);
    }
    println!(
        "{} files, {} unique blobs, {} bytes gzipped",
        files.len(),
        files.hash_to_bytes.len(),
        files.total_compressed_bytes()
    );
}

/// Whether a progress bar can be drawn: stdin/stdout for the user and
/// stderr for indicatif's draw target.
pub fn shows_progress() -> bool {
    is_interactive() && std::io::stderr().is_terminal()
}

/// Writes each deploy step to `out` (stdout by default) and shows a
/// progress bar on stderr while blobs are uploading.
pub struct ConsoleObserver<W: Write = Stdout> {
    out: W,
    progress: bool,
    bar: Option<ProgressBar>,
}

impl ConsoleObserver<Stdout> {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout(), shows_progress())
    }
}

impl Default for ConsoleObserver<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ConsoleObserver<W> {
    pub fn with_writer(out: W, progress: bool) -> Self {
        ConsoleObserver {
            out,
            progress,
            bar: None,
        }
    }

    pub fn into_inner(self) -> W {
        if let Some(bar) = &self.bar {
            bar.abandon();
        }
        self.out
    }

    // Step lines always go to `out`; the bar is only hidden while writing.
    fn println(&mut self, line: String) {
        let out = &mut self.out;
        match &self.bar {
            Some(bar) => bar.suspend(|| {
                let _ = writeln!(out, "{}", line);
            }),
            None => {
                let _ = writeln!(out, "{}", line);
            }
        }
    }
}

impl<W: Write> DeployObserver for ConsoleObserver<W> {
    fn authenticated(&mut self, masked_token: &str) {
        self.println(format!("Access token: {}", masked_token));
    }

    fn version_created(&mut self, version_id: &str) {
        self.println(format!("Version: {}\n", version_id));
    }

    fn files_populated(&mut self, file_count: usize, upload_required: usize) {
        self.println(format!(
            "{} files, {} to upload",
            file_count, upload_required
        ));
        if upload_required > 0 && self.progress {
            let bar = ProgressBar::new(upload_required as u64);
            if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
                bar.set_style(style);
            }
            self.bar = Some(bar);
        }
    }

    fn file_uploaded(&mut self, index: usize, file_count: usize, hash: &str) {
        self.println(format!("[{}/{} file_uploaded] {}", index, file_count, hash));
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finalized(&mut self, _version_id: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn released(&mut self, domain: &str) {
        self.println(format!("[success] Deployed to {}", domain));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_upload(progress: bool) -> String {
        let mut observer = ConsoleObserver::with_writer(Vec::new(), progress);
        observer.authenticated("ya29XXXXXXX");
        observer.version_created("v1");
        observer.files_populated(3, 2);
        observer.file_uploaded(1, 3, "aa");
        observer.file_uploaded(2, 3, "bb");
        observer.finalized("v1");
        observer.released("my-site.web.app");
        String::from_utf8(observer.into_inner()).unwrap()
    }

    #[test]
    fn upload_lines_reach_the_writer_while_bar_is_active() {
        let out = run_upload(true);
        assert!(out.contains("[1/3 file_uploaded] aa\n"));
        assert!(out.contains("[2/3 file_uploaded] bb\n"));
        assert!(out.ends_with("[success] Deployed to my-site.web.app\n"));
    }

    #[test]
    fn output_is_the_same_without_a_bar() {
        let expected = "Access token: ya29XXXXXXX\n\
                        Version: v1\n\n\
                        3 files, 2 to upload\n\
                        [1/3 file_uploaded] aa\n\
                        [2/3 file_uploaded] bb\n\
                        [success] Deployed to my-site.web.app\n";
        assert_eq!(run_upload(false), expected);
        assert_eq!(run_upload(true), expected);
    }
}
