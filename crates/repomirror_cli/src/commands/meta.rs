use std::path::PathBuf;

use clap::CommandFactory;

use crate::Cli;

fn cli_command() -> clap::Command {
    Cli::command()
}

fn completion_script(shell: clap_complete::Shell) -> Vec<u8> {
    let mut cmd = cli_command();
    let mut out = Vec::new();
    clap_complete::generate(shell, &mut cmd, "repomirror", &mut out);
    out
}

fn main_man_page() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let man = clap_mangen::Man::new(cli_command());
    let mut out = Vec::new();
    man.render(&mut out)?;
    Ok(out)
}

pub(crate) fn handle_completions(
    shell: clap_complete::Shell,
) -> Result<(), Box<dyn std::error::Error>> {
    let out = completion_script(shell);
    use std::io::Write;
    std::io::stdout().write_all(&out)?;
    Ok(())
}

pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            clap_mangen::generate_to(cli_command(), &dir)?;
            println!("Generated man pages in: {}", dir.display());
        }
        None => {
            let out = main_man_page()?;
            use std::io::Write;
            std::io::stdout().write_all(&out)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_script_contains_binary_name() {
        let script = completion_script(clap_complete::Shell::Bash);
        let script = String::from_utf8(script).expect("completion output should be UTF-8");
        assert!(script.contains("repomirror"));
        assert!(script.contains("continue-on-error"));
    }

    #[test]
    fn main_man_page_contains_expected_title() {
        let page = main_man_page().expect("man rendering should succeed");
        let page = String::from_utf8(page).expect("man output should be UTF-8");
        assert!(page.to_lowercase().contains(".th repomirror"));
    }

    #[test]
    fn handle_man_writes_files_when_output_directory_is_provided() {
        let dir = tempfile::tempdir().expect("temp dir");
        let out = dir.path().join("man");

        handle_man(Some(out.clone())).expect("man page generation should succeed");

        let pages: Vec<_> = std::fs::read_dir(&out)
            .expect("output directory should exist")
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(pages.iter().any(|p| p == "repomirror.1"));
        assert!(pages.iter().any(|p| p.contains("run")));
    }
}
