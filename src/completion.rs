//! # Shell Completion Module
//!
//! Completion scripts for the supported shells, plus the track id listing
//! behind the hidden `complete-tracks` command.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! mixchain completion bash > ~/.local/share/bash-completion/completions/mixchain
//!
//! # Generate zsh completions
//! mixchain completion zsh > ~/.config/zsh/completions/_mixchain
//! ```

use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

use crate::collection::Collection;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// One line per track: the id, a tab, then `Artist - Title`.
///
/// zsh and fish show the part after the tab as a description.
pub fn track_completions(collection: &Collection) -> Vec<String> {
    collection
        .iter()
        .map(|track| format!("{}\t{}", track.id, track.display_name()))
        .collect()
}

/// Print [`track_completions`] to `out`
///
/// # Errors
///
/// Returns an error if writing fails
pub fn write_track_completions(collection: &Collection, out: &mut impl Write) -> io::Result<()> {
    for line in track_completions(collection) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Track;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(
            shell_to_completion_shell(&crate::cli::Shell::Bash),
            CompletionShell::Bash
        );
        assert_eq!(
            shell_to_completion_shell(&crate::cli::Shell::Zsh),
            CompletionShell::Zsh
        );
    }

    #[test]
    fn test_track_completions() {
        let collection = Collection::new(vec![
            Track::new("17", "Kiasmos", "Blurred"),
            Track::new("18", "", "Untitled"),
        ]);
        assert_eq!(
            track_completions(&collection),
            vec!["17\tKiasmos - Blurred".to_string(), "18\tUntitled".to_string()]
        );

        let mut out = Vec::new();
        write_track_completions(&collection, &mut out).expect("writing to a Vec cannot fail");
        assert_eq!(String::from_utf8_lossy(&out).lines().count(), 2);
    }

    #[test]
    fn test_empty_collection_completes_nothing() {
        assert!(track_completions(&Collection::default()).is_empty());
    }
}
