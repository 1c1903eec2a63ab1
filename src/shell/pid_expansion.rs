use crate::shell::command_parser::Command;

const PID_MARKER: &str = "$$";

/// Replaces every non-overlapping `$$` with `pid`, scanning left to right.
/// A lone `$` is left alone, so `$$$` becomes the pid followed by `$`.
pub fn expand_pid(word: &str, pid: &str) -> Option<String> {
    if word.contains(PID_MARKER) {
        Some(word.replace(PID_MARKER, pid))
    } else {
        None
    }
}

/// Expands the marker in the command name, every argument and both redirection paths.
pub fn expand_command(cmd: &mut Command, pid: u32) {
    let pid = pid.to_string();

    let words = std::iter::once(&mut cmd.name)
        .chain(cmd.args.iter_mut())
        .chain(cmd.input_path.iter_mut())
        .chain(cmd.output_path.iter_mut());

    for word in words {
        if let Some(expanded) = expand_pid(word, &pid) {
            *word = expanded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::command_parser::CommandParser;

    #[test]
    fn test_no_marker_is_untouched() {
        assert_eq!(expand_pid("hello", "4321"), None);
        assert_eq!(expand_pid("$HOME", "4321"), None);
        assert_eq!(expand_pid("a$b$", "4321"), None);
    }

    #[test]
    fn test_occurrences() {
        assert_eq!(expand_pid("$$", "4321").as_deref(), Some("4321"));
        assert_eq!(expand_pid("file.$$.txt", "4321").as_deref(), Some("file.4321.txt"));
        assert_eq!(expand_pid("$$-$$", "7").as_deref(), Some("7-7"));
    }

    #[test]
    fn test_adjacent_and_odd_markers() {
        assert_eq!(expand_pid("$$$$", "12").as_deref(), Some("1212"));
        assert_eq!(expand_pid("$$$", "12").as_deref(), Some("12$"));
        assert_eq!(expand_pid("x$$$$$y", "9").as_deref(), Some("x99$y"));
    }

    #[test]
    fn test_insertion_count_matches_marker_count() {
        for k in 0..6 {
            let word = format!("a{}b", "$$".repeat(k));
            let expanded = expand_pid(&word, "555").unwrap_or_else(|| word.clone());
            assert_eq!(expanded, format!("a{}b", "555".repeat(k)));
        }
    }

    #[test]
    fn test_expand_command_covers_every_word() {
        let mut cmd = CommandParser::new(512)
            .parse("echo$$ hello $$ < in$$ > out$$ &")
            .unwrap()
            .unwrap();
        expand_command(&mut cmd, 4321);

        assert_eq!(cmd.name, "echo4321");
        assert_eq!(cmd.args, vec!["echo4321", "hello", "4321"]);
        assert_eq!(cmd.input_path.as_deref(), Some("in4321"));
        assert_eq!(cmd.output_path.as_deref(), Some("out4321"));
        assert!(cmd.background);
    }
}
