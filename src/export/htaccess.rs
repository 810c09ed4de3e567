//! Web-server deny rules for the CSV directory.

use std::fs;
use std::io;
use std::path::Path;

const BEGIN_MARKER: &str = "# BEGIN Trash Log";
const END_MARKER: &str = "# END Trash Log";

pub const HTACCESS_FILE: &str = ".htaccess";

fn rules_for(file_name: &str) -> Vec<String> {
    vec![
        format!("<Files {file_name}>"),
        "    Order allow,deny".to_string(),
        "    Deny from all".to_string(),
        "</Files>".to_string(),
    ]
}

/// Writes (or rewrites in place) the marker block denying direct access to
/// `file_name` inside `dir`. Lines outside the markers are left untouched.
pub fn protect_directory(dir: &Path, file_name: &str) -> io::Result<()> {
    let path = dir.join(HTACCESS_FILE);
    let existing = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let mut block = vec![BEGIN_MARKER.to_string()];
    block.extend(rules_for(file_name));
    block.push(END_MARKER.to_string());

    let mut out: Vec<String> = Vec::new();
    let mut inside = false;
    let mut placed = false;
    for line in existing.lines() {
        match line.trim() {
            BEGIN_MARKER => {
                inside = true;
                if !placed {
                    out.extend(block.iter().cloned());
                    placed = true;
                }
            }
            END_MARKER if inside => inside = false,
            _ if inside => {}
            _ => out.push(line.to_string()),
        }
    }
    if !placed {
        out.extend(block);
    }

    let mut contents = out.join("\n");
    contents.push('\n');
    fs::write(&path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn repeated_writes_leave_one_block() -> io::Result<()> {
        let dir = tempdir()?;
        for _ in 0..3 {
            protect_directory(dir.path(), "trash-log.csv")?;
        }

        let contents = fs::read_to_string(dir.path().join(HTACCESS_FILE))?;
        assert_eq!(contents.matches(BEGIN_MARKER).count(), 1);
        assert_eq!(contents.matches(END_MARKER).count(), 1);
        assert!(contents.contains("<Files trash-log.csv>"));
        assert!(contents.contains("Deny from all"));
        Ok(())
    }

    #[test]
    fn foreign_rules_are_preserved() -> io::Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join(HTACCESS_FILE),
            "Options -Indexes\n# BEGIN Trash Log\nstale\n# END Trash Log\nHeader set X-Test 1\n",
        )?;

        protect_directory(dir.path(), "trash-log.csv")?;

        let contents = fs::read_to_string(dir.path().join(HTACCESS_FILE))?;
        assert!(contents.starts_with("Options -Indexes\n# BEGIN Trash Log\n"));
        assert!(contents.contains("Header set X-Test 1"));
        assert!(!contents.contains("stale"));
        Ok(())
    }
}
